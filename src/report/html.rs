//! Static HTML report with the full map drawn by Plotly.js

use crate::model::DataContext;
use crate::report::Summary;
use crate::view::{self, Selection};
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, ctx: &DataContext) -> io::Result<()> {
    let summary = Summary::from_context(ctx);

    // Every category plus the genre glyphs, no search
    let selection = Selection {
        categories: ctx.catalog.ordered_labels(),
        select_all: true,
        search: Vec::new(),
    };
    let figure = view::render(ctx, &selection);
    let figure_json = script_safe(&serde_json::to_string(&figure)?);

    let group_rows: String = summary
        .groups
        .iter()
        .map(|(group, count)| {
            format!(
                "<tr><td><span class=\"swatch\" style=\"background:{}\"></span>{}</td><td>{}</td></tr>",
                html_escape(color_of(ctx, group)),
                html_escape(group),
                count
            )
        })
        .collect();

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Sound Map</title>
    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
    <style>
        :root {{
            --bg: #fafafa;
            --card: #ffffff;
            --border: #e1e4e8;
            --text: #24292f;
            --dim: #6e7781;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 1400px; margin: 0 auto; padding: 2rem; display: flex; gap: 2rem; }}
        .sidebar {{ width: 280px; flex-shrink: 0; }}
        .card {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.25rem;
            margin-bottom: 1rem;
        }}
        .stat-value {{ font-size: 2.25rem; font-weight: 700; line-height: 1; }}
        .stat-label {{ color: var(--dim); font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.05em; }}
        table {{ width: 100%; border-collapse: collapse; font-size: 0.9rem; }}
        td {{ padding: 0.25rem 0; }}
        td:last-child {{ text-align: right; color: var(--dim); }}
        .swatch {{ display: inline-block; width: 10px; height: 10px; border-radius: 50%; margin-right: 0.5rem; }}
        #map {{ flex: 1; height: 85vh; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="sidebar">
            <div class="card">
                <div class="stat-value">{samples}</div>
                <div class="stat-label">Samples</div>
            </div>
            <div class="card">
                <div class="stat-value">{clusters}</div>
                <div class="stat-label">Clusters</div>
            </div>
            <div class="card">
                <table>{group_rows}</table>
            </div>
        </div>
        <div id="map"></div>
    </div>
    <script>
        const figure = {figure_json};
        Plotly.newPlot('map', figure.data, figure.layout, {{ responsive: true }});
    </script>
</body>
</html>
"#,
        samples = summary.samples,
        clusters = summary.clusters,
        group_rows = group_rows,
        figure_json = figure_json
    )?;

    Ok(())
}

fn color_of<'a>(ctx: &'a DataContext, group: &str) -> &'a str {
    ctx.catalog
        .categories
        .iter()
        .find(|c| c.label == group)
        .map(|c| c.color.as_str())
        .unwrap_or("gray")
}

/// JSON inside a `<script>` block must not close the tag.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
