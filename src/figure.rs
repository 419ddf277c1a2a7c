//! Plot description handed to the renderer
//!
//! Field names follow Plotly's figure schema, so a `Figure` serialized with
//! serde_json can be passed straight to `Plotly.react` in the browser. Nothing
//! here knows about samples or categories; `view` and `inspect` build these.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(layout: Layout) -> Self {
        Self { data: Vec::new(), layout }
    }

    pub fn add_trace(&mut self, trace: Trace) {
        self.data.push(trace);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    #[serde(rename = "markers")]
    Markers,
    #[serde(rename = "lines")]
    Lines,
    #[serde(rename = "markers+text")]
    MarkersText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: Mode,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<String>,
    /// Per-point key sent back on click.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub customdata: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverinfo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    pub showlegend: bool,
}

impl Trace {
    pub fn scatter(mode: Mode, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            kind: "scatter",
            mode,
            x,
            y,
            text: Vec::new(),
            customdata: Vec::new(),
            name: None,
            hovertemplate: None,
            hoverinfo: None,
            textposition: None,
            marker: None,
            showlegend: false,
        }
    }

    /// Hover shows the per-point text and nothing else.
    pub fn with_hover_text(mut self, text: Vec<String>) -> Self {
        self.text = text;
        self.hovertemplate = Some("%{text}".to_string());
        self
    }

    pub fn with_click_keys(mut self, keys: Vec<String>) -> Self {
        self.customdata = keys;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Marker {
    pub fn color(color: &str) -> Self {
        Self { color: Some(color.to_string()), ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub size: u32,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Linear,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    /// Serialized as `null` so Plotly shows no axis title.
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    #[serde(rename = "type")]
    pub kind: AxisType,
    pub fixedrange: bool,
}

impl Default for Axis {
    fn default() -> Self {
        Self {
            title: None,
            range: None,
            kind: AxisType::Linear,
            fixedrange: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub showlegend: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    pub paper_bgcolor: String,
    pub xaxis: Axis,
    pub yaxis: Axis,
}

fn heading(text: &str) -> Title {
    Title {
        text: format!("<b>{}", text),
        font: Font { size: 26, color: "gray".to_string() },
    }
}

impl Layout {
    /// The sound map: fixed square range, fixed margins, no data dependency.
    pub fn sound_map(axis_range: f64) -> Self {
        let axis = Axis {
            range: Some([-axis_range, axis_range]),
            ..Axis::default()
        };
        Self {
            title: Some(heading("Sound Map")),
            showlegend: false,
            margin: Some(Margin { l: 80, r: 80, t: 50, b: 40 }),
            paper_bgcolor: "rgba(0,0,0,0)".to_string(),
            xaxis: axis.clone(),
            yaxis: axis,
        }
    }

    /// Spectrum plot: log frequency axis, linear power axis.
    pub fn spectrum() -> Self {
        Self {
            title: Some(heading("Spectrum")),
            showlegend: false,
            margin: None,
            paper_bgcolor: "rgba(0,0,0,0)".to_string(),
            xaxis: Axis { kind: AxisType::Log, ..Axis::default() },
            yaxis: Axis::default(),
        }
    }
}
