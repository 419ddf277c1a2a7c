//! Exports of the sound map
//!
//! - **HTML**: standalone page with the full map drawn by Plotly.js
//! - **JSON**: points and clusters for programmatic consumption
//! - **CSV**: the point table, plus the transposed spectrum table written by
//!   `soundmap build --csv-out`
//!
//! # Usage
//!
//! ```ignore
//! use soundmap::report;
//!
//! // Automatically picks format based on extension
//! report::generate("map.html", &ctx)?;  // HTML
//! report::generate("map.json", &ctx)?;  // JSON
//! report::generate("map.csv", &ctx)?;   // CSV
//! ```

pub mod csv;
pub mod html;
pub mod json;

use crate::model::DataContext;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, ctx: &DataContext) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "html" | "htm" => html::write(&mut file, ctx),
        "json" => json::write(&mut file, ctx),
        _ => csv::write_points(&mut file, ctx.points()),
    }
}

/// Sample and cluster counts for a map
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub samples: usize,
    pub clusters: usize,
    /// Samples per group, groups in name order
    pub groups: BTreeMap<String, usize>,
}

impl Summary {
    pub fn from_context(ctx: &DataContext) -> Self {
        let mut summary = Self {
            clusters: ctx.clusters().count(),
            ..Self::default()
        };

        for p in ctx.points().iter().filter(|p| !p.is_center()) {
            summary.samples += 1;
            *summary.groups.entry(p.group.clone()).or_insert(0) += 1;
        }

        summary
    }
}
