//! JSON export: summary, sample points and clusters

use crate::model::{ClusterInfo, DataContext, SamplePoint};
use crate::report::Summary;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct Export<'a> {
    generated_at: String,
    summary: Summary,
    points: Vec<&'a SamplePoint>,
    clusters: Vec<&'a ClusterInfo>,
}

pub fn write<W: Write>(writer: &mut W, ctx: &DataContext) -> io::Result<()> {
    let export = Export {
        generated_at: chrono::Local::now().to_rfc3339(),
        summary: Summary::from_context(ctx),
        points: ctx.points().iter().filter(|p| !p.is_center()).collect(),
        clusters: ctx.clusters().collect(),
    };
    serde_json::to_writer_pretty(&mut *writer, &export)?;
    writeln!(writer)
}
