//! CSV export of the point and spectrum tables

use crate::model::{SamplePoint, SpectrumTable};
use std::io::{self, Write};

/// One row per point, center rows included.
pub fn write_points<W: Write>(writer: &mut W, points: &[SamplePoint]) -> io::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["name", "group", "x", "y", "cluster_id"])?;
    for p in points {
        csv.write_record([
            p.name.clone(),
            p.group.clone(),
            p.x.to_string(),
            p.y.to_string(),
            p.cluster_id.map(|c| c.to_string()).unwrap_or_default(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Spectra side by side: one row per frequency bin, one column per sample
/// in point order. The frequency column comes from the first sample.
pub fn write_spectra<W: Write>(writer: &mut W, points: &[SamplePoint], spectra: &SpectrumTable) -> io::Result<()> {
    let columns: Vec<(&str, &crate::model::Spectrum)> = points
        .iter()
        .filter(|p| !p.is_center())
        .filter_map(|p| spectra.get(&p.name).map(|s| (p.name.as_str(), s)))
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec!["Frequency (Hz)"];
    header.extend(columns.iter().map(|(name, _)| *name));
    csv.write_record(&header)?;

    let rows = columns.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
    for i in 0..rows {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(
            columns
                .first()
                .and_then(|(_, s)| s.frequencies.get(i))
                .map(|f| f.to_string())
                .unwrap_or_default(),
        );
        for (_, s) in &columns {
            record.push(s.powers.get(i).map(|p| p.to_string()).unwrap_or_default());
        }
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}
