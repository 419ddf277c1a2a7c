//! In-memory tables the view reads
//!
//! The pipeline produces two tables: projected points and per-sample spectra.
//! `DataContext` bundles them with the catalog and drawing constants. It is
//! built once at startup and only ever borrowed immutably afterwards, so any
//! number of requests can read it at the same time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::catalog::{Catalog, CENTER, GENRE};
use crate::config::ViewSettings;
use crate::db::Database;
use crate::error::Result;

/// One row of the projected table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub name: String,
    pub group: String,
    pub x: f64,
    pub y: f64,
    pub cluster_id: Option<i64>,
}

impl SamplePoint {
    pub fn new(name: &str, group: &str, x: f64, y: f64, cluster_id: Option<i64>) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            x,
            y,
            cluster_id,
        }
    }

    /// Cluster-center glyph rows are not real samples.
    pub fn is_center(&self) -> bool {
        self.group == CENTER || self.group == GENRE
    }
}

/// Ordered (frequency, power) series for one sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub frequencies: Vec<f64>,
    pub powers: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

pub type SpectrumTable = HashMap<String, Spectrum>;

/// Display information for one cluster, derived once from the point table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterInfo {
    pub id: i64,
    pub display_name: String,
    pub color: String,
    /// Non-center points carrying this cluster id.
    pub member_count: usize,
    /// Position of the cluster's center row, if the table has one.
    pub center: Option<(f64, f64)>,
    /// Name of that center row. Clicks on the glyph resolve to it.
    pub center_name: Option<String>,
}

/// Read-only state shared by every handler.
#[derive(Debug)]
pub struct DataContext {
    pub catalog: Catalog,
    pub view: ViewSettings,
    points: Vec<SamplePoint>,
    by_name: HashMap<String, usize>,
    spectra: SpectrumTable,
    clusters: BTreeMap<i64, ClusterInfo>,
}

impl DataContext {
    pub fn new(
        catalog: Catalog,
        view: ViewSettings,
        points: Vec<SamplePoint>,
        spectra: SpectrumTable,
    ) -> Self {
        let mut unique = Vec::with_capacity(points.len());
        let mut by_name = HashMap::with_capacity(points.len());
        for point in points {
            if by_name.contains_key(&point.name) {
                log::warn!("Duplicate sample name '{}', keeping the first row", point.name);
                continue;
            }
            by_name.insert(point.name.clone(), unique.len());
            unique.push(point);
        }

        let clusters = build_clusters(&catalog, &unique);
        log::debug!(
            "Data context: {} points, {} spectra, {} clusters",
            unique.len(),
            spectra.len(),
            clusters.len()
        );

        Self {
            catalog,
            view,
            points: unique,
            by_name,
            spectra,
            clusters,
        }
    }

    /// Read both tables from the store.
    pub fn from_store(db: &Database, catalog: Catalog, view: ViewSettings) -> Result<Self> {
        let points = db.load_points()?;
        let spectra = db.load_spectra()?;
        Ok(Self::new(catalog, view, points, spectra))
    }

    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn point(&self, name: &str) -> Option<&SamplePoint> {
        self.by_name.get(name).map(|&i| &self.points[i])
    }

    pub fn spectrum(&self, name: &str) -> Option<&Spectrum> {
        self.spectra.get(name)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &ClusterInfo> {
        self.clusters.values()
    }

    pub fn cluster(&self, id: i64) -> Option<&ClusterInfo> {
        self.clusters.get(&id)
    }

    /// Names offered by the search control: every real sample, table order.
    pub fn searchable_names(&self) -> Vec<&str> {
        self.points
            .iter()
            .filter(|p| !p.is_center())
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Clusters the catalog can name. Ids without a catalog entry are dropped
/// with a debug message so one bad row never breaks a redraw.
fn build_clusters(catalog: &Catalog, points: &[SamplePoint]) -> BTreeMap<i64, ClusterInfo> {
    let labels = catalog.cluster_table();
    let mut counts: HashMap<i64, usize> = HashMap::new();
    let mut centers: HashMap<i64, &SamplePoint> = HashMap::new();

    for p in points {
        let Some(id) = p.cluster_id else { continue };
        if p.is_center() {
            centers.entry(id).or_insert(p);
        } else {
            *counts.entry(id).or_insert(0) += 1;
        }
    }

    let mut ids: Vec<i64> = counts.keys().chain(centers.keys()).copied().collect();
    ids.sort_unstable();
    ids.dedup();

    ids.into_iter()
        .filter_map(|id| {
            let Some(label) = labels.get(&id) else {
                log::debug!("Cluster id {} has no catalog entry, skipping", id);
                return None;
            };
            Some((
                id,
                ClusterInfo {
                    id,
                    display_name: label.name.clone(),
                    color: label.color.clone(),
                    member_count: counts.get(&id).copied().unwrap_or(0),
                    center: centers.get(&id).map(|c| (c.x, c.y)),
                    center_name: centers.get(&id).map(|c| c.name.clone()),
                },
            ))
        })
        .collect()
}
