//! Category palette and cluster naming
//!
//! The catalog is the fixed, ordered list of group labels the checklist
//! offers, each with its marker color, plus the display table for the
//! clusters the pipeline produces. Order matters: traces are drawn in
//! catalog order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Checklist pseudo-category that toggles the cluster-region glyphs.
pub const GENRE: &str = "Genre";

/// Group label of the cluster-center rows written by the pipeline.
pub const CENTER: &str = "Center";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    /// Marker color. Empty for the `Genre` entry, which has no markers of its own.
    #[serde(default)]
    pub color: String,
}

impl Category {
    fn new(label: &str, color: &str) -> Self {
        Self { label: label.to_string(), color: color.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterLabel {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_cluster_color")]
    pub color: String,
}

fn default_cluster_color() -> String {
    "black".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
    /// Whether the "All" toggle starts checked. The checklist follows it on
    /// first load: every category, or none.
    #[serde(default = "default_true")]
    pub select_all_on_load: bool,
    #[serde(default = "default_clusters")]
    pub clusters: Vec<ClusterLabel>,
}

fn default_true() -> bool {
    true
}

impl Default for Catalog {
    fn default() -> Self {
        Self::production()
    }
}

impl Catalog {
    /// The reduced set of sources shipped with the hosted map.
    pub fn production() -> Self {
        Self {
            categories: vec![
                Category::new(GENRE, ""),
                Category::new("Sample", "#EFCAD6"),
                Category::new("OSC", "#658080"),
                Category::new("Leads", "#70C5CA"),
                Category::new("ONII-CHAN Lead", "#E2DA56"),
            ],
            select_all_on_load: true,
            clusters: default_clusters(),
        }
    }

    /// Every source in the library.
    pub fn full_library() -> Self {
        Self {
            categories: vec![
                Category::new(GENRE, ""),
                Category::new("Sample", "#EFCAD6"),
                Category::new("KOMPLETE", "#658080"),
                Category::new("OSC", "#70C5CA"),
                Category::new("Leads", "#8CA231"),
                Category::new("ONII-CHAN Lead", "#E2DA56"),
                Category::new("NextLight Serum Free LD", "#BA2320"),
                Category::new("Synth", "#924727"),
                Category::new("ONII-CHAN Chord", "#68230D"),
                Category::new("Plucked", "#B032EB"),
                Category::new("ONII-CHAN Pluck", "#A8CC8C"),
                Category::new("ONII-CHAN Pad", "#CE306A"),
                Category::new("Noise", "#6B2220"),
            ],
            select_all_on_load: true,
            clusters: default_clusters(),
        }
    }

    /// Every checklist label, `Genre` included.
    pub fn labels(&self) -> BTreeSet<String> {
        self.categories.iter().map(|c| c.label.clone()).collect()
    }

    /// Checklist labels in catalog order.
    pub fn ordered_labels(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.label.clone()).collect()
    }

    pub fn cluster_table(&self) -> BTreeMap<i64, &ClusterLabel> {
        self.clusters.iter().map(|c| (c.id, c)).collect()
    }
}

fn default_clusters() -> Vec<ClusterLabel> {
    const NAMES: [&str; 20] = [
        "Saw", "Square", "Cluster2", "Cluster3", "Hard Synth", "Flute", "Organ", "Cluster7",
        "Cluster8", "Synth", "Cluster10", "Cluster11", "Brass", "Piano", "Cluster14",
        "Cluster15", "Cluster16", "Cluster17", "Cluster18", "Cluster19",
    ];
    NAMES
        .iter()
        .enumerate()
        .map(|(id, name)| ClusterLabel {
            id: id as i64,
            name: name.to_string(),
            color: default_cluster_color(),
        })
        .collect()
}
