//! Soundmap - Browse a synthesizer sample library as a 2-D map
//!
//! Every sample's averaged spectrum is turned into a feature vector, the
//! vectors are embedded with t-SNE, and the result is drawn as a scatter plot
//! colored by category. Clicking a point shows its spectrum and plays it.
//!
//! # Overview
//!
//! The work splits in two:
//!
//! 1. **Offline pipeline** ([`pipeline`]): spectrum tables in, map coordinates
//!    and clusters out, persisted to SQLite ([`db`]).
//! 2. **Interactive view** ([`view`], [`inspect`]): pure functions from the
//!    control state to a [`figure::Figure`], served over HTTP by [`serve`].
//!
//! # Quick Start
//!
//! ```no_run
//! use soundmap::{view, AppConfig, Database, DataContext, Selection, Trigger};
//!
//! let config = AppConfig::load(None);
//! let db = Database::open_at(config.db_path())?;
//! let ctx = DataContext::from_store(&db, config.catalog(), config.view.clone())?;
//!
//! let selection = Selection { categories: vec!["OSC".into()], ..Selection::default() };
//! let out = view::update(&ctx, selection, Trigger::Category);
//! println!("{} traces, select all = {}", out.figure.data.len(), out.select_all);
//! # Ok::<(), soundmap::Error>(())
//! ```
//!
//! # Toggle rule
//!
//! | Trigger | Effect on the controls |
//! |---------|------------------------|
//! | category checklist | select-all becomes true iff every category is checked |
//! | select-all (or initial load) | checklist becomes all categories or none |
//! | search | neither changes |
//!
//! # Modules
//!
//! - [`pipeline`]: loader, features, t-SNE, k-means, audio spectrum extraction
//! - [`view`]: control reconciliation and map rendering
//! - [`inspect`]: click handling, spectrum plot, playback request
//! - [`audio`]: audio asset store and the [`AudioPlayer`] seam
//! - [`report`]: output formatters (HTML, JSON, CSV)

pub mod audio;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod figure;
pub mod inspect;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod serve;
pub mod view;

/// Name used for the config directory and the default file names.
pub const APP_NAME: &str = "soundmap";

pub use audio::{AudioKey, AudioPlayer, AudioStore, PlaybackRequest};
pub use catalog::{Catalog, CENTER, GENRE};
pub use config::AppConfig;
pub use db::{Database, PipelineRun};
pub use error::{AudioError, Error, Result};
pub use inspect::ClickOutcome;
pub use model::{DataContext, SamplePoint, Spectrum, SpectrumTable};
pub use view::{Selection, Trigger, ViewOutput};

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is reachable from the crate root.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _: Trigger = Trigger::Initial;
        let _selection = Selection::default();
        let _store = AudioStore::new("sound");
        let _key = AudioKey::new("OSC", "saw");
    }

    #[test]
    fn test_reserved_labels() {
        assert_eq!(GENRE, "Genre");
        assert_eq!(CENTER, "Center");
        assert!(Catalog::default().labels().contains(GENRE));
    }

    #[test]
    fn test_empty_context_renders() {
        let ctx = DataContext::new(
            Catalog::default(),
            config::ViewSettings::default(),
            Vec::new(),
            SpectrumTable::new(),
        );
        let out = view::update(&ctx, Selection { select_all: true, ..Selection::default() }, Trigger::SelectAll);
        assert_eq!(out.categories, Catalog::default().ordered_labels());
        // no points: one empty trace per real category, no glyphs
        assert!(out.figure.data.iter().all(|t| t.x.is_empty()));
    }
}
