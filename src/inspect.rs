//! Click-to-inspect
//!
//! A click on the map carries the point's click key: the sample name, or
//! the center row's name for a cluster glyph. The handler resolves it, draws that sample's spectrum and asks the
//! audio player to start playback. Playback trouble is reported next to the
//! spectrum, never instead of it.

use serde::Serialize;

use crate::audio::{AudioKey, AudioPlayer, PlaybackRequest};
use crate::figure::{Figure, Layout, Mode, Trace};
use crate::model::DataContext;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickOutcome {
    pub figure: Figure,
    pub playback: Option<PlaybackRequest>,
    pub playback_error: Option<String>,
}

impl ClickOutcome {
    fn empty() -> Self {
        Self {
            figure: Figure::new(Layout::spectrum()),
            playback: None,
            playback_error: None,
        }
    }
}

/// Handle a click on the map. `hover_text` is the clicked point's key and
/// is `None` before the first click.
pub fn click<P: AudioPlayer + ?Sized>(
    ctx: &DataContext,
    player: &P,
    hover_text: Option<&str>,
) -> ClickOutcome {
    let Some(name) = hover_text else {
        return ClickOutcome::empty();
    };

    let Some(point) = ctx.point(name) else {
        log::debug!("Click on unknown sample '{}'", name);
        return ClickOutcome::empty();
    };

    if point.is_center() {
        return ClickOutcome::empty();
    }

    let mut outcome = ClickOutcome::empty();
    match ctx.spectrum(name) {
        Some(spectrum) => {
            outcome.figure.add_trace(Trace::scatter(
                Mode::Lines,
                spectrum.frequencies.clone(),
                spectrum.powers.clone(),
            ));
        }
        None => log::warn!("No spectrum stored for '{}'", name),
    }

    match player.play(&AudioKey::new(&point.group, &point.name)) {
        Ok(request) => outcome.playback = Some(request),
        Err(e) => {
            log::warn!("Playback failed for '{}': {}", name, e);
            outcome.playback_error = Some(e.to_string());
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;
    use crate::figure::AxisType;
    use crate::catalog::GENRE;
    use crate::model::{fixtures, SamplePoint, SpectrumTable};
    use crate::view::{self, Selection};
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Records every request; optionally fails them all.
    struct RecordingPlayer {
        requests: RefCell<Vec<AudioKey>>,
        fail: bool,
    }

    impl RecordingPlayer {
        fn new(fail: bool) -> Self {
            Self { requests: RefCell::new(Vec::new()), fail }
        }
    }

    impl AudioPlayer for RecordingPlayer {
        fn play(&self, key: &AudioKey) -> Result<PlaybackRequest, AudioError> {
            self.requests.borrow_mut().push(key.clone());
            if self.fail {
                return Err(AudioError::Missing(PathBuf::from(format!("{}/{}.wav", key.group, key.name))));
            }
            Ok(PlaybackRequest { url: format!("/audio/{}", key.name), duration_secs: None })
        }
    }

    #[test]
    fn test_valid_sample_draws_spectrum_and_plays_once() {
        let ctx = fixtures::context();
        let player = RecordingPlayer::new(false);
        let outcome = click(&ctx, &player, Some("sq_3"));

        let expected = ctx.spectrum("sq_3").unwrap();
        assert_eq!(outcome.figure.data.len(), 1);
        let line = &outcome.figure.data[0];
        assert_eq!(line.mode, Mode::Lines);
        assert_eq!(line.x, expected.frequencies);
        assert_eq!(line.y, expected.powers);
        assert_eq!(outcome.figure.layout.xaxis.kind, AxisType::Log);

        assert_eq!(*player.requests.borrow(), vec![AudioKey::new("OSC", "sq_3")]);
        assert_eq!(outcome.playback.unwrap().url, "/audio/sq_3");
        assert!(outcome.playback_error.is_none());
    }

    #[test]
    fn test_center_row_is_ignored() {
        let ctx = fixtures::context();
        let player = RecordingPlayer::new(false);
        let outcome = click(&ctx, &player, Some("cluster_0"));

        assert!(outcome.figure.is_empty());
        assert!(outcome.playback.is_none());
        assert!(player.requests.borrow().is_empty());
    }

    #[test]
    fn test_glyph_click_never_plays_a_namesake_sample() {
        // a real sample shares the glyph label "Saw"
        let base = fixtures::context();
        let mut points = base.points().to_vec();
        points.push(SamplePoint::new("Saw", "OSC", 0.2, 0.2, None));
        let mut spectra = SpectrumTable::new();
        spectra.insert("Saw".to_string(), fixtures::spectrum(0.0));
        let ctx = DataContext::new(base.catalog.clone(), base.view.clone(), points, spectra);

        let selection = Selection { categories: vec![GENRE.to_string()], ..Selection::default() };
        let map = view::render(&ctx, &selection);
        let glyph = map.data.iter().find(|t| t.name.as_deref() == Some(GENRE)).unwrap();
        assert_eq!(glyph.text, vec!["Saw"]);

        let player = RecordingPlayer::new(false);
        let outcome = click(&ctx, &player, glyph.customdata.first().map(String::as_str));

        assert!(outcome.figure.is_empty());
        assert!(outcome.playback.is_none());
        assert!(player.requests.borrow().is_empty());
    }

    #[test]
    fn test_unknown_name_is_a_no_op() {
        let ctx = fixtures::context();
        let player = RecordingPlayer::new(false);
        let outcome = click(&ctx, &player, Some("deleted_sample"));

        assert!(outcome.figure.is_empty());
        assert!(player.requests.borrow().is_empty());
    }

    #[test]
    fn test_no_click_yet() {
        let ctx = fixtures::context();
        let player = RecordingPlayer::new(false);
        let outcome = click(&ctx, &player, None);
        assert!(outcome.figure.is_empty());
        assert!(outcome.playback.is_none());
    }

    #[test]
    fn test_missing_audio_still_draws_spectrum() {
        let ctx = fixtures::context();
        let player = RecordingPlayer::new(true);
        let outcome = click(&ctx, &player, Some("lead_a"));

        assert_eq!(outcome.figure.data.len(), 1, "spectrum must survive a playback failure");
        assert!(outcome.playback.is_none());
        assert!(outcome.playback_error.unwrap().contains("lead_a.wav"));
        assert_eq!(player.requests.borrow().len(), 1);
    }

    #[test]
    fn test_missing_spectrum_still_plays() {
        use crate::catalog::Catalog;
        use crate::config::ViewSettings;
        use crate::model::{SamplePoint, SpectrumTable};

        let ctx = DataContext::new(
            Catalog::default(),
            ViewSettings::default(),
            vec![SamplePoint::new("orphan", "Sample", 0.0, 0.0, None)],
            SpectrumTable::new(),
        );
        let player = RecordingPlayer::new(false);
        let outcome = click(&ctx, &player, Some("orphan"));

        assert!(outcome.figure.is_empty());
        assert!(outcome.playback.is_some());
    }

    #[test]
    fn test_real_store_missing_file() {
        let ctx = fixtures::context();
        let store = crate::audio::AudioStore::new(std::env::temp_dir().join("soundmap_no_such_library"));
        let outcome = click(&ctx, &store, Some("saw_0"));

        assert_eq!(outcome.figure.data.len(), 1);
        assert!(outcome.playback_error.is_some());
    }
}
