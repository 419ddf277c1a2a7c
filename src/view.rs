//! Sound map view synchronization
//!
//! The sidebar has three controls feeding one plot: the category checklist,
//! the "All" toggle and the sample-name search. Every interaction sends the
//! current value of all three plus which control fired, and gets back the
//! corrected toggle values and a freshly drawn map.
//!
//! # Toggle rule
//!
//! Exactly one toggle is authoritative per event, chosen by the trigger:
//!
//! | Trigger | Checklist | "All" |
//! |---------|-----------|-------|
//! | `Category` | passed through | `true` iff checklist == every label |
//! | `SelectAll`, `Initial` | every label if "All", else empty | passed through |
//! | `Search` | passed through | passed through |
//!
//! The rule is a pure function of the trigger and the incoming values, so
//! the result never depends on the order in which a UI runtime delivers
//! events, and writing the corrected values back cannot cause another round.
//!
//! # Drawing
//!
//! 1. One marker series per checked category, catalog order, catalog color.
//! 2. If `Genre` is checked, one translucent labelled glyph per cluster whose
//!    member count is strictly above the threshold, sized by that count.
//! 3. If the search is non-empty, one highlight series with exactly the
//!    matching samples, whether or not their category is checked.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::catalog::{Catalog, GENRE};
use crate::figure::{Figure, Layout, Marker, Mode, Trace};
use crate::model::{DataContext, SamplePoint};

/// Which control produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Category,
    SelectAll,
    Search,
    Initial,
}

/// Values of the three sidebar controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub categories: Vec<String>,
    pub select_all: bool,
    pub search: Vec<String>,
}

impl Selection {
    /// Apply the toggle rule for `trigger`.
    pub fn reconcile(mut self, trigger: Trigger, catalog: &Catalog) -> Self {
        match trigger {
            Trigger::Category => {
                let chosen: BTreeSet<String> = self.categories.iter().cloned().collect();
                self.select_all = chosen == catalog.labels();
            }
            Trigger::SelectAll | Trigger::Initial => {
                self.categories = if self.select_all {
                    catalog.ordered_labels()
                } else {
                    Vec::new()
                };
            }
            Trigger::Search => {}
        }
        self
    }
}

/// Corrected control values plus the map to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOutput {
    pub categories: Vec<String>,
    pub select_all: bool,
    pub figure: Figure,
}

/// One interaction: reconcile the toggles, then redraw.
pub fn update(ctx: &DataContext, selection: Selection, trigger: Trigger) -> ViewOutput {
    let selection = selection.reconcile(trigger, &ctx.catalog);
    let figure = render(ctx, &selection);
    log::debug!(
        "view {:?}: {} categories, all={}, {} search terms, {} traces",
        trigger,
        selection.categories.len(),
        selection.select_all,
        selection.search.len(),
        figure.data.len()
    );
    ViewOutput {
        categories: selection.categories,
        select_all: selection.select_all,
        figure,
    }
}

/// Draw the map for an already reconciled selection.
pub fn render(ctx: &DataContext, selection: &Selection) -> Figure {
    let mut figure = Figure::new(Layout::sound_map(ctx.view.axis_range));
    let checked: HashSet<&str> = selection.categories.iter().map(String::as_str).collect();

    for category in &ctx.catalog.categories {
        if category.label == GENRE || !checked.contains(category.label.as_str()) {
            continue;
        }
        let members: Vec<&SamplePoint> = ctx
            .points()
            .iter()
            .filter(|p| p.group == category.label)
            .collect();
        figure.add_trace(
            point_trace(&members)
                .with_name(&category.label)
                .with_marker(Marker::color(&category.color)),
        );
    }

    if checked.contains(GENRE) {
        add_cluster_glyphs(ctx, &mut figure);
    }

    if !selection.search.is_empty() {
        let terms: HashSet<&str> = selection.search.iter().map(String::as_str).collect();
        let hits: Vec<&SamplePoint> = ctx
            .points()
            .iter()
            .filter(|p| !p.is_center() && terms.contains(p.name.as_str()))
            .collect();
        figure.add_trace(point_trace(&hits).with_name("Search Result").with_marker(Marker {
            color: Some(ctx.view.highlight_color.clone()),
            size: Some(ctx.view.highlight_size),
            opacity: None,
        }));
    }

    figure
}

fn point_trace(points: &[&SamplePoint]) -> Trace {
    Trace::scatter(
        Mode::Markers,
        points.iter().map(|p| p.x).collect(),
        points.iter().map(|p| p.y).collect(),
    )
    .with_hover_text(points.iter().map(|p| p.name.clone()).collect())
    .with_click_keys(points.iter().map(|p| p.name.clone()).collect())
}

fn add_cluster_glyphs(ctx: &DataContext, figure: &mut Figure) {
    let settings = &ctx.view;
    for cluster in ctx.clusters() {
        if cluster.member_count <= settings.genre_min_members {
            continue;
        }
        let (Some((x, y)), Some(center_name)) = (cluster.center, &cluster.center_name) else {
            log::debug!("Cluster {} has no center row, skipping glyph", cluster.id);
            continue;
        };

        let mut glyph = Trace::scatter(Mode::MarkersText, vec![x], vec![y])
            .with_name(GENRE)
            .with_marker(Marker {
                color: Some(cluster.color.clone()),
                size: Some(cluster.member_count as f64 * settings.genre_size_scale),
                opacity: Some(settings.genre_opacity),
            });
        glyph.text = vec![cluster.display_name.clone()];
        glyph.customdata = vec![center_name.clone()];
        glyph.textposition = Some("top center".to_string());
        glyph.hoverinfo = Some("skip".to_string());
        figure.add_trace(glyph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, CENTER};
    use crate::config::ViewSettings;
    use crate::model::{fixtures, SpectrumTable};

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn drawn_names(figure: &Figure) -> BTreeSet<String> {
        figure
            .data
            .iter()
            .filter(|t| t.name.as_deref() != Some(GENRE))
            .flat_map(|t| t.text.iter().cloned())
            .collect()
    }

    fn series_names(figure: &Figure) -> Vec<String> {
        figure.data.iter().filter_map(|t| t.name.clone()).collect()
    }

    // ==========================================================================
    // TOGGLE RULE
    // ==========================================================================
    //
    // The checklist and the "All" toggle must never disagree after an event,
    // and which one wins depends only on the trigger.
    // ==========================================================================

    #[test]
    fn test_checklist_subsets_drive_select_all() {
        let ctx = fixtures::context();
        let all = ctx.catalog.ordered_labels();

        for mask in 0u32..(1 << all.len()) {
            let subset: Vec<String> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, l)| l.clone())
                .collect();
            let is_full = subset.len() == all.len();

            for prior in [true, false] {
                let out = Selection { categories: subset.clone(), select_all: prior, search: vec![] }
                    .reconcile(Trigger::Category, &ctx.catalog);
                assert_eq!(out.select_all, is_full, "subset {:?}", subset);
                assert_eq!(out.categories, subset, "checklist passes through unchanged");
            }
        }
    }

    #[test]
    fn test_checklist_order_does_not_matter() {
        let ctx = fixtures::context();
        let mut reversed = ctx.catalog.ordered_labels();
        reversed.reverse();
        let out = Selection { categories: reversed, ..Default::default() }
            .reconcile(Trigger::Category, &ctx.catalog);
        assert!(out.select_all);
    }

    #[test]
    fn test_unknown_label_is_not_full() {
        let ctx = fixtures::context();
        let mut categories = ctx.catalog.ordered_labels();
        categories.push("KOMPLETE".to_string());
        let out = Selection { categories, ..Default::default() }
            .reconcile(Trigger::Category, &ctx.catalog);
        assert!(!out.select_all);
    }

    #[test]
    fn test_select_all_overrides_checklist() {
        let ctx = fixtures::context();
        for prior in [vec![], labels(&["OSC"]), ctx.catalog.ordered_labels()] {
            let on = Selection { categories: prior.clone(), select_all: true, search: vec![] }
                .reconcile(Trigger::SelectAll, &ctx.catalog);
            assert_eq!(on.categories, ctx.catalog.ordered_labels());
            assert!(on.select_all);

            let off = Selection { categories: prior, select_all: false, search: vec![] }
                .reconcile(Trigger::SelectAll, &ctx.catalog);
            assert!(off.categories.is_empty());
            assert!(!off.select_all);
        }
    }

    #[test]
    fn test_initial_load_follows_select_all_rule() {
        let ctx = fixtures::context();
        let out = Selection { categories: labels(&["OSC"]), select_all: false, search: vec![] }
            .reconcile(Trigger::Initial, &ctx.catalog);
        assert!(out.categories.is_empty());

        let out = Selection { categories: vec![], select_all: true, search: vec![] }
            .reconcile(Trigger::Initial, &ctx.catalog);
        assert_eq!(out.categories.len(), ctx.catalog.categories.len());
    }

    #[test]
    fn test_search_leaves_toggles_alone() {
        let ctx = fixtures::context();
        let before = Selection {
            categories: labels(&["OSC"]),
            select_all: true,
            search: labels(&["saw_1"]),
        };
        let after = before.clone().reconcile(Trigger::Search, &ctx.catalog);
        assert_eq!(after, before);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let ctx = fixtures::context();
        for trigger in [Trigger::Category, Trigger::SelectAll, Trigger::Search, Trigger::Initial] {
            let once = Selection { categories: labels(&["Sample", "Leads"]), select_all: true, search: vec![] }
                .reconcile(trigger, &ctx.catalog);
            let twice = once.clone().reconcile(trigger, &ctx.catalog);
            assert_eq!(once, twice, "{:?}", trigger);
        }
    }

    // ==========================================================================
    // DRAWN POINTS
    // ==========================================================================

    #[test]
    fn test_drawn_points_are_category_union_search() {
        let ctx = fixtures::context();
        let out = update(
            &ctx,
            Selection {
                categories: labels(&["OSC"]),
                select_all: false,
                search: labels(&["saw_3", "lead_a"]),
            },
            Trigger::Search,
        );

        let mut expected: BTreeSet<String> = (0..10).map(|i| format!("sq_{i}")).collect();
        expected.insert("saw_3".to_string());
        expected.insert("lead_a".to_string());
        assert_eq!(drawn_names(&out.figure), expected);
    }

    #[test]
    fn test_search_results_visible_when_category_unchecked() {
        let ctx = fixtures::context();
        let out = update(
            &ctx,
            Selection { categories: vec![], select_all: false, search: labels(&["saw_7"]) },
            Trigger::Category,
        );

        assert_eq!(out.figure.data.len(), 1);
        let hit = &out.figure.data[0];
        assert_eq!(hit.name.as_deref(), Some("Search Result"));
        assert_eq!(hit.text, vec!["saw_7"]);
        assert_eq!(hit.x, vec![0.01 * 7.0]);
        let marker = hit.marker.as_ref().unwrap();
        assert_eq!(marker.color.as_deref(), Some("red"));
        assert_eq!(marker.size, Some(15.0));
    }

    #[test]
    fn test_search_never_highlights_center_rows() {
        let ctx = fixtures::context();
        let figure = render(
            &ctx,
            &Selection { search: labels(&["cluster_0", "missing"]), ..Default::default() },
        );
        assert_eq!(figure.data.len(), 1);
        assert!(figure.data[0].x.is_empty());
    }

    #[test]
    fn test_category_traces_follow_catalog_order_and_color() {
        let ctx = fixtures::context();
        // checklist order is deliberately reversed
        let figure = render(
            &ctx,
            &Selection { categories: labels(&["Leads", "Sample"]), ..Default::default() },
        );

        assert_eq!(series_names(&figure), vec!["Sample", "Leads"]);
        let sample = &figure.data[0];
        assert_eq!(sample.x.len(), 12);
        assert_eq!(sample.marker.as_ref().unwrap().color.as_deref(), Some("#EFCAD6"));
        assert_eq!(sample.hovertemplate.as_deref(), Some("%{text}"));
        assert!(!sample.showlegend);
    }

    #[test]
    fn test_empty_selection_draws_nothing() {
        let ctx = fixtures::context();
        let out = update(&ctx, Selection::default(), Trigger::Category);
        assert!(out.figure.is_empty());
        assert!(!out.select_all);
        assert_eq!(out.figure.layout, Layout::sound_map(1.1));
    }

    #[test]
    fn test_reference_example() {
        let catalog = Catalog {
            categories: vec![
                Category { label: "Sample".into(), color: "#EFCAD6".into() },
                Category { label: "OSC".into(), color: "#658080".into() },
                Category { label: "Leads".into(), color: "#70C5CA".into() },
            ],
            ..Catalog::default()
        };
        let points = vec![
            SamplePoint::new("s", "Sample", 0.0, 0.0, None),
            SamplePoint::new("o", "OSC", 0.1, 0.1, None),
            SamplePoint::new("l", "Leads", 0.2, 0.2, None),
        ];
        let ctx = DataContext::new(catalog, ViewSettings::default(), points, SpectrumTable::new());

        let all = update(&ctx, Selection { select_all: true, ..Default::default() }, Trigger::SelectAll);
        assert_eq!(all.categories, labels(&["Sample", "OSC", "Leads"]));

        let mut categories = all.categories.clone();
        categories.retain(|c| c != "Leads");
        let out = update(
            &ctx,
            Selection { categories, select_all: all.select_all, search: vec![] },
            Trigger::Category,
        );

        assert!(!out.select_all);
        assert_eq!(series_names(&out.figure), vec!["Sample", "OSC"]);
    }

    // ==========================================================================
    // GENRE GLYPHS
    // ==========================================================================
    //
    // Fixture: cluster 0 has 13 members, cluster 1 has exactly 10.
    // ==========================================================================

    fn glyphs(figure: &Figure) -> Vec<&Trace> {
        figure.data.iter().filter(|t| t.name.as_deref() == Some(GENRE)).collect()
    }

    #[test]
    fn test_glyphs_only_when_genre_checked() {
        let ctx = fixtures::context();
        let without = render(&ctx, &Selection { categories: labels(&["Sample"]), ..Default::default() });
        assert!(glyphs(&without).is_empty());

        let with = render(&ctx, &Selection { categories: labels(&[GENRE]), ..Default::default() });
        assert_eq!(glyphs(&with).len(), 1, "only the 13-member cluster clears the threshold");
    }

    #[test]
    fn test_glyph_shape() {
        let ctx = fixtures::context();
        let figure = render(&ctx, &Selection { categories: labels(&[GENRE]), ..Default::default() });
        let glyph = glyphs(&figure)[0];

        assert_eq!(glyph.mode, Mode::MarkersText);
        assert_eq!((glyph.x[0], glyph.y[0]), (0.1, 0.4));
        assert_eq!(glyph.text, vec!["Saw"]);
        assert_eq!(glyph.customdata, vec!["cluster_0"]);
        assert_eq!(glyph.textposition.as_deref(), Some("top center"));
        assert_eq!(glyph.hoverinfo.as_deref(), Some("skip"));
        assert!(glyph.hovertemplate.is_none());

        let marker = glyph.marker.as_ref().unwrap();
        assert_eq!(marker.size, Some(13.0 * 1.5));
        assert_eq!(marker.opacity, Some(0.2));
        assert_eq!(marker.color.as_deref(), Some("black"));
    }

    fn cluster_of(size: usize) -> DataContext {
        let mut points: Vec<SamplePoint> = (0..size)
            .map(|i| SamplePoint::new(&format!("p{i}"), "Sample", 0.0, 0.0, Some(5)))
            .collect();
        points.push(SamplePoint::new("cluster_5", CENTER, 0.3, 0.3, Some(5)));
        DataContext::new(Catalog::default(), ViewSettings::default(), points, SpectrumTable::new())
    }

    #[test]
    fn test_glyph_threshold_boundary() {
        let genre = Selection { categories: labels(&[GENRE]), ..Default::default() };
        assert!(glyphs(&render(&cluster_of(10), &genre)).is_empty(), "10 members is excluded");
        assert_eq!(glyphs(&render(&cluster_of(11), &genre)).len(), 1, "11 members is included");
    }

    #[test]
    fn test_cluster_without_center_is_skipped() {
        let points: Vec<SamplePoint> = (0..20)
            .map(|i| SamplePoint::new(&format!("p{i}"), "Sample", 0.0, 0.0, Some(2)))
            .collect();
        let ctx = DataContext::new(Catalog::default(), ViewSettings::default(), points, SpectrumTable::new());
        let figure = render(&ctx, &Selection { categories: labels(&[GENRE]), ..Default::default() });
        assert!(figure.is_empty());
    }

    #[test]
    fn test_out_of_range_cluster_does_not_break_redraw() {
        let mut points: Vec<SamplePoint> = (0..20)
            .map(|i| SamplePoint::new(&format!("p{i}"), "Sample", 0.0, 0.0, Some(77)))
            .collect();
        points.push(SamplePoint::new("cluster_77", CENTER, 0.0, 0.0, Some(77)));
        let ctx = DataContext::new(Catalog::default(), ViewSettings::default(), points, SpectrumTable::new());

        let out = update(&ctx, Selection { select_all: true, ..Default::default() }, Trigger::SelectAll);
        assert!(glyphs(&out.figure).is_empty());
        assert!(out.figure.data.iter().any(|t| t.name.as_deref() == Some("Sample")));
    }

    #[test]
    fn test_update_is_deterministic() {
        let ctx = fixtures::context();
        let input = Selection { categories: vec![], select_all: true, search: labels(&["sq_2"]) };
        let a = update(&ctx, input.clone(), Trigger::SelectAll);
        let b = update(&ctx, input, Trigger::SelectAll);
        assert_eq!(a, b);
    }
}
