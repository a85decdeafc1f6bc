//! Measurement surface — the oracle the capacity estimator reads heights from.
//!
//! In the browser original this is a live DOM container: a hidden probe node
//! is inserted, measured, and removed. Here the oracle sits behind a trait so
//! the estimator stays a pure function of its inputs: the service backs it
//! with a text heuristic, tests back it with fixed values, and a detached
//! surface reproduces the "container never attached" failure path.

use crate::layout::capacity::REM_PX;
use crate::models::problem::{ProblemLayout, ProblemRecord};
use crate::models::settings::{Orientation, PrintLayoutConfig};

/// One probed sample problem. Margins are `None` when the surface cannot
/// compute styles; the estimator substitutes its fixed fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleMetrics {
    pub height_px: f32,
    pub margin_top_px: Option<f32>,
    pub margin_bottom_px: Option<f32>,
}

/// Height oracle for one page's problem container.
///
/// Both calls return `None` when the surface is detached or cannot be
/// measured; the estimator degrades to its fixed default, never an error.
/// Implementations must be side-effect free across calls.
pub trait MeasureSurface: Send + Sync {
    /// Height in px of the content area that will hold problems.
    fn container_height(&self, config: &PrintLayoutConfig) -> Option<f32>;

    /// Rendered size of one sample problem under the given config.
    fn probe_sample(&self, sample: &ProblemRecord, config: &PrintLayoutConfig)
        -> Option<SampleMetrics>;
}

// ────────────────────────────────────────────────────────────────────────────
// Text heuristic surface
// ────────────────────────────────────────────────────────────────────────────

/// A4 paper heights at 96 dpi.
const PAGE_HEIGHT_PORTRAIT_PX: f32 = 1123.0;
const PAGE_HEIGHT_LANDSCAPE_PX: f32 = 794.0;
/// Line height as a multiple of the configured font size.
const LINE_HEIGHT_FACTOR: f32 = 1.5;
/// Extra lines a vertically stacked problem occupies (second operand + rule).
const VERTICAL_EXTRA_LINES: usize = 2;

/// Estimates heights from markup text instead of a layout engine.
///
/// A problem's height is its markup line count times the configured line
/// height, scaled by the print scale. Margins are not computable without a
/// style system, so they are reported as `None` and the estimator's 16 px
/// fallback applies — same degradation the original shows in a non-browser
/// test harness.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextHeuristicSurface;

impl TextHeuristicSurface {
    fn page_height(config: &PrintLayoutConfig) -> f32 {
        match config.orientation {
            Orientation::Portrait => PAGE_HEIGHT_PORTRAIT_PX,
            Orientation::Landscape => PAGE_HEIGHT_LANDSCAPE_PX,
        }
    }

    fn sample_lines(sample: &ProblemRecord) -> usize {
        let mut lines = sample.question.lines().filter(|l| !l.trim().is_empty()).count().max(1);
        if sample.layout == Some(ProblemLayout::Vertical) {
            lines += VERTICAL_EXTRA_LINES;
        }
        lines
    }
}

impl MeasureSurface for TextHeuristicSurface {
    fn container_height(&self, config: &PrintLayoutConfig) -> Option<f32> {
        let margin_px = config.page_margin * REM_PX;
        Some(Self::page_height(config) - 2.0 * margin_px)
    }

    fn probe_sample(
        &self,
        sample: &ProblemRecord,
        config: &PrintLayoutConfig,
    ) -> Option<SampleMetrics> {
        let lines = Self::sample_lines(sample) as f32;
        Some(SampleMetrics {
            height_px: lines * config.font_size * LINE_HEIGHT_FACTOR * config.scale,
            margin_top_px: None,
            margin_bottom_px: None,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Detached surface
// ────────────────────────────────────────────────────────────────────────────

/// The "container was never attached" case: every measurement fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedSurface;

impl MeasureSurface for DetachedSurface {
    fn container_height(&self, _config: &PrintLayoutConfig) -> Option<f32> {
        None
    }

    fn probe_sample(
        &self,
        _sample: &ProblemRecord,
        _config: &PrintLayoutConfig,
    ) -> Option<SampleMetrics> {
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_height_subtracts_page_margins() {
        let config = PrintLayoutConfig {
            page_margin: 2.0,
            ..Default::default()
        };
        let height = TextHeuristicSurface.container_height(&config).unwrap();
        assert!((height - (1123.0 - 64.0)).abs() < 1e-3);
    }

    #[test]
    fn test_landscape_container_is_shorter() {
        let portrait = PrintLayoutConfig::default();
        let landscape = PrintLayoutConfig {
            orientation: Orientation::Landscape,
            ..Default::default()
        };
        let surface = TextHeuristicSurface;
        assert!(
            surface.container_height(&landscape).unwrap()
                < surface.container_height(&portrait).unwrap()
        );
    }

    #[test]
    fn test_probe_height_scales_with_line_count() {
        let surface = TextHeuristicSurface;
        let config = PrintLayoutConfig::default();
        let one_line = ProblemRecord::placeholder();
        let mut three_lines = ProblemRecord::placeholder();
        three_lines.question = "12\n+ 34\n____".to_string();
        let short = surface.probe_sample(&one_line, &config).unwrap();
        let tall = surface.probe_sample(&three_lines, &config).unwrap();
        assert!((tall.height_px - 3.0 * short.height_px).abs() < 1e-3);
    }

    #[test]
    fn test_vertical_layout_adds_lines() {
        let surface = TextHeuristicSurface;
        let config = PrintLayoutConfig::default();
        let mut vertical = ProblemRecord::placeholder();
        vertical.layout = Some(ProblemLayout::Vertical);
        let flat = surface.probe_sample(&ProblemRecord::placeholder(), &config).unwrap();
        let stacked = surface.probe_sample(&vertical, &config).unwrap();
        assert!(stacked.height_px > flat.height_px);
    }

    #[test]
    fn test_heuristic_margins_are_uncomputable() {
        let metrics = TextHeuristicSurface
            .probe_sample(&ProblemRecord::placeholder(), &PrintLayoutConfig::default())
            .unwrap();
        assert!(metrics.margin_top_px.is_none());
        assert!(metrics.margin_bottom_px.is_none());
    }

    #[test]
    fn test_detached_surface_measures_nothing() {
        let config = PrintLayoutConfig::default();
        assert!(DetachedSurface.container_height(&config).is_none());
        assert!(DetachedSurface
            .probe_sample(&ProblemRecord::placeholder(), &config)
            .is_none());
    }
}
