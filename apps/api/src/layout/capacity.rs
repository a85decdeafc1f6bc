//! Capacity estimator — how many problems of typical size fit one page.
//!
//! Flow layouts only; table layouts are decided deterministically by the
//! paginator and never reach this module. Every failure path (detached
//! surface, non-finite or non-positive heights) degrades to a fixed default
//! instead of erroring, and the result is always at least 1.

use tracing::debug;

use crate::layout::measure::MeasureSurface;
use crate::models::problem::ProblemRecord;
use crate::models::settings::PrintLayoutConfig;

/// Fixed rem→px conversion. The original hardcodes 16 px per unit instead of
/// reading the real root font size; preserved as-is.
pub const REM_PX: f32 = 16.0;
/// Per-side margin substitute when the surface cannot compute styles.
pub const FALLBACK_MARGIN_PX: f32 = 16.0;
/// Capacity used when measurement fails entirely.
pub const FALLBACK_CAPACITY: u32 = 20;

/// Estimates how many problems fit one page under `config`.
///
/// Probes one sample problem (the placeholder when none is supplied),
/// divides the container height by the sample's slot height (height +
/// margins + configured spacing in px), and scales linearly by the column
/// count. Guarantees a positive, finite integer: minimum 1, and
/// [`FALLBACK_CAPACITY`] whenever the surface cannot be measured.
pub fn estimate_capacity(
    surface: &dyn MeasureSurface,
    sample: Option<&ProblemRecord>,
    config: &PrintLayoutConfig,
) -> u32 {
    let Some(container_height) = surface.container_height(config) else {
        debug!("capacity probe: no container, using fallback {FALLBACK_CAPACITY}");
        return FALLBACK_CAPACITY;
    };
    if !container_height.is_finite() || container_height <= 0.0 {
        debug!("capacity probe: degenerate container height {container_height}, using fallback");
        return FALLBACK_CAPACITY;
    }

    let placeholder;
    let sample = match sample {
        Some(record) => record,
        None => {
            placeholder = ProblemRecord::placeholder();
            &placeholder
        }
    };

    let Some(metrics) = surface.probe_sample(sample, config) else {
        debug!("capacity probe: sample not measurable, using fallback {FALLBACK_CAPACITY}");
        return FALLBACK_CAPACITY;
    };
    if !metrics.height_px.is_finite() || metrics.height_px <= 0.0 {
        return FALLBACK_CAPACITY;
    }

    let margins = metrics.margin_top_px.unwrap_or(FALLBACK_MARGIN_PX)
        + metrics.margin_bottom_px.unwrap_or(FALLBACK_MARGIN_PX);
    let spacing_px = config.problem_spacing.max(0.0) * REM_PX;
    let slot_height = metrics.height_px + margins + spacing_px;

    let per_column = (container_height / slot_height).floor().max(0.0) as u64;
    let capacity = per_column.saturating_mul(u64::from(config.columns.max(1)));

    capacity.clamp(1, u64::from(u32::MAX)) as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
