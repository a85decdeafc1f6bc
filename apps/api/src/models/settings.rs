//! Settings model — the per-request configuration records.
//!
//! `PrintLayoutConfig` is the print-layout snapshot read by the capacity
//! estimator and the paginator. `ModuleSettings` carries the per-module knobs
//! (counts, difficulty, word-problem mode). Both arrive over the wire and are
//! never mutated by the core — handlers pass read-only snapshots down.

use serde::{Deserialize, Serialize};

/// Upper bound on problems per page a single request may ask for.
pub const MAX_PROBLEMS_PER_PAGE: u32 = 100;
/// Upper bound on pages a single request may ask for.
pub const MAX_PAGE_COUNT: u32 = 50;
/// Upper bound on `max_value` (also caps the counting sheet's symbol runs).
pub const MAX_VALUE_LIMIT: u32 = 1000;

// ────────────────────────────────────────────────────────────────────────────
// Print layout
// ────────────────────────────────────────────────────────────────────────────

/// How problems are laid out on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Problems flow down each column; capacity is measured.
    Flow,
    /// Fixed `rows × columns` grid; capacity is deterministic, single page.
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Layout parameters for one printed worksheet page.
///
/// Spacing fields (`column_gap`, `problem_spacing`, `page_margin`) are in
/// rem-like units; the estimator converts them at a fixed 16 px per unit.
/// `font_size` is in pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintLayoutConfig {
    pub layout_mode: LayoutMode,
    pub columns: u32,
    /// Only meaningful in table mode.
    pub rows: u32,
    pub column_gap: f32,
    pub problem_spacing: f32,
    pub page_margin: f32,
    pub font_size: f32,
    pub orientation: Orientation,
    pub scale: f32,
}

impl Default for PrintLayoutConfig {
    fn default() -> Self {
        PrintLayoutConfig {
            layout_mode: LayoutMode::Flow,
            columns: 2,
            rows: 4,
            column_gap: 1.0,
            problem_spacing: 1.0,
            page_margin: 2.0,
            font_size: 16.0,
            orientation: Orientation::Portrait,
            scale: 1.0,
        }
    }
}

impl PrintLayoutConfig {
    /// Checks the structural invariants: `columns >= 1` always, `rows >= 1`
    /// when the layout is a table.
    pub fn validate(&self) -> Result<(), String> {
        if self.columns == 0 {
            return Err("columns must be at least 1".to_string());
        }
        if self.layout_mode == LayoutMode::Table && self.rows == 0 {
            return Err("rows must be at least 1 in table layout".to_string());
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err("scale must be a positive number".to_string());
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Module settings
// ────────────────────────────────────────────────────────────────────────────

/// Per-module generation settings.
///
/// All fields are defaulted so clients send only what they touch. Modules
/// read the knobs they care about and reject combinations they cannot
/// satisfy (see `GeneratorError`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleSettings {
    /// Problems per page in manual mode; also the auto-fit fallback.
    pub problems_per_page: u32,
    pub page_count: u32,
    /// When true, per-page capacity comes from the estimator.
    pub auto_fit: bool,
    /// When true, the batch is produced by the AI word-problem source.
    pub word_problems: bool,
    /// Operand digit count for the arithmetic modules (1–6).
    pub digits: u8,
    /// Allow negative results (subtraction).
    pub allow_negative: bool,
    /// Upper bound for counting / word-problem quantities.
    pub max_value: u32,
    /// Largest denominator the fraction module may draw.
    pub max_denominator: u32,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        ModuleSettings {
            problems_per_page: 20,
            page_count: 1,
            auto_fit: false,
            word_problems: false,
            digits: 2,
            allow_negative: false,
            max_value: 20,
            max_denominator: 12,
        }
    }
}

impl ModuleSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.page_count == 0 {
            return Err("page_count must be at least 1".to_string());
        }
        if self.problems_per_page == 0 {
            return Err("problems_per_page must be at least 1".to_string());
        }
        if self.page_count > MAX_PAGE_COUNT {
            return Err(format!("page_count must be at most {MAX_PAGE_COUNT}"));
        }
        if self.problems_per_page > MAX_PROBLEMS_PER_PAGE {
            return Err(format!(
                "problems_per_page must be at most {MAX_PROBLEMS_PER_PAGE}"
            ));
        }
        if self.max_value > MAX_VALUE_LIMIT {
            return Err(format!("max_value must be at most {MAX_VALUE_LIMIT}"));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_print_config_is_valid() {
        assert!(PrintLayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_columns_rejected() {
        let config = PrintLayoutConfig {
            columns: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_rows_rejected_only_in_table_mode() {
        let flow = PrintLayoutConfig {
            rows: 0,
            ..Default::default()
        };
        assert!(flow.validate().is_ok(), "rows unused in flow layout");

        let table = PrintLayoutConfig {
            layout_mode: LayoutMode::Table,
            rows: 0,
            ..Default::default()
        };
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_settings_deserialize_with_partial_body() {
        let settings: ModuleSettings =
            serde_json::from_str(r#"{"page_count": 3, "auto_fit": true}"#).unwrap();
        assert_eq!(settings.page_count, 3);
        assert!(settings.auto_fit);
        assert_eq!(settings.problems_per_page, 20, "untouched fields default");
    }

    #[test]
    fn test_zero_page_count_rejected() {
        let settings = ModuleSettings {
            page_count: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_oversized_counts_rejected() {
        let settings = ModuleSettings {
            problems_per_page: u32::MAX,
            page_count: u32::MAX,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = ModuleSettings {
            page_count: MAX_PAGE_COUNT + 1,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = ModuleSettings {
            problems_per_page: MAX_PROBLEMS_PER_PAGE + 1,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_oversized_max_value_rejected() {
        let settings = ModuleSettings {
            max_value: MAX_VALUE_LIMIT + 1,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_counts_at_the_caps_accepted() {
        let settings = ModuleSettings {
            problems_per_page: MAX_PROBLEMS_PER_PAGE,
            page_count: MAX_PAGE_COUNT,
            max_value: MAX_VALUE_LIMIT,
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
    }
}
