//! Paginator — decides batch size and splits problems across pages.
//!
//! # Decision table (priority order)
//! 1. table layout        → total = rows × columns, single page
//! 2. practice-sheet module → total = page_count, one unit per page
//! 3. auto-fit            → per_page from the estimator, × page_count
//! 4. manual              → problems_per_page × page_count
//!
//! Page assignment is strict generation order, `per_page` to a page, last
//! page possibly under-full. There is no reflow after commit: this module is
//! only consulted again when the user regenerates.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::capacity::estimate_capacity;
use crate::layout::measure::MeasureSurface;
use crate::models::problem::{ProblemRecord, WorksheetPage};
use crate::models::settings::{LayoutMode, ModuleSettings, PrintLayoutConfig};

/// Which branch of the decision table produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    Table,
    PracticeSheet,
    AutoFit,
    Manual,
}

/// The sizing decision for one generation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPlan {
    pub mode: PlanMode,
    /// Problems placed on each page (1 for practice sheets).
    pub per_page: u32,
    pub page_count: u32,
    /// Units requested from the generator.
    pub total: u32,
}

/// Evaluates the decision table for one request.
///
/// `sample` is a representative problem for the estimator; the placeholder is
/// used when the caller has none. Settings and config are assumed validated.
pub fn plan_generation(
    practice_sheet: bool,
    settings: &ModuleSettings,
    config: &PrintLayoutConfig,
    surface: &dyn MeasureSurface,
    sample: Option<&ProblemRecord>,
) -> GenerationPlan {
    if config.layout_mode == LayoutMode::Table {
        let per_page = config.rows.saturating_mul(config.columns).max(1);
        return GenerationPlan {
            mode: PlanMode::Table,
            per_page,
            page_count: 1,
            total: per_page,
        };
    }

    if practice_sheet {
        // Whole-page worksheets: one generated unit fills one page.
        return GenerationPlan {
            mode: PlanMode::PracticeSheet,
            per_page: 1,
            page_count: settings.page_count,
            total: settings.page_count,
        };
    }

    if settings.auto_fit {
        let estimate = estimate_capacity(surface, sample, config);
        let per_page = if estimate > 0 {
            estimate
        } else {
            settings.problems_per_page.max(1)
        };
        debug!("auto-fit plan: estimate={estimate}, per_page={per_page}");
        return GenerationPlan {
            mode: PlanMode::AutoFit,
            per_page,
            page_count: settings.page_count,
            total: per_page.saturating_mul(settings.page_count),
        };
    }

    GenerationPlan {
        mode: PlanMode::Manual,
        per_page: settings.problems_per_page,
        page_count: settings.page_count,
        total: settings.problems_per_page.saturating_mul(settings.page_count),
    }
}

/// Partitions problems into ordered pages of `per_page` entries.
///
/// Every problem is placed exactly once, in the order given; the final page
/// may be under-full. Yields `ceil(N / per_page)` pages.
pub fn paginate(problems: &[ProblemRecord], per_page: u32) -> Vec<WorksheetPage> {
    let per_page = per_page.max(1) as usize;
    problems
        .chunks(per_page)
        .enumerate()
        .map(|(index, chunk)| WorksheetPage {
            index: index as u32,
            problems: chunk.to_vec(),
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::measure::DetachedSurface;
    use crate::models::settings::Orientation;

    fn make_problems(n: usize) -> Vec<ProblemRecord> {
        (0..n)
            .map(|i| ProblemRecord {
                question: format!("{i} + {i} ="),
                answer: (2 * i).to_string(),
                category: "addition".to_string(),
                layout: None,
                display: None,
            })
            .collect()
    }

    #[test]
    fn test_table_mode_is_rows_times_columns_on_one_page() {
        let settings = ModuleSettings {
            auto_fit: true, // ignored in table mode
            problems_per_page: 99,
            page_count: 5,
            ..Default::default()
        };
        let config = PrintLayoutConfig {
            layout_mode: LayoutMode::Table,
            rows: 4,
            columns: 3,
            ..Default::default()
        };
        let plan = plan_generation(false, &settings, &config, &DetachedSurface, None);
        assert_eq!(plan.mode, PlanMode::Table);
        assert_eq!(plan.total, 12);
        assert_eq!(plan.page_count, 1);
    }

    #[test]
    fn test_practice_sheet_counts_pages_not_problems() {
        let settings = ModuleSettings {
            page_count: 4,
            problems_per_page: 30,
            ..Default::default()
        };
        let plan = plan_generation(
            true,
            &settings,
            &PrintLayoutConfig::default(),
            &DetachedSurface,
            None,
        );
        assert_eq!(plan.mode, PlanMode::PracticeSheet);
        assert_eq!(plan.total, 4);
        assert_eq!(plan.per_page, 1);
        assert_eq!(plan.page_count, 4);
    }

    #[test]
    fn test_auto_fit_uses_fallback_capacity_on_detached_surface() {
        let settings = ModuleSettings {
            auto_fit: true,
            page_count: 2,
            ..Default::default()
        };
        let plan = plan_generation(
            false,
            &settings,
            &PrintLayoutConfig::default(),
            &DetachedSurface,
            None,
        );
        assert_eq!(plan.mode, PlanMode::AutoFit);
        assert_eq!(plan.per_page, 20, "detached surface degrades to 20");
        assert_eq!(plan.total, 40);
    }

    #[test]
    fn test_manual_mode_multiplies_pages() {
        let settings = ModuleSettings {
            problems_per_page: 20,
            page_count: 3,
            ..Default::default()
        };
        let plan = plan_generation(
            false,
            &settings,
            &PrintLayoutConfig::default(),
            &DetachedSurface,
            None,
        );
        assert_eq!(plan.mode, PlanMode::Manual);
        assert_eq!(plan.total, 60);
        assert_eq!(plan.per_page, 20);
        assert_eq!(plan.page_count, 3);
    }

    #[test]
    fn test_landscape_flow_still_plans() {
        let settings = ModuleSettings {
            auto_fit: true,
            ..Default::default()
        };
        let config = PrintLayoutConfig {
            orientation: Orientation::Landscape,
            ..Default::default()
        };
        let plan = plan_generation(
            false,
            &settings,
            &config,
            &crate::layout::measure::TextHeuristicSurface,
            None,
        );
        assert!(plan.per_page >= 1);
        assert!(plan.total >= plan.per_page);
    }

    #[test]
    fn test_paginate_places_every_problem_once_in_order() {
        let problems = make_problems(47);
        let pages = paginate(&problems, 10);
        assert_eq!(pages.len(), 5, "ceil(47/10)");

        let flattened: Vec<&ProblemRecord> =
            pages.iter().flat_map(|p| p.problems.iter()).collect();
        assert_eq!(flattened.len(), 47);
        for (original, placed) in problems.iter().zip(flattened) {
            assert_eq!(original, placed);
        }
        assert_eq!(pages.last().unwrap().problems.len(), 7, "last page under-full");
    }

    #[test]
    fn test_paginate_exact_multiple_has_full_last_page() {
        let pages = paginate(&make_problems(60), 20);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.problems.len() == 20));
    }

    #[test]
    fn test_paginate_empty_list_is_zero_pages() {
        assert!(paginate(&[], 10).is_empty());
    }

    #[test]
    fn test_paginate_guards_zero_per_page() {
        let pages = paginate(&make_problems(3), 0);
        assert_eq!(pages.len(), 3, "per_page 0 treated as 1");
    }

    #[test]
    fn test_page_indices_are_sequential() {
        let pages = paginate(&make_problems(25), 10);
        let indices: Vec<u32> = pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
