//! Problem and worksheet data model.
//!
//! `ProblemRecord` is immutable once a generator produces it. `WorksheetState`
//! is the committed output of one successful generation batch; the store
//! replaces it wholesale (or appends) on success and never exposes a partial
//! batch. Each batch is partitioned into pages at its own per-page figure when
//! it commits; neither later layout changes nor appended batches repaginate
//! what is already there — the user regenerates.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::layout::paginator::paginate;
use crate::models::settings::LayoutMode;

// ────────────────────────────────────────────────────────────────────────────
// Problem record
// ────────────────────────────────────────────────────────────────────────────

/// A single generated problem.
///
/// `question` is markup for the renderer; `answer` is the solution as text.
/// `layout` lets a module override how one problem is typeset; `display` is
/// optional auxiliary content (e.g. the object drawn on a counting sheet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub question: String,
    pub answer: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<ProblemLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemLayout {
    Horizontal,
    Vertical,
    Grid,
}

impl ProblemRecord {
    /// Minimal sample used when the estimator has no real problem to probe.
    pub fn placeholder() -> Self {
        ProblemRecord {
            question: "0 + 0 =".to_string(),
            answer: "0".to_string(),
            category: "placeholder".to_string(),
            layout: None,
            display: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Worksheet state
// ────────────────────────────────────────────────────────────────────────────

/// One rendered page worth of problems, in generation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetPage {
    pub index: u32,
    pub problems: Vec<ProblemRecord>,
}

/// The committed worksheet. Empty at startup and after a reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorksheetState {
    /// Id of the batch that last wrote this state, if any.
    pub batch_id: Option<Uuid>,
    pub module: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    pub problems: Vec<ProblemRecord>,
    /// Page partition, frozen per batch at commit time.
    pub pages: Vec<WorksheetPage>,
    /// Per-page figure of the most recent batch. Zero when empty.
    pub per_page: u32,
    /// Always equals `pages.len()`.
    pub page_count: u32,
    pub layout_mode: Option<LayoutMode>,
    pub generated_at: Option<DateTime<Utc>>,
}

/// A successful batch handed to the store by the pipeline.
#[derive(Debug, Clone)]
pub struct CommittedBatch {
    pub batch_id: Uuid,
    pub module: String,
    pub title: String,
    pub preamble: Option<String>,
    pub problems: Vec<ProblemRecord>,
    pub per_page: u32,
    pub layout_mode: LayoutMode,
    pub clear_previous: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

/// In-memory worksheet sink shared across handlers.
///
/// `busy` serializes generation requests: the pipeline takes it through
/// `try_begin` and a second request is rejected while a batch is in flight.
/// The guard releases the flag on drop, so the busy state clears on both
/// success and failure paths.
#[derive(Debug, Default)]
pub struct WorksheetStore {
    state: RwLock<WorksheetState>,
    busy: AtomicBool,
}

/// RAII busy-flag holder. Dropping it releases the flag.
pub struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WorksheetStore {
    /// Attempts to mark a generation as in flight. `None` means another
    /// request holds the flag.
    pub fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> WorksheetState {
        self.state.read().await.clone()
    }

    /// Commits a successful batch. The batch is partitioned into pages at its
    /// own per-page figure here and the partition never changes afterwards.
    /// `clear_previous` replaces the worksheet wholesale; otherwise the new
    /// pages are appended after the existing ones, which keep their original
    /// boundaries. `page_count` is derived from the stored pages, so a batch
    /// that arrives short still reports what is actually there. Metadata
    /// (title, per-page, layout) always reflects the most recent batch.
    pub async fn commit(&self, batch: CommittedBatch) {
        let mut state = self.state.write().await;
        let mut new_pages = paginate(&batch.problems, batch.per_page);
        if batch.clear_previous {
            state.problems = batch.problems;
            state.pages = new_pages;
        } else {
            let base = state.pages.len() as u32;
            for page in &mut new_pages {
                page.index += base;
            }
            state.problems.extend(batch.problems);
            state.pages.extend(new_pages);
        }
        state.page_count = state.pages.len() as u32;
        state.batch_id = Some(batch.batch_id);
        state.module = Some(batch.module);
        state.title = batch.title;
        state.preamble = batch.preamble;
        state.per_page = batch.per_page;
        state.layout_mode = Some(batch.layout_mode);
        state.generated_at = Some(Utc::now());
    }

    pub async fn reset(&self) {
        *self.state.write().await = WorksheetState::default();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_batch(n: usize, per_page: u32, clear_previous: bool) -> CommittedBatch {
        CommittedBatch {
            batch_id: Uuid::new_v4(),
            module: "addition".to_string(),
            title: "Addition".to_string(),
            preamble: None,
            problems: (0..n)
                .map(|i| ProblemRecord {
                    question: format!("{i} + 1 ="),
                    answer: (i + 1).to_string(),
                    category: "addition".to_string(),
                    layout: None,
                    display: None,
                })
                .collect(),
            per_page,
            layout_mode: LayoutMode::Flow,
            clear_previous,
        }
    }

    #[tokio::test]
    async fn test_commit_replaces_when_clearing() {
        let store = WorksheetStore::default();
        store.commit(make_batch(10, 10, true)).await;
        store.commit(make_batch(4, 10, true)).await;
        let state = store.snapshot().await;
        assert_eq!(state.problems.len(), 4);
        assert_eq!(state.page_count, 1);
        assert_eq!(state.pages.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_appends_when_not_clearing() {
        let store = WorksheetStore::default();
        store.commit(make_batch(10, 10, true)).await;
        store.commit(make_batch(4, 10, false)).await;
        let state = store.snapshot().await;
        assert_eq!(state.problems.len(), 14);
        assert_eq!(state.page_count, 2);
        assert_eq!(state.pages.len(), 2);
    }

    #[tokio::test]
    async fn test_append_keeps_earlier_page_boundaries() {
        let store = WorksheetStore::default();
        store.commit(make_batch(10, 10, true)).await;
        store.commit(make_batch(15, 5, false)).await;

        let state = store.snapshot().await;
        assert_eq!(state.problems.len(), 25);
        // First batch stays one page of 10 even though the newest batch
        // committed at 5 per page.
        assert_eq!(state.pages.len(), 4);
        assert_eq!(state.page_count, state.pages.len() as u32);
        assert_eq!(state.pages[0].problems.len(), 10);
        for page in &state.pages[1..] {
            assert_eq!(page.problems.len(), 5);
        }
        let indices: Vec<u32> = state.pages.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_page_count_tracks_actual_partition_of_short_batch() {
        let store = WorksheetStore::default();
        // 5 problems at 6 per page only fill one page, whatever was planned.
        store.commit(make_batch(5, 6, true)).await;
        let state = store.snapshot().await;
        assert_eq!(state.page_count, 1);
        assert_eq!(state.pages.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let store = WorksheetStore::default();
        store.commit(make_batch(10, 10, true)).await;
        store.reset().await;
        let state = store.snapshot().await;
        assert!(state.problems.is_empty());
        assert!(state.pages.is_empty());
        assert_eq!(state.page_count, 0);
        assert!(state.module.is_none());
    }

    #[test]
    fn test_busy_guard_is_exclusive_and_releases_on_drop() {
        let store = WorksheetStore::default();
        let guard = store.try_begin().expect("flag should be free");
        assert!(store.try_begin().is_none(), "second begin must be rejected");
        assert!(store.is_busy());
        drop(guard);
        assert!(!store.is_busy());
        assert!(store.try_begin().is_some());
    }
}
