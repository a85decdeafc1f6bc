//! Debounced preview regeneration.
//!
//! Live-preview settings changes arrive in bursts while a user drags a
//! control. Each change stores the latest request and arms a token; a task
//! sleeps out the window and fires only if its token is still current —
//! trailing-edge coalescing, so a burst of M changes triggers exactly one
//! regeneration, with the last change's settings.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::errors::AppError;
use crate::generation::pipeline::{GenerateOutcome, GenerateRequest};

/// Trailing-edge debounce window for preview regeneration.
pub const PREVIEW_DEBOUNCE: Duration = Duration::from_millis(300);

/// Monotonic-token debouncer. Arming invalidates every pending wait.
#[derive(Debug)]
pub struct Debouncer {
    seq: AtomicU64,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            seq: AtomicU64::new(0),
            window,
        }
    }

    /// Issues a new token, invalidating all previously issued ones.
    pub fn arm(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.seq.load(Ordering::SeqCst) == token
    }

    /// Sleeps out the window; true if `token` survived it.
    pub async fn wait(&self, token: u64) -> bool {
        tokio::time::sleep(self.window).await;
        self.is_current(token)
    }
}

/// Schedules debounced pipeline runs, keeping only the newest request.
pub struct PreviewScheduler {
    debouncer: Debouncer,
    latest: Mutex<Option<GenerateRequest>>,
}

impl PreviewScheduler {
    pub fn new(window: Duration) -> Self {
        PreviewScheduler {
            debouncer: Debouncer::new(window),
            latest: Mutex::new(None),
        }
    }

    /// Records `request` as the newest pending preview and spawns the
    /// debounced run. `run` executes the pipeline when the window closes with
    /// this submission still newest; busy rejections are dropped silently
    /// (another batch is mid-flight, the preview is stale anyway). Returns
    /// the task handle; resolves to true when this submission fired.
    pub fn submit<F, Fut>(self: &Arc<Self>, request: GenerateRequest, run: F) -> JoinHandle<bool>
    where
        F: FnOnce(GenerateRequest) -> Fut + Send + 'static,
        Fut: Future<Output = Result<GenerateOutcome, AppError>> + Send,
    {
        {
            let mut latest = self.latest.lock().expect("preview lock poisoned");
            *latest = Some(request);
        }
        let token = self.debouncer.arm();
        let scheduler = Arc::clone(self);

        tokio::spawn(async move {
            if !scheduler.debouncer.wait(token).await {
                return false;
            }
            let request = {
                let mut latest = scheduler.latest.lock().expect("preview lock poisoned");
                latest.take()
            };
            let Some(request) = request else {
                return false;
            };
            match run(request).await {
                Ok(_) => true,
                Err(AppError::Busy) => false,
                Err(e) => {
                    warn!("preview regeneration failed: {e}");
                    false
                }
            }
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    use crate::layout::paginator::{GenerationPlan, PlanMode};
    use crate::models::settings::ModuleSettings;
    use uuid::Uuid;

    fn preview_request(per_page: u32) -> GenerateRequest {
        GenerateRequest {
            module: "addition".to_string(),
            settings: ModuleSettings {
                problems_per_page: per_page,
                ..Default::default()
            },
            print: None,
            clear_previous: true,
        }
    }

    fn fake_outcome() -> GenerateOutcome {
        GenerateOutcome {
            batch_id: Uuid::new_v4(),
            module: "addition".to_string(),
            title: "Addition".to_string(),
            plan: GenerationPlan {
                mode: PlanMode::Manual,
                per_page: 1,
                page_count: 1,
                total: 1,
            },
            problem_count: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_one_run_with_last_settings() {
        let scheduler = Arc::new(PreviewScheduler::new(Duration::from_millis(300)));
        let runs = Arc::new(AtomicU32::new(0));
        let last_per_page = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for per_page in [5, 10, 15, 20, 25] {
            let runs = Arc::clone(&runs);
            let last = Arc::clone(&last_per_page);
            handles.push(scheduler.submit(preview_request(per_page), move |request| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(request.settings.problems_per_page, Ordering::SeqCst);
                Ok(fake_outcome())
            }));
            // All five submissions land inside one debounce window.
            tokio::time::advance(Duration::from_millis(50)).await;
        }

        let fired: Vec<bool> = futures_join(handles).await;
        assert_eq!(fired.iter().filter(|f| **f).count(), 1);
        assert!(*fired.last().unwrap(), "only the last submission fires");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last_per_page.load(Ordering::SeqCst), 25, "last settings win");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_submissions_each_fire() {
        let scheduler = Arc::new(PreviewScheduler::new(Duration::from_millis(300)));
        let runs = Arc::new(AtomicU32::new(0));

        for per_page in [5, 10] {
            let runs = Arc::clone(&runs);
            let handle = scheduler.submit(preview_request(per_page), move |_| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(fake_outcome())
            });
            assert!(handle.await.unwrap());
        }
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_rejection_is_dropped_silently() {
        let scheduler = Arc::new(PreviewScheduler::new(Duration::from_millis(300)));
        let handle =
            scheduler.submit(preview_request(5), |_| async move { Err(AppError::Busy) });
        assert!(!handle.await.unwrap());
    }

    async fn futures_join(handles: Vec<JoinHandle<bool>>) -> Vec<bool> {
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }
}
