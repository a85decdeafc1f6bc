// Layout core: capacity estimation behind a measurement trait, plus the
// pagination decision table. Pure functions of their inputs — no shared state.

pub mod capacity;
pub mod measure;
pub mod paginator;
