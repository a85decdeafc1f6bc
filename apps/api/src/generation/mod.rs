// Generation engine: subject modules, the batch pipeline, debounced preview
// regeneration, and the HTTP handlers over them.

pub mod debounce;
pub mod handlers;
pub mod modules;
pub mod pipeline;
