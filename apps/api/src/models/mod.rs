pub mod problem;
pub mod settings;
