pub mod classifier;
pub mod cleanup;
pub mod config;
pub mod enumerator;
pub mod errors;
pub mod github;
pub mod logging;
pub mod model;
pub mod report;
pub mod scanner;
pub mod ui;
