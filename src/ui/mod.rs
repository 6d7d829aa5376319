pub mod icons;
pub mod progress;
pub mod summary;

pub use progress::ScanProgress;
pub use summary::{render_outcomes, render_plan, render_report};
