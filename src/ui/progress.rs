use crate::enumerator::Enumeration;
use crate::model::{HealthRecord, Repository};
use crate::scanner::ScanObserver;
use crate::ui::icons::{CROSS, SEARCH, WARN};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal progress for a scan, rendered via an `indicatif` bar on stderr.
///
/// Starts as a spinner while repositories are listed, then becomes a bar
/// sized to the number of active repositories.
pub struct ScanProgress {
    bar: ProgressBar,
}

impl ScanProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .expect("progress bar template is a valid static string"),
        );
        bar.set_message(format!("{}Listing repositories...", SEARCH));
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Print a line above the bar, or plainly when stderr is not a terminal.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.bar.is_hidden() {
            eprintln!("{}", msg.as_ref());
        } else {
            self.bar.println(msg.as_ref());
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanObserver for ScanProgress {
    fn enumerated(&self, enumeration: &Enumeration) {
        self.bar.disable_steady_tick();
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("progress bar template is a valid static string")
                .progress_chars("█▓▒░"),
        );
        self.bar.set_prefix("Repos");
        self.bar.set_length(enumeration.active.len() as u64);
        self.bar.set_position(0);
        self.bar.set_message(format!(
            "{} skipped ({} archived, {} inactive)",
            enumeration.archived + enumeration.inactive,
            enumeration.archived,
            enumeration.inactive
        ));
    }

    fn repository_started(&self, repo: &Repository) {
        self.bar.set_message(style(repo.full_name()).dim().to_string());
    }

    fn repository_finished(&self, record: &HealthRecord) {
        self.bar.inc(1);
        if let Some(error) = &record.error {
            self.print_line(format!(
                "{}{} skipped: {}",
                CROSS,
                style(record.full_name()).red(),
                error
            ));
        } else if record.has_issues {
            self.print_line(format!(
                "{}{} needs attention",
                WARN,
                style(record.full_name()).yellow()
            ));
        }
    }
}
