use crate::ingest::{BatchReport, ItemOutcome};
use crate::output::is_quiet;
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

fn visible() -> bool {
    console::Term::stdout().is_term() && !is_quiet()
}

/// Progress bar for one batch ingestion
pub struct BatchProgress {
    pb: ProgressBar,
    edges: usize,
}

impl BatchProgress {
    pub fn new(total_items: usize) -> Self {
        let pb = if visible() {
            let pb = ProgressBar::new(total_items as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message("Ingesting statements");
        Self { pb, edges: 0 }
    }

    pub fn observe(&mut self, index: usize, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Merged { edges } => self.edges += edges,
            ItemOutcome::Failed => self.pb.set_message(format!("item {} failed", index + 1)),
            ItemOutcome::Skipped => {}
        }
        self.pb.inc(1);
    }

    pub fn finish_with_summary(&self, duration: Duration, report: &BatchReport) {
        self.pb.finish_and_clear();
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {}/{}  {} {}  {} {}",
            Icons::FILE.style(theme().info.clone()),
            report.success_count,
            report.total_count,
            Icons::CROSS.style(theme().info.clone()),
            report.failed_count(),
            Icons::LINK.style(theme().info.clone()),
            self.edges
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if visible() {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        Self { pb }
    }

    pub fn finish_with_message(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}
