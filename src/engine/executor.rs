//! Terminal integration for the declarative executor

use colored::Colorize;
use declarative::{ApplyResult, ConfirmCallback, ExecuteReport, ExecuteSummary, ProgressCallback};
use indicatif::ProgressBar;

use crate::progress;

/// Progress bar driven by executor callbacks
pub struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub fn new(prefix: &str, quiet: bool) -> Self {
        Self {
            pb: progress::bar(0, prefix, quiet),
        }
    }
}

/// Symbol shown next to a finished resource
pub fn result_symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "○",
        ApplyResult::Created
        | ApplyResult::Modified
        | ApplyResult::Replaced
        | ApplyResult::Removed => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&self, count: usize) {
        self.pb.set_length(count as u64);
        self.pb.set_position(0);
    }

    fn on_resource_start(&self, address: &str, description: &str) {
        log::debug!("{address}: {description}");
    }

    fn on_resource_complete(&self, address: &str, result: &ApplyResult) {
        self.pb
            .set_message(format!("{} {}", result_symbol(result), address));
        self.pb.inc(1);
    }

    fn on_batch_complete(&self) {
        self.pb.finish_and_clear();
    }
}

/// Interactive confirmation, skipped with `--yes`
pub struct PromptConfirm {
    pub yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.yes {
            return true;
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Print per-resource failures
pub fn print_failures(report: &ExecuteReport) {
    for outcome in &report.outcomes {
        if let ApplyResult::Failed { error } = &outcome.result {
            println!("    {} {}: {}", "✗".red(), outcome.address, error);
        }
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.skipped > 0 && summary.total_changes() == 0 && summary.failed == 0 {
        println!("  {} Aborted", "✗".red());
        return;
    }
    if summary.is_success() {
        println!("  {} NetBox is up to date", "✓".green().bold());
    } else {
        println!("  {} Applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.replaced > 0 {
        println!("    • {} resources replaced", summary.replaced);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_symbol() {
        assert_eq!(result_symbol(&ApplyResult::Created), "✓");
        assert_eq!(result_symbol(&ApplyResult::Replaced), "✓");
        assert_eq!(result_symbol(&ApplyResult::NoChange), "○");
        assert_eq!(
            result_symbol(&ApplyResult::Failed {
                error: "boom".into()
            }),
            "✗"
        );
    }

    #[test]
    fn test_yes_skips_prompt() {
        let mut confirm = PromptConfirm { yes: true };
        assert!(confirm.confirm("Apply changes?"));
    }

    #[test]
    fn test_bar_progress_counts() {
        let progress = BarProgress::new("Applying", true);
        progress.on_batch_start(2);
        progress.on_resource_complete("site.a", &ApplyResult::Created);
        progress.on_resource_complete("site.b", &ApplyResult::NoChange);
        assert_eq!(progress.pb.position(), 2);
        progress.on_batch_complete();
    }
}
