//! Plan and drift display

use colored::{ColoredString, Colorize};
use declarative::{Action, DiffSummary, ExecutionPlan, Lifecycle, RefreshOutcome, ResourceDiff};
use std::collections::BTreeMap;

/// Heading for a kind
fn kind_title(kind: &str) -> &str {
    match kind {
        "site" => "Sites",
        "virtual_machine" => "Virtual machines",
        "service" => "Services",
        other => other,
    }
}

fn colored_symbol(action: &Action) -> ColoredString {
    match action {
        Action::Create => action.symbol().green(),
        Action::Update { .. } => action.symbol().yellow(),
        Action::Replace { .. } => action.symbol().magenta(),
        Action::Delete => action.symbol().red(),
        Action::NoChange => action.symbol().dimmed(),
    }
}

/// Short description of what an action does
pub fn describe(action: &Action) -> String {
    match action {
        Action::Create => "(will create)".to_string(),
        Action::Delete => "(will delete)".to_string(),
        Action::Update { changed } => format!("update: {}", changed.join(", ")),
        Action::Replace { changed } => format!("replace ({})", changed.join(", ")),
        Action::NoChange => String::new(),
    }
}

/// Display planned changes grouped by kind
pub fn display_plan(plan: &ExecutionPlan) {
    let diffs: Vec<ResourceDiff> = plan
        .diffs()
        .into_iter()
        .filter(|d| d.action.is_change())
        .collect();

    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    let mut by_kind: BTreeMap<&str, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in &diffs {
        by_kind.entry(diff.address.kind.as_str()).or_default().push(diff);
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for (kind, kind_diffs) in &by_kind {
        println!("│ {}", kind_title(kind).bold());
        for diff in kind_diffs {
            println!(
                "│   {} {:<30} {}",
                colored_symbol(&diff.action),
                diff.address.to_string(),
                describe(&diff.action).dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(&diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!("│ Plan: {}", summary_line(&summary));
    println!("└─────────────────────────────────────────────────────┘");
}

/// One-line plan summary
pub fn summary_line(summary: &DiffSummary) -> String {
    format!(
        "{} to add, {} to change, {} to replace, {} to destroy",
        summary.additions, summary.modifications, summary.replacements, summary.removals
    )
}

/// Display the result of a refresh
pub fn display_refresh(outcomes: &[RefreshOutcome]) {
    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Refresh".bold()
    );
    println!("│");
    for outcome in outcomes {
        let (symbol, detail) = match &outcome.result {
            Ok(Lifecycle::Unmanaged) => ("-".red(), "gone from NetBox".to_string()),
            Ok(Lifecycle::Managed(_)) if outcome.drift.is_empty() => {
                ("○".dimmed(), "in sync".to_string())
            }
            Ok(Lifecycle::Managed(_)) => {
                ("~".yellow(), format!("drifted: {}", outcome.drift.join(", ")))
            }
            Err(e) => ("✗".red(), e.to_string()),
        };
        println!(
            "│   {} {:<30} {}",
            symbol,
            outcome.address.to_string(),
            detail.dimmed()
        );
    }
    println!("│");
    println!("└─────────────────────────────────────────────────────┘");
}
