//! Diff computation - what must happen to converge one resource

use crate::schema::Schema;
use crate::types::{Address, DeclaredResource, TrackedState};
use serde::Serialize;
use std::fmt;

/// Action needed to converge a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Declared but not tracked
    Create,
    /// Tracked and declared with changed attributes
    Update { changed: Vec<String> },
    /// A replacement-forcing attribute changed
    Replace { changed: Vec<String> },
    /// Tracked but no longer declared
    Delete,
    /// Already converged
    NoChange,
}

impl Action {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Plan symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update { .. } => "~",
            Self::Replace { .. } => "-/+",
            Self::Delete => "-",
            Self::NoChange => "=",
        }
    }

    /// Names of changed attributes, if any
    pub fn changed(&self) -> &[String] {
        match self {
            Self::Update { changed } | Self::Replace { changed } => changed,
            _ => &[],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update { .. } => write!(f, "update"),
            Self::Replace { .. } => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
            Self::NoChange => write!(f, "no change"),
        }
    }
}

/// Decide the action for one resource
///
/// `desired` must already be validated so defaults and case are normalised.
pub fn diff(
    schema: &Schema,
    desired: Option<&DeclaredResource>,
    current: Option<&TrackedState>,
) -> Action {
    match (desired, current) {
        (Some(_), None) => Action::Create,
        (None, Some(_)) => Action::Delete,
        (None, None) => Action::NoChange,
        (Some(desired), Some(current)) => {
            let changed = schema.changed_attributes(desired, &current.attributes);
            if changed.is_empty() {
                Action::NoChange
            } else if schema
                .replacement_attributes(desired, &current.attributes)
                .is_empty()
            {
                Action::Update { changed }
            } else {
                Action::Replace { changed }
            }
        }
    }
}

/// A resource address with its planned action
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDiff {
    pub address: Address,
    #[serde(flatten)]
    pub action: Action,
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to create
    pub additions: usize,
    /// Number of resources to delete
    pub removals: usize,
    /// Number of resources to update in place
    pub modifications: usize,
    /// Number of resources to replace
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Delete => summary.removals += 1,
                Action::Update { .. } => summary.modifications += 1,
                Action::Replace { .. } => summary.replacements += 1,
                Action::NoChange => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use crate::testing::Widget;

    fn tracked(declared: &DeclaredResource) -> TrackedState {
        TrackedState::new(1, Widget::schema().validate(declared).unwrap())
    }

    fn desired(declared: &DeclaredResource) -> DeclaredResource {
        Widget::schema().validate(declared).unwrap()
    }

    #[test]
    fn test_create_and_delete() {
        let schema = Widget::schema();
        let declared = DeclaredResource::new().with("name", "w");
        assert_eq!(diff(&schema, Some(&desired(&declared)), None), Action::Create);
        assert_eq!(diff(&schema, None, Some(&tracked(&declared))), Action::Delete);
        assert_eq!(diff(&schema, None, None), Action::NoChange);
    }

    #[test]
    fn test_no_change_when_converged() {
        let schema = Widget::schema();
        let declared = DeclaredResource::new().with("name", "w").with("owner", 2);
        assert_eq!(
            diff(&schema, Some(&desired(&declared)), Some(&tracked(&declared))),
            Action::NoChange
        );
    }

    #[test]
    fn test_update_vs_replace() {
        let schema = Widget::schema();
        let before = DeclaredResource::new().with("name", "w").with("owner", 2);

        let renamed = before.clone().with("name", "w2");
        assert_eq!(
            diff(&schema, Some(&desired(&renamed)), Some(&tracked(&before))),
            Action::Update {
                changed: vec!["name".into()]
            }
        );

        let moved = before.clone().with("owner", 3);
        let action = diff(&schema, Some(&desired(&moved)), Some(&tracked(&before)));
        assert_eq!(
            action,
            Action::Replace {
                changed: vec!["owner".into()]
            }
        );
        assert_eq!(action.symbol(), "-/+");
    }

    #[test]
    fn test_summary_counts_actions() {
        let diffs = vec![
            ResourceDiff {
                address: Address::new("widget", "a"),
                action: Action::Create,
            },
            ResourceDiff {
                address: Address::new("widget", "b"),
                action: Action::Replace { changed: vec![] },
            },
            ResourceDiff {
                address: Address::new("widget", "c"),
                action: Action::NoChange,
            },
        ];
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.replacements, 1);
        assert_eq!(summary.total(), 2);
        assert!(summary.has_changes());
    }
}
