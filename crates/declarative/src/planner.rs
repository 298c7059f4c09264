//! Execution planner - pairs declared resources with tracked state

use crate::diff::{Action, DiffSummary, ResourceDiff, diff};
use crate::error::Result;
use crate::resource::KindRegistry;
use crate::types::{Address, DeclaredResource, TrackedState};
use std::collections::{BTreeMap, BTreeSet};

/// One resource and what must happen to it
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub address: Address,
    pub action: Action,
    /// Validated declared attributes, absent for deletes
    pub declared: Option<DeclaredResource>,
    /// Tracked state, absent for creates
    pub tracked: Option<TrackedState>,
}

impl PlannedChange {
    pub fn diff(&self) -> ResourceDiff {
        ResourceDiff {
            address: self.address.clone(),
            action: self.action.clone(),
        }
    }
}

/// An execution plan, ordered by address
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<PlannedChange>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan from declared resources and tracked state
    ///
    /// Every declared resource is validated first; the first invalid one
    /// fails the whole plan so nothing is applied from a broken manifest.
    pub fn build(
        registry: &KindRegistry,
        declared: &BTreeMap<Address, DeclaredResource>,
        tracked: &BTreeMap<Address, TrackedState>,
    ) -> Result<Self> {
        let addresses: BTreeSet<&Address> = declared.keys().chain(tracked.keys()).collect();
        let mut changes = Vec::with_capacity(addresses.len());

        for address in addresses {
            let kind = registry.get(&address.kind)?;
            let desired = declared
                .get(address)
                .map(|d| kind.schema().validate(d))
                .transpose()?;
            let current = tracked.get(address).cloned();
            let action = diff(kind.schema(), desired.as_ref(), current.as_ref());
            log::debug!("{address}: {action}");

            changes.push(PlannedChange {
                address: address.clone(),
                action,
                declared: desired,
                tracked: current,
            });
        }

        Ok(Self { changes })
    }

    /// Plan that deletes every tracked resource
    pub fn destroy(tracked: &BTreeMap<Address, TrackedState>) -> Self {
        let changes = tracked
            .iter()
            .map(|(address, state)| PlannedChange {
                address: address.clone(),
                action: Action::Delete,
                declared: None,
                tracked: Some(state.clone()),
            })
            .collect();
        Self { changes }
    }

    /// Filter plan to only include changes matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&PlannedChange) -> bool,
    {
        Self {
            changes: self.changes.into_iter().filter(|c| predicate(c)).collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "kind" or "kind.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(_) => self.filter(|c| matches_target(&c.address, target)),
        }
    }

    /// Diffs of every change that is not a no-op
    pub fn diffs(&self) -> Vec<ResourceDiff> {
        self.changes
            .iter()
            .filter(|c| c.action.is_change())
            .map(PlannedChange::diff)
            .collect()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_diffs(&self.diffs())
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.changes.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Check if anything needs to change
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action.is_change())
    }
}

/// Check an address against a `--target` value ("kind" or "kind.name")
pub fn matches_target(address: &Address, target: Option<&str>) -> bool {
    match target {
        None => true,
        Some(t) => {
            let (kind, name) = parse_target(t);
            matches_filter(address, kind.as_deref(), name.as_deref())
        }
    }
}

/// Parse a target string like "kind.name" into (kind, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if an address matches the filter criteria
fn matches_filter(address: &Address, kind: Option<&str>, name: Option<&str>) -> bool {
    if let Some(k) = kind {
        // Allow plural aliases
        let matches_kind = match k {
            "sites" => address.kind == "site",
            "vms" | "virtual_machines" => address.kind == "virtual_machine",
            "services" => address.kind == "service",
            _ => address.kind == k,
        };
        if !matches_kind {
            return false;
        }
    }

    if let Some(n) = name
        && address.name != n
    {
        return false;
    }

    true
}
