use std::collections::BTreeMap;
use std::fmt;

use preflight_ir::types::{PermissionDecision, PermissionKind};
use serde::{Deserialize, Serialize};

/// One complete assignment of decisions across every tracked kind.
///
/// Uses BTreeMap so iteration follows the fixed kind ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scenario {
    /// Position in the generated matrix.
    pub index: usize,
    decisions: BTreeMap<PermissionKind, PermissionDecision>,
}

impl Scenario {
    pub fn new(index: usize, decisions: BTreeMap<PermissionKind, PermissionDecision>) -> Self {
        Self { index, decisions }
    }

    pub fn decision(&self, kind: PermissionKind) -> Option<PermissionDecision> {
        self.decisions.get(&kind).copied()
    }

    pub fn decisions(&self) -> impl Iterator<Item = (PermissionKind, PermissionDecision)> + '_ {
        self.decisions.iter().map(|(k, d)| (*k, *d))
    }

    pub fn kinds(&self) -> impl Iterator<Item = PermissionKind> + '_ {
        self.decisions.keys().copied()
    }

    pub fn denied(&self) -> impl Iterator<Item = PermissionKind> + '_ {
        self.decisions()
            .filter(|(_, d)| *d == PermissionDecision::Deny)
            .map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Stable name, e.g. `contacts=deny,location=grant`.
    pub fn name(&self) -> String {
        self.decisions()
            .map(|(k, d)| format!("{k}={d}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.index, self.name())
    }
}
