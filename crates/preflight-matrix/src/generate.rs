use std::collections::BTreeMap;

use preflight_ir::types::{PermissionDecision, PermissionKind};

use crate::scenario::Scenario;

/// Enumerate every Grant/Deny combination over `kinds`.
///
/// Input is deduplicated and put in the fixed kind ordering. Scenario `i`
/// reads its decisions from the binary digits of `i`, first kind most
/// significant, 0 = Grant. Index 0 is therefore all-Grant and the last
/// index is all-Deny.
pub fn generate(kinds: &[PermissionKind]) -> Vec<Scenario> {
    let mut ordered = kinds.to_vec();
    ordered.sort();
    ordered.dedup();

    let width = ordered.len();
    let total = 1usize << width;
    (0..total)
        .map(|index| {
            let decisions: BTreeMap<PermissionKind, PermissionDecision> = ordered
                .iter()
                .enumerate()
                .map(|(pos, kind)| {
                    let bit = (index >> (width - 1 - pos)) & 1;
                    let decision = if bit == 0 {
                        PermissionDecision::Grant
                    } else {
                        PermissionDecision::Deny
                    };
                    (*kind, decision)
                })
                .collect();
            Scenario::new(index, decisions)
        })
        .collect()
}

/// Look up a scenario by its stable name.
pub fn find<'a>(scenarios: &'a [Scenario], name: &str) -> Option<&'a Scenario> {
    scenarios.iter().find(|s| s.name() == name)
}
