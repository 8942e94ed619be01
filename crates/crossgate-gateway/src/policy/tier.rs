//! One precedence tier of policies, split by action.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::attrs::WorkloadAttrs;
use super::model::{Action, Policy};

#[derive(Debug, Default)]
struct Subsets {
    deny: HashMap<String, Policy>,
    allow: HashMap<String, Policy>,
}

/// Deny and allow policies of a tier behind one reader/writer lock, so a
/// name is never observed in both subsets.
#[derive(Debug, Default)]
pub struct PolicyTier {
    inner: RwLock<Subsets>,
}

impl PolicyTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `policy`, dropping any prior policy with the same name
    /// whatever its action. The policy must already be validated.
    pub(crate) fn add_or_update(&self, policy: Policy) {
        // Lock poisoning cannot leave the maps half-updated; recover the guard.
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        g.deny.remove(&policy.name);
        g.allow.remove(&policy.name);
        let subset = match policy.action {
            Action::Deny => &mut g.deny,
            Action::Allow => &mut g.allow,
        };
        subset.insert(policy.name.clone(), policy);
    }

    /// Returns false if the name is in neither subset.
    pub(crate) fn delete(&self, name: &str) -> bool {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        g.deny.remove(name).is_some() || g.allow.remove(name).is_some()
    }

    /// Evaluate each destination against this tier under a single read lock.
    ///
    /// Deny outranks allow; among policies of the same action any match
    /// will do, so map iteration order is irrelevant to the outcome.
    pub(crate) fn evaluate(
        &self,
        src: &WorkloadAttrs,
        dests: &[&WorkloadAttrs],
    ) -> Vec<Option<(Action, String)>> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        dests
            .iter()
            .map(|dst| {
                let hit = |subset: &HashMap<String, Policy>| {
                    subset
                        .values()
                        .find(|p| p.matches(src, dst))
                        .map(|p| p.name.clone())
                };
                hit(&g.deny)
                    .map(|name| (Action::Deny, name))
                    .or_else(|| hit(&g.allow).map(|name| (Action::Allow, name)))
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Policy> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        g.deny.get(name).or_else(|| g.allow.get(name)).cloned()
    }

    pub fn policies(&self) -> Vec<Policy> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<Policy> = g.deny.values().chain(g.allow.values()).cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn len(&self) -> usize {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        g.deny.len() + g.allow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
