//! Connectivity decision engine (PDP).
//!
//! Two tiers, privileged then regular. Within a tier deny outranks allow;
//! a destination no tier has an opinion on is denied by default.

use crossgate_core::error::{CrossgateError, Result};

use super::attrs::WorkloadAttrs;
use super::model::{Decision, DecisionResult, Policy};
use super::tier::PolicyTier;

/// Construct once per process and share via Arc.
#[derive(Debug, Default)]
pub struct DecisionEngine {
    privileged: PolicyTier,
    regular: PolicyTier,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn tier(&self, privileged: bool) -> &PolicyTier {
        if privileged {
            &self.privileged
        } else {
            &self.regular
        }
    }

    /// Validate and store `policy` in the tier named by `policy.privileged`.
    /// On a validation error the tier is left untouched.
    pub fn add_or_update(&self, policy: Policy) -> Result<()> {
        policy.validate()?;
        tracing::info!(
            policy = %policy.name,
            privileged = policy.privileged,
            action = ?policy.action,
            "policy stored"
        );
        self.tier(policy.privileged).add_or_update(policy);
        Ok(())
    }

    pub fn delete(&self, name: &str, privileged: bool) -> Result<()> {
        if !self.tier(privileged).delete(name) {
            return Err(CrossgateError::NotFound(format!("policy {name}")));
        }
        tracing::info!(policy = %name, privileged, "policy deleted");
        Ok(())
    }

    pub fn get(&self, name: &str, privileged: bool) -> Option<Policy> {
        self.tier(privileged).get(name)
    }

    /// All policies, privileged tier first.
    pub fn policies(&self) -> Vec<Policy> {
        let mut out = self.privileged.policies();
        out.extend(self.regular.policies());
        out
    }

    /// One decision per destination, in input order.
    ///
    /// Each tier is read-locked once for the whole batch, and the regular
    /// tier only sees destinations the privileged tier left undecided.
    pub fn decide(&self, src: &WorkloadAttrs, dests: &[WorkloadAttrs]) -> Vec<DecisionResult> {
        let all: Vec<&WorkloadAttrs> = dests.iter().collect();
        let mut out: Vec<Option<DecisionResult>> = self
            .privileged
            .evaluate(src, &all)
            .into_iter()
            .map(|hit| {
                hit.map(|(action, name)| DecisionResult {
                    decision: Decision::from(action),
                    matched_by: name,
                    privileged_match: true,
                })
            })
            .collect();

        let pending: Vec<usize> = (0..out.len()).filter(|&i| out[i].is_none()).collect();
        if !pending.is_empty() {
            let rest: Vec<&WorkloadAttrs> = pending.iter().map(|&i| &dests[i]).collect();
            for (i, hit) in pending.into_iter().zip(self.regular.evaluate(src, &rest)) {
                out[i] = hit.map(|(action, name)| DecisionResult {
                    decision: Decision::from(action),
                    matched_by: name,
                    privileged_match: false,
                });
            }
        }

        out.into_iter()
            .map(|d| d.unwrap_or_else(DecisionResult::default_deny))
            .collect()
    }

    pub fn decide_one(&self, src: &WorkloadAttrs, dst: &WorkloadAttrs) -> DecisionResult {
        self.decide(src, std::slice::from_ref(dst))
            .pop()
            .unwrap_or_else(DecisionResult::default_deny)
    }
}
