//! Policy and decision types.

use serde::{Deserialize, Serialize};

use crossgate_core::error::{CrossgateError, Result};

use super::attrs::WorkloadAttrs;
use super::selector::Selector;

/// `matched_by` marker used when no policy matched.
pub const DEFAULT_DENY: &str = "default-deny";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Deny,
}

/// An access rule. `from` and `to` are match-any lists of selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    pub name: String,
    #[serde(default)]
    pub privileged: bool,
    pub action: Action,
    pub from: Vec<Selector>,
    pub to: Vec<Selector>,
}

impl Policy {
    pub fn new(name: impl Into<String>, privileged: bool, action: Action) -> Self {
        Self {
            name: name.into(),
            privileged,
            action,
            from: Vec::new(),
            to: Vec::new(),
        }
    }

    pub fn from_selector(mut self, selector: Selector) -> Self {
        self.from.push(selector);
        self
    }

    pub fn to_selector(mut self, selector: Selector) -> Self {
        self.to.push(selector);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CrossgateError::InvalidPolicy("policy name must not be empty".into()));
        }
        if self.from.is_empty() {
            return Err(CrossgateError::InvalidPolicy(format!(
                "policy {}: from must not be empty",
                self.name
            )));
        }
        if self.to.is_empty() {
            return Err(CrossgateError::InvalidPolicy(format!(
                "policy {}: to must not be empty",
                self.name
            )));
        }
        for s in self.from.iter().chain(&self.to) {
            s.validate()
                .map_err(|e| CrossgateError::InvalidPolicy(format!("policy {}: {e}", self.name)))?;
        }
        Ok(())
    }

    /// Source matches some `from` selector and destination some `to` selector.
    pub fn matches(&self, src: &WorkloadAttrs, dst: &WorkloadAttrs) -> bool {
        self.from.iter().any(|s| s.matches(src)) && self.to.iter().any(|s| s.matches(dst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

impl From<Action> for Decision {
    fn from(action: Action) -> Self {
        match action {
            Action::Allow => Decision::Allow,
            Action::Deny => Decision::Deny,
        }
    }
}

/// Outcome for one destination, with the policy that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionResult {
    pub decision: Decision,
    pub matched_by: String,
    pub privileged_match: bool,
}

impl DecisionResult {
    pub fn default_deny() -> Self {
        Self {
            decision: Decision::Deny,
            matched_by: DEFAULT_DENY.to_string(),
            privileged_match: false,
        }
    }

    pub fn is_allow(&self) -> bool {
        self.decision == Decision::Allow
    }
}
