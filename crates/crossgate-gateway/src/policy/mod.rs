//! Policy layer (attribute selectors, policies, tiers, decision engine).
//!
//! Policies are validated when added so the decision path never fails on
//! policy content.

pub mod attrs;
pub mod engine;
pub mod model;
pub mod selector;
pub mod tier;

pub use attrs::WorkloadAttrs;
pub use engine::DecisionEngine;
pub use model::{Action, Decision, DecisionResult, Policy, DEFAULT_DENY};
pub use selector::{Expression, Operator, Selector};
pub use tier::PolicyTier;
