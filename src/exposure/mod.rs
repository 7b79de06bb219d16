//! Publishing environment programs into the shared bin directory.

mod path_link;
mod reconcile;
mod rules;
mod warning;

pub use path_link::{LinkError, PathLink};
pub use reconcile::{ReconcileReport, Reconciler};
pub use rules::{
    ALL_RULE, EPONYM_RULE, ExplicitRule, ExposeRules, FallbackState, MAIN_RULE, OPT_OUT_RULE,
    Resolution, RuleResolver, fallback_after,
};
pub use warning::ResolutionWarning;
