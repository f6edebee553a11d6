//! Engine error types.
//!
//! Structural errors (bad expressions, unknown condition names, duplicate
//! rules) surface at load time. Runtime lookup misses degrade gracefully
//! and are reported through `tracing` instead; no error aborts the engine.

use thiserror::Error;

use crate::rules::expr::ParseError;

/// Errors produced while loading rules or driving the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A rule's condition string failed to parse.
    #[error("rule {rule:?}: invalid condition expression: {source}")]
    ConditionSyntax {
        rule: String,
        #[source]
        source: ParseError,
    },

    /// A rule references a condition name no provider registered.
    ///
    /// This is fatal at load time: evaluating an undeclared condition
    /// signals a configuration or registration-ordering bug and must not
    /// silently evaluate to false.
    #[error("rule {rule:?} references unknown condition {name:?}")]
    UnknownCondition { rule: String, name: String },

    /// Two rules in the same rule set share a name.
    #[error("duplicate rule name {0:?}")]
    DuplicateRule(String),

    /// A rule declared a negative delay.
    #[error("rule {rule:?}: delay must be non-negative, got {delay}")]
    NegativeDelay { rule: String, delay: f64 },

    /// `force` was called with a name that matches no loaded rule.
    #[error("no rule named {0:?}")]
    UnknownRule(String),

    /// A condition name was missing from the evaluation snapshot.
    ///
    /// Load-time validation makes this unreachable for rules built through
    /// the engine; it guards hand-built expressions.
    #[error("condition {0:?} missing from evaluation snapshot")]
    MissingCondition(String),

    /// The engine was built without a message sink.
    #[error("engine requires a message sink")]
    MissingSink,
}
