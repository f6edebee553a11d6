//! Capability registry for host-provided functions.
//!
//! Extension code exposes four kinds of capabilities to the engine:
//!
//! - **Conditions**: `Fn() -> bool` predicates referenced by rule
//!   condition expressions.
//! - **Variables**: `Fn() -> String` producers substituted into `@name`
//!   template placeholders.
//! - **Actions**: `Fn()` procedures invokable from a rule's follow-up
//!   list.
//! - **Triggers**: one-shot wiring functions that subscribe a host event
//!   source to "re-run all rules now".
//!
//! Registration is explicit: extension code calls `add_condition` and
//! friends directly, or bundles everything behind a
//! [`CapabilityProvider`]. There is no runtime introspection and no
//! process-global state; the registry is a value the engine owns.
//!
//! ## Example
//!
//! ```
//! use herald::capability::CapabilityRegistry;
//!
//! let mut registry = CapabilityRegistry::new();
//! registry.add_condition("InFlight", || true);
//! registry.add_variable("GameTitle", || "Apollo".to_string());
//!
//! assert!(registry.has_condition("InFlight"));
//! let snapshot = registry.snapshot_conditions();
//! assert_eq!(snapshot.get("InFlight"), Some(&true));
//! ```

mod provider;
mod registry;

pub use provider::{
    ActionFn, CapabilityKind, CapabilityProvider, ConditionFn, TriggerFn, TriggerSignal,
    VariableFn,
};
pub use registry::CapabilityRegistry;
