//! Capability function types and the provider trait.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// A named, zero-argument boolean predicate.
pub type ConditionFn = Box<dyn Fn() -> bool>;

/// A named, zero-argument string producer for template substitution.
pub type VariableFn = Box<dyn Fn() -> String>;

/// A named, zero-argument procedure with side effects.
pub type ActionFn = Box<dyn Fn()>;

/// The "re-run all rules now" callback handed to trigger providers.
///
/// Cheap to clone; a signal that outlives its engine becomes a no-op.
pub type TriggerSignal = Rc<dyn Fn()>;

/// A one-shot wiring function for a host event source.
///
/// Invoked exactly once when the engine is built. The provider arranges
/// for the signal to fire whenever its underlying event occurs; the
/// subscription lasts for the rest of the process, there is no
/// unregister path.
pub type TriggerFn = Box<dyn FnOnce(TriggerSignal)>;

/// The four capability kinds, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    Condition,
    Variable,
    Action,
    Trigger,
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityKind::Condition => write!(f, "condition"),
            CapabilityKind::Variable => write!(f, "variable"),
            CapabilityKind::Action => write!(f, "action"),
            CapabilityKind::Trigger => write!(f, "trigger"),
        }
    }
}

/// Bundles a set of capabilities behind one registration call.
///
/// Extension crates implement this so hosts can install them wholesale:
///
/// ```
/// use herald::capability::{CapabilityProvider, CapabilityRegistry};
///
/// struct FlightCapabilities;
///
/// impl CapabilityProvider for FlightCapabilities {
///     fn register(&self, registry: &mut CapabilityRegistry) {
///         registry.add_condition("InFlight", || true);
///         registry.add_variable("Craft", || "Kestrel".to_string());
///     }
/// }
///
/// let mut registry = CapabilityRegistry::new();
/// registry.install(&FlightCapabilities);
/// assert!(registry.has_condition("InFlight"));
/// ```
pub trait CapabilityProvider {
    /// Register this provider's capabilities.
    fn register(&self, registry: &mut crate::capability::CapabilityRegistry);
}
