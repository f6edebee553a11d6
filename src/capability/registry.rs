//! The capability registry.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use super::provider::{
    ActionFn, CapabilityKind, CapabilityProvider, ConditionFn, TriggerFn, VariableFn,
};

/// Name-keyed tables of host-provided capabilities.
///
/// Three lookup tables (conditions, variables, actions) plus a pending
/// list of triggers. Names within one table are unique: registering a
/// name twice keeps the later entry and emits a diagnostic. Trigger names
/// need no table; triggers are consumed once, at engine build, each
/// wiring itself independently.
///
/// Once the engine is built the registry becomes read-only: the engine
/// owns it privately and exposes no mutation.
#[derive(Default)]
pub struct CapabilityRegistry {
    conditions: FxHashMap<String, ConditionFn>,
    variables: FxHashMap<String, VariableFn>,
    actions: FxHashMap<String, ActionFn>,
    triggers: Vec<(String, TriggerFn)>,
}

impl CapabilityRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a condition predicate.
    ///
    /// A repeated name replaces the earlier entry (last registration
    /// wins) with a warning.
    pub fn add_condition(&mut self, name: impl Into<String>, f: impl Fn() -> bool + 'static) {
        let name = name.into();
        debug!(kind = %CapabilityKind::Condition, name = %name, "registered capability");
        if self.conditions.insert(name.clone(), Box::new(f)).is_some() {
            warn!(kind = %CapabilityKind::Condition, name = %name, "duplicate name, keeping later registration");
        }
    }

    /// Register a variable producer.
    pub fn add_variable(&mut self, name: impl Into<String>, f: impl Fn() -> String + 'static) {
        let name = name.into();
        debug!(kind = %CapabilityKind::Variable, name = %name, "registered capability");
        if self.variables.insert(name.clone(), Box::new(f)).is_some() {
            warn!(kind = %CapabilityKind::Variable, name = %name, "duplicate name, keeping later registration");
        }
    }

    /// Register an action procedure.
    pub fn add_action(&mut self, name: impl Into<String>, f: impl Fn() + 'static) {
        let name = name.into();
        debug!(kind = %CapabilityKind::Action, name = %name, "registered capability");
        if self.actions.insert(name.clone(), Box::new(f)).is_some() {
            warn!(kind = %CapabilityKind::Action, name = %name, "duplicate name, keeping later registration");
        }
    }

    /// Register a trigger wiring function.
    ///
    /// The function is invoked once at engine build with the re-evaluation
    /// signal. Trigger names are informational and need not be unique.
    pub fn add_trigger(
        &mut self,
        name: impl Into<String>,
        f: impl FnOnce(super::TriggerSignal) + 'static,
    ) {
        let name = name.into();
        debug!(kind = %CapabilityKind::Trigger, name = %name, "registered capability");
        self.triggers.push((name, Box::new(f)));
    }

    /// Register a condition (builder pattern).
    #[must_use]
    pub fn with_condition(mut self, name: impl Into<String>, f: impl Fn() -> bool + 'static) -> Self {
        self.add_condition(name, f);
        self
    }

    /// Register a variable (builder pattern).
    #[must_use]
    pub fn with_variable(
        mut self,
        name: impl Into<String>,
        f: impl Fn() -> String + 'static,
    ) -> Self {
        self.add_variable(name, f);
        self
    }

    /// Register an action (builder pattern).
    #[must_use]
    pub fn with_action(mut self, name: impl Into<String>, f: impl Fn() + 'static) -> Self {
        self.add_action(name, f);
        self
    }

    /// Register a trigger (builder pattern).
    #[must_use]
    pub fn with_trigger(
        mut self,
        name: impl Into<String>,
        f: impl FnOnce(super::TriggerSignal) + 'static,
    ) -> Self {
        self.add_trigger(name, f);
        self
    }

    /// Apply a provider's registrations.
    pub fn install(&mut self, provider: &dyn CapabilityProvider) {
        provider.register(self);
    }

    /// Look up a condition by name.
    #[must_use]
    pub fn condition(&self, name: &str) -> Option<&ConditionFn> {
        self.conditions.get(name)
    }

    /// Look up a variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&VariableFn> {
        self.variables.get(name)
    }

    /// Look up an action by name.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ActionFn> {
        self.actions.get(name)
    }

    /// Check if a condition name is registered.
    #[must_use]
    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }

    /// Check if an action name is registered.
    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Iterate registered condition names.
    pub fn condition_names(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    /// Evaluate every condition into a name → value snapshot.
    ///
    /// Rule expressions are evaluated against one snapshot per trigger
    /// firing, so every rule in a pass sees the same condition values.
    #[must_use]
    pub fn snapshot_conditions(&self) -> FxHashMap<String, bool> {
        self.conditions
            .iter()
            .map(|(name, f)| (name.clone(), f()))
            .collect()
    }

    /// Number of registered conditions.
    #[must_use]
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Number of registered variables.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of registered actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Number of pending, not yet wired triggers.
    #[must_use]
    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Take the pending triggers for wiring. Called once at engine build.
    pub(crate) fn take_triggers(&mut self) -> Vec<(String, TriggerFn)> {
        std::mem::take(&mut self.triggers)
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("conditions", &self.conditions.len())
            .field("variables", &self.variables.len())
            .field("actions", &self.actions.len())
            .field("triggers", &self.triggers.len())
            .finish()
    }
}
