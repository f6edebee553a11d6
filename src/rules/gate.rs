//! Per-rule gating state machine.
//!
//! A rule, once shown, is suppressed from showing again within the scope
//! its policy names. The machine has three states:
//!
//! - `Eligible`: may be scheduled.
//! - `Scheduled`: a dispatch is in flight; further scheduling is blocked
//!   until it lands, closing the window where two triggers could queue
//!   the same rule before its delay elapses.
//! - `Shown`: dispatched at least once this process.
//!
//! Whether `Shown` suppresses future firings depends on the policy:
//! process scope suppresses for the rest of the run, session scope until
//! the active session changes identity, instance scope persists across
//! restarts through the key-value store.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::host::{InstanceId, InstanceStore, SessionId};

/// The scope within which a shown rule stays suppressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePolicy {
    /// No suppression; the rule may fire on every trigger.
    #[default]
    None,

    /// At most once per process run.
    OncePerProcess,

    /// At most once per live session; re-arms when the session changes.
    OncePerSession,

    /// At most once per persisted instance; survives restarts via the
    /// store, keyed by the rule's name with value `"True"`.
    OncePerInstance,
}

/// Transient gate state within the current process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GateState {
    #[default]
    Eligible,
    Scheduled,
    Shown,
}

/// The host scopes active at evaluation time.
///
/// Session- and instance-gated rules are not eligible while their scope
/// is absent; there is nothing to attribute a showing to.
#[derive(Clone, Copy, Debug, Default)]
pub struct GateContext<'a> {
    /// The live session, if any.
    pub session: Option<SessionId>,
    /// The persisted instance, if any.
    pub instance: Option<&'a InstanceId>,
}

/// Gating state machine owned by one rule.
#[derive(Clone, Debug)]
pub struct RuleGate {
    policy: GatePolicy,
    state: GateState,
    shown_sessions: FxHashSet<SessionId>,
}

impl RuleGate {
    /// Create a gate in the `Eligible` state.
    #[must_use]
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            policy,
            state: GateState::Eligible,
            shown_sessions: FxHashSet::default(),
        }
    }

    /// The gate's policy.
    #[must_use]
    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// The gate's transient state.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// May the rule be scheduled right now?
    ///
    /// False while a dispatch is in flight, and false when the policy's
    /// scope has already seen the rule.
    #[must_use]
    pub fn may_fire(&self, rule: &str, ctx: &GateContext, store: &dyn InstanceStore) -> bool {
        if self.state == GateState::Scheduled {
            return false;
        }

        match self.policy {
            GatePolicy::None => true,
            GatePolicy::OncePerProcess => self.state != GateState::Shown,
            GatePolicy::OncePerSession => match ctx.session {
                Some(session) => !self.shown_sessions.contains(&session),
                None => false,
            },
            GatePolicy::OncePerInstance => match ctx.instance {
                Some(instance) => store.get(instance, rule).as_deref() != Some("True"),
                None => false,
            },
        }
    }

    /// Enter `Scheduled`; called when a dispatch is queued.
    pub fn mark_scheduled(&mut self) {
        self.state = GateState::Scheduled;
    }

    /// Enter `Shown`; called exactly when the dispatch lands.
    ///
    /// Idempotent: marking an already shown rule changes nothing beyond
    /// leaving the `Scheduled` state. Records the current session and,
    /// under instance scope, persists `rule → "True"`.
    pub fn mark_shown(&mut self, rule: &str, ctx: &GateContext, store: &mut dyn InstanceStore) {
        self.state = GateState::Shown;

        if let Some(session) = ctx.session {
            self.shown_sessions.insert(session);
        }

        if self.policy == GatePolicy::OncePerInstance {
            if let Some(instance) = ctx.instance {
                if store.get(instance, rule).as_deref() != Some("True") {
                    store.set(instance, rule, "True".to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::host::MemoryStore;

    use super::*;

    fn no_scope() -> GateContext<'static> {
        GateContext::default()
    }

    #[test]
    fn test_initial_state_is_eligible() {
        let gate = RuleGate::new(GatePolicy::None);
        assert_eq!(gate.state(), GateState::Eligible);
        assert!(gate.may_fire("R", &no_scope(), &MemoryStore::new()));
    }

    #[test]
    fn test_none_policy_refires_after_shown() {
        let mut store = MemoryStore::new();
        let mut gate = RuleGate::new(GatePolicy::None);

        gate.mark_scheduled();
        gate.mark_shown("R", &no_scope(), &mut store);
        assert!(gate.may_fire("R", &no_scope(), &store));
    }

    #[test]
    fn test_scheduled_blocks_every_policy() {
        let store = MemoryStore::new();
        for policy in [
            GatePolicy::None,
            GatePolicy::OncePerProcess,
            GatePolicy::OncePerSession,
            GatePolicy::OncePerInstance,
        ] {
            let mut gate = RuleGate::new(policy);
            gate.mark_scheduled();
            let ctx = GateContext {
                session: Some(SessionId::new(1)),
                instance: None,
            };
            assert!(!gate.may_fire("R", &ctx, &store), "policy {:?}", policy);
        }
    }

    #[test]
    fn test_once_per_process() {
        let mut store = MemoryStore::new();
        let mut gate = RuleGate::new(GatePolicy::OncePerProcess);

        assert!(gate.may_fire("R", &no_scope(), &store));
        gate.mark_scheduled();
        gate.mark_shown("R", &no_scope(), &mut store);
        assert!(!gate.may_fire("R", &no_scope(), &store));
    }

    #[test]
    fn test_once_per_session_resets_on_new_session() {
        let mut store = MemoryStore::new();
        let mut gate = RuleGate::new(GatePolicy::OncePerSession);

        let a = GateContext {
            session: Some(SessionId::new(1)),
            instance: None,
        };
        let b = GateContext {
            session: Some(SessionId::new(2)),
            instance: None,
        };

        assert!(gate.may_fire("R", &a, &store));
        gate.mark_scheduled();
        gate.mark_shown("R", &a, &mut store);

        // Suppressed under A, eligible under B, still suppressed under A.
        assert!(!gate.may_fire("R", &a, &store));
        assert!(gate.may_fire("R", &b, &store));
        gate.mark_scheduled();
        gate.mark_shown("R", &b, &mut store);
        assert!(!gate.may_fire("R", &a, &store));
        assert!(!gate.may_fire("R", &b, &store));
    }

    #[test]
    fn test_session_policy_without_session_is_ineligible() {
        let gate = RuleGate::new(GatePolicy::OncePerSession);
        assert!(!gate.may_fire("R", &no_scope(), &MemoryStore::new()));
    }

    #[test]
    fn test_once_per_instance_persists_through_store() {
        let mut store = MemoryStore::new();
        let instance = InstanceId::new("save-01");
        let ctx = GateContext {
            session: None,
            instance: Some(&instance),
        };

        let mut gate = RuleGate::new(GatePolicy::OncePerInstance);
        assert!(gate.may_fire("R", &ctx, &store));
        gate.mark_scheduled();
        gate.mark_shown("R", &ctx, &mut store);
        assert_eq!(store.get(&instance, "R"), Some("True".to_string()));

        // A fresh gate (new process) reads the stored marker.
        let fresh = RuleGate::new(GatePolicy::OncePerInstance);
        assert!(!fresh.may_fire("R", &ctx, &store));

        // A different instance has no marker.
        let other = InstanceId::new("save-02");
        let other_ctx = GateContext {
            session: None,
            instance: Some(&other),
        };
        assert!(fresh.may_fire("R", &other_ctx, &store));
    }

    #[test]
    fn test_instance_policy_without_instance_is_ineligible() {
        let gate = RuleGate::new(GatePolicy::OncePerInstance);
        assert!(!gate.may_fire("R", &no_scope(), &MemoryStore::new()));
    }

    #[test]
    fn test_mark_shown_is_idempotent() {
        let mut store = MemoryStore::new();
        let instance = InstanceId::new("save-01");
        let ctx = GateContext {
            session: Some(SessionId::new(1)),
            instance: Some(&instance),
        };

        let mut gate = RuleGate::new(GatePolicy::OncePerInstance);
        gate.mark_shown("R", &ctx, &mut store);
        gate.mark_shown("R", &ctx, &mut store);

        assert_eq!(gate.state(), GateState::Shown);
        assert_eq!(store.get(&instance, "R"), Some("True".to_string()));
    }

    #[test]
    fn test_policy_deserializes_from_config_names() {
        let policy: GatePolicy = serde_json::from_str("\"once_per_process\"").unwrap();
        assert_eq!(policy, GatePolicy::OncePerProcess);
        let policy: GatePolicy = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(policy, GatePolicy::None);
    }
}
