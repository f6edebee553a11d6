//! # herald
//!
//! A declarative, condition-triggered notification engine for
//! long-running, event-loop-driven host applications.
//!
//! Operators describe named rules in data: a trigger condition, a
//! message/title template, a display style, a delay, and a repetition
//! gating policy. The host exposes capabilities (boolean conditions,
//! string variables, side-effecting actions, and trigger event sources)
//! through an explicit registry. Whenever a trigger fires, the engine
//! evaluates every rule and schedules the eligible ones for display
//! after their configured delay, substituting `@variable` placeholders
//! into the template text.
//!
//! ## Design Principles
//!
//! 1. **Host-Agnostic**: No hardcoded conditions, variables, or display
//!    machinery. Hosts register capabilities and implement the sink and
//!    store boundaries.
//!
//! 2. **Explicit Registration**: No runtime introspection and no global
//!    tables. The registry is a value the engine owns; multiple engines
//!    can coexist in one process.
//!
//! 3. **Cooperative Scheduling**: Single-threaded, driven by the host's
//!    tick. The only deferred work is the delay between a rule becoming
//!    eligible and its message being displayed.
//!
//! ## Modules
//!
//! - `capability`: registry of host-provided conditions, variables,
//!   actions, and triggers
//! - `rules`: rule definitions, condition expressions, gating, and the
//!   dispatch engine
//! - `schedule`: tick-driven delayed execution
//! - `template`: `@variable` template resolution
//! - `host`: sink and store boundaries implemented by the host
//! - `error`: load-time and runtime error types

pub mod capability;
pub mod error;
pub mod host;
pub mod rules;
pub mod schedule;
pub mod template;

// Re-export commonly used types
pub use crate::capability::{
    ActionFn, CapabilityKind, CapabilityProvider, CapabilityRegistry, ConditionFn, TriggerFn,
    TriggerSignal, VariableFn,
};

pub use crate::error::Error;

pub use crate::host::{InstanceId, InstanceStore, MemoryStore, MessageSink, Notice, SessionId};

pub use crate::rules::{
    ActionGroup, ActionRef, ConditionExpr, DialogPos, DisplayKind, DisplaySpec, EngineBuilder,
    GateContext, GatePolicy, GateState, ParseError, Rule, RuleConfig, RuleEngine, RuleGate,
    RuleSetConfig, ScreenAnchor,
};

pub use crate::schedule::TickScheduler;

pub use crate::template::MessageComposer;
