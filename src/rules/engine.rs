//! The rule engine dispatcher.
//!
//! Owns the capability registry, the loaded rules, and the dispatch
//! scheduler. Built exactly once via [`EngineBuilder`]; the build order
//! matters: capabilities are finalized first, rules are validated against
//! them, and triggers are wired last so no signal can fire against a
//! half-built engine.
//!
//! Everything runs on the host's cooperative loop. A trigger firing runs
//! the full evaluation pass synchronously; the only deferral point is the
//! delay between scheduling a dispatch and the `advance` call that lands
//! it. Host callbacks (conditions, variables, actions, sinks) must not
//! call back into the engine synchronously; the core is borrowed while
//! they run.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, info};

use crate::capability::{CapabilityRegistry, TriggerSignal};
use crate::error::Error;
use crate::host::{InstanceId, InstanceStore, MemoryStore, MessageSink, Notice, SessionId};
use crate::schedule::TickScheduler;
use crate::template::MessageComposer;

use super::config::RuleSetConfig;
use super::definition::{ActionRef, Rule};
use super::gate::GateContext;

/// A dispatch waiting for its delay to elapse.
///
/// Templates are resolved at schedule time, so the text reflects variable
/// values at the triggering moment.
#[derive(Clone, Debug)]
struct PendingDispatch {
    rule_index: usize,
    title: String,
    message: String,
}

struct EngineCore {
    registry: CapabilityRegistry,
    rules: Vec<Rule>,
    index: FxHashMap<String, usize>,
    scheduler: TickScheduler<PendingDispatch>,
    sink: Box<dyn MessageSink>,
    store: Box<dyn InstanceStore>,
    session: Option<SessionId>,
    instance: Option<InstanceId>,
}

impl EngineCore {
    /// Evaluate every rule, in declaration order, against one condition
    /// snapshot.
    fn process_all(&mut self) {
        let snapshot = self.registry.snapshot_conditions();
        for i in 0..self.rules.len() {
            self.consider(i, &snapshot);
        }
    }

    fn consider(&mut self, i: usize, snapshot: &FxHashMap<String, bool>) {
        let ctx = GateContext {
            session: self.session,
            instance: self.instance.as_ref(),
        };
        let rule = &self.rules[i];

        if !rule.gate.may_fire(&rule.name, &ctx, self.store.as_ref()) {
            return;
        }

        match rule.condition.eval(snapshot) {
            Ok(true) => self.schedule(i),
            Ok(false) => {}
            Err(e) => {
                // Per-rule failure; the pass continues.
                error!(rule = %rule.name, error = %e, "condition evaluation failed");
            }
        }
    }

    /// Compose templates and queue the dispatch. Used by both the normal
    /// evaluation path and forced invocation.
    fn schedule(&mut self, i: usize) {
        let title = MessageComposer::resolve(&self.rules[i].title, &self.registry);
        let message = MessageComposer::resolve(&self.rules[i].message, &self.registry);

        let rule = &mut self.rules[i];
        rule.gate.mark_scheduled();
        debug!(rule = %rule.name, delay = rule.delay, "scheduled dispatch");
        self.scheduler.after(
            rule.delay,
            PendingDispatch {
                rule_index: i,
                title,
                message,
            },
        );
    }

    /// Schedule a rule by name, bypassing its gate and condition.
    fn force(&mut self, name: &str) -> Result<(), Error> {
        let Some(&i) = self.index.get(name) else {
            return Err(Error::UnknownRule(name.to_string()));
        };
        self.schedule(i);
        Ok(())
    }

    fn advance(&mut self, dt: f64) {
        for pending in self.scheduler.advance(dt) {
            self.dispatch(pending);
        }
    }

    fn dispatch(&mut self, pending: PendingDispatch) {
        let i = pending.rule_index;
        let name = self.rules[i].name.clone();

        self.sink.deliver(Notice {
            rule: name.clone(),
            title: pending.title,
            message: pending.message,
            display: self.rules[i].display.clone(),
        });

        let groups = self.rules[i].actions.clone();
        for group in &groups {
            for action in &group.refs {
                match action {
                    ActionRef::Rule(target) => {
                        // Resolved at load time; cannot miss.
                        let _ = self.force(target);
                    }
                    ActionRef::Registered(target) => {
                        if let Some(f) = self.registry.action(target) {
                            f();
                        }
                    }
                    ActionRef::Url(target) => self.sink.open_url(target),
                }
            }
        }

        // Shown is recorded against the scopes current at dispatch time.
        let ctx = GateContext {
            session: self.session,
            instance: self.instance.as_ref(),
        };
        self.rules[i].gate.mark_shown(&name, &ctx, self.store.as_mut());
        info!(rule = %name, "displayed notification");
    }
}

/// The condition-triggered notification engine.
///
/// Cheap to clone; clones share one core. Trigger signals hold the core
/// weakly, so dropping every `RuleEngine` handle tears the engine down
/// and turns wired triggers into no-ops.
///
/// ## Example
///
/// ```
/// use herald::capability::CapabilityRegistry;
/// use herald::host::{MessageSink, Notice};
/// use herald::rules::{RuleEngine, RuleSetConfig};
///
/// struct LogSink;
/// impl MessageSink for LogSink {
///     fn deliver(&mut self, notice: Notice) {
///         println!("{}: {}", notice.title, notice.message);
///     }
/// }
///
/// let registry = CapabilityRegistry::new()
///     .with_condition("InFlight", || true)
///     .with_variable("GameTitle", || "Apollo".to_string());
///
/// let config: RuleSetConfig = serde_json::from_str(r#"{"rules": [{
///     "name": "Welcome",
///     "condition": "InFlight",
///     "type": "transient",
///     "title": "",
///     "message": "Hello @GameTitle"
/// }]}"#).unwrap();
///
/// let engine = RuleEngine::builder()
///     .capabilities(registry)
///     .rules(config)
///     .sink(LogSink)
///     .build()
///     .unwrap();
///
/// engine.process_all();
/// engine.advance(0.0); // host tick lands the dispatch
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    core: Rc<RefCell<EngineCore>>,
}

impl RuleEngine {
    /// Start building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Re-evaluate every rule now. Hosts typically call this once after
    /// build; afterwards wired triggers drive re-evaluation.
    pub fn process_all(&self) {
        self.core.borrow_mut().process_all();
    }

    /// Force one rule by name: bypasses its gate and condition, still
    /// composes templates, still honors the delay, still marks shown.
    pub fn force(&self, name: &str) -> Result<(), Error> {
        self.core.borrow_mut().force(name)
    }

    /// Advance the host clock by `dt` seconds and land due dispatches.
    ///
    /// Dispatches run in delay-expiry order, which may differ from
    /// declaration order. A dispatch scheduled under a scope that has
    /// since changed still runs; its showing is recorded against the
    /// current scope.
    pub fn advance(&self, dt: f64) {
        self.core.borrow_mut().advance(dt);
    }

    /// Tell the engine which session is live, or `None` between sessions.
    pub fn set_session(&self, session: Option<SessionId>) {
        self.core.borrow_mut().session = session;
    }

    /// Tell the engine which persisted instance is open, or `None`.
    pub fn set_instance(&self, instance: Option<InstanceId>) {
        self.core.borrow_mut().instance = instance;
    }

    /// Number of loaded rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.core.borrow().rules.len()
    }

    /// Names of loaded rules, in declaration order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<String> {
        self.core
            .borrow()
            .rules
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    /// Number of dispatches waiting on their delay.
    #[must_use]
    pub fn pending_dispatches(&self) -> usize {
        self.core.borrow().scheduler.len()
    }

    fn signal(core: &Rc<RefCell<EngineCore>>) -> TriggerSignal {
        let weak = Rc::downgrade(core);
        Rc::new(move || {
            if let Some(core) = weak.upgrade() {
                core.borrow_mut().process_all();
            }
        })
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("RuleEngine")
            .field("rules", &core.rules.len())
            .field("pending", &core.scheduler.len())
            .field("session", &core.session)
            .field("instance", &core.instance)
            .finish()
    }
}

/// Builds a [`RuleEngine`].
///
/// Consumed by `build`; the registry and rule tables are populated
/// exactly once and are read-only afterwards. There is no rebuild path;
/// construct a fresh engine instead.
#[derive(Default)]
pub struct EngineBuilder {
    registry: CapabilityRegistry,
    config: RuleSetConfig,
    sink: Option<Box<dyn MessageSink>>,
    store: Option<Box<dyn InstanceStore>>,
}

impl EngineBuilder {
    /// Start with an empty registry and no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a prepared capability registry.
    #[must_use]
    pub fn capabilities(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Apply a capability provider to the registry being built.
    #[must_use]
    pub fn install(mut self, provider: &dyn crate::capability::CapabilityProvider) -> Self {
        self.registry.install(provider);
        self
    }

    /// Load a rule set.
    #[must_use]
    pub fn rules(mut self, config: RuleSetConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the message sink. Required.
    #[must_use]
    pub fn sink(mut self, sink: impl MessageSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Set the instance store. Defaults to an in-process [`MemoryStore`].
    #[must_use]
    pub fn store(mut self, store: impl InstanceStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Validate the rule set and wire the triggers.
    ///
    /// Structural errors (duplicate rule names, bad expressions, unknown
    /// conditions, negative delays) fail the build; nothing is partially
    /// loaded.
    pub fn build(self) -> Result<RuleEngine, Error> {
        let mut registry = self.registry;
        let sink = self.sink.ok_or(Error::MissingSink)?;
        let store = self.store.unwrap_or_else(|| Box::new(MemoryStore::new()));

        // Name set first: duplicates are load errors, and action refs
        // resolve against the full set regardless of declaration order.
        let mut names: FxHashSet<String> = FxHashSet::default();
        for rule in &self.config.rules {
            if !names.insert(rule.name.clone()) {
                return Err(Error::DuplicateRule(rule.name.clone()));
            }
        }

        let rules = self
            .config
            .rules
            .into_iter()
            .map(|config| config.into_rule(&registry, &names))
            .collect::<Result<Vec<_>, _>>()?;

        let index = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.name.clone(), i))
            .collect();

        let triggers = registry.take_triggers();

        let core = Rc::new(RefCell::new(EngineCore {
            registry,
            rules,
            index,
            scheduler: TickScheduler::new(),
            sink,
            store,
            session: None,
            instance: None,
        }));

        // Wire triggers last: each provider gets the signal once and
        // subscribes its event source for the rest of the process.
        for (name, wire) in triggers {
            wire(RuleEngine::signal(&core));
            debug!(trigger = %name, "wired trigger");
        }

        Ok(RuleEngine { core })
    }
}
