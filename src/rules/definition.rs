//! Rule definitions.
//!
//! A rule is the data entity behind one notification: a condition
//! expression, display parameters, a delay, a gating policy, follow-up
//! actions, and the gate instance that tracks whether it already fired.
//! Rules are constructed once at load time and live for the process.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::expr::ConditionExpr;
use super::gate::{GatePolicy, RuleGate};

/// How a rule's message is displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    /// A modal dialog with a title.
    Dialog,
    /// A transient on-screen message that fades after a duration.
    Transient,
    /// A line in the host's log.
    Log,
}

/// Screen region a transient message is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenAnchor {
    #[default]
    UpperCenter,
    UpperLeft,
    UpperRight,
    LowerCenter,
    Center,
}

/// Dialog position in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DialogPos {
    pub x: f32,
    pub y: f32,
}

impl Default for DialogPos {
    fn default() -> Self {
        Self { x: 100.0, y: 100.0 }
    }
}

/// Kind-specific display parameters, fully defaulted at load time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DisplaySpec {
    /// Modal dialog at a screen position, optionally sized.
    Dialog {
        position: DialogPos,
        size: Option<(f32, f32)>,
    },
    /// Transient message anchored to a screen region for a duration in
    /// seconds.
    Transient { anchor: ScreenAnchor, duration: f64 },
    /// Log line; no parameters.
    Log,
}

impl DisplaySpec {
    /// The display kind these parameters belong to.
    #[must_use]
    pub fn kind(&self) -> DisplayKind {
        match self {
            DisplaySpec::Dialog { .. } => DisplayKind::Dialog,
            DisplaySpec::Transient { .. } => DisplayKind::Transient,
            DisplaySpec::Log => DisplayKind::Log,
        }
    }
}

/// A resolved follow-up reference.
///
/// References are resolved once at load time, in precedence order: a
/// loaded rule's name, then a registered action, then a `url:`/`urls:`
/// link. Anything else is dropped during load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionRef {
    /// Force another rule by name, bypassing its gate and condition.
    Rule(String),
    /// Invoke a registered action capability.
    Registered(String),
    /// Ask the sink to open an external link.
    Url(String),
}

/// An ordered, named group of follow-up references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionGroup {
    /// Group label (a dialog button caption, typically).
    pub name: String,
    /// References executed in declared order.
    pub refs: SmallVec<[ActionRef; 2]>,
}

/// One loaded notification rule.
///
/// `title` and `message` hold unresolved template text; `@name`
/// placeholders are substituted when the rule is scheduled.
#[derive(Debug)]
pub struct Rule {
    /// Unique name; doubles as the persistence key under instance gating.
    pub name: String,

    /// When the rule wants to fire.
    pub condition: ConditionExpr,

    /// Seconds between "condition satisfied" and display.
    pub delay: f64,

    /// How to display the message.
    pub display: DisplaySpec,

    /// Title template.
    pub title: String,

    /// Message template.
    pub message: String,

    /// Follow-up action groups, in declared order.
    pub actions: SmallVec<[ActionGroup; 2]>,

    /// Gating state machine.
    pub gate: RuleGate,
}

impl Rule {
    /// Create a rule with no delay, no gating, log display, and no
    /// actions.
    pub fn new(name: impl Into<String>, condition: ConditionExpr) -> Self {
        Self {
            name: name.into(),
            condition,
            delay: 0.0,
            display: DisplaySpec::Log,
            title: String::new(),
            message: String::new(),
            actions: SmallVec::new(),
            gate: RuleGate::new(GatePolicy::None),
        }
    }

    /// Set the gating policy (builder pattern).
    #[must_use]
    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.gate = RuleGate::new(policy);
        self
    }

    /// Set the dispatch delay in seconds (builder pattern).
    #[must_use]
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Set the display parameters (builder pattern).
    #[must_use]
    pub fn with_display(mut self, display: DisplaySpec) -> Self {
        self.display = display;
        self
    }

    /// Set the title template (builder pattern).
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the message template (builder pattern).
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Append a follow-up group (builder pattern).
    #[must_use]
    pub fn with_action_group(
        mut self,
        name: impl Into<String>,
        refs: impl IntoIterator<Item = ActionRef>,
    ) -> Self {
        self.actions.push(ActionGroup {
            name: name.into(),
            refs: refs.into_iter().collect(),
        });
        self
    }
}
