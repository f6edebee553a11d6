//! Rule-set configuration records.
//!
//! The configuration file format and its parser live outside the engine;
//! these are the records that parser produces, deserializable with serde
//! from whatever source the host uses. Conversion into [`Rule`]s performs
//! all load-time validation: structural errors fail the load instead of
//! being discovered mid-run.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::warn;

use crate::capability::CapabilityRegistry;
use crate::error::Error;

use super::definition::{
    ActionGroup, ActionRef, DialogPos, DisplayKind, DisplaySpec, Rule, ScreenAnchor,
};
use super::expr::ConditionExpr;
use super::gate::{GatePolicy, RuleGate};

/// A full rule set, as parsed from configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    /// Rule records in declaration order; evaluation preserves it.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One rule record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique rule name.
    pub name: String,

    /// Gating policy; absent means no gating.
    #[serde(default)]
    pub once: GatePolicy,

    /// Seconds between the trigger and the display.
    #[serde(default)]
    pub delay: f64,

    /// Boolean expression over condition names.
    pub condition: String,

    /// Display kind.
    #[serde(rename = "type")]
    pub kind: DisplayKind,

    /// Screen anchor for transient messages.
    #[serde(default)]
    pub style: ScreenAnchor,

    /// On-screen duration for transient messages, in seconds.
    #[serde(default = "default_duration")]
    pub duration: f64,

    /// Dialog position.
    #[serde(default)]
    pub position: DialogPos,

    /// Dialog size; absent lets the host auto-size.
    #[serde(default)]
    pub size: Option<(f32, f32)>,

    /// Title template.
    pub title: String,

    /// Message template.
    pub message: String,

    /// Follow-up action groups.
    #[serde(default)]
    pub actions: Vec<ActionGroupConfig>,
}

fn default_duration() -> f64 {
    2.0
}

/// A named group of raw follow-up references.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionGroupConfig {
    /// Group label.
    pub name: String,

    /// Raw references: a rule name, a registered action name, or a
    /// `url:`/`urls:` prefixed link.
    #[serde(default)]
    pub refs: Vec<String>,
}

impl RuleConfig {
    /// Convert into a validated [`Rule`].
    ///
    /// `rule_names` is the complete name set of the rule set being
    /// loaded, used to resolve rule references in action groups.
    pub fn into_rule(
        self,
        registry: &CapabilityRegistry,
        rule_names: &FxHashSet<String>,
    ) -> Result<Rule, Error> {
        let condition =
            ConditionExpr::parse(&self.condition).map_err(|source| Error::ConditionSyntax {
                rule: self.name.clone(),
                source,
            })?;

        for name in condition.names() {
            if !registry.has_condition(name) {
                return Err(Error::UnknownCondition {
                    rule: self.name,
                    name: name.to_string(),
                });
            }
        }

        if self.delay < 0.0 {
            return Err(Error::NegativeDelay {
                rule: self.name,
                delay: self.delay,
            });
        }

        let display = match self.kind {
            DisplayKind::Dialog => DisplaySpec::Dialog {
                position: self.position,
                size: self.size,
            },
            DisplayKind::Transient => DisplaySpec::Transient {
                anchor: self.style,
                duration: self.duration,
            },
            DisplayKind::Log => DisplaySpec::Log,
        };

        let actions = self
            .actions
            .into_iter()
            .map(|group| resolve_group(&self.name, group, registry, rule_names))
            .collect();

        Ok(Rule {
            name: self.name,
            condition,
            delay: self.delay,
            display,
            title: self.title,
            message: self.message,
            actions,
            gate: RuleGate::new(self.once),
        })
    }
}

fn resolve_group(
    rule: &str,
    group: ActionGroupConfig,
    registry: &CapabilityRegistry,
    rule_names: &FxHashSet<String>,
) -> ActionGroup {
    let refs: SmallVec<[ActionRef; 2]> = group
        .refs
        .iter()
        .filter_map(|raw| resolve_ref(rule, raw, registry, rule_names))
        .collect();
    ActionGroup {
        name: group.name,
        refs,
    }
}

/// Resolve one raw reference: rule name first, then registered action,
/// then URL prefix. An unresolvable reference is dropped, not fatal.
fn resolve_ref(
    rule: &str,
    raw: &str,
    registry: &CapabilityRegistry,
    rule_names: &FxHashSet<String>,
) -> Option<ActionRef> {
    if rule_names.contains(raw) {
        return Some(ActionRef::Rule(raw.to_string()));
    }
    if registry.has_action(raw) {
        return Some(ActionRef::Registered(raw.to_string()));
    }
    if let Some(rest) = raw.strip_prefix("url:").or_else(|| raw.strip_prefix("urls:")) {
        return Some(ActionRef::Url(rest.trim().to_string()));
    }
    warn!(rule, reference = raw, "unresolved action reference, dropped");
    None
}
