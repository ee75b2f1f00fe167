//! Side channel for rule decisions.
//!
//! The rule itself only returns [`RuleOutcome`](crate::rule::RuleOutcome);
//! *why* it did not fire is reported here so operators can troubleshoot a
//! silent mapper without the decision logic depending on a logger.

use std::sync::Mutex;

use crate::config::ConfigError;
use crate::group::GroupPath;

/// Where the rule looked for its source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    UserProfile,
    OtherClaims,
}

impl core::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SourceKind::UserProfile => f.write_str("user profile"),
            SourceKind::OtherClaims => f.write_str("other claims"),
        }
    }
}

/// Why a rule produced no change. Callers treat every variant the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoChangeReason {
    MisconfiguredRule(ConfigError),
    UnresolvedGroup {
        path: GroupPath,
    },
    MembershipMismatch {
        path: GroupPath,
        is_member: bool,
        require_membership: bool,
    },
    UnresolvedOrNonStringSource {
        attribute: String,
        source: SourceKind,
    },
}

impl core::fmt::Display for NoChangeReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NoChangeReason::MisconfiguredRule(err) => write!(f, "misconfigured rule: {err}"),
            NoChangeReason::UnresolvedGroup { path } => write!(f, "group '{path}' not found"),
            NoChangeReason::MembershipMismatch {
                path,
                is_member,
                require_membership,
            } => write!(
                f,
                "membership in '{path}' is {is_member}, rule requires {require_membership}"
            ),
            NoChangeReason::UnresolvedOrNonStringSource { attribute, source } => {
                write!(f, "'{attribute}' is missing or not a string in {source}")
            }
        }
    }
}

/// A single reported decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NoChange(NoChangeReason),
    Modified { attribute: String, value: String },
}

pub trait DecisionSink: Send + Sync {
    fn no_change(&self, reason: &NoChangeReason);

    fn modified(&self, attribute: &str, value: &str) {
        let _ = (attribute, value);
    }
}

/// Emits decisions as `debug` events. Modified values are not logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DecisionSink for TracingSink {
    fn no_change(&self, reason: &NoChangeReason) {
        tracing::debug!(%reason, "claim left unchanged");
    }

    fn modified(&self, attribute: &str, _value: &str) {
        tracing::debug!(attribute, "claim modified");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DecisionSink for NoopSink {
    fn no_change(&self, _reason: &NoChangeReason) {}
}

/// Keeps every decision in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    decisions: Mutex<Vec<Decision>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decisions(&self) -> Vec<Decision> {
        self.decisions.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Decision> {
        self.decisions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    fn push(&self, decision: Decision) {
        self.decisions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(decision);
    }
}

impl DecisionSink for RecordingSink {
    fn no_change(&self, reason: &NoChangeReason) {
        self.push(Decision::NoChange(reason.clone()));
    }

    fn modified(&self, attribute: &str, value: &str) {
        self.push(Decision::Modified {
            attribute: attribute.to_string(),
            value: value.to_string(),
        });
    }
}
