//! Per-resource policies applied at copy and update time.
//!
//! A [`ResourcePolicy`] is built once per resource type and never mutated
//! afterwards. It answers two questions:
//! - should an inbound value be written into the tree ([`ResourcePolicy::suppression`])
//! - is a planned update allowed at all ([`ResourcePolicy::validate_update`])

use crate::error::ValidationError;
use statekeep_types::{Tree, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A rule attached to one top-level attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldRule {
    /// Set on create, never changed afterwards.
    Immutable,
    /// Accepted by the server but never read back.
    WriteOnly,
    /// The server reports its own rendering; the configured value wins once
    /// the tree holds one.
    ServerDerived,
    /// Script text compared after normalization.
    Script,
    /// Once set, may be changed but not cleared.
    NoRemoval,
}

/// Why copy left an attribute alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    WriteOnly,
    ServerDerived,
    ScriptEquivalent,
    Custom,
}

type SuppressFn<R> = Box<dyn Fn(&str, &R, &Tree) -> bool + Send + Sync>;

/// Rules for one resource type.
pub struct ResourcePolicy<R> {
    rules: BTreeMap<&'static str, Vec<FieldRule>>,
    suppress: Option<SuppressFn<R>>,
}

impl<R> ResourcePolicy<R> {
    /// A policy with no rules: every inbound value is copied.
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
            suppress: None,
        }
    }

    /// Adds `rule` to attribute `key`. An attribute may carry several rules.
    #[must_use]
    pub fn rule(mut self, key: &'static str, rule: FieldRule) -> Self {
        let rules = self.rules.entry(key).or_default();
        if !rules.contains(&rule) {
            rules.push(rule);
        }
        self
    }

    /// Attaches a record-specific suppression predicate, called with the
    /// attribute key, the inbound record and the current tree.
    #[must_use]
    pub fn suppress_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &R, &Tree) -> bool + Send + Sync + 'static,
    {
        self.suppress = Some(Box::new(predicate));
        self
    }

    pub fn has_rule(&self, key: &str, rule: FieldRule) -> bool {
        self.rules.get(key).is_some_and(|rules| rules.contains(&rule))
    }

    pub fn rules(&self, key: &str) -> &[FieldRule] {
        self.rules.get(key).map_or(&[], Vec::as_slice)
    }

    /// Decides whether copying `inbound` into `tree[key]` is suppressed.
    pub fn suppression(
        &self,
        key: &str,
        inbound: &Value,
        record: &R,
        tree: &Tree,
    ) -> Option<Suppression> {
        for rule in self.rules(key) {
            match rule {
                FieldRule::WriteOnly => return Some(Suppression::WriteOnly),
                FieldRule::ServerDerived if tree.get_present(key).is_some() => {
                    return Some(Suppression::ServerDerived);
                }
                FieldRule::Script => {
                    let current = tree.get(key).as_str();
                    if current.zip(inbound.as_str()).is_some_and(|(a, b)| scripts_equal(a, b)) {
                        return Some(Suppression::ScriptEquivalent);
                    }
                }
                _ => {}
            }
        }
        match &self.suppress {
            Some(predicate) if predicate(key, record, tree) => Some(Suppression::Custom),
            _ => None,
        }
    }

    /// Checks a planned update against the prior state.
    ///
    /// Attributes are checked in key order and the first violation is
    /// returned. Values the planner does not know yet never violate.
    pub fn validate_update(&self, prior: &Tree, planned: &Tree) -> Result<(), ValidationError> {
        for (key, rules) in &self.rules {
            let Some(old) = prior.get_present(key) else {
                continue;
            };
            let new = planned.get(key);
            if !new.is_known() {
                continue;
            }
            for rule in rules {
                match rule {
                    FieldRule::Immutable if new != old => {
                        return Err(ValidationError::Immutable {
                            field: key.to_string(),
                            from: render(old),
                            to: render(new),
                        });
                    }
                    FieldRule::NoRemoval if !old.is_empty() && (new.is_null() || new.is_empty()) => {
                        return Err(ValidationError::RemovalForbidden {
                            field: key.to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

impl<R> Default for ResourcePolicy<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for ResourcePolicy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePolicy")
            .field("rules", &self.rules)
            .field("custom_suppression", &self.suppress.is_some())
            .finish()
    }
}

/// Normalized lines of a script: each line trimmed, one trailing `.` or
/// `;` dropped, blank lines removed.
pub fn normalize_script(script: &str) -> Vec<&str> {
    script
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_suffix(['.', ';']).unwrap_or(line).trim_end()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// True if two scripts differ only in whitespace or trailing terminators.
pub fn scripts_equal(a: &str, b: &str) -> bool {
    normalize_script(a) == normalize_script(b)
}

fn render(value: &Value) -> String {
    match value.to_json() {
        Some(json) => json.to_string(),
        None => "(unset)".to_string(),
    }
}
