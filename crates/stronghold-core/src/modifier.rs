//! Situational roll modifiers.

use serde::{Deserialize, Serialize};

/// The bonus/penalty type of a modifier.
///
/// `Ability` and `Proficiency` are character-derived: the roll subsystem
/// recomputes them from the acting character on every roll, so the reroll
/// store never persists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    Circumstance,
    Item,
    Status,
    Ability,
    Proficiency,
    Untyped,
}

impl ModifierKind {
    /// Whether this kind is recomputed from the acting character each roll.
    #[must_use]
    pub fn is_character_derived(self) -> bool {
        matches!(self, Self::Ability | Self::Proficiency)
    }
}

/// Where a situational modifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierSource {
    Structure,
    Aid,
    Unrest,
    Custom,
}

/// A labeled numeric bonus or penalty applied to a roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    /// Display label, also the identity used by the reroll merge.
    pub label: String,
    /// Bonus (positive) or penalty (negative).
    pub value: i32,
    /// Bonus/penalty type.
    pub kind: ModifierKind,
    /// Whether the modifier is currently toggled on.
    pub enabled: bool,
    /// Whether the modifier is suppressed regardless of `enabled`.
    pub ignored: bool,
    /// Origin of the modifier, if situational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ModifierSource>,
}

impl Modifier {
    /// Creates an enabled, un-ignored modifier.
    #[must_use]
    pub fn new(label: impl Into<String>, value: i32, kind: ModifierKind) -> Self {
        Self {
            label: label.into(),
            value,
            kind,
            enabled: true,
            ignored: false,
            source: None,
        }
    }

    /// Tags the modifier with its source.
    #[must_use]
    pub fn with_source(mut self, source: ModifierSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Marks the modifier disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the modifier contributes to a roll total.
    #[must_use]
    pub fn applies(&self) -> bool {
        self.enabled && !self.ignored
    }
}

/// Sums the values of all modifiers that currently apply.
#[must_use]
pub fn applied_total(modifiers: &[Modifier]) -> i32 {
    modifiers
        .iter()
        .filter(|m| m.applies())
        .map(|m| m.value)
        .sum()
}
