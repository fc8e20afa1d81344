use crate::core::constants::NUM_ATTRIBUTE_KINDS;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trainable attributes. Also the set of valid training focuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    #[default]
    Vitality,
    PhysicalAttack,
    MagicAttack,
    PhysicalDefense,
    MagicDefense,
}

impl AttributeKind {
    pub fn all() -> [AttributeKind; NUM_ATTRIBUTE_KINDS] {
        [
            AttributeKind::Vitality,
            AttributeKind::PhysicalAttack,
            AttributeKind::MagicAttack,
            AttributeKind::PhysicalDefense,
            AttributeKind::MagicDefense,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::Vitality => "vitality",
            AttributeKind::PhysicalAttack => "physical_attack",
            AttributeKind::MagicAttack => "magic_attack",
            AttributeKind::PhysicalDefense => "physical_defense",
            AttributeKind::MagicDefense => "magic_defense",
        }
    }

    pub fn abbrev(&self) -> &str {
        match self {
            AttributeKind::Vitality => "VIT",
            AttributeKind::PhysicalAttack => "PATK",
            AttributeKind::MagicAttack => "MATK",
            AttributeKind::PhysicalDefense => "PDEF",
            AttributeKind::MagicDefense => "MDEF",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            AttributeKind::Vitality => 0,
            AttributeKind::PhysicalAttack => 1,
            AttributeKind::MagicAttack => 2,
            AttributeKind::PhysicalDefense => 3,
            AttributeKind::MagicDefense => 4,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttributeKind {
    type Err = EngineError;

    /// Accepts the snake_case name or the abbreviation, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AttributeKind::all()
            .into_iter()
            .find(|kind| {
                kind.name().eq_ignore_ascii_case(wanted) || kind.abbrev().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| EngineError::UnknownAttributeKind(s.to_string()))
    }
}

/// Accumulated attribute points per kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AttributeTotals {
    values: [u64; NUM_ATTRIBUTE_KINDS],
}

impl AttributeTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: AttributeKind) -> u64 {
        self.values[kind.index()]
    }

    pub fn set(&mut self, kind: AttributeKind, value: u64) {
        self.values[kind.index()] = value;
    }

    pub fn add(&mut self, kind: AttributeKind, amount: u64) {
        self.values[kind.index()] = self.values[kind.index()].saturating_add(amount);
    }

    /// Adds another set of totals to this one.
    pub fn merge(&mut self, other: &AttributeTotals) {
        for kind in AttributeKind::all() {
            self.add(kind, other.get(kind));
        }
    }

    pub fn total(&self) -> u64 {
        self.values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeKind, u64)> + '_ {
        AttributeKind::all()
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_abbrevs() {
        assert_eq!("vitality".parse::<AttributeKind>().unwrap(), AttributeKind::Vitality);
        assert_eq!("MATK".parse::<AttributeKind>().unwrap(), AttributeKind::MagicAttack);
        assert_eq!(
            " Physical_Defense ".parse::<AttributeKind>().unwrap(),
            AttributeKind::PhysicalDefense
        );
    }

    #[test]
    fn test_parse_unknown_kind_fails() {
        let err = "luck".parse::<AttributeKind>().unwrap_err();
        assert!(matches!(err, EngineError::UnknownAttributeKind(name) if name == "luck"));
    }

    #[test]
    fn test_index_returns_unique_values() {
        for (i, kind) in AttributeKind::all().iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in AttributeKind::all() {
            assert_eq!(kind.to_string().parse::<AttributeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_totals_add_and_merge() {
        let mut totals = AttributeTotals::new();
        totals.add(AttributeKind::Vitality, 4);
        totals.add(AttributeKind::Vitality, 3);
        assert_eq!(totals.get(AttributeKind::Vitality), 7);

        let mut other = AttributeTotals::new();
        other.set(AttributeKind::MagicDefense, 2);
        totals.merge(&other);
        assert_eq!(totals.get(AttributeKind::MagicDefense), 2);
        assert_eq!(totals.total(), 9);
    }

    #[test]
    fn test_totals_saturate() {
        let mut totals = AttributeTotals::new();
        totals.set(AttributeKind::MagicAttack, u64::MAX - 1);
        totals.add(AttributeKind::MagicAttack, 10);
        assert_eq!(totals.get(AttributeKind::MagicAttack), u64::MAX);
    }
}
