use serde::{Deserialize, Serialize};

use crate::errors::RuleError;

/// Number of value slots in a stored rule row.
pub const FIELD_COUNT: usize = 6;

/// One of the seven addressable columns of a rule row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    #[serde(rename = "ptype")]
    PType,
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
}

impl Column {
    pub const ALL: [Column; FIELD_COUNT + 1] = [
        Column::PType,
        Column::V0,
        Column::V1,
        Column::V2,
        Column::V3,
        Column::V4,
        Column::V5,
    ];

    /// Column holding value slot `index`.
    pub fn field(index: usize) -> Result<Self, RuleError> {
        Self::ALL
            .get(index + 1)
            .copied()
            .ok_or(RuleError::FieldOutOfRange { index })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PType => "ptype",
            Self::V0 => "v0",
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
            Self::V4 => "v4",
            Self::V5 => "v5",
        }
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Policy model section a rule type belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "p")]
    Policy,
    #[serde(rename = "g")]
    Grouping,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Policy, Section::Grouping];

    /// Resolve the section from the leading character of a policy type
    /// (`p`, `p2` -> policy; `g`, `g2` -> grouping).
    pub fn of(ptype: &str) -> Result<Self, RuleError> {
        match ptype.chars().next() {
            Some('p') => Ok(Self::Policy),
            Some('g') => Ok(Self::Grouping),
            _ => Err(RuleError::UnknownSection(ptype.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Policy => "p",
            Self::Grouping => "g",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Section {
    type Err = RuleError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p" => Ok(Self::Policy),
            "g" => Ok(Self::Grouping),
            other => Err(RuleError::UnknownSection(other.to_string())),
        }
    }
}

/// Flat, fixed-width form of a rule as it is stored: a type tag plus six
/// value slots. An empty slot means "unused".
///
/// Arity is recovered from the last non-empty slot, so a rule whose final
/// value is itself the empty string cannot be told apart from a shorter rule.
/// `["alice", "data1", ""]` is stored and read back as `["alice", "data1"]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleRow {
    pub ptype: String,
    pub fields: [String; FIELD_COUNT],
}

impl RuleRow {
    /// Encode a variable-length rule into row form. Values go into slots
    /// `0..rule.len()`; the remaining slots stay empty.
    pub fn encode<S: AsRef<str>>(ptype: &str, rule: &[S]) -> Result<Self, RuleError> {
        if ptype.is_empty() {
            return Err(RuleError::EmptyPolicyType);
        }
        if rule.is_empty() {
            return Err(RuleError::EmptyRule);
        }
        if rule.len() > FIELD_COUNT {
            return Err(RuleError::TooManyFields { len: rule.len() });
        }

        let mut row = Self {
            ptype: ptype.to_string(),
            ..Self::default()
        };
        for (slot, value) in row.fields.iter_mut().zip(rule) {
            *slot = value.as_ref().to_string();
        }
        Ok(row)
    }

    /// Number of meaningful slots: one past the last non-empty slot.
    pub fn arity(&self) -> usize {
        self.fields
            .iter()
            .rposition(|v| !v.is_empty())
            .map_or(0, |last| last + 1)
    }

    /// Decode back into a variable-length rule. `None` when every slot is empty.
    pub fn decode(&self) -> Option<Vec<String>> {
        match self.arity() {
            0 => None,
            n => Some(self.fields[..n].to_vec()),
        }
    }

    /// Value at a column, type tag included.
    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::PType => &self.ptype,
            other => &self.fields[other.position() - 1],
        }
    }

    /// Type tag followed by all six slots, empty ones included.
    pub fn into_values(self) -> Vec<String> {
        let mut values = Vec::with_capacity(FIELD_COUNT + 1);
        values.push(self.ptype);
        values.extend(self.fields);
        values
    }

    /// Render as a policy-file line: `p, alice, data1, read`.
    pub fn to_line(&self) -> Option<String> {
        let rule = self.decode()?;
        let mut parts = Vec::with_capacity(rule.len() + 1);
        parts.push(self.ptype.as_str());
        parts.extend(rule.iter().map(String::as_str));
        Some(parts.join(", "))
    }
}
