use serde::{Deserialize, Serialize};

use crate::errors::RuleError;
use crate::rule::{Column, FIELD_COUNT};

/// Multi-valued filter for partial loads. Each column carries a set of
/// candidate values; an empty set leaves that column unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub ptype: Vec<String>,
    #[serde(default)]
    pub v0: Vec<String>,
    #[serde(default)]
    pub v1: Vec<String>,
    #[serde(default)]
    pub v2: Vec<String>,
    #[serde(default)]
    pub v3: Vec<String>,
    #[serde(default)]
    pub v4: Vec<String>,
    #[serde(default)]
    pub v5: Vec<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add candidate values for a column.
    pub fn with<I, S>(mut self, column: Column, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values_mut(column)
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn values(&self, column: Column) -> &[String] {
        match column {
            Column::PType => &self.ptype,
            Column::V0 => &self.v0,
            Column::V1 => &self.v1,
            Column::V2 => &self.v2,
            Column::V3 => &self.v3,
            Column::V4 => &self.v4,
            Column::V5 => &self.v5,
        }
    }

    fn values_mut(&mut self, column: Column) -> &mut Vec<String> {
        match column {
            Column::PType => &mut self.ptype,
            Column::V0 => &mut self.v0,
            Column::V1 => &mut self.v1,
            Column::V2 => &mut self.v2,
            Column::V3 => &mut self.v3,
            Column::V4 => &mut self.v4,
            Column::V5 => &mut self.v5,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        Column::ALL.iter().all(|c| self.values(*c).is_empty())
    }
}

/// Sparse selection over the six value slots, used by filtered remove and
/// filtered update. Unset or empty positions are not constrained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldFilter {
    fields: [Option<String>; FIELD_COUNT],
}

impl FieldFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain slot `index` to `value`.
    pub fn set(mut self, index: usize, value: impl Into<String>) -> Result<Self, RuleError> {
        let slot = self
            .fields
            .get_mut(index)
            .ok_or(RuleError::FieldOutOfRange { index })?;
        *slot = Some(value.into());
        Ok(self)
    }

    /// Build from a starting slot plus consecutive values: value `k` lands in
    /// slot `offset + k`.
    pub fn from_offset<S: AsRef<str>>(offset: usize, values: &[S]) -> Result<Self, RuleError> {
        // last slot touched; an empty value list still needs `offset` in range
        let last = offset.saturating_add(values.len().max(1) - 1);
        if last >= FIELD_COUNT {
            return Err(RuleError::FieldOutOfRange { index: last });
        }
        let mut filter = Self::new();
        for (k, value) in values.iter().enumerate() {
            filter.fields[offset + k] = Some(value.as_ref().to_string());
        }
        Ok(filter)
    }

    /// Constrained slots in ascending order, empty values skipped.
    pub fn constrained(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.fields.iter().enumerate().filter_map(|(i, v)| match v.as_deref() {
            Some(value) if !value.is_empty() => Some((i, value)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_is_unconstrained() {
        assert!(Filter::new().is_unconstrained());
        assert!(!Filter::new().with(Column::V0, ["bob"]).is_unconstrained());
    }

    #[test]
    fn with_accumulates_values() {
        let f = Filter::new()
            .with(Column::V1, ["data1"])
            .with(Column::V1, ["data2".to_string()]);
        assert_eq!(f.values(Column::V1), ["data1", "data2"]);
        assert!(f.values(Column::V0).is_empty());
    }

    #[test]
    fn from_offset_places_values() {
        let f = FieldFilter::from_offset(1, &["data2", "write"]).unwrap();
        let got: Vec<_> = f.constrained().collect();
        assert_eq!(got, vec![(1, "data2"), (2, "write")]);
    }

    #[test]
    fn from_offset_skips_empty_values() {
        let f = FieldFilter::from_offset(0, &["", "data1"]).unwrap();
        let got: Vec<_> = f.constrained().collect();
        assert_eq!(got, vec![(1, "data1")]);
    }

    #[test]
    fn from_offset_rejects_overflow() {
        assert_eq!(
            FieldFilter::from_offset(4, &["a", "b", "c"]),
            Err(RuleError::FieldOutOfRange { index: 6 })
        );
        let none: [&str; 0] = [];
        assert_eq!(
            FieldFilter::from_offset(6, &none),
            Err(RuleError::FieldOutOfRange { index: 6 })
        );
    }

    #[test]
    fn from_offset_rejects_huge_offset() {
        assert_eq!(
            FieldFilter::from_offset(usize::MAX, &["a"]),
            Err(RuleError::FieldOutOfRange { index: usize::MAX })
        );
        let none: [&str; 0] = [];
        assert_eq!(
            FieldFilter::from_offset(usize::MAX, &none),
            Err(RuleError::FieldOutOfRange { index: usize::MAX })
        );
        assert!(FieldFilter::from_offset(usize::MAX - 1, &["a", "b", "c"]).is_err());
    }

    #[test]
    fn set_rejects_bad_index() {
        assert!(FieldFilter::new().set(5, "x").is_ok());
        assert_eq!(
            FieldFilter::new().set(6, "x"),
            Err(RuleError::FieldOutOfRange { index: 6 })
        );
    }
}
