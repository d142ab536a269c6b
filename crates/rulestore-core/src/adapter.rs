use crate::errors::RuleError;
use crate::filter::{FieldFilter, Filter};
use crate::model::Model;
use crate::rule::Section;

/// Persistence seam consumed by a policy engine. Every call round-trips to
/// storage; batch and filtered mutations are all-or-nothing.
pub trait Adapter {
    type Error: std::error::Error + From<RuleError> + Send + Sync + 'static;

    /// Load every stored rule into `model`.
    fn load_policy(&mut self, model: &mut dyn Model) -> Result<(), Self::Error>;

    /// Load only the rules matching `filter`. Marks the adapter as holding a
    /// partial view.
    fn load_filtered_policy(
        &mut self,
        model: &mut dyn Model,
        filter: &Filter,
    ) -> Result<(), Self::Error>;

    /// Whether a filtered load has happened on this adapter.
    fn is_filtered(&self) -> bool;

    /// Replace storage with the full contents of `model`.
    fn save_policy(&mut self, model: &dyn Model) -> Result<(), Self::Error>;

    fn add_policy(&mut self, sec: Section, ptype: &str, rule: &[String])
        -> Result<(), Self::Error>;

    fn add_policies(
        &mut self,
        sec: Section,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), Self::Error>;

    fn remove_policy(
        &mut self,
        sec: Section,
        ptype: &str,
        rule: &[String],
    ) -> Result<(), Self::Error>;

    fn remove_policies(
        &mut self,
        sec: Section,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> Result<(), Self::Error>;

    /// Remove every rule of `ptype` whose slots match `fields`.
    fn remove_filtered(
        &mut self,
        sec: Section,
        ptype: &str,
        fields: &FieldFilter,
    ) -> Result<(), Self::Error>;

    fn update_policy(
        &mut self,
        sec: Section,
        ptype: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> Result<(), Self::Error>;

    /// Pairwise update; `old_rules[i]` becomes `new_rules[i]`.
    fn update_policies(
        &mut self,
        sec: Section,
        ptype: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> Result<(), Self::Error>;

    /// Replace every rule matching `fields` with `new_rules`. Returns every
    /// replaced row as `[ptype, v0, .., v5]`, empty slots included.
    fn update_filtered(
        &mut self,
        sec: Section,
        ptype: &str,
        new_rules: &[Vec<String>],
        fields: &FieldFilter,
    ) -> Result<Vec<Vec<String>>, Self::Error>;

    /// Offset form of [`Adapter::remove_filtered`]: value `k` constrains slot
    /// `field_index + k`.
    fn remove_filtered_policy(
        &mut self,
        sec: Section,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<(), Self::Error> {
        let fields = FieldFilter::from_offset(field_index, field_values)?;
        self.remove_filtered(sec, ptype, &fields)
    }

    /// Offset form of [`Adapter::update_filtered`].
    fn update_filtered_policies(
        &mut self,
        sec: Section,
        ptype: &str,
        new_rules: &[Vec<String>],
        field_index: usize,
        field_values: &[String],
    ) -> Result<Vec<Vec<String>>, Self::Error> {
        let fields = FieldFilter::from_offset(field_index, field_values)?;
        self.update_filtered(sec, ptype, new_rules, &fields)
    }
}
