use std::collections::BTreeMap;

use crate::errors::RuleError;
use crate::rule::Section;

/// In-memory policy model as seen by storage: section -> policy type ->
/// ordered rules. Evaluation lives elsewhere; storage only fills and reads it.
pub trait Model {
    /// Append a rule. Returns `false` if the identical rule is already present.
    fn add_rule(&mut self, section: Section, ptype: &str, rule: Vec<String>) -> bool;

    /// Every policy type in `section` with its rules, in model order.
    fn rule_sets(&self, section: Section) -> Vec<(&str, &[Vec<String>])>;

    /// Drop every rule in every section.
    fn clear(&mut self);
}

/// Ordered, de-duplicated policy model backed by `BTreeMap`s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyModel {
    sections: BTreeMap<Section, BTreeMap<String, Vec<Vec<String>>>>,
}

impl PolicyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules stored under `section`/`ptype`, empty if none.
    pub fn rules(&self, section: Section, ptype: &str) -> &[Vec<String>] {
        self.sections
            .get(&section)
            .and_then(|types| types.get(ptype))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_rule(&self, section: Section, ptype: &str, rule: &[String]) -> bool {
        self.rules(section, ptype).iter().any(|r| r == rule)
    }

    /// Total rule count across every section and type.
    pub fn len(&self) -> usize {
        self.sections
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Model for PolicyModel {
    fn add_rule(&mut self, section: Section, ptype: &str, rule: Vec<String>) -> bool {
        let rules = self
            .sections
            .entry(section)
            .or_default()
            .entry(ptype.to_string())
            .or_default();
        if rules.contains(&rule) {
            return false;
        }
        rules.push(rule);
        true
    }

    fn rule_sets(&self, section: Section) -> Vec<(&str, &[Vec<String>])> {
        self.sections
            .get(&section)
            .map(|types| {
                types
                    .iter()
                    .map(|(ptype, rules)| (ptype.as_str(), rules.as_slice()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn clear(&mut self) {
        self.sections.clear();
    }
}

/// Parse one policy-file line (`p, alice, data1, read`) into its type tag and
/// values. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_policy_line(line: &str) -> Result<Option<(String, Vec<String>)>, RuleError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = line.split(',').map(str::trim);
    let ptype = match tokens.next() {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => return Err(RuleError::MalformedLine(line.to_string())),
    };
    let rule: Vec<String> = tokens.map(str::to_string).collect();
    if rule.is_empty() {
        return Err(RuleError::MalformedLine(line.to_string()));
    }
    Ok(Some((ptype, rule)))
}

/// Parse a policy-file line and add it to `model` under the section implied
/// by its type tag.
pub fn load_policy_line(line: &str, model: &mut dyn Model) -> Result<bool, RuleError> {
    match parse_policy_line(line)? {
        Some((ptype, rule)) => {
            let section = Section::of(&ptype)?;
            Ok(model.add_rule(section, &ptype, rule))
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn add_rule_dedupes() {
        let mut m = PolicyModel::new();
        assert!(m.add_rule(Section::Policy, "p", rule(&["alice", "data1", "read"])));
        assert!(!m.add_rule(Section::Policy, "p", rule(&["alice", "data1", "read"])));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn rule_sets_group_by_type() {
        let mut m = PolicyModel::new();
        m.add_rule(Section::Policy, "p", rule(&["a"]));
        m.add_rule(Section::Policy, "p2", rule(&["b"]));
        m.add_rule(Section::Grouping, "g", rule(&["c", "d"]));

        let sets = m.rule_sets(Section::Policy);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].0, "p");
        assert_eq!(sets[1].0, "p2");
        assert_eq!(m.rule_sets(Section::Grouping)[0].1, &[rule(&["c", "d"])][..]);
    }

    #[test]
    fn clear_empties_model() {
        let mut m = PolicyModel::new();
        m.add_rule(Section::Grouping, "g", rule(&["c", "d"]));
        m.clear();
        assert!(m.is_empty());
        assert!(m.rule_sets(Section::Grouping).is_empty());
    }

    #[test]
    fn parse_line_trims_tokens() {
        let parsed = parse_policy_line("  p,  alice , data1,read ").unwrap();
        assert_eq!(parsed, Some(("p".to_string(), rule(&["alice", "data1", "read"]))));
    }

    #[test]
    fn parse_line_skips_comments_and_blanks() {
        assert_eq!(parse_policy_line("# comment").unwrap(), None);
        assert_eq!(parse_policy_line("   ").unwrap(), None);
    }

    #[test]
    fn parse_line_rejects_bare_type() {
        assert!(matches!(
            parse_policy_line("p"),
            Err(RuleError::MalformedLine(_))
        ));
        assert!(matches!(
            parse_policy_line(", alice"),
            Err(RuleError::MalformedLine(_))
        ));
    }

    #[test]
    fn load_line_routes_by_section() {
        let mut m = PolicyModel::new();
        assert!(load_policy_line("g, alice, data2_admin", &mut m).unwrap());
        assert_eq!(m.rules(Section::Grouping, "g"), &[rule(&["alice", "data2_admin"])][..]);
        assert!(matches!(
            load_policy_line("x, alice", &mut m),
            Err(RuleError::UnknownSection(_))
        ));
    }
}
