//! Width rules and variety matching.
//!
//! A [`RuleSet`] is an ordered list of named [`WidthRule`]s. Matching walks the
//! rules in declaration order and returns the first one whose inclusive
//! `[min, max]` range contains the width. Overlapping rules are allowed; the
//! earlier declaration wins.
//!
//! ```
//! use variety_engine::rules::{RuleSet, WidthRule};
//!
//! let rules = RuleSet::new()
//!     .with("small", WidthRule::range(0.0, 480.0))
//!     .with("large", WidthRule::range(481.0, 9001.0));
//!
//! assert_eq!(rules.find_variety(320.0).map(|m| m.name), Some("small"));
//! assert_eq!(rules.find_variety(900.0).map(|m| m.name), Some("large"));
//! assert!(rules.find_variety(-5.0).is_none());
//! ```

use crate::render::{Renderer, RendererRef};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;

/// Upper bound used when a rule does not declare one.
pub const DEFAULT_MAX_WIDTH: f64 = 9001.0;

/// An inclusive width range, optionally with its own renderer.
#[derive(Clone, Debug)]
pub struct WidthRule {
    pub min: f64,
    pub max: f64,
    pub renderer: Option<RendererRef>,
}

impl Default for WidthRule {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: DEFAULT_MAX_WIDTH,
            renderer: None,
        }
    }
}

/// A single width is shorthand for "from this width upwards".
impl From<f64> for WidthRule {
    fn from(min: f64) -> Self {
        Self::from_min(min)
    }
}

impl From<(f64, f64)> for WidthRule {
    fn from((min, max): (f64, f64)) -> Self {
        Self::range(min, max)
    }
}

impl WidthRule {
    pub fn range(min: f64, max: f64) -> Self {
        Self { min, max, renderer: None }
    }

    pub fn from_min(min: f64) -> Self {
        Self { min, ..Self::default() }
    }

    /// Renders this rule's varieties with `renderer` instead of the default one.
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(RendererRef::Custom(renderer));
        self
    }

    /// Renders this rule's varieties with the renderer registered under `name`.
    pub fn with_named_renderer(mut self, name: impl Into<String>) -> Self {
        self.renderer = Some(RendererRef::Named(name.into()));
        self
    }

    /// Inclusive on both ends. NaN never matches.
    pub fn contains(&self, width: f64) -> bool {
        self.min <= width && width <= self.max
    }
}

/// The rule selected for a width.
#[derive(Clone, Copy, Debug)]
pub struct VarietyMatch<'a> {
    pub name: &'a str,
    pub rule: &'a WidthRule,
}

/// Named width rules in declaration order.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<(String, WidthRule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule. Re-using a name replaces that rule but keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, rule: impl Into<WidthRule>) -> Option<WidthRule> {
        let name = name.into();
        let rule = rule.into();

        match self.rules.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, rule)),
            None => {
                self.rules.push((name, rule));
                None
            }
        }
    }

    pub fn with(mut self, name: impl Into<String>, rule: impl Into<WidthRule>) -> Self {
        self.insert(name, rule);
        self
    }

    pub fn get(&self, name: &str) -> Option<&WidthRule> {
        self.rules.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WidthRule)> {
        self.rules.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// First declared rule containing `width`, or `None`.
    pub fn find_variety(&self, width: f64) -> Option<VarietyMatch<'_>> {
        self.rules
            .iter()
            .find(|(_, rule)| rule.contains(width))
            .map(|(name, rule)| VarietyMatch { name: name.as_str(), rule })
    }
}

/// Free-standing form of [`RuleSet::find_variety`].
pub fn find_variety(width: f64, rules: &RuleSet) -> Option<VarietyMatch<'_>> {
    rules.find_variety(width)
}

// ---------- Deserialization ----------

/// A width bound, as a number or as text such as `"480"` or `"480px"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WidthValue {
    Number(f64),
    Text(String),
}

impl WidthValue {
    fn to_f64<E: de::Error>(&self) -> Result<f64, E> {
        match self {
            WidthValue::Number(n) => Ok(*n),
            WidthValue::Text(text) => parse_width(text)
                .ok_or_else(|| de::Error::custom(format!("invalid width '{}'", text))),
        }
    }
}

/// Reads the longest numeric prefix of `text`, ignoring leading whitespace.
fn parse_width(text: &str) -> Option<f64> {
    let text = text.trim_start();
    text.char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .rev()
        .find_map(|end| text[..end].parse::<f64>().ok())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WidthSpec {
    Single(WidthValue),
    Range(Vec<WidthValue>),
}

#[derive(Deserialize)]
struct RawRule {
    width: Option<WidthSpec>,
    outputter: Option<String>,
}

impl<'de> Deserialize<'de> for WidthRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRule::deserialize(deserializer)?;

        let mut rule = match raw.width {
            None => WidthRule::default(),
            Some(WidthSpec::Single(min)) => WidthRule::from_min(min.to_f64::<D::Error>()?),
            Some(WidthSpec::Range(values)) => match values.as_slice() {
                [] => return Err(de::Error::custom("width range must not be empty")),
                [min, max] => WidthRule::range(min.to_f64::<D::Error>()?, max.to_f64::<D::Error>()?),
                [min, ..] => WidthRule::from_min(min.to_f64::<D::Error>()?),
            },
        };

        if let Some(name) = raw.outputter {
            rule = rule.with_named_renderer(name);
        }

        Ok(rule)
    }
}

struct RuleSetVisitor;

impl<'de> Visitor<'de> for RuleSetVisitor {
    type Value = RuleSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of variety names to width rules")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RuleSet, A::Error> {
        let mut rules = RuleSet::new();
        while let Some((name, rule)) = map.next_entry::<String, WidthRule>()? {
            rules.insert(name, rule);
        }
        Ok(rules)
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RuleSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_large() -> RuleSet {
        RuleSet::new()
            .with("small", (0.0, 480.0))
            .with("large", (481.0, DEFAULT_MAX_WIDTH))
    }

    #[test]
    fn picks_rule_containing_width() {
        let rules = small_large();
        assert_eq!(rules.find_variety(320.0).unwrap().name, "small");
        assert_eq!(rules.find_variety(900.0).unwrap().name, "large");
    }

    #[test]
    fn bounds_are_inclusive() {
        let rules = small_large();
        assert_eq!(rules.find_variety(0.0).unwrap().name, "small");
        assert_eq!(rules.find_variety(480.0).unwrap().name, "small");
        assert_eq!(rules.find_variety(481.0).unwrap().name, "large");
        assert_eq!(rules.find_variety(DEFAULT_MAX_WIDTH).unwrap().name, "large");
    }

    #[test]
    fn gaps_and_out_of_range_match_nothing() {
        let rules = small_large();
        assert!(rules.find_variety(-5.0).is_none());
        assert!(rules.find_variety(480.5).is_none());
        assert!(rules.find_variety(9002.0).is_none());
        assert!(rules.find_variety(f64::NAN).is_none());
        assert!(find_variety(100.0, &RuleSet::new()).is_none());
    }

    #[test]
    fn first_declared_wins_on_overlap() {
        let rules = RuleSet::new()
            .with("wide", (0.0, 2000.0))
            .with("narrow", (100.0, 200.0));
        assert_eq!(rules.find_variety(150.0).unwrap().name, "wide");

        let rules = RuleSet::new()
            .with("narrow", (100.0, 200.0))
            .with("wide", (0.0, 2000.0));
        assert_eq!(rules.find_variety(150.0).unwrap().name, "narrow");
        assert_eq!(rules.find_variety(50.0).unwrap().name, "wide");
    }

    #[test]
    fn single_width_is_min_shorthand() {
        let rule = WidthRule::from(600.0);
        assert_eq!(rule.min, 600.0);
        assert_eq!(rule.max, DEFAULT_MAX_WIDTH);
        assert!(!rule.contains(599.0));
        assert!(rule.contains(600.0));
    }

    #[test]
    fn reinsert_keeps_position() {
        let mut rules = small_large();
        let old = rules.insert("small", (0.0, 100.0));
        assert_eq!(old.unwrap().max, 480.0);
        assert_eq!(rules.names(), vec!["small", "large"]);
        assert_eq!(rules.get("small").unwrap().max, 100.0);
    }

    #[test]
    fn json_keeps_declaration_order() {
        let json = r#"{
            "zeta": { "width": [0, 9001] },
            "alpha": { "width": [0, 9001] },
            "mid": { "width": 300 }
        }"#;
        let rules: RuleSet = serde_json::from_str(json).unwrap();
        assert_eq!(rules.names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(rules.find_variety(500.0).unwrap().name, "zeta");
    }

    #[test]
    fn json_width_forms() {
        let json = r#"{
            "none": {},
            "single": { "width": 120 },
            "one": { "width": [240] },
            "pair": { "width": [10, 20] },
            "custom": { "width": [0, 5], "outputter": "picture" }
        }"#;
        let rules: RuleSet = serde_json::from_str(json).unwrap();

        let none = rules.get("none").unwrap();
        assert_eq!((none.min, none.max), (0.0, DEFAULT_MAX_WIDTH));
        let single = rules.get("single").unwrap();
        assert_eq!((single.min, single.max), (120.0, DEFAULT_MAX_WIDTH));
        let one = rules.get("one").unwrap();
        assert_eq!((one.min, one.max), (240.0, DEFAULT_MAX_WIDTH));
        let pair = rules.get("pair").unwrap();
        assert_eq!((pair.min, pair.max), (10.0, 20.0));

        match &rules.get("custom").unwrap().renderer {
            Some(RendererRef::Named(name)) => assert_eq!(name, "picture"),
            other => panic!("expected named renderer, got {:?}", other),
        }
    }

    #[test]
    fn json_text_widths_are_parsed() {
        let json = r#"{
            "text": { "width": "480" },
            "pair": { "width": ["0", " 479.5"] },
            "unit": { "width": "600px" },
            "mixed": { "width": [10, "20"] }
        }"#;
        let rules: RuleSet = serde_json::from_str(json).unwrap();

        let text = rules.get("text").unwrap();
        assert_eq!((text.min, text.max), (480.0, DEFAULT_MAX_WIDTH));
        let pair = rules.get("pair").unwrap();
        assert_eq!((pair.min, pair.max), (0.0, 479.5));
        assert_eq!(rules.get("unit").unwrap().min, 600.0);
        let mixed = rules.get("mixed").unwrap();
        assert_eq!((mixed.min, mixed.max), (10.0, 20.0));

        let res: Result<RuleSet, _> = serde_json::from_str(r#"{ "bad": { "width": "wide" } }"#);
        assert!(res.is_err());
    }

    #[test]
    fn json_empty_width_is_rejected() {
        let res: Result<RuleSet, _> = serde_json::from_str(r#"{ "bad": { "width": [] } }"#);
        assert!(res.is_err());
    }
}
