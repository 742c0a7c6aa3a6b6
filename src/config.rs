//! Engine configuration.
//!
//! `EngineConfig` holds everything a [`VarietyEngine`](crate::VarietyEngine)
//! needs to know: the width rules, how source elements are recognised, and
//! how passes are triggered. [`Default`] is the template every instance
//! starts from; it is never shared or mutated.
//!
//! # Examples
//!
//! ## Customize with the builder
//! ```rust
//! use variety_engine::config::EngineConfig;
//! use variety_engine::rules::WidthRule;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = EngineConfig::builder()
//!     .rule("small", WidthRule::range(0.0, 480.0))
//!     .rule("large", WidthRule::range(481.0, 9001.0))
//!     .remove_original(true)
//!     .build()?; // returns Result<EngineConfig, ConfigError>
//! assert_eq!(cfg.rules.names(), vec!["small", "large"]);
//! assert_eq!(cfg.tag_name, "noscript");
//! # Ok(()) }
//! ```
//!
//! ## Load the JSON option object
//! ```rust
//! use variety_engine::config::EngineConfig;
//! let cfg = EngineConfig::from_json(r#"{
//!     "output": { "small": { "width": [0, 480] }, "large": { "width": 481 } },
//!     "removeOriginal": true,
//!     "debounceMs": 50
//! }"#).unwrap();
//! assert!(cfg.remove_original);
//! assert_eq!(cfg.debounce.as_millis(), 50);
//! ```
//!
//! # Fields (summary)
//! - `rules`: ordered variety rules (JSON: `output`).
//! - `tag_name`: tag of the source elements (default `noscript`).
//! - `url_attribute` / `alt_attribute`: attributes carrying the image URL and
//!   alt text (defaults `data-url` / `data-alt`).
//! - `allowed_root`: selector of the subtree scanned for sources (default `body`).
//! - `remove_original`: remove source elements after rendering (default `false`).
//! - `resize`: re-evaluate on viewport resize. When `false` passes do nothing.
//! - `force`: re-render even if the variety did not change (default `false`).
//! - `run_on_construction`: run one pass when the engine is created (default `true`).
//! - `debounce`: quiet interval before a resize triggers a pass (default 200ms).
//! - `width_provider`: overrides the document's viewport width.
//!
//! # Errors
//!
//! Validation returns [`ConfigError`] for NaN or inverted rule bounds and for
//! empty tag/attribute/root names.

use crate::rules::{RuleSet, WidthRule};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Quiet interval of the resize watcher.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Supplies the width used for variety selection.
pub type WidthProvider = Arc<dyn Fn() -> f64 + Send + Sync>;

#[derive(Clone)]
pub struct EngineConfig {
    pub rules: RuleSet,
    pub tag_name: String,
    pub url_attribute: String,
    pub alt_attribute: String,
    pub allowed_root: String,
    pub remove_original: bool,
    pub resize: bool,
    pub force: bool,
    pub run_on_construction: bool,
    pub debounce: Duration,
    pub width_provider: Option<WidthProvider>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules: RuleSet::new(),
            tag_name: "noscript".to_string(),
            url_attribute: "data-url".to_string(),
            alt_attribute: "data-alt".to_string(),
            allowed_root: "body".to_string(),
            remove_original: false,
            resize: true,
            force: false,
            run_on_construction: true,
            debounce: DEFAULT_DEBOUNCE,
            width_provider: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("rules", &self.rules)
            .field("tag_name", &self.tag_name)
            .field("url_attribute", &self.url_attribute)
            .field("alt_attribute", &self.alt_attribute)
            .field("allowed_root", &self.allowed_root)
            .field("remove_original", &self.remove_original)
            .field("resize", &self.resize)
            .field("force", &self.force)
            .field("run_on_construction", &self.run_on_construction)
            .field("debounce", &self.debounce)
            .field("width_provider", &self.width_provider.as_ref().map(|_| "Fn() -> f64"))
            .finish()
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parses the JSON option object. Missing options keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        let mut cfg = EngineConfig::default();

        if let Some(rules) = raw.output {
            cfg.rules = rules;
        }
        if let Some(v) = raw.tag_name {
            cfg.tag_name = v;
        }
        if let Some(v) = raw.url_attribute {
            cfg.url_attribute = v;
        }
        if let Some(v) = raw.alt_attribute {
            cfg.alt_attribute = v;
        }
        if let Some(v) = raw.allowed_nodes {
            cfg.allowed_root = v;
        }
        if let Some(v) = raw.remove_original {
            cfg.remove_original = v;
        }
        if let Some(v) = raw.resize {
            cfg.resize = v;
        }
        if let Some(v) = raw.force {
            cfg.force = v;
        }
        if let Some(v) = raw.run {
            cfg.run_on_construction = v;
        }
        if let Some(ms) = raw.debounce_ms {
            cfg.debounce = Duration::from_millis(ms);
        }

        validate(&cfg)?;
        Ok(cfg)
    }

    /// Checks rule bounds and names. Builders and [`EngineConfig::from_json`] already do this.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate(self)
    }

    /// Width for the next pass: the provider if set, else `fallback`.
    pub(crate) fn width_or(&self, fallback: impl FnOnce() -> f64) -> f64 {
        match &self.width_provider {
            Some(provider) => provider(),
            None => fallback(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    inner: EngineConfig,
}

impl EngineConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut EngineConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    /// Appends a variety rule (or replaces the rule with the same name in place).
    pub fn rule<S: Into<String>, R: Into<WidthRule>>(self, name: S, rule: R) -> Self {
        self.map(|c| {
            c.rules.insert(name, rule);
        })
    }
    pub fn rules(self, rules: RuleSet) -> Self { self.map(|c| c.rules = rules) }
    pub fn tag_name<S: Into<String>>(self, tag: S) -> Self { self.map(|c| c.tag_name = tag.into()) }
    pub fn url_attribute<S: Into<String>>(self, attr: S) -> Self { self.map(|c| c.url_attribute = attr.into()) }
    pub fn alt_attribute<S: Into<String>>(self, attr: S) -> Self { self.map(|c| c.alt_attribute = attr.into()) }
    pub fn allowed_root<S: Into<String>>(self, selector: S) -> Self { self.map(|c| c.allowed_root = selector.into()) }
    pub fn remove_original(self, on: bool) -> Self { self.map(|c| c.remove_original = on) }
    pub fn resize(self, on: bool) -> Self { self.map(|c| c.resize = on) }
    pub fn force(self, on: bool) -> Self { self.map(|c| c.force = on) }
    pub fn run_on_construction(self, on: bool) -> Self { self.map(|c| c.run_on_construction = on) }
    pub fn debounce(self, quiet: Duration) -> Self { self.map(|c| c.debounce = quiet) }
    pub fn width_provider<F>(self, f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.map(|c| c.width_provider = Some(Arc::new(f)))
    }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut EngineConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    output: Option<RuleSet>,
    tag_name: Option<String>,
    url_attribute: Option<String>,
    alt_attribute: Option<String>,
    allowed_nodes: Option<String>,
    remove_original: Option<bool>,
    resize: Option<bool>,
    force: Option<bool>,
    run: Option<bool>,
    debounce_ms: Option<u64>,
}

// ---------- Validation ----------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("rule '{0}' has a NaN width bound")]
    NanBound(String),

    #[error("rule '{rule}' has min ({min}) > max ({max})")]
    InvertedRange { rule: String, min: f64, max: f64 },

    #[error("{0} must not be empty")]
    EmptyName(&'static str),

    #[error("invalid JSON options: {0}")]
    Json(#[from] serde_json::Error),
}

fn validate(c: &EngineConfig) -> Result<(), ConfigError> {
    for (name, rule) in c.rules.iter() {
        if rule.min.is_nan() || rule.max.is_nan() {
            return Err(ConfigError::NanBound(name.to_string()));
        }
        if rule.min > rule.max {
            return Err(ConfigError::InvertedRange {
                rule: name.to_string(),
                min: rule.min,
                max: rule.max,
            });
        }
    }

    let names = [
        ("tag_name", &c.tag_name),
        ("url_attribute", &c.url_attribute),
        ("alt_attribute", &c.alt_attribute),
        ("allowed_root", &c.allowed_root),
    ];
    for (field, value) in names {
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyName(field));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert!(cfg.rules.is_empty());
        assert_eq!(cfg.tag_name, "noscript");
        assert_eq!(cfg.url_attribute, "data-url");
        assert_eq!(cfg.alt_attribute, "data-alt");
        assert_eq!(cfg.allowed_root, "body");
        assert!(!cfg.remove_original);
        assert!(cfg.resize);
        assert!(!cfg.force);
        assert!(cfg.run_on_construction);
        assert_eq!(cfg.debounce, Duration::from_millis(200));
        assert!(cfg.width_provider.is_none());
    }

    #[test]
    fn builder_does_not_touch_defaults() {
        let custom = EngineConfig::builder().tag_name("span").force(true).build().unwrap();
        assert_eq!(custom.tag_name, "span");
        assert!(custom.force);

        let fresh = EngineConfig::default();
        assert_eq!(fresh.tag_name, "noscript");
        assert!(!fresh.force);
    }

    #[test]
    fn width_provider_overrides_fallback() {
        let cfg = EngineConfig::builder().width_provider(|| 320.0).build().unwrap();
        assert_eq!(cfg.width_or(|| 1024.0), 320.0);
        assert_eq!(EngineConfig::default().width_or(|| 1024.0), 1024.0);
    }

    #[test]
    fn inverted_and_nan_bounds_are_rejected() {
        let err = EngineConfig::builder()
            .rule("bad", WidthRule::range(500.0, 100.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedRange { ref rule, .. } if rule == "bad"));

        let err = EngineConfig::builder()
            .rule("nan", WidthRule::range(f64::NAN, 100.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NanBound(ref rule) if rule == "nan"));
    }

    #[test]
    fn empty_names_are_rejected() {
        let err = EngineConfig::builder().url_attribute(" ").build().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyName("url_attribute")));
    }

    #[test]
    fn json_options_use_original_names() {
        let cfg = EngineConfig::from_json(
            r#"{
                "output": { "big": { "width": [700, 9001] }, "small": { "width": [0, 699] } },
                "tagName": "span",
                "urlAttribute": "data-src",
                "altAttribute": "data-title",
                "allowedNodes": "main",
                "removeOriginal": true,
                "resize": false,
                "force": true,
                "run": false
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.rules.names(), vec!["big", "small"]);
        assert_eq!(cfg.tag_name, "span");
        assert_eq!(cfg.url_attribute, "data-src");
        assert_eq!(cfg.alt_attribute, "data-title");
        assert_eq!(cfg.allowed_root, "main");
        assert!(cfg.remove_original);
        assert!(!cfg.resize);
        assert!(cfg.force);
        assert!(!cfg.run_on_construction);
        assert_eq!(cfg.debounce, DEFAULT_DEBOUNCE);
    }

    #[test]
    fn json_empty_object_is_default() {
        let cfg = EngineConfig::from_json("{}").unwrap();
        assert!(cfg.rules.is_empty());
        assert_eq!(cfg.tag_name, "noscript");
    }

    #[test]
    fn json_errors_are_reported() {
        assert!(matches!(EngineConfig::from_json("{"), Err(ConfigError::Json(_))));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "output": { "x": { "width": [10, 1] } } }"#),
            Err(ConfigError::InvertedRange { .. })
        ));
    }
}
