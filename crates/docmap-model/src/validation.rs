//! Attribute validation run before save.
//!
//! Rules are evaluated in declaration order (inherited rules first) and
//! accumulate messages per attribute. A non-empty result blocks the save;
//! nothing is written.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeValue;
use crate::object::DigitalObject;

// ---------------------------------------------------------------------------
// ValidationErrors
// ---------------------------------------------------------------------------

/// Attribute → messages, in the order rules produced them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    messages: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, attribute: &str, message: impl Into<String>) {
        self.messages
            .entry(attribute.to_string())
            .or_default()
            .push(message.into());
    }

    /// Messages for one attribute; empty when it is valid.
    pub fn get(&self, attribute: &str) -> &[String] {
        self.messages.get(attribute).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.messages.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total number of messages.
    pub fn len(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (attribute, messages) in &self.messages {
            for message in messages {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{attribute} {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ValidationRule trait
// ---------------------------------------------------------------------------

/// One validation rule attached to a model.
///
/// Rules are object-safe and `Send + Sync` so a built registry can share
/// them as `Arc<dyn ValidationRule>`.
pub trait ValidationRule: Send + Sync + fmt::Debug {
    /// Rule name (e.g., "presence", "length").
    fn name(&self) -> &str;

    /// The attribute this rule checks.
    fn attribute(&self) -> &str;

    /// Whether the rule makes its attribute required.
    fn requires_presence(&self) -> bool {
        false
    }

    /// Check the object and record any failures.
    fn validate(&self, object: &DigitalObject, errors: &mut ValidationErrors);
}

fn attribute_value(object: &DigitalObject, attribute: &str) -> AttributeValue {
    object
        .get_attribute(attribute)
        .unwrap_or(AttributeValue::Single(None))
}

// ---------------------------------------------------------------------------
// Built-in rules
// ---------------------------------------------------------------------------

/// The attribute must be set to a non-blank value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceOf {
    pub attribute: String,
}

impl PresenceOf {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl ValidationRule for PresenceOf {
    fn name(&self) -> &str {
        "presence"
    }

    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn requires_presence(&self) -> bool {
        true
    }

    fn validate(&self, object: &DigitalObject, errors: &mut ValidationErrors) {
        if attribute_value(object, &self.attribute).is_blank() {
            errors.add(&self.attribute, "can't be blank");
        }
    }
}

/// Character length bounds on a single-valued attribute. A missing value
/// has length zero; multi-valued attributes are checked per value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LengthOf {
    pub attribute: String,
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl LengthOf {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            min: None,
            max: None,
        }
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    fn check(&self, len: usize, errors: &mut ValidationErrors) {
        if let Some(min) = self.min.filter(|&min| len < min) {
            errors.add(&self.attribute, format!("is too short (minimum is {min} characters)"));
        }
        if let Some(max) = self.max.filter(|&max| len > max) {
            errors.add(&self.attribute, format!("is too long (maximum is {max} characters)"));
        }
    }
}

impl ValidationRule for LengthOf {
    fn name(&self) -> &str {
        "length"
    }

    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn validate(&self, object: &DigitalObject, errors: &mut ValidationErrors) {
        match attribute_value(object, &self.attribute) {
            AttributeValue::Single(value) => {
                self.check(value.map_or(0, |v| v.chars().count()), errors);
            }
            AttributeValue::Multiple(values) => {
                for value in values {
                    self.check(value.chars().count(), errors);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RuleSchema
// ---------------------------------------------------------------------------

/// Declarative form of the built-in rules, as read from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSchema {
    Presence {
        attribute: String,
    },
    Length {
        attribute: String,
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
}

impl RuleSchema {
    pub fn into_rule(self) -> Arc<dyn ValidationRule> {
        match self {
            Self::Presence { attribute } => Arc::new(PresenceOf::new(attribute)),
            Self::Length { attribute, min, max } => {
                Arc::new(LengthOf { attribute, min, max })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_accumulate_per_attribute() {
        let mut errors = ValidationErrors::default();
        assert!(errors.is_empty());
        errors.add("fubar", "can't be blank");
        errors.add("swank", "is too short (minimum is 5 characters)");
        errors.add("fubar", "is too short (minimum is 1 characters)");
        assert_eq!(errors.get("fubar").len(), 2);
        assert!(errors.get("other").is_empty());
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.to_string(),
            "fubar can't be blank, fubar is too short (minimum is 1 characters), swank is too short (minimum is 5 characters)"
        );
    }

    #[test]
    fn length_messages() {
        let rule = LengthOf::new("swank").min(5).max(8);
        let mut errors = ValidationErrors::default();
        rule.check(4, &mut errors);
        rule.check(9, &mut errors);
        rule.check(6, &mut errors);
        assert_eq!(
            errors.get("swank"),
            [
                "is too short (minimum is 5 characters)",
                "is too long (maximum is 8 characters)"
            ]
        );
    }

    #[test]
    fn rule_schema_from_toml() {
        #[derive(Deserialize)]
        struct Rules {
            validations: Vec<RuleSchema>,
        }
        let rules: Rules = toml::from_str(
            r#"
            validations = [
                { rule = "presence", attribute = "fubar" },
                { rule = "length", attribute = "swank", min = 5 },
            ]
            "#,
        )
        .unwrap();
        let built: Vec<_> = rules.validations.into_iter().map(RuleSchema::into_rule).collect();
        assert_eq!(built[0].name(), "presence");
        assert!(built[0].requires_presence());
        assert_eq!(built[1].attribute(), "swank");
        assert!(!built[1].requires_presence());
    }
}
