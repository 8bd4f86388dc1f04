//! Attribute schema - types, mutability classes, defaults and validation
//!
//! A [`ResourceSchema`] declares every attribute a resource type manages.
//! The diff engine consults it to classify each changed field and to fill
//! defaults before comparing; validation always runs first and fails closed.

use crate::value::{Attributes, Value};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// How a change to an attribute reaches the remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    /// Set once at creation; the remote system never accepts a new value
    Immutable,
    /// Can change, but only by destroying and recreating the object
    ReplaceOnChange,
    /// Updated in place through the remote update operation
    MutableInPlace,
    /// Produced by the remote system; never part of desired configuration
    ComputedOnly,
}

impl Mutability {
    /// Whether a changed value forces a Delete-then-Create replacement
    pub fn forces_replace(&self) -> bool {
        matches!(self, Self::Immutable | Self::ReplaceOnChange)
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::ComputedOnly)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Immutable => "immutable",
            Self::ReplaceOnChange => "replace-on-change",
            Self::MutableInPlace => "mutable",
            Self::ComputedOnly => "computed",
        }
    }
}

/// Declared type of an attribute value
#[derive(Debug, Clone)]
pub enum ValueType {
    String,
    Int,
    Bool,
    List(Box<ValueType>),
    Map(Box<ValueType>),
    /// A named group of attributes, validated recursively
    Block(Vec<AttributeSpec>),
}

impl ValueType {
    pub fn list_of(inner: ValueType) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn map_of(inner: ValueType) -> Self {
        Self::Map(Box::new(inner))
    }

    /// Human-readable type name, e.g. `list(string)`
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Int => "int".to_string(),
            Self::Bool => "bool".to_string(),
            Self::List(inner) => format!("list({})", inner.describe()),
            Self::Map(inner) => format!("map({})", inner.describe()),
            Self::Block(_) => "block".to_string(),
        }
    }
}

/// A validation rule applied after the type check
#[derive(Debug, Clone)]
pub enum Validator {
    /// String must not be empty
    NonEmpty,
    /// String length must not exceed the limit
    MaxLength(usize),
    /// String must match the pattern
    Pattern(Regex),
    /// Integer must fall inside the inclusive range
    IntRange { min: i64, max: i64 },
    /// String must be one of the listed values
    OneOf(Vec<String>),
    /// String must parse as a JSON document
    Json,
    /// List must contain at least this many items
    MinItems(usize),
}

impl Validator {
    /// Build a pattern validator from a regular expression
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    pub fn one_of(values: &[&str]) -> Self {
        Self::OneOf(values.iter().map(|v| (*v).to_string()).collect())
    }

    pub fn at_least(min: i64) -> Self {
        Self::IntRange { min, max: i64::MAX }
    }

    /// Check a value, returning a message when it is rejected
    fn check(&self, value: &Value) -> Option<String> {
        match (self, value) {
            (Self::NonEmpty, Value::String(s)) if s.is_empty() => {
                Some("must not be empty".to_string())
            }
            (Self::MaxLength(max), Value::String(s)) if s.chars().count() > *max => {
                Some(format!("must be at most {max} characters"))
            }
            (Self::Pattern(re), Value::String(s)) if !re.is_match(s) => {
                Some(format!("must match pattern {}", re.as_str()))
            }
            (Self::IntRange { min, max }, Value::Int(i)) if i < min || i > max => {
                if *max == i64::MAX {
                    Some(format!("must be at least {min}"))
                } else {
                    Some(format!("must be between {min} and {max}"))
                }
            }
            (Self::OneOf(allowed), Value::String(s)) if !allowed.contains(s) => {
                Some(format!("must be one of: {}", allowed.join(", ")))
            }
            (Self::Json, Value::String(s)) => serde_json::from_str::<serde_json::Value>(s)
                .err()
                .map(|e| format!("must be valid JSON ({e})")),
            (Self::MinItems(min), Value::List(items)) if items.len() < *min => {
                Some(format!("must contain at least {min} item(s)"))
            }
            _ => None,
        }
    }
}

/// How desired and tracked values of an attribute are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    /// Whole-value equality
    #[default]
    Exact,
    /// Strings holding the same JSON document are equal whatever their layout
    Json,
    /// Lists holding the same items in any order are equal
    Unordered,
}

impl Comparison {
    pub fn equivalent(self, a: &Value, b: &Value) -> bool {
        if a == b {
            return true;
        }
        match (self, a, b) {
            (Self::Json, Value::String(a), Value::String(b)) => {
                match (
                    serde_json::from_str::<serde_json::Value>(a),
                    serde_json::from_str::<serde_json::Value>(b),
                ) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
            }
            (Self::Unordered, Value::List(a), Value::List(b)) => same_items(a, b),
            _ => false,
        }
    }
}

/// Multiset equality over values that have no ordering
fn same_items(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unmatched: Vec<&Value> = b.iter().collect();
    a.iter().all(|item| {
        unmatched
            .iter()
            .position(|other| *other == item)
            .map(|pos| unmatched.swap_remove(pos))
            .is_some()
    })
}

/// Declaration of one managed attribute
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub name: String,
    pub value_type: ValueType,
    pub mutability: Mutability,
    pub comparison: Comparison,
    pub required: bool,
    pub default: Option<Value>,
    pub validators: Vec<Validator>,
    pub description: Option<String>,
}

impl AttributeSpec {
    /// Create an optional, mutable-in-place attribute of the given type
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            mutability: Mutability::MutableInPlace,
            comparison: Comparison::Exact,
            required: false,
            default: None,
            validators: Vec::new(),
            description: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Int)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Bool)
    }

    /// A computed attribute, only ever present in observed state
    pub fn computed(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type).mutability(Mutability::ComputedOnly)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    pub fn immutable(self) -> Self {
        self.mutability(Mutability::Immutable)
    }

    pub fn replace_on_change(self) -> Self {
        self.mutability(Mutability::ReplaceOnChange)
    }

    pub fn compare(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Whether a tracked and a desired value count as unchanged
    pub fn same_value(&self, before: Option<&Value>, after: Option<&Value>) -> bool {
        match (before, after) {
            (Some(a), Some(b)) => self.comparison.equivalent(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A single validation failure, addressed by attribute path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Attribute path, e.g. `criteria[0].values`
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Schema of one resource type
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    /// Resource type tag, e.g. `aws_cloudwatch_event_archive`
    pub type_name: String,
    pub description: String,
    pub attributes: Vec<AttributeSpec>,
}

impl ResourceSchema {
    pub fn new(type_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: description.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute declaration
    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    /// Look up the declaration for an attribute
    pub fn classify(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Validate a desired configuration, returning every failure found
    ///
    /// An empty list means the configuration may be planned.
    pub fn validate(&self, desired: &Attributes) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        validate_block(&self.attributes, desired, "", &mut errors);
        errors
    }

    /// Fill declared defaults for attributes absent from `desired`
    ///
    /// Applied recursively inside blocks, so an explicit default and an
    /// omitted attribute produce identical maps.
    pub fn with_defaults(&self, desired: &Attributes) -> Attributes {
        fill_block_defaults(&self.attributes, desired)
    }

    /// Keep only the attributes this schema declares as computed
    pub fn computed_subset(&self, values: &Attributes) -> Attributes {
        values
            .iter()
            .filter(|(name, _)| {
                self.classify(name)
                    .is_some_and(|spec| spec.mutability.is_computed())
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn validate_block(
    specs: &[AttributeSpec],
    values: &BTreeMap<String, Value>,
    prefix: &str,
    errors: &mut Vec<ValidationError>,
) {
    for (name, value) in values {
        let path = join_path(prefix, name);
        match specs.iter().find(|s| &s.name == name) {
            None => errors.push(ValidationError::new(path, "unknown attribute")),
            Some(spec) if spec.mutability.is_computed() => errors.push(ValidationError::new(
                path,
                "is computed by the remote system and cannot be set",
            )),
            Some(spec) => validate_value(spec, &spec.value_type, value, &path, errors),
        }
    }

    for spec in specs {
        if spec.required && spec.default.is_none() && !values.contains_key(&spec.name) {
            errors.push(ValidationError::new(
                join_path(prefix, &spec.name),
                "required attribute is missing",
            ));
        }
    }
}

fn validate_value(
    spec: &AttributeSpec,
    value_type: &ValueType,
    value: &Value,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    match (value_type, value) {
        (ValueType::String, Value::String(_))
        | (ValueType::Int, Value::Int(_))
        | (ValueType::Bool, Value::Bool(_)) => {}
        (ValueType::List(inner), Value::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                validate_element(inner, item, &format!("{path}[{i}]"), errors);
            }
        }
        (ValueType::Map(inner), Value::Map(entries)) => {
            for (key, item) in entries {
                validate_element(inner, item, &format!("{path}.{key}"), errors);
            }
        }
        (ValueType::Block(specs), Value::Map(entries)) => {
            validate_block(specs, entries, path, errors);
        }
        (expected, found) => {
            errors.push(ValidationError::new(
                path,
                format!("expected {}, found {}", expected.describe(), found.kind()),
            ));
            return;
        }
    }

    for validator in &spec.validators {
        if let Some(message) = validator.check(value) {
            errors.push(ValidationError::new(path, message));
        }
    }
}

/// Validate a list or map element, which carries no validators of its own
fn validate_element(
    value_type: &ValueType,
    value: &Value,
    path: &str,
    errors: &mut Vec<ValidationError>,
) {
    match (value_type, value) {
        (ValueType::Block(specs), Value::Map(entries)) => {
            validate_block(specs, entries, path, errors);
        }
        (ValueType::List(inner), Value::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                validate_element(inner, item, &format!("{path}[{i}]"), errors);
            }
        }
        (ValueType::Map(inner), Value::Map(entries)) => {
            for (key, item) in entries {
                validate_element(inner, item, &format!("{path}.{key}"), errors);
            }
        }
        (ValueType::String, Value::String(_))
        | (ValueType::Int, Value::Int(_))
        | (ValueType::Bool, Value::Bool(_)) => {}
        (expected, found) => errors.push(ValidationError::new(
            path,
            format!("expected {}, found {}", expected.describe(), found.kind()),
        )),
    }
}

fn fill_block_defaults(specs: &[AttributeSpec], values: &BTreeMap<String, Value>) -> Attributes {
    let mut filled = values.clone();
    for spec in specs {
        match filled.get_mut(&spec.name) {
            Some(value) => fill_nested_defaults(&spec.value_type, value),
            None => {
                if let Some(default) = &spec.default {
                    filled.insert(spec.name.clone(), default.clone());
                }
            }
        }
    }
    filled
}

fn fill_nested_defaults(value_type: &ValueType, value: &mut Value) {
    match (value_type, value) {
        (ValueType::Block(specs), Value::Map(entries)) => {
            *entries = fill_block_defaults(specs, entries);
        }
        (ValueType::List(inner), Value::List(items)) => {
            for item in items {
                fill_nested_defaults(inner, item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    fn archive_schema() -> ResourceSchema {
        ResourceSchema::new("archive", "Event archive")
            .attribute(
                AttributeSpec::string("name")
                    .required()
                    .immutable()
                    .validate(Validator::pattern(r"^[.\-_A-Za-z0-9]+$").unwrap())
                    .validate(Validator::MaxLength(48)),
            )
            .attribute(AttributeSpec::string("description").default_value(""))
            .attribute(AttributeSpec::string("event_pattern").validate(Validator::Json))
            .attribute(
                AttributeSpec::int("retention_days")
                    .default_value(0_i64)
                    .validate(Validator::at_least(0)),
            )
            .attribute(AttributeSpec::computed("arn", ValueType::String))
    }

    fn rule_schema() -> ResourceSchema {
        let criterion = vec![
            AttributeSpec::string("key").required(),
            AttributeSpec::string("operator")
                .default_value("EQUALS")
                .validate(Validator::one_of(&["EQUALS", "PREFIX"])),
            AttributeSpec::new("values", ValueType::list_of(ValueType::String))
                .required()
                .validate(Validator::MinItems(1)),
        ];
        ResourceSchema::new("rule", "Automation rule").attribute(AttributeSpec::new(
            "criteria",
            ValueType::list_of(ValueType::Block(criterion)),
        ))
    }

    #[test]
    fn test_valid_config_has_no_errors() {
        let errors = archive_schema().validate(&attrs! { "name" => "a", "retention_days" => 7_i64 });
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_missing_required_attribute() {
        let errors = archive_schema().validate(&attrs! { "description" => "x" });
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "name");
        assert!(errors[0].message.contains("required"));
    }

    #[test]
    fn test_unknown_attribute_fails_closed() {
        let errors = archive_schema().validate(&attrs! { "name" => "a", "colour" => "red" });
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "colour");
    }

    #[test]
    fn test_computed_attribute_cannot_be_set() {
        let errors = archive_schema().validate(&attrs! { "name" => "a", "arn" => "arn:x" });
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("computed"));
    }

    #[test]
    fn test_type_mismatch() {
        let errors = archive_schema().validate(&attrs! { "name" => "a", "retention_days" => "7" });
        assert_eq!(errors[0].message, "expected int, found string");
    }

    #[test]
    fn test_validators() {
        let errors = archive_schema().validate(&attrs! {
            "name" => "bad name!",
            "retention_days" => -1_i64,
            "event_pattern" => "{not json",
        });
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"name"));
        assert!(paths.contains(&"retention_days"));
        assert!(paths.contains(&"event_pattern"));
    }

    #[test]
    fn test_nested_block_validation() {
        let mut criterion = Attributes::new();
        criterion.insert("key".into(), Value::from("CompanyName"));
        criterion.insert("operator".into(), Value::from("CONTAINS"));
        criterion.insert("values".into(), Value::List(vec![]));
        let desired = attrs! { "criteria" => Value::List(vec![Value::Map(criterion)]) };

        let errors = rule_schema().validate(&desired);
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["criteria[0].operator", "criteria[0].values"]);
    }

    #[test]
    fn test_defaults_fill_nested_blocks() {
        let mut criterion = Attributes::new();
        criterion.insert("key".into(), Value::from("CompanyName"));
        criterion.insert("values".into(), Value::from(vec!["a"]));
        let desired = attrs! { "criteria" => Value::List(vec![Value::Map(criterion)]) };

        let filled = rule_schema().with_defaults(&desired);
        let first = &filled["criteria"].as_list().unwrap()[0];
        assert_eq!(first.as_map().unwrap()["operator"], Value::from("EQUALS"));
    }

    #[test]
    fn test_with_defaults_keeps_explicit_values() {
        let filled = archive_schema().with_defaults(&attrs! { "name" => "a", "retention_days" => 3_i64 });
        assert_eq!(filled["retention_days"], Value::Int(3));
        assert_eq!(filled["description"], Value::from(""));
        assert!(!filled.contains_key("event_pattern"));
        assert!(!filled.contains_key("arn"));
    }

    #[test]
    fn test_json_comparison_ignores_layout() {
        let spec = AttributeSpec::string("event_pattern").compare(Comparison::Json);
        let compact = Value::from(r#"{"source":["a"],"detail-type":["b"]}"#);
        let spaced = Value::from("{\n  \"detail-type\": [\"b\"],\n  \"source\": [\"a\"]\n}\n");

        assert!(spec.same_value(Some(&compact), Some(&spaced)));
        assert!(!spec.same_value(Some(&compact), Some(&Value::from(r#"{"source":["c"]}"#))));
        assert!(!spec.same_value(Some(&compact), None));
        assert!(!AttributeSpec::string("plain").same_value(Some(&compact), Some(&spaced)));
    }

    #[test]
    fn test_unordered_comparison() {
        let spec = AttributeSpec::new("tags", ValueType::list_of(ValueType::String))
            .compare(Comparison::Unordered);
        let ab = Value::from(vec!["a", "b"]);

        assert!(spec.same_value(Some(&ab), Some(&Value::from(vec!["b", "a"]))));
        assert!(!spec.same_value(Some(&ab), Some(&Value::from(vec!["a", "a"]))));
        assert!(!spec.same_value(Some(&ab), Some(&Value::from(vec!["a"]))));
    }

    #[test]
    fn test_computed_subset() {
        let subset = archive_schema()
            .computed_subset(&attrs! { "arn" => "arn:1", "name" => "a", "extra" => 1_i64 });
        assert_eq!(subset, attrs! { "arn" => "arn:1" });
    }
}
