//! Schema registry - attribute declarations, validation and normalisation
//!
//! A [`Schema`] lists the attributes a resource kind accepts, how each one may
//! be set (required, optional, computed by the remote, or both), the
//! constraints its value must satisfy, and whether changing it forces the
//! object to be replaced. Validation is pure and never touches the remote.

use crate::error::{Error, Result};
use crate::types::{DeclaredResource, Value};
use regex::Regex;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    String,
    Int,
    Float,
    Bool,
    IntSet,
    StringSet,
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::IntSet => "set of int",
            Self::StringSet => "set of string",
        };
        write!(f, "{name}")
    }
}

/// Who may set an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Operator must set it
    Required,
    /// Operator may set it; absent means cleared
    Optional,
    /// Only the remote sets it
    Computed,
    /// Operator may set it; when absent the remote value is kept
    OptionalComputed,
}

/// A constraint on an attribute value
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Character count, inclusive
    Length { min: usize, max: usize },
    /// Allowed values
    OneOf {
        values: Vec<String>,
        case_insensitive: bool,
    },
    /// Numeric bounds, inclusive; applied per element for sets
    Range { min: Option<f64>, max: Option<f64> },
    /// Full-string pattern
    Pattern(Regex),
    /// Sets must have at least one element
    NonEmpty,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length { min, max } if *max == usize::MAX => {
                write!(f, "length must be at least {min}")
            }
            Self::Length { min, max } => write!(f, "length must be between {min} and {max}"),
            Self::OneOf { values, .. } => write!(f, "must be one of: {}", values.join(", ")),
            Self::Range {
                min: Some(min),
                max: Some(max),
            } => write!(f, "must be between {min} and {max}"),
            Self::Range {
                min: Some(min),
                max: None,
            } => write!(f, "must be at least {min}"),
            Self::Range {
                min: None,
                max: Some(max),
            } => write!(f, "must be at most {max}"),
            Self::Range {
                min: None,
                max: None,
            } => write!(f, "must be a number"),
            Self::Pattern(re) => write!(f, "must match {}", re.as_str()),
            Self::NonEmpty => write!(f, "must not be empty"),
        }
    }
}

impl Constraint {
    /// Check one scalar value (sets are checked per element by the caller)
    fn check(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Length { min, max }, Value::String(s)) => {
                let len = s.chars().count();
                len >= *min && len <= *max
            }
            (Self::OneOf { values, .. }, Value::String(s)) => values.iter().any(|v| v == s),
            (Self::Range { min, max }, v) => match v.as_float() {
                Some(x) => min.is_none_or(|m| x >= m) && max.is_none_or(|m| x <= m),
                None => true,
            },
            (Self::Pattern(re), Value::String(s)) => re.is_match(s),
            _ => true,
        }
    }
}

/// Declaration of one attribute
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub ty: AttrType,
    pub presence: Presence,
    pub default: Option<Value>,
    pub constraints: Vec<Constraint>,
    /// Changing this attribute replaces the object
    pub force_new: bool,
    pub description: String,
}

impl AttributeSchema {
    fn new(name: &str, ty: AttrType, presence: Presence) -> Self {
        Self {
            name: name.to_string(),
            ty,
            presence,
            default: None,
            constraints: Vec::new(),
            force_new: false,
            description: String::new(),
        }
    }

    pub fn required(name: &str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::Required)
    }

    pub fn optional(name: &str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::Optional)
    }

    pub fn computed(name: &str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::Computed)
    }

    pub fn optional_computed(name: &str, ty: AttrType) -> Self {
        Self::new(name, ty, Presence::OptionalComputed)
    }

    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.constraints.push(Constraint::Length { min, max });
        self
    }

    /// Length with no upper bound
    pub fn min_length(self, min: usize) -> Self {
        self.length(min, usize::MAX)
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.constraints.push(Constraint::OneOf {
            values: values.iter().map(ToString::to_string).collect(),
            case_insensitive: false,
        });
        self
    }

    /// Accept any casing; the value is stored lower-cased
    pub fn one_of_ignore_case(mut self, values: &[&str]) -> Self {
        self.constraints.push(Constraint::OneOf {
            values: values.iter().map(|v| v.to_lowercase()).collect(),
            case_insensitive: true,
        });
        self
    }

    pub fn at_least(mut self, min: f64) -> Self {
        self.constraints.push(Constraint::Range {
            min: Some(min),
            max: None,
        });
        self
    }

    pub fn between(mut self, min: f64, max: f64) -> Self {
        self.constraints.push(Constraint::Range {
            min: Some(min),
            max: Some(max),
        });
        self
    }

    /// Anchored regex; panics on an invalid pattern since schemas are static
    pub fn pattern(mut self, pattern: &str) -> Self {
        let re = Regex::new(pattern).expect("attribute pattern must be a valid regex");
        self.constraints.push(Constraint::Pattern(re));
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.constraints.push(Constraint::NonEmpty);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    fn is_case_insensitive(&self) -> bool {
        self.constraints.iter().any(|c| {
            matches!(
                c,
                Constraint::OneOf {
                    case_insensitive: true,
                    ..
                }
            )
        })
    }

    fn requires_elements(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, Constraint::NonEmpty))
    }

    /// Coerce to the declared type, canonicalising case-insensitive choices
    fn coerce(&self, kind: &str, value: Value) -> Result<Value> {
        let value = match (self.ty, value) {
            (AttrType::String, Value::String(s)) if self.is_case_insensitive() => {
                Value::String(s.to_lowercase())
            }
            (AttrType::Float, Value::Int(i)) => Value::Float(i as f64),
            (AttrType::String, v @ Value::String(_))
            | (AttrType::Int, v @ Value::Int(_))
            | (AttrType::Float, v @ Value::Float(_))
            | (AttrType::Bool, v @ Value::Bool(_))
            | (AttrType::IntSet, v @ Value::IntSet(_))
            | (AttrType::StringSet, v @ Value::StringSet(_)) => v,
            (ty, other) => {
                return Err(Error::validation(
                    kind,
                    &self.name,
                    format!("expected {ty}, got {}", other.type_name()),
                ));
            }
        };
        Ok(value)
    }

    fn check(&self, kind: &str, value: &Value) -> Result<()> {
        let elements: Vec<Value> = match value {
            Value::IntSet(items) => items.iter().map(|i| Value::Int(*i)).collect(),
            Value::StringSet(items) => items.iter().map(|s| Value::String(s.clone())).collect(),
            scalar => vec![scalar.clone()],
        };
        for constraint in &self.constraints {
            if let Some(bad) = elements.iter().find(|v| !constraint.check(v)) {
                return Err(Error::validation(
                    kind,
                    &self.name,
                    format!("{constraint} (got {bad})"),
                ));
            }
        }
        Ok(())
    }

    fn to_json(&self) -> JsonValue {
        json!({
            "type": self.ty,
            "presence": self.presence,
            "default": self.default,
            "constraints": self.constraints.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "force_new": self.force_new,
            "description": self.description,
        })
    }
}

/// A cross-field rule
#[derive(Debug, Clone)]
pub enum Rule {
    ExactlyOneOf(Vec<String>),
    AtLeastOneOf(Vec<String>),
    /// When `attribute` is set, `requires` must be set too
    RequiredWith { attribute: String, requires: String },
}

impl Rule {
    pub fn exactly_one_of(names: &[&str]) -> Self {
        Self::ExactlyOneOf(names.iter().map(ToString::to_string).collect())
    }

    pub fn at_least_one_of(names: &[&str]) -> Self {
        Self::AtLeastOneOf(names.iter().map(ToString::to_string).collect())
    }

    pub fn required_with(attribute: &str, requires: &str) -> Self {
        Self::RequiredWith {
            attribute: attribute.to_string(),
            requires: requires.to_string(),
        }
    }

    fn check(&self, kind: &str, declared: &DeclaredResource) -> Result<()> {
        match self {
            Self::ExactlyOneOf(names) => {
                let set = names.iter().filter(|n| declared.contains(n)).count();
                if set != 1 {
                    return Err(Error::validation(
                        kind,
                        names.join(","),
                        format!("exactly one of {} must be set", names.join(", ")),
                    ));
                }
            }
            Self::AtLeastOneOf(names) => {
                if !names.iter().any(|n| declared.contains(n)) {
                    return Err(Error::validation(
                        kind,
                        names.join(","),
                        format!("at least one of {} must be set", names.join(", ")),
                    ));
                }
            }
            Self::RequiredWith {
                attribute,
                requires,
            } => {
                if declared.contains(attribute) && !declared.contains(requires) {
                    return Err(Error::validation(
                        kind,
                        attribute,
                        format!("requires {requires} to be set"),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactlyOneOf(names) => write!(f, "exactly one of {}", names.join(", ")),
            Self::AtLeastOneOf(names) => write!(f, "at least one of {}", names.join(", ")),
            Self::RequiredWith {
                attribute,
                requires,
            } => write!(f, "{attribute} requires {requires}"),
        }
    }
}

/// Schema of one resource kind
#[derive(Debug, Clone)]
pub struct Schema {
    pub kind: String,
    pub description: String,
    pub attributes: Vec<AttributeSchema>,
    pub rules: Vec<Rule>,
}

impl Schema {
    pub fn new(kind: &str, description: &str) -> Self {
        Self {
            kind: kind.to_string(),
            description: description.to_string(),
            attributes: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: AttributeSchema) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Validate and normalise declared attributes
    ///
    /// Rejects unknown or computed-only attributes, missing required ones,
    /// type mismatches and constraint violations. Applies defaults, lower-cases
    /// case-insensitive choices and drops empty sets.
    pub fn validate(&self, declared: &DeclaredResource) -> Result<DeclaredResource> {
        if let Some((name, _)) = declared.iter().find(|(name, _)| self.get(name).is_none()) {
            return Err(Error::validation(
                &self.kind,
                name.as_str(),
                "unsupported attribute",
            ));
        }

        let mut normalised = DeclaredResource::new();
        for attr in &self.attributes {
            let value = match declared.get(&attr.name) {
                Some(_) if attr.presence == Presence::Computed => {
                    return Err(Error::validation(
                        &self.kind,
                        &attr.name,
                        "is computed and cannot be set",
                    ));
                }
                Some(v) if v.is_empty_set() => {
                    if attr.requires_elements() {
                        return Err(Error::validation(
                            &self.kind,
                            &attr.name,
                            Constraint::NonEmpty.to_string(),
                        ));
                    }
                    None
                }
                other => other.cloned(),
            };

            match value {
                Some(v) => {
                    let v = attr.coerce(&self.kind, v)?;
                    attr.check(&self.kind, &v)?;
                    normalised.insert(attr.name.as_str(), v);
                }
                None if attr.presence == Presence::Required => {
                    return Err(Error::validation(&self.kind, &attr.name, "is required"));
                }
                None => {
                    if let Some(default) = &attr.default {
                        normalised.insert(attr.name.as_str(), default.clone());
                    }
                }
            }
        }

        for rule in &self.rules {
            rule.check(&self.kind, &normalised)?;
        }

        Ok(normalised)
    }

    /// Attributes whose desired value differs from the current one
    ///
    /// Computed attributes never count, and optional+computed ones only count
    /// when the operator set them.
    pub fn changed_attributes(
        &self,
        desired: &DeclaredResource,
        current: &DeclaredResource,
    ) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|attr| match attr.presence {
                Presence::Computed => false,
                Presence::OptionalComputed => desired.contains(&attr.name),
                Presence::Required | Presence::Optional => true,
            })
            .filter(|attr| desired.get(&attr.name) != current.get(&attr.name))
            .map(|attr| attr.name.clone())
            .collect()
    }

    /// Changed attributes that force replacement
    pub fn replacement_attributes(
        &self,
        desired: &DeclaredResource,
        current: &DeclaredResource,
    ) -> Vec<String> {
        self.changed_attributes(desired, current)
            .into_iter()
            .filter(|name| self.get(name).is_some_and(|a| a.force_new))
            .collect()
    }

    /// Machine-readable description for tooling
    pub fn to_json(&self) -> JsonValue {
        let attributes: BTreeMap<&str, JsonValue> = self
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.to_json()))
            .collect();
        json!({
            "kind": self.kind,
            "description": self.description,
            "attributes": attributes,
            "rules": self.rules.iter().map(ToString::to_string).collect::<Vec<_>>(),
        })
    }
}

/// Kind name to schema
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: Schema) {
        self.schemas.insert(schema.kind.clone(), schema);
    }

    pub fn get(&self, kind: &str) -> Result<&Schema> {
        self.schemas
            .get(kind)
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))
    }

    pub fn validate(&self, kind: &str, declared: &DeclaredResource) -> Result<DeclaredResource> {
        self.get(kind)?.validate(declared)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }
}
