//! Declare Declarative Process Models
//!
//! A [`DeclareModel`] lists activities, the data attributes bound to them (with their
//! [`AttributeDomain`]s) and a list of [`DeclareConstraint`]s instantiating [`TemplateKind`]s.
//!
//! Models are usually read from the textual Declare format (see [`parse_declare_model`]):
//!
//! ```text
//! activity Register
//! activity Approve
//! bind Approve: amount
//! amount: integer between 0 and 10000
//! Existence1[Register] | |
//! Response[Register, Approve] | |A.amount > 100 |0,2,d
//! ```
/// Condition language of constraints (activation, correlation and time conditions)
pub mod condition;
/// Parser for the textual Declare format
pub mod parse;
/// [`TemplateKind`] enum with template metadata
pub mod templates;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[doc(inline)]
pub use parse::{parse_declare_model, DeclareParseOptions, ParseMode};
#[doc(inline)]
pub use templates::{TemplateKind, ALL_TEMPLATE_KINDS};

/// Value domain of a data attribute
///
/// The domain decides which condition operators can be applied to an attribute:
/// numeric comparisons are only allowed on numeric domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum AttributeDomain {
    /// A single integer literal
    Integer {
        /// The value
        value: i64,
    },
    /// A single float literal
    Float {
        /// The value
        value: f64,
    },
    /// Integers in the closed range `[min, max]`
    IntegerRange {
        /// Lower bound (inclusive)
        min: i64,
        /// Upper bound (inclusive)
        max: i64,
    },
    /// Floats in the closed range `[min, max]`
    FloatRange {
        /// Lower bound (inclusive)
        min: f64,
        /// Upper bound (inclusive)
        max: f64,
    },
    /// One of the listed (categorical) values
    Enumeration {
        /// Allowed values
        values: Vec<String>,
    },
}

impl AttributeDomain {
    /// Whether values of this domain are numbers
    pub fn is_numeric(&self) -> bool {
        !matches!(self, AttributeDomain::Enumeration { .. })
    }

    /// Parse the domain part of a domain line, e.g. `integer between 0 and 100` or `low, high`
    ///
    /// Returns a description of the problem if the domain is malformed
    pub fn parse_str(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if let Ok(value) = s.parse::<i64>() {
            return Ok(AttributeDomain::Integer { value });
        }
        if let Ok(value) = s.parse::<f64>() {
            if value.is_finite() {
                return Ok(AttributeDomain::Float { value });
            }
        }
        let lower = s.to_lowercase();
        if let Some(range) = lower.strip_prefix("integer between ") {
            let (min, max) = parse_range::<i64>(range)?;
            return Ok(AttributeDomain::IntegerRange { min, max });
        }
        if let Some(range) = lower.strip_prefix("float between ") {
            let (min, max) = parse_range::<f64>(range)?;
            return Ok(AttributeDomain::FloatRange { min, max });
        }
        let values = s
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect_vec();
        if values.is_empty() {
            return Err(String::from("empty attribute domain"));
        }
        Ok(AttributeDomain::Enumeration { values })
    }
}

fn parse_range<T: FromStr + PartialOrd>(range: &str) -> Result<(T, T), String> {
    let (min, max) = range
        .split_once(" and ")
        .ok_or_else(|| format!("expected `<min> and <max>` but got `{range}`"))?;
    let min = min
        .trim()
        .parse::<T>()
        .map_err(|_| format!("invalid range bound `{}`", min.trim()))?;
    let max = max
        .trim()
        .parse::<T>()
        .map_err(|_| format!("invalid range bound `{}`", max.trim()))?;
    if min > max {
        return Err(format!("empty range `{range}`"));
    }
    Ok((min, max))
}

impl Display for AttributeDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeDomain::Integer { value } => write!(f, "{value}"),
            // Debug formatting keeps the decimal point (`5.0`), so the value is read back as a float
            AttributeDomain::Float { value } => write!(f, "{value:?}"),
            AttributeDomain::IntegerRange { min, max } => {
                write!(f, "integer between {min} and {max}")
            }
            AttributeDomain::FloatRange { min, max } => {
                write!(f, "float between {min:?} and {max:?}")
            }
            AttributeDomain::Enumeration { values } => write!(f, "{}", values.join(", ")),
        }
    }
}

/// Activity of a [`DeclareModel`], with the names of the data attributes bound to it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DeclareActivity {
    /// Activity label
    pub name: String,
    /// Bound attribute names (in declaration order)
    pub attributes: Vec<String>,
}

/// Constraint: instantiation of a [`TemplateKind`] on concrete activities
///
/// For binary templates, `activities` is `[a, b]` in role order, i.e., as written in the
/// template (for [`TemplateKind::Precedence`], `b` is the activation).
/// Conditions are kept as written; they are compiled before checking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DeclareConstraint {
    /// Template of the constraint
    pub template: TemplateKind,
    /// Referenced activities (one for unary, two for binary templates)
    pub activities: Vec<String>,
    /// Cardinality `n` (only for templates supporting it)
    pub cardinality: Option<usize>,
    /// Condition on the activating event (empty: always true)
    pub activation_condition: String,
    /// Correlation condition between activating (`A`) and target (`T`) event (binary only)
    pub correlation_condition: String,
    /// Time distance condition `min,max,unit` (empty: no restriction)
    pub time_condition: String,
}

impl DeclareConstraint {
    /// Create a unary constraint without conditions
    ///
    /// Templates supporting a cardinality get `n = 1`.
    pub fn unary<T: Into<String>>(template: TemplateKind, activity: T) -> Self {
        Self {
            template,
            activities: vec![activity.into()],
            cardinality: template.supports_cardinality().then_some(1),
            activation_condition: String::new(),
            correlation_condition: String::new(),
            time_condition: String::new(),
        }
    }

    /// Create a binary constraint without conditions
    pub fn binary<T: Into<String>>(template: TemplateKind, a: T, b: T) -> Self {
        Self {
            template,
            activities: vec![a.into(), b.into()],
            cardinality: None,
            activation_condition: String::new(),
            correlation_condition: String::new(),
            time_condition: String::new(),
        }
    }

    /// Set the cardinality `n`
    pub fn with_cardinality(mut self, n: usize) -> Self {
        self.cardinality = Some(n);
        self
    }

    /// Set the activation, correlation and time conditions (surrounding whitespace is dropped)
    pub fn with_conditions<T: AsRef<str>>(
        mut self,
        activation: T,
        correlation: T,
        time: T,
    ) -> Self {
        self.activation_condition = activation.as_ref().trim().to_string();
        self.correlation_condition = correlation.as_ref().trim().to_string();
        self.time_condition = time.as_ref().trim().to_string();
        self
    }

    /// The activity whose occurrences activate this constraint
    ///
    /// For choice and derived templates both activities may activate; the first one is returned.
    pub fn activation_activity(&self) -> &str {
        let idx = if self.template.is_reversed() { 1 } else { 0 };
        self.activities
            .get(idx)
            .or(self.activities.first())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Check the structural invariants of a constraint (arity, distinct activities, cardinality)
    pub fn validate(&self) -> Result<(), String> {
        let t = self.template;
        if self.activities.len() != t.arity() {
            return Err(format!(
                "{t} expects {} activit{} but got {}",
                t.arity(),
                if t.arity() == 1 { "y" } else { "ies" },
                self.activities.len()
            ));
        }
        if self.activities.iter().any(|a| a.trim().is_empty()) {
            return Err(String::from("empty activity name"));
        }
        // must read back unchanged from the constraint string
        if let Some(a) = self
            .activities
            .iter()
            .find(|a| a.trim() != a.as_str() || a.contains([',', '[', ']', '|']))
        {
            return Err(format!("activity `{a}` cannot be used in a constraint string"));
        }
        if let Some(cond) = [
            &self.activation_condition,
            &self.correlation_condition,
            &self.time_condition,
        ]
        .into_iter()
        .find(|c| c.trim() != c.as_str() || c.contains('|'))
        {
            return Err(format!("condition `{cond}` cannot be used in a constraint string"));
        }
        if t.is_binary() && self.activities[0] == self.activities[1] {
            return Err(format!(
                "{t} requires two distinct activities but got `{}` twice",
                self.activities[0]
            ));
        }
        match (t.supports_cardinality(), self.cardinality) {
            (true, None) => Err(format!("{t} requires a cardinality")),
            (false, Some(_)) => Err(format!("{t} does not support a cardinality")),
            _ => Ok(()),
        }
    }
}

impl Display for DeclareConstraint {
    /// Canonical constraint string, e.g. `Response[A, B] |A.x > 2 | |0,5,h`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.template.get_name())?;
        if let Some(n) = self.cardinality {
            write!(f, "{n}")?;
        }
        write!(
            f,
            "[{}] |{} ",
            self.activities.join(", "),
            self.activation_condition
        )?;
        if self.template.is_binary() {
            write!(f, "|{} ", self.correlation_condition)?;
        }
        write!(f, "|{}", self.time_condition)
    }
}

/// Kind of model element a reference points to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// An activity
    Activity,
    /// A data attribute
    Attribute,
}

impl Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Activity => write!(f, "activity"),
            ReferenceKind::Attribute => write!(f, "attribute"),
        }
    }
}

fn line_prefix(line: &Option<usize>) -> String {
    line.map(|l| format!("line {l}: ")).unwrap_or_default()
}

/// Errors when building or parsing a [`DeclareModel`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeclareModelError {
    /// Malformed input (or a constraint breaking structural invariants)
    #[error("{}{message}", line_prefix(.line))]
    Parse {
        /// Line of the model text (1-based), if parsed from text
        line: Option<usize>,
        /// Description of the problem
        message: String,
    },
    /// Reference to an activity or attribute which was not declared before
    #[error("{}reference to undeclared {kind} `{name}`", line_prefix(.line))]
    Reference {
        /// What was referenced
        kind: ReferenceKind,
        /// Referenced name
        name: String,
        /// Line of the model text (1-based), if parsed from text
        line: Option<usize>,
    },
}

impl DeclareModelError {
    /// Attach a line number to this error
    pub fn at_line(self, l: usize) -> Self {
        match self {
            DeclareModelError::Parse { message, .. } => DeclareModelError::Parse {
                line: Some(l),
                message,
            },
            DeclareModelError::Reference { kind, name, .. } => DeclareModelError::Reference {
                kind,
                name,
                line: Some(l),
            },
        }
    }
}

/// Declare model: activities, attribute bindings and domains, and constraints
///
/// All references are checked on insertion, so a model never refers to undeclared
/// activities or attributes. Constraints keep their insertion order; a constraint's index is
/// its column in conformance results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeclareModel {
    activities: Vec<DeclareActivity>,
    attribute_domains: BTreeMap<String, AttributeDomain>,
    constraints: Vec<DeclareConstraint>,
}

impl DeclareModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an activity
    ///
    /// Returns `false` if the activity was already declared (the model is unchanged then)
    pub fn add_activity<T: Into<String>>(&mut self, name: T) -> bool {
        let name = name.into();
        if self.has_activity(&name) {
            return false;
        }
        self.activities.push(DeclareActivity {
            name,
            attributes: Vec::new(),
        });
        true
    }

    /// Bind an attribute to a declared activity
    ///
    /// Returns `Ok(false)` if the attribute was already bound to the activity
    pub fn bind_attribute(
        &mut self,
        activity: &str,
        attribute: &str,
    ) -> Result<bool, DeclareModelError> {
        let act = self
            .activities
            .iter_mut()
            .find(|a| a.name == activity)
            .ok_or_else(|| DeclareModelError::Reference {
                kind: ReferenceKind::Activity,
                name: activity.to_string(),
                line: None,
            })?;
        if act.attributes.iter().any(|a| a == attribute) {
            return Ok(false);
        }
        act.attributes.push(attribute.to_string());
        Ok(true)
    }

    /// Set the domain of an attribute bound to at least one activity
    ///
    /// Returns the previous domain of the attribute, if it had one
    pub fn set_attribute_domain(
        &mut self,
        attribute: &str,
        domain: AttributeDomain,
    ) -> Result<Option<AttributeDomain>, DeclareModelError> {
        if !self.is_attribute_bound(attribute) {
            return Err(DeclareModelError::Reference {
                kind: ReferenceKind::Attribute,
                name: attribute.to_string(),
                line: None,
            });
        }
        // e.g. the enumeration `["7"]` would be read back as an integer
        if AttributeDomain::parse_str(&domain.to_string()).as_ref() != Ok(&domain) {
            return Err(DeclareModelError::Parse {
                line: None,
                message: format!("domain `{domain}` of `{attribute}` does not read back unchanged"),
            });
        }
        Ok(self.attribute_domains.insert(attribute.to_string(), domain))
    }

    /// Append a constraint
    ///
    /// Fails if the constraint breaks structural invariants (see [`DeclareConstraint::validate`])
    /// or references undeclared activities.
    pub fn add_constraint(&mut self, constraint: DeclareConstraint) -> Result<(), DeclareModelError> {
        constraint
            .validate()
            .map_err(|message| DeclareModelError::Parse {
                line: None,
                message,
            })?;
        if let Some(missing) = constraint.activities.iter().find(|a| !self.has_activity(a)) {
            return Err(DeclareModelError::Reference {
                kind: ReferenceKind::Activity,
                name: missing.clone(),
                line: None,
            });
        }
        self.constraints.push(constraint);
        Ok(())
    }

    /// Declared activities
    pub fn activities(&self) -> &[DeclareActivity] {
        &self.activities
    }

    /// Get a declared activity by name
    pub fn get_activity(&self, name: &str) -> Option<&DeclareActivity> {
        self.activities.iter().find(|a| a.name == name)
    }

    /// Whether an activity is declared
    pub fn has_activity(&self, name: &str) -> bool {
        self.get_activity(name).is_some()
    }

    /// Whether an attribute is bound to at least one activity
    pub fn is_attribute_bound(&self, attribute: &str) -> bool {
        self.activities
            .iter()
            .any(|a| a.attributes.iter().any(|attr| attr == attribute))
    }

    /// Domains of attributes (by attribute name)
    pub fn attribute_domains(&self) -> &BTreeMap<String, AttributeDomain> {
        &self.attribute_domains
    }

    /// Constraints (in order)
    pub fn constraints(&self) -> &[DeclareConstraint] {
        &self.constraints
    }

    /// Serialize the model in the textual Declare format
    ///
    /// Parsing the output with [`parse_declare_model`] yields an equal model.
    pub fn to_declare_string(&self) -> String {
        let mut lines = Vec::new();
        for act in &self.activities {
            lines.push(format!("activity {}", act.name));
        }
        for act in self.activities.iter().filter(|a| !a.attributes.is_empty()) {
            lines.push(format!("bind {}: {}", act.name, act.attributes.join(", ")));
        }
        for (attr, domain) in &self.attribute_domains {
            lines.push(format!("{attr}: {domain}"));
        }
        for c in &self.constraints {
            lines.push(c.to_string());
        }
        lines.join("\n")
    }
}

impl Display for DeclareModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_declare_string())
    }
}

impl FromStr for DeclareModel {
    type Err = DeclareModelError;

    /// Parse a model in the textual Declare format using [`ParseMode::Lenient`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_declare_model(s, &DeclareParseOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_strings_are_canonical() {
        let c = DeclareConstraint::binary(TemplateKind::Response, "A", "B").with_conditions(
            "A.grade > 5",
            "same case",
            "0,2,h",
        );
        assert_eq!(c.to_string(), "Response[A, B] |A.grade > 5 |same case |0,2,h");
        let c = DeclareConstraint::unary(TemplateKind::Existence, "A").with_cardinality(3);
        assert_eq!(c.to_string(), "Existence3[A] | |");
        let c = DeclareConstraint::unary(TemplateKind::Init, "A");
        assert_eq!(c.to_string(), "Init[A] | |");
        let c = DeclareConstraint::binary(TemplateKind::NotCoExistence, "A", "B");
        assert_eq!(c.to_string(), "Not Co-Existence[A, B] | | |");
    }

    #[test]
    fn domains_parse_and_print() {
        assert_eq!(
            AttributeDomain::parse_str("integer between 0 and 100"),
            Ok(AttributeDomain::IntegerRange { min: 0, max: 100 })
        );
        assert_eq!(
            AttributeDomain::parse_str("float between 0.5 and 2"),
            Ok(AttributeDomain::FloatRange { min: 0.5, max: 2.0 })
        );
        assert_eq!(
            AttributeDomain::parse_str("7"),
            Ok(AttributeDomain::Integer { value: 7 })
        );
        assert_eq!(
            AttributeDomain::parse_str("low, medium ,high"),
            Ok(AttributeDomain::Enumeration {
                values: vec!["low".into(), "medium".into(), "high".into()]
            })
        );
        assert!(AttributeDomain::parse_str("integer between 10 and 1").is_err());
        assert!(AttributeDomain::parse_str("integer between a and b").is_err());

        for domain in [
            AttributeDomain::Float { value: 5.0 },
            AttributeDomain::FloatRange { min: 1.0, max: 1.5 },
            AttributeDomain::IntegerRange { min: -3, max: 3 },
        ] {
            assert_eq!(AttributeDomain::parse_str(&domain.to_string()), Ok(domain));
        }
    }

    #[test]
    fn model_checks_references() {
        let mut model = DeclareModel::new();
        assert!(model.add_activity("A"));
        assert!(!model.add_activity("A"));
        assert!(matches!(
            model.bind_attribute("B", "x"),
            Err(DeclareModelError::Reference {
                kind: ReferenceKind::Activity,
                ..
            })
        ));
        assert_eq!(model.bind_attribute("A", "x"), Ok(true));
        assert_eq!(model.bind_attribute("A", "x"), Ok(false));
        assert!(model
            .set_attribute_domain("y", AttributeDomain::Integer { value: 1 })
            .is_err());
        assert!(model
            .add_constraint(DeclareConstraint::binary(TemplateKind::Response, "A", "A"))
            .is_err());
        assert!(matches!(
            model.add_constraint(DeclareConstraint::binary(TemplateKind::Response, "A", "B")),
            Err(DeclareModelError::Reference { .. })
        ));
        let mut c = DeclareConstraint::unary(TemplateKind::Existence, "A");
        c.cardinality = None;
        assert!(model.add_constraint(c).is_err());
        assert!(model
            .add_constraint(DeclareConstraint::unary(TemplateKind::Init, "A").with_cardinality(2))
            .is_err());
        assert!(model
            .add_constraint(DeclareConstraint::unary(TemplateKind::Existence, "A"))
            .is_ok());
        assert_eq!(model.constraints().len(), 1);
    }

    #[test]
    fn model_only_holds_values_that_read_back() {
        let mut model = DeclareModel::new();
        model.add_activity("A");
        model.add_activity("B");
        model.add_activity("A, B");
        model.bind_attribute("A", "risk").unwrap();
        for values in [
            vec!["7"],
            vec!["low,high"],
            vec![" low"],
            vec!["integer between 1 and 2"],
            vec![],
        ] {
            let domain = AttributeDomain::Enumeration {
                values: values.into_iter().map(String::from).collect(),
            };
            assert!(
                model.set_attribute_domain("risk", domain.clone()).is_err(),
                "{domain:?}"
            );
        }
        assert!(model
            .set_attribute_domain("risk", AttributeDomain::Float { value: f64::NAN })
            .is_err());
        let domain = AttributeDomain::Enumeration {
            values: vec!["7".into(), "low".into()],
        };
        assert_eq!(model.set_attribute_domain("risk", domain), Ok(None));

        let mut c = DeclareConstraint::binary(TemplateKind::Response, "A", "B");
        c.activation_condition = "A.risk is low ".into();
        assert!(model.add_constraint(c).is_err());
        let c = DeclareConstraint::binary(TemplateKind::Response, "A", "B")
            .with_conditions("A.risk is low | x", "", "");
        assert!(model.add_constraint(c).is_err());
        assert!(model
            .add_constraint(DeclareConstraint::unary(TemplateKind::Init, "A, B"))
            .is_err());
        let c = DeclareConstraint::binary(TemplateKind::Response, "A", "B")
            .with_conditions(" A.risk is low ", "", "0,2,h ");
        assert_eq!(c.activation_condition, "A.risk is low");
        model.add_constraint(c).unwrap();

        let parsed: DeclareModel = model.to_string().parse().unwrap();
        assert_eq!(parsed, model);
    }

    #[test]
    fn error_messages_mention_lines() {
        let err = DeclareModelError::Reference {
            kind: ReferenceKind::Activity,
            name: "X".into(),
            line: None,
        }
        .at_line(4);
        assert_eq!(err.to_string(), "line 4: reference to undeclared activity `X`");
    }
}
