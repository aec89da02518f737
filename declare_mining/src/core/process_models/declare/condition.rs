//! Conditions restrict which events activate a constraint (activation condition), which
//! target events can discharge it (correlation condition) and how far apart in time the
//! two may be (time condition).
//!
//! Attribute references are written `A.<attr>` (activating event) or `T.<attr>` (target
//! event); a bare `<attr>` refers to the activating event.
//!
//! ```text
//! A.amount > 1000 and (A.channel is web or A.channel in (app, phone))
//! same customer and T.status is not cancelled
//! ```
use std::collections::BTreeSet;

use chrono::TimeDelta;
use thiserror::Error;

use super::{AttributeDomain, DeclareModel};
use crate::core::event_data::{AttributeValue, Event};

/// Errors when compiling conditions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    /// The condition is not well-formed
    #[error("invalid condition `{condition}`: {message}")]
    Syntax {
        /// Condition text
        condition: String,
        /// Description of the problem
        message: String,
    },
    /// The condition refers to an attribute that is not known
    #[error("condition refers to unknown attribute `{0}`")]
    UnknownAttribute(String),
    /// The operator cannot be applied to values of the attribute's domain
    #[error("`{operator}` cannot be applied to attribute `{attribute}` with domain `{domain}`")]
    DomainMismatch {
        /// Attribute name
        attribute: String,
        /// Offending operator
        operator: String,
        /// Declared domain of the attribute
        domain: String,
    },
    /// An activation condition refers to the target event
    #[error("activation condition `{0}` refers to the target event")]
    TargetInActivation(String),
    /// The time condition is not of the form `min,max,unit`
    #[error("invalid time condition `{0}` (expected `<min>,<max>,<unit>` with unit s, m, h or d)")]
    Time(String),
}

/// Source of the attribute names (and domains) that conditions may refer to
pub trait AttributeCatalog {
    /// Whether the attribute is known
    fn has_attribute(&self, name: &str) -> bool;
    /// Declared domain of the attribute (if any)
    fn attribute_domain(&self, name: &str) -> Option<&AttributeDomain>;
}

impl AttributeCatalog for DeclareModel {
    fn has_attribute(&self, name: &str) -> bool {
        self.is_attribute_bound(name)
    }

    fn attribute_domain(&self, name: &str) -> Option<&AttributeDomain> {
        self.attribute_domains().get(name)
    }
}

/// A set of known attribute names without domains (e.g., all attribute keys of a log)
impl AttributeCatalog for BTreeSet<String> {
    fn has_attribute(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn attribute_domain(&self, _name: &str) -> Option<&AttributeDomain> {
        None
    }
}

/// Which condition of a constraint is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionRole {
    /// Condition on the activating event alone
    Activation,
    /// Condition on the pair of activating and target event
    Correlation,
}

/// Event an attribute reference points to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRef {
    /// The activating event (`A.`)
    Activation,
    /// The target event (`T.`)
    Target,
}

/// Reference to an attribute of the activating or target event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRef {
    /// Referenced event
    pub event: EventRef,
    /// Attribute name
    pub attribute: String,
}

impl AttributeRef {
    fn parse(word: &str) -> Self {
        if let Some(attribute) = word.strip_prefix("A.") {
            Self {
                event: EventRef::Activation,
                attribute: attribute.to_string(),
            }
        } else if let Some(attribute) = word.strip_prefix("T.") {
            Self {
                event: EventRef::Target,
                attribute: attribute.to_string(),
            }
        } else {
            Self {
                event: EventRef::Activation,
                attribute: word.to_string(),
            }
        }
    }

    fn resolve<'a>(
        &self,
        activation: &'a Event,
        target: Option<&'a Event>,
    ) -> Option<&'a AttributeValue> {
        match self.event {
            EventRef::Activation => activation.get_value(&self.attribute),
            EventRef::Target => target?.get_value(&self.attribute),
        }
    }
}

/// Numeric comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `=` (or `==`)
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl ComparisonOperator {
    fn parse_str(s: &str) -> Option<Self> {
        match s {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "=" | "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    fn get_name(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// Compiled condition
///
/// Evaluation is a pure function of the activating event and (for correlation conditions)
/// the target event. An atom referring to a missing attribute evaluates to `false`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Constant `true`/`false` (an empty condition is `true`)
    Constant(bool),
    /// Both conditions hold
    And(Box<Condition>, Box<Condition>),
    /// At least one condition holds
    Or(Box<Condition>, Box<Condition>),
    /// `<attr> is [not] <value>`
    Is {
        /// Compared attribute
        attribute: AttributeRef,
        /// Literal value
        value: String,
        /// `is not`
        negated: bool,
    },
    /// `<attr> [not] in (<value>, ...)`
    In {
        /// Compared attribute
        attribute: AttributeRef,
        /// Literal values
        values: Vec<String>,
        /// `not in`
        negated: bool,
    },
    /// `<attr> <op> <number>`
    Compare {
        /// Compared attribute
        attribute: AttributeRef,
        /// Operator
        operator: ComparisonOperator,
        /// Number to compare with
        value: f64,
    },
    /// `same <attr>`: activating and target event agree on the attribute
    Same(String),
    /// `different <attr>`: activating and target event disagree on the attribute
    Different(String),
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Constant(true)
    }
}

impl Condition {
    /// Evaluate the condition for an activating event and an optional target event
    pub fn evaluate(&self, activation: &Event, target: Option<&Event>) -> bool {
        match self {
            Condition::Constant(b) => *b,
            Condition::And(l, r) => {
                l.evaluate(activation, target) && r.evaluate(activation, target)
            }
            Condition::Or(l, r) => l.evaluate(activation, target) || r.evaluate(activation, target),
            Condition::Is {
                attribute,
                value,
                negated,
            } => attribute
                .resolve(activation, target)
                .is_some_and(|v| v.matches_literal(value) != *negated),
            Condition::In {
                attribute,
                values,
                negated,
            } => attribute
                .resolve(activation, target)
                .is_some_and(|v| values.iter().any(|l| v.matches_literal(l)) != *negated),
            Condition::Compare {
                attribute,
                operator,
                value,
            } => attribute
                .resolve(activation, target)
                .and_then(|v| v.as_number())
                .is_some_and(|v| operator.apply(v, *value)),
            Condition::Same(attr) | Condition::Different(attr) => {
                let same = matches!(self, Condition::Same(_));
                match (activation.get_value(attr), target.and_then(|t| t.get_value(attr))) {
                    (Some(a), Some(t)) => (a == t) == same,
                    _ => false,
                }
            }
        }
    }

    /// Whether this is the constant `true` condition
    pub fn is_trivial(&self) -> bool {
        *self == Condition::Constant(true)
    }
}

/// Compile a condition string
///
/// Attribute names are checked against `catalog`. Activation conditions must not refer to
/// the target event (via `T.`, `same` or `different`).
///
/// ```rust
/// use std::collections::BTreeSet;
/// use declare_mining::{event, core::process_models::declare::condition::{compile_condition, ConditionRole}};
///
/// let attrs: BTreeSet<String> = ["grade".to_string()].into();
/// let cond = compile_condition("A.grade >= 5", ConditionRole::Activation, &attrs).unwrap();
/// assert!(cond.evaluate(&event!("a"; {"grade" => 7}), None));
/// assert!(!cond.evaluate(&event!("a"; {"grade" => 2}), None));
/// ```
pub fn compile_condition<C: AttributeCatalog + ?Sized>(
    text: &str,
    role: ConditionRole,
    catalog: &C,
) -> Result<Condition, ConditionError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Ok(Condition::Constant(true));
    }
    let mut parser = ConditionParser {
        text,
        tokens,
        pos: 0,
        role,
        catalog,
    };
    let condition = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(parser.syntax(format!("unexpected `{}`", token.describe())));
    }
    Ok(condition)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Comma,
    Operator(ComparisonOperator),
    Word(String),
    Quoted(String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::LParen => String::from("("),
            Token::RParen => String::from(")"),
            Token::Comma => String::from(","),
            Token::Operator(op) => op.get_name().to_string(),
            Token::Word(w) => w.clone(),
            Token::Quoted(q) => format!("\"{q}\""),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ConditionError> {
    let syntax = |message: String| ConditionError::Syntax {
        condition: text.to_string(),
        message,
    };
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | ',' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
            }
            '<' | '>' | '=' | '!' => {
                let mut op = String::from(c);
                chars.next();
                if chars.peek() == Some(&'=') {
                    op.push('=');
                    chars.next();
                }
                let op = ComparisonOperator::parse_str(&op)
                    .ok_or_else(|| syntax(format!("unknown operator `{op}`")))?;
                tokens.push(Token::Operator(op));
            }
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(q) if q == c => break,
                        Some(other) => value.push(other),
                        None => return Err(syntax(String::from("unterminated quote"))),
                    }
                }
                tokens.push(Token::Quoted(value));
            }
            _ => {
                let mut word = String::new();
                while let Some(&w) = chars.peek() {
                    if w.is_whitespace() || matches!(w, '(' | ')' | ',' | '<' | '>' | '=' | '!' | '"' | '\'') {
                        break;
                    }
                    word.push(w);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

struct ConditionParser<'a, C: ?Sized> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    role: ConditionRole,
    catalog: &'a C,
}

impl<C: AttributeCatalog + ?Sized> ConditionParser<'_, C> {
    fn syntax(&self, message: String) -> ConditionError {
        ConditionError::Syntax {
            condition: self.text.to_string(),
            message,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn next_is_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn parse_or(&mut self) -> Result<Condition, ConditionError> {
        let mut left = self.parse_and()?;
        while self.next_is_keyword("or") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition, ConditionError> {
        let mut left = self.parse_atom()?;
        while self.next_is_keyword("and") {
            self.pos += 1;
            let right = self.parse_atom()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<Condition, ConditionError> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.syntax(String::from("missing `)`"))),
                }
            }
            Some(t @ Token::Word(_)) if t.is_keyword("true") => Ok(Condition::Constant(true)),
            Some(t @ Token::Word(_)) if t.is_keyword("false") => Ok(Condition::Constant(false)),
            Some(t @ Token::Word(_)) if t.is_keyword("same") || t.is_keyword("different") => {
                let Some(Token::Word(attr)) = self.next() else {
                    return Err(self.syntax(format!("expected attribute after `{}`", t.describe())));
                };
                if self.role == ConditionRole::Activation {
                    return Err(ConditionError::TargetInActivation(self.text.to_string()));
                }
                self.check_attribute(&attr)?;
                if t.is_keyword("same") {
                    Ok(Condition::Same(attr))
                } else {
                    Ok(Condition::Different(attr))
                }
            }
            Some(Token::Word(word)) => {
                let attribute = AttributeRef::parse(&word);
                if attribute.attribute.is_empty() {
                    return Err(self.syntax(format!("missing attribute name in `{word}`")));
                }
                if attribute.event == EventRef::Target && self.role == ConditionRole::Activation {
                    return Err(ConditionError::TargetInActivation(self.text.to_string()));
                }
                self.check_attribute(&attribute.attribute)?;
                self.parse_predicate(attribute)
            }
            Some(t) => Err(self.syntax(format!("unexpected `{}`", t.describe()))),
            None => Err(self.syntax(String::from("unexpected end of condition"))),
        }
    }

    fn parse_predicate(&mut self, attribute: AttributeRef) -> Result<Condition, ConditionError> {
        match self.next() {
            Some(t) if t.is_keyword("is") => {
                let negated = self.next_is_keyword("not");
                if negated {
                    self.pos += 1;
                }
                let value = self.parse_value()?;
                self.check_literals(&attribute, "is", std::slice::from_ref(&value))?;
                Ok(Condition::Is {
                    attribute,
                    value,
                    negated,
                })
            }
            Some(t) if t.is_keyword("not") || t.is_keyword("in") => {
                let negated = t.is_keyword("not");
                if negated && !matches!(self.next(), Some(t) if t.is_keyword("in")) {
                    return Err(self.syntax(String::from("expected `in` after `not`")));
                }
                if self.next() != Some(Token::LParen) {
                    return Err(self.syntax(String::from("expected `(` after `in`")));
                }
                let mut values = vec![self.parse_value()?];
                loop {
                    match self.next() {
                        Some(Token::Comma) => values.push(self.parse_value()?),
                        Some(Token::RParen) => break,
                        _ => return Err(self.syntax(String::from("missing `)` after values"))),
                    }
                }
                self.check_literals(&attribute, "in", &values)?;
                Ok(Condition::In {
                    attribute,
                    values,
                    negated,
                })
            }
            Some(Token::Operator(operator)) => {
                let value = match self.next() {
                    Some(Token::Word(w)) => w.parse::<f64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| {
                    self.syntax(format!("expected a number after `{}`", operator.get_name()))
                })?;
                if let Some(domain) = self.catalog.attribute_domain(&attribute.attribute) {
                    if !domain.is_numeric() {
                        return Err(ConditionError::DomainMismatch {
                            attribute: attribute.attribute,
                            operator: operator.get_name().to_string(),
                            domain: domain.to_string(),
                        });
                    }
                }
                Ok(Condition::Compare {
                    attribute,
                    operator,
                    value,
                })
            }
            Some(t) => Err(self.syntax(format!(
                "expected `is`, `in` or a comparison after `{}` but got `{}`",
                attribute.attribute,
                t.describe()
            ))),
            None => Err(self.syntax(format!(
                "expected `is`, `in` or a comparison after `{}`",
                attribute.attribute
            ))),
        }
    }

    /// A literal value: a quoted string or a sequence of words, ending before
    /// `and`/`or`, `,` or `)`
    fn parse_value(&mut self) -> Result<String, ConditionError> {
        if let Some(Token::Quoted(q)) = self.peek() {
            let q = q.clone();
            self.pos += 1;
            return Ok(q);
        }
        let mut words = Vec::new();
        while let Some(Token::Word(w)) = self.peek() {
            if self.next_is_keyword("and") || self.next_is_keyword("or") {
                break;
            }
            words.push(w.clone());
            self.pos += 1;
        }
        if words.is_empty() {
            return Err(self.syntax(String::from("missing value")));
        }
        Ok(words.join(" "))
    }

    fn check_attribute(&self, attribute: &str) -> Result<(), ConditionError> {
        if self.catalog.has_attribute(attribute) {
            Ok(())
        } else {
            Err(ConditionError::UnknownAttribute(attribute.to_string()))
        }
    }

    /// Literals compared with numeric attributes must be numbers
    fn check_literals(
        &self,
        attribute: &AttributeRef,
        operator: &str,
        values: &[String],
    ) -> Result<(), ConditionError> {
        match self.catalog.attribute_domain(&attribute.attribute) {
            Some(domain) if domain.is_numeric() && values.iter().any(|v| v.parse::<f64>().is_err()) => {
                Err(ConditionError::DomainMismatch {
                    attribute: attribute.attribute.clone(),
                    operator: operator.to_string(),
                    domain: domain.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Time distance condition: `|A.timestamp - T.timestamp|` must lie in `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCondition {
    /// Minimal distance (inclusive)
    pub min: TimeDelta,
    /// Maximal distance (inclusive)
    pub max: TimeDelta,
}

impl TimeCondition {
    /// Parse a time condition of the form `<min>,<max>,<unit>` (unit: `s`, `m`, `h` or `d`)
    ///
    /// `min` and `max` may be decimals. An empty string yields `None` (no restriction).
    pub fn parse_str(text: &str) -> Result<Option<Self>, ConditionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let err = || ConditionError::Time(text.to_string());
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        // `1,5,h` as well as `1,5h`
        let (min, max, unit) = match parts.as_slice() {
            [min, max, unit] => (*min, *max, *unit),
            [min, max_unit] => match max_unit.char_indices().last() {
                Some((split, _)) => (*min, &max_unit[..split], &max_unit[split..]),
                None => return Err(err()),
            },
            _ => return Err(err()),
        };
        let seconds_per_unit = match unit {
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            "d" => 86_400.0,
            _ => return Err(err()),
        };
        let to_delta = |s: &str| {
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| TimeDelta::milliseconds((v * seconds_per_unit * 1000.0).round() as i64))
        };
        let (Some(min), Some(max)) = (to_delta(min), to_delta(max)) else {
            return Err(err());
        };
        if min > max {
            return Err(err());
        }
        Ok(Some(Self { min, max }))
    }

    /// Whether the time distance between the two events satisfies this condition
    pub fn holds(&self, activation: &Event, target: &Event) -> bool {
        let distance = (activation.timestamp - target.timestamp).abs();
        self.min <= distance && distance <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event;

    fn model() -> DeclareModel {
        "activity a
activity b
bind a: grade, risk, name
bind b: grade, risk
grade: integer between 1 and 10
risk: low, high risk"
            .parse()
            .unwrap()
    }

    fn compile(text: &str, role: ConditionRole) -> Result<Condition, ConditionError> {
        compile_condition(text, role, &model())
    }

    #[test]
    fn empty_condition_is_true() {
        let c = compile("   ", ConditionRole::Activation).unwrap();
        assert!(c.is_trivial());
        assert!(c.evaluate(&event!("a"), None));
    }

    #[test]
    fn comparisons_and_connectives() {
        let c = compile(
            "A.grade > 3 and (risk is low or A.risk is high risk)",
            ConditionRole::Activation,
        )
        .unwrap();
        assert!(c.evaluate(&event!("a"; {"grade" => 4, "risk" => "low"}), None));
        assert!(c.evaluate(&event!("a"; {"grade" => 4, "risk" => "high risk"}), None));
        assert!(!c.evaluate(&event!("a"; {"grade" => 3, "risk" => "low"}), None));
        assert!(!c.evaluate(&event!("a"; {"grade" => 9, "risk" => "medium"}), None));

        let c = compile("grade <= 2.5 or grade = 7", ConditionRole::Activation).unwrap();
        assert!(c.evaluate(&event!("a"; {"grade" => 2}), None));
        assert!(c.evaluate(&event!("a"; {"grade" => 7.0}), None));
        assert!(!c.evaluate(&event!("a"; {"grade" => 6}), None));

        let c = compile("A.grade != 3", ConditionRole::Activation).unwrap();
        assert!(c.evaluate(&event!("a"; {"grade" => 4}), None));
    }

    #[test]
    fn membership_and_negation() {
        let c = compile("risk in (low, 'high risk')", ConditionRole::Activation).unwrap();
        assert!(c.evaluate(&event!("a"; {"risk" => "high risk"}), None));
        assert!(!c.evaluate(&event!("a"; {"risk" => "none"}), None));
        let c = compile("risk not in (low)", ConditionRole::Activation).unwrap();
        assert!(c.evaluate(&event!("a"; {"risk" => "high risk"}), None));
        let c = compile("A.risk is not low", ConditionRole::Activation).unwrap();
        assert!(c.evaluate(&event!("a"; {"risk" => "high risk"}), None));
        assert!(!c.evaluate(&event!("a"; {"risk" => "low"}), None));
    }

    #[test]
    fn missing_attributes_are_false() {
        for text in ["grade > 1", "risk is not low", "risk not in (low)"] {
            let c = compile(text, ConditionRole::Activation).unwrap();
            assert!(!c.evaluate(&event!("a"), None), "{text}");
        }
        let c = compile("same grade", ConditionRole::Correlation).unwrap();
        assert!(!c.evaluate(&event!("a"; {"grade" => 1}), Some(&event!("b"))));
    }

    #[test]
    fn correlation_conditions() {
        let c = compile(
            "same grade and T.risk is low and different name",
            ConditionRole::Correlation,
        );
        // `name` is bound only to `a`, but a model-wide catalog accepts it
        let c = c.unwrap();
        let a = event!("a"; {"grade" => 5, "name" => "x"});
        let t = event!("b"; {"grade" => 5, "risk" => "low", "name" => "y"});
        assert!(c.evaluate(&a, Some(&t)));
        let t2 = event!("b"; {"grade" => 6, "risk" => "low", "name" => "y"});
        assert!(!c.evaluate(&a, Some(&t2)));
        assert!(!c.evaluate(&a, None));
    }

    #[test]
    fn compile_errors() {
        assert!(matches!(
            compile("A.color is red", ConditionRole::Activation),
            Err(ConditionError::UnknownAttribute(a)) if a == "color"
        ));
        assert!(matches!(
            compile("risk > 3", ConditionRole::Activation),
            Err(ConditionError::DomainMismatch { .. })
        ));
        assert!(matches!(
            compile("grade is high", ConditionRole::Activation),
            Err(ConditionError::DomainMismatch { .. })
        ));
        assert!(matches!(
            compile("T.grade > 3", ConditionRole::Activation),
            Err(ConditionError::TargetInActivation(_))
        ));
        assert!(matches!(
            compile("same grade", ConditionRole::Activation),
            Err(ConditionError::TargetInActivation(_))
        ));
        for text in [
            "grade >",
            "grade > x",
            "(grade > 3",
            "grade > 3)",
            "grade is",
            "grade in (1, 2",
            "risk low",
            "grade > 3 and",
            "risk is 'low",
        ] {
            assert!(
                matches!(
                    compile(text, ConditionRole::Activation),
                    Err(ConditionError::Syntax { .. })
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn time_conditions() {
        assert_eq!(TimeCondition::parse_str(""), Ok(None));
        let tc = TimeCondition::parse_str("1,2,h").unwrap().unwrap();
        assert_eq!(tc.min, TimeDelta::hours(1));
        assert_eq!(tc.max, TimeDelta::hours(2));
        let tc2 = TimeCondition::parse_str("0.5,1d").unwrap().unwrap();
        assert_eq!(tc2.min, TimeDelta::hours(12));
        assert_eq!(tc2.max, TimeDelta::days(1));

        let a = event!("a");
        let t = event!("b"; {"time:timestamp" => chrono::DateTime::UNIX_EPOCH + TimeDelta::minutes(90)});
        assert!(tc.holds(&a, &t));
        assert!(tc.holds(&t, &a));
        assert!(!tc.holds(&a, &a));

        for bad in ["1,2", "1,2,y", "2,1,h", "a,b,s", "-1,2,s", "1,2,3,h"] {
            assert!(
                matches!(TimeCondition::parse_str(bad), Err(ConditionError::Time(_))),
                "{bad}"
            );
        }
    }
}
