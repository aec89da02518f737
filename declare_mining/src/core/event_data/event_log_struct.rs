use std::collections::BTreeSet;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset};
use ordered_float::OrderedFloat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Value of an event (or trace) attribute
///
/// Conditions compare values with literals through [`AttributeValue::matches_literal`] and,
/// for numbers, [`AttributeValue::as_number`].
///
/// ```rust
/// use declare_mining::core::event_data::AttributeValue;
///
/// let grade = AttributeValue::Int(5);
/// assert!(grade.matches_literal("5.0"));
/// assert_eq!(grade.as_number(), Some(5.0));
/// assert!(AttributeValue::from("Mona").matches_literal("Mona"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "type", content = "content")]
pub enum AttributeValue {
    /// Text
    String(String),
    /// Timestamp with offset
    Date(DateTime<FixedOffset>),
    /// Whole number
    Int(i64),
    /// Floating point number
    Float(f64),
    /// `true` or `false`
    Boolean(bool),
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{s}"),
            AttributeValue::Date(date_time) => write!(f, "{}", date_time.to_rfc3339()),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(x) => write!(f, "{x}"),
            AttributeValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for AttributeValue {
    fn from(dt: DateTime<Tz>) -> Self {
        AttributeValue::Date(dt.fixed_offset())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        AttributeValue::Float(x)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

// Floats hash via `OrderedFloat`
impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            AttributeValue::String(s) => s.hash(state),
            AttributeValue::Date(dt) => dt.hash(state),
            AttributeValue::Int(i) => i.hash(state),
            AttributeValue::Float(x) => OrderedFloat(*x).hash(state),
            AttributeValue::Boolean(b) => b.hash(state),
        }
    }
}

impl Eq for AttributeValue {}

impl AttributeValue {
    /// The timestamp of a [`AttributeValue::Date`] value
    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            AttributeValue::Date(dt) => Some(dt),
            _ => None,
        }
    }

    /// Numeric view of [`AttributeValue::Int`] and [`AttributeValue::Float`] values
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Check whether this value equals a literal written in a condition
    ///
    /// Numbers compare numerically (`5` matches `5.0`), booleans case-insensitively,
    /// dates as RFC 3339 instants and strings exactly.
    pub fn matches_literal(&self, literal: &str) -> bool {
        match self {
            AttributeValue::String(s) => s == literal,
            AttributeValue::Int(_) | AttributeValue::Float(_) => {
                match (self.as_number(), literal.parse::<f64>()) {
                    (Some(v), Ok(l)) => v == l,
                    _ => false,
                }
            }
            AttributeValue::Boolean(b) => literal
                .to_ascii_lowercase()
                .parse::<bool>()
                .is_ok_and(|l| l == *b),
            AttributeValue::Date(d) => {
                DateTime::parse_from_rfc3339(literal).is_ok_and(|l| l == *d)
            }
        }
    }
}

/// Named data value of an event or trace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Hash, Eq, JsonSchema)]
pub struct Attribute {
    /// Name
    pub key: String,
    /// Value
    pub value: AttributeValue,
}

impl Attribute {
    /// Create an attribute
    pub fn new(key: String, value: AttributeValue) -> Self {
        Self { key, value }
    }
}

/// List of [`Attribute`]s, looked up by key through [`EditableAttributes`]
pub type Attributes = Vec<Attribute>;

/// Key-based access to [`Attributes`]
///
/// Lookups are linear in the number of attributes.
pub trait EditableAttributes {
    /// Append an attribute (without checking for an existing one with the same key)
    fn add_attribute(&mut self, attr: Attribute);
    /// First attribute with the given key
    fn get_by_key(&self, key: &str) -> Option<&Attribute>;
    /// Remove and return the first attribute with the given key
    fn remove_with_key(&mut self, key: &str) -> Option<Attribute>;
}

impl EditableAttributes for Attributes {
    fn add_attribute(&mut self, attr: Attribute) {
        self.push(attr);
    }

    fn get_by_key(&self, key: &str) -> Option<&Attribute> {
        self.iter().find(|a| a.key == key)
    }

    fn remove_with_key(&mut self, key: &str) -> Option<Attribute> {
        let index = self.iter().position(|a| a.key == key)?;
        Some(self.remove(index))
    }
}

///
/// An event: an activity occurrence at a point in time, with additional data attributes
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Hash, Eq, JsonSchema)]
pub struct Event {
    /// Activity label
    pub activity: String,
    /// Timestamp of the event
    pub timestamp: DateTime<FixedOffset>,
    /// Data attributes (payload)
    pub attributes: Attributes,
}

impl Event {
    /// Create a new event with the provided activity, at the unix epoch and without attributes
    pub fn new(activity: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
            timestamp: DateTime::UNIX_EPOCH.fixed_offset(),
            attributes: Vec::new(),
        }
    }

    /// Set the timestamp of this event
    pub fn at(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Get the value of a data attribute
    pub fn get_value(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get_by_key(key).map(|a| &a.value)
    }
}

fn complete_by_default() -> bool {
    true
}

/// Events of one case, in order, with trace-level [`Attributes`]
///
/// Traces are `complete` by default. Incomplete traces (`complete: false`) may still grow,
/// which checkers reflect by reporting _possibly_ satisfied/violated states.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Trace {
    /// Case attributes
    pub attributes: Attributes,
    /// Events, ordered by occurrence
    pub events: Vec<Event>,
    /// Whether the trace has ended
    #[serde(default = "complete_by_default")]
    pub complete: bool,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            events: Vec::new(),
            complete: true,
        }
    }
}

impl Trace {
    /// Empty, complete trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark this trace as (in)complete
    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }
}

/// In-memory event log: a list of [`Trace`]s
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
pub struct EventLog {
    /// Log-level attributes
    pub attributes: Attributes,
    /// Traces (cases)
    pub traces: Vec<Trace>,
}

/// Read access to a log of traces
///
/// Checking and discovery read logs only through this trait.
pub trait EventLogAccess: Sync {
    /// Number of traces
    fn trace_count(&self) -> usize;
    /// Get the trace at the given index
    fn get_trace(&self, index: usize) -> Option<&Trace>;
    /// Iterate over all traces in order
    fn iter_traces(&self) -> Box<dyn Iterator<Item = &Trace> + '_>;
    /// Sorted, distinct activity labels occurring in the log
    fn get_activities(&self) -> Vec<String> {
        self.iter_traces()
            .flat_map(|t| t.events.iter().map(|e| e.activity.as_str()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    }
    /// Sorted, distinct event attribute keys occurring in the log
    fn get_attribute_keys(&self) -> BTreeSet<String> {
        self.iter_traces()
            .flat_map(|t| t.events.iter())
            .flat_map(|e| e.attributes.iter().map(|a| a.key.clone()))
            .collect()
    }
}

impl EventLogAccess for EventLog {
    fn trace_count(&self) -> usize {
        self.traces.len()
    }

    fn get_trace(&self, index: usize) -> Option<&Trace> {
        self.traces.get(index)
    }

    fn iter_traces(&self) -> Box<dyn Iterator<Item = &Trace> + '_> {
        Box::new(self.traces.iter())
    }
}

impl EventLogAccess for [Trace] {
    fn trace_count(&self) -> usize {
        self.len()
    }

    fn get_trace(&self, index: usize) -> Option<&Trace> {
        self.get(index)
    }

    fn iter_traces(&self) -> Box<dyn Iterator<Item = &Trace> + '_> {
        Box::new(self.iter())
    }
}
