use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::satisfies_min_support;
use crate::{
    conformance::declare::{CompiledConstraint, ConstraintPredicates},
    core::{
        event_data::EventLogAccess,
        process_models::declare::{
            condition::{compile_condition, ConditionError, ConditionRole, TimeCondition},
            DeclareConstraint, TemplateKind,
        },
    },
    utils::with_worker_pool,
};

/// A partially specified constraint
///
/// Unset parts (template, activation or target activity) are filled with every possible value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeclareQuery {
    /// Template name, optionally with cardinality (e.g., `Response` or `Existence2`)
    pub template: Option<String>,
    /// Activity activating the constraint
    pub activation: Option<String>,
    /// Target activity (binary templates only)
    pub target: Option<String>,
    /// Activation condition
    pub activation_condition: String,
    /// Correlation condition (ignored for unary templates)
    pub correlation_condition: String,
    /// Time condition
    pub time_condition: String,
}

/// Options for [`check_declare_query`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeclareQueryOptions {
    /// Minimal fraction of traces which must satisfy an assignment
    pub min_support: f64,
    /// Whether traces without activations satisfy a constraint (vacuously)
    pub consider_vacuity: bool,
    /// Highest cardinality probed if no template is given
    pub max_cardinality: usize,
    /// Only return the first assignment found
    pub return_first: bool,
    /// Number of worker threads (`None`: rayon's global pool)
    pub num_threads: Option<usize>,
}

impl Default for DeclareQueryOptions {
    fn default() -> Self {
        Self {
            min_support: 0.1,
            consider_vacuity: false,
            max_cardinality: 1,
            return_first: false,
            num_threads: None,
        }
    }
}

/// Errors of query checking
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryCheckingError {
    /// Neither template nor activation nor target were given
    #[error("at least one of template, activation or target must be given")]
    NoQueryParameters,
    /// The template name is not known
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
    /// A target activity was given for a unary template
    #[error("{0} is unary and cannot have a target activity")]
    TargetOnUnary(TemplateKind),
    /// Options out of range
    #[error("invalid query options: {0}")]
    InvalidOptions(String),
    /// A condition of the query does not compile
    #[error("invalid query condition")]
    Condition(#[from] ConditionError),
}

/// An assignment satisfying a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QueryAssignment {
    /// Activation activity
    pub activation: String,
    /// Target activity (`None` for unary templates)
    pub target: Option<String>,
    /// The full constraint
    pub constraint: DeclareConstraint,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Split `Existence2` into template and cardinality
fn parse_template(name: &str) -> Result<(TemplateKind, Option<usize>), QueryCheckingError> {
    let unknown = || QueryCheckingError::UnknownTemplate(name.to_string());
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[base.len()..];
    let template = TemplateKind::parse_str(base.trim()).ok_or_else(unknown)?;
    let cardinality = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<usize>().map_err(|_| unknown())?)
    };
    match (template.supports_cardinality(), cardinality) {
        (true, n) => Ok((template, Some(n.unwrap_or(1)))),
        (false, None) => Ok((template, None)),
        (false, Some(_)) => Err(QueryCheckingError::InvalidOptions(format!(
            "{template} does not take a cardinality"
        ))),
    }
}

/// Find all assignments of template and activities completing `query` that are satisfied by
/// at least a `min_support` fraction of the traces of `log`
///
/// Without a template, all binary non-derived templates are tried, plus all unary templates
/// (with cardinalities up to `max_cardinality`) if no target is given. Conditions are compiled
/// against the attribute keys occurring in the log.
///
/// ```rust
/// use declare_mining::{event_log, discovery::declare::{check_declare_query, DeclareQuery, DeclareQueryOptions}};
///
/// let log = event_log!(["a", "b"], ["a", "c", "b"]);
/// let query = DeclareQuery {
///     template: Some("Response".into()),
///     activation: Some("a".into()),
///     ..Default::default()
/// };
/// let options = DeclareQueryOptions { min_support: 1.0, ..Default::default() };
/// let found = check_declare_query(&log, &query, &options).unwrap();
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].target.as_deref(), Some("b"));
/// ```
pub fn check_declare_query<L: EventLogAccess + ?Sized>(
    log: &L,
    query: &DeclareQuery,
    options: &DeclareQueryOptions,
) -> Result<Vec<QueryAssignment>, QueryCheckingError> {
    let template = non_empty(&query.template);
    let activation = non_empty(&query.activation);
    let target = non_empty(&query.target);
    if template.is_none() && activation.is_none() && target.is_none() {
        return Err(QueryCheckingError::NoQueryParameters);
    }
    let template = template.map(parse_template).transpose()?;
    if let Some((t, _)) = template {
        if !t.is_binary() && target.is_some() {
            return Err(QueryCheckingError::TargetOnUnary(t));
        }
    }
    if !(0.0..=1.0).contains(&options.min_support) {
        return Err(QueryCheckingError::InvalidOptions(format!(
            "min_support must be in [0, 1] but is {}",
            options.min_support
        )));
    }
    if options.max_cardinality == 0 {
        return Err(QueryCheckingError::InvalidOptions(String::from(
            "max_cardinality must be at least 1",
        )));
    }

    let keys = log.get_attribute_keys();
    let time = TimeCondition::parse_str(&query.time_condition)?;
    let unary_predicates = ConstraintPredicates {
        activation: compile_condition(
            &query.activation_condition,
            ConditionRole::Activation,
            &keys,
        )?,
        correlation: Default::default(),
        time,
    };
    let binary_predicates = ConstraintPredicates {
        correlation: compile_condition(
            &query.correlation_condition,
            ConditionRole::Correlation,
            &keys,
        )?,
        ..unary_predicates.clone()
    };

    let templates: Vec<(TemplateKind, Option<usize>)> = match template {
        Some(t) => vec![t],
        None => {
            let mut ret: Vec<_> = TemplateKind::binary_non_derived()
                .map(|t| (t, None))
                .collect();
            if target.is_none() {
                for t in TemplateKind::unary() {
                    if t.supports_cardinality() {
                        ret.extend((1..=options.max_cardinality).map(|n| (t, Some(n))));
                    } else {
                        ret.push((t, None));
                    }
                }
            }
            ret
        }
    };
    let log_activities = log.get_activities();
    let activations: Vec<&str> = match activation {
        Some(a) => vec![a],
        None => log_activities.iter().map(String::as_str).collect(),
    };
    let targets: Vec<&str> = match target {
        Some(t) => vec![t],
        None => log_activities.iter().map(String::as_str).collect(),
    };

    let mut candidates: Vec<(QueryAssignment, CompiledConstraint)> = Vec::new();
    for (template, cardinality) in templates {
        if template.is_binary() {
            for (act, tgt) in activations
                .iter()
                .flat_map(|a| targets.iter().map(move |t| (*a, *t)))
                .filter(|(a, t)| a != t)
            {
                // activities are in role order, the activation of reversed templates comes second
                let (first, second) = if template.is_reversed() {
                    (tgt, act)
                } else {
                    (act, tgt)
                };
                let constraint = DeclareConstraint::binary(template, first, second)
                    .with_conditions(
                        query.activation_condition.as_str(),
                        query.correlation_condition.as_str(),
                        query.time_condition.as_str(),
                    );
                candidates.push((
                    QueryAssignment {
                        activation: act.to_string(),
                        target: Some(tgt.to_string()),
                        constraint: constraint.clone(),
                    },
                    CompiledConstraint {
                        constraint,
                        predicates: binary_predicates.clone(),
                    },
                ));
            }
        } else {
            for act in &activations {
                let mut constraint = DeclareConstraint::unary(template, *act).with_conditions(
                    query.activation_condition.as_str(),
                    "",
                    query.time_condition.as_str(),
                );
                constraint.cardinality = cardinality;
                candidates.push((
                    QueryAssignment {
                        activation: act.to_string(),
                        target: None,
                        constraint: constraint.clone(),
                    },
                    CompiledConstraint {
                        constraint,
                        predicates: unary_predicates.clone(),
                    },
                ));
            }
        }
    }
    info!(candidates = candidates.len(), "Checking Declare query");

    let supported = |(_, c): &(QueryAssignment, CompiledConstraint)| {
        satisfies_min_support(log, c, options.consider_vacuity, options.min_support)
    };
    let found: Vec<QueryAssignment> = with_worker_pool(options.num_threads, || {
        if options.return_first {
            candidates
                .into_par_iter()
                .find_first(supported)
                .into_iter()
                .map(|(a, _)| a)
                .collect()
        } else {
            candidates
                .into_par_iter()
                .filter(supported)
                .map(|(a, _)| a)
                .collect()
        }
    });
    Ok(found)
}
