//! Discovering Declare Models from Event Logs
//!
//! Candidates are generated from frequent activity itemsets and kept if they are satisfied by
//! enough traces.
/// Apriori frequent itemsets on the activity occurrences of traces
pub mod frequent_itemsets;
/// Finding activity assignments of partially specified constraints
pub mod query_checking;

use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    conformance::declare::{CompiledConstraint, TraceState},
    core::{
        event_data::EventLogAccess,
        process_models::declare::{DeclareConstraint, DeclareModel, TemplateKind},
    },
    utils::{with_worker_pool, CancellationToken},
};

use frequent_itemsets::{frequent_itemsets, FrequentItemset};

#[doc(inline)]
pub use query_checking::{
    check_declare_query, DeclareQuery, DeclareQueryOptions, QueryAssignment, QueryCheckingError,
};

/// Options for the automatic discovery of Declare constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeclareDiscoveryOptions {
    /// Minimal fraction of traces in which the activities of a candidate must occur together
    pub itemsets_support: f64,
    /// Minimal fraction of traces which must satisfy a discovered constraint
    pub min_support: f64,
    /// Highest cardinality `n` probed for templates supporting one (`Existence1`, `Existence2`, ...)
    pub max_cardinality: usize,
    /// Whether traces without activations satisfy a constraint (vacuously)
    pub consider_vacuity: bool,
    /// Number of worker threads (`None`: rayon's global pool)
    pub num_threads: Option<usize>,
}

impl Default for DeclareDiscoveryOptions {
    fn default() -> Self {
        Self {
            itemsets_support: 0.9,
            min_support: 1.0,
            max_cardinality: 1,
            consider_vacuity: false,
            num_threads: None,
        }
    }
}

impl DeclareDiscoveryOptions {
    fn validate(&self) -> Result<(), DiscoveryError> {
        for (name, value) in [
            ("itemsets_support", self.itemsets_support),
            ("min_support", self.min_support),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DiscoveryError::InvalidOptions(format!(
                    "{name} must be in [0, 1] but is {value}"
                )));
            }
        }
        if self.max_cardinality == 0 {
            return Err(DiscoveryError::InvalidOptions(String::from(
                "max_cardinality must be at least 1",
            )));
        }
        Ok(())
    }
}

/// Errors of Declare discovery
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// Options out of range
    #[error("invalid discovery options: {0}")]
    InvalidOptions(String),
    /// The run was cancelled through its [`CancellationToken`]
    #[error("discovery was cancelled")]
    Cancelled,
}

/// Whether a constraint is [`TraceState::Satisfied`] by at least a `min_support` fraction of
/// the traces of a log
///
/// Stops scanning as soon as the outcome is decided: once enough traces satisfied the
/// constraint, or once the remaining traces can no longer reach the threshold.
/// An empty log supports no constraint.
pub fn satisfies_min_support<L: EventLogAccess + ?Sized>(
    log: &L,
    constraint: &CompiledConstraint,
    consider_vacuity: bool,
    min_support: f64,
) -> bool {
    let total = log.trace_count();
    if total == 0 {
        return false;
    }
    let reaches = |satisfied: usize| satisfied as f64 / total as f64 >= min_support;
    let mut satisfied = 0;
    for (i, trace) in log.iter_traces().enumerate() {
        if constraint.check(trace, consider_vacuity).state == TraceState::Satisfied {
            satisfied += 1;
        }
        if reaches(satisfied) {
            return true;
        }
        // not even if all remaining traces satisfy the constraint
        if !reaches(satisfied + total - (i + 1)) {
            return false;
        }
    }
    reaches(satisfied)
}

/// Candidate constraints for the given frequent itemsets
///
/// Singletons instantiate all unary templates (with cardinalities `1..=max_cardinality` where
/// supported), pairs instantiate all binary non-derived templates in both activity orders.
pub fn generate_candidates(
    itemsets: &[FrequentItemset],
    max_cardinality: usize,
) -> Vec<DeclareConstraint> {
    let mut candidates = Vec::new();
    for itemset in itemsets {
        match itemset.items.as_slice() {
            [act] => {
                for template in TemplateKind::unary() {
                    if template.supports_cardinality() {
                        candidates.extend((1..=max_cardinality).map(|n| {
                            DeclareConstraint::unary(template, act.as_str()).with_cardinality(n)
                        }));
                    } else {
                        candidates.push(DeclareConstraint::unary(template, act.as_str()));
                    }
                }
            }
            [a, b] => {
                for template in TemplateKind::binary_non_derived() {
                    candidates.push(DeclareConstraint::binary(template, a.as_str(), b.as_str()));
                    candidates.push(DeclareConstraint::binary(template, b.as_str(), a.as_str()));
                }
            }
            _ => {}
        }
    }
    candidates
}

/// Discover a Declare model from an event log
///
/// The model declares all activities of the log and contains the accepted candidates in
/// candidate order.
///
/// ```rust
/// use declare_mining::{event_log, discovery::declare::{discover_declare_model, DeclareDiscoveryOptions}};
///
/// let log = event_log!(["a", "b"], ["a", "b", "b"], ["a", "c", "b"]);
/// let model = discover_declare_model(&log, &DeclareDiscoveryOptions::default()).unwrap();
/// assert!(model
///     .constraints()
///     .iter()
///     .any(|c| c.to_string() == "Response[a, b] | | |"));
/// ```
pub fn discover_declare_model<L: EventLogAccess + ?Sized>(
    log: &L,
    options: &DeclareDiscoveryOptions,
) -> Result<DeclareModel, DiscoveryError> {
    discover_declare_model_with_cancellation(log, options, &CancellationToken::new())
}

/// Like [`discover_declare_model`], but stops with [`DiscoveryError::Cancelled`] once `cancel`
/// is triggered
///
/// The token is checked between candidates.
pub fn discover_declare_model_with_cancellation<L: EventLogAccess + ?Sized>(
    log: &L,
    options: &DeclareDiscoveryOptions,
    cancel: &CancellationToken,
) -> Result<DeclareModel, DiscoveryError> {
    options.validate()?;
    let mut model = DeclareModel::new();
    for act in log.get_activities() {
        model.add_activity(act);
    }
    if log.trace_count() == 0 {
        info!("Event log is empty, no constraints discovered");
        return Ok(model);
    }

    let itemsets = frequent_itemsets(log, options.itemsets_support, 2);
    let candidates = generate_candidates(&itemsets, options.max_cardinality);
    info!(
        itemsets = itemsets.len(),
        candidates = candidates.len(),
        "Checking Declare candidates"
    );

    let accepted: Vec<Option<DeclareConstraint>> = with_worker_pool(options.num_threads, || {
        candidates
            .into_par_iter()
            .map(|c| {
                if cancel.is_cancelled() {
                    return None;
                }
                let compiled = CompiledConstraint::unconditioned(c);
                satisfies_min_support(
                    log,
                    &compiled,
                    options.consider_vacuity,
                    options.min_support,
                )
                .then_some(compiled.constraint)
            })
            .collect()
    });
    if cancel.is_cancelled() {
        return Err(DiscoveryError::Cancelled);
    }

    for c in accepted.into_iter().flatten() {
        debug!(constraint = %c, "Accepted candidate");
        if let Err(e) = model.add_constraint(c) {
            warn!("Dropping discovered constraint: {e}");
        }
    }
    info!(
        constraints = model.constraints().len(),
        "Discovered Declare model"
    );
    Ok(model)
}
