//! Conformance checking of Declare constraints on traces
//!
//! [`check_trace`] runs the checker of one constraint on one trace; the
//! [`DeclareAnalyzer`] checks a whole log against a whole model.
/// Log-wide conformance checking and metric queries
pub mod analyzer;
/// Checker algorithms of all templates
pub mod checkers;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::event_data::{Event, Trace};
use crate::core::process_models::declare::condition::{
    compile_condition, AttributeCatalog, Condition, ConditionError, ConditionRole, TimeCondition,
};
use crate::core::process_models::declare::DeclareConstraint;

#[doc(inline)]
pub use analyzer::{
    ConformanceMetric, DeclareAnalyzer, DeclareCheckingOptions, DeclareConformanceResults,
    PrerequisiteError,
};

/// State of a constraint on a trace
///
/// The _possibly_ states are only reported for incomplete traces: they may still change once
/// more events are observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TraceState {
    /// The constraint holds
    Satisfied,
    /// The constraint is violated
    Violated,
    /// The constraint holds so far
    PossiblySatisfied,
    /// The constraint does not hold so far
    PossiblyViolated,
}

/// Result of checking one constraint on one trace
///
/// Counts are `None` for templates that do not count activations (unary and choice
/// templates; pendings also for the precedence family).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct CheckerResult {
    /// Number of activating events
    pub num_activations: Option<u32>,
    /// Number of activations that were fulfilled
    pub num_fulfillments: Option<u32>,
    /// Number of activations that were violated
    pub num_violations: Option<u32>,
    /// Number of activations still awaiting a target (incomplete traces)
    pub num_pendings: Option<u32>,
    /// Resulting state
    pub state: TraceState,
}

impl CheckerResult {
    /// Result without counts
    pub fn from_state(state: TraceState) -> Self {
        Self {
            num_activations: None,
            num_fulfillments: None,
            num_violations: None,
            num_pendings: None,
            state,
        }
    }
}

/// Derive the [`TraceState`] from activation counts
///
/// For negative templates, pending activations can only turn into fulfillments, so they do not
/// count towards the state.
pub fn derive_state(
    activations: u32,
    violations: u32,
    pendings: u32,
    complete: bool,
    consider_vacuity: bool,
    negative: bool,
) -> TraceState {
    let pendings = if negative { 0 } else { pendings };
    if !consider_vacuity && activations == 0 {
        if complete {
            TraceState::Violated
        } else {
            TraceState::PossiblyViolated
        }
    } else if !complete && violations == 0 && pendings > 0 {
        TraceState::PossiblyViolated
    } else if !complete && violations == 0 {
        TraceState::PossiblySatisfied
    } else if violations > 0 || (complete && pendings > 0) {
        TraceState::Violated
    } else {
        TraceState::Satisfied
    }
}

/// Compiled conditions of a constraint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintPredicates {
    /// Activation condition
    pub activation: Condition,
    /// Correlation condition
    pub correlation: Condition,
    /// Time condition (`None`: no restriction)
    pub time: Option<TimeCondition>,
}

impl ConstraintPredicates {
    /// Compile the conditions of a constraint, checking attribute references against `catalog`
    pub fn compile<C: AttributeCatalog + ?Sized>(
        constraint: &DeclareConstraint,
        catalog: &C,
    ) -> Result<Self, ConditionError> {
        Ok(Self {
            activation: compile_condition(
                &constraint.activation_condition,
                ConditionRole::Activation,
                catalog,
            )?,
            correlation: compile_condition(
                &constraint.correlation_condition,
                ConditionRole::Correlation,
                catalog,
            )?,
            time: TimeCondition::parse_str(&constraint.time_condition)?,
        })
    }

    /// Whether `event` satisfies the activation condition
    pub fn activates(&self, event: &Event) -> bool {
        self.activation.evaluate(event, None)
    }

    /// Activation check of unary templates: activation condition, and time condition relative
    /// to the first event of the trace
    pub fn activates_relative_to(&self, event: &Event, first: &Event) -> bool {
        self.activation.evaluate(event, None) && self.time.map_or(true, |t| t.holds(event, first))
    }

    /// Whether `target` can discharge the activation `activation` (correlation and time condition)
    pub fn correlates(&self, activation: &Event, target: &Event) -> bool {
        self.correlation.evaluate(activation, Some(target))
            && self.time.map_or(true, |t| t.holds(activation, target))
    }
}

/// Constraint with compiled conditions, ready to be checked
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledConstraint {
    /// The constraint
    pub constraint: DeclareConstraint,
    /// Its compiled conditions
    pub predicates: ConstraintPredicates,
}

impl CompiledConstraint {
    /// Compile the conditions of `constraint`
    pub fn compile<C: AttributeCatalog + ?Sized>(
        constraint: &DeclareConstraint,
        catalog: &C,
    ) -> Result<Self, ConditionError> {
        Ok(Self {
            predicates: ConstraintPredicates::compile(constraint, catalog)?,
            constraint: constraint.clone(),
        })
    }

    /// Constraint without any conditions (always compiles)
    pub fn unconditioned(constraint: DeclareConstraint) -> Self {
        Self {
            constraint,
            predicates: ConstraintPredicates::default(),
        }
    }

    /// Check this constraint on a trace
    pub fn check(&self, trace: &Trace, consider_vacuity: bool) -> CheckerResult {
        check_trace(&trace.events, self, trace.complete, consider_vacuity)
    }
}

/// Check a compiled constraint on a sequence of events
///
/// `complete` states whether the trace has ended. With `consider_vacuity`, a trace without
/// activations satisfies the constraint (vacuously); otherwise it violates it.
pub fn check_trace(
    events: &[Event],
    constraint: &CompiledConstraint,
    complete: bool,
    consider_vacuity: bool,
) -> CheckerResult {
    let c = &constraint.constraint;
    checkers::check_template(
        c.template,
        &c.activities,
        c.cardinality,
        &constraint.predicates,
        events,
        complete,
        consider_vacuity,
    )
}
