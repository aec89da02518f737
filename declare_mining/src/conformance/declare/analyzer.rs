use std::collections::HashSet;
use std::str::FromStr;

use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{CheckerResult, CompiledConstraint, TraceState};
use crate::core::event_data::EventLogAccess;
use crate::core::process_models::declare::DeclareModel;
use crate::utils::with_worker_pool;

/// Options for checking a log against a Declare model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeclareCheckingOptions {
    /// Whether traces without activations satisfy a constraint (vacuously)
    #[serde(default)]
    pub consider_vacuity: bool,
    /// Number of worker threads (`None`: rayon's global pool)
    #[serde(default)]
    pub num_threads: Option<usize>,
}

/// Missing inputs of a [`DeclareAnalyzer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PrerequisiteError {
    /// No event log was provided
    #[error("no event log was provided to check")]
    MissingLog,
    /// No model was provided
    #[error("no Declare model was provided to check against")]
    MissingModel,
}

/// Compile the conditions of all constraints of a model
///
/// Constraints whose conditions do not compile are `None`; a warning is logged once per
/// distinct constraint string.
pub fn compile_model(model: &DeclareModel) -> Vec<Option<CompiledConstraint>> {
    let mut reported = HashSet::new();
    model
        .constraints()
        .iter()
        .map(|c| match CompiledConstraint::compile(c, model) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                let label = c.to_string();
                if reported.insert(label.clone()) {
                    warn!(constraint = %label, "Skipping constraint: {e}");
                }
                None
            }
        })
        .collect()
}

/// Checks all traces of a log against all constraints of a Declare model
///
/// ```rust
/// use declare_mining::{event_log, conformance::declare::{ConformanceMetric, DeclareAnalyzer, DeclareCheckingOptions}};
/// use declare_mining::core::DeclareModel;
///
/// let log = event_log!(["A", "B"], ["A", "C"]);
/// let model: DeclareModel = "activity A\nactivity B\nResponse[A, B] | | |".parse().unwrap();
/// let results = DeclareAnalyzer::new(DeclareCheckingOptions::default())
///     .with_log(&log)
///     .with_model(&model)
///     .run()
///     .unwrap();
/// assert_eq!(results.get_constraint_metrics(ConformanceMetric::State, 0), Some(vec![Some(1), Some(0)]));
/// ```
pub struct DeclareAnalyzer<'a, L: ?Sized> {
    log: Option<&'a L>,
    model: Option<&'a DeclareModel>,
    options: DeclareCheckingOptions,
}

impl<L: ?Sized> std::fmt::Debug for DeclareAnalyzer<'_, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclareAnalyzer")
            .field("has_log", &self.log.is_some())
            .field("model", &self.model)
            .field("options", &self.options)
            .finish()
    }
}

impl<'a, L: EventLogAccess + ?Sized> DeclareAnalyzer<'a, L> {
    /// Create an analyzer (without log and model)
    pub fn new(options: DeclareCheckingOptions) -> Self {
        Self {
            log: None,
            model: None,
            options,
        }
    }

    /// Set the log to check
    pub fn with_log(mut self, log: &'a L) -> Self {
        self.log = Some(log);
        self
    }

    /// Set the model to check against
    pub fn with_model(mut self, model: &'a DeclareModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Check every trace against every constraint
    ///
    /// Constraints with invalid conditions are skipped (their results are `None`).
    pub fn run(&self) -> Result<DeclareConformanceResults, PrerequisiteError> {
        let log = self.log.ok_or(PrerequisiteError::MissingLog)?;
        let model = self.model.ok_or(PrerequisiteError::MissingModel)?;
        let compiled = compile_model(model);
        let consider_vacuity = self.options.consider_vacuity;
        let results = with_worker_pool(self.options.num_threads, || {
            (0..log.trace_count())
                .into_par_iter()
                .map(|i| match log.get_trace(i) {
                    Some(trace) => compiled
                        .iter()
                        .map(|c| c.as_ref().map(|c| c.check(trace, consider_vacuity)))
                        .collect(),
                    None => vec![None; compiled.len()],
                })
                .collect::<Vec<Vec<_>>>()
        });
        debug!(
            traces = results.len(),
            constraints = compiled.len(),
            "Checked log against Declare model"
        );
        Ok(DeclareConformanceResults {
            constraints: model.constraints().iter().map(|c| c.to_string()).collect(),
            results,
        })
    }
}

/// Per-result metric which can be queried from [`DeclareConformanceResults`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ConformanceMetric {
    /// Number of activations
    Activations,
    /// Number of fulfillments
    Fulfillments,
    /// Number of violations
    Violations,
    /// Number of pendings
    Pendings,
    /// State, as `0` (violated) or `1` (otherwise)
    State,
}

impl ConformanceMetric {
    /// Get the value of this metric from a checker result
    pub fn extract(&self, result: &CheckerResult) -> Option<u32> {
        match self {
            ConformanceMetric::Activations => result.num_activations,
            ConformanceMetric::Fulfillments => result.num_fulfillments,
            ConformanceMetric::Violations => result.num_violations,
            ConformanceMetric::Pendings => result.num_pendings,
            ConformanceMetric::State => Some(u32::from(result.state != TraceState::Violated)),
        }
    }
}

/// Unknown metric name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric `{0}` (expected activations, fulfillments, violations, pendings or state)")]
pub struct UnknownMetricError(pub String);

impl FromStr for ConformanceMetric {
    type Err = UnknownMetricError;

    /// Parse metric names like `"violations"` or `"num_violations"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        match name.strip_prefix("num_").unwrap_or(&name) {
            "activations" => Ok(Self::Activations),
            "fulfillments" | "fulfilments" => Ok(Self::Fulfillments),
            "violations" => Ok(Self::Violations),
            "pendings" => Ok(Self::Pendings),
            "state" => Ok(Self::State),
            _ => Err(UnknownMetricError(s.to_string())),
        }
    }
}

/// Results of checking a log against a model: a matrix of [`CheckerResult`]s indexed by
/// trace (rows) and constraint (columns)
///
/// Cells of skipped constraints are `None`. Queries with out-of-range indices return `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeclareConformanceResults {
    constraints: Vec<String>,
    results: Vec<Vec<Option<CheckerResult>>>,
}

impl DeclareConformanceResults {
    /// Canonical strings of the checked constraints (column labels)
    pub fn constraint_labels(&self) -> &[String] {
        &self.constraints
    }

    /// Number of checked traces
    pub fn trace_count(&self) -> usize {
        self.results.len()
    }

    /// Number of checked constraints
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Result of one constraint on one trace
    pub fn get_result(&self, trace: usize, constraint: usize) -> Option<&CheckerResult> {
        self.results.get(trace)?.get(constraint)?.as_ref()
    }

    /// Metric of one constraint on one trace
    pub fn get_metric(
        &self,
        metric: ConformanceMetric,
        trace: usize,
        constraint: usize,
    ) -> Option<u32> {
        metric.extract(self.get_result(trace, constraint)?)
    }

    /// Metric of all constraints on one trace
    pub fn get_trace_metrics(
        &self,
        metric: ConformanceMetric,
        trace: usize,
    ) -> Option<Vec<Option<u32>>> {
        let row = self.results.get(trace)?;
        Some(
            row.iter()
                .map(|r| r.as_ref().and_then(|r| metric.extract(r)))
                .collect(),
        )
    }

    /// Metric of one constraint on all traces
    pub fn get_constraint_metrics(
        &self,
        metric: ConformanceMetric,
        constraint: usize,
    ) -> Option<Vec<Option<u32>>> {
        if constraint >= self.constraints.len() {
            return None;
        }
        Some(
            (0..self.results.len())
                .map(|t| self.get_metric(metric, t, constraint))
                .collect(),
        )
    }

    /// Metric of all constraints on all traces (rows: traces, columns: constraints)
    pub fn get_metric_matrix(&self, metric: ConformanceMetric) -> Vec<Vec<Option<u32>>> {
        (0..self.results.len())
            .filter_map(|t| self.get_trace_metrics(metric, t))
            .collect()
    }

    /// Fraction of traces on which a constraint is [`TraceState::Satisfied`]
    ///
    /// `None` for skipped constraints, out-of-range indices and empty logs.
    pub fn support(&self, constraint: usize) -> Option<f64> {
        let states = self
            .results
            .iter()
            .map(|row| row.get(constraint).copied().flatten().map(|r| r.state))
            .collect::<Option<Vec<_>>>()?;
        if states.is_empty() {
            return None;
        }
        let satisfied = states
            .iter()
            .filter(|s| **s == TraceState::Satisfied)
            .count();
        Some(satisfied as f64 / states.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_data::EventLog;
    use crate::event_log;

    fn model() -> DeclareModel {
        "activity A
activity B
activity C
bind A: grade
grade: integer between 0 and 10
Existence2[A] | |
Response[A, B] | | |
Precedence[A, C] | | |
Response[A, C] |A.color is red | |
Response[A, C] |A.color is red | |
Response[A, B] |A.grade > 5 | |"
            .parse()
            .unwrap()
    }

    fn log() -> EventLog {
        event_log!(
            ["A"; {"grade" => 7}, "B", "A"; {"grade" => 2}],
            ["A", "C"],
            ["C", "X"],
        )
    }

    #[test]
    fn missing_prerequisites() {
        let model = model();
        let log = log();
        let analyzer = DeclareAnalyzer::<EventLog>::new(DeclareCheckingOptions::default());
        assert_eq!(analyzer.run().unwrap_err(), PrerequisiteError::MissingLog);
        let analyzer = analyzer.with_log(&log);
        assert_eq!(analyzer.run().unwrap_err(), PrerequisiteError::MissingModel);
        assert!(analyzer.with_model(&model).run().is_ok());
    }

    #[test]
    fn result_matrix_and_metrics() {
        let model = model();
        let log = log();
        let res = DeclareAnalyzer::new(DeclareCheckingOptions::default())
            .with_log(&log)
            .with_model(&model)
            .run()
            .unwrap();
        assert_eq!(res.trace_count(), 3);
        assert_eq!(res.constraint_count(), 6);
        assert_eq!(res.constraint_labels()[1], "Response[A, B] | | |");

        // Existence2[A]
        assert_eq!(
            res.get_constraint_metrics(ConformanceMetric::State, 0),
            Some(vec![Some(1), Some(0), Some(0)])
        );
        assert_eq!(res.get_metric(ConformanceMetric::Activations, 0, 0), None);
        // Response[A, B]: the second A of trace 0 is not followed by B
        assert_eq!(res.get_metric(ConformanceMetric::Activations, 0, 1), Some(2));
        assert_eq!(res.get_metric(ConformanceMetric::Fulfillments, 0, 1), Some(1));
        assert_eq!(res.get_metric(ConformanceMetric::Violations, 0, 1), Some(1));
        // Precedence[A, C]
        assert_eq!(
            res.get_constraint_metrics(ConformanceMetric::Violations, 2),
            Some(vec![Some(0), Some(0), Some(1)])
        );
        assert_eq!(res.get_metric(ConformanceMetric::Pendings, 0, 2), None);
        // skipped constraints (unknown attribute `color`)
        assert_eq!(res.get_result(0, 3), None);
        assert_eq!(res.get_result(1, 4), None);
        assert_eq!(res.support(3), None);
        // activation condition: only the first A of trace 0 activates
        assert_eq!(res.get_metric(ConformanceMetric::Activations, 0, 5), Some(1));
        assert_eq!(res.get_metric(ConformanceMetric::State, 0, 5), Some(1));

        assert_eq!(
            res.get_trace_metrics(ConformanceMetric::State, 2),
            Some(vec![Some(0), Some(0), Some(0), None, None, Some(0)])
        );
        assert_eq!(res.get_metric_matrix(ConformanceMetric::State).len(), 3);
        // vacuous in trace 0
        assert_eq!(res.support(2), Some(1.0 / 3.0));

        // out of range
        assert_eq!(res.get_result(3, 0), None);
        assert_eq!(res.get_trace_metrics(ConformanceMetric::State, 3), None);
        assert_eq!(res.get_constraint_metrics(ConformanceMetric::State, 6), None);
    }

    #[test]
    fn results_do_not_depend_on_threads() {
        let model = model();
        let log = log();
        let single = DeclareAnalyzer::new(DeclareCheckingOptions {
            consider_vacuity: true,
            num_threads: Some(1),
        })
        .with_log(&log)
        .with_model(&model)
        .run()
        .unwrap();
        let multi = DeclareAnalyzer::new(DeclareCheckingOptions {
            consider_vacuity: true,
            num_threads: Some(4),
        })
        .with_log(&log)
        .with_model(&model)
        .run()
        .unwrap();
        assert_eq!(single, multi);
        let json = serde_json::to_string(&multi).unwrap();
        let back: DeclareConformanceResults = serde_json::from_str(&json).unwrap();
        assert_eq!(back, multi);
    }

    #[test]
    fn metric_names() {
        assert_eq!("violations".parse(), Ok(ConformanceMetric::Violations));
        assert_eq!("num_activations".parse(), Ok(ConformanceMetric::Activations));
        assert_eq!(" State ".parse(), Ok(ConformanceMetric::State));
        assert!("support".parse::<ConformanceMetric>().is_err());
    }
}
