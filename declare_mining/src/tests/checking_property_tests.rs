use crate::conformance::declare::analyzer::compile_model;
use crate::conformance::declare::{
    ConformanceMetric, DeclareAnalyzer, DeclareCheckingOptions, DeclareConformanceResults,
    TraceState,
};
use crate::core::event_data::{EventLog, Trace};
use crate::core::process_models::declare::DeclareModel;
use crate::{event_log, trace};

use super::model_with_all_templates;

fn log() -> EventLog {
    event_log!(
        ["A"; {"grade" => 5}, "B"; {"resource" => "Mona"}, "C", "C"],
        ["B"; {"resource" => "Lars"}, "A"; {"grade" => 1}, "X"],
        ["A"; {"grade" => 7}, "A"; {"grade" => 9}, "B"; {"resource" => "Mona"}],
        ["C", "A"; {"grade" => 4}],
        ["X"],
        [],
    )
}

fn run(
    log: &EventLog,
    model: &DeclareModel,
    options: DeclareCheckingOptions,
) -> DeclareConformanceResults {
    DeclareAnalyzer::new(options)
        .with_log(log)
        .with_model(model)
        .run()
        .unwrap()
}

#[test]
fn test_checking_is_deterministic() {
    let log = log();
    let model = model_with_all_templates();
    let first = run(&log, &model, DeclareCheckingOptions::default());
    let again = run(&log, &model, DeclareCheckingOptions::default());
    let threaded = run(
        &log,
        &model,
        DeclareCheckingOptions {
            num_threads: Some(3),
            ..Default::default()
        },
    );
    assert_eq!(first, again);
    assert_eq!(first, threaded);
    // all conditions compile against the model
    assert!((0..first.trace_count())
        .all(|t| (0..first.constraint_count()).all(|c| first.get_result(t, c).is_some())));
}

#[test]
fn test_completion_resolves_possibly_states() {
    let log = log();
    let model = model_with_all_templates();
    let compiled = compile_model(&model);
    for constraint in compiled.iter().flatten() {
        for trace in &log.traces {
            // every prefix, as a running trace and as a finished one
            for len in 0..=trace.events.len() {
                let finished = Trace {
                    events: trace.events[..len].to_vec(),
                    ..Trace::new()
                };
                let running = finished.clone().with_complete(false);
                for vacuity in [false, true] {
                    let partial = constraint.check(&running, vacuity).state;
                    let complete = constraint.check(&finished, vacuity).state;
                    let expected = match partial {
                        TraceState::PossiblySatisfied => TraceState::Satisfied,
                        TraceState::PossiblyViolated => TraceState::Violated,
                        s => s,
                    };
                    assert_eq!(
                        complete, expected,
                        "{} on prefix {len} of {:?}",
                        constraint.constraint, trace.events
                    );
                }
            }
        }
    }
}

#[test]
fn test_vacuity_changes_only_unactivated_constraints() {
    let log = log();
    let model = model_with_all_templates();
    let strict = run(&log, &model, DeclareCheckingOptions::default());
    let vacuous = run(
        &log,
        &model,
        DeclareCheckingOptions {
            consider_vacuity: true,
            num_threads: None,
        },
    );
    let mut changed = 0;
    for t in 0..strict.trace_count() {
        for c in 0..strict.constraint_count() {
            let (Some(a), Some(b)) = (strict.get_result(t, c), vacuous.get_result(t, c)) else {
                panic!("missing result for trace {t}, constraint {c}");
            };
            assert_eq!(a.num_activations, b.num_activations);
            if a.num_activations == Some(0) {
                assert_ne!(a.state, b.state, "{}", strict.constraint_labels()[c]);
                assert_eq!(b.state, TraceState::Satisfied);
                changed += 1;
            } else {
                assert_eq!(a.state, b.state, "{}", strict.constraint_labels()[c]);
            }
        }
    }
    assert!(changed > 0);
}

#[test]
fn test_checking_through_the_text_format() {
    let model: DeclareModel = "activity A
activity B
activity X
Existence2[A] | |
Response[A, B] | | |
Chain Response[A, B] | | |
Precedence[A, B] | | |"
        .parse()
        .unwrap();
    let log = event_log!(
        ["A", "B", "A"],
        ["A", "X", "B"],
        ["B", "A", "X"],
        ["A", "B"],
    );
    let res = run(&log, &model, DeclareCheckingOptions::default());
    let states = res.get_metric_matrix(ConformanceMetric::State);
    assert_eq!(
        states,
        vec![
            vec![Some(1), Some(0), Some(0), Some(1)],
            vec![Some(0), Some(1), Some(0), Some(1)],
            vec![Some(0), Some(0), Some(0), Some(0)],
            vec![Some(0), Some(1), Some(1), Some(1)],
        ]
    );

    let running = [trace!("A", "B").with_complete(false)];
    let res = DeclareAnalyzer::new(DeclareCheckingOptions::default())
        .with_log(&running[..])
        .with_model(&model)
        .run()
        .unwrap();
    assert_eq!(
        res.get_result(0, 0).map(|r| r.state),
        Some(TraceState::PossiblyViolated)
    );
    assert_eq!(
        res.get_result(0, 1).map(|r| r.state),
        Some(TraceState::PossiblySatisfied)
    );
}
