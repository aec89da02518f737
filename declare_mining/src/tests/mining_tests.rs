use crate::conformance::declare::{DeclareAnalyzer, DeclareCheckingOptions};
use crate::core::event_data::EventLog;
use crate::core::process_models::declare::{parse_declare_model, DeclareParseOptions};
use crate::discovery::declare::{
    check_declare_query, discover_declare_model, DeclareDiscoveryOptions, DeclareQuery,
    DeclareQueryOptions,
};
use crate::event_log;

fn log() -> EventLog {
    event_log!(
        ["register", "check", "decide", "notify"],
        ["register", "check", "check", "decide", "notify"],
        ["register", "decide", "check", "notify"],
        ["register", "check", "decide"],
        ["register", "check", "decide", "notify", "archive"],
    )
}

#[test]
fn test_discovered_constraints_meet_min_support() {
    let log = log();
    for consider_vacuity in [false, true] {
        for min_support in [0.6, 0.8, 1.0] {
            let options = DeclareDiscoveryOptions {
                itemsets_support: 0.6,
                min_support,
                max_cardinality: 2,
                consider_vacuity,
                num_threads: Some(2),
            };
            let model = discover_declare_model(&log, &options).unwrap();
            assert!(!model.constraints().is_empty());
            let results = DeclareAnalyzer::new(DeclareCheckingOptions {
                consider_vacuity,
                num_threads: None,
            })
            .with_log(&log)
            .with_model(&model)
            .run()
            .unwrap();
            for c in 0..results.constraint_count() {
                let support = results.support(c).unwrap_or_default();
                assert!(
                    support >= min_support,
                    "{} has support {support} < {min_support}",
                    results.constraint_labels()[c]
                );
            }
        }
    }
}

#[test]
fn test_discovery_is_deterministic() {
    let log = log();
    let options = DeclareDiscoveryOptions {
        itemsets_support: 0.6,
        min_support: 0.8,
        ..Default::default()
    };
    let single = discover_declare_model(
        &log,
        &DeclareDiscoveryOptions {
            num_threads: Some(1),
            ..options.clone()
        },
    )
    .unwrap();
    let multi = discover_declare_model(
        &log,
        &DeclareDiscoveryOptions {
            num_threads: Some(4),
            ..options
        },
    )
    .unwrap();
    assert_eq!(single, multi);

    // discovered models can be written and read back
    let text = multi.to_declare_string();
    let parsed = parse_declare_model(&text, &DeclareParseOptions::strict()).unwrap();
    assert_eq!(parsed, multi);
}

#[test]
fn test_query_results_are_supported() {
    let log = log();
    let query = DeclareQuery {
        activation: Some(String::from("register")),
        ..Default::default()
    };
    let options = DeclareQueryOptions {
        min_support: 0.8,
        max_cardinality: 2,
        ..Default::default()
    };
    let found = check_declare_query(&log, &query, &options).unwrap();
    let labels: Vec<String> = found.iter().map(|f| f.constraint.to_string()).collect();
    assert!(labels.contains(&String::from("Init[register] | |")));
    assert!(labels.contains(&String::from("Response[register, decide] | | |")));
    assert!(found.iter().all(|f| f.activation == "register"));

    let mut model = crate::core::DeclareModel::new();
    for act in crate::core::event_data::EventLogAccess::get_activities(&log) {
        model.add_activity(act);
    }
    for f in &found {
        model.add_constraint(f.constraint.clone()).unwrap();
    }
    let results = DeclareAnalyzer::new(DeclareCheckingOptions::default())
        .with_log(&log)
        .with_model(&model)
        .run()
        .unwrap();
    for c in 0..results.constraint_count() {
        assert!(results.support(c).unwrap_or_default() >= 0.8);
    }
}
