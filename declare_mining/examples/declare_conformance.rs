use std::{env::args, fs, time::Instant};

use declare_mining::{
    conformance::declare::{ConformanceMetric, DeclareAnalyzer, DeclareCheckingOptions},
    discovery::declare::{discover_declare_model, DeclareDiscoveryOptions},
    event_log, parse_declare_model, DeclareParseOptions,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_MODEL: &str = "activity register
activity check
activity decide
activity notify
bind check: amount
amount: integer between 0 and 1000
Init[register] | |
Response[check, decide] |A.amount > 100 | |
Precedence[decide, notify] | | |
Chain Response[decide, notify] | | |0,2,h";

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let model_text = match args().nth(1) {
        Some(path) => match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Could not read {path}: {e}");
                return;
            }
        },
        None => DEFAULT_MODEL.to_string(),
    };
    let model = match parse_declare_model(&model_text, &DeclareParseOptions::default()) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Invalid model: {e}");
            return;
        }
    };

    let log = event_log!(
        ["register", "check"; {"amount" => 250}, "decide", "notify"],
        ["register", "check"; {"amount" => 80}, "decide", "notify"],
        ["register", "check"; {"amount" => 400}, "notify", "decide"],
        ["check"; {"amount" => 120}, "register", "decide", "notify"],
    );

    let now = Instant::now();
    let results = match DeclareAnalyzer::new(DeclareCheckingOptions::default())
        .with_log(&log)
        .with_model(&model)
        .run()
    {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Checking failed: {e}");
            return;
        }
    };
    println!("Checked {} traces in {:?}", results.trace_count(), now.elapsed());
    for (i, label) in results.constraint_labels().iter().enumerate() {
        let states = results
            .get_constraint_metrics(ConformanceMetric::State, i)
            .unwrap_or_default();
        match results.support(i) {
            Some(support) => println!("{label:<45} support {support:.2} states {states:?}"),
            None => println!("{label:<45} skipped"),
        }
    }

    let options = DeclareDiscoveryOptions {
        min_support: 0.75,
        ..Default::default()
    };
    match discover_declare_model(&log, &options) {
        Ok(discovered) => {
            println!(
                "Discovered {} Declare constraints",
                discovered.constraints().len()
            );
            println!("{discovered}");
        }
        Err(e) => eprintln!("Discovery failed: {e}"),
    }
}
