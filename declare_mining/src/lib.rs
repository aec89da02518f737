#![warn(
    clippy::doc_markdown,
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs
)]
#![allow(clippy::needless_doctest_main)]
#![doc = include_str!("../README.md")]

pub mod core;

pub mod conformance;

pub mod discovery;

pub mod utils;

#[cfg(test)]
mod tests;

#[doc(inline)]
pub use crate::core::event_data::{Event, EventLog, EventLogAccess, Trace};

#[doc(inline)]
pub use crate::core::process_models::declare::{
    parse_declare_model, DeclareConstraint, DeclareModel, DeclareParseOptions, TemplateKind,
};

#[doc(inline)]
pub use crate::conformance::declare::{
    ConformanceMetric, DeclareAnalyzer, DeclareCheckingOptions, DeclareConformanceResults,
    TraceState,
};

#[doc(inline)]
pub use crate::discovery::declare::{
    check_declare_query, discover_declare_model, DeclareDiscoveryOptions, DeclareQuery,
    DeclareQueryOptions,
};

///
/// Serialize [`DeclareConformanceResults`] as a JSON [`String`]
///
pub fn conformance_results_to_json(
    results: &DeclareConformanceResults,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(results)
}

///
/// Deserialize [`DeclareConformanceResults`] from a JSON [`String`]
///
pub fn json_to_conformance_results(
    json: &str,
) -> Result<DeclareConformanceResults, serde_json::Error> {
    serde_json::from_str(json)
}
