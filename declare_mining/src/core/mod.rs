//! Core modules: event data and process models

pub use chrono;
pub mod event_data;

pub mod process_models;

pub use event_data::EventLog;
pub use process_models::declare::DeclareModel;
