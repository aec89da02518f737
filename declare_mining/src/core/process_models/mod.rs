//! Process Models
//!
//! Declarative process models: sets of constraints over the activities of a process.
pub mod declare;
