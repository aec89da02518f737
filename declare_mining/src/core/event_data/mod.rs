//! Event Data
//!
//! Traces of timestamped events with data attributes, and the [`EventLogAccess`] trait
//! through which checking and discovery read them.
#[doc(hidden)]
pub(crate) mod event_log_struct;
/// Macros for the creation of [`Event`]s, [`Trace`]s and [`EventLog`]s
pub mod macros;

#[doc(inline)]
pub use event_log_struct::*;
