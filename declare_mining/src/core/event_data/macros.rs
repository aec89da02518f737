use chrono::{DateTime, FixedOffset, TimeDelta};

use super::event_log_struct::{Attributes, EditableAttributes, Event};

/// Attribute key from which the [`event`] macro takes an event's timestamp
///
/// [`event`]: crate::event
pub const TIMESTAMP_KEY: &str = "time:timestamp";

/// Event under construction by the [`event`]/[`trace`] macros.
///
/// Remembers whether a timestamp was given explicitly, so that [`trace`] can fill in
/// missing ones.
///
/// [`event`]: crate::event
/// [`trace`]: crate::trace
#[doc(hidden)]
#[derive(Debug)]
pub struct EventParts {
    event: Event,
    has_timestamp: bool,
}

impl EventParts {
    #[doc(hidden)]
    pub fn new(activity: impl Into<String>, mut attributes: Attributes) -> Self {
        let mut event = Event::new(activity);
        let timestamp = attributes
            .remove_with_key(TIMESTAMP_KEY)
            .and_then(|a| a.value.as_date().copied());
        let has_timestamp = timestamp.is_some();
        if let Some(ts) = timestamp {
            event.timestamp = ts;
        }
        event.attributes = attributes;
        Self {
            event,
            has_timestamp,
        }
    }

    /// Finish the event; without an explicit timestamp it is placed one hour after `previous`
    /// (or at the unix epoch if there is no previous event).
    #[doc(hidden)]
    pub fn into_event(self, previous: Option<DateTime<FixedOffset>>) -> Event {
        let mut event = self.event;
        if !self.has_timestamp {
            if let Some(prev) = previous {
                event.timestamp = prev + TimeDelta::hours(1);
            }
        }
        event
    }
}

#[doc(hidden)]
pub fn events_from_parts(parts: Vec<EventParts>) -> Vec<Event> {
    let mut events: Vec<Event> = Vec::with_capacity(parts.len());
    for part in parts {
        let prev = events.last().map(|e| e.timestamp);
        events.push(part.into_event(prev));
    }
    events
}

/// Build an [`Attribute`] from `key => value`
///
/// The value can be anything convertible into an [`AttributeValue`].
///
/// ```rust
/// use declare_mining::{attribute, core::chrono::Utc};
///
/// let resource = attribute!("org:resource" => "Mona");
/// let grade = attribute!("grade" => 7);
/// let due = attribute!("due" => Utc::now());
/// assert_eq!(grade.value.as_number(), Some(7.0));
/// ```
///
/// [`Attribute`]: crate::core::event_data::Attribute
/// [`AttributeValue`]: crate::core::event_data::AttributeValue
#[macro_export]
macro_rules! attribute {
    ($key:expr => $val:expr) => {
        $crate::core::event_data::Attribute::new(
            $key.into(),
            $crate::core::event_data::AttributeValue::from($val),
        )
    };
}

/// Build [`Attributes`] from comma-separated `key => value` pairs
///
/// [`Attributes`]: crate::core::event_data::Attributes
#[macro_export]
macro_rules! attributes {
    ($($key:expr => $value:expr),* $(,)?) => {
        vec![
            $(
                $crate::attribute!($key => $value)
            ),*
        ]
    };
}

/// Build an [`Event`] from an activity and optional `; {key => value, ...}` attributes
///
/// A `"time:timestamp"` attribute is taken as the event's timestamp; without one the event
/// happens at the unix epoch.
///
/// ```rust
/// use declare_mining::{core::chrono::{DateTime, Utc}, event};
///
/// let plain = event!("register");
/// let detailed = event!("check"; {
///     "time:timestamp" => Utc::now(),
///     "org:resource" => "Mona",
///     "amount" => 250
/// });
/// assert_eq!(plain.timestamp, DateTime::UNIX_EPOCH);
/// assert_eq!(detailed.attributes.len(), 2);
/// ```
///
/// [`Event`]: crate::core::event_data::Event
#[macro_export]
macro_rules! event {
    // Internal: remembers whether a timestamp was given, for `trace!`
    (NO_TIMESTAMP; $name:expr $(; { $($key:expr => $value:expr),* $(,)? })?) => {
        $crate::core::event_data::macros::EventParts::new(
            $name,
            vec![
                $(
                    $(
                        $crate::attribute!($key => $value)
                    ),*
                )?
            ],
        )
    };
    ($($input:tt)*) => {
        $crate::event!(NO_TIMESTAMP; $($input)*).into_event(None)
    };
}

/// Build a complete [`Trace`] from comma-separated events in [`event`] syntax
///
/// Events without timestamp happen one hour after their predecessor (the first one at the
/// unix epoch). Case attributes may precede the events as `{key => value, ...};`.
///
/// ```rust
/// use declare_mining::trace;
///
/// let simple = trace!("a", "b", "c");
/// let with_data = trace!(
///     {"case" => "c-17"};
///     "a"; {"grade" => 5},
///     "b",
///     "c"; {"grade" => 8}
/// );
/// assert_eq!(
///     with_data.events[2].timestamp - with_data.events[0].timestamp,
///     declare_mining::core::chrono::TimeDelta::hours(2)
/// );
/// // still running
/// let running = simple.with_complete(false);
/// assert!(!running.complete);
/// ```
///
/// [`Trace`]: crate::core::event_data::Trace
/// [`event`]: crate::event
#[macro_export]
macro_rules! trace {
    (
        { $($key:expr => $value:expr),* $(,)? };
        $(
            $activity:expr $(; { $($keys:expr => $values:expr),* $(,)?})?
        ),* $(,)?
    ) => {
        $crate::core::event_data::Trace {
            attributes: $crate::attributes!($($key => $value),*),
            events: $crate::core::event_data::macros::events_from_parts(vec![
                $(
                    $crate::event!(NO_TIMESTAMP; $activity; {
                        $(
                            $(
                                $keys => $values
                            ),*
                        )?
                    })
                ),*
            ]),
            complete: true,
        }
    };
    ($($content:tt)*) => {
        $crate::trace!({}; $($content)*)
    }
}

/// Build an [`EventLog`] from traces written as `[event, ...]` (events in [`event`] syntax)
///
/// Case attributes may follow a trace's brackets as `{key => value, ...}`. Traces without a
/// `"case:id"` attribute get their index as id.
///
/// ```rust
/// use declare_mining::event_log;
///
/// let log = event_log!(
///     ["register", "check", "decide"],
///     ["register", "check"; {"amount" => 80}, "decide"] {"case:id" => "c-2"},
/// );
/// assert_eq!(log.traces.len(), 2);
/// ```
///
/// [`EventLog`]: crate::core::event_data::EventLog
/// [`event`]: crate::event
#[macro_export]
macro_rules! event_log {
    (
        $({ $($key:expr => $value:expr),* $(,)? }$(;)?)?
        $(
            [$($events:tt)*] $({ $($keys:expr => $vals:expr),* $(,)? })?
        ),* $(,)?
     ) => {{
        use $crate::core::event_data::EditableAttributes;
        let mut log = $crate::core::event_data::EventLog {
            attributes: $crate::attributes!(
                $(
                    $($key => $value),*
                )?
            ),
            traces: vec![
                $(
                    $crate::trace!(
                        { $($($keys => $vals),*)? };
                        $($events)*
                    )
                ),*
            ],
        };

        for (idx, trace) in log.traces.iter_mut().enumerate() {
            if trace.attributes.get_by_key("case:id").is_none() {
                trace.attributes.add_attribute($crate::attribute!("case:id" => idx as i64))
            }
        }

        log
    }}
}
