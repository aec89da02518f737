use crate::core::event_data::Event;
use crate::core::process_models::declare::TemplateKind;

use super::{derive_state, CheckerResult, ConstraintPredicates, TraceState};

/// Activation/fulfillment/violation/pending counts of a binary template on one trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    activations: u32,
    fulfillments: u32,
    violations: u32,
    pendings: Option<u32>,
}

impl Counts {
    /// Counts from the number of activations that were `matched` by a target and those left
    /// `open` at the end of the trace
    ///
    /// Matches fulfill positive and violate negative templates. Open activations are pending
    /// in incomplete traces; in complete traces they violate positive and fulfill negative
    /// templates.
    fn settle(activations: u32, matched: u32, open: u32, complete: bool, negative: bool) -> Self {
        let (resolved, pendings) = if complete { (open, 0) } else { (0, open) };
        let (fulfillments, violations) = if negative {
            (resolved, matched)
        } else {
            (matched, resolved)
        };
        Self {
            activations,
            fulfillments,
            violations,
            pendings: Some(pendings),
        }
    }

    /// Counts where every activation is either matched, pending or the opposite of matched
    fn remainder(activations: u32, matched: u32, pendings: Option<u32>, negative: bool) -> Self {
        let rest = activations - matched - pendings.unwrap_or_default();
        let (fulfillments, violations) = if negative {
            (rest, matched)
        } else {
            (matched, rest)
        };
        Self {
            activations,
            fulfillments,
            violations,
            pendings,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            activations: self.activations + other.activations,
            fulfillments: self.fulfillments + other.fulfillments,
            violations: self.violations + other.violations,
            pendings: match (self.pendings, other.pendings) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or_default() + b.unwrap_or_default()),
            },
        }
    }

    fn into_result(self, complete: bool, consider_vacuity: bool, negative: bool) -> CheckerResult {
        CheckerResult {
            num_activations: Some(self.activations),
            num_fulfillments: Some(self.fulfillments),
            num_violations: Some(self.violations),
            num_pendings: self.pendings,
            state: derive_state(
                self.activations,
                self.violations,
                self.pendings.unwrap_or_default(),
                complete,
                consider_vacuity,
                negative,
            ),
        }
    }
}

fn len_u32<T>(v: &[T]) -> u32 {
    u32::try_from(v.len()).unwrap_or(u32::MAX)
}

/// Check a template instantiation on a sequence of events
///
/// `activities` holds one activity (`a`) for unary and two (`a`, `b`) for binary templates;
/// `cardinality` is the `n` of templates supporting it (1 if not given).
pub fn check_template(
    template: TemplateKind,
    activities: &[String],
    cardinality: Option<usize>,
    predicates: &ConstraintPredicates,
    events: &[Event],
    complete: bool,
    consider_vacuity: bool,
) -> CheckerResult {
    let a = activities.first().map(String::as_str).unwrap_or_default();
    let b = activities.get(1).map(String::as_str).unwrap_or_default();
    let n = cardinality.unwrap_or(1);
    let negative = template.is_negative();
    let p = predicates;
    let unary = |kind: UnaryKind| {
        CheckerResult::from_state(unary_state(kind, a, b, n, p, events, complete))
    };
    let counts = match template {
        TemplateKind::Existence => return unary(UnaryKind::Existence),
        TemplateKind::Absence => return unary(UnaryKind::Absence),
        TemplateKind::Exactly => return unary(UnaryKind::Exactly),
        TemplateKind::Init => return unary(UnaryKind::Init),
        TemplateKind::End => return unary(UnaryKind::End),
        TemplateKind::Choice => return unary(UnaryKind::Choice),
        TemplateKind::ExclusiveChoice => return unary(UnaryKind::ExclusiveChoice),
        TemplateKind::RespondedExistence | TemplateKind::NotRespondedExistence => {
            responded_existence(a, b, p, events, complete, negative)
        }
        TemplateKind::Response | TemplateKind::NotResponse => {
            response(a, b, p, events, complete, negative)
        }
        TemplateKind::AlternateResponse => alternate_response(a, b, p, events, complete),
        TemplateKind::ChainResponse | TemplateKind::NotChainResponse => {
            chain_response(a, b, p, events, complete, negative)
        }
        TemplateKind::Precedence | TemplateKind::NotPrecedence => {
            precedence(a, b, p, events, false, negative)
        }
        TemplateKind::AlternatePrecedence => precedence(a, b, p, events, true, false),
        TemplateKind::ChainPrecedence | TemplateKind::NotChainPrecedence => {
            chain_precedence(a, b, p, events, negative)
        }
        TemplateKind::Succession
        | TemplateKind::AlternateSuccession
        | TemplateKind::ChainSuccession
        | TemplateKind::CoExistence
        | TemplateKind::NotCoExistence
        | TemplateKind::NotSuccession
        | TemplateKind::NotChainSuccession => {
            let swapped = [b.to_string(), a.to_string()];
            template
                .components()
                .iter()
                .map(|(component, swap)| {
                    let acts = if *swap { &swapped[..] } else { activities };
                    let r = check_template(
                        *component,
                        acts,
                        None,
                        p,
                        events,
                        complete,
                        consider_vacuity,
                    );
                    Counts {
                        activations: r.num_activations.unwrap_or_default(),
                        fulfillments: r.num_fulfillments.unwrap_or_default(),
                        violations: r.num_violations.unwrap_or_default(),
                        pendings: r.num_pendings,
                    }
                })
                .fold(None, |acc: Option<Counts>, c| {
                    Some(acc.map_or(c, |acc| acc.merge(c)))
                })
                .unwrap_or_default()
        }
    };
    counts.into_result(complete, consider_vacuity, negative)
}

/// Templates whose state is decided without counting activations
#[derive(Debug, Clone, Copy)]
enum UnaryKind {
    Existence,
    Absence,
    Exactly,
    Init,
    End,
    Choice,
    ExclusiveChoice,
}

/// States of the unary and choice templates
fn unary_state(
    kind: UnaryKind,
    a: &str,
    b: &str,
    n: usize,
    p: &ConstraintPredicates,
    events: &[Event],
    complete: bool,
) -> TraceState {
    use TraceState::*;
    let settled = |satisfied: bool| match (satisfied, complete) {
        (true, true) => Satisfied,
        (true, false) => PossiblySatisfied,
        (false, true) => Violated,
        (false, false) => PossiblyViolated,
    };
    let first = events.first();
    // unary time conditions are relative to the first event of the trace
    let occurrences = |act: &str| {
        events
            .iter()
            .filter(|e| {
                e.activity == act && first.is_some_and(|f| p.activates_relative_to(e, f))
            })
            .count()
    };
    match kind {
        UnaryKind::Existence => {
            if occurrences(a) >= n {
                Satisfied
            } else {
                settled(false)
            }
        }
        UnaryKind::Absence => {
            if occurrences(a) < n {
                settled(true)
            } else {
                Violated
            }
        }
        UnaryKind::Exactly => match occurrences(a) {
            count if count < n => settled(false),
            count if count == n => settled(true),
            _ => Violated,
        },
        UnaryKind::Init => match first {
            Some(f) if f.activity == a && p.activates(f) => Satisfied,
            Some(_) => Violated,
            None => settled(false),
        },
        UnaryKind::End => settled(
            events
                .last()
                .is_some_and(|l| l.activity == a && p.activates(l)),
        ),
        UnaryKind::Choice => {
            if occurrences(a) > 0 || occurrences(b) > 0 {
                Satisfied
            } else {
                settled(false)
            }
        }
        UnaryKind::ExclusiveChoice => match (occurrences(a) > 0, occurrences(b) > 0) {
            (true, true) => Violated,
            (false, false) => settled(false),
            _ => settled(true),
        },
    }
}

/// Remove all open activations which `target` discharges, returning their number
///
/// Activations are searched from the most recently opened one.
fn discharge(open: &mut Vec<&Event>, target: &Event, p: &ConstraintPredicates) -> u32 {
    let mut discharged = 0;
    for i in (0..open.len()).rev() {
        if p.correlates(open[i], target) {
            open.remove(i);
            discharged += 1;
        }
    }
    discharged
}

fn responded_existence(
    a: &str,
    b: &str,
    p: &ConstraintPredicates,
    events: &[Event],
    complete: bool,
    negative: bool,
) -> Counts {
    let mut open: Vec<&Event> = events
        .iter()
        .filter(|e| e.activity == a && p.activates(e))
        .collect();
    let activations = len_u32(&open);
    let mut matched = 0;
    for target in events.iter().filter(|e| e.activity == b) {
        if open.is_empty() {
            break;
        }
        matched += discharge(&mut open, target, p);
    }
    Counts::settle(activations, matched, len_u32(&open), complete, negative)
}

fn response(
    a: &str,
    b: &str,
    p: &ConstraintPredicates,
    events: &[Event],
    complete: bool,
    negative: bool,
) -> Counts {
    let mut open: Vec<&Event> = Vec::new();
    let mut activations = 0;
    let mut matched = 0;
    for e in events {
        if e.activity == a && p.activates(e) {
            open.push(e);
            activations += 1;
        } else if e.activity == b && !open.is_empty() {
            matched += discharge(&mut open, e, p);
        }
    }
    Counts::settle(activations, matched, len_u32(&open), complete, negative)
}

fn alternate_response(
    a: &str,
    b: &str,
    p: &ConstraintPredicates,
    events: &[Event],
    complete: bool,
) -> Counts {
    let mut open: Option<&Event> = None;
    let mut activations = 0;
    let mut matched = 0;
    for e in events {
        if e.activity == a && p.activates(e) {
            // supersedes a still open activation
            open = Some(e);
            activations += 1;
        } else if e.activity == b {
            if let Some(act) = open {
                if p.correlates(act, e) {
                    matched += 1;
                    open = None;
                }
            }
        }
    }
    let pendings = u32::from(!complete && open.is_some());
    Counts::remainder(activations, matched, Some(pendings), false)
}

fn chain_response(
    a: &str,
    b: &str,
    p: &ConstraintPredicates,
    events: &[Event],
    complete: bool,
    negative: bool,
) -> Counts {
    let mut activations = 0;
    let mut matched = 0;
    let mut pendings = 0;
    for (i, e) in events.iter().enumerate() {
        if e.activity != a || !p.activates(e) {
            continue;
        }
        activations += 1;
        match events.get(i + 1) {
            Some(next) => {
                if next.activity == b && p.correlates(e, next) {
                    matched += 1;
                }
            }
            None if !complete => pendings = 1,
            None => {}
        }
    }
    Counts::remainder(activations, matched, Some(pendings), negative)
}

/// Precedence (`alternate = false`) and Alternate Precedence (`alternate = true`)
fn precedence(
    a: &str,
    b: &str,
    p: &ConstraintPredicates,
    events: &[Event],
    alternate: bool,
    negative: bool,
) -> Counts {
    let mut earlier: Vec<&Event> = Vec::new();
    let mut activations = 0;
    let mut matched = 0;
    for e in events {
        if e.activity == a {
            earlier.push(e);
        } else if e.activity == b && p.activates(e) {
            activations += 1;
            if earlier.iter().any(|t| p.correlates(e, t)) {
                matched += 1;
            }
            if alternate {
                earlier.clear();
            }
        }
    }
    Counts::remainder(activations, matched, None, negative)
}

fn chain_precedence(
    a: &str,
    b: &str,
    p: &ConstraintPredicates,
    events: &[Event],
    negative: bool,
) -> Counts {
    let mut activations = 0;
    let mut matched = 0;
    for (i, e) in events.iter().enumerate() {
        if e.activity != b || !p.activates(e) {
            continue;
        }
        activations += 1;
        if let Some(prev) = i.checked_sub(1).and_then(|j| events.get(j)) {
            if prev.activity == a && p.correlates(e, prev) {
                matched += 1;
            }
        }
    }
    Counts::remainder(activations, matched, None, negative)
}
