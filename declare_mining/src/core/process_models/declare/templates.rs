use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declare constraint template
///
/// Unary templates constrain a single activity, binary templates relate an _activation_
/// activity to a _target_ activity. Derived templates (e.g. [`TemplateKind::Succession`])
/// are conjunctions of other templates, see [`TemplateKind::components`].
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord, JsonSchema,
)]
pub enum TemplateKind {
    /// Activity occurs at least `n` times
    Existence,
    /// Activity occurs fewer than `n` times
    Absence,
    /// Activity occurs exactly `n` times
    Exactly,
    /// Trace starts with the activity
    Init,
    /// Trace ends with the activity
    End,
    /// At least one of the two activities occurs
    Choice,
    /// Exactly one of the two activities occurs
    ExclusiveChoice,
    /// If `a` occurs, `b` occurs as well (before or after)
    RespondedExistence,
    /// Each `a` is eventually followed by `b`
    Response,
    /// Each `a` is followed by `b` before the next `a`
    AlternateResponse,
    /// Each `a` is directly followed by `b`
    ChainResponse,
    /// Each `b` is preceded by some `a`
    Precedence,
    /// Each `b` is preceded by `a`, with no other `b` in between
    AlternatePrecedence,
    /// Each `b` is directly preceded by `a`
    ChainPrecedence,
    /// Response and Precedence
    Succession,
    /// Alternate Response and Alternate Precedence
    AlternateSuccession,
    /// Chain Response and Chain Precedence
    ChainSuccession,
    /// Responded Existence in both directions
    CoExistence,
    /// If `a` occurs, `b` does not occur
    NotRespondedExistence,
    /// No `a` is eventually followed by `b`
    NotResponse,
    /// No `a` is directly followed by `b`
    NotChainResponse,
    /// No `b` is preceded by `a`
    NotPrecedence,
    /// No `b` is directly preceded by `a`
    NotChainPrecedence,
    /// Not Responded Existence in both directions
    NotCoExistence,
    /// Not Response and Not Precedence
    NotSuccession,
    /// Not Chain Response and Not Chain Precedence
    NotChainSuccession,
}

/// All Declare templates
pub const ALL_TEMPLATE_KINDS: &[TemplateKind] = &[
    TemplateKind::Existence,
    TemplateKind::Absence,
    TemplateKind::Exactly,
    TemplateKind::Init,
    TemplateKind::End,
    TemplateKind::Choice,
    TemplateKind::ExclusiveChoice,
    TemplateKind::RespondedExistence,
    TemplateKind::Response,
    TemplateKind::AlternateResponse,
    TemplateKind::ChainResponse,
    TemplateKind::Precedence,
    TemplateKind::AlternatePrecedence,
    TemplateKind::ChainPrecedence,
    TemplateKind::Succession,
    TemplateKind::AlternateSuccession,
    TemplateKind::ChainSuccession,
    TemplateKind::CoExistence,
    TemplateKind::NotRespondedExistence,
    TemplateKind::NotResponse,
    TemplateKind::NotChainResponse,
    TemplateKind::NotPrecedence,
    TemplateKind::NotChainPrecedence,
    TemplateKind::NotCoExistence,
    TemplateKind::NotSuccession,
    TemplateKind::NotChainSuccession,
];

impl TemplateKind {
    /// Parse a template name
    ///
    /// Matching ignores case, spaces, dashes and underscores, so `"Responded Existence"`,
    /// `"responded-existence"` and `"RespondedExistence"` all resolve to
    /// [`TemplateKind::RespondedExistence`].
    ///
    /// Returns `None` if the name is not a known template
    pub fn parse_str(s: impl AsRef<str>) -> Option<Self> {
        let normalized: String = s
            .as_ref()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        ALL_TEMPLATE_KINDS.iter().copied().find(|kind| {
            kind.get_name()
                .chars()
                .filter(|c| !matches!(c, ' ' | '-'))
                .flat_map(char::to_lowercase)
                .eq(normalized.chars())
        })
    }

    /// Get name of this template as used in Declare model files (e.g., `"Responded Existence"`)
    pub fn get_name(&self) -> &'static str {
        match self {
            TemplateKind::Existence => "Existence",
            TemplateKind::Absence => "Absence",
            TemplateKind::Exactly => "Exactly",
            TemplateKind::Init => "Init",
            TemplateKind::End => "End",
            TemplateKind::Choice => "Choice",
            TemplateKind::ExclusiveChoice => "Exclusive Choice",
            TemplateKind::RespondedExistence => "Responded Existence",
            TemplateKind::Response => "Response",
            TemplateKind::AlternateResponse => "Alternate Response",
            TemplateKind::ChainResponse => "Chain Response",
            TemplateKind::Precedence => "Precedence",
            TemplateKind::AlternatePrecedence => "Alternate Precedence",
            TemplateKind::ChainPrecedence => "Chain Precedence",
            TemplateKind::Succession => "Succession",
            TemplateKind::AlternateSuccession => "Alternate Succession",
            TemplateKind::ChainSuccession => "Chain Succession",
            TemplateKind::CoExistence => "Co-Existence",
            TemplateKind::NotRespondedExistence => "Not Responded Existence",
            TemplateKind::NotResponse => "Not Response",
            TemplateKind::NotChainResponse => "Not Chain Response",
            TemplateKind::NotPrecedence => "Not Precedence",
            TemplateKind::NotChainPrecedence => "Not Chain Precedence",
            TemplateKind::NotCoExistence => "Not Co-Existence",
            TemplateKind::NotSuccession => "Not Succession",
            TemplateKind::NotChainSuccession => "Not Chain Succession",
        }
    }

    /// Whether the template relates two activities
    pub fn is_binary(&self) -> bool {
        !matches!(
            self,
            TemplateKind::Existence
                | TemplateKind::Absence
                | TemplateKind::Exactly
                | TemplateKind::Init
                | TemplateKind::End
        )
    }

    /// Number of activities a constraint of this template references
    pub fn arity(&self) -> usize {
        if self.is_binary() {
            2
        } else {
            1
        }
    }

    /// Whether the template is parametrized by a cardinality `n` (e.g., `Existence2`)
    pub fn supports_cardinality(&self) -> bool {
        matches!(
            self,
            TemplateKind::Existence | TemplateKind::Absence | TemplateKind::Exactly
        )
    }

    /// Whether the template forbids behavior (the `Not ...` family)
    ///
    /// For these, a successful correlation between activation and target counts as a violation.
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            TemplateKind::NotRespondedExistence
                | TemplateKind::NotResponse
                | TemplateKind::NotChainResponse
                | TemplateKind::NotPrecedence
                | TemplateKind::NotChainPrecedence
                | TemplateKind::NotCoExistence
                | TemplateKind::NotSuccession
                | TemplateKind::NotChainSuccession
        )
    }

    /// Whether the _second_ activity of a constraint activates it (the precedence family)
    pub fn is_reversed(&self) -> bool {
        matches!(
            self,
            TemplateKind::Precedence
                | TemplateKind::AlternatePrecedence
                | TemplateKind::ChainPrecedence
                | TemplateKind::NotPrecedence
                | TemplateKind::NotChainPrecedence
        )
    }

    /// Whether the template is a conjunction of other templates
    pub fn is_derived(&self) -> bool {
        !self.components().is_empty()
    }

    /// Component templates of derived templates
    ///
    /// Each entry is a template together with whether the activities are swapped for it.
    /// Empty for all non-derived templates.
    pub fn components(&self) -> &'static [(TemplateKind, bool)] {
        match self {
            TemplateKind::Succession => &[
                (TemplateKind::Response, false),
                (TemplateKind::Precedence, false),
            ],
            TemplateKind::AlternateSuccession => &[
                (TemplateKind::AlternateResponse, false),
                (TemplateKind::AlternatePrecedence, false),
            ],
            TemplateKind::ChainSuccession => &[
                (TemplateKind::ChainResponse, false),
                (TemplateKind::ChainPrecedence, false),
            ],
            TemplateKind::CoExistence => &[
                (TemplateKind::RespondedExistence, false),
                (TemplateKind::RespondedExistence, true),
            ],
            TemplateKind::NotCoExistence => &[
                (TemplateKind::NotRespondedExistence, false),
                (TemplateKind::NotRespondedExistence, true),
            ],
            TemplateKind::NotSuccession => &[
                (TemplateKind::NotResponse, false),
                (TemplateKind::NotPrecedence, false),
            ],
            TemplateKind::NotChainSuccession => &[
                (TemplateKind::NotChainResponse, false),
                (TemplateKind::NotChainPrecedence, false),
            ],
            _ => &[],
        }
    }

    /// Unary templates
    pub fn unary() -> impl Iterator<Item = TemplateKind> {
        ALL_TEMPLATE_KINDS.iter().copied().filter(|t| !t.is_binary())
    }

    /// Binary templates which are not derived from other templates
    pub fn binary_non_derived() -> impl Iterator<Item = TemplateKind> {
        ALL_TEMPLATE_KINDS
            .iter()
            .copied()
            .filter(|t| t.is_binary() && !t.is_derived())
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.get_name())
    }
}
