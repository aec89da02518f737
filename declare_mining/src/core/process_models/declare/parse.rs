use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{
    AttributeDomain, DeclareConstraint, DeclareModel, DeclareModelError, ReferenceKind,
    TemplateKind,
};

/// How forgiving the parser is towards questionable (but interpretable) input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ParseMode {
    /// Reject unknown templates, duplicate declarations and misplaced cardinalities
    Strict,
    /// Skip unknown templates, merge duplicate declarations and ignore misplaced
    /// cardinalities (logging a warning for each)
    #[default]
    Lenient,
}

/// Options for parsing Declare models
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeclareParseOptions {
    /// Parse mode (default: [`ParseMode::Lenient`])
    #[serde(default)]
    pub mode: ParseMode,
}

impl DeclareParseOptions {
    /// Options for strict parsing
    pub fn strict() -> Self {
        Self {
            mode: ParseMode::Strict,
        }
    }
}

/// Parse a Declare model from its textual representation
///
/// Every non-empty line that is not a `#` comment is one of (checked in this order):
///
/// 1. `activity <name>`
/// 2. `bind <activity>: <attr>, <attr>, ...`
/// 3. `<attr>, <attr>, ...: <domain>`, where `<domain>` is an integer or float literal,
///    `integer between <min> and <max>`, `float between <min> and <max>`, or a
///    comma-separated list of values
/// 4. `<Template><n>[<a>, <b>] |<activation> |<correlation> |<time>` (unary templates only
///    have the activation and time segments; missing trailing segments are empty)
///
/// Activities and attributes must be declared before they are used.
///
/// ```rust
/// use declare_mining::core::process_models::declare::{parse_declare_model, DeclareParseOptions};
///
/// let model = parse_declare_model(
///     "activity A\nactivity B\nExistence2[A] | |\nResponse[A, B] | | |",
///     &DeclareParseOptions::default(),
/// ).unwrap();
/// assert_eq!(model.constraints().len(), 2);
/// ```
pub fn parse_declare_model(
    text: &str,
    options: &DeclareParseOptions,
) -> Result<DeclareModel, DeclareModelError> {
    let mut parser = ModelParser {
        mode: options.mode,
        model: DeclareModel::new(),
        line: 0,
    };
    for (i, raw_line) in text.lines().enumerate() {
        parser.line = i + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        parser
            .parse_line(line)
            .map_err(|e| e.at_line(parser.line))?;
    }
    Ok(parser.model)
}

struct ModelParser {
    mode: ParseMode,
    model: DeclareModel,
    line: usize,
}

fn parse_error<T: Into<String>>(message: T) -> DeclareModelError {
    DeclareModelError::Parse {
        line: None,
        message: message.into(),
    }
}

impl ModelParser {
    /// Reject in strict mode, warn and carry on in lenient mode
    fn tolerate(&self, message: String) -> Result<(), DeclareModelError> {
        match self.mode {
            ParseMode::Strict => Err(parse_error(message)),
            ParseMode::Lenient => {
                warn!(line = self.line, "{message}");
                Ok(())
            }
        }
    }

    fn parse_line(&mut self, line: &str) -> Result<(), DeclareModelError> {
        if let Some(name) = line.strip_prefix("activity ") {
            return self.parse_activity(name.trim());
        }
        if let Some(binding) = line.strip_prefix("bind ") {
            return self.parse_binding(binding);
        }
        if !line.contains(['[', ']', '|']) {
            if let Some((attrs, domain)) = line.split_once(": ") {
                return self.parse_domain(attrs, domain);
            }
        }
        if line.contains('[') {
            return self.parse_constraint(line);
        }
        Err(parse_error(format!("unrecognized line `{line}`")))
    }

    fn parse_activity(&mut self, name: &str) -> Result<(), DeclareModelError> {
        if name.is_empty() {
            return Err(parse_error("missing activity name"));
        }
        if !self.model.add_activity(name) {
            self.tolerate(format!("activity `{name}` is declared twice"))?;
        }
        Ok(())
    }

    fn parse_binding(&mut self, binding: &str) -> Result<(), DeclareModelError> {
        let (activity, attrs) = binding
            .split_once(": ")
            .ok_or_else(|| parse_error("expected `bind <activity>: <attributes>`"))?;
        let activity = activity.trim();
        for attr in attrs.split(',').map(str::trim) {
            if attr.is_empty() {
                return Err(parse_error("empty attribute name"));
            }
            if !self.model.bind_attribute(activity, attr)? {
                self.tolerate(format!(
                    "attribute `{attr}` is bound to `{activity}` twice"
                ))?;
            }
        }
        Ok(())
    }

    fn parse_domain(&mut self, attrs: &str, domain: &str) -> Result<(), DeclareModelError> {
        let domain = AttributeDomain::parse_str(domain).map_err(parse_error)?;
        for attr in attrs.split(',').map(str::trim) {
            if !self.model.is_attribute_bound(attr) {
                return Err(DeclareModelError::Reference {
                    kind: ReferenceKind::Attribute,
                    name: attr.to_string(),
                    line: None,
                });
            }
            if self
                .model
                .set_attribute_domain(attr, domain.clone())?
                .is_some()
            {
                self.tolerate(format!("domain of attribute `{attr}` is redefined"))?;
            }
        }
        Ok(())
    }

    fn parse_constraint(&mut self, line: &str) -> Result<(), DeclareModelError> {
        let (head, rest) = line
            .split_once('[')
            .ok_or_else(|| parse_error("missing `[`"))?;
        let (activities, tail) = rest
            .split_once(']')
            .ok_or_else(|| parse_error("missing `]` after activities"))?;

        let head = head.trim();
        let name = head.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &head[name.len()..];
        let Some(template) = TemplateKind::parse_str(name.trim()) else {
            return self.tolerate(format!("unknown template `{}`, skipping constraint", name.trim()));
        };
        let cardinality = if digits.is_empty() {
            None
        } else {
            Some(
                digits
                    .parse::<usize>()
                    .map_err(|_| parse_error(format!("invalid cardinality `{digits}`")))?,
            )
        };
        let cardinality = match (template.supports_cardinality(), cardinality) {
            (true, n) => Some(n.unwrap_or(1)),
            (false, Some(n)) => {
                self.tolerate(format!("{template} does not take a cardinality (got {n})"))?;
                None
            }
            (false, None) => None,
        };

        let activities: Vec<String> = activities
            .split(',')
            .map(|a| a.trim().to_string())
            .collect();

        let tail = tail.trim();
        let segments: Vec<&str> = if tail.is_empty() {
            Vec::new()
        } else {
            tail.strip_prefix('|')
                .ok_or_else(|| parse_error(format!("unexpected `{tail}` after activities")))?
                .split('|')
                .map(str::trim)
                .collect()
        };
        let max_segments = if template.is_binary() { 3 } else { 2 };
        if segments.len() > max_segments {
            return Err(parse_error(format!(
                "{template} takes at most {max_segments} conditions but got {}",
                segments.len()
            )));
        }
        let segment = |i: usize| segments.get(i).copied().unwrap_or_default().to_string();
        let (activation, correlation, time) = if template.is_binary() {
            (segment(0), segment(1), segment(2))
        } else {
            (segment(0), String::new(), segment(1))
        };

        self.model.add_constraint(DeclareConstraint {
            template,
            activities,
            cardinality,
            activation_condition: activation,
            correlation_condition: correlation,
            time_condition: time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "# loan application
activity Apply
activity Assess
activity Decide
bind Apply: amount, channel
bind Decide: outcome
amount: integer between 100 and 50000
channel: web, branch
outcome: approved, rejected

Existence1[Apply] |A.amount > 1000 |
Absence2[Decide] | |
Init[Apply] | |
Response[Apply, Assess] |A.channel is web | |0,3,d
Chain Precedence[Assess, Decide] | | |
";

    #[test]
    fn parse_full_model() {
        let model = parse_declare_model(MODEL, &DeclareParseOptions::strict()).unwrap();
        assert_eq!(model.activities().len(), 3);
        assert_eq!(
            model.get_activity("Apply").unwrap().attributes,
            vec!["amount", "channel"]
        );
        assert_eq!(
            model.attribute_domains().get("amount"),
            Some(&AttributeDomain::IntegerRange {
                min: 100,
                max: 50000
            })
        );
        let cs = model.constraints();
        assert_eq!(cs.len(), 5);
        assert_eq!(cs[0].template, TemplateKind::Existence);
        assert_eq!(cs[0].cardinality, Some(1));
        assert_eq!(cs[0].activation_condition, "A.amount > 1000");
        assert_eq!(cs[1].cardinality, Some(2));
        assert_eq!(cs[2].cardinality, None);
        assert_eq!(cs[3].activities, vec!["Apply", "Assess"]);
        assert_eq!(cs[3].activation_condition, "A.channel is web");
        assert_eq!(cs[3].correlation_condition, "");
        assert_eq!(cs[3].time_condition, "0,3,d");
        assert_eq!(cs[4].template, TemplateKind::ChainPrecedence);
    }

    #[test]
    fn missing_condition_segments_are_empty() {
        let model: DeclareModel = "activity A\nactivity B\nResponse[A, B]\nExistence[A] |"
            .parse()
            .unwrap();
        assert_eq!(model.constraints()[0].time_condition, "");
        assert_eq!(model.constraints()[1].cardinality, Some(1));
    }

    #[test]
    fn serialization_round_trips() {
        let model = parse_declare_model(MODEL, &DeclareParseOptions::strict()).unwrap();
        let text = model.to_declare_string();
        let reparsed = parse_declare_model(&text, &DeclareParseOptions::strict()).unwrap();
        assert_eq!(model, reparsed);
    }

    #[test]
    fn undeclared_references_are_rejected() {
        let err = parse_declare_model("activity A\nResponse[A, B] | | |", &Default::default())
            .unwrap_err();
        assert_eq!(
            err,
            DeclareModelError::Reference {
                kind: ReferenceKind::Activity,
                name: "B".into(),
                line: Some(2)
            }
        );
        let err = parse_declare_model("activity A\nbind B: x", &Default::default()).unwrap_err();
        assert!(matches!(err, DeclareModelError::Reference { line: Some(2), .. }));
        let err =
            parse_declare_model("activity A\nx: integer between 1 and 2", &Default::default())
                .unwrap_err();
        assert!(matches!(
            err,
            DeclareModelError::Reference {
                kind: ReferenceKind::Attribute,
                ..
            }
        ));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        for text in [
            "activity A\nthis is not a line",
            "activity A\nExistence[A | |",
            "activity A\nactivity B\nResponse[A] | | |",
            "activity A\nResponse[A, A] | | |",
            "activity A\nactivity B\nResponse[A, B] | | | |",
            "activity A\nExistence[A] garbage",
            "activity A\nbind A x",
        ] {
            let err = parse_declare_model(text, &Default::default()).unwrap_err();
            assert!(matches!(err, DeclareModelError::Parse { line: Some(2 | 3), .. }), "{text}");
        }
    }

    #[test]
    fn lenient_and_strict_modes() {
        let text = "activity A
activity A
activity B
bind A: x
bind A: x
x: 1
x: 2
Eventually[A, B] | | |
Response3[A, B] | | |";
        let model = parse_declare_model(text, &DeclareParseOptions::default()).unwrap();
        assert_eq!(model.activities().len(), 2);
        assert_eq!(model.get_activity("A").unwrap().attributes, vec!["x"]);
        assert_eq!(
            model.attribute_domains().get("x"),
            Some(&AttributeDomain::Integer { value: 2 })
        );
        assert_eq!(model.constraints().len(), 1);
        assert_eq!(model.constraints()[0].cardinality, None);

        for (text, failing_line) in [
            ("activity A\nactivity A", 2),
            ("activity A\nbind A: x\nbind A: x", 3),
            ("activity A\nbind A: x\nx: 1\nx: 2", 4),
            ("activity A\nactivity B\nEventually[A, B] | | |", 3),
            ("activity A\nactivity B\nResponse3[A, B] | | |", 3),
        ] {
            let err = parse_declare_model(text, &DeclareParseOptions::strict()).unwrap_err();
            assert!(
                matches!(err, DeclareModelError::Parse { line: Some(l), .. } if l == failing_line),
                "{text}: {err}"
            );
        }
    }
}
