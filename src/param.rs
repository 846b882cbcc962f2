//! # Parameter Model
//!
//! A configuration string names a component and optionally carries parameters:
//!
//! ```text
//! pseudo_huber : delta = 2.0 ; scale = 3
//! ^^^^^^^^^^^^   ^^^^^^^^^^^   ^^^^^^^^^
//! name           assignment    assignment
//! ```
//!
//! This module owns the identifier grammar, the declarations a registration makes
//! about its parameters ([`ParamSpec`]), and the parsing of the text after the
//! name into validated [`ParamAssignment`]s and finally [`ParamValues`].
//!
//! ## Name Boundary
//!
//! [`match_registration_name`] requires the name to be followed by end of input or
//! by `:`. Text such as `rmse_log` therefore does not name `rmse`; the candidate is
//! skipped rather than reporting `_log` as a broken parameter list.
//!
//! ## Failure Mapping
//!
//! | Problem | Kind |
//! |---|---|
//! | key empty or outside `[A-Za-z_][A-Za-z0-9_]*` | `IllegalParamName` |
//! | key not declared | `ParameterUnknown` |
//! | key given twice | `DuplicateParamName` |
//! | no `=`, or value not parseable as the declared kind | `ParameterValueMalformed` |
//! | declared without default and absent | `ParameterUnknown` (missing) |

use nom::{
    bytes::complete::{take_while, take_while1},
    combinator::{all_consuming, recognize},
    sequence::pair,
};

use crate::{
    protocol::{FailureKind, RegistrationFailure},
    scanner::{
        is_whitespace, match_case_insensitive, match_exact, parse_float, skip_whitespace,
        take_until, Cursor, ParserResult,
    },
};

pub const TYPE_TERMINATOR: u8 = b':';
pub const PARAM_SEPARATOR: u8 = b';';
pub const VALUE_SEPARATOR: u8 = b'=';

fn identifier(input: &str) -> ParserResult<&str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// Whether `text` is a well-formed registration or parameter name.
pub fn is_identifier(text: &str) -> bool {
    all_consuming(identifier)(text).is_ok()
}

/// Matches the registration name at the start of the configuration string.
///
/// Returns the cursor positioned at the parameter list (possibly at end of input)
/// or `None` when the text does not name this registration.
pub fn match_registration_name<'a>(cursor: Cursor<'a>, name: &str) -> Option<Cursor<'a>> {
    let after = match_case_insensitive(skip_whitespace(cursor), name)?;
    if after.is_at_end() {
        return Some(after);
    }
    match after.peek() {
        Some(TYPE_TERMINATOR) => Some(skip_whitespace(after.advanced_by(1))),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ParamKind {
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f64),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Float(_) => ParamKind::Float,
        }
    }

    /// Parses `raw` in full as a value of `kind`.
    pub fn parse(kind: ParamKind, raw: &str) -> Option<Self> {
        let cursor = Cursor::new(raw);
        match kind {
            ParamKind::Float => match parse_float(cursor) {
                Some((value, after)) if after.is_at_end() => Some(ParamValue::Float(value)),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Float(value) => write!(f, "{}", value),
        }
    }
}

/// A parameter a registration accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    name: String,
    kind: ParamKind,
    default: Option<ParamValue>,
}

impl ParamSpec {
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Float,
            default: Some(ParamValue::Float(default)),
        }
    }

    pub fn required_float(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Float,
            default: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn default(&self) -> Option<ParamValue> {
        self.default
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// One `name=value` pair taken from the configuration string.
///
/// `name` is the declared spelling from the matching [`ParamSpec`], not the
/// spelling the user typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamAssignment<'s> {
    pub name: &'s str,
    pub value: ParamValue,
}

/// Validates the declarations of a registration: every name must be an
/// identifier and no two may collide case-insensitively.
pub fn check_param_specs(specs: &[ParamSpec]) -> Result<(), RegistrationFailure> {
    for (index, spec) in specs.iter().enumerate() {
        if !is_identifier(spec.name()) {
            return Err(RegistrationFailure::new(FailureKind::IllegalParamName)
                .with_param(spec.name())
                .with_detail("declared parameter name is not an identifier"));
        }
        if specs[..index]
            .iter()
            .any(|earlier| earlier.name().eq_ignore_ascii_case(spec.name()))
        {
            return Err(RegistrationFailure::new(FailureKind::DuplicateParamName)
                .with_param(spec.name())
                .with_detail("parameter declared twice"));
        }
    }
    Ok(())
}

/// Parses the parameter list that follows a matched registration name.
#[tracing::instrument(level = "debug", skip(cursor, specs), fields(rest = cursor.rest()))]
pub fn parse_assignments<'s>(
    cursor: Cursor<'_>,
    specs: &'s [ParamSpec],
) -> Result<Vec<ParamAssignment<'s>>, RegistrationFailure> {
    let mut assignments: Vec<ParamAssignment<'s>> = Vec::new();
    let mut cursor = skip_whitespace(cursor);

    while !cursor.is_at_end() {
        let (raw_key, after_key) = take_until(cursor, &[VALUE_SEPARATOR, PARAM_SEPARATOR]);
        let key = raw_key.trim_matches(is_whitespace);
        if !is_identifier(key) {
            return Err(RegistrationFailure::new(FailureKind::IllegalParamName).with_param(key));
        }

        let spec = specs
            .iter()
            .find(|spec| match_exact(Cursor::new(key), spec.name()))
            .ok_or_else(|| {
                RegistrationFailure::new(FailureKind::ParameterUnknown).with_param(key)
            })?;

        if assignments.iter().any(|a| a.name == spec.name()) {
            return Err(
                RegistrationFailure::new(FailureKind::DuplicateParamName).with_param(spec.name())
            );
        }

        if after_key.peek() != Some(VALUE_SEPARATOR) {
            return Err(RegistrationFailure::new(FailureKind::ParameterValueMalformed)
                .with_param(spec.name())
                .with_detail("expected '=' after parameter name"));
        }

        let (raw_value, after_value) = take_until(after_key.advanced_by(1), &[PARAM_SEPARATOR]);
        let value = ParamValue::parse(spec.kind(), raw_value).ok_or_else(|| {
            RegistrationFailure::new(FailureKind::ParameterValueMalformed)
                .with_param(spec.name())
                .with_value(raw_value.trim_matches(is_whitespace))
                .with_detail(format!("expected a {} value", spec.kind()))
        })?;
        tracing::trace!(param = spec.name(), %value, "parsed parameter");
        assignments.push(ParamAssignment {
            name: spec.name(),
            value,
        });

        cursor = match after_value.peek() {
            Some(PARAM_SEPARATOR) => skip_whitespace(after_value.advanced_by(1)),
            _ => after_value,
        };
    }

    Ok(assignments)
}

/// Every declared parameter with its effective value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamValues {
    values: Vec<(String, ParamValue)>,
}

impl ParamValues {
    /// Combines the parsed assignments with the declared defaults.
    pub fn resolve(
        specs: &[ParamSpec],
        assignments: &[ParamAssignment<'_>],
    ) -> Result<Self, RegistrationFailure> {
        let mut values = Vec::with_capacity(specs.len());
        for spec in specs {
            let given = assignments
                .iter()
                .find(|a| a.name == spec.name())
                .map(|a| a.value);
            let value = given.or(spec.default()).ok_or_else(|| {
                RegistrationFailure::new(FailureKind::ParameterUnknown)
                    .with_param(spec.name())
                    .with_detail("missing required parameter")
            })?;
            values.push((spec.name().to_string(), value));
        }
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values
            .iter()
            .find(|(declared, _)| declared.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }

    /// The value of a declared float parameter. Asking for anything else means
    /// the registration's build step disagrees with its own declarations.
    pub fn float(&self, name: &str) -> Result<f64, RegistrationFailure> {
        match self.get(name) {
            Some(ParamValue::Float(value)) => Ok(value),
            _ => Err(undeclared(name, ParamKind::Float)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn undeclared(name: &str, kind: ParamKind) -> RegistrationFailure {
    RegistrationFailure::new(FailureKind::ConstructorFailure)
        .with_param(name)
        .with_detail(format!("no {} parameter declared under this name", kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::float("delta", 1.0),
            ParamSpec::required_float("scale"),
        ]
    }

    fn parse<'s>(
        text: &str,
        specs: &'s [ParamSpec],
    ) -> Result<Vec<ParamAssignment<'s>>, RegistrationFailure> {
        parse_assignments(Cursor::new(text), specs)
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("rmse"));
        assert!(is_identifier("_private9"));
        assert!(is_identifier("Log_Loss"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("th-reshold"));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier("café"));
    }

    #[test]
    fn test_match_registration_name_boundary() {
        let after = match_registration_name(Cursor::new("  RMSE  "), "rmse").unwrap();
        assert!(after.is_at_end());

        let after = match_registration_name(Cursor::new("rmse : delta=1"), "rmse").unwrap();
        assert_eq!(after.rest(), "delta=1");

        assert!(match_registration_name(Cursor::new("rmse_log"), "rmse").is_none());
        assert!(match_registration_name(Cursor::new("rmseX"), "rmse").is_none());
        assert!(match_registration_name(Cursor::new("rmse delta"), "rmse").is_none());
        assert!(match_registration_name(Cursor::new("log_loss"), "rmse").is_none());
    }

    #[test]
    fn test_parse_assignments() {
        let specs = specs();
        let assignments = parse(" Delta = 2.5 ; SCALE=3 ", &specs).unwrap();
        assert_eq!(
            assignments,
            vec![
                ParamAssignment {
                    name: "delta",
                    value: ParamValue::Float(2.5)
                },
                ParamAssignment {
                    name: "scale",
                    value: ParamValue::Float(3.0)
                },
            ]
        );

        assert!(parse("", &specs).unwrap().is_empty());
        assert_eq!(parse("delta=3;", &specs).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_assignments_failures() {
        let specs = specs();

        let failure = parse("alpha=1", &specs).unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParameterUnknown);
        assert_eq!(failure.param.as_deref(), Some("alpha"));

        let failure = parse("th-reshold=1", &specs).unwrap_err();
        assert_eq!(failure.kind, FailureKind::IllegalParamName);
        assert_eq!(failure.param.as_deref(), Some("th-reshold"));

        let failure = parse("=1", &specs).unwrap_err();
        assert_eq!(failure.kind, FailureKind::IllegalParamName);

        let failure = parse("delta=1;DELTA=2", &specs).unwrap_err();
        assert_eq!(failure.kind, FailureKind::DuplicateParamName);

        let failure = parse("delta", &specs).unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParameterValueMalformed);

        let failure = parse("delta=abc", &specs).unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParameterValueMalformed);
        assert_eq!(failure.value.as_deref(), Some("abc"));

        let failure = parse("delta=1.5x", &specs).unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParameterValueMalformed);

        let failure = parse("scale=yes", &specs).unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParameterValueMalformed);
        assert_eq!(failure.detail.as_deref(), Some("expected a float value"));
    }

    #[test]
    fn test_check_param_specs() {
        assert!(check_param_specs(&specs()).is_ok());

        let failure = check_param_specs(&[ParamSpec::float("bad name", 1.0)]).unwrap_err();
        assert_eq!(failure.kind, FailureKind::IllegalParamName);

        let failure =
            check_param_specs(&[ParamSpec::float("k", 1.0), ParamSpec::required_float("K")])
                .unwrap_err();
        assert_eq!(failure.kind, FailureKind::DuplicateParamName);
    }

    #[test]
    fn test_resolve_defaults_and_required() {
        let specs = vec![ParamSpec::float("delta", 1.0), ParamSpec::required_float("k")];

        let assignments = parse("k=4", &specs).unwrap();
        let values = ParamValues::resolve(&specs, &assignments).unwrap();
        assert_eq!(values.float("delta").unwrap(), 1.0);
        assert_eq!(values.float("K").unwrap(), 4.0);
        assert_eq!(values.len(), 2);

        let failure = ParamValues::resolve(&specs, &[]).unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParameterUnknown);
        assert_eq!(failure.param.as_deref(), Some("k"));
    }

    #[test]
    fn test_undeclared_lookup_is_constructor_failure() {
        let values = ParamValues::resolve(&[ParamSpec::float("delta", 1.0)], &[]).unwrap();
        let failure = values.float("missing").unwrap_err();
        assert_eq!(failure.kind, FailureKind::ConstructorFailure);
        assert_eq!(failure.param.as_deref(), Some("missing"));
        assert_eq!(values.float("DELTA").unwrap(), 1.0);
    }
}
