//! # Registration Attempt Protocol
//!
//! Every candidate is probed with the full configuration string and answers with a
//! [`RegistrationOutcome`]:
//!
//! * [`RegistrationOutcome::Matched`]: the text names this candidate and it was built
//! * [`RegistrationOutcome::NotMatched`]: the text does not name this candidate
//! * [`RegistrationOutcome::Fatal`]: the text names this candidate (or the candidate
//!   itself is broken) and selection has to stop with a [`RegistrationFailure`]
//!
//! Only `NotMatched` lets the selector move on. Once a name is recognised, any later
//! problem belongs to the user's configuration and is never retried against another
//! candidate.
//!
//! ## Failure Kinds
//!
//! [`FailureKind`] keeps syntax problems (`ParameterValueMalformed`), identifier
//! problems (`ParameterUnknown`, `IllegalParamName`, `IllegalRegistrationName`,
//! `DuplicateParamName`), semantic constraint violations (`ParameterValueOutOfRange`,
//! `ParameterMismatchWithConfig`) and internal invariants (`ConstructorFailure`)
//! apart all the way to the host.
//!
//! ## Declarative Registrations
//!
//! [`Registration`] packages the common shape of a candidate: a name, a list of
//! [`ParamSpec`]s and a build closure. It performs name matching and parameter
//! parsing itself and hands the build closure fully resolved [`ParamValues`].
//!
//! ```
//! use objective_select::param::ParamSpec;
//! use objective_select::protocol::{
//!     FailureKind, Registration, RegistrationFailure, RegistrationOutcome, SelectionContext,
//! };
//!
//! let huber = Registration::new("pseudo_huber", |params, _ctx| {
//!     let delta = params.float("delta")?;
//!     if delta <= 0.0 {
//!         return Err(RegistrationFailure::out_of_range("delta", delta));
//!     }
//!     Ok(delta)
//! })
//! .param(ParamSpec::float("delta", 1.0));
//!
//! let ctx = SelectionContext::default();
//! assert_eq!(huber.attempt("Pseudo_Huber:delta=2", &ctx), RegistrationOutcome::Matched(2.0));
//! assert_eq!(huber.attempt("rmse", &ctx), RegistrationOutcome::NotMatched);
//! match huber.attempt("pseudo_huber:delta=-1", &ctx) {
//!     RegistrationOutcome::Fatal(failure) => {
//!         assert_eq!(failure.kind, FailureKind::ParameterValueOutOfRange)
//!     }
//!     other => panic!("unexpected outcome: {:?}", other),
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::{
    backend::Backend,
    param::{
        check_param_specs, is_identifier, match_registration_name, parse_assignments, ParamSpec,
        ParamValues,
    },
    scanner::Cursor,
};

/// Why a candidate stopped the selection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum FailureKind {
    #[strum(to_string = "unknown parameter")]
    ParameterUnknown,
    #[strum(to_string = "malformed parameter value")]
    ParameterValueMalformed,
    #[strum(to_string = "parameter value out of range")]
    ParameterValueOutOfRange,
    #[strum(to_string = "parameter mismatch with configuration")]
    ParameterMismatchWithConfig,
    #[strum(to_string = "duplicate parameter name")]
    DuplicateParamName,
    #[strum(to_string = "illegal parameter name")]
    IllegalParamName,
    #[strum(to_string = "illegal registration name")]
    IllegalRegistrationName,
    #[strum(to_string = "constructor failure")]
    ConstructorFailure,
}

impl FailureKind {
    /// Internal failures point at the registration, not at the user's text.
    pub fn is_internal(&self) -> bool {
        matches!(self, FailureKind::ConstructorFailure)
    }
}

/// A terminal failure with enough context to format a precise message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationFailure {
    pub kind: FailureKind,
    /// Registration being probed when the failure occurred.
    pub registration: Option<String>,
    /// Offending parameter name, when one is involved.
    pub param: Option<String>,
    /// Offending value as written or computed.
    pub value: Option<String>,
    pub detail: Option<String>,
}

impl RegistrationFailure {
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            registration: None,
            param: None,
            value: None,
            detail: None,
        }
    }

    pub fn out_of_range(param: impl Into<String>, value: f64) -> Self {
        Self::new(FailureKind::ParameterValueOutOfRange)
            .with_param(param)
            .with_float_value(value)
    }

    pub fn mismatch(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::ParameterMismatchWithConfig).with_detail(detail)
    }

    pub fn constructor(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::ConstructorFailure).with_detail(detail)
    }

    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }

    /// Fills in the registration only when the failure does not name one yet.
    pub fn or_registration(mut self, registration: &str) -> Self {
        if self.registration.is_none() {
            self.registration = Some(registration.to_string());
        }
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Records a computed float. Very large and very small magnitudes use
    /// exponent notation so messages stay short.
    pub fn with_float_value(self, value: f64) -> Self {
        let magnitude = value.abs();
        if value.is_finite() && magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
            self.with_value(format!("{:e}", value))
        } else {
            self.with_value(value.to_string())
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for RegistrationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(registration) = &self.registration {
            write!(f, " in registration '{}'", registration)?;
        }
        if let Some(param) = &self.param {
            write!(f, " for parameter '{}'", param)?;
        }
        if let Some(value) = &self.value {
            write!(f, " (value '{}')", value)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for RegistrationFailure {}

/// The answer of a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome<T> {
    Matched(T),
    NotMatched,
    Fatal(RegistrationFailure),
}

impl<T> RegistrationOutcome<T> {
    pub fn fatal(kind: FailureKind) -> Self {
        RegistrationOutcome::Fatal(RegistrationFailure::new(kind))
    }

    /// Everything except `NotMatched` ends the selection.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RegistrationOutcome::NotMatched)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RegistrationOutcome<U> {
        match self {
            RegistrationOutcome::Matched(value) => RegistrationOutcome::Matched(f(value)),
            RegistrationOutcome::NotMatched => RegistrationOutcome::NotMatched,
            RegistrationOutcome::Fatal(failure) => RegistrationOutcome::Fatal(failure),
        }
    }
}

impl<T> From<Result<Option<T>, RegistrationFailure>> for RegistrationOutcome<T> {
    fn from(result: Result<Option<T>, RegistrationFailure>) -> Self {
        match result {
            Ok(Some(value)) => RegistrationOutcome::Matched(value),
            Ok(None) => RegistrationOutcome::NotMatched,
            Err(failure) => RegistrationOutcome::Fatal(failure),
        }
    }
}

/// The configuration surrounding a selection. Candidates consult it to reject
/// parameter combinations that are valid on their own but not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionContext {
    /// Back-end being searched. [`Registry::select`](crate::selector::Registry::select)
    /// overwrites it with the registry's own back-end.
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub differential_privacy: bool,
    /// Scores per sample: 1 for regression, the class count for classification.
    /// `None` when not yet known.
    #[serde(default)]
    pub output_count: Option<usize>,
}

impl SelectionContext {
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_output_count(mut self, output_count: usize) -> Self {
        self.output_count = Some(output_count);
        self
    }

    pub fn with_differential_privacy(mut self, enabled: bool) -> Self {
        self.differential_privacy = enabled;
        self
    }
}

pub type BuildFn<T> =
    dyn Fn(&ParamValues, &SelectionContext) -> Result<T, RegistrationFailure> + Send + Sync;

/// A named candidate with declared parameters and a build step.
pub struct Registration<T> {
    name: String,
    params: Vec<ParamSpec>,
    build: Box<BuildFn<T>>,
}

impl<T> Registration<T> {
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&ParamValues, &SelectionContext) -> Result<T, RegistrationFailure>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            params: Vec::new(),
            build: Box::new(build),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Probes `text` against this registration.
    #[instrument(level = "debug", skip(self, ctx), fields(registration = %self.name))]
    pub fn attempt(&self, text: &str, ctx: &SelectionContext) -> RegistrationOutcome<T> {
        let outcome: RegistrationOutcome<T> = self
            .try_attempt(text, ctx)
            .map_err(|failure| failure.or_registration(&self.name))
            .into();
        if let RegistrationOutcome::Fatal(failure) = &outcome {
            debug!(%failure, "registration rejected configuration");
        }
        outcome
    }

    fn try_attempt(
        &self,
        text: &str,
        ctx: &SelectionContext,
    ) -> Result<Option<T>, RegistrationFailure> {
        if !is_identifier(&self.name) {
            return Err(RegistrationFailure::new(FailureKind::IllegalRegistrationName)
                .with_registration(self.name.clone()));
        }
        check_param_specs(&self.params)?;

        let Some(cursor) = match_registration_name(Cursor::new(text), &self.name) else {
            return Ok(None);
        };
        let assignments = parse_assignments(cursor, &self.params)?;
        let values = ParamValues::resolve(&self.params, &assignments)?;
        trace!(
            given = assignments.len(),
            resolved = values.len(),
            "parameters resolved"
        );
        (self.build)(&values, ctx).map(Some)
    }
}

impl<T> std::fmt::Debug for Registration<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}
