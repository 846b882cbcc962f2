//! # Candidate Selector
//!
//! A [`Registry`] is an ordered, immutable list of [`Candidate`]s for one category
//! of component on one [`Backend`]. [`Registry::select`] probes the candidates in
//! list order:
//!
//! 1. `Matched` returns the component; later candidates are never consulted.
//! 2. `NotMatched` moves on to the next candidate.
//! 3. `Fatal` stops immediately and surfaces the failure unchanged.
//!
//! Before probing, the registry stamps its own back-end into the
//! [`SelectionContext`] handed to candidates, so a constructor can branch on
//! `ctx.backend` without capturing it.
//!
//! If every candidate declines, [`SelectError::NoMatch`] is returned. It is not a
//! configuration error: the caller may try another registry with
//! [`select_first`] or report an unknown name.
//!
//! The selector never looks at parameters. Each candidate parses its own parameter
//! grammar, so adding a candidate never touches this module.
//!
//! ## Ordering
//!
//! Registration order is priority order. A registry built with
//! [`RegistryBuilder`] keeps candidates exactly in the order they were added.

use thiserror::Error;
use tracing::{debug, error, instrument, trace, warn};

use crate::{
    backend::Backend,
    protocol::{Registration, RegistrationFailure, RegistrationOutcome, SelectionContext},
};

pub type Constructor<T> =
    dyn Fn(&str, &SelectionContext) -> RegistrationOutcome<T> + Send + Sync;

/// One named, self-validating entry of a registry.
pub struct Candidate<T> {
    name: String,
    constructor: Box<Constructor<T>>,
}

impl<T> Candidate<T> {
    /// Wraps an arbitrary constructor. The constructor receives the full
    /// configuration string and decides on its own whether it is named by it.
    pub fn new<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&str, &SelectionContext) -> RegistrationOutcome<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: Box::new(constructor),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attempt(&self, text: &str, ctx: &SelectionContext) -> RegistrationOutcome<T> {
        (self.constructor)(text, ctx)
    }
}

impl<T: 'static> From<Registration<T>> for Candidate<T> {
    fn from(registration: Registration<T>) -> Self {
        let name = registration.name().to_string();
        Self::new(name, move |text, ctx| registration.attempt(text, ctx))
    }
}

impl<T> std::fmt::Debug for Candidate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate").field("name", &self.name).finish()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectError {
    #[error("no {category} named '{text}' is registered for backend {backend}")]
    NoMatch {
        category: String,
        backend: Backend,
        text: String,
    },
    #[error("no registry was searched for '{text}'")]
    NoRegistry { text: String },
    #[error("{0}")]
    Registration(#[from] RegistrationFailure),
}

impl SelectError {
    /// Nothing claimed the text, which leaves room for another registry.
    /// Registration failures are final.
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            SelectError::NoMatch { .. } | SelectError::NoRegistry { .. }
        )
    }

    pub fn failure(&self) -> Option<&RegistrationFailure> {
        match self {
            SelectError::Registration(failure) => Some(failure),
            SelectError::NoMatch { .. } | SelectError::NoRegistry { .. } => None,
        }
    }
}

pub type SelectResult<T> = Result<T, SelectError>;

/// Ordered candidates for one category on one back-end.
#[derive(Debug)]
pub struct Registry<T> {
    category: String,
    backend: Backend,
    candidates: Vec<Candidate<T>>,
}

impl<T> Registry<T> {
    pub fn builder(category: impl Into<String>, backend: Backend) -> RegistryBuilder<T> {
        RegistryBuilder {
            category: category.into(),
            backend,
            candidates: Vec::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(Candidate::name)
    }

    /// Resolves `text` to a component using the first candidate that claims it.
    #[instrument(level = "debug", skip(self, ctx), fields(category = %self.category, backend = %self.backend))]
    pub fn select(&self, text: &str, ctx: &SelectionContext) -> SelectResult<T> {
        let ctx = ctx.with_backend(self.backend);
        for candidate in &self.candidates {
            match candidate.attempt(text, &ctx) {
                RegistrationOutcome::Matched(component) => {
                    debug!(candidate = candidate.name(), "selected");
                    return Ok(component);
                }
                RegistrationOutcome::NotMatched => {
                    trace!(candidate = candidate.name(), "skipped");
                }
                RegistrationOutcome::Fatal(failure) => {
                    let failure = failure.or_registration(candidate.name());
                    if failure.kind.is_internal() {
                        error!(candidate = candidate.name(), %failure, "registration is broken");
                    } else {
                        warn!(candidate = candidate.name(), %failure, "selection stopped");
                    }
                    return Err(SelectError::Registration(failure));
                }
            }
        }

        debug!("no candidate matched");
        Err(SelectError::NoMatch {
            category: self.category.clone(),
            backend: self.backend,
            text: text.to_string(),
        })
    }
}

pub struct RegistryBuilder<T> {
    category: String,
    backend: Backend,
    candidates: Vec<Candidate<T>>,
}

impl<T: 'static> RegistryBuilder<T> {
    pub fn candidate(mut self, candidate: Candidate<T>) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn register(self, registration: Registration<T>) -> Self {
        self.candidate(registration.into())
    }

    pub fn build(self) -> Registry<T> {
        debug!(
            category = %self.category,
            backend = %self.backend,
            candidates = self.candidates.len(),
            "registry built"
        );
        Registry {
            category: self.category,
            backend: self.backend,
            candidates: self.candidates,
        }
    }
}

/// Tries each registry in turn, moving on only while the answer is `NoMatch`.
/// The last `NoMatch` is returned when every registry declines, and
/// `NoRegistry` when there was nothing to search.
pub fn select_first<T>(
    registries: &[&Registry<T>],
    text: &str,
    ctx: &SelectionContext,
) -> SelectResult<T> {
    let mut last = None;
    for registry in registries {
        match registry.select(text, ctx) {
            Err(error) if error.is_no_match() => last = Some(error),
            result => return result,
        }
    }
    Err(last.unwrap_or_else(|| SelectError::NoRegistry {
        text: text.to_string(),
    }))
}
