//! # objective-select: Configuration-String Component Selection
//!
//! Turns a short, human-written string such as `"tweedie_deviance:variance_power=1.3"`
//! into a validated component, or into a precise account of why nothing matched.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Text → Scanner → Parameter Model → Registration Attempt (per candidate) → Selector
//! ```
//!
//! ### Stage 1: Scanning
//!
//! The [`scanner`] module provides cursor-based primitives: whitespace skipping,
//! ASCII case-insensitive matching, forgiving equality and float literals.
//!
//! ### Stage 2: Parameters
//!
//! The [`param`] module defines the identifier grammar, parameter declarations and
//! the parsing of `name=value` lists that follow a component name.
//!
//! ### Stage 3: Registration Attempts
//!
//! The [`protocol`] module defines what a candidate may answer: matched, not
//! matched, or one of the terminal [`protocol::FailureKind`]s.
//!
//! ### Stage 4: Selection
//!
//! The [`selector`] module walks an ordered [`selector::Registry`] and resolves the
//! first match or the first terminal failure.
//!
//! ## Back-ends and Built-ins
//!
//! Registries are per [`backend::Backend`]. The [`objective`] module carries the
//! built-in objective catalog and derives link functions from objective strings.
//! The [`config`] module loads host settings from JSON.

pub mod backend;
pub mod config;
pub mod error;
pub mod objective;
pub mod param;
pub mod protocol;
pub mod scanner;
pub mod selector;

// Re-exports
pub use error::*;
pub use protocol::{FailureKind, RegistrationFailure, RegistrationOutcome, SelectionContext};
pub use selector::{Candidate, Registry, SelectError};

#[cfg(test)]
mod tests {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
