//! # Built-in Objectives
//!
//! The objective catalog and the link functions it implies. One registry exists
//! per [`Backend`]; each is built on first use and shared read-only afterwards.
//!
//! ## Priority Order
//!
//! | # | Name | Parameters | Link |
//! |---|---|---|---|
//! | 1 | `rmse` | | identity |
//! | 2 | `rmse_log` | | log |
//! | 3 | `log_loss` | | logit, or mlogit above two classes |
//! | 4 | `poisson_deviance` | `max_delta_step` = 0.7 | log |
//! | 5 | `tweedie_deviance` | `variance_power` = 1.5 | log |
//! | 6 | `gamma_deviance` | | log |
//! | 7 | `pseudo_huber` | `delta` = 1.0 | identity |
//!
//! The `cuda` back-end only carries `rmse` and `log_loss`. Under differential
//! privacy only those two are accepted on any back-end.
//!
//! ```
//! use objective_select::backend::Backend;
//! use objective_select::objective::{determine_link, Link, Task};
//! use objective_select::protocol::SelectionContext;
//!
//! let ctx = SelectionContext::default();
//! let (link, param) = determine_link("tweedie_deviance:variance_power=1.2", Backend::Cpu, &ctx)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(link, Link::Log);
//! assert_eq!(param, Some(1.2));
//! assert_eq!(link.task(), Task::Regression);
//! ```

use lazy_static::lazy_static;
use strum::IntoEnumIterator;
use tracing::instrument;

use crate::{
    backend::Backend,
    param::ParamSpec,
    protocol::{Registration, RegistrationFailure, SelectionContext},
    scanner::{skip_whitespace, Cursor},
    selector::{Registry, SelectResult},
};

pub const CATEGORY: &str = "objective";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Link {
    Identity,
    Log,
    Logit,
    Mlogit,
}

impl Link {
    pub fn task(&self) -> Task {
        match self {
            Link::Logit | Link::Mlogit => Task::Classification,
            Link::Identity | Link::Log => Task::Regression,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Task {
    Classification,
    Regression,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectiveKind {
    Rmse,
    RmseLog,
    LogLoss { multiclass: bool },
    PoissonDeviance { max_delta_step: f64 },
    TweedieDeviance { variance_power: f64 },
    GammaDeviance,
    PseudoHuber { delta: f64 },
}

/// A selected objective bound to the back-end whose registry produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    pub kind: ObjectiveKind,
    pub backend: Backend,
}

impl Objective {
    pub fn name(&self) -> &'static str {
        match self.kind {
            ObjectiveKind::Rmse => "rmse",
            ObjectiveKind::RmseLog => "rmse_log",
            ObjectiveKind::LogLoss { .. } => "log_loss",
            ObjectiveKind::PoissonDeviance { .. } => "poisson_deviance",
            ObjectiveKind::TweedieDeviance { .. } => "tweedie_deviance",
            ObjectiveKind::GammaDeviance => "gamma_deviance",
            ObjectiveKind::PseudoHuber { .. } => "pseudo_huber",
        }
    }

    pub fn link(&self) -> Link {
        match self.kind {
            ObjectiveKind::Rmse | ObjectiveKind::PseudoHuber { .. } => Link::Identity,
            ObjectiveKind::LogLoss { multiclass: false } => Link::Logit,
            ObjectiveKind::LogLoss { multiclass: true } => Link::Mlogit,
            ObjectiveKind::RmseLog
            | ObjectiveKind::PoissonDeviance { .. }
            | ObjectiveKind::TweedieDeviance { .. }
            | ObjectiveKind::GammaDeviance => Link::Log,
        }
    }

    /// Extra parameter of the link function, if it has one.
    pub fn link_param(&self) -> Option<f64> {
        match self.kind {
            ObjectiveKind::TweedieDeviance { variance_power } => Some(variance_power),
            _ => None,
        }
    }

    pub fn task(&self) -> Task {
        self.link().task()
    }
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())?;
        match self.kind {
            ObjectiveKind::PoissonDeviance { max_delta_step } => {
                write!(f, ":max_delta_step={}", max_delta_step)
            }
            ObjectiveKind::TweedieDeviance { variance_power } => {
                write!(f, ":variance_power={}", variance_power)
            }
            ObjectiveKind::PseudoHuber { delta } => write!(f, ":delta={}", delta),
            _ => Ok(()),
        }
    }
}

fn single_output(ctx: &SelectionContext) -> Result<(), RegistrationFailure> {
    match ctx.output_count {
        Some(count) if count != 1 => Err(RegistrationFailure::mismatch(format!(
            "regression objectives produce one output, configuration has {}",
            count
        ))),
        _ => Ok(()),
    }
}

fn without_privacy(ctx: &SelectionContext) -> Result<(), RegistrationFailure> {
    if ctx.differential_privacy {
        return Err(RegistrationFailure::mismatch(
            "objective is not supported under differential privacy",
        ));
    }
    Ok(())
}

fn rmse() -> Registration<Objective> {
    Registration::new("rmse", |_, ctx| {
        single_output(ctx)?;
        Ok(Objective {
            kind: ObjectiveKind::Rmse,
            backend: ctx.backend,
        })
    })
}

fn rmse_log() -> Registration<Objective> {
    Registration::new("rmse_log", |_, ctx| {
        without_privacy(ctx)?;
        single_output(ctx)?;
        Ok(Objective {
            kind: ObjectiveKind::RmseLog,
            backend: ctx.backend,
        })
    })
}

fn log_loss() -> Registration<Objective> {
    Registration::new("log_loss", |_, ctx| {
        let multiclass = match ctx.output_count {
            Some(count) if count < 2 => {
                return Err(RegistrationFailure::mismatch(format!(
                    "log_loss needs at least two classes, configuration has {}",
                    count
                )))
            }
            Some(count) => count > 2,
            None => false,
        };
        Ok(Objective {
            kind: ObjectiveKind::LogLoss { multiclass },
            backend: ctx.backend,
        })
    })
}

fn poisson_deviance() -> Registration<Objective> {
    Registration::new("poisson_deviance", |params, ctx| {
        let max_delta_step = params.float("max_delta_step")?;
        if !(max_delta_step > 0.0) {
            return Err(RegistrationFailure::out_of_range("max_delta_step", max_delta_step)
                .with_detail("must be greater than 0"));
        }
        if !max_delta_step.exp().is_finite() {
            return Err(RegistrationFailure::constructor(
                "exp(max_delta_step) is not representable",
            )
            .with_param("max_delta_step")
            .with_float_value(max_delta_step));
        }
        without_privacy(ctx)?;
        single_output(ctx)?;
        Ok(Objective {
            kind: ObjectiveKind::PoissonDeviance { max_delta_step },
            backend: ctx.backend,
        })
    })
    .param(ParamSpec::float("max_delta_step", 0.7))
}

fn tweedie_deviance() -> Registration<Objective> {
    Registration::new("tweedie_deviance", |params, ctx| {
        let variance_power = params.float("variance_power")?;
        if !(1.0 < variance_power && variance_power < 2.0) {
            return Err(RegistrationFailure::out_of_range("variance_power", variance_power)
                .with_detail("must satisfy 1 < variance_power < 2"));
        }
        without_privacy(ctx)?;
        single_output(ctx)?;
        Ok(Objective {
            kind: ObjectiveKind::TweedieDeviance { variance_power },
            backend: ctx.backend,
        })
    })
    .param(ParamSpec::float("variance_power", 1.5))
}

fn gamma_deviance() -> Registration<Objective> {
    Registration::new("gamma_deviance", |_, ctx| {
        without_privacy(ctx)?;
        single_output(ctx)?;
        Ok(Objective {
            kind: ObjectiveKind::GammaDeviance,
            backend: ctx.backend,
        })
    })
}

fn pseudo_huber() -> Registration<Objective> {
    Registration::new("pseudo_huber", |params, ctx| {
        let delta = params.float("delta")?;
        if !(delta.is_finite() && delta > 0.0) {
            return Err(RegistrationFailure::out_of_range("delta", delta)
                .with_detail("must be finite and greater than 0"));
        }
        let inverse_delta_squared = 1.0 / (delta * delta);
        if !inverse_delta_squared.is_finite() || inverse_delta_squared == 0.0 {
            return Err(RegistrationFailure::constructor("1/delta^2 is not representable")
                .with_param("delta")
                .with_float_value(delta));
        }
        without_privacy(ctx)?;
        single_output(ctx)?;
        Ok(Objective {
            kind: ObjectiveKind::PseudoHuber { delta },
            backend: ctx.backend,
        })
    })
    .param(ParamSpec::float("delta", 1.0))
}

/// Builds a fresh objective registry for `backend`.
pub fn build_registry(backend: Backend) -> Registry<Objective> {
    let builder = Registry::builder(CATEGORY, backend).register(rmse());
    if backend.is_gpu() {
        return builder.register(log_loss()).build();
    }
    builder
        .register(rmse_log())
        .register(log_loss())
        .register(poisson_deviance())
        .register(tweedie_deviance())
        .register(gamma_deviance())
        .register(pseudo_huber())
        .build()
}

lazy_static! {
    static ref REGISTRIES: Vec<Registry<Objective>> = Backend::iter().map(build_registry).collect();
}

/// The process-wide objective registry of `backend`.
pub fn registry(backend: Backend) -> &'static Registry<Objective> {
    &REGISTRIES[backend.index()]
}

/// Selects an objective. Whitespace-only text means no objective was given.
#[instrument(level = "debug", skip(ctx))]
pub fn select_objective(
    text: &str,
    backend: Backend,
    ctx: &SelectionContext,
) -> SelectResult<Option<Objective>> {
    if skip_whitespace(Cursor::new(text)).is_at_end() {
        return Ok(None);
    }
    registry(backend).select(text, ctx).map(Some)
}

/// The link function and optional link parameter implied by an objective string.
pub fn determine_link(
    text: &str,
    backend: Backend,
    ctx: &SelectionContext,
) -> SelectResult<Option<(Link, Option<f64>)>> {
    Ok(select_objective(text, backend, ctx)?
        .map(|objective| (objective.link(), objective.link_param())))
}
