//! Compute back-ends.
//!
//! The same registrations exist once per back-end. Instead of building the crate
//! several times, a [`Backend`] value is passed explicitly and each back-end gets
//! its own independent registry instance.

use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Portable scalar code.
    #[default]
    Cpu,
    Avx2,
    Avx512f,
    /// GPU execution; carries a reduced set of objectives.
    Cuda,
}

impl Backend {
    pub fn is_gpu(&self) -> bool {
        matches!(self, Backend::Cuda)
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}
