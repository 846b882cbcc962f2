use thiserror::Error;

use crate::selector::SelectError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Selection error: {0}")]
    Selection(#[from] SelectError),
    #[error("Config error: {0}")]
    Config(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config(message.into())
    }

    /// A selection that found no registration rather than a broken one.
    pub fn is_no_match(&self) -> bool {
        matches!(self, Error::Selection(error) if error.is_no_match())
    }
}
