use thiserror::Error;

use crate::config::ConfigError;
use crate::eval::expression::ExpressionError;
use crate::host::HostError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Host error: {0}")]
    Host(#[from] HostError),
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
