use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("{0}")]
    Custom(String),

    #[error("{0}")]
    ParseInt(#[from] std::num::ParseIntError),

    #[error(transparent)]
    Address(#[from] kaspa_addresses::AddressError),

    #[error("Error processing JSON: {0}")]
    SerdeJson(String),

    #[error("Transaction input is missing UTXO entry")]
    MissingUtxoEntry,
}

impl Error {
    pub fn custom<T: Into<String>>(msg: T) -> Self {
        Error::Custom(msg.into())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Self::Custom(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Self::Custom(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::SerdeJson(error.to_string())
    }
}
