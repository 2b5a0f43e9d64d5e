//! Domain error types.

use chrono::NaiveDate;

/// A strategy spec parse error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!("{input}\n{caret}\n{err}", err = self)
    }
}

/// Top-level error type for coinsim.
#[derive(Debug, thiserror::Error)]
pub enum CoinsimError {
    #[error("cannot move a negative amount {amount} of {asset}")]
    NegativeAmount { asset: String, amount: f64 },

    #[error("no such asset {asset}")]
    UnknownAsset { asset: String },

    #[error("no price data for {date}")]
    MissingDate { date: NaiveDate },

    #[error("no exchange rate for {asset}")]
    MissingRate { asset: String },

    #[error("invalid price {price} on {date}")]
    InvalidPrice { date: NaiveDate, price: f64 },

    #[error("portfolio has zero total value")]
    ZeroPortfolioValue,

    #[error("model {name} is registered more than once")]
    DuplicateModel { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid strategy for model {model}: {source}")]
    StrategyParse {
        model: String,
        #[source]
        source: ParseError,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no price data in {path}")]
    NoData { path: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoinsimError {
    /// True for errors that abort a simulation run mid-flight.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CoinsimError::NegativeAmount { .. }
                | CoinsimError::UnknownAsset { .. }
                | CoinsimError::MissingDate { .. }
                | CoinsimError::MissingRate { .. }
                | CoinsimError::InvalidPrice { .. }
                | CoinsimError::ZeroPortfolioValue
                | CoinsimError::DuplicateModel { .. }
        )
    }
}

impl From<&CoinsimError> for std::process::ExitCode {
    fn from(err: &CoinsimError) -> Self {
        let code: u8 = match err {
            CoinsimError::Io(_) => 1,
            CoinsimError::ConfigParse { .. }
            | CoinsimError::ConfigMissing { .. }
            | CoinsimError::ConfigInvalid { .. } => 2,
            CoinsimError::Data { .. } | CoinsimError::NoData { .. } => 3,
            CoinsimError::StrategyParse { .. } => 4,
            CoinsimError::NegativeAmount { .. }
            | CoinsimError::UnknownAsset { .. }
            | CoinsimError::MissingDate { .. }
            | CoinsimError::MissingRate { .. }
            | CoinsimError::InvalidPrice { .. }
            | CoinsimError::ZeroPortfolioValue
            | CoinsimError::DuplicateModel { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
