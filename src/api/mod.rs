//! The spreadsheet side of the bot.
//!
//! The `Sheet` trait is the contract with the remote spreadsheet store. `GoogleSheet` implements
//! it against the Google Sheets API and `TestSheet` implements it in memory. The `Ledger` builds
//! the monthly expense operations on top of a `Sheet`, and the `Store` hands out ledgers.

mod files;
mod ledger;
mod oauth;
mod range;
mod sheet;
mod sheet_test_client;

use crate::error::{ErrorType, IntoResult, Res};
use crate::{Config, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub(crate) use files::Credentials;
pub(crate) use ledger::Ledger;
pub(crate) use oauth::TokenProvider;
pub(crate) use range::A1Range;
pub(crate) use sheet::GoogleSheet;
pub(crate) use sheet_test_client::TestSheet;
#[cfg(test)]
pub(crate) use sheet_test_client::{Call, TestSheetState};

/// The OAuth scope needed to read and write the spreadsheet.
const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// When this environment variable is set and non-empty, the in-memory `TestSheet` is used instead
/// of Google Sheets.
const TEST_MODE_ENV: &str = "EXPENSE_BOT_IN_TEST_MODE";

/// Whether we talk to a real Google sheet or to an in-memory one.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Google,
    Testing,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// `Mode::Testing` if `EXPENSE_BOT_IN_TEST_MODE` is set and non-empty, otherwise
    /// `Mode::Google`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Google,
        }
    }
}

/// The outcome of asking the store to create a sheet.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum AddSheet {
    /// The sheet was created by this call.
    Created,
    /// Somebody else created a sheet with the same title first.
    AlreadyExists,
}

/// Values to be written to a range of a sheet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct SheetRange {
    pub(crate) range: A1Range,
    pub(crate) values: Vec<Vec<String>>,
}

/// The operations this program needs from the remote spreadsheet store.
#[async_trait::async_trait]
pub(crate) trait Sheet {
    /// Lists the titles of the sheets in the spreadsheet. This only reads metadata.
    async fn titles(&mut self) -> Res<Vec<String>>;

    /// Creates an empty sheet named `title`.
    async fn add_sheet(&mut self, title: &str) -> Res<AddSheet>;

    /// Reads the formatted values of `range`, row by row. Trailing empty rows and cells are
    /// omitted, so rows can be shorter than the range is wide.
    async fn get(&mut self, range: &A1Range) -> Res<Vec<Vec<String>>>;

    /// Overwrites the given ranges.
    async fn write_ranges(&mut self, data: &[SheetRange]) -> Res<()>;

    /// Appends `rows` after the last row that has data within `range`.
    async fn append(&mut self, range: &A1Range, rows: &[Vec<Value>]) -> Res<()>;
}

/// The handle to the spreadsheet store. It is constructed once at startup and passed to whatever
/// needs it; each command gets its own `Ledger` from it.
#[derive(Debug, Clone)]
pub struct Store {
    config: Arc<Config>,
    backend: Backend,
}

#[derive(Debug, Clone)]
enum Backend {
    Google {
        tokens: TokenProvider,
        http: reqwest::Client,
    },
    Testing(TestSheet),
}

impl Store {
    /// Creates the store for `mode`. No network calls are made until a command runs.
    pub fn new(config: Config, mode: Mode) -> Result<Self> {
        let backend = match mode {
            Mode::Google => {
                let tokens = TokenProvider::new(config.credentials().clone())
                    .pub_result(ErrorType::Store)?;
                let http = reqwest::Client::builder()
                    .build()
                    .pub_result(ErrorType::Store)?;
                Backend::Google { tokens, http }
            }
            Mode::Testing => {
                debug!("Using the in-memory test sheet");
                Backend::Testing(TestSheet::seeded().pub_result(ErrorType::Store)?)
            }
        };
        Ok(Self {
            config: Arc::new(config),
            backend,
        })
    }

    /// Creates a store backed by `sheet`. Clones of a `TestSheet` share their data, so the caller
    /// can keep a clone to inspect what the store did.
    #[cfg(test)]
    pub(crate) fn with_test_sheet(config: Config, sheet: TestSheet) -> Self {
        Self {
            config: Arc::new(config),
            backend: Backend::Testing(sheet),
        }
    }

    /// A `Ledger` for a single command.
    pub(crate) fn ledger(&self) -> Ledger {
        match &self.backend {
            Backend::Google { tokens, http } => Ledger::new(Box::new(GoogleSheet::new(
                self.config.clone(),
                tokens.clone(),
                http.clone(),
            ))),
            Backend::Testing(sheet) => Ledger::new(Box::new(sheet.clone())),
        }
    }
}
