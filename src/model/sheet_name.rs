//! The `YYYY-MM` names of the monthly sheets.

use anyhow::bail;
use chrono::{Datelike, Local};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::LazyLock;

/// ASCII digits only: `\d` in the `regex` crate would also accept other Unicode digits.
static SHEET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}$").expect("the sheet name pattern is a valid regex")
});

/// The name of a monthly sheet, e.g. `2024-03`.
///
/// The month is not range-checked: `2024-13` is a syntactically valid name that simply never has
/// any data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SheetName(String);

impl SheetName {
    /// The sheet name for the current month in local time.
    pub fn current() -> Self {
        Self::for_date(&Local::now())
    }

    /// The sheet name for the month containing `date`.
    pub fn for_date(date: &impl Datelike) -> Self {
        Self(format!("{:04}-{:02}", date.year(), date.month()))
    }

    /// Returns true if `s` has the `YYYY-MM` shape.
    pub fn is_valid(s: &str) -> bool {
        SHEET_NAME.is_match(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SheetName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid(s) {
            bail!("'{s}' is not a valid sheet name, expected YYYY-MM");
        }
        Ok(Self(s.to_string()))
    }
}

impl Deref for SheetName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for SheetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for SheetName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl fmt::Display for SheetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
