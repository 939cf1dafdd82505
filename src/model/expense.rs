use crate::model::Amount;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// One logged expense. Records are only ever appended, never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRecord {
    timestamp: DateTime<Utc>,
    description: String,
    amount: Amount,
}

impl ExpenseRecord {
    pub fn new(timestamp: DateTime<Utc>, description: impl Into<String>, amount: Amount) -> Self {
        Self {
            timestamp,
            description: description.into(),
            amount,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// The row as it is written to the sheet: `Timestamp | Description | Amount`. The timestamp
    /// is UTC with millisecond precision, e.g. `2024-03-01T00:00:00.000Z`.
    pub(crate) fn to_row(&self) -> Vec<Value> {
        vec![
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::String(self.description.clone()),
            self.amount.to_cell(),
        ]
    }
}
