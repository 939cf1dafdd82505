//! The `expense` command.

use crate::commands::Reply;
use crate::error::{ErrorType, IntoResult};
use crate::{Amount, ExpenseRecord, Result, SheetName, Store};
use anyhow::anyhow;
use chrono::{DateTime, Local, Utc};
use tracing::debug;

/// Logs an expense in the sheet for the month containing `now`, creating the sheet first if this
/// is the month's first expense.
///
/// # Arguments
///
/// - `store` - The spreadsheet store.
/// - `description` - What the money was spent on, recorded as entered. Must not be blank.
/// - `amount` - How much was spent. The command-parsing layers only let positive amounts through.
/// - `now` - When the expense is logged. The sheet is named after its local month and the record
///   is timestamped with it in UTC.
///
/// # Errors
///
/// - A validation error if `description` is blank.
/// - A store error if the sheet cannot be created or the row cannot be appended. The sheet may have
///   been created even if the append failed.
pub async fn expense(
    store: &Store,
    description: &str,
    amount: Amount,
    now: DateTime<Local>,
) -> Result<Reply> {
    if description.trim().is_empty() {
        return Err(anyhow!("The expense description is empty")).pub_result(ErrorType::Validation);
    }

    let sheet = SheetName::for_date(&now);
    let record = ExpenseRecord::new(now.with_timezone(&Utc), description, amount);
    debug!("Logging {record:?} in {sheet}");

    let mut ledger = store.ledger();
    ledger.ensure_sheet(&sheet).await.pub_result(ErrorType::Store)?;
    ledger
        .append_expense(&sheet, &record)
        .await
        .pub_result(ErrorType::Store)?;

    Ok(Reply::message(format!(
        "Logged expense {description} for {amount} in sheet {sheet}."
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Call;
    use crate::test::TestEnv;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn march() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 15, 12, 30, 0).unwrap()
    }

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_first_expense_of_a_new_month() {
        let env = TestEnv::new();
        let reply = expense(env.store(), "lunch", amount("12.5"), march())
            .await
            .unwrap();
        assert_eq!(
            reply,
            Reply::message("Logged expense lunch for Rs12.50 in sheet 2024-03.")
        );

        let state = env.get_state();
        let rows = &state.sheets["2024-03"];
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["Timestamp", "Description", "Amount"]);
        assert_eq!(rows[1][1..], ["lunch", "12.5"]);
        let expected_timestamp = march()
            .with_timezone(&Utc)
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        assert_eq!(rows[1][0], expected_timestamp);
        assert_eq!(
            state.calls,
            vec![
                Call::Titles,
                Call::AddSheet("2024-03".to_string()),
                Call::WriteRanges(vec!["'2024-03'!A1:C1".to_string()]),
                Call::Append("'2024-03'!A:C".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_existing_month_is_not_recreated() {
        let env = TestEnv::with_sheets(&[(
            "2024-03",
            &[&["Timestamp", "Description", "Amount"], &["t", "coffee", "3.5"]],
        )]);
        expense(env.store(), "bus", amount("2"), march())
            .await
            .unwrap();

        assert_eq!(
            env.calls(),
            vec![Call::Titles, Call::Append("'2024-03'!A:C".to_string())]
        );
        let state = env.get_state();
        assert_eq!(state.sheets["2024-03"].len(), 3);
        assert_eq!(state.sheets["2024-03"][2][1..], ["bus", "2"]);
    }

    #[tokio::test]
    async fn test_blank_description_is_rejected_without_remote_calls() {
        let env = TestEnv::new();
        let err = expense(env.store(), "  ", amount("1"), march())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert!(env.calls().is_empty());
    }

    #[tokio::test]
    async fn test_description_is_recorded_as_entered() {
        let env = TestEnv::new();
        let reply = expense(env.store(), " tea ", amount("0.5"), march())
            .await
            .unwrap();
        assert_eq!(reply.body(), "Logged expense  tea  for Rs0.50 in sheet 2024-03.");
        assert_eq!(env.get_state().sheets["2024-03"][1][1], " tea ");
    }

    #[tokio::test]
    async fn test_append_failure_is_a_store_error() {
        let env = TestEnv::new();
        env.fail_with("backend unavailable");
        let err = expense(env.store(), "lunch", amount("12.5"), march())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Store);
    }
}
