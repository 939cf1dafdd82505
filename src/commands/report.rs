//! The `report` command.

use crate::commands::Reply;
use crate::error::{ErrorType, IntoResult};
use crate::{Result, SheetName, Store};
use chrono::{DateTime, Local};
use std::str::FromStr;
use tracing::debug;

/// Sent when the requested month is not in `YYYY-MM` form.
pub const INVALID_MONTH: &str = "Invalid month format. Please use YYYY-MM.";

/// Reports the total spent in `month`, or in the month containing `now` when `month` is `None` or
/// empty. Any other value must be exactly `YYYY-MM`, without surrounding whitespace.
///
/// A malformed month is answered with an ephemeral message and nothing is read from the store. A
/// month without a sheet is answered without reading any cells.
///
/// # Errors
///
/// - A store error if the sheet titles or the amounts cannot be read.
pub async fn report(store: &Store, month: Option<&str>, now: DateTime<Local>) -> Result<Reply> {
    let sheet = match month.filter(|m| !m.is_empty()) {
        None => SheetName::for_date(&now),
        Some(month) => match SheetName::from_str(month) {
            Ok(sheet) => sheet,
            Err(e) => {
                debug!("Rejecting report request: {e}");
                return Ok(Reply::ephemeral(INVALID_MONTH));
            }
        },
    };

    let mut ledger = store.ledger();
    if !ledger
        .sheet_exists(&sheet)
        .await
        .pub_result(ErrorType::Store)?
    {
        return Ok(Reply::message(format!(
            "No expense data found for month {sheet}."
        )));
    }

    let total = ledger
        .monthly_total(&sheet)
        .await
        .pub_result(ErrorType::Store)?;
    debug!("Total for {sheet} is {}", total.value());
    Ok(Reply::Report {
        month: sheet,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Call;
    use crate::test::TestEnv;
    use crate::Amount;
    use chrono::TimeZone;

    fn march() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    const HEADER: &[&str] = &["Timestamp", "Description", "Amount"];

    #[tokio::test]
    async fn test_invalid_month_makes_no_remote_calls() {
        let env = TestEnv::new();
        for month in ["March", "2024-3", "24-03", "2024/03", "2024-03-01"] {
            let reply = report(env.store(), Some(month), march()).await.unwrap();
            assert_eq!(reply, Reply::ephemeral(INVALID_MONTH), "{month}");
        }
        assert!(env.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_month_is_not_aggregated() {
        let env = TestEnv::with_sheets(&[("2024-03", &[HEADER])]);
        let reply = report(env.store(), Some("2099-01"), march()).await.unwrap();
        assert_eq!(
            reply,
            Reply::message("No expense data found for month 2099-01.")
        );
        assert_eq!(env.calls(), vec![Call::Titles]);
    }

    #[tokio::test]
    async fn test_total_of_existing_month() {
        let env = TestEnv::with_sheets(&[(
            "2024-03",
            &[HEADER, &["t1", "a", "10"], &["t2", "b", "20.25"]],
        )]);
        let reply = report(env.store(), Some("2024-03"), march()).await.unwrap();
        assert_eq!(
            reply,
            Reply::Report {
                month: SheetName::from_str("2024-03").unwrap(),
                total: Amount::from_str("30.25").unwrap(),
            }
        );
        assert_eq!(reply.title().as_deref(), Some("Expense Report for 2024-03"));
        assert_eq!(reply.body(), "Total spent: Rs30.25");
        assert_eq!(
            env.calls(),
            vec![Call::Titles, Call::Get("'2024-03'!C2:C".to_string())]
        );
    }

    #[tokio::test]
    async fn test_defaults_to_current_month() {
        let env = TestEnv::with_sheets(&[
            ("2024-02", &[HEADER, &["t", "old", "99"]]),
            ("2024-03", &[HEADER, &["t", "new", "1.5"]]),
        ]);
        for month in [None, Some("")] {
            let reply = report(env.store(), month, march()).await.unwrap();
            assert_eq!(reply.body(), "Total spent: Rs1.50", "{month:?}");
        }
    }

    #[tokio::test]
    async fn test_padded_month_is_invalid() {
        let env = TestEnv::with_sheets(&[("2024-03", &[HEADER, &["t", "a", "10"]])]);
        for month in [" 2024-03 ", "2024-03 ", "   "] {
            let reply = report(env.store(), Some(month), march()).await.unwrap();
            assert_eq!(reply, Reply::ephemeral(INVALID_MONTH), "{month:?}");
        }
        assert!(env.calls().is_empty());
    }

    #[tokio::test]
    async fn test_negative_total() {
        let env = TestEnv::with_sheets(&[("2024-03", &[HEADER, &["t", "refund", "-7.1"]])]);
        let reply = report(env.store(), None, march()).await.unwrap();
        assert_eq!(reply.body(), "Total spent: Rs-7.10");
    }

    #[tokio::test]
    async fn test_overflowing_total_is_a_store_error() {
        let env = TestEnv::with_sheets(&[(
            "2024-03",
            &[
                HEADER,
                &["t1", "a", "79228162514264337593543950335"],
                &["t2", "b", "1"],
            ],
        )]);
        let err = report(env.store(), Some("2024-03"), march())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Store);
    }

    #[tokio::test]
    async fn test_header_only_sheet_totals_zero() {
        let env = TestEnv::with_sheets(&[("2024-03", &[HEADER])]);
        let reply = report(env.store(), None, march()).await.unwrap();
        assert_eq!(reply.body(), "Total spent: Rs0.00");
    }

    #[tokio::test]
    async fn test_non_numeric_cells_count_as_zero() {
        let env = TestEnv::with_sheets(&[(
            "2024-03",
            &[
                HEADER,
                &["t1", "a", "10"],
                &["t2", "b", ""],
                &["t3", "c", "abc"],
                &["t4", "d", "5.5"],
            ],
        )]);
        let reply = report(env.store(), None, march()).await.unwrap();
        assert_eq!(reply.body(), "Total spent: Rs15.50");
    }

    #[tokio::test]
    async fn test_syntactically_valid_month_13() {
        let env = TestEnv::new();
        let reply = report(env.store(), Some("2024-13"), march()).await.unwrap();
        assert_eq!(reply.body(), "No expense data found for month 2024-13.");
    }
}
