//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.

use crate::api::{A1Range, AddSheet, Sheet, SheetRange};
use crate::error::Res;
use anyhow::bail;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A record of one call made against a `TestSheet`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Call {
    Titles,
    AddSheet(String),
    Get(String),
    WriteRanges(Vec<String>),
    Append(String),
}

/// Everything a `TestSheet` holds: the sheets, keyed by title, as rows of cells, and the calls that
/// have been made so far.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct TestSheetState {
    pub(crate) sheets: BTreeMap<String, Vec<Vec<String>>>,
    pub(crate) calls: Vec<Call>,
    /// When set, every call fails with this message.
    pub(crate) failure: Option<String>,
}

/// An implementation of the `Sheet` trait that does not use Google sheets. Clones share the same
/// state, so a test can hold on to one clone and inspect what the code under test did with another.
#[derive(Debug, Clone, Default)]
pub(crate) struct TestSheet {
    state: Arc<Mutex<TestSheetState>>,
}

impl TestSheet {
    /// Create a new, empty, `TestSheet`.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Create a new `TestSheet` using `sheets`. The map key is sheet title and the map value is the
    /// rows of the sheet.
    pub(crate) fn with_sheets(sheets: BTreeMap<String, Vec<Vec<String>>>) -> Self {
        let sheet = Self::new();
        sheet.lock().sheets = sheets;
        sheet
    }

    /// A `TestSheet` with one month of seed data, used when running the app in test mode.
    pub(crate) fn seeded() -> Res<Self> {
        let mut sheets = BTreeMap::new();
        sheets.insert(SEED_SHEET.to_string(), load_csv(SEED_DATA)?);
        Ok(Self::with_sheets(sheets))
    }

    #[cfg(test)]
    pub(crate) fn get_state(&self) -> TestSheetState {
        self.lock().clone()
    }

    #[cfg(test)]
    pub(crate) fn set_state(&self, state: TestSheetState) {
        *self.lock() = state;
    }

    fn lock(&self) -> MutexGuard<'_, TestSheetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `call` and returns the state, or an error if the sheet has been told to fail.
    fn begin(&self, call: Call) -> Res<MutexGuard<'_, TestSheetState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(message) = state.failure.clone() {
            bail!("{message}");
        }
        Ok(state)
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn titles(&mut self) -> Res<Vec<String>> {
        let state = self.begin(Call::Titles)?;
        Ok(state.sheets.keys().cloned().collect())
    }

    async fn add_sheet(&mut self, title: &str) -> Res<AddSheet> {
        let mut state = self.begin(Call::AddSheet(title.to_string()))?;
        if state.sheets.contains_key(title) {
            return Ok(AddSheet::AlreadyExists);
        }
        state.sheets.insert(title.to_string(), Vec::new());
        Ok(AddSheet::Created)
    }

    async fn get(&mut self, range: &A1Range) -> Res<Vec<Vec<String>>> {
        let state = self.begin(Call::Get(range.to_string()))?;
        let rows = sheet_rows(&state, range)?;

        let first_row = range.start().row.unwrap_or(1).saturating_sub(1);
        let last_row = range.end().row.unwrap_or(rows.len()).min(rows.len());
        let (first_col, last_col) = (range.start().col, range.end().col);

        let mut values: Vec<Vec<String>> = rows
            .iter()
            .take(last_row)
            .skip(first_row)
            .map(|row| {
                let mut cells: Vec<String> = row
                    .iter()
                    .skip(first_col)
                    .take(last_col + 1 - first_col)
                    .cloned()
                    .collect();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();
        while values.last().is_some_and(|r| r.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn write_ranges(&mut self, data: &[SheetRange]) -> Res<()> {
        let ranges = data.iter().map(|sr| sr.range.to_string()).collect();
        let mut state = self.begin(Call::WriteRanges(ranges))?;
        for sheet_range in data {
            let first_row = sheet_range.range.start().row.unwrap_or(1).saturating_sub(1);
            let first_col = sheet_range.range.start().col;
            let rows = sheet_rows_mut(&mut state, &sheet_range.range)?;
            for (i, values) in sheet_range.values.iter().enumerate() {
                for (j, value) in values.iter().enumerate() {
                    set_cell(rows, first_row + i, first_col + j, value.clone());
                }
            }
        }
        Ok(())
    }

    async fn append(&mut self, range: &A1Range, new_rows: &[Vec<Value>]) -> Res<()> {
        let mut state = self.begin(Call::Append(range.to_string()))?;
        let (first_col, last_col) = (range.start().col, range.end().col);
        let rows = sheet_rows_mut(&mut state, range)?;

        // The table ends at the last row with data in the range's columns.
        let table_end = rows
            .iter()
            .rposition(|row| {
                row.iter()
                    .skip(first_col)
                    .take(last_col + 1 - first_col)
                    .any(|c| !c.is_empty())
            })
            .map_or(0, |i| i + 1);

        for (offset, values) in new_rows.iter().enumerate() {
            let mut row = vec![String::new(); first_col];
            row.extend(values.iter().map(cell_text));
            rows.insert((table_end + offset).min(rows.len()), row);
        }
        Ok(())
    }
}

fn sheet_rows<'a>(state: &'a TestSheetState, range: &A1Range) -> Res<&'a Vec<Vec<String>>> {
    match state.sheets.get(range.sheet()) {
        Some(rows) => Ok(rows),
        None => bail!("Unable to parse range: {range}"),
    }
}

fn sheet_rows_mut<'a>(
    state: &'a mut TestSheetState,
    range: &A1Range,
) -> Res<&'a mut Vec<Vec<String>>> {
    match state.sheets.get_mut(range.sheet()) {
        Some(rows) => Ok(rows),
        None => bail!("Unable to parse range: {range}"),
    }
}

fn set_cell(rows: &mut Vec<Vec<String>>, row: usize, col: usize, value: String) {
    if rows.len() <= row {
        rows.resize(row + 1, Vec::new());
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize(col + 1, String::new());
    }
    cells[col] = value;
}

/// What a raw-input cell would display as.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Loads data from a CSV-formatted string.
fn load_csv(csv_data: &str) -> Res<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false) // Ensure headers are treated as part of the data
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

const SEED_SHEET: &str = "2024-03";

/// Seed expense data.
const SEED_DATA: &str = r##"Timestamp,Description,Amount
2024-03-01T08:12:45.120Z,Coffee,3.5
2024-03-02T13:05:10.000Z,Lunch,12.5
2024-03-05T19:40:02.731Z,Groceries,"1,045.75"
2024-03-09T07:55:31.004Z,Bus pass,250
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::range::Cell;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn sheet_with(title: &str, data: &[&[&str]]) -> TestSheet {
        let mut sheets = BTreeMap::new();
        sheets.insert(title.to_string(), rows(data));
        TestSheet::with_sheets(sheets)
    }

    #[tokio::test]
    async fn test_seeded() {
        let mut sheet = TestSheet::seeded().unwrap();
        assert_eq!(sheet.titles().await.unwrap(), vec![SEED_SHEET]);
        let amounts = sheet
            .get(&A1Range::column_from(SEED_SHEET, 2, 2))
            .await
            .unwrap();
        assert_eq!(amounts, rows(&[&["3.5"], &["12.5"], &["1,045.75"], &["250"]]));
    }

    #[tokio::test]
    async fn test_get_column_skips_header_and_keeps_interior_blanks() {
        let mut sheet = sheet_with(
            "s",
            &[
                &["Timestamp", "Description", "Amount"],
                &["t1", "a", "10"],
                &["t2", "b"],
                &["t3", "c", "5.5"],
                &["", "", ""],
            ],
        );
        let values = sheet.get(&A1Range::column_from("s", 2, 2)).await.unwrap();
        assert_eq!(values, rows(&[&["10"], &[], &["5.5"]]));
    }

    #[tokio::test]
    async fn test_get_missing_sheet_fails() {
        let mut sheet = TestSheet::new();
        assert!(sheet.get(&A1Range::columns("nope", 0, 2)).await.is_err());
    }

    #[tokio::test]
    async fn test_add_sheet_twice() {
        let mut sheet = TestSheet::new();
        assert_eq!(sheet.add_sheet("x").await.unwrap(), AddSheet::Created);
        assert_eq!(sheet.add_sheet("x").await.unwrap(), AddSheet::AlreadyExists);
        assert_eq!(sheet.get_state().sheets.len(), 1);
    }

    #[tokio::test]
    async fn test_write_ranges_grows_the_grid() {
        let mut sheet = sheet_with("s", &[]);
        let range = A1Range::new("s", Cell::new(1, Some(2)), Cell::new(2, Some(2)));
        sheet
            .write_ranges(&[SheetRange {
                range,
                values: rows(&[&["b", "c"]]),
            }])
            .await
            .unwrap();
        assert_eq!(
            sheet.get_state().sheets["s"],
            rows(&[&[], &["", "b", "c"]])
        );
    }

    #[tokio::test]
    async fn test_append_after_last_row_with_data() {
        let mut sheet = sheet_with("s", &[&["h1", "h2", "h3"], &["a", "b", "1"], &[], &[]]);
        sheet
            .append(
                &A1Range::columns("s", 0, 2),
                &[vec![Value::from("c"), Value::from("d"), Value::from(2.5)]],
            )
            .await
            .unwrap();
        let state = sheet.get_state();
        assert_eq!(state.sheets["s"][2], rows(&[&["c", "d", "2.5"]])[0]);
        assert_eq!(
            state.calls,
            vec![Call::Append("'s'!A:C".to_string())]
        );
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let sheet = TestSheet::new();
        let mut clone = sheet.clone();
        clone.add_sheet("2024-03").await.unwrap();
        assert!(sheet.get_state().sheets.contains_key("2024-03"));
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_returned() {
        let mut sheet = TestSheet::new();
        sheet.set_state(TestSheetState {
            failure: Some("quota exceeded".to_string()),
            ..Default::default()
        });
        let err = sheet.titles().await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(sheet.get_state().calls, vec![Call::Titles]);
    }
}
