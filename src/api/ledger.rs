//! The monthly expense operations: provisioning a sheet, appending a record and totalling a month.

use crate::api::{A1Range, AddSheet, Sheet, SheetRange};
use crate::error::Res;
use crate::model::{Amount, ExpenseRecord};
use anyhow::{anyhow, Context};
use tracing::{debug, info, trace};

/// Row 1 of every monthly sheet.
pub(crate) const HEADER: [&str; 3] = ["Timestamp", "Description", "Amount"];

/// Column indexes, 0-based.
const FIRST_COLUMN: usize = 0;
const AMOUNT_COLUMN: usize = 2;

/// Data rows start below the header.
const FIRST_DATA_ROW: usize = 2;

/// Reads and writes monthly expense sheets through a dynamically-dispatched `Sheet`.
pub(crate) struct Ledger {
    sheet: Box<dyn Sheet + Send>,
}

impl Ledger {
    pub(crate) fn new(sheet: Box<dyn Sheet + Send>) -> Self {
        Self { sheet }
    }

    /// Returns true if the spreadsheet has a sheet named `title`. Only metadata is fetched.
    pub(crate) async fn sheet_exists(&mut self, title: &str) -> Res<bool> {
        let titles = self
            .sheet
            .titles()
            .await
            .context("Unable to list the sheets")?;
        Ok(titles.iter().any(|t| t == title))
    }

    /// Makes sure a sheet named `title` exists, creating it with the header row if it does not.
    /// Calling this again for the same title does nothing.
    pub(crate) async fn ensure_sheet(&mut self, title: &str) -> Res<()> {
        if self.sheet_exists(title).await? {
            trace!("Sheet {title} already exists");
            return Ok(());
        }

        match self
            .sheet
            .add_sheet(title)
            .await
            .with_context(|| format!("Unable to create sheet {title}"))?
        {
            AddSheet::Created => {
                self.write_header(title).await?;
                info!("Created sheet {title}");
            }
            AddSheet::AlreadyExists => {
                // Another command created it between our check and our create and may not have
                // written the header yet. An append into an empty sheet would land in row 1.
                debug!("Sheet {title} was created concurrently");
                let first_row = self
                    .sheet
                    .get(&header_range(title))
                    .await
                    .with_context(|| format!("Unable to read the header of sheet {title}"))?;
                if first_row.iter().all(|row| row.is_empty()) {
                    self.write_header(title).await?;
                }
            }
        }
        Ok(())
    }

    async fn write_header(&mut self, title: &str) -> Res<()> {
        let header = SheetRange {
            range: header_range(title),
            values: vec![HEADER.iter().map(|h| h.to_string()).collect()],
        };
        self.sheet
            .write_ranges(&[header])
            .await
            .with_context(|| format!("Unable to write the header of sheet {title}"))
    }

    /// Appends `record` below the last row of data in columns A to C. The sheet must exist.
    pub(crate) async fn append_expense(&mut self, title: &str, record: &ExpenseRecord) -> Res<()> {
        let range = A1Range::columns(title, FIRST_COLUMN, AMOUNT_COLUMN);
        self.sheet
            .append(&range, &[record.to_row()])
            .await
            .with_context(|| format!("Unable to append the expense to sheet {title}"))?;
        debug!(
            "Appended '{}' ({}) to {title}",
            record.description(),
            record.amount()
        );
        Ok(())
    }

    /// Sums the amount column of sheet `title`, ignoring anything that is not a number. Fails if
    /// the total is too large to represent.
    pub(crate) async fn monthly_total(&mut self, title: &str) -> Res<Amount> {
        let range = A1Range::column_from(title, AMOUNT_COLUMN, FIRST_DATA_ROW);
        let values = self
            .sheet
            .get(&range)
            .await
            .with_context(|| format!("Unable to read the amounts of sheet {title}"))?;
        sum_amounts(&values).with_context(|| format!("Unable to total sheet {title}"))
    }
}

fn header_range(title: &str) -> A1Range {
    A1Range::row(title, 1, FIRST_COLUMN, AMOUNT_COLUMN)
}

/// Adds up the first cell of each row. Empty rows, empty cells and cells that are not numbers
/// count as zero.
pub(crate) fn sum_amounts(values: &[Vec<String>]) -> Res<Amount> {
    values
        .iter()
        .filter_map(|row| row.first())
        .filter_map(|cell| Amount::from_cell(cell))
        .try_fold(Amount::ZERO, |total, amount| {
            total
                .checked_add(amount)
                .ok_or_else(|| anyhow!("The total overflowed when adding {}", amount.value()))
        })
}
