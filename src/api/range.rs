use std::fmt;

/// A column/row position in a sheet. Columns are 0-indexed (`A` is 0), rows are 1-indexed as they
/// are in A1 notation. A `None` row means the column is unbounded in that direction.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub(crate) struct Cell {
    pub(crate) col: usize,
    pub(crate) row: Option<usize>,
}

impl Cell {
    pub(crate) fn new(col: usize, row: Option<usize>) -> Self {
        Self { col, row }
    }
}

/// A rectangular range of a named sheet, rendered in A1 notation such as `'2024-03'!C2:C`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(crate) struct A1Range {
    sheet: String,
    start: Cell,
    end: Cell,
}

impl A1Range {
    pub(crate) fn new(sheet: impl Into<String>, start: Cell, end: Cell) -> Self {
        Self {
            sheet: sheet.into(),
            start,
            end,
        }
    }

    /// Whole columns `first..=last`, e.g. `A:C`.
    pub(crate) fn columns(sheet: impl Into<String>, first: usize, last: usize) -> Self {
        Self::new(sheet, Cell::new(first, None), Cell::new(last, None))
    }

    /// One row, e.g. `A1:C1`.
    pub(crate) fn row(sheet: impl Into<String>, row: usize, first: usize, last: usize) -> Self {
        Self::new(sheet, Cell::new(first, Some(row)), Cell::new(last, Some(row)))
    }

    /// One column from `row` to the end of the data, e.g. `C2:C`.
    pub(crate) fn column_from(sheet: impl Into<String>, col: usize, row: usize) -> Self {
        Self::new(sheet, Cell::new(col, Some(row)), Cell::new(col, None))
    }

    pub(crate) fn sheet(&self) -> &str {
        &self.sheet
    }

    pub(crate) fn start(&self) -> Cell {
        self.start
    }

    pub(crate) fn end(&self) -> Cell {
        self.end
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Quoting is always allowed, and required for names like `2024-03`.
        let sheet = self.sheet.replace('\'', "''");
        write!(f, "'{sheet}'!")?;
        write_cell(f, self.start)?;
        f.write_str(":")?;
        write_cell(f, self.end)
    }
}

fn write_cell(f: &mut fmt::Formatter<'_>, cell: Cell) -> fmt::Result {
    f.write_str(&column_letters(cell.col))?;
    match cell.row {
        Some(row) => write!(f, "{row}"),
        None => Ok(()),
    }
}

/// Converts a 0-indexed column to letters: 0 -> `A`, 25 -> `Z`, 26 -> `AA`.
pub(crate) fn column_letters(col: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
