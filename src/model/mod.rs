//! Types that represent the data model: monthly sheet names, amounts and expense records.
mod amount;
mod expense;
mod sheet_name;

pub use amount::Amount;
pub use expense::ExpenseRecord;
pub use sheet_name::SheetName;
