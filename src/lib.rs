mod api;
pub mod args;
mod bot;
pub mod commands;
mod config;
mod error;
mod model;


pub use api::{Mode, Store};
pub use config::{Config, DiscordConfig};
pub use error::{Error, ErrorType, Result};
pub use model::{Amount, ExpenseRecord, SheetName};
