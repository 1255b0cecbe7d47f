//! This module contains all the components needed to read and write data from files (specifically CSV)
//!
//! The [`reader`] module contains a reader of ledger commands from CSV and the [`writer`] module contains
//! writers for the accounts report and the transaction history into CSV.
//! It would be possible to add new file formats by implementing the traits [`CommandsReader`],
//! [`AccountsReportWriter`] and [`TransactionsWriter`] respectively.
//!
//! The [`account`], [`command`] and [`transaction`] modules contain structs needed to serialize/deserialize data.
//! They are intentionally duplicated from the domain model to decouple the IO details from the domain logic and allow their evolution independently.
//!

mod account;
mod command;
mod reader;
mod transaction;
mod writer;

pub use reader::{CommandsReader, CsvCommandsReader};
pub use writer::{AccountsReportWriter, CsvWriter, TransactionsWriter};
