use std::convert::TryFrom;

use anyhow::Result;
use tokio::io::AsyncRead;
use tokio_stream::{Stream, StreamExt};

use crate::ledger::LedgerCommand;

const COMMAND_FIELDS: usize = 4;

/// Interface to read ledger commands from an external source
pub trait CommandsReader {
  /// Read commands and return an [`Stream`] of possibly successful commands.
  /// Each item yielded by the stream is either `Ok` if the command was read successfully,
  /// or `Err` if there was any kind of problem (like wrong format).
  fn read_commands<'a>(&'a mut self) -> Box<dyn Stream<Item = Result<LedgerCommand>> + Unpin + 'a>;
}

/// Implementation of [`CommandsReader`] for the CSV format.
pub struct CsvCommandsReader<R>(R);

impl<R> CsvCommandsReader<R>
where
  R: AsyncRead + Unpin + Send + Sync,
{
  pub fn new(reader: R) -> Self {
    Self(reader)
  }
}

impl<R> CommandsReader for CsvCommandsReader<R>
where
  R: AsyncRead + Unpin + Send + Sync,
{
  fn read_commands<'a>(&'a mut self) -> Box<dyn Stream<Item = Result<LedgerCommand>> + Unpin + 'a> {
    Box::new(
      csv_async::AsyncReaderBuilder::new()
        .flexible(true)
        .create_reader(&mut self.0)
        .into_records()
        .map(|maybe_record| {
          maybe_record
            .and_then(|mut record| {
              record.trim();
              while record.len() < COMMAND_FIELDS {
                record.push_field("");
              }
              record.deserialize::<super::command::Command>(None)
            })
            .map_err(anyhow::Error::from)
            .and_then(LedgerCommand::try_from)
        }),
    )
  }
}
