use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::info;

use kodbank_ledger::config::LedgerConfig;
use kodbank_ledger::io::{CsvCommandsReader, CsvWriter};
use kodbank_ledger::ledger::{LedgerEngine, MemoryLedgerStore};
use kodbank_ledger::{processors, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
  let config = LedgerConfig::from_env();
  telemetry::init(&config);
  config.validate().map_err(anyhow::Error::msg)?;

  let reader = get_commands_async_read().await?;
  let commands_reader = CsvCommandsReader::new(reader);
  let ledger = LedgerEngine::new(Arc::new(MemoryLedgerStore::new()), &config);

  let mut stdout = tokio::io::stdout();
  let summary =
    processors::simple::run(commands_reader, &ledger, CsvWriter::new(&mut stdout)).await?;
  stdout.flush().await?;
  info!(?summary, "Batch finished");

  if let Some(path) = config.history_path.as_ref() {
    let mut file = tokio::fs::File::create(path).await?;
    processors::simple::export_history(&ledger, CsvWriter::new(&mut file), config.history_page_size)
      .await?;
    file.flush().await?;
    info!(path = %path.display(), "History written");
  }

  Ok(())
}

type CommandsAsyncRead = Box<dyn AsyncRead + Unpin + Send + Sync>;

/// This allows to use either a file if the path is specified in the command line,
/// or the stdin otherwise, which might be more convenient for pipe the data.
async fn get_commands_async_read() -> Result<CommandsAsyncRead> {
  match std::env::args().nth(1) {
    Some(path) => tokio::fs::File::open(path)
      .await
      .map(|file| Box::new(file) as CommandsAsyncRead)
      .map_err(anyhow::Error::from),
    None => Ok(Box::new(tokio::io::stdin()) as CommandsAsyncRead),
  }
}
