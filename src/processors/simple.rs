use anyhow::Result;
use futures::TryStreamExt;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::io::{AccountsReportWriter, CommandsReader, TransactionsWriter};
use crate::ledger::{self, history, Ledger, LedgerCommand};

/// Counters of what happened to the commands of a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
  /// Commands committed by the ledger.
  pub applied: usize,
  /// Commands the ledger rejected, e.g. for insufficient funds.
  pub rejected: usize,
  /// Input that could not be read as a command.
  pub malformed: usize,
}

/// This is a simple processor of ledger commands that
/// - reads commands from a [`CommandsReader`]
/// - applies them one by one to a [`Ledger`]
/// - writes a report including the balance of every account using a [`AccountsReportWriter`]
///
/// The idea is that all those components can be replaced with different implementations.
///
/// This processor tries to be as resilient as possible, meaning that:
/// - errors from the commands reader will be logged and skipped
/// - errors from the ledger will be logged with their code and skipped
///
/// Every ledger operation is atomic, so a rejected command never leaves partial effects behind
/// and the following commands see a consistent state.
///
pub async fn run<R, L, W>(
  mut commands_reader: R,
  ledger: &L,
  mut accounts_report_writer: W,
) -> Result<Summary>
where
  R: CommandsReader,
  L: Ledger + ?Sized,
  W: AccountsReportWriter,
{
  let mut summary = Summary::default();
  let mut commands = commands_reader.read_commands();

  while let Some(maybe_command) = commands.next().await {
    match maybe_command {
      Ok(command) => match execute(ledger, command).await {
        Ok(message) => {
          summary.applied += 1;
          debug!(%message, "Command applied");
        }
        Err(err) => {
          summary.rejected += 1;
          warn!(code = err.code(), error = %err, "Command rejected");
        }
      },
      Err(err) => {
        summary.malformed += 1;
        warn!(error = %err, "Skipping malformed command");
      }
    }
  }

  let accounts = ledger.accounts_report().await?;
  accounts_report_writer
    .write_accounts_report(accounts.into_iter())
    .await?;

  info!(
    applied = summary.applied,
    rejected = summary.rejected,
    malformed = summary.malformed,
    "Commands processed"
  );
  Ok(summary)
}

/// Applies a single command and returns the message meant for the customer.
pub async fn execute<L>(ledger: &L, command: LedgerCommand) -> ledger::Result<String>
where
  L: Ledger + ?Sized,
{
  match command {
    LedgerCommand::Open { account_id } => ledger
      .open_account(account_id)
      .await
      .map(|account| format!("Opened account {}", account.id)),
    LedgerCommand::Deposit { account_id, amount } => ledger
      .deposit(account_id, amount)
      .await
      .map(|receipt| receipt.message),
    LedgerCommand::Withdraw { account_id, amount } => ledger
      .withdraw(account_id, amount)
      .await
      .map(|receipt| receipt.message),
    LedgerCommand::Transfer {
      sender_id,
      recipient_id,
      amount,
    } => ledger
      .transfer(sender_id, recipient_id, amount)
      .await
      .map(|receipt| receipt.message),
  }
}

/// Writes the full history of every account, account by account and most recent entries first,
/// walking each history `page_size` entries at a time. Returns the number of entries written.
pub async fn export_history<L, W>(
  ledger: &L,
  mut transactions_writer: W,
  page_size: usize,
) -> Result<usize>
where
  L: Ledger + ?Sized,
  W: TransactionsWriter,
{
  let mut entries = Vec::new();
  for account in ledger.accounts_report().await? {
    let account_history = history(ledger, account.id, page_size, 0)
      .try_collect::<Vec<_>>()
      .await?;
    entries.extend(account_history);
  }

  let count = entries.len();
  transactions_writer
    .write_transactions(entries.into_iter())
    .await?;
  info!(entries = count, "History exported");
  Ok(count)
}
