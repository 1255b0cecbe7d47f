use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio_stream::StreamExt;

use crate::ledger::{Account, Transaction};

/// Interface for an account report writer
#[async_trait(?Send)]
pub trait AccountsReportWriter {
  /// Write the accounts information provided by the [`Iterator`] and return whether the operation was successful or not.
  async fn write_accounts_report<'a, T>(&'a mut self, report: T) -> Result<()>
  where
    T: Iterator<Item = Account> + 'a;
}

/// Interface for a writer of the transaction history
#[async_trait(?Send)]
pub trait TransactionsWriter {
  /// Write the entries provided by the [`Iterator`] in the order they are yielded.
  async fn write_transactions<'a, T>(&'a mut self, transactions: T) -> Result<()>
  where
    T: Iterator<Item = Transaction> + 'a;
}

/// An implementation of [`AccountsReportWriter`] and [`TransactionsWriter`] for the CSV format.
pub struct CsvWriter<W>(W);

impl<W> CsvWriter<W>
where
  W: AsyncWrite + Unpin + Send + Sync,
{
  pub fn new(writer: W) -> Self {
    Self(writer)
  }
}

#[async_trait(?Send)]
impl<W> AccountsReportWriter for CsvWriter<W>
where
  W: AsyncWrite + Unpin + Send + Sync,
{
  async fn write_accounts_report<'a, T>(&'a mut self, report: T) -> Result<()>
  where
    T: Iterator<Item = Account> + 'a,
  {
    let mut report = Box::pin(tokio_stream::iter(
      report.map(super::account::AccountReport::from),
    ));

    let mut serializer = csv_async::AsyncSerializer::from_writer(&mut self.0);
    while let Some(account_report) = report.next().await {
      serializer.serialize(account_report).await?;
    }
    Ok(())
  }
}

#[async_trait(?Send)]
impl<W> TransactionsWriter for CsvWriter<W>
where
  W: AsyncWrite + Unpin + Send + Sync,
{
  async fn write_transactions<'a, T>(&'a mut self, transactions: T) -> Result<()>
  where
    T: Iterator<Item = Transaction> + 'a,
  {
    let mut records = Box::pin(tokio_stream::iter(
      transactions.map(super::transaction::TransactionRecord::from),
    ));

    let mut serializer = csv_async::AsyncSerializer::from_writer(&mut self.0);
    while let Some(record) = records.next().await {
      serializer.serialize(record).await?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {

  use chrono::{TimeZone, Utc};
  use std::io::Cursor;
  use std::iter;

  use super::*;
  use crate::ledger::{AccountId, Amount, NewTransaction};

  fn account(id: &str, minor_units: i64) -> Account {
    Account {
      id: AccountId::parse(id).unwrap(),
      balance: Amount::from_minor_units(minor_units),
      opened_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn write_accounts_report_fails() {
    let buff: &mut [u8] = &mut [0u8, 0, 0, 0];
    let mut buffer = Cursor::new(buff);
    let mut writer = CsvWriter::new(&mut buffer);

    let report = vec![account("alice", 10000), account("bob", 9000)].into_iter();

    let result = writer.write_accounts_report(report).await;

    assert!(result.is_err());
  }

  #[tokio::test]
  async fn write_accounts_empty() {
    let mut buffer = Vec::<u8>::with_capacity(1024);
    let mut writer = CsvWriter::new(&mut buffer);

    let result = writer.write_accounts_report(iter::empty()).await;

    assert!(result.is_ok());
    assert_eq!(String::from_utf8_lossy(buffer.as_slice()), "".to_string())
  }

  #[tokio::test]
  async fn write_accounts_report_success() {
    let mut buffer = Vec::<u8>::with_capacity(1024);
    let mut writer = CsvWriter::new(&mut buffer);

    let report = vec![account("alice", 3000), account("bob", 5)].into_iter();

    let result = writer.write_accounts_report(report).await;

    assert!(result.is_ok());
    assert_eq!(
      String::from_utf8_lossy(buffer.as_slice()),
      "customer,balance\nalice,30.00\nbob,0.05\n".to_string()
    )
  }

  #[tokio::test]
  async fn write_transactions_success() {
    let mut buffer = Vec::<u8>::with_capacity(1024);
    let mut writer = CsvWriter::new(&mut buffer);
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let alice = AccountId::parse("alice").unwrap();
    let bob = AccountId::parse("bob").unwrap();

    let transactions = vec![
      NewTransaction::transfer_out(alice.clone(), bob, Amount::from_minor_units(2000))
        .into_transaction(2, created_at),
      NewTransaction::deposit(alice, Amount::from_minor_units(5000))
        .into_transaction(1, created_at),
    ]
    .into_iter();

    let result = writer.write_transactions(transactions).await;

    assert!(result.is_ok());
    assert_eq!(
      String::from_utf8_lossy(buffer.as_slice()),
      concat!(
        "id,customer,type,amount,counterparty,created_at\n",
        "2,alice,TRANSFER,20.00,bob,2024-03-01T09:00:00+00:00\n",
        "1,alice,DEPOSIT,50.00,,2024-03-01T09:00:00+00:00\n",
      )
      .to_string()
    )
  }
}
