use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::{self, TransactionId};

/// A history entry as shown to customers, used to serialize into a CSV file
#[derive(Debug, PartialEq, Serialize)]
pub struct TransactionRecord {
  id: TransactionId,
  customer: String,
  #[serde(rename = "type")]
  kind: &'static str,
  amount: Decimal,
  counterparty: Option<String>,
  created_at: String,
}

impl From<ledger::Transaction> for TransactionRecord {
  fn from(transaction: ledger::Transaction) -> Self {
    TransactionRecord {
      id: transaction.id,
      customer: transaction.account_id.into(),
      kind: transaction.kind.label(),
      amount: transaction.amount.to_decimal(),
      counterparty: transaction.counterparty_id.map(String::from),
      created_at: transaction.created_at.to_rfc3339(),
    }
  }
}
