use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{account::AccountId, amount::Amount, error::StoreResult};

/// Alias for a transaction ID
pub type TransactionId = u64;

/// Kinds of balance-affecting events recorded in the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
  Deposit,
  Withdraw,
  TransferOut,
  TransferIn,
}

impl TransactionKind {
  /// Label shown to customers, where both sides of a transfer are collapsed
  /// into `TRANSFER` (money sent) and `RECEIVED` (money received).
  pub fn label(&self) -> &'static str {
    match self {
      TransactionKind::Deposit => "DEPOSIT",
      TransactionKind::Withdraw => "WITHDRAW",
      TransactionKind::TransferOut => "TRANSFER",
      TransactionKind::TransferIn => "RECEIVED",
    }
  }

  /// Whether the entry increased the balance of its account.
  pub fn is_credit(&self) -> bool {
    match self {
      TransactionKind::Deposit | TransactionKind::TransferIn => true,
      TransactionKind::Withdraw | TransactionKind::TransferOut => false,
    }
  }
}

/// An entry to be appended to the log. The log assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
  account_id: AccountId,
  kind: TransactionKind,
  amount: Amount,
  counterparty_id: Option<AccountId>,
}

impl NewTransaction {
  pub fn deposit(account_id: AccountId, amount: Amount) -> Self {
    Self {
      account_id,
      kind: TransactionKind::Deposit,
      amount,
      counterparty_id: None,
    }
  }

  pub fn withdraw(account_id: AccountId, amount: Amount) -> Self {
    Self {
      account_id,
      kind: TransactionKind::Withdraw,
      amount,
      counterparty_id: None,
    }
  }

  pub fn transfer_out(account_id: AccountId, recipient_id: AccountId, amount: Amount) -> Self {
    Self {
      account_id,
      kind: TransactionKind::TransferOut,
      amount,
      counterparty_id: Some(recipient_id),
    }
  }

  pub fn transfer_in(account_id: AccountId, sender_id: AccountId, amount: Amount) -> Self {
    Self {
      account_id,
      kind: TransactionKind::TransferIn,
      amount,
      counterparty_id: Some(sender_id),
    }
  }

  pub fn account_id(&self) -> &AccountId {
    &self.account_id
  }

  pub fn into_transaction(self, id: TransactionId, created_at: DateTime<Utc>) -> Transaction {
    Transaction {
      id,
      account_id: self.account_id,
      kind: self.kind,
      amount: self.amount,
      counterparty_id: self.counterparty_id,
      created_at,
    }
  }
}

/// A committed entry of the transaction log. Entries are never edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
  pub id: TransactionId,
  pub account_id: AccountId,
  pub kind: TransactionKind,
  pub amount: Amount,
  pub counterparty_id: Option<AccountId>,
  pub created_at: DateTime<Utc>,
}

/// A window over the history of an account, most recent entries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub limit: Option<usize>,
  pub offset: usize,
}

impl Page {
  pub fn new(limit: usize, offset: usize) -> Self {
    Self {
      limit: Some(limit),
      offset,
    }
  }

  pub fn all() -> Self {
    Self {
      limit: None,
      offset: 0,
    }
  }

  /// The `count` most recent entries, as shown on an account overview.
  pub fn recent(count: usize) -> Self {
    Self::new(count, 0)
  }

  /// Applies the window to entries already sorted from the most recent.
  pub fn slice<I, T>(&self, entries: I) -> Vec<T>
  where
    I: Iterator<Item = T>,
  {
    let entries = entries.skip(self.offset);
    match self.limit {
      Some(limit) => entries.take(limit).collect(),
      None => entries.collect(),
    }
  }
}

impl Default for Page {
  fn default() -> Self {
    Self::all()
  }
}

/// Append-only log of balance-affecting events, available inside a unit of work.
#[async_trait]
pub trait TransactionLog {
  /// Stages the entry. Its id and timestamp are assigned when the unit of work commits,
  /// which is also when it becomes visible to readers.
  async fn append(&mut self, entry: NewTransaction) -> StoreResult<()>;
}
