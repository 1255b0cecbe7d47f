use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use super::{account::AccountId, amount::Amount};

pub type Result<T> = core::result::Result<T, LedgerError>;

pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// Reasons why a value can not be used as an [`Amount`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AmountError {
  #[error("Malformed amount: {0:?}")]
  Malformed(String),

  #[error("Amount {0} is more precise than the currency minor unit")]
  TooPrecise(Decimal),

  #[error("Amount must be positive, got {0}")]
  Negative(Amount),

  #[error("Amount must be greater than zero")]
  Zero,

  #[error("Amount is out of range")]
  OutOfRange,
}

/// Reasons why a string can not be used as an [`AccountId`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AccountIdError {
  #[error("Account id must not be empty")]
  Empty,

  #[error("Account id {0:?} is longer than 64 characters")]
  TooLong(String),

  #[error("Account id {0:?} contains whitespace or control characters")]
  InvalidCharacters(String),
}

/// Failures reported by a [`super::LedgerStore`] and the units of work it hands out.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
  #[error("Account not found: {0}")]
  AccountNotFound(AccountId),

  #[error("Account already exists: {0}")]
  AccountExists(AccountId),

  #[error("Precondition failed for account {account_id} with balance {balance}")]
  PreconditionFailed { account_id: AccountId, balance: Amount },

  #[error("Account {0} was not locked by this unit of work")]
  OutOfScope(AccountId),

  #[error("Balance of account {0} would overflow")]
  BalanceOverflow(AccountId),

  #[error("Balance of account {0} would become negative")]
  NegativeBalance(AccountId),

  #[error("Storage unavailable: {0}")]
  Unavailable(String),
}

/// Errors surfaced to the callers of the ledger.
///
/// Every variant maps to a stable [`LedgerError::code`], while the `Display` implementation
/// is the human readable message. None of them leaves balances or the log partially mutated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
  #[error("Invalid amount: {0}")]
  InvalidAmount(#[from] AmountError),

  #[error("Insufficient funds in account {account_id}")]
  InsufficientFunds { account_id: AccountId, balance: Amount },

  #[error("Account not found: {0}")]
  AccountNotFound(AccountId),

  #[error("Recipient not found: {0}")]
  RecipientNotFound(AccountId),

  #[error("Invalid recipient: {0}")]
  InvalidRecipient(String),

  #[error("Invalid account id: {0}")]
  InvalidAccountId(#[from] AccountIdError),

  #[error("Account already exists: {0}")]
  AccountExists(AccountId),

  #[error("Storage unavailable: {0}")]
  StorageUnavailable(String),

  #[error("Operation timed out after {0:?} and was not committed")]
  Timeout(Duration),
}

impl LedgerError {
  pub fn code(&self) -> &'static str {
    match self {
      LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
      LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
      LedgerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
      LedgerError::RecipientNotFound(_) => "RECIPIENT_NOT_FOUND",
      LedgerError::InvalidRecipient(_) => "INVALID_RECIPIENT",
      LedgerError::InvalidAccountId(_) => "INVALID_ACCOUNT_ID",
      LedgerError::AccountExists(_) => "ACCOUNT_EXISTS",
      LedgerError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
      LedgerError::Timeout(_) => "TIMEOUT",
    }
  }

  /// Whether the whole operation can be submitted again.
  /// Only infrastructure failures qualify, and they never leave partial effects behind.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      LedgerError::StorageUnavailable(_) | LedgerError::Timeout(_)
    )
  }
}

impl From<StoreError> for LedgerError {
  fn from(error: StoreError) -> Self {
    match error {
      StoreError::AccountNotFound(account_id) => LedgerError::AccountNotFound(account_id),
      StoreError::AccountExists(account_id) => LedgerError::AccountExists(account_id),
      StoreError::PreconditionFailed {
        account_id,
        balance,
      } => LedgerError::InsufficientFunds {
        account_id,
        balance,
      },
      StoreError::BalanceOverflow(_) => LedgerError::InvalidAmount(AmountError::OutOfRange),
      other => LedgerError::StorageUnavailable(other.to_string()),
    }
  }
}
