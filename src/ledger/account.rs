use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
  amount::Amount,
  error::{AccountIdError, LedgerError, StoreResult},
};

const MAX_ACCOUNT_ID_LEN: usize = 64;

/// Opaque customer identifier that owns an account.
///
/// Identifiers are ordered lexicographically, which is the order in which
/// account rows are locked when an operation spans more than one account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
  pub fn parse(raw: &str) -> Result<Self, AccountIdError> {
    let id = raw.trim();
    if id.is_empty() {
      Err(AccountIdError::Empty)
    } else if id.chars().count() > MAX_ACCOUNT_ID_LEN {
      Err(AccountIdError::TooLong(id.to_string()))
    } else if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
      Err(AccountIdError::InvalidCharacters(id.to_string()))
    } else {
      Ok(Self(id.to_string()))
    }
  }

  /// Same as [`AccountId::parse`] but for the recipient of a transfer,
  /// where a malformed identifier is reported as an invalid recipient.
  pub fn parse_recipient(raw: &str) -> Result<Self, LedgerError> {
    Self::parse(raw).map_err(|err| LedgerError::InvalidRecipient(err.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for AccountId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for AccountId {
  type Err = AccountIdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for AccountId {
  type Error = AccountIdError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<AccountId> for String {
  fn from(account_id: AccountId) -> Self {
    account_id.0
  }
}

/// A snapshot of an account as stored by a [`super::LedgerStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
  pub id: AccountId,
  pub balance: Amount,
  pub opened_at: DateTime<Utc>,
}

/// Predicate over the current balance that gates a balance adjustment.
///
/// It is a closed set so that a store can evaluate it next to the data,
/// e.g. as `WHERE balance >= $1` in a SQL backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
  Always,
  AtLeast(Amount),
}

impl Precondition {
  pub fn holds(&self, balance: Amount) -> bool {
    match self {
      Precondition::Always => true,
      Precondition::AtLeast(required) => balance >= *required,
    }
  }
}

/// Balance operations available inside a unit of work.
///
/// Implementations must make `adjust_balance` a single read-check-write step for the account:
/// two adjustments of the same account are never interleaved.
#[async_trait]
pub trait AccountStore {
  /// Current balance of the account, including the changes staged by this unit of work.
  async fn get_balance(&mut self, account_id: &AccountId) -> StoreResult<Amount>;

  /// Applies `delta` to the balance only if `precondition` holds for the current balance,
  /// returning the new balance. On failure the balance is left unchanged.
  async fn adjust_balance(
    &mut self,
    account_id: &AccountId,
    delta: Amount,
    precondition: Precondition,
  ) -> StoreResult<Amount>;
}
