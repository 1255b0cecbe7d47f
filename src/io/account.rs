use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::Account;

/// A report on an account state used to serialize into a CSV file
#[derive(Debug, PartialEq, Serialize)]
pub struct AccountReport {
  customer: String,
  balance: Decimal,
}

impl From<Account> for AccountReport {
  /// A conversion between the domain representation of an account into a serializable structure
  fn from(account: Account) -> Self {
    AccountReport {
      customer: account.id.into(),
      balance: account.balance.to_decimal(),
    }
  }
}
