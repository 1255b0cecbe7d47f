use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::ledger::{self, AccountId, Amount};

/// The types of commands supported by the reader
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
  Open,
  Deposit,
  Withdraw,
  Transfer,
}

/// A deserializable command
#[derive(Debug, Deserialize)]
pub struct Command {
  #[serde(rename = "type")]
  kind: CommandType,

  account: String,

  counterparty: Option<String>,

  amount: Option<Decimal>,
}

impl TryFrom<Command> for ledger::LedgerCommand {
  type Error = anyhow::Error;

  /// Conversion from a deserializable command into one that can be used by the domain logic.
  /// Identifiers and amount precision are validated here,
  /// the sign of amounts is left to the ledger.
  fn try_from(command: Command) -> Result<Self> {
    let account_id = AccountId::parse(&command.account)?;
    match command.kind {
      CommandType::Open => Ok(ledger::LedgerCommand::Open { account_id }),
      CommandType::Deposit => Ok(ledger::LedgerCommand::Deposit {
        account_id,
        amount: required_amount(command.amount)?,
      }),
      CommandType::Withdraw => Ok(ledger::LedgerCommand::Withdraw {
        account_id,
        amount: required_amount(command.amount)?,
      }),
      CommandType::Transfer => {
        let recipient = command
          .counterparty
          .ok_or_else(|| anyhow!("Transfer without counterparty"))?;
        Ok(ledger::LedgerCommand::Transfer {
          sender_id: account_id,
          recipient_id: AccountId::parse_recipient(&recipient)?,
          amount: required_amount(command.amount)?,
        })
      }
    }
  }
}

fn required_amount(amount: Option<Decimal>) -> Result<Amount> {
  let amount = amount.ok_or_else(|| anyhow!("Missing amount"))?;
  Ok(Amount::try_from(amount)?)
}
