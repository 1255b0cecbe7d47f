use super::{account::AccountId, amount::Amount};

/// Representation of the operations a batch of commands can request from a ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
  Open {
    account_id: AccountId,
  },
  Deposit {
    account_id: AccountId,
    amount: Amount,
  },
  Withdraw {
    account_id: AccountId,
    amount: Amount,
  },
  Transfer {
    sender_id: AccountId,
    recipient_id: AccountId,
    amount: Amount,
  },
}
