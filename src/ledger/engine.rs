use std::convert::TryFrom;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, Stream, TryStreamExt};
use tracing::{debug, info, instrument};

use super::{
  account::{Account, AccountId, AccountStore, Precondition},
  amount::Amount,
  error::{LedgerError, Result, StoreError},
  store::{LedgerStore, StoreTransaction},
  transaction::{NewTransaction, Page, Transaction, TransactionLog},
};
use crate::config::LedgerConfig;

/// Outcome of a committed deposit or withdrawal.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReceipt {
  pub new_balance: Amount,
  pub entry: Transaction,
  pub message: String,
}

/// Outcome of a committed transfer, with the entries recorded on both accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
  pub sender_balance: Amount,
  pub outgoing: Transaction,
  pub incoming: Transaction,
  pub message: String,
}

/// Interface exposed to the request handling layer.
///
/// Every mutating operation is atomic: either all of its balance changes and log entries
/// are committed, or none of them are and the operation fails with a [`LedgerError`].
#[async_trait]
pub trait Ledger {
  async fn open_account(&self, account_id: AccountId) -> Result<Account>;

  async fn deposit(&self, account_id: AccountId, amount: Amount) -> Result<BalanceReceipt>;

  async fn withdraw(&self, account_id: AccountId, amount: Amount) -> Result<BalanceReceipt>;

  async fn transfer(
    &self,
    sender_id: AccountId,
    recipient_id: AccountId,
    amount: Amount,
  ) -> Result<TransferReceipt>;

  async fn get_balance(&self, account_id: AccountId) -> Result<Amount>;

  async fn list_transactions(&self, account_id: AccountId, page: Page) -> Result<Vec<Transaction>>;

  async fn accounts_report(&self) -> Result<Vec<Account>>;
}

/// Implementation of the [`Ledger`] on top of any [`LedgerStore`].
///
/// The engine holds no state of its own, so any number of instances can share a store.
/// Each operation stages its changes in a unit of work within the operation budget and then
/// commits it. The commit is never interrupted, which means that a [`LedgerError::Timeout`]
/// always implies that nothing was committed. Reads are bounded by the same budget.
#[derive(Debug)]
pub struct LedgerEngine<S> {
  store: Arc<S>,
  operation_timeout: Duration,
}

type Unit<'a> = Box<dyn StoreTransaction + 'a>;

impl<S> LedgerEngine<S>
where
  S: LedgerStore,
{
  pub fn new(store: Arc<S>, config: &LedgerConfig) -> Self {
    Self {
      store,
      operation_timeout: config.operation_timeout,
    }
  }

  async fn within_budget<F, T>(&self, stage: F) -> Result<T>
  where
    F: Future<Output = Result<T>>,
  {
    tokio::time::timeout(self.operation_timeout, stage)
      .await
      .map_err(|_| LedgerError::Timeout(self.operation_timeout))?
  }

  async fn stage_deposit(
    &self,
    account_id: &AccountId,
    amount: Amount,
  ) -> Result<(Unit<'_>, Amount)> {
    let mut unit = self.store.begin(&[account_id.clone()]).await?;
    let new_balance = unit
      .adjust_balance(account_id, amount, Precondition::Always)
      .await?;
    unit
      .append(NewTransaction::deposit(account_id.clone(), amount))
      .await?;
    Ok((unit, new_balance))
  }

  async fn stage_withdraw(
    &self,
    account_id: &AccountId,
    amount: Amount,
  ) -> Result<(Unit<'_>, Amount)> {
    let mut unit = self.store.begin(&[account_id.clone()]).await?;
    let new_balance = unit
      .adjust_balance(account_id, -amount, Precondition::AtLeast(amount))
      .await?;
    unit
      .append(NewTransaction::withdraw(account_id.clone(), amount))
      .await?;
    Ok((unit, new_balance))
  }

  async fn stage_transfer(
    &self,
    sender_id: &AccountId,
    recipient_id: &AccountId,
    amount: Amount,
  ) -> Result<(Unit<'_>, Amount)> {
    let mut unit = self
      .store
      .begin(&[sender_id.clone(), recipient_id.clone()])
      .await
      .map_err(|err| match err {
        StoreError::AccountNotFound(account_id) if &account_id == recipient_id => {
          LedgerError::RecipientNotFound(account_id)
        }
        other => other.into(),
      })?;

    let sender_balance = unit
      .adjust_balance(sender_id, -amount, Precondition::AtLeast(amount))
      .await?;
    unit
      .adjust_balance(recipient_id, amount, Precondition::Always)
      .await?;

    unit
      .append(NewTransaction::transfer_out(
        sender_id.clone(),
        recipient_id.clone(),
        amount,
      ))
      .await?;
    unit
      .append(NewTransaction::transfer_in(
        recipient_id.clone(),
        sender_id.clone(),
        amount,
      ))
      .await?;

    Ok((unit, sender_balance))
  }
}

/// Takes the entries of a committed unit, which come back in the order they were appended.
fn committed_entries<const N: usize>(entries: Vec<Transaction>) -> Result<[Transaction; N]> {
  <[Transaction; N]>::try_from(entries).map_err(|entries| {
    LedgerError::StorageUnavailable(format!(
      "expected {} committed entries, got {}",
      N,
      entries.len()
    ))
  })
}

#[async_trait]
impl<S> Ledger for LedgerEngine<S>
where
  S: LedgerStore,
{
  #[instrument(skip(self), fields(account = %account_id))]
  async fn open_account(&self, account_id: AccountId) -> Result<Account> {
    let account = self.store.open_account(&account_id).await?;
    info!("Account opened");
    Ok(account)
  }

  #[instrument(skip(self), fields(account = %account_id, amount = %amount))]
  async fn deposit(&self, account_id: AccountId, amount: Amount) -> Result<BalanceReceipt> {
    let amount = amount.require_positive()?;

    let (unit, new_balance) = self
      .within_budget(self.stage_deposit(&account_id, amount))
      .await?;
    let [entry] = committed_entries::<1>(unit.commit().await?)?;

    info!(balance = %new_balance, transaction = entry.id, "Deposit committed");
    Ok(BalanceReceipt {
      new_balance,
      entry,
      message: format!("Deposited {} successfully", amount),
    })
  }

  #[instrument(skip(self), fields(account = %account_id, amount = %amount))]
  async fn withdraw(&self, account_id: AccountId, amount: Amount) -> Result<BalanceReceipt> {
    let amount = amount.require_positive()?;

    let (unit, new_balance) = self
      .within_budget(self.stage_withdraw(&account_id, amount))
      .await?;
    let [entry] = committed_entries::<1>(unit.commit().await?)?;

    info!(balance = %new_balance, transaction = entry.id, "Withdrawal committed");
    Ok(BalanceReceipt {
      new_balance,
      entry,
      message: format!("Withdrew {} successfully", amount),
    })
  }

  #[instrument(
    skip(self),
    fields(sender = %sender_id, recipient = %recipient_id, amount = %amount)
  )]
  async fn transfer(
    &self,
    sender_id: AccountId,
    recipient_id: AccountId,
    amount: Amount,
  ) -> Result<TransferReceipt> {
    let amount = amount.require_positive()?;
    if sender_id == recipient_id {
      return Err(LedgerError::InvalidRecipient(format!(
        "can not transfer from {} to itself",
        sender_id
      )));
    }
    if !self.store.account_exists(&recipient_id).await? {
      return Err(LedgerError::RecipientNotFound(recipient_id));
    }

    let (unit, sender_balance) = self
      .within_budget(self.stage_transfer(&sender_id, &recipient_id, amount))
      .await?;
    let [outgoing, incoming] = committed_entries::<2>(unit.commit().await?)?;

    info!(
      balance = %sender_balance,
      outgoing = outgoing.id,
      incoming = incoming.id,
      "Transfer committed"
    );
    Ok(TransferReceipt {
      sender_balance,
      outgoing,
      incoming,
      message: format!("Transferred {} to {}", amount, recipient_id),
    })
  }

  async fn get_balance(&self, account_id: AccountId) -> Result<Amount> {
    self
      .within_budget(async {
        self
          .store
          .get_balance(&account_id)
          .await
          .map_err(LedgerError::from)
      })
      .await
  }

  async fn list_transactions(&self, account_id: AccountId, page: Page) -> Result<Vec<Transaction>> {
    debug!(account = %account_id, ?page, "Listing transactions");
    self
      .within_budget(async {
        self
          .store
          .list_by_account(&account_id, page)
          .await
          .map_err(LedgerError::from)
      })
      .await
  }

  async fn accounts_report(&self) -> Result<Vec<Account>> {
    self
      .within_budget(async { self.store.accounts().await.map_err(LedgerError::from) })
      .await
  }
}

/// Lazily walks the history of an account, most recent entries first, fetching
/// `page_size` entries at a time starting at `offset`.
///
/// Pages are only requested as the stream is polled, and a walk can be resumed
/// later by starting a new one at the number of entries already seen.
pub fn history<'a, L>(
  ledger: &'a L,
  account_id: AccountId,
  page_size: usize,
  offset: usize,
) -> impl Stream<Item = Result<Transaction>> + 'a
where
  L: Ledger + ?Sized,
{
  let page_size = page_size.max(1);
  stream::try_unfold(Some(offset), move |next_offset| {
    let account_id = account_id.clone();
    async move {
      let offset = match next_offset {
        Some(offset) => offset,
        None => return Ok(None),
      };
      let page = ledger
        .list_transactions(account_id, Page::new(page_size, offset))
        .await?;
      let next_offset = if page.len() < page_size {
        None
      } else {
        Some(offset + page.len())
      };
      let entries = stream::iter(page.into_iter().map(Ok::<Transaction, LedgerError>));
      Ok::<_, LedgerError>(Some((entries, next_offset)))
    }
  })
  .try_flatten()
}
