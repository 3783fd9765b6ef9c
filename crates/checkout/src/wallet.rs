//! Store-credit wallet operations.

use std::sync::Arc;

use common::UserId;
use domain::Money;
use store::Store;

use crate::error::{CheckoutError, Result};

/// Service for per-user store-credit balances.
///
/// Refunds from canceled or returned orders land here as credits.
pub struct WalletService<S> {
    store: Arc<S>,
}

impl<S: Store> WalletService<S> {
    /// Creates a new wallet service over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns the user's balance; users without a wallet row have zero.
    pub async fn balance(&self, user: UserId) -> Result<Money> {
        Ok(self.store.wallet_balance(user).await?)
    }

    /// Credits the wallet with a positive amount.
    #[tracing::instrument(skip(self))]
    pub async fn credit(&self, user: UserId, amount: Money) -> Result<Money> {
        if !amount.is_positive() {
            return Err(CheckoutError::InvalidArgument(
                "credit amount must be positive".to_string(),
            ));
        }
        let balance = self.store.credit_wallet(user, amount).await?;
        tracing::debug!(%user, %amount, %balance, "wallet credited");
        Ok(balance)
    }

    /// Debits the wallet with a positive amount.
    ///
    /// Fails with `InsufficientFunds` rather than letting the balance go
    /// negative.
    #[tracing::instrument(skip(self))]
    pub async fn debit(&self, user: UserId, amount: Money) -> Result<Money> {
        if !amount.is_positive() {
            return Err(CheckoutError::InvalidArgument(
                "debit amount must be positive".to_string(),
            ));
        }
        let balance = self.store.debit_wallet(user, amount).await?;
        tracing::debug!(%user, %amount, %balance, "wallet debited");
        Ok(balance)
    }
}
