//! The store wallet: an append-only ledger.
//!
//! The balance is always derived from the entries. Older blobs also carry
//! a cached `balance` field that some clients updated by hand; it is read
//! and written back for compatibility but never used for decisions, and
//! [`Wallet::reconcile`] resets it to the derived value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::types::{OrderId, TransactionCategory, TransactionId, TransactionKind};

/// One ledger entry. `amount` is always positive; `kind` gives the sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: TransactionCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    /// Set on entries that cancel an earlier one.
    #[serde(default)]
    pub reverses: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount with its sign applied.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Deposit => self.amount,
            TransactionKind::Withdrawal => -self.amount,
        }
    }
}

/// A ledger entry before it gets an id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub kind: TransactionKind,
    pub category: TransactionCategory,
    pub amount: Decimal,
    pub description: String,
}

impl Posting {
    #[must_use]
    pub fn withdrawal(category: TransactionCategory, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Withdrawal,
            category,
            amount,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn deposit(category: TransactionCategory, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Deposit,
            category,
            amount,
            description: description.into(),
        }
    }
}

/// Deposits and withdrawals of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    pub deposits: Decimal,
    pub withdrawals: Decimal,
}

/// Balance plus per-category totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub balance: Decimal,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
    pub by_category: BTreeMap<TransactionCategory, CategoryTotals>,
    pub transaction_count: usize,
}

/// Outcome of [`Wallet::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub cached_balance: Option<Decimal>,
    pub derived_balance: Decimal,
    /// `cached − derived`; zero when they agree or nothing was cached.
    pub drift: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Legacy cached balance; see the module docs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
}

impl Wallet {
    /// `Σ deposits − Σ withdrawals`. Independent of entry order.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.transactions.iter().map(Transaction::signed_amount).sum()
    }

    /// Append a posting. Zero postings are skipped and return `None`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAmount` for negative amounts.
    pub fn post(
        &mut self,
        posting: Posting,
        order_id: Option<OrderId>,
        at: DateTime<Utc>,
    ) -> Result<Option<&Transaction>, DomainError> {
        if posting.amount < Decimal::ZERO {
            return Err(DomainError::InvalidAmount(posting.amount));
        }
        if posting.amount.is_zero() {
            return Ok(None);
        }
        self.transactions.push(Transaction {
            id: TransactionId::generate(),
            kind: posting.kind,
            amount: posting.amount,
            category: posting.category,
            description: posting.description,
            order_id,
            reverses: None,
            created_at: at,
        });
        self.sync_cache();
        Ok(self.transactions.last())
    }

    /// Record a manual entry or expense. Unlike [`Self::post`], a zero
    /// amount is rejected.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAmount` unless the amount is positive.
    pub fn record(&mut self, posting: Posting, at: DateTime<Utc>) -> Result<Transaction, DomainError> {
        if posting.amount <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount(posting.amount));
        }
        self.post(posting, None, at)?
            .cloned()
            .ok_or_else(|| DomainError::Invalid("empty posting".to_string()))
    }

    /// Cancel an expense by appending a reversing deposit.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist, is not an expense, or
    /// was already reversed.
    pub fn reverse_expense(
        &mut self,
        id: &TransactionId,
        at: DateTime<Utc>,
    ) -> Result<Transaction, DomainError> {
        let original = self
            .transactions
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| DomainError::TransactionNotFound(id.clone()))?;
        if original.category != TransactionCategory::Expense
            || original.kind != TransactionKind::Withdrawal
        {
            return Err(DomainError::NotAnExpense(id.clone()));
        }
        if self.transactions.iter().any(|t| t.reverses.as_ref() == Some(id)) {
            return Err(DomainError::AlreadyReversed(id.clone()));
        }

        let reversal = Transaction {
            id: TransactionId::generate(),
            kind: TransactionKind::Deposit,
            amount: original.amount,
            category: TransactionCategory::Expense,
            description: format!("Reversal of: {}", original.description),
            order_id: None,
            reverses: Some(id.clone()),
            created_at: at,
        };
        self.transactions.push(reversal.clone());
        self.sync_cache();
        Ok(reversal)
    }

    /// Compare the cached balance with the derived one and reset the cache.
    pub fn reconcile(&mut self) -> Reconciliation {
        let derived = self.balance();
        let cached = self.balance;
        self.balance = Some(derived);
        Reconciliation {
            cached_balance: cached,
            derived_balance: derived,
            drift: cached.map_or(Decimal::ZERO, |c| c - derived),
        }
    }

    #[must_use]
    pub fn summary(&self) -> WalletSummary {
        let mut by_category: BTreeMap<TransactionCategory, CategoryTotals> = BTreeMap::new();
        let mut total_deposits = Decimal::ZERO;
        let mut total_withdrawals = Decimal::ZERO;

        for t in &self.transactions {
            let totals = by_category.entry(t.category).or_default();
            match t.kind {
                TransactionKind::Deposit => {
                    totals.deposits += t.amount;
                    total_deposits += t.amount;
                }
                TransactionKind::Withdrawal => {
                    totals.withdrawals += t.amount;
                    total_withdrawals += t.amount;
                }
            }
        }

        WalletSummary {
            balance: total_deposits - total_withdrawals,
            total_deposits,
            total_withdrawals,
            by_category,
            transaction_count: self.transactions.len(),
        }
    }

    // Only rewrite the legacy field when the blob already had one.
    fn sync_cache(&mut self) {
        if self.balance.is_some() {
            self.balance = Some(self.balance());
        }
    }
}
