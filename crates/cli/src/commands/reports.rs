//! Offline reports over an exported store document.
//!
//! The input is the JSON a backend stores for one store (the `data`
//! column in `PostgreSQL`, or the payload of the script's
//! `getStoreData` action).

use std::path::Path;

use thiserror::Error;

use souq_core::{CustomerProfile, Reconciliation, StoreData};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid store document: {0}")]
    Json(#[from] serde_json::Error),
}

fn load(path: &Path) -> Result<StoreData, ReportError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Customer profiles of the document's orders. Loyalty balances live in
/// the global document and are reported as zero.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn customers(path: &Path) -> Result<Vec<CustomerProfile>, ReportError> {
    let data = load(path)?;
    Ok(souq_core::customers::aggregate(&data.orders, &data.customers, None))
}

/// Reconcile the wallet's cached balance, optionally writing the fixed
/// document back.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or written.
pub fn reconcile(path: &Path, write: bool) -> Result<Reconciliation, ReportError> {
    let mut data = load(path)?;
    let result = data.wallet.reconcile();
    if result.drift.is_zero() {
        tracing::info!(balance = %result.derived_balance, "wallet balance consistent");
    } else {
        tracing::warn!(
            cached = ?result.cached_balance,
            derived = %result.derived_balance,
            drift = %result.drift,
            "wallet balance drift"
        );
    }
    if write {
        let json = serde_json::to_string_pretty(&data)?;
        std::fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), "store document updated");
    }
    Ok(result)
}
