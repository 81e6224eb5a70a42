use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use super::value_objects::{InvoiceStatus, PaymentStatus, ValueObjectError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceEntityError {
  #[error("Invalid status transition from {from:?} to {to:?}")]
  InvalidStatusTransition {
    from: InvoiceStatus,
    to: InvoiceStatus,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentEntityError {
  #[error("Payment amount must be greater than zero")]
  NonPositiveAmount,

  #[error("Invalid payment status transition from {from:?} to {to:?}")]
  InvalidStatusTransition {
    from: PaymentStatus,
    to: PaymentStatus,
  },
}

#[derive(Debug, Error)]
pub enum BillingError {
  #[error("Validation error: {0}")]
  Validation(#[from] ValueObjectError),

  #[error("Client not found: {0}")]
  ClientNotFound(Uuid),

  #[error("Invoice not found: {0}")]
  InvoiceNotFound(Uuid),

  #[error("Payment not found: {0}")]
  PaymentNotFound(Uuid),

  #[error("Client name already exists for this user")]
  ClientNameAlreadyExists,

  #[error("Invoice number '{0}' already exists")]
  InvoiceNumberAlreadyExists(String),

  #[error("Cannot delete client {client_id}: {invoice_count} invoices reference it")]
  ClientHasInvoices { client_id: Uuid, invoice_count: i64 },

  #[error("At least one line item is required")]
  NoLineItems,

  #[error("Due date {due_date} cannot be before issue date {issue_date}")]
  InvalidDueDate {
    issue_date: NaiveDate,
    due_date: NaiveDate,
  },

  #[error("Cannot modify invoice: {0}")]
  CannotModifyInvoice(String),

  #[error("Invalid invoice status transition: {0}")]
  InvalidStatusTransition(#[from] InvoiceEntityError),

  #[error("Invalid payment: {0}")]
  InvalidPayment(#[from] PaymentEntityError),

  #[error("Permission denied: {0}")]
  PermissionDenied(String),

  #[error("Currency mismatch: expected {expected}, got {actual}")]
  CurrencyMismatch { expected: String, actual: String },

  #[error("Reconciliation already in progress for invoice {0}")]
  ReconciliationConflict(Uuid),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl BillingError {
  /// Validation and ownership failures are caller mistakes; a
  /// ReconciliationConflict is the only error worth an automatic retry.
  pub fn is_retryable(&self) -> bool {
    matches!(self, BillingError::ReconciliationConflict(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_only_reconciliation_conflict_is_retryable() {
    let conflict = BillingError::ReconciliationConflict(Uuid::new_v4());
    assert!(conflict.is_retryable());

    assert!(!BillingError::NoLineItems.is_retryable());
    assert!(!BillingError::ClientNotFound(Uuid::new_v4()).is_retryable());
  }
}
