use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::entities::{Client, Invoice, InvoiceLineItem, Payment};
use super::errors::BillingError;
use super::value_objects::InvoiceStatus;

#[async_trait]
pub trait ClientRepository: Send + Sync {
  async fn create(&self, client: Client) -> Result<Client, BillingError>;
  async fn update(&self, client: Client) -> Result<Client, BillingError>;
  async fn delete(&self, id: Uuid) -> Result<(), BillingError>;
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Client>, BillingError>;
  async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Client>, BillingError>;
  async fn exists_by_name(
    &self,
    user_id: Uuid,
    company_name: &str,
    exclude_id: Option<Uuid>,
  ) -> Result<bool, BillingError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
  /// Persist a new invoice together with its line items as one atomic
  /// write; on failure nothing is stored.
  async fn create_with_items(
    &self,
    invoice: Invoice,
    line_items: Vec<InvoiceLineItem>,
  ) -> Result<(Invoice, Vec<InvoiceLineItem>), BillingError>;
  /// Replace the invoice row and its full line item set as one atomic
  /// write; on failure the previous state survives intact.
  async fn update_with_items(
    &self,
    invoice: Invoice,
    line_items: Vec<InvoiceLineItem>,
  ) -> Result<(Invoice, Vec<InvoiceLineItem>), BillingError>;
  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError>;
  /// Line items go with the invoice; payments are removed by the caller.
  async fn delete(&self, id: Uuid) -> Result<(), BillingError>;
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError>;
  async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Invoice>, BillingError>;
  async fn find_by_user_and_status(
    &self,
    user_id: Uuid,
    status: InvoiceStatus,
  ) -> Result<Vec<Invoice>, BillingError>;
  async fn find_by_user_and_client(
    &self,
    user_id: Uuid,
    client_id: Uuid,
  ) -> Result<Vec<Invoice>, BillingError>;
  /// Sent invoices whose due date has passed, for the overdue sweep.
  async fn find_due_before(
    &self,
    user_id: Uuid,
    current_date: NaiveDate,
  ) -> Result<Vec<Invoice>, BillingError>;
  async fn count_by_client_id(&self, client_id: Uuid) -> Result<i64, BillingError>;
}

// Writes go through InvoiceRepository so that an invoice and its items are
// always stored or replaced together.
#[async_trait]
pub trait InvoiceLineItemRepository: Send + Sync {
  async fn find_by_invoice_id(
    &self,
    invoice_id: Uuid,
  ) -> Result<Vec<InvoiceLineItem>, BillingError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
  async fn create(&self, payment: Payment) -> Result<Payment, BillingError>;
  async fn update(&self, payment: Payment) -> Result<Payment, BillingError>;
  async fn delete(&self, id: Uuid) -> Result<(), BillingError>;
  /// Removes every payment recorded against the invoice, for invoice
  /// deletion.
  async fn delete_by_invoice_id(&self, invoice_id: Uuid) -> Result<(), BillingError>;
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BillingError>;
  async fn find_by_invoice_id(&self, invoice_id: Uuid) -> Result<Vec<Payment>, BillingError>;
  /// Payments that count toward invoice coverage (status = completed).
  async fn find_completed_by_invoice_id(
    &self,
    invoice_id: Uuid,
  ) -> Result<Vec<Payment>, BillingError>;
}

/// Atomic per-year invoice number allocation. The source derived the next
/// number from a document count, which loses uniqueness under concurrent
/// creation; implementations must be increment-and-return.
#[async_trait]
pub trait InvoiceNumberSequence: Send + Sync {
  async fn next(&self, year: i32) -> Result<i64, BillingError>;
}
