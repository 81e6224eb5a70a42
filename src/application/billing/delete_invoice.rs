use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct DeleteInvoiceCommand {
  pub user_id: Uuid,
  pub invoice_id: Uuid,
}

pub struct DeleteInvoiceUseCase {
  billing_service: Arc<BillingService>,
}

impl DeleteInvoiceUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  /// Removes the invoice together with its line items and payments.
  pub async fn execute(&self, command: DeleteInvoiceCommand) -> Result<(), BillingError> {
    self
      .billing_service
      .delete_invoice(command.user_id, command.invoice_id)
      .await
  }
}
