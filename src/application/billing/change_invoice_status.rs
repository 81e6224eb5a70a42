use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService, InvoiceStatus};

#[derive(Debug, Deserialize)]
pub struct ChangeInvoiceStatusCommand {
  pub user_id: Uuid,
  pub invoice_id: Uuid,
  pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ChangeInvoiceStatusResponse {
  pub invoice_id: Uuid,
  pub status: String,
  pub updated_at: DateTime<Utc>,
}

pub struct ChangeInvoiceStatusUseCase {
  billing_service: Arc<BillingService>,
}

impl ChangeInvoiceStatusUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: ChangeInvoiceStatusCommand,
  ) -> Result<ChangeInvoiceStatusResponse, BillingError> {
    let new_status = InvoiceStatus::from_str(&command.status)?;

    let invoice = self
      .billing_service
      .change_invoice_status(command.user_id, command.invoice_id, new_status)
      .await?;

    Ok(ChangeInvoiceStatusResponse {
      invoice_id: invoice.id,
      status: invoice.status.as_str().to_string(),
      updated_at: invoice.updated_at,
    })
  }
}
