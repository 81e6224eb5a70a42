use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct DeletePaymentCommand {
  pub user_id: Uuid,
  pub payment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeletePaymentResponse {
  pub invoice_id: Uuid,
  pub invoice_status: String,
}

pub struct DeletePaymentUseCase {
  billing_service: Arc<BillingService>,
}

impl DeletePaymentUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: DeletePaymentCommand,
  ) -> Result<DeletePaymentResponse, BillingError> {
    let invoice = self
      .billing_service
      .delete_payment(command.user_id, command.payment_id, Utc::now())
      .await?;

    Ok(DeletePaymentResponse {
      invoice_id: invoice.id,
      invoice_status: invoice.status.as_str().to_string(),
    })
  }
}
