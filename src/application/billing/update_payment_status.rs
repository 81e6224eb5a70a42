use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService, PaymentStatus};

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentStatusCommand {
  pub user_id: Uuid,
  pub payment_id: Uuid,
  pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UpdatePaymentStatusResponse {
  pub payment_id: Uuid,
  pub payment_status: String,
  pub invoice_id: Uuid,
  pub invoice_status: String,
}

pub struct UpdatePaymentStatusUseCase {
  billing_service: Arc<BillingService>,
}

impl UpdatePaymentStatusUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: UpdatePaymentStatusCommand,
  ) -> Result<UpdatePaymentStatusResponse, BillingError> {
    let new_status = PaymentStatus::from_str(&command.status)?;

    let (payment, invoice) = self
      .billing_service
      .update_payment_status(command.user_id, command.payment_id, new_status, Utc::now())
      .await?;

    Ok(UpdatePaymentStatusResponse {
      payment_id: payment.id,
      payment_status: payment.status.as_str().to_string(),
      invoice_id: invoice.id,
      invoice_status: invoice.status.as_str().to_string(),
    })
  }
}
