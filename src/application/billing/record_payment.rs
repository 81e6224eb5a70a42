use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, BillingService, PaymentData, PaymentMethod, PaymentReference, PaymentStatus,
};

#[derive(Debug, Deserialize)]
pub struct RecordPaymentCommand {
  pub user_id: Uuid,
  pub invoice_id: Uuid,
  pub client_id: Uuid,
  pub amount: Decimal,
  pub payment_method: String,
  /// "pending" or "completed"; defaults to completed.
  pub status: Option<String>,
  pub payment_date: Option<DateTime<Utc>>,
  pub reference: String,
  pub notes: Option<String>,
  pub vat_inclusive: bool,
}

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
  pub payment_id: Uuid,
  pub payment_status: String,
  pub invoice_id: Uuid,
  pub invoice_status: String,
  pub vat_amount: Decimal,
}

pub struct RecordPaymentUseCase {
  billing_service: Arc<BillingService>,
}

impl RecordPaymentUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: RecordPaymentCommand,
  ) -> Result<RecordPaymentResponse, BillingError> {
    let payment_method = PaymentMethod::from_str(&command.payment_method)?;
    let status = match command.status.as_deref() {
      Some(s) => PaymentStatus::from_str(s)?,
      None => PaymentStatus::Completed,
    };
    let reference = PaymentReference::new(command.reference)?;

    let data = PaymentData {
      invoice_id: command.invoice_id,
      client_id: command.client_id,
      amount: command.amount,
      payment_method,
      status,
      payment_date: command.payment_date,
      reference,
      notes: command.notes,
      vat_inclusive: command.vat_inclusive,
    };

    let (payment, invoice) = self
      .billing_service
      .record_payment(command.user_id, data, Utc::now())
      .await?;

    Ok(RecordPaymentResponse {
      payment_id: payment.id,
      payment_status: payment.status.as_str().to_string(),
      invoice_id: invoice.id,
      invoice_status: invoice.status.as_str().to_string(),
      vat_amount: payment.vat_amount.amount,
    })
  }
}
