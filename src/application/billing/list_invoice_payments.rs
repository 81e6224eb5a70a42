use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct ListInvoicePaymentsQuery {
  pub user_id: Uuid,
  pub invoice_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PaymentSummaryDto {
  pub payment_id: Uuid,
  pub amount: Decimal,
  pub currency: String,
  pub payment_method: String,
  pub status: String,
  pub payment_date: DateTime<Utc>,
  pub reference: String,
  pub vat_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ListInvoicePaymentsResponse {
  pub payments: Vec<PaymentSummaryDto>,
}

pub struct ListInvoicePaymentsUseCase {
  billing_service: Arc<BillingService>,
}

impl ListInvoicePaymentsUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    query: ListInvoicePaymentsQuery,
  ) -> Result<ListInvoicePaymentsResponse, BillingError> {
    let payments = self
      .billing_service
      .list_invoice_payments(query.user_id, query.invoice_id)
      .await?;

    let payments = payments
      .into_iter()
      .map(|payment| PaymentSummaryDto {
        payment_id: payment.id,
        amount: payment.amount.amount,
        currency: payment.amount.currency.as_str().to_string(),
        payment_method: payment.payment_method.as_str().to_string(),
        status: payment.status.as_str().to_string(),
        payment_date: payment.payment_date,
        reference: payment.reference.into_inner(),
        vat_amount: payment.vat_amount.amount,
      })
      .collect();

    Ok(ListInvoicePaymentsResponse { payments })
  }
}
