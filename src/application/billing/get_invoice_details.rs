use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct GetInvoiceDetailsQuery {
  pub user_id: Uuid,
  pub invoice_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LineItemDto {
  pub description: String,
  pub quantity: Decimal,
  pub unit_price: Decimal,
  pub vat_rate: Decimal,
  pub vat_inclusive: bool,
  pub net_total: Decimal,
  pub vat_amount: Decimal,
  pub gross_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PaymentDto {
  pub payment_id: Uuid,
  pub amount: Decimal,
  pub payment_method: String,
  pub status: String,
  pub payment_date: DateTime<Utc>,
  pub reference: String,
}

#[derive(Debug, Serialize)]
pub struct GetInvoiceDetailsResponse {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub client_name: String,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub currency: String,
  pub status: String,
  pub subtotal: Decimal,
  pub vat_total: Decimal,
  pub total: Decimal,
  pub total_paid: Decimal,
  pub balance_due: Decimal,
  pub line_items: Vec<LineItemDto>,
  pub payments: Vec<PaymentDto>,
}

pub struct GetInvoiceDetailsUseCase {
  billing_service: Arc<BillingService>,
}

impl GetInvoiceDetailsUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    query: GetInvoiceDetailsQuery,
  ) -> Result<GetInvoiceDetailsResponse, BillingError> {
    let details = self
      .billing_service
      .get_invoice_with_details(query.user_id, query.invoice_id)
      .await?;

    let line_items = details
      .line_items
      .iter()
      .map(|item| LineItemDto {
        description: item.description.value().to_string(),
        quantity: item.quantity.value(),
        unit_price: item.unit_price.amount,
        vat_rate: item.vat_rate.value(),
        vat_inclusive: item.vat_inclusive,
        net_total: item.net_total().round_minor().amount,
        vat_amount: item.vat_amount().round_minor().amount,
        gross_total: item.gross_total().round_minor().amount,
      })
      .collect();

    let payments = details
      .payments
      .iter()
      .map(|payment| PaymentDto {
        payment_id: payment.id,
        amount: payment.amount.amount,
        payment_method: payment.payment_method.as_str().to_string(),
        status: payment.status.as_str().to_string(),
        payment_date: payment.payment_date,
        reference: payment.reference.value().to_string(),
      })
      .collect();

    let invoice = details.invoice;

    Ok(GetInvoiceDetailsResponse {
      invoice_id: invoice.id,
      invoice_number: invoice.invoice_number.into_inner(),
      client_name: details.client.company_name.into_inner(),
      issue_date: invoice.issue_date,
      due_date: invoice.due_date,
      currency: invoice.currency.as_str().to_string(),
      status: invoice.status.as_str().to_string(),
      subtotal: invoice.subtotal.amount,
      vat_total: invoice.vat_total.amount,
      total: invoice.total.amount,
      total_paid: details.total_paid.round_minor().amount,
      balance_due: details.balance_due.round_minor().amount,
      line_items,
      payments,
    })
  }
}
