use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, BillingService, Currency, InvoiceData, InvoiceStatus, LineItemDescription,
  LineItemInput, Money, Quantity, VatRate,
};

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceLineItemDto {
  pub description: String,
  pub quantity: Decimal,
  pub unit_price: Decimal,
  pub vat_rate: Decimal,
  pub vat_inclusive: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceCommand {
  pub user_id: Uuid,
  pub client_id: Uuid,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub currency: String,
  /// "draft" or "sent"; defaults to sent.
  pub status: Option<String>,
  pub notes: Option<String>,
  pub terms: Option<String>,
  pub line_items: Vec<CreateInvoiceLineItemDto>,
}

#[derive(Debug, Serialize)]
pub struct CreateInvoiceResponse {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub status: String,
  pub subtotal: Decimal,
  pub vat_total: Decimal,
  pub total: Decimal,
  pub created_at: DateTime<Utc>,
}

pub struct CreateInvoiceUseCase {
  billing_service: Arc<BillingService>,
}

impl CreateInvoiceUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: CreateInvoiceCommand,
  ) -> Result<CreateInvoiceResponse, BillingError> {
    let currency = Currency::from_str(&command.currency)?;
    let status = command
      .status
      .as_deref()
      .map(InvoiceStatus::from_str)
      .transpose()?;

    let line_items: Vec<LineItemInput> = command
      .line_items
      .into_iter()
      .map(|item| {
        let description = LineItemDescription::new(item.description)?;
        let quantity = Quantity::new(item.quantity)?;
        let unit_price = Money::new(item.unit_price, currency)?;
        let vat_rate = VatRate::new(item.vat_rate)?;
        Ok(LineItemInput {
          description,
          quantity,
          unit_price,
          vat_rate,
          vat_inclusive: item.vat_inclusive,
        })
      })
      .collect::<Result<Vec<_>, BillingError>>()?;

    let invoice_data = InvoiceData {
      client_id: command.client_id,
      issue_date: command.issue_date,
      due_date: command.due_date,
      currency,
      status,
      notes: command.notes,
      terms: command.terms,
      line_items,
    };

    let (invoice, _line_items) = self
      .billing_service
      .create_invoice(command.user_id, invoice_data, Utc::now())
      .await?;

    Ok(CreateInvoiceResponse {
      invoice_id: invoice.id,
      invoice_number: invoice.invoice_number.into_inner(),
      status: invoice.status.as_str().to_string(),
      subtotal: invoice.subtotal.amount,
      vat_total: invoice.vat_total.amount,
      total: invoice.total.amount,
      created_at: invoice.created_at,
    })
  }
}
