use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, BillingService, LineItemDescription, LineItemInput, Money, Quantity, VatRate,
};

use super::create_invoice::CreateInvoiceLineItemDto;

#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceItemsCommand {
  pub user_id: Uuid,
  pub invoice_id: Uuid,
  pub line_items: Vec<CreateInvoiceLineItemDto>,
}

#[derive(Debug, Serialize)]
pub struct UpdateInvoiceItemsResponse {
  pub invoice_id: Uuid,
  pub status: String,
  pub subtotal: Decimal,
  pub vat_total: Decimal,
  pub total: Decimal,
  pub line_item_count: usize,
}

pub struct UpdateInvoiceItemsUseCase {
  billing_service: Arc<BillingService>,
}

impl UpdateInvoiceItemsUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: UpdateInvoiceItemsCommand,
  ) -> Result<UpdateInvoiceItemsResponse, BillingError> {
    // Currency of the new items must match the invoice; the service checks
    // against the stored invoice, so parse with its currency deferred
    let invoice = self
      .billing_service
      .get_invoice_with_details(command.user_id, command.invoice_id)
      .await?
      .invoice;

    let line_items: Vec<LineItemInput> = command
      .line_items
      .into_iter()
      .map(|item| {
        let description = LineItemDescription::new(item.description)?;
        let quantity = Quantity::new(item.quantity)?;
        let unit_price = Money::new(item.unit_price, invoice.currency)?;
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

    let (invoice, line_items) = self
      .billing_service
      .update_invoice_items(command.user_id, command.invoice_id, line_items, Utc::now())
      .await?;

    Ok(UpdateInvoiceItemsResponse {
      invoice_id: invoice.id,
      status: invoice.status.as_str().to_string(),
      subtotal: invoice.subtotal.amount,
      vat_total: invoice.vat_total.amount,
      total: invoice.total.amount,
      line_item_count: line_items.len(),
    })
  }
}
