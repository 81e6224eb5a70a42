use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService, InvoiceStatus};

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
  pub user_id: Uuid,
  pub status: Option<String>,
  pub client_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceSummaryDto {
  pub invoice_id: Uuid,
  pub invoice_number: String,
  pub client_id: Uuid,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub status: String,
  pub total: Decimal,
  pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct ListInvoicesResponse {
  pub invoices: Vec<InvoiceSummaryDto>,
}

pub struct ListInvoicesUseCase {
  billing_service: Arc<BillingService>,
}

impl ListInvoicesUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(&self, query: ListInvoicesQuery) -> Result<ListInvoicesResponse, BillingError> {
    let status_filter = query
      .status
      .as_deref()
      .map(InvoiceStatus::from_str)
      .transpose()?;

    let invoices = self
      .billing_service
      .list_invoices(query.user_id, status_filter, query.client_id)
      .await?;

    let invoices = invoices
      .into_iter()
      .map(|invoice| InvoiceSummaryDto {
        invoice_id: invoice.id,
        invoice_number: invoice.invoice_number.into_inner(),
        client_id: invoice.client_id,
        issue_date: invoice.issue_date,
        due_date: invoice.due_date,
        status: invoice.status.as_str().to_string(),
        total: invoice.total.amount,
        currency: invoice.currency.as_str().to_string(),
      })
      .collect();

    Ok(ListInvoicesResponse { invoices })
  }
}
