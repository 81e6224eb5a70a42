use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct MarkOverdueInvoicesCommand {
  pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MarkOverdueInvoicesResponse {
  pub marked_overdue: Vec<Uuid>,
}

pub struct MarkOverdueInvoicesUseCase {
  billing_service: Arc<BillingService>,
}

impl MarkOverdueInvoicesUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: MarkOverdueInvoicesCommand,
  ) -> Result<MarkOverdueInvoicesResponse, BillingError> {
    let updated = self
      .billing_service
      .mark_overdue_invoices(command.user_id, Utc::now().date_naive())
      .await?;

    Ok(MarkOverdueInvoicesResponse {
      marked_overdue: updated.into_iter().map(|invoice| invoice.id).collect(),
    })
  }
}
