use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct DeleteClientCommand {
  pub user_id: Uuid,
  pub client_id: Uuid,
}

pub struct DeleteClientUseCase {
  billing_service: Arc<BillingService>,
}

impl DeleteClientUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(&self, command: DeleteClientCommand) -> Result<(), BillingError> {
    self
      .billing_service
      .delete_client(command.user_id, command.client_id)
      .await
  }
}
