use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct ListClientsQuery {
  pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ClientSummaryDto {
  pub client_id: Uuid,
  pub company_name: String,
  pub contact_name: String,
  pub status: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ListClientsResponse {
  pub clients: Vec<ClientSummaryDto>,
}

pub struct ListClientsUseCase {
  billing_service: Arc<BillingService>,
}

impl ListClientsUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(&self, query: ListClientsQuery) -> Result<ListClientsResponse, BillingError> {
    let clients = self.billing_service.list_clients(query.user_id).await?;

    let clients = clients
      .into_iter()
      .map(|client| ClientSummaryDto {
        client_id: client.id,
        company_name: client.company_name.into_inner(),
        contact_name: client.contact_person.name,
        status: client.status.as_str().to_string(),
        created_at: client.created_at,
      })
      .collect();

    Ok(ListClientsResponse { clients })
  }
}
