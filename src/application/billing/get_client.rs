use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{BillingError, BillingService};

#[derive(Debug, Deserialize)]
pub struct GetClientQuery {
  pub user_id: Uuid,
  pub client_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct GetClientResponse {
  pub client_id: Uuid,
  pub company_name: String,
  pub contact_name: String,
  pub contact_email: Option<String>,
  pub contact_phone: Option<String>,
  pub contact_position: Option<String>,
  pub vat_number: Option<String>,
  pub address: Option<String>,
  pub is_vat_registered: bool,
  pub payment_terms_days: i32,
  pub status: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

pub struct GetClientUseCase {
  billing_service: Arc<BillingService>,
}

impl GetClientUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(&self, query: GetClientQuery) -> Result<GetClientResponse, BillingError> {
    let client = self
      .billing_service
      .get_client(query.user_id, query.client_id)
      .await?;

    Ok(GetClientResponse {
      client_id: client.id,
      company_name: client.company_name.into_inner(),
      contact_name: client.contact_person.name,
      contact_email: client.contact_person.email,
      contact_phone: client.contact_person.phone,
      contact_position: client.contact_person.position,
      vat_number: client.vat_number,
      address: client.address.map(|a| a.format_multiline()),
      is_vat_registered: client.is_vat_registered,
      payment_terms_days: client.payment_terms_days,
      status: client.status.as_str().to_string(),
      created_at: client.created_at,
      updated_at: client.updated_at,
    })
  }
}
