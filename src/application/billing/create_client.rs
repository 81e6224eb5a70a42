use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, BillingService, ClientAddress, ClientData, ClientName, ContactPerson,
};

#[derive(Debug, Deserialize)]
pub struct ClientAddressDto {
  pub street: Option<String>,
  pub city: Option<String>,
  pub province: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientCommand {
  pub user_id: Uuid,
  pub company_name: String,
  pub contact_name: String,
  pub contact_email: Option<String>,
  pub contact_phone: Option<String>,
  pub contact_position: Option<String>,
  pub vat_number: Option<String>,
  pub address: Option<ClientAddressDto>,
  pub is_vat_registered: bool,
  pub payment_terms_days: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CreateClientResponse {
  pub client_id: Uuid,
  pub company_name: String,
  pub created_at: DateTime<Utc>,
}

pub struct CreateClientUseCase {
  billing_service: Arc<BillingService>,
}

impl CreateClientUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: CreateClientCommand,
  ) -> Result<CreateClientResponse, BillingError> {
    let company_name = ClientName::new(command.company_name)?;
    let contact_person = ContactPerson::new(
      command.contact_name,
      command.contact_email,
      command.contact_phone,
      command.contact_position,
    )?;
    let address = command.address.map(|a| {
      ClientAddress::new(a.street, a.city, a.province, a.postal_code, a.country)
    });

    let data = ClientData {
      company_name,
      contact_person,
      vat_number: command.vat_number,
      address,
      is_vat_registered: command.is_vat_registered,
      payment_terms_days: command.payment_terms_days.unwrap_or(30),
    };

    let client = self.billing_service.create_client(command.user_id, data).await?;

    Ok(CreateClientResponse {
      client_id: client.id,
      company_name: client.company_name.into_inner(),
      created_at: client.created_at,
    })
  }
}
