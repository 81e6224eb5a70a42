use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::billing::{
  BillingError, BillingService, ClientAddress, ClientData, ClientName, ClientStatus,
  ContactPerson,
};

use super::create_client::ClientAddressDto;

#[derive(Debug, Deserialize)]
pub struct UpdateClientCommand {
  pub user_id: Uuid,
  pub client_id: Uuid,
  pub company_name: String,
  pub contact_name: String,
  pub contact_email: Option<String>,
  pub contact_phone: Option<String>,
  pub contact_position: Option<String>,
  pub vat_number: Option<String>,
  pub address: Option<ClientAddressDto>,
  pub is_vat_registered: bool,
  pub payment_terms_days: i32,
  pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateClientResponse {
  pub client_id: Uuid,
  pub company_name: String,
  pub status: String,
  pub updated_at: DateTime<Utc>,
}

pub struct UpdateClientUseCase {
  billing_service: Arc<BillingService>,
}

impl UpdateClientUseCase {
  pub fn new(billing_service: Arc<BillingService>) -> Self {
    Self { billing_service }
  }

  pub async fn execute(
    &self,
    command: UpdateClientCommand,
  ) -> Result<UpdateClientResponse, BillingError> {
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
    let status = ClientStatus::from_str(&command.status)?;

    let data = ClientData {
      company_name,
      contact_person,
      vat_number: command.vat_number,
      address,
      is_vat_registered: command.is_vat_registered,
      payment_terms_days: command.payment_terms_days,
    };

    let client = self
      .billing_service
      .update_client(command.user_id, command.client_id, data, status)
      .await?;

    Ok(UpdateClientResponse {
      client_id: client.id,
      company_name: client.company_name.into_inner(),
      status: client.status.as_str().to_string(),
      updated_at: client.updated_at,
    })
  }
}
