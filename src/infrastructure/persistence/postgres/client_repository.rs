use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::{
  Client, ClientAddress, ClientName, ClientStatus, ContactPerson, errors::BillingError,
  ports::ClientRepository,
};

#[derive(Debug, FromRow)]
struct ClientRow {
  id: Uuid,
  user_id: Uuid,
  company_name: String,
  contact_name: String,
  contact_email: Option<String>,
  contact_phone: Option<String>,
  contact_position: Option<String>,
  vat_number: Option<String>,
  address_street: Option<String>,
  address_city: Option<String>,
  address_province: Option<String>,
  address_postal_code: Option<String>,
  address_country: Option<String>,
  is_vat_registered: bool,
  payment_terms_days: i32,
  notes: Option<String>,
  status: String,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<ClientRow> for Client {
  type Error = BillingError;

  fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
    let company_name = ClientName::new(row.company_name)?;
    let contact_person = ContactPerson::new(
      row.contact_name,
      row.contact_email,
      row.contact_phone,
      row.contact_position,
    )?;
    let status = ClientStatus::from_str(&row.status)?;

    // All-empty address columns read back as no address
    let address = if row.address_street.is_none()
      && row.address_city.is_none()
      && row.address_province.is_none()
      && row.address_postal_code.is_none()
      && row.address_country.is_none()
    {
      None
    } else {
      Some(ClientAddress::new(
        row.address_street,
        row.address_city,
        row.address_province,
        row.address_postal_code,
        row.address_country,
      ))
    };

    Ok(Client {
      id: row.id,
      user_id: row.user_id,
      company_name,
      contact_person,
      vat_number: row.vat_number,
      address,
      is_vat_registered: row.is_vat_registered,
      payment_terms_days: row.payment_terms_days,
      notes: row.notes,
      status,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

const CLIENT_COLUMNS: &str = r#"id, user_id, company_name, contact_name, contact_email,
                      contact_phone, contact_position, vat_number, address_street,
                      address_city, address_province, address_postal_code, address_country,
                      is_vat_registered, payment_terms_days, notes, status,
                      created_at, updated_at"#;

pub struct PostgresClientRepository {
  pool: PgPool,
}

impl PostgresClientRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl ClientRepository for PostgresClientRepository {
  async fn create(&self, client: Client) -> Result<Client, BillingError> {
    let address = client.address.clone().unwrap_or(ClientAddress::new(
      None, None, None, None, None,
    ));

    let row = sqlx::query_as::<_, ClientRow>(&format!(
      r#"
            INSERT INTO clients (
                id, user_id, company_name, contact_name, contact_email,
                contact_phone, contact_position, vat_number, address_street,
                address_city, address_province, address_postal_code, address_country,
                is_vat_registered, payment_terms_days, notes, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19)
            RETURNING {CLIENT_COLUMNS}
            "#
    ))
    .bind(client.id)
    .bind(client.user_id)
    .bind(client.company_name.value())
    .bind(&client.contact_person.name)
    .bind(&client.contact_person.email)
    .bind(&client.contact_person.phone)
    .bind(&client.contact_person.position)
    .bind(&client.vat_number)
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.province)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(client.is_vat_registered)
    .bind(client.payment_terms_days)
    .bind(&client.notes)
    .bind(client.status.as_str())
    .bind(client.created_at)
    .bind(client.updated_at)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23505")
          && db_err.constraint() == Some("clients_user_company_name_unique")
        {
          return BillingError::ClientNameAlreadyExists;
        }
      }
      BillingError::Database(e)
    })?;

    row.try_into()
  }

  async fn update(&self, client: Client) -> Result<Client, BillingError> {
    let address = client.address.clone().unwrap_or(ClientAddress::new(
      None, None, None, None, None,
    ));

    let row = sqlx::query_as::<_, ClientRow>(&format!(
      r#"
            UPDATE clients
            SET company_name = $2, contact_name = $3, contact_email = $4,
                contact_phone = $5, contact_position = $6, vat_number = $7,
                address_street = $8, address_city = $9, address_province = $10,
                address_postal_code = $11, address_country = $12,
                is_vat_registered = $13, payment_terms_days = $14, notes = $15,
                status = $16, updated_at = $17
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
    ))
    .bind(client.id)
    .bind(client.company_name.value())
    .bind(&client.contact_person.name)
    .bind(&client.contact_person.email)
    .bind(&client.contact_person.phone)
    .bind(&client.contact_person.position)
    .bind(&client.vat_number)
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.province)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(client.is_vat_registered)
    .bind(client.payment_terms_days)
    .bind(&client.notes)
    .bind(client.status.as_str())
    .bind(client.updated_at)
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| {
      if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23505")
          && db_err.constraint() == Some("clients_user_company_name_unique")
        {
          return BillingError::ClientNameAlreadyExists;
        }
      }
      BillingError::Database(e)
    })?
    .ok_or(BillingError::ClientNotFound(client.id))?;

    row.try_into()
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    let result = sqlx::query("DELETE FROM clients WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(BillingError::ClientNotFound(id));
    }
    Ok(())
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Client>, BillingError> {
    let row = sqlx::query_as::<_, ClientRow>(&format!(
      "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(TryInto::try_into).transpose()
  }

  async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Client>, BillingError> {
    let rows = sqlx::query_as::<_, ClientRow>(&format!(
      "SELECT {CLIENT_COLUMNS} FROM clients WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
  }

  async fn exists_by_name(
    &self,
    user_id: Uuid,
    company_name: &str,
    exclude_id: Option<Uuid>,
  ) -> Result<bool, BillingError> {
    let exists: Option<(Uuid,)> = sqlx::query_as(
      r#"
            SELECT id FROM clients
            WHERE user_id = $1
              AND lower(company_name) = lower($2)
              AND ($3::uuid IS NULL OR id <> $3)
            LIMIT 1
            "#,
    )
    .bind(user_id)
    .bind(company_name)
    .bind(exclude_id)
    .fetch_optional(&self.pool)
    .await?;

    Ok(exists.is_some())
  }
}
