use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::{
  Currency, Money, Payment, PaymentMethod, PaymentReference, PaymentStatus,
  errors::BillingError, ports::PaymentRepository,
};

#[derive(Debug, FromRow)]
struct PaymentRow {
  id: Uuid,
  user_id: Uuid,
  client_id: Uuid,
  invoice_id: Uuid,
  amount: Decimal,
  currency: String,
  payment_method: String,
  status: String,
  payment_date: DateTime<Utc>,
  reference: String,
  notes: Option<String>,
  vat_inclusive: bool,
  vat_amount: Decimal,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
  type Error = BillingError;

  fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
    let currency = Currency::from_str(&row.currency)?;
    let payment_method = PaymentMethod::from_str(&row.payment_method)?;
    let status = PaymentStatus::from_str(&row.status)?;
    let reference = PaymentReference::new(row.reference)?;

    Ok(Payment {
      id: row.id,
      user_id: row.user_id,
      client_id: row.client_id,
      invoice_id: row.invoice_id,
      amount: Money::new(row.amount, currency)?,
      payment_method,
      status,
      payment_date: row.payment_date,
      reference,
      notes: row.notes,
      vat_inclusive: row.vat_inclusive,
      vat_amount: Money::new(row.vat_amount, currency)?,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

const PAYMENT_COLUMNS: &str = r#"id, user_id, client_id, invoice_id, amount, currency,
                      payment_method, status, payment_date, reference, notes,
                      vat_inclusive, vat_amount, created_at, updated_at"#;

pub struct PostgresPaymentRepository {
  pool: PgPool,
}

impl PostgresPaymentRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
  async fn create(&self, payment: Payment) -> Result<Payment, BillingError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
      r#"
            INSERT INTO payments (
                id, user_id, client_id, invoice_id, amount, currency,
                payment_method, status, payment_date, reference, notes,
                vat_inclusive, vat_amount, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {PAYMENT_COLUMNS}
            "#
    ))
    .bind(payment.id)
    .bind(payment.user_id)
    .bind(payment.client_id)
    .bind(payment.invoice_id)
    .bind(payment.amount.amount)
    .bind(payment.amount.currency.as_str())
    .bind(payment.payment_method.as_str())
    .bind(payment.status.as_str())
    .bind(payment.payment_date)
    .bind(payment.reference.value())
    .bind(&payment.notes)
    .bind(payment.vat_inclusive)
    .bind(payment.vat_amount.amount)
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .fetch_one(&self.pool)
    .await?;

    row.try_into()
  }

  async fn update(&self, payment: Payment) -> Result<Payment, BillingError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
      r#"
            UPDATE payments
            SET payment_method = $2, status = $3, payment_date = $4,
                reference = $5, notes = $6, updated_at = $7
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
    ))
    .bind(payment.id)
    .bind(payment.payment_method.as_str())
    .bind(payment.status.as_str())
    .bind(payment.payment_date)
    .bind(payment.reference.value())
    .bind(&payment.notes)
    .bind(payment.updated_at)
    .fetch_optional(&self.pool)
    .await?
    .ok_or(BillingError::PaymentNotFound(payment.id))?;

    row.try_into()
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    let result = sqlx::query("DELETE FROM payments WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(BillingError::PaymentNotFound(id));
    }
    Ok(())
  }

  async fn delete_by_invoice_id(&self, invoice_id: Uuid) -> Result<(), BillingError> {
    // Zero rows is fine, the invoice may have no payments yet
    sqlx::query("DELETE FROM payments WHERE invoice_id = $1")
      .bind(invoice_id)
      .execute(&self.pool)
      .await?;

    Ok(())
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BillingError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
      "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(TryInto::try_into).transpose()
  }

  async fn find_by_invoice_id(&self, invoice_id: Uuid) -> Result<Vec<Payment>, BillingError> {
    let rows = sqlx::query_as::<_, PaymentRow>(&format!(
      r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE invoice_id = $1
            ORDER BY payment_date DESC
            "#
    ))
    .bind(invoice_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
  }

  async fn find_completed_by_invoice_id(
    &self,
    invoice_id: Uuid,
  ) -> Result<Vec<Payment>, BillingError> {
    let rows = sqlx::query_as::<_, PaymentRow>(&format!(
      r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE invoice_id = $1 AND status = 'completed'
            ORDER BY payment_date DESC
            "#
    ))
    .bind(invoice_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
  }
}
