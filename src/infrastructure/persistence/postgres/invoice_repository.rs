use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use super::invoice_line_item_repository::{delete_line_items_for_invoice, insert_line_item};
use crate::domain::billing::{
  Currency, Invoice, InvoiceLineItem, InvoiceNumber, InvoiceStatus, Money, PaymentDetails,
  PaymentMethod, errors::BillingError, ports::InvoiceRepository,
};

#[derive(Debug, FromRow)]
struct InvoiceRow {
  id: Uuid,
  user_id: Uuid,
  client_id: Uuid,
  invoice_number: String,
  issue_date: NaiveDate,
  due_date: NaiveDate,
  currency: String,
  status: String,
  subtotal: Decimal,
  vat_total: Decimal,
  total: Decimal,
  paid: bool,
  payment_date: Option<DateTime<Utc>>,
  payment_method: Option<String>,
  transaction_id: Option<String>,
  payment_notes: Option<String>,
  notes: Option<String>,
  terms: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
  type Error = BillingError;

  fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
    let invoice_number = InvoiceNumber::new(row.invoice_number)?;
    let currency = Currency::from_str(&row.currency)?;
    let status = InvoiceStatus::from_str(&row.status)?;
    let payment_method = row
      .payment_method
      .as_deref()
      .map(PaymentMethod::from_str)
      .transpose()?;

    Ok(Invoice {
      id: row.id,
      user_id: row.user_id,
      client_id: row.client_id,
      invoice_number,
      issue_date: row.issue_date,
      due_date: row.due_date,
      currency,
      status,
      subtotal: Money::new(row.subtotal, currency)?,
      vat_total: Money::new(row.vat_total, currency)?,
      total: Money::new(row.total, currency)?,
      payment_details: PaymentDetails {
        paid: row.paid,
        payment_date: row.payment_date,
        payment_method,
        transaction_id: row.transaction_id,
        notes: row.payment_notes,
      },
      notes: row.notes,
      terms: row.terms,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

const INVOICE_COLUMNS: &str = r#"id, user_id, client_id, invoice_number, issue_date, due_date,
                      currency, status, subtotal, vat_total, total, paid, payment_date,
                      payment_method, transaction_id, payment_notes, notes, terms,
                      created_at, updated_at"#;

pub struct PostgresInvoiceRepository {
  pool: PgPool,
}

impl PostgresInvoiceRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

/// Inserts the invoice row on an open connection, so the caller controls
/// the transaction boundary.
async fn insert_invoice(
  conn: &mut PgConnection,
  invoice: Invoice,
) -> Result<Invoice, BillingError> {
  let invoice_number_value = invoice.invoice_number.value().to_string();

  let row = sqlx::query_as::<_, InvoiceRow>(&format!(
    r#"
          INSERT INTO invoices (
              id, user_id, client_id, invoice_number, issue_date, due_date,
              currency, status, subtotal, vat_total, total, paid, payment_date,
              payment_method, transaction_id, payment_notes, notes, terms,
              created_at, updated_at
          )
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                  $15, $16, $17, $18, $19, $20)
          RETURNING {INVOICE_COLUMNS}
          "#
  ))
  .bind(invoice.id)
  .bind(invoice.user_id)
  .bind(invoice.client_id)
  .bind(invoice.invoice_number.value())
  .bind(invoice.issue_date)
  .bind(invoice.due_date)
  .bind(invoice.currency.as_str())
  .bind(invoice.status.as_str())
  .bind(invoice.subtotal.amount)
  .bind(invoice.vat_total.amount)
  .bind(invoice.total.amount)
  .bind(invoice.payment_details.paid)
  .bind(invoice.payment_details.payment_date)
  .bind(invoice.payment_details.payment_method.map(|m| m.as_str()))
  .bind(&invoice.payment_details.transaction_id)
  .bind(&invoice.payment_details.notes)
  .bind(&invoice.notes)
  .bind(&invoice.terms)
  .bind(invoice.created_at)
  .bind(invoice.updated_at)
  .fetch_one(conn)
  .await
  .map_err(|e| {
    if let sqlx::Error::Database(db_err) = &e {
      if db_err.code().as_deref() == Some("23505")
        && db_err.constraint() == Some("invoices_invoice_number_unique")
      {
        return BillingError::InvoiceNumberAlreadyExists(invoice_number_value);
      }
    }
    BillingError::Database(e)
  })?;

  row.try_into()
}

async fn update_invoice_row(
  conn: &mut PgConnection,
  invoice: Invoice,
) -> Result<Invoice, BillingError> {
  let row = sqlx::query_as::<_, InvoiceRow>(&format!(
    r#"
          UPDATE invoices
          SET issue_date = $2, due_date = $3, status = $4, subtotal = $5,
              vat_total = $6, total = $7, paid = $8, payment_date = $9,
              payment_method = $10, transaction_id = $11, payment_notes = $12,
              notes = $13, terms = $14, updated_at = $15
          WHERE id = $1
          RETURNING {INVOICE_COLUMNS}
          "#
  ))
  .bind(invoice.id)
  .bind(invoice.issue_date)
  .bind(invoice.due_date)
  .bind(invoice.status.as_str())
  .bind(invoice.subtotal.amount)
  .bind(invoice.vat_total.amount)
  .bind(invoice.total.amount)
  .bind(invoice.payment_details.paid)
  .bind(invoice.payment_details.payment_date)
  .bind(invoice.payment_details.payment_method.map(|m| m.as_str()))
  .bind(&invoice.payment_details.transaction_id)
  .bind(&invoice.payment_details.notes)
  .bind(&invoice.notes)
  .bind(&invoice.terms)
  .bind(invoice.updated_at)
  .fetch_optional(conn)
  .await?
  .ok_or(BillingError::InvoiceNotFound(invoice.id))?;

  row.try_into()
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
  async fn create_with_items(
    &self,
    invoice: Invoice,
    line_items: Vec<InvoiceLineItem>,
  ) -> Result<(Invoice, Vec<InvoiceLineItem>), BillingError> {
    let mut tx = self.pool.begin().await?;

    let created = insert_invoice(&mut tx, invoice).await?;
    let mut created_items = Vec::with_capacity(line_items.len());
    for line_item in &line_items {
      created_items.push(insert_line_item(&mut tx, line_item).await?);
    }

    tx.commit().await?;
    Ok((created, created_items))
  }

  async fn update_with_items(
    &self,
    invoice: Invoice,
    line_items: Vec<InvoiceLineItem>,
  ) -> Result<(Invoice, Vec<InvoiceLineItem>), BillingError> {
    let invoice_id = invoice.id;
    let mut tx = self.pool.begin().await?;

    let updated = update_invoice_row(&mut tx, invoice).await?;
    delete_line_items_for_invoice(&mut tx, invoice_id).await?;
    let mut created_items = Vec::with_capacity(line_items.len());
    for line_item in &line_items {
      created_items.push(insert_line_item(&mut tx, line_item).await?);
    }

    tx.commit().await?;
    Ok((updated, created_items))
  }

  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
    let mut conn = self.pool.acquire().await?;
    update_invoice_row(&mut conn, invoice).await
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(BillingError::InvoiceNotFound(id));
    }
    Ok(())
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
    let row = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    row.map(TryInto::try_into).transpose()
  }

  async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      "SELECT {INVOICE_COLUMNS} FROM invoices WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
  }

  async fn find_by_user_and_status(
    &self,
    user_id: Uuid,
    status: InvoiceStatus,
  ) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      r#"
            SELECT {INVOICE_COLUMNS} FROM invoices
            WHERE user_id = $1 AND status = $2
            ORDER BY created_at DESC
            "#
    ))
    .bind(user_id)
    .bind(status.as_str())
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
  }

  async fn find_by_user_and_client(
    &self,
    user_id: Uuid,
    client_id: Uuid,
  ) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      r#"
            SELECT {INVOICE_COLUMNS} FROM invoices
            WHERE user_id = $1 AND client_id = $2
            ORDER BY created_at DESC
            "#
    ))
    .bind(user_id)
    .bind(client_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
  }

  async fn find_due_before(
    &self,
    user_id: Uuid,
    current_date: NaiveDate,
  ) -> Result<Vec<Invoice>, BillingError> {
    let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
      r#"
            SELECT {INVOICE_COLUMNS} FROM invoices
            WHERE user_id = $1 AND status = 'sent' AND due_date < $2
            ORDER BY due_date ASC
            "#
    ))
    .bind(user_id)
    .bind(current_date)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
  }

  async fn count_by_client_id(&self, client_id: Uuid) -> Result<i64, BillingError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM invoices WHERE client_id = $1")
      .bind(client_id)
      .fetch_one(&self.pool)
      .await?;

    Ok(count)
  }
}
