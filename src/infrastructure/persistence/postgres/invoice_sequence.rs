use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::{errors::BillingError, ports::InvoiceNumberSequence};

/// Per-year counter backed by an upsert. The increment and the read happen in
/// one statement, so concurrent allocations never observe the same value.
pub struct PostgresInvoiceNumberSequence {
  pool: PgPool,
}

impl PostgresInvoiceNumberSequence {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl InvoiceNumberSequence for PostgresInvoiceNumberSequence {
  async fn next(&self, year: i32) -> Result<i64, BillingError> {
    let (value,): (i64,) = sqlx::query_as(
      r#"
            INSERT INTO invoice_number_sequences (year, value)
            VALUES ($1, 1)
            ON CONFLICT (year)
            DO UPDATE SET value = invoice_number_sequences.value + 1
            RETURNING value
            "#,
    )
    .bind(year)
    .fetch_one(&self.pool)
    .await?;

    Ok(value)
  }
}
