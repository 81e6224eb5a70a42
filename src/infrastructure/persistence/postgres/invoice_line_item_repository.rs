use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::billing::{
  Currency, InvoiceLineItem, LineItemDescription, Money, Quantity, VatRate,
  errors::BillingError, ports::InvoiceLineItemRepository,
};

#[derive(Debug, FromRow)]
struct LineItemRow {
  id: Uuid,
  invoice_id: Uuid,
  description: String,
  quantity: Decimal,
  unit_price: Decimal,
  currency: String,
  vat_rate: Decimal,
  vat_inclusive: bool,
  line_order: i32,
}

impl TryFrom<LineItemRow> for InvoiceLineItem {
  type Error = BillingError;

  fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
    let description = LineItemDescription::new(row.description)?;
    let quantity = Quantity::new(row.quantity)?;
    let currency = Currency::from_str(&row.currency)?;
    let unit_price = Money::new(row.unit_price, currency)?;
    let vat_rate = VatRate::new(row.vat_rate)?;

    Ok(InvoiceLineItem {
      id: row.id,
      invoice_id: row.invoice_id,
      description,
      quantity,
      unit_price,
      vat_rate,
      vat_inclusive: row.vat_inclusive,
      line_order: row.line_order,
    })
  }
}

/// Inserts one line item on an open connection, so invoice writes can run
/// it inside their own transaction.
pub(super) async fn insert_line_item(
  conn: &mut PgConnection,
  line_item: &InvoiceLineItem,
) -> Result<InvoiceLineItem, BillingError> {
  // net_total and vat_amount are derived from the inputs and persisted
  // rounded, for reporting queries that never load the entity
  let net_total = line_item.net_total().round_minor();
  let vat_amount = line_item.vat_amount().round_minor();

  let row = sqlx::query_as::<_, LineItemRow>(
    r#"
        INSERT INTO invoice_line_items (
            id, invoice_id, description, quantity, unit_price, currency,
            vat_rate, vat_inclusive, line_order, net_total, vat_amount
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id, invoice_id, description, quantity, unit_price, currency,
                  vat_rate, vat_inclusive, line_order
        "#,
  )
  .bind(line_item.id)
  .bind(line_item.invoice_id)
  .bind(line_item.description.value())
  .bind(line_item.quantity.value())
  .bind(line_item.unit_price.amount)
  .bind(line_item.unit_price.currency.as_str())
  .bind(line_item.vat_rate.value())
  .bind(line_item.vat_inclusive)
  .bind(line_item.line_order)
  .bind(net_total.amount)
  .bind(vat_amount.amount)
  .fetch_one(conn)
  .await?;

  row.try_into()
}

pub(super) async fn delete_line_items_for_invoice(
  conn: &mut PgConnection,
  invoice_id: Uuid,
) -> Result<(), BillingError> {
  sqlx::query("DELETE FROM invoice_line_items WHERE invoice_id = $1")
    .bind(invoice_id)
    .execute(conn)
    .await?;

  Ok(())
}

pub struct PostgresInvoiceLineItemRepository {
  pool: PgPool,
}

impl PostgresInvoiceLineItemRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl InvoiceLineItemRepository for PostgresInvoiceLineItemRepository {
  async fn find_by_invoice_id(
    &self,
    invoice_id: Uuid,
  ) -> Result<Vec<InvoiceLineItem>, BillingError> {
    let rows = sqlx::query_as::<_, LineItemRow>(
      r#"
            SELECT id, invoice_id, description, quantity, unit_price, currency,
                   vat_rate, vat_inclusive, line_order
            FROM invoice_line_items
            WHERE invoice_id = $1
            ORDER BY line_order ASC
            "#,
    )
    .bind(invoice_id)
    .fetch_all(&self.pool)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
  }
}
