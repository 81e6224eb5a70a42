use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use crate::infrastructure::config::DatabaseConfig;

pub mod client_repository;
pub mod invoice_line_item_repository;
pub mod invoice_repository;
pub mod invoice_sequence;
pub mod payment_repository;

pub use client_repository::PostgresClientRepository;
pub use invoice_line_item_repository::PostgresInvoiceLineItemRepository;
pub use invoice_repository::PostgresInvoiceRepository;
pub use invoice_sequence::PostgresInvoiceNumberSequence;
pub use payment_repository::PostgresPaymentRepository;

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
  PgPoolOptions::new()
    .max_connections(config.max_connections)
    .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
    .connect(&config.url)
    .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
  sqlx::migrate!("./migrations").run(pool).await
}
