//! VAT-aware invoicing and payment reconciliation for small businesses.
//!
//! The crate is organized in three layers:
//!
//! - [`domain`]: entities, value objects, and the `BillingService` that owns
//!   the VAT calculation pipeline, the payment reconciliation engine, and the
//!   invoice lifecycle rules.
//! - [`application`]: use cases that parse raw input into domain types and
//!   orchestrate the service, one per operation.
//! - [`infrastructure`]: configuration plus Postgres and in-memory
//!   implementations of the domain's repository ports.
//!
//! Monetary arithmetic is done on [`rust_decimal::Decimal`] at full precision;
//! amounts are rounded to the currency minor unit only when persisted and when
//! comparing payment coverage against an invoice total.

pub mod application;
pub mod domain;
pub mod infrastructure;
