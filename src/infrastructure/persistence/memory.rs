//! In-memory repository implementations.
//!
//! Used by tests and local tooling that need the full service stack without
//! a database. The invoice repository owns the line item store so that
//! invoice+items writes are all-or-nothing and invoice deletion removes the
//! items, mirroring the Postgres transaction and cascade behavior.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::domain::billing::entities::{Client, Invoice, InvoiceLineItem, Payment};
use crate::domain::billing::errors::BillingError;
use crate::domain::billing::ports::{
  ClientRepository, InvoiceLineItemRepository, InvoiceNumberSequence, InvoiceRepository,
  PaymentRepository,
};
use crate::domain::billing::value_objects::InvoiceStatus;

type LineItemStore = Arc<RwLock<HashMap<Uuid, InvoiceLineItem>>>;

#[derive(Default)]
pub struct InMemoryClientRepository {
  clients: RwLock<HashMap<Uuid, Client>>,
}

impl InMemoryClientRepository {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
  async fn create(&self, client: Client) -> Result<Client, BillingError> {
    let mut clients = self.clients.write().unwrap();
    clients.insert(client.id, client.clone());
    Ok(client)
  }

  async fn update(&self, client: Client) -> Result<Client, BillingError> {
    let mut clients = self.clients.write().unwrap();
    if !clients.contains_key(&client.id) {
      return Err(BillingError::ClientNotFound(client.id));
    }
    clients.insert(client.id, client.clone());
    Ok(client)
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    let mut clients = self.clients.write().unwrap();
    clients
      .remove(&id)
      .map(|_| ())
      .ok_or(BillingError::ClientNotFound(id))
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Client>, BillingError> {
    Ok(self.clients.read().unwrap().get(&id).cloned())
  }

  async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Client>, BillingError> {
    let clients = self.clients.read().unwrap();
    let mut result: Vec<Client> = clients
      .values()
      .filter(|c| c.user_id == user_id)
      .cloned()
      .collect();
    result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(result)
  }

  async fn exists_by_name(
    &self,
    user_id: Uuid,
    company_name: &str,
    exclude_id: Option<Uuid>,
  ) -> Result<bool, BillingError> {
    let clients = self.clients.read().unwrap();
    Ok(clients.values().any(|c| {
      c.user_id == user_id
        && c.company_name.value().eq_ignore_ascii_case(company_name)
        && Some(c.id) != exclude_id
    }))
  }
}

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
  invoices: RwLock<HashMap<Uuid, Invoice>>,
  line_items: LineItemStore,
}

impl InMemoryInvoiceRepository {
  pub fn new() -> Self {
    Self::default()
  }

  /// Read-only line item repository sharing this repository's store.
  pub fn line_item_repository(&self) -> InMemoryInvoiceLineItemRepository {
    InMemoryInvoiceLineItemRepository {
      line_items: Arc::clone(&self.line_items),
    }
  }

  fn filter_sorted(&self, predicate: impl Fn(&Invoice) -> bool) -> Vec<Invoice> {
    let invoices = self.invoices.read().unwrap();
    let mut result: Vec<Invoice> = invoices.values().filter(|i| predicate(i)).cloned().collect();
    result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    result
  }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
  async fn create_with_items(
    &self,
    invoice: Invoice,
    line_items: Vec<InvoiceLineItem>,
  ) -> Result<(Invoice, Vec<InvoiceLineItem>), BillingError> {
    let mut invoices = self.invoices.write().unwrap();

    // Validate before touching either map so a failure stores nothing
    if invoices
      .values()
      .any(|i| i.invoice_number == invoice.invoice_number)
    {
      return Err(BillingError::InvoiceNumberAlreadyExists(
        invoice.invoice_number.value().to_string(),
      ));
    }

    invoices.insert(invoice.id, invoice.clone());
    let mut items = self.line_items.write().unwrap();
    for item in &line_items {
      items.insert(item.id, item.clone());
    }
    Ok((invoice, line_items))
  }

  async fn update_with_items(
    &self,
    invoice: Invoice,
    line_items: Vec<InvoiceLineItem>,
  ) -> Result<(Invoice, Vec<InvoiceLineItem>), BillingError> {
    let mut invoices = self.invoices.write().unwrap();
    if !invoices.contains_key(&invoice.id) {
      return Err(BillingError::InvoiceNotFound(invoice.id));
    }

    invoices.insert(invoice.id, invoice.clone());
    let mut items = self.line_items.write().unwrap();
    items.retain(|_, item| item.invoice_id != invoice.id);
    for item in &line_items {
      items.insert(item.id, item.clone());
    }
    Ok((invoice, line_items))
  }

  async fn update(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
    let mut invoices = self.invoices.write().unwrap();
    if !invoices.contains_key(&invoice.id) {
      return Err(BillingError::InvoiceNotFound(invoice.id));
    }
    invoices.insert(invoice.id, invoice.clone());
    Ok(invoice)
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    let mut invoices = self.invoices.write().unwrap();
    invoices
      .remove(&id)
      .ok_or(BillingError::InvoiceNotFound(id))?;
    // Items go with the invoice, like the schema cascade
    let mut items = self.line_items.write().unwrap();
    items.retain(|_, item| item.invoice_id != id);
    Ok(())
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, BillingError> {
    Ok(self.invoices.read().unwrap().get(&id).cloned())
  }

  async fn find_by_user_id(&self, user_id: Uuid) -> Result<Vec<Invoice>, BillingError> {
    Ok(self.filter_sorted(|i| i.user_id == user_id))
  }

  async fn find_by_user_and_status(
    &self,
    user_id: Uuid,
    status: InvoiceStatus,
  ) -> Result<Vec<Invoice>, BillingError> {
    Ok(self.filter_sorted(|i| i.user_id == user_id && i.status == status))
  }

  async fn find_by_user_and_client(
    &self,
    user_id: Uuid,
    client_id: Uuid,
  ) -> Result<Vec<Invoice>, BillingError> {
    Ok(self.filter_sorted(|i| i.user_id == user_id && i.client_id == client_id))
  }

  async fn find_due_before(
    &self,
    user_id: Uuid,
    current_date: NaiveDate,
  ) -> Result<Vec<Invoice>, BillingError> {
    Ok(self.filter_sorted(|i| {
      i.user_id == user_id && i.status == InvoiceStatus::Sent && i.due_date < current_date
    }))
  }

  async fn count_by_client_id(&self, client_id: Uuid) -> Result<i64, BillingError> {
    let invoices = self.invoices.read().unwrap();
    Ok(invoices.values().filter(|i| i.client_id == client_id).count() as i64)
  }
}

pub struct InMemoryInvoiceLineItemRepository {
  line_items: LineItemStore,
}

#[async_trait]
impl InvoiceLineItemRepository for InMemoryInvoiceLineItemRepository {
  async fn find_by_invoice_id(
    &self,
    invoice_id: Uuid,
  ) -> Result<Vec<InvoiceLineItem>, BillingError> {
    let store = self.line_items.read().unwrap();
    let mut result: Vec<InvoiceLineItem> = store
      .values()
      .filter(|item| item.invoice_id == invoice_id)
      .cloned()
      .collect();
    result.sort_by_key(|item| item.line_order);
    Ok(result)
  }
}

#[derive(Default)]
pub struct InMemoryPaymentRepository {
  payments: RwLock<HashMap<Uuid, Payment>>,
}

impl InMemoryPaymentRepository {
  pub fn new() -> Self {
    Self::default()
  }

  fn filter_sorted(&self, predicate: impl Fn(&Payment) -> bool) -> Vec<Payment> {
    let payments = self.payments.read().unwrap();
    let mut result: Vec<Payment> = payments.values().filter(|p| predicate(p)).cloned().collect();
    result.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
    result
  }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
  async fn create(&self, payment: Payment) -> Result<Payment, BillingError> {
    let mut payments = self.payments.write().unwrap();
    payments.insert(payment.id, payment.clone());
    Ok(payment)
  }

  async fn update(&self, payment: Payment) -> Result<Payment, BillingError> {
    let mut payments = self.payments.write().unwrap();
    if !payments.contains_key(&payment.id) {
      return Err(BillingError::PaymentNotFound(payment.id));
    }
    payments.insert(payment.id, payment.clone());
    Ok(payment)
  }

  async fn delete(&self, id: Uuid) -> Result<(), BillingError> {
    let mut payments = self.payments.write().unwrap();
    payments
      .remove(&id)
      .map(|_| ())
      .ok_or(BillingError::PaymentNotFound(id))
  }

  async fn delete_by_invoice_id(&self, invoice_id: Uuid) -> Result<(), BillingError> {
    let mut payments = self.payments.write().unwrap();
    payments.retain(|_, p| p.invoice_id != invoice_id);
    Ok(())
  }

  async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BillingError> {
    Ok(self.payments.read().unwrap().get(&id).cloned())
  }

  async fn find_by_invoice_id(&self, invoice_id: Uuid) -> Result<Vec<Payment>, BillingError> {
    Ok(self.filter_sorted(|p| p.invoice_id == invoice_id))
  }

  async fn find_completed_by_invoice_id(
    &self,
    invoice_id: Uuid,
  ) -> Result<Vec<Payment>, BillingError> {
    Ok(self.filter_sorted(|p| p.invoice_id == invoice_id && p.status.counts_toward_coverage()))
  }
}

#[derive(Default)]
pub struct InMemoryInvoiceNumberSequence {
  counters: Mutex<HashMap<i32, i64>>,
}

impl InMemoryInvoiceNumberSequence {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl InvoiceNumberSequence for InMemoryInvoiceNumberSequence {
  async fn next(&self, year: i32) -> Result<i64, BillingError> {
    let mut counters = self.counters.lock().unwrap();
    let counter = counters.entry(year).or_insert(0);
    *counter += 1;
    Ok(*counter)
  }
}
