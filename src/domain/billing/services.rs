use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::entities::{Client, Invoice, InvoiceLineItem, Payment};
use super::errors::BillingError;
use super::ports::{
  ClientRepository, InvoiceLineItemRepository, InvoiceNumberSequence, InvoiceRepository,
  PaymentRepository,
};
use super::value_objects::{
  ClientAddress, ClientName, ClientStatus, ContactPerson, Currency, InvoiceNumber, InvoiceStatus,
  LineItemDescription, Money, PaymentMethod, PaymentReference, PaymentStatus, Quantity,
  ValueObjectError, VatRate,
};

/// Line item input, already validated into value objects.
pub struct LineItemInput {
  pub description: LineItemDescription,
  pub quantity: Quantity,
  pub unit_price: Money,
  pub vat_rate: VatRate,
  pub vat_inclusive: bool,
}

/// Invoice creation data
pub struct InvoiceData {
  pub client_id: Uuid,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub currency: Currency,
  /// Draft or Sent; defaults to Sent when unspecified.
  pub status: Option<InvoiceStatus>,
  pub notes: Option<String>,
  pub terms: Option<String>,
  pub line_items: Vec<LineItemInput>,
}

/// Client creation/update data
pub struct ClientData {
  pub company_name: ClientName,
  pub contact_person: ContactPerson,
  pub vat_number: Option<String>,
  pub address: Option<ClientAddress>,
  pub is_vat_registered: bool,
  pub payment_terms_days: i32,
}

/// Payment creation data. The amount currency is taken from the invoice.
pub struct PaymentData {
  pub invoice_id: Uuid,
  pub client_id: Uuid,
  pub amount: Decimal,
  pub payment_method: PaymentMethod,
  pub status: PaymentStatus,
  pub payment_date: Option<DateTime<Utc>>,
  pub reference: PaymentReference,
  pub notes: Option<String>,
  pub vat_inclusive: bool,
}

/// Invoice with everything the caller needs to render or report on it.
#[derive(Debug)]
pub struct InvoiceDetails {
  pub invoice: Invoice,
  pub line_items: Vec<InvoiceLineItem>,
  pub client: Client,
  pub payments: Vec<Payment>,
  pub total_paid: Money,
  pub balance_due: Money,
}

pub struct BillingServiceDependencies {
  pub client_repo: Arc<dyn ClientRepository>,
  pub invoice_repo: Arc<dyn InvoiceRepository>,
  pub line_item_repo: Arc<dyn InvoiceLineItemRepository>,
  pub payment_repo: Arc<dyn PaymentRepository>,
  pub invoice_sequence: Arc<dyn InvoiceNumberSequence>,
}

pub struct BillingService {
  client_repo: Arc<dyn ClientRepository>,
  invoice_repo: Arc<dyn InvoiceRepository>,
  line_item_repo: Arc<dyn InvoiceLineItemRepository>,
  payment_repo: Arc<dyn PaymentRepository>,
  invoice_sequence: Arc<dyn InvoiceNumberSequence>,
  /// Invoices with a reconciliation in flight. At most one reconciliation
  /// may run per invoice; a second caller gets ReconciliationConflict and
  /// retries.
  reconciling: Mutex<HashSet<Uuid>>,
}

/// Releases the per-invoice reconciliation slot on drop.
#[derive(Debug)]
struct ReconcileGuard<'a> {
  reconciling: &'a Mutex<HashSet<Uuid>>,
  invoice_id: Uuid,
}

impl Drop for ReconcileGuard<'_> {
  fn drop(&mut self) {
    // Release even through poisoning; the set itself is never left invalid
    self
      .reconciling
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .remove(&self.invoice_id);
  }
}

impl BillingService {
  pub fn new(deps: BillingServiceDependencies) -> Self {
    Self {
      client_repo: deps.client_repo,
      invoice_repo: deps.invoice_repo,
      line_item_repo: deps.line_item_repo,
      payment_repo: deps.payment_repo,
      invoice_sequence: deps.invoice_sequence,
      reconciling: Mutex::new(HashSet::new()),
    }
  }

  // Client operations

  pub async fn create_client(&self, user_id: Uuid, data: ClientData) -> Result<Client, BillingError> {
    if self
      .client_repo
      .exists_by_name(user_id, data.company_name.value(), None)
      .await?
    {
      return Err(BillingError::ClientNameAlreadyExists);
    }

    let client = Client::new(
      user_id,
      data.company_name,
      data.contact_person,
      data.vat_number,
      data.address,
      data.is_vat_registered,
      data.payment_terms_days,
    );
    self.client_repo.create(client).await
  }

  pub async fn update_client(
    &self,
    user_id: Uuid,
    client_id: Uuid,
    data: ClientData,
    status: ClientStatus,
  ) -> Result<Client, BillingError> {
    let mut client = self.get_owned_client(user_id, client_id).await?;

    if self
      .client_repo
      .exists_by_name(user_id, data.company_name.value(), Some(client_id))
      .await?
    {
      return Err(BillingError::ClientNameAlreadyExists);
    }

    client.update(
      data.company_name,
      data.contact_person,
      data.vat_number,
      data.address,
      data.is_vat_registered,
      data.payment_terms_days,
      status,
    );
    self.client_repo.update(client).await
  }

  /// Deleting a client with existing invoices is forbidden; invoices are the
  /// tax record and must outlive the client entry.
  pub async fn delete_client(&self, user_id: Uuid, client_id: Uuid) -> Result<(), BillingError> {
    let client = self.get_owned_client(user_id, client_id).await?;

    let invoice_count = self.invoice_repo.count_by_client_id(client.id).await?;
    if invoice_count > 0 {
      return Err(BillingError::ClientHasInvoices {
        client_id: client.id,
        invoice_count,
      });
    }

    self.client_repo.delete(client.id).await
  }

  pub async fn get_client(&self, user_id: Uuid, client_id: Uuid) -> Result<Client, BillingError> {
    self.get_owned_client(user_id, client_id).await
  }

  pub async fn list_clients(&self, user_id: Uuid) -> Result<Vec<Client>, BillingError> {
    self.client_repo.find_by_user_id(user_id).await
  }

  // Invoice operations

  pub async fn create_invoice(
    &self,
    user_id: Uuid,
    data: InvoiceData,
    now: DateTime<Utc>,
  ) -> Result<(Invoice, Vec<InvoiceLineItem>), BillingError> {
    let client = self.get_owned_client(user_id, data.client_id).await?;

    // Validate before allocating an invoice number; a rejected create must
    // not consume a sequence value.
    if data.line_items.is_empty() {
      return Err(BillingError::NoLineItems);
    }
    if data.due_date < data.issue_date {
      return Err(BillingError::InvalidDueDate {
        issue_date: data.issue_date,
        due_date: data.due_date,
      });
    }
    for item in &data.line_items {
      if item.unit_price.currency != data.currency {
        return Err(BillingError::CurrencyMismatch {
          expected: data.currency.as_str().to_string(),
          actual: item.unit_price.currency.as_str().to_string(),
        });
      }
    }

    let status = data.status.unwrap_or(InvoiceStatus::Sent);
    if !status.is_valid_at_creation() {
      return Err(BillingError::Validation(
        ValueObjectError::InvalidInvoiceStatus(format!(
          "Invoices are created as draft or sent, not {}",
          status.as_str()
        )),
      ));
    }

    let year = now.year();
    let sequence = self.invoice_sequence.next(year).await?;
    let invoice_number = InvoiceNumber::generate(year, sequence);

    let mut invoice = Invoice::new(
      user_id,
      client.id,
      invoice_number,
      data.issue_date,
      data.due_date,
      data.currency,
      status,
      data.notes,
      data.terms,
    );

    let line_items: Vec<InvoiceLineItem> = data
      .line_items
      .into_iter()
      .enumerate()
      .map(|(i, item)| {
        InvoiceLineItem::new(
          invoice.id,
          item.description,
          item.quantity,
          item.unit_price,
          item.vat_rate,
          item.vat_inclusive,
          (i + 1) as i32,
        )
      })
      .collect();

    invoice.recompute_totals(&line_items);

    let (created_invoice, created_items) = self
      .invoice_repo
      .create_with_items(invoice, line_items)
      .await?;

    tracing::info!(
      invoice_id = %created_invoice.id,
      invoice_number = %created_invoice.invoice_number,
      total = %created_invoice.total,
      "invoice created"
    );

    Ok((created_invoice, created_items))
  }

  /// Full item replacement; partial patches are not supported. Totals are
  /// re-derived and, for non-draft invoices, the status is re-reconciled so
  /// it stays consistent with actual payment coverage.
  pub async fn update_invoice_items(
    &self,
    user_id: Uuid,
    invoice_id: Uuid,
    line_items: Vec<LineItemInput>,
    now: DateTime<Utc>,
  ) -> Result<(Invoice, Vec<InvoiceLineItem>), BillingError> {
    let mut invoice = self.get_owned_invoice(user_id, invoice_id).await?;

    if !invoice.status.allows_item_changes() {
      return Err(BillingError::CannotModifyInvoice(format!(
        "Items cannot be changed on a {} invoice",
        invoice.status.as_str()
      )));
    }
    if line_items.is_empty() {
      return Err(BillingError::NoLineItems);
    }
    for item in &line_items {
      if item.unit_price.currency != invoice.currency {
        return Err(BillingError::CurrencyMismatch {
          expected: invoice.currency.as_str().to_string(),
          actual: item.unit_price.currency.as_str().to_string(),
        });
      }
    }

    let items: Vec<InvoiceLineItem> = line_items
      .into_iter()
      .enumerate()
      .map(|(i, item)| {
        InvoiceLineItem::new(
          invoice.id,
          item.description,
          item.quantity,
          item.unit_price,
          item.vat_rate,
          item.vat_inclusive,
          (i + 1) as i32,
        )
      })
      .collect();

    invoice.recompute_totals(&items);
    let was_draft = invoice.status == InvoiceStatus::Draft;

    let (updated_invoice, created_items) =
      self.invoice_repo.update_with_items(invoice, items).await?;

    // A changed total can flip coverage either way on a live invoice.
    let final_invoice = if was_draft {
      updated_invoice
    } else {
      self.reconcile_invoice(invoice_id, None, now).await?
    };

    Ok((final_invoice, created_items))
  }

  pub async fn change_invoice_status(
    &self,
    user_id: Uuid,
    invoice_id: Uuid,
    new_status: InvoiceStatus,
  ) -> Result<Invoice, BillingError> {
    let mut invoice = self.get_owned_invoice(user_id, invoice_id).await?;
    invoice.change_status(new_status)?;
    self.invoice_repo.update(invoice).await
  }

  /// Removes the invoice with its line items and every payment recorded
  /// against it.
  pub async fn delete_invoice(&self, user_id: Uuid, invoice_id: Uuid) -> Result<(), BillingError> {
    let invoice = self.get_owned_invoice(user_id, invoice_id).await?;

    self.payment_repo.delete_by_invoice_id(invoice.id).await?;
    self.invoice_repo.delete(invoice.id).await?;

    tracing::info!(
      invoice_id = %invoice.id,
      invoice_number = %invoice.invoice_number,
      "invoice deleted"
    );
    Ok(())
  }

  pub async fn get_invoice_with_details(
    &self,
    user_id: Uuid,
    invoice_id: Uuid,
  ) -> Result<InvoiceDetails, BillingError> {
    let invoice = self.get_owned_invoice(user_id, invoice_id).await?;

    let line_items = self.line_item_repo.find_by_invoice_id(invoice.id).await?;
    let client = self
      .client_repo
      .find_by_id(invoice.client_id)
      .await?
      .ok_or(BillingError::ClientNotFound(invoice.client_id))?;
    let payments = self.payment_repo.find_by_invoice_id(invoice.id).await?;

    let total_paid = Self::sum_completed(&payments, invoice.currency)?;
    let balance_due = invoice.total.saturating_sub(&total_paid)?;

    Ok(InvoiceDetails {
      invoice,
      line_items,
      client,
      payments,
      total_paid,
      balance_due,
    })
  }

  pub async fn list_invoices(
    &self,
    user_id: Uuid,
    status_filter: Option<InvoiceStatus>,
    client_filter: Option<Uuid>,
  ) -> Result<Vec<Invoice>, BillingError> {
    if let Some(status) = status_filter {
      self
        .invoice_repo
        .find_by_user_and_status(user_id, status)
        .await
    } else if let Some(client_id) = client_filter {
      self
        .invoice_repo
        .find_by_user_and_client(user_id, client_id)
        .await
    } else {
      self.invoice_repo.find_by_user_id(user_id).await
    }
  }

  /// Sweep: Sent invoices past their due date become Overdue.
  pub async fn mark_overdue_invoices(
    &self,
    user_id: Uuid,
    current_date: NaiveDate,
  ) -> Result<Vec<Invoice>, BillingError> {
    let due_invoices = self
      .invoice_repo
      .find_due_before(user_id, current_date)
      .await?;

    let mut updated = Vec::new();
    for mut invoice in due_invoices {
      if invoice.is_overdue(current_date) {
        invoice.mark_unpaid(current_date);
        let saved = self.invoice_repo.update(invoice).await?;
        tracing::debug!(invoice_id = %saved.id, "invoice marked overdue");
        updated.push(saved);
      }
    }

    Ok(updated)
  }

  // Payment operations

  pub async fn record_payment(
    &self,
    user_id: Uuid,
    data: PaymentData,
    now: DateTime<Utc>,
  ) -> Result<(Payment, Invoice), BillingError> {
    let invoice = self.get_owned_invoice(user_id, data.invoice_id).await?;
    let client = self.get_owned_client(user_id, data.client_id).await?;

    if client.id != invoice.client_id {
      return Err(BillingError::PermissionDenied(
        "Payment client does not match the invoice client".to_string(),
      ));
    }
    if !matches!(data.status, PaymentStatus::Pending | PaymentStatus::Completed) {
      return Err(BillingError::Validation(
        ValueObjectError::InvalidPaymentStatus(
          "Payments are created as pending or completed".to_string(),
        ),
      ));
    }

    let amount = Money::new(data.amount, invoice.currency)?;
    let payment = Payment::new(
      user_id,
      client.id,
      invoice.id,
      amount,
      data.payment_method,
      data.status,
      data.payment_date.unwrap_or(now),
      data.reference,
      data.notes,
      data.vat_inclusive,
    )?;

    let created = self.payment_repo.create(payment).await?;
    tracing::info!(
      payment_id = %created.id,
      invoice_id = %invoice.id,
      amount = %created.amount,
      status = created.status.as_str(),
      "payment recorded"
    );

    let invoice = if created.status.counts_toward_coverage() {
      self.reconcile_invoice(invoice.id, Some(&created), now).await?
    } else {
      invoice
    };

    Ok((created, invoice))
  }

  pub async fn update_payment_status(
    &self,
    user_id: Uuid,
    payment_id: Uuid,
    new_status: PaymentStatus,
    now: DateTime<Utc>,
  ) -> Result<(Payment, Invoice), BillingError> {
    let mut payment = self.get_owned_payment(user_id, payment_id).await?;
    let invoice_id = payment.invoice_id;

    if payment.status == new_status {
      let invoice = self.get_owned_invoice(user_id, invoice_id).await?;
      return Ok((payment, invoice));
    }

    let counted_before = payment.status.counts_toward_coverage();
    payment.change_status(new_status)?;
    let counted_after = payment.status.counts_toward_coverage();

    let updated = self.payment_repo.update(payment).await?;

    let invoice = if counted_before != counted_after {
      let trigger = counted_after.then_some(&updated);
      self.reconcile_invoice(invoice_id, trigger, now).await?
    } else {
      self.get_owned_invoice(user_id, invoice_id).await?
    };

    Ok((updated, invoice))
  }

  pub async fn delete_payment(
    &self,
    user_id: Uuid,
    payment_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Invoice, BillingError> {
    let payment = self.get_owned_payment(user_id, payment_id).await?;
    let invoice_id = payment.invoice_id;
    let counted = payment.status.counts_toward_coverage();

    self.payment_repo.delete(payment.id).await?;
    tracing::info!(payment_id = %payment.id, invoice_id = %invoice_id, "payment deleted");

    if counted {
      self.reconcile_invoice(invoice_id, None, now).await
    } else {
      self.get_owned_invoice(user_id, invoice_id).await
    }
  }

  pub async fn list_invoice_payments(
    &self,
    user_id: Uuid,
    invoice_id: Uuid,
  ) -> Result<Vec<Payment>, BillingError> {
    let invoice = self.get_owned_invoice(user_id, invoice_id).await?;
    self.payment_repo.find_by_invoice_id(invoice.id).await
  }

  // Reconciliation engine

  /// Re-derive the invoice's paid state from its completed payments.
  ///
  /// `trigger` is the payment event that caused this run, used to stamp the
  /// invoice's payment details when coverage is reached. `now` determines
  /// the Sent/Overdue split on downgrade; callers inject it rather than the
  /// engine reading the clock.
  pub async fn reconcile_invoice(
    &self,
    invoice_id: Uuid,
    trigger: Option<&Payment>,
    now: DateTime<Utc>,
  ) -> Result<Invoice, BillingError> {
    let _guard = self.lock_invoice(invoice_id)?;

    let mut invoice = self
      .invoice_repo
      .find_by_id(invoice_id)
      .await?
      .ok_or(BillingError::InvoiceNotFound(invoice_id))?;

    // Draft and cancelled invoices are never driven by payment events.
    if !invoice.status.is_reconcilable() {
      return Ok(invoice);
    }

    let completed = self
      .payment_repo
      .find_completed_by_invoice_id(invoice_id)
      .await?;
    let total_paid = Self::sum_completed(&completed, invoice.currency)?;

    if total_paid.covers(&invoice.total) {
      // Stamp details from the triggering payment, falling back to the most
      // recent completed payment when the trigger was a deletion or total
      // change.
      let stamp = trigger.or_else(|| {
        completed
          .iter()
          .max_by_key(|p| p.payment_date)
      });
      let (date, method, transaction_id) = match stamp {
        Some(p) => (
          p.payment_date,
          Some(p.payment_method),
          Some(p.reference.value().to_string()),
        ),
        None => (now, None, None),
      };
      invoice.mark_paid(date, method, transaction_id);
    } else {
      invoice.mark_unpaid(now.date_naive());
    }

    let saved = self.invoice_repo.update(invoice).await?;
    tracing::info!(
      invoice_id = %saved.id,
      total_paid = %total_paid,
      total = %saved.total,
      status = saved.status.as_str(),
      "invoice reconciled"
    );

    Ok(saved)
  }

  // Helper methods

  fn lock_invoice(&self, invoice_id: Uuid) -> Result<ReconcileGuard<'_>, BillingError> {
    let mut in_flight = self
      .reconciling
      .lock()
      .map_err(|_| BillingError::Internal("reconciliation registry poisoned".to_string()))?;
    if !in_flight.insert(invoice_id) {
      return Err(BillingError::ReconciliationConflict(invoice_id));
    }
    Ok(ReconcileGuard {
      reconciling: &self.reconciling,
      invoice_id,
    })
  }

  fn sum_completed(payments: &[Payment], currency: Currency) -> Result<Money, BillingError> {
    let mut total = Money::zero(currency);
    for payment in payments.iter().filter(|p| p.status.counts_toward_coverage()) {
      total = total.add(&payment.amount)?;
    }
    Ok(total)
  }

  /// Ownership is checked on every lookup; a foreign entity reads as absent
  /// so that cross-tenant probing cannot confirm existence.
  async fn get_owned_client(&self, user_id: Uuid, client_id: Uuid) -> Result<Client, BillingError> {
    match self.client_repo.find_by_id(client_id).await? {
      Some(client) if client.user_id == user_id => Ok(client),
      _ => Err(BillingError::ClientNotFound(client_id)),
    }
  }

  async fn get_owned_invoice(
    &self,
    user_id: Uuid,
    invoice_id: Uuid,
  ) -> Result<Invoice, BillingError> {
    match self.invoice_repo.find_by_id(invoice_id).await? {
      Some(invoice) if invoice.user_id == user_id => Ok(invoice),
      _ => Err(BillingError::InvoiceNotFound(invoice_id)),
    }
  }

  async fn get_owned_payment(
    &self,
    user_id: Uuid,
    payment_id: Uuid,
  ) -> Result<Payment, BillingError> {
    match self.payment_repo.find_by_id(payment_id).await? {
      Some(payment) if payment.user_id == user_id => Ok(payment),
      _ => Err(BillingError::PaymentNotFound(payment_id)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::infrastructure::persistence::memory::{
    InMemoryClientRepository, InMemoryInvoiceNumberSequence, InMemoryInvoiceRepository,
    InMemoryPaymentRepository,
  };
  use async_trait::async_trait;
  use chrono::TimeZone;
  use rust_decimal_macros::dec;

  fn service() -> BillingService {
    service_with_sequence(Arc::new(InMemoryInvoiceNumberSequence::new()))
  }

  fn service_with_sequence(invoice_sequence: Arc<dyn InvoiceNumberSequence>) -> BillingService {
    let invoice_repo = Arc::new(InMemoryInvoiceRepository::new());
    let line_item_repo = Arc::new(invoice_repo.line_item_repository());
    BillingService::new(BillingServiceDependencies {
      client_repo: Arc::new(InMemoryClientRepository::new()),
      invoice_repo,
      line_item_repo,
      payment_repo: Arc::new(InMemoryPaymentRepository::new()),
      invoice_sequence,
    })
  }

  fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
  }

  fn client_data(name: &str) -> ClientData {
    ClientData {
      company_name: ClientName::new(name.to_string()).unwrap(),
      contact_person: ContactPerson::new("Thandi Nkosi".to_string(), None, None, None).unwrap(),
      vat_number: None,
      address: None,
      is_vat_registered: true,
      payment_terms_days: 30,
    }
  }

  fn line_input(quantity: Decimal, unit_price: Decimal, vat_inclusive: bool) -> LineItemInput {
    LineItemInput {
      description: LineItemDescription::new("Consulting".to_string()).unwrap(),
      quantity: Quantity::new(quantity).unwrap(),
      unit_price: Money::new(unit_price, Currency::ZAR).unwrap(),
      vat_rate: VatRate::standard(),
      vat_inclusive,
    }
  }

  fn invoice_data(client_id: Uuid, line_items: Vec<LineItemInput>) -> InvoiceData {
    InvoiceData {
      client_id,
      issue_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
      due_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
      currency: Currency::ZAR,
      status: None,
      notes: None,
      terms: None,
      line_items,
    }
  }

  fn payment_data(
    invoice_id: Uuid,
    client_id: Uuid,
    amount: Decimal,
    status: PaymentStatus,
  ) -> PaymentData {
    PaymentData {
      invoice_id,
      client_id,
      amount,
      payment_method: PaymentMethod::BankTransfer,
      status,
      payment_date: None,
      reference: PaymentReference::new(format!("EFT-{}", amount)).unwrap(),
      notes: None,
      vat_inclusive: true,
    }
  }

  async fn setup() -> (BillingService, Uuid, Uuid) {
    let svc = service();
    let user_id = Uuid::new_v4();
    let client = svc.create_client(user_id, client_data("Protea Trading")).await.unwrap();
    (svc, user_id, client.id)
  }

  /// Invoice with one exclusive line: net 200.00, VAT 30.00, total 230.00.
  async fn invoice_230(svc: &BillingService, user_id: Uuid, client_id: Uuid) -> Invoice {
    let (invoice, _) = svc
      .create_invoice(
        user_id,
        invoice_data(client_id, vec![line_input(dec!(2), dec!(100), false)]),
        fixed_now(),
      )
      .await
      .unwrap();
    invoice
  }

  #[tokio::test]
  async fn test_create_invoice_computes_totals_and_number() {
    let (svc, user_id, client_id) = setup().await;

    let invoice = invoice_230(&svc, user_id, client_id).await;
    assert_eq!(invoice.invoice_number.value(), "INV-2026-00001");
    assert_eq!(invoice.subtotal.amount, dec!(200.00));
    assert_eq!(invoice.vat_total.amount, dec!(30.00));
    assert_eq!(invoice.total.amount, dec!(230.00));
    // Sent is the default creation status
    assert_eq!(invoice.status, InvoiceStatus::Sent);

    let second = invoice_230(&svc, user_id, client_id).await;
    assert_eq!(second.invoice_number.value(), "INV-2026-00002");
  }

  #[tokio::test]
  async fn test_create_invoice_with_empty_items_rejected() {
    let (svc, user_id, client_id) = setup().await;

    let err = svc
      .create_invoice(user_id, invoice_data(client_id, vec![]), fixed_now())
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::NoLineItems));

    // The failed create must not have consumed a sequence value
    let invoice = invoice_230(&svc, user_id, client_id).await;
    assert_eq!(invoice.invoice_number.value(), "INV-2026-00001");
  }

  #[tokio::test]
  async fn test_create_invoice_rejects_due_before_issue() {
    let (svc, user_id, client_id) = setup().await;

    let mut data = invoice_data(client_id, vec![line_input(dec!(1), dec!(100), true)]);
    data.due_date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

    let err = svc.create_invoice(user_id, data, fixed_now()).await.unwrap_err();
    assert!(matches!(err, BillingError::InvalidDueDate { .. }));
  }

  #[tokio::test]
  async fn test_create_invoice_rejects_currency_mismatch() {
    let (svc, user_id, client_id) = setup().await;

    let mut data = invoice_data(client_id, vec![line_input(dec!(1), dec!(100), true)]);
    data.line_items[0].unit_price = Money::new(dec!(100), Currency::USD).unwrap();

    let err = svc.create_invoice(user_id, data, fixed_now()).await.unwrap_err();
    assert!(matches!(err, BillingError::CurrencyMismatch { .. }));
  }

  #[tokio::test]
  async fn test_create_invoice_for_foreign_client_reads_as_not_found() {
    let (svc, _owner, client_id) = setup().await;
    let other_user = Uuid::new_v4();

    let err = svc
      .create_invoice(
        other_user,
        invoice_data(client_id, vec![line_input(dec!(1), dec!(100), true)]),
        fixed_now(),
      )
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::ClientNotFound(_)));
  }

  #[tokio::test]
  async fn test_partial_payments_accumulate_to_paid() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    // Payment 1: 100 completed, invoice stays sent
    let (_, invoice_after) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(100), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Sent);
    assert!(!invoice_after.payment_details.paid);

    // Payment 2: 130 completed, coverage reaches 230
    let (payment2, invoice_after) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(130), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Paid);
    assert!(invoice_after.payment_details.paid);
    assert_eq!(
      invoice_after.payment_details.transaction_id.as_deref(),
      Some(payment2.reference.value())
    );
  }

  #[tokio::test]
  async fn test_deleting_covering_payment_downgrades_to_sent() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(100), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();
    let (payment2, paid_invoice) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(130), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();
    assert_eq!(paid_invoice.status, InvoiceStatus::Paid);

    // Due date is still in the future at fixed_now
    let invoice_after = svc
      .delete_payment(user_id, payment2.id, fixed_now())
      .await
      .unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Sent);
    assert!(!invoice_after.payment_details.paid);
  }

  #[tokio::test]
  async fn test_deleting_covering_payment_after_due_date_downgrades_to_overdue() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    let (payment, _) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(230), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();

    let after_due = Utc.with_ymd_and_hms(2026, 4, 15, 9, 0, 0).unwrap();
    let invoice_after = svc.delete_payment(user_id, payment.id, after_due).await.unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Overdue);
  }

  #[tokio::test]
  async fn test_pending_payment_does_not_affect_coverage() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    let (payment, invoice_after) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(230), PaymentStatus::Pending),
        fixed_now(),
      )
      .await
      .unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Sent);

    // Completing the payment flips the invoice to paid
    let (_, invoice_after) = svc
      .update_payment_status(user_id, payment.id, PaymentStatus::Completed, fixed_now())
      .await
      .unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Paid);
  }

  #[tokio::test]
  async fn test_refunding_covering_payment_downgrades() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    let (payment, paid_invoice) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(230), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();
    assert_eq!(paid_invoice.status, InvoiceStatus::Paid);

    let (_, invoice_after) = svc
      .update_payment_status(user_id, payment.id, PaymentStatus::Refunded, fixed_now())
      .await
      .unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Sent);
  }

  #[tokio::test]
  async fn test_failing_pending_payment_does_not_reconcile() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    let (payment, _) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(230), PaymentStatus::Pending),
        fixed_now(),
      )
      .await
      .unwrap();

    let (_, invoice_after) = svc
      .update_payment_status(user_id, payment.id, PaymentStatus::Failed, fixed_now())
      .await
      .unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Sent);
  }

  #[tokio::test]
  async fn test_coverage_tolerates_minor_unit_rounding() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    // 229.999 rounds to 230.00 at the minor unit
    let (_, invoice_after) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(229.999), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Paid);
  }

  #[tokio::test]
  async fn test_payment_client_must_match_invoice_client() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;
    let other_client = svc
      .create_client(user_id, client_data("Karoo Supplies"))
      .await
      .unwrap();

    let err = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, other_client.id, dec!(230), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::PermissionDenied(_)));
  }

  #[tokio::test]
  async fn test_payment_against_foreign_invoice_reads_as_not_found() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;
    let stranger = Uuid::new_v4();

    let err = svc
      .record_payment(
        stranger,
        payment_data(invoice.id, client_id, dec!(230), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::InvoiceNotFound(_)));
  }

  #[tokio::test]
  async fn test_payment_cannot_be_created_refunded() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    let err = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(230), PaymentStatus::Refunded),
        fixed_now(),
      )
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));
  }

  #[tokio::test]
  async fn test_reconciliation_ignores_draft_and_cancelled() {
    let (svc, user_id, client_id) = setup().await;

    let mut data = invoice_data(client_id, vec![line_input(dec!(2), dec!(100), false)]);
    data.status = Some(InvoiceStatus::Draft);
    let (draft, _) = svc.create_invoice(user_id, data, fixed_now()).await.unwrap();

    let reconciled = svc.reconcile_invoice(draft.id, None, fixed_now()).await.unwrap();
    assert_eq!(reconciled.status, InvoiceStatus::Draft);

    let cancelled = svc
      .change_invoice_status(user_id, draft.id, InvoiceStatus::Cancelled)
      .await
      .unwrap();
    let reconciled = svc
      .reconcile_invoice(cancelled.id, None, fixed_now())
      .await
      .unwrap();
    assert_eq!(reconciled.status, InvoiceStatus::Cancelled);
  }

  #[tokio::test]
  async fn test_concurrent_reconciliation_conflicts() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    let guard = svc.lock_invoice(invoice.id).unwrap();
    let err = svc
      .reconcile_invoice(invoice.id, None, fixed_now())
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::ReconciliationConflict(_)));
    assert!(err.is_retryable());

    drop(guard);
    assert!(svc.reconcile_invoice(invoice.id, None, fixed_now()).await.is_ok());
  }

  #[tokio::test]
  async fn test_update_items_recomputes_totals_and_status() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    let (payment, paid_invoice) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(230), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();
    assert_eq!(paid_invoice.status, InvoiceStatus::Paid);

    // Items cannot change on a paid invoice
    let err = svc
      .update_invoice_items(
        user_id,
        invoice.id,
        vec![line_input(dec!(4), dec!(100), false)],
        fixed_now(),
      )
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::CannotModifyInvoice(_)));

    // Drop the covering payment, leave a partial one in place
    svc.delete_payment(user_id, payment.id, fixed_now()).await.unwrap();
    svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(115), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();

    // Growing the invoice keeps it sent
    let (updated, items) = svc
      .update_invoice_items(
        user_id,
        invoice.id,
        vec![line_input(dec!(4), dec!(100), false)],
        fixed_now(),
      )
      .await
      .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(updated.total.amount, dec!(460.00));
    assert_eq!(updated.status, InvoiceStatus::Sent);

    // Shrinking it below the amount already paid flips it to paid
    let (updated, _) = svc
      .update_invoice_items(
        user_id,
        invoice.id,
        vec![line_input(dec!(1), dec!(115), true)],
        fixed_now(),
      )
      .await
      .unwrap();
    assert_eq!(updated.total.amount, dec!(115.00));
    assert_eq!(updated.status, InvoiceStatus::Paid);
  }

  #[tokio::test]
  async fn test_update_items_requires_at_least_one() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    let err = svc
      .update_invoice_items(user_id, invoice.id, vec![], fixed_now())
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::NoLineItems));
  }

  #[tokio::test]
  async fn test_invoice_details_report_coverage() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(100), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();
    svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(50), PaymentStatus::Pending),
        fixed_now(),
      )
      .await
      .unwrap();

    let details = svc.get_invoice_with_details(user_id, invoice.id).await.unwrap();
    assert_eq!(details.line_items.len(), 1);
    assert_eq!(details.payments.len(), 2);
    // Pending payments do not count
    assert_eq!(details.total_paid.amount, dec!(100));
    assert_eq!(details.balance_due.amount, dec!(130.00));
  }

  #[tokio::test]
  async fn test_mark_overdue_sweep() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;

    let before_due = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
    assert!(svc.mark_overdue_invoices(user_id, before_due).await.unwrap().is_empty());

    let after_due = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
    let updated = svc.mark_overdue_invoices(user_id, after_due).await.unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, invoice.id);
    assert_eq!(updated[0].status, InvoiceStatus::Overdue);

    // Late payment still settles an overdue invoice
    let (_, invoice_after) = svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(230), PaymentStatus::Completed),
        Utc.with_ymd_and_hms(2026, 4, 2, 10, 0, 0).unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(invoice_after.status, InvoiceStatus::Paid);
  }

  #[tokio::test]
  async fn test_duplicate_client_name_rejected() {
    let (svc, user_id, _client_id) = setup().await;

    let err = svc
      .create_client(user_id, client_data("Protea Trading"))
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::ClientNameAlreadyExists));

    // Same name under a different user is fine
    assert!(svc.create_client(Uuid::new_v4(), client_data("Protea Trading")).await.is_ok());
  }

  #[tokio::test]
  async fn test_delete_client_with_invoices_forbidden() {
    let (svc, user_id, client_id) = setup().await;
    invoice_230(&svc, user_id, client_id).await;

    let err = svc.delete_client(user_id, client_id).await.unwrap_err();
    assert!(matches!(
      err,
      BillingError::ClientHasInvoices { invoice_count: 1, .. }
    ));

    let fresh = svc.create_client(user_id, client_data("Karoo Supplies")).await.unwrap();
    assert!(svc.delete_client(user_id, fresh.id).await.is_ok());
  }

  #[tokio::test]
  async fn test_send_and_cancel_transitions() {
    let (svc, user_id, client_id) = setup().await;

    let mut data = invoice_data(client_id, vec![line_input(dec!(1), dec!(500), true)]);
    data.status = Some(InvoiceStatus::Draft);
    let (draft, _) = svc.create_invoice(user_id, data, fixed_now()).await.unwrap();

    let sent = svc
      .change_invoice_status(user_id, draft.id, InvoiceStatus::Sent)
      .await
      .unwrap();
    assert_eq!(sent.status, InvoiceStatus::Sent);

    // Paid is not reachable by user action
    let err = svc
      .change_invoice_status(user_id, draft.id, InvoiceStatus::Paid)
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::InvalidStatusTransition(_)));

    let cancelled = svc
      .change_invoice_status(user_id, draft.id, InvoiceStatus::Cancelled)
      .await
      .unwrap();
    assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
  }

  /// Sequence that hands out the same value forever, so the second
  /// create collides on the invoice number.
  struct StuckSequence;

  #[async_trait]
  impl InvoiceNumberSequence for StuckSequence {
    async fn next(&self, _year: i32) -> Result<i64, BillingError> {
      Ok(1)
    }
  }

  #[tokio::test]
  async fn test_failed_create_stores_neither_invoice_nor_items() {
    let svc = service_with_sequence(Arc::new(StuckSequence));
    let user_id = Uuid::new_v4();
    let client = svc.create_client(user_id, client_data("Protea Trading")).await.unwrap();

    let first = invoice_230(&svc, user_id, client.id).await;
    assert_eq!(first.invoice_number.value(), "INV-2026-00001");

    let err = svc
      .create_invoice(
        user_id,
        invoice_data(client.id, vec![line_input(dec!(2), dec!(100), false)]),
        fixed_now(),
      )
      .await
      .unwrap_err();
    assert!(matches!(err, BillingError::InvoiceNumberAlreadyExists(_)));

    // The rejected create must leave nothing behind, in either store
    let invoices = svc.invoice_repo.find_by_user_id(user_id).await.unwrap();
    assert_eq!(invoices.len(), 1);
    let items = svc.line_item_repo.find_by_invoice_id(first.id).await.unwrap();
    assert_eq!(items.len(), 1);
  }

  #[tokio::test]
  async fn test_delete_invoice_removes_items_and_payments() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;
    svc
      .record_payment(
        user_id,
        payment_data(invoice.id, client_id, dec!(100), PaymentStatus::Completed),
        fixed_now(),
      )
      .await
      .unwrap();

    svc.delete_invoice(user_id, invoice.id).await.unwrap();

    let err = svc.get_invoice_with_details(user_id, invoice.id).await.unwrap_err();
    assert!(matches!(err, BillingError::InvoiceNotFound(_)));
    assert!(svc.line_item_repo.find_by_invoice_id(invoice.id).await.unwrap().is_empty());
    assert!(svc.payment_repo.find_by_invoice_id(invoice.id).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_delete_foreign_invoice_reads_as_not_found() {
    let (svc, user_id, client_id) = setup().await;
    let invoice = invoice_230(&svc, user_id, client_id).await;
    let stranger = Uuid::new_v4();

    let err = svc.delete_invoice(stranger, invoice.id).await.unwrap_err();
    assert!(matches!(err, BillingError::InvoiceNotFound(_)));

    // Untouched for the owner
    assert!(svc.get_invoice_with_details(user_id, invoice.id).await.is_ok());
  }

  #[tokio::test]
  async fn test_poisoned_reconciliation_registry_reports_internal_error() {
    let svc = service();
    let invoice_id = Uuid::new_v4();

    let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
      let _held = svc.reconciling.lock().unwrap();
      panic!("poison the registry");
    }));

    let err = svc.lock_invoice(invoice_id).unwrap_err();
    assert!(matches!(err, BillingError::Internal(_)));
  }
}
