use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{InvoiceEntityError, PaymentEntityError};
use super::value_objects::{
  ClientAddress, ClientName, ClientStatus, ContactPerson, Currency, InvoiceNumber, InvoiceStatus,
  LineItemDescription, Money, PaymentMethod, PaymentReference, PaymentStatus, Quantity, VatRate,
};

// Client - Billable party, owned by exactly one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
  pub id: Uuid,
  pub user_id: Uuid,
  pub company_name: ClientName,
  pub contact_person: ContactPerson,
  pub vat_number: Option<String>,
  pub address: Option<ClientAddress>,
  pub is_vat_registered: bool,
  pub payment_terms_days: i32,
  pub notes: Option<String>,
  pub status: ClientStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Client {
  pub fn new(
    user_id: Uuid,
    company_name: ClientName,
    contact_person: ContactPerson,
    vat_number: Option<String>,
    address: Option<ClientAddress>,
    is_vat_registered: bool,
    payment_terms_days: i32,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      user_id,
      company_name,
      contact_person,
      vat_number,
      address,
      is_vat_registered,
      payment_terms_days,
      notes: None,
      status: ClientStatus::Active,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn update(
    &mut self,
    company_name: ClientName,
    contact_person: ContactPerson,
    vat_number: Option<String>,
    address: Option<ClientAddress>,
    is_vat_registered: bool,
    payment_terms_days: i32,
    status: ClientStatus,
  ) {
    self.company_name = company_name;
    self.contact_person = contact_person;
    self.vat_number = vat_number;
    self.address = address;
    self.is_vat_registered = is_vat_registered;
    self.payment_terms_days = payment_terms_days;
    self.status = status;
    self.updated_at = Utc::now();
  }
}

// Invoice Line Item
//
// The source schema stored a single ambiguous `total` per line that was
// sometimes gross and sometimes net. Here the three figures are explicit:
// net_total, vat_amount, and gross_total, always derived from the inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
  pub id: Uuid,
  pub invoice_id: Uuid,
  pub description: LineItemDescription,
  pub quantity: Quantity,
  pub unit_price: Money,
  pub vat_rate: VatRate,
  pub vat_inclusive: bool,
  pub line_order: i32,
}

impl InvoiceLineItem {
  pub fn new(
    invoice_id: Uuid,
    description: LineItemDescription,
    quantity: Quantity,
    unit_price: Money,
    vat_rate: VatRate,
    vat_inclusive: bool,
    line_order: i32,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      invoice_id,
      description,
      quantity,
      unit_price,
      vat_rate,
      vat_inclusive,
      line_order,
    }
  }

  /// quantity x unit price, before any VAT interpretation.
  fn entered_amount(&self) -> Money {
    self.unit_price.multiply(self.quantity.value())
  }

  /// VAT portion of this line, at full precision.
  pub fn vat_amount(&self) -> Money {
    let entered = self.entered_amount();
    if self.vat_inclusive {
      entered.multiply(self.vat_rate.inclusive_fraction())
    } else {
      entered.multiply(self.vat_rate.exclusive_multiplier())
    }
  }

  /// Net-of-VAT line total, at full precision.
  pub fn net_total(&self) -> Money {
    let entered = self.entered_amount();
    if self.vat_inclusive {
      Money {
        amount: entered.amount - self.vat_amount().amount,
        currency: entered.currency,
      }
    } else {
      entered
    }
  }

  /// VAT-inclusive line total, at full precision.
  pub fn gross_total(&self) -> Money {
    let entered = self.entered_amount();
    if self.vat_inclusive {
      entered
    } else {
      entered
        .add(&self.vat_amount())
        .expect("Currency mismatch in line item total")
    }
  }
}

// Invoice Totals - Calculated from line items, persisted on the invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
  pub subtotal: Money,
  pub vat_total: Money,
  pub grand_total: Money,
}

impl InvoiceTotals {
  /// Sum at full precision; rounding drift must not accumulate across lines.
  pub fn calculate(line_items: &[InvoiceLineItem], currency: Currency) -> Self {
    let subtotal = line_items.iter().fold(Money::zero(currency), |acc, item| {
      acc.add(&item.net_total()).expect("Currency mismatch")
    });

    let vat_total = line_items.iter().fold(Money::zero(currency), |acc, item| {
      acc.add(&item.vat_amount()).expect("Currency mismatch")
    });

    let grand_total = subtotal.add(&vat_total).expect("Currency mismatch");

    Self {
      subtotal,
      vat_total,
      grand_total,
    }
  }

  /// Persisted form: subtotal and vat_total rounded to the minor unit, and
  /// grand_total recomputed from the rounded parts so that
  /// total == subtotal + vat_total holds exactly after rounding.
  pub fn rounded(&self) -> Self {
    let subtotal = self.subtotal.round_minor();
    let vat_total = self.vat_total.round_minor();
    let grand_total = subtotal.add(&vat_total).expect("Currency mismatch");
    Self {
      subtotal,
      vat_total,
      grand_total,
    }
  }
}

// Payment Details - Snapshot on the invoice, written only by reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
  pub paid: bool,
  pub payment_date: Option<DateTime<Utc>>,
  pub payment_method: Option<PaymentMethod>,
  pub transaction_id: Option<String>,
  pub notes: Option<String>,
}

impl PaymentDetails {
  pub fn unpaid() -> Self {
    Self {
      paid: false,
      payment_date: None,
      payment_method: None,
      transaction_id: None,
      notes: None,
    }
  }
}

// Invoice - Main invoice document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
  pub id: Uuid,
  pub user_id: Uuid,
  pub client_id: Uuid,
  pub invoice_number: InvoiceNumber,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub currency: Currency,
  pub status: InvoiceStatus,
  pub subtotal: Money,
  pub vat_total: Money,
  pub total: Money,
  pub payment_details: PaymentDetails,
  pub notes: Option<String>,
  pub terms: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Invoice {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    user_id: Uuid,
    client_id: Uuid,
    invoice_number: InvoiceNumber,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    currency: Currency,
    status: InvoiceStatus,
    notes: Option<String>,
    terms: Option<String>,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      user_id,
      client_id,
      invoice_number,
      issue_date,
      due_date,
      currency,
      status,
      subtotal: Money::zero(currency),
      vat_total: Money::zero(currency),
      total: Money::zero(currency),
      payment_details: PaymentDetails::unpaid(),
      notes,
      terms,
      created_at: now,
      updated_at: now,
    }
  }

  /// Re-derive the persisted totals from the current line items. The totals
  /// are never independently mutated.
  pub fn recompute_totals(&mut self, line_items: &[InvoiceLineItem]) {
    let totals = InvoiceTotals::calculate(line_items, self.currency).rounded();
    self.subtotal = totals.subtotal;
    self.vat_total = totals.vat_total;
    self.total = totals.grand_total;
    self.updated_at = Utc::now();
  }

  /// Explicit user action: send or cancel. Paid/Overdue are reconciliation
  /// outcomes and are rejected here.
  pub fn change_status(&mut self, new_status: InvoiceStatus) -> Result<(), InvoiceEntityError> {
    if !self.status.can_transition_to(new_status) {
      return Err(InvoiceEntityError::InvalidStatusTransition {
        from: self.status,
        to: new_status,
      });
    }

    self.status = new_status;
    self.updated_at = Utc::now();
    Ok(())
  }

  /// Reconciliation outcome: cumulative completed payments cover the total.
  pub fn mark_paid(
    &mut self,
    payment_date: DateTime<Utc>,
    payment_method: Option<PaymentMethod>,
    transaction_id: Option<String>,
  ) {
    debug_assert!(self.status.is_reconcilable());
    self.status = InvoiceStatus::Paid;
    self.payment_details.paid = true;
    self.payment_details.payment_date = Some(payment_date);
    self.payment_details.payment_method = payment_method;
    self.payment_details.transaction_id = transaction_id;
    self.updated_at = Utc::now();
  }

  /// Reconciliation outcome: coverage dropped below the total. Status falls
  /// back to Overdue or Sent depending on the due date.
  pub fn mark_unpaid(&mut self, current_date: NaiveDate) {
    debug_assert!(self.status.is_reconcilable());
    self.status = if self.due_date < current_date {
      InvoiceStatus::Overdue
    } else {
      InvoiceStatus::Sent
    };
    self.payment_details.paid = false;
    self.payment_details.payment_date = None;
    self.payment_details.payment_method = None;
    self.payment_details.transaction_id = None;
    self.updated_at = Utc::now();
  }

  pub fn is_overdue(&self, current_date: NaiveDate) -> bool {
    self.status == InvoiceStatus::Sent && self.due_date < current_date
  }
}

// Payment - A money movement against one invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
  pub id: Uuid,
  pub user_id: Uuid,
  pub client_id: Uuid,
  pub invoice_id: Uuid,
  pub amount: Money,
  pub payment_method: PaymentMethod,
  pub status: PaymentStatus,
  pub payment_date: DateTime<Utc>,
  pub reference: PaymentReference,
  pub notes: Option<String>,
  pub vat_inclusive: bool,
  pub vat_amount: Money,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Payment {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    user_id: Uuid,
    client_id: Uuid,
    invoice_id: Uuid,
    amount: Money,
    payment_method: PaymentMethod,
    status: PaymentStatus,
    payment_date: DateTime<Utc>,
    reference: PaymentReference,
    notes: Option<String>,
    vat_inclusive: bool,
  ) -> Result<Self, PaymentEntityError> {
    if amount.amount <= Decimal::ZERO {
      return Err(PaymentEntityError::NonPositiveAmount);
    }

    let vat_amount = Self::derive_vat(&amount, vat_inclusive);
    let now = Utc::now();

    Ok(Self {
      id: Uuid::new_v4(),
      user_id,
      client_id,
      invoice_id,
      amount,
      payment_method,
      status,
      payment_date,
      reference,
      notes,
      vat_inclusive,
      vat_amount,
      created_at: now,
      updated_at: now,
    })
  }

  /// Output VAT carried by this payment, assuming the flat standard rate.
  /// Inherited simplification from the source: the payment does not know the
  /// VAT mix of the invoice's line items.
  fn derive_vat(amount: &Money, vat_inclusive: bool) -> Money {
    if vat_inclusive {
      amount
        .multiply(VatRate::standard().inclusive_fraction())
        .round_minor()
    } else {
      Money::zero(amount.currency)
    }
  }

  pub fn change_status(&mut self, new_status: PaymentStatus) -> Result<(), PaymentEntityError> {
    if !self.status.can_transition_to(new_status) {
      return Err(PaymentEntityError::InvalidStatusTransition {
        from: self.status,
        to: new_status,
      });
    }

    self.status = new_status;
    self.updated_at = Utc::now();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  fn line(
    quantity: Decimal,
    unit_price: Decimal,
    vat_rate: Decimal,
    vat_inclusive: bool,
  ) -> InvoiceLineItem {
    InvoiceLineItem::new(
      Uuid::new_v4(),
      LineItemDescription::new("Consulting".to_string()).unwrap(),
      Quantity::new(quantity).unwrap(),
      Money::new(unit_price, Currency::ZAR).unwrap(),
      VatRate::new(vat_rate).unwrap(),
      vat_inclusive,
      1,
    )
  }

  fn invoice(issue: NaiveDate, due: NaiveDate) -> Invoice {
    Invoice::new(
      Uuid::new_v4(),
      Uuid::new_v4(),
      InvoiceNumber::generate(2026, 1),
      issue,
      due,
      Currency::ZAR,
      InvoiceStatus::Sent,
      None,
      None,
    )
  }

  #[test]
  fn test_vat_inclusive_line() {
    // qty=2, unitPrice=100, rate=15, inclusive: gross 200.00, VAT 200*15/115
    let item = line(dec!(2), dec!(100), dec!(15), true);

    assert_eq!(item.gross_total().amount, dec!(200));
    assert_eq!(item.vat_amount().amount.round_dp(2), dec!(26.09));
    assert_eq!(item.net_total().amount.round_dp(2), dec!(173.91));
  }

  #[test]
  fn test_vat_exclusive_line() {
    // Same item, exclusive: net 200.00, VAT 30.00, gross 230.00
    let item = line(dec!(2), dec!(100), dec!(15), false);

    assert_eq!(item.net_total().amount, dec!(200));
    assert_eq!(item.vat_amount().amount, dec!(30));
    assert_eq!(item.gross_total().amount, dec!(230));
  }

  #[test]
  fn test_line_computation_is_idempotent() {
    let item = line(dec!(3), dec!(33.33), dec!(15), true);
    assert_eq!(item.vat_amount(), item.vat_amount());
    assert_eq!(item.net_total(), item.net_total());
    assert_eq!(item.gross_total(), item.gross_total());
  }

  #[test]
  fn test_inclusive_round_trip() {
    let item = line(dec!(7), dec!(19.99), dec!(15), true);
    let recombined = item.net_total().add(&item.vat_amount()).unwrap();
    assert_eq!(recombined.amount, item.gross_total().amount);
  }

  #[test]
  fn test_totals_invariant_after_rounding() {
    let items = vec![
      line(dec!(2), dec!(100), dec!(15), true),
      line(dec!(1), dec!(33.33), dec!(15), true),
      line(dec!(4), dec!(12.50), dec!(15), false),
    ];

    let totals = InvoiceTotals::calculate(&items, Currency::ZAR).rounded();
    assert_eq!(
      totals.grand_total.amount,
      totals.subtotal.amount + totals.vat_total.amount
    );
  }

  #[test]
  fn test_mixed_invoice_totals() {
    // One inclusive line (gross 200) plus one exclusive line (net 200, VAT 30)
    let items = vec![
      line(dec!(2), dec!(100), dec!(15), true),
      line(dec!(2), dec!(100), dec!(15), false),
    ];

    let totals = InvoiceTotals::calculate(&items, Currency::ZAR).rounded();
    // 173.91 + 200.00
    assert_eq!(totals.subtotal.amount, dec!(373.91));
    // 26.09 + 30.00
    assert_eq!(totals.vat_total.amount, dec!(56.09));
    assert_eq!(totals.grand_total.amount, dec!(430.00));
  }

  #[test]
  fn test_recompute_totals_on_invoice() {
    let mut inv = invoice(
      NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
      NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    );
    let items = vec![line(dec!(2), dec!(100), dec!(15), false)];
    inv.recompute_totals(&items);

    assert_eq!(inv.subtotal.amount, dec!(200.00));
    assert_eq!(inv.vat_total.amount, dec!(30.00));
    assert_eq!(inv.total.amount, dec!(230.00));
  }

  #[test]
  fn test_mark_paid_and_unpaid() {
    let mut inv = invoice(
      NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
      NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    );

    inv.mark_paid(Utc::now(), Some(PaymentMethod::BankTransfer), None);
    assert_eq!(inv.status, InvoiceStatus::Paid);
    assert!(inv.payment_details.paid);

    // Coverage dropped, due date still in the future
    inv.mark_unpaid(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
    assert_eq!(inv.status, InvoiceStatus::Sent);
    assert!(!inv.payment_details.paid);
    assert!(inv.payment_details.payment_date.is_none());

    // Coverage dropped, due date passed
    inv.mark_paid(Utc::now(), Some(PaymentMethod::Cash), None);
    inv.mark_unpaid(NaiveDate::from_ymd_opt(2026, 4, 2).unwrap());
    assert_eq!(inv.status, InvoiceStatus::Overdue);
  }

  #[test]
  fn test_user_status_changes() {
    let mut inv = invoice(
      NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
      NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    );
    inv.status = InvoiceStatus::Draft;

    assert!(inv.change_status(InvoiceStatus::Sent).is_ok());
    assert!(inv.change_status(InvoiceStatus::Paid).is_err());
    assert!(inv.change_status(InvoiceStatus::Cancelled).is_ok());
    // Cancelled is terminal
    assert!(inv.change_status(InvoiceStatus::Sent).is_err());
  }

  #[test]
  fn test_invoice_overdue() {
    let inv = invoice(
      NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
      NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    );

    assert!(!inv.is_overdue(NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()));
    assert!(inv.is_overdue(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()));
  }

  fn payment(amount: Decimal, status: PaymentStatus) -> Result<Payment, PaymentEntityError> {
    Payment::new(
      Uuid::new_v4(),
      Uuid::new_v4(),
      Uuid::new_v4(),
      Money::new(amount, Currency::ZAR).unwrap(),
      PaymentMethod::BankTransfer,
      status,
      Utc::now(),
      PaymentReference::new("EFT-001".to_string()).unwrap(),
      None,
      true,
    )
  }

  #[test]
  fn test_payment_vat_derived_flat_rate() {
    let p = payment(dec!(230), PaymentStatus::Completed).unwrap();
    // 230 * 15 / 115 = 30.00
    assert_eq!(p.vat_amount.amount, dec!(30.00));

    let exclusive = Payment::new(
      Uuid::new_v4(),
      Uuid::new_v4(),
      Uuid::new_v4(),
      Money::new(dec!(230), Currency::ZAR).unwrap(),
      PaymentMethod::Cash,
      PaymentStatus::Completed,
      Utc::now(),
      PaymentReference::new("CASH-1".to_string()).unwrap(),
      None,
      false,
    )
    .unwrap();
    assert!(exclusive.vat_amount.is_zero());
  }

  #[test]
  fn test_payment_amount_must_be_positive() {
    assert!(payment(dec!(0), PaymentStatus::Pending).is_err());
    assert!(payment(dec!(0.01), PaymentStatus::Pending).is_ok());
  }

  #[test]
  fn test_payment_status_change() {
    let mut p = payment(dec!(100), PaymentStatus::Pending).unwrap();
    assert!(p.change_status(PaymentStatus::Completed).is_ok());
    assert!(p.change_status(PaymentStatus::Pending).is_err());
    assert!(p.change_status(PaymentStatus::Refunded).is_ok());
  }
}
