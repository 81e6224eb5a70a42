use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueObjectError {
  #[error("Invalid invoice number: {0}")]
  InvalidInvoiceNumber(String),
  #[error("Invalid currency code: {0}")]
  InvalidCurrency(String),
  #[error("Invalid amount: {0}")]
  InvalidAmount(String),
  #[error("Invalid line item description: {0}")]
  InvalidDescription(String),
  #[error("Invalid quantity: {0}")]
  InvalidQuantity(String),
  #[error("Invalid VAT rate: {0}")]
  InvalidVatRate(String),
  #[error("Invalid client name: {0}")]
  InvalidClientName(String),
  #[error("Invalid contact person: {0}")]
  InvalidContactPerson(String),
  #[error("Invalid invoice status: {0}")]
  InvalidInvoiceStatus(String),
  #[error("Invalid client status: {0}")]
  InvalidClientStatus(String),
  #[error("Invalid payment method: {0}")]
  InvalidPaymentMethod(String),
  #[error("Invalid payment status: {0}")]
  InvalidPaymentStatus(String),
  #[error("Invalid payment reference: {0}")]
  InvalidPaymentReference(String),
}

// Invoice Number - Server-generated, immutable after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
  /// Format a freshly allocated sequence value as `INV-<year>-<5-digit-sequence>`.
  pub fn generate(year: i32, sequence: i64) -> Self {
    Self(format!("INV-{}-{:05}", year, sequence))
  }

  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidInvoiceNumber(
        "Invoice number cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 100 {
      return Err(ValueObjectError::InvalidInvoiceNumber(
        "Invoice number cannot exceed 100 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

impl fmt::Display for InvoiceNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// Invoice Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
  Draft,
  Sent,
  Paid,
  Overdue,
  Cancelled,
}

impl InvoiceStatus {
  /// User-driven transitions only. Paid, Overdue, and the downgrade back to
  /// Sent are reached exclusively through payment reconciliation.
  pub fn can_transition_to(&self, new_status: InvoiceStatus) -> bool {
    match (self, new_status) {
      (InvoiceStatus::Draft, InvoiceStatus::Sent) => true,
      // Any non-cancelled invoice can be cancelled explicitly
      (InvoiceStatus::Cancelled, InvoiceStatus::Cancelled) => false,
      (_, InvoiceStatus::Cancelled) => true,
      _ => false,
    }
  }

  /// Draft and Cancelled invoices are never touched by reconciliation.
  pub fn is_reconcilable(&self) -> bool {
    matches!(
      self,
      InvoiceStatus::Sent | InvoiceStatus::Paid | InvoiceStatus::Overdue
    )
  }

  /// Line items may be replaced until the invoice is paid or cancelled.
  pub fn allows_item_changes(&self) -> bool {
    matches!(
      self,
      InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Overdue
    )
  }

  /// Only Draft and Sent are legal statuses at creation time.
  pub fn is_valid_at_creation(&self) -> bool {
    matches!(self, InvoiceStatus::Draft | InvoiceStatus::Sent)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      InvoiceStatus::Draft => "draft",
      InvoiceStatus::Sent => "sent",
      InvoiceStatus::Paid => "paid",
      InvoiceStatus::Overdue => "overdue",
      InvoiceStatus::Cancelled => "cancelled",
    }
  }
}

impl FromStr for InvoiceStatus {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "draft" => Ok(InvoiceStatus::Draft),
      "sent" => Ok(InvoiceStatus::Sent),
      "paid" => Ok(InvoiceStatus::Paid),
      "overdue" => Ok(InvoiceStatus::Overdue),
      "cancelled" => Ok(InvoiceStatus::Cancelled),
      _ => Err(ValueObjectError::InvalidInvoiceStatus(format!(
        "Unknown status: {}",
        s
      ))),
    }
  }
}

// Currency - ISO 4217
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
  #[default]
  ZAR,
  USD,
  EUR,
  GBP,
}

impl Currency {
  pub fn as_str(&self) -> &'static str {
    match self {
      Currency::ZAR => "ZAR",
      Currency::USD => "USD",
      Currency::EUR => "EUR",
      Currency::GBP => "GBP",
    }
  }

  pub fn symbol(&self) -> &'static str {
    match self {
      Currency::ZAR => "R",
      Currency::USD => "$",
      Currency::EUR => "€",
      Currency::GBP => "£",
    }
  }
}

impl FromStr for Currency {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().as_str() {
      "ZAR" => Ok(Currency::ZAR),
      "USD" => Ok(Currency::USD),
      "EUR" => Ok(Currency::EUR),
      "GBP" => Ok(Currency::GBP),
      _ => Err(ValueObjectError::InvalidCurrency(format!(
        "Unsupported currency: {}",
        s
      ))),
    }
  }
}

// Money - Amount with currency. Arithmetic keeps full decimal precision;
// rounding to the minor unit happens only at the persistence boundary and
// in coverage comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
  pub amount: Decimal,
  pub currency: Currency,
}

impl Money {
  pub fn new(amount: Decimal, currency: Currency) -> Result<Self, ValueObjectError> {
    if amount.is_sign_negative() {
      return Err(ValueObjectError::InvalidAmount(
        "Amount cannot be negative".to_string(),
      ));
    }
    Ok(Self { amount, currency })
  }

  pub fn zero(currency: Currency) -> Self {
    Self {
      amount: Decimal::ZERO,
      currency,
    }
  }

  pub fn is_zero(&self) -> bool {
    self.amount.is_zero()
  }

  pub fn add(&self, other: &Money) -> Result<Money, ValueObjectError> {
    if self.currency != other.currency {
      return Err(ValueObjectError::InvalidAmount(
        "Cannot add amounts with different currencies".to_string(),
      ));
    }
    Ok(Money {
      amount: self.amount + other.amount,
      currency: self.currency,
    })
  }

  /// Subtraction clamped at zero, for balance-due style figures.
  pub fn saturating_sub(&self, other: &Money) -> Result<Money, ValueObjectError> {
    if self.currency != other.currency {
      return Err(ValueObjectError::InvalidAmount(
        "Cannot subtract amounts with different currencies".to_string(),
      ));
    }
    let amount = if other.amount >= self.amount {
      Decimal::ZERO
    } else {
      self.amount - other.amount
    };
    Ok(Money {
      amount,
      currency: self.currency,
    })
  }

  pub fn multiply(&self, factor: Decimal) -> Money {
    Money {
      amount: self.amount * factor,
      currency: self.currency,
    }
  }

  /// Rounded to the currency minor unit (2 decimal places).
  pub fn round_minor(&self) -> Money {
    Money {
      amount: self.amount.round_dp(2),
      currency: self.currency,
    }
  }

  /// Coverage comparison at minor-unit precision. Exact comparison on raw
  /// decimals would false-negative on accumulated rounding drift.
  pub fn covers(&self, other: &Money) -> bool {
    self.currency == other.currency && self.amount.round_dp(2) >= other.amount.round_dp(2)
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
  }
}

// Quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(Decimal);

impl Quantity {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value <= Decimal::ZERO {
      return Err(ValueObjectError::InvalidQuantity(
        "Quantity must be positive".to_string(),
      ));
    }
    // Max 4 decimal places
    if value.scale() > 4 {
      return Err(ValueObjectError::InvalidQuantity(
        "Quantity cannot have more than 4 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  pub fn value(&self) -> Decimal {
    self.0
  }
}

// VAT Rate - Percentage in [0, 100]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatRate(Decimal);

impl VatRate {
  pub fn new(value: Decimal) -> Result<Self, ValueObjectError> {
    if value < Decimal::ZERO || value > Decimal::from(100) {
      return Err(ValueObjectError::InvalidVatRate(
        "VAT rate must be between 0 and 100".to_string(),
      ));
    }
    // Max 2 decimal places
    if value.scale() > 2 {
      return Err(ValueObjectError::InvalidVatRate(
        "VAT rate cannot have more than 2 decimal places".to_string(),
      ));
    }
    Ok(Self(value))
  }

  /// South African standard rate.
  pub fn standard() -> Self {
    Self(Decimal::from(15))
  }

  pub fn value(&self) -> Decimal {
    self.0
  }

  /// rate / 100, for VAT added on top of a net amount.
  pub fn exclusive_multiplier(&self) -> Decimal {
    self.0 / Decimal::from(100)
  }

  /// rate / (100 + rate), for extracting VAT out of a gross amount.
  pub fn inclusive_fraction(&self) -> Decimal {
    self.0 / (Decimal::from(100) + self.0)
  }
}

// Line Item Description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDescription(String);

impl LineItemDescription {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidDescription(
        "Description cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 500 {
      return Err(ValueObjectError::InvalidDescription(
        "Description cannot exceed 500 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }
}

// Client Name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientName(String);

impl ClientName {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidClientName(
        "Client name cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 255 {
      return Err(ValueObjectError::InvalidClientName(
        "Client name cannot exceed 255 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

// Contact Person - Name is required, the rest is optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPerson {
  pub name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub position: Option<String>,
}

impl ContactPerson {
  pub fn new(
    name: String,
    email: Option<String>,
    phone: Option<String>,
    position: Option<String>,
  ) -> Result<Self, ValueObjectError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidContactPerson(
        "Contact name cannot be empty".to_string(),
      ));
    }
    Ok(Self {
      name: trimmed.to_string(),
      email,
      phone,
      position,
    })
  }
}

// Client Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
  Active,
  Inactive,
  Lead,
}

impl ClientStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ClientStatus::Active => "active",
      ClientStatus::Inactive => "inactive",
      ClientStatus::Lead => "lead",
    }
  }
}

impl FromStr for ClientStatus {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "active" => Ok(ClientStatus::Active),
      "inactive" => Ok(ClientStatus::Inactive),
      "lead" => Ok(ClientStatus::Lead),
      _ => Err(ValueObjectError::InvalidClientStatus(format!(
        "Unknown status: {}",
        s
      ))),
    }
  }
}

// Client Address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAddress {
  pub street: Option<String>,
  pub city: Option<String>,
  pub province: Option<String>,
  pub postal_code: Option<String>,
  pub country: Option<String>,
}

impl ClientAddress {
  pub fn new(
    street: Option<String>,
    city: Option<String>,
    province: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
  ) -> Self {
    Self {
      street,
      city,
      province,
      postal_code,
      country,
    }
  }

  pub fn format_multiline(&self) -> String {
    let mut lines = Vec::new();
    if let Some(street) = &self.street {
      if !street.trim().is_empty() {
        lines.push(street.clone());
      }
    }
    let mut city_line = Vec::new();
    if let Some(city) = &self.city {
      if !city.trim().is_empty() {
        city_line.push(city.clone());
      }
    }
    if let Some(province) = &self.province {
      if !province.trim().is_empty() {
        city_line.push(province.clone());
      }
    }
    if let Some(postal_code) = &self.postal_code {
      if !postal_code.trim().is_empty() {
        city_line.push(postal_code.clone());
      }
    }
    if !city_line.is_empty() {
      lines.push(city_line.join(", "));
    }
    if let Some(country) = &self.country {
      if !country.trim().is_empty() {
        lines.push(country.clone());
      }
    }
    lines.join("\n")
  }
}

// Payment Method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  CreditCard,
  BankTransfer,
  Cash,
  Payfast,
  Yoco,
  Other,
}

impl PaymentMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::CreditCard => "credit_card",
      PaymentMethod::BankTransfer => "bank_transfer",
      PaymentMethod::Cash => "cash",
      PaymentMethod::Payfast => "payfast",
      PaymentMethod::Yoco => "yoco",
      PaymentMethod::Other => "other",
    }
  }
}

impl FromStr for PaymentMethod {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "credit_card" => Ok(PaymentMethod::CreditCard),
      "bank_transfer" => Ok(PaymentMethod::BankTransfer),
      "cash" => Ok(PaymentMethod::Cash),
      "payfast" => Ok(PaymentMethod::Payfast),
      "yoco" => Ok(PaymentMethod::Yoco),
      "other" => Ok(PaymentMethod::Other),
      _ => Err(ValueObjectError::InvalidPaymentMethod(format!(
        "Unknown payment method: {}",
        s
      ))),
    }
  }
}

// Payment Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
  PartiallyRefunded,
}

impl PaymentStatus {
  /// Only completed payments count toward invoice coverage.
  pub fn counts_toward_coverage(&self) -> bool {
    matches!(self, PaymentStatus::Completed)
  }

  pub fn can_transition_to(&self, new_status: PaymentStatus) -> bool {
    match (self, new_status) {
      (PaymentStatus::Pending, PaymentStatus::Completed) => true,
      (PaymentStatus::Pending, PaymentStatus::Failed) => true,
      (PaymentStatus::Completed, PaymentStatus::Refunded) => true,
      (PaymentStatus::Completed, PaymentStatus::PartiallyRefunded) => true,
      (PaymentStatus::PartiallyRefunded, PaymentStatus::Refunded) => true,
      _ => false,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Pending => "pending",
      PaymentStatus::Completed => "completed",
      PaymentStatus::Failed => "failed",
      PaymentStatus::Refunded => "refunded",
      PaymentStatus::PartiallyRefunded => "partially_refunded",
    }
  }
}

impl FromStr for PaymentStatus {
  type Err = ValueObjectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "pending" => Ok(PaymentStatus::Pending),
      "completed" => Ok(PaymentStatus::Completed),
      "failed" => Ok(PaymentStatus::Failed),
      "refunded" => Ok(PaymentStatus::Refunded),
      "partially_refunded" => Ok(PaymentStatus::PartiallyRefunded),
      _ => Err(ValueObjectError::InvalidPaymentStatus(format!(
        "Unknown payment status: {}",
        s
      ))),
    }
  }
}

// Payment Reference - External reconciliation key, always required
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReference(String);

impl PaymentReference {
  pub fn new(value: String) -> Result<Self, ValueObjectError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      return Err(ValueObjectError::InvalidPaymentReference(
        "Payment reference cannot be empty".to_string(),
      ));
    }
    if trimmed.len() > 255 {
      return Err(ValueObjectError::InvalidPaymentReference(
        "Payment reference cannot exceed 255 characters".to_string(),
      ));
    }
    Ok(Self(trimmed.to_string()))
  }

  pub fn value(&self) -> &str {
    &self.0
  }

  pub fn into_inner(self) -> String {
    self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_invoice_number_generation() {
    let number = InvoiceNumber::generate(2026, 1);
    assert_eq!(number.value(), "INV-2026-00001");

    let number = InvoiceNumber::generate(2026, 12345);
    assert_eq!(number.value(), "INV-2026-12345");

    let number = InvoiceNumber::generate(2026, 123456);
    assert_eq!(number.value(), "INV-2026-123456");
  }

  #[test]
  fn test_invoice_number_validation() {
    assert!(InvoiceNumber::new("INV-2026-00001".to_string()).is_ok());
    assert!(InvoiceNumber::new("".to_string()).is_err());
    assert!(InvoiceNumber::new("   ".to_string()).is_err());
  }

  #[test]
  fn test_invoice_status_user_transitions() {
    assert!(InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Sent));
    assert!(InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Cancelled));
    assert!(InvoiceStatus::Sent.can_transition_to(InvoiceStatus::Cancelled));
    assert!(InvoiceStatus::Overdue.can_transition_to(InvoiceStatus::Cancelled));
    assert!(InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Cancelled));

    // Paid is never reached by user action
    assert!(!InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Paid));
    assert!(!InvoiceStatus::Sent.can_transition_to(InvoiceStatus::Paid));
    assert!(!InvoiceStatus::Overdue.can_transition_to(InvoiceStatus::Paid));

    // Cancelled is terminal
    assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Sent));
    assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Cancelled));
  }

  #[test]
  fn test_invoice_status_reconcilable() {
    assert!(InvoiceStatus::Sent.is_reconcilable());
    assert!(InvoiceStatus::Paid.is_reconcilable());
    assert!(InvoiceStatus::Overdue.is_reconcilable());
    assert!(!InvoiceStatus::Draft.is_reconcilable());
    assert!(!InvoiceStatus::Cancelled.is_reconcilable());
  }

  #[test]
  fn test_currency() {
    assert_eq!(Currency::ZAR.as_str(), "ZAR");
    assert_eq!(Currency::ZAR.symbol(), "R");
    assert_eq!(Currency::default(), Currency::ZAR);
    assert_eq!(Currency::from_str("zar").unwrap(), Currency::ZAR);
    assert!(Currency::from_str("JPY").is_err());
  }

  #[test]
  fn test_money() {
    let money = Money::new(dec!(100.50), Currency::ZAR).unwrap();
    assert_eq!(money.amount, dec!(100.50));
    assert!(Money::new(dec!(-10), Currency::ZAR).is_err());
  }

  #[test]
  fn test_money_add_and_sub() {
    let m1 = Money::new(dec!(100), Currency::ZAR).unwrap();
    let m2 = Money::new(dec!(50), Currency::ZAR).unwrap();
    let m3 = Money::new(dec!(50), Currency::EUR).unwrap();

    assert_eq!(m1.add(&m2).unwrap().amount, dec!(150));
    assert!(m1.add(&m3).is_err());

    assert_eq!(m1.saturating_sub(&m2).unwrap().amount, dec!(50));
    assert_eq!(m2.saturating_sub(&m1).unwrap().amount, dec!(0));
    assert!(m2.saturating_sub(&m3).is_err());
  }

  #[test]
  fn test_money_covers_with_minor_unit_tolerance() {
    let total = Money::new(dec!(230.00), Currency::ZAR).unwrap();
    let paid_exact = Money::new(dec!(230), Currency::ZAR).unwrap();
    let paid_drifted = Money::new(dec!(229.999), Currency::ZAR).unwrap();
    let paid_short = Money::new(dec!(229.99), Currency::ZAR).unwrap();

    assert!(paid_exact.covers(&total));
    // 229.999 rounds to 230.00 at the minor unit
    assert!(paid_drifted.covers(&total));
    assert!(!paid_short.covers(&total));
  }

  #[test]
  fn test_quantity() {
    assert!(Quantity::new(dec!(1)).is_ok());
    assert!(Quantity::new(dec!(0.0001)).is_ok());
    assert!(Quantity::new(dec!(0)).is_err());
    assert!(Quantity::new(dec!(-1)).is_err());
    assert!(Quantity::new(dec!(1.12345)).is_err()); // Too many decimals
  }

  #[test]
  fn test_vat_rate() {
    assert!(VatRate::new(dec!(15)).is_ok());
    assert!(VatRate::new(dec!(0)).is_ok());
    assert!(VatRate::new(dec!(100)).is_ok());
    assert!(VatRate::new(dec!(-1)).is_err());
    assert!(VatRate::new(dec!(101)).is_err());

    assert_eq!(VatRate::standard().value(), dec!(15));
    assert_eq!(VatRate::new(dec!(15)).unwrap().exclusive_multiplier(), dec!(0.15));
    // 15 / 115
    let fraction = VatRate::standard().inclusive_fraction();
    assert_eq!((dec!(200) * fraction).round_dp(2), dec!(26.09));
  }

  #[test]
  fn test_contact_person_requires_name() {
    assert!(ContactPerson::new("Thandi Nkosi".to_string(), None, None, None).is_ok());
    assert!(ContactPerson::new("  ".to_string(), None, None, None).is_err());
  }

  #[test]
  fn test_payment_method_parsing() {
    assert_eq!(
      PaymentMethod::from_str("bank_transfer").unwrap(),
      PaymentMethod::BankTransfer
    );
    assert_eq!(PaymentMethod::from_str("yoco").unwrap(), PaymentMethod::Yoco);
    assert!(PaymentMethod::from_str("barter").is_err());
  }

  #[test]
  fn test_payment_status_transitions() {
    assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Completed));
    assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
    assert!(PaymentStatus::Completed.can_transition_to(PaymentStatus::Refunded));
    assert!(PaymentStatus::Completed.can_transition_to(PaymentStatus::PartiallyRefunded));
    assert!(PaymentStatus::PartiallyRefunded.can_transition_to(PaymentStatus::Refunded));

    assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Completed));
    assert!(!PaymentStatus::Refunded.can_transition_to(PaymentStatus::Completed));
    assert!(!PaymentStatus::Completed.can_transition_to(PaymentStatus::Pending));
  }

  #[test]
  fn test_payment_coverage_contribution() {
    assert!(PaymentStatus::Completed.counts_toward_coverage());
    assert!(!PaymentStatus::Pending.counts_toward_coverage());
    assert!(!PaymentStatus::Failed.counts_toward_coverage());
    assert!(!PaymentStatus::Refunded.counts_toward_coverage());
    assert!(!PaymentStatus::PartiallyRefunded.counts_toward_coverage());
  }

  #[test]
  fn test_payment_reference() {
    assert!(PaymentReference::new("EFT-2026-091".to_string()).is_ok());
    assert!(PaymentReference::new("".to_string()).is_err());
  }

  #[test]
  fn test_client_address() {
    let addr = ClientAddress::new(
      Some("12 Bree Street".to_string()),
      Some("Cape Town".to_string()),
      Some("Western Cape".to_string()),
      Some("8001".to_string()),
      Some("South Africa".to_string()),
    );
    let formatted = addr.format_multiline();
    assert!(formatted.contains("12 Bree Street"));
    assert!(formatted.contains("Cape Town, Western Cape, 8001"));
    assert!(formatted.contains("South Africa"));
  }
}
