pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{Client, Invoice, InvoiceLineItem, InvoiceTotals, Payment, PaymentDetails};
pub use errors::{BillingError, InvoiceEntityError, PaymentEntityError};
pub use ports::{
  ClientRepository, InvoiceLineItemRepository, InvoiceNumberSequence, InvoiceRepository,
  PaymentRepository,
};
pub use services::{
  BillingService, BillingServiceDependencies, ClientData, InvoiceData, InvoiceDetails,
  LineItemInput, PaymentData,
};
pub use value_objects::{
  ClientAddress, ClientName, ClientStatus, ContactPerson, Currency, InvoiceNumber, InvoiceStatus,
  LineItemDescription, Money, PaymentMethod, PaymentReference, PaymentStatus, Quantity,
  ValueObjectError, VatRate,
};
