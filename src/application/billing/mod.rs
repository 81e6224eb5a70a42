pub mod change_invoice_status;
pub mod create_client;
pub mod create_invoice;
pub mod delete_client;
pub mod delete_invoice;
pub mod delete_payment;
pub mod get_client;
pub mod get_invoice_details;
pub mod list_clients;
pub mod list_invoice_payments;
pub mod list_invoices;
pub mod mark_overdue_invoices;
pub mod record_payment;
pub mod update_client;
pub mod update_invoice_items;
pub mod update_payment_status;

pub use change_invoice_status::{
  ChangeInvoiceStatusCommand, ChangeInvoiceStatusResponse, ChangeInvoiceStatusUseCase,
};
pub use create_client::{
  ClientAddressDto, CreateClientCommand, CreateClientResponse, CreateClientUseCase,
};
pub use create_invoice::{
  CreateInvoiceCommand, CreateInvoiceLineItemDto, CreateInvoiceResponse, CreateInvoiceUseCase,
};
pub use delete_client::{DeleteClientCommand, DeleteClientUseCase};
pub use delete_invoice::{DeleteInvoiceCommand, DeleteInvoiceUseCase};
pub use delete_payment::{DeletePaymentCommand, DeletePaymentResponse, DeletePaymentUseCase};
pub use get_client::{GetClientQuery, GetClientResponse, GetClientUseCase};
pub use get_invoice_details::{
  GetInvoiceDetailsQuery, GetInvoiceDetailsResponse, GetInvoiceDetailsUseCase, LineItemDto,
  PaymentDto,
};
pub use list_clients::{ClientSummaryDto, ListClientsQuery, ListClientsResponse, ListClientsUseCase};
pub use list_invoice_payments::{
  ListInvoicePaymentsQuery, ListInvoicePaymentsResponse, ListInvoicePaymentsUseCase,
  PaymentSummaryDto,
};
pub use list_invoices::{
  InvoiceSummaryDto, ListInvoicesQuery, ListInvoicesResponse, ListInvoicesUseCase,
};
pub use mark_overdue_invoices::{
  MarkOverdueInvoicesCommand, MarkOverdueInvoicesResponse, MarkOverdueInvoicesUseCase,
};
pub use record_payment::{RecordPaymentCommand, RecordPaymentResponse, RecordPaymentUseCase};
pub use update_client::{UpdateClientCommand, UpdateClientResponse, UpdateClientUseCase};
pub use update_invoice_items::{
  UpdateInvoiceItemsCommand, UpdateInvoiceItemsResponse, UpdateInvoiceItemsUseCase,
};
pub use update_payment_status::{
  UpdatePaymentStatusCommand, UpdatePaymentStatusResponse, UpdatePaymentStatusUseCase,
};
