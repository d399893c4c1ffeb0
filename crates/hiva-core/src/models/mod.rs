//! Data models for billing service records.
//!
//! This module contains the records exchanged with the billing service:
//!
//! - `Company`, `Item`: a company and the products it sells
//! - `CatalogEntry`, `CatalogQuery`: the flattened, searchable product list
//! - `CartItem`, `CartItemDraft`: lines of the in-progress invoice
//! - `Invoice`, `InvoiceForm`, `InvoiceTotals`: issued invoices and their arithmetic

pub mod cart;
pub mod catalog;
pub mod company;
pub mod invoice;

pub use cart::{CartItem, CartItemDraft};
pub use catalog::{CatalogEntry, CatalogPage, CatalogQuery};
pub use company::{Company, Item, NewCompany};
pub use invoice::{FieldError, Invoice, InvoiceDraft, InvoiceForm, InvoiceTotals, ValidationErrors};
