//! Invoices, invoice form validation and invoice arithmetic.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use reqwest::Url;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CartItem;

/// Endpoint used to hand a link to WhatsApp.
const WHATSAPP_SEND_URL: &str = "https://api.whatsapp.com/send";

/// Required length of a recipient phone number.
const MOBILE_DIGITS: usize = 10;

pub type UrlParseError = <Url as FromStr>::Err;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub tax_rate: Decimal,
    pub discount_rate: Decimal,
    pub bill_to: String,
    #[serde(default)]
    pub to_mobile: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::compute(&self.items, self.tax_rate, self.discount_rate)
    }

    /// Creation date as `dd/mm/yyyy`.
    pub fn created_display(&self) -> Option<String> {
        self.created_at.map(|d| d.format("%d/%m/%Y").to_string())
    }

    /// Public page of the invoice on the web front-end.
    pub fn view_url(&self, app_origin: &str) -> String {
        format!(
            "{}/invoice/your-invoice/{}",
            app_origin.trim_end_matches('/'),
            self.id
        )
    }

    /// WhatsApp link sending the invoice page to `phone`.
    pub fn share_url(&self, app_origin: &str, phone: &str) -> Result<Url, UrlParseError> {
        let view = self.view_url(app_origin);
        Url::parse_with_params(WHATSAPP_SEND_URL, &[("phone", phone), ("text", view.as_str())])
    }
}

/// Subtotal, discount, tax and grand total, each to two decimal places.
///
/// The discount and the tax are both taken from the subtotal:
/// `total = subtotal - discount + tax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl InvoiceTotals {
    pub fn compute<'a, I>(items: I, tax_rate: Decimal, discount_rate: Decimal) -> Self
    where
        I: IntoIterator<Item = &'a CartItem>,
    {
        let subtotal = items
            .into_iter()
            .fold(Decimal::ZERO, |acc, item| round_money(acc + item.line_total()));
        let hundred = Decimal::ONE_HUNDRED;
        let tax = round_money(subtotal * tax_rate / hundred);
        let discount = round_money(subtotal * discount_rate / hundred);

        Self {
            subtotal,
            discount,
            tax,
            total: subtotal - discount + tax,
        }
    }
}

/// One rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field error found in one validation pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid invoice: {}", join_errors(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn field(&self, field: &str) -> Option<&'static str> {
        self.errors.iter().find(|e| e.field == field).map(|e| e.message)
    }
}

/// Raw invoice form input, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceForm {
    pub bill_to: String,
    pub to_mobile: String,
    pub tax_rate: String,
    pub discount_rate: String,
}

/// Validated payload for `POST invoice`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub items: Vec<CartItem>,
    pub tax_rate: Decimal,
    pub discount_rate: Decimal,
    pub bill_to: String,
    pub to_mobile: String,
}

impl InvoiceDraft {
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::compute(&self.items, self.tax_rate, self.discount_rate)
    }
}

fn parse_percentage(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim())
        .ok()
        .filter(|rate| *rate >= Decimal::ZERO && *rate <= Decimal::ONE_HUNDRED)
}

impl InvoiceForm {
    /// Check every field and build the draft, or report all problems at once.
    pub fn validate(&self, items: Vec<CartItem>) -> Result<InvoiceDraft, ValidationErrors> {
        let mut errors = Vec::new();

        let bill_to = self.bill_to.trim();
        if bill_to.is_empty() {
            errors.push(FieldError { field: "billTo", message: "Name is required." });
        }

        let to_mobile = self.to_mobile.trim();
        if to_mobile.is_empty() {
            errors.push(FieldError { field: "toMobile", message: "Phone number is required." });
        } else if to_mobile.len() != MOBILE_DIGITS || !to_mobile.chars().all(|c| c.is_ascii_digit()) {
            errors.push(FieldError { field: "toMobile", message: "Phone number must be 10 digits." });
        }

        let tax_rate = parse_percentage(&self.tax_rate);
        if tax_rate.is_none() {
            errors.push(FieldError {
                field: "taxRate",
                message: "Tax rate must be a number between 0 and 100.",
            });
        }

        let discount_rate = parse_percentage(&self.discount_rate);
        if discount_rate.is_none() {
            errors.push(FieldError {
                field: "discountRate",
                message: "Discount rate must be a number between 0 and 100.",
            });
        }

        match (tax_rate, discount_rate) {
            (Some(tax_rate), Some(discount_rate)) if errors.is_empty() => Ok(InvoiceDraft {
                items,
                tax_rate,
                discount_rate,
                bill_to: bill_to.to_string(),
                to_mobile: to_mobile.to_string(),
            }),
            _ => Err(ValidationErrors { errors }),
        }
    }
}
