//! Typed calls for the billing service resources.
//!
//! Companies live under `products`, cart lines under `cart` and issued
//! invoices under `invoice`. Every call goes through the same wrapper, so
//! the bearer header and failure logging apply uniformly.

use serde_json::Value;
use tracing::debug;

use crate::models::{
    CartItem, CartItemDraft, CatalogEntry, Company, Invoice, InvoiceDraft, NewCompany,
};

use super::{ApiClient, ApiResult};

const COMPANIES: &str = "products";
const CART: &str = "cart";
const INVOICES: &str = "invoice";

impl ApiClient {
    // ===== Companies =====

    pub async fn list_companies(&self) -> ApiResult<Vec<Company>> {
        self.get(COMPANIES).await
    }

    pub async fn get_company(&self, id: &str) -> ApiResult<Company> {
        self.get(&format!("{}/{}", COMPANIES, id)).await
    }

    pub async fn create_company(&self, company: &NewCompany) -> ApiResult<Company> {
        self.post(COMPANIES, company).await
    }

    /// Replace a company's name and item list.
    pub async fn update_company(&self, id: &str, company: &NewCompany) -> ApiResult<Company> {
        self.put(&format!("{}/{}", COMPANIES, id), company).await
    }

    pub async fn delete_company(&self, id: &str) -> ApiResult<Value> {
        self.delete(&format!("{}/{}", COMPANIES, id)).await
    }

    pub async fn delete_company_item(&self, company_id: &str, item_id: &str) -> ApiResult<Value> {
        self.delete(&format!("{}/{}/item/{}", COMPANIES, company_id, item_id))
            .await
    }

    /// Every company's items in one list, tagged with the company name.
    pub async fn catalog(&self) -> ApiResult<Vec<CatalogEntry>> {
        let companies = self.list_companies().await?;
        let entries = CatalogEntry::flatten(companies);
        debug!("Catalog holds {} products", entries.len());
        Ok(entries)
    }

    // ===== Cart =====

    pub async fn list_cart(&self) -> ApiResult<Vec<CartItem>> {
        self.get(CART).await
    }

    /// Add a line. Callers holding a `CartCounter` should go through
    /// `CartCounter::add_to_cart` so the badge count follows.
    pub async fn add_to_cart(&self, draft: &CartItemDraft) -> ApiResult<Value> {
        self.post(CART, draft).await
    }

    pub async fn remove_cart_item(&self, id: &str) -> ApiResult<Value> {
        self.delete(&format!("{}/{}", CART, id)).await
    }

    /// Empty the cart, as done after an invoice is issued.
    pub async fn clear_cart(&self) -> ApiResult<Value> {
        self.delete(CART).await
    }

    // ===== Invoices =====

    pub async fn list_invoices(&self) -> ApiResult<Vec<Invoice>> {
        self.get(INVOICES).await
    }

    pub async fn get_invoice(&self, id: &str) -> ApiResult<Invoice> {
        self.get(&format!("{}/{}", INVOICES, id)).await
    }

    pub async fn create_invoice(&self, draft: &InvoiceDraft) -> ApiResult<Invoice> {
        self.post(INVOICES, draft).await
    }

    pub async fn delete_invoice(&self, id: &str) -> ApiResult<Value> {
        self.delete(&format!("{}/{}", INVOICES, id)).await
    }
}
