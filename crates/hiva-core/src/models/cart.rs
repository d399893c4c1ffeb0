use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::CatalogEntry;

/// A line in the in-progress invoice, as stored by the service under `cart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub company_name: String,
    pub product_name: String,
    pub price: Decimal,
    #[serde(deserialize_with = "quantity_from_number_or_string")]
    pub quantity: u32,
    #[serde(default)]
    pub image: String,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    pub fn increment_quantity(&mut self) {
        self.quantity = self.quantity.saturating_add(1);
    }

    /// Never drops below one; removing a line is a separate action.
    pub fn decrement_quantity(&mut self) {
        if self.quantity > 1 {
            self.quantity -= 1;
        }
    }
}

/// Payload for adding a product to the cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDraft {
    pub company_name: String,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub image: String,
}

impl From<&CatalogEntry> for CartItemDraft {
    /// New cart lines always start at quantity one.
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            company_name: entry.company_name.clone(),
            product_name: entry.item.name.clone(),
            price: entry.item.price,
            quantity: 1,
            image: entry.item.image.clone(),
        }
    }
}

/// Form-backed records sometimes carry the quantity as a string.
fn quantity_from_number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid quantity: {:?}", s))),
    }
}
