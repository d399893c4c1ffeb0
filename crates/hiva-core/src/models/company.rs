use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Status shown for companies the service has not tagged.
const DEFAULT_STATUS: &str = "Active";

/// A company record. The service stores these under `products`, each
/// holding the items the company sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Company {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn status_display(&self) -> &str {
        self.status.as_deref().unwrap_or(DEFAULT_STATUS)
    }

    /// Upper-cased first letter, used as an avatar.
    pub fn initial(&self) -> Option<char> {
        self.name.chars().next().map(|c| c.to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub price: Decimal,
    /// Image URL, empty when none was uploaded
    #[serde(default)]
    pub image: String,
}

impl Item {
    pub fn new(name: &str, price: Decimal) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            price,
            image: String::new(),
        }
    }
}

/// Payload for creating or replacing a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub items: Vec<Item>,
}

impl NewCompany {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn remove_item(&mut self, index: usize) -> Option<Item> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }
}

impl From<&Company> for NewCompany {
    /// Prefill an edit from an existing record.
    fn from(company: &Company) -> Self {
        Self {
            name: company.name.clone(),
            items: company.items.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal")
    }

    #[test]
    fn test_parse_company() {
        let json = r#"{"_id": "66a1", "name": "acme", "items": [
            {"_id": "i1", "name": "Tea", "price": "12.50", "image": "https://img/tea.png"},
            {"name": "Coffee", "price": 8}
        ], "__v": 0}"#;

        let company: Company = serde_json::from_str(json).expect("Failed to parse company JSON");
        assert_eq!(company.id, "66a1");
        assert_eq!(company.item_count(), 2);
        assert_eq!(company.items[0].price, dec("12.50"));
        assert_eq!(company.items[1].price, dec("8"));
        assert_eq!(company.items[1].image, "");
        assert_eq!(company.items[1].id, None);
        assert_eq!(company.status_display(), "Active");
        assert_eq!(company.initial(), Some('A'));
    }

    #[test]
    fn test_missing_items_default_to_empty() {
        let company: Company =
            serde_json::from_str(r#"{"_id": "1", "name": "Empty", "status": "Paused"}"#).unwrap();
        assert_eq!(company.item_count(), 0);
        assert_eq!(company.status_display(), "Paused");
    }

    #[test]
    fn test_new_company_from_existing() {
        let company = Company {
            id: "1".to_string(),
            name: "Acme".to_string(),
            items: vec![Item::new("Tea", dec("1"))],
            status: None,
        };
        let mut edit = NewCompany::from(&company).with_item(Item::new("Cake", dec("3")));
        assert_eq!(edit.items.len(), 2);
        assert_eq!(edit.remove_item(0).map(|i| i.name), Some("Tea".to_string()));
        assert_eq!(edit.remove_item(5), None);

        let json = serde_json::to_value(&edit).unwrap();
        assert_eq!(json["items"][0]["name"], "Cake");
        assert!(json["items"][0].get("_id").is_none());
    }
}
