//! Command line definitions.

use clap::{Args, Parser, Subcommand};
use hiva_core::models::Item;
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(name = "hiva", version, about = "Manage companies, carts and invoices on the HIVA billing service")]
pub struct Cli {
    /// Override the API base URL for this run
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Also write logs to a daily file in the cache directory
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store the session token used for API calls
    Login {
        /// Token value; prompted for when omitted
        #[arg(long)]
        token: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show configuration, session and cart count
    Status,
    /// Read or change the saved configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage companies and their items
    #[command(subcommand)]
    Companies(CompanyCommand),
    /// Browse the product catalog
    Products(ProductArgs),
    /// Manage the cart
    #[command(subcommand)]
    Cart(CartCommand),
    /// Issue and manage invoices
    #[command(subcommand)]
    Invoice(InvoiceCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the saved configuration
    Show,
    /// Save one setting: base-url, timeout-secs, credential-backend,
    /// share-phone or app-origin. An empty value unsets optional settings.
    Set {
        key: String,
        value: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CompanyCommand {
    List,
    Show {
        id: String,
    },
    Add {
        #[arg(long)]
        name: String,
        /// Item as NAME=PRICE or NAME=PRICE=IMAGE_URL; repeatable
        #[arg(long = "item", value_parser = parse_item)]
        items: Vec<Item>,
    },
    /// Rename a company and/or append items
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// Item as NAME=PRICE or NAME=PRICE=IMAGE_URL; repeatable
        #[arg(long = "item", value_parser = parse_item)]
        items: Vec<Item>,
    },
    Delete {
        id: String,
    },
    /// Remove one item from a company
    DeleteItem {
        company_id: String,
        item_id: String,
    },
}

#[derive(Args, Debug)]
pub struct ProductArgs {
    /// Case-insensitive product name filter
    #[arg(long, default_value = "")]
    pub search: String,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    #[arg(long, default_value_t = 10)]
    pub per_page: usize,
}

#[derive(Subcommand, Debug)]
pub enum CartCommand {
    List,
    /// Add a catalog product to the cart
    Add {
        product: String,
        /// Company selling the product, when several do
        #[arg(long)]
        company: Option<String>,
    },
    Remove {
        id: String,
    },
    Clear,
    /// Print the cart badge count
    Count,
}

#[derive(Subcommand, Debug)]
pub enum InvoiceCommand {
    List,
    Show {
        id: String,
    },
    /// Issue an invoice from the current cart and empty the cart
    Create {
        #[arg(long)]
        bill_to: String,
        #[arg(long)]
        mobile: String,
        /// Tax rate in percent
        #[arg(long)]
        tax: String,
        /// Discount rate in percent
        #[arg(long)]
        discount: String,
        /// Raise a cart line's quantity by one; repeatable
        #[arg(long = "inc", value_name = "CART_ID")]
        increments: Vec<String>,
        /// Lower a cart line's quantity by one, never below one; repeatable
        #[arg(long = "dec", value_name = "CART_ID")]
        decrements: Vec<String>,
        /// Print a WhatsApp share link for the new invoice
        #[arg(long)]
        share: bool,
    },
    Delete {
        id: String,
    },
    /// Print a WhatsApp share link for an invoice
    Share {
        id: String,
        /// Recipient phone, defaults to `share_phone` from the config
        #[arg(long)]
        phone: Option<String>,
    },
}

/// Parse `NAME=PRICE` or `NAME=PRICE=IMAGE_URL`.
pub fn parse_item(raw: &str) -> Result<Item, String> {
    let mut parts = raw.splitn(3, '=');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(format!("item {:?} has no name", raw));
    }
    let price: Decimal = parts
        .next()
        .ok_or_else(|| format!("item {:?} has no price", raw))?
        .trim()
        .parse()
        .map_err(|e| format!("item {:?} has an invalid price: {}", raw, e))?;
    if price.is_sign_negative() {
        return Err(format!("item {:?} has a negative price", raw));
    }
    let mut item = Item::new(name, price);
    if let Some(image) = parts.next() {
        item.image = image.trim().to_string();
    }
    Ok(item)
}
