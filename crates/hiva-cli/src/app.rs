//! Command handlers.
//!
//! `App` owns the configured API client, the token store and the cart
//! counter, and runs one parsed command against them.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use hiva_core::models::{
    CartItem, CartItemDraft, CatalogEntry, CatalogQuery, Company, Invoice, InvoiceForm, InvoiceTotals,
    NewCompany,
};
use hiva_core::{ApiClient, CartCounter, Config, CredentialBackend, CredentialProvider, FileStore};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::cli::{
    CartCommand, Command, CompanyCommand, ConfigCommand, InvoiceCommand, ProductArgs,
};
use crate::format::{format_mobile, format_money, truncate_string};

/// Column width for product and company names in listings.
const NAME_WIDTH: usize = 28;

pub struct App {
    config: Config,
    credentials: Arc<dyn CredentialProvider>,
    client: ApiClient,
    cart: CartCounter,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let credentials = config.credentials()?;
        let client = ApiClient::new(config.api_config(), credentials.clone())?;
        Ok(Self {
            config,
            credentials,
            client,
            cart: CartCounter::new(),
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Login { token } => self.login(token),
            Command::Logout => self.logout(),
            Command::Status => self.status().await,
            Command::Config(cmd) => configure(cmd),
            Command::Companies(cmd) => self.companies(cmd).await,
            Command::Products(args) => self.products(args).await,
            Command::Cart(cmd) => self.cart(cmd).await,
            Command::Invoice(cmd) => self.invoice(cmd).await,
        }
    }

    // ===== Session =====

    fn login(&self, token: Option<String>) -> Result<()> {
        let token = match token {
            Some(token) => token,
            None => rpassword::prompt_password("Token: ").context("Failed to read token")?,
        };
        let token = token.trim();
        if token.is_empty() {
            bail!("Token must not be empty");
        }
        self.credentials.set(token)?;
        info!("Session token stored");
        println!("Logged in.");
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        self.credentials.clear()?;
        info!("Session token cleared");
        println!("Logged out.");
        Ok(())
    }

    async fn status(&self) -> Result<()> {
        println!("API:      {}", self.client.base_url());
        println!("Timeout:  {}s", self.config.timeout_secs);

        let session = match self.credentials.get() {
            Ok(Some(_)) => "logged in".to_string(),
            Ok(None) => "logged out".to_string(),
            Err(e) => format!("unreadable ({})", e),
        };
        println!("Session:  {}", session);
        if self.config.credential_backend == CredentialBackend::File {
            if let Ok(Some(data)) = FileStore::new(self.config.cache_dir()?).load() {
                println!("Saved:    {}", data.age_display());
            }
        }

        let (count, invoices) =
            futures::join!(self.cart.load(&self.client), self.client.list_invoices());
        println!("Cart:     {} item(s)", count);
        match invoices {
            Ok(invoices) => println!("Invoices: {}", invoices.len()),
            Err(e) => println!("Invoices: unavailable ({})", e),
        }
        Ok(())
    }

    // ===== Companies =====

    async fn companies(&self, cmd: CompanyCommand) -> Result<()> {
        match cmd {
            CompanyCommand::List => {
                let companies = self.client.list_companies().await?;
                if companies.is_empty() {
                    println!("No companies yet.");
                }
                for company in &companies {
                    println!(
                        "{:<24}  {:<width$}  {:>3} products  {}",
                        company.id,
                        truncate_string(&company.name, NAME_WIDTH),
                        company.item_count(),
                        company.status_display(),
                        width = NAME_WIDTH
                    );
                }
            }
            CompanyCommand::Show { id } => {
                let company = self.client.get_company(&id).await?;
                print_company(&company);
            }
            CompanyCommand::Add { name, items } => {
                let payload = NewCompany {
                    name: name.trim().to_string(),
                    items,
                };
                if payload.name.is_empty() {
                    bail!("Company name must not be empty");
                }
                let company = self.client.create_company(&payload).await?;
                println!("Created company {} ({})", company.name, company.id);
            }
            CompanyCommand::Update { id, name, items } => {
                let existing = self.client.get_company(&id).await?;
                let mut payload = NewCompany::from(&existing);
                if let Some(name) = name {
                    payload.name = name.trim().to_string();
                }
                payload.items.extend(items);
                let company = self.client.update_company(&id, &payload).await?;
                println!("Updated company {} ({} products)", company.name, company.item_count());
            }
            CompanyCommand::Delete { id } => {
                self.client.delete_company(&id).await?;
                println!("Deleted company {}", id);
            }
            CompanyCommand::DeleteItem { company_id, item_id } => {
                self.client.delete_company_item(&company_id, &item_id).await?;
                println!("Deleted item {} from company {}", item_id, company_id);
            }
        }
        Ok(())
    }

    // ===== Products =====

    async fn products(&self, args: ProductArgs) -> Result<()> {
        let catalog = self.client.catalog().await?;
        let query = CatalogQuery::default()
            .search(&args.search)
            .page_size(args.per_page)
            .page(args.page);
        let page = query.apply(&catalog);

        for entry in &page.entries {
            println!(
                "{:<width$}  {:<width$}  {:>12}",
                truncate_string(&entry.item.name, NAME_WIDTH),
                truncate_string(&entry.company_name, NAME_WIDTH),
                format_money(entry.item.price),
                width = NAME_WIDTH
            );
        }
        println!(
            "{} product(s), page {} of {}",
            page.total_matches,
            page.page,
            page.page_count.max(1)
        );
        Ok(())
    }

    // ===== Cart =====

    async fn cart(&self, cmd: CartCommand) -> Result<()> {
        match cmd {
            CartCommand::List => {
                let items = self.client.list_cart().await?;
                for item in &items {
                    println!(
                        "{:<24}  {:<width$}  {:>3} x {:>10}  {:>12}",
                        item.id,
                        truncate_string(&item.product_name, NAME_WIDTH),
                        item.quantity,
                        format_money(item.price),
                        format_money(item.line_total()),
                        width = NAME_WIDTH
                    );
                }
                let totals = InvoiceTotals::compute(&items, Decimal::ZERO, Decimal::ZERO);
                println!("Subtotal: {}", format_money(totals.subtotal));
            }
            CartCommand::Add { product, company } => {
                let (count, catalog) = futures::join!(self.cart.load(&self.client), self.client.catalog());
                let entry = find_product(&catalog?, &product, company.as_deref())?;
                self.cart
                    .add_to_cart(&self.client, &CartItemDraft::from(&entry))
                    .await?;
                println!(
                    "Added {} from {} to the cart ({} -> {} item(s))",
                    entry.item.name,
                    entry.company_name,
                    count,
                    self.cart.count()
                );
            }
            CartCommand::Remove { id } => {
                self.client.remove_cart_item(&id).await?;
                let count = self.cart.resync(&self.client).await;
                println!("Removed {} ({} item(s) left)", id, count);
            }
            CartCommand::Clear => {
                self.client.clear_cart().await?;
                self.cart.resync(&self.client).await;
                println!("Cart cleared.");
            }
            CartCommand::Count => {
                println!("{}", self.cart.load(&self.client).await);
            }
        }
        Ok(())
    }

    // ===== Invoices =====

    async fn invoice(&self, cmd: InvoiceCommand) -> Result<()> {
        match cmd {
            InvoiceCommand::List => {
                let invoices = self.client.list_invoices().await?;
                if invoices.is_empty() {
                    println!("No invoices yet.");
                }
                for invoice in &invoices {
                    println!(
                        "{:<24}  {:<width$}  {:<10}  {:>12}",
                        invoice.id,
                        truncate_string(&invoice.bill_to, NAME_WIDTH),
                        invoice.created_display().unwrap_or_default(),
                        format_money(invoice.totals().total),
                        width = NAME_WIDTH
                    );
                }
            }
            InvoiceCommand::Show { id } => {
                let invoice = self.client.get_invoice(&id).await?;
                print_invoice(&invoice);
            }
            InvoiceCommand::Create {
                bill_to,
                mobile,
                tax,
                discount,
                share,
                increments,
                decrements,
            } => {
                let mut items = self.client.list_cart().await?;
                if items.is_empty() {
                    bail!("The cart is empty");
                }
                adjust_quantities(&mut items, &increments, &decrements)?;
                let form = InvoiceForm {
                    bill_to,
                    to_mobile: mobile,
                    tax_rate: tax,
                    discount_rate: discount,
                };
                let draft = form.validate(items)?;
                let invoice = self.client.create_invoice(&draft).await?;

                // The invoice exists even if the cart could not be emptied
                if let Err(e) = self.client.clear_cart().await {
                    warn!(error = %e, "Invoice created but cart was not cleared");
                }
                self.cart.resync(&self.client).await;

                println!(
                    "Created invoice {} for {}: {}",
                    invoice.id,
                    invoice.bill_to,
                    format_money(draft.totals().total)
                );
                if share {
                    self.print_share_link(&invoice, None)?;
                }
            }
            InvoiceCommand::Delete { id } => {
                self.client.delete_invoice(&id).await?;
                println!("Deleted invoice {}", id);
            }
            InvoiceCommand::Share { id, phone } => {
                let invoice = self.client.get_invoice(&id).await?;
                self.print_share_link(&invoice, phone.as_deref())?;
            }
        }
        Ok(())
    }

    fn print_share_link(&self, invoice: &Invoice, phone: Option<&str>) -> Result<()> {
        let phone = phone
            .or(self.config.share_phone.as_deref())
            .context("No phone to share to; pass --phone or set share_phone in the config")?;
        let origin = self
            .config
            .app_origin
            .as_deref()
            .context("No app_origin set in the config")?;
        let url = invoice.share_url(origin, phone)?;
        println!("{}", url);
        Ok(())
    }
}

/// Saved settings only; environment and `--base-url` overrides are not
/// written back.
fn configure(cmd: ConfigCommand) -> Result<()> {
    let mut config = Config::load_file()?;
    match cmd {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Set { key, value } => {
            config.set_value(&key, &value)?;
            let path = config.save()?;
            info!(key = %key, "Config updated");
            println!("Saved {} to {}", key, path.display());
        }
    }
    Ok(())
}

/// Apply per-line quantity edits made before issuing an invoice.
fn adjust_quantities(items: &mut [CartItem], increments: &[String], decrements: &[String]) -> Result<()> {
    for (ids, raise) in [(increments, true), (decrements, false)] {
        for id in ids {
            let item = items
                .iter_mut()
                .find(|item| item.id == *id)
                .with_context(|| format!("No cart line with id {:?}", id))?;
            if raise {
                item.increment_quantity();
            } else {
                item.decrement_quantity();
            }
        }
    }
    Ok(())
}

/// Pick one catalog entry by product name, narrowed by company when given.
fn find_product(catalog: &[CatalogEntry], product: &str, company: Option<&str>) -> Result<CatalogEntry> {
    let matches: Vec<&CatalogEntry> = catalog
        .iter()
        .filter(|e| e.item.name.eq_ignore_ascii_case(product.trim()))
        .filter(|e| company.map_or(true, |c| e.company_name.eq_ignore_ascii_case(c.trim())))
        .collect();

    match matches.as_slice() {
        [] => bail!("No product named {:?}", product),
        [entry] => Ok((*entry).clone()),
        several => {
            let companies: Vec<&str> = several.iter().map(|e| e.company_name.as_str()).collect();
            bail!(
                "{:?} is sold by several companies ({}); pass --company",
                product,
                companies.join(", ")
            )
        }
    }
}

fn print_company(company: &Company) {
    println!("{} ({})  {}", company.name, company.id, company.status_display());
    for item in &company.items {
        println!(
            "  {:<24}  {:<width$}  {:>12}",
            item.id.as_deref().unwrap_or("-"),
            truncate_string(&item.name, NAME_WIDTH),
            format_money(item.price),
            width = NAME_WIDTH
        );
    }
}

fn print_invoice(invoice: &Invoice) {
    println!("Invoice {}", invoice.id);
    if let Some(date) = invoice.created_display() {
        println!("Date:   {}", date);
    }
    println!("Name:   {}", invoice.bill_to);
    println!("Phone:  {}", format_mobile(&invoice.to_mobile));
    println!();
    for item in &invoice.items {
        println!(
            "  {:<width$}  {:>3} x {:>10}  {:>12}",
            truncate_string(&item.product_name, NAME_WIDTH),
            item.quantity,
            format_money(item.price),
            format_money(item.line_total()),
            width = NAME_WIDTH
        );
    }
    let totals = invoice.totals();
    println!();
    println!("Subtotal:            {:>12}", format_money(totals.subtotal));
    println!("Discount ({:>5}%):   {:>12}", invoice.discount_rate, format_money(totals.discount));
    println!("Tax ({:>5}%):        {:>12}", invoice.tax_rate, format_money(totals.tax));
    println!("Total:               {:>12}", format_money(totals.total));
}
