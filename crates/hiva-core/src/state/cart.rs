use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::api::{ApiClient, ApiResult};
use crate::models::CartItemDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Uninitialized,
    Loading,
    Loaded,
}

/// Snapshot of the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartCount {
    pub phase: LoadPhase,
    pub count: usize,
}

/// Approximate number of lines in the cart.
///
/// The count comes from the server once, in `load`, and afterwards only
/// moves through `increment`/`set`. Removing cart lines does not lower it:
/// callers that change the cart behind the counter's back must call
/// `resync` themselves.
#[derive(Clone, Debug)]
pub struct CartCounter {
    tx: Arc<watch::Sender<CartCount>>,
}

impl Default for CartCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CartCounter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CartCount::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn count(&self) -> usize {
        self.tx.borrow().count
    }

    pub fn snapshot(&self) -> CartCount {
        *self.tx.borrow()
    }

    /// Watch for changes, e.g. to redraw a badge.
    pub fn subscribe(&self) -> watch::Receiver<CartCount> {
        self.tx.subscribe()
    }

    pub fn set(&self, count: usize) {
        self.tx.send_modify(|state| state.count = count);
    }

    pub fn increment(&self) {
        self.tx
            .send_modify(|state| state.count = state.count.saturating_add(1));
    }

    /// Fetch the cart and take its length as the count. A failed fetch is
    /// logged and leaves the counter at zero.
    pub async fn load(&self, client: &ApiClient) -> usize {
        self.tx.send_modify(|state| state.phase = LoadPhase::Loading);

        let count = match client.get::<Vec<Value>>("cart").await {
            Ok(items) => items.len(),
            Err(e) => {
                error!(error = %e, "Error fetching cart items");
                0
            }
        };
        debug!(count, "Cart count loaded");

        self.tx.send_replace(CartCount {
            phase: LoadPhase::Loaded,
            count,
        });
        count
    }

    /// Re-derive the count from the server after an outside change.
    pub async fn resync(&self, client: &ApiClient) -> usize {
        self.load(client).await
    }

    /// Add a line and bump the count by one on success. The server's own
    /// cart size is not consulted.
    pub async fn add_to_cart(&self, client: &ApiClient, draft: &CartItemDraft) -> ApiResult<Value> {
        let created = client.add_to_cart(draft).await?;
        self.increment();
        Ok(created)
    }
}
