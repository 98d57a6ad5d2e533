//! Local product mirror
//!
//! Keeps the last known product collection in memory and in durable
//! storage. The mirror is loaded once per mount, overwritten whenever a
//! remote snapshot differs from it, and written through on every local
//! mutation.

use crate::store::{KeyValueStore, StoreResult};
use shared::{Product, ProductUpdate};

/// Storage key of the mirrored collection
pub const PRODUCTS_KEY: &str = "products";

/// How a remote snapshot is folded into the mirror
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// The remote snapshot replaces the mirror wholesale. Local additions
    /// the service does not report are dropped.
    #[default]
    Replace,
    /// Like `Replace`, but id-less local additions stay after the remote
    /// entries until the service reports a product with the same content.
    KeepPending,
}

pub struct MirrorStore<S> {
    store: S,
    products: Vec<Product>,
    policy: ReconcilePolicy,
    /// Last write failed; the store lags behind `products`
    dirty: bool,
}

impl<S: KeyValueStore> MirrorStore<S> {
    /// Load the persisted collection, falling back to empty
    ///
    /// A missing key, an unreadable store and malformed JSON all start the
    /// mirror empty; the latter two are logged.
    pub fn load(store: S) -> Self {
        let products = match store.get(PRODUCTS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<Product>>(&json) {
                Ok(products) => {
                    tracing::debug!(count = products.len(), "Loaded product mirror");
                    products
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stored products are malformed, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored products, starting empty");
                Vec::new()
            }
        };

        Self {
            store,
            products,
            policy: ReconcilePolicy::default(),
            dirty: false,
        }
    }

    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: u64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == Some(id))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Fold a remote snapshot into the mirror
    ///
    /// Returns whether the mirror changed. An unchanged snapshot writes
    /// nothing unless an earlier write failed. On a write error the
    /// in-memory mirror is still updated and the write is retried next time.
    pub fn reconcile(&mut self, remote: &[Product]) -> StoreResult<bool> {
        let next = self.reconciled(remote);
        let changed = next != self.products;
        if !changed && !self.dirty {
            tracing::trace!(count = next.len(), "Remote snapshot unchanged");
            return Ok(false);
        }

        if changed {
            tracing::info!(
                before = self.products.len(),
                after = next.len(),
                "Mirror replaced by remote snapshot"
            );
            self.products = next;
        } else {
            tracing::debug!("Retrying mirror write");
        }
        self.persist()?;
        Ok(changed)
    }

    /// Append a locally added product
    pub fn append(&mut self, product: Product) -> StoreResult<()> {
        tracing::debug!(title = %product.title, "Appending product to mirror");
        self.products.push(product);
        self.persist()
    }

    /// Merge `update` into product `id`
    ///
    /// Returns `false` (and writes nothing) if no product has that id.
    pub fn apply_update(&mut self, id: u64, update: &ProductUpdate) -> StoreResult<bool> {
        let Some(product) = self.products.iter_mut().find(|p| p.id == Some(id)) else {
            tracing::warn!(id, "Update for product missing from mirror");
            return Ok(false);
        };
        product.apply(update);
        self.persist()?;
        Ok(true)
    }

    /// Mirror content after reconciling with `remote` under the current policy
    fn reconciled(&self, remote: &[Product]) -> Vec<Product> {
        let mut next = remote.to_vec();
        if self.policy == ReconcilePolicy::KeepPending {
            let pending = self
                .products
                .iter()
                .filter(|local| local.id.is_none())
                .filter(|local| !remote.iter().any(|r| r.same_content(local)));
            next.extend(pending.cloned());
        }
        next
    }

    fn persist(&mut self) -> StoreResult<()> {
        let result = serde_json::to_string_pretty(&self.products)
            .map_err(Into::into)
            .and_then(|json| self.store.set(PRODUCTS_KEY, &json));
        self.dirty = result.is_err();
        result
    }
}
