//! Catalog API
//!
//! The three catalog operations. Reads go through the query cache; both
//! mutations invalidate [`CacheTag::Products`] so the next read refetches.

use crate::cache::{CacheTag, QueryCache};
use crate::{ClientConfig, ClientResult, HttpClient, NetworkHttpClient};
use shared::{NewProduct, Product, ProductRecord, ProductUpdate};
use std::sync::Arc;
use tokio::sync::broadcast;

const PRODUCTS_PATH: &str = "products";

/// Cache key of the product list query
pub const LIST_PRODUCTS_KEY: &str = "listProducts";

/// Remote catalog service
///
/// Meant to be created once and shared (`Arc<CatalogApi>`) by every view that
/// needs catalog data, so that they share one cache.
pub struct CatalogApi<H = NetworkHttpClient> {
    http: Arc<H>,
    products: QueryCache<Vec<Product>>,
}

impl CatalogApi<NetworkHttpClient> {
    /// Create an API backed by the network client
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self::new(config.build_http_client()?))
    }
}

impl<H: HttpClient + 'static> CatalogApi<H> {
    pub fn new(http: H) -> Self {
        Self {
            http: Arc::new(http),
            products: QueryCache::new(),
        }
    }

    /// Underlying transport
    pub fn http(&self) -> &H {
        &self.http
    }

    /// Fetch the full product collection
    ///
    /// Served from cache until invalidated; concurrent calls share one
    /// request.
    pub async fn list_products(&self) -> ClientResult<Vec<Product>> {
        let http = Arc::clone(&self.http);
        let products = self
            .products
            .query(LIST_PRODUCTS_KEY, &[CacheTag::Products], move || async move {
                http.get::<Vec<Product>>(PRODUCTS_PATH).await
            })
            .await?;
        Ok(products.as_ref().clone())
    }

    /// Create a product
    ///
    /// The returned record may or may not carry an assigned id.
    pub async fn create_product(&self, product: &NewProduct) -> ClientResult<ProductRecord> {
        let result = self
            .http
            .post::<ProductRecord, _>(PRODUCTS_PATH, product)
            .await;
        self.after_mutation("create", &result);
        result
    }

    /// Replace the fields of product `id`
    pub async fn replace_product(
        &self,
        id: u64,
        update: &ProductUpdate,
    ) -> ClientResult<ProductRecord> {
        let path = format!("{PRODUCTS_PATH}/{id}");
        let result = self.http.put::<ProductRecord, _>(&path, update).await;
        self.after_mutation("replace", &result);
        result
    }

    /// Force the next read of `tag` back to the network
    pub fn invalidate(&self, tag: CacheTag) {
        match tag {
            CacheTag::Products => self.products.invalidate(tag),
        }
    }

    /// Receive invalidated tags, to re-fetch after mutations
    pub fn subscribe(&self) -> broadcast::Receiver<CacheTag> {
        self.products.subscribe()
    }

    /// Cached product list, if any
    pub fn cached_products(&self) -> Option<Arc<Vec<Product>>> {
        self.products.cached(LIST_PRODUCTS_KEY)
    }

    /// Invalidate whenever the service actually processed the mutation,
    /// rejected or not. Transport failures leave the cache alone.
    fn after_mutation(&self, operation: &str, result: &ClientResult<ProductRecord>) {
        match result {
            Ok(record) => {
                tracing::info!(operation, id = ?record.id, "Catalog mutation succeeded");
                self.invalidate(CacheTag::Products);
            }
            Err(err) if err.is_server_response() => {
                tracing::warn!(operation, error = %err, "Catalog mutation rejected");
                self.invalidate(CacheTag::Products);
            }
            Err(err) => {
                tracing::warn!(operation, error = %err, "Catalog mutation failed");
            }
        }
    }
}
