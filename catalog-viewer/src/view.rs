//! Catalog view
//!
//! Owns the product mirror and the add-product form for one mounted view,
//! drives fetch/reconcile, and exposes a front-end-agnostic [`Screen`].
//!
//! Every network call can be raced against the view's cancellation token.
//! Once the view is unmounted, late results are dropped instead of applied.

use crate::form::AddProductForm;
use crate::mirror::MirrorStore;
use crate::store::KeyValueStore;
use catalog_client::{CacheTag, CatalogApi, ClientResult, HttpClient};
use shared::{NewProduct, Product, ProductRecord, ProductUpdate};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tokio_util::sync::CancellationToken;

/// Amount added by the "increase price" action
pub const PRICE_STEP: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewPhase {
    /// First fetch still pending
    Loading,
    /// Last fetch failed with this message
    Failed(String),
    Ready,
}

/// One grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub id: Option<u64>,
    pub title: String,
    pub category: String,
    pub price: String,
    pub rating: String,
    pub image: String,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            category: product.category.clone(),
            price: product.price_label(),
            rating: product.rating.label(),
            image: product.image.clone(),
        }
    }
}

/// What the view shows
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Loading,
    Error(String),
    Grid(Vec<ProductCard>),
}

impl Screen {
    /// Plain-text rendering, one line per row
    pub fn lines(&self) -> Vec<String> {
        match self {
            Screen::Loading => vec!["Loading products...".to_string()],
            Screen::Error(message) => vec![format!("Error fetching products: {message}")],
            Screen::Grid(cards) => {
                let mut lines = vec![format!("Product List ({})", cards.len())];
                lines.extend(cards.iter().map(|card| {
                    let id = card
                        .id
                        .map_or_else(|| "local".to_string(), |id| format!("#{id}"));
                    format!(
                        "{id} {} | {} | {} | Rating: {}",
                        card.title, card.category, card.price, card.rating
                    )
                }));
                lines
            }
        }
    }
}

pub struct CatalogView<H, S> {
    api: Arc<CatalogApi<H>>,
    mirror: MirrorStore<S>,
    form: AddProductForm,
    phase: ViewPhase,
    /// Last action outcome shown under the grid
    status: Option<String>,
    invalidations: broadcast::Receiver<CacheTag>,
    cancel: CancellationToken,
}

impl<H, S> CatalogView<H, S>
where
    H: HttpClient + 'static,
    S: KeyValueStore,
{
    /// Mount a view over `api` with an already loaded mirror
    pub fn mount(api: Arc<CatalogApi<H>>, mirror: MirrorStore<S>) -> Self {
        let invalidations = api.subscribe();
        tracing::debug!(cached = mirror.len(), "Catalog view mounted");
        Self {
            api,
            mirror,
            form: AddProductForm::new(),
            phase: ViewPhase::Loading,
            status: None,
            invalidations,
            cancel: CancellationToken::new(),
        }
    }

    pub fn api(&self) -> &Arc<CatalogApi<H>> {
        &self.api
    }

    pub fn mirror(&self) -> &MirrorStore<S> {
        &self.mirror
    }

    pub fn form(&self) -> &AddProductForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut AddProductForm {
        &mut self.form
    }

    pub fn phase(&self) -> &ViewPhase {
        &self.phase
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Token cancelled on unmount, for work spawned on the view's behalf
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_mounted(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Tear the view down; in-flight results are discarded from now on
    pub fn unmount(&mut self) {
        if self.is_mounted() {
            tracing::debug!("Catalog view unmounted");
            self.cancel.cancel();
        }
    }

    pub fn screen(&self) -> Screen {
        match &self.phase {
            ViewPhase::Loading => Screen::Loading,
            ViewPhase::Failed(message) => Screen::Error(message.clone()),
            ViewPhase::Ready => Screen::Grid(
                self.mirror
                    .products()
                    .iter()
                    .filter(|p| p.is_displayable())
                    .map(ProductCard::from)
                    .collect(),
            ),
        }
    }

    /// Drain pending invalidations, returning whether the catalog went stale
    pub fn take_invalidation(&mut self) -> bool {
        let mut stale = false;
        loop {
            match self.invalidations.try_recv() {
                Ok(CacheTag::Products) | Err(TryRecvError::Lagged(_)) => stale = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return stale,
            }
        }
    }

    /// Fetch the catalog and apply the result
    ///
    /// Returns `false` if the view was unmounted before the result arrived.
    pub async fn refresh(&mut self) -> bool {
        let api = Arc::clone(&self.api);
        match self.guard(api.list_products()).await {
            Some(result) => {
                self.apply_fetch(result);
                true
            }
            None => false,
        }
    }

    /// Refetch if a mutation invalidated the catalog since the last check
    pub async fn refresh_if_invalidated(&mut self) -> bool {
        if self.take_invalidation() {
            self.refresh().await
        } else {
            false
        }
    }

    /// Apply a finished list fetch
    pub fn apply_fetch(&mut self, result: ClientResult<Vec<Product>>) {
        if !self.is_mounted() {
            tracing::debug!("Dropping fetch result for unmounted view");
            return;
        }
        match result {
            Ok(remote) => {
                if let Err(e) = self.mirror.reconcile(&remote) {
                    tracing::error!("Failed to save products: {}", e);
                    self.status = Some(format!("Failed to save products: {e}"));
                }
                self.phase = ViewPhase::Ready;
            }
            Err(err) => {
                tracing::error!("Error fetching products: {}", err);
                self.phase = ViewPhase::Failed(err.to_string());
            }
        }
    }

    /// The update "increase price" would send for product `id`
    ///
    /// `None` if no mirrored product has that id.
    pub fn price_increase(&self, id: u64) -> Option<ProductUpdate> {
        self.mirror
            .get(id)
            .map(|product| ProductUpdate::price(product.price + PRICE_STEP))
    }

    /// Raise the price of product `id` by [`PRICE_STEP`]
    ///
    /// Returns whether the mirror was updated.
    pub async fn increase_price(&mut self, id: u64) -> bool {
        let Some(update) = self.price_increase(id) else {
            self.reject_unknown(id);
            return false;
        };
        let api = Arc::clone(&self.api);
        match self.guard(api.replace_product(id, &update)).await {
            Some(result) => self.apply_update(id, &update, result),
            None => false,
        }
    }

    /// Record that product `id` cannot be updated
    pub fn reject_unknown(&mut self, id: u64) {
        tracing::warn!(id, "Cannot increase price of unknown product");
        self.status = Some(format!("Product {id} is not in the catalog"));
    }

    /// Apply a finished product update
    pub fn apply_update(
        &mut self,
        id: u64,
        update: &ProductUpdate,
        result: ClientResult<ProductRecord>,
    ) -> bool {
        if !self.is_mounted() {
            tracing::debug!(id, "Dropping update result for unmounted view");
            return false;
        }
        if let Err(err) = result {
            tracing::error!("Failed to update product: {}", err);
            self.status = Some(format!("Failed to update product: {err}"));
            return false;
        }

        match self.mirror.apply_update(id, update) {
            Ok(applied) => {
                if applied {
                    self.status = Some(format!("Updated product #{id}"));
                }
                applied
            }
            Err(e) => {
                tracing::error!("Failed to save products: {}", e);
                self.status = Some(format!("Failed to save products: {e}"));
                true
            }
        }
    }

    /// Submit the add-product form
    ///
    /// Returns whether a product was added to the mirror.
    pub async fn submit_add_form(&mut self) -> bool {
        let Some(product) = self.form.begin_submit() else {
            return false;
        };
        let api = Arc::clone(&self.api);
        match self.guard(api.create_product(&product)).await {
            Some(result) => self.apply_created(product, result),
            None => false,
        }
    }

    /// Apply a finished create started with `form_mut().begin_submit()`
    pub fn apply_created(&mut self, product: NewProduct, result: ClientResult<ProductRecord>) -> bool {
        if !self.is_mounted() {
            tracing::debug!("Dropping create result for unmounted view");
            return false;
        }
        let Some(product) = self.form.finish_submit(product, &result) else {
            return false;
        };

        let title = product.title.clone();
        if let Err(e) = self.mirror.append(product) {
            tracing::error!("Failed to save products: {}", e);
            self.status = Some(format!("Failed to save products: {e}"));
        } else {
            self.status = Some(format!("Added {title}"));
        }
        true
    }

    /// Await `fut` unless the view is unmounted first
    async fn guard<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = fut => Some(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use catalog_client::{ClientError, InMemoryHttpClient};
    use serde_json::json;
    use shared::Rating;
    use std::time::Duration;

    type TestView = CatalogView<InMemoryHttpClient, Arc<MemoryStore>>;

    fn product(id: u64, title: &str, price: f64) -> Product {
        Product {
            id: Some(id),
            title: title.to_string(),
            price,
            description: "desc".to_string(),
            category: "cat".to_string(),
            image: "https://img.example/a.png".to_string(),
            rating: Rating::new(4.0, 2),
        }
    }

    fn mount(products: Vec<Product>) -> (TestView, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let api = Arc::new(CatalogApi::new(InMemoryHttpClient::with_products(products)));
        let view = CatalogView::mount(api, MirrorStore::load(Arc::clone(&store)));
        (view, store)
    }

    #[tokio::test]
    async fn test_loading_until_first_fetch() {
        let (mut view, _) = mount(vec![product(1, "A", 10.0)]);
        assert_eq!(view.screen(), Screen::Loading);
        assert_eq!(view.screen().lines(), vec!["Loading products..."]);

        assert!(view.refresh().await);
        assert_eq!(view.phase(), &ViewPhase::Ready);
    }

    #[tokio::test]
    async fn test_grid_cell_labels() {
        let (mut view, _) = mount(vec![product(1, "A", 10.0)]);
        view.refresh().await;

        let Screen::Grid(cards) = view.screen() else {
            panic!("expected grid");
        };
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "A");
        assert_eq!(cards[0].price, "$10");
        assert_eq!(cards[0].rating, "4 (2 reviews)");
        assert_eq!(
            view.screen().lines(),
            vec!["Product List (1)", "#1 A | cat | $10 | Rating: 4 (2 reviews)"]
        );
    }

    #[tokio::test]
    async fn test_fetch_error_replaces_grid() {
        let (mut view, _) = mount(vec![product(1, "A", 10.0)]);
        view.api().http().fail_next(ClientError::Network("offline".into()));

        view.refresh().await;
        assert_eq!(
            view.screen().lines(),
            vec!["Error fetching products: Network error: offline"]
        );
        assert!(view.mirror().is_empty());
    }

    #[tokio::test]
    async fn test_increase_price_sends_partial_update() {
        let (mut view, store) = mount(vec![product(1, "A", 10.0)]);
        view.refresh().await;

        assert_eq!(view.price_increase(1), Some(ProductUpdate::price(20.0)));
        assert!(view.increase_price(1).await);

        let put = view.api().http().requests().pop().unwrap();
        assert_eq!(put.method, "PUT");
        assert_eq!(put.path, "products/1");
        assert_eq!(put.body, Some(json!({"price": 20.0})));

        assert_eq!(view.mirror().get(1).unwrap().price, 20.0);
        assert_eq!(view.status(), Some("Updated product #1"));
        // Reconcile plus update
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_increase_price_unknown_id_makes_no_request() {
        let (mut view, _) = mount(vec![product(1, "A", 10.0)]);
        view.refresh().await;
        let before = view.api().http().request_count();

        assert!(!view.increase_price(7).await);
        assert_eq!(view.api().http().request_count(), before);
        assert_eq!(view.status(), Some("Product 7 is not in the catalog"));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_mirror() {
        let (mut view, _) = mount(vec![product(1, "A", 10.0)]);
        view.refresh().await;
        view.api().http().fail_next(ClientError::Status {
            status: 500,
            message: "boom".into(),
        });

        assert!(!view.increase_price(1).await);
        assert_eq!(view.mirror().get(1).unwrap().price, 10.0);
        assert_eq!(
            view.status(),
            Some("Failed to update product: HTTP 500: boom")
        );
    }

    #[tokio::test]
    async fn test_mutation_triggers_refetch() {
        let (mut view, _) = mount(vec![product(1, "A", 10.0)]);
        view.refresh().await;
        assert!(!view.take_invalidation());

        // Cached: no second GET
        view.refresh().await;
        assert_eq!(view.api().http().request_count(), 1);

        view.increase_price(1).await;
        assert!(view.refresh_if_invalidated().await);

        let methods: Vec<_> = view
            .api()
            .http()
            .requests()
            .iter()
            .map(|r| r.method)
            .collect();
        assert_eq!(methods, vec!["GET", "PUT", "GET"]);
        assert!(!view.refresh_if_invalidated().await);
    }

    #[tokio::test]
    async fn test_unmount_discards_in_flight_fetch() {
        let (mut view, store) = mount(vec![product(1, "A", 10.0)]);
        view.api().http().set_delay(Duration::from_millis(200));

        let cancel = view.cancellation();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        assert!(!view.refresh().await);
        assert!(!view.is_mounted());
        assert_eq!(view.phase(), &ViewPhase::Loading);
        assert!(view.mirror().is_empty());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_results_after_unmount_are_dropped() {
        let (mut view, store) = mount(vec![]);
        view.unmount();

        view.apply_fetch(Ok(vec![product(1, "A", 10.0)]));
        assert!(!view.apply_update(1, &ProductUpdate::price(5.0), Ok(ProductRecord::default())));

        assert_eq!(view.screen(), Screen::Loading);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_incomplete_products_are_not_rendered() {
        let (mut view, _) = mount(vec![product(1, "A", 10.0), product(2, "", 5.0)]);
        view.refresh().await;

        let Screen::Grid(cards) = view.screen() else {
            panic!("expected grid");
        };
        assert_eq!(cards.len(), 1);
        assert_eq!(view.mirror().len(), 2);
    }
}
