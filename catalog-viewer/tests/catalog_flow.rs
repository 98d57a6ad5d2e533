//! End-to-end flows through the shell against the in-memory catalog service

use catalog_client::{CatalogApi, ClientError, InMemoryHttpClient};
use catalog_viewer::{
    AddArgs, CatalogView, Command, FileStore, FormError, FormField, KeyValueStore, MemoryStore,
    MirrorStore, ReconcilePolicy, Shell,
};
use serde_json::json;
use shared::{Product, Rating};
use std::sync::Arc;
use tempfile::TempDir;

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

fn lamp() -> AddArgs {
    AddArgs {
        title: "Lamp".to_string(),
        price: "25".to_string(),
        description: "Desk lamp".to_string(),
        category: "home".to_string(),
        image: "https://img.example/lamp.png".to_string(),
        rating: "4.5".to_string(),
    }
}

fn shell<S: KeyValueStore>(
    http: InMemoryHttpClient,
    mirror: MirrorStore<S>,
) -> Shell<InMemoryHttpClient, S> {
    Shell::new(CatalogView::mount(Arc::new(CatalogApi::new(http)), mirror))
}

fn memory_shell(
    products: Vec<Product>,
) -> (Shell<InMemoryHttpClient, Arc<MemoryStore>>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let shell = shell(
        InMemoryHttpClient::with_products(products),
        MirrorStore::load(Arc::clone(&store)),
    );
    (shell, store)
}

#[tokio::test]
async fn test_list_prints_grid() {
    let (mut shell, _) = memory_shell(vec![product(1, "A", 10.0), product(2, "B", 109.95)]);

    let lines = shell.execute(Command::List).await.unwrap();
    assert_eq!(
        lines,
        vec![
            "Product List (2)",
            "#1 A | cat | $10 | Rating: 4 (2 reviews)",
            "#2 B | cat | $109.95 | Rating: 4 (2 reviews)",
        ]
    );
}

#[tokio::test]
async fn test_list_reports_fetch_error() {
    let (mut shell, store) = memory_shell(vec![product(1, "A", 10.0)]);
    shell.view().api().http().fail_next(ClientError::Status {
        status: 503,
        message: "Service Unavailable".into(),
    });

    let err = shell.execute(Command::List).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error fetching products: HTTP 503: Service Unavailable"
    );
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_list_twice_writes_once() {
    let (mut shell, store) = memory_shell(vec![product(1, "A", 10.0)]);

    shell.execute(Command::List).await.unwrap();
    shell.execute(Command::List).await.unwrap();
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_add_appends_one_unreviewed_product() {
    let (mut shell, _) = memory_shell(vec![product(1, "A", 10.0)]);
    shell.execute(Command::List).await.unwrap();

    let lines = shell.execute(Command::Add(lamp())).await.unwrap();
    assert_eq!(lines, vec!["Added Lamp"]);

    let mirror = shell.view().mirror();
    assert_eq!(mirror.len(), 2);
    let added = &mirror.products()[1];
    assert_eq!(added.id, None);
    assert_eq!(added.title, "Lamp");
    assert_eq!(added.rating, Rating::new(4.5, 0));

    let post = shell.view().api().http().requests().pop().unwrap();
    assert_eq!(post.method, "POST");
    assert_eq!(post.path, "products");
    assert_eq!(
        post.body,
        Some(json!({
            "title": "Lamp",
            "price": 25.0,
            "description": "Desk lamp",
            "category": "home",
            "image": "https://img.example/lamp.png",
            "rating": {"rate": 4.5, "count": 0}
        }))
    );
}

#[tokio::test]
async fn test_add_with_empty_title_makes_no_request() {
    let (mut shell, store) = memory_shell(vec![]);
    let args = AddArgs {
        title: String::new(),
        ..lamp()
    };

    let err = shell.execute(Command::Add(args)).await.unwrap_err();
    assert_eq!(err.to_string(), "Please enter all fields with valid data.");
    assert_eq!(shell.view().api().http().request_count(), 0);
    assert!(shell.view().mirror().is_empty());
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_rejected_create_keeps_form() {
    let (mut shell, store) = memory_shell(vec![product(1, "A", 10.0)]);
    shell.execute(Command::List).await.unwrap();
    shell.view().api().http().fail_next(ClientError::Status {
        status: 500,
        message: "boom".into(),
    });

    let err = shell.execute(Command::Add(lamp())).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to add product. Please try again.");

    let form = shell.view().form();
    assert!(form.is_open());
    assert_eq!(form.error(), Some(FormError::SubmitFailed));
    assert_eq!(form.value(FormField::Title), "Lamp");
    assert_eq!(shell.view().mirror().len(), 1);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_bump_price() {
    let (mut shell, _) = memory_shell(vec![product(1, "A", 10.0)]);

    let lines = shell.execute(Command::BumpPrice { id: 1 }).await.unwrap();
    assert_eq!(lines, vec!["Updated product #1", "A now costs $20"]);

    let put = shell.view().api().http().requests().pop().unwrap();
    assert_eq!(put.body, Some(json!({"price": 20.0})));
    assert_eq!(shell.view().mirror().get(1).unwrap().price, 20.0);
}

#[tokio::test]
async fn test_bump_unknown_price_fails() {
    let (mut shell, _) = memory_shell(vec![product(1, "A", 10.0)]);

    let err = shell
        .execute(Command::BumpPrice { id: 9 })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Product 9 is not in the catalog");
}

#[tokio::test]
async fn test_mutation_refetch_reconciles_remote_state() {
    let (mut shell, _) = memory_shell(vec![product(1, "A", 10.0)]);
    shell.execute(Command::List).await.unwrap();
    shell.execute(Command::Add(lamp())).await.unwrap();

    // The service assigned id 2; the refetch replaces the local entry
    assert!(shell.view_mut().refresh_if_invalidated().await);
    let ids: Vec<_> = shell.view().mirror().products().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![Some(1), Some(2)]);
}

#[tokio::test]
async fn test_keep_pending_survives_refetch_of_stale_service() {
    let store = Arc::new(MemoryStore::new());
    let http = InMemoryHttpClient::with_products(vec![product(1, "A", 10.0)]);
    let mut shell = shell(
        http,
        MirrorStore::load(Arc::clone(&store)).with_policy(ReconcilePolicy::KeepPending),
    );
    shell.execute(Command::List).await.unwrap();
    shell.execute(Command::Add(lamp())).await.unwrap();

    // A service that forgets creations, like the public demo one
    shell
        .view()
        .api()
        .http()
        .set_products(vec![product(1, "A", 10.0)]);
    shell.view_mut().refresh_if_invalidated().await;

    let titles: Vec<_> = shell
        .view()
        .mirror()
        .products()
        .iter()
        .map(|p| p.title.clone())
        .collect();
    assert_eq!(titles, vec!["A", "Lamp"]);
}

#[tokio::test]
async fn test_mirror_survives_remount_without_fetch() {
    let temp_dir = TempDir::new().unwrap();

    let mut first = shell(
        InMemoryHttpClient::with_products(vec![product(1, "A", 10.0)]),
        MirrorStore::load(FileStore::new(temp_dir.path())),
    );
    first.execute(Command::List).await.unwrap();
    first.execute(Command::Add(lamp())).await.unwrap();
    let before = first.view().mirror().products().to_vec();
    first.view_mut().unmount();
    drop(first);

    let second = shell(
        InMemoryHttpClient::new(),
        MirrorStore::load(FileStore::new(temp_dir.path())),
    );
    assert_eq!(second.view().mirror().products(), before.as_slice());
    assert_eq!(second.view().api().http().request_count(), 0);
}

#[tokio::test]
async fn test_browse_is_not_headless() {
    let (mut shell, _) = memory_shell(vec![]);
    assert!(shell.execute(Command::Browse).await.is_err());
}
