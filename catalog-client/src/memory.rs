//! In-memory catalog service
//!
//! An `HttpClient` that answers the catalog routes from memory instead of
//! the network. Used by tests; requires the `in-memory` feature
//! outside this crate's own tests.

use crate::{ClientError, ClientResult, HttpClient};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{Product, ProductRecord};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One request as seen by the in-memory service
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct State {
    products: Vec<Product>,
    requests: Vec<RecordedRequest>,
    failures: VecDeque<ClientError>,
    delay: Option<Duration>,
    next_id: u64,
}

/// In-memory implementation of the catalog routes
///
/// Mutations are applied to the stored collection, so a refetch after a
/// successful create or replace observes it.
#[derive(Default)]
pub struct InMemoryHttpClient {
    state: Mutex<State>,
}

impl InMemoryHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `products` already stored
    pub fn with_products(products: Vec<Product>) -> Self {
        let next_id = products.iter().filter_map(|p| p.id).max().unwrap_or(0);
        Self {
            state: Mutex::new(State {
                products,
                next_id,
                ..Default::default()
            }),
        }
    }

    /// Replace the stored collection
    pub fn set_products(&self, products: Vec<Product>) {
        self.lock().products = products;
    }

    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    /// Fail the next request with `error` (queued, one per call)
    pub fn fail_next(&self, error: ClientError) {
        self.lock().failures.push_back(error);
    }

    /// Delay every response, to exercise in-flight behavior
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the request, returning the configured delay and queued failure
    fn record(
        &self,
        method: &'static str,
        path: &str,
        body: Option<Value>,
    ) -> (Option<Duration>, Option<ClientError>) {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method,
            path: path.trim_start_matches('/').to_string(),
            body,
        });
        (state.delay, state.failures.pop_front())
    }

    async fn respond<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        body: Option<Value>,
    ) -> ClientResult<T> {
        let (delay, failure) = self.record(method, path, body.clone());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }

        let value = self.route(method, path.trim_start_matches('/'), body)?;
        serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    fn route(&self, method: &str, path: &str, body: Option<Value>) -> ClientResult<Value> {
        let mut state = self.lock();
        let segments: Vec<&str> = path.split('/').collect();

        match (method, segments.as_slice()) {
            ("GET", ["products"]) => Ok(serde_json::to_value(&state.products)?),
            ("POST", ["products"]) => {
                let mut product: Product =
                    serde_json::from_value(body.unwrap_or(Value::Null)).map_err(|e| {
                        ClientError::Status {
                            status: 400,
                            message: e.to_string(),
                        }
                    })?;
                state.next_id += 1;
                product.id = Some(state.next_id);
                let value = serde_json::to_value(&product)?;
                state.products.push(product);
                Ok(value)
            }
            ("PUT", ["products", id]) => {
                let id: u64 = id.parse().map_err(|_| ClientError::Status {
                    status: 400,
                    message: format!("invalid product id: {id}"),
                })?;
                let record: ProductRecord = serde_json::from_value(body.unwrap_or(Value::Null))
                    .map_err(|e| ClientError::Status {
                        status: 400,
                        message: e.to_string(),
                    })?;
                let product = state
                    .products
                    .iter_mut()
                    .find(|p| p.id == Some(id))
                    .ok_or_else(|| ClientError::Status {
                        status: 404,
                        message: format!("product {id} not found"),
                    })?;
                product.apply(&record.fields);
                Ok(serde_json::to_value(ProductRecord {
                    id: Some(id),
                    fields: record.fields,
                })?)
            }
            _ => Err(ClientError::Status {
                status: 404,
                message: format!("no route for {method} /{path}"),
            }),
        }
    }
}

#[async_trait]
impl HttpClient for InMemoryHttpClient {
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.respond("GET", path, None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let body = serde_json::to_value(body)?;
        self.respond("POST", path, Some(body)).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let body = serde_json::to_value(body)?;
        self.respond("PUT", path, Some(body)).await
    }
}
