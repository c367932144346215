//! Integration tests for Adroit Shop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p adroit-integration-tests
//! ```
//!
//! Every test starts its own [`MockBackend`]: an `axum` server on an
//! ephemeral port speaking the shop REST API. The storefront talks to it over
//! real HTTP through `BackendClient`, so requests, bearer auth, status codes
//! and JSON shapes are all exercised end to end.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use adroit_core::{ProductId, ProductRef};
use adroit_storefront::config::StorefrontConfig;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Token the mock backend accepts.
pub const TOKEN: &str = "42|k9Tq2ZrV7mXw1bLpNcY8sHdF3gJe6uAo";

/// One line of the mock account cart.
#[derive(Debug, Clone)]
pub struct MockItem {
    /// Raw product id as the backend reports it (number or catalog code).
    pub product_id: Value,
    pub quantity: u32,
    pub size: String,
}

impl MockItem {
    #[must_use]
    pub fn new(product_id: Value, quantity: u32, size: &str) -> Self {
        Self {
            product_id,
            quantity,
            size: size.to_string(),
        }
    }
}

#[derive(Default)]
struct Inner {
    cart: Vec<MockItem>,
    products: Vec<Value>,
    failing_adds: HashSet<i32>,
    failing_removes: HashSet<i32>,
    fail_updates: bool,
    fail_products: bool,
    rate_limit_next: Option<u64>,
    requests: Vec<String>,
}

/// Shared state of a [`MockBackend`].
#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<Mutex<Inner>>,
}

impl MockState {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process shop backend.
pub struct MockBackend {
    addr: SocketAddr,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = MockState::default();
        let app = router(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL of the mock API.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// Storefront configuration pointing at this backend, without a token.
    ///
    /// # Panics
    ///
    /// Panics if the generated base URL does not parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::for_base_url(&self.base_url()).expect("mock base URL is valid")
    }

    /// Replace the account cart.
    pub fn seed_cart(&self, items: Vec<MockItem>) {
        self.state.lock().cart = items;
    }

    /// Add a catalog product.
    pub fn seed_product(&self, id: i32, name: &str, price: &str) {
        self.state.lock().products.push(json!({
            "id": id,
            "productname": name,
            "pro_price": price,
            "images": [format!("/img/{id}.jpg")],
        }));
    }

    /// Fail every add of `product_id` with a 500.
    pub fn fail_add_of(&self, product_id: i32) {
        self.state.lock().failing_adds.insert(product_id);
    }

    /// Fail every remove of `product_id` with a 500.
    pub fn fail_remove_of(&self, product_id: i32) {
        self.state.lock().failing_removes.insert(product_id);
    }

    /// Fail every quantity update with a 500.
    pub fn fail_updates(&self, fail: bool) {
        self.state.lock().fail_updates = fail;
    }

    /// Fail catalog listings with a 503.
    pub fn fail_products(&self, fail: bool) {
        self.state.lock().fail_products = fail;
    }

    /// Answer the next request with `429` and `Retry-After`.
    pub fn rate_limit_next(&self, retry_after: u64) {
        self.state.lock().rate_limit_next = Some(retry_after);
    }

    /// Quantity of a product/size on the account cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: i32, size: &str) -> Option<u32> {
        self.state
            .lock()
            .cart
            .iter()
            .find(|i| same_product(&i.product_id, product_id) && i.size == size)
            .map(|i| i.quantity)
    }

    /// Number of lines on the account cart.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.state.lock().cart.len()
    }

    /// Requests served so far, e.g. `"POST cart/7/add"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    /// Number of requests whose line starts with `prefix`.
    #[must_use]
    pub fn count_requests(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn same_product(raw: &Value, product_id: i32) -> bool {
    serde_json::from_value::<ProductRef>(raw.clone())
        .ok()
        .and_then(|r| r.normalize().ok())
        == Some(ProductId::new(product_id))
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/cart/view", get(view_cart))
        .route("/api/cart/{id}/add", post(add_item))
        .route("/api/cart/{id}/update", put(update_item))
        .route("/api/cart/{id}/remove", delete(remove_item))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .with_state(state)
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Record the request and apply auth and rate limiting.
fn gate(
    inner: &mut Inner,
    headers: &HeaderMap,
    request: String,
    needs_auth: bool,
) -> Result<(), Response> {
    inner.requests.push(request);

    if let Some(retry_after) = inner.rate_limit_next.take() {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            "Too Many Attempts.",
        )
            .into_response());
    }

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if needs_auth && bearer != Some(TOKEN) {
        return Err(message(StatusCode::UNAUTHORIZED, "Unauthenticated."));
    }
    Ok(())
}

fn cart_json(inner: &Inner) -> Value {
    let data: Vec<Value> = inner
        .cart
        .iter()
        .map(|item| {
            let product = inner.products.iter().find(|p| {
                p.get("id")
                    .and_then(Value::as_i64)
                    .and_then(|id| i32::try_from(id).ok())
                    .is_some_and(|id| same_product(&item.product_id, id))
            });
            json!({
                "product_id": item.product_id,
                "pro_quantity": item.quantity.to_string(),
                "size": item.size,
                "productname": product.and_then(|p| p.get("productname")).cloned(),
                "pro_price": product.and_then(|p| p.get("pro_price")).cloned(),
                "images": product.and_then(|p| p.get("images")).cloned(),
            })
        })
        .collect();
    json!({ "data": data })
}

async fn view_cart(State(state): State<MockState>, headers: HeaderMap) -> Response {
    let mut inner = state.lock();
    if let Err(response) = gate(&mut inner, &headers, "GET cart/view".to_string(), true) {
        return response;
    }
    Json(cart_json(&inner)).into_response()
}

#[derive(Deserialize)]
struct AddBody {
    quantity: u32,
    size: String,
}

async fn add_item(
    State(state): State<MockState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(body): Json<AddBody>,
) -> Response {
    let mut inner = state.lock();
    if let Err(response) = gate(&mut inner, &headers, format!("POST cart/{id}/add"), true) {
        return response;
    }
    if inner.failing_adds.contains(&id) {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Server Error");
    }

    if let Some(item) = inner
        .cart
        .iter_mut()
        .find(|i| same_product(&i.product_id, id) && i.size == body.size)
    {
        item.quantity += body.quantity;
    } else {
        inner
            .cart
            .push(MockItem::new(json!(id), body.quantity, &body.size));
    }
    message(StatusCode::OK, "Product added to cart")
}

#[derive(Deserialize)]
struct UpdateBody {
    quantity: u32,
}

async fn update_item(
    State(state): State<MockState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Response {
    let mut inner = state.lock();
    if let Err(response) = gate(&mut inner, &headers, format!("PUT cart/{id}/update"), true) {
        return response;
    }
    if inner.fail_updates {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Server Error");
    }

    match inner
        .cart
        .iter_mut()
        .find(|i| same_product(&i.product_id, id))
    {
        Some(item) => {
            item.quantity = body.quantity;
            message(StatusCode::OK, "Cart updated")
        }
        None => message(StatusCode::NOT_FOUND, "Item not in cart"),
    }
}

async fn remove_item(
    State(state): State<MockState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    let mut inner = state.lock();
    if let Err(response) = gate(&mut inner, &headers, format!("DELETE cart/{id}/remove"), true) {
        return response;
    }
    if inner.failing_removes.contains(&id) {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Server Error");
    }

    inner.cart.retain(|i| !same_product(&i.product_id, id));
    message(StatusCode::OK, "Product removed from cart")
}

async fn list_products(State(state): State<MockState>, headers: HeaderMap) -> Response {
    let mut inner = state.lock();
    if let Err(response) = gate(&mut inner, &headers, "GET products".to_string(), false) {
        return response;
    }
    if inner.fail_products {
        return message(StatusCode::SERVICE_UNAVAILABLE, "Maintenance");
    }
    Json(Value::Array(inner.products.clone())).into_response()
}

async fn get_product(
    State(state): State<MockState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    let mut inner = state.lock();
    if let Err(response) = gate(&mut inner, &headers, format!("GET products/{id}"), false) {
        return response;
    }
    inner
        .products
        .iter()
        .find(|p| p.get("id").and_then(Value::as_i64) == Some(i64::from(id)))
        .map_or_else(
            || message(StatusCode::NOT_FOUND, "Product not found"),
            |p| Json(p.clone()).into_response(),
        )
}
