use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use lotledger_api::app::services::build_memory_services;
use lotledger_api::auth::Claims;
use lotledger_core::UserId;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let app =
            lotledger_api::app::build_app(jwt_secret.to_string(), Arc::new(build_memory_services()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, user_id: UserId) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + 600,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

struct TestContext {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TestContext {
    async fn post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap()
    }

    async fn post_id(&self, path: &str, body: serde_json::Value) -> String {
        let res = self.post(path, body).await;
        assert_eq!(res.status(), StatusCode::CREATED, "POST {path}");
        res.json::<serde_json::Value>().await.unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

/// Register reference data shared by the scenarios: acting user,
/// department, supplier, and one product.
async fn setup(srv: &TestServer, jwt_secret: &str) -> (TestContext, String, String) {
    let user_id = UserId::new();
    let ctx = TestContext {
        client: reqwest::Client::new(),
        base_url: srv.base_url.clone(),
        token: mint_jwt(jwt_secret, user_id),
    };

    let registered = ctx
        .post(
            "/users",
            json!({ "user_id": user_id.to_string(), "display_name": "ops" }),
        )
        .await;
    assert_eq!(registered.status(), StatusCode::CREATED);

    let department_id = ctx
        .post_id("/departments", json!({ "code": "BUT", "name": "Butchery" }))
        .await;
    let supplier_id = ctx
        .post_id(
            "/suppliers",
            json!({ "code": "SUP-01", "name": "Karoo Meats" }),
        )
        .await;
    let product_id = ctx
        .post_id(
            "/products",
            json!({
                "sku": "BEEF-RIB",
                "name": "Beef ribeye",
                "department_id": department_id,
                "unit": "kg",
                "default_supplier_id": supplier_id,
            }),
        )
        .await;

    (ctx, supplier_id, product_id)
}

#[tokio::test]
async fn health_is_public_but_ledger_routes_require_auth() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let unauthorized = client
        .get(format!("{}/inventory", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    let bad_token = client
        .get(format!("{}/inventory", srv.base_url))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(bad_token.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn receipt_sale_shortfall_and_trace_over_http() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let (ctx, supplier_id, product_id) = setup(&srv, jwt_secret).await;

    // Receive 100 units (lot expires 2025-06-11).
    let receipt = ctx
        .post(
            "/receipts",
            json!({
                "product_id": product_id,
                "supplier_id": supplier_id,
                "quantity": 100,
                "received_date": "2025-06-01",
                "expiry_date": "2025-06-11",
                "supplier_invoice": "INV-1001",
            }),
        )
        .await;
    assert_eq!(receipt.status(), StatusCode::CREATED);
    let lot: serde_json::Value = receipt.json().await.unwrap();
    let lot_id = lot["id"].as_str().unwrap().to_string();

    let stock: serde_json::Value = ctx
        .get(&format!("/products/{product_id}/inventory"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(stock["quantity"], 100);

    // Sell 30.
    let sale = ctx
        .post(
            "/sales",
            json!({
                "items": [{ "product_id": product_id, "quantity": 30, "unit_price": 500 }],
            }),
        )
        .await;
    assert_eq!(sale.status(), StatusCode::CREATED);

    let stock: serde_json::Value = ctx
        .get(&format!("/products/{product_id}/inventory"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(stock["quantity"], 70);

    // Attempt to sell 80 more: 409 naming the short product, stock intact.
    let short = ctx
        .post(
            "/sales",
            json!({
                "items": [{ "product_id": product_id, "quantity": 80, "unit_price": 500 }],
            }),
        )
        .await;
    assert_eq!(short.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = short.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_inventory");
    assert_eq!(body["product"], "BEEF-RIB");
    assert_eq!(body["available"], 70);

    let stock: serde_json::Value = ctx
        .get(&format!("/products/{product_id}/inventory"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(stock["quantity"], 70);

    // Write the rest off after expiry.
    let expired = ctx
        .post(
            &format!("/lots/{lot_id}/expire"),
            json!({ "as_of": "2025-06-12", "category": "spoiled" }),
        )
        .await;
    assert_eq!(expired.status(), StatusCode::OK);
    let record: serde_json::Value = expired.json().await.unwrap();
    assert_eq!(record["quantity"], 70);

    let stock: serde_json::Value = ctx
        .get(&format!("/products/{product_id}/inventory"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(stock["quantity"], 0);

    // Trace: receipt, sale, expiry write-off, oldest first.
    let trace: serde_json::Value = ctx
        .get(&format!("/lots/{lot_id}/trace"))
        .await
        .json()
        .await
        .unwrap();
    let entries = trace.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["kind"], "receipt");
    assert_eq!(entries[0]["delta"], 100);
    assert_eq!(entries[1]["kind"], "sale");
    assert_eq!(entries[1]["delta"], -30);
    assert_eq!(entries[2]["kind"], "expiry_writeoff");
    assert_eq!(entries[2]["delta"], -70);
}

#[tokio::test]
async fn validation_errors_map_to_bad_request() {
    let jwt_secret = "test-secret";
    let srv = TestServer::spawn(jwt_secret).await;
    let (ctx, supplier_id, product_id) = setup(&srv, jwt_secret).await;

    // Non-positive quantity.
    let res = ctx
        .post(
            "/receipts",
            json!({
                "product_id": product_id,
                "supplier_id": supplier_id,
                "quantity": 0,
                "received_date": "2025-06-01",
                "expiry_date": "2025-06-11",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    // Unknown product is 404.
    let res = ctx
        .get(&format!("/products/{}/inventory", uuid::Uuid::now_v7()))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
