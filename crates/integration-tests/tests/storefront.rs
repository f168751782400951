//! Public storefront: catalog, cart and checkout.

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use souq_integration_tests::{TestContext, dec, json_body};

#[tokio::test]
async fn test_checkout_creates_pending_order_and_takes_stock() {
    let ctx = TestContext::new().await;
    let (merchant, store) = ctx.merchant("01011111111", "Nile Candles").await;
    assert_eq!(store["url"], "nile-candles");

    let product = json_body(
        ctx.post(
            &merchant,
            "/api/products",
            &json!({ "name": "Amber candle", "price": "150", "cost": "60", "stock": 3 }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let product_id = product["id"].as_str().unwrap();

    let shopper = ctx.client();
    let catalog = json_body(ctx.get(&shopper, "/store/nile-candles").await, StatusCode::OK).await;
    assert_eq!(catalog["name"], "Nile Candles");
    assert_eq!(catalog["products"][0]["inStock"], true);

    let cart = json_body(
        ctx.post(
            &shopper,
            "/store/nile-candles/cart",
            &json!({ "productId": product_id, "quantity": 2 }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(dec(&cart["subtotal"]), Decimal::from(300));

    // 2 in the cart + 2 more exceeds the 3 in stock.
    let short = ctx
        .post(
            &shopper,
            "/store/nile-candles/cart",
            &json!({ "productId": product_id, "quantity": 2 }),
        )
        .await;
    assert_eq!(short.status(), StatusCode::CONFLICT);

    let order = json_body(
        ctx.post(
            &shopper,
            "/store/nile-candles/checkout",
            &json!({
                "customerName": "Hana",
                "customerPhone": "01155556666",
                "customerAddress": "Alexandria"
            }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(order["status"], "pending_call");
    assert_eq!(order["source"], "storefront");
    assert_eq!(dec(&order["items"][0]["unitCost"]), Decimal::from(60));

    let cart = json_body(ctx.get(&shopper, "/store/nile-candles/cart").await, StatusCode::OK).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());

    let products = json_body(ctx.get(&merchant, "/api/products").await, StatusCode::OK).await;
    assert_eq!(products[0]["stock"], 1);

    let empty = ctx
        .post(
            &shopper,
            "/store/nile-candles/checkout",
            &json!({
                "customerName": "Hana",
                "customerPhone": "01155556666",
                "customerAddress": "Alexandria"
            }),
        )
        .await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inactive_products_are_hidden() {
    let ctx = TestContext::new().await;
    let (merchant, _) = ctx.merchant("01011111111", "Nile Candles").await;
    let product = json_body(
        ctx.post(
            &merchant,
            "/api/products",
            &json!({ "name": "Old candle", "price": "90", "stock": 5 }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let id = product["id"].as_str().unwrap();
    let resp = ctx
        .put(&merchant, &format!("/api/products/{id}"), &json!({ "active": false }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let shopper = ctx.client();
    let catalog = json_body(ctx.get(&shopper, "/store/nile-candles").await, StatusCode::OK).await;
    assert!(catalog["products"].as_array().unwrap().is_empty());

    let add = ctx
        .post(
            &shopper,
            "/store/nile-candles/cart",
            &json!({ "productId": id, "quantity": 1 }),
        )
        .await;
    assert_eq!(add.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_store_slug() {
    let ctx = TestContext::new().await;
    let resp = ctx.get(&ctx.client(), "/store/nowhere").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_slugs_stay_unique() {
    let ctx = TestContext::new().await;
    let (_, first) = ctx.merchant("01011111111", "Nile Candles").await;
    let (_, second) = ctx.merchant("01022222222", "Nile  Candles!").await;
    assert_eq!(first["url"], "nile-candles");
    assert_eq!(second["url"], "nile-candles-2");
}
