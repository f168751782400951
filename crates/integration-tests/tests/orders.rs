//! Order lifecycle, settlement postings and the reports built on them.

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use souq_integration_tests::{TestContext, dec, json_body};

/// A courier charging 1% COD over 500 plus 14% tax, 1% insurance and a
/// 20 inspection fee.
async fn add_courier(ctx: &TestContext, client: &Client) -> String {
    let companies = json_body(
        ctx.put(
            client,
            "/api/settings/shipping-companies",
            &json!([{
                "name": "Bosta",
                "fees": {
                    "cod": { "enabled": true, "threshold": "500", "rate": "0.01", "taxRate": "0.14" },
                    "insurance": { "enabled": true, "rate": "0.01" },
                    "inspectionFee": "20"
                }
            }]),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    companies[0]["id"].as_str().unwrap().to_string()
}

async fn place_order(ctx: &TestContext, client: &Client, courier: &str) -> Value {
    json_body(
        ctx.post(
            client,
            "/api/orders",
            &json!({
                "customerName": "Salma",
                "customerPhone": "01122223333",
                "customerAddress": "Cairo",
                "items": [{ "name": "Lamp", "quantity": 1, "unitPrice": "1000", "unitCost": "600" }],
                "shippingFee": "50",
                "shippingCompanyId": courier,
                "insured": true
            }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await
}

async fn set_status(ctx: &TestContext, client: &Client, order: &str, status: &str) -> Value {
    json_body(
        ctx.post(
            client,
            &format!("/api/orders/{order}/status"),
            &json!({ "status": status }),
        )
        .await,
        StatusCode::OK,
    )
    .await
}

#[tokio::test]
async fn test_full_lifecycle_settles_wallet_and_awards_points() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.merchant("01011111111", "Lamp House").await;
    let courier = add_courier(&ctx, &client).await;
    let resp = ctx
        .put(
            &client,
            "/api/settings",
            &json!({ "loyalty": { "enabled": true, "unitsPerPoint": "10" } }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let order = place_order(&ctx, &client, &courier).await;
    let id = order["id"].as_str().unwrap();
    assert_eq!(order["number"], 1001);
    assert_eq!(order["status"], "pending_call");

    let detail = json_body(ctx.get(&client, &format!("/api/orders/{id}")).await, StatusCode::OK).await;
    assert_eq!(dec(&detail["fees"]["codFee"]), "6.27".parse::<Decimal>().unwrap());
    assert_eq!(dec(&detail["fees"]["netProfit"]), "363.23".parse::<Decimal>().unwrap());

    // Confirmation call moves it to review.
    let called = json_body(
        ctx.post(
            &client,
            &format!("/api/orders/{id}/calls"),
            &json!({ "outcome": "confirmed", "note": "ok" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(called["status"], "in_review");
    assert_eq!(called["callLog"].as_array().unwrap().len(), 1);

    let shipped = set_status(&ctx, &client, id, "shipped").await;
    assert_eq!(shipped["postings"].as_array().unwrap().len(), 3);
    set_status(&ctx, &client, id, "delivered").await;
    let collected = set_status(&ctx, &client, id, "collected").await;
    assert_eq!(collected["loyaltyPoints"], 100);

    let wallet = json_body(ctx.get(&client, "/api/wallet").await, StatusCode::OK).await;
    assert_eq!(dec(&wallet["summary"]["balance"]), "963.23".parse::<Decimal>().unwrap());
    assert_eq!(wallet["transactions"].as_array().unwrap().len(), 5);

    let customer = json_body(
        ctx.get(&client, "/api/customers/01122223333").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(customer["loyaltyPoints"], 100);
    assert_eq!(customer["successfulOrders"], 1);
    assert_eq!(customer["segment"], "new");

    let report = json_body(
        ctx.get(&client, "/api/reports/collections?status=collected").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(report["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_transition_is_a_conflict() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.merchant("01011111111", "Lamp House").await;
    let courier = add_courier(&ctx, &client).await;
    let order = place_order(&ctx, &client, &courier).await;
    let id = order["id"].as_str().unwrap();

    let resp = ctx
        .post(
            &client,
            &format!("/api/orders/{id}/status"),
            &json!({ "status": "collected" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let unknown = ctx
        .post(
            &client,
            "/api/orders/ord_missing/status",
            &json!({ "status": "canceled" }),
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_confirmation_queue_lists_waiting_orders_oldest_first() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.merchant("01011111111", "Lamp House").await;
    let courier = add_courier(&ctx, &client).await;
    let first = place_order(&ctx, &client, &courier).await;
    let second = place_order(&ctx, &client, &courier).await;
    set_status(&ctx, &client, second["id"].as_str().unwrap(), "canceled").await;
    let third = place_order(&ctx, &client, &courier).await;

    let queue = json_body(ctx.get(&client, "/api/confirmation-queue").await, StatusCode::OK).await;
    let numbers: Vec<&Value> = queue
        .as_array()
        .unwrap()
        .iter()
        .map(|e| &e["order"]["number"])
        .collect();
    assert_eq!(numbers, vec![&first["number"], &third["number"]]);
    assert_eq!(dec(&queue[0]["fees"]["netProfit"]), "363.23".parse::<Decimal>().unwrap());
}

#[tokio::test]
async fn test_expense_reversal_happens_once() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.merchant("01011111111", "Lamp House").await;

    let expense = json_body(
        ctx.post(
            &client,
            "/api/wallet/expenses",
            &json!({ "amount": "120", "description": "Packaging" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let id = expense["id"].as_str().unwrap();

    let resp = ctx.delete(&client, &format!("/api/wallet/expenses/{id}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let again = ctx.delete(&client, &format!("/api/wallet/expenses/{id}")).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let wallet = json_body(ctx.get(&client, "/api/wallet").await, StatusCode::OK).await;
    assert_eq!(dec(&wallet["summary"]["balance"]), Decimal::ZERO);

    let zero = ctx
        .post(&client, "/api/wallet/deposits", &json!({ "amount": "0" }))
        .await;
    assert_eq!(zero.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fee_preview_uses_courier_config() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.merchant("01011111111", "Lamp House").await;
    let courier = add_courier(&ctx, &client).await;

    let fees = json_body(
        ctx.post(
            &client,
            "/api/fees/preview",
            &json!({
                "price": "1000",
                "cost": "600",
                "shippingFee": "50",
                "insured": true,
                "inspectionPaidByCustomer": false,
                "shippingCompanyId": courier
            }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(dec(&fees["insuranceFee"]), "10.5".parse::<Decimal>().unwrap());
    assert_eq!(dec(&fees["netProfit"]), "363.23".parse::<Decimal>().unwrap());
}

#[tokio::test]
async fn test_dashboard_needs_an_active_store() {
    let ctx = TestContext::new().await;
    let client = ctx.signup("Mona", "01012345678").await;
    let resp = ctx.get(&client, "/api/orders").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let anonymous = ctx.get(&ctx.client(), "/api/orders").await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_negative_amounts_and_tiny_loyalty_rates_are_rejected() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.merchant("01011111111", "Lamp House").await;

    let resp = ctx
        .post(
            &client,
            "/api/orders",
            &json!({
                "customerName": "Salma",
                "customerPhone": "01122223333",
                "customerAddress": "Cairo",
                "items": [{ "name": "Lamp", "quantity": 1, "unitPrice": "1000", "unitCost": "600" }],
                "shippingFee": "-50"
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let orders = json_body(ctx.get(&client, "/api/orders").await, StatusCode::OK).await;
    assert!(orders.as_array().unwrap().is_empty());

    let resp = ctx
        .put(
            &client,
            "/api/settings/shipping-companies",
            &json!([{ "name": "Bosta", "fees": { "inspectionFee": "-20" } }]),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx
        .put(
            &client,
            "/api/settings",
            &json!({ "loyalty": { "enabled": true, "unitsPerPoint": "0.0000000000000000000000000001" } }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let settings = json_body(ctx.get(&client, "/api/settings").await, StatusCode::OK).await;
    assert_eq!(settings["loyalty"]["enabled"], false);
    assert!(settings["shippingCompanies"].as_array().unwrap().is_empty());
}
