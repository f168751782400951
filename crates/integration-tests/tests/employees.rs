//! Staff invitations and permission checks.

use reqwest::StatusCode;
use serde_json::json;

use souq_integration_tests::{TestContext, json_body};

#[tokio::test]
async fn test_invited_employee_gets_only_granted_areas() {
    let ctx = TestContext::new().await;
    let (owner, store) = ctx.merchant("01011111111", "Cairo Tea").await;
    let store_id = store["id"].as_str().unwrap();

    let employee = json_body(
        ctx.post(
            &owner,
            "/api/employees",
            &json!({ "phone": "01022222222", "name": "Omar", "permissions": ["orders"] }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(employee["status"], "invited");
    let employee_id = employee["id"].as_str().unwrap();

    let again = ctx
        .post(&owner, "/api/employees", &json!({ "phone": "01022222222" }))
        .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let staff = ctx.signup("Omar", "01022222222").await;
    let stores = json_body(ctx.get(&staff, "/api/stores").await, StatusCode::OK).await;
    assert!(stores["stores"].as_array().unwrap().is_empty());
    assert_eq!(stores["invitations"][0]["id"], store_id);

    // Invited but not yet accepted: no access.
    let early = ctx
        .post(&staff, &format!("/api/stores/{store_id}/activate"), &json!({}))
        .await;
    assert_eq!(early.status(), StatusCode::FORBIDDEN);

    let accepted = json_body(
        ctx.post(&staff, &format!("/api/invitations/{store_id}/accept"), &json!({}))
            .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(accepted["status"], "active");

    assert_eq!(ctx.get(&staff, "/api/orders").await.status(), StatusCode::OK);
    assert_eq!(ctx.get(&staff, "/api/wallet").await.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.get(&staff, "/api/employees").await.status(), StatusCode::FORBIDDEN);

    // Granting wallet access takes effect on the next request.
    let resp = ctx
        .put(
            &owner,
            &format!("/api/employees/{employee_id}"),
            &json!({ "permissions": ["orders", "wallet"] }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(ctx.get(&staff, "/api/wallet").await.status(), StatusCode::OK);

    let removed = ctx
        .delete(&owner, &format!("/api/employees/{employee_id}"))
        .await;
    assert_eq!(removed.status(), StatusCode::OK);
    assert_eq!(ctx.get(&staff, "/api/orders").await.status(), StatusCode::FORBIDDEN);

    let twice = ctx
        .delete(&owner, &format!("/api/employees/{employee_id}"))
        .await;
    assert_eq!(twice.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_accept_without_invitation() {
    let ctx = TestContext::new().await;
    let (_, store) = ctx.merchant("01011111111", "Cairo Tea").await;
    let store_id = store["id"].as_str().unwrap();

    let stranger = ctx.signup("Stranger", "01033333333").await;
    let resp = ctx
        .post(&stranger, &format!("/api/invitations/{store_id}/accept"), &json!({}))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = ctx
        .post(&stranger, "/api/invitations/store_missing/accept", &json!({}))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_switching_between_stores() {
    let ctx = TestContext::new().await;
    let (client, first) = ctx.merchant("01011111111", "First").await;
    let second = json_body(
        ctx.post(&client, "/api/stores", &json!({ "name": "Second" })).await,
        StatusCode::CREATED,
    )
    .await;

    // Creating a store activates it.
    ctx.post(&client, "/api/products", &json!({ "name": "Mug", "price": "80" }))
        .await;
    let products = json_body(ctx.get(&client, "/api/products").await, StatusCode::OK).await;
    assert_eq!(products.as_array().unwrap().len(), 1);

    let first_id = first["id"].as_str().unwrap();
    let resp = ctx
        .post(&client, &format!("/api/stores/{first_id}/activate"), &json!({}))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let products = json_body(ctx.get(&client, "/api/products").await, StatusCode::OK).await;
    assert!(products.as_array().unwrap().is_empty());

    let stores = json_body(ctx.get(&client, "/api/stores").await, StatusCode::OK).await;
    let list = stores["stores"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    let active: Vec<_> = list.iter().filter(|s| s["active"] == true).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], first["id"]);
    assert_ne!(active[0]["id"], second["id"]);
}

#[tokio::test]
async fn test_employees_permission_shows_staff_but_not_changes() {
    let ctx = TestContext::new().await;
    let (owner, store) = ctx.merchant("01011111111", "Cairo Tea").await;
    let store_id = store["id"].as_str().unwrap();
    let resp = ctx
        .post(
            &owner,
            "/api/employees",
            &json!({ "phone": "01022222222", "name": "Laila", "permissions": ["employees"] }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let manager = ctx.signup("Laila", "01022222222").await;
    let resp = ctx
        .post(&manager, &format!("/api/invitations/{store_id}/accept"), &json!({}))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let staff = json_body(ctx.get(&manager, "/api/employees").await, StatusCode::OK).await;
    assert_eq!(staff.as_array().unwrap().len(), 1);
    assert_eq!(staff[0]["name"], "Laila");

    let resp = ctx
        .post(&manager, "/api/employees", &json!({ "phone": "01033333333" }))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
