mod common;

use axum::http::{Method, StatusCode};
use common::{Auth, TestApp};
use directory_core::{CategoryDraft, SupplierDraft, VendorDraft};
use directory_storage::DirectoryStore;
use serde_json::json;

async fn seed_vendor(app: &TestApp, name: &str, supplier: &str, category: &str) {
    let supplier = app.store.create_supplier(SupplierDraft::named(supplier)).await.unwrap();
    let category = app.store.create_category(CategoryDraft::new(category)).await.unwrap();
    app.store
        .create_vendor(VendorDraft {
            name: name.to_string(),
            supplier_ids: vec![supplier.supplier.id],
            category_ids: vec![category.id],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_anonymous_list_uses_public_supplier_shape() {
    let app = TestApp::new();
    seed_vendor(&app, "Fender", "Coast Music", "Guitars").await;

    let response = app.get("/routes/vendors/", &Auth::Anonymous).await;
    assert_eq!(response.status, StatusCode::OK);

    let vendors = response.body.as_array().unwrap();
    assert_eq!(vendors.len(), 1);
    let supplier = &vendors[0]["suppliers"][0];
    assert_eq!(supplier["name"], "Coast Music");
    assert!(supplier.get("account_active").is_none());
    assert!(supplier.get("contacts").is_none());
    assert_eq!(vendors[0]["categories"][0]["name"], "Guitars");
}

#[tokio::test]
async fn test_authenticated_list_uses_full_supplier_shape() {
    let app = TestApp::new();
    seed_vendor(&app, "Fender", "Coast Music", "Guitars").await;
    let auth = app.bearer("sam", false).await;

    let response = app.get("/routes/vendors", &auth).await;
    let supplier = &response.body[0]["suppliers"][0];
    assert_eq!(supplier["account_active"], false);
    assert_eq!(supplier["website_password_set"], false);
    assert!(supplier["contacts"].as_array().unwrap().is_empty());
    assert!(supplier.get("website_password").is_none());
}

#[tokio::test]
async fn test_search_matches_linked_names() {
    let app = TestApp::new();
    seed_vendor(&app, "Fender", "Coast Music", "Guitars").await;
    seed_vendor(&app, "Roland", "Yorkville", "Keyboards").await;

    for (term, expected) in [("fend", "Fender"), ("YORK", "Roland"), ("guitar", "Fender")] {
        let response = app.get(&format!("/routes/vendors?search={term}"), &Auth::Anonymous).await;
        let names: Vec<&str> = response.body.as_array().unwrap().iter().map(|v| v["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec![expected], "search {term}");
    }

    let response = app.get("/routes/vendors?search=zzz", &Auth::Anonymous).await;
    assert!(response.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_store_calls_do_not_grow_with_rows() {
    let app = TestApp::new();
    let auth = app.bearer("sam", false).await;
    seed_vendor(&app, "Fender", "Coast Music", "Guitars").await;

    app.store.reset_round_trips();
    app.get("/routes/vendors", &auth).await;
    let small = app.store.round_trips();

    for i in 0..20 {
        seed_vendor(&app, &format!("Vendor {i}"), &format!("Supplier {i}"), &format!("Category {i}")).await;
    }
    app.store.reset_round_trips();
    let response = app.get("/routes/vendors?page=1&page_size=50", &auth).await;
    assert_eq!(response.body["count"], 21);
    assert_eq!(app.store.round_trips(), small);
}

#[tokio::test]
async fn test_writes_require_authentication() {
    let app = TestApp::new();
    let response = app
        .send(Method::POST, "/routes/vendors", &Auth::Anonymous, Some(json!({ "name": "Fender" })))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Authentication credentials were not provided.");
}

#[tokio::test]
async fn test_create_update_delete() {
    let app = TestApp::new();
    let auth = app.bearer("sam", false).await;
    let supplier = app.store.create_supplier(SupplierDraft::named("Coast Music")).await.unwrap();
    let category = app.store.create_category(CategoryDraft::new("Guitars")).await.unwrap();

    let created = app
        .send(
            Method::POST,
            "/routes/vendors",
            &auth,
            Some(json!({ "name": "Fender", "supplier_ids": [supplier.supplier.id], "category_ids": [category.id] })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["id"].as_i64().unwrap();
    assert_eq!(created.headers["location"], format!("/routes/vendors/{id}"));
    assert_eq!(created.body["suppliers"][0]["name"], "Coast Music");

    // PATCH with an empty list replaces the links; the name stays
    let patched = app
        .send(Method::PATCH, &format!("/routes/vendors/{id}"), &auth, Some(json!({ "supplier_ids": [] })))
        .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["name"], "Fender");
    assert!(patched.body["suppliers"].as_array().unwrap().is_empty());
    assert_eq!(patched.body["categories"][0]["name"], "Guitars");

    let put = app
        .send(Method::PUT, &format!("/routes/vendors/{id}"), &auth, Some(json!({ "supplier_ids": [] })))
        .await;
    assert_eq!(put.status, StatusCode::BAD_REQUEST);
    assert!(put.body["errors"]["name"].is_array());

    let deleted = app.send(Method::DELETE, &format!("/routes/vendors/{id}"), &auth, None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let missing = app.get(&format!("/routes/vendors/{id}"), &auth).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_supplier_id_is_a_field_error() {
    let app = TestApp::new();
    let auth = app.bearer("sam", false).await;

    let response = app
        .send(Method::POST, "/routes/vendors", &auth, Some(json!({ "name": "Fender", "supplier_ids": [99] })))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errors"]["supplier_ids"][0], "Invalid pk \"99\" - object does not exist.");
}

#[tokio::test]
async fn test_non_numeric_id_is_not_found() {
    let app = TestApp::new();
    let response = app.get("/routes/vendors/abc", &Auth::Anonymous).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
