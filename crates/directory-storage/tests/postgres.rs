//! PostgreSQL backend tests.
//!
//! These need a disposable database:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/directory_test \
//!     cargo test -p directory-storage --features postgres -- --ignored
//! ```
//!
//! Every test names its rows with a fresh token so runs can share a
//! database.

#![cfg(feature = "postgres")]

use directory_core::{
    CategoryDraft, ContactDraft, ContactPatch, ListQuery, SupplierDraft, SupplierId, VendorDraft,
};
use directory_storage::{DirectoryStore, PgStore, StorageError};
use sqlx::PgPool;

async fn connect() -> (PgStore, PgPool) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPool::connect(&url).await.unwrap();
    let store = PgStore::from_pool(pool.clone());
    store.migrate().await.unwrap();
    (store, pool)
}

fn token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

async fn primaries(store: &PgStore, supplier: SupplierId) -> Vec<String> {
    store
        .get_supplier(supplier)
        .await
        .unwrap()
        .contacts
        .into_iter()
        .filter(|c| c.primary_contact)
        .map(|c| c.name)
        .collect()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_new_primary_contact_demotes_previous() {
    let (store, _pool) = connect().await;
    let supplier = store
        .create_supplier(SupplierDraft::named(format!("Coast {}", token())))
        .await
        .unwrap()
        .supplier
        .id;

    store.create_contact(ContactDraft::new(supplier, "Dana").primary()).await.unwrap();
    let lee = store.create_contact(ContactDraft::new(supplier, "Lee").primary()).await.unwrap();
    assert_eq!(primaries(&store, supplier).await, vec!["Lee"]);

    let kim = store.create_contact(ContactDraft::new(supplier, "Kim")).await.unwrap();
    let patch = ContactPatch {
        primary_contact: Some(true),
        ..ContactPatch::default()
    };
    store.update_contact(kim.id, patch).await.unwrap();
    assert_eq!(primaries(&store, supplier).await, vec!["Kim"]);
    assert!(!store.get_contact(lee.id).await.unwrap().primary_contact);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_moving_primary_contact_demotes_target_supplier() {
    let (store, _pool) = connect().await;
    let run = token();
    let coast = store.create_supplier(SupplierDraft::named(format!("Coast {run}"))).await.unwrap().supplier.id;
    let york = store.create_supplier(SupplierDraft::named(format!("York {run}"))).await.unwrap().supplier.id;

    store.create_contact(ContactDraft::new(coast, "Dana").primary()).await.unwrap();
    let lee = store.create_contact(ContactDraft::new(york, "Lee").primary()).await.unwrap();

    let patch = ContactPatch {
        supplier_id: Some(coast),
        ..ContactPatch::default()
    };
    store.update_contact(lee.id, patch).await.unwrap();

    assert_eq!(primaries(&store, coast).await, vec!["Lee"]);
    assert!(primaries(&store, york).await.is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_unique_index_rejects_second_primary() {
    let (store, pool) = connect().await;
    let supplier = store
        .create_supplier(SupplierDraft::named(format!("Coast {}", token())))
        .await
        .unwrap()
        .supplier
        .id;
    store.create_contact(ContactDraft::new(supplier, "Dana").primary()).await.unwrap();

    // bypasses the store, so only the partial index stands in the way
    let err = sqlx::query("INSERT INTO contacts (supplier_id, name, primary_contact) VALUES ($1, 'Lee', TRUE)")
        .bind(supplier.get())
        .execute(&pool)
        .await
        .unwrap_err();
    assert!(matches!(StorageError::from(err), StorageError::Conflict(_)));

    // several non-primary contacts are fine
    store.create_contact(ContactDraft::new(supplier, "Kim")).await.unwrap();
    store.create_contact(ContactDraft::new(supplier, "Ash")).await.unwrap();
    assert_eq!(primaries(&store, supplier).await, vec!["Dana"]);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_vendor_search_matches_names_suppliers_and_categories() {
    let (store, _pool) = connect().await;
    let run = token();

    let supplier = store
        .create_supplier(SupplierDraft::named(format!("Coast Music {run}")))
        .await
        .unwrap()
        .supplier
        .id;
    store.create_contact(ContactDraft::new(supplier, "Dana").primary()).await.unwrap();
    let category = store.create_category(CategoryDraft::new(format!("Drums {run}"))).await.unwrap();

    let by_supplier = VendorDraft {
        supplier_ids: vec![supplier],
        ..VendorDraft::named(format!("Fender {run}"))
    };
    let by_category = VendorDraft {
        category_ids: vec![category.id],
        ..VendorDraft::named(format!("Gibson {run}"))
    };
    store.create_vendor(by_supplier).await.unwrap();
    store.create_vendor(by_category).await.unwrap();
    store.create_vendor(VendorDraft::named(format!("Roland {run}"))).await.unwrap();

    let page = store.list_vendors(&ListQuery::all().with_search(&run)).await.unwrap();
    assert_eq!(page.total, 3);

    let page = store
        .list_vendors(&ListQuery::all().with_search(format!("coast music {run}")))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    let fender = &page.items[0];
    assert!(fender.vendor.name.starts_with("Fender"));
    assert_eq!(fender.suppliers[0].supplier.id, supplier);
    assert_eq!(fender.suppliers[0].contacts[0].name, "Dana");

    let page = store
        .list_vendors(&ListQuery::all().with_search(format!("DRUMS {run}")))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].categories, vec![category]);

    let page = store
        .list_vendors(&ListQuery::all().with_search(&run).with_window(1, 1))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert!(page.items[0].vendor.name.starts_with("Gibson"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_search_treats_wildcards_literally() {
    let (store, _pool) = connect().await;
    let run = token();
    store.create_supplier(SupplierDraft::named(format!("{run} 50% Off"))).await.unwrap();
    store.create_supplier(SupplierDraft::named(format!("{run} 500 Guitars"))).await.unwrap();
    store.create_supplier(SupplierDraft::named(format!("{run} a_b"))).await.unwrap();
    store.create_supplier(SupplierDraft::named(format!("{run} axb"))).await.unwrap();

    let page = store
        .list_suppliers(&ListQuery::all().with_search(format!("{run} 50%")))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert!(page.items[0].supplier.name.ends_with("50% Off"));

    let page = store
        .list_suppliers(&ListQuery::all().with_search(format!("{run} a_b")))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert!(page.items[0].supplier.name.ends_with("a_b"));
}
