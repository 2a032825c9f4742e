//! Tenant isolation: no record from tenant B may ever surface when
//! querying as tenant A, for any combination of filter, sort, and search.

use std::sync::Arc;

use serde_json::json;

use orchestrall_rust::api::TenantId;
use orchestrall_rust::db::repositories::LocalStore;
use orchestrall_rust::error::CoreError;
use orchestrall_rust::models::FieldMap;
use orchestrall_rust::registry::{
    CrudEngine, EntityRegistry, FilterOp, QuerySpec, SortDirection,
};

fn engine() -> CrudEngine {
    CrudEngine::new(EntityRegistry::with_defaults(), Arc::new(LocalStore::new()))
}

fn product(name: &str, price: f64) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("name".to_string(), json!(name));
    fields.insert("sku".to_string(), json!(name));
    fields.insert("price".to_string(), json!(price));
    fields
}

async fn seeded() -> (CrudEngine, TenantId, TenantId) {
    let engine = engine();
    let acme = TenantId::new("acme");
    let globex = TenantId::new("globex");

    for (name, price) in [("Widget", 10.0), ("Gadget", 20.0)] {
        engine.create("products", product(name, price), &acme).await.unwrap();
    }
    for (name, price) in [("Widget", 11.0), ("Sprocket", 30.0)] {
        engine.create("products", product(name, price), &globex).await.unwrap();
    }

    (engine, acme, globex)
}

#[tokio::test]
async fn test_plain_list_is_scoped() {
    let (engine, acme, globex) = seeded().await;

    let mine = engine.list("products", QuerySpec::default(), &acme).await.unwrap();
    assert_eq!(mine.total, 2);
    assert!(mine.items.iter().all(|r| r.tenant == acme));

    let theirs = engine.list("products", QuerySpec::default(), &globex).await.unwrap();
    assert_eq!(theirs.total, 2);
    assert!(theirs.items.iter().all(|r| r.tenant == globex));
}

#[tokio::test]
async fn test_filter_sort_search_combinations_stay_scoped() {
    let (engine, acme, _globex) = seeded().await;

    let specs = vec![
        QuerySpec::default().with_filter("price", FilterOp::Gte, json!(0.0)),
        QuerySpec::default().with_search("widget"),
        QuerySpec::default()
            .with_filter("price", FilterOp::Lte, json!(100.0))
            .with_sort("price", SortDirection::Desc)
            .with_search("e"),
    ];

    for spec in specs {
        let page = engine.list("products", spec.clone(), &acme).await.unwrap();
        assert!(
            page.items.iter().all(|r| r.tenant == acme),
            "leak for spec {spec:?}"
        );
    }
}

#[tokio::test]
async fn test_cross_tenant_get_is_indistinguishable_from_absent() {
    let (engine, acme, globex) = seeded().await;

    let theirs = engine
        .list("products", QuerySpec::default(), &globex)
        .await
        .unwrap();
    let foreign_id = theirs.items[0].id;

    match engine.get("products", &foreign_id, &acme).await {
        Err(CoreError::NotFound { .. }) => {}
        other => panic!("cross-tenant get must be NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cross_tenant_update_and_delete_are_not_found() {
    let (engine, acme, globex) = seeded().await;
    let theirs = engine
        .list("products", QuerySpec::default(), &globex)
        .await
        .unwrap();
    let foreign_id = theirs.items[0].id;

    let mut patch = FieldMap::new();
    patch.insert("price".to_string(), json!(0.01));
    assert!(matches!(
        engine.update("products", &foreign_id, patch, &acme).await,
        Err(CoreError::NotFound { .. })
    ));
    assert!(matches!(
        engine.remove("products", &foreign_id, &acme).await,
        Err(CoreError::NotFound { .. })
    ));

    // the record is untouched for its owner
    let still_there = engine.get("products", &foreign_id, &globex).await.unwrap();
    assert_ne!(still_there.field("price"), Some(&json!(0.01)));
}

#[tokio::test]
async fn test_counts_are_per_tenant() {
    let (engine, acme, globex) = seeded().await;

    let spec = QuerySpec::default().with_search("widget");
    let mine = engine.list("products", spec.clone(), &acme).await.unwrap();
    let theirs = engine.list("products", spec, &globex).await.unwrap();

    assert_eq!(mine.total, 1);
    assert_eq!(theirs.total, 1);
    assert_ne!(mine.items[0].id, theirs.items[0].id);
}
