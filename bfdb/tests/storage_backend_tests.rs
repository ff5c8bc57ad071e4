//! The same graph contract over every storage backend

#[path = "testutils/mod.rs"]
mod testutils;

use bfdb::{
    BfDb, BfDbConfig, BfNodeCache, CurrentViewer, InMemoryAdapter, MetadataFilter, PropsFilter,
    StorageBackend, StorageConfig,
};
use std::sync::Arc;
use testutils::sample_types::{org, person, Org, Person};
use testutils::test_fixture::{TestFixture, ORG_ID, PERSON_ID};

async fn exercise_membership(db: &BfDb) {
    let viewer = CurrentViewer::new(ORG_ID, PERSON_ID);
    let acme = db.nodes::<Org>(&viewer).create(org("Acme")).await.unwrap();
    let ada = db.nodes::<Person>(&viewer).create(person("Ada")).await.unwrap();
    db.edges(&viewer)
        .create_between_nodes(ada.as_ref(), acme.as_ref(), "memberOf")
        .await
        .unwrap();

    let orgs = ada
        .query_targets::<Org>(&PropsFilter::new(), &PropsFilter::role("memberOf"), None, None)
        .await
        .unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].props(), org("Acme"));

    // Two roles to one org still resolve to a single target
    db.edges(&viewer)
        .create_between_nodes(ada.as_ref(), acme.as_ref(), "admin")
        .await
        .unwrap();
    let orgs = ada
        .query_targets::<Org>(&PropsFilter::new(), &PropsFilter::new(), None, None)
        .await
        .unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].id(), acme.id());
    let members = acme
        .query_sources::<Person>(&PropsFilter::new(), &PropsFilter::new(), None, None)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);

    ada.update_props(|props| props.email = "ada@acme.test".to_string())
        .unwrap();
    ada.save().await.unwrap();
    let mut cache = BfNodeCache::new();
    let reread = db
        .nodes::<Person>(&viewer)
        .find_x(&ada.id(), Some(&mut cache))
        .await
        .unwrap();
    assert_eq!(reread.props().email, "ada@acme.test");

    ada.delete().await.unwrap();
    assert!(db
        .edges(&viewer)
        .query_source_edges_for_node(acme.as_ref())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_in_memory_backend() {
    let db = BfDb::open(&BfDbConfig::in_memory()).unwrap();
    exercise_membership(&db).await;
}

#[tokio::test]
async fn test_kv_memory_backend() {
    let db = BfDb::open(&BfDbConfig {
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            path: None,
        },
        ..BfDbConfig::default()
    })
    .unwrap();
    assert_eq!(db.storage().name(), "kv");
    exercise_membership(&db).await;
}

#[tokio::test]
async fn test_sled_backend() {
    let fixture = TestFixture::with_sled().unwrap();
    exercise_membership(fixture.db()).await;
}

#[tokio::test]
async fn test_sled_graph_survives_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = BfDbConfig::sled(temp_dir.path().join("graph"));
    let viewer = CurrentViewer::new(ORG_ID, PERSON_ID);

    let (ada_id, acme_id) = {
        let db = BfDb::open(&config).unwrap();
        let acme = db.nodes::<Org>(&viewer).create(org("Acme")).await.unwrap();
        let ada = db.nodes::<Person>(&viewer).create(person("Ada")).await.unwrap();
        db.edges(&viewer)
            .create_between_nodes(ada.as_ref(), acme.as_ref(), "memberOf")
            .await
            .unwrap();
        db.flush().await.unwrap();
        (ada.id(), acme.id())
    };

    let db = BfDb::open(&config).unwrap();
    let ada = db.nodes::<Person>(&viewer).find_x(&ada_id, None).await.unwrap();
    assert_eq!(ada.props(), person("Ada"));
    let orgs = ada
        .query_targets::<Org>(&PropsFilter::new(), &PropsFilter::role("memberOf"), None, None)
        .await
        .unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].id(), acme_id);
}

#[tokio::test]
async fn test_in_memory_clear_all_isolates_cases() {
    let adapter = Arc::new(InMemoryAdapter::new());
    let db = BfDb::with_storage(adapter.clone());
    let viewer = CurrentViewer::new(ORG_ID, PERSON_ID);

    db.nodes::<Org>(&viewer).create(org("Acme")).await.unwrap();
    db.nodes::<Person>(&viewer).create(person("Ada")).await.unwrap();
    assert_eq!(adapter.len(), 2);
    assert_eq!(adapter.items_of_class("BfOrganization").len(), 1);

    adapter.clear_class("BfOrganization");
    assert_eq!(adapter.len(), 1);

    adapter.clear_all();
    let count = db
        .nodes::<Person>(&viewer)
        .count(MetadataFilter::new(), &PropsFilter::new(), &[])
        .await
        .unwrap();
    assert_eq!(count, 0);
}
