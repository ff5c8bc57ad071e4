//! Test fixture for bfdb integration tests
//!
//! Each fixture owns its own storage, so tests never share graph state.

use super::counting_adapter::CountingAdapter;
use super::sample_types::{Org, Person, Project};
use bfdb::{
    BfDb, BfDbConfig, BfNodeProps, CurrentViewer, EdgeRepository, InMemoryAdapter,
    NodeRepository, StorageAdapter,
};
use std::sync::Arc;

pub const ORG_ID: &str = "org-test";
pub const PERSON_ID: &str = "person-test";

pub struct TestFixture {
    db: BfDb,
    counter: Option<Arc<CountingAdapter>>,
    viewer: CurrentViewer,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestFixture {
    /// Graph over an in-memory adapter wrapped in a call counter
    pub fn new() -> Self {
        bfdb::init_logging(log::LevelFilter::Warn);
        let inner: Arc<dyn StorageAdapter> = Arc::new(InMemoryAdapter::new());
        let counter = Arc::new(CountingAdapter::new(inner));
        let storage: Arc<dyn StorageAdapter> = counter.clone();
        Self {
            db: BfDb::with_storage(storage),
            counter: Some(counter),
            viewer: CurrentViewer::new(ORG_ID, PERSON_ID),
            _temp_dir: None,
        }
    }

    /// Graph over sled in a fresh temporary directory
    pub fn with_sled() -> Result<Self, Box<dyn std::error::Error>> {
        bfdb::init_logging(log::LevelFilter::Warn);
        let temp_dir = tempfile::tempdir()?;
        let db = BfDb::open(&BfDbConfig::sled(temp_dir.path().join("bfdb_test")))?;
        Ok(Self {
            db,
            counter: None,
            viewer: CurrentViewer::new(ORG_ID, PERSON_ID),
            _temp_dir: Some(temp_dir),
        })
    }

    pub fn db(&self) -> &BfDb {
        &self.db
    }

    pub fn viewer(&self) -> &CurrentViewer {
        &self.viewer
    }

    /// Call counter; only present on the in-memory fixture
    pub fn counter(&self) -> &CountingAdapter {
        self.counter
            .as_deref()
            .expect("fixture was built without a counting adapter")
    }

    pub fn nodes<P: BfNodeProps>(&self) -> NodeRepository<P> {
        self.db.nodes(&self.viewer)
    }

    pub fn people(&self) -> NodeRepository<Person> {
        self.nodes()
    }

    pub fn orgs(&self) -> NodeRepository<Org> {
        self.nodes()
    }

    pub fn projects(&self) -> NodeRepository<Project> {
        self.nodes()
    }

    pub fn edges(&self) -> EdgeRepository {
        self.db.edges(&self.viewer)
    }

    /// Viewer of another organization on the same storage
    pub fn stranger(&self) -> CurrentViewer {
        CurrentViewer::new("org-other", "person-other")
    }

    pub fn admin(&self) -> CurrentViewer {
        CurrentViewer::admin(ORG_ID, "admin")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
