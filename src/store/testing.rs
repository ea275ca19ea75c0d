// In-memory stores used by tests

use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use super::{PrefixGeo, PrefixRecord, PrefixStore, QueryScope, StoreError};

/// Build a record with every required field filled and no enrichment
pub fn record(peer_name: &str, prefix: &str) -> PrefixRecord {
    let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(12, 30, 0))
        .unwrap();

    PrefixRecord {
        first_seen: ts,
        last_modified: ts,
        router_name: "bmp-rtr1".to_string(),
        peer_name: peer_name.to_string(),
        peer_addr: "10.0.0.1".to_string(),
        prefix: prefix.to_string(),
        path_id: 0,
        labels: String::new(),
        origin_asn: 64500,
        med: 0,
        local_pref: 100,
        next_hop: "10.0.0.1".to_string(),
        as_path: " 64501 64500".to_string(),
        communities: String::new(),
        ext_communities: String::new(),
        large_communities: String::new(),
        cluster_list: String::new(),
        aggregator: None,
        geo: PrefixGeo::default(),
        asn: Default::default(),
        rpki_origin_asn: None,
        irr: Default::default(),
        ls_router: None,
    }
}

/// Returns the same rows (or error) for every lookup and records the scopes asked for
pub struct FixedStore {
    result: Result<Vec<PrefixRecord>, StoreError>,
    scopes: Mutex<Vec<QueryScope>>,
}

impl FixedStore {
    pub fn rows(rows: Vec<PrefixRecord>) -> Self {
        FixedStore {
            result: Ok(rows),
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: StoreError) -> Self {
        FixedStore {
            result: Err(err),
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn scopes(&self) -> Vec<QueryScope> {
        self.scopes.lock().unwrap().clone()
    }
}

impl PrefixStore for FixedStore {
    async fn find_prefixes(&self, scope: &QueryScope) -> Result<Vec<PrefixRecord>, StoreError> {
        self.scopes.lock().unwrap().push(scope.clone());
        self.result.clone()
    }
}

/// Holds every lookup until the gate is opened, like a hung query.
/// Opening the gate (adding a permit) lets all current and later lookups through.
pub struct GatedStore {
    gate: Arc<Semaphore>,
}

impl GatedStore {
    pub fn new() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (GatedStore { gate: gate.clone() }, gate)
    }
}

impl PrefixStore for GatedStore {
    async fn find_prefixes(&self, _scope: &QueryScope) -> Result<Vec<PrefixRecord>, StoreError> {
        let _open = self.gate.acquire().await;
        Ok(Vec::new())
    }
}
