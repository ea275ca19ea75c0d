// Store module - prefix records and the datastore they are looked up in

pub mod pool;
pub mod postgres;
pub mod tls;

#[cfg(test)]
pub mod testing;

use chrono::NaiveDateTime;
use std::future::Future;
use thiserror::Error;

/// Maximum number of routes selected by one prefix lookup
pub const ROW_LIMIT: usize = 200;

/// Failures while looking up prefixes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No connection to the datastore could be obtained
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Failed to decode row: {0}")]
    Scan(String),
}

/// What a single prefix lookup asks the store for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryScope {
    /// Network text as requested, `address` or `address/bits`
    pub network: String,
    /// Case-insensitive substring matched against the peer name
    pub peer_filter: Option<String>,
}

/// Geo location of the prefix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrefixGeo {
    pub city: Option<String>,
    pub state_prov: Option<String>,
    pub country: Option<String>,
}

/// Registry information for the origin ASN
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsnInfo {
    pub name: Option<String>,
    pub org_name: Option<String>,
    pub org_id: Option<String>,
    pub state_prov: Option<String>,
    pub country: Option<String>,
    pub source: Option<String>,
}

/// IRR route object data for the prefix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrrInfo {
    pub origin_asn: Option<i64>,
    pub descr: Option<String>,
    pub source: Option<String>,
}

/// One enriched routing table entry returned by a lookup
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixRecord {
    pub first_seen: NaiveDateTime,
    pub last_modified: NaiveDateTime,
    pub router_name: String,
    pub peer_name: String,
    pub peer_addr: String,
    pub prefix: String,
    pub path_id: i64,
    pub labels: String,
    pub origin_asn: i64,
    pub med: i64,
    pub local_pref: i64,
    pub next_hop: String,
    pub as_path: String,
    pub communities: String,
    pub ext_communities: String,
    pub large_communities: String,
    pub cluster_list: String,
    pub aggregator: Option<String>,
    pub geo: PrefixGeo,
    pub asn: AsnInfo,
    pub rpki_origin_asn: Option<i64>,
    pub irr: IrrInfo,
    pub ls_router: Option<String>,
}

/// A datastore that can answer prefix lookups.
///
/// Rows come back ordered by prefix descending, then peer name, and are not
/// deduplicated.
pub trait PrefixStore: Send + Sync + 'static {
    fn find_prefixes(
        &self,
        scope: &QueryScope,
    ) -> impl Future<Output = Result<Vec<PrefixRecord>, StoreError>> + Send;
}
