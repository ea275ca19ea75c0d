// PostgreSQL (OpenBMP schema) implementation of the prefix store

use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use super::pool::PgPool;
use super::{AsnInfo, IrrInfo, PrefixGeo, PrefixRecord, PrefixStore, QueryScope, ROW_LIMIT, StoreError};

/// Restricts routes to peers whose name contains the filter, case-insensitively
const PEER_FILTER: &str = "AND peer_hash_id IN (SELECT hash_id FROM bgp_peers WHERE name ILIKE '%' || $2::text || '%')";

/// SQL text plus the values bound to its placeholders, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixQuery {
    pub sql: String,
    pub params: Vec<String>,
}

/// Build the lookup query for a scope.
///
/// User input only ever travels as bind parameters: `$1` is the network and
/// `$2` the peer filter when one is given.
pub fn build_query(scope: &QueryScope) -> PrefixQuery {
    let mut params = vec![scope.network.clone()];

    let peer_clause = match scope.peer_filter.as_deref() {
        Some(filter) if !filter.is_empty() => {
            params.push(filter.to_string());
            PEER_FILTER
        }
        _ => "",
    };

    let sql = format!(
        r#"
    SELECT r.firstaddedtimestamp::timestamp AS firstaddedtimestamp,
           r.lastmodified::timestamp AS lastmodified,
           r.routername::text AS routername, r.peername::text AS peername,
           host(r.peeraddress) AS peeraddress, abbrev(r.prefix) AS prefix,
           r.path_id::bigint AS path_id, r.labels::text AS labels, r.origin_as::bigint AS origin_as,
           r.med::bigint AS med, r.localpref::bigint AS localpref, host(r.nh) AS nh,
           r.as_path::text AS as_path, r.communities::text AS communities,
           r.extcommunities::text AS extcommunities, r.largecommunities::text AS largecommunities,
           r.clusterlist::text AS clusterlist, r.aggregator::text AS aggregator,
           r.city::text AS city, r.stateprov::text AS stateprov, r.country::text AS country,
           r.asn_name::text AS asn_name, r.asn_org_name::text AS asn_org_name,
           r.asn_org_id::text AS asn_org_id, r.asn_state_prov::text AS asn_state_prov,
           r.asn_country::text AS asn_country, r.asn_source::text AS asn_source,
           r.rpki_origin_as::bigint AS rpki_origin_as, r.irr_origin_as::bigint AS irr_origin_as,
           r.irr_source::text AS irr_source, r.irr_descr::text AS irr_descr,
           r.ls_router::text AS ls_router
    FROM (
        SELECT DISTINCT ip.*,
            FIRST_VALUE(geo_ip.city) OVER (PARTITION BY ip.prefix ORDER BY geo_ip.ip DESC) AS city,
            FIRST_VALUE(geo_ip.stateprov) OVER (PARTITION BY ip.prefix ORDER BY geo_ip.ip DESC) AS stateprov,
            FIRST_VALUE(geo_ip.country) OVER (PARTITION BY ip.prefix ORDER BY geo_ip.ip DESC) AS country,
            ia.as_name AS asn_name, ia.org_name AS asn_org_name, ia.org_id AS asn_org_id,
            ia.state_prov AS asn_state_prov, ia.country AS asn_country, ia.source AS asn_source,
            gr.rpki_origin_as, gr.irr_origin_as, gr.irr_source, gr.irr_descr,
            FIRST_VALUE(ls.local_router_name) OVER (PARTITION BY ip.prefix ORDER BY ls.prefix DESC) AS ls_router
        FROM (SELECT firstaddedtimestamp, lastmodified, routername, peername, peeraddress, prefix,
                     path_id, labels, origin_as, med, localpref, nh, as_path,
                     communities, extcommunities, largecommunities, clusterlist, aggregator
              FROM v_ip_routes
              WHERE prefix && $1::text::inet AND iswithdrawn = False AND prefixlen > 0
                {peer_clause}
              ORDER BY prefix DESC
              LIMIT {limit}
        ) ip
        LEFT JOIN geo_ip ON (geo_ip.ip >>= ip.prefix AND geo_ip.ip != '0.0.0.0/0')
        LEFT JOIN global_ip_rib gr ON (gr.prefix = ip.prefix)
        LEFT JOIN info_asn ia ON (ia.asn = ip.origin_as)
        LEFT JOIN v_ls_prefixes ls ON (ls.prefix >>= ip.nh AND length(ls.local_router_name) > 0)
    ) r
    ORDER BY r.prefix DESC, r.peername
    "#,
        peer_clause = peer_clause,
        limit = ROW_LIMIT,
    );

    PrefixQuery { sql, params }
}

/// Decode one result row
pub fn record_from_row(row: &Row) -> Result<PrefixRecord, tokio_postgres::Error> {
    Ok(PrefixRecord {
        first_seen: row.try_get("firstaddedtimestamp")?,
        last_modified: row.try_get("lastmodified")?,
        router_name: row.try_get("routername")?,
        peer_name: row.try_get("peername")?,
        peer_addr: row.try_get("peeraddress")?,
        prefix: row.try_get("prefix")?,
        path_id: row.try_get("path_id")?,
        labels: row.try_get("labels")?,
        origin_asn: row.try_get("origin_as")?,
        med: row.try_get("med")?,
        local_pref: row.try_get("localpref")?,
        next_hop: row.try_get("nh")?,
        as_path: row.try_get("as_path")?,
        communities: row.try_get("communities")?,
        ext_communities: row.try_get("extcommunities")?,
        large_communities: row.try_get("largecommunities")?,
        cluster_list: row.try_get("clusterlist")?,
        aggregator: row.try_get("aggregator")?,
        geo: PrefixGeo {
            city: row.try_get("city")?,
            state_prov: row.try_get("stateprov")?,
            country: row.try_get("country")?,
        },
        asn: AsnInfo {
            name: row.try_get("asn_name")?,
            org_name: row.try_get("asn_org_name")?,
            org_id: row.try_get("asn_org_id")?,
            state_prov: row.try_get("asn_state_prov")?,
            country: row.try_get("asn_country")?,
            source: row.try_get("asn_source")?,
        },
        rpki_origin_asn: row.try_get("rpki_origin_as")?,
        irr: IrrInfo {
            origin_asn: row.try_get("irr_origin_as")?,
            descr: row.try_get("irr_descr")?,
            source: row.try_get("irr_source")?,
        },
        ls_router: row.try_get("ls_router")?,
    })
}

/// Prefix store backed by the OpenBMP PostgreSQL database
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Open one connection so an unreachable database shows up in the log at startup
    pub async fn check(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        tracing::debug!("Store pool: {:?}", self.pool.status());
        Ok(())
    }
}

impl PrefixStore for PgStore {
    async fn find_prefixes(&self, scope: &QueryScope) -> Result<Vec<PrefixRecord>, StoreError> {
        let query = build_query(scope);
        tracing::debug!("Query: {} params: {:?}", query.sql, query.params);

        let client = self.pool.get().await?;
        let params: Vec<&(dyn ToSql + Sync)> = query
            .params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect();

        let rows = client
            .query(query.sql.as_str(), &params)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| record_from_row(row).map_err(|e| StoreError::Scan(e.to_string())))
            .collect()
    }
}
