// Prefix lookup handler - query the store and render matching routes

use super::format::{push_field, push_optional};
use super::messages::{DB_CONNECT_ERROR, DB_QUERY_ERROR, NO_PREFIXES_FOUND};
use crate::store::{PrefixRecord, PrefixStore, QueryScope, StoreError};

/// A parsed `ip[/bits] [peer filter]` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRequest {
    pub address: String,
    pub bits: Option<String>,
    pub peer_filter: Option<String>,
}

impl PrefixRequest {
    /// Split a request line on the first space, then the address on `/`
    pub fn parse(line: &str) -> Self {
        let (address_part, filter) = match line.split_once(' ') {
            Some((address_part, filter)) => (address_part, Some(filter)),
            None => (line, None),
        };

        let (address, bits) = match address_part.split_once('/') {
            Some((address, bits)) => (address, Some(bits)),
            None => (address_part, None),
        };

        PrefixRequest {
            address: address.to_string(),
            bits: bits.filter(|b| !b.is_empty()).map(String::from),
            peer_filter: filter.filter(|f| !f.is_empty()).map(String::from),
        }
    }

    /// Network text searched for. The bit length narrows the network that
    /// routes must overlap; it is not matched exactly against route lengths.
    pub fn network(&self) -> String {
        match &self.bits {
            Some(bits) => format!("{}/{}", self.address, bits),
            None => self.address.clone(),
        }
    }

    pub fn scope(&self) -> QueryScope {
        QueryScope {
            network: self.network(),
            peer_filter: self.peer_filter.clone(),
        }
    }
}

/// Run a prefix lookup and build the full response text
pub async fn lookup<S: PrefixStore>(store: &S, client: &str, request: &PrefixRequest) -> String {
    let scope = request.scope();
    tracing::info!("{}: requests lookup for IP {}", client, scope.network);
    if let Some(filter) = &scope.peer_filter {
        tracing::debug!("Peer name like '{}' requested", filter);
    }
    if request.bits.is_some() {
        tracing::debug!(
            "{}: prefix length narrows the search network, routes are not matched by exact length",
            client
        );
    }

    let response = match store.find_prefixes(&scope).await {
        Ok(records) => render_records(&records),
        Err(e) => {
            tracing::error!("{}: Error running query: {}", client, e);
            error_response(&e).to_string()
        }
    };

    tracing::info!("{}: done with lookup for IP {}", client, scope.network);
    response
}

/// Canned reply for a store failure
pub fn error_response(err: &StoreError) -> &'static str {
    match err {
        StoreError::Unavailable(_) => DB_CONNECT_ERROR,
        StoreError::Query(_) | StoreError::Scan(_) => DB_QUERY_ERROR,
    }
}

/// Render records in order, dropping a record when it repeats the peer name and
/// prefix of the record right before it. Repeats further apart are kept.
pub fn render_records(records: &[PrefixRecord]) -> String {
    let mut out = String::new();
    let mut previous: Option<(&str, &str)> = None;
    let mut retained = 0;

    for record in records {
        let key = (record.peer_name.as_str(), record.prefix.as_str());
        if previous == Some(key) {
            continue;
        }
        previous = Some(key);
        retained += 1;

        render_record(&mut out, record);
        out.push('\n');
    }

    if retained == 0 {
        return NO_PREFIXES_FOUND.to_string();
    }

    out.push_str("\r\n");
    out
}

/// Append the labeled lines of one record
pub fn render_record(out: &mut String, pr: &PrefixRecord) {
    push_field(out, "BMPRouter", &pr.router_name);
    push_field(out, "Peer", format!("{} [{}]", pr.peer_name, pr.peer_addr));
    push_field(out, "Prefix", &pr.prefix);

    if let Some(descr) = pr.irr.descr.as_deref().filter(|d| !d.is_empty()) {
        push_field(
            out,
            "PrefixDescr",
            format!("{} ({})", first_line(descr), pr.irr.source.as_deref().unwrap_or("")),
        );
    }

    push_optional(out, "PrefixCity", pr.geo.city.as_deref());
    push_optional(out, "PrefixStateProv", pr.geo.state_prov.as_deref());
    push_optional(out, "PrefixCountry", pr.geo.country.as_deref());

    push_field(out, "FirstSeenTs", format_timestamp(&pr.first_seen));
    push_field(out, "LastModifiedTs", format_timestamp(&pr.last_modified));
    push_optional(out, "LSRouter", pr.ls_router.as_deref());

    push_field(out, "OriginAsn", format!("AS{}", pr.origin_asn));

    let asn = &pr.asn;
    if let Some(name) = asn.name.as_deref().filter(|n| !n.is_empty()) {
        push_field(
            out,
            "AsnInfo",
            format!(
                "{}, {}, {}",
                name,
                asn.org_id.as_deref().unwrap_or(""),
                asn.org_name.as_deref().unwrap_or("")
            ),
        );
    }

    let country = asn.country.as_deref().unwrap_or("");
    match asn.state_prov.as_deref().filter(|s| !s.is_empty()) {
        Some(state_prov) => push_field(out, "AsnLocation", format!("{}, {}", state_prov, country)),
        None => push_field(out, "AsnLocation", country),
    }

    push_field(out, "BgpMed", pr.med);
    push_field(out, "BgpLocalPref", pr.local_pref);
    push_field(out, "BgpAsPath", &pr.as_path);
    push_field(out, "BgpNextHop", &pr.next_hop);
    push_field(out, "BgpCommunities", &pr.communities);
    push_field(out, "BgpExtCommunities", &pr.ext_communities);
    push_field(out, "BgpLargeCommunities", &pr.large_communities);
    push_field(out, "BgpClusterList", &pr.cluster_list);
    push_optional(out, "BggAggregator", pr.aggregator.as_deref());
    push_field(out, "BgpLabels", &pr.labels);
}

// Descriptions can span lines; only the first is shown
fn first_line(descr: &str) -> &str {
    match descr.find('\n') {
        Some(pos) if pos > 0 => &descr[..pos],
        _ => descr,
    }
}

fn format_timestamp(ts: &chrono::NaiveDateTime) -> String {
    format!("{} +0000 UTC", ts)
}
