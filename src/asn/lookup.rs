//! ASN lookup over Team Cymru's DNS TXT interface
//!
//! Used when the WHOIS port is unreachable. The TXT answers carry the same
//! fields as WHOIS, minus the AS name, which needs a second query.

use super::whois::{normalize_asn, IspRecord};
use super::AsnLookupError;
use hickory_resolver::TokioResolver;
use std::net::IpAddr;

/// Origin query name for `ip`
///
/// IPv4 uses reversed octets under `origin.asn.cymru.com`, IPv6 reversed
/// nibbles under `origin6.asn.cymru.com`.
pub fn origin_query(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.origin.asn.cymru.com", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            let nibbles: Vec<String> = v6
                .octets()
                .iter()
                .rev()
                .flat_map(|byte| [byte & 0x0f, byte >> 4])
                .map(|n| format!("{n:x}"))
                .collect();
            format!("{}.origin6.asn.cymru.com", nibbles.join("."))
        }
    }
}

async fn txt_fields(resolver: &TokioResolver, name: String) -> Result<Vec<String>, AsnLookupError> {
    let lookup = resolver
        .txt_lookup(name)
        .await
        .map_err(|e| AsnLookupError::DnsError(e.to_string()))?;

    let record = lookup.iter().next().ok_or(AsnLookupError::NotFound)?;
    let txt_data = record
        .iter()
        .map(|data| String::from_utf8_lossy(data))
        .collect::<Vec<_>>()
        .join("");

    Ok(txt_data.split('|').map(|s| s.trim().to_string()).collect())
}

/// Look up ownership of `ip` through DNS TXT records
pub async fn lookup_asn_dns(
    resolver: &TokioResolver,
    ip: IpAddr,
) -> Result<IspRecord, AsnLookupError> {
    // "2906 | 198.38.96.0/24 | US | arin | 2012-01-25"
    let parts = txt_fields(resolver, origin_query(ip)).await?;
    if parts.len() < 3 {
        return Err(AsnLookupError::InvalidFormat(parts.join("|")));
    }

    // Multi-origin prefixes list several ASNs separated by spaces
    let asn = parts[0]
        .split_whitespace()
        .next()
        .map(normalize_asn)
        .unwrap_or_default();
    if asn.is_empty() {
        return Err(AsnLookupError::NotFound);
    }

    // "2906 | US | arin | 2012-01-25 | AS-SSI, US"
    let as_name = match txt_fields(resolver, format!("AS{asn}.asn.cymru.com")).await {
        Ok(as_parts) if as_parts.len() >= 5 => as_parts[4].clone(),
        Ok(_) => String::new(),
        Err(e) => {
            tracing::debug!("AS name lookup for AS{asn} failed: {e}");
            String::new()
        }
    };

    Ok(IspRecord {
        asn,
        as_name,
        country_code: parts[2].clone(),
        bgp_prefix: parts[1].clone(),
        registry: parts.get(3).cloned().unwrap_or_default(),
        ip: ip.to_string(),
        allocated: parts.get(4).filter(|s| !s.is_empty()).cloned(),
    })
}
