//! Team Cymru WHOIS client and response parser
//!
//! The verbose query ` -v <ip>` answers with a pipe-delimited header line
//! followed by a value line:
//!
//! ```text
//! AS      | IP               | BGP Prefix          | CC | Registry | Allocated  | AS Name
//! 2906    | 198.38.96.1      | 198.38.96.0/24      | US | arin     | 2012-01-25 | AS-SSI, US
//! ```

use super::AsnLookupError;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// WHOIS-derived ownership of an address
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IspRecord {
    /// Numeric ASN without the "AS" prefix; empty when unknown
    pub asn: String,
    /// AS name, e.g. "AS-SSI, US"
    pub as_name: String,
    /// Two-letter country code
    pub country_code: String,
    /// Announcing BGP prefix
    pub bgp_prefix: String,
    /// Regional registry
    pub registry: String,
    /// Address the record describes
    pub ip: String,
    /// Allocation date, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated: Option<String>,
}

impl IspRecord {
    /// Placeholder used when ownership of `ip` could not be determined
    pub fn unknown(ip: IpAddr) -> Self {
        Self {
            as_name: "Unknown".to_string(),
            ip: ip.to_string(),
            ..Default::default()
        }
    }

    /// Whether the record names an ASN
    pub fn is_known(&self) -> bool {
        !self.asn.is_empty()
    }
}

/// Strip an "AS" prefix (any case) and surrounding whitespace
///
/// # Examples
///
/// ```
/// use oca_locator::asn::normalize_asn;
///
/// assert_eq!(normalize_asn("AS2906"), "2906");
/// assert_eq!(normalize_asn(" as7018 "), "7018");
/// assert_eq!(normalize_asn("15169"), "15169");
/// ```
pub fn normalize_asn(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = match trimmed.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("AS") => &trimmed[2..],
        _ => trimmed,
    };
    stripped.trim().to_string()
}

/// Parse a verbose Team Cymru response
pub fn parse_whois_response(response: &str) -> Result<IspRecord, AsnLookupError> {
    let mut lines = response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Bulk mode"));

    let header_line = lines
        .next()
        .ok_or_else(|| AsnLookupError::InvalidFormat("empty response".to_string()))?;
    let value_line = lines
        .next()
        .ok_or_else(|| AsnLookupError::InvalidFormat("missing value line".to_string()))?;

    let headers: Vec<&str> = header_line.split('|').map(str::trim).collect();
    let values: Vec<&str> = value_line.split('|').map(str::trim).collect();
    if headers.len() != values.len() {
        return Err(AsnLookupError::HeaderMismatch {
            headers: headers.len(),
            values: values.len(),
        });
    }

    let field = |name: &str| -> String {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .map(|i| values[i].to_string())
            .unwrap_or_default()
    };

    let asn = normalize_asn(&field("AS"));
    if asn.is_empty() || asn.eq_ignore_ascii_case("NA") {
        return Err(AsnLookupError::NotFound);
    }
    if !asn.chars().all(|c| c.is_ascii_digit()) {
        return Err(AsnLookupError::InvalidFormat(format!("non-numeric ASN {asn:?}")));
    }

    let allocated = field("Allocated");
    Ok(IspRecord {
        asn,
        as_name: field("AS Name"),
        country_code: field("CC"),
        bgp_prefix: field("BGP Prefix"),
        registry: field("Registry"),
        ip: field("IP"),
        allocated: (!allocated.is_empty()).then_some(allocated),
    })
}

/// Send a verbose query for `ip` to `host:port` and return the raw answer
pub async fn query_whois(
    host: &str,
    port: u16,
    ip: IpAddr,
    timeout: Duration,
) -> Result<String, AsnLookupError> {
    let exchange = async {
        let mut stream = TcpStream::connect((host, port)).await?;
        stream.write_all(format!(" -v {ip}\n").as_bytes()).await?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        Ok::<_, std::io::Error>(buf)
    };

    let buf = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| AsnLookupError::Timeout)??;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
