//! JSON export
//!
//! Nested document with the network information and one object per OCA.

use super::ExportError;
use crate::locator::{LocatorResult, OcaCandidate};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Top-level JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonExport {
    /// RFC 3339 query timestamp
    pub query_time: String,
    /// Public address of the host
    pub public_ip: JsonPublicIp,
    /// Ownership of the public address
    pub isp_info: JsonIsp,
    /// One entry per OCA, in Fast.com order
    pub oca_servers: Vec<JsonOca>,
    /// Number of entries in `oca_servers`
    pub total_ocas: usize,
}

/// Public address section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPublicIp {
    /// Address
    pub ip: String,
    /// When it was observed
    pub timestamp: String,
}

/// ISP section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonIsp {
    /// Announcing ASN, digits only
    pub asn: String,
    /// AS name as registered
    pub as_name: String,
    /// Address the record was looked up for
    pub ip: String,
    /// Covering BGP prefix
    pub bgp_prefix: String,
    /// Two-letter country code
    pub country: String,
    /// Regional registry
    pub registry: String,
    /// Allocation date, when known
    pub allocated: Option<String>,
}

/// One OCA entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonOca {
    /// Appliance hostname
    pub domain: String,
    /// Resolved address
    pub ip_address: String,
    /// Speed-test URL handed out by Fast.com
    pub url: String,
    /// City, e.g. "Chicago, IL"
    pub city: Option<String>,
    /// Airport code
    pub iata_code: Option<String>,
    /// Latitude
    pub latitude: Option<f64>,
    /// Longitude
    pub longitude: Option<f64>,
    /// ASN announcing the appliance
    pub asn: Option<String>,
    /// Provider that produced the location
    pub geocoding_provider: Option<String>,
    /// Workaround used, if any
    pub geolocation_approach: Option<String>,
}

impl From<&OcaCandidate> for JsonOca {
    fn from(oca: &OcaCandidate) -> Self {
        let location = oca.location.as_ref();
        Self {
            domain: oca.domain.clone(),
            ip_address: oca.ip.to_string(),
            url: oca.url.clone(),
            city: location.and_then(|l| l.city()).map(str::to_string),
            iata_code: location.and_then(|l| l.iata_code()).map(str::to_string),
            latitude: location.and_then(|l| l.latitude()),
            longitude: location.and_then(|l| l.longitude()),
            asn: oca.asn.clone(),
            geocoding_provider: location.map(|l| l.provider().to_string()),
            geolocation_approach: location.map(|l| l.method().to_string()),
        }
    }
}

impl From<&LocatorResult> for JsonExport {
    fn from(result: &LocatorResult) -> Self {
        let query_time = result.query_time().to_rfc3339();
        let isp = result.isp();
        Self {
            public_ip: JsonPublicIp {
                ip: result.public_ip().to_string(),
                timestamp: query_time.clone(),
            },
            query_time,
            isp_info: JsonIsp {
                asn: isp.asn.clone(),
                as_name: isp.as_name.clone(),
                ip: isp.ip.clone(),
                bgp_prefix: isp.bgp_prefix.clone(),
                country: isp.country_code.clone(),
                registry: isp.registry.clone(),
                allocated: isp.allocated.clone(),
            },
            oca_servers: result.candidates().iter().map(JsonOca::from).collect(),
            total_ocas: result.total_ocas(),
        }
    }
}

/// Write the pretty-printed JSON document
pub fn write_json<W: Write>(result: &LocatorResult, writer: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, &JsonExport::from(result))?;
    Ok(())
}
