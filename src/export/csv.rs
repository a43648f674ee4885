//! CSV export
//!
//! One row per OCA with the user's network columns repeated on each row.

use super::ExportError;
use crate::locator::LocatorResult;
use csv::Writer;
use std::io::Write;

const HEADER: [&str; 14] = [
    "domain",
    "ip_address",
    "city",
    "iata_code",
    "latitude",
    "longitude",
    "asn",
    "geocoding_provider",
    "geolocation_approach",
    "url",
    "user_ip",
    "user_isp",
    "user_asn",
    "query_time",
];

/// Write the flattened CSV table
pub fn write_csv<W: Write>(result: &LocatorResult, writer: W) -> Result<(), ExportError> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(HEADER)?;

    let user_ip = result.public_ip().to_string();
    let query_time = result.query_time().to_rfc3339();

    for oca in result.candidates() {
        let location = oca.location.as_ref();
        let latitude = location
            .and_then(|l| l.latitude())
            .map(|v| v.to_string())
            .unwrap_or_default();
        let longitude = location
            .and_then(|l| l.longitude())
            .map(|v| v.to_string())
            .unwrap_or_default();
        let ip = oca.ip.to_string();

        writer.write_record([
            oca.domain.as_str(),
            ip.as_str(),
            location.and_then(|l| l.city()).unwrap_or_default(),
            location.and_then(|l| l.iata_code()).unwrap_or_default(),
            latitude.as_str(),
            longitude.as_str(),
            oca.asn.as_deref().unwrap_or_default(),
            location.map(|l| l.provider().as_str()).unwrap_or_default(),
            location.map(|l| l.method()).unwrap_or_default(),
            oca.url.as_str(),
            user_ip.as_str(),
            result.isp().as_name.as_str(),
            result.isp().asn.as_str(),
            query_time.as_str(),
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::sample_result;

    #[test]
    fn test_csv_rows() {
        let mut buffer = Vec::new();
        write_csv(&sample_result(), &mut buffer).unwrap();

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "ipv4-c001-ord001-ix.1.oca.nflxvideo.net");
        assert_eq!(&rows[0][2], "Chicago, IL");
        assert_eq!(&rows[0][3], "ORD");
        assert_eq!(&rows[0][11], "COMCAST-7922, US");
        assert_eq!(&rows[1][2], "");
        assert_eq!(&rows[1][7], "");
        assert_eq!(&rows[1][10], "73.15.2.9");
    }
}
