//! Excel export
//!
//! A "Summary" sheet with the network information and an "OCA Servers"
//! sheet with one row per OCA. Columns on the servers sheet are sized to
//! their longest cell, capped at 50 characters.

use super::ExportError;
use crate::locator::LocatorResult;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

const MAX_COLUMN_WIDTH: usize = 50;

const SERVER_HEADER: [&str; 11] = [
    "#",
    "Domain",
    "IP Address",
    "City",
    "IATA Code",
    "Latitude",
    "Longitude",
    "ASN",
    "Geocoding Provider",
    "Geolocation Method",
    "Speed Test URL",
];

/// Write the two-sheet workbook to `path`
pub fn write_xlsx(result: &LocatorResult, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let summary = workbook.add_worksheet();
    summary.set_name("Summary")?;
    write_rows(summary, &summary_rows(result), &bold)?;

    let rows = server_rows(result);
    if !rows.is_empty() {
        let servers = workbook.add_worksheet();
        servers.set_name("OCA Servers")?;
        let mut table = Vec::with_capacity(rows.len() + 1);
        table.push(SERVER_HEADER.iter().map(|s| s.to_string()).collect());
        table.extend(rows);
        write_rows(servers, &table, &bold)?;
        for (col, width) in column_widths(&table).into_iter().enumerate() {
            servers.set_column_width(col as u16, width as f64)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn summary_rows(result: &LocatorResult) -> Vec<Vec<String>> {
    let isp = result.isp();
    let pairs = [
        ("Property", "Value".to_string()),
        (
            "Query Time",
            result.query_time().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
        ("Public IP", result.public_ip().to_string()),
        ("ISP Name", isp.as_name.clone()),
        ("AS Number", format!("AS{}", isp.asn)),
        ("Country", isp.country_code.clone()),
        ("BGP Prefix", isp.bgp_prefix.clone()),
        ("Total OCAs Found", result.total_ocas().to_string()),
    ];
    pairs
        .into_iter()
        .map(|(key, value)| vec![key.to_string(), value])
        .collect()
}

fn server_rows(result: &LocatorResult) -> Vec<Vec<String>> {
    result
        .candidates()
        .iter()
        .enumerate()
        .map(|(i, oca)| {
            let location = oca.location.as_ref();
            let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
            vec![
                (i + 1).to_string(),
                oca.domain.clone(),
                oca.ip.to_string(),
                location.and_then(|l| l.city()).unwrap_or_default().to_string(),
                location.and_then(|l| l.iata_code()).unwrap_or_default().to_string(),
                number(location.and_then(|l| l.latitude())),
                number(location.and_then(|l| l.longitude())),
                oca.asn.clone().unwrap_or_default(),
                location.map(|l| l.provider().to_string()).unwrap_or_default(),
                location.map(|l| l.method().to_string()).unwrap_or_default(),
                oca.url.clone(),
            ]
        })
        .collect()
}

fn write_rows(sheet: &mut Worksheet, rows: &[Vec<String>], header: &Format) -> Result<(), ExportError> {
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if r == 0 {
                sheet.write_string_with_format(r as u32, c as u16, cell, header)?;
            } else {
                sheet.write_string(r as u32, c as u16, cell)?;
            }
        }
    }
    Ok(())
}

/// Width per column: longest cell plus two, at most [`MAX_COLUMN_WIDTH`]
fn column_widths(rows: &[Vec<String>]) -> Vec<usize> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..columns)
        .map(|c| {
            let longest = rows
                .iter()
                .filter_map(|row| row.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            (longest + 2).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}
