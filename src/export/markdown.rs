//! Markdown report

use crate::locator::LocatorResult;

/// Render the full Markdown report
pub fn render_markdown(result: &LocatorResult) -> String {
    let isp = result.isp();
    let mut md = String::from("# Netflix OCA Location Results\n\n");

    md.push_str(&format!(
        "**Query Time:** {}\n\n",
        result.query_time().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str("## Network Information\n\n");
    md.push_str(&format!("- **Public IP:** {}\n", result.public_ip()));
    md.push_str(&format!("- **ISP:** {}\n", isp.as_name));
    md.push_str(&format!("- **AS Number:** AS{}\n", isp.asn));
    md.push_str(&format!("- **Country:** {}\n", isp.country_code));
    md.push_str(&format!("- **BGP Prefix:** {}\n\n", isp.bgp_prefix));
    md.push_str("## OCA Servers\n\n");
    md.push_str(&format!("Total OCAs found: **{}**\n\n", result.total_ocas()));

    if result.candidates().is_empty() {
        md.push_str("*No OCA servers were found for your network.*\n");
        return md;
    }

    md.push_str("| # | Domain | IP Address | Location | IATA | Coordinates | ASN | Provider | Method |\n");
    md.push_str("|---|--------|------------|----------|------|-------------|-----|----------|--------|\n");
    for (i, oca) in result.candidates().iter().enumerate() {
        let location = oca.location.as_ref();
        let coords = location
            .and_then(|l| l.coordinates())
            .map(|(lat, lon)| format!("{lat:.4}, {lon:.4}"))
            .unwrap_or_else(|| "-".to_string());
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            i + 1,
            table_cell(&oca.domain),
            oca.ip,
            table_cell(location.and_then(|l| l.city()).unwrap_or("Unknown")),
            table_cell(location.and_then(|l| l.iata_code()).unwrap_or("-")),
            coords,
            table_cell(oca.asn.as_deref().unwrap_or("-")),
            location.map(|l| l.provider().as_str()).unwrap_or("-"),
            location.map(|l| l.method()).unwrap_or("-"),
        ));
    }

    md.push_str("\n### Detailed OCA Information\n\n");
    for (i, oca) in result.candidates().iter().enumerate() {
        md.push_str(&format!("#### {}. {}\n\n", i + 1, oca.domain));
        md.push_str(&format!("- **IP Address:** {}\n", oca.ip));
        md.push_str(&format!("- **Speed Test URL:** {}\n", oca.url));
        if let Some(location) = &oca.location {
            if let Some(city) = location.city() {
                md.push_str(&format!("- **City:** {city}\n"));
            }
            if let Some(iata) = location.iata_code() {
                md.push_str(&format!("- **IATA Code:** {iata}\n"));
            }
            if let Some((lat, lon)) = location.coordinates() {
                md.push_str(&format!("- **Coordinates:** {lat:.6}, {lon:.6}\n"));
            }
        }
        md.push('\n');
    }

    md
}

/// Provider text made safe for a table cell: pipes escaped, line breaks flattened
fn table_cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}
