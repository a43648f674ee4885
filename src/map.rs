//! Interactive Leaflet map of located OCAs
//!
//! The page is self-contained apart from the Leaflet assets and the
//! OpenStreetMap tiles, which the browser fetches when it is opened.

use crate::config::LocatorConfig;
use crate::export::ExportError;
use crate::locator::{LocatorResult, OcaCandidate};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// File name of the generated map under `export_path`
pub const MAP_FILE_NAME: &str = "oca_locations_map.html";

/// Centre used when no OCA has coordinates (geographic centre of the US)
pub const DEFAULT_CENTER: (f64, f64) = (39.8283, -98.5795);

const LEAFLET_VERSION: &str = "1.9.4";

#[derive(Debug, Serialize)]
struct Marker {
    lat: f64,
    lon: f64,
    tooltip: String,
    popup: String,
}

/// Mean position of the located OCAs, or [`DEFAULT_CENTER`]
pub fn map_center(result: &LocatorResult) -> (f64, f64) {
    let points: Vec<(f64, f64)> = result.located().map(|(_, coords)| coords).collect();
    if points.is_empty() {
        return DEFAULT_CENTER;
    }
    let n = points.len() as f64;
    let (lat, lon) = points
        .iter()
        .fold((0.0, 0.0), |(a, b), (lat, lon)| (a + lat, b + lon));
    (lat / n, lon / n)
}

/// Render the map page
pub fn render_map_html(result: &LocatorResult, zoom: u8) -> String {
    let markers: Vec<Marker> = result
        .located()
        .map(|(oca, (lat, lon))| Marker {
            lat,
            lon,
            tooltip: escape_html(
                oca.location
                    .as_ref()
                    .and_then(|l| l.city())
                    .unwrap_or(&oca.domain),
            ),
            popup: popup_html(oca, lat, lon),
        })
        .collect();

    if markers.is_empty() {
        tracing::warn!("No OCAs with location data found, creating empty map");
    }

    let (center_lat, center_lon) = map_center(result);
    // serde_json output is valid JavaScript; "</" is split so no value can close the script tag
    let markers_json = serde_json::to_string(&markers)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Netflix OCA Server Locations</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{LEAFLET_VERSION}/dist/leaflet.js"></script>
<style>
html, body, #map {{ height: 100%; margin: 0; }}
#title {{
  position: fixed; top: 10px; left: 50%; transform: translateX(-50%);
  z-index: 1000; background-color: white; padding: 10px;
  border: 2px solid #666; border-radius: 5px;
  font-family: Arial; font-size: 16px; font-weight: bold;
}}
</style>
</head>
<body>
<div id="title">Netflix OCA Server Locations</div>
<div id="map"></div>
<script>
var map = L.map('map').setView([{center_lat}, {center_lon}], {zoom});
L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  maxZoom: 19,
  attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
L.control.scale().addTo(map);
var markers = {markers_json};
markers.forEach(function (m) {{
  L.marker([m.lat, m.lon]).bindPopup(m.popup, {{maxWidth: 300}}).bindTooltip(m.tooltip).addTo(map);
}});
for (var i = 0; i < markers.length; i++) {{
  for (var j = i + 1; j < markers.length; j++) {{
    L.polyline([[markers[i].lat, markers[i].lon], [markers[j].lat, markers[j].lon]],
      {{color: '#ff0000', weight: 1, opacity: 0.3}}).addTo(map);
  }}
}}
</script>
</body>
</html>
"#
    )
}

fn popup_html(oca: &OcaCandidate, lat: f64, lon: f64) -> String {
    let location = oca.location.as_ref();
    let city = location.and_then(|l| l.city()).unwrap_or("Unknown");
    let iata = location
        .and_then(|l| l.iata_code())
        .map(|code| format!("<b>IATA:</b> {}<br>", escape_html(code)))
        .unwrap_or_default();
    format!(
        "<div style=\"font-family: Arial; width: 250px;\"><h4>Netflix OCA Server</h4>\
         <b>Domain:</b> {}<br><b>IP:</b> {}<br><b>Location:</b> {}<br>{}\
         <b>Coordinates:</b> {:.4}, {:.4}</div>",
        escape_html(&oca.domain),
        oca.ip,
        escape_html(city),
        iata,
        lat,
        lon
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Write the map to `export_path/oca_locations_map.html`
///
/// Creates `export_path` when it does not exist yet.
pub fn write_map(result: &LocatorResult, config: &LocatorConfig) -> Result<PathBuf, ExportError> {
    let dir = &config.export_path;
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.clone(),
        source,
    })?;
    let path = dir.join(MAP_FILE_NAME);
    std::fs::write(&path, render_map_html(result, config.map_zoom)).map_err(|source| {
        ExportError::Io {
            path: path.clone(),
            source,
        }
    })?;
    tracing::info!("Map saved to {}", path.display());
    Ok(path)
}

/// Open `path` with the platform's default handler
pub fn open_in_browser(path: &Path) -> std::io::Result<()> {
    let target = path.canonicalize()?;

    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]).arg(&target);
        c
    };
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = std::process::Command::new("open");
        c.arg(&target);
        c
    };
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut command = {
        let mut c = std::process::Command::new("xdg-open");
        c.arg(&target);
        c
    };

    command.spawn().map(|_| ())
}
