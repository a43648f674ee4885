//! Export of locator results to files
//!
//! Every exporter renders the same [`LocatorResult`] fields. JSON keeps the
//! nested structure; CSV and XLSX flatten one row per OCA; Markdown is a
//! human-readable report.

mod csv;
mod json;
mod markdown;
mod xlsx;

pub use self::csv::write_csv;
pub use self::json::{write_json, JsonExport, JsonIsp, JsonOca, JsonPublicIp};
pub use self::markdown::render_markdown;
pub use self::xlsx::write_xlsx;

use crate::locator::LocatorResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Errors raised while writing an export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The output file could not be created or written
    #[error("failed to write {path}: {source}")]
    Io {
        /// Output path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed
    #[error("CSV export failed: {0}")]
    Csv(#[from] ::csv::Error),

    /// Workbook generation failed
    #[error("Excel export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Nested JSON document
    Json,
    /// One flattened row per OCA
    Csv,
    /// Excel workbook with a summary sheet
    Xlsx,
    /// Markdown report
    Markdown,
}

impl ExportFormat {
    /// File extension used for the default output name
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Markdown => "md",
        }
    }

    /// `oca_results.<ext>`
    pub fn default_file_name(&self) -> PathBuf {
        PathBuf::from(format!("oca_results.{}", self.extension()))
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!(
                "unknown export format: {other} (expected json, csv, xlsx or markdown)"
            )),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Markdown => "markdown",
        };
        f.write_str(name)
    }
}

/// Write `result` to `path` in `format`
///
/// # Returns
///
/// The path written, for reporting.
pub fn export(
    result: &LocatorResult,
    format: ExportFormat,
    path: &Path,
) -> Result<PathBuf, ExportError> {
    tracing::debug!("Exporting results as {format} to {}", path.display());

    match format {
        ExportFormat::Xlsx => write_xlsx(result, path)?,
        ExportFormat::Json => write_file(path, |w| write_json(result, w))?,
        ExportFormat::Csv => write_file(path, |w| write_csv(result, w))?,
        ExportFormat::Markdown => write_file(path, |w| {
            w.write_all(render_markdown(result).as_bytes())
                .map_err(|source| io_error(path, source))
        })?,
    }

    tracing::info!("{format} export completed: {}", path.display());
    Ok(path.to_path_buf())
}

fn write_file<F>(path: &Path, render: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ExportError>,
{
    let file = File::create(path).map_err(|source| io_error(path, source))?;
    let mut writer = BufWriter::new(file);
    render(&mut writer)?;
    writer.flush().map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::asn::IspRecord;
    use crate::geo::{GeoSource, LocationRecord};
    use crate::locator::{LocatorResult, OcaCandidate};
    use chrono::{TimeZone, Utc};

    /// One located and one unlocated OCA behind a Comcast address
    pub fn sample_result() -> LocatorResult {
        let mut ord = OcaCandidate::new(
            "ipv4-c001-ord001-ix.1.oca.nflxvideo.net",
            "198.38.96.1".parse().unwrap(),
            "https://ipv4-c001-ord001-ix.1.oca.nflxvideo.net/speedtest?c=us",
        );
        ord.asn = Some("2906".to_string());
        ord.as_name = Some("AS-SSI".to_string());
        ord.location = Some(
            LocationRecord::new(GeoSource::Primary)
                .with_city("Chicago, IL")
                .with_iata("ORD")
                .with_country("US")
                .with_coordinates(41.978252, -87.90923),
        );

        let unknown = OcaCandidate::new(
            "mystery.example.net",
            "203.0.113.50".parse().unwrap(),
            "https://mystery.example.net/speedtest",
        );

        let isp = IspRecord {
            asn: "7922".to_string(),
            as_name: "COMCAST-7922, US".to_string(),
            country_code: "US".to_string(),
            bgp_prefix: "73.0.0.0/8".to_string(),
            registry: "arin".to_string(),
            ip: "73.15.2.9".to_string(),
            allocated: Some("2005-10-18".to_string()),
        };

        LocatorResult::new(
            "73.15.2.9".parse().unwrap(),
            isp,
            vec![ord, unknown],
            "abcdefghijklmnop".to_string(),
            Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap(),
        )
    }
}
