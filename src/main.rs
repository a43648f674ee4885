//! oca-locator - find the Netflix Open Connect Appliances serving this network.
//!
//! This is the command-line interface for the oca_locator library.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::Parser;
use oca_locator::locator::LocatorObserver;
use oca_locator::map::{open_in_browser, write_map};
use oca_locator::public_ip::FixedPublicIp;
use oca_locator::{
    export, ExportFormat, GeocodingProvider, LocatorConfig, LocatorConfigBuilder, LocatorResult,
    OcaLocator, Services,
};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Exit code after Ctrl-C
const EXIT_CANCELLED: i32 = 130;

/// Get the version string for oca-locator
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the locator.
#[derive(Parser, Debug)]
#[clap(
    name = "oca-locator",
    author,
    version,
    about = "Locate the Netflix Open Connect Appliances serving your network",
    long_about = None
)]
struct Args {
    /// Export format: json, csv, xlsx, markdown
    #[clap(short, long)]
    output: Option<ExportFormat>,

    /// Export file path (default: oca_results.<ext>)
    #[clap(short = 'f', long)]
    output_file: Option<PathBuf>,

    /// Generate an interactive map of OCA locations
    #[clap(short, long)]
    map: bool,

    /// Generate the map and open it in a browser
    #[clap(long)]
    open_map: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Disable emoji in output
    #[clap(long)]
    no_emoji: bool,

    /// Only print "domain ip" pairs
    #[clap(short, long)]
    quiet: bool,

    /// Geocoding provider: hybrid, aleph, heuristic
    #[clap(long)]
    provider: Option<GeocodingProvider>,

    /// Per-request timeout in seconds
    #[clap(long)]
    timeout: Option<u64>,

    /// Specify public IP address (skip detection)
    #[clap(long)]
    public_ip: Option<IpAddr>,
}

fn main() {
    // Quick check for version before starting async runtime
    let raw: Vec<String> = std::env::args().collect();
    if raw.len() == 2 && (raw[1] == "--version" || raw[1] == "-V") {
        println!("oca-locator {}", get_version());
        return;
    }

    let args = Args::parse();
    init_logging(args.debug, args.quiet);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let code = runtime.block_on(async {
        tokio::select! {
            result = async_main(args) => match result {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("\nError: {:#}", e);
                    1
                }
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nOperation cancelled by user");
                EXIT_CANCELLED
            }
        }
    });

    // Do not wait for in-flight lookups on exit
    runtime.shutdown_background();
    std::process::exit(code);
}

fn init_logging(debug: bool, quiet: bool) {
    let default = if debug {
        "oca_locator=debug"
    } else if quiet {
        "oca_locator=warn"
    } else {
        "oca_locator=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

/// Layer command-line overrides over the environment configuration
fn build_config(args: &Args) -> Result<LocatorConfig> {
    let base = LocatorConfig::from_env().map_err(anyhow::Error::msg)?;
    let mut builder = LocatorConfigBuilder::from_config(base);
    if let Some(secs) = args.timeout {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }
    if let Some(provider) = args.provider {
        builder = builder.geocoding_provider(provider);
    }
    if args.no_emoji {
        builder = builder.show_emoji(false);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid configuration - {e}"))
}

async fn async_main(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let emoji = config.show_emoji;

    let mut services = Services::new(&config)?;
    if let Some(ip) = args.public_ip {
        services = services.with_public_ip(Arc::new(FixedPublicIp(ip)));
    }

    if !args.quiet {
        print_banner(emoji);
    }

    let locator = OcaLocator::from_services(&services);
    let result = if args.quiet {
        locator.locate().await?
    } else {
        locator.locate_with(&ConsoleProgress { emoji }).await?
    };

    if args.quiet {
        print!("{}", quiet_lines(&result));
    } else {
        println!("{}", network_panel(&result, emoji));
        println!("{}", oca_table(&result, emoji));
    }

    if let Some(format) = args.output {
        let path = args
            .output_file
            .clone()
            .unwrap_or_else(|| format.default_file_name());
        let written = export(&result, format, &path)
            .with_context(|| format!("Failed to export results as {format}"))?;
        if !args.quiet {
            println!("{}Results exported to {}", icon(emoji, "💾 "), written.display());
        }
    }

    if args.map || args.open_map {
        let path = write_map(&result, &config).context("Failed to generate map")?;
        if !args.quiet {
            println!("{}Map saved to {}", icon(emoji, "🗺️  "), path.display());
        }
        if args.open_map {
            if let Err(e) = open_in_browser(&path) {
                tracing::warn!("Could not open {} in a browser: {}", path.display(), e);
            }
        }
    }

    Ok(())
}

/// Prints pipeline steps to stderr
struct ConsoleProgress {
    emoji: bool,
}

impl LocatorObserver for ConsoleProgress {
    fn step(&self, description: &str) {
        eprintln!("{}{}...", icon(self.emoji, "📍 "), description);
    }
}

fn icon(emoji: bool, symbol: &'static str) -> &'static str {
    if emoji {
        symbol
    } else {
        ""
    }
}

fn print_banner(emoji: bool) {
    let globe = icon(emoji, "🌐 ");
    println!();
    println!("{}Netflix OCA Locator v{}", globe, get_version());
    println!("Discover the Open Connect Appliances serving your network");
    println!();
}

/// Network information block for the terminal
fn network_panel(result: &LocatorResult, emoji: bool) -> String {
    let isp = result.isp();
    let asn = if isp.is_known() {
        format!("AS{}", isp.asn)
    } else {
        "Unknown".to_string()
    };
    format!(
        "\n{}Your Network Information\n  Public IP:  {}\n  ISP:        {}\n  AS Number:  {}\n  Country:    {}\n  BGP Prefix: {}",
        icon(emoji, "🌐 "),
        result.public_ip(),
        isp.as_name,
        asn,
        dash_if_empty(&isp.country_code),
        dash_if_empty(&isp.bgp_prefix),
    )
}

/// Candidate table for the terminal
fn oca_table(result: &LocatorResult, emoji: bool) -> String {
    if result.candidates().is_empty() {
        return "\nNo OCA servers found.".to_string();
    }

    let header = [
        "Domain",
        "IP Address",
        "Location",
        "IATA",
        "ASN",
        "Provider",
        "Method",
    ];
    let rows: Vec<[String; 7]> = result
        .candidates()
        .iter()
        .map(|oca| {
            let location = oca.location.as_ref();
            [
                oca.domain.clone(),
                oca.ip.to_string(),
                location
                    .and_then(|l| l.city())
                    .unwrap_or("Unknown")
                    .to_string(),
                location
                    .and_then(|l| l.iata_code())
                    .unwrap_or("-")
                    .to_string(),
                oca.asn
                    .as_deref()
                    .map_or_else(|| "-".to_string(), |a| format!("AS{a}")),
                location.map_or("-", |l| l.provider().as_str()).to_string(),
                location.map_or("-", |l| l.method()).to_string(),
            ]
        })
        .collect();

    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[&str]| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = format!(
        "\n{}Netflix OCA Servers Allocated to Your Network\n",
        icon(emoji, "🌐 ")
    );
    out.push_str(&format_row(&header));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&format_row(&cells));
        out.push('\n');
    }
    let located = result.candidates().iter().filter(|c| c.is_located()).count();
    out.push_str(&format!(
        "\nTotal OCAs found: {} ({} located)",
        result.total_ocas(),
        located
    ));
    out
}

/// One "domain ip" line per candidate
fn quiet_lines(result: &LocatorResult) -> String {
    result
        .candidates()
        .iter()
        .map(|oca| format!("{} {}\n", oca.domain, oca.ip))
        .collect()
}

fn dash_if_empty(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
