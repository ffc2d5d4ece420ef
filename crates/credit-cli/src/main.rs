//! credit-cli: Credit analysis of a listed Brazilian company against its peers.
//!
//! Downloads the yearly CVM filing archive (cached under the data directory),
//! extracts liquidity, leverage and profitability indicators for the target
//! and each peer, then writes a rated report and the peer tables.
//!
//! Usage:
//!   cargo run -p credit-cli -- --target PETR4 --peers PRIO3 RECV3 --year 2023
//!   cargo run -p credit-cli -- --target PETR4 --sector-peers --year 2023
//!   cargo run -p credit-cli -- --target PETR4 --peers PRIO3 --format html --out reports/

mod config;

use analysis_orchestrator::{sector_peers, AnalysisRequest, CreditAnalysis};
use anyhow::Context;
use chrono::Datelike;
use config::{parse_document_type, Settings};
use cvm_client::{CvmClient, TickerRegistry};
use fundamental_analysis::{IndicatorExtractor, ScanMode};
use report_generator::{write_report, ReportFormat, TableWriter};
use std::path::PathBuf;
use std::sync::Arc;

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  credit-cli --target TICKER --peers T1 T2 ... [options]");
    eprintln!("  credit-cli --target TICKER --sector-peers [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --year YYYY            Fiscal year (default: last year)");
    eprintln!("  --sector-peers         Add every listed company in the target's sector");
    eprintln!("  --config PATH          JSON analysis config (overrides CREDIT_ANALYSIS_CONFIG)");
    eprintln!("  --out DIR              Report directory (overrides CREDIT_OUTPUT_DIR)");
    eprintln!("  --format md|html       Report format (overrides CREDIT_REPORT_FORMAT)");
    eprintln!("  --document-type dfp|itr");
    eprintln!("  --in-memory            Inflate statement files before filtering");
}

/// Value following `flag`, unless it is missing or is itself a flag.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .filter(|v| !v.starts_with("--"))
}

fn list_value(args: &[String], flag: &str) -> Vec<String> {
    match args.iter().position(|a| a == flag) {
        Some(idx) => args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "credit_cli=info,analysis_orchestrator=info,fundamental_analysis=info,cvm_client=info"
                    .into()
            }),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let use_sector = args.iter().any(|a| a == "--sector-peers");
    let in_memory = args.iter().any(|a| a == "--in-memory");

    let Some(target) = flag_value(&args, "--target").map(|t| t.to_uppercase()) else {
        print_usage();
        std::process::exit(1);
    };

    let mut peers = list_value(&args, "--peers");
    if peers.is_empty() && !use_sector {
        print_usage();
        std::process::exit(1);
    }

    let year: i32 = match flag_value(&args, "--year") {
        Some(v) => v.parse().with_context(|| format!("Invalid --year '{}'", v))?,
        None => chrono::Local::now().year() - 1,
    };

    let mut settings = Settings::from_env()?;
    if let Some(path) = flag_value(&args, "--config") {
        settings.analysis_config = Some(PathBuf::from(path));
    }
    if let Some(dir) = flag_value(&args, "--out") {
        settings.output_dir = PathBuf::from(dir);
    }
    if let Some(format) = flag_value(&args, "--format") {
        settings.report_format = format.parse::<ReportFormat>()?;
    }
    if let Some(doc) = flag_value(&args, "--document-type") {
        settings.document_type = parse_document_type(doc)?;
    }

    let analysis_config = Arc::new(settings.load_analysis_config()?);

    let mut client = CvmClient::new(&settings.data_dir);
    if let Some(url) = &settings.cvm_base_url {
        client = client.with_base_url(url.clone());
    }
    if let Some(url) = &settings.cvm_registry_url {
        client = client.with_registry_url(url.clone());
    }

    let tickers = TickerRegistry::from_path(&settings.ticker_map)
        .with_context(|| format!("Failed to load ticker map {}", settings.ticker_map.display()))?;
    if tickers.is_empty() {
        anyhow::bail!("Ticker map {} is empty", settings.ticker_map.display());
    }

    if use_sector {
        let registry = client.load_company_registry().await?;
        let discovered = sector_peers(&target, &tickers, &registry)?;
        tracing::info!("Discovered {} sector peers for {}", discovered.len(), target);
        peers.extend(discovered);
    }

    let scan_mode = if in_memory { ScanMode::Materialized } else { ScanMode::Streaming };
    let extractor = IndicatorExtractor::new(client, analysis_config.clone())
        .with_document_type(settings.document_type)
        .with_scan_mode(scan_mode);

    let request = AnalysisRequest::new(target, peers, year);
    let mut analysis = CreditAnalysis::new(extractor, tickers, &analysis_config)?;
    let report = analysis.run(&request).await?;

    let renderer = settings.report_format.renderer(analysis_config.clone());
    let report_path = write_report(&settings.output_dir, &report, renderer.as_ref())?;
    let (full_path, comparison_path) = TableWriter::new(settings.tables_dir()).write(&report)?;

    println!();
    println!("{} ({}): {} ({:.2})", report.target, report.year, report.rating.rating, report.rating.final_score);
    println!(
        "  liquidity {:.2} | leverage {:.2} | profitability {:.2}",
        report.rating.categories.liquidity,
        report.rating.categories.leverage,
        report.rating.categories.profitability
    );
    for alert in &report.alerts {
        println!("  {}", alert);
    }
    if !report.excluded.is_empty() {
        println!("Excluded:");
        for exclusion in &report.excluded {
            println!("  {}: {}", exclusion.ticker, exclusion.reason);
        }
    }
    println!();
    println!("Report:     {}", report_path.display());
    println!("Full table: {}", full_path.display());
    println!("Comparison: {}", comparison_path.display());

    Ok(())
}
