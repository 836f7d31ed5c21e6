//! docfraud command-line interface
//!
//! Runs the scoring pipeline or its individual scorers over JSON inputs.

use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::{Arg, ArgMatches, Command};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use docfraud::collaborators::PrecomputedBundle;
use docfraud::forensics::dates::{parse_pdf_date, parse_reference_date};
use docfraud::forensics::{score_annotations, score_signatures, PdfStructure, SigningContext};
use docfraud::history::InMemoryStore;
use docfraud::types::OcrWord;
use docfraud::validators::DeductionRegistry;
use docfraud::{
    compute_overall, CheckResult, ClientConfig, Collaborators, FontAnomalyDetector, Logger,
    Pipeline, Result,
};

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    Logger::with_level(level).init();

    if let Err(e) = run(&matches).await {
        error!("❌ {}", e);
        process::exit(1);
    }
}

fn build_cli() -> Command {
    Command::new("docfraud")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fraud-risk scoring for tax and employment termination certificates")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Client configuration file (JSON/YAML)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .global(true)
                .value_parser(["error", "warn", "info", "debug", "trace"])
                .default_value("info")
                .help("Log level, overridden by RUST_LOG"),
        )
        .subcommand(
            Command::new("analyze")
                .about("Run the full pipeline over a precomputed bundle")
                .arg(
                    Arg::new("bundle")
                        .long("bundle")
                        .value_name("FILE")
                        .required(true)
                        .help("Bundle with document, pages, labels and metadata"),
                )
                .arg(
                    Arg::new("registry")
                        .long("registry")
                        .value_name("FILE")
                        .help("Deduction file registry (CSV, or JSON rows for .json paths)"),
                ),
        )
        .subcommand(
            Command::new("aggregate")
                .about("Compute the overall verdict from a list of check results")
                .arg(
                    Arg::new("checks")
                        .long("checks")
                        .value_name("FILE")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("fonts")
                .about("Detect rare-font words in per-page OCR output")
                .arg(
                    Arg::new("pages")
                        .long("pages")
                        .value_name("FILE")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("pdf")
                .about("Score PDF annotations and signatures")
                .arg(
                    Arg::new("structure")
                        .long("structure")
                        .value_name("FILE")
                        .required(true),
                )
                .arg(
                    Arg::new("reference-date")
                        .long("reference-date")
                        .value_name("DATE")
                        .help("Date printed on the document"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<ClientConfig> {
    match matches.get_one::<String>("config") {
        Some(path) => {
            info!("📄 Loading config from {}", path);
            ClientConfig::from_file(path)
        }
        None => Ok(ClientConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    Ok(serde_json::from_str(&fs::read_to_string(Path::new(path))?)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    config.validate()?;

    match matches.subcommand() {
        Some(("analyze", sub)) => {
            let bundle = PrecomputedBundle::from_file(required(sub, "bundle"))?;
            let doc = bundle.document.clone();
            let registry = match sub.get_one::<String>("registry") {
                Some(path) => DeductionRegistry::load(path)?,
                None => DeductionRegistry::default(),
            };
            let collaborators =
                Collaborators::from_bundle(Arc::new(bundle), Arc::new(InMemoryStore::new()));
            let pipeline =
                Pipeline::new(Arc::new(config), collaborators)?.with_registry(Arc::new(registry));
            let doc_id = doc.doc_id.clone();
            let (report, persistence) = pipeline.analyze_with_persistence(doc).await?;
            let persisted = pipeline.finish_persistence(persistence, &doc_id).await;
            print_json(&report)?;
            persisted
        }
        Some(("aggregate", sub)) => {
            let checks: Vec<CheckResult> = read_json(required(sub, "checks"))?;
            print_json(&compute_overall(&checks, &config))
        }
        Some(("fonts", sub)) => {
            let pages: Vec<Vec<OcrWord>> = read_json(required(sub, "pages"))?;
            let detector = FontAnomalyDetector::new(&config.font)?;
            print_json(&detector.detect_pages(pages, None)?)
        }
        Some(("pdf", sub)) => {
            let pdf: PdfStructure = read_json(required(sub, "structure"))?;
            let reference = sub
                .get_one::<String>("reference-date")
                .and_then(|d| parse_reference_date([d.as_str()]));
            let times = pdf.document_times();
            let annotations =
                score_annotations(&pdf.annotations, &pdf.page_areas(), times, &config.annotations);
            let ctx = SigningContext {
                created: times.created,
                modified: times.modified,
                reference,
            };
            let signatures = score_signatures(&pdf.signatures, &ctx, &config.signatures);
            print_json(&json!({
                "creation_date": pdf.creation_date.as_deref().and_then(parse_pdf_date),
                "annotations": {
                    "score": annotations.score,
                    "description": annotations.describe(),
                    "risks": annotations.risks,
                },
                "signatures": signatures,
            }))
        }
        _ => Ok(()),
    }
}
