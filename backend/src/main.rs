//! Clientload CLI - bulk client ingestion from CSV, JSON, or a remote API
//!
//! # Main Commands
//!
//! ```bash
//! clientload serve                     # Start HTTP server (port 3000)
//! clientload ingest clients.csv       # Ingest a CSV/JSON file to a batch
//! clientload fetch https://api.example.com/clients
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! clientload parse clients.csv        # Just tokenize CSV to JSON rows
//! clientload validate drafts.json     # Validate a JSON array of drafts
//! ```

use clap::{Parser, Subcommand};
use clientload::{
    decode_bytes, fetch_all, ingest_csv, ingest_json, tokenize, validate, ClientDraft,
    FetchOptions, HttpTransport, IngestOutcome, KeyValuePair, RequestSpec,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "clientload")]
#[command(about = "Bulk-register clients from CSV, JSON, or a remote API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize a CSV file and output JSON rows
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ingest a CSV or JSON file into a validated batch
    Ingest {
        /// Input file (.csv or .json, or use --format)
        input: PathBuf,

        /// Force the input format: csv or json
        #[arg(short, long)]
        format: Option<String>,

        /// API URL to stamp on every draft
        #[arg(long)]
        api_url: Option<String>,

        /// Output file for the batch (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch all pages of a remote API and output the located records
    Fetch {
        /// Base URL to fetch
        url: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request header, as "Key: Value" (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Query parameter, as "key=value" (repeatable)
        #[arg(short = 'q', long = "param")]
        params: Vec<String>,

        /// Bearer token
        #[arg(long)]
        bearer: Option<String>,

        /// Records per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Hard page cap
        #[arg(long)]
        page_cap: Option<u32>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a JSON array of client drafts
    Validate {
        /// Input JSON file (array of drafts)
        input: PathBuf,
    },

    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Ingest {
            input,
            format,
            api_url,
            output,
        } => cmd_ingest(&input, format.as_deref(), api_url.as_deref(), output.as_deref()),

        Commands::Fetch {
            url,
            method,
            headers,
            params,
            bearer,
            page_size,
            page_cap,
            output,
        } => {
            cmd_fetch(
                url,
                method,
                &headers,
                &params,
                bearer,
                page_size,
                page_cap,
                output.as_deref(),
            )
            .await
        }

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing CSV: {}", input.display());

    let bytes = fs::read(input)?;
    let (content, encoding) = decode_bytes(&bytes);
    let result = tokenize(&content)?;

    eprintln!("   Encoding: {}", encoding);
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("Parsed {} rows", result.rows.len());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_ingest(
    input: &Path,
    format: Option<&str>,
    api_url: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Ingesting: {}", input.display());

    let bytes = fs::read(input)?;
    let (content, _) = decode_bytes(&bytes);

    let format = match format {
        Some(f) => f.to_lowercase(),
        None => input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("csv")
            .to_lowercase(),
    };

    let outcome = match format.as_str() {
        "json" => ingest_json(&content, api_url)?,
        _ => ingest_csv(&content, api_url)?,
    };

    print_outcome(&outcome);

    let json = serde_json::to_string_pretty(&outcome.batch)?;
    write_output(&json, output)?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_fetch(
    url: String,
    method: String,
    headers: &[String],
    params: &[String],
    bearer: Option<String>,
    page_size: Option<usize>,
    page_cap: Option<u32>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut spec = RequestSpec::get(url);
    spec.method = method;

    for header in headers {
        let (key, value) = header
            .split_once(':')
            .ok_or_else(|| format!("Invalid header (want \"Key: Value\"): {header}"))?;
        spec.headers.push(KeyValuePair::new(key.trim(), value.trim()));
    }

    for param in params {
        let (key, value) = param
            .split_once('=')
            .ok_or_else(|| format!("Invalid query param (want key=value): {param}"))?;
        spec.query_params.push(KeyValuePair::new(key, value));
    }

    if let Some(token) = bearer {
        spec.auth = Some(clientload::AuthConfig::Bearer { token });
    }

    let mut options = FetchOptions::from_env();
    if let Some(size) = page_size {
        options.page_size = size;
    }
    if let Some(cap) = page_cap {
        options.page_cap = cap;
    }

    let transport = HttpTransport::from_env()?;
    let outcome = fetch_all(&spec, &transport, &options).await;

    eprintln!(
        "Fetched {} records across {} pages ({:?})",
        outcome.records.len(),
        outcome.pages_fetched,
        outcome.reason
    );
    if let Some(error) = &outcome.error {
        eprintln!("   {}", error.message);
        for suggestion in &error.suggestions {
            eprintln!("   - {}", suggestion);
        }
    }

    let json = serde_json::to_string_pretty(&outcome.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let drafts: Vec<ClientDraft> = serde_json::from_str(&content)?;
    let submitted = drafts.len();

    let report = validate(drafts);

    eprintln!(
        "Results: {} valid, {} rejected",
        report.valid.len(),
        submitted - report.valid.len()
    );
    for error in &report.errors {
        eprintln!("   - {}", error);
    }

    if report.valid.len() != submitted {
        std::process::exit(1);
    }

    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    clientload::server::start_server(port).await
}

fn print_outcome(outcome: &IngestOutcome) {
    eprintln!(
        "Batch: {} clients from {} records",
        outcome.batch.count, outcome.records_seen
    );
    if !outcome.errors.is_empty() {
        eprintln!("Issues:");
        for error in &outcome.errors {
            eprintln!("   - {}", error);
        }
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
