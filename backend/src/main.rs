//! Parceldesk CLI - courier shipment rewriting and address grouping
//!
//! # Main Commands
//!
//! ```bash
//! parceldesk serve                              # Start HTTP server (port 3000)
//! parceldesk rewrite tokyo-yotei input.csv      # Rewrite a courier CSV
//! parceldesk group addresses.xlsx               # Build the grouping report
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! parceldesk parse input.csv                    # Parse text to a JSON grid
//! parceldesk tabs                               # List processing presets
//! ```

use clap::{Parser, Subcommand};
use parceldesk::{
    decode_text, detect_delimiter, detect_encoding, parse_grid_with, rewrite_shipment_csv, AddressGrouping,
    ExportFile, QuoteMode, Settings, ShipmentTab, XlsxBackend,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "parceldesk")]
#[command(about = "Rewrite courier shipment CSVs and group address workbooks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a delimited text file and output the grid as JSON
    Parse {
        /// Input file
        input: PathBuf,

        /// Delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Use standard CSV quoting instead of toggle quoting
        #[arg(long)]
        rfc4180: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite a courier CSV with the billing code of a tab
    Rewrite {
        /// Tab id (see `parceldesk tabs`)
        tab: String,

        /// Input CSV file
        input: PathBuf,

        /// Output file (default: processed_<tab>_<millis>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not prefix the CSV with a byte-order mark
        #[arg(long)]
        no_bom: bool,
    },

    /// Group an address workbook by institution
    Group {
        /// Input workbook (.xlsx, .xls, .ods)
        input: PathBuf,

        /// Output workbook (default: 处理结果_<date>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also print the report records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List shipment processing presets
    Tabs,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: PARCELDESK_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Ledger data directory (default: PARCELDESK_DATA_DIR or .parceldesk)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match Settings::from_env() {
        Ok(settings) => match cli.command {
            Commands::Parse {
                input,
                delimiter,
                rfc4180,
                output,
            } => cmd_parse(&input, delimiter, rfc4180, output.as_deref()),

            Commands::Rewrite {
                tab,
                input,
                output,
                no_bom,
            } => {
                let mut options = settings.export;
                if no_bom {
                    options.include_bom = false;
                }
                cmd_rewrite(&tab, &input, output.as_deref(), options)
            }

            Commands::Group { input, output, json } => cmd_group(&input, output.as_deref(), json),

            Commands::Tabs => cmd_tabs(),

            Commands::Serve { port, data_dir } => {
                let mut settings = settings;
                if let Some(port) = port {
                    settings.port = port;
                }
                if let Some(dir) = data_dir {
                    settings.data_dir = dir;
                }
                cmd_serve(settings).await
            }
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    rfc4180: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let bytes = fs::read(input)?;
    let text = decode_text(&bytes)?;
    let used_delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&text));
    let mode = if rfc4180 { QuoteMode::Rfc4180 } else { QuoteMode::Toggle };
    let grid = parse_grid_with(&text, used_delimiter, mode)?;

    eprintln!("   Encoding: {}", detect_encoding(&bytes));
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(used_delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("✅ Parsed {} rows", grid.len());

    let json = serde_json::to_string_pretty(&grid)?;
    write_output(&json, output)?;

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn cmd_rewrite(
    tab_id: &str,
    input: &Path,
    output: Option<&Path>,
    options: parceldesk::ExportOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let tab = ShipmentTab::from_id(tab_id).ok_or_else(|| parceldesk::PipelineError::UnknownTab(tab_id.to_string()))?;

    let bytes = fs::read(input)?;
    let export = rewrite_shipment_csv(&bytes, tab, &options)?;

    eprintln!("   Rows: {} → {}", export.rows_in, export.rows_out);
    save_export(&export.file, output)?;

    Ok(())
}

fn cmd_group(input: &Path, output: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let report = AddressGrouping::new(XlsxBackend).run(&bytes)?;

    eprintln!("📦 Institutions:  {}", report.summary.institutions);
    eprintln!("   Addresses:     {}", report.summary.primary_addresses);
    eprintln!("   Report lines:  {}", report.summary.records);

    if json {
        println!("{}", serde_json::to_string_pretty(&report.records)?);
    }
    save_export(&report.file, output)?;

    Ok(())
}

fn cmd_tabs() -> Result<(), Box<dyn std::error::Error>> {
    for tab in ShipmentTab::ALL {
        let rule = tab.rule();
        println!("  {:<14} {} ({})", tab.id(), tab.label(), rule.code());
    }
    Ok(())
}

async fn cmd_serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    parceldesk::server::start_server(settings).await
}

fn save_export(file: &ExportFile, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let target = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(&file.file_name));
    fs::write(&target, &file.bytes)?;
    eprintln!("💾 Output written to: {}", target.display());
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
