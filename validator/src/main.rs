//! ECB Validator CLI - mine validation rules and check reporting tables
//!
//! # Main Commands
//!
//! ```bash
//! ecb-validate rules rules.csv -o rules.json       # Mine rules from a source
//! ecb-validate validate submission/ --rules rules/  # Validate a workbook directory
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! ecb-validate scan overview.xlsx                   # List rule candidates of a workbook
//! ecb-validate resolve c0020-0050 c0020 c0030 c0050 # Resolve a column reference
//! ```

use clap::{Parser, Subcommand};
use ecb_validator::engine::resolve_str;
use ecb_validator::mining::scan_cells;
use ecb_validator::logs::set_quiet;
use ecb_validator::{
    extract_rules, validate_workbook_dir, RuleSetSummary, RuleType, RulesSource, Schema,
    ValidatorConfig, Workbook,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ecb-validate")]
#[command(about = "Mine ECB/EBA validation rules and apply them to reporting tables", long_about = None)]
struct Cli {
    /// Only print warnings and errors on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine validation rules from a source and output them as JSON
    Rules {
        /// Spreadsheet, CSV file, directory of CSV sheets, or URL (default: ECB_RULES_SOURCE)
        source: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the rule candidates found in a sheet file or workbook
    Scan {
        /// Spreadsheet, CSV file, or directory of CSV sheets
        input: PathBuf,
    },

    /// Validate the table sheets of a workbook
    Validate {
        /// Spreadsheet file, or directory of CSV sheets (one per worksheet)
        workbook: PathBuf,

        /// Rule source (default: ECB_RULES_SOURCE or the published EBA workbook)
        #[arg(short, long)]
        rules: Option<String>,

        /// Only validate sheets whose name contains this text
        #[arg(short, long)]
        table_filter: Option<String>,

        /// JSON result file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Markdown report file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Resolve a column reference against a list of columns
    Resolve {
        /// Reference such as c0020, c0020-0090 or c*
        reference: String,

        /// Columns present in the sheet
        columns: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    set_quiet(cli.quiet);

    let result = match cli.command {
        Commands::Rules { source, output } => cmd_rules(source, output.as_deref()).await,

        Commands::Scan { input } => cmd_scan(&input),

        Commands::Validate {
            workbook,
            rules,
            table_filter,
            output,
            report,
        } => {
            cmd_validate(
                &workbook,
                rules,
                table_filter,
                output.as_deref(),
                report.as_deref(),
            )
            .await
        }

        Commands::Resolve { reference, columns } => cmd_resolve(&reference, columns),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

type CmdResult = Result<bool, Box<dyn std::error::Error>>;

async fn cmd_rules(source: Option<String>, output: Option<&Path>) -> CmdResult {
    let mut config = ValidatorConfig::from_env()?;
    if let Some(source) = source {
        config = config.with_rules_source(source);
    }

    let source = RulesSource::parse(&config.rules_source);
    eprintln!("📄 Rule source: {}", source);

    let rules = extract_rules(&source).await?;
    print_summary(&RuleSetSummary::from_rules(&rules));

    let json = serde_json::to_string_pretty(&rules)?;
    write_output(&json, output)?;
    Ok(true)
}

fn cmd_scan(input: &Path) -> CmdResult {
    eprintln!("📄 Scanning: {}", input.display());

    let workbook = Workbook::open(input)?;
    let mut total = 0;
    for sheet in workbook.read_all()? {
        eprintln!("   {} [{}], {} rows", sheet.name, sheet.format, sheet.row_count());

        let cells = sheet.cells();
        let candidates = scan_cells(&cells);
        for candidate in &candidates {
            println!("{}\t{:>5}  {}", sheet.name, candidate.row, candidate.text);
        }
        total += candidates.len();
    }

    eprintln!("✅ {} candidate(s)", total);
    Ok(true)
}

async fn cmd_validate(
    workbook: &Path,
    rules: Option<String>,
    table_filter: Option<String>,
    output: Option<&Path>,
    report: Option<&Path>,
) -> CmdResult {
    let mut config = ValidatorConfig::from_env()?;
    if let Some(source) = rules {
        config = config.with_rules_source(source);
    }
    if let Some(filter) = table_filter {
        config = config.with_table_filter(filter);
    }

    let source = RulesSource::parse(&config.rules_source);
    eprintln!("📄 Rule source: {}", source);
    let rules = extract_rules(&source).await?;
    print_summary(&RuleSetSummary::from_rules(&rules));

    eprintln!("\n📂 Workbook: {}", workbook.display());
    let run = validate_workbook_dir(&rules, workbook, &config.options())?;

    eprintln!();
    for sheet in run.results.sheets() {
        eprintln!(
            "   {:<12} {:<5} {:>5} rows {:>5} errors",
            sheet.sheet_name, sheet.status, sheet.data_rows, sheet.error_count
        );
    }

    if let Some(path) = report {
        fs::write(path, &run.report)?;
        eprintln!("   💾 Report written to: {}", path.display());
    }

    write_output(&run.to_json()?, output)?;

    if run.is_pass() {
        eprintln!("\n✅ PASS");
    } else {
        eprintln!("\n❌ FAIL: {} error(s)", run.results.total_errors);
    }
    Ok(run.is_pass())
}

fn cmd_resolve(reference: &str, columns: Vec<String>) -> CmdResult {
    let schema: Schema = columns.into_iter().collect();
    let resolved = resolve_str(reference, &schema);

    if resolved.is_empty() {
        eprintln!("⚠️  {} resolves to no column", reference);
    }
    for column in resolved {
        println!("{}", column);
    }
    Ok(true)
}

fn print_summary(summary: &RuleSetSummary) {
    eprintln!("   Rules: {} ({} enforced, {} recognized only)", summary.total, summary.enforced, summary.recognized_only);
    for rule_type in RuleType::ALL {
        eprintln!("     {:<20} {}", rule_type.as_str(), summary.count(rule_type));
    }
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
