//! Salary transfer CLI - payroll sheet to bank transfer file
//!
//! # Main Commands
//!
//! ```bash
//! salary-transfer serve                       # Start HTTP server (port 3000)
//! salary-transfer convert salary.xlsx         # Write Salary_Bank_Transfer_File.xlsx
//! salary-transfer convert salary.xlsx --all-groups   # One file per CFL, zipped
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! salary-transfer groups salary.xlsx          # List CFL groups with row counts
//! salary-transfer check salary.xlsx           # Required column check only
//! salary-transfer parse salary.csv            # Dump rows as JSON
//! salary-transfer narration "Paid {month}" --month March-2024
//! salary-transfer example-config              # Default options JSON
//! ```

use clap::{Parser, Subcommand};
use salary_transfer::{
    missing_columns, parse_file, render_narration, ColumnProfile, ConvertOptions, ExportArtifact,
    MonthStyle, SourceFormat,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "salary-transfer")]
#[command(about = "Convert payroll sheets into bank bulk-transfer files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full conversion: payroll sheet → transfer spreadsheet (or zip per group)
    Convert {
        /// Input payroll file (.xlsx, .xls, .ods, .csv)
        input: PathBuf,

        /// Output path (default: generated file name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Debit narration template ({month}, {cfl})
        #[arg(long)]
        debit_template: Option<String>,

        /// Credit narration template ({month})
        #[arg(long)]
        credit_template: Option<String>,

        /// Required column preset
        #[arg(long)]
        profile: Option<ColumnProfile>,

        /// Options JSON file (see `example-config`)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use "Mar-2024" instead of "March-2024"
        #[arg(long)]
        abbreviated_month: bool,

        /// Export only these groups (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<String>,

        /// Export every group as its own file
        #[arg(long, conflicts_with = "groups")]
        all_groups: bool,

        /// Print the first N output records as JSON
        #[arg(long)]
        preview: Option<usize>,
    },

    /// List distinct groups with row counts
    Groups {
        /// Input payroll file
        input: PathBuf,

        /// Options JSON file (for a custom group column)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check the input for required columns
    Check {
        /// Input payroll file
        input: PathBuf,

        /// Required column preset (overrides the config's column list)
        #[arg(long)]
        profile: Option<ColumnProfile>,

        /// Options JSON file (`profile` / `required_columns`)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Parse an input file and output its rows as JSON
    Parse {
        /// Input payroll file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a single narration
    Narration {
        /// Template text, e.g. "Salary paid for the month of {month} {cfl}"
        template: String,

        /// Month label
        #[arg(short, long)]
        month: String,

        /// CFL value (enables {cfl})
        #[arg(long)]
        cfl: Option<String>,
    },

    /// Show the default options JSON
    ExampleConfig,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "SALARY_TRANSFER_PORT", default_value = "3000")]
        port: u16,

        /// Upload size limit in megabytes
        #[arg(long, default_value = "25")]
        max_upload_mb: usize,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            debit_template,
            credit_template,
            profile,
            config,
            abbreviated_month,
            groups,
            all_groups,
            preview,
        } => load_options(config.as_deref()).and_then(|mut options| {
            if let Some(t) = debit_template {
                options.debit_template = t;
            }
            if let Some(t) = credit_template {
                options.credit_template = t;
            }
            if let Some(p) = profile {
                options.profile = p;
                options.required_columns = None;
            }
            if abbreviated_month {
                options.rules.month_style = MonthStyle::Abbreviated;
            }
            cmd_convert(&input, output.as_deref(), &options, &groups, all_groups, preview)
        }),

        Commands::Groups { input, config } => {
            load_options(config.as_deref()).and_then(|options| cmd_groups(&input, &options))
        }

        Commands::Check { input, profile, config } => {
            load_options(config.as_deref()).and_then(|mut options| {
                if let Some(p) = profile {
                    options.profile = p;
                    options.required_columns = None;
                }
                cmd_check(&input, &options)
            })
        }

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Narration { template, month, cfl } => {
            cmd_narration(&template, &month, cfl.as_deref())
        }

        Commands::ExampleConfig => cmd_example_config(),

        Commands::Serve { port, max_upload_mb } => cmd_serve(port, max_upload_mb).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_options(path: Option<&Path>) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            eprintln!("⚙️  Options: {}", p.display());
            Ok(ConvertOptions::from_json_file(p)?)
        }
        None => Ok(ConvertOptions::default()),
    }
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    options: &ConvertOptions,
    groups: &[String],
    all_groups: bool,
    preview: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let conversion = salary_transfer::convert_file(input, options)?;

    if let Some(ref source) = conversion.source {
        eprintln!("   Source: {}", describe_source(source));
    }
    eprintln!("   Rows: {}", conversion.output.len());

    if !conversion.warnings.is_empty() {
        eprintln!("   ⚠️  {} rows with unparseable Start Date", conversion.warnings.len());
    }

    if let Some(n) = preview {
        let json = serde_json::to_string_pretty(conversion.preview(n))?;
        println!("{}", json);
    }

    let artifact = if all_groups {
        let all = conversion.groups();
        conversion.export_grouped(all.as_slice())?
    } else if !groups.is_empty() {
        conversion.export_grouped(groups)?
    } else {
        conversion.export_single()?
    };

    match &artifact {
        ExportArtifact::Spreadsheet { rows, .. } => {
            eprintln!("\n📦 Spreadsheet: {} records", rows);
        }
        ExportArtifact::Archive { entries, skipped_groups, .. } => {
            eprintln!("\n📦 Archive: {} files", entries.len());
            for entry in entries {
                eprintln!("   - {}", entry);
            }
            if !skipped_groups.is_empty() {
                eprintln!("   Skipped (no rows): {}", skipped_groups.join(", "));
            }
        }
    }

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(artifact.file_name()));
    fs::write(&path, artifact.bytes())?;
    eprintln!("💾 Saved to: {}", path.display());

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_groups(input: &Path, options: &ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Reading: {}", input.display());

    let parsed = parse_file(input)?;
    let counts = salary_transfer::transform::group_counts(&parsed.table.rows, &options.rules.group_column);

    if counts.is_empty() {
        eprintln!("📋 No values in column '{}'", options.rules.group_column);
        return Ok(());
    }

    eprintln!("📋 Groups in '{}' ({}):\n", options.rules.group_column, counts.len());
    for (group, rows) in counts {
        println!("  {}\t{}", group, rows);
    }
    Ok(())
}

fn cmd_check(input: &Path, options: &ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔍 Checking: {}", input.display());

    let parsed = parse_file(input)?;
    let required = options.required();
    let missing = missing_columns(&parsed.table.headers, &required);

    eprintln!("   Columns: {}", parsed.table.headers.len());
    eprintln!("   Required: {}", required.len());

    if missing.is_empty() {
        eprintln!("✅ All required columns present");
        Ok(())
    } else {
        for column in &missing {
            println!("  - {}", column);
        }
        Err(format!("{} required columns missing", missing.len()).into())
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let parsed = parse_file(input)?;
    eprintln!("   Source: {}", describe_source(&parsed.source));
    eprintln!("   Columns: {}", parsed.table.headers.join(", "));
    eprintln!("✅ Parsed {} records", parsed.table.len());

    let json = serde_json::to_string_pretty(&parsed.table.to_json())?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_narration(template: &str, month: &str, cfl: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_narration(template, month, cfl)?);
    Ok(())
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", ConvertOptions::default().to_json()?);
    Ok(())
}

async fn cmd_serve(port: u16, max_upload_mb: usize) -> Result<(), Box<dyn std::error::Error>> {
    let max_upload_bytes = upload_limit_bytes(max_upload_mb)
        .ok_or_else(|| format!("--max-upload-mb {} is too large", max_upload_mb))?;
    let config = salary_transfer::server::ServerConfig {
        port,
        max_upload_bytes,
    };
    salary_transfer::server::start_server(config).await?;
    Ok(())
}

fn upload_limit_bytes(megabytes: usize) -> Option<usize> {
    megabytes.checked_mul(1024 * 1024)
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

fn describe_source(source: &SourceFormat) -> String {
    match source {
        SourceFormat::Workbook { sheet } => format!("workbook, sheet '{}'", sheet),
        SourceFormat::Delimited { encoding, delimiter } => format!(
            "delimited text, {} / '{}'",
            encoding,
            match delimiter {
                '\t' => "\\t".to_string(),
                c => c.to_string(),
            }
        ),
    }
}
