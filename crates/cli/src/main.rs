use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use trac_core::codes::{self, BillType, Chamber, SubjectStatus};
use trac_core::config::TracConfig;
use trac_core::db;
use trac_core::schema;

#[derive(Parser)]
#[command(name = "trac")]
#[command(about = "Federal legislation tracker", long_about = None)]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file
    #[arg(long, default_value = "trac.toml", global = true)]
    config: PathBuf,

    /// Database path, overriding the configuration file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export canonical JSON Schemas to the ./schemas directory
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Load a YAML or JSON bundle of records in a single transaction
    Load {
        file: PathBuf,
    },
    /// Print a reference code table
    Codes {
        #[command(subcommand)]
        table: CodeTable,
    },
    /// Show stored records
    Show {
        #[command(subcommand)]
        command: ShowCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Create the database and its tables if missing
    Init,
}

#[derive(Subcommand)]
enum CodeTable {
    Chambers,
    BillTypes,
    SubjectStatuses,
    /// Advisory procedural action codes
    Actions,
}

#[derive(Subcommand)]
enum ShowCommands {
    /// A bill with its sponsors, subjects, actions and amendments
    Bill { id: i64 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
        Commands::Codes { table } => print_codes(table),
        Commands::Db { command } => match command {
            DbCommands::Init => {
                let conn = open_db(&cli.config, cli.db)?;
                let path = conn.path().unwrap_or_default().to_string();
                println!("Database ready at {path}");
                Ok(())
            }
        },
        Commands::Load { file } => {
            let conn = open_db(&cli.config, cli.db)?;
            let bundle = db::read_bundle(&file)?;
            let report = db::load_bundle(&conn, &bundle)
                .with_context(|| format!("loading {}", file.display()))?;
            println!("Loaded {} rows from {}", report.rows, file.display());
            Ok(())
        }
        Commands::Show { command } => match command {
            ShowCommands::Bill { id } => {
                let conn = open_db(&cli.config, cli.db)?;
                let Some(detail) = db::bill_detail(&conn, id)? else {
                    bail!("bill {id} not found");
                };
                println!("{}", serde_json::to_string_pretty(&detail)?);
                Ok(())
            }
        },
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn open_db(config_path: &Path, db_override: Option<PathBuf>) -> Result<rusqlite::Connection> {
    let mut config = TracConfig::load_or_default(config_path)?;
    if let Some(path) = db_override {
        config.database.path = path;
    }
    let conn = db::open_with(&config.database)
        .with_context(|| format!("opening {}", config.database.path.display()))?;
    Ok(conn)
}

fn print_codes(table: CodeTable) -> Result<()> {
    let rows: Vec<(&str, &str)> = match table {
        CodeTable::Chambers => Chamber::ALL.iter().map(|c| (c.code(), c.label())).collect(),
        CodeTable::BillTypes => BillType::ALL.iter().map(|t| (t.code(), t.label())).collect(),
        CodeTable::SubjectStatuses => SubjectStatus::ALL
            .iter()
            .map(|s| (s.code(), s.label()))
            .collect(),
        CodeTable::Actions => codes::ACTION_CODES.to_vec(),
    };
    for (code, label) in rows {
        println!("{code:<8} {label}");
    }
    Ok(())
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    let schemas = [
        ("User", schema_for!(schema::User)),
        ("Politician", schema_for!(schema::Politician)),
        ("Bill", schema_for!(schema::Bill)),
        ("Amendment", schema_for!(schema::Amendment)),
        ("Subject", schema_for!(schema::Subject)),
        ("Committee", schema_for!(schema::Committee)),
        ("Sponsorship", schema_for!(schema::Sponsorship)),
        ("CommitteeMembership", schema_for!(schema::CommitteeMembership)),
        ("BillSubject", schema_for!(schema::BillSubject)),
        ("Action", schema_for!(schema::Action)),
        ("LegislativeBundle", schema_for!(schema::LegislativeBundle)),
    ];

    for (name, schema) in schemas {
        let json = serde_json::to_string_pretty(&schema)?;
        fs::write(out_dir.join(format!("{name}.schema.json")), json)?;
    }

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}
