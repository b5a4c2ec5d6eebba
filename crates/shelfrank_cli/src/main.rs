//! Command-line entry point for ShelfRank.
//!
//! # Responsibility
//! - Drive the core import and recommendation use-cases against a SQLite
//!   catalog file.
//! - Print the external JSON shapes; exit nonzero on failure.

use clap::{Parser, Subcommand};
use serde_json::json;
use shelfrank_core::db::open_db;
use shelfrank_core::{
    ImportService, RecommendParams, RecommendService, SqliteCatalogRepository,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Personal reading-history catalog and to-read ranking.
#[derive(Parser, Debug)]
#[command(name = "shelfrank")]
#[command(about = "Import a reading-history export and rank to-read candidates")]
#[command(version)]
struct Cli {
    /// SQLite catalog database file (created on first use).
    #[arg(long, default_value = "shelfrank.db")]
    db: PathBuf,

    /// User the readings belong to.
    #[arg(long, default_value = "me")]
    user: String,

    /// Directory for rolling log files; logging is off when omitted.
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a CSV reading-history export into the catalog.
    Import {
        /// Path to the CSV export file.
        csv: PathBuf,
    },
    /// Score and rank the to-read shelf.
    Recommend {
        /// Maximum items returned; zero yields an empty list.
        #[arg(long, default_value_t = 10)]
        limit: i64,
        /// Weight of the author affinity component.
        #[arg(long, default_value_t = 0.35)]
        w_author: f64,
        /// Weight of the publication-year component.
        #[arg(long, default_value_t = 0.25)]
        w_year: f64,
        /// Weight of the page-length component.
        #[arg(long, default_value_t = 0.20)]
        w_pages: f64,
        /// Shrinkage strength for per-author affinity.
        #[arg(long, default_value_t = 2.0)]
        k_author: f64,
        /// Shrinkage strength for per-year preference.
        #[arg(long, default_value_t = 2.0)]
        k_year: f64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = shelfrank_core::init_logging(shelfrank_core::default_log_level(), log_dir)
        {
            eprintln!("shelfrank: logging init failed: {err}");
            return ExitCode::FAILURE;
        }
        if let Some((level, dir)) = shelfrank_core::logging_status() {
            eprintln!("shelfrank: logging {level} to {}", dir.display());
        }
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("shelfrank: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let mut conn = open_db(&cli.db).map_err(|err| format!("cannot open {}: {err}", cli.db.display()))?;

    match &cli.command {
        Command::Import { csv } => {
            let bytes = std::fs::read(csv)
                .map_err(|err| format!("cannot read {}: {err}", csv.display()))?;

            match ImportService::new(&mut conn).import_csv(&cli.user, &bytes) {
                Ok(summary) => {
                    let mut body = serde_json::to_value(summary)
                        .map_err(|err| format!("cannot encode summary: {err}"))?;
                    body["ok"] = json!(true);
                    println!("{body}");
                    Ok(())
                }
                Err(err) => {
                    println!("{}", json!({ "ok": false, "error": err.to_string() }));
                    Err(err.to_string())
                }
            }
        }
        Command::Recommend {
            limit,
            w_author,
            w_year,
            w_pages,
            k_author,
            k_year,
        } => {
            let params = RecommendParams {
                limit: *limit,
                w_author: *w_author,
                w_year: *w_year,
                w_pages: *w_pages,
                k_author: *k_author,
                k_year: *k_year,
                ..RecommendParams::default()
            };

            let service = RecommendService::new(SqliteCatalogRepository::new(&conn));
            let result = service
                .recommend_to_read(&cli.user, &params)
                .map_err(|err| err.to_string())?;
            let body = serde_json::to_string_pretty(&result)
                .map_err(|err| format!("cannot encode recommendation: {err}"))?;
            println!("{body}");
            Ok(())
        }
    }
}
