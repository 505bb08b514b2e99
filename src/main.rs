mod config;
mod error;
mod export;
mod extract;
mod models;
mod pipeline;
mod schedule;
mod schema;
mod scraper;
mod specs;
mod storage;
mod utils;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::models::{TableType, Unit};
use crate::pipeline::{BatchReport, Pipeline, RetryPolicy, TableJob};
use crate::schedule::{GameId, GameType, ScheduleClient, season_game_ids};
use crate::scraper::{HttpFetcher, PageFetcher};
use crate::specs::Catalog;
use crate::storage::Repository;

#[derive(Parser)]
#[command(name = "hockey-etl", about = "NHL game report ETL", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct RunArgs {
    /// Table to extract from each game report
    #[arg(short, long, value_enum, default_value_t = TableType::Skaters)]
    table: TableType,

    /// Fail units whose table violates its schema
    #[arg(long)]
    strict: bool,

    /// Units processed at once
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Also write one CSV per unit into this directory
    #[arg(long)]
    csv_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape specific games, e.g. 2021020001
    Games {
        #[arg(required = true)]
        ids: Vec<GameId>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Scrape a whole season (start year, e.g. 2021 for 2021-2022)
    Season {
        year: u16,

        /// Number of games; looked up from the schedule API when omitted
        #[arg(short, long)]
        games: Option<u32>,

        #[arg(long, value_enum, default_value_t = GameType::Regular)]
        game_type: GameType,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Scrape every game played between two dates (inclusive)
    Dates {
        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the schema of every table type
    Schemas,

    /// Show database statistics
    Stats,

    /// Apply schema migrations without loading data
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "hockey_etl=info,warn",
        1 => "hockey_etl=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = AppConfig::load()?;
    let catalog = Catalog::standard().context("Invalid table definitions")?;

    match cli.command {
        Command::Games { ids, run } => {
            apply_overrides(&mut config, &run)?;
            let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config.fetcher)?);
            scrape("games", &config, &catalog, fetcher, &ids, &run).await?;
        }

        Command::Season { year, games, game_type, run } => {
            apply_overrides(&mut config, &run)?;
            let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config.fetcher)?);
            let n_games = match games {
                Some(n) => n,
                None => {
                    ScheduleClient::new(fetcher.as_ref(), &config.fetcher.schedule_base_url)
                        .total_games(year, game_type)
                        .await?
                }
            };
            let ids = season_game_ids(year, game_type, n_games)?;
            scrape("season", &config, &catalog, fetcher, &ids, &run).await?;
        }

        Command::Dates { start, end, run } => {
            apply_overrides(&mut config, &run)?;
            let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(&config.fetcher)?);
            let ids = ScheduleClient::new(fetcher.as_ref(), &config.fetcher.schedule_base_url)
                .game_ids_between(start, end)
                .await?;
            if ids.is_empty() {
                println!("No games between {} and {}.", start, end);
                return Ok(());
            }
            scrape("dates", &config, &catalog, fetcher, &ids, &run).await?;
        }

        Command::Schemas => {
            for table_type in TableType::ALL {
                let Some(schema) = catalog.schema(table_type) else { continue };
                println!("{}", table_type);
                for column in &schema.columns {
                    let constraints: Vec<String> = column.constraints.iter().map(|c| c.to_string()).collect();
                    println!(
                        "  {:<14} {:<8} {:<9} {}",
                        column.name,
                        column.ty.to_string(),
                        if column.nullable { "nullable" } else { "" },
                        constraints.join(", ")
                    );
                }
            }
        }

        Command::Stats => {
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;
            let stats = repo.stats()?;
            println!("─────────────────────────────────");
            println!("  Hockey ETL — Database Stats");
            println!("─────────────────────────────────");
            for t in &stats.tables {
                println!(
                    "  {:<12}: {} rows / {} games",
                    t.table_type.as_str(),
                    utils::fmt_count(t.rows),
                    utils::fmt_count(t.units)
                );
            }
            println!("  Runs     : {}", utils::fmt_count(stats.runs));
            println!("  Failures : {}", utils::fmt_count(stats.unit_failures));
            println!("  Violations: {}", utils::fmt_count(stats.violations));
            println!("─────────────────────────────────");
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, run: &RunArgs) -> Result<()> {
    if run.strict {
        config.pipeline.strict = true;
    }
    if let Some(n) = run.concurrency {
        config.pipeline.concurrency = n;
    }
    if let Some(dir) = &run.csv_dir {
        config.storage.csv_dir = Some(dir.clone());
    }
    config.validate()
}

async fn scrape(
    command: &str,
    config: &AppConfig,
    catalog: &Catalog,
    fetcher: Arc<dyn PageFetcher>,
    ids: &[GameId],
    run: &RunArgs,
) -> Result<()> {
    let _t = utils::RunTimer::start(format!("{} {}", command, run.table), ids.len());

    let (Some(source), Some(schema)) = (catalog.source(run.table), catalog.schema(run.table)) else {
        bail!("No definition for table {}", run.table);
    };
    let job = Arc::new(TableJob {
        source: source.clone(),
        schema: schema.clone(),
    });

    let units = ids
        .iter()
        .map(|id| id.unit(&config.fetcher, run.table))
        .collect::<Result<Vec<Unit>, _>>()?;

    let repo = Repository::open(&config.storage.db_path)?;
    if config.storage.run_migrations {
        repo.run_migrations()?;
    }
    let run_id = repo.begin_scrape_run(command, run.table)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, finishing in-flight units");
            ctrl_c.cancel();
        }
    });

    let pipeline = Pipeline::new(fetcher, &config.pipeline, RetryPolicy::from(&config.fetcher));
    let report = pipeline.run_batch(job.clone(), units, &cancel).await;
    let summary = report.summary();

    let persisted = persist(&repo, run_id, &report, &job, config);
    repo.finish_scrape_run(
        run_id,
        &summary,
        persisted.as_ref().err().map(|e| format!("{:#}", e)).as_deref(),
    )?;
    let rows = persisted?;

    println!("─────────────────────────────────");
    println!("  {} {} — run #{}", command, run.table, run_id);
    println!("─────────────────────────────────");
    println!("  Succeeded : {}", summary.succeeded);
    println!("  Partial   : {}", summary.partial);
    println!("  Failed    : {}", summary.failed);
    println!("  Cancelled : {}", summary.cancelled);
    println!("  Aborted   : {}", summary.aborted);
    println!("  Rows      : {}", utils::fmt_count(rows as i64));
    println!("─────────────────────────────────");
    for failure in &summary.failures {
        println!("  {} [{}] {}", failure.unit_id, failure.kind, failure.message);
    }
    for aborted in &report.aborted {
        println!("  {} [aborted] {}", aborted.unit.id, aborted.message);
    }

    Ok(())
}

fn persist(repo: &Repository, run_id: i64, report: &BatchReport, job: &TableJob, config: &AppConfig) -> Result<usize> {
    let rows = repo.record_batch(run_id, report, &job.schema)?;
    if let Some(dir) = &config.storage.csv_dir {
        for (_, unit_report) in report.reports() {
            export::write_table_csv(dir, &unit_report.table)?;
        }
        info!("CSV written to {:?}", dir);
    }
    Ok(rows)
}
