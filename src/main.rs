//! sqlineage CLI - SQL lineage extraction and impact analysis

use clap::{Parser, Subcommand};
use sqlineage::adapter;
use sqlineage::config::{self, LineageConfig};
use sqlineage::ingest::{read_batch_file, BatchIngestor, IngestCoordinator};
use sqlineage::query::ImpactAnalyzer;
use sqlineage::sentinel;
use sqlineage::storage::{GraphStore, SqliteStore};
use sqlineage::ui::{self, Icons};
use sqlineage::Extractor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sqlineage")]
#[command(version = "0.1.0")]
#[command(about = "SQL lineage extraction and impact graph")]
#[command(long_about = r#"
sqlineage derives table- and column-level lineage from SQL statements and
answers "if this column disappears, what breaks downstream?".

Example usage:
  sqlineage submit --sql "INSERT INTO report SELECT o.amount AS total FROM orders o"
  sqlineage ingest --file jobs.jsonl
  sqlineage impact --table orders --column amount
  sqlineage serve --port 8000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Directory of a static frontend to serve
        #[arg(long)]
        static_dir: Option<String>,
    },

    /// Queue one statement and wait for it to be merged
    Submit {
        /// SQL statement
        #[arg(short, long)]
        sql: String,
    },

    /// Ingest a batch file (table-level lineage)
    Ingest {
        /// Batch file: .jsonl/.ndjson with `sql_text`, or one statement per line
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Analyze the downstream impact of removing a column
    Impact {
        #[arg(short, long)]
        table: String,

        #[arg(long)]
        column: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Schema sentinel: exit non-zero if removing the column breaks downstream tables
    Check {
        #[arg(short, long)]
        table: String,

        #[arg(long)]
        column: String,
    },

    /// Print the lineage graph
    Graph {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show statistics about the lineage graph
    Stats,
}

fn open_store(config: &LineageConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let path = config.database_path();
    config::ensure_db_dir(&path)?;
    Ok(Arc::new(SqliteStore::open(&path)?))
}

fn extractor(config: &LineageConfig) -> Extractor {
    Extractor::new(adapter::default_adapter(config.dialect, config.max_statement_bytes))
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread().enable_all().build()?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut config = config::load_config(Some(&config_path))?;
    if let Some(database) = &cli.database {
        config.database = database.to_string_lossy().into_owned();
    }

    match cli.command {
        Commands::Init { force } => {
            config::write_config(&config_path, &config, force)?;
            config::ensure_db_dir(&config.database_path())?;
            ui::success(&format!("Wrote {}", config_path.display()));
            ui::status(Icons::DATABASE, "Database", &config.database);
        }

        Commands::Serve { port, bind, static_dir } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if static_dir.is_some() {
                config.static_dir = static_dir;
            }

            let store: Arc<dyn GraphStore> = open_store(&config)?;
            ui::header("sqlineage server");
            ui::status(Icons::DATABASE, "Database", &config.database);
            ui::status(Icons::GEAR, "Workers", &config.workers.to_string());

            runtime()?.block_on(async {
                let coordinator = Arc::new(IngestCoordinator::new(
                    Arc::clone(&store),
                    extractor(&config),
                    config.ingest_options(),
                ));
                sqlineage::server::start_server(&config, store, coordinator).await
            })?;
        }

        Commands::Submit { sql } => {
            let store: Arc<dyn GraphStore> = open_store(&config)?;

            let (handle, metrics) = runtime()?.block_on(async {
                let coordinator =
                    IngestCoordinator::new(store, extractor(&config), config.ingest_options());
                let handle = coordinator.submit_lineage(sql).await?;

                let spinner = ui::Spinner::new("Waiting for workers");
                coordinator.shutdown().await;
                spinner.finish_with_message("Done");

                Ok::<_, anyhow::Error>((handle, coordinator.metrics()))
            })?;

            ui::status(Icons::INBOX, "Job", &handle.job_id.to_string());
            println!("{}", ui::metrics_table(&metrics));
            if metrics.failed > 0 {
                ui::warn("Statement was not merged; run with --verbose for details");
            } else {
                ui::success("Lineage merged");
            }
        }

        Commands::Ingest { file } => {
            let store = open_store(&config)?;
            let items = read_batch_file(&file)?;

            ui::header(&format!("Ingesting {}", file.display()));
            let start = Instant::now();
            let mut progress = ui::BatchProgress::new(items.len());

            let ingestor = BatchIngestor::new(store, extractor(&config))
                .with_retry(config.ingest_options().retry);
            let report = ingestor.run_with_progress(&items, |index, outcome| {
                progress.observe(index, outcome)
            });

            progress.finish_with_summary(start.elapsed(), &report);
        }

        Commands::Impact { table, column, format } => {
            let store = open_store(&config)?;
            let report = ImpactAnalyzer::new(&*store).check_impact(&table, &column)?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                ui::status(Icons::COLUMN, "Column", &report.deleted_field);
                if report.is_danger() {
                    println!("{} {}", Icons::DIRECT, ui::dim(report.status.as_str()));
                    for table in &report.impacted_tables {
                        println!("  {} {}", Icons::TABLE, table);
                    }
                    ui::section("Derived columns");
                    for col in &report.impacted_columns {
                        println!("  {} {}", Icons::INDIRECT, col);
                    }
                } else {
                    println!("{} {}", Icons::CHECK, report.status);
                }
            }
        }

        Commands::Check { table, column } => {
            let store = open_store(&config)?;
            ui::status(
                Icons::SHIELD,
                "Schema change",
                &format!("{}.{} is gone", table, column),
            );

            let outcome = sentinel::check_column(&*store, &table, &column)?;
            for line in outcome.render() {
                println!("{}", line);
            }
            if outcome.exit_code() != 0 {
                std::process::exit(outcome.exit_code());
            }
        }

        Commands::Graph { format } => {
            let store = open_store(&config)?;
            let graph = store.read_all()?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&graph.view())?);
            } else if graph.edge_count() == 0 {
                println!("∅ Graph is empty.");
            } else {
                for edge in graph.all_edges() {
                    println!("{}", ui::edge_line(edge));
                }
            }
        }

        Commands::Stats => {
            let store = open_store(&config)?;
            let stats = store.stats()?;

            ui::status(Icons::STATS, "Database", &config.database);
            println!("{}", ui::graph_stats_table(&stats));
        }
    }

    Ok(())
}
