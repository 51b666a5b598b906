//! neurovault CLI: text to knowledge graph.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use neurovault::config::VaultConfig;
use neurovault::engine::{Engine, ImportReport};
use neurovault::paths::VaultPaths;
use neurovault::sync::{
    ConversationRecord, JsonRecordStore, SummaryRecord, SyncConfig, SyncService,
};

#[derive(Parser)]
#[command(name = "neurovault", version, about = "Text to knowledge graph")]
struct Cli {
    /// Data directory for the graph snapshot and record file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Start without the seed graph.
    #[arg(long, global = true)]
    no_seed: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract entities, relationships and facts without touching the graph.
    Extract {
        /// Text to analyze. Reads stdin when neither text nor --file is given.
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Import text into the generated graph.
    Import {
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Transcript id; repeating an import with the same id is a no-op.
        #[arg(long)]
        import_id: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        /// Print the combined graph as well as the summary.
        #[arg(long)]
        full: bool,
    },

    /// Print the combined graph as JSON.
    Graph,

    /// Delete a node and its edges (seed nodes are tombstoned).
    DeleteNode { node_id: String },

    /// Remove all generated data and hide the seed graph.
    Clear {
        #[arg(long)]
        user_id: Option<String>,
    },

    /// Remove duplicate node and edge ids from the generated graph.
    Dedup,

    /// Store a conversation or summary in the record file.
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Run one sync pass over the record file and the graph.
    Sync {
        /// Record file (defaults to `records_file` in the data directory).
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// Run the periodic sync loop until Ctrl+C.
    #[cfg(feature = "daemon")]
    Daemon {
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// Show engine info and graph statistics.
    Info,

    /// Manage the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum RecordAction {
    /// Add a conversation.
    Conversation {
        id: String,
        user_message: String,
        #[arg(default_value = "")]
        ai_response: String,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        /// Also import the exchange into the graph.
        #[arg(long)]
        import: bool,
    },
    /// Add a summary.
    Summary {
        id: String,
        content: String,
        #[arg(long)]
        import: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file if none exists.
    Init,
    /// Print the effective configuration.
    Show,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = VaultPaths::resolve()?;
    let config_path = paths.config_file();
    let mut config = VaultConfig::load_or_default(&config_path)?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if cli.no_seed {
        config.include_seed_graph = false;
    }
    let open_engine = || -> Result<Engine> { Ok(Engine::new(config.to_engine_config(&paths))?) };

    match cli.command {
        Commands::Extract { text, file } => {
            let text = read_input(text, file)?;
            let engine = open_engine()?;
            print_json(&engine.extract_entities_and_relationships(&text))?;
        }

        Commands::Import {
            text,
            file,
            import_id,
            user_id,
            full,
        } => {
            let text = read_input(text, file)?;
            let engine = open_engine()?;
            let report =
                engine.generate_graph_from_text(&text, import_id.as_deref(), user_id.as_deref());
            if full {
                print_json(&report)?;
            } else {
                print_import_summary(&report);
            }
        }

        Commands::Graph => {
            let engine = open_engine()?;
            print_json(&engine.get_combined_graph())?;
        }

        Commands::DeleteNode { node_id } => {
            let engine = open_engine()?;
            let report = engine.delete_node(&node_id);
            if report.nodes_removed == 0 {
                println!("No node with id \"{node_id}\".");
            } else {
                let kind = if report.tombstoned { "seed" } else { "generated" };
                println!(
                    "Deleted {kind} node \"{node_id}\" and {} edge(s).",
                    report.edges_removed
                );
            }
            warn_persist(report.persist_warning.as_deref());
        }

        Commands::Clear { user_id } => {
            let engine = open_engine()?;
            let report = engine.clear_all_graph_data(user_id.as_deref());
            println!(
                "Cleared {} node(s) and {} edge(s).",
                report.nodes_removed, report.edges_removed
            );
            print_json(&report.breakdown)?;
            warn_persist(report.persist_warning.as_deref());
        }

        Commands::Dedup => {
            let engine = open_engine()?;
            let report = engine.deduplicate();
            println!(
                "Removed {} duplicate node(s) and {} duplicate edge(s).",
                report.nodes_removed, report.edges_removed
            );
            warn_persist(report.persist_warning.as_deref());
        }

        Commands::Record { action } => {
            let engine = open_engine()?;
            let records = JsonRecordStore::open(config.records_path(&paths))?;
            match action {
                RecordAction::Conversation {
                    id,
                    user_message,
                    ai_response,
                    topic,
                    user_id,
                    import,
                } => {
                    let mut record = ConversationRecord::new(&id, &user_message, &ai_response);
                    record.topic = topic;
                    record.user_id = user_id;
                    records.add_conversation(record.clone())?;
                    println!("Stored conversation \"{id}\".");
                    if import {
                        print_import_summary(&engine.import_conversation(&record));
                    }
                }
                RecordAction::Summary { id, content, import } => {
                    let record = SummaryRecord::new(&id, &content);
                    records.add_summary(record.clone())?;
                    println!("Stored summary \"{id}\".");
                    if import {
                        print_import_summary(&engine.import_summary(&record));
                    }
                }
            }
        }

        Commands::Sync { records } => {
            let engine = open_engine()?;
            let mut service = sync_service(&engine, &config, &paths, records)?;
            print_json(&service.run_pass())?;
        }

        #[cfg(feature = "daemon")]
        Commands::Daemon { records } => {
            use neurovault::sync::daemon::SyncDaemon;

            let engine = open_engine()?;
            let service = sync_service(&engine, &config, &paths, records)?;
            let daemon = SyncDaemon::new(service);
            let handle = daemon.handle();

            let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
            let stopped = runtime.block_on(async move {
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("received shutdown signal");
                        handle.stop();
                    }
                });
                daemon.run().await
            });
            match stopped {
                Some(service) => {
                    println!("Sync daemon stopped after {} pass(es).", service.passes())
                }
                None => miette::bail!("sync daemon stopped after a failed pass"),
            }
        }

        Commands::Info => {
            let engine = open_engine()?;
            let info = engine.info();
            println!("neurovault {}", env!("CARGO_PKG_VERSION"));
            match &info.snapshot_path {
                Some(path) => println!("  snapshot:   {}", path.display()),
                None => println!("  snapshot:   (memory only)"),
            }
            println!("  seed graph: {}", info.seed_graph);
            println!(
                "  seed:       {} nodes, {} edges ({} tombstoned)",
                info.stats.seed_nodes, info.stats.seed_edges, info.stats.tombstones
            );
            println!(
                "  generated:  {} nodes, {} edges",
                info.stats.generated_nodes, info.stats.generated_edges
            );
            println!(
                "  visible:    {} nodes, {} edges",
                info.stats.visible_nodes, info.stats.visible_edges
            );
            println!("  imports:    {}", info.stats.import_sequence);
        }

        Commands::Config { action } => match action {
            ConfigAction::Init => {
                if config_path.exists() {
                    println!("Config already exists at {}", config_path.display());
                } else {
                    VaultConfig::default().save(&config_path)?;
                    println!("Wrote default config to {}", config_path.display());
                }
            }
            ConfigAction::Show => {
                println!("# {}", config_path.display());
                print!("{}", toml::to_string_pretty(&config).into_diagnostic()?);
            }
        },
    }

    Ok(())
}

fn read_input(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (text, file) {
        (_, Some(path)) => std::fs::read_to_string(&path).into_diagnostic(),
        (Some(text), None) => Ok(text),
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
            Ok(buf)
        }
    }
}

fn sync_service(
    engine: &Engine,
    config: &VaultConfig,
    paths: &VaultPaths,
    records: Option<PathBuf>,
) -> Result<SyncService> {
    let path = records.unwrap_or_else(|| config.records_path(paths));
    let records = Arc::new(JsonRecordStore::open(path)?);
    Ok(SyncService::new(
        records.clone(),
        records,
        Arc::clone(engine.store()),
        SyncConfig {
            interval: config.sync_interval(),
            check_interval: config.sync_check_interval(),
        },
    ))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn print_import_summary(report: &ImportReport) {
    match &report.import_key {
        Some(key) => println!(
            "Imported {key}: {} entities, {} relationships ({} new nodes, {} new edges, {} dropped).",
            report.entities_created,
            report.relationships_created,
            report.nodes_added,
            report.edges_added,
            report.relationships_dropped
        ),
        None => println!("No entities found; graph unchanged."),
    }
    for fact in &report.facts {
        println!("  fact: {fact}");
    }
    warn_persist(report.persist_warning.as_deref());
}

fn warn_persist(warning: Option<&str>) {
    if let Some(warning) = warning {
        eprintln!("warning: change applied in memory but not saved: {warning}");
    }
}
