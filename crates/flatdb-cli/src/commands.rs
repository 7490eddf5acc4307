use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use flatdb_logs::{spawn_rotation, LogEntry, LogKind, LogManager, Rotation};
use flatdb_store::{Document, DocumentStore, FileDocumentStore};
use serde::Serialize;

use crate::cli::*;
use crate::config::FlatdbConfig;

pub fn run_command(cli: Cli, config: FlatdbConfig) -> anyhow::Result<()> {
    let format = cli.format;
    let store = FileDocumentStore::new(config.store);
    let logs = LogManager::new(config.logs);

    match cli.command {
        Command::Init(args) => cmd_init(&store, &logs, args),
        Command::Collections => cmd_collections(&store, format),
        Command::Ls(args) => cmd_ls(&store, args, format),
        Command::Get(args) => cmd_get(&store, args, format),
        Command::Create(args) => cmd_create(&store, args),
        Command::Update(args) => cmd_update(&store, args),
        Command::Rm(args) => cmd_rm(&store, args),
        Command::Log(args) => cmd_log(logs, args.action, format),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_document(json: &str) -> anyhow::Result<Document> {
    Document::parse(json).context("document must be a JSON object")
}

fn cmd_init(store: &FileDocumentStore, logs: &LogManager, args: InitArgs) -> anyhow::Result<()> {
    logs.ensure_dir()
        .with_context(|| format!("creating {}", logs.dir().display()))?;
    for collection in &args.collections {
        store.ensure_collection(collection)?;
        println!("  {} {}", "collection:".green(), collection);
    }
    println!(
        "{} Initialized flatdb (data: {}, logs: {})",
        "✓".green().bold(),
        store.root().display().to_string().bold(),
        logs.dir().display().to_string().bold()
    );
    Ok(())
}

fn cmd_collections(store: &FileDocumentStore, format: OutputFormat) -> anyhow::Result<()> {
    let collections = store.list_collections()?;
    match format {
        OutputFormat::Json => print_json(&collections),
        OutputFormat::Text => {
            if collections.is_empty() {
                println!("No collections.");
            }
            for name in &collections {
                println!("{}", name.cyan());
            }
            Ok(())
        }
    }
}

fn cmd_ls(store: &FileDocumentStore, args: CollectionArgs, format: OutputFormat) -> anyhow::Result<()> {
    let keys = store.list(&args.collection)?;
    match format {
        OutputFormat::Json => print_json(&keys),
        OutputFormat::Text => {
            if keys.is_empty() {
                println!("No records in {}.", args.collection.cyan());
            }
            for key in &keys {
                println!("{}", key);
            }
            Ok(())
        }
    }
}

fn cmd_get(store: &FileDocumentStore, args: RecordArgs, format: OutputFormat) -> anyhow::Result<()> {
    let document = store.read(&args.collection, &args.key)?;
    match format {
        OutputFormat::Json => print_json(&document),
        OutputFormat::Text => {
            println!("{}/{}", args.collection.cyan(), args.key.yellow().bold());
            for (field, value) in document.as_map() {
                println!("  {}: {}", field.bold(), value);
            }
            Ok(())
        }
    }
}

fn cmd_create(store: &FileDocumentStore, args: WriteArgs) -> anyhow::Result<()> {
    let document = parse_document(&args.json)?;
    store.create(&args.collection, &args.key, &document)?;
    println!(
        "{} Created {}/{}",
        "✓".green().bold(),
        args.collection.cyan(),
        args.key.yellow()
    );
    Ok(())
}

fn cmd_update(store: &FileDocumentStore, args: WriteArgs) -> anyhow::Result<()> {
    let document = parse_document(&args.json)?;
    store.update(&args.collection, &args.key, &document)?;
    println!(
        "{} Updated {}/{}",
        "✓".green().bold(),
        args.collection.cyan(),
        args.key.yellow()
    );
    Ok(())
}

fn cmd_rm(store: &FileDocumentStore, args: RecordArgs) -> anyhow::Result<()> {
    store.delete(&args.collection, &args.key)?;
    println!("Deleted {}/{}", args.collection.cyan(), args.key.yellow());
    Ok(())
}

fn cmd_log(logs: LogManager, action: LogAction, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        LogAction::Watch { interval_secs } => cmd_log_watch(logs, interval_secs),
        LogAction::Append { topic, line } => {
            logs.append(&topic, &line)?;
            Ok(())
        }
        LogAction::List { archives } => {
            let entries: Vec<LogEntry> = logs
                .entries()?
                .into_iter()
                .filter(|e| archives || e.kind == LogKind::Live)
                .collect();
            match format {
                OutputFormat::Json => print_json(&entries),
                OutputFormat::Text => {
                    if entries.is_empty() {
                        println!("No logs.");
                    }
                    for entry in &entries {
                        match entry.kind {
                            LogKind::Live => println!("{}", entry.name.cyan()),
                            LogKind::Archive => {
                                println!("{} {}", entry.name, "(archive)".dimmed())
                            }
                        }
                    }
                    Ok(())
                }
            }
        }
        LogAction::Show { topic } => {
            print!("{}", logs.read_live(&topic)?);
            Ok(())
        }
        LogAction::Compress { topic, archive } => {
            logs.compress(&topic, &archive)?;
            println!(
                "{} Compressed {} into {}",
                "✓".green().bold(),
                topic.cyan(),
                archive.yellow()
            );
            Ok(())
        }
        LogAction::Decompress { archive } => {
            print!("{}", logs.decompress(&archive)?);
            Ok(())
        }
        LogAction::Truncate { topic } => {
            logs.truncate(&topic)?;
            println!("Truncated {}", topic.cyan());
            Ok(())
        }
        LogAction::Rotate { topic: Some(topic) } => {
            let rotation = logs.rotate(&topic)?;
            match format {
                OutputFormat::Json => print_json(&rotation),
                OutputFormat::Text => {
                    print_rotation(&rotation);
                    Ok(())
                }
            }
        }
        LogAction::Rotate { topic: None } => {
            let report = logs.rotate_all()?;
            match format {
                OutputFormat::Json => print_json(&report.rotated)?,
                OutputFormat::Text => {
                    for rotation in &report.rotated {
                        print_rotation(rotation);
                    }
                    for (topic, err) in &report.failed {
                        println!("{} {}: {}", "✗".red().bold(), topic.cyan(), err);
                    }
                    println!("Rotated {} topic(s).", report.archived().to_string().bold());
                }
            }
            if report.failed.is_empty() {
                Ok(())
            } else {
                anyhow::bail!("{} topic(s) failed to rotate", report.failed.len())
            }
        }
    }
}

fn cmd_log_watch(logs: LogManager, interval_secs: Option<u64>) -> anyhow::Result<()> {
    let every = match interval_secs {
        Some(secs) => Some(Duration::from_secs(secs)).filter(|d| !d.is_zero()),
        None => logs.config().rotation_interval(),
    }
    .context("log rotation is disabled; set logs.rotation_interval_secs or --interval-secs")?;
    logs.ensure_dir()
        .with_context(|| format!("creating {}", logs.dir().display()))?;

    println!(
        "Rotating logs in {} every {}s (Ctrl-C to stop)",
        logs.dir().display().to_string().bold(),
        every.as_secs()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(watch_until(Arc::new(logs), every, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        }
    }));
    println!("{} Stopped log rotation.", "✓".green().bold());
    Ok(())
}

/// Run periodic rotation until `stop` completes.
async fn watch_until(logs: Arc<LogManager>, every: Duration, stop: impl Future<Output = ()>) {
    let handle = spawn_rotation(logs, every);
    stop.await;
    handle.shutdown().await;
}

fn print_rotation(rotation: &Rotation) {
    match &rotation.archive {
        Some(archive) => println!(
            "{} {} -> {} ({} bytes)",
            "✓".green().bold(),
            rotation.topic.cyan(),
            archive.yellow(),
            rotation.bytes
        ),
        None => println!("  {} (empty, skipped)", rotation.topic.cyan()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    fn workspace() -> (tempfile::TempDir, FlatdbConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = FlatdbConfig::default().with_overrides(
            Some(dir.path().join("data")),
            Some(dir.path().join("logs")),
        );
        (dir, config)
    }

    fn run(config: &FlatdbConfig, args: &[&str]) -> anyhow::Result<()> {
        let argv = std::iter::once("flatdb").chain(args.iter().copied());
        run_command(Cli::try_parse_from(argv).unwrap(), config.clone())
    }

    fn store(config: &FlatdbConfig) -> FileDocumentStore {
        FileDocumentStore::new(config.store.clone())
    }

    fn logs(config: &FlatdbConfig) -> LogManager {
        LogManager::new(config.logs.clone())
    }

    #[test]
    fn init_creates_directories() {
        let (dir, config) = workspace();
        run(&config, &["init", "users", "orders"]).unwrap();
        assert!(dir.path().join("data/users").is_dir());
        assert!(dir.path().join("data/orders").is_dir());
        assert!(dir.path().join("logs").is_dir());
        assert_eq!(store(&config).list_collections().unwrap(), vec!["orders", "users"]);
    }

    #[test]
    fn record_lifecycle() {
        let (_dir, config) = workspace();
        run(&config, &["init", "users"]).unwrap();

        run(&config, &["create", "users", "u1", r#"{"name":"Ann"}"#]).unwrap();
        let doc = store(&config).read("users", "u1").unwrap();
        assert_eq!(doc.get("name"), Some(&json!("Ann")));
        assert!(run(&config, &["create", "users", "u1", r#"{"name":"Bob"}"#]).is_err());

        run(&config, &["update", "users", "u1", r#"{"name":"Ann","age":31}"#]).unwrap();
        let doc = store(&config).read("users", "u1").unwrap();
        assert_eq!(doc.get("age"), Some(&json!(31)));

        run(&config, &["get", "users", "u1"]).unwrap();
        run(&config, &["ls", "users", "--format", "json"]).unwrap();
        run(&config, &["collections"]).unwrap();

        run(&config, &["rm", "users", "u1"]).unwrap();
        assert!(run(&config, &["get", "users", "u1"]).is_err());
        assert!(run(&config, &["rm", "users", "u1"]).is_err());
    }

    #[test]
    fn write_commands_require_objects() {
        let (_dir, config) = workspace();
        run(&config, &["init", "users"]).unwrap();
        assert!(run(&config, &["create", "users", "u1", "[1,2]"]).is_err());
        assert!(run(&config, &["create", "users", "u1", "not json"]).is_err());
        assert!(store(&config).list("users").unwrap().is_empty());
    }

    #[test]
    fn update_missing_record_fails() {
        let (_dir, config) = workspace();
        run(&config, &["init", "users"]).unwrap();
        assert!(run(&config, &["update", "users", "ghost", "{}"]).is_err());
        assert!(!store(&config).exists("users", "ghost").unwrap());
    }

    #[test]
    fn log_commands() {
        let (_dir, config) = workspace();
        run(&config, &["init"]).unwrap();

        run(&config, &["log", "append", "http", "GET /"]).unwrap();
        run(&config, &["log", "compress", "http", "snap"]).unwrap();
        assert_eq!(logs(&config).decompress("snap").unwrap(), "GET /\n");
        assert!(run(&config, &["log", "compress", "http", "snap"]).is_err());

        run(&config, &["log", "list", "--archives", "--format", "json"]).unwrap();
        run(&config, &["log", "show", "http"]).unwrap();
        run(&config, &["log", "decompress", "snap"]).unwrap();

        run(&config, &["log", "rotate", "http"]).unwrap();
        assert_eq!(logs(&config).read_live("http").unwrap(), "");

        run(&config, &["log", "append", "http", "x"]).unwrap();
        run(&config, &["log", "truncate", "http"]).unwrap();
        assert_eq!(logs(&config).read_live("http").unwrap(), "");
        assert!(run(&config, &["log", "truncate", "missing"]).is_err());
    }

    #[test]
    fn rotate_all_reports_failed_topics() {
        let (dir, config) = workspace();
        run(&config, &["init"]).unwrap();
        run(&config, &["log", "append", "http", "GET /"]).unwrap();
        // Listed as a topic, but its name is rejected by rotate.
        std::fs::write(dir.path().join("logs").join("bad\u{1}.log"), "x\n").unwrap();

        let err = run(&config, &["log", "rotate"]).unwrap_err();
        assert!(err.to_string().contains("1 topic(s) failed to rotate"));
        assert_eq!(logs(&config).read_live("http").unwrap(), "");
    }

    #[test]
    fn rotate_all_on_clean_dir_succeeds() {
        let (_dir, config) = workspace();
        run(&config, &["init"]).unwrap();
        run(&config, &["log", "append", "http", "GET /"]).unwrap();
        run(&config, &["log", "rotate", "--format", "json"]).unwrap();
        let archives = logs(&config)
            .entries()
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == LogKind::Archive)
            .count();
        assert_eq!(archives, 1);
    }

    #[test]
    fn watch_refuses_disabled_rotation() {
        let (_dir, mut config) = workspace();
        config.logs.rotation_interval_secs = 0;
        assert!(run(&config, &["log", "watch"]).is_err());
        assert!(run(&config, &["log", "watch", "--interval-secs", "0"]).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn watch_rotates_until_stopped() {
        let (_dir, config) = workspace();
        let manager = Arc::new(logs(&config));
        manager.ensure_dir().unwrap();
        manager.append("http", "GET /").unwrap();

        watch_until(
            Arc::clone(&manager),
            Duration::from_millis(20),
            tokio::time::sleep(Duration::from_millis(150)),
        )
        .await;

        assert_eq!(manager.read_live("http").unwrap(), "");
        assert_eq!(manager.list(true).unwrap().len(), 2);
    }
}
