use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;

use relay_search_lib::config::{self, Config};
use relay_search_lib::indexer::tokenizer::Tokenizer;
use relay_search_lib::indexer::{IndexableMessage, Indexer};
use relay_search_lib::store::PostingStore;
use relay_search_lib::{logging, search, AppError, MemoryStore, Store};

#[derive(Parser, Debug)]
#[command(name = "relay-search")]
#[command(author, version, about = "Keyword search over relayed chat messages", long_about = None)]
struct Args {
    /// Path to the JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index messages from a JSON Lines export
    Index {
        file: PathBuf,
        /// Index into memory only and report what would be written
        #[arg(long)]
        dry_run: bool,
    },
    /// Find the skip-th most recent message matching the keywords
    Search {
        #[arg(allow_hyphen_values = true)]
        chat_id: i64,
        #[arg(required = true, num_args = 1..)]
        keywords: Vec<String>,
        #[arg(long, default_value_t = 0)]
        skip: u32,
    },
    /// Drop every posting of a message
    Forget {
        #[arg(allow_hyphen_values = true)]
        chat_id: i64,
        message_id: i64,
    },
    /// Print index statistics
    Stats,
    /// Delete every posting and rotate the keyword hash key
    Reset,
}

/// One line of an import file.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    chat_id: i64,
    message_id: i64,
    #[serde(default)]
    text: String,
    /// Unix seconds.
    date: i64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run(Args::parse()).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let config_path = args.config.unwrap_or_else(config::default_config_path);
    let config = Config::load(&config_path)?;
    let _logger = logging::init(config.log_dir.as_deref(), &config.log_level)
        .map_err(|e| AppError::Other(format!("failed to initialize logging: {}", e)))?;

    match args.command {
        Command::Index { file, dry_run: true } => {
            let store = MemoryStore::new();
            let indexed = import(&store, &file, config.command_prefix).await?;
            println!(
                "{} messages would produce {} postings",
                indexed,
                store.posting_count()
            );
        }
        Command::Index { file, dry_run: false } => {
            let store = open_store(&config)?;
            let indexed = import(&store, &file, config.command_prefix).await?;
            println!("Indexed {} messages", indexed);
        }
        Command::Search {
            chat_id,
            keywords,
            skip,
        } => {
            let keywords = keywords.join(" ");
            if Tokenizer::new().query_keywords(&keywords).is_empty() {
                return Err(AppError::Other(format!(
                    "nothing left to search for in {:?} after removing stopwords",
                    keywords
                )));
            }
            let store = open_store(&config)?;
            match search::search(&store, chat_id, &keywords, skip, config.hit_ratio).await? {
                Some(hit) => println!(
                    "{}",
                    serde_json::to_string(&hit).map_err(|e| AppError::Other(e.to_string()))?
                ),
                None => println!("No match"),
            }
        }
        Command::Forget {
            chat_id,
            message_id,
        } => {
            let store = open_store(&config)?;
            let removed = store.delete_message(chat_id, message_id).await?;
            println!("Removed {} postings", removed);
        }
        Command::Stats => {
            let store = open_store(&config)?;
            let stats = store.stats()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).map_err(|e| AppError::Other(e.to_string()))?
            );
        }
        Command::Reset => {
            let path = config.db_path();
            log::info!("Resetting index at {}", path.display());
            Store::reset_at(&path)?;
            println!("Index cleared");
        }
    }
    Ok(())
}

fn open_store(config: &Config) -> Result<Store, AppError> {
    let path = config.db_path();
    log::info!("Opening index at {}", path.display());
    Ok(Store::open(&path, &config.store_options())?)
}

/// Index every record in `path`. Returns the number of records read;
/// unparsable lines are logged and skipped.
async fn import<S: PostingStore>(
    store: &S,
    path: &Path,
    command_prefix: char,
) -> Result<usize, AppError> {
    let file = std::fs::File::open(path)
        .map_err(|e| AppError::Other(format!("failed to open {}: {}", path.display(), e)))?;
    let indexer = Indexer::new(store, command_prefix);

    let mut count = 0;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| AppError::Other(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ImportRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping line {}: {}", line_no + 1, e);
                continue;
            }
        };
        indexer
            .record_message(&IndexableMessage {
                chat_id: record.chat_id,
                message_id: record.message_id,
                text: &record.text,
                timestamp: record.date.saturating_mul(1000),
            })
            .await;
        count += 1;
    }
    Ok(count)
}
