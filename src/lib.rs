// Scan History - local store of captured scans with tag filtering
//
// - SQLite-backed scan records with a normalized tag relation
// - Live filtered queries that re-emit after every change
// - History screen adapter and a small CLI around it

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

pub mod config;
pub mod database;
pub mod history;
pub mod state;
pub mod tags;

use config::{Config, DEFAULT_LOG_FILTER};
use database::{NewScanRecord, ScanRecord};
use history::{
    saved_message, FilterChip, HistoryFilter, HistoryPage, HistoryView, Notice, NoticeKind,
};
use state::AppState;

#[derive(Debug, Parser)]
#[command(version, about = "Browse and manage saved scans", rename_all = "kebab")]
pub struct Args {
    /// Database file (defaults to $SCAN_HISTORY_DB, then the user data directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save a scan
    Add {
        image_ref: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
        /// The image was imported from the gallery rather than captured
        #[arg(long)]
        gallery: bool,
    },
    /// Show one scan
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// List scans, newest first
    List {
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List the distinct tags in use
    Tags {
        /// Include how many scans carry each tag
        #[arg(long)]
        counts: bool,
    },
    /// Delete a scan
    Delete { id: i64 },
    /// List stored preferences
    Settings {
        #[arg(long)]
        json: bool,
    },
    /// Follow the history list live until Ctrl-C
    Watch {
        #[arg(long)]
        tag: Option<String>,
    },
}

pub async fn run(args: Args) -> Result<()> {
    // Initialize env_logger to output to stderr (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .format_timestamp_millis()
        .init();

    let config = Config::resolve(args.db)?;
    log::debug!("Using database at {:?}", config.db_path);

    let state = AppState::open(&config)?;
    let outcome = execute(&state, args.command).await;

    if let Err(e) = state.close() {
        log::warn!("Failed to close database cleanly: {}", e);
    }
    outcome
}

async fn execute(state: &AppState, command: Command) -> Result<()> {
    let service = state.service();

    match command {
        Command::Add { image_ref, tags, gallery } => {
            let record = service
                .save_record(NewScanRecord::new(image_ref, tags).from_gallery(gallery))
                .await?;
            println!("{} (id {})", saved_message(record.source()), record.id);
        }
        Command::Show { id, json } => {
            let Some(record) = service.find_record(id).await? else {
                bail!("Scan {} not found", id);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_records(&HistoryPage::new(HistoryFilter::All, vec![record]));
            }
        }
        Command::List { tag, json } => {
            let filter = HistoryFilter::from_tag(tag.as_deref());
            let records: Vec<ScanRecord> = service.records(filter.clone()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_records(&HistoryPage::new(filter, records));
            }
        }
        Command::Tags { counts } => {
            if counts {
                for usage in service.tag_usage().await? {
                    println!("{}\t{}", usage.name, usage.record_count);
                }
            } else {
                for tag in service.tag_index().await? {
                    println!("{}", tag);
                }
            }
        }
        Command::Delete { id } => {
            if service.delete_record(id).await? {
                println!("Scan deleted.");
            } else {
                println!("Scan {} not found, nothing deleted.", id);
            }
        }
        Command::Settings { json } => {
            let settings = service.settings().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                for setting in settings {
                    println!("{} = {} ({}, updated {})", setting.key, setting.value, setting.value_type, setting.updated_at);
                }
            }
        }
        Command::Watch { tag } => {
            let screen = state.open_history_screen(Arc::new(ConsoleView)).await;
            if tag.is_some() {
                screen.set_filter(HistoryFilter::from_tag(tag.as_deref())).await;
            }

            log::info!("Watching scan history, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            screen.close();
        }
    }

    Ok(())
}

fn print_records(page: &HistoryPage) {
    if let Some(message) = page.empty_message() {
        println!("{}", message);
        return;
    }

    for card in page.cards() {
        println!("#{}  {}", card.id, card.image_ref);
        println!("    {}", card.caption);
        if let Some(line) = card.tag_line {
            println!("    {}", line);
        }
    }
}

/// Plain-text history view for `watch`
struct ConsoleView;

impl HistoryView for ConsoleView {
    fn render_page(&self, page: HistoryPage) {
        println!("--- {} ({} scans) ---", page.filter, page.records.len());
        print_records(&page);
    }

    fn render_filters(&self, chips: Vec<FilterChip>) {
        let labels: Vec<String> = chips
            .iter()
            .map(|chip| {
                if chip.selected {
                    format!("[{}]", chip.label)
                } else {
                    chip.label.clone()
                }
            })
            .collect();
        println!("Filters: {}", labels.join(" "));
    }

    fn show_notice(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Info => println!("{}", notice.text),
            NoticeKind::Error => eprintln!("error: {}", notice.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let args = Args::try_parse_from([
            "scan-history", "--db", "/tmp/h.db", "add", "content://1", "--tags", "A, b", "--gallery",
        ]).unwrap();

        assert_eq!(args.db, Some(PathBuf::from("/tmp/h.db")));
        match args.command {
            Command::Add { image_ref, tags, gallery } => {
                assert_eq!(image_ref, "content://1");
                assert_eq!(tags, "A, b");
                assert!(gallery);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_defaults() {
        let args = Args::try_parse_from(["scan-history", "list"]).unwrap();
        assert_eq!(args.db, None);
        assert!(matches!(args.command, Command::List { tag: None, json: false }));
    }

    #[test]
    fn test_db_flag_after_subcommand() {
        let args = Args::try_parse_from(["scan-history", "tags", "--counts", "--db", "x.db"]).unwrap();
        assert_eq!(args.db, Some(PathBuf::from("x.db")));
        assert!(matches!(args.command, Command::Tags { counts: true }));
    }

    #[test]
    fn test_parse_settings() {
        let args = Args::try_parse_from(["scan-history", "settings", "--json"]).unwrap();
        assert!(matches!(args.command, Command::Settings { json: true }));
    }

    #[test]
    fn test_delete_requires_numeric_id() {
        assert!(Args::try_parse_from(["scan-history", "delete", "abc"]).is_err());
    }

    #[tokio::test]
    async fn test_execute_add_list_delete() {
        let state = AppState::from_manager(database::DatabaseManager::open_in_memory().unwrap());

        execute(&state, Command::Add {
            image_ref: "img".to_string(),
            tags: "Alice".to_string(),
            gallery: false,
        }).await.unwrap();

        let records = state.service().records(HistoryFilter::All).await.unwrap();
        assert_eq!(records.len(), 1);

        execute(&state, Command::List { tag: Some("Alice".to_string()), json: true }).await.unwrap();
        execute(&state, Command::Delete { id: records[0].id }).await.unwrap();
        execute(&state, Command::Settings { json: false }).await.unwrap();
        assert!(execute(&state, Command::Show { id: records[0].id, json: false }).await.is_err());

        state.close().unwrap();
    }
}
