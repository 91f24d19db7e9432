//! Vitrine CLI: resolves Madek content the way the player does and prints it.
//!
//! Set MADEK_API_URL (or API_URL), MADEK_API_USER and MADEK_API_PASSWORD.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use vitrine_api_client::{ApiClient, MediaEntryQuery, Program, ResolveOptions};
use vitrine_cli::{init_tracing, CollectionSummary, EntrySummary};
use vitrine_core::PlayerConfig;

#[derive(Parser)]
#[command(name = "vitrine", about = "Resolve Madek collections, listings and programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a collection with its entries
    Collection {
        /// Collection UUID
        id: String,
        /// Meta keys to sort entries on, in priority order
        #[arg(long = "sort-on")]
        sort_on: Vec<String>,
    },
    /// Resolve a media-entry listing
    Entries {
        /// API path of the listing (defaults to the newest public entries)
        #[arg(long)]
        path: Option<String>,
        /// Restrict the listing to a collection
        #[arg(long)]
        collection: Option<String>,
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,
        /// Download the playback previews
        #[arg(long)]
        preload: bool,
    },
    /// Resolve a single media entry by UUID or API path
    Entry {
        id: String,
        #[arg(long)]
        preload: bool,
    },
    /// Load a program definition (JSON) and print its playlist
    Program {
        file: PathBuf,
        #[arg(long)]
        preload: bool,
    },
}

#[derive(Serialize)]
struct ProgramSummary {
    name: String,
    web_url: String,
    entries: Vec<EntrySummary>,
    follow_up: Option<String>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize summary")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = PlayerConfig::from_env().context(
        "Failed to load configuration. Set MADEK_API_URL, MADEK_API_USER and MADEK_API_PASSWORD",
    )?;
    let client = ApiClient::from_config(config);

    client.start_session().context("Failed to open API session")?;
    let result = run(&client, cli.command).await;
    let requests = client.complete_session();
    tracing::debug!(requests, "Session closed");
    result
}

async fn run(client: &ApiClient, command: Commands) -> anyhow::Result<()> {
    let config = client.config();
    match command {
        Commands::Collection { id, sort_on } => {
            let collection = client
                .load_collection(&id)
                .await?
                .with_context(|| format!("Collection {} not available", id))?;
            let mut collection = (*collection).clone();
            if !sort_on.is_empty() {
                collection.sort_on(&sort_on);
            }
            print_json(&CollectionSummary::new(&collection, config))?;
        }
        Commands::Entries {
            path,
            collection,
            limit,
            preload,
        } => {
            let path = path.unwrap_or_else(|| {
                let query = MediaEntryQuery::default();
                match collection {
                    Some(id) => query.in_collection(id).url(),
                    None => query.url(),
                }
            });
            let options = ResolveOptions {
                meta_data_white_list: None,
                preload_media: preload,
            };
            let entries = client.get_media_entries(&path, limit, &options).await?;
            let summaries: Vec<_> = entries
                .iter()
                .map(|e| EntrySummary::new(e, config))
                .collect();
            print_json(&summaries)?;
        }
        Commands::Entry { id, preload } => {
            let options = ResolveOptions {
                meta_data_white_list: None,
                preload_media: preload,
            };
            let entry = client
                .get_media_entry(&id, &options)
                .await?
                .with_context(|| format!("Media entry {} not available or not playable", id))?;
            print_json(&EntrySummary::new(&entry, config))?;
        }
        Commands::Program { file, preload } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let json: serde_json::Value =
                serde_json::from_str(&raw).context("Program file is not valid JSON")?;
            let mut program = Program::from_json(&json)?;
            program.load(client, preload).await?;

            let entries = program
                .playlist()
                .iter()
                .map(|e| match &program.meta_keys {
                    Some(keys) => EntrySummary::with_keys(e, keys),
                    None => EntrySummary::new(e, config),
                })
                .collect();
            print_json(&ProgramSummary {
                name: program.name.clone(),
                web_url: program.web_url(),
                entries,
                follow_up: program.follow_up().map(|p| p.name),
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_needs_no_environment() {
        let err = Cli::try_parse_from(["vitrine", "--help"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn entries_arguments() {
        let cli = Cli::try_parse_from(["vitrine", "entries", "--limit", "5", "--preload"]).unwrap();
        match cli.command {
            Commands::Entries {
                path,
                collection,
                limit,
                preload,
            } => {
                assert!(path.is_none() && collection.is_none());
                assert_eq!(limit, Some(5));
                assert!(preload);
            }
            _ => panic!("expected entries"),
        }
    }
}
