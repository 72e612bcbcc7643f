// SPDX-License-Identifier: MPL-2.0

mod cli;

use anyhow::Context;
use clap::Parser;
use helphero::backend::{Direction, NominatimClient};
use helphero::cache::{CacheDb, LocalTable, PostCache};
use helphero::media::prepare_image;
use helphero::models::format_timestamp;
use helphero::state::AppSettings;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => AppSettings::load_from(path),
        None => AppSettings::load(),
    };

    match cli.command {
        Command::Geocode { query, limit } => {
            let rt = helphero::runtime::build()?;
            let client = NominatimClient::new(
                &settings.geocoding.base_url,
                limit.unwrap_or(settings.geocoding.limit),
            )?;
            let places = rt.block_on(client.search(&query))?;
            if places.is_empty() {
                println!("No results found");
            }
            for place in places {
                println!("{:>10.5} {:>10.5}  {}", place.lat, place.lon, place.display_name);
            }
        }
        Command::Posts { author, db, user } => {
            let db = match (db, user) {
                (Some(path), _) => CacheDb::open(&path)?,
                (None, Some(uid)) => CacheDb::open_for_user(&uid)?,
                (None, None) => anyhow::bail!("pass --db <path> or --user <uid>"),
            };
            let cache = PostCache::new(db);
            let posts = match author {
                Some(author) => cache.get_by_secondary_key(&author)?,
                None => cache.get_all(Direction::Descending)?,
            };
            for post in posts {
                println!(
                    "{}  {}  [{}] by {}",
                    format_timestamp(&post.created_at),
                    post.title,
                    post.location,
                    post.author_id
                );
            }
        }
        Command::PrepareImage { input, output } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let blob = prepare_image(&bytes, &settings.media)?;
            std::fs::write(&output, &blob.bytes)
                .with_context(|| format!("writing {}", output.display()))?;
            tracing::info!(
                from = bytes.len(),
                to = blob.len(),
                "wrote {}",
                output.display()
            );
        }
    }

    Ok(())
}
