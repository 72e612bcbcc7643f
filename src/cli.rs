// SPDX-License-Identifier: MPL-2.0

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "helphero", version, about = "HelpHero data layer tools")]
pub struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search for a location label
    Geocode {
        query: String,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Print cached posts, newest first
    Posts {
        /// Only posts by this author
        #[arg(short, long)]
        author: Option<String>,
        /// Cache database to read
        #[arg(long, conflicts_with = "user")]
        db: Option<PathBuf>,
        /// Read the cache of this signed-in user
        #[arg(long)]
        user: Option<String>,
    },
    /// Shrink and re-encode an image the way uploads are prepared
    PrepareImage { input: PathBuf, output: PathBuf },
}
