// SPDX-License-Identifier: AGPL-3.0
// Estate Finder CLI - Argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use estate_finder_core::{CandidateKind, SettingsOverrides};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "estate-finder",
    version,
    about = "Pick a city, area or locality to browse listings in"
)]
pub struct Cli {
    /// Use this API base URL for this run only
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Use this search debounce (milliseconds) for this run only
    #[arg(long, global = true)]
    pub debounce_ms: Option<u64>,

    /// Keep settings and session files in this directory
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            api_base_url: self.api_url.clone(),
            debounce_ms: self.debounce_ms,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search interactively; each input line is the field's new text.
    ///
    /// `:pick N` selects the N-th result, `:clear` empties the field,
    /// `:reload` refetches the list and `:quit` exits.
    Search {
        #[arg(value_enum)]
        kind: KindArg,

        /// Print updates as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Replace the current selection
    Select {
        #[arg(long)]
        city_id: i64,

        #[arg(long)]
        city: String,

        #[arg(long, requires = "area")]
        area_id: Option<i64>,

        #[arg(long, requires = "area_id")]
        area: Option<String>,

        #[arg(long)]
        locality: Option<String>,
    },

    /// Show the current selection
    Show {
        #[arg(long)]
        json: bool,
    },

    /// List recent locations
    Recent {
        /// Forget all recent locations
        #[arg(long)]
        clear: bool,
    },

    /// Show settings and where they are stored
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    City,
    Area,
    Locality,
}

impl From<KindArg> for CandidateKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::City => CandidateKind::City,
            KindArg::Area => CandidateKind::Area,
            KindArg::Locality => CandidateKind::Locality,
        }
    }
}
