//! CLI module - Command-line interface for the Ad Library browser
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Ad Library Browser - search backend for the Facebook Ad Library
#[derive(Parser)]
#[command(name = "ad-library-browser")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    #[command(alias = "daemon", alias = "web")]
    Serve,

    /// Search the Ad Library from the terminal
    #[command(alias = "s")]
    Search {
        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,

        /// Comma-separated country codes
        #[arg(short, long, default_value = "US")]
        country: String,

        /// Maximum number of ads to fetch
        #[arg(short, long)]
        limit: Option<String>,

        /// ALL, IMAGE, MEME, VIDEO or NONE
        #[arg(long)]
        media_type: Option<String>,

        /// ACTIVE, ALL or INACTIVE
        #[arg(long)]
        active_status: Option<String>,

        /// Match the terms as an exact phrase
        #[arg(long)]
        exact: bool,
    },

    /// Check that the configured token can reach the Ad Library API
    #[command(alias = "test")]
    TestConnection,

    /// Print the effective configuration with secrets masked
    Config,

    /// Create default config file
    Init,
}

pub use commands::*;
