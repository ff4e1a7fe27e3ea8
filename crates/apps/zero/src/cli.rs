//! Command-line interface

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zero")]
#[command(version)]
#[command(about = "Zero mail client: list, triage and compose from the terminal", long_about = None)]
pub struct Cli {
    /// Connection database (defaults to the Zero config directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// User to act as (defaults to the saved session)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Connection to act on (defaults to the saved session)
    #[arg(long, global = true)]
    pub connection: Option<String>,

    /// Use a seeded in-memory mailbox instead of the provider
    #[arg(long, global = true)]
    pub offline: bool,

    /// Compact row layout
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Thread IDs an action applies to
#[derive(Args, Debug)]
pub struct Targets {
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a provider connection and make it the active session
    Connect {
        /// Connection ID
        #[arg(long)]
        id: String,

        /// Mailbox address
        #[arg(long)]
        email: String,

        #[arg(long, default_value = "google")]
        provider: String,

        #[arg(long)]
        access_token: String,

        #[arg(long)]
        refresh_token: String,
    },

    /// List threads in a folder
    List {
        #[arg(short, long, default_value = "inbox")]
        folder: String,

        /// Search query
        #[arg(short, long, default_value = "")]
        query: String,

        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Page size (defaults to the configured size)
        #[arg(long)]
        max: Option<usize>,

        /// Fetch through the web API instead of calling the driver directly
        #[arg(long)]
        remote: bool,
    },

    /// List drafts
    Drafts {
        #[arg(short, long, default_value = "")]
        query: String,

        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Show a full thread
    Show {
        id: String,

        /// Fetch through the web API instead of calling the driver directly
        #[arg(long)]
        remote: bool,
    },

    /// Mark threads as read
    Read(Targets),

    /// Mark threads as unread
    Unread(Targets),

    /// Mark threads as important
    Important(Targets),

    Star(Targets),

    Unstar(Targets),

    /// Move threads out of the inbox
    Archive(Targets),

    /// Move threads to the bin
    Trash(Targets),

    Mute(Targets),

    /// Star the batch unless any thread is starred, then unstar all
    ToggleStar(Targets),

    /// Add and remove labels
    Labels {
        #[arg(long = "add", value_delimiter = ',')]
        add: Vec<String>,

        #[arg(long = "remove", value_delimiter = ',')]
        remove: Vec<String>,

        ids: Vec<String>,
    },

    /// Permanently delete a thread
    Delete { id: String },

    /// Print the composition prompt for a style profile
    Prompt {
        /// Style metrics JSON file
        #[arg(long)]
        metrics: PathBuf,

        /// Draft to refine
        #[arg(long)]
        draft: Option<String>,

        #[arg(long)]
        subject: Option<String>,

        /// Recipient addresses, comma separated
        #[arg(long)]
        to: Option<String>,

        /// Thread being replied to
        #[arg(long)]
        reply_to: Option<String>,

        /// What the email should say
        #[arg(required = true)]
        request: Vec<String>,
    },

    /// Join the early-access waitlist
    Waitlist { email: String },
}
