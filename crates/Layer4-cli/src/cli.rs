//! 명령줄 정의

use clap::{Parser, Subcommand};
use reel_core::{ListState, Method};
use std::path::PathBuf;

/// Reel - plugin host administration
#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Host home directory (defaults to the user config dir)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List plugins (local, market or both)
    List {
        #[arg(long, default_value = "all")]
        state: ListState,

        /// Bypass the market index cache
        #[arg(long)]
        force: bool,
    },

    /// Show installed plugin ids
    Installed,

    /// Show per-plugin install counts
    Statistic,

    /// Read or write plugin configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Reload a plugin and re-register its routes
    Reload { id: String },

    /// Install a plugin
    Install {
        id: String,

        /// Source repository (github URL, github:owner/repo or local path)
        #[arg(long)]
        repo_url: Option<String>,

        /// Download even if the code is already present
        #[arg(long)]
        force: bool,
    },

    /// Uninstall a plugin
    Uninstall { id: String },

    /// Clear a plugin's config and data, then reload it
    Reset { id: String },

    /// Clone a plugin under a new id
    Clone {
        id: String,

        #[arg(long)]
        suffix: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        version: Option<String>,

        #[arg(long)]
        icon: Option<String>,
    },

    /// Manage plugin folders
    Folders {
        #[command(subcommand)]
        action: FolderAction,
    },

    /// Show the route table
    Routes,

    /// Dispatch a request through the route table
    Call {
        path: String,

        #[arg(long, default_value = "GET")]
        method: Method,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        token: Option<String>,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },

    /// Show a plugin's config form
    Form { id: String },

    /// Show a plugin's detail page
    Page { id: String },

    /// List dashboards, or render one
    Dashboard { id: Option<String>, key: Option<String> },

    /// Resolve a plugin static file
    File { id: String, path: String },

    /// List federation remotes of running Vue plugins
    Remotes {
        #[arg(long)]
        token: String,
    },

    /// Back up plugin code (container mode)
    Backup,

    /// Restore plugin code from backup (container mode)
    Restore {
        /// Restore even if the plugins dir looks intact
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the stored config
    Get { id: String },

    /// Replace the config with a JSON object and reload
    Set { id: String, json: String },
}

#[derive(Subcommand, Debug)]
pub enum FolderAction {
    /// Print all folders
    List,

    /// Create an empty folder
    Create { name: String },

    /// Delete a folder
    Delete { name: String },

    /// Replace a folder's plugin list
    Set { name: String, ids: Vec<String> },
}
