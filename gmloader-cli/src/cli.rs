use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "gmloader",
    about = "Serve bundled games out of a local manifest store",
    long_about = "Intercepts /game/<bundle>/<path> requests and answers them from the bundle\n\
                  manifests held in the local store. Requests outside that namespace fall\n\
                  through to an optional upstream origin.",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "GMLOADER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the manifest store
    #[arg(long, global = true, env = "GMLOADER_STORE_DIR")]
    pub store_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the intercepting server
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "GMLOADER_LISTEN")]
        listen: Option<SocketAddr>,

        /// Origin that receives requests outside /game/
        #[arg(short, long, env = "GMLOADER_UPSTREAM")]
        upstream: Option<String>,

        /// Do not take over on start; wait for a SKIP_WAITING control message
        #[arg(long)]
        wait_for_takeover: bool,
    },

    /// Resolve a single request path against the store and print the result
    Resolve {
        /// Request path, e.g. /game/snake/index.html
        path: String,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}
