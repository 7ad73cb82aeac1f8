//! # freezer-cli
//!
//! Command-line client for the freezer-api session endpoints.
//!
//! ## Commands
//!
//! - `create`: Create a session
//! - `show`, `list`, `delete`: Inspect and remove sessions
//! - `attach`, `detach`: Manage the jobs attached to a session
//! - `start`, `end`: Report job events to the session state machine
//!
//! ## Example
//!
//! ```bash
//! # Create a session with a 5 minute hold-off window
//! freezer-cli create --description "nightly" --hold-off 300
//!
//! # Attach the jobs that take part in it
//! freezer-cli attach <session_id> db-dump --client-id host-a
//!
//! # Report a job start for round 0, then its end
//! freezer-cli start <session_id> db-dump --tag 0
//! freezer-cli end <session_id> db-dump --result success
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;

use client::ApiClient;
use commands::{action, job, session};

/// Command-line client for the freezer-api session endpoints.
#[derive(Parser, Debug)]
#[command(name = "freezer-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the freezer-api server
    #[arg(long, global = true, default_value = "http://127.0.0.1:9090")]
    endpoint: String,

    /// Owner identity sent as X-User-Id (server default when omitted)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a session and print its id
    Create {
        /// Session description
        #[arg(long, short)]
        description: String,

        /// Hold-off window in seconds (server default when omitted)
        #[arg(long)]
        hold_off: Option<i64>,
    },

    /// Print a session as JSON
    Show {
        /// Session id
        session_id: String,
    },

    /// List sessions
    List {
        /// Maximum number of sessions to list
        #[arg(long)]
        limit: Option<u32>,

        /// Number of sessions to skip
        #[arg(long)]
        offset: Option<u32>,
    },

    /// Attach a job to a session
    Attach {
        /// Session id
        session_id: String,
        /// Job id
        job_id: String,

        /// Client that runs the job
        #[arg(long)]
        client_id: Option<String>,
    },

    /// Detach a job from a session
    Detach {
        /// Session id
        session_id: String,
        /// Job id
        job_id: String,
    },

    /// Report a job start
    Start {
        /// Session id
        session_id: String,
        /// Job id
        job_id: String,

        /// Session tag the client last saw
        #[arg(long)]
        tag: i64,
    },

    /// Report a job end
    End {
        /// Session id
        session_id: String,
        /// Job id
        job_id: String,

        /// Job result ("success", "fail" or any other value)
        #[arg(long)]
        result: String,
    },

    /// Delete a session
    Delete {
        /// Session id
        session_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.endpoint, cli.user);

    match cli.command {
        Commands::Create {
            description,
            hold_off,
        } => {
            session::create(&client, &description, hold_off).await?;
        }
        Commands::Show { session_id } => {
            session::show(&client, &session_id).await?;
        }
        Commands::List { limit, offset } => {
            session::list(&client, limit, offset).await?;
        }
        Commands::Attach {
            session_id,
            job_id,
            client_id,
        } => {
            job::attach(&client, &session_id, &job_id, client_id.as_deref()).await?;
        }
        Commands::Detach { session_id, job_id } => {
            job::detach(&client, &session_id, &job_id).await?;
        }
        Commands::Start {
            session_id,
            job_id,
            tag,
        } => {
            action::start(&client, &session_id, &job_id, tag).await?;
        }
        Commands::End {
            session_id,
            job_id,
            result,
        } => {
            action::end(&client, &session_id, &job_id, &result).await?;
        }
        Commands::Delete { session_id } => {
            session::delete(&client, &session_id).await?;
        }
    }

    Ok(())
}
