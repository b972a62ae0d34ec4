use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ghtt_protocol::IssueRef;

/// Top-level CLI parser for the `ghtt` binary.
#[derive(Debug, Parser)]
#[command(name = "ghtt", version, about = "Track time spent on GitHub issues")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./ghtt.json5 or the user config)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// GitHub personal access token
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the token for later runs
    Login,
    /// Forget the stored token
    Logout,
    /// Show the user, tracked issues and the running timer
    Status,
    /// List the issues assigned to you
    Issues,
    /// Track an assigned issue
    Track {
        /// Issue reference, e.g. octocat/hello-world#42
        issue: IssueRef,
    },
    /// Stop tracking an issue
    Untrack {
        /// Issue reference, e.g. octocat/hello-world#42
        issue: IssueRef,
    },
    /// Start the timer on an issue, tracking it if needed
    Start {
        /// Issue reference, e.g. octocat/hello-world#42
        issue: IssueRef,
    },
    /// Stop the timer and record the time spent
    Stop,
    /// List the time recorded on an issue
    Entries {
        /// Issue reference, e.g. octocat/hello-world#42
        issue: IssueRef,
    },
    /// Show GitHub API quota usage
    RateLimit,
}
