mod cmd_check;
mod cmd_edit;
mod cmd_list;
mod cmd_resolve;
mod cmd_validate;
mod tree_file;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "navtree")]
#[command(about = "Edit and resolve materialized-path routing trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a tree file holding only the root node
    Init {
        /// Tree file
        #[arg(short, long)]
        tree: PathBuf,

        /// Handler for the root node
        #[arg(long, default_value = "")]
        handler: String,

        /// Overwrite an existing tree file
        #[arg(long)]
        force: bool,
    },
    /// Add a node beneath an existing one
    Add {
        /// Tree file
        #[arg(short, long)]
        tree: PathBuf,

        /// Url of the parent node
        #[arg(long)]
        parent: String,

        /// Slug of the new node
        #[arg(long)]
        slug: String,

        /// Handler dotted path
        #[arg(long, required_unless_present = "redirect_to")]
        handler: Option<String>,

        /// Make the node redirect to the node at this url
        #[arg(long, conflicts_with = "handler")]
        redirect_to: Option<String>,

        /// Use a permanent (301) redirect
        #[arg(long, requires = "redirect_to")]
        permanent: bool,
    },
    /// Change a node's slug, updating every url beneath it
    Rename {
        /// Tree file
        #[arg(short, long)]
        tree: PathBuf,

        /// Url of the node to rename
        #[arg(long)]
        url: String,

        /// New slug
        #[arg(long)]
        slug: String,
    },
    /// Move a node (and its subtree) beneath another node
    Move {
        /// Tree file
        #[arg(short, long)]
        tree: PathBuf,

        /// Url of the node to move
        #[arg(long)]
        url: String,

        /// Url of the new parent
        #[arg(long)]
        to: String,
    },
    /// Remove a node and its subtree
    Remove {
        /// Tree file
        #[arg(short, long)]
        tree: PathBuf,

        /// Url of the node to remove
        #[arg(long)]
        url: String,
    },
    /// Find the node that serves a request path
    Resolve {
        /// Tree file
        #[arg(short, long)]
        tree: PathBuf,

        /// Request path (e.g. /blog/2024/hello/)
        path: String,
    },
    /// Print the tree
    List {
        /// Tree file
        #[arg(short, long)]
        tree: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that every cached url matches its parent/slug chain
    Validate {
        /// Tree file
        #[arg(short, long)]
        tree: PathBuf,
    },
    /// Check the allowed handlers in a settings file
    Check {
        /// Settings file (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init {
            tree,
            handler,
            force,
        } => cmd_edit::run_init(&tree, handler, force, cli.pretty),
        Commands::Add {
            tree,
            parent,
            slug,
            handler,
            redirect_to,
            permanent,
        } => {
            let kind = match redirect_to {
                Some(target) => cmd_edit::NewNode::Redirect { target, permanent },
                None => cmd_edit::NewNode::Handler(handler.unwrap_or_default()),
            };
            cmd_edit::run_add(&tree, &parent, slug, kind, cli.pretty)
        }
        Commands::Rename { tree, url, slug } => cmd_edit::run_rename(&tree, &url, slug, cli.pretty),
        Commands::Move { tree, url, to } => cmd_edit::run_move(&tree, &url, &to, cli.pretty),
        Commands::Remove { tree, url } => cmd_edit::run_remove(&tree, &url),
        Commands::Resolve { tree, path } => cmd_resolve::run(&tree, &path, cli.pretty),
        Commands::List { tree, json } => cmd_list::run(&tree, json),
        Commands::Validate { tree } => cmd_validate::run(&tree),
        Commands::Check { config } => cmd_check::run(&config),
    }
}
