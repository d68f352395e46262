//! Argument parsing for the `docprep` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ingests documents into the vector store, either by running the
/// long-lived consumer service or by submitting one document/directory
/// for it to pick up.
#[derive(Parser, Debug)]
#[command(name = "docprep")]
#[command(version)]
#[command(about = "Document preprocessing and ingestion worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the long-lived consumer: connect to the broker, declare queues,
    /// and process tasks until interrupted.
    Consume {
        /// Worker pool size and broker prefetch count. Defaults to the
        /// configured `RABBITMQ_CONSUMER_WORKERS`.
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Submit a local PDF (or every PDF directly inside a directory) for
    /// ingestion: upload it, then publish a `PENDING` task.
    Produce {
        /// Path to a PDF file, or a directory of PDFs.
        path: PathBuf,

        /// Pipeline registry key to stamp on the task. Defaults to `"default"`.
        #[arg(long)]
        task_type: Option<String>,

        /// Destination vector-store collection. Defaults to the consumer's
        /// configured collection.
        #[arg(long)]
        collection: Option<String>,
    },
}
