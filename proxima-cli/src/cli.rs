//! Command-line interface for building, saving, and querying indices.
//!
//! `build` loads a vector file, builds an index, and writes the graph to
//! disk; `query` reloads that graph over the same vector file and answers
//! kNN queries from a second file. Results go to stdout, diagnostics to
//! stderr via `tracing`.

use std::{
    fmt,
    fmt::Write as _,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use proxima_core::{
    DenseVector, IndexParams, L2Space, ProgressSink, QueryParams, SearchAlgo, SmallWorld,
    SmallWorldError, TopKCollector,
};
use thiserror::Error;
use tracing::info;

use crate::data::{load_vectors, DataError};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "proxima", about = "Build and query small-world ANN indices.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build an index from a vector file and save it.
    Build(BuildCommand),
    /// Load an index and answer kNN queries from a query file.
    Query(QueryCommand),
}

/// Options accepted by the `build` command.
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// Path to the data vectors, one row per line.
    pub input: PathBuf,

    /// Where to write the saved index.
    #[arg(long)]
    pub output: PathBuf,

    /// Target out-degree per inserted node.
    #[arg(long, default_value_t = 10)]
    pub nn: usize,

    /// Beam width during indexing; defaults to `--nn`.
    #[arg(long)]
    pub ef_construction: Option<usize>,

    /// Number of insertion workers; defaults to the hardware parallelism.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Use the space's proxy distance for all build comparisons.
    #[arg(long)]
    pub use_proxy_dist: bool,
}

/// Options accepted by the `query` command.
#[derive(Debug, Args, Clone)]
pub struct QueryCommand {
    /// Path to the data vectors the index was built over.
    pub input: PathBuf,

    /// Path to the saved index.
    #[arg(long)]
    pub index: PathBuf,

    /// Path to the query vectors, one row per line.
    #[arg(long)]
    pub queries: PathBuf,

    /// Number of neighbours to report per query.
    #[arg(short, default_value_t = 10)]
    pub k: usize,

    /// Beam width at query time; defaults to the index's NN.
    #[arg(long)]
    pub ef_search: Option<usize>,

    /// Beam variant to run.
    #[arg(long, value_enum, default_value_t = AlgoArg::Old)]
    pub algo: AlgoArg,
}

/// Beam variant names accepted on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum AlgoArg {
    /// Classic two-heap best-first beam.
    Old,
    /// Sorted-array beam with in-place re-exploration.
    V1merge,
}

impl From<AlgoArg> for SearchAlgo {
    fn from(arg: AlgoArg) -> Self {
        match arg {
            AlgoArg::Old => Self::Old,
            AlgoArg::V1merge => Self::V1Merge,
        }
    }
}

impl fmt::Display for AlgoArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Old => "old",
            Self::V1merge => "v1merge",
        })
    }
}

/// Errors produced while executing a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Vector loading failed.
    #[error(transparent)]
    Data(#[from] DataError),
    /// The core index rejected the operation.
    #[error(transparent)]
    Core(#[from] SmallWorldError),
    /// The query file was empty.
    #[error("`{path}` contains no query vectors")]
    NoQueries { path: PathBuf },
}

/// Human-readable report produced by a command.
#[derive(Debug)]
pub struct Summary {
    lines: Vec<String>,
}

impl Summary {
    /// Renders the summary, one line per entry.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

struct LogProgress {
    completed: AtomicUsize,
    total: usize,
}

impl ProgressSink for LogProgress {
    fn add(&self, completed: usize) {
        let done = self.completed.fetch_add(completed, Ordering::Relaxed) + completed;
        info!(done, total = self.total, "indexing progress");
    }
}

/// Executes a parsed command.
///
/// # Errors
/// Returns [`CliError`] when loading, building, saving, or querying fails.
pub fn run_cli(cli: Cli) -> Result<Summary, CliError> {
    match cli.command {
        Command::Build(command) => run_build(command),
        Command::Query(command) => run_query(command),
    }
}

fn run_build(command: BuildCommand) -> Result<Summary, CliError> {
    let data = load_vectors(&command.input)?;
    let mut params = IndexParams::new(
        command.nn,
        command.ef_construction.unwrap_or(command.nn),
    )?
    .with_use_proxy_dist(command.use_proxy_dist);
    if let Some(threads) = command.threads {
        params = params.with_index_thread_qty(threads);
    }

    let progress = LogProgress {
        completed: AtomicUsize::new(0),
        total: data.len(),
    };
    let index = SmallWorld::build_with_progress(&L2Space, &data, params, &progress)?;
    index.save(&command.output)?;

    Ok(Summary {
        lines: vec![format!(
            "indexed {} vectors into {}",
            index.len(),
            command.output.display()
        )],
    })
}

fn run_query(command: QueryCommand) -> Result<Summary, CliError> {
    let data = load_vectors(&command.input)?;
    let queries = load_vectors(&command.queries)?;
    if queries.is_empty() {
        return Err(CliError::NoQueries {
            path: command.queries,
        });
    }
    let index = SmallWorld::load(&L2Space, &data, &command.index)?;

    let mut query_params = QueryParams::new().with_algo(command.algo.into());
    if let Some(ef_search) = command.ef_search {
        query_params = query_params.with_ef_search(ef_search)?;
    }

    let mut lines = Vec::with_capacity(queries.len());
    for (number, query) in queries.iter().enumerate() {
        let probe = DenseVector::new(-1, query.values().to_vec());
        let mut sink = TopKCollector::new(command.k);
        index.knn(&probe, &query_params, &mut sink)?;

        let mut line = format!("query {number}:");
        for (dist, obj_id) in sink.into_sorted_vec() {
            write!(line, " {obj_id}({dist:.4})").expect("writing to a String cannot fail");
        }
        lines.push(line);
    }
    Ok(Summary { lines })
}
