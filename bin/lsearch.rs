use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};

use lsearch::rowstore::{row_from_json, row_to_json};
use lsearch::{
    IndexSettings, InvertedIndex, PerformanceProfile, ReadStrategy, Row, RowSchema, RowStore,
    RowStoreConfig, TableIndex, TokenizerConfig,
};

#[derive(Parser)]
#[command(name = "lsearch")]
#[command(about = "Static inverted index with a columnar row store", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a searchable table from JSON lines
    Index {
        /// Input rows, one JSON object per line
        #[arg(long)]
        data: PathBuf,

        /// Schema file: {"columns": [["id", "i"], ["title", "str"]], "variable_columns": ["title"]}
        #[arg(long)]
        schema: PathBuf,

        /// Comma-separated string columns to index
        #[arg(long, value_delimiter = ',', required = true)]
        index_columns: Vec<String>,

        /// Output directory
        #[arg(long, env = "LSEARCH_DATA_DIR", default_value = "./data")]
        out: PathBuf,

        /// Store variable-length columns without zlib compression
        #[arg(long)]
        no_compress: bool,

        /// Minimum token length in characters
        #[arg(long, default_value = "1")]
        min_token_length: usize,

        /// Row read workers recorded for searches
        #[arg(long, env = "LSEARCH_WORKERS")]
        workers: Option<usize>,
    },

    /// Print rows matching every query term as JSON lines
    Search {
        #[arg(long, env = "LSEARCH_DATA_DIR", default_value = "./data")]
        dir: PathBuf,

        query: String,

        /// Read profile (sequential, balanced, parallel)
        #[arg(long, env = "LSEARCH_PROFILE", default_value = "balanced")]
        profile: String,

        /// Resolve rows in worker processes instead of threads
        #[arg(long)]
        processes: bool,

        #[arg(long, env = "LSEARCH_WORKERS")]
        workers: Option<usize>,
    },

    /// Print the postings of one term in a column index
    Lookup {
        /// Index directory, e.g. ./data/inv_index_title
        #[arg(long)]
        dir: PathBuf,

        term: String,
    },

    /// Decode rows from a row store and print them as a JSON array
    DecodeRows {
        #[arg(long)]
        store: PathBuf,

        #[arg(long, value_delimiter = ',', conflicts_with = "worker")]
        rows: Vec<usize>,

        /// Read bincode row numbers from stdin and write bincode rows to stdout
        #[arg(long)]
        worker: bool,
    },
}

/// Schema declaration read by `index --schema`
#[derive(Deserialize)]
struct SchemaFile {
    columns: Vec<(String, String)>,
    #[serde(default)]
    variable_columns: Vec<String>,
}

fn load_schema(path: &Path) -> Result<RowSchema> {
    let file = File::open(path).with_context(|| format!("opening schema {}", path.display()))?;
    let decl: SchemaFile = serde_json::from_reader(BufReader::new(file))?;
    Ok(RowSchema::compile(&decl.columns, &decl.variable_columns)?)
}

fn load_rows(path: &Path, schema: &RowSchema) -> Result<Vec<Row>> {
    let file = File::open(path).with_context(|| format!("opening data {}", path.display()))?;
    let mut rows = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", path.display(), line_no + 1))?;
        let Some(object) = value.as_object() else {
            bail!("{}:{}: expected a JSON object", path.display(), line_no + 1);
        };
        rows.push(row_from_json(schema, object)?);
    }
    Ok(rows)
}

fn main() -> Result<()> {
    // stdout carries command output; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match args.command {
        Commands::Index {
            data,
            schema,
            index_columns,
            out: out_dir,
            no_compress,
            min_token_length,
            workers,
        } => {
            info!("lsearch v{} building {}", lsearch::VERSION, out_dir.display());
            let schema = load_schema(&schema)?;
            let rows = load_rows(&data, &schema)?;

            let settings = IndexSettings::default().with_tokenizer(TokenizerConfig {
                min_token_length,
                ..TokenizerConfig::default()
            });
            let mut row_config = RowStoreConfig::default().with_compress(!no_compress);
            if let Some(workers) = workers {
                row_config = row_config.with_read_workers(workers);
            }

            let table =
                TableIndex::build(&out_dir, schema, &rows, &index_columns, &settings, &row_config)?;
            for column in table.index_columns() {
                if let Some(index) = table.index(column) {
                    info!("  {}: {}", column, index);
                }
            }
            info!("  {}", table.rows());
        }

        Commands::Search {
            dir,
            query,
            profile,
            processes,
            workers,
        } => {
            let workers = workers.unwrap_or_else(num_cpus::get).max(1);
            let strategy = if processes {
                ReadStrategy::Processes {
                    workers,
                    program: std::env::current_exe()?,
                }
            } else {
                PerformanceProfile::parse(&profile)
                    .unwrap_or_else(|| {
                        warn!("Unknown profile '{}', using 'balanced'", profile);
                        PerformanceProfile::Balanced
                    })
                    .read_strategy(workers)
            };

            let table = TableIndex::open(&dir)?.with_read_strategy(strategy);
            for row in table.search(&query)? {
                writeln!(out, "{}", row_to_json(&row))?;
            }
        }

        Commands::Lookup { dir, term } => {
            let index = InvertedIndex::open(&dir)?;
            for posting in index.lookup(&term)? {
                writeln!(out, "{}", serde_json::to_string(&posting)?)?;
            }
        }

        Commands::DecodeRows {
            store,
            rows,
            worker,
        } => {
            let store = RowStore::open(&store)?;
            if worker {
                store.serve_worker(io::stdin().lock(), &mut out)?;
            } else {
                let decoded = store.read_rows(&rows)?;
                serde_json::to_writer(&mut out, &decoded)?;
                writeln!(out)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}
