use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Index settings configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub tokenizer: TokenizerConfig,
}

impl IndexSettings {
    pub fn with_tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.tokenizer = tokenizer;
        self
    }
}

/// Tokenizer configuration
///
/// The defaults give the plain contract: lowercase, every `\w+` run is a token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    pub min_token_length: usize,
    pub max_token_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            min_token_length: 1,
            max_token_length: usize::MAX,
        }
    }
}

/// Row store configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowStoreConfig {
    /// zlib-compress every variable-length column
    pub compress: bool,
    /// Worker count used by the parallel read strategies
    pub read_workers: usize,
}

impl Default for RowStoreConfig {
    fn default() -> Self {
        Self {
            compress: true,
            read_workers: num_cpus::get(),
        }
    }
}

impl RowStoreConfig {
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_read_workers(mut self, workers: usize) -> Self {
        self.read_workers = workers.max(1);
        self
    }
}

/// Execution strategy for resolving row numbers against a row store.
///
/// Every strategy runs the same single-record decode routine and returns
/// identical rows in request order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReadStrategy {
    Sequential,
    Threads { workers: usize },
    /// `program` must accept `decode-rows --store <path> --worker`
    Processes { workers: usize, program: PathBuf },
    Mmap { workers: usize },
}

impl Default for ReadStrategy {
    fn default() -> Self {
        ReadStrategy::Threads {
            workers: num_cpus::get(),
        }
    }
}

/// Configuration profiles for different workloads
#[derive(Clone, Debug, PartialEq)]
pub enum PerformanceProfile {
    Sequential,
    Balanced,
    Parallel,
}

impl PerformanceProfile {
    /// Default read strategy for this profile
    pub fn read_strategy(&self, workers: usize) -> ReadStrategy {
        let workers = workers.max(1);
        match self {
            PerformanceProfile::Sequential => ReadStrategy::Sequential,
            PerformanceProfile::Balanced => ReadStrategy::Threads { workers },
            PerformanceProfile::Parallel => ReadStrategy::Mmap { workers },
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sequential" => Some(PerformanceProfile::Sequential),
            "balanced" => Some(PerformanceProfile::Balanced),
            "parallel" => Some(PerformanceProfile::Parallel),
            _ => None,
        }
    }
}
