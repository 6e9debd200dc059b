//! Row Store: a row blob, its offset index and a schema sidecar.
//!
//! Files for a store at `<name>.bin`:
//! - `<name>.bin`: encoded records back to back, in input order
//! - `<name>.bin.idx`: row offset index, one decimal offset per line
//! - `<name>.bin.schema.json`: schema plus the compression flag
//!
//! The store is immutable once `serialize` returns. Every read strategy
//! seeks to a row offset and runs `decode_row`, so all of them return the
//! same rows in request order.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

use memmap2::Mmap;
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::codec::{decode_row, encode_row, validate_row};
use super::offsets::OffsetIndex;
use super::schema::RowSchema;
use super::value::Row;
use crate::config::{ReadStrategy, RowStoreConfig};
use crate::error::LsearchError;
use crate::Result;

/// Sidecar persisted next to the row blob
#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    schema: RowSchema,
    compress: bool,
}

pub struct RowStore {
    bin_path: PathBuf,
    idx_path: PathBuf,
    schema_path: PathBuf,
    schema: RowSchema,
    compress: bool,
    offsets: RwLock<Option<Arc<OffsetIndex>>>,
}

impl RowStore {
    /// Describe a store at `bin_path`; nothing touches disk until `serialize`
    pub fn new<P: AsRef<Path>>(bin_path: P, schema: RowSchema, config: &RowStoreConfig) -> Self {
        let bin_path = bin_path.as_ref().to_path_buf();
        Self {
            idx_path: index_path(&bin_path),
            schema_path: schema_path(&bin_path),
            bin_path,
            schema,
            compress: config.compress,
            offsets: RwLock::new(None),
        }
    }

    /// Reopen a serialized store
    pub fn open<P: AsRef<Path>>(bin_path: P) -> Result<Self> {
        let bin_path = bin_path.as_ref().to_path_buf();
        let schema_path = schema_path(&bin_path);
        for path in [&bin_path, &schema_path] {
            if !path.exists() {
                return Err(LsearchError::NotFound(format!(
                    "row store file {}",
                    path.display()
                )));
            }
        }

        let meta: StoreMeta = serde_json::from_slice(&fs::read(&schema_path)?)?;
        debug!(path = %bin_path.display(), columns = meta.schema.len(), "row store opened");

        Ok(Self {
            idx_path: index_path(&bin_path),
            schema_path,
            bin_path,
            schema: meta.schema,
            compress: meta.compress,
            offsets: RwLock::new(None),
        })
    }

    /// Write `rows` in order. Every row is validated before any byte is written.
    pub fn serialize(&self, rows: &[Row]) -> Result<()> {
        for (row_number, row) in rows.iter().enumerate() {
            validate_row(&self.schema, row, row_number)?;
        }

        if let Some(parent) = self.bin_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&self.bin_path)?);
        let mut offsets = Vec::with_capacity(rows.len());
        let mut record = Vec::new();
        let mut pos = 0u64;

        for row in rows {
            offsets.push(pos);
            record.clear();
            encode_row(&self.schema, row, self.compress, &mut record)?;
            writer.write_all(&record)?;
            pos += record.len() as u64;
        }
        writer.flush()?;

        let index = OffsetIndex::new(offsets);
        index.write(&self.idx_path)?;

        let meta = StoreMeta {
            schema: self.schema.clone(),
            compress: self.compress,
        };
        fs::write(&self.schema_path, serde_json::to_vec_pretty(&meta)?)?;

        *self.offsets.write() = Some(Arc::new(index));

        info!(
            path = %self.bin_path.display(),
            rows = rows.len(),
            bytes = pos,
            compress = self.compress,
            "row store serialized"
        );
        Ok(())
    }

    /// Offset index, loaded from disk on first use and cached
    fn offsets(&self) -> Result<Arc<OffsetIndex>> {
        if let Some(index) = self.offsets.read().as_ref() {
            return Ok(Arc::clone(index));
        }

        let mut slot = self.offsets.write();
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(OffsetIndex::load(&self.idx_path)?);
        debug!(path = %self.idx_path.display(), rows = index.len(), "offset index loaded");
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Byte offsets of `rows`, failing on the first row past the end
    fn resolve(&self, rows: &[usize]) -> Result<Vec<u64>> {
        let index = self.offsets()?;
        rows.iter()
            .map(|&row| {
                index.get(row).ok_or_else(|| {
                    LsearchError::InvalidRequest(format!(
                        "row {} out of range for store of {} rows",
                        row,
                        index.len()
                    ))
                })
            })
            .collect()
    }

    fn decode_at<R: io::Read + Seek>(&self, reader: &mut R, offset: u64) -> Result<Row> {
        reader.seek(SeekFrom::Start(offset))?;
        decode_row(&self.schema, self.compress, reader)
    }

    /// Number of rows, from the offset index
    pub fn len(&self) -> Result<usize> {
        Ok(self.offsets()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Decode `rows` one after another on the calling thread
    pub fn read_rows(&self, rows: &[usize]) -> Result<Vec<Row>> {
        let offsets = self.resolve(rows)?;
        if offsets.is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = BufReader::new(File::open(&self.bin_path)?);
        offsets
            .into_iter()
            .map(|offset| self.decode_at(&mut reader, offset))
            .collect()
    }

    /// Decode `rows` on a thread pool; each worker opens its own file handle
    pub fn read_rows_parallel(&self, rows: &[usize], workers: usize) -> Result<Vec<Row>> {
        let offsets = self.resolve(rows)?;
        if offsets.is_empty() {
            return Ok(Vec::new());
        }

        let pool = thread_pool(workers)?;
        pool.install(|| {
            offsets
                .par_iter()
                .map_init(
                    || File::open(&self.bin_path).map(BufReader::new),
                    |reader, &offset| match reader {
                        Ok(reader) => self.decode_at(reader, offset),
                        Err(e) => Err(LsearchError::Io(io::Error::new(e.kind(), e.to_string()))),
                    },
                )
                .collect::<Result<Vec<Row>>>()
        })
    }

    /// Decode `rows` on a thread pool against one shared read-only mapping
    pub fn read_rows_mmap(&self, rows: &[usize], workers: usize) -> Result<Vec<Row>> {
        let offsets = self.resolve(rows)?;
        if offsets.is_empty() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.bin_path)?;
        // The blob is never written after serialize returns.
        let mmap = unsafe { Mmap::map(&file)? };
        let data: &[u8] = &mmap;

        let pool = thread_pool(workers)?;
        pool.install(|| {
            offsets
                .par_iter()
                .map(|&offset| {
                    let Some(mut record) = usize::try_from(offset).ok().and_then(|o| data.get(o..))
                    else {
                        return Err(LsearchError::Corrupt(format!(
                            "row offset {} beyond blob of {} bytes",
                            offset,
                            data.len()
                        )));
                    };
                    decode_row(&self.schema, self.compress, &mut record)
                })
                .collect::<Result<Vec<Row>>>()
        })
    }

    /// Decode `rows` in child processes running `program decode-rows --worker`.
    ///
    /// Rows are split into at most `workers` contiguous chunks; all children
    /// run concurrently and their results are concatenated in chunk order.
    /// Row numbers go to each child on stdin and rows come back on stdout,
    /// both bincode-encoded.
    pub fn read_rows_processes(
        &self,
        rows: &[usize],
        workers: usize,
        program: &Path,
    ) -> Result<Vec<Row>> {
        self.resolve(rows)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = rows.len().div_ceil(workers.max(1));
        let mut children: Vec<Child> = Vec::new();
        for chunk in rows.chunks(chunk_size) {
            match self.spawn_worker(program, chunk) {
                Ok(child) => children.push(child),
                Err(e) => {
                    reap(children);
                    return Err(e);
                }
            }
        }
        debug!(workers = children.len(), program = %program.display(), "row workers spawned");

        let mut out = Vec::with_capacity(rows.len());
        let mut pending = children.into_iter();
        while let Some(child) = pending.next() {
            match collect_worker(child) {
                Ok(decoded) => out.extend(decoded),
                Err(e) => {
                    reap(pending);
                    return Err(e);
                }
            }
        }

        if out.len() != rows.len() {
            return Err(LsearchError::Worker(format!(
                "row workers returned {} rows, expected {}",
                out.len(),
                rows.len()
            )));
        }
        Ok(out)
    }

    fn spawn_worker(&self, program: &Path, chunk: &[usize]) -> Result<Child> {
        let mut child = Command::new(program)
            .arg("decode-rows")
            .arg("--store")
            .arg(&self.bin_path)
            .arg("--worker")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                LsearchError::Worker(format!("failed to spawn {}: {}", program.display(), e))
            })?;

        // The worker reads all of stdin before writing, so this cannot block on its output.
        if let Some(stdin) = child.stdin.take() {
            let mut writer = BufWriter::new(stdin);
            let sent = bincode::serialize_into(&mut writer, chunk)
                .and_then(|_| writer.flush().map_err(Into::into));
            if let Err(e) = sent {
                // the worker's exit status and stderr are reported on collect
                debug!(error = %e, "failed to send rows to worker");
            }
        }
        Ok(child)
    }

    /// Answer one worker request: bincode row numbers in, bincode rows out
    pub fn serve_worker<R: io::Read, W: Write>(&self, input: R, mut output: W) -> Result<()> {
        let rows: Vec<usize> = bincode::deserialize_from(BufReader::new(input))?;
        let decoded = self.read_rows(&rows)?;
        bincode::serialize_into(&mut output, &decoded)?;
        output.flush()?;
        Ok(())
    }

    /// Decode `rows` with the given execution strategy
    pub fn read_with(&self, rows: &[usize], strategy: &ReadStrategy) -> Result<Vec<Row>> {
        debug!(rows = rows.len(), ?strategy, "reading rows");
        match strategy {
            ReadStrategy::Sequential => self.read_rows(rows),
            ReadStrategy::Threads { workers } => self.read_rows_parallel(rows, *workers),
            ReadStrategy::Processes { workers, program } => {
                self.read_rows_processes(rows, *workers, program)
            }
            ReadStrategy::Mmap { workers } => self.read_rows_mmap(rows, *workers),
        }
    }

    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn path(&self) -> &Path {
        &self.bin_path
    }

    pub fn index_path(&self) -> &Path {
        &self.idx_path
    }
}

fn sidecar_path(bin_path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(bin_path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn index_path(bin_path: &Path) -> PathBuf {
    sidecar_path(bin_path, ".idx")
}

fn schema_path(bin_path: &Path) -> PathBuf {
    sidecar_path(bin_path, ".schema.json")
}

fn collect_worker(child: Child) -> Result<Vec<Row>> {
    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(LsearchError::Worker(format!(
            "row worker exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(bincode::deserialize(&output.stdout)?)
}

/// Kill and wait for workers whose output is no longer wanted
fn reap<I: IntoIterator<Item = Child>>(children: I) {
    for mut child in children {
        let _ = child.kill();
        let _ = child.wait();
    }
}

fn thread_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("lsearch-rows-{i}"))
        .build()
        .map_err(|e| LsearchError::Worker(format!("failed to start row readers: {}", e)))
}

impl fmt::Debug for RowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStore")
            .field("bin_path", &self.bin_path)
            .field("schema", &self.schema)
            .field("compress", &self.compress)
            .finish()
    }
}

impl fmt::Display for RowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<&str> = self.schema.columns().iter().map(|c| c.name.as_str()).collect();
        let variable: Vec<&str> = self.schema.variable_columns().map(|c| c.name.as_str()).collect();
        write!(
            f,
            "RowStore(columns=[{}], variable=[{}], path='{}')",
            columns.join(", "),
            variable.join(", "),
            self.bin_path.display()
        )
    }
}
