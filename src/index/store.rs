//! On-disk posting store
//!
//! One directory per index:
//! - `postings.bin`: fixed-width posting triples grouped by ascending term id
//! - `term_directory.bin`: term id -> start offset
//! - `vocabulary.bin`: term -> term id
//! - `frequencies.bin`: document and word frequency per term id
//! - `manifest.json`: format version, counts, postings checksum
//!
//! The manifest is written last, so a directory without one is incomplete.
//! Opening loads only the metadata; posting lists are read per lookup.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::directory::{DirectoryEntry, TermDirectory};
use super::layout::PostingLayout;
use super::postings::{decode_postings, encode_posting};
use super::types::{Posting, TermId, POSTING_SIZE};
use super::vocabulary::{Frequencies, Vocabulary};
use crate::config::IndexSettings;
use crate::error::LsearchError;
use crate::Result;

const POSTINGS_FILE: &str = "postings.bin";
const DIRECTORY_FILE: &str = "term_directory.bin";
const VOCABULARY_FILE: &str = "vocabulary.bin";
const FREQUENCIES_FILE: &str = "frequencies.bin";
const MANIFEST_FILE: &str = "manifest.json";

const REQUIRED_FILES: [&str; 5] = [
    POSTINGS_FILE,
    DIRECTORY_FILE,
    VOCABULARY_FILE,
    FREQUENCIES_FILE,
    MANIFEST_FILE,
];

/// Index manifest
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Format version
    pub version: u32,
    /// Settings the index was built with; queries must tokenize the same way
    pub settings: IndexSettings,
    /// Documents seen at build time
    pub doc_count: u32,
    pub term_count: u64,
    pub posting_count: u64,
    pub postings_bytes: u64,
    /// CRC32 of `postings.bin`
    pub postings_crc32: u32,
}

impl IndexManifest {
    /// Current manifest format version
    pub const VERSION: u32 = 1;

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(data)?;
        if manifest.version != Self::VERSION {
            return Err(LsearchError::Corrupt(format!(
                "unsupported index version {}, expected {}",
                manifest.version,
                Self::VERSION
            )));
        }
        Ok(manifest)
    }
}

/// Persistent posting store: one postings blob plus its metadata
#[derive(Debug)]
pub struct PostingStore {
    base_dir: PathBuf,
    directory: TermDirectory,
    vocabulary: Vocabulary,
    frequencies: Frequencies,
    manifest: IndexManifest,
}

impl PostingStore {
    /// Write grouped postings and metadata under `base_dir`, creating it if absent
    pub fn build<P: AsRef<Path>>(
        base_dir: P,
        layout: &PostingLayout,
        vocabulary: Vocabulary,
        frequencies: Frequencies,
        doc_count: u32,
        settings: &IndexSettings,
    ) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        // A rebuild must not leave the previous manifest describing new files.
        let manifest_path = base_dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)?;
        }

        let mut writer = BufWriter::new(File::create(base_dir.join(POSTINGS_FILE))?);
        let mut hasher = Hasher::new();
        let mut entries = Vec::with_capacity(layout.term_count());
        let mut offset = 0u64;
        let mut record = Vec::with_capacity(POSTING_SIZE);

        for (term_id, postings) in layout.iter() {
            entries.push(DirectoryEntry { term_id, offset });
            for posting in postings {
                record.clear();
                encode_posting(posting, &mut record);
                writer.write_all(&record)?;
                hasher.update(&record);
                offset += record.len() as u64;
            }
        }
        writer.flush()?;

        let directory = TermDirectory::from_entries(entries);
        fs::write(base_dir.join(DIRECTORY_FILE), directory.to_bincode()?)?;
        fs::write(base_dir.join(VOCABULARY_FILE), bincode::serialize(&vocabulary)?)?;
        fs::write(
            base_dir.join(FREQUENCIES_FILE),
            bincode::serialize(&frequencies)?,
        )?;

        let manifest = IndexManifest {
            version: IndexManifest::VERSION,
            settings: settings.clone(),
            doc_count,
            term_count: directory.len() as u64,
            posting_count: layout.posting_count() as u64,
            postings_bytes: offset,
            postings_crc32: hasher.finalize(),
        };
        fs::write(&manifest_path, manifest.to_json()?)?;

        info!(
            path = %base_dir.display(),
            terms = manifest.term_count,
            postings = manifest.posting_count,
            bytes = manifest.postings_bytes,
            "posting store written"
        );

        Ok(Self {
            base_dir,
            directory,
            vocabulary,
            frequencies,
            manifest,
        })
    }

    /// Load the metadata of an existing store without touching the postings blob
    pub fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        if !base_dir.is_dir() {
            return Err(LsearchError::NotFound(format!(
                "index directory '{}' does not exist",
                base_dir.display()
            )));
        }
        for name in REQUIRED_FILES {
            if !base_dir.join(name).is_file() {
                return Err(LsearchError::NotFound(format!(
                    "index at '{}' is incomplete: missing {}",
                    base_dir.display(),
                    name
                )));
            }
        }

        let manifest = IndexManifest::from_json(&fs::read(base_dir.join(MANIFEST_FILE))?)?;
        let directory = TermDirectory::from_bincode(&fs::read(base_dir.join(DIRECTORY_FILE))?)?;
        let vocabulary: Vocabulary =
            bincode::deserialize(&fs::read(base_dir.join(VOCABULARY_FILE))?)?;
        let frequencies: Frequencies =
            bincode::deserialize(&fs::read(base_dir.join(FREQUENCIES_FILE))?)?;

        debug!(
            path = %base_dir.display(),
            terms = directory.len(),
            vocabulary = vocabulary.len(),
            "posting store opened"
        );

        Ok(Self {
            base_dir,
            directory,
            vocabulary,
            frequencies,
            manifest,
        })
    }

    fn postings_path(&self) -> PathBuf {
        self.base_dir.join(POSTINGS_FILE)
    }

    /// Posting list for a term id; empty when the term is not in the directory
    pub fn lookup(&self, term_id: TermId) -> Result<Vec<Posting>> {
        if !self.directory.contains(term_id) {
            return Ok(Vec::new());
        }

        let mut file = File::open(self.postings_path())?;
        let blob_len = file.metadata()?.len();
        let Some((start, end)) = self.directory.span(term_id, blob_len) else {
            return Ok(Vec::new());
        };
        if start > end || end > blob_len {
            return Err(LsearchError::Corrupt(format!(
                "{} span [{}, {}) outside postings blob of {} bytes",
                term_id, start, end, blob_len
            )));
        }

        file.seek(SeekFrom::Start(start))?;
        let mut span = vec![0u8; (end - start) as usize];
        file.read_exact(&mut span)
            .map_err(|e| LsearchError::from_decode_io(e, "posting list"))?;
        decode_postings(&span)
    }

    /// Posting list for a term string; empty when the term is not in the vocabulary
    pub fn lookup_by_text(&self, term: &str) -> Result<Vec<Posting>> {
        match self.vocabulary.get(term) {
            Some(term_id) => self.lookup(term_id),
            None => Ok(Vec::new()),
        }
    }

    /// Recompute the postings checksum and compare it with the manifest
    pub fn verify(&self) -> Result<()> {
        let data = fs::read(self.postings_path())?;
        if data.len() as u64 != self.manifest.postings_bytes {
            return Err(LsearchError::Corrupt(format!(
                "postings blob is {} bytes, manifest records {}",
                data.len(),
                self.manifest.postings_bytes
            )));
        }
        let mut hasher = Hasher::new();
        hasher.update(&data);
        if hasher.finalize() != self.manifest.postings_crc32 {
            return Err(LsearchError::Corrupt(
                "postings checksum mismatch".to_string(),
            ));
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.base_dir
    }

    pub fn directory(&self) -> &TermDirectory {
        &self.directory
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn frequencies(&self) -> &Frequencies {
        &self.frequencies
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }
}
