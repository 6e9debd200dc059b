//! Row Offset Index: one decimal byte offset per line, ordinal by row number.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::LsearchError;
use crate::Result;

/// Write `lines` to `path`, one per line
pub fn write_lines<P, I, S>(path: P, lines: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writer.write_all(line.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read every line of `path` without trailing newlines
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }
    Ok(lines)
}

/// Starting byte offset of every row in the row blob
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OffsetIndex {
    offsets: Vec<u64>,
}

impl OffsetIndex {
    pub fn new(offsets: Vec<u64>) -> Self {
        Self { offsets }
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_lines(path, self.offsets.iter().map(|o| o.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LsearchError::NotFound(format!(
                "offset index {}",
                path.display()
            )));
        }

        let mut offsets = Vec::new();
        for (line_no, line) in read_lines(path)?.into_iter().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let offset = line.parse::<u64>().map_err(|e| {
                LsearchError::Corrupt(format!(
                    "offset index line {}: '{}': {}",
                    line_no + 1,
                    line,
                    e
                ))
            })?;
            offsets.push(offset);
        }
        Ok(Self { offsets })
    }

    /// Offset of `row`, or `None` past the last row
    pub fn get(&self, row: usize) -> Option<u64> {
        self.offsets.get(row).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.offsets
    }
}
