//! Search Composer: one inverted index per searchable column plus one row
//! store holding the full rows.
//!
//! Directory layout under `base_dir`:
//! - `inv_index_<column>/`: posting store for each indexed column
//! - `rows.bin`, `rows.bin.idx`, `rows.bin.schema.json`: the row store
//! - `table.json`: schema, indexed columns and read workers, for reopening

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{IndexSettings, ReadStrategy, RowStoreConfig};
use crate::error::LsearchError;
use crate::index::{union, DocId, InvertedIndex};
use crate::rowstore::{validate_row, ColumnCodec, Row, RowSchema, RowStore};
use crate::Result;

const TABLE_FILE: &str = "table.json";
const ROWS_FILE: &str = "rows.bin";

#[derive(Debug, Serialize, Deserialize)]
struct TableLayout {
    schema: RowSchema,
    index_columns: Vec<String>,
    read_workers: usize,
}

fn index_dir(base_dir: &Path, column: &str) -> PathBuf {
    base_dir.join(format!("inv_index_{}", column))
}

/// A searchable table
#[derive(Debug)]
pub struct TableIndex {
    base_dir: PathBuf,
    indexes: Vec<(String, InvertedIndex)>,
    rows: RowStore,
    read_strategy: ReadStrategy,
}

impl TableIndex {
    /// Build one index per `index_columns` entry and serialize `rows`.
    ///
    /// Indexed columns must be variable-length string columns. Row N of the
    /// store is document N of every column index.
    pub fn build<P, S>(
        base_dir: P,
        schema: RowSchema,
        rows: &[Row],
        index_columns: &[S],
        settings: &IndexSettings,
        row_config: &RowStoreConfig,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let base_dir = base_dir.as_ref().to_path_buf();
        let index_columns: Vec<String> =
            index_columns.iter().map(|c| c.as_ref().to_string()).collect();

        for name in &index_columns {
            match schema.column(name) {
                Some(column) if column.codec == ColumnCodec::Utf8 => {}
                Some(column) => {
                    return Err(LsearchError::SchemaViolation(format!(
                        "indexed column '{}' must be a string column, found '{}'",
                        name, column.codec
                    )))
                }
                None => {
                    return Err(LsearchError::SchemaViolation(format!(
                        "indexed column '{}' is not in the schema",
                        name
                    )))
                }
            }
        }
        for (row_number, row) in rows.iter().enumerate() {
            validate_row(&schema, row, row_number)?;
        }

        fs::create_dir_all(&base_dir)?;

        let store = RowStore::new(base_dir.join(ROWS_FILE), schema.clone(), row_config);
        store.serialize(rows)?;

        let mut indexes = Vec::with_capacity(index_columns.len());
        for name in &index_columns {
            let documents = rows
                .iter()
                .map(|row| row.get(name).and_then(|v| v.as_str()).unwrap_or_default());
            let index = InvertedIndex::build(index_dir(&base_dir, name), documents, settings)?;
            indexes.push((name.clone(), index));
        }

        let layout = TableLayout {
            schema,
            index_columns,
            read_workers: row_config.read_workers,
        };
        fs::write(base_dir.join(TABLE_FILE), serde_json::to_vec_pretty(&layout)?)?;

        info!(
            path = %base_dir.display(),
            rows = rows.len(),
            columns = ?layout.index_columns,
            "table index built"
        );

        Ok(Self {
            base_dir,
            indexes,
            rows: store,
            read_strategy: ReadStrategy::Threads {
                workers: layout.read_workers,
            },
        })
    }

    /// Reopen a table built by `build`
    pub fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let table_path = base_dir.join(TABLE_FILE);
        if !table_path.exists() {
            return Err(LsearchError::NotFound(format!(
                "table layout {}",
                table_path.display()
            )));
        }
        let layout: TableLayout = serde_json::from_slice(&fs::read(&table_path)?)?;

        let rows = RowStore::open(base_dir.join(ROWS_FILE))?;
        if rows.schema() != &layout.schema {
            return Err(LsearchError::Corrupt(format!(
                "row store schema does not match {}",
                table_path.display()
            )));
        }

        let mut indexes = Vec::with_capacity(layout.index_columns.len());
        for name in layout.index_columns {
            let index = InvertedIndex::open(index_dir(&base_dir, &name))?;
            indexes.push((name, index));
        }
        debug!(path = %base_dir.display(), indexes = indexes.len(), "table index opened");

        Ok(Self {
            base_dir,
            indexes,
            rows,
            read_strategy: ReadStrategy::Threads {
                workers: layout.read_workers.max(1),
            },
        })
    }

    /// Resolve rows with `strategy` instead of the default thread pool
    pub fn with_read_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.read_strategy = strategy;
        self
    }

    /// Row numbers matching `query` in any indexed column, ascending
    pub fn search_ids(&self, query: &str) -> Result<Vec<DocId>> {
        let mut matches = Vec::new();
        for (_, index) in &self.indexes {
            matches = union(&matches, &index.search(query)?);
        }
        Ok(matches)
    }

    /// Full rows matching `query`, in row order
    pub fn search(&self, query: &str) -> Result<Vec<Row>> {
        let ids: Vec<usize> = self.search_ids(query)?.iter().map(|id| id.as_usize()).collect();
        debug!(query, matches = ids.len(), "table search");
        self.rows.read_with(&ids, &self.read_strategy)
    }

    pub fn index(&self, column: &str) -> Option<&InvertedIndex> {
        self.indexes
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, index)| index)
    }

    pub fn index_columns(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|(name, _)| name.as_str())
    }

    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    pub fn schema(&self) -> &RowSchema {
        self.rows.schema()
    }

    pub fn read_strategy(&self) -> &ReadStrategy {
        &self.read_strategy
    }

    pub fn path(&self) -> &Path {
        &self.base_dir
    }
}

impl fmt::Display for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<&str> = self.index_columns().collect();
        write!(
            f,
            "TableIndex(index_columns=[{}], path='{}')",
            columns.join(", "),
            self.base_dir.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rowstore::{FixedCodec, Value};
    use tempfile::TempDir;

    fn schema() -> RowSchema {
        RowSchema::builder()
            .fixed("id", FixedCodec::Int32)
            .variable("title")
            .variable("description")
            .build()
            .unwrap()
    }

    fn row(id: i32, title: &str, description: &str) -> Row {
        [
            ("id".to_string(), Value::Int32(id)),
            ("title".to_string(), Value::Str(title.to_string())),
            ("description".to_string(), Value::Str(description.to_string())),
        ]
        .into_iter()
        .collect()
    }

    fn table() -> Vec<Row> {
        vec![
            row(1, "red car", "a fast red vehicle"),
            row(2, "blue bike", "two wheels"),
            row(3, "green car", "slow but reliable"),
        ]
    }

    #[test]
    fn test_search_unions_columns() {
        let tmp = TempDir::new().unwrap();
        let index = TableIndex::build(
            tmp.path(),
            schema(),
            &table(),
            &["title", "description"],
            &IndexSettings::default(),
            &RowStoreConfig::default().with_read_workers(2),
        )
        .unwrap();

        assert_eq!(index.search_ids("car").unwrap(), vec![DocId(0), DocId(2)]);
        assert_eq!(index.search_ids("red").unwrap(), vec![DocId(0)]);
        // "wheels" only appears in description, "bike" only in title
        assert_eq!(index.search_ids("wheels").unwrap(), vec![DocId(1)]);
        assert_eq!(index.search_ids("bike").unwrap(), vec![DocId(1)]);

        let rows = index.search("car").unwrap();
        assert_eq!(rows, vec![table()[0].clone(), table()[2].clone()]);
        assert!(index.search("boat").unwrap().is_empty());
    }

    #[test]
    fn test_reopen() {
        let tmp = TempDir::new().unwrap();
        TableIndex::build(
            tmp.path(),
            schema(),
            &table(),
            &["title"],
            &IndexSettings::default(),
            &RowStoreConfig::default(),
        )
        .unwrap();

        let index = TableIndex::open(tmp.path())
            .unwrap()
            .with_read_strategy(ReadStrategy::Sequential);
        assert!(index.index("title").is_some());
        assert!(index.index("description").is_none());
        assert_eq!(index.search("green").unwrap(), vec![table()[2].clone()]);
        assert!(tmp.path().join("inv_index_title").is_dir());
        assert_eq!(
            index.to_string(),
            format!("TableIndex(index_columns=[title], path='{}')", tmp.path().display())
        );
    }

    #[test]
    fn test_index_column_must_be_string() {
        let tmp = TempDir::new().unwrap();
        let err = TableIndex::build(
            tmp.path(),
            schema(),
            &table(),
            &["id"],
            &IndexSettings::default(),
            &RowStoreConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LsearchError::SchemaViolation(_)));

        let err = TableIndex::build(
            tmp.path(),
            schema(),
            &table(),
            &["price"],
            &IndexSettings::default(),
            &RowStoreConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LsearchError::SchemaViolation(_)));
    }

    #[test]
    fn test_open_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            TableIndex::open(tmp.path()),
            Err(LsearchError::NotFound(_))
        ));
    }
}
