use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use lsearch::rowstore::{FixedCodec, OffsetIndex};
use lsearch::{LsearchError, ReadStrategy, Row, RowSchema, RowStore, RowStoreConfig, Value};

fn schema() -> RowSchema {
    RowSchema::compile(
        &[
            ("id", "i"),
            ("value", "f"),
            ("in_stock", "?"),
            ("title", "str"),
            ("description", "str"),
        ],
        &["title", "description"],
    )
    .unwrap()
}

fn rows(n: i32) -> Vec<Row> {
    (0..n)
        .map(|i| {
            [
                ("id".to_string(), Value::Int32(i)),
                ("value".to_string(), Value::Float32(i as f32 / 3.0)),
                ("in_stock".to_string(), Value::Bool(i % 3 == 0)),
                ("title".to_string(), Value::Str(format!("item {} ü", i))),
                (
                    "description".to_string(),
                    Value::Str("lorem ipsum ".repeat((i % 7) as usize)),
                ),
            ]
            .into_iter()
            .collect()
        })
        .collect()
}

fn worker_program() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lsearch"))
}

/// `rows(n)` followed by rows carrying infinite and NaN floats
fn rows_with_non_finite(n: i32) -> Vec<Row> {
    let mut all = rows(n);
    for (offset, value) in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN]
        .into_iter()
        .enumerate()
    {
        let mut row = rows(1).remove(0);
        row.insert("id".to_string(), Value::Int32(n + offset as i32));
        row.insert("value".to_string(), Value::Float32(value));
        all.push(row);
    }
    all
}

fn serialized(tmp: &TempDir, compress: bool, n: i32) -> RowStore {
    serialized_rows(tmp, compress, &rows(n))
}

fn serialized_rows(tmp: &TempDir, compress: bool, rows: &[Row]) -> RowStore {
    let store = RowStore::new(
        tmp.path().join("rows.bin"),
        schema(),
        &RowStoreConfig::default().with_compress(compress),
    );
    store.serialize(rows).unwrap();
    store
}

/// Row equality that compares floats bit for bit, so NaN matches itself
fn assert_same_rows(got: &[Row], expected: &[Row], context: &str) {
    assert_eq!(got.len(), expected.len(), "{}", context);
    for (row_got, row_expected) in got.iter().zip(expected) {
        assert_eq!(
            row_got.keys().collect::<Vec<_>>(),
            row_expected.keys().collect::<Vec<_>>(),
            "{}",
            context
        );
        for (name, value) in row_expected {
            match (&row_got[name], value) {
                (Value::Float32(a), Value::Float32(b)) => {
                    assert_eq!(a.to_bits(), b.to_bits(), "{} column {}", context, name)
                }
                (Value::Float64(a), Value::Float64(b)) => {
                    assert_eq!(a.to_bits(), b.to_bits(), "{} column {}", context, name)
                }
                (a, b) => assert_eq!(a, b, "{} column {}", context, name),
            }
        }
    }
}

#[test]
fn every_strategy_returns_identical_rows() {
    for compress in [true, false] {
        let tmp = TempDir::new().unwrap();
        let all = rows_with_non_finite(40);
        let store = serialized_rows(&tmp, compress, &all);
        // 40..43 hold inf, -inf and NaN
        let wanted: Vec<usize> = vec![39, 0, 42, 17, 17, 40, 3, 22, 8, 41, 31, 1];
        let expected: Vec<Row> = wanted.iter().map(|&i| all[i].clone()).collect();

        let strategies = [
            ReadStrategy::Sequential,
            ReadStrategy::Threads { workers: 4 },
            ReadStrategy::Mmap { workers: 3 },
            ReadStrategy::Processes {
                workers: 2,
                program: worker_program(),
            },
        ];
        for strategy in &strategies {
            let got = store.read_with(&wanted, strategy).unwrap();
            assert_same_rows(&got, &expected, &format!("strategy {:?}", strategy));
        }
    }
}

#[test]
fn reopened_store_reads_every_row() {
    let tmp = TempDir::new().unwrap();
    serialized(&tmp, true, 12);

    let store = RowStore::open(tmp.path().join("rows.bin")).unwrap();
    assert_eq!(store.len().unwrap(), 12);
    let all: Vec<usize> = (0..12).collect();
    assert_eq!(store.read_rows(&all).unwrap(), rows(12));
    assert_eq!(store.read_rows_parallel(&all, 5).unwrap(), rows(12));
    assert!(store.read_rows(&[]).unwrap().is_empty());
}

#[test]
fn offset_index_is_ordinal() {
    let tmp = TempDir::new().unwrap();
    serialized(&tmp, false, 5);

    let index = OffsetIndex::load(tmp.path().join("rows.bin.idx")).unwrap();
    assert_eq!(index.len(), 5);
    assert_eq!(index.get(0), Some(0));
    assert!(index.as_slice().windows(2).all(|w| w[0] < w[1]));

    // row 0: fixed block of 4 + 4 + 1 bytes, "item 0 ü" (9 bytes) and an empty description
    assert_eq!(index.get(1), Some(9 + 4 + 9 + 4));
}

#[test]
fn missing_column_fails_before_writing() {
    let tmp = TempDir::new().unwrap();
    let store = RowStore::new(
        tmp.path().join("rows.bin"),
        schema(),
        &RowStoreConfig::default(),
    );
    let mut data = rows(4);
    data[3].remove("in_stock");

    let err = store.serialize(&data).unwrap_err();
    assert!(matches!(err, LsearchError::SchemaViolation(_)));
    assert!(err.to_string().contains("missing column in row 3: in_stock"));
    assert!(!tmp.path().join("rows.bin").exists());
    assert!(!tmp.path().join("rows.bin.idx").exists());
}

#[test]
fn empty_and_fixed_only_tables() {
    let tmp = TempDir::new().unwrap();
    let store = serialized(&tmp, true, 0);
    assert!(store.is_empty().unwrap());
    assert_eq!(fs::metadata(tmp.path().join("rows.bin")).unwrap().len(), 0);

    let fixed = RowSchema::builder()
        .fixed("a", FixedCodec::UInt64)
        .fixed("b", FixedCodec::Float64)
        .build()
        .unwrap();
    let store = RowStore::new(tmp.path().join("fixed.bin"), fixed, &RowStoreConfig::default());
    let data: Vec<Row> = (0..3u64)
        .map(|i| {
            [
                ("a".to_string(), Value::UInt64(u64::MAX - i)),
                ("b".to_string(), Value::Float64(i as f64 * 0.25)),
            ]
            .into_iter()
            .collect()
        })
        .collect();
    store.serialize(&data).unwrap();
    assert_eq!(fs::metadata(tmp.path().join("fixed.bin")).unwrap().len(), 3 * 16);
    assert_eq!(store.read_rows_mmap(&[2, 0], 2).unwrap(), vec![data[2].clone(), data[0].clone()]);
}

#[test]
fn process_worker_failure_is_reported() {
    let tmp = TempDir::new().unwrap();
    let store = serialized(&tmp, true, 3);
    let err = store
        .read_rows_processes(&[0, 1], 1, &tmp.path().join("no-such-program"))
        .unwrap_err();
    assert!(matches!(err, LsearchError::Worker(_)));
}

#[test]
fn process_workers_handle_large_row_lists() {
    let tmp = TempDir::new().unwrap();
    let fixed = RowSchema::builder()
        .fixed("id", FixedCodec::Int32)
        .build()
        .unwrap();
    let store = RowStore::new(tmp.path().join("ids.bin"), fixed, &RowStoreConfig::default());
    let data: Vec<Row> = (0..100_000)
        .map(|i| [("id".to_string(), Value::Int32(i))].into_iter().collect())
        .collect();
    store.serialize(&data).unwrap();

    // far more row numbers than fit on a command line
    let all: Vec<usize> = (0..data.len()).rev().collect();
    let got = store
        .read_with(
            &all,
            &ReadStrategy::Processes {
                workers: 4,
                program: worker_program(),
            },
        )
        .unwrap();
    assert_eq!(got.len(), data.len());
    assert_eq!(got, store.read_with(&all, &ReadStrategy::Sequential).unwrap());
    assert_eq!(got[0], data[99_999]);
}

#[test]
fn stores_sharing_a_stem_keep_their_own_schema() {
    let tmp = TempDir::new().unwrap();
    let narrow = RowSchema::builder()
        .fixed("id", FixedCodec::Int32)
        .build()
        .unwrap();
    let id_rows: Vec<Row> = (0..3)
        .map(|i| [("id".to_string(), Value::Int32(i))].into_iter().collect())
        .collect();

    serialized(&tmp, true, 4);
    RowStore::new(tmp.path().join("rows.dat"), narrow.clone(), &RowStoreConfig::default())
        .serialize(&id_rows)
        .unwrap();

    assert!(tmp.path().join("rows.bin.schema.json").exists());
    assert!(tmp.path().join("rows.dat.schema.json").exists());

    let bin = RowStore::open(tmp.path().join("rows.bin")).unwrap();
    let dat = RowStore::open(tmp.path().join("rows.dat")).unwrap();
    assert_eq!(bin.schema(), &schema());
    assert_eq!(dat.schema(), &narrow);
    assert_eq!(bin.read_rows(&[0, 3]).unwrap(), vec![rows(4)[0].clone(), rows(4)[3].clone()]);
    assert_eq!(dat.read_rows(&[2]).unwrap(), vec![id_rows[2].clone()]);
}

#[test]
fn out_of_range_rows_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = serialized(&tmp, true, 3);
    for strategy in [
        ReadStrategy::Sequential,
        ReadStrategy::Threads { workers: 2 },
        ReadStrategy::Mmap { workers: 2 },
        ReadStrategy::Processes {
            workers: 2,
            program: worker_program(),
        },
    ] {
        assert!(matches!(
            store.read_with(&[1, 3], &strategy),
            Err(LsearchError::InvalidRequest(_))
        ));
    }
}

#[test]
fn open_missing_store() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(
        RowStore::open(tmp.path().join("rows.bin")),
        Err(LsearchError::NotFound(_))
    ));
}
