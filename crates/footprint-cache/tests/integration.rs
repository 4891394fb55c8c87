use std::cell::Cell;
use std::fs::{self, OpenOptions};
use std::io::Write;

use footprint_cache::frame::{FRAME_HEADER_SIZE, HEADER_SIZE};
use footprint_cache::{
    Arguments, CacheConfig, CacheError, CacheMode, FrameKind, Outcome, PersistentCache, ReadMode,
    StoreReader, StoreWriter, WriteOptions,
};
use tempfile::TempDir;

fn args(x: i64) -> Arguments {
    Arguments::new()
        .with("x", &x)
        .unwrap()
        .with("scale", &2.0)
        .unwrap()
}

#[test]
fn default_mode_computes_once() {
    let temp_dir = TempDir::new().unwrap();
    let cache = PersistentCache::open(CacheConfig::at(temp_dir.path())).unwrap();
    let mut square = cache.function("tests", "square").unwrap();
    let calls = Cell::new(0);
    let compute = || {
        calls.set(calls.get() + 1);
        vec![7i64 * 7]
    };

    let first = square.call(&args(7), CacheMode::Default, compute).unwrap();
    let second = square.call(&args(7), CacheMode::Default, compute).unwrap();

    assert_eq!(first, Outcome::Computed(vec![49]));
    assert_eq!(second, Outcome::Cached(vec![49]));
    assert_eq!(calls.get(), 1);
}

#[test]
fn results_survive_reopening() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig::at(temp_dir.path());
    {
        let cache = PersistentCache::open(config.clone()).unwrap();
        let mut f = cache.function("tests", "label").unwrap();
        f.insert(&args(1), "one").unwrap();
    }

    let cache = PersistentCache::open(config).unwrap();
    let f = cache.function("tests", "label").unwrap();
    assert_eq!(f.get::<String>(&args(1)).unwrap().as_deref(), Some("one"));
    assert_eq!(f.get::<String>(&args(2)).unwrap(), None);
    assert!(temp_dir.path().join("tests.label.fpc").exists());
}

#[test]
fn no_cache_mode_stores_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let cache = PersistentCache::open(CacheConfig::at(temp_dir.path())).unwrap();
    let mut f = cache.function("tests", "noop").unwrap();

    let outcome = f.call(&args(3), CacheMode::NoCache, || 3i64).unwrap();
    assert_eq!(outcome, Outcome::Computed(3));
    assert!(f.is_empty());
    assert!(!f.contains(&args(3)).unwrap());
}

#[test]
fn update_mode_overwrites_and_later_records_win() {
    let temp_dir = TempDir::new().unwrap();
    let config = CacheConfig::at(temp_dir.path());
    {
        let cache = PersistentCache::open(config.clone()).unwrap();
        let mut f = cache.function("tests", "versioned").unwrap();
        f.call(&args(1), CacheMode::Default, || 10i64).unwrap();
        let updated = f.call(&args(1), CacheMode::Update, || 20i64).unwrap();
        assert_eq!(updated, Outcome::Computed(20));
    }

    let cache = PersistentCache::open(config).unwrap();
    let mut f = cache.function("tests", "versioned").unwrap();
    assert_eq!(f.len(), 1);
    let cached = f.call(&args(1), CacheMode::Default, || 30i64).unwrap();
    assert_eq!(cached, Outcome::Cached(20));
}

#[test]
fn has_key_and_cache_only_never_compute() {
    let temp_dir = TempDir::new().unwrap();
    let cache = PersistentCache::open(CacheConfig::at(temp_dir.path())).unwrap();
    let mut f = cache.function("tests", "lookup").unwrap();

    let present = f
        .call(&args(5), CacheMode::HasKey, || -> i64 { panic!("computed") })
        .unwrap();
    assert_eq!(present, Outcome::Present(false));

    let err = f
        .call(&args(5), CacheMode::CacheOnly, || -> i64 { panic!("computed") })
        .unwrap_err();
    assert!(matches!(err, CacheError::KeyNotFound(key) if key.len() == 64));

    f.insert(&args(5), &25i64).unwrap();
    assert_eq!(
        f.call(&args(5), CacheMode::HasKey, || 0i64).unwrap(),
        Outcome::Present(true)
    );
    assert_eq!(
        f.call(&args(5), CacheMode::CacheOnly, || 0i64).unwrap(),
        Outcome::Cached(25)
    );
}

#[test]
fn failed_computations_are_not_stored() {
    let temp_dir = TempDir::new().unwrap();
    let cache = PersistentCache::open(CacheConfig::at(temp_dir.path())).unwrap();
    let mut f = cache.function("tests", "fallible").unwrap();

    let result: Result<Outcome<i64>, CacheError> = f.try_call(&args(1), CacheMode::Default, || {
        Err(CacheError::KeyNotFound("simulated".into()))
    });
    assert!(result.is_err());
    assert!(f.is_empty());
}

#[test]
fn functions_do_not_share_entries() {
    let temp_dir = TempDir::new().unwrap();
    let cache = PersistentCache::open(CacheConfig::at(temp_dir.path())).unwrap();
    let mut a = cache.function("tests", "a").unwrap();
    let b = cache.function("tests", "b").unwrap();

    a.insert(&args(1), &1i64).unwrap();
    assert!(a.contains(&args(1)).unwrap());
    assert!(!b.contains(&args(1)).unwrap());
}

#[test]
fn stored_type_mismatch_is_a_decode_error() {
    let temp_dir = TempDir::new().unwrap();
    let cache = PersistentCache::open(CacheConfig::at(temp_dir.path())).unwrap();
    let mut f = cache.function("tests", "typed").unwrap();

    f.insert(&args(1), "text").unwrap();
    assert!(matches!(f.get::<i64>(&args(1)), Err(CacheError::Decode(_))));
}

fn truncated_store(temp_dir: &TempDir) -> CacheConfig {
    let config = CacheConfig::at(temp_dir.path());
    {
        let cache = PersistentCache::open(config.clone()).unwrap();
        let mut f = cache.function("tests", "torn").unwrap();
        f.insert(&args(1), &1i64).unwrap();
        f.insert(&args(2), &2i64).unwrap();
    }
    let path = temp_dir.path().join("tests.torn.fpc");
    let len = fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 3).unwrap();
    config
}

#[test]
fn permissive_open_drops_a_truncated_tail() {
    let temp_dir = TempDir::new().unwrap();
    let config = truncated_store(&temp_dir);

    let cache = PersistentCache::open(config.clone()).unwrap();
    let mut f = cache.function("tests", "torn").unwrap();
    assert_eq!(f.get::<i64>(&args(1)).unwrap(), Some(1));
    assert_eq!(f.get::<i64>(&args(2)).unwrap(), None);

    // appends after the repair stay readable
    f.insert(&args(3), &3i64).unwrap();
    drop(f);
    let f = cache.function("tests", "torn").unwrap();
    assert_eq!(f.get::<i64>(&args(3)).unwrap(), Some(3));
    assert_eq!(f.len(), 2);
}

#[test]
fn strict_open_reports_a_truncated_tail() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = truncated_store(&temp_dir);
    config.read_mode = ReadMode::Strict;

    let cache = PersistentCache::open(config).unwrap();
    let err = cache.function("tests", "torn").unwrap_err();
    assert!(matches!(err, CacheError::TruncatedFrame { .. }));
}

#[test]
fn unknown_frames_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("raw.fpc");
    {
        let mut writer = StoreWriter::open(&path, WriteOptions::default()).unwrap();
        writer.append_raw(FrameKind::Unknown(0x7F), b"future").unwrap();
        writer.append_entry(&[9u8; 32], &[0x01, 0x00]).unwrap();
    }

    let mut reader = StoreReader::open(&path, ReadMode::Strict).unwrap();
    let record = reader.read_record().unwrap().unwrap();
    assert_eq!(record.key, [9u8; 32]);
    assert_eq!(record.footprint, vec![0x01, 0x00]);
    assert!(reader.read_record().unwrap().is_none());
    assert_eq!(
        reader.position(),
        (HEADER_SIZE + 2 * FRAME_HEADER_SIZE + 6 + 32 + 2) as u64
    );
}

#[test]
fn raw_frames_must_hold_the_fixed_part() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("raw.fpc");
    let mut writer = StoreWriter::open(&path, WriteOptions::default()).unwrap();

    let err = writer.append_raw(FrameKind::Entry, &[0u8; 31]).unwrap_err();
    assert!(matches!(err, CacheError::InvalidFrame { offset, .. } if offset == HEADER_SIZE as u64));

    let mut content = vec![4u8; 32];
    content.extend_from_slice(&[0x01, 0x01]);
    writer.append_raw(FrameKind::Entry, &content).unwrap();
    drop(writer);

    let mut reader = StoreReader::open(&path, ReadMode::Strict).unwrap();
    let record = reader.read_record().unwrap().unwrap();
    assert_eq!(record.key, [4u8; 32]);
    assert_eq!(record.footprint, vec![0x01, 0x01]);
}

#[test]
fn foreign_files_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tests.foreign.fpc");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(b"definitely not a cache store").unwrap();
    drop(file);

    let cache = PersistentCache::open(CacheConfig::at(temp_dir.path())).unwrap();
    let err = cache.function("tests", "foreign").unwrap_err();
    assert!(matches!(err, CacheError::InvalidHeader(_)));
}

#[test]
fn non_append_writer_empties_the_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("reset.fpc");
    {
        let mut writer = StoreWriter::open(&path, WriteOptions::default()).unwrap();
        writer.append_entry(&[1u8; 32], &[0x01, 0x00]).unwrap();
    }
    {
        let options = WriteOptions {
            append: false,
            ..WriteOptions::default()
        };
        StoreWriter::open(&path, options).unwrap();
    }
    assert_eq!(fs::metadata(&path).unwrap().len(), HEADER_SIZE as u64);
}
