//! Function-result cache keyed by argument footprints.
//!
//! Every cached function gets its own store file, named after the module and
//! qualified name of the function. The key of a call is the SHA-256 digest of
//! the footprint of its named arguments, so the same arguments always find
//! the same entry, across processes and runs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use footprint_canonical::{
    decode_value, encode, encode_value, hash_bytes, Digest, Encodable, EncodeError, FromValue,
    Resolver, Value,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::errors::CacheError;
use crate::frame::KEY_SIZE;
use crate::reader::StoreReader;
use crate::writer::{StoreWriter, WriteOptions};

/// File extension of store files.
pub const STORE_EXTENSION: &str = "fpc";

/// How a cached call treats the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Return the stored result, or compute and store it.
    #[default]
    Default,
    /// Call through; no key is computed and nothing is stored.
    NoCache,
    /// Compute and overwrite the stored result.
    Update,
    /// Only report whether a result is stored.
    HasKey,
    /// Return the stored result or fail with [`CacheError::KeyNotFound`].
    CacheOnly,
}

/// Unrecognised cache mode name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown cache mode {0:?}")]
pub struct UnknownCacheMode(pub String);

impl FromStr for CacheMode {
    type Err = UnknownCacheMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(CacheMode::Default),
            "no_cache" => Ok(CacheMode::NoCache),
            "update" => Ok(CacheMode::Update),
            "has_key" => Ok(CacheMode::HasKey),
            "cache_only" => Ok(CacheMode::CacheOnly),
            other => Err(UnknownCacheMode(other.to_string())),
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheMode::Default => "default",
            CacheMode::NoCache => "no_cache",
            CacheMode::Update => "update",
            CacheMode::HasKey => "has_key",
            CacheMode::CacheOnly => "cache_only",
        })
    }
}

/// Result of a cached call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Served from the store.
    Cached(T),
    /// Computed by this call.
    Computed(T),
    /// Presence check only ([`CacheMode::HasKey`]).
    Present(bool),
}

impl<T> Outcome<T> {
    /// The result, unless this was a presence check.
    pub fn into_result(self) -> Option<T> {
        match self {
            Outcome::Cached(value) | Outcome::Computed(value) => Some(value),
            Outcome::Present(_) => None,
        }
    }

    /// True when the result came from the store.
    pub fn is_cached(&self) -> bool {
        matches!(self, Outcome::Cached(_))
    }
}

/// Named arguments of one call, defaults already applied by the caller.
///
/// Argument order does not matter: the key is built from a mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: BTreeMap<String, Value>,
}

impl Arguments {
    /// Empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an argument.
    pub fn with<T: Encodable + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, EncodeError> {
        self.push(name, value)?;
        Ok(self)
    }

    /// Adds (or replaces) an argument in place.
    pub fn push<T: Encodable + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), EncodeError> {
        let value = Resolver::new().resolve(value)?;
        self.entries.insert(name.into(), value);
        Ok(())
    }

    /// The arguments as a name-to-value mapping.
    pub fn to_value(&self) -> Value {
        Value::Mapping(
            self.entries
                .iter()
                .map(|(name, value)| (Value::from(name.as_str()), value.clone()))
                .collect(),
        )
    }

    /// SHA-256 of the arguments' footprint.
    pub fn key(&self) -> Result<Digest, EncodeError> {
        Ok(hash_bytes(&encode_value(&self.to_value())?))
    }
}

/// Directory of per-function stores.
#[derive(Debug, Clone)]
pub struct PersistentCache {
    config: CacheConfig,
}

impl PersistentCache {
    /// Opens the cache, creating its directory if needed.
    pub fn open(config: CacheConfig) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&config.path)?;
        debug!(path = %config.path.display(), "opened cache directory");
        Ok(Self { config })
    }

    /// Settings in use.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store file of the function `module.qualname`.
    pub fn store_path(&self, module: &str, qualname: &str) -> PathBuf {
        self.config
            .path
            .join(format!("{module}.{qualname}.{STORE_EXTENSION}"))
    }

    /// Opens (or creates) the store of the function `module.qualname`.
    pub fn function(&self, module: &str, qualname: &str) -> Result<FunctionCache, CacheError> {
        FunctionCache::open(
            format!("{module}.{qualname}"),
            self.store_path(module, qualname),
            &self.config,
        )
    }
}

/// Cached results of a single function.
///
/// All entries are loaded on open; later records for a key supersede earlier
/// ones.
pub struct FunctionCache {
    name: String,
    path: PathBuf,
    entries: HashMap<[u8; KEY_SIZE], Vec<u8>>,
    writer: StoreWriter,
}

impl FunctionCache {
    fn open(name: String, path: PathBuf, config: &CacheConfig) -> Result<Self, CacheError> {
        let mut writer = StoreWriter::open(
            &path,
            WriteOptions {
                sync: config.sync,
                append: true,
            },
        )?;

        let mut reader = StoreReader::open(&path, config.read_mode)?;
        let mut entries = HashMap::new();
        while let Some(record) = reader.read_record()? {
            entries.insert(record.key, record.footprint);
        }

        let len = std::fs::metadata(&path)?.len();
        if reader.position() < len {
            warn!(
                function = %name,
                offset = reader.position(),
                dropped = len - reader.position(),
                "discarding truncated store tail"
            );
            writer.truncate(reader.position())?;
        }

        debug!(function = %name, entries = entries.len(), "opened function store");
        Ok(Self {
            name,
            path,
            entries,
            writer,
        })
    }

    /// `module.qualname` of the cached function.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when a result for `args` is stored.
    pub fn contains(&self, args: &Arguments) -> Result<bool, CacheError> {
        Ok(self.entries.contains_key(&args.key()?.bytes))
    }

    /// Stored result for `args`, if any.
    pub fn get<T: FromValue>(&self, args: &Arguments) -> Result<Option<T>, CacheError> {
        let key = args.key()?;
        self.lookup(&key)
    }

    /// Stores `result` for `args`, replacing any earlier entry.
    pub fn insert<T: Encodable + ?Sized>(
        &mut self,
        args: &Arguments,
        result: &T,
    ) -> Result<(), CacheError> {
        let key = args.key()?;
        self.store(&key, result)
    }

    fn lookup<T: FromValue>(&self, key: &Digest) -> Result<Option<T>, CacheError> {
        match self.entries.get(&key.bytes) {
            Some(footprint) => {
                debug!(function = %self.name, key = %key.hex(), "cache hit");
                Ok(Some(T::from_value(decode_value(footprint)?)?))
            }
            None => {
                debug!(function = %self.name, key = %key.hex(), "cache miss");
                Ok(None)
            }
        }
    }

    fn store<T: Encodable + ?Sized>(&mut self, key: &Digest, result: &T) -> Result<(), CacheError> {
        let footprint = encode(result)?;
        self.writer.append_entry(&key.bytes, &footprint)?;
        debug!(function = %self.name, key = %key.hex(), len = footprint.len(), "stored result");
        self.entries.insert(key.bytes, footprint);
        Ok(())
    }

    /// Runs `compute` under `mode`.
    ///
    /// ```rust,no_run
    /// use footprint_cache::{Arguments, CacheConfig, CacheMode, PersistentCache};
    ///
    /// let cache = PersistentCache::open(CacheConfig::default())?;
    /// let mut square = cache.function("demo", "square")?;
    /// let args = Arguments::new().with("x", &12)?;
    /// let outcome = square.call(&args, CacheMode::Default, || 12 * 12)?;
    /// assert_eq!(outcome.into_result(), Some(144));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn call<T, F>(
        &mut self,
        args: &Arguments,
        mode: CacheMode,
        compute: F,
    ) -> Result<Outcome<T>, CacheError>
    where
        T: Encodable + FromValue,
        F: FnOnce() -> T,
    {
        self.try_call(args, mode, || Ok::<T, CacheError>(compute()))
    }

    /// Like [`FunctionCache::call`] for fallible computations. Failed
    /// computations are never stored.
    pub fn try_call<T, E, F>(
        &mut self,
        args: &Arguments,
        mode: CacheMode,
        compute: F,
    ) -> Result<Outcome<T>, E>
    where
        T: Encodable + FromValue,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        if mode == CacheMode::NoCache {
            return Ok(Outcome::Computed(compute()?));
        }

        let key = args.key().map_err(CacheError::from)?;
        match mode {
            CacheMode::HasKey => Ok(Outcome::Present(self.entries.contains_key(&key.bytes))),
            CacheMode::CacheOnly => match self.lookup(&key)? {
                Some(value) => Ok(Outcome::Cached(value)),
                None => Err(CacheError::KeyNotFound(key.hex()).into()),
            },
            CacheMode::Default => {
                if let Some(value) = self.lookup(&key)? {
                    return Ok(Outcome::Cached(value));
                }
                let value = compute()?;
                self.store(&key, &value)?;
                Ok(Outcome::Computed(value))
            }
            CacheMode::Update | CacheMode::NoCache => {
                let value = compute()?;
                self.store(&key, &value)?;
                Ok(Outcome::Computed(value))
            }
        }
    }
}

impl fmt::Debug for FunctionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCache")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}
