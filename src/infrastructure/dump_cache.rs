/// AST Dump Cache.
///
/// External parser invocations are the slow path, so dumps are cached per
/// source file and validated against the source's modification time.
///
/// Cache layout, per source file:
/// - `<stem>-<hash>.ast.json` - the dumped AST
/// - `<stem>-<hash>.ast.json.meta` - JSON metadata for validation

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata stored alongside a cached dump.
#[derive(Debug, Serialize, Deserialize)]
pub struct DumpCacheMetadata {
    /// Version of the cache format (for future compatibility)
    pub version: u32,
    /// Absolute-ish path of the source the dump was produced from
    pub source_path: String,
    /// Modification timestamp of the source at dump time (unix seconds)
    pub source_mtime: u64,
}

impl DumpCacheMetadata {
    pub const CURRENT_VERSION: u32 = 1;
}

/// Dump cache manager rooted at one cache directory.
pub struct DumpCache {
    cache_dir: PathBuf,
}

impl DumpCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// Return the cached dump path if it exists and the source is unchanged.
    pub fn get_valid(&self, source: &Path) -> Option<PathBuf> {
        let dump_path = self.dump_path(source);
        let meta_path = self.meta_path(source);

        if !dump_path.exists() || !meta_path.exists() {
            return None;
        }

        let meta = match self.load_metadata(&meta_path) {
            Ok(m) => m,
            Err(e) => {
                println!("[Dump Cache] Failed to load metadata: {}", e);
                return None;
            }
        };

        if meta.version != DumpCacheMetadata::CURRENT_VERSION {
            println!("[Dump Cache] Cache version mismatch");
            return None;
        }

        match Self::file_mtime(source) {
            Ok(current) if current == meta.source_mtime => {
                println!("[Dump Cache] Reusing dump for {}", source.display());
                Some(dump_path)
            }
            _ => {
                println!("[Dump Cache] Source changed: {}", source.display());
                None
            }
        }
    }

    /// Write a fresh dump and its metadata. Returns the dump path.
    pub fn store(&self, source: &Path, ast: &Value) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Cannot create cache dir: {}", self.cache_dir.display()))?;

        let dump_path = self.dump_path(source);
        let json = serde_json::to_string(ast).context("Failed to serialize AST dump")?;
        let mut file =
            File::create(&dump_path).context("Failed to create cached dump file")?;
        file.write_all(json.as_bytes())
            .context("Failed to write cached dump")?;

        let meta = DumpCacheMetadata {
            version: DumpCacheMetadata::CURRENT_VERSION,
            source_path: source.to_string_lossy().to_string(),
            source_mtime: Self::file_mtime(source).unwrap_or(0),
        };
        let meta_json =
            serde_json::to_string_pretty(&meta).context("Failed to serialize cache metadata")?;
        fs::write(self.meta_path(source), meta_json)
            .context("Failed to write cache metadata")?;

        Ok(dump_path)
    }

    /// Drop the cached dump for one source.
    pub fn invalidate(&self, source: &Path) -> Result<()> {
        let dump_path = self.dump_path(source);
        if dump_path.exists() {
            fs::remove_file(&dump_path)?;
        }
        let meta_path = self.meta_path(source);
        if meta_path.exists() {
            fs::remove_file(&meta_path)?;
        }
        Ok(())
    }

    pub fn dump_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "source".to_string());
        self.cache_dir
            .join(format!("{}-{:016x}.ast.json", stem, path_hash(source)))
    }

    fn meta_path(&self, source: &Path) -> PathBuf {
        let mut path = self.dump_path(source).into_os_string();
        path.push(".meta");
        PathBuf::from(path)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Private helpers
    // ─────────────────────────────────────────────────────────────────────

    fn load_metadata(&self, meta_path: &Path) -> Result<DumpCacheMetadata> {
        let contents = fs::read_to_string(meta_path)?;
        let meta: DumpCacheMetadata = serde_json::from_str(&contents)?;
        Ok(meta)
    }

    fn file_mtime(path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path)?;
        let mtime = metadata.modified()?;
        let duration = mtime.duration_since(SystemTime::UNIX_EPOCH)?;
        Ok(duration.as_secs())
    }
}

/// FNV-1a over the full path, so same-named files in different directories
/// get distinct cache slots.
fn path_hash(path: &Path) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in path.to_string_lossy().as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
