use anyhow::{anyhow, Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, PathPersistError, TempPath};
use walkdir::WalkDir;

use crate::html_parser::ResourceType;
use crate::naming::disambiguate;

pub const ORIGINAL_PAGE: &str = "index.html";
pub const LOCAL_PAGE: &str = "index_local.html";

/// Characters escaped when a stored file name is used as a URL reference.
const REFERENCE_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A file found under the destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    /// Relative to the destination directory, `/`-separated.
    pub path: String,
    pub size: u64,
    pub display_size: String,
}

/// Owns the on-disk layout of one destination directory.
///
/// Asset names are claimed under a lock per asset class, and every write goes
/// through a temp file in the target directory that is renamed into place,
/// so readers never observe a half-written asset.
#[derive(Clone)]
pub struct FileManager {
    base_dir: PathBuf,
    class_locks: Arc<[Mutex<()>; 3]>,
}

impl FileManager {
    /// Creates the destination directory if needed. Existing content is kept.
    pub fn new(base_dir: &Path) -> Result<Self> {
        let base_dir = base_dir.to_path_buf();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create base directory: {:?}", base_dir))?;

        Ok(Self {
            base_dir,
            class_locks: Arc::new([Mutex::new(()), Mutex::new(()), Mutex::new(())]),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn class_dir(&self, resource_type: ResourceType) -> PathBuf {
        self.base_dir.join(resource_type.dir_name())
    }

    /// Removes output of earlier runs: both pages and the asset directories.
    pub fn clean(&self) -> Result<()> {
        for resource_type in ResourceType::ALL {
            let dir = self.class_dir(resource_type);
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e).with_context(|| format!("Failed to remove directory: {:?}", dir)),
            }
        }
        for page in [ORIGINAL_PAGE, LOCAL_PAGE] {
            let path = self.base_dir.join(page);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e).with_context(|| format!("Failed to remove file: {:?}", path)),
            }
        }
        Ok(())
    }

    /// Writes a page at the top of the destination, replacing any earlier copy.
    pub fn write_page(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.base_dir.join(name);
        let staged = Self::stage_in(&self.base_dir, content)?;
        staged
            .persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write file: {:?}", path))?;
        Ok(path)
    }

    /// Writes `content` to a temp file in the class directory and closes it.
    ///
    /// Only the path is kept, so any number of assets can wait for their
    /// names without holding file descriptors. The file is removed on drop
    /// unless it is handed to [`persist_asset`](Self::persist_asset).
    pub fn stage(&self, resource_type: ResourceType, content: &[u8]) -> Result<TempPath> {
        let dir = self.class_dir(resource_type);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create directory: {:?}", dir))?;
        Ok(Self::stage_in(&dir, content)?.into_temp_path())
    }

    fn stage_in(dir: &Path, content: &[u8]) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(".staging-")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
        file.write_all(content)
            .and_then(|_| file.flush())
            .with_context(|| format!("Failed to write temp file in {:?}", dir))?;
        Ok(file)
    }

    /// Moves a staged file to `name` in its class directory without ever
    /// replacing an existing file: when `name` is taken the first free
    /// `name_1`, `name_2`, ... is used instead.
    pub fn persist_asset(&self, staged: TempPath, resource_type: ResourceType, name: &str) -> Result<PathBuf> {
        let _claim = self.class_locks[resource_type as usize]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let dir = self.class_dir(resource_type);
        let mut staged = staged;
        for attempt in 0usize.. {
            let candidate = if attempt == 0 { name.to_string() } else { disambiguate(name, attempt) };
            let path = dir.join(&candidate);
            match staged.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(PathPersistError { error, path: temp }) if error.kind() == ErrorKind::AlreadyExists => {
                    log::debug!("{:?} exists, trying next name", path);
                    staged = temp;
                }
                Err(PathPersistError { error, .. }) => {
                    return Err(error).with_context(|| format!("Failed to store file: {:?}", path));
                }
            }
        }
        Err(anyhow!("No free file name for {} in {:?}", name, dir))
    }

    /// The reference used in rewritten markup for a file under the
    /// destination, e.g. `images/a.png`.
    pub fn local_reference(&self, file_path: &Path) -> Result<String> {
        let relative = pathdiff::diff_paths(file_path, &self.base_dir)
            .with_context(|| format!("Failed to get relative path from {:?}", file_path))?;
        Ok(relative
            .components()
            .map(|c| utf8_percent_encode(&c.as_os_str().to_string_lossy(), REFERENCE_ESCAPES).to_string())
            .collect::<Vec<_>>()
            .join("/"))
    }

    /// Resolves `relative` inside the destination directory.
    ///
    /// Returns `None` for absolute paths, paths that climb out with `..`,
    /// and existing paths whose canonical form leaves the directory.
    pub fn resolve_within(&self, relative: &str) -> Option<PathBuf> {
        let candidate = Path::new(relative);
        let mut joined = self.base_dir.clone();
        for component in candidate.components() {
            match component {
                Component::Normal(part) => joined.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        if joined.exists() {
            let base = self.base_dir.canonicalize().ok()?;
            let resolved = joined.canonicalize().ok()?;
            if !resolved.starts_with(&base) {
                return None;
            }
            return Some(resolved);
        }
        Some(joined)
    }

    /// Every file under the destination with its size.
    pub fn list_files(&self) -> Result<Vec<FileEntry>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.base_dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", self.base_dir))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let path = self.local_path_string(entry.path());
            files.push(FileEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                path,
                size,
                display_size: format_file_size(size),
            });
        }
        Ok(files)
    }

    fn local_path_string(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Formats a byte count as `B`, `KB`, `MB` or `GB` with one decimal.
pub fn format_file_size(size: u64) -> String {
    if size == 0 {
        return "0 B".to_string();
    }
    let units = ["B", "KB", "MB", "GB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < units.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, units[unit])
}
