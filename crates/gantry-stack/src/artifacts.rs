//! Artifact packaging with content-addressed reuse.
//!
//! Three artifacts ship per app: the generic dispatcher entry point (shared
//! by every routed function), a dependency bundle keyed by the lockfile
//! digest, and the application source tree. A digest is computed fresh each
//! run and compared against the one persisted under `.gantry/`; on a match
//! the previous upload's version token is re-read instead of re-uploading.
//! The persisted digest is written only after a successful upload, so a
//! failed run never claims an upload that did not happen.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::SynthesisError;

pub const DISPATCHER_FILE_NAME: &str = "gantry-dispatcher";
pub const HIDDEN_DIR: &str = ".gantry";

const APP_CHECKSUM: &str = "app_checksum";
const DEPS_CHECKSUM: &str = "deps_checksum";
const DEPS_MANIFEST: &str = "Cargo.lock";

/// Directories never packaged or digested from the app tree.
const SKIPPED_DIRS: [&str; 2] = ["target", "vendor"];

/// Failure inside an artifact store.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// The injected storage collaborator. `put` returns the stored object's
/// version token; `get` returns `None` when the key does not exist.
pub trait ArtifactStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<String, StoreError>;
    fn get(&self, key: &str) -> Result<Option<(Vec<u8>, String)>, StoreError>;
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: HashMap<String, (Vec<u8>, String)>,
    pub puts: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for MemoryStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        self.puts += 1;
        let version = format!("v{}-{}", self.puts, &digest_bytes(bytes)[..12]);
        self.objects
            .insert(key.to_string(), (bytes.to_vec(), version.clone()));
        Ok(version)
    }

    fn get(&self, key: &str) -> Result<Option<(Vec<u8>, String)>, StoreError> {
        Ok(self.objects.get(key).cloned())
    }
}

/// Directory-backed store for local deploys; version tokens are content
/// digests.
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ArtifactStore for DirStore {
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        fs::create_dir_all(&self.root)
            .map_err(|err| StoreError(format!("{}: {}", self.root.display(), err)))?;
        let path = self.object_path(key);
        fs::write(&path, bytes).map_err(|err| StoreError(format!("{}: {}", path.display(), err)))?;
        Ok(digest_bytes(bytes))
    }

    fn get(&self, key: &str) -> Result<Option<(Vec<u8>, String)>, StoreError> {
        let path = self.object_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes =
            fs::read(&path).map_err(|err| StoreError(format!("{}: {}", path.display(), err)))?;
        let version = digest_bytes(&bytes);
        Ok(Some((bytes, version)))
    }
}

/// Filesystem layout of the app being synthesized: the app root plus the
/// hidden build dir holding persisted checksums.
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hidden(&self) -> PathBuf {
        self.root.join(HIDDEN_DIR)
    }

    /// Last path component, used in artifact keys and env vars.
    pub fn app_dir(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "app".to_string())
    }

    fn checksum_path(&self, name: &str) -> PathBuf {
        self.hidden().join(name)
    }

    fn read_checksum(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.checksum_path(name))
            .ok()
            .map(|value| value.trim().to_string())
    }

    fn write_checksum(&self, name: &str, value: &str) -> Result<(), SynthesisError> {
        let hidden = self.hidden();
        fs::create_dir_all(&hidden).map_err(|err| SynthesisError::Io {
            path: hidden.display().to_string(),
            source: err,
        })?;
        let path = self.checksum_path(name);
        fs::write(&path, value).map_err(|err| SynthesisError::Io {
            path: path.display().to_string(),
            source: err,
        })
    }
}

/// One packaged artifact: its remote key and version token.
#[derive(Debug, Clone)]
pub struct ArtifactRef {
    pub key: String,
    pub version: String,
}

/// Everything a synthesis run packages.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub dispatcher: ArtifactRef,
    pub deps: Option<ArtifactRef>,
    pub app: ArtifactRef,
    pub app_checksum: String,
}

/// Package and upload all artifacts, reusing unchanged ones.
pub fn package(paths: &AppPaths, store: &mut dyn ArtifactStore) -> Result<Artifacts, SynthesisError> {
    let dispatcher = upload_dispatcher(store)?;
    stdio::log("stack", "generating layers");
    let deps = upload_deps_bundle(paths, store)?;
    let (app, app_checksum) = upload_app_bundle(paths, store)?;
    Ok(Artifacts {
        dispatcher,
        deps,
        app,
        app_checksum,
    })
}

/// The generic entry point every routed function shares.
pub fn dispatcher_source() -> String {
    [
        "#!/bin/sh",
        "# generic entry point shared by every routed function",
        "exec \"/opt/app/bin/${GANTRY_DISPATCH_BIN:-dispatcher}\"",
        "",
    ]
    .join("\n")
}

fn upload_dispatcher(store: &mut dyn ArtifactStore) -> Result<ArtifactRef, SynthesisError> {
    let key = format!("{}.zip", DISPATCHER_FILE_NAME);
    let source = dispatcher_source();

    if let Some((bytes, version)) = store.get(&key)? {
        if let Some(existing) = unzip_first_entry(&bytes)? {
            if existing == source.as_bytes() {
                stdio::log("stack", "- using existing dispatcher");
                return Ok(ArtifactRef { key, version });
            }
        }
    }

    stdio::log("stack", "- uploading generic dispatcher");
    let archive = zip_single("bootstrap", source.as_bytes())?;
    let version = store.put(&key, &archive)?;
    Ok(ArtifactRef { key, version })
}

fn upload_deps_bundle(
    paths: &AppPaths,
    store: &mut dyn ArtifactStore,
) -> Result<Option<ArtifactRef>, SynthesisError> {
    let manifest = paths.root().join(DEPS_MANIFEST);
    if !manifest.exists() {
        stdio::log("stack", "- no Cargo.lock detected");
        return Ok(None);
    }

    let key = format!("{}_deps.zip", paths.app_dir());
    let lock_bytes = fs::read(&manifest).map_err(|err| SynthesisError::Io {
        path: manifest.display().to_string(),
        source: err,
    })?;
    let checksum = digest_bytes(&lock_bytes);

    if paths.read_checksum(DEPS_CHECKSUM).as_deref() == Some(checksum.as_str()) {
        stdio::log("stack", "- using existing deps layer");
        let version = remote_version(store, &key)?;
        return Ok(Some(ArtifactRef { key, version }));
    }

    stdio::log("stack", "- uploading deps layer");
    let vendor = paths.root().join("vendor");
    let archive = if vendor.is_dir() {
        zip_dir(&vendor, "vendor")?
    } else {
        zip_single(DEPS_MANIFEST, &lock_bytes)?
    };
    let version = store.put(&key, &archive)?;
    paths.write_checksum(DEPS_CHECKSUM, &checksum)?;
    Ok(Some(ArtifactRef { key, version }))
}

fn upload_app_bundle(
    paths: &AppPaths,
    store: &mut dyn ArtifactStore,
) -> Result<(ArtifactRef, String), SynthesisError> {
    let key = format!("{}.zip", paths.app_dir());
    let checksum = digest_tree(paths.root())?;

    if paths.read_checksum(APP_CHECKSUM).as_deref() == Some(checksum.as_str()) {
        stdio::log("stack", "- using existing app layer");
        let version = remote_version(store, &key)?;
        return Ok((ArtifactRef { key, version }, checksum));
    }

    stdio::log("stack", "- uploading app layer");
    let prefix = format!("app/{}", paths.app_dir());
    let archive = zip_dir_with_prefix(paths.root(), &prefix)?;
    let version = store.put(&key, &archive)?;
    paths.write_checksum(APP_CHECKSUM, &checksum)?;
    Ok((ArtifactRef { key, version }, checksum))
}

/// Re-read the version token of a previously uploaded artifact. A missing
/// object despite a matching checksum means the store and the cache disagree
/// and the run must not continue on stale references.
fn remote_version(store: &mut dyn ArtifactStore, key: &str) -> Result<String, SynthesisError> {
    match store.get(key)? {
        Some((_, version)) => Ok(version),
        None => Err(SynthesisError::Store(StoreError(format!(
            "artifact '{}' missing from store despite matching checksum",
            key
        )))),
    }
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Digest over every packaged file's contents, in sorted path order.
pub fn digest_tree(root: &Path) -> Result<String, SynthesisError> {
    let mut hasher = Sha256::new();
    for file in collect_files(root, &SKIPPED_DIRS)? {
        let bytes = fs::read(&file).map_err(|err| SynthesisError::Io {
            path: file.display().to_string(),
            source: err,
        })?;
        hasher.update(&bytes);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Sorted file walk. Dot-entries are always skipped, plus any directory
/// named in `skipped_dirs`.
fn collect_files(root: &Path, skipped_dirs: &[&str]) -> Result<Vec<PathBuf>, SynthesisError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|err| SynthesisError::Io {
            path: dir.display().to_string(),
            source: err,
        })?;
        for entry in entries {
            let entry = entry.map_err(|err| SynthesisError::Io {
                path: dir.display().to_string(),
                source: err,
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                if !skipped_dirs.contains(&name.as_str()) {
                    pending.push(path);
                }
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn zip_single(name: &str, bytes: &[u8]) -> Result<Vec<u8>, SynthesisError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(name, SimpleFileOptions::default())
        .map_err(|err| SynthesisError::Archive(err.to_string()))?;
    writer
        .write_all(bytes)
        .map_err(|err| SynthesisError::Archive(err.to_string()))?;
    let cursor = writer
        .finish()
        .map_err(|err| SynthesisError::Archive(err.to_string()))?;
    Ok(cursor.into_inner())
}

fn zip_dir(root: &Path, prefix: &str) -> Result<Vec<u8>, SynthesisError> {
    zip_tree(root, prefix, &[])
}

fn zip_dir_with_prefix(root: &Path, prefix: &str) -> Result<Vec<u8>, SynthesisError> {
    zip_tree(root, prefix, &SKIPPED_DIRS)
}

fn zip_tree(root: &Path, prefix: &str, skipped_dirs: &[&str]) -> Result<Vec<u8>, SynthesisError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for file in collect_files(root, skipped_dirs)? {
        let relative = file
            .strip_prefix(root)
            .unwrap_or(&file)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<String>>()
            .join("/");
        let entry = if prefix.is_empty() {
            relative
        } else {
            format!("{}/{}", prefix, relative)
        };
        writer
            .start_file(entry.as_str(), SimpleFileOptions::default())
            .map_err(|err| SynthesisError::Archive(err.to_string()))?;
        let bytes = fs::read(&file).map_err(|err| SynthesisError::Io {
            path: file.display().to_string(),
            source: err,
        })?;
        writer
            .write_all(&bytes)
            .map_err(|err| SynthesisError::Archive(err.to_string()))?;
    }
    let cursor = writer
        .finish()
        .map_err(|err| SynthesisError::Archive(err.to_string()))?;
    Ok(cursor.into_inner())
}

fn unzip_first_entry(bytes: &[u8]) -> Result<Option<Vec<u8>>, SynthesisError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| SynthesisError::Archive(err.to_string()))?;
    if archive.is_empty() {
        return Ok(None);
    }
    let mut file = archive
        .by_index(0)
        .map_err(|err| SynthesisError::Archive(err.to_string()))?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .map_err(|err| SynthesisError::Archive(err.to_string()))?;
    Ok(Some(contents))
}
