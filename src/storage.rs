use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::validation::{allowed_file, sanitize_filename};

/// The directory holding uploaded image files, named `<millis>-<sanitised>`.
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensure the upload directory exists
    pub fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to create upload directory {:?}", self.dir))?;
        }
        Ok(())
    }

    /// Claim a fresh `<millis>-<sanitised>` name by creating an empty file
    /// for it. A name already taken, possibly by a concurrent upload, moves
    /// on to the next millisecond.
    pub fn reserve(&self, original: &str) -> Result<String> {
        let safe = sanitize_filename(original);
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let name = format!("{millis}-{safe}");
            let path = self.resolve(&name)?;
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(name),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create upload file {:?}", path))
                }
            }
        }
    }

    /// Fill a file previously claimed with `reserve`. Never creates one.
    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("Upload file {:?} was not reserved", path))?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Failed to write upload file {:?}", path))?;
        Ok(())
    }

    /// Remove a stored file. A missing file is not an error.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let path = self.resolve(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove upload file {:?}", path)),
        }
    }

    /// Delete stored uploads that no image row references. Only names in the
    /// `<millis>-<name>.jpg` form are touched; anything else in the directory
    /// is left alone. Returns the names that were removed.
    pub fn sweep_orphans(&self, referenced: &[String]) -> Result<Vec<String>> {
        let keep: HashSet<&str> = referenced.iter().map(String::as_str).collect();
        let mut removed = Vec::new();

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read upload directory {:?}", self.dir))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_stored_name(&name) || keep.contains(name.as_str()) {
                continue;
            }
            fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove orphaned upload {:?}", entry.path()))?;
            removed.push(name);
        }

        removed.sort();
        Ok(removed)
    }

    /// Map a stored name to a path, refusing anything that is not a single
    /// plain path component.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(_)), None) => Ok(self.dir.join(name)),
            _ => anyhow::bail!("Refusing unsafe upload file name {:?}", name),
        }
    }
}

/// Whether `name` has the shape `reserve` produces: a millisecond stamp,
/// a dash and a JPEG file name.
pub fn is_stored_name(name: &str) -> bool {
    let Some((millis, rest)) = name.split_once('-') else {
        return false;
    };
    !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit()) && allowed_file(rest)
}
