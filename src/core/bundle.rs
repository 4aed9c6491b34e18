//! Fat-archive assembly: merges directories, zip archives and in-memory files
//! into one zip with a manifest. The first entry seen at a path wins.

use crate::utils::error::{Result, SatLinkError};
use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub title: String,
    pub version: String,
    /// Fully qualified startup entry point, recorded as `Main-Class`.
    pub entry_point: String,
}

impl Manifest {
    pub fn new(
        title: impl Into<String>,
        version: impl Into<String>,
        entry_point: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            entry_point: entry_point.into(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "Manifest-Version: 1.0\r\nImplementation-Title: {}\r\nImplementation-Version: {}\r\nMain-Class: {}\r\n\r\n",
            self.title, self.version, self.entry_point
        )
    }
}

pub struct ArchiveAssembler {
    entries: Vec<(String, Vec<u8>)>,
    seen: HashSet<String>,
    duplicates: usize,
}

impl ArchiveAssembler {
    /// Starts an archive whose first entry is the manifest, so manifests of
    /// merged archives are always discarded as duplicates.
    pub fn new(manifest: &Manifest) -> Self {
        let mut assembler = Self {
            entries: Vec::new(),
            seen: HashSet::new(),
            duplicates: 0,
        };
        assembler.add_entry(MANIFEST_PATH, manifest.render().into_bytes());
        assembler
    }

    /// Returns `false` when an entry with the same name was already added.
    pub fn add_entry(&mut self, name: impl Into<String>, data: Vec<u8>) -> bool {
        let name = normalize(&name.into());
        if !self.seen.insert(name.clone()) {
            tracing::debug!("Skipping duplicate archive entry {}", name);
            self.duplicates += 1;
            return false;
        }
        self.entries.push((name, data));
        true
    }

    /// Adds any input: directories are copied recursively, zip archives are
    /// unpacked, other files are stored under their file name.
    pub fn add_path(&mut self, path: &Path) -> Result<usize> {
        if path.is_dir() {
            return self.add_directory(path);
        }
        if !path.is_file() {
            return Err(SatLinkError::ArchiveError {
                message: format!("input {} does not exist", path.display()),
            });
        }

        let data = std::fs::read(path)?;
        if data.starts_with(ZIP_MAGIC) {
            return self.add_archive(&data);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| SatLinkError::ArchiveError {
                message: format!("input {} has no file name", path.display()),
            })?;
        Ok(usize::from(self.add_entry(name, data)))
    }

    pub fn add_directory(&mut self, dir: &Path) -> Result<usize> {
        let mut added = 0;
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| SatLinkError::ArchiveError {
                    message: format!("{}: {}", entry.path().display(), e),
                })?;
            let data = std::fs::read(entry.path())?;
            if self.add_entry(relative.to_string_lossy(), data) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Unpacks a zip archive held in memory.
    pub fn add_archive(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut added = 0;
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            if file.enclosed_name().is_none() {
                tracing::warn!("Ignoring archive entry with unsafe path {}", file.name());
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            if self.add_entry(name, data) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in &self.entries {
            zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
            zip.write_all(data)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

fn normalize(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_string()
}
