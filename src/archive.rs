use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use log::info;
use once_cell::sync::OnceCell;
use tar::Archive;
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::ArxDiffError;

/// One file inside an extracted source archive.
///
/// Content is read lazily and memoized: `bytes()` touches the disk at
/// most once, `text()` decodes at most once, and every consumer
/// (outline, diff, search, viewer) shares the cached value.
pub struct FileEntry {
    /// Display name (final path component).
    pub name: String,
    /// Canonical slash-separated path within the archive.
    pub path: String,
    disk_path: PathBuf,
    raw: OnceCell<Vec<u8>>,
    text: OnceCell<String>,
}

impl FileEntry {
    fn new(path: String, disk_path: PathBuf) -> Self {
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            name,
            path,
            disk_path,
            raw: OnceCell::new(),
            text: OnceCell::new(),
        }
    }

    /// Raw content of the entry, read from the extracted archive on
    /// first access.
    pub fn bytes(&self) -> Result<&[u8], ArxDiffError> {
        self.raw
            .get_or_try_init(|| fs::read(&self.disk_path).map_err(ArxDiffError::Io))
            .map(|v| v.as_slice())
    }

    /// Content decoded as text (lossy for non-UTF-8 bytes). Byte-exact
    /// comparisons must go through `bytes()` instead.
    pub fn text(&self) -> Result<&str, ArxDiffError> {
        self.text
            .get_or_try_init(|| {
                self.bytes()
                    .map(|b| String::from_utf8_lossy(b).into_owned())
            })
            .map(|s| s.as_str())
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.path)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    pub fn is_tex(&self) -> bool {
        self.extension().as_deref() == Some("tex")
    }
}

impl std::fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEntry")
            .field("path", &self.path)
            .finish()
    }
}

/// The flat set of files extracted from one source archive. Owns the
/// temporary directory backing the entries, so entries stay readable
/// for as long as the set is alive.
pub struct FileSet {
    entries: Vec<Arc<FileEntry>>,
    _temp_dir: Option<TempDir>,
}

impl FileSet {
    /// Extract an archive (ZIP or tar.gz) and enumerate its files.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<FileSet, ArxDiffError> {
        let temp_dir = TempDir::new()?;
        extract_archive(reader, temp_dir.path())?;
        let entries = enumerate_files(temp_dir.path())?;
        Ok(FileSet {
            entries,
            _temp_dir: Some(temp_dir),
        })
    }

    /// Enumerate an already-extracted directory. Used by tests and by
    /// callers that manage extraction themselves.
    pub fn from_dir(dir: &Path) -> Result<FileSet, ArxDiffError> {
        let entries = enumerate_files(dir)?;
        Ok(FileSet {
            entries,
            _temp_dir: None,
        })
    }

    pub fn get(&self, path: &str) -> Option<&Arc<FileEntry>> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FileEntry>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tex_files(&self) -> impl Iterator<Item = &Arc<FileEntry>> {
        self.entries.iter().filter(|e| e.is_tex())
    }

    /// Pick the main LaTeX file: the single `.tex` file if there is
    /// exactly one, otherwise the first (in enumeration order) whose
    /// content contains `\begin{document}`. No guessing beyond that;
    /// the caller decides any further fallback.
    pub fn main_file(&self) -> Option<&Arc<FileEntry>> {
        let tex: Vec<&Arc<FileEntry>> = self.tex_files().collect();
        match tex.len() {
            0 => None,
            1 => Some(tex[0]),
            _ => tex
                .into_iter()
                .find(|e| matches!(e.text(), Ok(t) if t.contains("\\begin{document}"))),
        }
    }
}

/// Extract archive (supports ZIP and TAR.GZ)
fn extract_archive<R: Read + Seek>(mut archive: R, output_dir: &Path) -> Result<(), ArxDiffError> {
    // Try to open as ZIP first
    match ZipArchive::new(&mut archive) {
        Ok(mut zip) => {
            info!("Extracting ZIP archive");
            for i in 0..zip.len() {
                let mut file = zip
                    .by_index(i)
                    .map_err(|e| ArxDiffError::Archive(e.to_string()))?;
                let outpath = match file.enclosed_name() {
                    Some(path) => output_dir.join(path),
                    None => continue,
                };

                if file.name().ends_with('/') {
                    fs::create_dir_all(&outpath)?;
                } else {
                    if let Some(p) = outpath.parent() {
                        if !p.exists() {
                            fs::create_dir_all(p)?;
                        }
                    }
                    let mut outfile = fs::File::create(&outpath)?;
                    io::copy(&mut file, &mut outfile)?;
                }
            }
            Ok(())
        }
        Err(_) => {
            // Rewind and try as tar.gz
            archive.seek(SeekFrom::Start(0))?;

            info!("Trying to extract as TAR.GZ archive");
            let gz = GzDecoder::new(archive);
            let mut tar = Archive::new(gz);
            tar.unpack(output_dir)
                .map_err(|e| ArxDiffError::Archive(e.to_string()))?;
            Ok(())
        }
    }
}

/// Walk an extracted directory into FileEntry records. Directory
/// entries are excluded; paths are relative, slash-separated, and
/// enumerated in a deterministic order.
fn enumerate_files(dir: &Path) -> Result<Vec<Arc<FileEntry>>, ArxDiffError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
    {
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| ArxDiffError::Archive(e.to_string()))?;
        let path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(Arc::new(FileEntry::new(path, entry.path().to_path_buf())));
    }
    Ok(entries)
}
