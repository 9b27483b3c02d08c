//! Document loading
//!
//! A document is an ordered, immutable list of typed cells read from disk. Loading never executes anything; the
//! [`crate::harness`] decides later which cells run and when.
//!
//! ## Formats
//!
//! - `.ipynb` - nbformat 4 JSON ([`ipynb`])
//! - anything else - percent-delimited scripts (`# %%` markers, [`percent`])

pub mod ipynb;
pub mod percent;

use std::fmt;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default cap on document size (64 MiB)
pub const MAX_DOCUMENT_SIZE: u64 = 64 * 1024 * 1024;

/// Errors raised while resolving or decoding a document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("notebook '{}' does not exist or is not a file", path.display())]
    NotFound { path: PathBuf },

    #[error("notebook '{}' is malformed: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("notebook '{}' is too large ({size} bytes, max {limit} bytes)", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("cannot read notebook '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// On-disk encoding a document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Ipynb,
    Percent,
}

impl DocumentFormat {
    /// Pick the decoder from the file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ipynb") => DocumentFormat::Ipynb,
            _ => DocumentFormat::Percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Code,
    /// Markdown prose; counted for indexing, never executed
    Narrative,
    Raw,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CellKind::Code => "code",
            CellKind::Narrative => "markdown",
            CellKind::Raw => "raw",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Position in the original document, narrative cells included
    pub index: usize,
    pub kind: CellKind,
    pub source: String,
}

impl Cell {
    pub fn new(index: usize, kind: CellKind, source: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            source: source.into(),
        }
    }

    pub fn is_code(&self) -> bool {
        self.kind == CellKind::Code
    }

    /// First non-blank line, for listings and error excerpts.
    pub fn first_line(&self) -> &str {
        self.source.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
    }
}

/// A loaded notebook.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    format: DocumentFormat,
    cells: Vec<Cell>,
}

impl Document {
    /// Load with the default size limit.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load_with_limit(path, MAX_DOCUMENT_SIZE)
    }

    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_with_limit(path: impl AsRef<Path>, limit: u64) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound { path: path.to_path_buf() },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        if !metadata.is_file() {
            return Err(LoadError::NotFound { path: path.to_path_buf() });
        }
        if metadata.len() > limit {
            return Err(LoadError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit,
            });
        }

        let text = fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let format = DocumentFormat::from_path(path);
        let cells = match format {
            DocumentFormat::Ipynb => ipynb::decode(&text).map_err(|reason| LoadError::Malformed {
                path: path.to_path_buf(),
                reason,
            })?,
            DocumentFormat::Percent => percent::decode(&text),
        };

        tracing::debug!(cells = cells.len(), ?format, "loaded notebook");
        Ok(Self {
            path: path.to_path_buf(),
            format,
            cells,
        })
    }

    /// Build a document from cells already in memory.
    pub fn from_cells(path: impl Into<PathBuf>, cells: Vec<Cell>) -> Self {
        let path = path.into();
        let format = DocumentFormat::from_path(&path);
        Self { path, format, cells }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Cells in `range`, or `None` when the range falls outside the document.
    pub fn cells_in(&self, range: Range<usize>) -> Option<&[Cell]> {
        self.cells.get(range)
    }

    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let err = Document::load("/definitely/not/here.ipynb").unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Document::load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_size_limit() {
        let (_dir, path) = write_temp("big.py", "# %%\nx = 1\n");
        let err = Document::load_with_limit(&path, 4).unwrap_err();
        assert!(matches!(err, LoadError::TooLarge { limit: 4, .. }));
    }

    #[test]
    fn test_load_percent_script() {
        let (_dir, path) = write_temp("nb.py", "# %% [markdown]\n# Title\n\n# %%\nx = 1\n");
        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.format(), DocumentFormat::Percent);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.cell(1).unwrap().source, "x = 1");
        assert_eq!(doc.code_cells().count(), 1);
    }

    #[test]
    fn test_load_malformed_ipynb() {
        let (_dir, path) = write_temp("nb.ipynb", "{not json");
        let err = Document::load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn test_cells_in_range() {
        let doc = Document::from_cells(
            "mem.py",
            (0..4).map(|i| Cell::new(i, CellKind::Code, format!("x = {i}"))).collect(),
        );
        assert_eq!(doc.cells_in(1..3).map(<[Cell]>::len), Some(2));
        assert!(doc.cells_in(2..9).is_none());
        assert_eq!(doc.cell(3).unwrap().first_line(), "x = 3");
    }
}
