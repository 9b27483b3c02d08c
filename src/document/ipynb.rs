//! nbformat 4 decoding
//!
//! Only the parts the harness needs are modelled: cell type and source. Outputs, metadata and attachments are
//! ignored.

use serde::Deserialize;

use super::{Cell, CellKind};

#[derive(Debug, Deserialize)]
struct Notebook {
    nbformat: u32,
    cells: Vec<RawCell>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    cell_type: String,
    #[serde(default)]
    source: Source,
}

/// Jupyter writes `source` either as one string or as a list of lines that keep their `\n`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Source {
    Text(String),
    Lines(Vec<String>),
}

impl Default for Source {
    fn default() -> Self {
        Source::Text(String::new())
    }
}

impl Source {
    fn into_text(self) -> String {
        match self {
            Source::Text(s) => s,
            Source::Lines(lines) => lines.concat(),
        }
    }
}

/// Decode notebook JSON into cells. The error string becomes [`super::LoadError::Malformed`]'s reason.
pub fn decode(text: &str) -> Result<Vec<Cell>, String> {
    let notebook: Notebook = serde_json::from_str(text).map_err(|e| format!("invalid notebook JSON: {e}"))?;
    if notebook.nbformat != 4 {
        return Err(format!("unsupported nbformat {} (expected 4)", notebook.nbformat));
    }

    notebook
        .cells
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let kind = match raw.cell_type.as_str() {
                "code" => CellKind::Code,
                "markdown" => CellKind::Narrative,
                "raw" => CellKind::Raw,
                other => return Err(format!("cell {index} has unknown cell_type '{other}'")),
            };
            Ok(Cell::new(index, kind, raw.source.into_text()))
        })
        .collect()
}
