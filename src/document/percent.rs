//! Percent-script decoding
//!
//! ```text
//! # %% [markdown]
//! # Narrative lines lose their leading `# `.
//!
//! # %%
//! x = 1
//! ```
//!
//! Text before the first marker forms a code cell of its own when it is not blank.

use super::{Cell, CellKind};

const MARKER: &str = "# %%";

fn marker_kind(line: &str) -> Option<CellKind> {
    let rest = line.trim_end().strip_prefix(MARKER)?;
    let rest = rest.trim();
    let kind = if rest.contains("[markdown]") || rest.contains("[md]") {
        CellKind::Narrative
    } else if rest.contains("[raw]") {
        CellKind::Raw
    } else {
        CellKind::Code
    };
    Some(kind)
}

fn strip_comment(line: &str) -> &str {
    line.strip_prefix("# ").or_else(|| line.strip_prefix('#')).unwrap_or(line)
}

fn finish(cells: &mut Vec<Cell>, kind: CellKind, lines: &[&str]) {
    let body: Vec<&str> = match kind {
        CellKind::Narrative => lines.iter().map(|l| strip_comment(l)).collect(),
        _ => lines.to_vec(),
    };
    let text = body.join("\n");
    let text = text.trim_matches('\n').to_string();
    let index = cells.len();
    cells.push(Cell::new(index, kind, text));
}

pub fn decode(text: &str) -> Vec<Cell> {
    let mut cells = Vec::new();
    let mut current: Option<CellKind> = None;
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(kind) = marker_kind(line) {
            match current {
                Some(prev) => finish(&mut cells, prev, &lines),
                None if lines.iter().any(|l| !l.trim().is_empty()) => finish(&mut cells, CellKind::Code, &lines),
                None => {}
            }
            lines.clear();
            current = Some(kind);
        } else {
            lines.push(line);
        }
    }

    match current {
        Some(kind) => finish(&mut cells, kind, &lines),
        None if lines.iter().any(|l| !l.trim().is_empty()) => finish(&mut cells, CellKind::Code, &lines),
        None => {}
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_split_cells() {
        let cells = decode("# %%\na = 1\n\n# %% [markdown]\n# Heading\n#\n# body\n# %% [raw]\nraw text\n# %%\nb = 2\n");
        let kinds: Vec<CellKind> = cells.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![CellKind::Code, CellKind::Narrative, CellKind::Raw, CellKind::Code]
        );
        assert_eq!(cells[0].source, "a = 1");
        assert_eq!(cells[1].source, "Heading\n\nbody");
        assert_eq!(cells[3].index, 3);
    }

    #[test]
    fn test_preamble_becomes_code_cell() {
        let cells = decode("import os\n# %%\nx = 1\n");
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].source, "import os");
    }

    #[test]
    fn test_blank_preamble_is_dropped() {
        let cells = decode("\n\n# %%\nx = 1\n");
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].index, 0);
    }

    #[test]
    fn test_indentation_is_kept() {
        let cells = decode("# %%\ndef f():\n    return 1\n");
        assert_eq!(cells[0].source, "def f():\n    return 1");
    }

    #[test]
    fn test_no_markers_single_cell() {
        assert_eq!(decode("x = 1\ny = 2\n").len(), 1);
        assert!(decode("").is_empty());
    }
}
