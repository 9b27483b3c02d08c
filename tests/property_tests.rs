//! Property-based tests for cellbook
//!
//! These tests use proptest to verify invariants across many randomly
//! generated inputs, catching edge cases that hand-written tests might miss.

use cellbook::document::{CellKind, Document, percent};
use cellbook::harness::injector::{FragmentQueue, dedent};
use cellbook::{HarnessConfig, Testbook};
use proptest::prelude::*;

// =============================================================================
// Dedent Properties
// =============================================================================

#[cfg(test)]
mod dedent_tests {
    use super::*;

    /// A code line with up to two levels of relative indentation.
    fn line_strategy() -> impl Strategy<Value = String> {
        (0usize..3, "[a-z][a-z0-9_ =+]{0,12}").prop_map(|(depth, body)| format!("{}{body}", "    ".repeat(depth)))
    }

    /// Lines whose first entry sits at column zero.
    fn block_strategy() -> impl Strategy<Value = Vec<String>> {
        ("[a-z][a-z0-9_]{0,8}", prop::collection::vec(line_strategy(), 0..8)).prop_map(|(head, mut rest)| {
            rest.insert(0, format!("{head} = 1"));
            rest
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: a uniform indent is removed, relative indentation is kept
        #[test]
        fn dedent_strips_uniform_indent(lines in block_strategy(), indent in 0usize..12) {
            let original = lines.join("\n");
            let pad = " ".repeat(indent);
            let indented: Vec<String> = lines.iter().map(|l| format!("{pad}{l}")).collect();
            prop_assert_eq!(dedent(&indented.join("\n")), format!("{original}\n"));
        }

        /// Property: blank lines never constrain the shared prefix
        #[test]
        fn blank_lines_do_not_pin_the_prefix(lines in block_strategy(), indent in 1usize..8) {
            let pad = " ".repeat(indent);
            let mut text = String::from("\n");
            for line in &lines {
                text.push_str(&format!("{pad}{line}\n\n"));
            }
            let out = dedent(&text);
            prop_assert!(out.lines().filter(|l| !l.is_empty()).any(|l| !l.starts_with(' ')));
        }

        /// Property: dedenting twice changes nothing
        #[test]
        fn dedent_is_idempotent(lines in block_strategy(), indent in 0usize..8) {
            let pad = "\t".repeat(indent);
            let text: String = lines.iter().map(|l| format!("{pad}{l}\n")).collect();
            let once = dedent(&text);
            prop_assert_eq!(dedent(&once), once);
        }
    }
}

// =============================================================================
// Document Properties
// =============================================================================

#[cfg(test)]
mod document_tests {
    use super::*;

    fn cell_strategy() -> impl Strategy<Value = (bool, String)> {
        (any::<bool>(), "[a-z]{1,8} = [0-9]{1,3}")
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: every marker yields exactly one cell, indexed in order
        #[test]
        fn percent_cells_are_indexed_sequentially(cells in prop::collection::vec(cell_strategy(), 0..12)) {
            let mut text = String::new();
            for (narrative, body) in &cells {
                text.push_str(if *narrative { "# %% [markdown]\n# " } else { "# %%\n" });
                text.push_str(body);
                text.push_str("\n\n");
            }
            let decoded = percent::decode(&text);
            prop_assert_eq!(decoded.len(), cells.len());
            for (i, (cell, (narrative, body))) in decoded.iter().zip(&cells).enumerate() {
                prop_assert_eq!(cell.index, i);
                let kind = if *narrative { CellKind::Narrative } else { CellKind::Code };
                prop_assert_eq!(cell.kind, kind);
                prop_assert_eq!(&cell.source, body);
            }
        }
    }
}

// =============================================================================
// Injection Ordering Properties
// =============================================================================

#[cfg(test)]
mod ordering_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: due fragments come out by anchor, then injection order
        #[test]
        fn drain_orders_by_anchor_then_injection(anchors in prop::collection::vec(0usize..6, 0..16), limit in 0usize..6) {
            let mut queue = FragmentQueue::new();
            for (i, anchor) in anchors.iter().enumerate() {
                queue.push_source(*anchor, &format!("v{i} = {i}")).unwrap();
            }
            let due = queue.drain_through(limit);
            let keys: Vec<_> = due.iter().map(|f| (f.anchor, f.id)).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(&keys, &sorted);
            prop_assert!(due.iter().all(|f| f.anchor <= limit));
            prop_assert!(queue.anchors().all(|(_, anchor)| anchor > limit));
            prop_assert_eq!(due.len() + queue.len(), anchors.len());
        }

        /// Property: a fragment anchored at k is visible to cell k and not to cell k - 1
        #[test]
        fn fragments_run_immediately_before_their_anchor(cells in 1usize..6, anchor_seed in any::<usize>()) {
            let anchor = anchor_seed % cells;
            let text: String = (0..cells).map(|i| format!("# %%\nseen_{i} = len(log)\n")).collect();
            let document = Document::from_cells("p.py", percent::decode(&text));
            let mut tb = Testbook::from_document(document, HarnessConfig::default());
            tb.run_fragment("log = []").unwrap();
            tb.inject_at(anchor, "log.append('fragment')").unwrap();
            tb.execute().unwrap();
            for i in 0..cells {
                let seen = tb.r#ref(&format!("seen_{i}")).unwrap().as_int();
                prop_assert_eq!(seen, Some(if i >= anchor { 1 } else { 0 }));
            }
        }
    }
}

// =============================================================================
// Determinism Properties
// =============================================================================

#[cfg(test)]
mod determinism_tests {
    use super::*;

    fn run_draws(seed: u64) -> String {
        let document = Document::from_cells(
            "d.py",
            percent::decode(
                "# %%\nimport random\nimport numpy as np\nletters = list('abcdefgh')\nnp.random.shuffle(letters)\n\
                 draws = [random.randint(0, 100) for _ in range(5)] + [np.random.randint(10)] + letters\n",
            ),
        );
        let mut tb = Testbook::from_document(document, HarnessConfig::new().with_seed(seed));
        tb.execute().unwrap();
        tb.r#ref("draws").unwrap().repr()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Property: the same seed reproduces every draw
        #[test]
        fn same_seed_same_draws(seed in any::<u64>()) {
            prop_assert_eq!(run_draws(seed), run_draws(seed));
        }
    }
}
