//! Define the reserved keyword vocabulary for the cell language.
//!
//! This module is the single source of truth for reserved words: a stable identifier ([`KeywordId`]) plus a const
//! metadata table ([`KEYWORDS`]) that records canonical spellings and categories.
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**.
//! - Some reserved words are also “word operators” (e.g. `and`). If you need operator precedence, use
//!   [`crate::lang::operators`].
//!
//! ## Examples
//! ```rust
//! use cellbook_core::lang::keywords::{self, KeywordId};
//!
//! assert_eq!(keywords::from_str("def"), Some(KeywordId::Def));
//! assert_eq!(keywords::as_str(KeywordId::Def), "def");
//! ```

use super::registry::Stability;

/// Stable identifier for every reserved keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordId {
    // Control flow / statements
    If,
    Else,
    Elif,
    While,
    For,
    Break,
    Continue,
    Return,
    Pass,
    Assert,
    Raise,
    Del,

    // Definitions
    Def,

    // Imports
    Import,
    From,
    As,

    // Literals
    True,
    False,
    None,

    // Word operators
    And,
    Or,
    Not,
    In,
    Is,
}

/// High-level grouping for documentation and tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    ControlFlow,
    Definition,
    Import,
    Literal,
    Operator,
}

/// Metadata for a keyword.
#[derive(Debug, Clone, Copy)]
pub struct KeywordInfo {
    pub id: KeywordId,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub category: KeywordCategory,
    pub stability: Stability,
}

/// Registry of all keywords.
///
/// ## Notes
/// - The ordering is not semantically meaningful, but is grouped for readability.
pub const KEYWORDS: &[KeywordInfo] = &[
    // Control flow / statements
    info(KeywordId::If, "if", KeywordCategory::ControlFlow),
    info(KeywordId::Else, "else", KeywordCategory::ControlFlow),
    info(KeywordId::Elif, "elif", KeywordCategory::ControlFlow),
    info(KeywordId::While, "while", KeywordCategory::ControlFlow),
    info(KeywordId::For, "for", KeywordCategory::ControlFlow),
    info(KeywordId::Break, "break", KeywordCategory::ControlFlow),
    info(KeywordId::Continue, "continue", KeywordCategory::ControlFlow),
    info(KeywordId::Return, "return", KeywordCategory::ControlFlow),
    info(KeywordId::Pass, "pass", KeywordCategory::ControlFlow),
    info(KeywordId::Assert, "assert", KeywordCategory::ControlFlow),
    info(KeywordId::Raise, "raise", KeywordCategory::ControlFlow),
    info(KeywordId::Del, "del", KeywordCategory::ControlFlow),
    // Definitions
    info(KeywordId::Def, "def", KeywordCategory::Definition),
    // Imports
    info(KeywordId::Import, "import", KeywordCategory::Import),
    info(KeywordId::From, "from", KeywordCategory::Import),
    info(KeywordId::As, "as", KeywordCategory::Import),
    // Literals
    info(KeywordId::True, "True", KeywordCategory::Literal),
    info(KeywordId::False, "False", KeywordCategory::Literal),
    info(KeywordId::None, "None", KeywordCategory::Literal),
    // Word operators
    info(KeywordId::And, "and", KeywordCategory::Operator),
    info(KeywordId::Or, "or", KeywordCategory::Operator),
    info(KeywordId::Not, "not", KeywordCategory::Operator),
    info(KeywordId::In, "in", KeywordCategory::Operator),
    info(KeywordId::Is, "is", KeywordCategory::Operator),
];

/// Canonical spelling.
pub fn as_str(id: KeywordId) -> &'static str {
    info_for(id).canonical
}

/// Category of a keyword.
pub fn category(id: KeywordId) -> KeywordCategory {
    info_for(id).category
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: KeywordId) -> &'static KeywordInfo {
    KEYWORDS.iter().find(|k| k.id == id).expect("keyword info missing")
}

/// Lookup by spelling (canonical or alias).
///
/// ## Returns
/// - `Some(KeywordId)` if the spelling is reserved.
/// - `None` otherwise.
pub fn from_str(s: &str) -> Option<KeywordId> {
    if let Some(k) = KEYWORDS.iter().find(|k| k.canonical == s) {
        return Some(k.id);
    }
    KEYWORDS
        .iter()
        .find(|k| {
            let aliases: &[&str] = k.aliases;
            aliases.contains(&s)
        })
        .map(|k| k.id)
}

// --- helpers -----------------------------------------------------------------

const fn info(id: KeywordId, canonical: &'static str, category: KeywordCategory) -> KeywordInfo {
    KeywordInfo {
        id,
        canonical,
        aliases: &[],
        category,
        stability: Stability::Stable,
    }
}
