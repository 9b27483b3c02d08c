//! Shareable metadata for `cellbook_core::lang` registries.
//!
//! The registries are `const` tables, so these types are lightweight and `Copy`.
//!
//! ## See also
//! - [`crate::lang::keywords`]
//! - [`crate::lang::operators`]
//! - [`crate::lang::builtins`]

/// Describe the lifecycle status of a language vocabulary item.
///
/// ## Examples
/// ```rust
/// use cellbook_core::lang::registry::Stability;
///
/// let s = Stability::Stable;
/// assert_eq!(format!("{s:?}"), "Stable");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stability {
    Stable,
    Draft,
    Deprecated,
}

/// Shared metadata shape for “registry-first” vocabulary items.
///
/// Many vocabularies share the same core fields:
/// - stable identity (`id`)
/// - accepted spellings (`canonical` + `aliases`)
/// - a one-line `description` for docs and diagnostics
///
/// Registries that need extra per-item data (operator precedence, keyword category) define their own info type.
#[derive(Debug, Clone, Copy)]
pub struct LangItemInfo<Id> {
    pub id: Id,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub stability: Stability,
}

/// Find an item by canonical spelling first, then by alias.
pub(crate) fn lookup<Id: Copy>(items: &[LangItemInfo<Id>], spelling: &str) -> Option<Id> {
    if let Some(item) = items.iter().find(|i| i.canonical == spelling) {
        return Some(item.id);
    }
    items
        .iter()
        .find(|i| {
            let aliases: &[&str] = i.aliases;
            aliases.contains(&spelling)
        })
        .map(|i| i.id)
}
