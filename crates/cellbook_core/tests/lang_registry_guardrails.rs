use std::collections::HashMap;

use cellbook_core::ErrorKind;
use cellbook_core::lang::builtins;
use cellbook_core::lang::errors;
use cellbook_core::lang::keywords;
use cellbook_core::lang::operators::{self, Fixity};
use cellbook_core::lang::punctuation;

#[test]
fn keywords_spellings_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, keywords::KeywordId> = HashMap::new();

    for info in keywords::KEYWORDS {
        assert_eq!(
            keywords::from_str(info.canonical),
            Some(info.id),
            "keyword canonical spelling not resolvable: {}",
            info.canonical
        );
        assert_eq!(keywords::as_str(info.id), info.canonical);

        if let Some(prev) = seen.insert(info.canonical, info.id) {
            panic!(
                "duplicate keyword spelling {:?}: {:?} and {:?}",
                info.canonical, prev, info.id
            );
        }
    }
}

#[test]
fn builtins_spellings_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, builtins::BuiltinFnId> = HashMap::new();

    for info in builtins::BUILTIN_FUNCTIONS {
        assert_eq!(
            builtins::from_str(info.canonical),
            Some(info.id),
            "builtin canonical spelling not resolvable: {}",
            info.canonical
        );
        assert_eq!(builtins::as_str(info.id), info.canonical);
        assert!(
            keywords::from_str(info.canonical).is_none(),
            "builtin {} collides with a keyword",
            info.canonical
        );

        if let Some(prev) = seen.insert(info.canonical, info.id) {
            panic!(
                "duplicate builtin spelling {:?}: {:?} and {:?}",
                info.canonical, prev, info.id
            );
        }
    }
}

#[test]
fn operator_spellings_unique() {
    let mut seen: HashMap<&'static str, operators::OperatorId> = HashMap::new();

    for info in operators::OPERATORS {
        for &spelling in info.spellings {
            assert_eq!(operators::from_str(spelling), Some(info.id));
            if let Some(prev) = seen.insert(spelling, info.id) {
                panic!("duplicate operator spelling {spelling:?}: {prev:?} and {:?}", info.id);
            }
        }
    }
}

#[test]
fn word_operators_are_reserved_keywords() {
    for info in operators::OPERATORS.iter().filter(|o| o.is_keyword_spelling) {
        for &spelling in info.spellings {
            assert!(
                keywords::from_str(spelling).is_some(),
                "word operator {spelling:?} is not a reserved keyword"
            );
        }
    }
}

#[test]
fn precedence_ladder_is_ordered() {
    let p = |id| operators::info_for(id).precedence;
    use operators::OperatorId::*;

    assert!(p(Or) < p(And));
    assert!(p(And) < p(Not));
    assert!(p(Not) < p(EqEq));
    assert!(p(EqEq) < p(Plus));
    assert!(p(Plus) < p(Star));
    assert!(p(Star) < p(StarStar));
    assert_eq!(operators::info_for(Not).fixity, Fixity::Prefix);
}

#[test]
fn punctuation_spellings_resolve() {
    for info in punctuation::PUNCTUATION {
        assert_eq!(punctuation::from_str(info.canonical), Some(info.id));
        assert!(operators::from_str(info.canonical).is_none());
    }
}

#[test]
fn exceptions_cover_every_error_kind() {
    let kinds = [
        ErrorKind::NameError,
        ErrorKind::TypeError,
        ErrorKind::ValueError,
        ErrorKind::KeyError,
        ErrorKind::IndexError,
        ErrorKind::AttributeError,
        ErrorKind::ImportError,
        ErrorKind::ZeroDivisionError,
        ErrorKind::AssertionError,
        ErrorKind::FileExistsError,
        ErrorKind::FileNotFoundError,
        ErrorKind::ConnectionError,
        ErrorKind::RuntimeError,
    ];
    for kind in kinds {
        let name = errors::as_str(kind);
        assert_eq!(errors::from_str(name), Some(kind));
        assert!(!errors::description(kind).is_empty());
    }
    assert_eq!(errors::EXCEPTIONS.len(), kinds.len());
}
