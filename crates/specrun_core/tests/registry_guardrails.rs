use std::collections::HashMap;

use specrun_core::lang::builtins;
use specrun_core::lang::directives;
use specrun_core::lang::dsl;
use specrun_core::lang::keywords;
use specrun_core::lang::operators;
use specrun_core::lang::punctuation;

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
            panic!("duplicate keyword spelling {:?}: {:?} and {:?}", info.canonical, prev, info.id);
        }
    }
}

#[test]
fn dsl_spellings_unique_and_never_reserved() {
    let mut seen: HashMap<&'static str, dsl::DslCallId> = HashMap::new();

    for info in dsl::DSL_CALLS {
        assert_eq!(dsl::from_str(info.canonical), Some(info.id));
        assert_eq!(dsl::as_str(info.id), info.canonical);

        for &spelling in std::iter::once(&info.canonical).chain(info.aliases.iter()) {
            // DSL names are plain identifiers so the parser treats them as ordinary calls.
            assert!(
                keywords::from_str(spelling).is_none(),
                "dsl spelling {:?} collides with a keyword",
                spelling
            );
            assert!(
                builtins::from_str(spelling).is_none(),
                "dsl spelling {:?} collides with a builtin",
                spelling
            );
            if let Some(prev) = seen.insert(spelling, info.id) {
                panic!("duplicate dsl spelling {:?}: {:?} and {:?}", spelling, prev, info.id);
            }
        }
    }
}

#[test]
fn every_context_and_leaf_has_three_variants() {
    use dsl::{CallShape, Variant};

    for shape in [CallShape::BeginContext, CallShape::LeafSpec] {
        let variants: Vec<Variant> = dsl::DSL_CALLS
            .iter()
            .filter(|d| d.shape == shape)
            .map(|d| d.variant)
            .collect();
        assert_eq!(variants.len(), 3, "{:?} should have exactly three variants", shape);
        assert!(variants.contains(&Variant::Regular));
        assert!(variants.contains(&Variant::Skipped));
        assert!(variants.contains(&Variant::Focused));
    }
}

#[test]
fn operators_and_punctuation_resolvable() {
    for info in operators::OPERATORS {
        assert_eq!(operators::from_str(info.spelling), Some(info.id));
    }
    for info in punctuation::PUNCTUATION {
        assert_eq!(punctuation::from_str(info.canonical), Some(info.id));
        assert_eq!(punctuation::as_str(info.id), info.canonical);
    }
}

#[test]
fn builtins_arity_is_consistent() {
    for info in builtins::BUILTIN_FUNCTIONS {
        assert_eq!(builtins::from_str(info.canonical), Some(info.id));
        if let Some(max) = info.max_args {
            assert!(max >= info.min_args, "{} has max < min", info.canonical);
        }
        assert!(info.accepts(info.min_args));
    }
}

#[test]
fn directive_spellings_resolvable() {
    for info in directives::DIRECTIVES {
        assert_eq!(directives::from_str(info.canonical), Some(info.id));
        for &alias in info.aliases {
            assert_eq!(directives::from_str(alias), Some(info.id));
        }
    }
    assert!(!directives::is_package_reference("math"));
    assert!(directives::is_package_reference("pkg:json"));
}
