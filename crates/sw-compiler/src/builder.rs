use std::fmt;
use std::str::FromStr;

use log::info;
use sw_core::{DoubleArrayFilter, FilterConfig, Result, SensitiveWordFilter, WordFilter};

use crate::optimizer::optimize_words;

/// Automaton representation backing a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Mutable pointer-style trie with a transition cache
    #[default]
    Compact,
    /// Flattened double-array, frozen after construction by default
    DoubleArray,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::Compact => "compact",
            Variant::DoubleArray => "double-array",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Variant::Compact),
            "double-array" | "double_array" | "optimized" => Ok(Variant::DoubleArray),
            other => Err(format!("unknown variant '{other}' (expected compact or double-array)")),
        }
    }
}

/// Dedupe `words` and build a filter of the requested variant.
pub fn build_filter(
    mut words: Vec<String>,
    variant: Variant,
    config: &FilterConfig,
) -> Result<Box<dyn WordFilter>> {
    let stats = optimize_words(&mut words);
    info!(
        "Building {} filter from {} words ({} duplicates dropped)",
        variant, stats.after, stats.deduped
    );

    let filter: Box<dyn WordFilter> = match variant {
        Variant::Compact => Box::new(SensitiveWordFilter::new(&words, config)?),
        Variant::DoubleArray => Box::new(DoubleArrayFilter::new(&words, config)?),
    };
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use sw_core::{AutomatonError, FilterConfig};

    use super::{build_filter, Variant};
    use crate::parser::parse_dictionary;

    const DICTIONARY: &str = "abc\nbcd\n\nabc\n  敏感  \n";

    #[test]
    fn builds_both_variants_with_same_answers() {
        for variant in [Variant::Compact, Variant::DoubleArray] {
            let filter =
                build_filter(parse_dictionary(DICTIONARY), variant, &FilterConfig::default()).unwrap();
            assert_eq!(filter.pattern_count(), 3, "{variant}");
            assert!(filter.contains("x a b c x"));
            assert_eq!(filter.match_all("xabcdx"), vec!["abc", "bcd"]);
            assert_eq!(filter.replace("这很敏感", '*'), "这很**");
            assert_eq!(filter.info().variant, variant.name());
        }
    }

    #[test]
    fn double_array_is_read_only_by_default() {
        let filter = build_filter(
            parse_dictionary(DICTIONARY),
            Variant::DoubleArray,
            &FilterConfig::default(),
        )
        .unwrap();
        assert!(filter.info().read_only);
        assert!(matches!(filter.add_word("new"), Err(AutomatonError::ReadOnly)));
    }

    #[test]
    fn compact_accepts_new_words() {
        let filter = build_filter(Vec::new(), Variant::Compact, &FilterConfig::default()).unwrap();
        assert!(!filter.contains("anything"));
        filter.add_word("thing").unwrap();
        assert!(filter.contains("anything"));
    }

    #[test]
    fn parses_variant_names() {
        assert_eq!("compact".parse::<Variant>().unwrap(), Variant::Compact);
        assert_eq!("Double-Array".parse::<Variant>().unwrap(), Variant::DoubleArray);
        assert_eq!("optimized".parse::<Variant>().unwrap(), Variant::DoubleArray);
        assert!("radix".parse::<Variant>().is_err());
        assert_eq!(Variant::default(), Variant::Compact);
    }

    #[test]
    fn propagates_alphabet_overflow() {
        let config = FilterConfig::default().with_max_chars(2);
        let result = build_filter(vec!["xyz".to_string()], Variant::DoubleArray, &config);
        assert!(matches!(result, Err(AutomatonError::AlphabetOverflow { .. })));
    }
}
