const BOM: char = '\u{feff}';

/// Split word-list text into words: one per line, trimmed, blank lines
/// skipped. A leading byte-order mark is dropped.
pub fn parse_dictionary(text: &str) -> Vec<String> {
    let text = text.strip_prefix(BOM).unwrap_or(text);

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_dictionary;

    #[test]
    fn trims_and_skips_blank_lines() {
        let words = parse_dictionary("  foo \n\n\tbar\r\n   \nbaz");
        assert_eq!(words, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn strips_byte_order_mark() {
        let words = parse_dictionary("\u{feff}敏感词\n违禁\n");
        assert_eq!(words, vec!["敏感词", "违禁"]);
    }

    #[test]
    fn keeps_inner_whitespace_and_duplicates() {
        let words = parse_dictionary("two words\ntwo words\n");
        assert_eq!(words, vec!["two words", "two words"]);
    }

    #[test]
    fn empty_text() {
        assert!(parse_dictionary("").is_empty());
        assert!(parse_dictionary("\n \n").is_empty());
    }
}
