use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
}

/// Drop repeated words, keeping each first occurrence in place.
pub fn optimize_words(words: &mut Vec<String>) -> OptimizeStats {
    let before = words.len();

    let mut seen: HashSet<String> = HashSet::with_capacity(words.len());
    let mut deduped = 0usize;
    words.retain(|word| {
        if seen.contains(word) {
            deduped += 1;
            false
        } else {
            seen.insert(word.clone());
            true
        }
    });

    OptimizeStats {
        before,
        after: words.len(),
        deduped,
    }
}
