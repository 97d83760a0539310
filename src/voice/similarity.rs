//! String similarity helpers used for fuzzy task lookup.

/// Edit distance between two strings, counted in `char`s.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Lower-cased alphanumeric words longer than two characters.
pub fn significant_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Two tokens are similar when one contains the other or they are one edit apart.
pub fn tokens_similar(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a) || levenshtein(a, b) <= 1
}

/// Share of `query`'s tokens that have a similar token in `candidate`, in `0.0..=1.0`.
pub fn token_overlap(query: &str, candidate: &str) -> f64 {
    let query_tokens = significant_tokens(query);
    if query_tokens.is_empty() {
        return 0.0;
    }
    let candidate_tokens = significant_tokens(candidate);
    let matched = query_tokens
        .iter()
        .filter(|q| candidate_tokens.iter().any(|c| tokens_similar(q, c)))
        .count();
    matched as f64 / query_tokens.len() as f64
}
