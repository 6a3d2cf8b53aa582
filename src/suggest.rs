//! Typo suggestions for syntax and unbound-name errors

/// Levenshtein distance between two strings
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let chars1: Vec<char> = s1.chars().collect();
    let chars2: Vec<char> = s2.chars().collect();

    if chars1.is_empty() {
        return chars2.len();
    }
    if chars2.is_empty() {
        return chars1.len();
    }

    let mut prev: Vec<usize> = (0..=chars2.len()).collect();
    let mut row = vec![0; chars2.len() + 1];

    for i in 1..=chars1.len() {
        row[0] = i;
        for j in 1..=chars2.len() {
            let cost = if chars1[i - 1] == chars2[j - 1] { 0 } else { 1 };
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }

    prev[chars2.len()]
}

/// Closest candidate within two edits, ignoring exact matches.
/// Ties keep the earliest candidate so suggestions are stable.
pub fn closest<'a, I>(input: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let input = input.to_ascii_lowercase();
    let mut best: Option<(&'a str, usize)> = None;

    for candidate in candidates {
        let distance = levenshtein_distance(&input, &candidate.to_ascii_lowercase());
        if distance == 0 || distance > 2 {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }

    best.map(|(candidate, _)| candidate)
}
