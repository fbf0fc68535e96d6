//! "Did you mean" matching for tool names.

fn squash(value: &str) -> Vec<char> {
    value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a == b {
        return 0;
    }
    if a.is_empty() || b.is_empty() {
        return a.len().max(b.len());
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

const MIN_FRAGMENT: usize = 3;

fn tolerance(len: usize) -> usize {
    match len {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        _ => (len / 3).max(3),
    }
}

/// Lower is closer. Containment ranks right after an exact match, so
/// `matters` finds `get_matters`. Fragments shorter than three characters
/// only match by edit distance.
fn distance(input: &[char], candidate: &str) -> Option<usize> {
    let candidate = squash(candidate);
    if input.is_empty() || candidate.is_empty() {
        return None;
    }
    if input == candidate.as_slice() {
        return Some(0);
    }
    let contains = |hay: &[char], needle: &[char]| {
        needle.len() >= MIN_FRAGMENT && hay.windows(needle.len()).any(|w| w == needle)
    };
    if (candidate.len() > input.len() && contains(&candidate, input))
        || (input.len() > candidate.len() && contains(input, &candidate))
    {
        return Some(1);
    }
    let d = edit_distance(input, &candidate);
    (d <= tolerance(input.len())).then_some(d)
}

pub fn suggest(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let needle = squash(input);
    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .filter_map(|candidate| distance(&needle, candidate).map(|d| (d, candidate)))
        .collect();
    scored.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(b.1))
    });
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(limit.max(1))
        .map(|(_, name)| name.clone())
        .collect()
}
