// "Did you mean?" candidate selection.

use strsim::damerau_levenshtein;

/// Maximum edit distance ever accepted, so suggestions don't become noisy.
const MAX_DISTANCE: usize = 4;

/// A found distance is good enough when it is within a third of the query's
/// length; short identifiers still get a threshold of one edit.
fn within_threshold(distance: usize, query: &str) -> bool {
    let threshold = (query.len() / 3).clamp(1, MAX_DISTANCE);
    distance <= threshold
}

/// Pick the closest candidate by Damerau-Levenshtein distance. Candidates
/// are scanned in the order given (innermost scope first) and only a strictly
/// smaller distance replaces the current best, so ties go to the nearest
/// scope. Returns `None` when nothing clears the threshold.
pub fn closest_match<'a, I>(query: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        let distance = damerau_levenshtein(query, candidate);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }

    match best {
        Some((name, distance)) if within_threshold(distance, query) => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_transposition() {
        // Transposition counts as one edit under Damerau-Levenshtein.
        let candidates = ["length", "width"];
        assert_eq!(closest_match("lenght", candidates), Some("length"));
    }

    #[test]
    fn respects_threshold_for_short_names() {
        // "x" vs "y" is distance 1 with threshold 1: accepted.
        assert_eq!(closest_match("x", ["y"]), Some("y"));
        // "ab" vs "xy" is distance 2 with threshold 1: rejected.
        assert_eq!(closest_match("ab", ["xy"]), None);
    }

    #[test]
    fn caps_threshold_for_long_names() {
        // Distance 5 exceeds the cap of 4 even for very long identifiers.
        let query = "averyveryverylongidentifier";
        let far = "averyveryverylongidexxxxxfier";
        assert_eq!(closest_match(query, [far]), None);
    }

    #[test]
    fn first_of_equally_close_candidates_wins() {
        // Simulates innermost-scope-first iteration order.
        let candidates = ["value1", "value2"];
        assert_eq!(closest_match("value", candidates), Some("value1"));
    }

    #[test]
    fn empty_pool_gives_nothing() {
        assert_eq!(closest_match("anything", []), None);
    }
}
