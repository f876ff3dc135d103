//! Fuzzy "did you mean" suggestions for user-supplied names

use strsim::{jaro_winkler, normalized_levenshtein};

/// Scores below this are not worth suggesting. Keeps "zeppelin" from
/// turning into "foot".
const MIN_SCORE: f64 = 0.65;

/// Suggest the closest candidate for a misspelled name.
///
/// Returns `None` when the input already matches a candidate
/// (case-insensitively) or when nothing is close enough.
pub fn suggest_correction(input: &str, candidates: &[&str]) -> Option<String> {
    if candidates.iter().any(|c| c.eq_ignore_ascii_case(input)) {
        return None;
    }

    let input_lower = input.to_lowercase();
    let mut best: Option<(&str, f64)> = None;

    for &candidate in candidates {
        let candidate_lower = candidate.to_lowercase();

        // Jaro-Winkler favours shared prefixes, Levenshtein catches dropped letters
        let jw = jaro_winkler(&input_lower, &candidate_lower);
        let lev = normalized_levenshtein(&input_lower, &candidate_lower);
        let mut score = jw * 0.7 + lev * 0.3;

        if candidate_lower.starts_with(&input_lower) && input_lower.len() >= 2 {
            score += 0.1;
        }

        if score >= MIN_SCORE && best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    best.map(|(c, _)| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILES: &[&str] = &["car", "bike", "foot"];

    #[test]
    fn test_exact_match_needs_no_suggestion() {
        assert_eq!(suggest_correction("car", PROFILES), None);
        assert_eq!(suggest_correction("FOOT", PROFILES), None);
    }

    #[test]
    fn test_typos() {
        assert_eq!(suggest_correction("carr", PROFILES), Some("car".to_string()));
        assert_eq!(suggest_correction("fot", PROFILES), Some("foot".to_string()));
        assert_eq!(suggest_correction("biek", PROFILES), Some("bike".to_string()));
    }

    #[test]
    fn test_prefix() {
        assert_eq!(suggest_correction("bi", PROFILES), Some("bike".to_string()));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(suggest_correction("zeppelin", PROFILES), None);
        assert_eq!(suggest_correction("", &[]), None);
    }
}
