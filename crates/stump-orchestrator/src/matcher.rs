//! Lenient comparison of a solver's free-text guess against the answer.
//!
//! Solvers rarely answer with the bare word, so the candidate is stripped of
//! a few conversational lead-ins before a two-way substring check. Very short
//! canonical answers can therefore match unrelated guesses; that trade-off is
//! accepted.

/// Lead-ins removed from the candidate, each at most once, in this order.
const PREFIXES: [&str; 6] = [
    "the answer is ",
    "i believe the answer is ",
    "based on the clues, it's ",
    "it's ",
    "a ",
    "an ",
];

/// Returns `true` if `candidate` is accepted as `canonical`.
///
/// # Examples
///
/// ```
/// use stump_orchestrator::matches;
///
/// assert!(matches("The answer is Paris.", "paris"));
/// assert!(matches("a piano", "Piano"));
/// assert!(!matches("Tokyo", "Paris"));
/// ```
#[must_use]
pub fn matches(candidate: &str, canonical: &str) -> bool {
    let canonical = canonical.trim().to_lowercase();
    let candidate = normalize_candidate(candidate);

    candidate == canonical || canonical.contains(&candidate) || candidate.contains(&canonical)
}

fn normalize_candidate(candidate: &str) -> String {
    let mut text = candidate.trim().to_lowercase();

    for prefix in PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.to_string();
        }
    }

    if let Some(rest) = text.strip_suffix('?') {
        text.truncate(rest.len());
    }
    if let Some(rest) = text.strip_suffix('.') {
        text.truncate(rest.len());
    }
    text
}
