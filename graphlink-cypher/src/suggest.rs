//! Endpoint suggestions for unknown procedures
//!
//! When the server rejects a procedure name, the runner lists the installed
//! endpoints and proposes the closest match instead of surfacing the raw
//! driver error.

/// Maximum edit distance for a name to still count as "did you mean".
const SUGGESTION_CUTOFF: usize = 5;

pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

/// The closest known endpoint within the cutoff, if any.
pub fn closest_endpoint<'a>(requested: &str, known: &'a [String]) -> Option<&'a str> {
    known
        .iter()
        .map(|candidate| (levenshtein(requested, candidate), candidate))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, _)| *distance <= SUGGESTION_CUTOFF)
        .map(|(_, candidate)| candidate.as_str())
}

pub fn suggestive_error_message(requested: &str, known: &[String]) -> String {
    match closest_endpoint(requested, known) {
        Some(suggestion) => format!(
            "There is no procedure with the name `{requested}` registered on the server. \
             Did you mean `{suggestion}`?"
        ),
        None => format!(
            "There is no procedure with the name `{requested}` registered on the server. \
             It is not a valid procedure name."
        ),
    }
}
