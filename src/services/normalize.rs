// Title normalization used for candidate comparison

use std::collections::HashSet;

const STRIPPED_CHARS: [char; 8] = [':', '-', ',', '.', '!', '?', '\'', '"'];
const LEADING_ARTICLES: [&str; 3] = ["the ", "a ", "an "];

/// Canonical comparison form of a title or person name.
///
/// Lowercases, drops `: - , . ! ? ' "`, collapses whitespace and removes the
/// leading article. Articles are stripped until none remain so that the
/// function stays idempotent for inputs like "The A Team".
pub fn normalize_title(raw: &str) -> String {
    let stripped: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect();

    let mut normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    while let Some(rest) = LEADING_ARTICLES
        .iter()
        .find_map(|article| normalized.strip_prefix(article))
    {
        normalized = rest.to_string();
    }

    normalized
}

/// Jaccard similarity of the whitespace tokens of two normalized titles
pub fn token_similarity(left: &str, right: &str) -> f64 {
    let left: HashSet<&str> = left.split_whitespace().collect();
    let right: HashSet<&str> = right.split_whitespace().collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }

    left.intersection(&right).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("The Matrix"), "matrix");
        assert_eq!(normalize_title("  Mission: Impossible  "), "mission impossible");
        assert_eq!(normalize_title("Spider-Man"), "spiderman");
        assert_eq!(normalize_title("An American Werewolf"), "american werewolf");
        assert_eq!(normalize_title("\"Who's Afraid?\""), "whos afraid");
        assert_eq!(normalize_title("Theory of Everything"), "theory of everything");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "The Matrix",
            "The A-Team",
            "A  The  An Odd Title",
            "Amélie!",
            "  the  ",
            "The",
            "Se7en",
            "Star Wars: Episode IV - A New Hope",
        ];
        for sample in samples {
            let once = normalize_title(sample);
            assert_eq!(normalize_title(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_token_similarity() {
        assert_eq!(token_similarity("matrix", "matrix"), 1.0);
        assert_eq!(token_similarity("matrix reloaded", "matrix"), 0.5);
        assert_eq!(token_similarity("dark knight rises", "dark knight"), 2.0 / 3.0);
        assert_eq!(token_similarity("alien", "heat"), 0.0);
        assert_eq!(token_similarity("", ""), 0.0);
    }
}
