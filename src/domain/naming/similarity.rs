// src/domain/naming/similarity.rs
//
// Approximate string similarity on a 0..=100 scale.

/// Normalized Levenshtein similarity, rounded onto 0..=100
pub fn ratio(a: &str, b: &str) -> u8 {
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// `ratio` after lower-casing, dropping punctuation and sorting the tokens
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Digit tokens tell sequels and seasons apart ("Gundam 0" / "Gundam 00")
fn numeric_tokens(s: &str) -> Vec<String> {
    let mut tokens: Vec<String> = sorted_tokens(s)
        .split(' ')
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect();
    tokens.sort_unstable();
    tokens
}

/// Groups a title under an already-known title when they are close enough
#[derive(Debug, Clone, Copy)]
pub struct TitleMatcher {
    threshold: u8,
}

impl TitleMatcher {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Best candidate scoring at least the threshold. Earlier candidates win ties.
    ///
    /// Candidates whose numeric tokens differ from the title's never match.
    pub fn best_match<'a>(
        &self,
        title: &str,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Option<&'a str> {
        let numbers = numeric_tokens(title);
        let mut best: Option<(&'a str, u8)> = None;
        for candidate in candidates {
            if numeric_tokens(candidate) != numbers {
                continue;
            }
            let score = token_sort_ratio(title, candidate);
            if score < self.threshold {
                continue;
            }
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }
        best.map(|(candidate, _)| candidate)
    }
}
