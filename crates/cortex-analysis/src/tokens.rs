//! Structural token estimation.
//!
//! Deliberately coarse and tokenizer-free: the same entity must estimate
//! to the same count on every platform, which matters more here than
//! accuracy against any particular model's tokenizer.

use serde::{Deserialize, Serialize};

/// Base overhead per entry.
const BASE_TOKENS: usize = 10;

/// How much of each entity is rendered into the context pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    /// Name and location only.
    Sparse,
    /// Adds the signature.
    #[default]
    Medium,
    /// Adds metrics and edge summaries.
    Dense,
}

impl Density {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sparse => "sparse",
            Self::Medium => "medium",
            Self::Dense => "dense",
        }
    }

    /// Parses a density string; unknown values return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sparse" => Some(Self::Sparse),
            "medium" | "smart" => Some(Self::Medium),
            "dense" => Some(Self::Dense),
            _ => None,
        }
    }
}

/// Whitespace-separated word count.
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Estimated tokens for a code entity at the given density.
pub fn entity_tokens(density: Density, name: &str, signature: &str) -> usize {
    let title = word_count(name) + 2;
    let body = match density {
        Density::Sparse => 5,
        Density::Medium => word_count(signature) + 15,
        Density::Dense => word_count(signature) + 15 + 20,
    };
    BASE_TOKENS + title + body
}

/// Estimated tokens for a task entry.
pub fn task_tokens(title: &str, description: &str) -> usize {
    BASE_TOKENS + word_count(title) + 2 + word_count(description) + 20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_parse_accepts_smart_alias() {
        assert_eq!(Density::parse("smart"), Some(Density::Medium));
        assert_eq!(Density::parse("DENSE"), Some(Density::Dense));
        assert_eq!(Density::parse("verbose"), None);
    }

    #[test]
    fn sparse_is_cheapest() {
        let name = "HandleRequest";
        let sig = "func HandleRequest(w http.ResponseWriter, r *http.Request)";
        let sparse = entity_tokens(Density::Sparse, name, sig);
        let medium = entity_tokens(Density::Medium, name, sig);
        let dense = entity_tokens(Density::Dense, name, sig);
        assert!(sparse < medium);
        assert!(medium < dense);
        // Dense adds exactly the edge summary over medium.
        assert_eq!(dense - medium, 20);
    }

    #[test]
    fn sparse_estimate_is_fixed_shape() {
        // base 10 + (1 word + 2) + 5
        assert_eq!(entity_tokens(Density::Sparse, "Foo", "anything here"), 18);
    }

    #[test]
    fn task_estimate_counts_title_and_description() {
        // base 10 + (2 + 2) + 3 + 20
        assert_eq!(task_tokens("fix login", "users cannot login"), 37);
    }
}
