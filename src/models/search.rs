use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Maximum accepted length of a search term
pub const MAX_SEARCH_TERM_LENGTH: usize = 500;

#[derive(Debug, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorSearchQuery {
    /// Case-insensitive substring of the author name
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleSearchQuery {
    /// Case-insensitive substring of the title
    #[serde(default)]
    pub title: String,
}

/// Trim a search term and cap its length.
pub fn clean_search_term(term: &str) -> String {
    term.trim().chars().take(MAX_SEARCH_TERM_LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_search_term_trims_and_caps() {
        assert_eq!(clean_search_term("  doe "), "doe");
        let long = "x".repeat(MAX_SEARCH_TERM_LENGTH + 20);
        assert_eq!(clean_search_term(&long).len(), MAX_SEARCH_TERM_LENGTH);
    }
}
