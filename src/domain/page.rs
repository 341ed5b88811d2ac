//! Pages created in the target wiki.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A page created for a source node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPage {
    /// Id assigned by the wiki on creation
    pub id: String,

    /// Space the page lives in (inherited from the parent, never recomputed)
    pub space_key: String,

    /// Title the page was created with
    pub title: String,

    /// Id of the parent page; `None` at the top level of the space
    pub parent_id: Option<String>,

    /// Source node this page was created for
    pub source_id: String,
}

/// Title used when the plain name collides with an existing page
pub fn disambiguated_title(name: &str, date: NaiveDate) -> String {
    format!("{} (import {})", name, date.format("%Y-%m-%d"))
}

/// Provenance comment posted on every created page
pub fn provenance_comment(web_view_link: &str) -> String {
    format!("Automatically imported from: {}", web_view_link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disambiguated_title() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(disambiguated_title("Budget", date), "Budget (import 2024-03-07)");
    }

    #[test]
    fn test_provenance_comment() {
        assert_eq!(
            provenance_comment("https://drive.google.com/x"),
            "Automatically imported from: https://drive.google.com/x"
        );
    }
}
