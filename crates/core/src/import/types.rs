//! Import request and outcome types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::CatalogItem;

/// A batch of names to import for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub raw_names: Vec<String>,
    /// Platform to add imported games to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_platform_id: Option<String>,
}

impl ImportRequest {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            raw_names: names.into_iter().map(Into::into).collect(),
            target_platform_id: None,
        }
    }

    pub fn with_platform(mut self, platform_id: impl Into<String>) -> Self {
        self.target_platform_id = Some(platform_id.into());
        self
    }
}

/// How an imported game was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Name equal ignoring case.
    Exact,
    /// Lone candidate, or top candidate containing the search term.
    Best,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Best => "best",
        }
    }
}

/// A name that was imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedGame {
    pub search_term: String,
    /// Local library id of the game.
    pub game_id: i64,
    pub item: CatalogItem,
    pub match_kind: MatchKind,
}

/// A name that needs a human to pick (or reject) a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub search_term: String,
    pub candidates: Vec<CatalogItem>,
    /// Set when processing failed rather than the match being ambiguous.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of reconciling one non-blank name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ImportOutcome {
    Imported(ImportedGame),
    NeedsReview(ReviewItem),
}

impl ImportOutcome {
    pub fn search_term(&self) -> &str {
        match self {
            ImportOutcome::Imported(game) => &game.search_term,
            ImportOutcome::NeedsReview(review) => &review.search_term,
        }
    }

    pub fn is_imported(&self) -> bool {
        matches!(self, ImportOutcome::Imported(_))
    }
}

/// Outcomes partitioned by variant, input order kept within each list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: Vec<ImportedGame>,
    pub needs_review: Vec<ReviewItem>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.imported.len() + self.needs_review.len()
    }
}

impl From<Vec<ImportOutcome>> for ImportReport {
    fn from(outcomes: Vec<ImportOutcome>) -> Self {
        let mut report = ImportReport::default();
        for outcome in outcomes {
            match outcome {
                ImportOutcome::Imported(game) => report.imported.push(game),
                ImportOutcome::NeedsReview(review) => report.needs_review.push(review),
            }
        }
        report
    }
}

/// Errors rejecting a whole import request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("At least one game name is required")]
    EmptyRequest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: ImportRequest =
            serde_json::from_str(r#"{"rawNames": ["Doom"], "targetPlatformId": "pc"}"#).unwrap();
        assert_eq!(request, ImportRequest::new(["Doom"]).with_platform("pc"));

        let request: ImportRequest = serde_json::from_str(r#"{"rawNames": []}"#).unwrap();
        assert!(request.target_platform_id.is_none());
    }

    #[test]
    fn test_report_partitions_outcomes() {
        let outcomes = vec![
            ImportOutcome::NeedsReview(ReviewItem {
                search_term: "mario".to_string(),
                candidates: vec![],
                error: None,
            }),
            ImportOutcome::Imported(ImportedGame {
                search_term: "doom".to_string(),
                game_id: 1,
                item: fixtures::catalog_item(1, "DOOM"),
                match_kind: MatchKind::Exact,
            }),
            ImportOutcome::Imported(ImportedGame {
                search_term: "quake".to_string(),
                game_id: 2,
                item: fixtures::catalog_item(2, "Quake"),
                match_kind: MatchKind::Best,
            }),
        ];
        assert_eq!(outcomes[0].search_term(), "mario");
        assert!(!outcomes[0].is_imported());

        let report = ImportReport::from(outcomes);

        assert_eq!(report.total(), 3);
        assert_eq!(report.imported[0].search_term, "doom");
        assert_eq!(report.imported[1].search_term, "quake");
        assert_eq!(report.needs_review[0].search_term, "mario");
    }

    #[test]
    fn test_report_json_shape() {
        let report = ImportReport {
            imported: vec![ImportedGame {
                search_term: "doom".to_string(),
                game_id: 1,
                item: fixtures::catalog_item(1, "DOOM"),
                match_kind: MatchKind::Best,
            }],
            needs_review: vec![ReviewItem {
                search_term: "x".to_string(),
                candidates: vec![],
                error: Some("boom".to_string()),
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["imported"][0]["matchKind"], "best");
        assert_eq!(json["imported"][0]["item"]["providerId"], 1);
        assert_eq!(json["needsReview"][0]["searchTerm"], "x");
        assert_eq!(json["needsReview"][0]["error"], "boom");
    }
}
