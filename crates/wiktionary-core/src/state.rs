use serde::Serialize;
use wiktionary_client::types::Candidate;

use crate::{document::Action, markdown::HtmlConverter, suggest::SuggestionError};

/// Lifecycle of the suggestion list for one input surface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SuggestionState {
    #[default]
    Idle,
    Loading {
        query: String,
    },
    Ready {
        query: String,
        candidates: Vec<Candidate>,
    },
    Failed {
        query: String,
        error: SuggestionError,
    },
}

impl SuggestionState {
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Loading { query } | Self::Ready { query, .. } | Self::Failed { query, .. } => {
                Some(query)
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Ready { candidates, .. } => candidates,
            _ => &[],
        }
    }

    /// Rows for a list view. A failure collapses into one explanatory row.
    pub fn rows(&self, converter: &HtmlConverter, view: &RowContext<'_>) -> Vec<SuggestionRow> {
        match self {
            Self::Idle | Self::Loading { .. } => Vec::new(),
            Self::Failed { error, .. } => vec![SuggestionRow {
                id: "error".to_string(),
                icon: view.default_icon.to_string(),
                title: "Error".to_string(),
                subtitle: error.user_message().to_string(),
                actions: Vec::new(),
            }],
            Self::Ready { candidates, .. } => candidates
                .iter()
                .map(|candidate| SuggestionRow::from_candidate(candidate, converter, view))
                .collect(),
        }
    }
}

/// Host-provided bits needed to build rows.
pub struct RowContext<'a> {
    pub default_icon: &'a str,
    pub page_url: &'a dyn Fn(&str) -> String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionRow {
    pub id: String,
    pub icon: String,
    pub title: String,
    pub subtitle: String,
    pub actions: Vec<Action>,
}

impl SuggestionRow {
    fn from_candidate(
        candidate: &Candidate,
        converter: &HtmlConverter,
        view: &RowContext<'_>,
    ) -> Self {
        Self {
            id: candidate.id.to_string(),
            icon: candidate.icon_source(view.default_icon).to_string(),
            title: candidate.title.clone(),
            subtitle: crate::markdown::single_line(&converter.convert(&candidate.excerpt)),
            actions: vec![
                Action::ShowDefinitions {
                    title: candidate.title.clone(),
                },
                Action::OpenInBrowser {
                    title: "Open in Wiktionary".to_string(),
                    url: (view.page_url)(&candidate.title),
                },
                Action::CopyToClipboard {
                    title: "Copy Title".to_string(),
                    content: candidate.title.clone(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiktionary_client::ClientError;

    fn page_url(title: &str) -> String {
        format!("https://en.wiktionary.org/wiki/{title}")
    }

    fn rows_for(state: &SuggestionState) -> Vec<SuggestionRow> {
        let view = RowContext {
            default_icon: "assets/icon.svg",
            page_url: &page_url,
        };
        state.rows(&HtmlConverter::default(), &view)
    }

    #[test]
    fn failure_is_a_single_row() {
        let state = SuggestionState::Failed {
            query: "cat".to_string(),
            error: SuggestionError::Fetch(ClientError::Http("boom".to_string())),
        };
        let rows = rows_for(&state);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Error");
        assert_eq!(rows[0].subtitle, "Failed to load suggestions.");
    }

    #[test]
    fn candidate_rows_use_default_icon_and_plain_excerpt() {
        let state = SuggestionState::Ready {
            query: "cat".to_string(),
            candidates: vec![Candidate {
                id: 1,
                title: "cat".to_string(),
                excerpt: "<span class=\"searchmatch\">cat</span>".to_string(),
                thumbnail_url: None,
            }],
        };
        let rows = rows_for(&state);
        assert_eq!(rows[0].icon, "assets/icon.svg");
        assert_eq!(rows[0].subtitle, "cat");
        assert!(rows[0].actions.contains(&Action::OpenInBrowser {
            title: "Open in Wiktionary".to_string(),
            url: "https://en.wiktionary.org/wiki/cat".to_string(),
        }));
    }

    #[test]
    fn loading_has_no_rows() {
        let state = SuggestionState::Loading {
            query: "c".to_string(),
        };
        assert!(state.is_loading());
        assert!(rows_for(&state).is_empty());
        assert_eq!(state.query(), Some("c"));
    }
}
