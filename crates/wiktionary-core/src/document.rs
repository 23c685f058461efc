use serde::Serialize;
use time::OffsetDateTime;

use crate::markdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Loading,
    Definitions,
    FullPage,
    NoDefinition,
    FetchError,
    ProcessingError,
}

impl DocumentKind {
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::FetchError | Self::ProcessingError)
    }
}

/// Something the host can offer next to a document or suggestion row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    ShowDefinitions { title: String },
    OpenInBrowser { title: String, url: String },
    CopyToClipboard { title: String, content: String },
}

impl Action {
    pub fn label(&self) -> &str {
        match self {
            Self::ShowDefinitions { .. } => "Show Definitions",
            Self::OpenInBrowser { title, .. } | Self::CopyToClipboard { title, .. } => title,
        }
    }
}

/// Final Markdown handed to the display host.
#[derive(Debug, Clone, Serialize)]
pub struct FormattedDocument {
    pub title: String,
    pub navigation_title: String,
    pub kind: DocumentKind,
    pub markdown: String,
    pub source_url: String,
    pub actions: Vec<Action>,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

impl FormattedDocument {
    fn new(title: &str, kind: DocumentKind, markdown: String, source_url: &str) -> Self {
        Self {
            title: title.to_string(),
            navigation_title: title.to_string(),
            kind,
            markdown,
            source_url: source_url.to_string(),
            actions: vec![Action::OpenInBrowser {
                title: "Open in Wiktionary".to_string(),
                url: source_url.to_string(),
            }],
            generated_at: OffsetDateTime::now_utc(),
        }
    }

    /// In-flight marker shown while a lookup is pending.
    #[must_use]
    pub fn loading(title: &str, source_url: &str) -> Self {
        let markdown = format!(
            "{}\nFetching definitions from Wiktionary",
            markdown::header(1, &format!("Looking up \"{title}\"..."))
        );
        let mut document = Self::new(title, DocumentKind::Loading, markdown, source_url);
        document.actions.clear();
        document
    }

    #[must_use]
    pub fn definitions(title: &str, markdown: String, source_url: &str) -> Self {
        Self::new(title, DocumentKind::Definitions, markdown, source_url)
    }

    #[must_use]
    pub fn full_page(title: &str, markdown: String, source_url: &str) -> Self {
        let mut document = Self::new(title, DocumentKind::FullPage, markdown, source_url);
        document.navigation_title = format!("{title} - Wiktionary");
        document.actions = vec![Action::OpenInBrowser {
            title: "Open in Browser".to_string(),
            url: source_url.to_string(),
        }];
        document
    }

    #[must_use]
    pub fn no_definition(title: &str, source_url: &str) -> Self {
        let markdown = markdown::header(1, &format!("No definition found for \"{title}\""));
        Self::new(title, DocumentKind::NoDefinition, markdown, source_url)
    }

    #[must_use]
    pub fn fetch_error(title: &str, source_url: &str) -> Self {
        let markdown = [
            markdown::header(1, "Error"),
            format!(
                "Could not find definition for \"{title}\". The word may not exist in \
                 Wiktionary or there might be a network issue."
            ),
            markdown::blank_line(),
            format!("[Search on Wiktionary Website]({source_url})"),
        ]
        .join("\n");
        let mut document = Self::new(title, DocumentKind::FetchError, markdown, source_url);
        document.actions = vec![Action::OpenInBrowser {
            title: "Search on Wiktionary Website".to_string(),
            url: source_url.to_string(),
        }];
        document
    }

    #[must_use]
    pub fn processing_error(title: &str, source_url: &str) -> Self {
        let markdown = format!(
            "{}\nCould not process definition for \"{title}\". Please try again later.",
            markdown::header(1, "Error")
        );
        Self::new(title, DocumentKind::ProcessingError, markdown, source_url)
    }
}
