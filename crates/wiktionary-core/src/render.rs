use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use wiktionary_client::{types::LanguageEntry, ClientError, DictionarySource};

use crate::{
    document::FormattedDocument,
    markdown::{self, HtmlConverter},
    notify::{Notifier, Toast},
};

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("failed to fetch {title:?}: {source}")]
    Fetch {
        title: String,
        #[source]
        source: ClientError,
    },
    #[error("failed to process {title:?}: {reason}")]
    Processing { title: String, reason: String },
}

impl RenderError {
    fn processing(title: &str, reason: impl Into<String>) -> Self {
        Self::Processing {
            title: title.to_string(),
            reason: reason.into(),
        }
    }
}

/// Fetches definition payloads and turns them into Markdown documents.
pub struct DefinitionRenderer {
    source: Arc<dyn DictionarySource>,
    converter: HtmlConverter,
    notifier: Arc<dyn Notifier>,
}

impl DefinitionRenderer {
    pub fn new(source: Arc<dyn DictionarySource>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_converter(source, notifier, HtmlConverter::default())
    }

    pub fn with_converter(
        source: Arc<dyn DictionarySource>,
        notifier: Arc<dyn Notifier>,
        converter: HtmlConverter,
    ) -> Self {
        Self {
            source,
            converter,
            notifier,
        }
    }

    pub fn converter(&self) -> &HtmlConverter {
        &self.converter
    }

    pub fn page_url(&self, title: &str) -> String {
        self.source.page_url(title.trim())
    }

    /// Look up `title` and always produce a document. Failures become error
    /// documents; processing failures also raise a notification.
    #[instrument(name = "definition_renderer.render", skip(self))]
    pub async fn render(&self, title: &str, language: &str) -> FormattedDocument {
        match self.try_render(title, language).await {
            Ok(document) => document,
            Err(error) => self.failure_document(title.trim(), &error),
        }
    }

    pub async fn try_render(
        &self,
        title: &str,
        language: &str,
    ) -> Result<FormattedDocument, RenderError> {
        let title = title.trim();
        let payload = self
            .source
            .fetch_definition(title)
            .await
            .map_err(|source| RenderError::Fetch {
                title: title.to_string(),
                source,
            })?;
        self.render_payload(title, language, &payload)
    }

    /// Walk an already fetched definition payload.
    pub fn render_payload(
        &self,
        title: &str,
        language: &str,
        payload: &Value,
    ) -> Result<FormattedDocument, RenderError> {
        let source_url = self.page_url(title);
        let entries = language_entries(title, language, payload)?;
        if entries.is_empty() {
            debug!(title, language, "no entries for requested language");
            return Ok(FormattedDocument::no_definition(title, &source_url));
        }

        // Converter panics on hostile markup surface as processing errors.
        let markdown = panic::catch_unwind(AssertUnwindSafe(|| self.entries_markdown(&entries)))
            .map_err(|_| RenderError::processing(title, "conversion panicked"))?;
        Ok(FormattedDocument::definitions(title, markdown, &source_url))
    }

    /// Markdown for the part-of-speech sections, in payload order.
    pub fn entries_markdown(&self, entries: &[LanguageEntry]) -> String {
        let mut sections = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut lines = vec![
                markdown::header(2, entry.part_of_speech.trim()),
                markdown::blank_line(),
            ];

            let mut items = Vec::new();
            for (position, item) in entry.definitions.iter().enumerate() {
                let text = self.converter.convert(&item.definition_html);
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }

                let mut block = markdown::indent_continuation(&format!("{}. ", position + 1), text);
                for example in item.example_html() {
                    let example = markdown::single_line(&self.converter.convert(example));
                    if example.is_empty() {
                        continue;
                    }
                    block.push_str("\n    > ");
                    block.push_str(&markdown::italic(&example));
                }
                items.push(block);
            }

            lines.push(items.join("\n\n"));
            sections.push(lines.join("\n").trim_end().to_string());
        }
        sections.join("\n\n")
    }

    /// Alternate mode: convert the entire rendered page.
    #[instrument(name = "definition_renderer.render_full_page", skip(self))]
    pub async fn render_full_page(&self, title: &str) -> FormattedDocument {
        let title = title.trim();
        let source_url = self.page_url(title);
        let html = match self.source.fetch_page_html(title).await {
            Ok(html) => html,
            Err(source) => {
                let error = RenderError::Fetch {
                    title: title.to_string(),
                    source,
                };
                return self.failure_document(title, &error);
            }
        };

        if html.trim().is_empty() {
            return FormattedDocument::no_definition(title, &source_url);
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.converter.convert(&html))) {
            Ok(markdown) => FormattedDocument::full_page(title, markdown, &source_url),
            Err(_) => {
                let error = RenderError::processing(title, "conversion panicked");
                self.failure_document(title, &error)
            }
        }
    }

    fn failure_document(&self, title: &str, error: &RenderError) -> FormattedDocument {
        let source_url = self.page_url(title);
        match error {
            RenderError::Fetch { .. } => {
                warn!(target: "wiktionary_render", error = %error, "definition fetch failed");
                FormattedDocument::fetch_error(title, &source_url)
            }
            RenderError::Processing { .. } => {
                error!(target: "wiktionary_render", error = %error, "error processing API data");
                self.notifier.notify(Toast::failure(
                    "Failed to process definition",
                    "There was an error processing the definition data",
                ));
                FormattedDocument::processing_error(title, &source_url)
            }
        }
    }
}

/// Entries for `language`. A missing or null key means no definition; any
/// other unexpected shape is a processing error.
fn language_entries(
    title: &str,
    language: &str,
    payload: &Value,
) -> Result<Vec<LanguageEntry>, RenderError> {
    let Some(object) = payload.as_object() else {
        return Err(RenderError::processing(
            title,
            "definition payload is not an object",
        ));
    };

    match object.get(language) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| RenderError::processing(title, err.to_string())),
    }
}
