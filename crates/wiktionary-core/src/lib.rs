use std::sync::Arc;

use anyhow::{Context, Result};
use wiktionary_client::{DictionarySource, WiktionaryClient};

pub mod document;
pub mod markdown;
pub mod notify;
pub mod render;
pub mod settings;
pub mod state;
pub mod suggest;

use document::FormattedDocument;
use markdown::HtmlConverter;
use notify::Notifier;
use render::DefinitionRenderer;
use settings::Settings;
use state::{RowContext, SuggestionRow, SuggestionState};
use suggest::{SuggestionResolver, SuggestionSession};
use tracing::{debug, info};

/// Everything a display host needs for lookups, wired to one source.
#[derive(Clone)]
pub struct LookupService {
    source: Arc<dyn DictionarySource>,
    renderer: Arc<DefinitionRenderer>,
    resolver: SuggestionResolver,
    settings: Settings,
}

impl LookupService {
    pub fn new(
        source: Arc<dyn DictionarySource>,
        settings: Settings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let renderer = Arc::new(DefinitionRenderer::new(source.clone(), notifier));
        let resolver = SuggestionResolver::new(source.clone(), settings.suggestion_limit);
        Self {
            source,
            renderer,
            resolver,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn renderer(&self) -> &DefinitionRenderer {
        &self.renderer
    }

    pub fn resolver(&self) -> &SuggestionResolver {
        &self.resolver
    }

    /// Fresh suggestion session for one input surface.
    pub fn session(&self) -> SuggestionSession {
        SuggestionSession::new(self.resolver.clone(), self.settings.session_options())
    }

    pub fn page_url(&self, title: &str) -> String {
        self.source.page_url(title.trim())
    }

    pub async fn define(&self, title: &str) -> FormattedDocument {
        self.renderer.render(title, &self.settings.language).await
    }

    pub async fn full_page(&self, title: &str) -> FormattedDocument {
        self.renderer.render_full_page(title).await
    }

    pub fn loading_document(&self, title: &str) -> FormattedDocument {
        FormattedDocument::loading(title.trim(), &self.page_url(title))
    }

    pub fn rows(&self, state: &SuggestionState) -> Vec<SuggestionRow> {
        let page_url = |title: &str| self.page_url(title);
        let view = RowContext {
            default_icon: &self.settings.default_icon,
            page_url: &page_url,
        };
        state.rows(self.converter(), &view)
    }

    pub fn converter(&self) -> &HtmlConverter {
        self.renderer.converter()
    }
}

/// Build the HTTP-backed lookup service described by `settings`.
pub fn bootstrap(settings: Settings, notifier: Arc<dyn Notifier>) -> Result<LookupService> {
    let client = WiktionaryClient::with_config(settings.client_config())
        .context("failed to build Wiktionary client")?;

    debug!(
        target: "wiktionary_core",
        base_url = %client.config().base_url,
        "WiktionaryClient initialized"
    );
    info!(
        target: "wiktionary_core",
        language = %settings.language,
        suggestion_limit = settings.suggestion_limit,
        debounce_ms = settings.debounce_ms,
        "Lookup service ready"
    );

    Ok(LookupService::new(Arc::new(client), settings, notifier))
}
