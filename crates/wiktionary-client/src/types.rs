use serde::{Deserialize, Serialize};

/// Raw response of the REST title search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub pages: Option<Vec<Page>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: u64,
    #[serde(default)]
    pub key: Option<String>,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub matched_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One search hit offered as a suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: u64,
    pub title: String,
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl Candidate {
    /// Icon source for list rows, falling back to `default_icon` when the
    /// page has no thumbnail.
    #[must_use]
    pub fn icon_source<'a>(&'a self, default_icon: &'a str) -> &'a str {
        self.thumbnail_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(default_icon)
    }
}

impl From<Page> for Candidate {
    fn from(page: Page) -> Self {
        let thumbnail_url = page
            .thumbnail
            .and_then(|thumbnail| thumbnail.url)
            .filter(|url| !url.trim().is_empty())
            .map(|url| absolute_thumbnail_url(&url));

        Self {
            id: page.id,
            title: page.title,
            excerpt: page.excerpt.unwrap_or_default(),
            thumbnail_url,
        }
    }
}

/// The search API hands out protocol-relative thumbnail URLs.
fn absolute_thumbnail_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}

/// One part-of-speech group of a definition payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEntry {
    pub part_of_speech: String,
    #[serde(default)]
    pub language: Option<String>,
    pub definitions: Vec<DefinitionItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionItem {
    #[serde(rename = "definition")]
    pub definition_html: String,
    #[serde(default)]
    pub parsed_examples: Option<Vec<ParsedExample>>,
    #[serde(default)]
    pub examples: Option<Vec<String>>,
}

impl DefinitionItem {
    /// Example HTML fragments in payload order. Structured examples win over
    /// the plain string list when both are present.
    #[must_use]
    pub fn example_html(&self) -> Vec<&str> {
        match (&self.parsed_examples, &self.examples) {
            (Some(parsed), _) if !parsed.is_empty() => {
                parsed.iter().map(|example| example.example.as_str()).collect()
            }
            (_, Some(plain)) => plain.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedExample {
    pub example: String,
}
