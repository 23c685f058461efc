#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use wiktionary_client::{
    types::Candidate, wiki_page_url, ClientError, DictionarySource, DEFAULT_BASE_URL,
};

type Scripted<T> = Mutex<Option<Result<T, ClientError>>>;

/// In-memory stand-in for the Wiktionary endpoints.
#[derive(Default)]
pub struct ScriptedSource {
    searches: Mutex<HashMap<String, (Duration, Result<Vec<Candidate>, ClientError>)>>,
    definition: Scripted<Value>,
    page: Scripted<String>,
    search_calls: AtomicUsize,
    definition_calls: AtomicUsize,
    queries: Mutex<Vec<(String, usize)>>,
    titles: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn with_search(self, query: &str, delay: Duration, result: Result<Vec<Candidate>, ClientError>) -> Self {
        self.searches
            .lock()
            .unwrap()
            .insert(query.to_string(), (delay, result));
        self
    }

    pub fn with_definition(self, result: Result<Value, ClientError>) -> Self {
        *self.definition.lock().unwrap() = Some(result);
        self
    }

    pub fn with_page(self, result: Result<String, ClientError>) -> Self {
        *self.page.lock().unwrap() = Some(result);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn definition_calls(&self) -> usize {
        self.definition_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

#[async_trait]
impl DictionarySource for ScriptedSource {
    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, ClientError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push((query.to_string(), limit));
        let scripted = self.searches.lock().unwrap().get(query).cloned();
        match scripted {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_definition(&self, title: &str) -> Result<Value, ClientError> {
        self.definition_calls.fetch_add(1, Ordering::SeqCst);
        self.titles.lock().unwrap().push(title.to_string());
        self.definition
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ClientError::Http("no definition scripted".to_string())))
    }

    async fn fetch_page_html(&self, title: &str) -> Result<String, ClientError> {
        self.titles.lock().unwrap().push(title.to_string());
        self.page
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ClientError::Http("no page scripted".to_string())))
    }

    fn page_url(&self, title: &str) -> String {
        wiki_page_url(DEFAULT_BASE_URL, title)
    }
}

pub fn candidate(id: u64, title: &str) -> Candidate {
    Candidate {
        id,
        title: title.to_string(),
        excerpt: format!("<span class=\"searchmatch\">{title}</span>"),
        thumbnail_url: None,
    }
}
