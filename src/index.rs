//! Resolves year prefixes against the remote archive index.
//!
//! The index is an HTML directory listing whose table cells hold one anchor per archive.
//! A year is matched by prefix, not equality, so "190" selects every archive from 1900
//! to 1909, and "19" would also select a hypothetical "1990s-supplement.csv.gz".

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
/// An archive discovered in the index.
pub struct ArchiveRef {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub archives: Vec<ArchiveRef>,
    /// Prefixes that matched nothing
    pub unmatched: Vec<String>,
}

pub struct IndexResolver {
    client: Client,
    base_url: String,
}

impl IndexResolver {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        IndexResolver {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetches the index once and resolves every prefix against it.
    pub async fn resolve(&self, prefixes: &[String]) -> Result<Resolution> {
        info!("Fetching archive index {}", self.base_url);
        let page = self.fetch_index().await?;
        let links = extract_links(&page)?;
        debug!("Index lists {} links", links.len());

        let resolution = resolve_links(prefixes, &links, &self.base_url);
        for prefix in &resolution.unmatched {
            warn!("Unable to find files starting with {}", prefix);
        }

        Ok(resolution)
    }

    async fn fetch_index(&self) -> Result<String> {
        let response = self.client.get(&self.base_url).send().await?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "Failed to fetch index {}: {}",
                self.base_url,
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

/// Extracts the trimmed `href` of every anchor in a table cell, in document order.
pub fn extract_links(page: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(page);
    let table = Selector::parse("table").map_err(|e| Error::Parse(e.to_string()))?;
    let anchors = Selector::parse("table tr td a").map_err(|e| Error::Parse(e.to_string()))?;

    if document.select(&table).next().is_none() {
        return Err(Error::Parse("index has no listing table".to_string()));
    }

    let links = document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect();

    Ok(links)
}

/// Matches each prefix against the links, keeping the index order within a prefix.
pub fn resolve_links(prefixes: &[String], links: &[String], base_url: &str) -> Resolution {
    let base = base_url.trim_end_matches('/');
    let mut resolution = Resolution::default();

    for prefix in prefixes {
        let before = resolution.archives.len();

        resolution.archives.extend(
            links
                .iter()
                .filter(|link| link.starts_with(prefix.as_str()))
                .map(|link| ArchiveRef {
                    file_name: file_name(link).to_string(),
                    url: format!("{}/{}", base, link),
                }),
        );

        if resolution.archives.len() == before {
            resolution.unmatched.push(prefix.clone());
        }
    }

    resolution
}

fn file_name(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

// -- Tests -------------------------------------------------------------------
