//! Sitemap reader
//!
//! Fetches a single `<urlset>` sitemap and flattens it into a URL list.
//! Sitemap indexes and multi-file sitemaps are not supported.

use crate::{HarvestError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use url::Url;

/// Fetches and parses sitemap documents
#[derive(Debug, Clone)]
pub struct SitemapReader {
    client: Client,
}

impl SitemapReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches the sitemap and returns the first `<loc>` of every `<url>`
    ///
    /// # Errors
    ///
    /// * `HarvestError::Upstream` - the server answered with a non-2xx status
    /// * `HarvestError::Transport` - no response was received
    /// * `HarvestError::UrlParse` - `sitemap_url` is not an absolute URL
    /// * `HarvestError::Format` - the document is not a `<urlset>` sitemap
    pub async fn fetch(&self, sitemap_url: &str) -> Result<Vec<String>> {
        if sitemap_url.is_empty() {
            return Err(HarvestError::Format {
                url: String::new(),
                message: "sitemap URL is required".to_string(),
            });
        }

        let parsed = Url::parse(sitemap_url)?;
        tracing::info!("Fetching sitemap {}", parsed);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|source| HarvestError::Transport {
                url: sitemap_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Upstream {
                url: sitemap_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| HarvestError::Transport {
                url: sitemap_url.to_string(),
                source,
            })?;

        let urls = parse_sitemap(sitemap_url, &body)?;
        tracing::info!("Sitemap {} lists {} URLs", sitemap_url, urls.len());
        Ok(urls)
    }
}

/// Parses a `<urlset>` document into its page URLs
pub fn parse_sitemap(sitemap_url: &str, xml: &[u8]) -> Result<Vec<String>> {
    let format_error = |message: String| HarvestError::Format {
        url: sitemap_url.to_string(),
        message,
    };

    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut urls = Vec::new();
    let mut saw_root = false;
    let mut in_url = false;
    let mut in_loc = false;
    let mut url_has_loc = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if !saw_root {
                    match name.as_ref() {
                        b"urlset" => saw_root = true,
                        b"sitemapindex" => {
                            return Err(format_error(
                                "sitemap index documents are not supported".to_string(),
                            ))
                        }
                        other => {
                            return Err(format_error(format!(
                                "expected <urlset> root, found <{}>",
                                String::from_utf8_lossy(other)
                            )))
                        }
                    }
                } else {
                    // Qualified names, so extension elements such as
                    // <image:loc> are not taken for a page <loc>.
                    match e.name().as_ref() {
                        b"url" => {
                            in_url = true;
                            url_has_loc = false;
                        }
                        b"loc" if in_url => in_loc = true,
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if !saw_root {
                    let name = e.local_name();
                    if name.as_ref() == b"urlset" {
                        return Ok(urls);
                    }
                    return Err(format_error(format!(
                        "expected <urlset> root, found <{}>",
                        String::from_utf8_lossy(name.as_ref())
                    )));
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"loc" => in_loc = false,
                b"url" => in_url = false,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if in_loc && !url_has_loc {
                    let text = t
                        .unescape()
                        .map_err(|e| format_error(format!("invalid <loc> text: {}", e)))?;
                    urls.push(text.trim().to_string());
                    url_has_loc = true;
                }
            }
            Ok(Event::CData(t)) => {
                if in_loc && !url_has_loc {
                    urls.push(String::from_utf8_lossy(&t).trim().to_string());
                    url_has_loc = true;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format_error(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(format_error("missing <urlset> root element".to_string()));
    }

    Ok(urls)
}
