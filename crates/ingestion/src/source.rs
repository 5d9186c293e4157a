//! Paper source client
//!
//! Fetches paper metadata from the arXiv export API and downloads
//! PDFs. The Atom responses are small and flat, so the parser walks
//! tags by hand instead of pulling in an XML crate.

use async_trait::async_trait;
use chrono::NaiveDate;
use citegraph_common::config::SourceConfig;
use citegraph_common::errors::{AppError, Result};
use std::time::Duration;
use tracing::debug;

const EXPORT_API_BASE: &str = "https://export.arxiv.org/api/query";

/// Raw metadata for one paper, before full text and citations are
/// attached
#[derive(Debug, Clone, PartialEq)]
pub struct PaperMeta {
    pub arxiv_id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub published: NaiveDate,
    pub abs_link: String,
    pub pdf_link: Option<String>,
}

/// External source of paper metadata and documents
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Fetch metadata for one arXiv id
    async fn fetch_metadata(&self, arxiv_id: &str) -> Result<PaperMeta>;

    /// Download the document behind a PDF link
    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP client for the arXiv export API
pub struct ArxivClient {
    client: reqwest::Client,
    last_request: std::sync::Mutex<Option<std::time::Instant>>,
}

impl ArxivClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            last_request: std::sync::Mutex::new(None),
        })
    }

    /// Enforce a minimum 3-second delay between export API requests
    async fn rate_limit(&self) {
        let wait_duration = {
            let last = self
                .last_request
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(instant) = *last {
                let elapsed = instant.elapsed();
                if elapsed < Duration::from_secs(3) {
                    Some(Duration::from_secs(3) - elapsed)
                } else {
                    None
                }
            } else {
                None
            }
        }; // guard dropped before the await

        if let Some(wait) = wait_duration {
            tokio::time::sleep(wait).await;
        }

        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(std::time::Instant::now());
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn fetch_metadata(&self, arxiv_id: &str) -> Result<PaperMeta> {
        let clean_id = arxiv_id.trim();
        validate_arxiv_id(clean_id)?;

        self.rate_limit().await;
        let url = format!(
            "{}?id_list={}",
            EXPORT_API_BASE,
            urlencoding::encode(clean_id)
        );
        debug!(url, "fetching paper metadata");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch {
                message: format!("export API returned status {status}"),
            });
        }

        let body = response.text().await?;
        parse_entry(&body).ok_or_else(|| AppError::ResourceNotFound {
            resource: "paper".into(),
            id: clean_id.to_string(),
        })
    }

    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>> {
        self.rate_limit().await;
        debug!(url, "downloading pdf");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch {
                message: format!("pdf download returned status {status}"),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Parse the first <entry> of an Atom feed
pub fn parse_entry(xml: &str) -> Option<PaperMeta> {
    let entry = extract_block(xml, "<entry>", "</entry>")?;

    let id_url = extract_tag_text(entry, "id")?;
    let arxiv_id = strip_version(&extract_id_from_url(&id_url));
    let title = normalize_whitespace(&extract_tag_text(entry, "title")?);
    let summary = normalize_whitespace(&extract_tag_text(entry, "summary").unwrap_or_default());

    let published_raw = extract_tag_text(entry, "published")?;
    let published = NaiveDate::parse_from_str(published_raw.get(..10)?, "%Y-%m-%d").ok()?;

    // authors
    let mut authors = Vec::new();
    let mut search = 0;
    while let Some(pos) = entry[search..].find("<author>") {
        let start = search + pos;
        let Some(end_pos) = entry[start..].find("</author>") else {
            break;
        };
        let end = start + end_pos + "</author>".len();
        if let Some(name) = extract_tag_text(&entry[start..end], "name") {
            authors.push(name);
        }
        search = end;
    }

    // categories
    let mut categories = Vec::new();
    let mut search = 0;
    while let Some(pos) = entry[search..].find("<category") {
        let start = search + pos;
        let end = if let Some(end_pos) = entry[start..].find("/>") {
            start + end_pos + 2
        } else if let Some(end_pos) = entry[start..].find('>') {
            start + end_pos + 1
        } else {
            break;
        };
        if let Some(term) = extract_attribute(&entry[start..end], "term") {
            if !categories.contains(&term) {
                categories.push(term);
            }
        }
        search = end;
    }

    // links
    let mut pdf_link = None;
    let mut abs_link = id_url.clone();
    let mut search = 0;
    while let Some(pos) = entry[search..].find("<link") {
        let start = search + pos;
        let Some(end_pos) = entry[start..]
            .find("/>")
            .or_else(|| entry[start..].find('>'))
        else {
            break;
        };
        let end = start + end_pos + 2;
        let link_tag = &entry[start..end.min(entry.len())];
        let href = extract_attribute(link_tag, "href").unwrap_or_default();
        let title_attr = extract_attribute(link_tag, "title").unwrap_or_default();
        let link_type = extract_attribute(link_tag, "type").unwrap_or_default();

        if title_attr == "pdf" || link_type == "application/pdf" {
            pdf_link = Some(href);
        } else if href.contains("/abs/") {
            abs_link = href;
        }
        search = end;
    }

    Some(PaperMeta {
        arxiv_id,
        title,
        summary,
        authors,
        categories,
        published,
        abs_link,
        pdf_link,
    })
}

fn extract_block<'a>(xml: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = xml.find(open)?;
    let end = xml[start..].find(close)? + start + close.len();
    Some(&xml[start..end])
}

/// Extract the text content of the first occurrence of <tag>text</tag>
fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let start_pos = xml.find(&open)?;
    let content_start = xml[start_pos..].find('>')? + start_pos + 1;
    let content_end = xml[content_start..].find(&close)? + content_start;

    Some(xml[content_start..content_end].trim().to_string())
}

/// Extract an attribute value from a tag string
fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let search = format!("{attr}=\"");
    let start = tag.find(&search)? + search.len();
    let end = tag[start..].find('"')? + start;
    Some(tag[start..end].to_string())
}

/// Extract the id from a URL like "http://arxiv.org/abs/1706.03762v7"
fn extract_id_from_url(url: &str) -> String {
    if let Some(pos) = url.rfind("/abs/") {
        url[pos + 5..].to_string()
    } else if let Some(pos) = url.rfind("/pdf/") {
        url[pos + 5..].trim_end_matches(".pdf").to_string()
    } else {
        url.to_string()
    }
}

/// Drop a trailing version suffix: "1706.03762v7" -> "1706.03762"
pub fn strip_version(id: &str) -> String {
    match id.rfind('v') {
        Some(pos) if id[pos + 1..].chars().all(|c| c.is_ascii_digit()) && pos + 1 < id.len() => {
            id[..pos].to_string()
        }
        _ => id.to_string(),
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate that a string looks like an arXiv id.
/// Accepts new format (YYMM.NNNNN) and old format (category/NNNNNNN).
pub fn validate_arxiv_id(id: &str) -> Result<()> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::Parse {
            message: "arXiv id cannot be empty".into(),
        });
    }

    if matches_new_format(id) || matches_old_format(id) {
        Ok(())
    } else {
        Err(AppError::Parse {
            message: format!(
                "invalid arXiv id '{id}', expected YYMM.NNNNN or category/NNNNNNN"
            ),
        })
    }
}

/// Match new-format ids: YYMM.NNNN or YYMM.NNNNN, optional vN suffix
fn matches_new_format(id: &str) -> bool {
    let base = id.split('v').next().unwrap_or(id);
    let parts: Vec<&str> = base.split('.').collect();
    if parts.len() != 2 {
        return false;
    }
    let yymm = parts[0];
    let number = parts[1];

    if yymm.len() != 4 || !yymm.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if number.len() < 4 || number.len() > 5 || !number.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    if let Some(v_pos) = id.find('v') {
        let version = &id[v_pos + 1..];
        if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }

    true
}

/// Match old-format ids: category/NNNNNNN
fn matches_old_format(id: &str) -> bool {
    let parts: Vec<&str> = id.splitn(2, '/').collect();
    if parts.len() != 2 {
        return false;
    }
    let category = parts[0];
    let number = parts[1].split('v').next().unwrap_or(parts[1]);

    if category.is_empty()
        || !category
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return false;
    }
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    true
}
