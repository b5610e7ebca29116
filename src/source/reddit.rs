//! HTTP listing source backed by the Reddit JSON endpoints
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with the configured user agent
//! - Paging through `/r/{subreddit}/new.json`
//! - Fetching and flattening comment trees from `/comments/{id}.json`
//! - Error classification

use crate::config::RedditConfig;
use crate::model::{Comment, Post};
use crate::source::traits::{ListingPage, ListingSource, SourceError, SourceResult};
use crate::HarvestError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Prefix for relative comment permalinks
const WEB_ROOT: &str = "https://www.reddit.com";

/// Author name the API reports for deleted accounts
const DELETED_AUTHOR: &str = "[deleted]";

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use reddit_harvest::config::RedditConfig;
/// use reddit_harvest::source::build_http_client;
///
/// let client = build_http_client(&RedditConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &RedditConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Listing source that reads the public Reddit JSON API
pub struct RedditSource {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
    page_size: u32,
}

impl RedditSource {
    /// Creates a source from the `[reddit]` configuration section
    pub fn new(config: &RedditConfig) -> Result<Self, HarvestError> {
        let client = build_http_client(config)?;

        let mut base_url = Url::parse(&config.base_url).map_err(SourceError::from)?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
            page_size: config.page_size,
        })
    }

    fn listing_url(&self, subreddit: &str, after: Option<&str>) -> SourceResult<Url> {
        let mut url = self.base_url.join(&format!("r/{}/new.json", subreddit))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.page_size.to_string());
            query.append_pair("raw_json", "1");
            if let Some(after) = after {
                query.append_pair("after", after);
            }
        }
        Ok(url)
    }

    fn comments_url(&self, post_id: &str) -> SourceResult<Url> {
        let mut url = self.base_url.join(&format!("comments/{}.json", post_id))?;
        url.query_pairs_mut()
            .append_pair("limit", "500")
            .append_pair("raw_json", "1");
        Ok(url)
    }

    /// Sends a GET request and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> SourceResult<T> {
        let url_str = url.to_string();
        tracing::trace!("GET {}", url_str);

        let mut request = self.client.get(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| SourceError::Http {
            url: url_str.clone(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited { url: url_str });
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| SourceError::Http {
            url: url_str.clone(),
            source,
        })?;

        serde_json::from_str(&body).map_err(|e| SourceError::Decode {
            url: url_str,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ListingSource for RedditSource {
    async fn fetch_new(
        &mut self,
        subreddit: &str,
        after: Option<&str>,
    ) -> SourceResult<ListingPage> {
        let url = self.listing_url(subreddit, after)?;
        let url_str = url.to_string();

        let listing: Thing<Listing<Thing<RawPost>>> = self.get_json(url).await?;
        let posts = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into_post())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|message| SourceError::Decode {
                url: url_str,
                message,
            })?;

        tracing::debug!(
            "Fetched {} posts from r/{} (after: {:?})",
            posts.len(),
            subreddit,
            after
        );

        Ok(ListingPage {
            posts,
            after: listing.data.after.filter(|a| !a.is_empty()),
        })
    }

    async fn fetch_comments(&mut self, post: &Post) -> SourceResult<Vec<Comment>> {
        let url = self.comments_url(&post.id)?;
        let url_str = url.to_string();

        // [post listing, comment listing]
        let response: Vec<Thing<Listing<Thing>>> = self.get_json(url).await?;
        let tree = response.into_iter().nth(1).ok_or_else(|| SourceError::Decode {
            url: url_str.clone(),
            message: "response has no comment listing".to_string(),
        })?;

        let mut comments = Vec::new();
        flatten_comment_tree(tree.data.children, &post.id, &mut comments).map_err(
            |message| SourceError::Decode {
                url: url_str,
                message,
            },
        )?;

        Ok(comments)
    }
}

/// Generic `{kind, data}` envelope used by every API object
#[derive(Debug, Deserialize)]
struct Thing<T = Value> {
    kind: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    #[serde(default)]
    after: Option<String>,
    #[serde(default = "Vec::new")]
    children: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    score: i64,
    created_utc: f64,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    url: String,
    subreddit: String,
}

impl RawPost {
    fn into_post(self) -> Result<Post, String> {
        Ok(Post {
            created_utc: parse_created(self.created_utc)?,
            id: self.id,
            title: self.title,
            body: self.selftext,
            author: normalize_author(self.author),
            score: self.score,
            permalink: self.permalink,
            num_comments: self.num_comments,
            url: self.url,
            subreddit: self.subreddit,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    score: i64,
    created_utc: f64,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    parent_id: Option<String>,
    /// Either an empty string or a nested listing
    #[serde(default)]
    replies: Value,
}

/// Walks a comment tree depth-first in display order
///
/// `more` placeholders are dropped, so the result holds only the comments
/// the API actually returned.
fn flatten_comment_tree(
    children: Vec<Thing>,
    post_id: &str,
    out: &mut Vec<Comment>,
) -> Result<(), String> {
    for child in children {
        match child.kind.as_str() {
            "t1" => {
                let raw: RawComment =
                    serde_json::from_value(child.data).map_err(|e| e.to_string())?;
                let replies = raw.replies;

                out.push(Comment {
                    created_utc: parse_created(raw.created_utc)?,
                    id: raw.id,
                    body: raw.body,
                    author: normalize_author(raw.author),
                    score: raw.score,
                    permalink: absolute_permalink(&raw.permalink),
                    post_id: post_id.to_string(),
                    parent_id: raw.parent_id.as_deref().and_then(parent_comment_id),
                });

                if replies.is_object() {
                    let nested: Thing<Listing<Thing>> =
                        serde_json::from_value(replies).map_err(|e| e.to_string())?;
                    flatten_comment_tree(nested.data.children, post_id, out)?;
                }
            }
            "more" => {}
            other => tracing::trace!("Skipping unexpected comment node kind: {}", other),
        }
    }
    Ok(())
}

/// Maps a fullname parent to a comment id; top-level comments (parent `t3_`) have none
fn parent_comment_id(fullname: &str) -> Option<String> {
    fullname.strip_prefix("t1_").map(String::from)
}

fn normalize_author(author: Option<String>) -> Option<String> {
    author.filter(|name| !name.is_empty() && name != DELETED_AUTHOR)
}

fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with('/') {
        format!("{}{}", WEB_ROOT, permalink)
    } else {
        permalink.to_string()
    }
}

fn parse_created(created_utc: f64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(created_utc.trunc() as i64, 0)
        .ok_or_else(|| format!("created_utc out of range: {}", created_utc))
}
