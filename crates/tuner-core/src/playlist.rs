//! Playlist loading and parsing
//!
//! Playlists are line oriented:
//! - `#EXTINF:<duration> [key="value" ...],<name>` names the next stream
//! - any other line starting with `#` is a comment
//! - every other non-empty line is a stream URL, relative ones resolved
//!   against the playlist location when it is loaded

use crate::{
    error::Error,
    types::{Channel, ChannelAttributes, Playlist},
    Result,
};
use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, multispace0},
    sequence::{delimited, preceded, separated_pair},
    IResult, Parser,
};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const EXTINF_MARKER: &str = "#EXTINF";

/// Display name and attributes taken from a metadata line
#[derive(Debug, Default, PartialEq)]
struct EntryInfo {
    name: Option<String>,
    attributes: ChannelAttributes,
}

/// Parse playlist text into channels, in playlist order
pub fn parse_playlist(content: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut pending: Option<EntryInfo> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(info) = line.strip_prefix(EXTINF_MARKER) {
            pending = Some(parse_extinf(info.strip_prefix(':').unwrap_or(info)));
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let info = pending.take().unwrap_or_default();
        let name = info
            .name
            .unwrap_or_else(|| Channel::default_name(channels.len()));

        channels.push(Channel {
            name,
            url: line.to_string(),
            attributes: info.attributes,
        });
    }

    channels
}

/// Parse the part of an `#EXTINF` line after the colon
fn parse_extinf(info: &str) -> EntryInfo {
    let (head, name) = match info.rfind(',') {
        Some(pos) => (&info[..pos], Some(info[pos + 1..].trim())),
        None => (info, None),
    };

    EntryInfo {
        name: name.filter(|n| !n.is_empty()).map(str::to_string),
        attributes: parse_attributes(head),
    }
}

/// Collect known `key="value"` pairs following the duration token
fn parse_attributes(head: &str) -> ChannelAttributes {
    let mut attributes = ChannelAttributes::default();

    // Skip the duration
    let mut rest = head
        .trim_start()
        .find(|c: char| c.is_whitespace())
        .map(|pos| &head.trim_start()[pos..])
        .unwrap_or("");

    while !rest.trim().is_empty() {
        match attribute(rest) {
            Ok((remaining, (key, value))) => {
                match key.to_ascii_lowercase().as_str() {
                    "tvg-id" => attributes.tvg_id = Some(value.to_string()),
                    "tvg-logo" => attributes.logo = Some(value.to_string()),
                    "group-title" => attributes.group = Some(value.to_string()),
                    _ => {}
                }
                rest = remaining;
            }
            Err(_) => {
                // Not an attribute; drop one token and keep going
                let trimmed = rest.trim_start();
                rest = trimmed
                    .find(|c: char| c.is_whitespace())
                    .map(|pos| &trimmed[pos..])
                    .unwrap_or("");
            }
        }
    }

    attributes
}

fn attribute_key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_').parse(input)
}

fn attribute_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
        take_while1(|c: char| !c.is_whitespace()),
    ))
    .parse(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        multispace0,
        separated_pair(attribute_key, char('='), attribute_value),
    )
    .parse(input)
}

/// Fetches playlists over HTTP or from disk
pub struct PlaylistLoader {
    client: Client,
}

impl PlaylistLoader {
    /// Create a loader; `timeout` of `None` waits indefinitely
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Load a playlist from an `http(s)://` URL, a `file://` URL or a local path
    #[instrument(skip(self))]
    pub async fn load(&self, source: &str) -> Result<Playlist> {
        let (content, base) = match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                let content = self.fetch(&url).await?;
                (content, Some(url))
            }
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::PlaylistFetch(format!("invalid file URL: {}", url)))?;
                (read_file(&path).await?, Some(url))
            }
            _ => {
                let path = Path::new(source);
                let content = read_file(path).await?;
                (content, file_base(path).await)
            }
        };

        let mut channels = parse_playlist(&content);
        if channels.is_empty() {
            return Err(Error::EmptyPlaylist);
        }
        if let Some(base) = &base {
            resolve_channel_urls(&mut channels, base);
        }

        info!(source = %source, channels = channels.len(), "Playlist loaded");

        Ok(Playlist {
            source: source.to_string(),
            channels,
        })
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::PlaylistFetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::PlaylistFetch(format!("{}: HTTP {}", url, status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::PlaylistFetch(format!("{}: {}", url, e)))?;

        debug!(url = %url, bytes = body.len(), "Playlist fetched");

        String::from_utf8(body.to_vec())
            .map_err(|e| Error::PlaylistParse(format!("{} is not UTF-8: {}", url, e)))
    }
}

/// Rewrite relative stream locations as absolute URLs against `base`
///
/// Entries that already parse as URLs, or that cannot be joined, are left as written.
pub fn resolve_channel_urls(channels: &mut [Channel], base: &Url) {
    for channel in channels {
        if let Err(url::ParseError::RelativeUrlWithoutBase) = Url::parse(&channel.url) {
            match base.join(&channel.url) {
                Ok(resolved) => {
                    debug!(entry = %channel.url, resolved = %resolved, "Resolved relative stream URL");
                    channel.url = resolved.into();
                }
                Err(e) => debug!(entry = %channel.url, error = %e, "Stream URL left unresolved"),
            }
        }
    }
}

/// `file://` URL of a local playlist, used to resolve its relative entries
async fn file_base(path: &Path) -> Option<Url> {
    let absolute = tokio::fs::canonicalize(path).await.ok()?;
    Url::from_file_path(absolute).ok()
}

async fn read_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    String::from_utf8(bytes)
        .map_err(|e| Error::PlaylistParse(format!("{} is not UTF-8: {}", path.display(), e)))
}
