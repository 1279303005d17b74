//! Last.fm metadata lookups
//!
//! Only two API methods are used: `track.getInfo` to resolve a title/artist
//! pair and `album.search` to find album candidates. A "not found" answer is
//! a normal `Ok(None)` / empty result; only transport and service failures
//! surface as [`LookupError`].

use crate::cover_art::{self, CoverImage};
use crate::normalize::normalize_tag;
use indexmap::IndexSet;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm error code for an unknown track or album
const ERROR_NOT_FOUND: u32 = 6;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("metadata service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("metadata service error {code}: {message}")]
    Service { code: u32, message: String },
    #[error("metadata service returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response from metadata service: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A resolved track as reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub name: String,
    pub artist: String,
    pub play_count: u64,
    pub tags: IndexSet<String>,
    pub album: Option<AlbumInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumInfo {
    pub title: String,
    pub artist: String,
    /// Largest cover image; empty when the service has no art
    pub cover_url: String,
}

/// One album search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumCandidate {
    pub name: String,
    pub artist: String,
    pub cover_url: String,
}

/// The remote lookups the wizard needs
#[allow(async_fn_in_trait)]
pub trait MetadataLookup {
    async fn lookup_track(&self, title: &str, artist: &str) -> Result<Option<TrackInfo>, LookupError>;

    async fn search_album(&self, query: &str) -> Result<Vec<AlbumCandidate>, LookupError>;

    /// Malformed or empty URLs, failed downloads and non-image bodies are all `None`
    async fn fetch_image(&self, url: &str) -> Option<CoverImage>;
}

pub struct LastFmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl LastFmClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("track-tagger/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('?').to_string(),
        })
    }

    async fn get_body(&self, url: &str) -> Result<(reqwest::StatusCode, String), LookupError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

impl MetadataLookup for LastFmClient {
    async fn lookup_track(&self, title: &str, artist: &str) -> Result<Option<TrackInfo>, LookupError> {
        log::info!("looking up '{}' by '{}'", title, artist);

        let url = format!(
            "{}?method=track.getInfo&api_key={}&artist={}&track={}&autocorrect=1&format=json",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );

        let (status, body) = self.get_body(&url).await?;
        check_status(status, &body)?;

        let info = parse_track_response(&body)?;
        if let Some(info) = &info {
            log::debug!("found '{}' by '{}' ({} plays)", info.name, info.artist, info.play_count);
        }
        Ok(info)
    }

    async fn search_album(&self, query: &str) -> Result<Vec<AlbumCandidate>, LookupError> {
        log::info!("searching albums for '{}'", query);

        let url = format!(
            "{}?method=album.search&api_key={}&album={}&format=json",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query)
        );

        let (status, body) = self.get_body(&url).await?;
        check_status(status, &body)?;
        parse_album_search_response(&body)
    }

    async fn fetch_image(&self, url: &str) -> Option<CoverImage> {
        cover_art::download_cover(&self.client, url).await
    }
}

// Last.fm collapses single-element lists into a bare object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(u64),
    Text(String),
}

impl Count {
    fn value(&self) -> u64 {
        match self {
            Count::Number(n) => *n,
            Count::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorFields {
    #[serde(default)]
    error: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackInfoResponse {
    #[serde(flatten)]
    error: ErrorFields,
    track: Option<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    name: String,
    artist: RawArtist,
    #[serde(default)]
    playcount: Option<Count>,
    #[serde(default)]
    toptags: Option<RawTopTags>,
    #[serde(default)]
    album: Option<RawAlbum>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawTopTags {
    #[serde(default)]
    tag: OneOrMany<RawTag>,
}

#[derive(Debug, Deserialize)]
struct RawTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawAlbum {
    title: String,
    artist: String,
    #[serde(default)]
    image: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    #[serde(rename = "#text", default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct AlbumSearchResponse {
    #[serde(flatten)]
    error: ErrorFields,
    results: Option<AlbumResults>,
}

#[derive(Debug, Deserialize)]
struct AlbumResults {
    #[serde(default)]
    albummatches: Option<AlbumMatches>,
}

#[derive(Debug, Deserialize)]
struct AlbumMatches {
    #[serde(default)]
    album: OneOrMany<RawAlbumMatch>,
}

#[derive(Debug, Deserialize)]
struct RawAlbumMatch {
    name: String,
    artist: String,
    #[serde(default)]
    image: Vec<RawImage>,
}

/// The last image entry is the largest
fn largest_image(images: &[RawImage]) -> String {
    images
        .last()
        .map(|img| img.url.trim().to_string())
        .unwrap_or_default()
}

fn check_error(fields: &ErrorFields) -> Result<bool, LookupError> {
    match fields.error {
        None => Ok(false),
        Some(ERROR_NOT_FOUND) => Ok(true),
        Some(code) => Err(LookupError::Service {
            code,
            message: fields.message.clone().unwrap_or_default(),
        }),
    }
}

/// A failed HTTP status is only trusted to the body when the body is a
/// Last.fm error object
fn check_status(status: reqwest::StatusCode, body: &str) -> Result<(), LookupError> {
    if status.is_success() {
        return Ok(());
    }
    match serde_json::from_str::<ErrorFields>(body) {
        Ok(fields) if fields.error.is_some() => Ok(()),
        _ => Err(LookupError::Status(status)),
    }
}

fn parse_track_response(body: &str) -> Result<Option<TrackInfo>, LookupError> {
    let response: TrackInfoResponse = serde_json::from_str(body)?;

    if check_error(&response.error)? {
        return Ok(None);
    }

    let track = match response.track {
        Some(track) => track,
        None => return Ok(None),
    };

    let tags: IndexSet<String> = track
        .toptags
        .map(|t| t.tag.into_vec())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|t| normalize_tag(&t.name))
        .collect();

    // Not every track has an album
    let album = track.album.map(|album| AlbumInfo {
        cover_url: largest_image(&album.image),
        title: album.title,
        artist: album.artist,
    });

    Ok(Some(TrackInfo {
        name: track.name,
        artist: track.artist.name,
        play_count: track.playcount.map(|c| c.value()).unwrap_or(0),
        tags,
        album,
    }))
}

fn parse_album_search_response(body: &str) -> Result<Vec<AlbumCandidate>, LookupError> {
    let response: AlbumSearchResponse = serde_json::from_str(body)?;

    if check_error(&response.error)? {
        return Ok(Vec::new());
    }

    let matches = response
        .results
        .and_then(|r| r.albummatches)
        .map(|m| m.album.into_vec())
        .unwrap_or_default();

    Ok(matches
        .into_iter()
        .map(|m| AlbumCandidate {
            cover_url: largest_image(&m.image),
            name: m.name,
            artist: m.artist,
        })
        .collect())
}
