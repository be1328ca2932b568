//! Last.fm web-service client (`ScrobbleSource`).
//!
//! Uses the public read-only methods `user.getTopTracks` and
//! `user.getRecentTracks`, which need only an API key and a username.

use super::{Period, ScrobbleSource};
use crate::error::SourceError;
use crate::model::{ScrobbleRecord, TopTrackRecord};
use log::{debug, trace};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "last.fm";
pub const DEFAULT_ENDPOINT: &str = "https://ws.audioscrobbler.com/2.0/";
/// Largest page the recent-tracks method accepts.
const RECENT_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone)]
pub struct LastFmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    username: String,
}

impl LastFmClient {
    pub fn new(api_key: &str, username: &str) -> Result<Self, SourceError> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key, username)
    }

    pub fn with_endpoint(endpoint: &str, api_key: &str, username: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("replaymix/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::unavailable(SERVICE, e))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            username: username.to_string(),
        })
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, String)]) -> Result<T, SourceError> {
        debug!("Last.fm request: {method} {params:?}");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("method", method),
                ("user", self.username.as_str()),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
            ])
            .query(params)
            .send()
            .map_err(|e| SourceError::unavailable(SERVICE, e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SourceError::unavailable(SERVICE, e))?;
        trace!("Last.fm response ({status}): {body}");

        parse_body(&body, status.is_success())
    }
}

fn parse_body<T: DeserializeOwned>(body: &str, success: bool) -> Result<T, SourceError> {
    // Errors come back as `{"error": N, "message": "..."}`, sometimes with HTTP 200.
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return Err(SourceError::Api {
            service: SERVICE,
            code: envelope.error,
            message: envelope.message,
        });
    }
    if !success {
        return Err(SourceError::unavailable(SERVICE, format!("HTTP error: {body}")));
    }
    serde_json::from_str(body).map_err(|e| SourceError::malformed(SERVICE, e))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: i64,
    #[serde(default)]
    message: String,
}

/// A list that collapses to a bare object when it holds one element.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

/// Numbers arrive as strings (`"playcount": "12"`).
fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, SourceError> {
    value
        .trim()
        .parse()
        .map_err(|_| SourceError::malformed(SERVICE, format!("invalid {field} `{value}`")))
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    toptracks: TopTracksBody,
}

#[derive(Debug, Deserialize)]
struct TopTracksBody {
    #[serde(default)]
    track: OneOrMany<TopTrackEntry>,
}

#[derive(Debug, Deserialize)]
struct TopTrackEntry {
    name: String,
    playcount: String,
    artist: NamedArtist,
}

#[derive(Debug, Deserialize)]
struct NamedArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracksBody,
}

#[derive(Debug, Deserialize)]
struct RecentTracksBody {
    #[serde(default)]
    track: OneOrMany<RecentTrackEntry>,
    #[serde(rename = "@attr")]
    attr: PageAttr,
}

#[derive(Debug, Deserialize)]
struct PageAttr {
    page: String,
    #[serde(rename = "totalPages")]
    total_pages: String,
}

#[derive(Debug, Deserialize)]
struct RecentTrackEntry {
    name: String,
    artist: TextArtist,
    /// Absent for the track that is playing right now.
    #[serde(default)]
    date: Option<ScrobbleDate>,
}

#[derive(Debug, Deserialize)]
struct TextArtist {
    #[serde(rename = "#text")]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ScrobbleDate {
    uts: String,
}

fn top_tracks_from(response: TopTracksResponse) -> Result<Vec<TopTrackRecord>, SourceError> {
    response
        .toptracks
        .track
        .into_vec()
        .into_iter()
        .map(|entry| {
            Ok(TopTrackRecord {
                play_count: parse_number("playcount", &entry.playcount)?,
                title: entry.name,
                artist: entry.artist.name,
            })
        })
        .collect()
}

/// Scrobbles of one page plus `(page, total_pages)`.
fn recent_page_from(response: RecentTracksResponse) -> Result<(Vec<ScrobbleRecord>, u32, u32), SourceError> {
    let body = response.recenttracks;
    let page = parse_number("page", &body.attr.page)?;
    let total_pages = parse_number("totalPages", &body.attr.total_pages)?;

    let mut scrobbles = Vec::new();
    for entry in body.track.into_vec() {
        let date = match entry.date {
            Some(date) => date,
            None => {
                trace!("Skipping now-playing entry \"{}\"", entry.name);
                continue;
            }
        };
        scrobbles.push(ScrobbleRecord {
            timestamp: parse_number("uts", &date.uts)?,
            title: entry.name,
            artist: entry.artist.text,
        });
    }
    Ok((scrobbles, page, total_pages))
}

impl ScrobbleSource for LastFmClient {
    fn top_tracks(&self, period: Period, limit: usize) -> Result<Vec<TopTrackRecord>, SourceError> {
        let response: TopTracksResponse = self.call(
            "user.gettoptracks",
            &[("period", period.to_string()), ("limit", limit.to_string())],
        )?;
        let mut tracks = top_tracks_from(response)?;
        tracks.truncate(limit);
        Ok(tracks)
    }

    fn recent_tracks(&self, since: i64, limit: Option<usize>) -> Result<Vec<ScrobbleRecord>, SourceError> {
        walk_recent_pages(limit, |page, page_size| {
            self.call(
                "user.getrecenttracks",
                &[
                    ("from", since.to_string()),
                    ("limit", page_size.to_string()),
                    ("page", page.to_string()),
                ],
            )
        })
    }
}

/// Request pages from 1 until `totalPages` (or until `limit` scrobbles are
/// collected), concatenating them in the order the service returns them.
fn walk_recent_pages<F>(limit: Option<usize>, mut fetch: F) -> Result<Vec<ScrobbleRecord>, SourceError>
where
    F: FnMut(u32, usize) -> Result<RecentTracksResponse, SourceError>,
{
    let page_size = limit.map_or(RECENT_PAGE_SIZE, |l| l.clamp(1, RECENT_PAGE_SIZE));
    let mut scrobbles = Vec::new();
    let mut page = 1u32;

    loop {
        let (batch, current, total_pages) = recent_page_from(fetch(page, page_size)?)?;
        debug!("Recent tracks page {current}/{total_pages}: {} scrobbles", batch.len());
        scrobbles.extend(batch);

        if let Some(limit) = limit {
            if scrobbles.len() >= limit {
                scrobbles.truncate(limit);
                break;
            }
        }
        if current >= total_pages {
            break;
        }
        page = current + 1;
    }

    Ok(scrobbles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_top_tracks() {
        let body = r#"{"toptracks": {"track": [
            {"name": "Song", "playcount": "42", "artist": {"name": "X", "mbid": ""}, "@attr": {"rank": "1"}},
            {"name": "Other", "playcount": "7", "artist": {"name": "Y"}}
        ], "@attr": {"user": "me", "page": "1", "totalPages": "1"}}}"#;

        let response: TopTracksResponse = parse_body(body, true).unwrap();
        let tracks = top_tracks_from(response).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(
            tracks[0],
            TopTrackRecord {
                title: "Song".to_string(),
                artist: "X".to_string(),
                play_count: 42
            }
        );
    }

    #[test]
    fn test_single_track_object_is_accepted() {
        let body = r#"{"toptracks": {"track": {"name": "Only", "playcount": "1", "artist": {"name": "X"}}}}"#;
        let response: TopTracksResponse = parse_body(body, true).unwrap();
        assert_eq!(top_tracks_from(response).unwrap().len(), 1);
    }

    #[test]
    fn test_recent_tracks_skip_now_playing() {
        let body = r##"{"recenttracks": {"track": [
            {"name": "Live", "artist": {"#text": "X"}, "@attr": {"nowplaying": "true"}},
            {"name": "Song", "artist": {"#text": "X"}, "date": {"uts": "1700000000", "#text": "14 Nov 2023"}}
        ], "@attr": {"page": "1", "totalPages": "3", "total": "450"}}}"##;

        let response: RecentTracksResponse = parse_body(body, true).unwrap();
        let (scrobbles, page, total) = recent_page_from(response).unwrap();
        assert_eq!((page, total), (1, 3));
        assert_eq!(
            scrobbles,
            vec![ScrobbleRecord {
                title: "Song".to_string(),
                artist: "X".to_string(),
                timestamp: 1_700_000_000
            }]
        );
    }

    #[test]
    fn test_error_envelope_becomes_api_error() {
        let body = r#"{"error": 6, "message": "User not found"}"#;
        let err = parse_body::<TopTracksResponse>(body, false).unwrap_err();
        assert!(matches!(err, SourceError::Api { code: 6, .. }));
    }

    #[test]
    fn test_bad_number_is_malformed() {
        let body = r#"{"toptracks": {"track": [{"name": "S", "playcount": "many", "artist": {"name": "X"}}]}}"#;
        let response: TopTracksResponse = parse_body(body, true).unwrap();
        assert!(matches!(
            top_tracks_from(response),
            Err(SourceError::Malformed { .. })
        ));
    }

    fn recent_page(page: u32, total: u32, titles: &[&str]) -> RecentTracksResponse {
        let tracks: Vec<_> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                serde_json::json!({
                    "name": title,
                    "artist": {"#text": "X"},
                    "date": {"uts": (1_700_000_000 - i as i64).to_string()}
                })
            })
            .collect();
        let body = serde_json::json!({
            "recenttracks": {
                "track": tracks,
                "@attr": {"page": page.to_string(), "totalPages": total.to_string()}
            }
        });
        parse_body(&body.to_string(), true).unwrap()
    }

    fn titles(scrobbles: &[ScrobbleRecord]) -> Vec<&str> {
        scrobbles.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn test_walks_every_page_in_service_order() {
        let pages = [vec!["a", "b"], vec!["c", "d"], vec!["e"]];
        let mut requested = Vec::new();

        let scrobbles = walk_recent_pages(None, |page, page_size| {
            requested.push((page, page_size));
            Ok(recent_page(page, 3, &pages[page as usize - 1]))
        })
        .unwrap();

        assert_eq!(titles(&scrobbles), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(requested, vec![(1, 200), (2, 200), (3, 200)]);
    }

    #[test]
    fn test_limit_truncates_across_page_boundary() {
        let pages = [vec!["a", "b"], vec!["c", "d"], vec!["e", "f"]];
        let mut calls = 0;

        let scrobbles = walk_recent_pages(Some(3), |page, _| {
            calls += 1;
            Ok(recent_page(page, 3, &pages[page as usize - 1]))
        })
        .unwrap();

        assert_eq!(titles(&scrobbles), vec!["a", "b", "c"]);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_empty_history_stops_after_first_page() {
        let body = r#"{"recenttracks": {"track": [], "@attr": {"page": "1", "totalPages": "0", "total": "0"}}}"#;
        let mut calls = 0;

        let scrobbles = walk_recent_pages(None, |_, _| {
            calls += 1;
            parse_body(body, true)
        })
        .unwrap();

        assert!(scrobbles.is_empty());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_page_error_stops_the_walk() {
        let result = walk_recent_pages(None, |page, _| {
            if page == 1 {
                Ok(recent_page(1, 2, &["a"]))
            } else {
                Err(SourceError::unavailable(SERVICE, "timeout"))
            }
        });
        assert!(matches!(result, Err(SourceError::Unavailable { .. })));
    }
}
