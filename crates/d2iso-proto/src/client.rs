//! HTTP client for the appliance backend.
//!
//! One method per endpoint, all JSON.  Transport and decode failures come
//! back as `anyhow` errors with context; application-level failures
//! (`success: false`) are left in the response body for the caller — the
//! UI turns both into inline messages.

use anyhow::{Context, Result};

use crate::archive::ArchiveResponse;
use crate::metadata::{
    ApplyResponse, MusicBrainzApplyRequest, MusicBrainzSearchRequest, MusicBrainzSearchResponse,
    TmdbApplyRequest, TmdbSearchRequest, TmdbSearchResponse, VideoKind,
};
use crate::status::StatusResponse;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /api/status` — the 5 s poll target.
    pub async fn get_status(&self) -> Result<StatusResponse> {
        let response = self
            .http
            .get(self.url("/api/status"))
            .send()
            .await
            .context("Failed to fetch /api/status")?;
        if !response.status().is_success() {
            anyhow::bail!("status endpoint returned {}", response.status());
        }
        response
            .json()
            .await
            .context("Failed to parse /api/status response")
    }

    /// `GET /api/archive` — full grouped listing.
    pub async fn get_archive(&self) -> Result<ArchiveResponse> {
        let response = self
            .http
            .get(self.url("/api/archive"))
            .send()
            .await
            .context("Failed to fetch /api/archive")?;
        if !response.status().is_success() {
            anyhow::bail!("archive endpoint returned {}", response.status());
        }
        response
            .json()
            .await
            .context("Failed to parse /api/archive response")
    }

    pub async fn musicbrainz_search(
        &self,
        artist: &str,
        album: &str,
        iso_path: &str,
    ) -> Result<MusicBrainzSearchResponse> {
        let body = MusicBrainzSearchRequest {
            artist: artist.to_string(),
            album: album.to_string(),
            iso_path: iso_path.to_string(),
        };
        let response = self
            .http
            .post(self.url("/api/metadata/musicbrainz/search"))
            .json(&body)
            .send()
            .await
            .context("Failed to search MusicBrainz")?;
        response
            .json()
            .await
            .context("Failed to parse MusicBrainz search response")
    }

    pub async fn musicbrainz_apply(
        &self,
        iso_path: &str,
        release_id: &str,
    ) -> Result<ApplyResponse> {
        let body = MusicBrainzApplyRequest {
            iso_path: iso_path.to_string(),
            release_id: release_id.to_string(),
        };
        let response = self
            .http
            .post(self.url("/api/metadata/musicbrainz/apply"))
            .json(&body)
            .send()
            .await
            .context("Failed to apply MusicBrainz metadata")?;
        response
            .json()
            .await
            .context("Failed to parse MusicBrainz apply response")
    }

    /// Automatic video search: the backend derives the query from the raw
    /// ISO filename and may answer from its query cache.
    pub async fn tmdb_search_by_filename(&self, iso_filename: &str) -> Result<TmdbSearchResponse> {
        self.tmdb_search(&TmdbSearchRequest::ByFilename {
            iso_filename: iso_filename.to_string(),
        })
        .await
    }

    /// Manual re-search with an explicit title and movie/tv selection.
    pub async fn tmdb_search_by_title(
        &self,
        title: &str,
        kind: VideoKind,
    ) -> Result<TmdbSearchResponse> {
        self.tmdb_search(&TmdbSearchRequest::ByTitle {
            title: title.to_string(),
            kind,
        })
        .await
    }

    async fn tmdb_search(&self, body: &TmdbSearchRequest) -> Result<TmdbSearchResponse> {
        let response = self
            .http
            .post(self.url("/api/metadata/tmdb/search"))
            .json(body)
            .send()
            .await
            .context("Failed to search TMDB")?;
        response
            .json()
            .await
            .context("Failed to parse TMDB search response")
    }

    pub async fn tmdb_apply(
        &self,
        iso_path: &str,
        tmdb_id: u64,
        title: &str,
        kind: VideoKind,
    ) -> Result<ApplyResponse> {
        let body = TmdbApplyRequest {
            iso_path: iso_path.to_string(),
            tmdb_id,
            title: title.to_string(),
            kind,
            rename_iso: false,
        };
        let response = self
            .http
            .post(self.url("/api/metadata/tmdb/apply"))
            .json(&body)
            .send()
            .await
            .context("Failed to apply TMDB metadata")?;
        response
            .json()
            .await
            .context("Failed to parse TMDB apply response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_normalized() {
        let client = ApiClient::new("http://127.0.0.1:5000/");
        assert_eq!(client.url("/api/status"), "http://127.0.0.1:5000/api/status");
    }
}
