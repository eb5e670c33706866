//! TMDB (The Movie Database) catalog client.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs

use cinetrack_core::MediaKind;
use tracing::{debug, warn};

use crate::provider::CatalogSource;
use crate::{CatalogError, DiscoverParams, GenreEntry, KindedRecord, RawRecord};

const BASE_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub api_key: String,
    pub base_url: String,
    pub include_adult: bool,
}

impl TmdbConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            include_adult: false,
        }
    }
}

pub struct TmdbClient {
    config: TmdbConfig,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(config: TmdbConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, CatalogError> {
        let mut all_params = vec![("api_key", self.config.api_key.as_str())];
        all_params.extend_from_slice(params);

        let url = format!("{}{path}", self.config.base_url);
        debug!(url = %url, "TMDB request");

        let resp = self
            .client
            .get(&url)
            .query(&all_params)
            .send()
            .await
            .map_err(|e| CatalogError::UpstreamUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CatalogError::UpstreamUnavailable(format!(
                "TMDB returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| CatalogError::UpstreamUnavailable(format!("parse JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl CatalogSource for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn fetch_popular_page(
        &self,
        kind: MediaKind,
        page: u32,
    ) -> Result<Vec<RawRecord>, CatalogError> {
        let page = page.to_string();
        let data = self
            .get_json(
                &format!("/{}/popular", kind.upstream_segment()),
                &[("page", page.as_str())],
            )
            .await?;
        Ok(parse_results(&data))
    }

    async fn fetch_genre_list(&self, kind: MediaKind) -> Result<Vec<GenreEntry>, CatalogError> {
        let data = self
            .get_json(&format!("/genre/{}/list", kind.upstream_segment()), &[])
            .await?;
        Ok(parse_genre_list(&data))
    }

    async fn fetch_discover(
        &self,
        kind: MediaKind,
        params: &DiscoverParams,
    ) -> Result<Vec<RawRecord>, CatalogError> {
        let page = params.page.to_string();
        // Pipe-separated ids are OR-ed by TMDB, commas would AND them.
        let genres = params
            .genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("|");
        let year_param = match kind {
            MediaKind::Movie => "primary_release_year",
            MediaKind::Series => "first_air_date_year",
        };

        let mut query = vec![("sort_by", "popularity.desc"), ("page", page.as_str())];
        if let Some(ref year) = params.year {
            query.push((year_param, year.as_str()));
        }
        if !genres.is_empty() {
            query.push(("with_genres", genres.as_str()));
        }

        let data = self
            .get_json(&format!("/discover/{}", kind.upstream_segment()), &query)
            .await?;
        Ok(parse_results(&data))
    }

    async fn fetch_multi_search(&self, term: &str) -> Result<Vec<KindedRecord>, CatalogError> {
        let include_adult = if self.config.include_adult {
            "true"
        } else {
            "false"
        };
        let data = self
            .get_json(
                "/search/multi",
                &[
                    ("query", term),
                    ("include_adult", include_adult),
                    ("page", "1"),
                ],
            )
            .await?;
        Ok(parse_multi_results(&data))
    }
}

/// Entries that fail to deserialize are kept as id-less records so a
/// non-empty upstream page never reads as an empty one.
fn parse_results(data: &serde_json::Value) -> Vec<RawRecord> {
    data["results"]
        .as_array()
        .map(|results| results.iter().map(parse_record).collect())
        .unwrap_or_default()
}

fn parse_record(value: &serde_json::Value) -> RawRecord {
    serde_json::from_value(value.clone()).unwrap_or_else(|e| {
        warn!(error = %e, "malformed upstream record");
        RawRecord {
            media_type: value["media_type"].as_str().map(str::to_string),
            ..Default::default()
        }
    })
}

fn parse_multi_results(data: &serde_json::Value) -> Vec<KindedRecord> {
    parse_results(data)
        .into_iter()
        .filter_map(|record| {
            let kind = record.media_type.as_deref().and_then(MediaKind::parse)?;
            Some(KindedRecord::new(kind, record))
        })
        .collect()
}

fn parse_genre_list(data: &serde_json::Value) -> Vec<GenreEntry> {
    data["genres"]
        .as_array()
        .map(|gs| {
            gs.iter()
                .filter_map(|g| {
                    Some(GenreEntry {
                        id: g["id"].as_u64()? as u32,
                        name: g["name"].as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
