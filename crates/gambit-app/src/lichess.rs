// Lichess ranking client.
//
// Fetches the classical leaderboard and maps each entry onto a catalog
// player, valued by leaderboard position.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use gambit_core::catalog::{CatalogSource, FetchError};
use gambit_core::player::{Player, PlayerId};
use gambit_core::pricing::value_for_rank;

/// Rating assumed when an account has no classical rating.
pub const DEFAULT_RATING: u32 = 2500;

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LeaderboardResponse {
    pub users: Vec<LeaderboardUser>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub perfs: Perfs,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Perfs {
    pub classical: Option<PerfRating>,
}

#[derive(Debug, Deserialize)]
pub struct PerfRating {
    pub rating: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
}

impl LeaderboardUser {
    fn display_name(&self) -> String {
        let profile = self.profile.as_ref();
        let first = profile.and_then(|p| p.first_name.as_deref()).map(str::trim);
        let last = profile.and_then(|p| p.last_name.as_deref()).map(str::trim);
        match (first, last) {
            (Some(f), Some(l)) if !f.is_empty() && !l.is_empty() => format!("{f} {l}"),
            _ => self.username.clone(),
        }
    }
}

/// Convert a leaderboard into catalog players. Position in the response is
/// the rank used for valuation.
pub fn players_from_response(response: LeaderboardResponse) -> Vec<Player> {
    response
        .users
        .into_iter()
        .enumerate()
        .map(|(i, user)| {
            let rating = user
                .perfs
                .classical
                .as_ref()
                .map_or(DEFAULT_RATING, |p| p.rating);
            let country = user
                .profile
                .as_ref()
                .and_then(|p| p.country.clone())
                .unwrap_or_default();
            Player {
                name: user.display_name(),
                id: PlayerId::new(user.id),
                rating,
                country,
                image_url: None,
                value: value_for_rank(i + 1),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct LichessSource {
    http: reqwest::Client,
    api_base: String,
}

impl LichessSource {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn leaderboard_url(&self, count: usize) -> String {
        format!("{}/player/top/{}/classical", self.api_base, count)
    }
}

#[async_trait]
impl CatalogSource for LichessSource {
    fn name(&self) -> &str {
        "lichess"
    }

    async fn fetch_top(&self, count: usize) -> Result<Vec<Player>, FetchError> {
        let url = self.leaderboard_url(count);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("accept", "application/vnd.lichess.v3+json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Leaderboard request returned {}", status);
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: LeaderboardResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(players_from_response(body))
    }
}
