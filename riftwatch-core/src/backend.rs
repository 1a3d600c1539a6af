//! HTTP client for the companion backend
//!
//! The backend owns the game-client connection; we only ask it for match
//! history (`GET /get_history`) and, once at startup, to detect the client
//! (`POST /autodetect`).

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::lookup::HistorySource;
use crate::stats::parse_kda;
use crate::types::{MatchRecord, PlayerIdentity};

/// Response from GET /get_history
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(default)]
    pub games: Option<Vec<HistoryGame>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One entry of a history response, as the backend serializes it.
#[derive(Debug, Deserialize)]
pub struct HistoryGame {
    #[serde(default)]
    pub champion_en: Option<String>,
    #[serde(default, rename = "championId")]
    pub champion_id: Option<serde_json::Value>,
    /// `"k/d/a"`
    #[serde(default)]
    pub kda: Option<String>,
    #[serde(default, rename = "kdaTriple")]
    pub kda_triple: Option<String>,
    pub win: bool,
    /// Display name of the mode
    #[serde(default)]
    pub mode: Option<String>,
    /// Raw queue mode, e.g. `ARAM`
    #[serde(default, rename = "gameMode")]
    pub game_mode: Option<String>,
    /// Creation time in epoch milliseconds
    #[serde(default)]
    pub game_creation: Option<i64>,
}

impl HistoryGame {
    /// Convert to a [`MatchRecord`], tolerating missing fields.
    pub fn into_record(self) -> MatchRecord {
        let champion_id = self
            .champion_en
            .or_else(|| match self.champion_id {
                Some(serde_json::Value::String(s)) => Some(s),
                Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "Unknown".to_string());

        let (kills, deaths, assists) =
            parse_kda(self.kda.or(self.kda_triple).as_deref().unwrap_or(""));

        let mode = self
            .mode
            .filter(|m| !m.is_empty())
            .or(self.game_mode)
            .unwrap_or_else(|| "UNKNOWN".to_string());

        MatchRecord {
            champion_id,
            kills,
            deaths,
            assists,
            win: self.win,
            mode,
            played_at: self
                .game_creation
                .filter(|ms| *ms > 0)
                .and_then(DateTime::<Utc>::from_timestamp_millis),
        }
    }
}

impl HistoryResponse {
    /// Matches on success, the server's message as an error otherwise.
    pub fn into_matches(self) -> Result<Vec<MatchRecord>> {
        if !self.success {
            return Err(Error::Backend(
                self.message.unwrap_or_else(|| "lookup failed".to_string()),
            ));
        }
        Ok(self
            .games
            .unwrap_or_default()
            .into_iter()
            .map(HistoryGame::into_record)
            .collect())
    }
}

/// Response from POST /autodetect
#[derive(Debug, Deserialize)]
pub struct AutodetectResponse {
    pub success: bool,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP client for the companion backend
pub struct BackendClient {
    config: BackendConfig,
    http_client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client from configuration
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config.base_url.trim().trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            base_url,
        })
    }

    /// URL of the history endpoint for `identity`.
    pub fn history_url(&self, identity: &PlayerIdentity) -> String {
        format!(
            "{}/get_history?name={}&count={}",
            self.base_url,
            urlencoding::encode(&identity.riot_id()),
            self.config.effective_history_count()
        )
    }

    /// Fetch a player's recent matches, most recent first.
    pub async fn get_history(&self, identity: &PlayerIdentity) -> Result<Vec<MatchRecord>> {
        let url = self.history_url(identity);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let result: HistoryResponse = response
                .json()
                .await
                .map_err(|e| Error::Backend(format!("failed to parse response: {}", e)))?;
            result.into_matches()
        } else {
            Err(Error::Backend(format!("API error ({})", status)))
        }
    }

    /// Fetch history, retrying transient failures with exponential backoff.
    pub async fn get_history_with_retry(
        &self,
        identity: &PlayerIdentity,
    ) -> Result<Vec<MatchRecord>> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(250);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    player = %identity,
                    "Retrying get_history (attempt {}/{}), waiting {:?}",
                    attempt + 1,
                    self.config.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(5));
            }

            match self.get_history(identity).await {
                Ok(matches) => return Ok(matches),
                Err(e) if is_retryable_error(&e) => {
                    tracing::warn!(player = %identity, "Transient error fetching history: {}", e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Backend("max retries exceeded".to_string())))
    }

    /// Ask the backend to detect the game client.
    pub async fn autodetect(&self) -> Result<AutodetectResponse> {
        let url = format!("{}/autodetect", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Backend(format!("failed to parse response: {}", e)))
        } else {
            Err(Error::Backend(format!("API error ({})", status)))
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl HistorySource for BackendClient {
    async fn fetch_history(&self, identity: &PlayerIdentity) -> Result<Vec<MatchRecord>> {
        self.get_history_with_retry(identity).await
    }
}

/// Check if an error is retryable (transient)
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Backend(msg) => {
            // 5xx responses
            msg.starts_with("API error (5")
                // network/timeout errors
                || msg.starts_with("HTTP request failed")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = BackendConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(BackendClient::new(config).is_err());
    }

    #[test]
    fn test_history_url_encodes_riot_id() {
        let client = BackendClient::new(BackendConfig {
            base_url: "http://127.0.0.1:5000/".to_string(),
            ..Default::default()
        })
        .unwrap();
        let url = client.history_url(&PlayerIdentity::new("Hide on bush", "KR1"));
        assert_eq!(
            url,
            "http://127.0.0.1:5000/get_history?name=Hide%20on%20bush%23KR1&count=20"
        );
    }

    #[test]
    fn test_parse_history_response() {
        let body = json!({
            "success": true,
            "games": [
                {"champion_en": "Ahri", "kda": "10/2/7", "win": true,
                 "gameMode": "ARAM", "mode": "极地大乱斗", "game_creation": 1700000000000i64},
                {"championId": "Zed", "kdaTriple": "3/x/1", "win": false, "gameMode": "CLASSIC"},
                {"win": false}
            ]
        });
        let response: HistoryResponse = serde_json::from_value(body).unwrap();
        let matches = response.into_matches().unwrap();
        assert_eq!(matches.len(), 3);

        assert_eq!(matches[0].champion_id, "Ahri");
        assert_eq!((matches[0].kills, matches[0].deaths, matches[0].assists), (10, 2, 7));
        assert_eq!(matches[0].mode, "极地大乱斗");
        assert!(matches[0].played_at.is_some());

        assert_eq!(matches[1].champion_id, "Zed");
        assert_eq!(matches[1].kda_text(), "3/0/1");
        assert_eq!(matches[1].mode, "CLASSIC");

        assert_eq!(matches[2].champion_id, "Unknown");
        assert_eq!(matches[2].mode, "UNKNOWN");
        assert_eq!(matches[2].kda_text(), "0/0/0");
    }

    #[test]
    fn test_unsuccessful_response_is_error() {
        let response: HistoryResponse =
            serde_json::from_value(json!({"success": false, "message": "未连接到客户端"})).unwrap();
        let err = response.into_matches().unwrap_err();
        assert_eq!(err.to_string(), "backend error: 未连接到客户端");

        let response: HistoryResponse =
            serde_json::from_value(json!({"success": false})).unwrap();
        assert_eq!(
            response.into_matches().unwrap_err().to_string(),
            "backend error: lookup failed"
        );
    }

    #[test]
    fn test_success_without_games_is_empty() {
        let response: HistoryResponse = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(response.into_matches().unwrap().is_empty());
    }

    #[test]
    fn test_parse_autodetect_response() {
        let r: AutodetectResponse =
            serde_json::from_value(json!({"success": true, "port": 54321})).unwrap();
        assert!(r.success);
        assert_eq!(r.port, Some(54321));
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&Error::Backend(
            "API error (502 Bad Gateway)".to_string()
        )));
        assert!(is_retryable_error(&Error::Backend(
            "HTTP request failed: timeout".to_string()
        )));
        assert!(!is_retryable_error(&Error::Backend(
            "API error (404 Not Found)".to_string()
        )));
        assert!(!is_retryable_error(&Error::Backend("未连接到客户端".to_string())));
    }
}
