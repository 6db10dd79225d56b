//! HTTP client for the Amadeus flight offers API
//!
//! Authenticates with the OAuth2 client-credentials grant, caches the access
//! token until shortly before it expires, and runs one-way offer searches.

use crate::offers::{FlightOffer, FlightOfferSource, OfferQuery};
use crate::FlightError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com";

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const OFFERS_PATH: &str = "/v2/shopping/flight-offers";
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Failures reported by the flight offers service
#[derive(Error, Debug)]
pub enum ExternalError {
    /// The service rejected the request itself (4xx), e.g. malformed codes
    #[error("request rejected with status {status}: {message}")]
    ClientError { status: u16, message: String },

    #[error("service failed with status {status}: {message}")]
    ServiceError { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Authentication(String),
}

impl ExternalError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExternalError::ClientError { .. })
    }

    fn from_status(status: StatusCode, message: String) -> Self {
        if status.is_client_error() {
            ExternalError::ClientError {
                status: status.as_u16(),
                message,
            }
        } else {
            ExternalError::ServiceError {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Connection settings for [`AmadeusClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct AmadeusSettings {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<FlightOffer>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    title: Option<String>,
    detail: Option<String>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Flight offer client for the Amadeus self-service API
pub struct AmadeusClient {
    http_client: Client,
    settings: AmadeusSettings,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusClient {
    pub fn new(settings: AmadeusSettings) -> Result<Self, FlightError> {
        debug!(base_url = %settings.base_url, "Creating Amadeus client");
        let http_client = Client::builder()
            .user_agent(concat!("flight-finder/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http_client,
            settings,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Cached bearer token, refreshed when missing or about to expire
    async fn access_token(&self) -> Result<String, FlightError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
            debug!("Access token expired, refreshing");
        }

        let response = self
            .http_client
            .post(self.url(TOKEN_PATH))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Token request failed");
            return Err(ExternalError::Authentication(error_message(status, &body)).into());
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        info!(expires_in = token.expires_in, "Obtained access token");

        *guard = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl FlightOfferSource for AmadeusClient {
    #[instrument(level = "info", skip(self, query), fields(origin = %query.origin, destination = %query.destination))]
    async fn search_offers(&self, query: &OfferQuery) -> Result<Vec<FlightOffer>, FlightError> {
        let token = self.access_token().await?;

        let params = [
            ("originLocationCode", query.origin.to_string()),
            ("destinationLocationCode", query.destination.to_string()),
            ("departureDate", query.departure_date.format("%Y-%m-%d").to_string()),
            ("adults", query.adults.to_string()),
            ("travelClass", query.cabin_class.api_value().to_string()),
            ("max", query.max_results.to_string()),
        ];

        let start_time = Instant::now();
        let response = self
            .http_client
            .get(self.url(OFFERS_PATH))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;
        let status = response.status();

        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Flight offers request completed"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ExternalError::from_status(status, error_message(status, &body));
            if err.is_client_error() {
                warn!(status = %status, error = %err, "Flight offers request rejected");
            } else {
                error!(status = %status, error = %err, "Flight offers request failed");
            }
            return Err(err.into());
        }

        let offers: OffersResponse = response.json().await?;
        info!(offers_found = offers.data.len(), "Received flight offers");
        Ok(offers.data)
    }
}

/// Best-effort message from an API error body
fn error_message(status: StatusCode, body: &str) -> String {
    let details: Vec<String> = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| {
            r.errors
                .into_iter()
                .filter_map(|e| e.detail.or(e.title))
                .collect()
        })
        .unwrap_or_default();

    if !details.is_empty() {
        details.join("; ")
    } else if !body.trim().is_empty() {
        body.trim().chars().take(200).collect()
    } else {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    }
}
