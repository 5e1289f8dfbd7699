use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::{
    repositories::catalog::MasterclassCatalog,
    value_objects::masterclasses::{Masterclass, MasterclassPricing},
};

use super::event_pricing::extract_pricing;

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read-only catalog backed by a Google-calendar-style events API.
///
/// Masterclasses are calendar events whose title or description mentions
/// the masterclass marker; pricing is text-encoded in the description. The
/// calendar stays the source of truth, this adapter only reads.
pub struct GoogleCalendarCatalog {
    http: reqwest::Client,
    calendar_id: String,
    service_account_email: String,
    private_key_pem: String,
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

#[derive(Debug, Deserialize)]
struct CalendarEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    organizer: Option<EventOrganizer>,
    #[serde(rename = "conferenceData")]
    conference_data: Option<ConferenceData>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct EventOrganizer {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConferenceData {
    #[serde(rename = "entryPoints", default)]
    entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Deserialize)]
struct EntryPoint {
    uri: Option<String>,
    #[serde(rename = "entryPointType")]
    entry_point_type: Option<String>,
}

impl GoogleCalendarCatalog {
    pub fn new(
        calendar_id: String,
        service_account_email: String,
        private_key_pem: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            calendar_id,
            service_account_email,
            private_key_pem,
        })
    }

    /// Signs a short-lived service-account grant and trades it for an
    /// access token. Tokens are fetched per call; the catalog is read on
    /// page loads and checkout, not in a hot loop.
    async fn access_token(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            iss: &self.service_account_email,
            scope: CALENDAR_SCOPE,
            aud: TOKEN_URL,
            iat: now,
            exp: now + 3600,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .context("calendar service account key is not valid RSA PEM")?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        let resp = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            error!(status = %status, "calendar token exchange failed");
            anyhow::bail!("calendar token exchange failed (status {})", status);
        }

        let token: TokenResponse = resp.json().await?;
        Ok(token.access_token)
    }

    fn event_to_masterclass(event: CalendarEvent, now: DateTime<Utc>) -> Option<Masterclass> {
        let start_time = event.start.as_ref()?.date_time?;
        let end_time = event.end.as_ref()?.date_time?;

        let meeting_link = event.conference_data.as_ref().and_then(|data| {
            data.entry_points
                .iter()
                .find(|entry| entry.entry_point_type.as_deref() == Some("video"))
                .and_then(|entry| entry.uri.clone())
        });

        let pricing: MasterclassPricing = extract_pricing(event.description.as_deref());

        Some(Masterclass {
            title: event
                .summary
                .unwrap_or_else(|| format!("MasterClass {}", event.id)),
            id: event.id,
            description: event.description,
            start_time,
            end_time,
            location: event.location,
            meeting_link,
            instructor: event.organizer.and_then(|o| o.display_name),
            status: Masterclass::status_at(start_time, end_time, now),
            pricing,
        })
    }

    async fn fetch_event(&self, event_id: &str) -> Result<Option<CalendarEvent>> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(format!(
                "https://www.googleapis.com/calendar/v3/calendars/{}/events/{}",
                self.calendar_id, event_id
            ))
            .bearer_auth(&token)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            anyhow::bail!("calendar event fetch failed (status {})", resp.status());
        }

        Ok(Some(resp.json().await?))
    }
}

#[async_trait]
impl MasterclassCatalog for GoogleCalendarCatalog {
    async fn list_masterclasses(&self) -> Result<Vec<Masterclass>> {
        let token = self.access_token().await?;
        let now = Utc::now();
        let window_end = now
            .checked_add_months(Months::new(3))
            .context("calendar window end overflowed")?;

        let resp = self
            .http
            .get(format!(
                "https://www.googleapis.com/calendar/v3/calendars/{}/events",
                self.calendar_id
            ))
            .query(&[
                ("timeMin", now.to_rfc3339()),
                ("timeMax", window_end.to_rfc3339()),
                ("maxResults", "50".to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("q", "masterclass".to_string()),
            ])
            .bearer_auth(&token)
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("calendar event list failed (status {})", resp.status());
        }

        let list: EventList = resp.json().await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|event| Self::event_to_masterclass(event, now))
            .collect())
    }

    async fn find_masterclass_by_id(&self, masterclass_id: &str) -> Result<Option<Masterclass>> {
        let event = self.fetch_event(masterclass_id).await?;
        Ok(event.and_then(|event| Self::event_to_masterclass(event, Utc::now())))
    }

    async fn event_title(&self, masterclass_id: &str, hint: Option<String>) -> String {
        if let Some(title) = hint.filter(|title| !title.is_empty()) {
            return title;
        }

        match self.fetch_event(masterclass_id).await {
            Ok(Some(event)) => event
                .summary
                .unwrap_or_else(|| format!("MasterClass {masterclass_id}")),
            Ok(None) => format!("MasterClass {masterclass_id}"),
            Err(err) => {
                warn!(%masterclass_id, error = ?err, "falling back to placeholder event title");
                format!("MasterClass {masterclass_id}")
            }
        }
    }
}
