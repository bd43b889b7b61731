//! The Blue Alliance API client
//!
//! Implements [`MatchLookup`] against the TBA v3 REST API. Lookups are
//! sequential blocking calls, one per match, with no retry and no built-in
//! timeout; a transient failure is treated as a permanent skip for that
//! match by the reconciliation scorer.

use crate::error::{Error, Result};
use crate::reconcile::{MatchLookup, RemoteAlliance, RemoteBreakdown};
use serde::Deserialize;

const TBA_BASE_URL: &str = "https://www.thebluealliance.com/api/v3";
const AUTH_HEADER: &str = "X-TBA-Auth-Key";
const USER_AGENT: &str = concat!("scoutflow/", env!("CARGO_PKG_VERSION"));

/// TBA v3 match response (the fields reconciliation needs)
#[derive(Debug, Deserialize)]
struct TbaMatch {
    score_breakdown: Option<TbaScoreBreakdown>,
}

#[derive(Debug, Deserialize)]
struct TbaScoreBreakdown {
    blue: TbaAllianceScore,
    red: TbaAllianceScore,
}

#[derive(Debug, Default, Deserialize)]
struct TbaAllianceScore {
    #[serde(rename = "autoCoralCount")]
    auto_coral_count: Option<f64>,
    #[serde(rename = "teleopCoralCount")]
    teleop_coral_count: Option<f64>,
}

impl From<TbaAllianceScore> for RemoteAlliance {
    fn from(score: TbaAllianceScore) -> RemoteAlliance {
        RemoteAlliance {
            auto_coral_count: score.auto_coral_count,
            teleop_coral_count: score.teleop_coral_count,
        }
    }
}

impl From<TbaMatch> for RemoteBreakdown {
    fn from(m: TbaMatch) -> RemoteBreakdown {
        match m.score_breakdown {
            // a match without a posted breakdown has nothing to compare
            None => RemoteBreakdown::default(),
            Some(breakdown) => RemoteBreakdown {
                blue: breakdown.blue.into(),
                red: breakdown.red.into(),
            },
        }
    }
}

/// Blocking TBA API client
pub struct TbaClient {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl TbaClient {
    pub fn new(api_key: impl Into<String>) -> Result<TbaClient> {
        Self::with_base_url(api_key, TBA_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<TbaClient> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(TbaClient {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// TBA match key for a qualification match, e.g. `2025caph_qm7`.
    fn match_key(year: u16, event_key: &str, match_number: u32) -> String {
        if event_key.starts_with(|c: char| c.is_ascii_digit()) {
            format!("{event_key}_qm{match_number}")
        } else {
            format!("{year}{event_key}_qm{match_number}")
        }
    }
}

impl MatchLookup for TbaClient {
    fn alliance_totals(
        &self,
        year: u16,
        event_key: &str,
        match_number: u32,
    ) -> Result<RemoteBreakdown> {
        let key = Self::match_key(year, event_key, match_number);
        let url = format!("{}/match/{key}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(AUTH_HEADER, &self.api_key)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::NotFound(format!("TBA match {key}: HTTP {status}")));
        }

        let parsed: TbaMatch = response.json()?;
        Ok(parsed.into())
    }
}
