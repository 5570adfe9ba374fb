//! Data models for Dealerdesk.
//!
//! Tracking events and leads are written by the public site and read back by
//! the analytics dashboard. Vehicle photos are registered through the
//! upload flow once their filename passes validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::photos::AngleCode;

/// A stored string that does not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// What a visitor did on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PhoneClick,
    EmailClick,
    FormSubmit,
    PageView,
    VehicleInterest,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PhoneClick => "phone_click",
            EventType::EmailClick => "email_click",
            EventType::FormSubmit => "form_submit",
            EventType::PageView => "page_view",
            EventType::VehicleInterest => "vehicle_interest",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone_click" => Ok(EventType::PhoneClick),
            "email_click" => Ok(EventType::EmailClick),
            "form_submit" => Ok(EventType::FormSubmit),
            "page_view" => Ok(EventType::PageView),
            "vehicle_interest" => Ok(EventType::VehicleInterest),
            _ => Err(UnknownVariant {
                kind: "event type",
                value: s.to_string(),
            }),
        }
    }
}

/// Where a lead sits in the sales funnel.
///
/// `New -> Set -> Show -> Close` are the funnel stages (appointment set,
/// customer showed up, deal closed). `Incomplete` marks a lead that dropped
/// out of a form before finishing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Set,
    Show,
    Close,
    Incomplete,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Set => "set",
            LeadStatus::Show => "show",
            LeadStatus::Close => "close",
            LeadStatus::Incomplete => "incomplete",
        }
    }

    /// Whether a lead in this status has reached at least `stage`.
    ///
    /// Only meaningful for the funnel stages; `Incomplete` never reaches
    /// anything past itself.
    pub fn reached(&self, stage: LeadStatus) -> bool {
        match (self.funnel_rank(), stage.funnel_rank()) {
            (Some(have), Some(want)) => have >= want,
            _ => *self == stage,
        }
    }

    fn funnel_rank(&self) -> Option<u8> {
        match self {
            LeadStatus::New => Some(0),
            LeadStatus::Set => Some(1),
            LeadStatus::Show => Some(2),
            LeadStatus::Close => Some(3),
            LeadStatus::Incomplete => None,
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "set" => Ok(LeadStatus::Set),
            "show" => Ok(LeadStatus::Show),
            "close" => Ok(LeadStatus::Close),
            "incomplete" => Ok(LeadStatus::Incomplete),
            _ => Err(UnknownVariant {
                kind: "lead status",
                value: s.to_string(),
            }),
        }
    }
}

/// A single client-side tracking event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub event_type: EventType,

    /// Page or campaign the event came from, e.g. "inventory" or "google_ads".
    pub source: String,

    /// Vehicle the visitor was looking at, if any.
    pub vehicle_name: Option<String>,

    /// Server-side timestamp (UTC).
    pub created_at: DateTime<Utc>,
}

/// A sales lead captured by one of the site's forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: LeadStatus,
    pub source: String,

    /// Salesperson the lead is assigned to.
    pub agent: Option<String>,
    pub vehicle_interest: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for POST /track.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackRequest {
    pub event_type: EventType,
    pub source: String,
    #[serde(default)]
    pub vehicle_name: Option<String>,
}

/// Request body for POST /leads.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub source: String,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub vehicle_interest: Option<String>,

    /// Status to record (default: new).
    #[serde(default = "default_lead_status")]
    pub status: LeadStatus,
}

fn default_lead_status() -> LeadStatus {
    LeadStatus::New
}

/// Response for POST /leads.
#[derive(Debug, Clone, Serialize)]
pub struct LeadCreated {
    pub id: i64,
}

/// Request body for PATCH /leads/:id.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadStatusUpdate {
    pub status: LeadStatus,
}

/// Query parameters for GET /analytics.
#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Lookback window in days (default: 30).
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    30
}

/// Request body for POST /photos and POST /photos/validate.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoRequest {
    /// Original name of the uploaded file.
    pub filename: String,
}

/// Query parameters for GET /photos.
#[derive(Debug, Deserialize)]
pub struct PhotoQuery {
    pub year: i32,
    pub model_code: String,
}

/// A registered vehicle photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehiclePhoto {
    pub filename: String,
    pub year: i32,
    pub model_code: String,
    pub angle: AngleCode,
    pub make: Option<String>,
    pub model: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trips_through_str() {
        for ty in [
            EventType::PhoneClick,
            EventType::EmailClick,
            EventType::FormSubmit,
            EventType::PageView,
            EventType::VehicleInterest,
        ] {
            assert_eq!(ty.as_str().parse::<EventType>(), Ok(ty));
        }
        assert!("click".parse::<EventType>().is_err());
    }

    #[test]
    fn test_event_type_serde_matches_as_str() {
        let json = serde_json::to_value(EventType::VehicleInterest).unwrap();
        assert_eq!(json, "vehicle_interest");
    }

    #[test]
    fn test_lead_status_unknown() {
        let err = "lost".parse::<LeadStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown lead status 'lost'");
    }

    #[test]
    fn test_lead_status_reached() {
        assert!(LeadStatus::Close.reached(LeadStatus::Set));
        assert!(LeadStatus::Show.reached(LeadStatus::Show));
        assert!(!LeadStatus::Set.reached(LeadStatus::Show));
        assert!(!LeadStatus::Incomplete.reached(LeadStatus::Set));
        assert!(!LeadStatus::New.reached(LeadStatus::Incomplete));
        assert!(LeadStatus::Incomplete.reached(LeadStatus::Incomplete));
    }

    #[test]
    fn test_lead_request_defaults() {
        let req: LeadRequest =
            serde_json::from_str(r#"{"name": "Sam", "source": "contact"}"#).unwrap();
        assert_eq!(req.status, LeadStatus::New);
        assert!(req.email.is_none());
    }

    #[test]
    fn test_analytics_query_default_days() {
        let q: AnalyticsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.days, 30);
    }
}
