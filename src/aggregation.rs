//! Aggregation of tracking events and leads into dashboard reports.
//!
//! Everything here is a pure function of the rows handed in. Nothing is
//! cached between calls; the dashboard recomputes the report on every
//! request from rows the storage layer already filtered by dealer and time
//! range.

use std::collections::BTreeMap;

use chrono::{Local, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Lead, LeadStatus, TrackingEvent};

/// Number of vehicles in the "most mentioned" ranking.
pub const TOP_VEHICLES: usize = 10;

/// Number of events in the recent activity list.
pub const RECENT_EVENTS: usize = 20;

/// Number of leads in the recent activity list.
pub const RECENT_LEADS: usize = 10;

/// Key used for leads that have no agent assigned.
pub const UNASSIGNED_AGENT: &str = "unassigned";

/// Count occurrences of each key in `items`, ordered by key.
pub fn count_by<T, K, F>(items: &[T], key: F) -> BTreeMap<K, usize>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(key(item)).or_insert(0) += 1;
    }
    counts
}

/// A vehicle and how many events mentioned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleMention {
    pub vehicle_name: String,
    pub count: usize,
}

/// The `n` most mentioned vehicles, highest count first.
///
/// Equal counts are ordered by vehicle name so the ranking is stable across
/// requests. Events without a vehicle name are ignored.
pub fn top_vehicles(events: &[TrackingEvent], n: usize) -> Vec<VehicleMention> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in events.iter().filter_map(|e| e.vehicle_name.as_deref()) {
        *counts.entry(name).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(n)
        .map(|(vehicle_name, count)| VehicleMention {
            vehicle_name: vehicle_name.to_string(),
            count,
        })
        .collect()
}

/// Lead counts at each funnel stage.
///
/// Stages are cumulative: a closed lead also counts as shown and set.
/// For the number of leads sitting in each status right now, see
/// [`LeadSummary::by_status`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelCounts {
    pub total: usize,
    pub set: usize,
    pub show: usize,
    pub close: usize,
}

impl FunnelCounts {
    pub fn from_leads(leads: &[Lead]) -> Self {
        let reached = |stage: LeadStatus| {
            leads
                .iter()
                .filter(|l| l.status.reached(stage))
                .count()
        };

        Self {
            total: leads.len(),
            set: reached(LeadStatus::Set),
            show: reached(LeadStatus::Show),
            close: reached(LeadStatus::Close),
        }
    }
}

/// Conversion rates between funnel stages, as fractions in `[0, 1]`.
///
/// A stage with a zero denominator yields a rate of `0.0`. No rounding is
/// applied; formatting is up to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelRates {
    pub set_rate: f64,
    pub show_rate: f64,
    pub close_rate: f64,
    pub overall_close_rate: f64,
}

impl FunnelRates {
    pub fn from_counts(counts: &FunnelCounts) -> Self {
        Self {
            set_rate: ratio(counts.set, counts.total),
            show_rate: ratio(counts.show, counts.set),
            close_rate: ratio(counts.close, counts.show),
            overall_close_rate: ratio(counts.close, counts.total),
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Tracking event section of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,

    /// Hour of day (0-23) in the aggregator's time zone.
    pub by_hour: BTreeMap<u32, usize>,
    pub top_vehicles: Vec<VehicleMention>,

    /// Newest events, in the order storage returned them.
    pub recent: Vec<TrackingEvent>,
}

/// Lead section of the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadSummary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub by_agent: BTreeMap<String, usize>,
    pub funnel: FunnelCounts,
    pub rates: FunnelRates,

    /// Newest leads, in the order storage returned them.
    pub recent: Vec<Lead>,
}

/// Full dashboard report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub events: EventSummary,
    pub leads: LeadSummary,
}

/// Builds reports, bucketing timestamps by hour in a fixed time zone.
#[derive(Debug, Clone)]
pub struct EventAggregator<Tz: TimeZone> {
    tz: Tz,
}

impl EventAggregator<Local> {
    /// Aggregator using the server's local time zone.
    pub fn local() -> Self {
        Self::new(Local)
    }
}

impl<Tz: TimeZone> EventAggregator<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    fn hour_of_day(&self, ts: &chrono::DateTime<Utc>) -> u32 {
        ts.with_timezone(&self.tz).hour()
    }

    /// Summarize tracking events.
    ///
    /// `events` must already be sorted newest first; the recent list is
    /// taken from the front without re-sorting.
    pub fn summarize_events(&self, events: &[TrackingEvent]) -> EventSummary {
        let by_type = count_by(events, |e| e.event_type.as_str().to_string());
        let by_source = count_by(events, |e| e.source.clone());
        let by_hour = count_by(events, |e| self.hour_of_day(&e.created_at));

        EventSummary {
            total: events.len(),
            by_type,
            by_source,
            by_hour,
            top_vehicles: top_vehicles(events, TOP_VEHICLES),
            recent: events.iter().take(RECENT_EVENTS).cloned().collect(),
        }
    }

    /// Summarize leads. `leads` must already be sorted newest first.
    pub fn summarize_leads(&self, leads: &[Lead]) -> LeadSummary {
        let funnel = FunnelCounts::from_leads(leads);

        LeadSummary {
            total: leads.len(),
            by_status: count_by(leads, |l| l.status.as_str().to_string()),
            by_source: count_by(leads, |l| l.source.clone()),
            by_agent: count_by(leads, |l| {
                l.agent
                    .clone()
                    .unwrap_or_else(|| UNASSIGNED_AGENT.to_string())
            }),
            funnel,
            rates: FunnelRates::from_counts(&funnel),
            recent: leads.iter().take(RECENT_LEADS).cloned().collect(),
        }
    }

    pub fn report(&self, events: &[TrackingEvent], leads: &[Lead]) -> AnalyticsReport {
        AnalyticsReport {
            events: self.summarize_events(events),
            leads: self.summarize_leads(leads),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType;
    use chrono::{Duration, FixedOffset};

    fn event(
        event_type: EventType,
        source: &str,
        vehicle: Option<&str>,
        hour: u32,
    ) -> TrackingEvent {
        TrackingEvent {
            event_type,
            source: source.to_string(),
            vehicle_name: vehicle.map(str::to_string),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, hour, 15, 0).unwrap(),
        }
    }

    fn lead(id: i64, status: LeadStatus, source: &str, agent: Option<&str>) -> Lead {
        Lead {
            id,
            name: format!("Lead {}", id),
            email: None,
            phone: None,
            status,
            source: source.to_string(),
            agent: agent.map(str::to_string),
            vehicle_interest: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                - Duration::minutes(id),
        }
    }

    fn sample_events() -> Vec<TrackingEvent> {
        vec![
            event(EventType::PageView, "inventory", Some("2021 Chevrolet Trailblazer"), 9),
            event(EventType::PageView, "home", None, 9),
            event(EventType::PhoneClick, "inventory", Some("2021 Chevrolet Trailblazer"), 14),
            event(EventType::FormSubmit, "financing", Some("2019 Ford F-150"), 23),
            event(EventType::VehicleInterest, "inventory", Some("2019 Ford F-150"), 0),
        ]
    }

    #[test]
    fn test_count_by() {
        let counts = count_by(&[1, 2, 2, 3, 3, 3], |n| *n);
        assert_eq!(counts.get(&1), Some(&1));
        assert_eq!(counts.get(&2), Some(&2));
        assert_eq!(counts.get(&3), Some(&3));
        assert_eq!(counts.get(&4), None);
    }

    #[test]
    fn test_funnel_rates() {
        let counts = FunnelCounts {
            total: 100,
            set: 40,
            show: 20,
            close: 5,
        };
        let rates = FunnelRates::from_counts(&counts);

        assert_eq!(rates.set_rate, 0.4);
        assert_eq!(rates.show_rate, 0.5);
        assert_eq!(rates.close_rate, 0.25);
        assert_eq!(rates.overall_close_rate, 0.05);
    }

    #[test]
    fn test_funnel_rates_zero_guard() {
        let rates = FunnelRates::from_counts(&FunnelCounts::default());

        assert_eq!(rates.set_rate, 0.0);
        assert_eq!(rates.show_rate, 0.0);
        assert_eq!(rates.close_rate, 0.0);
        assert_eq!(rates.overall_close_rate, 0.0);
    }

    #[test]
    fn test_funnel_counts_are_cumulative() {
        let leads = vec![
            lead(1, LeadStatus::New, "web", None),
            lead(2, LeadStatus::Set, "web", None),
            lead(3, LeadStatus::Show, "web", None),
            lead(4, LeadStatus::Close, "web", None),
            lead(5, LeadStatus::Incomplete, "web", None),
        ];

        let funnel = FunnelCounts::from_leads(&leads);

        assert_eq!(
            funnel,
            FunnelCounts {
                total: 5,
                set: 3,
                show: 2,
                close: 1,
            }
        );
    }

    #[test]
    fn test_top_vehicles_limit_and_order() {
        let mut events = Vec::new();
        for i in 0..15 {
            for _ in 0..=i {
                events.push(event(
                    EventType::VehicleInterest,
                    "inventory",
                    Some(format!("vehicle-{:02}", i).as_str()),
                    10,
                ));
            }
        }

        let top = top_vehicles(&events, TOP_VEHICLES);

        assert_eq!(top.len(), 10);
        assert!(top.windows(2).all(|w| w[0].count > w[1].count));
        assert_eq!(top[0].vehicle_name, "vehicle-14");
        assert_eq!(top[0].count, 15);
        assert_eq!(top[9].vehicle_name, "vehicle-05");
        assert!(top.iter().all(|m| m.vehicle_name.starts_with("vehicle-")));
    }

    #[test]
    fn test_top_vehicles_tie_break_by_name() {
        let events = vec![
            event(EventType::PageView, "inventory", Some("Malibu"), 10),
            event(EventType::PageView, "inventory", Some("Accord"), 10),
            event(EventType::PageView, "inventory", Some("Camry"), 10),
            event(EventType::PageView, "inventory", Some("Camry"), 10),
        ];

        let names: Vec<_> = top_vehicles(&events, 10)
            .into_iter()
            .map(|m| m.vehicle_name)
            .collect();

        assert_eq!(names, vec!["Camry", "Accord", "Malibu"]);
    }

    #[test]
    fn test_summarize_events() {
        let aggregator = EventAggregator::new(Utc);
        let summary = aggregator.summarize_events(&sample_events());

        assert_eq!(summary.total, 5);
        assert_eq!(summary.by_type.get("page_view"), Some(&2));
        assert_eq!(summary.by_type.get("phone_click"), Some(&1));
        assert_eq!(summary.by_source.get("inventory"), Some(&3));
        assert_eq!(summary.by_hour.get(&9), Some(&2));
        assert_eq!(summary.by_hour.get(&0), Some(&1));
        assert_eq!(summary.top_vehicles.len(), 2);
        assert_eq!(summary.recent.len(), 5);
    }

    #[test]
    fn test_hour_of_day_uses_aggregator_zone() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let aggregator = EventAggregator::new(offset);
        let summary = aggregator.summarize_events(&sample_events());

        // 09:15 UTC is 04:15 at UTC-5, 00:15 UTC is 19:15 the day before
        assert_eq!(summary.by_hour.get(&4), Some(&2));
        assert_eq!(summary.by_hour.get(&19), Some(&1));
        assert_eq!(summary.by_hour.get(&14), None);
    }

    #[test]
    fn test_recent_slices_keep_input_order() {
        let aggregator = EventAggregator::new(Utc);
        let events: Vec<_> = (0..30)
            .map(|i| event(EventType::PageView, &format!("page-{}", i), None, 8))
            .collect();
        let leads: Vec<_> = (0..15)
            .map(|i| lead(i, LeadStatus::New, "web", None))
            .collect();

        let report = aggregator.report(&events, &leads);

        assert_eq!(report.events.recent.len(), RECENT_EVENTS);
        assert_eq!(report.events.recent[0].source, "page-0");
        assert_eq!(report.events.recent[19].source, "page-19");
        assert_eq!(report.leads.recent.len(), RECENT_LEADS);
        assert_eq!(report.leads.recent[0].id, 0);
        assert_eq!(report.leads.recent[9].id, 9);
    }

    #[test]
    fn test_summarize_leads() {
        let aggregator = EventAggregator::new(Utc);
        let leads = vec![
            lead(1, LeadStatus::New, "contact", Some("dana")),
            lead(2, LeadStatus::Set, "financing", Some("dana")),
            lead(3, LeadStatus::Close, "financing", None),
            lead(4, LeadStatus::Incomplete, "financing", None),
        ];

        let summary = aggregator.summarize_leads(&leads);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.by_status.get("new"), Some(&1));
        assert_eq!(summary.by_status.get("incomplete"), Some(&1));
        assert_eq!(summary.by_source.get("financing"), Some(&3));
        assert_eq!(summary.by_agent.get("dana"), Some(&2));
        assert_eq!(summary.by_agent.get(UNASSIGNED_AGENT), Some(&2));
        assert_eq!(summary.funnel.set, 2);
        assert_eq!(summary.rates.set_rate, 0.5);
        assert_eq!(summary.rates.close_rate, 1.0);
    }

    #[test]
    fn test_report_is_repeatable() {
        let aggregator = EventAggregator::new(Utc);
        let events = sample_events();
        let leads = vec![
            lead(1, LeadStatus::Show, "contact", Some("dana")),
            lead(2, LeadStatus::New, "contact", None),
        ];

        let first = aggregator.report(&events, &leads);
        let second = aggregator.report(&events, &leads);

        assert_eq!(first, second);
    }

    #[test]
    fn test_count_keys_serialize_in_sorted_order() {
        let aggregator = EventAggregator::new(Utc);
        let leads = vec![
            lead(1, LeadStatus::Show, "trade_in", Some("quinn")),
            lead(2, LeadStatus::New, "contact", None),
            lead(3, LeadStatus::Close, "financing", Some("dana")),
        ];
        let mut reversed = leads.clone();
        reversed.reverse();

        let summary = aggregator.summarize_leads(&leads);
        let keys: Vec<_> = summary.by_source.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["contact", "financing", "trade_in"]);

        let json = serde_json::to_string(&summary.by_agent).unwrap();
        assert_eq!(json, r#"{"dana":1,"quinn":1,"unassigned":1}"#);

        let other = aggregator.summarize_leads(&reversed);
        assert_eq!(
            serde_json::to_string(&summary.by_status).unwrap(),
            serde_json::to_string(&other.by_status).unwrap()
        );
    }

    #[test]
    fn test_empty_input_matches_default() {
        let aggregator = EventAggregator::new(Utc);
        let report = aggregator.report(&[], &[]);

        assert_eq!(report, AnalyticsReport::default());
    }
}
