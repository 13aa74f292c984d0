//! Dashboard aggregates
//!
//! "Fake-like" means the result label contains `Fake` or `AI`. These helpers
//! are the in-process rendition of the SQL aggregation in `store::postgres`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::log_entry::LogEntry;
use crate::detection::MediaType;

/// Days returned by the chart at most
pub const CHART_MAX_DAYS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: i64,
    pub fake: i64,
    pub real: i64,
    #[serde(rename = "safetyScore")]
    pub safety_score: i64,
}

impl UserStats {
    pub fn from_counts(total: i64, fake: i64) -> Self {
        let safety_score = if total > 0 {
            ((1.0 - fake as f64 / total as f64) * 100.0).round() as i64
        } else {
            100
        };
        Self {
            total,
            fake,
            real: total - fake,
            safety_score,
        }
    }
}

/// One bar of a dashboard chart: a day or a media type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub name: String,
    #[serde(rename = "Total")]
    pub total: i64,
    #[serde(rename = "Fake")]
    pub fake: i64,
    #[serde(rename = "Real")]
    pub real: i64,
}

impl ChartPoint {
    pub fn new(name: impl Into<String>, total: i64, fake: i64) -> Self {
        Self {
            name: name.into(),
            total,
            fake,
            real: total - fake,
        }
    }
}

/// `?type=` filter of the chart endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFilter {
    All,
    Only(MediaType),
}

impl ChartFilter {
    /// Anything unrecognised selects everything
    pub fn parse(value: Option<&str>) -> Self {
        value
            .and_then(MediaType::parse)
            .map(Self::Only)
            .unwrap_or(Self::All)
    }

    pub fn matches(&self, request_type: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(media) => media.as_str() == request_type,
        }
    }
}

fn counts<'a>(entries: impl Iterator<Item = &'a LogEntry>) -> (i64, i64) {
    entries.fold((0, 0), |(total, fake), entry| {
        (total + 1, fake + i64::from(entry.is_fake_like()))
    })
}

pub fn user_stats(entries: &[LogEntry]) -> UserStats {
    let (total, fake) = counts(entries.iter());
    UserStats::from_counts(total, fake)
}

/// Per-day totals, oldest day first, at most `CHART_MAX_DAYS` days
pub fn chart_by_day(entries: &[LogEntry], filter: ChartFilter) -> Vec<ChartPoint> {
    let mut days: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for entry in entries.iter().filter(|e| filter.matches(&e.request_type)) {
        let slot = days.entry(entry.day()).or_default();
        slot.0 += 1;
        slot.1 += i64::from(entry.is_fake_like());
    }

    days.into_iter()
        .take(CHART_MAX_DAYS)
        .map(|(day, (total, fake))| ChartPoint::new(day, total, fake))
        .collect()
}

/// Totals per media type; all four types are always present
pub fn type_breakdown(entries: &[LogEntry]) -> Vec<ChartPoint> {
    MediaType::ALL
        .iter()
        .map(|media| {
            let (total, fake) = counts(entries.iter().filter(|e| e.request_type == media.as_str()));
            ChartPoint::new(media.display_name(), total, fake)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn entry(request_type: &str, result: &str, day_offset: i64) -> LogEntry {
        LogEntry {
            id: Uuid::new_v4(),
            request_type: request_type.to_string(),
            input_data: "x".to_string(),
            result: result.to_string(),
            confidence: 0.9,
            username: "alice".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(day_offset),
        }
    }

    #[test]
    fn test_safety_score() {
        let mut entries: Vec<LogEntry> = (0..4).map(|_| entry("image", "Fake (AI)", 0)).collect();
        entries.extend((0..6).map(|_| entry("text", "Real (Human Written)", 0)));

        let stats = user_stats(&entries);
        assert_eq!(stats, UserStats { total: 10, fake: 4, real: 6, safety_score: 60 });

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["safetyScore"], 60);
    }

    #[test]
    fn test_empty_stats_are_safe() {
        assert_eq!(user_stats(&[]), UserStats { total: 0, fake: 0, real: 0, safety_score: 100 });
    }

    #[test]
    fn test_ai_in_label_counts_as_fake() {
        let entries = vec![
            entry("audio", "Fake (AI Cloned)", 0),
            entry("audio", "Suspicious", 0),
            entry("text", "AI Generated", 0),
        ];
        assert_eq!(user_stats(&entries).fake, 2);
    }

    #[test]
    fn test_chart_groups_by_day_ascending() {
        let entries = vec![
            entry("image", "Fake (AI)", 2),
            entry("image", "Real", 0),
            entry("audio", "Fake (AI Cloned)", 0),
        ];

        let chart = chart_by_day(&entries, ChartFilter::All);
        assert_eq!(
            chart,
            vec![ChartPoint::new("2024-01-01", 2, 1), ChartPoint::new("2024-01-03", 1, 1)]
        );

        let images = chart_by_day(&entries, ChartFilter::parse(Some("Image")));
        assert_eq!(images[0], ChartPoint::new("2024-01-01", 1, 0));
    }

    #[test]
    fn test_chart_caps_days() {
        let entries: Vec<LogEntry> = (0..40).map(|d| entry("text", "Real", d)).collect();
        let chart = chart_by_day(&entries, ChartFilter::All);
        assert_eq!(chart.len(), CHART_MAX_DAYS);
        assert_eq!(chart[0].name, "2024-01-01");
    }

    #[test]
    fn test_type_breakdown_lists_every_type() {
        let entries = vec![entry("video", "Fake (AI)", 0)];
        let breakdown = type_breakdown(&entries);
        let names: Vec<&str> = breakdown.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Video", "Audio", "Text", "Image"]);
        assert_eq!(breakdown[0], ChartPoint::new("Video", 1, 1));
        assert_eq!(breakdown[3], ChartPoint::new("Image", 0, 0));
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(ChartFilter::parse(None), ChartFilter::All);
        assert_eq!(ChartFilter::parse(Some("All")), ChartFilter::All);
        assert_eq!(ChartFilter::parse(Some("audio")), ChartFilter::Only(MediaType::Audio));
    }
}
