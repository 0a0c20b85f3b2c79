use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::date_entry::DateEntry;
use crate::services::dates::average;

#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

impl Insight {
    fn new(title: &str, content: impl Into<String>, kind: &str, data: Value) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            kind: kind.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub title: String,
    pub content: String,
    pub tips: Vec<String>,
    pub red_flags: Vec<String>,
}

/// Insight cards for one user's roster. Only `dates` is consulted, so the
/// caller decides whose data goes in.
pub fn generate_insights(dates: &[DateEntry]) -> Vec<Insight> {
    let mut insights = Vec::new();

    if dates.is_empty() {
        insights.push(Insight::new(
            "Getting Started",
            "Start adding dates to your roster to get personalized insights! Track your chemistry ratings and conversation quality.",
            "tip",
            json!({ "tip": "Add your first date" }),
        ));
    } else {
        insights.push(roster_summary(dates));
        if let Some(card) = chemistry_pattern(dates) {
            insights.push(card);
        }
        if let Some(card) = top_vibe(dates) {
            insights.push(card);
        }
    }

    insights.push(Insight::new(
        "Communication is Key",
        "Focus on active listening and asking meaningful questions. Great conversations build stronger connections.",
        "advice",
        json!({ "advice": "Improve communication" }),
    ));
    insights.push(Insight::new(
        "Trust Your Gut",
        "Pay attention to how you feel during and after dates. Your emotional responses are valuable data points.",
        "advice",
        json!({ "advice": "Listen to intuition" }),
    ));
    insights.push(Insight::new(
        "Quality Over Quantity",
        "It's better to have fewer meaningful connections than many superficial ones. Focus on depth.",
        "philosophy",
        json!({ "approach": "quality-focused" }),
    ));

    insights
}

fn roster_summary(dates: &[DateEntry]) -> Insight {
    let avg = average(dates.iter().filter_map(|d| d.rating));
    let content = match avg {
        Some(avg) => format!(
            "You've logged {} date{} with an average rating of {:.1}/10.",
            dates.len(),
            if dates.len() == 1 { "" } else { "s" },
            avg
        ),
        None => format!(
            "You've logged {} date{}. Add ratings to see how they compare.",
            dates.len(),
            if dates.len() == 1 { "" } else { "s" }
        ),
    };
    Insight::new(
        "Your Roster",
        content,
        "trend",
        json!({ "totalDates": dates.len(), "averageRating": avg }),
    )
}

fn chemistry_pattern(dates: &[DateEntry]) -> Option<Insight> {
    const THRESHOLD: i32 = 7;
    let rated: Vec<&DateEntry> = dates.iter().filter(|d| d.chemistry_rating.is_some()).collect();
    if rated.is_empty() {
        return None;
    }
    let high: Vec<&&DateEntry> = rated
        .iter()
        .filter(|d| d.chemistry_rating.unwrap_or(0) >= THRESHOLD)
        .collect();
    let share = high.len() as f64 / rated.len() as f64;

    let content = if high.is_empty() {
        format!(
            "None of your rated dates reached a chemistry score of {THRESHOLD}. Try settings where conversation flows more easily."
        )
    } else {
        let names: Vec<&str> = high.iter().take(3).map(|d| d.name.as_str()).collect();
        format!(
            "{:.0}% of your rated dates had chemistry of {THRESHOLD}+ ({}). Focus on what those dates had in common.",
            share * 100.0,
            names.join(", ")
        )
    };

    Some(Insight::new(
        "Chemistry Pattern",
        content,
        "pattern",
        json!({ "chemistryThreshold": THRESHOLD, "share": share }),
    ))
}

fn top_vibe(dates: &[DateEntry]) -> Option<Insight> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for vibe in dates.iter().filter_map(|d| d.vibe_check.as_deref()) {
        *counts.entry(vibe).or_default() += 1;
    }
    // Ties break alphabetically so the card is stable across calls.
    let (vibe, count) = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))?;

    Some(Insight::new(
        "Vibe Check",
        format!("Your most common vibe is \"{vibe}\" ({count} of {} dates).", dates.len()),
        "trend",
        json!({ "vibe": vibe, "count": count }),
    ))
}

pub fn dating_advice() -> Advice {
    Advice {
        title: "Dating Strategy".into(),
        content: "Focus on building genuine connections rather than playing games. Be authentic and communicate openly about your intentions.".into(),
        tips: vec![
            "Ask meaningful questions to understand their values".into(),
            "Share personal stories to create emotional connection".into(),
            "Pay attention to body language and energy".into(),
            "Don't rush - let the relationship develop naturally".into(),
        ],
        red_flags: vec![
            "They avoid answering personal questions".into(),
            "Inconsistent communication patterns".into(),
            "They seem too good to be true".into(),
            "They pressure you to move too fast".into(),
        ],
    }
}
