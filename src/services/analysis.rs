//! Photo "analysis".
//!
//! [`DeterministicAnalyzer`] is a stub: it derives every score from the
//! first character of the image file name. It does not look at the image.
//! A real model plugs in behind [`ImageAnalyzer`] without touching callers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    pub with_extroverts: u32,
    pub with_introverts: u32,
    pub with_professionals: u32,
    pub with_creatives: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub attractiveness: u32,
    pub confidence: u32,
    pub approachability: u32,
    pub style: String,
    pub mood: String,
    pub dating_app_optimized: bool,
    pub suggestions: Vec<String>,
    pub compatibility: Compatibility,
    /// Which analyzer produced this, e.g. `"deterministic-stub"`.
    pub source: String,
}

#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, image_ref: &str) -> anyhow::Result<ImageAnalysis>;
}

const STYLES: [&str; 4] = ["casual-chic", "professional", "bohemian", "minimalist"];
const MOODS: [&str; 4] = ["positive", "confident", "friendly", "mysterious"];
const SUGGESTIONS: [&str; 4] = [
    "Your smile conveys warmth and approachability",
    "Consider using more natural lighting for better photos",
    "Your style shows personality - great for attracting like-minded people",
    "Try different angles to showcase your best features",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicAnalyzer;

impl DeterministicAnalyzer {
    /// Code point of the first character of the last path segment, 0 if
    /// there is none.
    fn seed(image_ref: &str) -> u32 {
        image_ref
            .rsplit('/')
            .next()
            .and_then(|name| name.chars().next())
            .map(u32::from)
            .unwrap_or(0)
    }

    pub fn analyze_sync(&self, image_ref: &str) -> ImageAnalysis {
        let seed = Self::seed(image_ref);
        let band = seed % 3;
        let pick = (seed % 4) as usize;

        ImageAnalysis {
            attractiveness: band + 7,
            confidence: band + 6,
            approachability: band + 7,
            style: STYLES[pick].to_string(),
            mood: MOODS[pick].to_string(),
            dating_app_optimized: seed % 2 == 0,
            suggestions: SUGGESTIONS[..2 + (seed % 2) as usize]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            compatibility: Compatibility {
                with_extroverts: band + 6,
                with_introverts: band + 7,
                with_professionals: band + 7,
                with_creatives: band + 6,
            },
            source: "deterministic-stub".into(),
        }
    }
}

#[async_trait]
impl ImageAnalyzer for DeterministicAnalyzer {
    async fn analyze(&self, image_ref: &str) -> anyhow::Result<ImageAnalysis> {
        Ok(self.analyze_sync(image_ref))
    }
}
