//! Ranking score and marketing tier classification
//!
//! Both are pure functions of a title's editable fields. Every weight, band and
//! threshold comes from [`ScoringConfig`], whose defaults reproduce the board's
//! standard scoring table:
//!
//! | Axis            | High | Medium | Low | None |
//! |-----------------|------|--------|-----|------|
//! | priority        | 30   | 20     | 10  | 0    |
//! | audio success   | 25   | 15     | 5   | 0    |
//! | video comfort   | 20   | 15     | 5   | 0    |
//!
//! plus a banded social-following axis. The ranking score is the sum, capped
//! at 100. The marketing tier is a second weighted sum (prior tier, social,
//! expected sales, audio/video bonus) bucketed by descending thresholds.
//!
//! Monotonicity (raising any one input never lowers the score or the tier) is
//! enforced by [`ScoringConfig::validate`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{MarketingTier, Priority, Rating, TitleFields};
use crate::{Error, Result};

/// Upper bound of the ranking score
pub const MAX_RANKING_SCORE: u32 = 100;

/// Points for a four-level input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPoints {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    #[serde(default)]
    pub none: u32,
}

impl LevelPoints {
    pub const fn new(high: u32, medium: u32, low: u32) -> Self {
        Self {
            high,
            medium,
            low,
            none: 0,
        }
    }

    pub fn for_rating(&self, rating: Rating) -> u32 {
        match rating {
            Rating::High => self.high,
            Rating::Medium => self.medium,
            Rating::Low => self.low,
            Rating::None => self.none,
        }
    }

    pub fn for_priority(&self, priority: Option<Priority>) -> u32 {
        match priority {
            Some(Priority::High) => self.high,
            Some(Priority::Medium) => self.medium,
            Some(Priority::Low) => self.low,
            None => self.none,
        }
    }

    fn validate(&self, axis: &str) -> Result<()> {
        if self.high >= self.medium && self.medium >= self.low && self.low >= self.none {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "{} points must be non-increasing High >= Medium >= Low >= None",
                axis
            )))
        }
    }
}

/// `points` awarded when the value is at least `min`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub min: u64,
    pub points: u32,
}

const fn band(min: u64, points: u32) -> Band {
    Band { min, points }
}

/// Points from the first band (highest `min` first) the value reaches
fn band_points(bands: &[Band], value: u64) -> u32 {
    bands
        .iter()
        .find(|band| value >= band.min)
        .map(|band| band.points)
        .unwrap_or(0)
}

fn validate_bands(axis: &str, bands: &[Band]) -> Result<()> {
    for pair in bands.windows(2) {
        if pair[0].min <= pair[1].min {
            return Err(Error::Config(format!(
                "{} bands must be listed with strictly descending min ({} then {})",
                axis, pair[0].min, pair[1].min
            )));
        }
        if pair[0].points < pair[1].points {
            return Err(Error::Config(format!(
                "{} band points must not increase as min decreases ({} then {})",
                axis, pair[0].points, pair[1].points
            )));
        }
    }
    Ok(())
}

/// Lower score bound for a marketing tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub tier: MarketingTier,
    pub min: u32,
}

/// Weight of each prior-year tier in the tier score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorTierPoints {
    pub mega_blockbuster: u32,
    pub marquee_me: u32,
    pub marquee_mini: u32,
    pub bpub_audio: u32,
    pub author_branding: u32,
    pub gold_books: u32,
    pub momentum: u32,
}

impl Default for PriorTierPoints {
    fn default() -> Self {
        Self {
            mega_blockbuster: 50,
            marquee_me: 40,
            marquee_mini: 35,
            bpub_audio: 25,
            author_branding: 20,
            gold_books: 15,
            momentum: 10,
        }
    }
}

impl PriorTierPoints {
    pub fn for_tier(&self, tier: Option<MarketingTier>) -> u32 {
        match tier {
            Some(MarketingTier::MegaBlockbuster) => self.mega_blockbuster,
            Some(MarketingTier::MarqueeMe) => self.marquee_me,
            Some(MarketingTier::MarqueeMini) => self.marquee_mini,
            Some(MarketingTier::BPubAudio) => self.bpub_audio,
            Some(MarketingTier::AuthorBranding) => self.author_branding,
            Some(MarketingTier::GoldBooks) => self.gold_books,
            Some(MarketingTier::Momentum) => self.momentum,
            None => 0,
        }
    }

    fn validate(&self) -> Result<()> {
        let ordered = [
            self.mega_blockbuster,
            self.marquee_me,
            self.marquee_mini,
            self.bpub_audio,
            self.author_branding,
            self.gold_books,
            self.momentum,
        ];
        if ordered.windows(2).all(|pair| pair[0] >= pair[1]) {
            Ok(())
        } else {
            Err(Error::Config(
                "prior tier points must be non-increasing from Mega Blockbuster to Momentum".to_string(),
            ))
        }
    }
}

/// Marketing tier classifier weights
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierScoring {
    pub prior_tier: PriorTierPoints,
    pub social_bands: Vec<Band>,
    pub sales_bands: Vec<Band>,
    /// Audio success and video comfort both High
    pub both_high_bonus: u32,
    /// Exactly one of audio success / video comfort High
    pub one_high_bonus: u32,
    /// Highest tier first; a score below every entry is Momentum
    pub thresholds: Vec<TierThreshold>,
}

impl Default for TierScoring {
    fn default() -> Self {
        Self {
            prior_tier: PriorTierPoints::default(),
            social_bands: vec![
                band(1_000_000, 30),
                band(500_000, 25),
                band(100_000, 20),
                band(50_000, 10),
            ],
            sales_bands: vec![
                band(100_000, 20),
                band(50_000, 15),
                band(20_000, 10),
                band(10_000, 5),
            ],
            both_high_bonus: 10,
            one_high_bonus: 5,
            thresholds: vec![
                TierThreshold { tier: MarketingTier::MegaBlockbuster, min: 80 },
                TierThreshold { tier: MarketingTier::MarqueeMe, min: 65 },
                TierThreshold { tier: MarketingTier::MarqueeMini, min: 50 },
                TierThreshold { tier: MarketingTier::BPubAudio, min: 35 },
                TierThreshold { tier: MarketingTier::AuthorBranding, min: 25 },
                TierThreshold { tier: MarketingTier::GoldBooks, min: 15 },
            ],
        }
    }
}

/// Thresholds for suggesting a priority on imported rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritySuggestion {
    pub high_social: u64,
    pub high_sales: u64,
    pub medium_social: u64,
    pub medium_sales: u64,
}

impl Default for PrioritySuggestion {
    fn default() -> Self {
        Self {
            high_social: 500_000,
            high_sales: 50_000,
            medium_social: 100_000,
            medium_sales: 20_000,
        }
    }
}

/// All scoring weights, bands and thresholds (`[scoring]` in the TOML config)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub priority: LevelPoints,
    pub audio: LevelPoints,
    pub video: LevelPoints,
    pub social_bands: Vec<Band>,
    pub tier: TierScoring,
    pub suggestion: PrioritySuggestion,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            priority: LevelPoints::new(30, 20, 10),
            audio: LevelPoints::new(25, 15, 5),
            video: LevelPoints::new(20, 15, 5),
            social_bands: vec![
                band(100_000, 25),
                band(50_000, 20),
                band(10_000, 15),
                band(1_000, 10),
                band(1, 5),
            ],
            tier: TierScoring::default(),
            suggestion: PrioritySuggestion::default(),
        }
    }
}

impl ScoringConfig {
    /// Reject configurations that would break score/tier monotonicity
    pub fn validate(&self) -> Result<()> {
        self.priority.validate("priority")?;
        self.audio.validate("audio")?;
        self.video.validate("video")?;
        validate_bands("social", &self.social_bands)?;
        validate_bands("tier social", &self.tier.social_bands)?;
        validate_bands("tier sales", &self.tier.sales_bands)?;
        self.tier.prior_tier.validate()?;

        if self.tier.both_high_bonus < self.tier.one_high_bonus {
            return Err(Error::Config(
                "both_high_bonus must be at least one_high_bonus".to_string(),
            ));
        }

        for pair in self.tier.thresholds.windows(2) {
            if pair[0].min <= pair[1].min || pair[0].tier <= pair[1].tier {
                return Err(Error::Config(format!(
                    "tier thresholds must list higher tiers first with strictly descending min ({} {} then {} {})",
                    pair[0].tier, pair[0].min, pair[1].tier, pair[1].min
                )));
            }
        }
        Ok(())
    }

    /// Ranking score in `0..=100`
    pub fn ranking_score(&self, fields: &TitleFields) -> u8 {
        let total = self.priority.for_priority(fields.priority)
            + self.audio.for_rating(fields.audio_success)
            + band_points(&self.social_bands, fields.social_following)
            + self.video.for_rating(fields.video_comfort);
        total.min(MAX_RANKING_SCORE) as u8
    }

    /// Raw weighted score the marketing tier is bucketed from
    pub fn tier_score(&self, fields: &TitleFields) -> u32 {
        let tier = &self.tier;
        let audio_high = fields.audio_success == Rating::High;
        let video_high = fields.video_comfort == Rating::High;
        let bonus = match (audio_high, video_high) {
            (true, true) => tier.both_high_bonus,
            (true, false) | (false, true) => tier.one_high_bonus,
            (false, false) => 0,
        };

        tier.prior_tier.for_tier(fields.prior_tier)
            + band_points(&tier.social_bands, fields.social_following)
            + band_points(&tier.sales_bands, fields.expected_sales)
            + bonus
    }

    pub fn marketing_tier(&self, fields: &TitleFields) -> MarketingTier {
        let score = self.tier_score(fields);
        self.tier
            .thresholds
            .iter()
            .find(|threshold| score >= threshold.min)
            .map(|threshold| threshold.tier)
            .unwrap_or(MarketingTier::Momentum)
    }

    /// Priority for a title that arrived without one
    ///
    /// `performance` is the author's track record from the author directory.
    pub fn suggest_priority(&self, fields: &TitleFields, performance: Option<Priority>) -> Priority {
        let s = &self.suggestion;
        if performance == Some(Priority::High)
            || fields.social_following >= s.high_social
            || fields.expected_sales >= s.high_sales
        {
            Priority::High
        } else if performance == Some(Priority::Medium)
            || fields.social_following >= s.medium_social
            || fields.expected_sales >= s.medium_sales
        {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

// ========================================
// Author directory
// ========================================

/// Known facts about an author (`[[authors]]` in the TOML config)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub name: String,
    #[serde(default)]
    pub prior_tier: Option<MarketingTier>,
    /// Track record used for priority suggestions
    #[serde(default)]
    pub performance: Option<Priority>,
    #[serde(default)]
    pub social_following: Option<u64>,
}

/// Case-insensitive author lookup
#[derive(Debug, Clone, Default)]
pub struct AuthorDirectory {
    profiles: HashMap<String, AuthorProfile>,
}

impl AuthorDirectory {
    pub fn new(profiles: impl IntoIterator<Item = AuthorProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|profile| (normalize_author(&profile.name), profile))
            .collect();
        Self { profiles }
    }

    pub fn lookup(&self, author: &str) -> Option<&AuthorProfile> {
        self.profiles.get(&normalize_author(author))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Fill a missing prior tier and a zero social following from the directory
    pub fn enrich(&self, fields: &mut TitleFields) {
        let Some(profile) = self.lookup(&fields.author) else {
            return;
        };
        if fields.prior_tier.is_none() {
            fields.prior_tier = profile.prior_tier;
        }
        if fields.social_following == 0 {
            if let Some(following) = profile.social_following {
                fields.social_following = following;
            }
        }
    }
}

fn normalize_author(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(
        priority: Option<Priority>,
        audio: Rating,
        social: u64,
        video: Rating,
    ) -> TitleFields {
        TitleFields {
            title: "T".to_string(),
            author: "A".to_string(),
            priority,
            audio_success: audio,
            social_following: social,
            video_comfort: video,
            ..Default::default()
        }
    }

    #[test]
    fn test_ranking_score_reference_cases() {
        let config = ScoringConfig::default();
        let top = fields(Some(Priority::High), Rating::High, 150_000, Rating::High);
        assert_eq!(config.ranking_score(&top), 100);

        let bottom = fields(Some(Priority::Low), Rating::None, 0, Rating::None);
        assert_eq!(config.ranking_score(&bottom), 10);

        let empty = fields(None, Rating::None, 0, Rating::None);
        assert_eq!(config.ranking_score(&empty), 0);
    }

    #[test]
    fn test_social_bands() {
        let config = ScoringConfig::default();
        let score = |social| config.ranking_score(&fields(None, Rating::None, social, Rating::None));
        assert_eq!(score(0), 0);
        assert_eq!(score(1), 5);
        assert_eq!(score(999), 5);
        assert_eq!(score(1_000), 10);
        assert_eq!(score(10_000), 15);
        assert_eq!(score(50_000), 20);
        assert_eq!(score(100_000), 25);
        assert_eq!(score(u64::MAX), 25);
    }

    #[test]
    fn test_ranking_score_monotonic_per_axis() {
        let config = ScoringConfig::default();
        let priorities = [None, Some(Priority::Low), Some(Priority::Medium), Some(Priority::High)];
        let ratings = [Rating::None, Rating::Low, Rating::Medium, Rating::High];
        let socials = [0u64, 1, 999, 1_000, 9_999, 10_000, 50_000, 100_000, 5_000_000];

        // Each axis is raised step by step while the other three stay fixed
        let assert_rising = |scores: Vec<u8>| {
            assert!(scores.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", scores);
            assert!(scores.iter().all(|&score| score <= 100));
        };

        for &p in &priorities {
            for &a in &ratings {
                for &v in &ratings {
                    assert_rising(socials.iter().map(|&s| config.ranking_score(&fields(p, a, s, v))).collect());
                }
            }
        }

        for &s in &socials {
            for &x in &ratings {
                for &y in &ratings {
                    assert_rising(priorities.iter().map(|&p| config.ranking_score(&fields(p, x, s, y))).collect());
                }
                for &p in &priorities {
                    assert_rising(ratings.iter().map(|&a| config.ranking_score(&fields(p, a, s, x))).collect());
                    assert_rising(ratings.iter().map(|&v| config.ranking_score(&fields(p, x, s, v))).collect());
                }
            }
        }
    }

    #[test]
    fn test_ranking_score_clamped_with_generous_config() {
        let config = ScoringConfig {
            priority: LevelPoints::new(80, 40, 20),
            ..Default::default()
        };
        let top = fields(Some(Priority::High), Rating::High, 150_000, Rating::High);
        assert_eq!(config.ranking_score(&top), 100);
    }

    #[test]
    fn test_marketing_tier_buckets() {
        let config = ScoringConfig::default();

        let mut f = fields(None, Rating::None, 0, Rating::None);
        assert_eq!(config.marketing_tier(&f), MarketingTier::Momentum);

        // 50 + 30 = 80
        f.prior_tier = Some(MarketingTier::MegaBlockbuster);
        f.social_following = 1_000_000;
        assert_eq!(config.tier_score(&f), 80);
        assert_eq!(config.marketing_tier(&f), MarketingTier::MegaBlockbuster);

        // 40 + 20 + 5 = 65
        let mut f = fields(None, Rating::High, 100_000, Rating::Low);
        f.prior_tier = Some(MarketingTier::MarqueeMe);
        assert_eq!(config.tier_score(&f), 65);
        assert_eq!(config.marketing_tier(&f), MarketingTier::MarqueeMe);

        // 15 alone
        let mut f = fields(None, Rating::None, 0, Rating::None);
        f.prior_tier = Some(MarketingTier::GoldBooks);
        assert_eq!(config.marketing_tier(&f), MarketingTier::GoldBooks);

        // 10 + 10 = 20 -> Gold Books
        let mut f = fields(None, Rating::High, 0, Rating::High);
        f.prior_tier = Some(MarketingTier::Momentum);
        assert_eq!(config.marketing_tier(&f), MarketingTier::GoldBooks);

        // sales 100k (20) + social 50k (10) = 30 -> Author Branding
        let mut f = fields(None, Rating::None, 50_000, Rating::None);
        f.expected_sales = 100_000;
        assert_eq!(config.marketing_tier(&f), MarketingTier::AuthorBranding);
    }

    #[test]
    fn test_suggest_priority() {
        let config = ScoringConfig::default();
        let mut f = fields(None, Rating::None, 0, Rating::None);
        assert_eq!(config.suggest_priority(&f, None), Priority::Low);
        assert_eq!(config.suggest_priority(&f, Some(Priority::Medium)), Priority::Medium);
        assert_eq!(config.suggest_priority(&f, Some(Priority::High)), Priority::High);

        f.expected_sales = 20_000;
        assert_eq!(config.suggest_priority(&f, None), Priority::Medium);
        f.social_following = 500_000;
        assert_eq!(config.suggest_priority(&f, Some(Priority::Low)), Priority::High);
    }

    #[test]
    fn test_default_config_is_valid() {
        ScoringConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_non_monotonic_config() {
        let inverted_levels = ScoringConfig {
            audio: LevelPoints::new(5, 15, 25),
            ..Default::default()
        };
        assert!(matches!(inverted_levels.validate(), Err(Error::Config(_))));

        let unsorted_bands = ScoringConfig {
            social_bands: vec![band(1_000, 10), band(100_000, 25)],
            ..Default::default()
        };
        assert!(unsorted_bands.validate().is_err());

        let mut swapped_thresholds = ScoringConfig::default();
        swapped_thresholds.tier.thresholds.swap(0, 1);
        assert!(swapped_thresholds.validate().is_err());
    }

    #[test]
    fn test_scoring_config_from_toml_overrides() {
        let config: ScoringConfig = toml::from_str(
            r#"
            [priority]
            high = 40
            medium = 20
            low = 10

            [tier]
            both_high_bonus = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.priority.high, 40);
        assert_eq!(config.audio, ScoringConfig::default().audio);
        assert_eq!(config.tier.both_high_bonus, 12);
        assert_eq!(config.tier.thresholds.len(), 6);
        config.validate().unwrap();
    }

    #[test]
    fn test_author_directory_enrich() {
        let directory = AuthorDirectory::new(vec![AuthorProfile {
            name: "Colleen  Hoover".to_string(),
            prior_tier: Some(MarketingTier::MarqueeMe),
            performance: Some(Priority::High),
            social_following: Some(2_400_000),
        }]);

        let mut f = fields(None, Rating::None, 0, Rating::None);
        f.author = "colleen hoover".to_string();
        directory.enrich(&mut f);
        assert_eq!(f.prior_tier, Some(MarketingTier::MarqueeMe));
        assert_eq!(f.social_following, 2_400_000);

        // Explicit values are kept
        let mut f = fields(None, Rating::None, 42, Rating::None);
        f.author = "Colleen Hoover".to_string();
        f.prior_tier = Some(MarketingTier::Momentum);
        directory.enrich(&mut f);
        assert_eq!(f.prior_tier, Some(MarketingTier::Momentum));
        assert_eq!(f.social_following, 42);

        assert!(directory.lookup("Unknown Writer").is_none());
    }
}
