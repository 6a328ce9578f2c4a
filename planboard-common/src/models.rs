//! Board records
//!
//! Titles, plans, allocation limits, activity entries and chat messages, in the
//! camelCase JSON shape shared with other board clients and the sync document.
//!
//! Deserialization is deliberately forgiving: other clients write empty strings
//! for unset selects, numbers as strings, and spreadsheet ids as numbers. Unknown
//! categorical values land in the lowest bucket and unparsable numbers become
//! zero, so a snapshot written elsewhere always loads.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

// ========================================
// Categorical values
// ========================================

/// Editorial priority of a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(Error::InvalidInput(format!("unknown priority '{}'", other))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audio-success / video-comfort rating
///
/// `None` is the lowest bucket and the value for anything unrecognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Rating {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Rating {
    /// Parse leniently; unknown text is `Rating::None`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(loose_text(deserializer)?
            .map(|s| Rating::parse(&s))
            .unwrap_or_default())
    }
}

/// Marketing investment tier, lowest (`Momentum`) to highest (`MegaBlockbuster`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarketingTier {
    #[default]
    #[serde(rename = "Momentum")]
    Momentum,
    #[serde(rename = "Gold Books")]
    GoldBooks,
    #[serde(rename = "Author Branding")]
    AuthorBranding,
    #[serde(rename = "BPub/Audio")]
    BPubAudio,
    #[serde(rename = "Marquee Mini")]
    MarqueeMini,
    #[serde(rename = "Marquee Me")]
    MarqueeMe,
    #[serde(rename = "Mega Blockbuster")]
    MegaBlockbuster,
}

impl MarketingTier {
    /// All tiers, highest first
    pub const ALL: [MarketingTier; 7] = [
        Self::MegaBlockbuster,
        Self::MarqueeMe,
        Self::MarqueeMini,
        Self::BPubAudio,
        Self::AuthorBranding,
        Self::GoldBooks,
        Self::Momentum,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Momentum => "Momentum",
            Self::GoldBooks => "Gold Books",
            Self::AuthorBranding => "Author Branding",
            Self::BPubAudio => "BPub/Audio",
            Self::MarqueeMini => "Marquee Mini",
            Self::MarqueeMe => "Marquee Me",
            Self::MegaBlockbuster => "Mega Blockbuster",
        }
    }
}

impl FromStr for MarketingTier {
    type Err = Error;

    /// Accepts display names in any case and spacing ("Marquee Me", "bpub/audio", "gold_books")
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "megablockbuster" => Ok(Self::MegaBlockbuster),
            "marqueeme" => Ok(Self::MarqueeMe),
            "marqueemini" => Ok(Self::MarqueeMini),
            "bpubaudio" => Ok(Self::BPubAudio),
            "authorbranding" => Ok(Self::AuthorBranding),
            "goldbooks" => Ok(Self::GoldBooks),
            "momentum" => Ok(Self::Momentum),
            _ => Err(Error::InvalidInput(format!("unknown marketing tier '{}'", s))),
        }
    }
}

impl fmt::Display for MarketingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign type a plan draws from the allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignType {
    Marquee,
    Blockbuster,
    Standard,
}

impl FromStr for CampaignType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "marquee" => Ok(Self::Marquee),
            "blockbuster" => Ok(Self::Blockbuster),
            "standard" => Ok(Self::Standard),
            other => Err(Error::InvalidInput(format!("unknown campaign type '{}'", other))),
        }
    }
}

// ========================================
// Titles
// ========================================

/// User-editable title attributes
///
/// Everything a client may set. Identity, audit fields and the derived
/// ranking score / marketing tier live on [`Title`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TitleFields {
    /// Catalog id (spreadsheet column A); defaults to the record id
    #[serde(deserialize_with = "loose_string")]
    pub title_id: String,
    pub title: String,
    pub author: String,
    #[serde(deserialize_with = "loose_string")]
    pub asin: String,
    pub status: String,
    #[serde(deserialize_with = "loose_date")]
    pub release_date: Option<NaiveDate>,
    pub pub_quarter: String,
    pub genre: String,
    #[serde(deserialize_with = "loose_priority")]
    pub priority: Option<Priority>,
    pub audio_success: Rating,
    pub video_comfort: Rating,
    #[serde(deserialize_with = "loose_count")]
    pub social_following: u64,
    #[serde(deserialize_with = "loose_count")]
    pub expected_sales: u64,
    /// Tier the author held last cycle
    #[serde(deserialize_with = "loose_tier")]
    pub prior_tier: Option<MarketingTier>,
    pub sales_tier: String,
    #[serde(deserialize_with = "loose_string")]
    pub pr: String,
    pub imprint: String,
    pub editor: String,
    pub amm: String,
    pub selection_strategy: String,
    pub region: String,
    pub editorial_reason: String,
}

impl TitleFields {
    /// Trim free text and reject records without a title or author
    pub fn normalized(mut self) -> Result<Self> {
        for text in [
            &mut self.title_id,
            &mut self.title,
            &mut self.author,
            &mut self.asin,
            &mut self.status,
            &mut self.pub_quarter,
            &mut self.genre,
            &mut self.sales_tier,
            &mut self.pr,
            &mut self.imprint,
            &mut self.editor,
            &mut self.amm,
            &mut self.selection_strategy,
            &mut self.region,
        ] {
            let trimmed = text.trim();
            if trimmed.len() != text.len() {
                *text = trimmed.to_string();
            }
        }

        if self.title.is_empty() {
            return Err(Error::InvalidInput("title is required".to_string()));
        }
        if self.author.is_empty() {
            return Err(Error::InvalidInput("author is required".to_string()));
        }
        if self.pub_quarter.is_empty() {
            self.pub_quarter = quarter_for(self.release_date);
        }
        Ok(self)
    }

    /// Case-insensitive title+author identity used for duplicate detection
    pub fn same_book(&self, title: &str, author: &str) -> bool {
        fn fold(text: &str) -> String {
            text.trim().to_lowercase()
        }
        fold(&self.title) == fold(title) && fold(&self.author) == fold(author)
    }
}

/// A book under marketing planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    #[serde(deserialize_with = "loose_string")]
    pub id: String,
    #[serde(flatten)]
    pub fields: TitleFields,
    /// Derived; see [`crate::scoring::ScoringConfig::ranking_score`]
    #[serde(default, deserialize_with = "loose_score")]
    pub ranking_score: u8,
    /// Derived; see [`crate::scoring::ScoringConfig::marketing_tier`]
    #[serde(default, deserialize_with = "loose_tier_or_lowest")]
    pub marketing_tier: MarketingTier,
    #[serde(default)]
    pub created_by: String,
    #[serde(default = "crate::time::now")]
    pub created_at: DateTime<Utc>,
}

/// Publication quarter label for a release date ("Q3 2026"); "Q1 2026" when unknown
pub fn quarter_for(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => format!("Q{} {}", (date.month() - 1) / 3 + 1, date.year()),
        None => "Q1 2026".to_string(),
    }
}

// ========================================
// Plans and allocation
// ========================================

/// User-editable plan attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanFields {
    pub campaign_strategy: String,
    pub target_audience: String,
    pub marketing_channels: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    #[serde(deserialize_with = "loose_campaign")]
    pub campaign_type: Option<CampaignType>,
    /// Whole currency units
    #[serde(deserialize_with = "loose_amount")]
    pub budget: Option<u64>,
    pub milestones: String,
    pub team_members: String,
}

/// Marketing campaign plan attached to exactly one title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Owning title's record id
    #[serde(deserialize_with = "loose_string")]
    pub title_id: String,
    #[serde(flatten)]
    pub fields: PlanFields,
    #[serde(default)]
    pub updated_by: String,
    #[serde(default = "crate::time::now")]
    pub updated_at: DateTime<Utc>,
}

/// Campaign capacity limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Allocation {
    pub marquee_total: u32,
    pub blockbuster_total: u32,
}

impl Allocation {
    pub const DEFAULT_MARQUEE_TOTAL: u32 = 12;
    pub const DEFAULT_BLOCKBUSTER_TOTAL: u32 = 6;

    /// Replace zero totals with the defaults
    pub fn or_defaults(self) -> Self {
        Self {
            marquee_total: if self.marquee_total == 0 {
                Self::DEFAULT_MARQUEE_TOTAL
            } else {
                self.marquee_total
            },
            blockbuster_total: if self.blockbuster_total == 0 {
                Self::DEFAULT_BLOCKBUSTER_TOTAL
            } else {
                self.blockbuster_total
            },
        }
    }
}

impl Default for Allocation {
    fn default() -> Self {
        Self {
            marquee_total: Self::DEFAULT_MARQUEE_TOTAL,
            blockbuster_total: Self::DEFAULT_BLOCKBUSTER_TOTAL,
        }
    }
}

/// How close a campaign type is to its capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageLevel {
    /// Below 80% of capacity
    Normal,
    /// At or above 80%
    Warning,
    /// At or above 100%
    Exhausted,
}

/// Derived usage of one campaign type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignUsage {
    pub used: usize,
    pub total: u32,
    pub remaining: u32,
    pub level: UsageLevel,
}

impl CampaignUsage {
    pub fn new(used: usize, total: u32) -> Self {
        let level = if total == 0 {
            if used == 0 {
                UsageLevel::Normal
            } else {
                UsageLevel::Exhausted
            }
        } else if used as u64 * 100 >= total as u64 * 100 {
            UsageLevel::Exhausted
        } else if used as u64 * 100 >= total as u64 * 80 {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        };
        Self {
            used,
            total,
            remaining: total.saturating_sub(used.min(u32::MAX as usize) as u32),
            level,
        }
    }
}

/// Allocation usage derived from the live plan list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationUsage {
    pub marquee: CampaignUsage,
    pub blockbuster: CampaignUsage,
}

// ========================================
// Activity and chat
// ========================================

/// Audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub user: String,
    #[serde(default = "crate::time::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default = "default_activity_kind")]
    pub kind: String,
}

fn default_activity_kind() -> String {
    "user_action".to_string()
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
    #[serde(other)]
    System,
}

/// Advisor conversation entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub role: ChatRole,
    pub content: String,
    #[serde(default = "crate::time::now")]
    pub timestamp: DateTime<Utc>,
}

/// Whole-board state: what gets persisted, exported and synced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardSnapshot {
    pub titles: Vec<Title>,
    pub plans: Vec<Plan>,
    pub activities: Vec<Activity>,
    pub allocation: Allocation,
    pub chat_history: Vec<ChatMessage>,
}

// ========================================
// Lenient field decoding
// ========================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Number(f64),
    Other(serde::de::IgnoredAny),
}

fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) => Some(s),
        Some(Loose::Number(n)) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", n as i64)),
        Some(Loose::Number(n)) => Some(n.to_string()),
        Some(Loose::Other(_)) | None => None,
    })
}

/// Parse a count the way a spreadsheet cell reads: digits with optional separators
pub(crate) fn parse_count(text: &str) -> u64 {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_' && *c != '$')
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|n| n.trunc() as u64)
        .unwrap_or(0)
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(loose_text(deserializer)?.unwrap_or_default())
}

fn loose_count<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) => parse_count(&s),
        Some(Loose::Number(n)) if n.is_finite() && n > 0.0 => n.trunc() as u64,
        _ => 0,
    })
}

fn loose_amount<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<u64>, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) if s.trim().is_empty() => None,
        Some(Loose::Text(s)) => Some(parse_count(&s)),
        Some(Loose::Number(n)) if n.is_finite() && n >= 0.0 => Some(n.trunc() as u64),
        _ => None,
    })
}

fn loose_score<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u8, D::Error> {
    Ok(loose_count(deserializer)?.min(100) as u8)
}

fn loose_date<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error> {
    Ok(loose_text(deserializer)?.and_then(|s| parse_iso_date(&s)))
}

/// `YYYY-MM-DD`, optionally followed by a time part
pub(crate) fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let head = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

pub(crate) fn loose_priority<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Priority>, D::Error> {
    Ok(loose_text(deserializer)?.and_then(|s| s.parse().ok()))
}

fn loose_campaign<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<CampaignType>, D::Error> {
    Ok(loose_text(deserializer)?.and_then(|s| s.parse().ok()))
}

pub(crate) fn loose_tier<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<MarketingTier>, D::Error> {
    Ok(loose_text(deserializer)?.and_then(|s| s.parse().ok()))
}

fn loose_tier_or_lowest<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<MarketingTier, D::Error> {
    Ok(loose_tier(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_from_foreign_client_json() {
        // Shape written by the browser drafts: string numbers, empty selects, numeric ids
        let value = json!({
            "id": 1767225600000u64,
            "titleId": 42,
            "title": "Fourth Wing",
            "author": "Rebecca Yarros",
            "releaseDate": "2026-03-15T00:00:00.000Z",
            "priority": "",
            "audioSuccess": "high",
            "videoComfort": null,
            "socialFollowing": "850,000",
            "marketingTier": "Mega Blockbuster",
            "rankingScore": 77,
            "createdBy": "alice",
            "createdAt": "2026-01-02T03:04:05Z"
        });

        let title: Title = serde_json::from_value(value).unwrap();
        assert_eq!(title.id, "1767225600000");
        assert_eq!(title.fields.title_id, "42");
        assert_eq!(title.fields.priority, None);
        assert_eq!(title.fields.audio_success, Rating::High);
        assert_eq!(title.fields.video_comfort, Rating::None);
        assert_eq!(title.fields.social_following, 850_000);
        assert_eq!(
            title.fields.release_date,
            NaiveDate::from_ymd_opt(2026, 3, 15)
        );
        assert_eq!(title.marketing_tier, MarketingTier::MegaBlockbuster);
    }

    #[test]
    fn test_title_serializes_camel_case_flat() {
        let title = Title {
            id: "t1".to_string(),
            fields: TitleFields {
                title: "Book".to_string(),
                author: "Writer".to_string(),
                priority: Some(Priority::High),
                ..Default::default()
            },
            ranking_score: 30,
            marketing_tier: MarketingTier::GoldBooks,
            created_by: "bob".to_string(),
            created_at: crate::time::now(),
        };
        let value = serde_json::to_value(&title).unwrap();
        assert_eq!(value["title"], "Book");
        assert_eq!(value["priority"], "High");
        assert_eq!(value["audioSuccess"], "None");
        assert_eq!(value["rankingScore"], 30);
        assert_eq!(value["marketingTier"], "Gold Books");
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn test_plan_budget_and_campaign_type_are_lenient() {
        let plan: Plan = serde_json::from_value(json!({
            "titleId": "t1",
            "budget": "25000",
            "campaignType": "",
            "marketingChannels": ["TikTok", "Email", "TikTok"]
        }))
        .unwrap();
        assert_eq!(plan.fields.budget, Some(25_000));
        assert_eq!(plan.fields.campaign_type, None);
        assert_eq!(plan.fields.marketing_channels.len(), 2);

        let plan: Plan = serde_json::from_value(json!({"titleId": "t1", "budget": ""})).unwrap();
        assert_eq!(plan.fields.budget, None);
    }

    #[test]
    fn test_marketing_tier_parsing_and_order() {
        assert_eq!("bpub/audio".parse::<MarketingTier>().unwrap(), MarketingTier::BPubAudio);
        assert_eq!("Gold_Books".parse::<MarketingTier>().unwrap(), MarketingTier::GoldBooks);
        assert!("Platinum".parse::<MarketingTier>().is_err());
        assert!(MarketingTier::MegaBlockbuster > MarketingTier::MarqueeMe);
        assert!(MarketingTier::GoldBooks > MarketingTier::Momentum);
    }

    #[test]
    fn test_normalized_requires_title_and_author() {
        let missing_author = TitleFields {
            title: "Only Title".to_string(),
            author: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(missing_author.normalized(), Err(Error::InvalidInput(_))));

        let fields = TitleFields {
            title: "  Padded  ".to_string(),
            author: "Writer".to_string(),
            release_date: NaiveDate::from_ymd_opt(2026, 8, 1),
            ..Default::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(fields.title, "Padded");
        assert_eq!(fields.pub_quarter, "Q3 2026");
    }

    #[test]
    fn test_quarter_for() {
        assert_eq!(quarter_for(NaiveDate::from_ymd_opt(2026, 3, 31)), "Q1 2026");
        assert_eq!(quarter_for(NaiveDate::from_ymd_opt(2026, 4, 1)), "Q2 2026");
        assert_eq!(quarter_for(NaiveDate::from_ymd_opt(2027, 12, 1)), "Q4 2027");
        assert_eq!(quarter_for(None), "Q1 2026");
    }

    #[test]
    fn test_campaign_usage_levels() {
        assert_eq!(CampaignUsage::new(0, 12).level, UsageLevel::Normal);
        assert_eq!(CampaignUsage::new(9, 12).level, UsageLevel::Normal);
        assert_eq!(CampaignUsage::new(10, 12).level, UsageLevel::Warning);
        assert_eq!(CampaignUsage::new(12, 12).level, UsageLevel::Exhausted);
        assert_eq!(CampaignUsage::new(14, 12).remaining, 0);
        assert_eq!(CampaignUsage::new(0, 0).level, UsageLevel::Normal);
        assert_eq!(CampaignUsage::new(1, 0).level, UsageLevel::Exhausted);
    }

    #[test]
    fn test_snapshot_defaults_missing_sections() {
        let snapshot: BoardSnapshot = serde_json::from_value(json!({"titles": []})).unwrap();
        assert!(snapshot.plans.is_empty());
        assert_eq!(snapshot.allocation, Allocation::default());
    }
}
