//! In-memory record store
//!
//! `Board` owns the titles, plans, activity feed, allocation and chat history.
//! Every mutation is synchronous, appends an activity entry where the action is
//! user-visible, and advances the board's `lastUpdate` stamp. Persistence,
//! events and sync are layered on top by [`crate::service::BoardService`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::import::{ImportReport, Sheet};
use crate::models::{
    Activity, Allocation, AllocationUsage, BoardSnapshot, CampaignType, CampaignUsage, ChatMessage,
    MarketingTier, Plan, PlanFields, Priority, Title, TitleFields,
};
use crate::scoring::{AuthorDirectory, ScoringConfig};
use crate::time;
use crate::{Error, Result};

/// Default activity feed retention
pub const DEFAULT_ACTIVITY_CAP: usize = 100;

/// Accepted activity feed retention range
pub const ACTIVITY_CAP_RANGE: std::ops::RangeInclusive<usize> = 1..=1000;

const ACTIVITY_KIND_USER_ACTION: &str = "user_action";

/// Store behaviour knobs (`[board]` in the TOML config)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardOptions {
    /// Activity entries kept, newest first
    pub activity_cap: usize,
    /// Reject plans that would push a campaign type past its allocation
    pub enforce_allocation: bool,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            activity_cap: DEFAULT_ACTIVITY_CAP,
            enforce_allocation: false,
        }
    }
}

impl BoardOptions {
    pub fn validate(&self) -> Result<()> {
        if !ACTIVITY_CAP_RANGE.contains(&self.activity_cap) {
            return Err(Error::Config(format!(
                "activity_cap must be within {}..={}, got {}",
                ACTIVITY_CAP_RANGE.start(),
                ACTIVITY_CAP_RANGE.end(),
                self.activity_cap
            )));
        }
        Ok(())
    }
}

/// Title list filter; every field is optional and they combine with AND
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TitleFilter {
    /// Substring of title, PR, imprint, editor or AMM (case-insensitive)
    pub title: Option<String>,
    /// Substring of author (case-insensitive)
    pub author: Option<String>,
    /// Release date prefix, e.g. `2026-03`
    pub month: Option<String>,
    pub genre: Option<String>,
    /// Any case; unrecognised values filter nothing
    #[serde(deserialize_with = "crate::models::loose_priority")]
    pub priority: Option<Priority>,
    #[serde(deserialize_with = "crate::models::loose_tier")]
    pub tier: Option<MarketingTier>,
    pub region: Option<String>,
}

impl TitleFilter {
    pub fn matches(&self, title: &Title) -> bool {
        let f = &title.fields;
        let contains = |haystack: &str, needle: &str| haystack.to_lowercase().contains(needle);

        if let Some(needle) = non_empty(&self.title) {
            let needle = needle.to_lowercase();
            let hit = [&f.title, &f.pr, &f.imprint, &f.editor, &f.amm]
                .iter()
                .any(|field| contains(field, &needle));
            if !hit {
                return false;
            }
        }
        if let Some(needle) = non_empty(&self.author) {
            if !contains(&f.author, &needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(prefix) = non_empty(&self.month) {
            let date = f.release_date.map(|d| d.to_string()).unwrap_or_default();
            if !date.starts_with(prefix) {
                return false;
            }
        }
        if let Some(genre) = non_empty(&self.genre) {
            if f.genre != genre {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if f.priority != Some(priority) {
                return false;
            }
        }
        if let Some(tier) = self.tier {
            if title.marketing_tier != tier {
                return false;
            }
        }
        if let Some(region) = non_empty(&self.region) {
            if f.region != region {
                return false;
            }
        }
        true
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Dashboard summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_titles: usize,
    pub high_priority: usize,
    pub with_plans: usize,
    pub allocation: AllocationUsage,
    pub recent_activity: Vec<Activity>,
    /// Distinct activity actors, most recently active first
    pub team_members: Vec<String>,
    /// Top High-priority titles by ranking score
    pub priority_titles: Vec<Title>,
}

/// Result of [`Board::upsert_plan`]
#[derive(Debug, Clone, PartialEq)]
pub struct PlanUpsert {
    pub plan: Plan,
    pub created: bool,
}

/// The record store
#[derive(Debug, Clone)]
pub struct Board {
    titles: Vec<Title>,
    plans: Vec<Plan>,
    activities: Vec<Activity>,
    allocation: Allocation,
    chat_history: Vec<ChatMessage>,
    last_update: i64,
    activity_paused: bool,
    options: BoardOptions,
    scoring: ScoringConfig,
    authors: AuthorDirectory,
}

impl Board {
    pub fn new(options: BoardOptions, scoring: ScoringConfig, authors: AuthorDirectory) -> Self {
        Self {
            titles: Vec::new(),
            plans: Vec::new(),
            activities: Vec::new(),
            allocation: Allocation::default(),
            chat_history: Vec::new(),
            last_update: 0,
            activity_paused: false,
            options,
            scoring,
            authors,
        }
    }

    // ---- accessors ----

    pub fn titles(&self) -> &[Title] {
        &self.titles
    }

    pub fn title(&self, id: &str) -> Option<&Title> {
        self.titles.iter().find(|t| t.id == id)
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn plan_for(&self, title_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.title_id == title_id)
    }

    /// Newest first
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn allocation(&self) -> Allocation {
        self.allocation
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    /// Millisecond stamp of the latest mutation (0 for a fresh board)
    pub fn last_update(&self) -> i64 {
        self.last_update
    }

    pub fn options(&self) -> BoardOptions {
        self.options
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn authors(&self) -> &AuthorDirectory {
        &self.authors
    }

    pub fn activity_paused(&self) -> bool {
        self.activity_paused
    }

    fn touch(&mut self) {
        self.last_update = time::next_stamp(self.last_update);
    }

    fn score(&self, title: &mut Title) {
        title.ranking_score = self.scoring.ranking_score(&title.fields);
        title.marketing_tier = self.scoring.marketing_tier(&title.fields);
    }

    // ---- titles ----

    pub fn create_title(&mut self, fields: TitleFields, actor: &str) -> Result<Title> {
        let mut fields = fields.normalized()?;
        self.authors.enrich(&mut fields);

        let id = Uuid::new_v4().to_string();
        if fields.title_id.is_empty() {
            fields.title_id = id.clone();
        }

        let mut title = Title {
            id,
            fields,
            ranking_score: 0,
            marketing_tier: MarketingTier::Momentum,
            created_by: actor.to_string(),
            created_at: time::now(),
        };
        self.score(&mut title);
        self.titles.push(title.clone());

        self.record_activity(
            format!(
                "{} added new title \"{}\" (Tier: {})",
                actor, title.fields.title, title.marketing_tier
            ),
            actor,
        );
        self.touch();
        Ok(title)
    }

    /// Replace a title's editable fields; id, creator and creation time are kept
    pub fn update_title(&mut self, id: &str, fields: TitleFields, actor: &str) -> Result<Title> {
        let mut fields = fields.normalized()?;
        self.authors.enrich(&mut fields);

        let index = self
            .titles
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("title {}", id)))?;

        if fields.title_id.is_empty() {
            fields.title_id = self.titles[index].fields.title_id.clone();
        }

        let mut title = self.titles[index].clone();
        title.fields = fields;
        self.score(&mut title);
        self.titles[index] = title.clone();

        self.record_activity(
            format!(
                "{} updated \"{}\" (Tier: {})",
                actor, title.fields.title, title.marketing_tier
            ),
            actor,
        );
        self.touch();
        Ok(title)
    }

    /// Remove a title and its plan
    pub fn delete_title(&mut self, id: &str, actor: &str) -> Result<Title> {
        let index = self
            .titles
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("title {}", id)))?;

        let removed = self.titles.remove(index);
        self.plans.retain(|p| p.title_id != removed.id);

        self.record_activity(
            format!("{} deleted title \"{}\"", actor, removed.fields.title),
            actor,
        );
        self.touch();
        Ok(removed)
    }

    /// Remove several titles and their plans; returns the ids actually removed
    pub fn bulk_delete_titles(&mut self, ids: &[String], actor: &str) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Err(Error::InvalidInput("no titles selected".to_string()));
        }

        let selected: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let removed: Vec<String> = self
            .titles
            .iter()
            .filter(|t| selected.contains(t.id.as_str()))
            .map(|t| t.id.clone())
            .collect();
        if removed.is_empty() {
            return Err(Error::NotFound("none of the selected titles exist".to_string()));
        }

        self.titles.retain(|t| !selected.contains(t.id.as_str()));
        self.plans.retain(|p| !selected.contains(p.title_id.as_str()));

        self.record_activity(
            format!("{} bulk deleted {} titles", actor, removed.len()),
            actor,
        );
        self.touch();
        Ok(removed)
    }

    /// Add parsed spreadsheet rows, skipping title+author duplicates
    ///
    /// Rows without a valid priority get a suggested one. A single activity
    /// entry summarises the import.
    pub fn import_titles(&mut self, sheet: Sheet, source: &str, actor: &str) -> (ImportReport, Vec<Title>) {
        let mut report = ImportReport {
            dropped: sheet.dropped,
            ..Default::default()
        };
        let mut added = Vec::new();

        for mut fields in sheet.rows {
            let duplicate = self
                .titles
                .iter()
                .any(|t| t.fields.same_book(&fields.title, &fields.author));
            if duplicate {
                report.duplicates += 1;
                continue;
            }

            self.authors.enrich(&mut fields);
            if fields.priority.is_none() {
                let performance = self.authors.lookup(&fields.author).and_then(|p| p.performance);
                fields.priority = Some(self.scoring.suggest_priority(&fields, performance));
            }
            let mut fields = match fields.normalized() {
                Ok(fields) => fields,
                Err(_) => {
                    report.dropped += 1;
                    continue;
                }
            };

            let id = Uuid::new_v4().to_string();
            if fields.title_id.is_empty() {
                fields.title_id = id.clone();
            }
            let mut title = Title {
                id,
                fields,
                ranking_score: 0,
                marketing_tier: MarketingTier::Momentum,
                created_by: actor.to_string(),
                created_at: time::now(),
            };
            self.score(&mut title);
            self.titles.push(title.clone());
            added.push(title);
            report.imported += 1;
        }

        self.record_activity(
            format!("{} imported {} titles from {}", actor, report.imported, source),
            actor,
        );
        self.touch();
        (report, added)
    }

    /// Titles by descending ranking score; ties keep insertion order
    pub fn ranked_titles(&self) -> Vec<&Title> {
        let mut ranked: Vec<&Title> = self.titles.iter().collect();
        ranked.sort_by(|a, b| b.ranking_score.cmp(&a.ranking_score));
        ranked
    }

    pub fn filter_titles(&self, filter: &TitleFilter) -> Vec<&Title> {
        self.ranked_titles()
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect()
    }

    // ---- plans and allocation ----

    /// Create or replace the plan for a title (at most one per title)
    pub fn upsert_plan(&mut self, title_id: &str, fields: PlanFields, actor: &str) -> Result<PlanUpsert> {
        let title_name = self
            .title(title_id)
            .map(|t| t.fields.title.clone())
            .ok_or_else(|| Error::NotFound(format!("title {}", title_id)))?;

        if self.options.enforce_allocation {
            self.check_capacity(title_id, fields.campaign_type)?;
        }

        let plan = Plan {
            title_id: title_id.to_string(),
            fields,
            updated_by: actor.to_string(),
            updated_at: time::now(),
        };

        let created = match self.plans.iter_mut().find(|p| p.title_id == title_id) {
            Some(existing) => {
                *existing = plan.clone();
                false
            }
            None => {
                self.plans.push(plan.clone());
                true
            }
        };

        let verb = if created { "created" } else { "updated" };
        self.record_activity(
            format!("{} {} marketing plan for \"{}\"", actor, verb, title_name),
            actor,
        );
        self.touch();
        Ok(PlanUpsert { plan, created })
    }

    fn check_capacity(&self, title_id: &str, campaign_type: Option<CampaignType>) -> Result<()> {
        let total = match campaign_type {
            Some(CampaignType::Marquee) => self.allocation.marquee_total,
            Some(CampaignType::Blockbuster) => self.allocation.blockbuster_total,
            Some(CampaignType::Standard) | None => return Ok(()),
        };
        let used_by_others = self
            .plans
            .iter()
            .filter(|p| p.title_id != title_id && p.fields.campaign_type == campaign_type)
            .count();
        if used_by_others as u64 + 1 > total as u64 {
            return Err(Error::CapacityExceeded(format!(
                "{:?} allocation is full ({} of {} used)",
                campaign_type.unwrap_or(CampaignType::Standard),
                used_by_others,
                total
            )));
        }
        Ok(())
    }

    pub fn delete_plan(&mut self, title_id: &str, actor: &str) -> Result<Plan> {
        let index = self
            .plans
            .iter()
            .position(|p| p.title_id == title_id)
            .ok_or_else(|| Error::NotFound(format!("plan for title {}", title_id)))?;
        let removed = self.plans.remove(index);

        let title_name = self
            .title(title_id)
            .map(|t| t.fields.title.clone())
            .unwrap_or_else(|| title_id.to_string());
        self.record_activity(
            format!("{} deleted marketing plan for \"{}\"", actor, title_name),
            actor,
        );
        self.touch();
        Ok(removed)
    }

    /// Zero totals fall back to the defaults
    pub fn set_allocation(&mut self, allocation: Allocation, actor: &str) -> Allocation {
        self.allocation = allocation.or_defaults();
        self.record_activity(format!("{} updated campaign allocation limits", actor), actor);
        self.touch();
        self.allocation
    }

    /// Usage derived from the live plan list
    pub fn allocation_usage(&self) -> AllocationUsage {
        let count = |kind: CampaignType| {
            self.plans
                .iter()
                .filter(|p| p.fields.campaign_type == Some(kind))
                .count()
        };
        AllocationUsage {
            marquee: CampaignUsage::new(count(CampaignType::Marquee), self.allocation.marquee_total),
            blockbuster: CampaignUsage::new(
                count(CampaignType::Blockbuster),
                self.allocation.blockbuster_total,
            ),
        }
    }

    // ---- activity ----

    /// Prepend an entry, trimming to the cap; `None` while the feed is paused
    pub fn record_activity(&mut self, message: impl Into<String>, actor: &str) -> Option<Activity> {
        if self.activity_paused {
            return None;
        }
        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            message: message.into(),
            user: actor.to_string(),
            timestamp: time::now(),
            kind: ACTIVITY_KIND_USER_ACTION.to_string(),
        };
        self.activities.insert(0, activity.clone());
        self.activities.truncate(self.options.activity_cap);
        self.touch();
        Some(activity)
    }

    pub fn set_activity_paused(&mut self, paused: bool) {
        self.activity_paused = paused;
    }

    pub fn clear_activities(&mut self) -> usize {
        let cleared = self.activities.len();
        self.activities.clear();
        self.touch();
        cleared
    }

    // ---- chat ----

    pub fn append_chat(&mut self, message: ChatMessage) {
        self.chat_history.push(message);
        self.touch();
    }

    pub fn clear_chat(&mut self) {
        self.chat_history.clear();
        self.touch();
    }

    // ---- summaries ----

    pub fn dashboard(&self) -> Dashboard {
        let mut team_members: Vec<String> = Vec::new();
        for activity in &self.activities {
            if !activity.user.is_empty() && !team_members.contains(&activity.user) {
                team_members.push(activity.user.clone());
            }
        }

        let priority_titles = self
            .ranked_titles()
            .into_iter()
            .filter(|t| t.fields.priority == Some(Priority::High))
            .take(5)
            .cloned()
            .collect();

        Dashboard {
            total_titles: self.titles.len(),
            high_priority: self
                .titles
                .iter()
                .filter(|t| t.fields.priority == Some(Priority::High))
                .count(),
            with_plans: self.plans.len(),
            allocation: self.allocation_usage(),
            recent_activity: self.activities.iter().take(5).cloned().collect(),
            team_members,
            priority_titles,
        }
    }

    // ---- whole-board state ----

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            titles: self.titles.clone(),
            plans: self.plans.clone(),
            activities: self.activities.clone(),
            allocation: self.allocation,
            chat_history: self.chat_history.clone(),
        }
    }

    /// Overwrite all state (snapshot load or remote sync)
    ///
    /// Derived title fields are recomputed, the feed is trimmed to the cap,
    /// duplicate plans collapse to the last one per title and plans whose
    /// title is gone are dropped.
    pub fn replace_with(&mut self, snapshot: BoardSnapshot, last_update: i64) {
        let BoardSnapshot {
            mut titles,
            plans,
            mut activities,
            allocation,
            chat_history,
        } = snapshot;

        for title in &mut titles {
            self.score(title);
        }

        let known: HashSet<&str> = titles.iter().map(|t| t.id.as_str()).collect();
        let mut kept: Vec<Plan> = Vec::with_capacity(plans.len());
        for plan in plans {
            if !known.contains(plan.title_id.as_str()) {
                debug!("Dropping plan for missing title {}", plan.title_id);
                continue;
            }
            match kept.iter_mut().find(|p| p.title_id == plan.title_id) {
                Some(existing) => *existing = plan,
                None => kept.push(plan),
            }
        }

        activities.truncate(self.options.activity_cap);

        self.titles = titles;
        self.plans = kept;
        self.activities = activities;
        self.allocation = allocation.or_defaults();
        self.chat_history = chat_history;
        self.last_update = last_update;
    }
}
