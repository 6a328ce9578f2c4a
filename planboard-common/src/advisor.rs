//! Rule-based planning assistant
//!
//! Routes a chat message by keyword and answers from live board statistics.
//! No model or network call is involved.

use chrono::Datelike;
use std::collections::BTreeMap;

use crate::board::Board;
use crate::models::{ChatMessage, ChatRole};
use crate::time;

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// Topic a message is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    MarketingTier,
    Social,
    Budget,
    Genre,
    Timing,
    General,
}

impl Topic {
    /// First matching rule wins
    pub fn route(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

        if has(&["marketing tier", "tier recommendation"]) {
            Topic::MarketingTier
        } else if has(&["social", "following"]) {
            Topic::Social
        } else if has(&["budget", "allocation"]) {
            Topic::Budget
        } else if has(&["genre", "category"]) {
            Topic::Genre
        } else if has(&["timing", "schedule"]) {
            Topic::Timing
        } else {
            Topic::General
        }
    }
}

/// Answer a user message from the board's current state
pub fn reply(board: &Board, message: &str) -> String {
    match Topic::route(message) {
        Topic::MarketingTier => tier_advice(board),
        Topic::Social => social_advice(board),
        Topic::Budget => budget_advice(board),
        Topic::Genre => genre_advice(board),
        Topic::Timing => timing_advice(board),
        Topic::General => general_advice(),
    }
}

/// The user's message and the assistant's reply, ready to append to history
pub fn exchange(board: &Board, message: &str) -> [ChatMessage; 2] {
    let question = ChatMessage {
        role: ChatRole::User,
        content: message.to_string(),
        timestamp: time::now(),
    };
    let answer = ChatMessage {
        role: ChatRole::Bot,
        content: reply(board, message),
        timestamp: time::now(),
    };
    [question, answer]
}

fn tier_advice(board: &Board) -> String {
    let usage = board.allocation_usage();
    format!(
        "You have {} Marquee and {} Blockbuster slots remaining.\n\n\
         - Marquee: authors with 500K+ followers, a proven track record or strong pre-orders\n\
         - Blockbuster: established authors with 100K+ followers or strong genre performance\n\
         - Standard: new or emerging authors and titles with a limited budget\n\n\
         Weigh audio performance, video comfort and the previous title's results too.",
        usage.marquee.remaining, usage.blockbuster.remaining
    )
}

fn social_advice(board: &Board) -> String {
    let titles = board.titles();
    let average = if titles.is_empty() {
        0
    } else {
        let total: u128 = titles.iter().map(|t| t.fields.social_following as u128).sum();
        (total as f64 / titles.len() as f64).round() as u64
    };
    format!(
        "Your titles average {} social followers.\n\n\
         - 500K+: lean on the existing audience with exclusives and live events\n\
         - 50K to 500K: engagement content, collaborations and targeted ads\n\
         - under 50K: community building and influencer partnerships\n\n\
         Check video comfort before planning short-form video campaigns.",
        group_thousands(average)
    )
}

fn budget_advice(board: &Board) -> String {
    let total: u64 = board
        .plans()
        .iter()
        .filter_map(|p| p.fields.budget)
        .fold(0u64, |sum, budget| sum.saturating_add(budget));
    format!(
        "Current total planned budget: ${}.\n\n\
         - Marquee campaigns: $50K to $150K\n\
         - Blockbuster campaigns: $20K to $50K\n\
         - Standard campaigns: $5K to $20K\n\n\
         A common split is 40% paid media, 30% influencer and PR, 20% content, 10% events.",
        group_thousands(total)
    )
}

fn genre_advice(board: &Board) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for title in board.titles() {
        if !title.fields.genre.is_empty() {
            *counts.entry(title.fields.genre.as_str()).or_default() += 1;
        }
    }
    // Highest count; alphabetical order breaks ties
    let top = counts
        .iter()
        .fold(None::<(&str, usize)>, |best, (&genre, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((genre, count)),
        });

    match top {
        Some((genre, count)) => format!(
            "Your most common genre is {} with {} titles.\n\n\
             Match the channel to the readership: BookTok and visual platforms for romance, \
             book clubs for fiction, interest communities for non-fiction, serialized teasers \
             for mystery.",
            genre, count
        ),
        None => "No genres recorded yet. Add titles with a genre to get genre-specific advice."
            .to_string(),
    }
}

fn timing_advice(board: &Board) -> String {
    let mut per_month = [0usize; 12];
    for date in board.titles().iter().filter_map(|t| t.fields.release_date) {
        per_month[date.month0() as usize] += 1;
    }
    let busiest = per_month
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .fold(None::<(usize, usize)>, |best, (month, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((month, count)),
        });

    let headline = match busiest {
        Some((month, count)) => format!("{} is your busiest release month with {} titles.", MONTHS[month], count),
        None => "No release dates recorded yet.".to_string(),
    };
    format!(
        "{}\n\n\
         - Spring: romance and lighter fiction\n\
         - Summer: beach reads and young adult\n\
         - Fall: literary fiction, book club picks and gift books\n\
         - Winter: cozy reads and New Year non-fiction\n\n\
         Avoid stacking high-priority titles in the same month.",
        headline
    )
}

fn general_advice() -> String {
    "I can help with marketing tier recommendations, budget allocation, social media \
     strategy, genre approaches and release timing. What would you like to look at?"
        .to_string()
}

/// `1234567` -> `1,234,567`
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardOptions;
    use crate::models::{CampaignType, PlanFields, TitleFields};
    use crate::scoring::{AuthorDirectory, ScoringConfig};
    use chrono::NaiveDate;

    fn board_with_titles() -> Board {
        let mut board = Board::new(BoardOptions::default(), ScoringConfig::default(), AuthorDirectory::default());
        for (title, genre, social, month) in [
            ("A", "Romance", 100_000, 3),
            ("B", "Romance", 200_000, 3),
            ("C", "Mystery", 0, 9),
        ] {
            board
                .create_title(
                    TitleFields {
                        title: title.to_string(),
                        author: "W".to_string(),
                        genre: genre.to_string(),
                        social_following: social,
                        release_date: NaiveDate::from_ymd_opt(2026, month, 1),
                        ..Default::default()
                    },
                    "u",
                )
                .unwrap();
        }
        board
    }

    #[test]
    fn test_routing() {
        assert_eq!(Topic::route("Any TIER RECOMMENDATION?"), Topic::MarketingTier);
        assert_eq!(Topic::route("how big is their following"), Topic::Social);
        assert_eq!(Topic::route("what about budget"), Topic::Budget);
        assert_eq!(Topic::route("best category?"), Topic::Genre);
        assert_eq!(Topic::route("release schedule"), Topic::Timing);
        assert_eq!(Topic::route("hello"), Topic::General);
        // Earlier rules take precedence
        assert_eq!(Topic::route("social budget"), Topic::Social);
    }

    #[test]
    fn test_replies_use_board_statistics() {
        let mut board = board_with_titles();
        let id = board.titles()[0].id.clone();
        board
            .upsert_plan(
                &id,
                PlanFields {
                    campaign_type: Some(CampaignType::Marquee),
                    budget: Some(125_000),
                    ..Default::default()
                },
                "u",
            )
            .unwrap();

        assert!(reply(&board, "marketing tier").contains("11 Marquee and 6 Blockbuster"));
        assert!(reply(&board, "social").contains("100,000"));
        assert!(reply(&board, "budget").contains("$125,000"));
        assert!(reply(&board, "genre").contains("Romance with 2 titles"));
        assert!(reply(&board, "timing").contains("March is your busiest release month with 2 titles"));
    }

    #[test]
    fn test_replies_on_empty_board() {
        let board = Board::new(BoardOptions::default(), ScoringConfig::default(), AuthorDirectory::default());
        assert!(reply(&board, "social").contains("average 0 social"));
        assert!(reply(&board, "genre").starts_with("No genres"));
        assert!(reply(&board, "timing").starts_with("No release dates"));
    }

    #[test]
    fn test_exchange_roles() {
        let board = board_with_titles();
        let [question, answer] = exchange(&board, "hi");
        assert_eq!(question.role, ChatRole::User);
        assert_eq!(answer.role, ChatRole::Bot);
        assert!(answer.content.starts_with("I can help"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
