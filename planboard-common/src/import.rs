//! Spreadsheet import
//!
//! Callers export the first sheet of a workbook to CSV; this module maps its
//! columns onto title fields. Columns A, J and K are positional (catalog id,
//! PR, imprint). Every other column is matched by header substring, most
//! specific pattern first, so `sales_tier` is not mistaken for a priority
//! column and `pub_quarter` is not mistaken for a date.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{parse_count, parse_iso_date, Rating, TitleFields};
use crate::{Error, Result};

/// Release date used when a row has none or it cannot be read
pub const DEFAULT_RELEASE_DATE: (i32, u32, u32) = (2026, 1, 1);

const DEFAULT_STATUS: &str = "In Development";
const DEFAULT_GENRE: &str = "Fiction";
const DEFAULT_SALES_TIER: &str = "Tier 4";
const DEFAULT_IMPRINT: &str = "Random House";
const DEFAULT_SELECTION_STRATEGY: &str = "Data-Driven";
const DEFAULT_REGION: &str = "US";

/// Outcome counts of one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    /// Rows matching an existing title (or an earlier row) by title+author
    pub duplicates: usize,
    /// Rows without a title or author
    pub dropped: usize,
}

/// Rows that survived parsing, ready for [`crate::board::Board::import_titles`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub rows: Vec<TitleFields>,
    pub dropped: usize,
}

/// Target field for a spreadsheet column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    TitleId,
    Title,
    AuthorFirst,
    AuthorLast,
    Author,
    Asin,
    Status,
    SalesTier,
    PriorTier,
    Priority,
    Quarter,
    ReleaseDate,
    Genre,
    EditorialReason,
    Editor,
    Amm,
    SelectionStrategy,
    Region,
    Audio,
    Video,
    Social,
    ExpectedSales,
    Pr,
    Imprint,
    Ignored,
}

fn classify(index: usize, header: &str) -> Column {
    match index {
        0 => return Column::TitleId,
        9 => return Column::Pr,
        10 => return Column::Imprint,
        _ => {}
    }

    let has = |needles: &[&str]| needles.iter().any(|needle| header.contains(needle));

    if has(&["title_id", "titleid"]) {
        Column::TitleId
    } else if has(&["title", "book"]) {
        Column::Title
    } else if has(&["author_first"]) {
        Column::AuthorFirst
    } else if has(&["author_last"]) {
        Column::AuthorLast
    } else if has(&["author", "writer"]) {
        Column::Author
    } else if has(&["asin"]) {
        Column::Asin
    } else if has(&["status"]) {
        Column::Status
    } else if has(&["sales_tier", "salestier"]) {
        Column::SalesTier
    } else if has(&["prior_tier", "prior tier", "prior year", "2025 tier"]) {
        Column::PriorTier
    } else if has(&["priority", "tier"]) {
        Column::Priority
    } else if has(&["quarter"]) {
        Column::Quarter
    } else if has(&["date", "release", "pub"]) {
        Column::ReleaseDate
    } else if has(&["genre", "category"]) {
        Column::Genre
    } else if has(&["reason"]) {
        Column::EditorialReason
    } else if has(&["editor"]) {
        Column::Editor
    } else if has(&["amm"]) {
        Column::Amm
    } else if has(&["selection", "strategy"]) {
        Column::SelectionStrategy
    } else if has(&["region", "market"]) {
        Column::Region
    } else if has(&["audio"]) {
        Column::Audio
    } else if has(&["video"]) {
        Column::Video
    } else if has(&["social", "following"]) {
        Column::Social
    } else if has(&["sales", "expected"]) {
        Column::ExpectedSales
    } else {
        Column::Ignored
    }
}

/// Parse CSV text into title rows
///
/// The first line is the header. Rows lacking a title or an author are
/// counted in [`Sheet::dropped`]; duplicates are resolved later against the
/// board.
pub fn parse_sheet(text: &str) -> Result<Sheet> {
    let text = text.trim_start_matches('\u{feff}');
    let mut records = parse_csv_records(text).into_iter();

    let header = records
        .next()
        .ok_or_else(|| Error::InvalidInput("CSV is empty".to_string()))?;
    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(index, header)| classify(index, &header.trim().to_lowercase()))
        .collect();

    let mut sheet = Sheet::default();
    for values in records {
        match row_to_fields(&columns, &values) {
            Some(fields) => sheet.rows.push(fields),
            None => sheet.dropped += 1,
        }
    }
    Ok(sheet)
}

fn row_to_fields(columns: &[Column], values: &[String]) -> Option<TitleFields> {
    let mut fields = TitleFields::default();
    let mut author_first = String::new();
    let mut author_last = String::new();
    let mut release_date = None;

    for (column, value) in columns.iter().zip(values) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let text = value.to_string();
        match column {
            Column::TitleId => fields.title_id = text,
            Column::Title => fields.title = text,
            Column::AuthorFirst => author_first = text,
            Column::AuthorLast => author_last = text,
            Column::Author => fields.author = text,
            Column::Asin => fields.asin = text,
            Column::Status => fields.status = text,
            Column::SalesTier => fields.sales_tier = text,
            Column::PriorTier => fields.prior_tier = value.parse().ok(),
            Column::Priority => fields.priority = value.parse().ok(),
            Column::Quarter => fields.pub_quarter = text,
            Column::ReleaseDate => release_date = parse_sheet_date(value),
            Column::Genre => fields.genre = text,
            Column::EditorialReason => fields.editorial_reason = text,
            Column::Editor => fields.editor = text,
            Column::Amm => fields.amm = text,
            Column::SelectionStrategy => fields.selection_strategy = text,
            Column::Region => fields.region = text,
            Column::Audio => fields.audio_success = Rating::parse(value),
            Column::Video => fields.video_comfort = Rating::parse(value),
            Column::Social => fields.social_following = parse_count(value),
            Column::ExpectedSales => fields.expected_sales = parse_count(value),
            Column::Pr => fields.pr = text,
            Column::Imprint => fields.imprint = text,
            Column::Ignored => {}
        }
    }

    if !author_first.is_empty() && !author_last.is_empty() {
        fields.author = format!("{} {}", author_first, author_last);
    }
    if fields.title.is_empty() || fields.author.is_empty() {
        return None;
    }

    let (y, m, d) = DEFAULT_RELEASE_DATE;
    fields.release_date = release_date.or_else(|| NaiveDate::from_ymd_opt(y, m, d));
    fill_default(&mut fields.status, DEFAULT_STATUS);
    fill_default(&mut fields.genre, DEFAULT_GENRE);
    fill_default(&mut fields.sales_tier, DEFAULT_SALES_TIER);
    fill_default(&mut fields.imprint, DEFAULT_IMPRINT);
    fill_default(&mut fields.selection_strategy, DEFAULT_SELECTION_STRATEGY);
    fill_default(&mut fields.region, DEFAULT_REGION);
    Some(fields)
}

fn fill_default(field: &mut String, default: &str) {
    if field.is_empty() {
        *field = default.to_string();
    }
}

/// ISO `YYYY-MM-DD`, US `MM/DD/YYYY`, or a spreadsheet serial day number
pub fn parse_sheet_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Some(date) = parse_iso_date(value) {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%m/%d/%Y") {
        return Some(date);
    }
    // Serial days count from 1899-12-30 (the 1900 leap-year quirk is folded in)
    let serial: f64 = value.parse().ok()?;
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Split CSV text into records
///
/// Double-quoted fields may hold commas, `""` escapes and line breaks.
/// Blank lines produce no record.
fn parse_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut current)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => end_record(&mut records, &mut record, &mut current),
            _ => current.push(ch),
        }
    }
    end_record(&mut records, &mut record, &mut current);
    records
}

fn end_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, current: &mut String) {
    record.push(std::mem::take(current));
    let fields = std::mem::take(record);
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        records.push(fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketingTier, Priority};

    const HEADER: &str = "Title ID,Book Title,Author,ASIN,Status,Release Date,Genre,Priority,Audio Success,PR Contact,Imprint,Social Following,Expected Sales";

    #[test]
    fn test_classify_order() {
        assert_eq!(classify(0, "anything"), Column::TitleId);
        assert_eq!(classify(9, "genre"), Column::Pr);
        assert_eq!(classify(10, "status"), Column::Imprint);
        assert_eq!(classify(3, "title_id"), Column::TitleId);
        assert_eq!(classify(3, "book name"), Column::Title);
        assert_eq!(classify(3, "author_first"), Column::AuthorFirst);
        assert_eq!(classify(3, "sales_tier"), Column::SalesTier);
        assert_eq!(classify(3, "prior year tier"), Column::PriorTier);
        assert_eq!(classify(3, "marketing tier"), Column::Priority);
        assert_eq!(classify(3, "pub_quarter"), Column::Quarter);
        assert_eq!(classify(3, "pub date"), Column::ReleaseDate);
        assert_eq!(classify(3, "editorial reason"), Column::EditorialReason);
        assert_eq!(classify(3, "editor"), Column::Editor);
        assert_eq!(classify(3, "target market"), Column::Region);
        assert_eq!(classify(3, "expected sales"), Column::ExpectedSales);
        assert_eq!(classify(3, "notes"), Column::Ignored);
    }

    #[test]
    fn test_parse_sheet_maps_columns_and_defaults() {
        let csv = format!(
            "{}\nT-100,\"Fourth Wing, Deluxe\",Rebecca Yarros,B0ABC,,03/15/2026,Romantasy,high,High,Jane PR,,\"1,200,000\",\n",
            HEADER
        );
        let sheet = parse_sheet(&csv).unwrap();
        assert_eq!(sheet.dropped, 0);
        assert_eq!(sheet.rows.len(), 1);

        let row = &sheet.rows[0];
        assert_eq!(row.title_id, "T-100");
        assert_eq!(row.title, "Fourth Wing, Deluxe");
        assert_eq!(row.author, "Rebecca Yarros");
        assert_eq!(row.release_date, NaiveDate::from_ymd_opt(2026, 3, 15));
        assert_eq!(row.priority, Some(Priority::High));
        assert_eq!(row.audio_success, Rating::High);
        assert_eq!(row.pr, "Jane PR");
        assert_eq!(row.social_following, 1_200_000);
        assert_eq!(row.status, "In Development");
        assert_eq!(row.imprint, "Random House");
        assert_eq!(row.sales_tier, "Tier 4");
        assert_eq!(row.selection_strategy, "Data-Driven");
        assert_eq!(row.region, "US");
        assert_eq!(row.video_comfort, Rating::None);
    }

    #[test]
    fn test_rows_without_author_are_dropped() {
        let csv = format!("{}\nT-1,Lonely Book,,,,,,,,,,,\nT-2,Fine Book,Writer,,,,,,,,,,\n", HEADER);
        let sheet = parse_sheet(&csv).unwrap();
        assert_eq!(sheet.dropped, 1);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].title, "Fine Book");
    }

    #[test]
    fn test_author_first_last_combined() {
        let csv = "id,title,author_first,author_last,prior_tier\n1,Book,Ada,Lovelace,Marquee Me\n";
        let sheet = parse_sheet(csv).unwrap();
        assert_eq!(sheet.rows[0].author, "Ada Lovelace");
        assert_eq!(sheet.rows[0].prior_tier, Some(MarketingTier::MarqueeMe));
        // Missing date falls back
        assert_eq!(sheet.rows[0].release_date, NaiveDate::from_ymd_opt(2026, 1, 1));
    }

    #[test]
    fn test_parse_sheet_date_formats() {
        assert_eq!(parse_sheet_date("2026-07-04"), NaiveDate::from_ymd_opt(2026, 7, 4));
        assert_eq!(parse_sheet_date("7/4/2026"), NaiveDate::from_ymd_opt(2026, 7, 4));
        assert_eq!(parse_sheet_date("46022"), NaiveDate::from_ymd_opt(2025, 12, 31));
        assert_eq!(parse_sheet_date("next spring"), None);
        assert_eq!(parse_sheet_date("-5"), None);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(parse_sheet(""), Err(Error::InvalidInput(_))));
        let header_only = parse_sheet("title,author\n").unwrap();
        assert!(header_only.rows.is_empty());
    }

    #[test]
    fn test_parse_csv_records_quotes() {
        assert_eq!(
            parse_csv_records(r#"a,"b,c","say ""hi""",,d"#),
            vec![vec!["a", "b,c", "say \"hi\"", "", "d"]]
        );
    }

    #[test]
    fn test_parse_csv_records_line_breaks() {
        let records = parse_csv_records("a,b\r\n\r\n\"one\ntwo\",c\n");
        assert_eq!(records, vec![vec!["a", "b"], vec!["one\ntwo", "c"]]);
    }

    #[test]
    fn test_quoted_cell_spanning_lines_stays_in_its_row() {
        let csv = "Title ID,Title,Author,Editorial Reason\n\
                   1,Book One,Ann,\"line one\nline two\"\n\
                   2,Book Two,Bea,short\n";
        let sheet = parse_sheet(csv).unwrap();

        assert_eq!(sheet.dropped, 0);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].editorial_reason, "line one\nline two");
        assert_eq!(sheet.rows[1].title, "Book Two");
    }
}
