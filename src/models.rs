use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const UNKNOWN_TITLE: &str = "Untitled";

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub volume_id: String,
    pub book_title: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl Book {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }

    pub fn display_author(&self) -> &str {
        self.author.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Annotation,
    Bookmark,
    Highlight,
}

impl ItemKind {
    /// Kobo stores all three in the same `Bookmark` table; the kind follows
    /// from which of text and annotation are present.
    pub fn classify(text: Option<&str>, annotation: Option<&str>) -> Self {
        let has_text = text.is_some_and(|t| !t.is_empty());
        let has_annotation = annotation.is_some_and(|a| !a.is_empty());

        match (has_text, has_annotation) {
            (true, true) => ItemKind::Annotation,
            (true, false) => ItemKind::Highlight,
            _ => ItemKind::Bookmark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Annotation => "annotation",
            ItemKind::Bookmark => "bookmark",
            ItemKind::Highlight => "highlight",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub volume_id: String,
    pub text: Option<String>,
    pub annotation: Option<String>,
    pub date_created: NaiveDateTime,
    pub date_modified: NaiveDateTime,
    pub book_title: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub kind: ItemKind,
}

impl Item {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn annotation(&self) -> &str {
        self.annotation.as_deref().unwrap_or("")
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }

    pub fn display_author(&self) -> &str {
        self.author.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }

    /// Highlights and annotations; bookmarks carry no text worth exporting.
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

pub fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Parses a Kobo timestamp, e.g. `2014-12-19T19:54:11.000` or
/// `2021-03-04T12:00:00Z`. Anything else maps to the epoch.
pub fn parse_kobo_datetime(raw: Option<&str>) -> NaiveDateTime {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return epoch();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.naive_utc();
    }

    let trimmed = raw.trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .unwrap_or_else(epoch)
}
