use crate::models::{Book, Item, ItemKind};
use serde::Serialize;
use tera::{Context, Tera};

const SEPARATOR: &str = "\n=== === ===\n";
const CLIPPING_END: &str = "==========";
const CSV_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const KINDLE_TIMESTAMP: &str = "%A, %-d %B %Y %H:%M:%S";
const EMAIL_TEMPLATE: &str = include_str!("templates/email.html");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Csv,
    Kindle,
    Raw,
}

#[derive(Debug)]
pub enum FormatError {
    Csv(String),
    Template(String),
}

#[derive(Serialize)]
struct HtmlItem<'a> {
    title: &'a str,
    author: &'a str,
    text: &'a str,
    note: Option<&'a str>,
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::Csv(e) => write!(f, "Failed to write CSV: {}", e),
            FormatError::Template(e) => write!(f, "Failed to render template: {}", e),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<csv::Error> for FormatError {
    fn from(e: csv::Error) -> Self {
        FormatError::Csv(e.to_string())
    }
}

impl From<tera::Error> for FormatError {
    fn from(e: tera::Error) -> Self {
        FormatError::Template(e.to_string())
    }
}

pub fn render(items: &[Item], format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Human => Ok(human(items)),
        OutputFormat::Csv => csv(items),
        OutputFormat::Kindle => Ok(kindle(items)),
        OutputFormat::Raw => Ok(raw(items)),
    }
}

pub fn human(items: &[Item]) -> String {
    items
        .iter()
        .map(|item| format!("{}\n", human_item(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn human_item(item: &Item) -> String {
    let mut lines = vec![
        format!("Type:           {}", item.kind),
        format!("Title:          {}", item.display_title()),
        format!("Author:         {}", item.display_author()),
        format!("Date created:   {}", item.date_created.format(CSV_TIMESTAMP)),
    ];
    if item.kind == ItemKind::Annotation {
        lines.push(format!("Annotation:{}{}{}", SEPARATOR, item.annotation(), SEPARATOR));
    }
    lines.push(format!("Reference text:{}{}{}", SEPARATOR, item.text(), SEPARATOR));
    lines.join("\n")
}

pub fn csv(items: &[Item]) -> Result<String, FormatError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for item in items {
        let created = item.date_created.format(CSV_TIMESTAMP).to_string();
        let modified = item.date_modified.format(CSV_TIMESTAMP).to_string();
        writer.write_record([
            item.kind.as_str(),
            item.display_title(),
            item.display_author(),
            created.as_str(),
            modified.as_str(),
            item.annotation(),
            item.text(),
        ])?;
    }
    into_string(writer)
}

/// Kindle "My Clippings.txt". Kobo has no page numbers, so page and
/// location are always 1.
pub fn kindle(items: &[Item]) -> String {
    items
        .iter()
        .map(kindle_clipping)
        .collect::<Vec<_>>()
        .join("\n")
}

fn kindle_clipping(item: &Item) -> String {
    let date = item.date_created.format(KINDLE_TIMESTAMP);
    let (label, body) = match item.kind {
        ItemKind::Annotation => ("Note", item.annotation()),
        ItemKind::Highlight => ("Highlight", item.text()),
        ItemKind::Bookmark => ("Bookmark", ""),
    };

    [
        format!("{} ({})", item.display_title(), item.display_author()),
        format!("- Your {} on page 1 | location 1 | Added on {}", label, date),
        String::new(),
        body.to_string(),
        CLIPPING_END.to_string(),
    ]
    .join("\n")
}

pub fn raw(items: &[Item]) -> String {
    items
        .iter()
        .map(|item| format!("{}\n", item.text()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// HTML alternative for the email body. Values are autoescaped.
pub fn html(items: &[Item]) -> Result<String, FormatError> {
    let views: Vec<HtmlItem<'_>> = items
        .iter()
        .map(|item| HtmlItem {
            title: item.display_title(),
            author: item.display_author(),
            text: item.text(),
            note: (item.kind == ItemKind::Annotation).then(|| item.annotation()),
        })
        .collect();

    let mut context = Context::new();
    context.insert("items", &views);
    Ok(Tera::one_off(EMAIL_TEMPLATE, &context, true)?)
}

/// Numbered book list; the ids are the ones `--bookid` accepts.
pub fn book_list(books: &[Book], as_csv: bool) -> Result<String, FormatError> {
    let rows = books
        .iter()
        .enumerate()
        .map(|(i, b)| ((i + 1).to_string(), b.display_title(), b.display_author()));

    if as_csv {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["ID", "TITLE", "AUTHOR"])?;
        for (id, title, author) in rows {
            writer.write_record([id.as_str(), title, author])?;
        }
        return into_string(writer);
    }

    let mut lines = vec!["ID\tTITLE\tAUTHOR".to_string()];
    lines.extend(rows.map(|(id, title, author)| format!("{}\t{}\t{}", id, title, author)));
    Ok(lines.join("\n"))
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String, FormatError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| FormatError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| FormatError::Csv(e.to_string()))
}
