use crate::config::Config;
use crate::db::{self, DbError};
use crate::email::{self, EmailError};
use crate::format::{self, FormatError};
use crate::models::Book;
use crate::notion::{NotionClient, NotionError};
use crate::prompt::{self, PromptError};
use crate::select::{self, SelectError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{BufRead, Write};
use tracing::{info, warn};

#[derive(Debug)]
pub enum AppError {
    Db(DbError),
    Select(SelectError),
    Format(FormatError),
    Prompt(PromptError),
    Email(EmailError),
    Notion(NotionError),
    Output(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "{}", e),
            AppError::Select(e) => write!(f, "{}", e),
            AppError::Format(e) => write!(f, "{}", e),
            AppError::Prompt(e) => write!(f, "{}", e),
            AppError::Email(e) => write!(f, "{}", e),
            AppError::Notion(e) => write!(f, "{}", e),
            AppError::Output(e) => write!(f, "Unable to write output: {}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        AppError::Db(e)
    }
}

impl From<SelectError> for AppError {
    fn from(e: SelectError) -> Self {
        AppError::Select(e)
    }
}

impl From<FormatError> for AppError {
    fn from(e: FormatError) -> Self {
        AppError::Format(e)
    }
}

impl From<PromptError> for AppError {
    fn from(e: PromptError) -> Self {
        AppError::Prompt(e)
    }
}

impl From<EmailError> for AppError {
    fn from(e: EmailError) -> Self {
        AppError::Email(e)
    }
}

impl From<NotionError> for AppError {
    fn from(e: NotionError) -> Self {
        AppError::Notion(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Output(e.to_string())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub books: usize,
    pub selected: usize,
    pub written: usize,
    pub emailed: bool,
    pub exported: usize,
}

/// One export run. `input` answers the book prompt; `output` receives
/// everything not written to `--output`.
pub fn run<R: BufRead, W: Write>(
    config: &Config,
    input: &mut R,
    output: &mut W,
) -> Result<RunSummary, AppError> {
    let conn = db::open(&config.database_path)?;
    let books = db::read_books(&conn)?;
    let mut summary = RunSummary {
        books: books.len(),
        ..RunSummary::default()
    };

    if config.list {
        let listing = format::book_list(&books, config.list_as_csv)?;
        write_output(config, output, &listing)?;
        summary.written = books.len();
        print_info(config, output, &summary)?;
        return Ok(summary);
    }

    let items = db::read_items(&conn)?;
    let selected = select::apply(items, &books, &config.filter)?;
    summary.selected = selected.len();

    if selected.is_empty() {
        warn!(filter = ?config.filter, "no highlights selected");
        writeln!(output, "No highlights found for {}", config.filter.book)?;
        print_info(config, output, &summary)?;
        return Ok(summary);
    }

    let shown = match config.sample {
        Some(n) => select::sample(&selected, n, &mut rng(config.seed)),
        None => selected.clone(),
    };
    summary.written = shown.len();

    let rendered = format::render(&shown, config.format)?;
    write_output(config, output, &rendered)?;

    if let Some(email_config) = &config.email {
        let message = email::build_message(email_config, format::human(&shown), format::html(&shown)?)?;
        email::send(email_config, &message)?;
        summary.emailed = true;
        info!(count = shown.len(), "emailed highlights");
    }

    if let Some(notion_config) = &config.notion {
        let book = target_book(config, &books, input, output)?;
        let for_book = select::items_for_book(&selected, book);
        let client = NotionClient::new(notion_config)?;
        summary.exported = client.export(book.display_title(), &for_book)?;
        writeln!(
            output,
            "Added {} highlights to the Notion page for {}",
            summary.exported,
            book.display_title()
        )?;
    }

    print_info(config, output, &summary)?;
    Ok(summary)
}

fn target_book<'a, R: BufRead, W: Write>(
    config: &Config,
    books: &'a [Book],
    input: &mut R,
    output: &mut W,
) -> Result<&'a Book, AppError> {
    match select::resolve_book(books, &config.filter.book)? {
        Some(book) => Ok(book),
        None => Ok(prompt::choose_book(books, input, output)?),
    }
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn write_output<W: Write>(config: &Config, output: &mut W, contents: &str) -> Result<(), AppError> {
    match &config.output {
        Some(path) => {
            std::fs::write(path, contents)
                .map_err(|e| AppError::Output(format!("{}: {}", path.display(), e)))?;
            info!(path = %path.display(), "wrote output file");
        }
        None => writeln!(output, "{}", contents)?,
    }
    Ok(())
}

fn print_info<W: Write>(config: &Config, output: &mut W, summary: &RunSummary) -> Result<(), AppError> {
    if !config.info {
        return Ok(());
    }

    writeln!(output)?;
    writeln!(output, "Books with annotations or highlights: {}", summary.books)?;
    if !config.list {
        writeln!(output, "Annotations and/or highlights:        {}", summary.selected)?;
    }
    Ok(())
}
