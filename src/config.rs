use crate::format::OutputFormat;
use crate::select::{BookSelector, ItemFilter, KindFilter, ISBN_SENTINEL};
use clap::Parser;
use lettre::message::Mailbox;
use std::path::PathBuf;

const DEFAULT_DATABASE_PATH: &str = "/Volumes/KOBOeReader/.kobo/KoboReader.sqlite";
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SUBJECT: &str = "每日 Kobo 劃記摘要";
const DEFAULT_NOTION_API_URL: &str = "https://api.notion.com/v1";
const DEFAULT_NOTION_TITLE_PROPERTY: &str = "title";
pub const DEFAULT_EMAIL_SAMPLE: usize = 5;

#[derive(Parser, Debug, Default)]
#[command(name = "kobo-highlights")]
#[command(about = "Export annotations and highlights from a Kobo SQLite file")]
pub struct CliArgs {
    /// Path of the input KoboReader.sqlite file
    pub db: Option<PathBuf>,

    /// Write to this file instead of the standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output in CSV format
    #[arg(long)]
    pub csv: bool,

    /// Output in Kindle "My Clippings.txt" format
    #[arg(long)]
    pub kindle: bool,

    /// Output the highlighted text only
    #[arg(long)]
    pub raw: bool,

    /// List the books with annotations or highlights
    #[arg(long)]
    pub list: bool,

    /// Print the number of books and items found
    #[arg(long)]
    pub info: bool,

    /// Only items from the book with this exact title
    #[arg(long)]
    pub book: Option<String>,

    /// Only items from the book with this id (see --list)
    #[arg(long)]
    pub bookid: Option<usize>,

    /// Only items from the book with this ISBN ("0" selects every book)
    #[arg(long, default_value = ISBN_SENTINEL)]
    pub isbn: String,

    /// Highlights only, excluding annotations
    #[arg(long)]
    pub highlights_only: bool,

    /// Annotations only, excluding highlights
    #[arg(long)]
    pub annotations_only: bool,

    /// Randomly sample N items from the selection
    #[arg(short, long)]
    pub sample: Option<usize>,

    /// Seed for the random sample
    #[arg(long)]
    pub seed: Option<u64>,

    /// Email the selection (a sample of 5 unless --sample is given)
    #[arg(long)]
    pub email: bool,

    /// Export the selected book's highlights to its Notion page
    #[arg(long)]
    pub export: bool,

    /// Load credentials from this file instead of ./.env
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    pub sender: Mailbox,
    pub password: String,
    pub receiver: Mailbox,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub title_property: String,
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub list: bool,
    pub list_as_csv: bool,
    pub info: bool,
    pub filter: ItemFilter,
    pub sample: Option<usize>,
    pub seed: Option<u64>,
    pub email: Option<EmailConfig>,
    pub notion: Option<NotionConfig>,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    MutuallyExclusiveFlags(&'static str),
    InvalidSampleSize,
    MissingEnv(&'static str),
    InvalidEnv { key: &'static str, reason: String },
    EnvFile { path: PathBuf, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MutuallyExclusiveFlags(flags) => {
                write!(f, "Use only one of {}", flags)
            }
            ConfigError::InvalidSampleSize => write!(f, "--sample must be at least 1"),
            ConfigError::MissingEnv(key) => {
                write!(f, "Missing {}: set it in the environment or the .env file", key)
            }
            ConfigError::InvalidEnv { key, reason } => write!(f, "Invalid {}: {}", key, reason),
            ConfigError::EnvFile { path, reason } => {
                write!(f, "Failed to load {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        match &cli.env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            }
            None => {
                let _ = dotenvy::dotenv();
            }
        }

        Self::from_args(cli, |key| std::env::var(key).ok())
    }

    /// Validates everything up front so a bad setup fails before any
    /// database read or network call.
    pub fn from_args<F>(cli: CliArgs, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = resolve_format(&cli)?;
        let filter = resolve_filter(&cli)?;

        if cli.list && (cli.email || cli.export) {
            return Err(ConfigError::MutuallyExclusiveFlags("--list, --email/--export"));
        }

        if cli.sample == Some(0) {
            return Err(ConfigError::InvalidSampleSize);
        }

        let sample = cli
            .sample
            .or_else(|| cli.email.then_some(DEFAULT_EMAIL_SAMPLE));

        let email = if cli.email {
            Some(EmailConfig::from_env(&env)?)
        } else {
            None
        };

        let notion = if cli.export {
            Some(NotionConfig::from_env(&env)?)
        } else {
            None
        };

        let database_path = cli
            .db
            .or_else(|| env("KOBO_DATABASE_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        Ok(Config {
            database_path,
            output: cli.output,
            format,
            list: cli.list,
            list_as_csv: cli.csv,
            info: cli.info,
            filter,
            sample,
            seed: cli.seed,
            email,
            notion,
        })
    }
}

impl EmailConfig {
    pub fn from_env<F>(env: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sender = parse_mailbox("SENDER_EMAIL", &required(env, "SENDER_EMAIL")?)?;
        let password = required(env, "APP_PASSWORD")?;
        let receiver = parse_mailbox("RECEIVER_EMAIL", &required(env, "RECEIVER_EMAIL")?)?;

        let smtp_port = match optional(env, "SMTP_PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "SMTP_PORT",
                reason: format!("'{}' is not a port number", port),
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        Ok(EmailConfig {
            sender,
            password,
            receiver,
            smtp_host: optional(env, "SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port,
            subject: optional(env, "EMAIL_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        })
    }
}

impl NotionConfig {
    pub fn from_env<F>(env: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = optional(env, "NOTION_API_URL")
            .unwrap_or_else(|| DEFAULT_NOTION_API_URL.to_string());

        Ok(NotionConfig {
            token: required(env, "NOTION_TOKEN")?,
            database_id: required(env, "NOTION_DATABASE_ID")?,
            title_property: optional(env, "NOTION_TITLE_PROPERTY")
                .unwrap_or_else(|| DEFAULT_NOTION_TITLE_PROPERTY.to_string()),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

fn resolve_format(cli: &CliArgs) -> Result<OutputFormat, ConfigError> {
    // --csv doubles as the book list format
    let csv_format = cli.csv && !cli.list;

    match (csv_format, cli.kindle, cli.raw) {
        (false, false, false) => Ok(OutputFormat::Human),
        (true, false, false) => Ok(OutputFormat::Csv),
        (false, true, false) => Ok(OutputFormat::Kindle),
        (false, false, true) => Ok(OutputFormat::Raw),
        _ => Err(ConfigError::MutuallyExclusiveFlags("--csv, --kindle, --raw")),
    }
}

fn resolve_filter(cli: &CliArgs) -> Result<ItemFilter, ConfigError> {
    let by_isbn = BookSelector::from_isbn(&cli.isbn);
    let selectors = [
        cli.book.clone().map(BookSelector::Title),
        cli.bookid.map(BookSelector::Index),
        (!by_isbn.is_any()).then_some(by_isbn),
    ];

    let mut chosen = selectors.into_iter().flatten();
    let book = chosen.next().unwrap_or_default();
    if chosen.next().is_some() {
        return Err(ConfigError::MutuallyExclusiveFlags("--book, --bookid, --isbn"));
    }

    let kind = match (cli.highlights_only, cli.annotations_only) {
        (false, false) => KindFilter::All,
        (true, false) => KindFilter::HighlightsOnly,
        (false, true) => KindFilter::AnnotationsOnly,
        (true, true) => {
            return Err(ConfigError::MutuallyExclusiveFlags(
                "--highlights-only, --annotations-only",
            ))
        }
    };

    Ok(ItemFilter { book, kind })
}

fn optional<F>(env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(env: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(env, key).ok_or(ConfigError::MissingEnv(key))
}

fn parse_mailbox(key: &'static str, value: &str) -> Result<Mailbox, ConfigError> {
    value.parse().map_err(|e: lettre::address::AddressError| ConfigError::InvalidEnv {
        key,
        reason: e.to_string(),
    })
}
