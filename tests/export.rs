mod common;

use common::StubServer;
use kobo_highlights::app::{self, AppError, RunSummary};
use kobo_highlights::config::{CliArgs, Config, ConfigError};
use kobo_highlights::db::DbError;
use kobo_highlights::prompt::PromptError;
use rusqlite::{params, Connection};
use serde_json::json;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_kobo_db(dir: &Path) -> PathBuf {
    let path = dir.join("KoboReader.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE content (
            ContentID TEXT PRIMARY KEY,
            BookTitle TEXT,
            Title TEXT,
            Attribution TEXT,
            ISBN TEXT
        );
        CREATE TABLE Bookmark (
            BookmarkID TEXT PRIMARY KEY,
            VolumeID TEXT NOT NULL,
            Text TEXT,
            Annotation TEXT,
            DateCreated TEXT,
            DateModified TEXT
        );",
    )
    .unwrap();

    for (id, title, author, isbn) in [
        ("vol-dune", "Dune", "Frank Herbert", "9780441013593"),
        ("vol-walden", "Walden", "Henry David Thoreau", "9780691096124"),
    ] {
        conn.execute(
            "INSERT INTO content (ContentID, Title, Attribution, ISBN) VALUES (?1, ?2, ?3, ?4)",
            params![id, title, author, isbn],
        )
        .unwrap();
    }

    let bookmarks: [(&str, &str, Option<&str>, Option<&str>); 5] = [
        ("b1", "vol-dune", Some("Fear is the mind-killer."), None),
        ("b2", "vol-dune", Some("The spice must flow."), Some("Economy")),
        ("b3", "vol-dune", None, None),
        ("b4", "vol-walden", Some("Simplify, simplify."), None),
        ("b5", "vol-walden", Some("Heaven is under our feet."), None),
    ];
    for (id, volume, text, annotation) in bookmarks {
        conn.execute(
            "INSERT INTO Bookmark (BookmarkID, VolumeID, Text, Annotation, DateCreated, DateModified)
             VALUES (?1, ?2, ?3, ?4, '2020-05-01T10:00:00.000', NULL)",
            params![id, volume, text, annotation],
        )
        .unwrap();
    }

    path
}

fn cli(db: &Path) -> CliArgs {
    CliArgs {
        db: Some(db.to_path_buf()),
        isbn: "0".to_string(),
        ..CliArgs::default()
    }
}

fn config(cli: CliArgs) -> Config {
    Config::from_args(cli, |_| None).unwrap()
}

fn run(config: &Config) -> (Result<RunSummary, AppError>, String) {
    run_with_input(config, "")
}

fn run_with_input(config: &Config, input: &str) -> (Result<RunSummary, AppError>, String) {
    let mut output = Vec::new();
    let result = app::run(config, &mut Cursor::new(input), &mut output);
    (result, String::from_utf8(output).unwrap())
}

fn notion_stub() -> StubServer {
    StubServer::start(|req| {
        let results = match req.method.as_str() {
            "POST" => vec![json!({ "id": "page-walden" })],
            "GET" => vec![json!({
                "id": "h-walden",
                "type": "heading_3",
                "heading_3": { "rich_text": [{ "plain_text": "Highlights" }] }
            })],
            _ => vec![],
        };
        (200, json!({ "results": results, "has_more": false, "next_cursor": null }))
    })
}

fn export_config(cli: CliArgs, server: &StubServer) -> Config {
    let cli = CliArgs { export: true, ..cli };
    let api_url = server.url.clone();
    Config::from_args(cli, move |key| match key {
        "NOTION_TOKEN" => Some("secret".to_string()),
        "NOTION_DATABASE_ID" => Some("db".to_string()),
        "NOTION_API_URL" => Some(api_url.clone()),
        _ => None,
    })
    .unwrap()
}

#[test]
fn test_default_run_prints_every_highlight() {
    let dir = TempDir::new().unwrap();
    let db = create_kobo_db(dir.path());

    let (result, out) = run(&config(cli(&db)));

    let summary = result.unwrap();
    assert_eq!(summary.books, 2);
    assert_eq!(summary.selected, 4);
    assert_eq!(summary.written, 4);
    assert!(out.contains("Fear is the mind-killer."));
    assert!(out.contains("Annotation:\n=== === ===\nEconomy"));
    assert!(out.contains("Heaven is under our feet."));
}

#[test]
fn test_missing_database_is_reported() {
    let dir = TempDir::new().unwrap();

    let (result, _) = run(&config(cli(&dir.path().join("missing.sqlite"))));

    assert!(matches!(result, Err(AppError::Db(DbError::NotFound(_)))));
}

#[test]
fn test_no_highlights_for_book_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let db = create_kobo_db(dir.path());
    let cli = CliArgs {
        book: Some("Moby Dick".to_string()),
        ..cli(&db)
    };

    let (result, out) = run(&config(cli));

    assert_eq!(result.unwrap().selected, 0);
    assert_eq!(out, "No highlights found for book 'Moby Dick'\n");
}

#[test]
fn test_sample_is_capped_by_available() {
    let dir = TempDir::new().unwrap();
    let db = create_kobo_db(dir.path());
    let cli = CliArgs {
        isbn: "9780691096124".to_string(),
        sample: Some(10),
        seed: Some(42),
        raw: true,
        ..cli(&db)
    };

    let (result, out) = run(&config(cli));

    assert_eq!(result.unwrap().written, 2);
    assert!(out.contains("Simplify, simplify.\n"));
    assert!(out.contains("Heaven is under our feet.\n"));
    assert!(!out.contains("Dune"));
}

#[test]
fn test_sample_size_is_exact() {
    let dir = TempDir::new().unwrap();
    let db = create_kobo_db(dir.path());
    let cli = CliArgs {
        sample: Some(3),
        seed: Some(7),
        csv: true,
        ..cli(&db)
    };

    let (result, out) = run(&config(cli));

    assert_eq!(result.unwrap().written, 3);
    assert_eq!(out.lines().filter(|l| !l.is_empty()).count(), 3);
}

#[test]
fn test_list_with_info() {
    let dir = TempDir::new().unwrap();
    let db = create_kobo_db(dir.path());
    let cli = CliArgs {
        list: true,
        info: true,
        ..cli(&db)
    };

    let (result, out) = run(&config(cli));

    result.unwrap();
    assert_eq!(
        out,
        "ID\tTITLE\tAUTHOR\n1\tDune\tFrank Herbert\n2\tWalden\tHenry David Thoreau\n\
         \nBooks with annotations or highlights: 2\n"
    );
}

#[test]
fn test_output_file() {
    let dir = TempDir::new().unwrap();
    let db = create_kobo_db(dir.path());
    let target = dir.path().join("clippings.txt");
    let cli = CliArgs {
        output: Some(target.clone()),
        kindle: true,
        highlights_only: true,
        ..cli(&db)
    };

    let (result, out) = run(&config(cli));

    result.unwrap();
    assert!(out.is_empty());
    let written = std::fs::read_to_string(target).unwrap();
    assert_eq!(written.matches("==========").count(), 3);
    assert!(!written.contains("The spice must flow."));
}

#[test]
fn test_email_without_credentials_fails_before_reading() {
    let dir = TempDir::new().unwrap();
    let cli = CliArgs {
        email: true,
        ..cli(&dir.path().join("missing.sqlite"))
    };

    let result = Config::from_args(cli, |_| None);

    assert_eq!(result, Err(ConfigError::MissingEnv("SENDER_EMAIL")));
}

#[test]
fn test_export_without_notion_env_fails_before_reading() {
    let dir = TempDir::new().unwrap();
    let cli = CliArgs {
        export: true,
        ..cli(&dir.path().join("missing.sqlite"))
    };

    let result = Config::from_args(cli, |_| None);

    assert_eq!(result, Err(ConfigError::MissingEnv("NOTION_TOKEN")));
}

#[test]
fn test_export_prompts_for_book() {
    let dir = TempDir::new().unwrap();
    let db = create_kobo_db(dir.path());
    let server = notion_stub();

    let (result, out) = run_with_input(&export_config(cli(&db), &server), "2\n");

    assert_eq!(result.unwrap().exported, 2);
    assert!(out.contains("Available books:\n1. Dune\n2. Walden\n"));
    assert!(out.contains("Added 2 highlights to the Notion page for Walden"));
    let requests = server.requests();
    assert_eq!(requests[0].body["filter"]["title"]["equals"], "Walden");
    let appended = &requests.last().unwrap().body["children"];
    assert_eq!(appended.as_array().unwrap().len(), 2);
}

#[test]
fn test_export_with_selected_book_skips_prompt() {
    let dir = TempDir::new().unwrap();
    let db = create_kobo_db(dir.path());
    let server = notion_stub();
    let cli = CliArgs {
        book: Some("Walden".to_string()),
        ..cli(&db)
    };

    let (result, out) = run(&export_config(cli, &server));

    assert_eq!(result.unwrap().exported, 2);
    assert!(!out.contains("Available books:"));
}

#[test]
fn test_export_rejects_bad_prompt_answer() {
    let dir = TempDir::new().unwrap();
    let db = create_kobo_db(dir.path());
    let server = notion_stub();

    let (result, _) = run_with_input(&export_config(cli(&db), &server), "9\n");

    assert!(matches!(
        result,
        Err(AppError::Prompt(PromptError::InvalidChoice(answer))) if answer == "9"
    ));
    assert!(server.requests().is_empty());
}
