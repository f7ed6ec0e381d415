use crate::models::{parse_kobo_datetime, Book, Item, ItemKind};
use rusqlite::{Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const QUERY_ITEMS: &str = "SELECT
        Bookmark.VolumeID,
        Bookmark.Text,
        Bookmark.Annotation,
        Bookmark.DateCreated,
        Bookmark.DateModified,
        content.BookTitle,
        content.Title,
        content.Attribution,
        content.ISBN
    FROM Bookmark INNER JOIN content
    ON Bookmark.VolumeID = content.ContentID
    ORDER BY content.Title, Bookmark.DateCreated";

const QUERY_BOOKS: &str = "SELECT DISTINCT
        Bookmark.VolumeID,
        content.BookTitle,
        content.Title,
        content.Attribution,
        content.ISBN
    FROM Bookmark INNER JOIN content
    ON Bookmark.VolumeID = content.ContentID
    ORDER BY content.Title";

#[derive(Debug)]
pub enum DbError {
    NotFound(PathBuf),
    ConnectionFailed(String),
    QueryFailed(String),
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbError::NotFound(path) => write!(
                f,
                "Unable to read the KoboReader.sqlite file at {}. Check that the path is correct and readable",
                path.display()
            ),
            DbError::ConnectionFailed(e) => write!(f, "Failed to open database: {}", e),
            DbError::QueryFailed(e) => write!(f, "Query failed: {}", e),
        }
    }
}

impl std::error::Error for DbError {}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::QueryFailed(e.to_string())
    }
}

/// Opens the Kobo database read-only. The file belongs to the device, so
/// nothing here ever writes to it.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if !path.exists() {
        return Err(DbError::NotFound(path.to_path_buf()));
    }

    info!(path = %path.display(), "opening kobo database");

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| DbError::ConnectionFailed(e.to_string()))
}

pub fn read_books(conn: &Connection) -> Result<Vec<Book>, DbError> {
    let mut stmt = conn.prepare(QUERY_BOOKS)?;
    let books = stmt
        .query_map([], |row| {
            Ok(Book {
                volume_id: row.get(0)?,
                book_title: row.get(1)?,
                title: row.get(2)?,
                author: row.get(3)?,
                isbn: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    debug!(count = books.len(), "read books");
    Ok(books)
}

pub fn read_items(conn: &Connection) -> Result<Vec<Item>, DbError> {
    let mut stmt = conn.prepare(QUERY_ITEMS)?;
    let items = stmt
        .query_map([], item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    debug!(count = items.len(), "read bookmark rows");
    Ok(items)
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let text: Option<String> = row.get(1)?;
    let annotation: Option<String> = row.get(2)?;
    let date_created: Option<String> = row.get(3)?;
    let date_modified: Option<String> = row.get(4)?;
    let kind = ItemKind::classify(text.as_deref(), annotation.as_deref());

    Ok(Item {
        volume_id: row.get(0)?,
        text,
        annotation,
        date_created: parse_kobo_datetime(date_created.as_deref()),
        date_modified: parse_kobo_datetime(date_modified.as_deref()),
        book_title: row.get(5)?,
        title: row.get(6)?,
        author: row.get(7)?,
        isbn: row.get(8)?,
        kind,
    })
}
