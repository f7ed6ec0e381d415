use crate::models::{Book, Item, ItemKind};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// ISBN value meaning "no particular book".
pub const ISBN_SENTINEL: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BookSelector {
    #[default]
    Any,
    Title(String),
    /// 1-based position in the book list, as printed by `--list`.
    Index(usize),
    Isbn(String),
}

impl BookSelector {
    pub fn from_isbn(isbn: &str) -> Self {
        let isbn = isbn.trim();
        if isbn.is_empty() || isbn == ISBN_SENTINEL {
            BookSelector::Any
        } else {
            BookSelector::Isbn(isbn.to_string())
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, BookSelector::Any)
    }
}

impl std::fmt::Display for BookSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookSelector::Any => write!(f, "all books"),
            BookSelector::Title(title) => write!(f, "book '{}'", title),
            BookSelector::Index(index) => write!(f, "book #{}", index),
            BookSelector::Isbn(isbn) => write!(f, "ISBN {}", isbn),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    HighlightsOnly,
    AnnotationsOnly,
}

impl KindFilter {
    fn accepts(&self, kind: ItemKind) -> bool {
        match self {
            KindFilter::All => kind != ItemKind::Bookmark,
            KindFilter::HighlightsOnly => kind == ItemKind::Highlight,
            KindFilter::AnnotationsOnly => kind == ItemKind::Annotation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemFilter {
    pub book: BookSelector,
    pub kind: KindFilter,
}

#[derive(Debug, PartialEq)]
pub enum SelectError {
    BookIndexOutOfRange { index: usize, count: usize },
    BookNotFound(String),
}

impl std::fmt::Display for SelectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectError::BookIndexOutOfRange { index, count } => write!(
                f,
                "Book id {} is out of range: expected a number between 1 and {}",
                index, count
            ),
            SelectError::BookNotFound(what) => write!(f, "No book matches {}", what),
        }
    }
}

impl std::error::Error for SelectError {}

/// The single book a selector designates, or `None` for [`BookSelector::Any`].
pub fn resolve_book<'a>(
    books: &'a [Book],
    selector: &BookSelector,
) -> Result<Option<&'a Book>, SelectError> {
    let found = match selector {
        BookSelector::Any => return Ok(None),
        BookSelector::Index(index) => {
            let book = index
                .checked_sub(1)
                .and_then(|i| books.get(i))
                .ok_or(SelectError::BookIndexOutOfRange {
                    index: *index,
                    count: books.len(),
                })?;
            return Ok(Some(book));
        }
        BookSelector::Title(title) => books.iter().find(|b| b.title.as_deref() == Some(title)),
        BookSelector::Isbn(isbn) => books.iter().find(|b| b.isbn.as_deref() == Some(isbn)),
    };

    found
        .map(Some)
        .ok_or_else(|| SelectError::BookNotFound(selector.to_string()))
}

/// Drops bookmarks, then keeps the items matching the book and kind filters.
/// The book is resolved the same way as for a Notion export, so when two
/// books share a title or ISBN only the first one in the list is selected.
/// A title or ISBN that matches nothing yields an empty list rather than an
/// error; only an index can be plainly invalid.
pub fn apply(items: Vec<Item>, books: &[Book], filter: &ItemFilter) -> Result<Vec<Item>, SelectError> {
    let volume_id = match resolve_book(books, &filter.book) {
        Ok(book) => book.map(|b| b.volume_id.as_str()),
        Err(SelectError::BookNotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let selected: Vec<Item> = items
        .into_iter()
        .filter(|item| item.has_text())
        .filter(|item| filter.kind.accepts(item.kind))
        .filter(|item| volume_id.map_or(true, |id| item.volume_id == id))
        .collect();

    debug!(count = selected.len(), filter = ?filter, "selected items");
    Ok(selected)
}

/// Picks `min(n, items.len())` distinct items uniformly at random.
pub fn sample<R: Rng + ?Sized>(items: &[Item], n: usize, rng: &mut R) -> Vec<Item> {
    items.choose_multiple(rng, n).cloned().collect()
}

pub fn items_for_book(items: &[Item], book: &Book) -> Vec<Item> {
    items
        .iter()
        .filter(|item| item.volume_id == book.volume_id)
        .cloned()
        .collect()
}
