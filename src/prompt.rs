use crate::models::Book;
use std::io::{BufRead, Write};

#[derive(Debug)]
pub enum PromptError {
    NoBooks,
    NoInput,
    InvalidChoice(String),
    Io(String),
}

impl std::fmt::Display for PromptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptError::NoBooks => write!(f, "There are no books with highlights to choose from"),
            PromptError::NoInput => write!(f, "No book was chosen"),
            PromptError::InvalidChoice(s) => {
                write!(f, "Invalid choice: '{}'. Expected one of the listed numbers", s)
            }
            PromptError::Io(e) => write!(f, "Failed to read the choice: {}", e),
        }
    }
}

impl std::error::Error for PromptError {}

impl From<std::io::Error> for PromptError {
    fn from(e: std::io::Error) -> Self {
        PromptError::Io(e.to_string())
    }
}

/// Lists `books` on `output` and reads a 1-based choice from `input`.
pub fn choose_book<'a, R: BufRead, W: Write>(
    books: &'a [Book],
    input: &mut R,
    output: &mut W,
) -> Result<&'a Book, PromptError> {
    if books.is_empty() {
        return Err(PromptError::NoBooks);
    }

    writeln!(output, "Available books:")?;
    for (i, book) in books.iter().enumerate() {
        writeln!(output, "{}. {}", i + 1, book.display_title())?;
    }
    write!(output, "Please input the number: ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(PromptError::NoInput);
    }

    let answer = line.trim();
    answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| books.get(i))
        .ok_or_else(|| PromptError::InvalidChoice(answer.to_string()))
}
