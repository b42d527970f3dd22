use anyhow::{anyhow, Result};
use ratatui::text::Line;

use crate::models::{Book, User};

use super::helpers::field_line;

/// Form state for adding or editing a book.
#[derive(Default, Clone)]
pub(crate) struct BookForm {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) isbn: String,
    pub(crate) year: String,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
}

/// Fields within the book form, in focus order.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub(crate) enum BookField {
    #[default]
    Title,
    Author,
    Isbn,
    Year,
}

impl BookField {
    pub(crate) const ALL: [BookField; 4] = [
        BookField::Title,
        BookField::Author,
        BookField::Isbn,
        BookField::Year,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            BookField::Title => "Title",
            BookField::Author => "Author",
            BookField::Isbn => "ISBN",
            BookField::Year => "Year",
        }
    }
}

impl BookForm {
    /// Populate the form from an existing book when editing.
    pub(crate) fn from_book(book: &Book) -> Self {
        Self {
            title: book.title().to_string(),
            author: book.author().to_string(),
            isbn: book.isbn().to_string(),
            year: book.publication_year().to_string(),
            active: BookField::Title,
            error: None,
        }
    }

    /// Cycle focus forward through the four fields.
    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Author,
            BookField::Author => BookField::Isbn,
            BookField::Isbn => BookField::Year,
            BookField::Year => BookField::Title,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Year,
            BookField::Author => BookField::Title,
            BookField::Isbn => BookField::Author,
            BookField::Year => BookField::Isbn,
        };
    }

    /// Append a character to the active field. The year only takes digits.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            BookField::Title => self.title.push(ch),
            BookField::Author => self.author.push(ch),
            BookField::Isbn => self.isbn.push(ch),
            BookField::Year => {
                if !ch.is_ascii_digit() {
                    return false;
                }
                self.year.push(ch);
            }
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.value_mut(self.active).pop();
    }

    fn value(&self, field: BookField) -> &String {
        match field {
            BookField::Title => &self.title,
            BookField::Author => &self.author,
            BookField::Isbn => &self.isbn,
            BookField::Year => &self.year,
        }
    }

    fn value_mut(&mut self, field: BookField) -> &mut String {
        match field {
            BookField::Title => &mut self.title,
            BookField::Author => &mut self.author,
            BookField::Isbn => &mut self.isbn,
            BookField::Year => &mut self.year,
        }
    }

    fn parse_year(&self) -> Result<i32> {
        let raw = self.year.trim();
        if raw.is_empty() {
            return Err(anyhow!("Publication year is required."));
        }
        raw.parse::<i32>()
            .map_err(|_| anyhow!("Publication year must be a whole number."))
    }

    /// Validate the inputs into a new, unsaved book.
    pub(crate) fn to_new_book(&self) -> Result<Book> {
        let year = self.parse_year()?;
        Ok(Book::new(&self.title, &self.author, &self.isbn, year)?)
    }

    /// Apply the inputs onto an existing book, leaving it untouched if any
    /// field is invalid.
    pub(crate) fn apply_to(&self, book: &Book) -> Result<Book> {
        let year = self.parse_year()?;
        let mut edited = book.clone();
        edited.set_title(&self.title)?;
        edited.set_author(&self.author)?;
        edited.set_isbn(&self.isbn)?;
        edited.set_publication_year(year)?;
        Ok(edited)
    }

    pub(crate) fn build_line(&self, field: BookField) -> Line<'static> {
        field_line(
            field.label(),
            self.value(field),
            self.active == field,
            "<required>",
        )
    }

    /// Column where the cursor sits for the active field.
    pub(crate) fn cursor_offset(&self) -> (usize, usize) {
        let row = BookField::ALL
            .iter()
            .position(|f| *f == self.active)
            .unwrap_or(0);
        let col = self.active.label().len() + 2 + self.value(self.active).chars().count();
        (col, row)
    }
}

/// Form state for adding or editing a user.
#[derive(Default, Clone)]
pub(crate) struct UserForm {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) active: UserField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub(crate) enum UserField {
    #[default]
    Name,
    Email,
}

impl UserField {
    pub(crate) fn label(self) -> &'static str {
        match self {
            UserField::Name => "Name",
            UserField::Email => "Email",
        }
    }
}

impl UserForm {
    pub(crate) fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            active: UserField::Name,
            error: None,
        }
    }

    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            UserField::Name => UserField::Email,
            UserField::Email => UserField::Name,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            UserField::Name => self.name.push(ch),
            UserField::Email => {
                if ch.is_whitespace() {
                    return false;
                }
                self.email.push(ch);
            }
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            UserField::Name => {
                self.name.pop();
            }
            UserField::Email => {
                self.email.pop();
            }
        }
    }

    /// Trimmed name and email, rejecting blanks and emails without `@`.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Name is required."));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(anyhow!("Enter a valid email address."));
        }
        Ok((name.to_string(), email.to_string()))
    }

    pub(crate) fn build_line(&self, field: UserField) -> Line<'static> {
        let value = match field {
            UserField::Name => &self.name,
            UserField::Email => &self.email,
        };
        field_line(field.label(), value, self.active == field, "<required>")
    }

    pub(crate) fn cursor_offset(&self) -> (usize, usize) {
        match self.active {
            UserField::Name => (UserField::Name.label().len() + 2 + self.name.chars().count(), 0),
            UserField::Email => (
                UserField::Email.label().len() + 2 + self.email.chars().count(),
                1,
            ),
        }
    }
}

/// Prompt for the borrower's id when lending a book.
#[derive(Clone)]
pub(crate) struct BorrowForm {
    pub(crate) book: Book,
    pub(crate) user_id: String,
    pub(crate) error: Option<String>,
}

impl BorrowForm {
    pub(crate) fn new(book: Book) -> Self {
        Self {
            book,
            user_id: String::new(),
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_ascii_digit() {
            self.user_id.push(ch);
            true
        } else {
            false
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.user_id.pop();
    }

    pub(crate) fn parse_user_id(&self) -> Result<i64> {
        let raw = self.user_id.trim();
        if raw.is_empty() {
            return Err(anyhow!("User id is required."));
        }
        raw.parse::<i64>()
            .map_err(|_| anyhow!("User id must be a number."))
    }
}

/// State for confirming a book deletion.
pub(crate) struct ConfirmBookDelete {
    pub(crate) book: Book,
}

/// State for confirming a user deletion.
pub(crate) struct ConfirmUserDelete {
    pub(crate) user: User,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn filled_book_form(title: &str, author: &str, isbn: &str, year: &str) -> BookForm {
        BookForm {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            year: year.to_string(),
            ..BookForm::default()
        }
    }

    #[test]
    fn year_field_only_accepts_digits() {
        let mut form = BookForm::default();
        form.active = BookField::Year;

        assert!(form.push_char('1'));
        assert!(!form.push_char('x'));
        assert!(form.push_char('9'));
        assert_eq!(form.year, "19");
    }

    #[test]
    fn focus_cycles_both_ways() {
        let mut form = BookForm::default();
        form.next_field();
        assert_eq!(form.active, BookField::Author);
        form.previous_field();
        form.previous_field();
        assert_eq!(form.active, BookField::Year);
    }

    #[test]
    fn valid_book_form_builds_book() {
        let book = filled_book_form(" 1984 ", "Orwell", "978-1", "1949")
            .to_new_book()
            .unwrap();
        assert_eq!(book.title(), "1984");
        assert_eq!(book.publication_year(), 1949);
    }

    #[rstest]
    #[case("", "Orwell", "978-1", "1949")]
    #[case("1984", "Orwell", "978-1", "")]
    #[case("1984", "Orwell", "978-1", "0")]
    #[case("1984", "Orwell", "", "1949")]
    #[case("1984", "Orwell", "978-1", "99999999999")]
    fn invalid_book_forms_are_rejected(
        #[case] title: &str,
        #[case] author: &str,
        #[case] isbn: &str,
        #[case] year: &str,
    ) {
        assert!(filled_book_form(title, author, isbn, year).to_new_book().is_err());
    }

    #[test]
    fn apply_to_keeps_id_and_availability() {
        let original = Book::from_row(
            3,
            "Old".to_string(),
            "A".to_string(),
            "1".to_string(),
            1900,
            false,
        );
        let edited = filled_book_form("New", "A", "1", "1901")
            .apply_to(&original)
            .unwrap();

        assert_eq!(edited.id(), 3);
        assert_eq!(edited.title(), "New");
        assert!(!edited.is_available());
    }

    #[rstest]
    #[case("Ann", "ann@example.org", true)]
    #[case("", "ann@example.org", false)]
    #[case("Ann", "", false)]
    #[case("Ann", "ann.example.org", false)]
    fn user_form_validation(#[case] name: &str, #[case] email: &str, #[case] ok: bool) {
        let form = UserForm {
            name: name.to_string(),
            email: email.to_string(),
            ..UserForm::default()
        };
        assert_eq!(form.parse_inputs().is_ok(), ok);
    }

    #[test]
    fn borrow_form_requires_numeric_id() {
        let book = Book::new("1984", "Orwell", "978-1", 1949).unwrap();
        let mut form = BorrowForm::new(book);
        assert!(form.parse_user_id().is_err());

        assert!(!form.push_char('a'));
        form.push_char('7');
        assert_eq!(form.parse_user_id().unwrap(), 7);
    }
}
