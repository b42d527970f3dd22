use std::mem;
use std::rc::Rc;

use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use tracing::debug;

use crate::db::{BookStore, Database, UserStore};
use crate::models::{Book, User};
use crate::services::{BookService, UserService};

use super::forms::{
    BookField, BookForm, BorrowForm, ConfirmBookDelete, ConfirmUserDelete, UserField, UserForm,
};
use super::helpers::{book_row, centered_rect, surface_error, user_row};

/// Space reserved for the screen switcher at the top.
const HEADER_HEIGHT: u16 = 3;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;

/// The two lists the shell can show.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Screen {
    Books,
    Users,
}

/// Fine-grained modes layered over the current screen.
enum Mode {
    Normal,
    AddingBook(BookForm),
    EditingBook { original: Book, form: BookForm },
    ConfirmBookDelete(ConfirmBookDelete),
    Borrowing(BorrowForm),
    AddingUser(UserForm),
    EditingUser { id: i64, form: UserForm },
    ConfirmUserDelete(ConfirmUserDelete),
    Searching(SearchState),
}

/// Which book column a search runs against.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum SearchField {
    Title,
    Author,
    Isbn,
}

impl SearchField {
    fn next(self) -> Self {
        match self {
            SearchField::Title => SearchField::Author,
            SearchField::Author => SearchField::Isbn,
            SearchField::Isbn => SearchField::Title,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Author => "author",
            SearchField::Isbn => "ISBN",
        }
    }
}

/// State for an active inline search. Book searches filter live; user
/// lookups run when Enter is pressed.
struct SearchState {
    target: SearchTarget,
    query: String,
}

enum SearchTarget {
    Books(SearchField),
    Users,
}

/// A book filter that survives leaving search mode.
struct BookFilter {
    field: SearchField,
    query: String,
}

impl BookFilter {
    /// Header text; ISBN lookups are exact, the others are substring matches.
    fn describe(&self) -> String {
        match self.field {
            SearchField::Isbn => format!("ISBN = '{}'", self.query),
            field => format!("{} contains '{}'", field.label(), self.query),
        }
    }
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state for the terminal shell. Every user action maps
/// to one service call; failures land in the footer and the loop carries on.
pub struct App {
    db: Rc<Database>,
    books: BookService,
    users: UserService,
    book_rows: Vec<Book>,
    user_rows: Vec<User>,
    book_filter: Option<BookFilter>,
    user_filter: Option<String>,
    selected_book: usize,
    selected_user: usize,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Wire the services onto the shared database and load both lists.
    pub fn new(db: Rc<Database>) -> Result<Self> {
        let books = BookService::new(
            BookStore::new(Rc::clone(&db)).context("failed to prepare book storage")?,
        );
        let users = UserService::new(
            UserStore::new(Rc::clone(&db)).context("failed to prepare user storage")?,
        );

        let mut app = Self {
            db,
            books,
            users,
            book_rows: Vec::new(),
            user_rows: Vec::new(),
            book_filter: None,
            user_filter: None,
            selected_book: 0,
            selected_user: 0,
            screen: Screen::Books,
            mode: Mode::Normal,
            status: None,
        };
        app.reload_books()?;
        app.reload_users()?;
        Ok(app)
    }

    /// Release the database handle once the event loop is over.
    pub fn shutdown(&self) -> Result<()> {
        self.db.close().context("failed to close database")
    }

    /// Dispatch a key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit),
            Mode::AddingBook(form) => self.handle_add_book(code, form),
            Mode::EditingBook { original, form } => self.handle_edit_book(code, original, form),
            Mode::ConfirmBookDelete(confirm) => self.handle_confirm_book_delete(code, confirm),
            Mode::Borrowing(form) => self.handle_borrow(code, form),
            Mode::AddingUser(form) => self.handle_add_user(code, form),
            Mode::EditingUser { id, form } => self.handle_edit_user(code, id, form),
            Mode::ConfirmUserDelete(confirm) => self.handle_confirm_user_delete(code, confirm),
            Mode::Searching(state) => self.handle_search(code, state),
        };

        exit
    }

    /// Re-read both lists from storage.
    pub fn handle_ctrl_r(&mut self) {
        match self.reload_books().and_then(|_| self.reload_users()) {
            Ok(()) => self.set_status("Reloaded from the database.", StatusKind::Info),
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Mode {
        match code {
            KeyCode::Char('q') => {
                *exit = true;
                return Mode::Normal;
            }
            KeyCode::Esc => {
                if !self.clear_filter() {
                    *exit = true;
                }
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.screen = match self.screen {
                    Screen::Books => Screen::Users,
                    Screen::Users => Screen::Books,
                };
                self.clear_status();
                return Mode::Normal;
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Home => self.move_selection(isize::MIN),
            KeyCode::End => self.move_selection(isize::MAX),
            _ => {}
        }

        match self.screen {
            Screen::Books => self.handle_books_key(code),
            Screen::Users => self.handle_users_key(code),
        }
    }

    fn handle_books_key(&mut self, code: KeyCode) -> Mode {
        match code {
            KeyCode::Char('a') | KeyCode::Char('+') => Mode::AddingBook(BookForm::default()),
            KeyCode::Char('e') => match self.current_book().cloned() {
                Some(book) => Mode::EditingBook {
                    form: BookForm::from_book(&book),
                    original: book,
                },
                None => self.no_selection("book"),
            },
            KeyCode::Char('d') | KeyCode::Delete => match self.current_book().cloned() {
                Some(book) => Mode::ConfirmBookDelete(ConfirmBookDelete { book }),
                None => self.no_selection("book"),
            },
            KeyCode::Char('b') => match self.current_book().cloned() {
                Some(book) => Mode::Borrowing(BorrowForm::new(book)),
                None => self.no_selection("book"),
            },
            KeyCode::Char('r') => {
                match self.current_book().map(Book::id) {
                    Some(id) => self.return_book(id),
                    None => {
                        self.no_selection("book");
                    }
                }
                Mode::Normal
            }
            KeyCode::Char('/') => {
                let (field, query) = match &self.book_filter {
                    Some(filter) => (filter.field, filter.query.clone()),
                    None => (SearchField::Title, String::new()),
                };
                Mode::Searching(SearchState {
                    target: SearchTarget::Books(field),
                    query,
                })
            }
            _ => Mode::Normal,
        }
    }

    fn handle_users_key(&mut self, code: KeyCode) -> Mode {
        match code {
            KeyCode::Char('a') | KeyCode::Char('+') => Mode::AddingUser(UserForm::default()),
            KeyCode::Char('e') => match self.current_user().cloned() {
                Some(user) => Mode::EditingUser {
                    id: user.id,
                    form: UserForm::from_user(&user),
                },
                None => self.no_selection("user"),
            },
            KeyCode::Char('d') | KeyCode::Delete => match self.current_user().cloned() {
                Some(user) => Mode::ConfirmUserDelete(ConfirmUserDelete { user }),
                None => self.no_selection("user"),
            },
            KeyCode::Char('/') => Mode::Searching(SearchState {
                target: SearchTarget::Users,
                query: self.user_filter.clone().unwrap_or_default(),
            }),
            _ => Mode::Normal,
        }
    }

    fn handle_add_book(&mut self, code: KeyCode, mut form: BookForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Add book cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab => {
                self.warn_on_taken_isbn(&mut form);
                form.next_field();
            }
            KeyCode::BackTab => {
                self.warn_on_taken_isbn(&mut form);
                form.previous_field();
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_book(&form) {
                Ok(()) => return Mode::Normal,
                Err(err) => self.form_error(&mut form.error, &err),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::AddingBook(form)
    }

    fn handle_edit_book(&mut self, code: KeyCode, original: Book, mut form: BookForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_existing_book(&original, &form) {
                Ok(()) => return Mode::Normal,
                Err(err) => self.form_error(&mut form.error, &err),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::EditingBook { original, form }
    }

    fn handle_confirm_book_delete(&mut self, code: KeyCode, confirm: ConfirmBookDelete) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.delete_book(&confirm.book) {
                    Ok(()) => Mode::Normal,
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Mode::Normal
                    }
                }
            }
            _ => Mode::ConfirmBookDelete(confirm),
        }
    }

    fn handle_borrow(&mut self, code: KeyCode, mut form: BorrowForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Borrowing cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.borrow_book(&form) {
                Ok(()) => return Mode::Normal,
                Err(err) => self.form_error(&mut form.error, &err),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::Borrowing(form)
    }

    fn handle_add_user(&mut self, code: KeyCode, mut form: UserForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Add user cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_user(&form) {
                Ok(()) => return Mode::Normal,
                Err(err) => self.form_error(&mut form.error, &err),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::AddingUser(form)
    }

    fn handle_edit_user(&mut self, code: KeyCode, id: i64, mut form: UserForm) -> Mode {
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                return Mode::Normal;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_existing_user(id, &form) {
                Ok(()) => return Mode::Normal,
                Err(err) => self.form_error(&mut form.error, &err),
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Mode::EditingUser { id, form }
    }

    fn handle_confirm_user_delete(&mut self, code: KeyCode, confirm: ConfirmUserDelete) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Mode::Normal
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Err(err) = self.delete_user(&confirm.user) {
                    self.set_status(surface_error(&err), StatusKind::Error);
                }
                Mode::Normal
            }
            _ => Mode::ConfirmUserDelete(confirm),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Mode {
        match code {
            KeyCode::Esc => {
                self.clear_filter();
                return Mode::Normal;
            }
            KeyCode::Enter => {
                if let SearchTarget::Users = state.target {
                    self.lookup_user(&state.query);
                }
                return Mode::Normal;
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Tab => {
                if let SearchTarget::Books(field) = state.target {
                    state.target = SearchTarget::Books(field.next());
                }
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => state.query.push(ch),
            _ => {}
        }

        if let SearchTarget::Books(field) = state.target {
            self.book_filter = if state.query.trim().is_empty() {
                None
            } else {
                Some(BookFilter {
                    field,
                    query: state.query.clone(),
                })
            };
            if let Err(err) = self.reload_books() {
                self.set_status(surface_error(&err), StatusKind::Error);
            }
        }
        Mode::Searching(state)
    }

    fn save_new_book(&mut self, form: &BookForm) -> Result<()> {
        let mut book = form.to_new_book()?;
        let id = self.books.add_book(&mut book)?;
        self.reload_books()?;
        self.select_book(id);
        self.set_status(
            format!("Added '{}' as book #{id}.", book.title()),
            StatusKind::Info,
        );
        Ok(())
    }

    fn save_existing_book(&mut self, original: &Book, form: &BookForm) -> Result<()> {
        let edited = form.apply_to(original)?;
        self.books.update_book(&edited)?;
        self.reload_books()?;
        self.select_book(edited.id());
        self.set_status(format!("Updated '{}'.", edited.title()), StatusKind::Info);
        Ok(())
    }

    fn delete_book(&mut self, book: &Book) -> Result<()> {
        self.books.delete_book(book.id())?;
        self.reload_books()?;
        self.set_status(format!("Deleted '{}'.", book.title()), StatusKind::Info);
        Ok(())
    }

    fn borrow_book(&mut self, form: &BorrowForm) -> Result<()> {
        let user_id = form.parse_user_id()?;
        let book = self.books.borrow_book(form.book.id(), user_id)?;
        self.reload_books()?;
        self.set_status(
            format!("Lent '{}' to user #{user_id}.", book.title()),
            StatusKind::Info,
        );
        Ok(())
    }

    fn return_book(&mut self, id: i64) {
        let outcome = self
            .books
            .return_book(id)
            .map_err(anyhow::Error::from)
            .and_then(|book| {
                self.reload_books()?;
                Ok(book)
            });
        match outcome {
            Ok(book) => self.set_status(format!("'{}' is back on the shelf.", book.title()), StatusKind::Info),
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    /// Early warning while filling in a new book; the service still makes the
    /// final call on save.
    fn warn_on_taken_isbn(&mut self, form: &mut BookForm) {
        if form.active != BookField::Isbn || form.isbn.trim().is_empty() {
            return;
        }
        match self.books.isbn_exists(&form.isbn) {
            Ok(true) => {
                form.error = Some(format!("ISBN {} is already in the catalogue.", form.isbn.trim()))
            }
            Ok(false) => {}
            Err(err) => self.set_status(surface_error(&err.into()), StatusKind::Error),
        }
    }

    fn save_new_user(&mut self, form: &UserForm) -> Result<()> {
        let (name, email) = form.parse_inputs()?;
        let mut user = User::new(name, email);
        let id = self.users.add_user(&mut user)?;
        self.reload_users()?;
        self.select_user(id);
        self.set_status(format!("Added {user} as user #{id}."), StatusKind::Info);
        Ok(())
    }

    fn save_existing_user(&mut self, id: i64, form: &UserForm) -> Result<()> {
        let (name, email) = form.parse_inputs()?;
        let user = User { id, name, email };
        self.users.update_user(&user)?;
        self.reload_users()?;
        self.select_user(id);
        self.set_status(format!("Updated {user}."), StatusKind::Info);
        Ok(())
    }

    fn delete_user(&mut self, user: &User) -> Result<()> {
        self.users.delete_user(user.id)?;
        self.reload_users()?;
        self.set_status(format!("Deleted {}.", user.name), StatusKind::Info);
        Ok(())
    }

    fn lookup_user(&mut self, query: &str) {
        let email = query.trim();
        if email.is_empty() {
            self.clear_filter();
            return;
        }
        match self.users.get_user_by_email(email) {
            Ok(user) => {
                self.user_filter = Some(email.to_string());
                self.user_rows = vec![user];
                self.selected_user = 0;
                self.clear_status();
            }
            Err(err) => self.set_status(surface_error(&err.into()), StatusKind::Error),
        }
    }

    /// Drop the filter for the current screen. Returns whether one was set.
    fn clear_filter(&mut self) -> bool {
        let had_filter = match self.screen {
            Screen::Books => self.book_filter.take().is_some(),
            Screen::Users => self.user_filter.take().is_some(),
        };
        let reloaded = match self.screen {
            Screen::Books => self.reload_books(),
            Screen::Users => self.reload_users(),
        };
        if let Err(err) = reloaded {
            self.set_status(surface_error(&err), StatusKind::Error);
        }
        had_filter
    }

    fn reload_books(&mut self) -> Result<()> {
        let rows = match &self.book_filter {
            None => self.books.get_all_books(),
            Some(filter) => match filter.field {
                SearchField::Title => self.books.search_by_title(&filter.query),
                SearchField::Author => self.books.search_by_author(&filter.query),
                SearchField::Isbn => self.books.search_by_isbn(&filter.query),
            },
        }?;
        debug!(rows = rows.len(), "book list refreshed");
        self.book_rows = rows;
        self.selected_book = clamp_index(self.selected_book, self.book_rows.len());
        Ok(())
    }

    fn reload_users(&mut self) -> Result<()> {
        self.user_filter = None;
        self.user_rows = self.users.get_all_users()?;
        self.selected_user = clamp_index(self.selected_user, self.user_rows.len());
        Ok(())
    }

    fn current_book(&self) -> Option<&Book> {
        self.book_rows.get(self.selected_book)
    }

    fn current_user(&self) -> Option<&User> {
        self.user_rows.get(self.selected_user)
    }

    fn select_book(&mut self, id: i64) {
        if let Some(idx) = self.book_rows.iter().position(|b| b.id() == id) {
            self.selected_book = idx;
        }
    }

    fn select_user(&mut self, id: i64) {
        if let Some(idx) = self.user_rows.iter().position(|u| u.id == id) {
            self.selected_user = idx;
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let (selected, len) = match self.screen {
            Screen::Books => (&mut self.selected_book, self.book_rows.len()),
            Screen::Users => (&mut self.selected_user, self.user_rows.len()),
        };
        if len == 0 {
            *selected = 0;
            return;
        }
        let target = (*selected as isize).saturating_add(delta);
        *selected = target.clamp(0, len as isize - 1) as usize;
    }

    fn no_selection(&mut self, what: &str) -> Mode {
        self.set_status(format!("No {what} selected."), StatusKind::Error);
        Mode::Normal
    }

    fn form_error(&mut self, slot: &mut Option<String>, err: &anyhow::Error) {
        let message = surface_error(err);
        *slot = Some(message.clone());
        self.set_status(message, StatusKind::Error);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        match self.screen {
            Screen::Books => self.draw_books(frame, chunks[1]),
            Screen::Users => self.draw_users(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Normal => {}
            Mode::AddingBook(form) => self.draw_book_form(frame, area, "Add Book", form),
            Mode::EditingBook { form, .. } => self.draw_book_form(frame, area, "Edit Book", form),
            Mode::ConfirmBookDelete(confirm) => self.draw_confirm(
                frame,
                area,
                "Delete Book",
                format!("Delete '{}'?", confirm.book.display_title()),
            ),
            Mode::Borrowing(form) => self.draw_borrow_form(frame, area, form),
            Mode::AddingUser(form) => self.draw_user_form(frame, area, "Add User", form),
            Mode::EditingUser { form, .. } => self.draw_user_form(frame, area, "Edit User", form),
            Mode::ConfirmUserDelete(confirm) => self.draw_confirm(
                frame,
                area,
                "Delete User",
                format!("Delete {}?", confirm.user),
            ),
            Mode::Searching(state) => self.draw_search_bar(frame, chunks[0], state),
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let tab = |label: &'static str, active: bool| {
            if active {
                Span::styled(
                    format!(" {label} "),
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::raw(format!(" {label} "))
            }
        };

        let mut spans = vec![
            tab("Books", self.screen == Screen::Books),
            Span::raw(" "),
            tab("Users", self.screen == Screen::Users),
        ];
        let filter = match self.screen {
            Screen::Books => self
                .book_filter
                .as_ref()
                .map(BookFilter::describe),
            Screen::Users => self.user_filter.as_ref().map(|email| format!("email = '{email}'")),
        };
        if let Some(filter) = filter {
            spans.push(Span::styled(
                format!("   filter: {filter} (Esc to clear)"),
                Style::default().fg(Color::Cyan),
            ));
        }

        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Library Manager"));
        frame.render_widget(header, area);
    }

    fn draw_books(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Books ({})", self.book_rows.len()));
        if self.book_rows.is_empty() {
            let text = if self.book_filter.is_some() {
                "No books match the filter."
            } else {
                "No books yet. Press 'a' to add one."
            };
            let message = Paragraph::new(text).alignment(Alignment::Center).block(block);
            frame.render_widget(message, area);
            return;
        }

        let items: Vec<ListItem> = self.book_rows.iter().map(|b| ListItem::new(book_row(b))).collect();
        self.render_list(frame, area, items, block, self.selected_book);
    }

    fn draw_users(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Users ({})", self.user_rows.len()));
        if self.user_rows.is_empty() {
            let message = Paragraph::new("No users yet. Press 'a' to add one.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let items: Vec<ListItem> = self.user_rows.iter().map(|u| ListItem::new(user_row(u))).collect();
        self.render_list(frame, area, items, block, self.selected_user);
    }

    fn render_list(
        &self,
        frame: &mut Frame,
        area: Rect,
        items: Vec<ListItem<'static>>,
        block: Block<'static>,
        selected: usize,
    ) {
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph =
            Paragraph::new(vec![status_line, self.footer_instructions()]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let hints: &[(&str, &str)] = match (&self.mode, self.screen) {
            (Mode::Searching(state), _) => match state.target {
                SearchTarget::Books(_) => &[("type", "filter"), ("Tab", "field"), ("Enter", "keep"), ("Esc", "clear")],
                SearchTarget::Users => &[("type", "email"), ("Enter", "find"), ("Esc", "clear")],
            },
            (Mode::Normal, Screen::Books) => &[
                ("a", "add"),
                ("e", "edit"),
                ("d", "delete"),
                ("b", "borrow"),
                ("r", "return"),
                ("/", "search"),
                ("Tab", "users"),
                ("q", "quit"),
            ],
            (Mode::Normal, Screen::Users) => &[
                ("a", "add"),
                ("e", "edit"),
                ("d", "delete"),
                ("/", "find by email"),
                ("Tab", "books"),
                ("q", "quit"),
            ],
            _ => &[("Enter", "confirm"), ("Esc", "cancel")],
        };

        let mut spans = Vec::with_capacity(hints.len() * 2);
        for (key, action) in hints {
            spans.push(Span::styled(format!("[{key}]"), key_style));
            spans.push(Span::raw(format!(" {action}  ")));
        }
        Line::from(spans)
    }

    fn draw_book_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &BookForm) {
        let mut lines: Vec<Line> = BookField::ALL.iter().map(|f| form.build_line(*f)).collect();
        lines.push(Line::from(""));
        lines.push(hint_or_error(
            form.error.as_deref(),
            "Enter to save | Tab to switch | Esc to cancel",
        ));
        let inner = draw_modal(frame, area, title, lines, (70, 40));

        let (col, row) = form.cursor_offset();
        frame.set_cursor_position((inner.x + col as u16, inner.y + row as u16));
    }

    fn draw_user_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &UserForm) {
        let lines = vec![
            form.build_line(UserField::Name),
            form.build_line(UserField::Email),
            Line::from(""),
            hint_or_error(
                form.error.as_deref(),
                "Enter to save | Tab to switch | Esc to cancel",
            ),
        ];
        let inner = draw_modal(frame, area, title, lines, (60, 30));

        let (col, row) = form.cursor_offset();
        frame.set_cursor_position((inner.x + col as u16, inner.y + row as u16));
    }

    fn draw_borrow_form(&self, frame: &mut Frame, area: Rect, form: &BorrowForm) {
        let lines = vec![
            Line::from(format!("Lend '{}'", form.book.display_title())),
            super::helpers::field_line("User id", &form.user_id, true, "<required>"),
            Line::from(""),
            hint_or_error(form.error.as_deref(), "Enter to lend | Esc to cancel"),
        ];
        let inner = draw_modal(frame, area, "Borrow Book", lines, (60, 30));

        let col = "User id: ".len() + form.user_id.chars().count();
        frame.set_cursor_position((inner.x + col as u16, inner.y + 1));
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, title: &str, question: String) {
        let lines = vec![
            Line::from(question),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];
        draw_modal(frame, area, title, lines, (60, 25));
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        frame.render_widget(Clear, area);

        let prompt = match state.target {
            SearchTarget::Books(field) => format!("Search {}: ", field.label()),
            SearchTarget::Users => "Find email: ".to_string(),
        };
        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("{prompt}{}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);

        let inner = block.inner(area);
        let cursor_x = inner.x + (prompt.len() + state.query.chars().count()) as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }
}

/// Clear a centered popup, draw its border and lines, and return the inner
/// area so callers can place the cursor.
fn draw_modal(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    lines: Vec<Line<'static>>,
    (percent_x, percent_y): (u16, u16),
) -> Rect {
    let popup_area = centered_rect(percent_x, percent_y, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
    inner
}

fn hint_or_error(error: Option<&str>, hint: &'static str) -> Line<'static> {
    match error {
        Some(error) => Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))),
        None => Line::from(Span::styled(hint, Style::default().fg(Color::Gray))),
    }
}

fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}
