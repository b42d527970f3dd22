use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::{Availability, Book, User};

/// Render one `Label: value` line of a modal form, highlighting the focused
/// field and greying out empty ones.
pub(crate) fn field_line(label: &str, value: &str, is_active: bool, placeholder: &str) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{label}: ")),
        Span::styled(display, style),
    ])
}

/// A single row in the book list.
pub(crate) fn book_row(book: &Book) -> Line<'static> {
    let badge_style = match book.availability() {
        Availability::Available => Style::default().fg(Color::Green),
        Availability::Borrowed => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD),
    };
    Line::from(vec![
        Span::styled(format!("#{:<4} ", book.id()), Style::default().fg(Color::DarkGray)),
        Span::raw(book.display_title()),
        Span::styled(format!("  ISBN {}", book.isbn()), Style::default().fg(Color::Gray)),
        Span::styled(format!("  [{}]", book.availability()), badge_style),
    ])
}

/// A single row in the user list.
pub(crate) fn user_row(user: &User) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("#{:<4} ", user.id), Style::default().fg(Color::DarkGray)),
        Span::raw(user.name.clone()),
        Span::styled(format!("  <{}>", user.email), Style::default().fg(Color::Gray)),
    ])
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Pick the message to show in the footer. Storage failures read best with
/// the driver's own explanation (the innermost cause); everything else is
/// already phrased for the user at the top of the chain.
pub(crate) fn surface_error(err: &Error) -> String {
    let top = err.to_string();
    match err.chain().last() {
        Some(cause) if err.chain().count() > 1 => format!("{top}: {cause}"),
        _ => top,
    }
}
