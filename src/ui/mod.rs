//! Ratatui front-end: a books screen and a users screen, each with modal
//! forms layered on top.

mod app;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use terminal::run_app;
