//! Binary entry point: read configuration, start file logging, open the
//! database, and drive the terminal shell until the user exits.
use std::rc::Rc;

use clap::Parser;
use library_manager::config::Config;
use library_manager::{logging, run_app, App, Database};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let log_file = logging::init(&config.log_dir()?, &config.log_level)?;

    let target = config.db_target()?;
    info!(db = ?target, log = %log_file.display(), "starting library manager");
    let db = Rc::new(Database::open(target)?);

    let mut app = App::new(Rc::clone(&db))?;
    let outcome = run_app(&mut app);

    if let Err(err) = app.shutdown() {
        error!(error = %err, "failed to close database");
    }
    info!("library manager stopped");
    outcome
}
