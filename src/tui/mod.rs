mod app;
mod command;
mod ui;

use crate::error::Result;
use crate::store::Registry;
use std::sync::Arc;
use std::time::Duration;

pub use app::{Event, Session};
pub use command::{Command, CommandBuffer};

/// Run the terminal dashboard on `kind`, ticking every `interval`
pub fn run(registry: Arc<Registry>, kind: &str, interval: Duration) -> Result<()> {
    let mut session = Session::new(registry, kind)?;
    session.run(interval)
}
