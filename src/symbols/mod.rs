mod dwarf;
mod remote;
mod resolver;

pub use remote::{RemoteSymbolizer, parse_symbol_response};
pub use resolver::LocalSymbolizer;

use crate::error::Result;
use crate::fetch::Fetcher;
use crate::profile::Profile;
use std::path::Path;
use std::sync::Arc;

/// Fills the location table of a profile with resolved frames.
///
/// Implementations only touch addresses that have no frames yet and must
/// leave already resolved entries alone.
pub trait Symbolizer: Send + Sync {
    fn symbolize(&self, profile: &mut Profile) -> Result<()>;
}

/// Where symbol information comes from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SymbolizeMode {
    /// Local binary first (when given), then the target's symbol endpoint
    #[default]
    Auto,
    Local,
    Remote,
    None,
}

/// Leaves the profile as fetched
pub struct NoSymbolizer;

impl Symbolizer for NoSymbolizer {
    fn symbolize(&self, _profile: &mut Profile) -> Result<()> {
        Ok(())
    }
}

/// Runs symbolizers in order, each seeing what the previous left unresolved
pub struct Chain(Vec<Box<dyn Symbolizer>>);

impl Symbolizer for Chain {
    fn symbolize(&self, profile: &mut Profile) -> Result<()> {
        for symbolizer in &self.0 {
            if profile.unresolved().is_empty() {
                break;
            }
            symbolizer.symbolize(profile)?;
        }
        Ok(())
    }
}

/// Build the symbolizer for `mode`
pub fn for_mode(
    mode: SymbolizeMode,
    binary: Option<&Path>,
    fetcher: Arc<dyn Fetcher>,
) -> Result<Box<dyn Symbolizer>> {
    let local = |path: &Path| -> Result<Box<dyn Symbolizer>> {
        let symbolizer = LocalSymbolizer::open(path)?;
        log::info!(
            "loaded {} symbols and {} line ranges from {}",
            symbolizer.symbol_count(),
            symbolizer.range_count(),
            path.display()
        );
        Ok(Box::new(symbolizer))
    };

    Ok(match (mode, binary) {
        (SymbolizeMode::None, _) => Box::new(NoSymbolizer),
        (SymbolizeMode::Remote, _) | (SymbolizeMode::Auto, None) => {
            Box::new(RemoteSymbolizer::new(fetcher))
        }
        (SymbolizeMode::Local, Some(path)) => local(path)?,
        (SymbolizeMode::Local, None) => {
            return Err(crate::Error::InvalidArgument(
                "--symbolize=local requires --binary".to_string(),
            ));
        }
        (SymbolizeMode::Auto, Some(path)) => Box::new(Chain(vec![
            local(path)?,
            Box::new(RemoteSymbolizer::new(fetcher)),
        ])),
    })
}
