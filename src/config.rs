use crate::cli::Cli;
use crate::error::Result;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::report::{DotCommand, ImageFormat};
use crate::store::Registry;
use crate::symbols::{self, SymbolizeMode, Symbolizer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub target: String,
    pub timeout: Duration,
    pub interval: Duration,
    pub symbolize: SymbolizeMode,
    pub binary: Option<PathBuf>,
    pub tolerate_symbol_errors: bool,
    pub stats_path: String,
    pub layout_program: String,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        Config {
            target: cli.target.clone(),
            timeout: cli.timeout,
            interval: cli.interval,
            symbolize: cli.symbolize,
            binary: cli.binary.clone(),
            tolerate_symbol_errors: cli.tolerate_symbol_errors,
            stats_path: cli.stats_path.clone(),
            layout_program: cli.layout_program.clone(),
        }
    }

    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        Arc::new(HttpFetcher::new(&self.target, &self.stats_path, self.timeout))
    }

    /// Registry of every known profile kind, fetching through `fetcher`
    pub fn registry(&self, fetcher: Arc<dyn Fetcher>) -> Result<Arc<Registry>> {
        let symbolizer: Arc<dyn Symbolizer> = Arc::from(symbols::for_mode(
            self.symbolize,
            self.binary.as_deref(),
            fetcher.clone(),
        )?);
        Ok(Arc::new(Registry::new(
            fetcher,
            symbolizer,
            self.tolerate_symbol_errors,
        )))
    }

    pub fn layout(&self, format: ImageFormat) -> DotCommand {
        DotCommand::new(self.layout_program.clone(), format)
    }
}
