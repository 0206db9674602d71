use crate::config::Config;
use crate::error::Result;
use crate::report::ImageFormat;
use crate::server::{self, AppState};
use std::sync::Arc;

pub fn run(config: &Config, listen: &str, image_format: ImageFormat) -> Result<()> {
    let fetcher = config.fetcher();
    let state = Arc::new(AppState {
        registry: config.registry(fetcher)?,
        layout: Box::new(config.layout(image_format)),
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(listen, state))
}
