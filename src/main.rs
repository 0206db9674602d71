use anyhow::Context;
use clap::Parser;
use gom::cli::{Cli, Command};
use gom::commands::top::TopOptions;
use gom::config::Config;
use gom::error::exit_code;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(gom_err) = e.downcast_ref::<gom::Error>() {
                ExitCode::from(gom_err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Validate CLI arguments
    cli.validate()
        .map_err(gom::Error::InvalidArgument)
        .context("Invalid arguments")?;

    init_logging(&cli)?;
    let config = Config::from_cli(&cli);

    match cli.command {
        Some(Command::Serve {
            listen,
            image_format,
        }) => {
            gom::commands::serve::run(&config, &listen, image_format)
                .with_context(|| format!("Serving on {}", listen))?;
        }
        Some(Command::Top {
            kind,
            top,
            filter,
            cum,
            seconds,
            json,
            csv,
        }) => {
            let registry = config.registry(config.fetcher())?;
            let options = TopOptions {
                limit: top,
                filter,
                cumulative: cum,
                seconds,
                json,
                csv,
            };
            gom::commands::top::run(&registry, &kind, &options)
                .with_context(|| format!("Reporting {} from {}", kind, config.target))?;
        }
        Some(Command::Completions { shell }) => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "gom", &mut std::io::stdout());
        }
        None => {
            let registry = config.registry(config.fetcher())?;
            gom::tui::run(registry, &cli.profile, config.interval)
                .with_context(|| format!("Dashboard for {}", config.target))?;
        }
    }

    Ok(())
}

/// The dashboard owns the terminal, so it only logs to `--log-file`; its
/// errors are shown on the status line instead.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());

    if let Some(path) = &cli.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Creating log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        if std::env::var_os("RUST_LOG").is_none() {
            builder.filter_level(log::LevelFilter::Info);
        }
    } else if cli.command.is_none() {
        builder.filter_level(log::LevelFilter::Off);
    } else if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(log::LevelFilter::Warn);
    }

    builder.init();
    Ok(())
}
