//! External graph layout engines.

use crate::error::{Error, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// Turns a Graphviz description into image bytes
pub trait GraphLayout: Send + Sync {
    fn layout(&self, dot: &str) -> Result<Vec<u8>>;

    /// Content type of the produced bytes
    fn content_type(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ImageFormat {
    #[default]
    Svg,
    Png,
}

impl ImageFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::Png => "image/png",
        }
    }

    fn arg(self) -> &'static str {
        match self {
            ImageFormat::Svg => "-Tsvg",
            ImageFormat::Png => "-Tpng",
        }
    }
}

/// Runs a Graphviz-compatible program, `dot` by default
#[derive(Debug, Clone)]
pub struct DotCommand {
    program: String,
    format: ImageFormat,
}

impl DotCommand {
    pub fn new(program: impl Into<String>, format: ImageFormat) -> Self {
        DotCommand {
            program: program.into(),
            format,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl GraphLayout for DotCommand {
    fn layout(&self, dot: &str) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .arg(self.format.arg())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Render(format!("cannot run {}: {}", self.program, e)))?;

        // Write on another thread so a large image on stdout cannot deadlock us
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Render("layout stdin unavailable".to_string()))?;
        let input = dot.to_owned();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Render(format!("{} failed: {}", self.program, e)))?;
        // A program that exits without reading its input reports a broken pipe
        let _ = writer.join();

        if !output.status.success() {
            return Err(Error::Render(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}
