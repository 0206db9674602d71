//! Filtering, aggregation and rendering of fetched profiles.

mod filter;
pub mod layout;
mod render;
mod tree;

pub use filter::{compile_filter, focus};
pub use layout::{DotCommand, GraphLayout, ImageFormat};
pub use render::{
    DotOptions, ReportItem, TextOptions, TextReport, format_value, render_dot, render_image,
    render_json, render_text,
};
pub use tree::{Node, ReportTree};

use crate::profile::Profile;
use regex::Regex;

/// Filter `profile` by `pattern` and aggregate it into a call tree.
///
/// The input is never modified, so a cached profile can be re-filtered freely.
/// `None` keeps every sample; a pattern matching nothing yields an empty tree.
pub fn apply(profile: &Profile, pattern: Option<&Regex>, cumulative: bool) -> ReportTree {
    let index = profile.value_index();
    let kept = focus(profile, pattern);
    ReportTree::build(&kept, index, profile.total(index), cumulative)
}
