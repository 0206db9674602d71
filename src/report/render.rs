use super::layout::GraphLayout;
use super::tree::ReportTree;
use crate::error::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextOptions {
    pub print_addresses: bool,
}

/// Rendered text report; `lines` holds one entry per node in sorted order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextReport {
    pub header: Vec<String>,
    pub lines: Vec<String>,
}

/// Row model served to the HTTP UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportItem {
    pub rank: usize,
    pub flat: String,
    pub flat_value: i64,
    pub flat_perc: f64,
    pub flatsum_perc: f64,
    pub cum: String,
    pub cum_value: i64,
    pub cum_perc: f64,
    pub name: String,
    /// `name`, prefixed by as much of the call path as tells it apart from
    /// other rows of the same name
    pub label: String,
    /// Name of the calling node; `None` for outermost frames
    pub caller: Option<String>,
    pub address: String,
    pub location: String,
    /// Active value relative to the largest one, in `[0, 1]`
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DotOptions {
    /// Nodes with the largest cumulative values kept in the graph
    pub max_nodes: usize,
}

impl Default for DotOptions {
    fn default() -> Self {
        DotOptions { max_nodes: 80 }
    }
}

fn percent(value: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        value as f64 * 100.0 / total as f64
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Format a sample value in its unit, pprof style: `1.50MB`, `20ms`, `1234`
pub fn format_value(value: i64, unit: &str) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs() as f64;

    let scaled = |steps: &[(f64, &str)]| -> String {
        let (div, suffix) = steps
            .iter()
            .rev()
            .find(|(div, _)| abs >= *div)
            .copied()
            .unwrap_or(steps[0]);
        format!("{}{}{}", sign, trim_float(abs / div), suffix)
    };

    match unit {
        "bytes" => scaled(&[
            (1.0, "B"),
            (1024.0, "kB"),
            (1024.0 * 1024.0, "MB"),
            (1024.0 * 1024.0 * 1024.0, "GB"),
            (1024.0 * 1024.0 * 1024.0 * 1024.0, "TB"),
        ]),
        "nanoseconds" => scaled(&[
            (1.0, "ns"),
            (1e3, "us"),
            (1e6, "ms"),
            (1e9, "s"),
            (60e9, "mins"),
            (3600e9, "hrs"),
        ]),
        _ => value.to_string(),
    }
}

fn trim_float(v: f64) -> String {
    let s = format!("{:.2}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Render one line per node, preceded by a short header
pub fn render_text(tree: &ReportTree, options: &TextOptions) -> TextReport {
    let unit = tree.value_type.unit.as_str();
    let header = vec![
        format!("Type: {}", tree.value_type.kind),
        format!(
            "Showing nodes accounting for {}, {}% of {} total",
            format_value(tree.total, unit),
            trim_float(percent(tree.total, tree.profile_total)),
            format_value(tree.profile_total, unit),
        ),
        format!(
            "{:>4} {:>10} {:>7} {:>7} {:>10} {:>7}",
            "", "flat", "flat%", "sum%", "cum", "cum%"
        ),
    ];

    let labels = tree.labels();
    let mut running = 0.0;
    let lines = tree
        .sorted()
        .into_iter()
        .enumerate()
        .map(|(rank, idx)| {
            let node = &tree.nodes[idx];
            let flat_pct = percent(node.flat, tree.profile_total);
            running += flat_pct;

            let mut line = format!(
                "{:>4} {:>10} {:>6.2}% {:>6.2}% {:>10} {:>6.2}%",
                rank + 1,
                format_value(node.flat, unit),
                flat_pct,
                running,
                format_value(node.cum, unit),
                percent(node.cum, tree.profile_total),
            );
            if options.print_addresses {
                let _ = write!(line, " {:#014x}", node.address);
            }
            let _ = write!(line, " {}", labels[idx]);
            line
        })
        .collect();

    TextReport { header, lines }
}

/// Render nodes as JSON rows in sorted order
pub fn render_json(tree: &ReportTree) -> Vec<ReportItem> {
    let unit = tree.value_type.unit.as_str();
    let max = tree
        .nodes
        .iter()
        .enumerate()
        .map(|(i, _)| tree.value(i))
        .max()
        .unwrap_or(0);

    let labels = tree.labels();
    let mut running = 0.0;
    tree.sorted()
        .into_iter()
        .enumerate()
        .map(|(rank, idx)| {
            let node = &tree.nodes[idx];
            let flat_pct = percent(node.flat, tree.profile_total);
            running += flat_pct;
            ReportItem {
                rank: rank + 1,
                flat: format_value(node.flat, unit),
                flat_value: node.flat,
                flat_perc: round2(flat_pct),
                flatsum_perc: round2(running),
                cum: format_value(node.cum, unit),
                cum_value: node.cum,
                cum_perc: round2(percent(node.cum, tree.profile_total)),
                name: node.name.clone(),
                label: labels[idx].clone(),
                caller: node.parent.map(|p| tree.nodes[p].name.clone()),
                address: format!("{:#x}", node.address),
                location: if node.line > 0 {
                    format!("{}:{}", node.file, node.line)
                } else {
                    node.file.clone()
                },
                score: if max > 0 {
                    tree.value(idx) as f64 / max as f64
                } else {
                    0.0
                },
            }
        })
        .collect()
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render the tree as a Graphviz digraph description
pub fn render_dot(tree: &ReportTree, options: &DotOptions) -> String {
    let unit = tree.value_type.unit.as_str();

    let mut by_cum: Vec<usize> = (0..tree.len()).collect();
    by_cum.sort_by(|&a, &b| {
        tree.nodes[b]
            .cum
            .cmp(&tree.nodes[a].cum)
            .then_with(|| tree.nodes[a].name.cmp(&tree.nodes[b].name))
            .then(a.cmp(&b))
    });
    by_cum.truncate(options.max_nodes);
    let kept: HashSet<usize> = by_cum.iter().copied().collect();
    let max_flat = by_cum.iter().map(|&i| tree.nodes[i].flat).max().unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "digraph \"{}\" {{", escape(&tree.value_type.kind));
    let _ = writeln!(out, "node [style=filled fillcolor=\"#f8f8f8\" shape=box];");
    let _ = writeln!(
        out,
        "legend [shape=note label=\"{}\\lShowing nodes accounting for {}, {}% of {} total\\l\"];",
        escape(&tree.value_type.kind),
        format_value(tree.total, unit),
        trim_float(percent(tree.total, tree.profile_total)),
        format_value(tree.profile_total, unit),
    );

    let mut order = by_cum.clone();
    order.sort_unstable();
    for &idx in &order {
        let node = &tree.nodes[idx];
        let fontsize = if max_flat > 0 {
            8 + (24 * node.flat / max_flat)
        } else {
            8
        };
        let _ = writeln!(
            out,
            "N{} [label=\"{}\\n{} ({}%)\\nof {} ({}%)\" fontsize={}];",
            idx,
            escape(&node.name),
            format_value(node.flat, unit),
            trim_float(percent(node.flat, tree.profile_total)),
            format_value(node.cum, unit),
            trim_float(percent(node.cum, tree.profile_total)),
            fontsize,
        );
    }
    for &idx in &order {
        for &child in &tree.nodes[idx].children {
            if kept.contains(&child) {
                let _ = writeln!(
                    out,
                    "N{} -> N{} [label=\" {}\"];",
                    idx,
                    child,
                    format_value(tree.nodes[child].cum, unit)
                );
            }
        }
    }
    out.push_str("}\n");
    out
}

/// Lay out the tree as an image through `layout`
pub fn render_image(
    tree: &ReportTree,
    options: &DotOptions,
    layout: &dyn GraphLayout,
) -> Result<Vec<u8>> {
    layout.layout(&render_dot(tree, options))
}
