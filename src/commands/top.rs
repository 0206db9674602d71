use crate::error::Result;
use crate::report::{self, ReportItem, compile_filter};
use crate::store::Registry;
use comfy_table::{Cell, CellAlignment, Table, presets};
use serde::Serialize;
use std::time::Duration;

pub struct TopOptions {
    pub limit: usize,
    pub filter: Option<String>,
    pub cumulative: bool,
    pub seconds: Option<Duration>,
    pub json: bool,
    pub csv: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    kind: &'a str,
    sample_type: &'a str,
    unit: &'a str,
    total: i64,
    entries: &'a [ReportItem],
}

pub fn run(registry: &Registry, kind: &str, options: &TopOptions) -> Result<()> {
    let filter = compile_filter(options.filter.as_deref().unwrap_or(""))?;
    let seconds = options.seconds.map(|d| d.as_secs().max(1)).unwrap_or(0);

    let profile = registry.require(kind)?.fetch(false, seconds)?;
    let tree = report::apply(&profile, filter.as_ref(), options.cumulative);
    let mut items = report::render_json(&tree);
    items.truncate(options.limit);

    if options.json {
        let report = JsonReport {
            kind,
            sample_type: &tree.value_type.kind,
            unit: &tree.value_type.unit,
            total: tree.profile_total,
            entries: &items,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if options.csv {
        print_csv(&items);
    } else {
        println!(
            "# {} ({}) | total {}",
            kind,
            tree.value_type.kind,
            report::format_value(tree.profile_total, &tree.value_type.unit)
        );
        println!("{}", table(&items));
    }

    Ok(())
}

fn table(items: &[ReportItem]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_header(["FLAT", "FLAT%", "SUM%", "CUM", "CUM%", "FUNCTION", "LOCATION"]);

    let right = |s: String| Cell::new(s).set_alignment(CellAlignment::Right);
    for item in items {
        table.add_row(vec![
            right(item.flat.clone()),
            right(format!("{:.2}%", item.flat_perc)),
            right(format!("{:.2}%", item.flatsum_perc)),
            right(item.cum.clone()),
            right(format!("{:.2}%", item.cum_perc)),
            Cell::new(&item.label),
            Cell::new(simplify_path(&item.location)),
        ]);
    }
    table
}

fn print_csv(items: &[ReportItem]) {
    println!("flat,flat_pct,cum,cum_pct,function,location");
    for item in items {
        println!(
            "{},{:.2},{},{:.2},\"{}\",\"{}\"",
            item.flat_value,
            item.flat_perc,
            item.cum_value,
            item.cum_perc,
            item.label.replace('"', "\"\""),
            item.location.replace('"', "\"\"")
        );
    }
}

/// Shorten a source path to the part that identifies it
fn simplify_path(path: &str) -> String {
    if path.is_empty() || path.starts_with('[') {
        return path.to_string();
    }

    // Module cache: keep module path and file
    if let Some(idx) = path.find("/pkg/mod/") {
        return path[idx + 9..].to_string();
    }

    // Standard library
    if let Some(idx) = path.find("/go/src/") {
        return format!("<std>/{}", &path[idx + 8..]);
    }

    if let Some(idx) = path.find("/src/") {
        return path[idx + 5..].to_string();
    }

    path.rsplit('/').next().unwrap_or(path).to_string()
}
