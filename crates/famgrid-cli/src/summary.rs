//! Plain-text rendering of a layout, one line per grid row.
//!
//! ```text
//! focal c1: 3 people, 2 lines, 0 labels, x -1.00..1.00
//! row -1: p2@-0.50 p1@0.50
//! row  0: *c1@0.00
//! ```
//!
//! `*` marks the focal person, `!` the marked one. Duplicate placements are
//! printed under their `id#n` key.

use std::collections::BTreeMap;
use std::io::{self, Write};

use famgrid_layout::{Entity, Layout};

pub fn write_summary(layout: &Layout, out: &mut dyn Write) -> io::Result<()> {
    let focal = layout.focal().map_or("?", |e| e.person.as_str());
    writeln!(
        out,
        "focal {focal}: {} people, {} lines, {} labels, x {:.2}..{:.2}",
        layout.len(),
        layout.lines.len(),
        layout.labels.len(),
        layout.bounds.left(),
        layout.bounds.right(),
    )?;

    let mut rows: BTreeMap<i32, Vec<(&str, &Entity)>> = BTreeMap::new();
    for (key, entity) in &layout.entities {
        rows.entry(entity.y).or_default().push((key.as_str(), entity));
    }
    let width = rows.keys().map(|y| y.to_string().len()).max().unwrap_or(1);

    for (y, mut row) in rows {
        row.sort_by(|a, b| a.1.x.total_cmp(&b.1.x).then_with(|| a.0.cmp(b.0)));
        write!(out, "row {y:>width$}:")?;
        for (key, entity) in row {
            let flag = match (entity.focal, entity.marked) {
                (true, true) => "*!",
                (true, false) => "*",
                (false, true) => "!",
                (false, false) => "",
            };
            write!(out, " {flag}{key}@{:.2}", entity.x)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
