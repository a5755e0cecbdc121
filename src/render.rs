//! Aligned, colored output of a [`Listing`].

use colored::{ColoredString, Colorize};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

use crate::markers;
use crate::types::{Entry, Listing, ListingMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Grey,
    Blue,
    Red,
    Cyan,
}

/// Apply `style` on top of `text` when `predicate` holds. Later styles win.
pub fn style_if(text: ColoredString, predicate: bool, style: Style) -> ColoredString {
    if !predicate {
        return text;
    }
    match style {
        Style::Grey => text.bright_black(),
        Style::Blue => text.blue(),
        Style::Red => text.red(),
        Style::Cyan => text.cyan(),
    }
}

fn pad_left(text: &str, width: usize) -> String {
    format!("{text:>width$}")
}

fn pad_right(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

/// Write the `total` line followed by one aligned line per entry.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render(listing: &Listing, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "total {}", listing.total_blocks)?;

    let link_base = match &listing.mode {
        ListingMode::Git { root } => root.as_path(),
        ListingMode::Plain => listing.dir.as_path(),
    };

    for entry in &listing.entries {
        writeln!(out, "{}", render_entry(listing, entry, link_base))?;
    }
    Ok(())
}

fn render_entry(listing: &Listing, entry: &Entry, link_base: &Path) -> String {
    let widths = &listing.widths;
    let deleted = entry.is_deleted();

    let mut fields = vec![
        style_if(pad_left(&entry.mode, widths.mode).normal(), deleted, Style::Grey),
        style_if(pad_left(&entry.nlink, widths.nlink).normal(), deleted, Style::Grey),
        pad_left(&entry.uid, widths.uid).bright_black(),
        pad_right(&entry.gid, widths.gid).bright_black(),
        style_if(pad_left(&entry.size, widths.size).normal(), deleted, Style::Grey),
        style_if(pad_left(&entry.date, widths.date).normal(), deleted, Style::Grey),
    ];

    if listing.is_git() {
        fields.push(markers::marker(&entry.status).map_or_else(
            || {
                debug!(status = %entry.status, name = %entry.name, "No marker for status");
                " ".normal()
            },
            markers::Marker::paint,
        ));
    }

    let mut line = fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    line.push(' ');
    line.push_str(&render_name(entry, link_base));
    line
}

fn render_name(entry: &Entry, link_base: &Path) -> String {
    if entry.is_symbolic_link {
        let target = entry.realpath.as_deref().map_or_else(String::new, |realpath| {
            pathdiff::diff_paths(realpath, link_base)
                .unwrap_or_else(|| realpath.to_path_buf())
                .display()
                .to_string()
        });
        return format!("{} -> {target}", entry.name.cyan());
    }

    let name = entry.name.normal();
    let name = style_if(name, entry.is_executable, Style::Red);
    let name = style_if(name, entry.is_directory, Style::Blue);
    style_if(name, entry.is_deleted(), Style::Grey).to_string()
}

/// Write the listing as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render_json(listing: &Listing, out: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, listing)?;
    writeln!(out)
}
