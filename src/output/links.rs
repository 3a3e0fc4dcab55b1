//! Link file reading and writing
//!
//! A link file holds one listing URL per line. Blank lines and lines starting
//! with `#` are ignored when reading.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default link file name
pub const DEFAULT_LINKS_FILE: &str = "links.txt";

/// Writes links one per line; returns how many were written
pub fn write_links<'a>(path: &Path, links: impl IntoIterator<Item = &'a str>) -> std::io::Result<usize> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for link in links {
        writeln!(writer, "{}", link)?;
        written += 1;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), written, "Link file written");
    Ok(written)
}

/// Reads a link file
pub fn read_links(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_links(&content))
}

fn parse_links(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
