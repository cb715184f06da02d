use log::warn;
use regex::Regex;
use std::sync::OnceLock;

/// One `<name> <url>` line of an `svn:externals` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEntry {
    pub name: String,
    pub url: String,
}

fn entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(.+?)\s+(\S+)\s*$").unwrap())
}

/// Parse `svn propget svn:externals` output.
///
/// Blank lines are ignored. Lines that do not split into a name and a
/// URL are skipped with a warning.
pub fn parse_externals(text: &str) -> Vec<ExternalEntry> {
    let mut out = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match entry_regex().captures(line) {
            Some(caps) => out.push(ExternalEntry {
                name: caps[1].trim().to_string(),
                url: caps[2].to_string(),
            }),
            None => warn!("skipping unrecognised externals line: {:?}", line),
        }
    }
    out
}

/// `svn` reports a missing path on stdout/stderr with this phrase.
pub fn reports_missing(text: &str) -> bool {
    text.contains("does not exist")
}
