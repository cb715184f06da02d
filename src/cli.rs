use anyhow::{Result, bail};
use regex::Regex;
use std::sync::OnceLock;

/// Split a comma-separated argument into trimmed, non-empty names.
pub fn split_list(arg: Option<&str>) -> Vec<String> {
    arg.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parsed `command` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Empty means every registered plugin.
    pub plugins: Vec<String>,
    pub command: String,
}

fn spec_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(.+):(.+)|^:(.+)").unwrap())
}

/// Parse `a,b:"git checkout master"` or `:"git status"`.
///
/// The first match of `(.+):(.+)` wins, so a command that itself contains
/// a colon splits at its last colon. Surrounding double quotes on the
/// command are removed.
pub fn parse_command_spec(arg: &str) -> Result<CommandSpec> {
    let Some(caps) = spec_regex().captures(arg) else {
        bail!("{} un-recognised option parameter, expected [PLUGINS]:\"COMMAND\"", arg);
    };
    let (plugins, command) = match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(p), Some(c), _) => (split_list(Some(p.as_str())), c.as_str()),
        (_, _, Some(c)) => (Vec::new(), c.as_str()),
        _ => bail!("{} un-recognised option parameter", arg),
    };
    let command = unquote(command.trim());
    if command.is_empty() {
        bail!("empty command in {}", arg);
    }
    Ok(CommandSpec {
        plugins,
        command: command.to_string(),
    })
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(split_list(Some(" a, b,,c ")), vec!["a", "b", "c"]);
        assert!(split_list(None).is_empty());
        assert!(split_list(Some("")).is_empty());
    }

    #[test]
    fn command_for_named_plugins() {
        let spec = parse_command_spec("one,two:\"git checkout master\"").unwrap();
        assert_eq!(spec.plugins, vec!["one", "two"]);
        assert_eq!(spec.command, "git checkout master");
    }

    #[test]
    fn command_for_all_plugins() {
        let spec = parse_command_spec(":git status").unwrap();
        assert!(spec.plugins.is_empty());
        assert_eq!(spec.command, "git status");
    }

    #[test]
    fn colon_inside_command_splits_at_last_colon() {
        let spec = parse_command_spec("one:git log --format=%h:%s").unwrap();
        assert_eq!(spec.plugins, vec!["one:git log --format=%h"]);
        assert_eq!(spec.command, "%s");
    }

    #[test]
    fn missing_colon_is_rejected() {
        assert!(parse_command_spec("git status").is_err());
        assert!(parse_command_spec(":").is_err());
    }
}
