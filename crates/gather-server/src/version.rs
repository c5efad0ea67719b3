//! Program metadata for `--version` output and the startup log line.

use std::io::{self, Write};

/// Persistent name of the program, used where argv[0] is not wanted
pub const PROGRAM: &str = "gather-server";

const ENV_LOCATION: &str = "LOCATION";

pub fn current_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Stamped in at build time through the `BUILD_TIME` environment variable
pub fn build_time() -> Option<&'static str> {
    option_env!("BUILD_TIME").filter(|t| !t.is_empty())
}

fn location() -> Option<String> {
    std::env::var(ENV_LOCATION).ok().filter(|l| !l.is_empty())
}

pub fn print_to(w: &mut impl Write) -> io::Result<()> {
    writeln!(w, "{PROGRAM}: Version {}", current_version())?;
    if let Some(t) = build_time() {
        writeln!(w, "{PROGRAM}: Build-time: {t}")?;
    }
    if let Some(l) = location() {
        writeln!(w, "{PROGRAM}: current location (per Environ): {l:?}")?;
    }
    Ok(())
}

/// Key/value pairs for structured logging; same content as [`print_to`]
pub fn log_pairs() -> Vec<(&'static str, String)> {
    let mut pairs = vec![("version", current_version().to_string())];
    if let Some(t) = build_time() {
        pairs.push(("build_time", t.to_string()));
    }
    if let Some(l) = location() {
        pairs.push(("location", l));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_to_starts_with_version_line() {
        let mut out = Vec::new();
        print_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(&format!("gather-server: Version {}\n", current_version())));
    }

    #[test]
    fn test_log_pairs_lead_with_version() {
        let pairs = log_pairs();
        assert_eq!(pairs[0], ("version", current_version().to_string()));
    }
}
