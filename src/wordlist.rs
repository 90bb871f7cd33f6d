//! Wordlist loading

use crate::error::{Result, TalosError};
use std::path::Path;

/// Loads a newline-delimited wordlist, skipping blank lines and `#` comments.
pub fn load(path: &str) -> Result<Vec<String>> {
    if !Path::new(path).exists() {
        return Err(TalosError::WordlistError(format!(
            "wordlist file not found: {path}"
        )));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| TalosError::WordlistError(format!("failed to read {path}: {e}")))?;

    Ok(parse(&content))
}

/// Counts usable wordlist entries, for the pre-scan configuration display.
pub fn count(path: &str) -> Result<usize> {
    Ok(load(path)?.len())
}

fn parse(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_and_blanks() {
        let words = parse("admin\n\n# comment\n  login  \n#tail\napi\n");
        assert_eq!(words, vec!["admin", "login", "api"]);
    }

    #[test]
    fn load_missing_file_is_error() {
        assert!(load("/nonexistent/wordlist.txt").is_err());
    }
}
