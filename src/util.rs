#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Reads a text file, decoding it as UTF-8 and falling back to latin-1 when
/// the bytes are not valid UTF-8.
///
/// latin-1 maps every byte to the code point of the same value, so the
/// fallback never fails.
pub fn read_text_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).with_context(|| format!("Error reading file {}", path.display()))?;

    Ok(decode_text(bytes))
}

/// Decodes raw bytes as UTF-8, or as latin-1 if that fails.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!("Input is not valid UTF-8 ({err}), decoding as latin-1");
            err.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

/// Number of whitespace-delimited tokens in `text`
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// A glob utility function to find paths to files with certain extension
///
/// * `extension`: the file extension to find paths for
/// * `search_depth`: how many folders deep to search for
/// * `root_dir`: the root directory where search starts
pub fn find_files(extension: &str, search_depth: i8, root_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pattern = root_dir.to_path_buf();

    for _ in 0..search_depth {
        pattern.push("**");
    }

    pattern.push(format!("*.{extension}"));
    let pattern = pattern
        .to_str()
        .context("Could not convert root_dir to string")?
        .to_string();

    Ok(glob(&pattern)
        .context("Could not create glob")?
        .filter_map(Result::ok)
        .collect())
}

/// Finds every submission file directly inside `dir` with one of the given
/// extensions, sorted by path.
pub fn submission_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let mut files = Vec::new();
    for extension in extensions {
        files.extend(find_files(extension, 0, dir)?);
    }
    files.sort();
    files.dedup();

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whitespace_delimited_tokens() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   \n\t "), 0);
        assert_eq!(count_words("one two\tthree\nfour  five"), 5);
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        let bytes = vec![b'c', b'a', b'f', 0xE9];
        assert_eq!(decode_text(bytes), "caf\u{e9}");
    }

    #[test]
    fn valid_utf8_is_kept() {
        let text = "na\u{ef}ve r\u{e9}sum\u{e9}".to_string();
        assert_eq!(decode_text(text.clone().into_bytes()), text);
    }
}
