use std::path::{Path, PathBuf};

/// Clean a filename by removing characters that are invalid on common
/// filesystems: `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
///
/// Stripping the separators also keeps a hostile remote name from escaping
/// the destination directory.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}

/// Whether a cleaned name can be joined onto a directory as a single file.
pub fn is_usable_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}

/// Names starting with a dot are never touched by purge. The in-flight
/// `.part` file relies on this.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Hidden sibling used while a download is in flight:
/// `dir/IMG_0001.JPG` → `dir/.IMG_0001.JPG.part`.
pub fn part_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.part", name))
}
