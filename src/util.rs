use std::path::Path;

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            if relative.as_os_str().is_empty() {
                return ".".to_string();
            }
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

/// `1 package`, `3 packages`.
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
