//! Cache adapters.

mod json_file;
mod memory;

pub use json_file::JsonFileCache;
pub use memory::MemoryCache;

pub const PROJECT_CACHE: &str = "project";
pub const GLOBAL_CACHE: &str = "global";
pub const REQUESTS_CACHE: &str = "requests";
pub const PROJECT_BINARY_CACHE: &str = "project-binary";

/// Cache file name for a namespace scoped to `project_home`.
///
/// Anything outside `[-a-z0-9_.]` collapses to a single `-`.
pub fn project_scoped_name(namespace: &str, project_home: &std::path::Path) -> String {
    let raw = format!("{namespace}.{}", project_home.display()).to_lowercase();
    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn project_names_are_slugified() {
        assert_eq!(
            project_scoped_name(PROJECT_CACHE, Path::new("/home/Dev/My App")),
            "project.-home-dev-my-app"
        );
    }
}
