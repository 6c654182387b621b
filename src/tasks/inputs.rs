// src/tasks/inputs.rs

//! Source discovery: glob patterns relative to the source root.

use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use globset::GlobSet;
use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::patterns::build_globset;

/// One matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as seen by the file system (`<src_root>/<rel_src>`).
    pub path: PathBuf,
    /// Path relative to the source root.
    pub rel_src: PathBuf,
    /// Path relative to the literal base of the glob, e.g. `pages/home.scss`
    /// for `scss/pages/home.scss` matched by `scss/**/*.scss`. Outputs mirror
    /// this part.
    pub rel_base: PathBuf,
}

/// Compiled include/exclude globs plus the directory the walk starts from.
#[derive(Debug, Clone)]
pub struct InputSet {
    base: PathBuf,
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl InputSet {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let base = include
            .iter()
            .map(|p| literal_base(p))
            .reduce(|a, b| common_prefix(&a, &b))
            .unwrap_or_default();

        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };

        Ok(Self {
            base,
            include: build_globset(include)?,
            exclude,
        })
    }

    pub fn single(pattern: &str) -> Result<Self> {
        Self::new(&[pattern.to_string()], &[])
    }

    /// Directory (relative to the source root) that holds every match.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether a path relative to the source root is selected.
    pub fn matches(&self, rel_src: &Path) -> bool {
        let rel = rel_src.to_string_lossy().replace('\\', "/");
        self.include.is_match(&rel) && !self.exclude.as_ref().is_some_and(|e| e.is_match(&rel))
    }

    /// Walk the source tree and return every matching file, sorted by path.
    ///
    /// A missing base directory is not an error: optional asset folders
    /// simply produce nothing.
    pub fn collect(&self, fs: &dyn FileSystem, src_root: &Path) -> Result<Vec<SourceFile>> {
        let start = src_root.join(&self.base);
        if !fs.is_dir(&start) {
            debug!(dir = ?start, "input directory missing; nothing to collect");
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut stack = vec![start];

        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                    continue;
                }
                if !fs.is_file(&path) {
                    continue;
                }
                let Ok(rel_src) = path.strip_prefix(src_root) else {
                    continue;
                };
                if !self.matches(rel_src) {
                    continue;
                }

                let rel_src = rel_src.to_path_buf();
                let rel_base = rel_src
                    .strip_prefix(&self.base)
                    .unwrap_or(&rel_src)
                    .to_path_buf();
                found.push(SourceFile {
                    path,
                    rel_src,
                    rel_base,
                });
            }
        }

        found.sort_by(|a, b| a.rel_src.cmp(&b.rel_src));
        Ok(found)
    }
}

/// Leading directory components without glob metacharacters. The last
/// component always names files, so it never belongs to the base.
fn literal_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();

    let mut base = PathBuf::new();
    for part in &parts[..parts.len().saturating_sub(1)] {
        if part.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(part);
    }
    base
}

fn common_prefix(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn base_is_the_literal_directory_prefix() {
        assert_eq!(literal_base("scss/**/*.scss"), PathBuf::from("scss"));
        assert_eq!(literal_base("js/*.js"), PathBuf::from("js"));
        assert_eq!(literal_base("favicon.ico"), PathBuf::new());
        assert_eq!(literal_base("**/*.html"), PathBuf::new());
        assert_eq!(literal_base("assets/img/**/*"), PathBuf::from("assets/img"));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let set = InputSet::single("js/*.js").unwrap();
        assert!(set.matches(Path::new("js/app.js")));
        assert!(!set.matches(Path::new("js/vendor/lib.js")));
    }

    #[test]
    fn collect_applies_excludes_and_strips_base() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.html", "<p>");
        fs.add_file("/p/src/blog/post.html", "<p>");
        fs.add_file("/p/src/include/header.html", "<h1>");
        fs.add_file("/p/src/scss/main.scss", "a{}");

        let set = InputSet::new(&strings(&["**/*.html"]), &strings(&["include/**"])).unwrap();
        let found = set.collect(&fs, Path::new("/p/src")).unwrap();

        let rels: Vec<_> = found.iter().map(|f| f.rel_src.clone()).collect();
        assert_eq!(
            rels,
            vec![PathBuf::from("blog/post.html"), PathBuf::from("index.html")]
        );
        assert_eq!(found[0].rel_base, PathBuf::from("blog/post.html"));
    }

    #[test]
    fn missing_base_directory_yields_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.html", "<p>");

        let set = InputSet::single("fonts/**/*").unwrap();
        assert!(set.collect(&fs, Path::new("/p/src")).unwrap().is_empty());
    }
}
