// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::types::{ReloadKind, TaskKind};

/// Build a `GlobSet` from patterns relative to the source root.
///
/// `*` stops at `/`, so `js/*.js` does not reach into `js/vendor/`; use `**`
/// to cross directories.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// A compiled source glob set mapped to the task it re-runs and the browser
/// signal sent once that task succeeds.
#[derive(Clone)]
pub struct WatchBinding {
    task: TaskName,
    reload: ReloadKind,
    use_hash: bool,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("task", &self.task)
            .field("reload", &self.reload)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(
        task: TaskKind,
        watch: &[String],
        exclude: &[String],
        reload: ReloadKind,
        use_hash: bool,
    ) -> Result<Self> {
        let watch_set =
            build_globset(watch).with_context(|| format!("building watch globset for {task}"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for {task}"))?,
            )
        };

        Ok(Self {
            task: task.as_str().to_string(),
            reload,
            use_hash,
            watch_set,
            exclude_set,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn reload(&self) -> ReloadKind {
        self.reload
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// Whether a path relative to the source root (with `/` separators)
    /// belongs to this binding.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path)
            && !self
                .exclude_set
                .as_ref()
                .is_some_and(|exclude| exclude.is_match(rel_path))
    }
}

/// The development bindings:
///
/// | sources                       | task       | signal         |
/// |-------------------------------|------------|----------------|
/// | html (+ partials, not copied) | html       | full reload    |
/// | asset groups                  | copy       | full reload    |
/// | scss                          | css        | inject styles  |
/// | js                            | js         | inject scripts |
/// | images                        | copyimages | full reload    |
pub fn default_bindings(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    let paths = &cfg.paths;
    let use_hash = cfg.watch.use_hash;
    let one = |pattern: &String| vec![pattern.clone()];
    let assets: Vec<String> = paths.assets.iter().map(|a| a.src.clone()).collect();

    let mut bindings = vec![
        // Partials are watched too: editing one re-renders the pages.
        WatchBinding::new(
            TaskKind::Html,
            &paths.html,
            &paths.copied_sources(),
            ReloadKind::FullReload,
            use_hash,
        )?,
        WatchBinding::new(TaskKind::Css, &one(&paths.scss), &[], ReloadKind::InjectStyles, use_hash)?,
        WatchBinding::new(TaskKind::Js, &one(&paths.js), &[], ReloadKind::InjectScripts, use_hash)?,
        WatchBinding::new(
            TaskKind::CopyImages,
            &one(&paths.images),
            &[],
            ReloadKind::FullReload,
            use_hash,
        )?,
    ];
    if !assets.is_empty() {
        bindings.push(WatchBinding::new(
            TaskKind::Copy,
            &assets,
            &[],
            ReloadKind::FullReload,
            use_hash,
        )?);
    }
    Ok(bindings)
}

/// Reload signal per bound task, for [`crate::engine::CoreRuntime::set_reload_policy`].
pub fn reload_policy(bindings: &[WatchBinding]) -> Vec<(TaskName, ReloadKind)> {
    bindings
        .iter()
        .map(|b| (b.task.clone(), b.reload))
        .collect()
}

/// Every file under `root` that belongs to `binding`; used for content
/// hashing.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    binding: &WatchBinding,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(root) {
        return Ok(files);
    }
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if binding.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;
    use crate::fs::mock::MockFileSystem;

    fn bindings() -> Vec<WatchBinding> {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        default_bindings(&cfg).unwrap()
    }

    fn tasks_for(path: &str) -> Vec<String> {
        bindings()
            .iter()
            .filter(|b| b.matches(path))
            .map(|b| b.task().to_string())
            .collect()
    }

    #[test]
    fn each_source_kind_maps_to_one_task() {
        assert_eq!(tasks_for("scss/components/_button.scss"), vec!["css"]);
        assert_eq!(tasks_for("js/app.js"), vec!["js"]);
        assert_eq!(tasks_for("images/hero/banner.png"), vec!["copyimages"]);
        assert_eq!(tasks_for("fonts/inter.woff2"), vec!["copy"]);
        assert_eq!(tasks_for("favicon.ico"), vec!["copy"]);
        assert!(tasks_for("notes.txt").is_empty());
    }

    #[test]
    fn partials_trigger_html() {
        assert_eq!(tasks_for("include/header.html"), vec!["html"]);
        assert_eq!(tasks_for("index.html"), vec!["html"]);
    }

    #[test]
    fn pages_inside_copied_dirs_only_trigger_copy() {
        assert_eq!(tasks_for("plugins/slider/demo.html"), vec!["copy"]);
        assert_eq!(tasks_for("images/banner.html"), vec!["copyimages"]);
    }

    #[test]
    fn reload_policy_matches_bindings() {
        let policy = reload_policy(&bindings());
        assert!(policy.contains(&("css".to_string(), ReloadKind::InjectStyles)));
        assert!(policy.contains(&("js".to_string(), ReloadKind::InjectScripts)));
        assert!(policy.contains(&("html".to_string(), ReloadKind::FullReload)));
    }

    #[test]
    fn collect_matching_files_walks_the_tree() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/scss/main.scss", "a{}");
        fs.add_file("/p/src/scss/parts/_x.scss", "b{}");
        fs.add_file("/p/src/js/app.js", "1");

        let css = bindings().into_iter().find(|b| b.task() == "css").unwrap();
        let files = collect_matching_files(&fs, Path::new("/p/src"), &css).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/p/src/scss/main.scss"),
                PathBuf::from("/p/src/scss/parts/_x.scss")
            ]
        );
    }
}
