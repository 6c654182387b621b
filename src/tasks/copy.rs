// src/tasks/copy.rs

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::tasks::{AssetTask, InputSet, TaskContext, TaskReport, for_each_source};
use crate::types::TaskKind;

/// A named set of static files copied verbatim (fonts, videos, ...).
#[derive(Debug, Clone)]
pub struct AssetGroup {
    name: String,
    inputs: InputSet,
    /// Relative to the output root; empty means the root itself.
    output_dir: PathBuf,
}

impl AssetGroup {
    pub fn new(name: &str, inputs: InputSet, output_dir: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs,
            output_dir: PathBuf::from(output_dir),
        }
    }
}

/// Copies every configured asset group. Absent groups are skipped.
#[derive(Debug, Clone)]
pub struct CopyTask {
    groups: Vec<AssetGroup>,
}

impl CopyTask {
    pub fn new(groups: Vec<AssetGroup>) -> Self {
        Self { groups }
    }
}

impl AssetTask for CopyTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Copy
    }

    fn plan(&self, ctx: &TaskContext) -> Result<Vec<PathBuf>> {
        let mut planned = Vec::new();
        for group in self.groups.iter() {
            let out = ctx.dist_root.join(&group.output_dir);
            for source in group.inputs.collect(ctx.fs.as_ref(), &ctx.src_root)? {
                planned.push(out.join(&source.rel_base));
            }
        }
        Ok(planned)
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskReport> {
        let mut total = TaskReport::default();

        for group in self.groups.iter() {
            let sources = group.inputs.collect(ctx.fs.as_ref(), &ctx.src_root)?;
            if sources.is_empty() {
                debug!(group = %group.name, "asset group absent; skipping");
                continue;
            }

            let out = ctx.dist_root.join(&group.output_dir);
            let report = for_each_source(TaskKind::Copy, &sources, |source, report| {
                let bytes = ctx.fs.read(&source.path)?;
                report.write(ctx, out.join(&source.rel_base), &bytes)
            })?;

            debug!(group = %group.name, files = report.written.len(), "copied asset group");
            total.bytes += report.bytes;
            total.written.extend(report.written);
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;

    fn ctx(fs: &MockFileSystem) -> TaskContext {
        TaskContext {
            fs: Arc::new(fs.clone()),
            src_root: "/p/src".into(),
            dist_root: "/p/dist".into(),
        }
    }

    fn default_groups() -> Vec<AssetGroup> {
        vec![
            AssetGroup::new("fonts", InputSet::single("fonts/**/*").unwrap(), "fonts"),
            AssetGroup::new("favicon", InputSet::single("favicon.ico").unwrap(), ""),
        ]
    }

    #[test]
    fn copies_groups_into_their_output_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/fonts/inter/regular.woff2", "font");
        fs.add_file("/p/src/favicon.ico", "ico");

        let report = CopyTask::new(default_groups()).run(&ctx(&fs)).unwrap();

        assert_eq!(report.bytes, 7);
        assert!(fs.is_file(Path::new("/p/dist/fonts/inter/regular.woff2")));
        assert!(fs.is_file(Path::new("/p/dist/favicon.ico")));
    }

    #[test]
    fn absent_groups_create_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.html", "<p>");

        let task = CopyTask::new(default_groups());
        let report = task.run(&ctx(&fs)).unwrap();

        assert!(report.written.is_empty());
        assert!(task.plan(&ctx(&fs)).unwrap().is_empty());
        assert!(!fs.exists(Path::new("/p/dist/fonts")));
    }
}
