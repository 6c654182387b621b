// src/tasks/clean.rs

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::tasks::{AssetTask, TaskContext, TaskReport};
use crate::types::TaskKind;

/// Deletes the output root. Running it twice is fine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanTask;

impl AssetTask for CleanTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Clean
    }

    fn plan(&self, _ctx: &TaskContext) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskReport> {
        let existed = ctx.fs.exists(&ctx.dist_root);
        ctx.fs.remove_dir_all(&ctx.dist_root)?;
        info!(dir = ?ctx.dist_root, existed, "cleaned output directory");
        Ok(TaskReport::default())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn clean_is_idempotent() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/dist/css/main.css", "a{}");
        fs.add_file("/p/src/index.html", "<p>");

        let ctx = TaskContext {
            fs: Arc::new(fs.clone()),
            src_root: "/p/src".into(),
            dist_root: "/p/dist".into(),
        };

        CleanTask.run(&ctx).unwrap();
        CleanTask.run(&ctx).unwrap();

        assert!(!fs.exists(Path::new("/p/dist")));
        assert_eq!(fs.file_paths(), vec![PathBuf::from("/p/src/index.html")]);
    }
}
