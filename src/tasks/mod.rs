// src/tasks/mod.rs

//! The built-in asset tasks.
//!
//! Every task implements [`AssetTask`]: it can *plan* the files it would
//! write for the current source tree and *run* to write them. Actual
//! transformations are delegated to library crates (grass, lightningcss,
//! oxc, oxipng, image, gif, quick-xml, minijinja); this module only walks
//! inputs, names outputs and applies the per-file error policy.

pub mod clean;
pub mod copy;
pub mod html;
pub mod images;
pub mod inputs;
pub mod scripts;
pub mod styles;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use tracing::{debug, error};

use crate::config::ConfigFile;
use crate::dag::{DagGraph, OutputPlan};
use crate::errors::{AssetpipeError, Result};
use crate::fs::FileSystem;
use crate::types::TaskKind;

pub use inputs::{InputSet, SourceFile};

/// Everything a task needs at run time.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub fs: Arc<dyn FileSystem>,
    pub src_root: PathBuf,
    pub dist_root: PathBuf,
}

/// Files written by one task run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub written: Vec<PathBuf>,
    pub bytes: u64,
}

impl TaskReport {
    /// Write `contents` through the context's file system and record it.
    pub fn write(&mut self, ctx: &TaskContext, path: PathBuf, contents: &[u8]) -> anyhow::Result<()> {
        ctx.fs.write(&path, contents)?;
        self.bytes += contents.len() as u64;
        self.written.push(path);
        Ok(())
    }
}

pub trait AssetTask: Send + Sync + Debug {
    fn kind(&self) -> TaskKind;

    /// Output files a run would produce for the current source tree.
    fn plan(&self, ctx: &TaskContext) -> anyhow::Result<Vec<PathBuf>>;

    /// Produce the outputs. Fails if any input could not be processed.
    fn run(&self, ctx: &TaskContext) -> anyhow::Result<TaskReport>;
}

/// Run `process` for every source, logging per-file failures and carrying
/// on; the task fails at the end if anything failed.
pub(crate) fn for_each_source(
    kind: TaskKind,
    sources: &[SourceFile],
    mut process: impl FnMut(&SourceFile, &mut TaskReport) -> anyhow::Result<()>,
) -> anyhow::Result<TaskReport> {
    let mut report = TaskReport::default();
    let mut failures = 0usize;

    for source in sources {
        if let Err(err) = process(source, &mut report) {
            failures += 1;
            error!(
                task = %kind,
                file = %source.rel_src.display(),
                error = %format!("{err:#}"),
                "failed to process file"
            );
        }
    }

    if failures > 0 {
        bail!("{failures} of {} file(s) failed", sources.len());
    }
    if sources.is_empty() {
        debug!(task = %kind, "no matching sources; nothing to do");
    }
    Ok(report)
}

/// `main.scss` + `min` + `css` -> `main.min.css`
pub(crate) fn output_name(rel_base: &Path, extension: &str, minified: bool) -> PathBuf {
    let extension = if minified {
        format!("min.{extension}")
    } else {
        extension.to_string()
    };
    rel_base.with_extension(extension)
}

/// `css/main.css` -> `css/main.css.map`
pub(crate) fn map_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Human readable size, e.g. `12.34 kB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// All tasks built from one configuration, sharing one [`TaskContext`].
#[derive(Debug)]
pub struct TaskRegistry {
    ctx: TaskContext,
    tasks: BTreeMap<TaskKind, Arc<dyn AssetTask>>,
}

impl TaskRegistry {
    pub fn from_config(
        cfg: &ConfigFile,
        project_root: &Path,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let paths = &cfg.paths;
        let ctx = TaskContext {
            fs,
            src_root: project_root.join(&paths.src),
            dist_root: project_root.join(&paths.dist),
        };

        let scss = InputSet::single(&paths.scss)?;
        let js = InputSet::single(&paths.js)?;
        let images = InputSet::single(&paths.images)?;

        let mut groups = Vec::with_capacity(paths.assets.len());
        for asset in paths.assets.iter() {
            groups.push(copy::AssetGroup::new(
                &asset.name,
                InputSet::single(&asset.src)?,
                &asset.output,
            ));
        }

        let all: Vec<Arc<dyn AssetTask>> = vec![
            Arc::new(clean::CleanTask),
            Arc::new(html::HtmlTask::new(
                InputSet::new(&paths.html, &paths.page_exclusions())?,
                cfg.html.tidy,
            )),
            Arc::new(styles::StyleTask::new(scss.clone(), &paths.css_output, false)),
            Arc::new(styles::StyleTask::new(scss, &paths.css_output, true)),
            Arc::new(scripts::ScriptTask::new(js.clone(), &paths.js_output, false)),
            Arc::new(scripts::ScriptTask::new(js, &paths.js_output, true)),
            Arc::new(images::ImageTask::new(images.clone(), &paths.images_output, None)),
            Arc::new(images::ImageTask::new(
                images,
                &paths.images_output,
                Some(images::Compression {
                    png_level: cfg.images.png_level,
                    jpeg_quality: cfg.images.jpeg_quality,
                }),
            )),
            Arc::new(copy::CopyTask::new(groups)),
        ];

        let tasks = all.into_iter().map(|t| (t.kind(), t)).collect();
        Ok(Self { ctx, tasks })
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AssetTask>> {
        let kind: TaskKind = name.parse().ok()?;
        self.tasks.get(&kind).cloned()
    }

    /// Plan the outputs of every task in `graph`.
    pub fn plan_outputs(&self, graph: &DagGraph) -> Result<Vec<OutputPlan>> {
        let mut plans = Vec::with_capacity(graph.len());
        for name in graph.tasks() {
            let task = self
                .get(name)
                .ok_or_else(|| AssetpipeError::TaskNotFound(name.to_string()))?;
            let files = task.plan(&self.ctx)?;
            plans.push(OutputPlan::new(name, files));
        }
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minified_names_insert_min_before_extension() {
        assert_eq!(
            output_name(Path::new("pages/home.scss"), "css", true),
            PathBuf::from("pages/home.min.css")
        );
        assert_eq!(output_name(Path::new("app.js"), "js", false), PathBuf::from("app.js"));
        assert_eq!(
            map_path(Path::new("dist/css/main.min.css")),
            PathBuf::from("dist/css/main.min.css.map")
        );
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(12_340), "12.34 kB");
        assert_eq!(human_size(3_500_000), "3.50 MB");
    }
}
