// src/orchestrator.rs

//! Pipeline orchestration: compile a pipeline, check it, run it once, or run
//! the development pipeline and keep watching.

use std::fmt::Write as _;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::dag::{DagGraph, Pipeline, Scheduler, check_disjoint_outputs};
use crate::engine::{
    CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TaskName, TriggerReason,
};
use crate::errors::{AssetpipeError, Result};
use crate::exec::RealExecutorBackend;
use crate::fs::FileSystem;
use crate::server::{LiveReload, PreviewServer};
use crate::tasks::TaskRegistry;
use crate::types::Target;
use crate::watch::{WatcherHandle, default_bindings, reload_policy, spawn_watcher};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What to start alongside the development pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevOptions {
    /// Start the preview server (`serve`).
    pub server: bool,
    /// Watch the source root for changes.
    pub watch_files: bool,
}

impl DevOptions {
    pub fn for_target(target: Target) -> Self {
        Self {
            server: target == Target::Serve,
            watch_files: true,
        }
    }
}

/// Owns the validated configuration and the task registry built from it.
#[derive(Debug)]
pub struct Orchestrator {
    cfg: ConfigFile,
    registry: Arc<TaskRegistry>,
}

impl Orchestrator {
    pub fn new(cfg: ConfigFile, project_root: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let registry = TaskRegistry::from_config(&cfg, project_root.as_ref(), fs)?;
        Ok(Self {
            cfg,
            registry: Arc::new(registry),
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.cfg
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn src_root(&self) -> &Path {
        &self.registry.context().src_root
    }

    pub fn dist_root(&self) -> &Path {
        &self.registry.context().dist_root
    }

    /// Compile `pipeline` and check that tasks which may run concurrently
    /// never write the same file. Nothing is written.
    pub fn prepare(&self, pipeline: &Pipeline) -> Result<DagGraph> {
        let graph = pipeline.compile()?;
        let plans = self.registry.plan_outputs(&graph)?;
        check_disjoint_outputs(&graph, &plans)?;
        debug!(tasks = graph.len(), "pipeline prepared");
        Ok(graph)
    }

    fn runtime(
        &self,
        graph: DagGraph,
        exit_when_idle: bool,
    ) -> (Runtime<RealExecutorBackend>, mpsc::Sender<RuntimeEvent>) {
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(EVENT_CHANNEL_CAPACITY);
        let executor = RealExecutorBackend::new(Arc::clone(&self.registry), tx.clone());
        let core = CoreRuntime::new(Scheduler::new(graph), RuntimeOptions { exit_when_idle });
        (Runtime::new(core, rx, executor), tx)
    }

    /// Run a pipeline to completion.
    ///
    /// Every independent task finishes before this returns; any failure is
    /// reported as [`AssetpipeError::TasksFailed`].
    pub async fn run_once(&self, pipeline: &Pipeline) -> Result<()> {
        let graph = self.prepare(pipeline)?;
        let roots = graph.roots();
        let (mut runtime, tx) = self.runtime(graph, true);

        seed_roots(&tx, roots).await?;
        let report = runtime.run().await?;

        if report.failed.is_empty() {
            info!("pipeline finished");
            Ok(())
        } else {
            Err(AssetpipeError::TasksFailed(report.failed))
        }
    }

    /// Run the development pipeline once, then keep the runtime alive for
    /// watch triggers (and the preview server, when requested).
    ///
    /// Failures of the initial run are logged, not returned.
    pub async fn start_dev(&self, opts: DevOptions) -> Result<DevSession> {
        let graph = self.prepare(&Pipeline::development())?;
        let roots = graph.roots();
        let bindings = default_bindings(&self.cfg)?;

        let (mut runtime, tx) = self.runtime(graph, true);
        runtime.core_mut().set_reload_policy(reload_policy(&bindings));

        seed_roots(&tx, roots).await?;
        let initial = runtime.run().await?;
        if !initial.failed.is_empty() {
            warn!(failed = ?initial.failed, "initial build had failures; watching anyway");
        }

        let live_reload = LiveReload::new();
        let server = if opts.server {
            let server =
                PreviewServer::start(&self.cfg.server, self.dist_root(), live_reload.clone()).await?;
            info!(url = %server.url(), "serving {}", self.dist_root().display());
            Some(server)
        } else {
            None
        };

        let watcher = if opts.watch_files {
            let fs = Arc::clone(&self.registry.context().fs);
            Some(spawn_watcher(self.src_root(), bindings, tx.clone(), fs)?)
        } else {
            None
        };

        runtime.attach_live_reload(live_reload.clone());
        runtime.core_mut().set_options(RuntimeOptions {
            exit_when_idle: false,
        });
        let handle = tokio::spawn(async move { runtime.run().await });

        Ok(DevSession {
            runtime_tx: tx,
            live_reload,
            server,
            watcher,
            runtime: handle,
            initial_failures: initial.failed,
        })
    }

    /// `serve` / `watch`: run until `shutdown` resolves.
    pub async fn serve_until<F>(&self, opts: DevOptions, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let session = self.start_dev(opts).await?;
        info!("watching {} for changes", self.src_root().display());

        shutdown.await;
        info!("shutting down");

        let report = session.shutdown().await?;
        if !report.failed.is_empty() {
            debug!(failed = ?report.failed, "tasks failed while watching");
        }
        Ok(())
    }

    /// Text rendering of the compiled task graph and planned outputs.
    pub fn dry_run(&self, target: Target) -> Result<String> {
        let graph = self.prepare(&Pipeline::for_target(target))?;
        let plans = self.registry.plan_outputs(&graph)?;
        let dist = self.dist_root();

        let mut out = String::new();
        let _ = writeln!(out, "assetpipe dry-run: {target}");
        let _ = writeln!(out, "  src  = {}", self.src_root().display());
        let _ = writeln!(out, "  dist = {}", dist.display());
        let _ = writeln!(out);

        let _ = writeln!(out, "tasks ({}):", graph.len());
        for name in graph.topological_order()? {
            let _ = writeln!(out, "  - {name}");
            let deps = graph.dependencies_of(&name);
            if !deps.is_empty() {
                let _ = writeln!(out, "      after: {deps:?}");
            }
            let Some(plan) = plans.iter().find(|p| p.task == name) else {
                continue;
            };
            for file in plan.files.iter() {
                let shown = file.strip_prefix(dist).unwrap_or(file);
                let _ = writeln!(out, "      -> {}", shown.display());
            }
        }

        debug!("dry-run complete (no execution)");
        Ok(out)
    }
}

async fn seed_roots(tx: &mpsc::Sender<RuntimeEvent>, roots: Vec<TaskName>) -> Result<()> {
    info!(?roots, "seeding pipeline roots");
    for task in roots {
        tx.send(RuntimeEvent::TaskTriggered {
            task,
            reason: TriggerReason::Manual,
        })
        .await
        .map_err(|_| anyhow!("runtime event channel closed"))?;
    }
    Ok(())
}

/// A running development session.
#[derive(Debug)]
pub struct DevSession {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    live_reload: LiveReload,
    server: Option<PreviewServer>,
    watcher: Option<WatcherHandle>,
    runtime: JoinHandle<Result<RunReport>>,
    initial_failures: Vec<TaskName>,
}

impl DevSession {
    pub fn live_reload(&self) -> &LiveReload {
        &self.live_reload
    }

    pub fn server(&self) -> Option<&PreviewServer> {
        self.server.as_ref()
    }

    /// Tasks that failed during the initial development run.
    pub fn initial_failures(&self) -> &[TaskName] {
        &self.initial_failures
    }

    /// Sender into the runtime, as used by the file watcher.
    pub fn events(&self) -> mpsc::Sender<RuntimeEvent> {
        self.runtime_tx.clone()
    }

    /// Stop watching, stop the runtime and then the preview server.
    pub async fn shutdown(self) -> Result<RunReport> {
        drop(self.watcher);

        // The runtime may already be gone if every sender was dropped.
        let _ = self.runtime_tx.send(RuntimeEvent::ShutdownRequested).await;
        let report = match self.runtime.await {
            Ok(report) => report?,
            Err(err) => return Err(anyhow!("runtime task failed: {err}").into()),
        };

        if let Some(server) = self.server {
            server.stop().await?;
        }
        Ok(report)
    }
}

/// Project root for a config path: its directory, or the working directory
/// for a bare file name.
pub fn project_root_for(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
