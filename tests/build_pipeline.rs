// tests/build_pipeline.rs

use std::error::Error;
use std::fs;
use std::sync::Arc;

use assetpipe::config::ConfigFile;
use assetpipe::dag::Pipeline;
use assetpipe::errors::AssetpipeError;
use assetpipe::fs::RealFileSystem;
use assetpipe::orchestrator::Orchestrator;
use assetpipe::types::TaskKind;
use assetpipe_test_utils::builders::ConfigFileBuilder;
use assetpipe_test_utils::fixtures::Project;
use assetpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn orchestrator(project: &Project, cfg: ConfigFile) -> Orchestrator {
    Orchestrator::new(cfg, project.root(), Arc::new(RealFileSystem)).unwrap()
}

async fn build(project: &Project) -> Result<(), AssetpipeError> {
    let orch = orchestrator(project, ConfigFileBuilder::new().build());
    with_timeout(orch.run_once(&Pipeline::production())).await
}

#[tokio::test]
async fn build_emits_plain_and_minified_css_per_entry_point() -> TestResult {
    init_tracing();
    let project = Project::site();

    build(&project).await?;

    let css = project.read("dist/css/main.css");
    let min = project.read("dist/css/main.min.css");
    assert!(css.contains(".button"));
    assert!(css.ends_with("/*# sourceMappingURL=main.css.map */\n"));
    assert!(min.contains("/*# sourceMappingURL=main.min.css.map */"));
    assert!(project.dist("css/main.css.map").is_file());
    assert!(project.dist("css/main.min.css.map").is_file());

    // Partials only exist through the entry point.
    assert!(!project.dist("css/_colors.css").exists());
    assert!(!project.dist("css/colors.css").exists());
    Ok(())
}

#[tokio::test]
async fn minified_script_is_never_larger() -> TestResult {
    init_tracing();
    let project = Project::site();

    build(&project).await?;

    let plain = fs::metadata(project.dist("js/app.js"))?.len();
    let min = fs::metadata(project.dist("js/app.min.js"))?.len();
    assert!(min <= plain, "min.js ({min} B) larger than js ({plain} B)");
    assert!(project.dist("js/app.min.js.map").is_file());
    assert!(project.dist("js/app.js.map").is_file());
    Ok(())
}

#[tokio::test]
async fn missing_optional_assets_are_skipped() -> TestResult {
    init_tracing();
    let project = Project::site();

    build(&project).await?;

    for dir in ["fonts", "videos", "plugins"] {
        assert!(!project.dist(dir).exists(), "unexpected dist/{dir}");
    }
    assert!(!project.dist("favicon.ico").exists());
    assert!(project.dist("images/logo.svg").is_file());
    Ok(())
}

#[tokio::test]
async fn present_assets_are_copied() -> TestResult {
    init_tracing();
    let project = Project::site();
    project
        .bytes("src/fonts/inter/inter.woff2", b"wOF2")
        .bytes("src/favicon.ico", b"\x00\x00\x01\x00");

    build(&project).await?;

    assert_eq!(fs::read(project.dist("fonts/inter/inter.woff2"))?, b"wOF2");
    assert!(project.dist("favicon.ico").is_file());
    Ok(())
}

#[tokio::test]
async fn pages_inline_partials_and_skip_the_include_dir() -> TestResult {
    init_tracing();
    let project = Project::site();

    build(&project).await?;

    let index = project.read("dist/index.html");
    assert!(index.contains("<header>Site</header>"));
    assert!(index.contains("<p>home</p>"));
    assert!(!index.contains("<!--@"));
    assert!(project.read("dist/about/index.html").contains("<header>Site</header>"));
    assert!(!project.dist("include").exists());
    Ok(())
}

#[tokio::test]
async fn clean_twice_is_fine() -> TestResult {
    init_tracing();
    let project = Project::site();
    let orch = orchestrator(&project, ConfigFileBuilder::new().build());

    orch.run_once(&Pipeline::task(TaskKind::Clean)).await?;
    build(&project).await?;
    assert!(project.dist("index.html").exists());

    orch.run_once(&Pipeline::task(TaskKind::Clean)).await?;
    orch.run_once(&Pipeline::task(TaskKind::Clean)).await?;
    assert!(!project.dist("").exists());
    Ok(())
}

#[tokio::test]
async fn failing_task_fails_the_build_but_others_finish() -> TestResult {
    init_tracing();
    let project = Project::site();
    project.file("src/scss/broken.scss", ".oops { color: $undefined; }\n");

    let err = build(&project).await.unwrap_err();
    match err {
        AssetpipeError::TasksFailed(mut failed) => {
            failed.sort();
            assert_eq!(failed, vec!["css", "mincss"]);
        }
        other => panic!("expected TasksFailed, got {other:?}"),
    }

    // Good files of the failed tasks and every independent task still ran.
    assert!(project.dist("css/main.css").is_file());
    assert!(project.dist("index.html").is_file());
    assert!(project.dist("js/app.min.js").is_file());
    Ok(())
}

#[tokio::test]
async fn overlapping_outputs_are_rejected_before_writing() -> TestResult {
    init_tracing();
    let project = Project::site();
    project.file("src/images/main.min.css", "/* not an image */");

    let cfg = ConfigFileBuilder::new().with_images_output("css").build();
    let orch = orchestrator(&project, cfg);

    let err = orch.run_once(&Pipeline::production()).await.unwrap_err();
    match err {
        AssetpipeError::OutputConflict { first, second, path } => {
            let mut pair = [first, second];
            pair.sort();
            assert_eq!(pair, ["mincss".to_string(), "minimages".to_string()]);
            assert!(path.ends_with("css/main.min.css"));
        }
        other => panic!("expected OutputConflict, got {other:?}"),
    }
    assert!(!project.dist("").exists());
    Ok(())
}

#[tokio::test]
async fn single_task_runs_without_clean() -> TestResult {
    init_tracing();
    let project = Project::site();
    project.file("dist/keep.txt", "left alone");

    let orch = orchestrator(&project, ConfigFileBuilder::new().build());
    orch.run_once(&Pipeline::task(TaskKind::Js)).await?;

    assert!(project.dist("js/app.js").is_file());
    assert!(project.dist("keep.txt").is_file());
    assert!(!project.dist("css").exists());
    Ok(())
}

#[tokio::test]
async fn client_side_template_markup_reaches_dist_unchanged() -> TestResult {
    init_tracing();
    let project = Project::site();
    project.file("src/vue.html", "<div id=app>{{ message }}</div>\n");

    build(&project).await?;

    assert_eq!(project.read("dist/vue.html"), "<div id=app>{{ message }}</div>\n");
    Ok(())
}

#[tokio::test]
async fn demo_pages_inside_plugins_are_copied_not_compiled() -> TestResult {
    init_tracing();
    let project = Project::site();
    let demo = "<html>\n  <body>{{ slides }}</body>\n</html>\n";
    project.file("src/plugins/slider/demo.html", demo);

    build(&project).await?;

    assert_eq!(project.read("dist/plugins/slider/demo.html"), demo);
    assert!(project.dist("index.html").is_file());
    Ok(())
}
