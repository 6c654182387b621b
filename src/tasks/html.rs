// src/tasks/html.rs

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, ErrorKind, context};

use crate::fs::FileSystem;
use crate::tasks::{AssetTask, InputSet, SourceFile, TaskContext, TaskReport, for_each_source};
use crate::types::TaskKind;

/// Opening and closing markers of an include directive. The directive is an
/// HTML comment, so pages stay valid markup before they are compiled.
pub const DIRECTIVE_START: &str = "<!--@";
pub const DIRECTIVE_END: &str = "@-->";

/// Renders pages with partial inclusion and writes them to the mirrored
/// path under the output root.
///
/// Pages include partials with `<!--@ include "include/header.html" @-->`;
/// template names resolve against the source root. Everything outside a
/// directive, including `{{ ... }}` and `{% ... %}` of client-side template
/// languages, is copied through untouched. Files matching the exclude
/// patterns (`include/**` by default) are partials and are never emitted as
/// pages.
#[derive(Debug, Clone)]
pub struct HtmlTask {
    inputs: InputSet,
    tidy: bool,
}

impl HtmlTask {
    pub fn new(inputs: InputSet, tidy: bool) -> Self {
        Self { inputs, tidy }
    }

    fn output_path(&self, ctx: &TaskContext, source: &SourceFile) -> PathBuf {
        ctx.dist_root.join(&source.rel_src)
    }

    fn environment(&self, ctx: &TaskContext) -> Result<Environment<'static>> {
        let mut env = Environment::new();
        env.set_syntax(directive_syntax()?);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        let fs = Arc::clone(&ctx.fs);
        let root = ctx.src_root.clone();
        env.set_loader(move |name| load_partial(fs.as_ref(), &root, name));
        Ok(env)
    }
}

/// Only the comment-style directive is template syntax. Expressions and
/// comments get delimiters no hand-written page is expected to contain.
fn directive_syntax() -> Result<SyntaxConfig> {
    SyntaxConfig::builder()
        .block_delimiters(DIRECTIVE_START, DIRECTIVE_END)
        .variable_delimiters("@@{", "}@@")
        .comment_delimiters("@@#", "#@@")
        .build()
        .context("building include directive syntax")
}

fn load_partial(
    fs: &dyn FileSystem,
    root: &Path,
    name: &str,
) -> std::result::Result<Option<String>, minijinja::Error> {
    let rel = Path::new(name);
    if !rel
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("template name {name:?} must stay inside the source root"),
        ));
    }

    let path = root.join(rel);
    if !fs.is_file(&path) {
        return Ok(None);
    }
    fs.read_to_string(&path)
        .map(Some)
        .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, format!("{e:#}")))
}

/// Whitespace tidy of rendered markup: strip trailing whitespace, collapse
/// runs of blank lines left behind by directives, end with one newline.
/// Indentation is left as written.
pub(crate) fn tidy_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut previous_blank = true;

    for line in html.lines() {
        let line = line.trim_end();
        let blank = line.is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push_str(line);
        out.push('\n');
        previous_blank = blank;
    }

    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

impl AssetTask for HtmlTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Html
    }

    fn plan(&self, ctx: &TaskContext) -> Result<Vec<PathBuf>> {
        let sources = self.inputs.collect(ctx.fs.as_ref(), &ctx.src_root)?;
        Ok(sources.iter().map(|s| self.output_path(ctx, s)).collect())
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskReport> {
        let sources = self.inputs.collect(ctx.fs.as_ref(), &ctx.src_root)?;
        let env = self.environment(ctx)?;

        for_each_source(TaskKind::Html, &sources, |source, report| {
            let template = ctx.fs.read_to_string(&source.path)?;
            let name = source.rel_src.to_string_lossy().replace('\\', "/");
            let rendered = env
                .render_named_str(&name, &template, context! {})
                .with_context(|| format!("rendering {name}"))?;

            let page = if self.tidy {
                tidy_html(&rendered)
            } else {
                rendered
            };
            report.write(ctx, self.output_path(ctx, source), page.as_bytes())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn ctx(fs: &MockFileSystem) -> TaskContext {
        TaskContext {
            fs: Arc::new(fs.clone()),
            src_root: "/p/src".into(),
            dist_root: "/p/dist".into(),
        }
    }

    fn task() -> HtmlTask {
        let include = vec!["**/*.html".to_string()];
        let exclude = vec!["include/**".to_string()];
        HtmlTask::new(InputSet::new(&include, &exclude).unwrap(), true)
    }

    #[test]
    fn partials_are_inlined_and_not_emitted() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/include/header.html", "<header>Site</header>\n");
        fs.add_file(
            "/p/src/index.html",
            "<body>\n<!--@ include \"include/header.html\" @-->\n<main>Hi</main>   \n\n\n</body>\n",
        );

        let report = task().run(&ctx(&fs)).unwrap();
        assert_eq!(report.written, vec![PathBuf::from("/p/dist/index.html")]);

        let page = fs.read_to_string(Path::new("/p/dist/index.html")).unwrap();
        assert_eq!(
            page,
            "<body>\n<header>Site</header>\n<main>Hi</main>\n\n</body>\n"
        );
        assert!(!fs.exists(Path::new("/p/dist/include")));
    }

    #[test]
    fn missing_partial_fails_the_page() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/index.html", "<!--@ include \"include/nav.html\" @-->");
        fs.add_file("/p/src/about.html", "<p>About</p>");

        assert!(task().run(&ctx(&fs)).is_err());
        assert!(fs.is_file(Path::new("/p/dist/about.html")));
    }

    #[test]
    fn client_side_template_markup_passes_through() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/include/footer.html", "<footer>{{ year }}</footer>\n");
        fs.add_file(
            "/p/src/vue.html",
            "<div id=app>{{ message }}</div>\n\
             {% if user %}<b>{# note #}</b>{% endif %}\n\
             <!-- plain comment -->\n\
             <!--@ include \"include/footer.html\" @-->\n",
        );

        task().run(&ctx(&fs)).unwrap();

        let page = fs.read_to_string(Path::new("/p/dist/vue.html")).unwrap();
        assert_eq!(
            page,
            "<div id=app>{{ message }}</div>\n\
             {% if user %}<b>{# note #}</b>{% endif %}\n\
             <!-- plain comment -->\n\
             <footer>{{ year }}</footer>\n"
        );
    }

    #[test]
    fn partial_names_cannot_escape_the_source_root() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/secret.html", "nope");
        let err = load_partial(&fs, Path::new("/p/src"), "../secret.html").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn tidy_collapses_blank_runs() {
        assert_eq!(tidy_html("\n\n<a>  \n\n\n<b>\n\n"), "<a>\n\n<b>\n");
    }
}
