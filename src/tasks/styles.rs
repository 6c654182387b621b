// src/tasks/styles.rs

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use crate::fs::FileSystem;
use crate::tasks::{
    AssetTask, InputSet, SourceFile, TaskContext, TaskReport, file_name, for_each_source,
    map_path, output_name,
};
use crate::types::TaskKind;

/// `css` and `mincss`: Sass compile, vendor prefixing, optional minification
/// and a source map next to every stylesheet.
///
/// Partials (`_name.scss`) are only reachable through `@use`/`@import` and
/// produce no output of their own.
#[derive(Debug, Clone)]
pub struct StyleTask {
    inputs: InputSet,
    output_dir: PathBuf,
    minify: bool,
}

/// Lets grass resolve `@use`/`@import` through our file system seam.
#[derive(Debug)]
struct GrassFs<'a>(&'a dyn FileSystem);

impl grass::Fs for GrassFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.0.read(path).map_err(|e| io::Error::other(format!("{e:#}")))
    }
}

/// Prefixing baseline, roughly "last two versions" of the evergreen
/// browsers plus Safari 13.
fn browser_targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(100 << 16),
        edge: Some(100 << 16),
        firefox: Some(100 << 16),
        safari: Some(13 << 16),
        ios_saf: Some(13 << 16),
        ..Browsers::default()
    })
}

fn is_partial(source: &SourceFile) -> bool {
    file_name(&source.path).starts_with('_')
}

impl StyleTask {
    pub fn new(inputs: InputSet, output_dir: &str, minify: bool) -> Self {
        Self {
            inputs,
            output_dir: PathBuf::from(output_dir),
            minify,
        }
    }

    fn entry_points(&self, ctx: &TaskContext) -> Result<Vec<SourceFile>> {
        let mut sources = self.inputs.collect(ctx.fs.as_ref(), &ctx.src_root)?;
        sources.retain(|s| !is_partial(s));
        Ok(sources)
    }

    fn output_path(&self, ctx: &TaskContext, source: &SourceFile) -> PathBuf {
        ctx.dist_root
            .join(&self.output_dir)
            .join(output_name(&source.rel_base, "css", self.minify))
    }

    /// Returns the stylesheet (with its `sourceMappingURL` comment) and the
    /// JSON source map.
    fn compile(&self, ctx: &TaskContext, source: &SourceFile, map_name: &str) -> Result<(String, String)> {
        let grass_fs = GrassFs(ctx.fs.as_ref());
        let options = grass::Options::default()
            .fs(&grass_fs)
            .style(grass::OutputStyle::Expanded);
        let compiled = grass::from_path(&source.path, &options).map_err(|e| anyhow!("{e}"))?;

        let source_name = source.rel_src.to_string_lossy().replace('\\', "/");
        let mut sheet = StyleSheet::parse(
            &compiled,
            ParserOptions {
                filename: source_name.clone(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| anyhow!("parsing compiled css: {e}"))?;

        sheet
            .minify(MinifyOptions {
                targets: browser_targets(),
                ..MinifyOptions::default()
            })
            .map_err(|e| anyhow!("prefixing: {e}"))?;

        let mut map = SourceMap::new("/");
        let index = map.add_source(&source_name);
        map.set_source_content(index as usize, &compiled)
            .map_err(|e| anyhow!("embedding source content: {e:?}"))?;

        let printed = sheet
            .to_css(PrinterOptions {
                minify: self.minify,
                source_map: Some(&mut map),
                targets: browser_targets(),
                ..PrinterOptions::default()
            })
            .map_err(|e| anyhow!("printing css: {e}"))?;

        let map_json = map
            .to_json(None)
            .map_err(|e| anyhow!("serialising source map: {e:?}"))?;

        let mut css = printed.code;
        if !css.ends_with('\n') {
            css.push('\n');
        }
        css.push_str(&format!("/*# sourceMappingURL={map_name} */\n"));
        Ok((css, map_json))
    }
}

impl AssetTask for StyleTask {
    fn kind(&self) -> TaskKind {
        if self.minify {
            TaskKind::MinCss
        } else {
            TaskKind::Css
        }
    }

    fn plan(&self, ctx: &TaskContext) -> Result<Vec<PathBuf>> {
        let mut planned = Vec::new();
        for source in self.entry_points(ctx)? {
            let out = self.output_path(ctx, &source);
            planned.push(map_path(&out));
            planned.push(out);
        }
        Ok(planned)
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskReport> {
        let sources = self.entry_points(ctx)?;
        for_each_source(self.kind(), &sources, |source, report| {
            let out = self.output_path(ctx, source);
            let map_out = map_path(&out);
            let (css, map) = self.compile(ctx, source, &file_name(&map_out))?;

            report.write(ctx, out, css.as_bytes())?;
            report.write(ctx, map_out, map.as_bytes())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn fixture() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/scss/_colors.scss", "$accent: #ff0066;\n");
        fs.add_file(
            "/p/src/scss/main.scss",
            "@use 'colors';\n\n.button {\n  color: colors.$accent;\n  user-select: none;\n  &:hover { color: black; }\n}\n",
        );
        fs
    }

    fn ctx(fs: &MockFileSystem) -> TaskContext {
        TaskContext {
            fs: Arc::new(fs.clone()),
            src_root: "/p/src".into(),
            dist_root: "/p/dist".into(),
        }
    }

    fn task(minify: bool) -> StyleTask {
        StyleTask::new(InputSet::single("scss/**/*.scss").unwrap(), "css", minify)
    }

    #[test]
    fn compiles_entry_points_and_skips_partials() {
        let fs = fixture();
        let report = task(false).run(&ctx(&fs)).unwrap();

        assert_eq!(
            report.written,
            vec![
                PathBuf::from("/p/dist/css/main.css"),
                PathBuf::from("/p/dist/css/main.css.map")
            ]
        );

        let css = fs.read_to_string(Path::new("/p/dist/css/main.css")).unwrap();
        assert!(css.contains(".button:hover"));
        assert!(css.contains("#f06") || css.contains("#ff0066"));
        assert!(css.contains("-webkit-user-select"));
        assert!(css.ends_with("/*# sourceMappingURL=main.css.map */\n"));
    }

    #[test]
    fn minified_variant_uses_min_suffix() {
        let fs = fixture();
        task(true).run(&ctx(&fs)).unwrap();

        let min = fs.read_to_string(Path::new("/p/dist/css/main.min.css")).unwrap();
        assert!(min.starts_with(".button{"));
        assert!(fs.is_file(Path::new("/p/dist/css/main.min.css.map")));
    }

    #[test]
    fn sass_errors_fail_the_task() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/scss/bad.scss", ".a { color: $missing; }");
        assert!(task(false).run(&ctx(&fs)).is_err());
        assert!(!fs.exists(Path::new("/p/dist/css/bad.css")));
    }
}
