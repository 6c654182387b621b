// src/tasks/scripts.rs

use std::path::PathBuf;

use anyhow::{Result, bail};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions, CodegenReturn};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::tasks::{
    AssetTask, InputSet, SourceFile, TaskContext, TaskReport, file_name, for_each_source,
    map_path, output_name,
};
use crate::types::TaskKind;

/// `js` re-prints scripts through the oxc code generator; `minjs` compresses
/// and mangles them first. Both write a source map next to the output.
///
/// Sources are parsed as classic browser scripts, so a syntax error fails
/// the file. No syntax lowering happens.
#[derive(Debug, Clone)]
pub struct ScriptTask {
    inputs: InputSet,
    output_dir: PathBuf,
    minify: bool,
}

impl ScriptTask {
    pub fn new(inputs: InputSet, output_dir: &str, minify: bool) -> Self {
        Self {
            inputs,
            output_dir: PathBuf::from(output_dir),
            minify,
        }
    }

    fn output_path(&self, ctx: &TaskContext, source: &SourceFile) -> PathBuf {
        ctx.dist_root
            .join(&self.output_dir)
            .join(output_name(&source.rel_base, "js", self.minify))
    }

    fn compile(&self, source: &SourceFile, code: &str) -> Result<CodegenReturn> {
        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, code, SourceType::cjs()).parse();
        if let Some(first) = parsed.errors.first() {
            bail!("{} syntax error(s); first: {first}", parsed.errors.len());
        }
        let mut program = parsed.program;

        let source_map_path = Some(source.rel_src.clone());
        let generated = if self.minify {
            let minified = Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);
            Codegen::new()
                .with_options(CodegenOptions {
                    source_map_path,
                    ..CodegenOptions::minify()
                })
                .with_scoping(minified.scoping)
                .build(&program)
        } else {
            Codegen::new()
                .with_options(CodegenOptions {
                    source_map_path,
                    ..CodegenOptions::default()
                })
                .build(&program)
        };
        Ok(generated)
    }

    fn build_one(&self, ctx: &TaskContext, source: &SourceFile, report: &mut TaskReport) -> Result<()> {
        let code = ctx.fs.read_to_string(&source.path)?;
        let out = self.output_path(ctx, source);
        let map_out = map_path(&out);

        let generated = self.compile(source, &code)?;
        let Some(map) = generated.map else {
            bail!("code generator produced no source map");
        };

        let mut text = generated.code;
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&format!("//# sourceMappingURL={}\n", file_name(&map_out)));

        report.write(ctx, out, text.as_bytes())?;
        report.write(ctx, map_out, map.to_json_string().as_bytes())
    }
}

impl AssetTask for ScriptTask {
    fn kind(&self) -> TaskKind {
        if self.minify {
            TaskKind::MinJs
        } else {
            TaskKind::Js
        }
    }

    fn plan(&self, ctx: &TaskContext) -> Result<Vec<PathBuf>> {
        let mut planned = Vec::new();
        for source in self.inputs.collect(ctx.fs.as_ref(), &ctx.src_root)? {
            let out = self.output_path(ctx, &source);
            planned.push(map_path(&out));
            planned.push(out);
        }
        Ok(planned)
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskReport> {
        let sources = self.inputs.collect(ctx.fs.as_ref(), &ctx.src_root)?;
        for_each_source(self.kind(), &sources, |source, report| {
            self.build_one(ctx, source, report)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;

    const APP: &str = "function greet(name) {\n  var message = 'hello ' + name;\n  console.log(message);\n}\ngreet('world');\n";

    fn ctx(fs: &MockFileSystem) -> TaskContext {
        TaskContext {
            fs: Arc::new(fs.clone()),
            src_root: "/p/src".into(),
            dist_root: "/p/dist".into(),
        }
    }

    #[test]
    fn plain_scripts_get_a_source_map() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/js/app.js", APP);

        let task = ScriptTask::new(InputSet::single("js/*.js").unwrap(), "js", false);
        task.run(&ctx(&fs)).unwrap();

        let out = fs.read_to_string(Path::new("/p/dist/js/app.js")).unwrap();
        assert!(out.contains("function greet(name)"));
        assert!(out.ends_with("//# sourceMappingURL=app.js.map\n"));

        let map = fs.read_to_string(Path::new("/p/dist/js/app.js.map")).unwrap();
        assert!(map.contains("js/app.js"));
        assert!(map.contains("\"mappings\""));
    }

    #[test]
    fn minified_scripts_are_smaller_and_mapped() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/js/app.js", APP);

        let task = ScriptTask::new(InputSet::single("js/*.js").unwrap(), "js", true);
        let report = task.run(&ctx(&fs)).unwrap();

        assert_eq!(
            report.written,
            vec![
                PathBuf::from("/p/dist/js/app.min.js"),
                PathBuf::from("/p/dist/js/app.min.js.map")
            ]
        );
        let min = fs.read_to_string(Path::new("/p/dist/js/app.min.js")).unwrap();
        let (code, comment) = min.split_once("//# sourceMappingURL=").unwrap();
        assert!(code.len() < APP.len(), "{code}");
        assert!(code.contains("greet"));
        assert_eq!(comment, "app.min.js.map\n");

        let map = fs.read_to_string(Path::new("/p/dist/js/app.min.js.map")).unwrap();
        assert!(map.contains("js/app.js"));
    }

    #[test]
    fn plan_lists_script_and_map() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/js/app.js", APP);

        let task = ScriptTask::new(InputSet::single("js/*.js").unwrap(), "js", true);
        let planned = task.plan(&ctx(&fs)).unwrap();
        assert_eq!(
            planned,
            vec![
                PathBuf::from("/p/dist/js/app.min.js.map"),
                PathBuf::from("/p/dist/js/app.min.js")
            ]
        );
    }

    #[test]
    fn syntax_errors_fail_the_task() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/js/broken.js", "function (");

        for minify in [false, true] {
            let task = ScriptTask::new(InputSet::single("js/*.js").unwrap(), "js", minify);
            assert!(task.run(&ctx(&fs)).is_err());
        }
    }
}
