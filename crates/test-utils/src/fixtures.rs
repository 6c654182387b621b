//! On-disk project fixtures in a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A throwaway project: `<tmp>/src` holds sources, `<tmp>/dist` is the
/// default output root.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        fs::create_dir_all(dir.path().join("src")).expect("failed to create src dir");
        Self { dir }
    }

    /// The conventional site used across integration tests: two pages with a
    /// shared header partial, one Sass entry point plus a partial, one
    /// script and one image. No fonts, videos or plugins.
    pub fn site() -> Self {
        let project = Self::new();
        project
            .file(
                "src/index.html",
                "<html>\n<body>\n<!--@ include \"include/header.html\" @-->\n<p>home</p>\n</body>\n</html>\n",
            )
            .file(
                "src/about/index.html",
                "<html>\n<body>\n<!--@ include \"include/header.html\" @-->\n<p>about</p>\n</body>\n</html>\n",
            )
            .file("src/include/header.html", "<header>Site</header>\n")
            .file("src/scss/_colors.scss", "$accent: #ff0066;\n")
            .file(
                "src/scss/main.scss",
                "@import 'colors';\n\n.button {\n  color: $accent;\n  user-select: none;\n}\n",
            )
            .file(
                "src/js/app.js",
                "function greet(name) {\n  var message = 'hello, ' + name;\n  console.log(message);\n  return message;\n}\ngreet('world');\n",
            )
            .bytes("src/images/logo.svg", b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>\n");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn dist(&self, rel: &str) -> PathBuf {
        self.dir.path().join("dist").join(rel)
    }

    pub fn file(&self, rel: &str, contents: &str) -> &Self {
        self.bytes(rel, contents.as_bytes())
    }

    pub fn bytes(&self, rel: &str, contents: &[u8]) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        fs::write(&path, contents).expect("failed to write fixture file");
        self
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}
