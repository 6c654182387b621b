// src/config/model.rs

use serde::Deserialize;

/// Top-level configuration as read from `Assetpipe.toml`.
///
/// Every section and field is optional; an empty file (or no file at all)
/// yields the conventional `src/` → `dist/` layout:
///
/// ```toml
/// [paths]
/// src = "src"
/// dist = "dist"
/// scss = "scss/**/*.scss"
///
/// [[paths.assets]]
/// name = "fonts"
/// src = "fonts/**/*"
/// output = "fonts"
///
/// [server]
/// port = 3000
///
/// [watch]
/// use_hash = true
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub html: HtmlSection,

    #[serde(default)]
    pub images: ImagesSection,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub server: ServerSection,
    pub watch: WatchSection,
    pub html: HtmlSection,
    pub images: ImagesSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            server: raw.server,
            watch: raw.watch,
            html: raw.html,
            images: raw.images,
        }
    }
}

/// `[paths]`: source/output roots and per-asset-type globs.
///
/// Globs are relative to `src`. Output directories are relative to `dist`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: String,

    #[serde(default = "default_dist")]
    pub dist: String,

    /// Pages compiled by `html`.
    #[serde(default = "default_html")]
    pub html: Vec<String>,

    /// Excluded from page compilation but still watched, so that editing a
    /// partial rebuilds the pages that include it.
    #[serde(default = "default_html_exclude")]
    pub html_exclude: Vec<String>,

    #[serde(default = "default_scss")]
    pub scss: String,

    #[serde(default = "default_js")]
    pub js: String,

    #[serde(default = "default_images")]
    pub images: String,

    #[serde(default = "default_css_output")]
    pub css_output: String,

    #[serde(default = "default_js_output")]
    pub js_output: String,

    #[serde(default = "default_images_output")]
    pub images_output: String,

    /// Static asset groups handled by `copy`. Missing ones are skipped.
    #[serde(default = "default_assets")]
    pub assets: Vec<AssetPath>,
}

/// One `[[paths.assets]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetPath {
    pub name: String,
    pub src: String,
    #[serde(default)]
    pub output: String,
}

impl AssetPath {
    pub fn new(name: &str, src: &str, output: &str) -> Self {
        Self {
            name: name.to_string(),
            src: src.to_string(),
            output: output.to_string(),
        }
    }
}

fn default_src() -> String {
    "src".to_string()
}

fn default_dist() -> String {
    "dist".to_string()
}

fn default_html() -> Vec<String> {
    vec!["**/*.html".to_string()]
}

fn default_html_exclude() -> Vec<String> {
    vec!["include/**".to_string()]
}

fn default_scss() -> String {
    "scss/**/*.scss".to_string()
}

fn default_js() -> String {
    "js/*.js".to_string()
}

fn default_images() -> String {
    "images/**/*".to_string()
}

fn default_css_output() -> String {
    "css".to_string()
}

fn default_js_output() -> String {
    "js".to_string()
}

fn default_images_output() -> String {
    "images".to_string()
}

fn default_assets() -> Vec<AssetPath> {
    vec![
        AssetPath::new("fonts", "fonts/**/*", "fonts"),
        AssetPath::new("videos", "videos/**/*", "videos"),
        AssetPath::new("plugins", "plugins/**/*", "plugins"),
        AssetPath::new("favicon", "favicon.ico", ""),
    ]
}

impl PathsSection {
    /// Sources owned by the copying tasks: the images glob and every asset
    /// group. HTML files in there (a plugin's demo page, say) are copied
    /// verbatim and never compiled as pages.
    pub fn copied_sources(&self) -> Vec<String> {
        std::iter::once(self.images.clone())
            .chain(self.assets.iter().map(|a| a.src.clone()))
            .collect()
    }

    /// Everything `html` must not emit as a page: partials plus
    /// [`Self::copied_sources`].
    pub fn page_exclusions(&self) -> Vec<String> {
        let mut exclude = self.html_exclude.clone();
        exclude.extend(self.copied_sources());
        exclude
    }
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: default_dist(),
            html: default_html(),
            html_exclude: default_html_exclude(),
            scss: default_scss(),
            js: default_js(),
            images: default_images(),
            css_output: default_css_output(),
            js_output: default_js_output(),
            images_output: default_images_output(),
            assets: default_assets(),
        }
    }
}

/// `[server]`: preview server bind address.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    /// `0` picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[watch]`: trigger handling while watching.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Only re-run a binding when the content of its watched files changed.
    #[serde(default = "default_use_hash")]
    pub use_hash: bool,
}

fn default_use_hash() -> bool {
    true
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            use_hash: default_use_hash(),
        }
    }
}

/// `[html]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HtmlSection {
    /// Normalise whitespace of the rendered pages.
    #[serde(default = "default_tidy")]
    pub tidy: bool,
}

fn default_tidy() -> bool {
    true
}

impl Default for HtmlSection {
    fn default() -> Self {
        Self {
            tidy: default_tidy(),
        }
    }
}

/// `[images]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagesSection {
    /// oxipng preset, 0 (fast) to 6 (smallest).
    #[serde(default = "default_png_level")]
    pub png_level: u8,

    /// Quality of re-encoded progressive JPEGs, 1 to 100. The re-encode is
    /// only kept when it is smaller than the source.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_png_level() -> u8 {
    5
}

fn default_jpeg_quality() -> u8 {
    90
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            png_level: default_png_level(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}
