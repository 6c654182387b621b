// src/config/validate.rs

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetpipeError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_roots(cfg)?;
    validate_globs(cfg)?;
    validate_assets(cfg)?;
    validate_images(cfg)?;
    Ok(())
}

/// Lexically normalise a configured path: drop `.` components.
fn lexical(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// `clean` deletes the output root, so it must never cover the project root
/// or the sources. An output root inside the sources would also feed the
/// watcher its own writes.
fn validate_roots(cfg: &RawConfigFile) -> Result<()> {
    let src = lexical(&cfg.paths.src);
    let dist = lexical(&cfg.paths.dist);

    if dist.as_os_str().is_empty() {
        return Err(AssetpipeError::ConfigError(
            "[paths].dist must not be the project root".to_string(),
        ));
    }
    if src == dist {
        return Err(AssetpipeError::ConfigError(format!(
            "[paths].src and [paths].dist must differ (both are {:?})",
            cfg.paths.dist
        )));
    }
    if src.starts_with(&dist) || src.as_os_str().is_empty() {
        return Err(AssetpipeError::ConfigError(format!(
            "[paths].dist {:?} contains the source root {:?}; clean would delete sources",
            cfg.paths.dist, cfg.paths.src
        )));
    }
    if dist.starts_with(&src) {
        return Err(AssetpipeError::ConfigError(format!(
            "[paths].dist {:?} must not be inside the source root {:?}",
            cfg.paths.dist, cfg.paths.src
        )));
    }
    Ok(())
}

fn validate_globs(cfg: &RawConfigFile) -> Result<()> {
    let paths = &cfg.paths;
    let singles = [&paths.scss, &paths.js, &paths.images];

    let all = paths
        .html
        .iter()
        .chain(paths.html_exclude.iter())
        .chain(singles)
        .chain(paths.assets.iter().map(|a| &a.src));

    for pattern in all {
        Glob::new(pattern).map_err(|e| {
            AssetpipeError::ConfigError(format!("invalid glob pattern {pattern:?}: {e}"))
        })?;
    }

    if paths.html.is_empty() {
        return Err(AssetpipeError::ConfigError(
            "[paths].html must contain at least one pattern".to_string(),
        ));
    }
    Ok(())
}

fn validate_assets(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for asset in cfg.paths.assets.iter() {
        if !seen.insert(asset.name.as_str()) {
            return Err(AssetpipeError::ConfigError(format!(
                "duplicate asset name '{}' in [[paths.assets]]",
                asset.name
            )));
        }
        if Path::new(&asset.output).is_absolute() {
            return Err(AssetpipeError::ConfigError(format!(
                "asset '{}' output must be relative to [paths].dist",
                asset.name
            )));
        }
    }
    Ok(())
}

fn validate_images(cfg: &RawConfigFile) -> Result<()> {
    if cfg.images.png_level > 6 {
        return Err(AssetpipeError::ConfigError(format!(
            "[images].png_level must be between 0 and 6 (got {})",
            cfg.images.png_level
        )));
    }
    if !(1..=100).contains(&cfg.images.jpeg_quality) {
        return Err(AssetpipeError::ConfigError(format!(
            "[images].jpeg_quality must be between 1 and 100 (got {})",
            cfg.images.jpeg_quality
        )));
    }
    Ok(())
}

/// Validate an already-deserialized raw config without converting it.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::AssetPath;

    fn with_roots(src: &str, dist: &str) -> RawConfigFile {
        let mut raw = RawConfigFile::default();
        raw.paths.src = src.to_string();
        raw.paths.dist = dist.to_string();
        raw
    }

    fn config_error(raw: RawConfigFile) -> String {
        match ConfigFile::try_from(raw) {
            Err(AssetpipeError::ConfigError(msg)) => msg,
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(ConfigFile::try_from(RawConfigFile::default()).is_ok());
    }

    #[test]
    fn dist_at_project_root_is_rejected() {
        assert!(config_error(with_roots("src", ".")).contains("project root"));
        assert!(config_error(with_roots("src", "./")).contains("project root"));
    }

    #[test]
    fn dist_containing_src_is_rejected() {
        assert!(config_error(with_roots("site/src", "site")).contains("clean would delete"));
    }

    #[test]
    fn dist_inside_src_is_rejected() {
        assert!(config_error(with_roots("src", "./src/dist")).contains("inside the source root"));
    }

    #[test]
    fn sibling_roots_with_shared_prefix_are_fine() {
        // "src" is a string prefix of "srcdist" but not a path ancestor.
        assert!(ConfigFile::try_from(with_roots("src", "srcdist")).is_ok());
    }

    #[test]
    fn bad_glob_is_reported() {
        let mut raw = RawConfigFile::default();
        raw.paths.scss = "scss/**/[.scss".to_string();
        assert!(config_error(raw).contains("invalid glob"));
    }

    #[test]
    fn duplicate_asset_names_are_rejected() {
        let mut raw = RawConfigFile::default();
        raw.paths.assets.push(AssetPath::new("fonts", "more-fonts/**/*", "fonts"));
        assert!(config_error(raw).contains("duplicate asset name"));
    }

    #[test]
    fn png_level_out_of_range_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.images.png_level = 9;
        assert!(config_error(raw).contains("png_level"));
    }

    #[test]
    fn zero_jpeg_quality_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.images.jpeg_quality = 0;
        assert!(config_error(raw).contains("jpeg_quality"));
    }
}
