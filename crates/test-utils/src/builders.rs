#![allow(dead_code)]

use assetpipe::config::{AssetPath, ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_roots(mut self, src: &str, dist: &str) -> Self {
        self.config.paths.src = src.to_string();
        self.config.paths.dist = dist.to_string();
        self
    }

    pub fn with_asset(mut self, name: &str, src: &str, output: &str) -> Self {
        self.config.paths.assets.push(AssetPath::new(name, src, output));
        self
    }

    pub fn without_assets(mut self) -> Self {
        self.config.paths.assets.clear();
        self
    }

    pub fn with_images_output(mut self, output: &str) -> Self {
        self.config.paths.images_output = output.to_string();
        self
    }

    pub fn with_use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_tidy(mut self, val: bool) -> Self {
        self.config.html.tidy = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
