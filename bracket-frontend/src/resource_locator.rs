use std::env;
use std::path::{Path, PathBuf};

use bracket_config::AssetConfig;
use tracing::{debug, trace};

const ASSET_ROOTS_ENV: &str = "BRACKET_ASSET_ROOTS";

/// 在若干资源根目录中查找零件图纸。靠前的目录优先。
#[derive(Debug, Clone, Default)]
pub struct AssetLocator {
    search_roots: Vec<PathBuf>,
}

impl AssetLocator {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut locator = Self::default();
        for root in roots {
            locator.push_root(root);
        }
        locator
    }

    /// 依次收集：调用方给出的基准目录、配置中的目录、环境变量 `BRACKET_ASSET_ROOTS`。
    /// 不存在的目录被忽略。
    pub fn from_config(base_dir: Option<&Path>, config: &AssetConfig) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();

        if let Some(dir) = base_dir {
            roots.push(dir.to_path_buf());
        }

        roots.extend(config.roots.iter().cloned().filter(|path| path.is_dir()));

        if let Some(env_paths) = env::var_os(ASSET_ROOTS_ENV) {
            for path in env::split_paths(&env_paths) {
                if path.is_dir() {
                    roots.push(path);
                }
            }
        }

        Self::new(roots)
    }

    fn push_root(&mut self, root: PathBuf) {
        if !self.search_roots.iter().any(|existing| existing == &root) {
            self.search_roots.push(root);
        }
    }

    #[inline]
    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    pub fn resolve(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            if path.is_file() {
                return Some(path.to_path_buf());
            }
            debug!(path = %path.display(), "图纸路径为绝对路径但未找到对应文件");
            return None;
        }

        for root in &self.search_roots {
            let candidate = root.join(path);
            trace!(candidate = %candidate.display(), "asset locator candidate");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}
