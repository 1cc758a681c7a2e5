use std::env;
use std::f64::consts::FRAC_PI_2;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `BRACKET_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("BRACKET_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 检查数值范围与目录完整性。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = &self.pipeline;
        if !(pipeline.default_thickness.is_finite() && pipeline.default_thickness > 0.0) {
            return Err(ConfigError::invalid(format!(
                "pipeline.default_thickness 必须为正数（当前：{}）",
                pipeline.default_thickness
            )));
        }
        if !(pipeline.adjacency_threshold.is_finite() && pipeline.adjacency_threshold > 0.0) {
            return Err(ConfigError::invalid(format!(
                "pipeline.adjacency_threshold 必须为正数（当前：{}）",
                pipeline.adjacency_threshold
            )));
        }
        if pipeline.arc_segments_per_turn < 8 {
            return Err(ConfigError::invalid(format!(
                "pipeline.arc_segments_per_turn 至少为 8（当前：{}）",
                pipeline.arc_segments_per_turn
            )));
        }
        let bevel = &pipeline.bevel;
        if [bevel.thickness, bevel.size, bevel.offset]
            .iter()
            .any(|value| !value.is_finite())
            || bevel.thickness < 0.0
            || bevel.size < 0.0
        {
            return Err(ConfigError::invalid("pipeline.bevel 参数必须为非负有限数"));
        }

        for product in &self.catalog.products {
            if product.sku.trim().is_empty() {
                return Err(ConfigError::invalid("catalog.products 中存在空的 sku"));
            }
            if product.parts.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "产品 {} 未配置任何零件",
                    product.sku
                )));
            }
            for part in &product.parts {
                if let Some(thickness) = part.thickness {
                    if !(thickness.is_finite() && thickness > 0.0) {
                        return Err(ConfigError::invalid(format!(
                            "产品 {} 的零件 {:?} 厚度无效（{thickness}）",
                            product.sku, part.file
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategyName {
    #[default]
    First,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationName {
    #[default]
    LargestArea,
    Containment,
}

/// 重建流水线参数。
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "PipelineConfig::default_thickness")]
    pub default_thickness: f64,
    #[serde(default = "PipelineConfig::default_threshold")]
    pub adjacency_threshold: f64,
    #[serde(default)]
    pub match_strategy: MatchStrategyName,
    #[serde(default)]
    pub classification: ClassificationName,
    #[serde(default = "PipelineConfig::default_arc_segments")]
    pub arc_segments_per_turn: usize,
    #[serde(default)]
    pub bevel: BevelSettings,
}

impl PipelineConfig {
    fn default_thickness() -> f64 {
        0.25
    }

    fn default_threshold() -> f64 {
        0.05
    }

    fn default_arc_segments() -> usize {
        64
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_thickness: Self::default_thickness(),
            adjacency_threshold: Self::default_threshold(),
            match_strategy: MatchStrategyName::default(),
            classification: ClassificationName::default(),
            arc_segments_per_turn: Self::default_arc_segments(),
            bevel: BevelSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BevelSettings {
    #[serde(default = "BevelSettings::default_enabled")]
    pub enabled: bool,
    #[serde(default = "BevelSettings::default_extent")]
    pub thickness: f64,
    #[serde(default = "BevelSettings::default_extent")]
    pub size: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "BevelSettings::default_segments")]
    pub segments: u32,
}

impl BevelSettings {
    fn default_enabled() -> bool {
        true
    }

    fn default_extent() -> f64 {
        0.05
    }

    fn default_segments() -> u32 {
        3
    }
}

impl Default for BevelSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            thickness: Self::default_extent(),
            size: Self::default_extent(),
            offset: 0.0,
            segments: Self::default_segments(),
        }
    }
}

/// 图纸资源根目录。零件文件路径相对这些目录解析。
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "AssetConfig::default_roots")]
    pub roots: Vec<PathBuf>,
}

impl AssetConfig {
    fn default_roots() -> Vec<PathBuf> {
        vec![PathBuf::from("assets/skus")]
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            roots: Self::default_roots(),
        }
    }
}

/// 产品目录：SKU 到零件列表的映射。
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// 未指定 SKU 时使用的产品。
    #[serde(default)]
    pub default_sku: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

impl CatalogConfig {
    pub fn product(&self, sku: &str) -> Option<&ProductConfig> {
        let sku = sku.trim();
        self.products.iter().find(|product| product.sku == sku)
    }

    pub fn skus(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(|product| product.sku.as_str())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let side = |file: &str, x: f64, yaw: f64| PartConfig {
            file: PathBuf::from(file),
            thickness: Some(0.25),
            position: [x, 3.0, 0.0],
            rotation: [0.0, yaw, 0.0],
            material: MaterialConfig::default(),
        };
        Self {
            default_sku: Some("JHCB10".to_string()),
            products: vec![
                ProductConfig {
                    sku: "JHCB10".to_string(),
                    thickness_option: Some(ProductConfig::default_thickness_option()),
                    parts: vec![PartConfig::new("JHCB10/Catherine Stoll-5- JHCB .250.DXF")],
                },
                ProductConfig {
                    sku: "UPB10".to_string(),
                    thickness_option: None,
                    parts: vec![
                        PartConfig {
                            thickness: Some(0.25),
                            ..PartConfig::new("UPB10/Jack Smith-24-UPB .25 Bottom.DXF")
                        },
                        side("UPB10/Jack Smith-24-UPB .25 Lside.DXF", -3.0, FRAC_PI_2),
                        side("UPB10/Jack Smith-24-UPB .25 Rside.DXF", 3.0, -FRAC_PI_2),
                    ],
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductConfig {
    pub sku: String,
    /// 决定厚度的选项名，例如 `STEEL THICKNESS`。为空时零件使用固定厚度或默认值。
    #[serde(default)]
    pub thickness_option: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartConfig>,
}

impl ProductConfig {
    fn default_thickness_option() -> String {
        "STEEL THICKNESS".to_string()
    }
}

/// 组件中的一个零件。`thickness` 固定时忽略选项。
#[derive(Debug, Clone, Deserialize)]
pub struct PartConfig {
    pub file: PathBuf,
    #[serde(default)]
    pub thickness: Option<f64>,
    #[serde(default)]
    pub position: [f64; 3],
    /// 欧拉角（弧度，XYZ 顺序）。
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default)]
    pub material: MaterialConfig,
}

impl PartConfig {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            thickness: None,
            position: [0.0; 3],
            rotation: [0.0; 3],
            material: MaterialConfig::default(),
        }
    }
}

/// 渲染材质参数，原样传递给渲染层。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MaterialConfig {
    #[serde(default = "MaterialConfig::default_color")]
    pub color: String,
    #[serde(default = "MaterialConfig::default_metalness")]
    pub metalness: f64,
    #[serde(default = "MaterialConfig::default_roughness")]
    pub roughness: f64,
}

impl MaterialConfig {
    fn default_color() -> String {
        "#4a4a4a".to_string()
    }

    fn default_metalness() -> f64 {
        0.8
    }

    fn default_roughness() -> f64 {
        0.2
    }
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            color: Self::default_color(),
            metalness: Self::default_metalness(),
            roughness: Self::default_roughness(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置无效: {message}")]
    Invalid { message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let cfg = AppConfig::discover().expect("discover should succeed");
        assert_eq!(cfg.logging.level, "info");
        assert!((cfg.pipeline.default_thickness - 0.25).abs() < f64::EPSILON);
        assert!((cfg.pipeline.adjacency_threshold - 0.05).abs() < f64::EPSILON);
        assert_eq!(cfg.pipeline.match_strategy, MatchStrategyName::First);
        assert_eq!(cfg.pipeline.classification, ClassificationName::LargestArea);
        assert!(cfg.pipeline.bevel.enabled);
        assert_eq!(cfg.pipeline.bevel.segments, 3);
        assert_eq!(cfg.assets.roots, vec![PathBuf::from("assets/skus")]);
        assert_eq!(cfg.catalog.default_sku.as_deref(), Some("JHCB10"));
    }

    #[test]
    fn builtin_catalog_describes_known_products() {
        let catalog = CatalogConfig::default();
        let jhcb = catalog.product("JHCB10").expect("JHCB10");
        assert_eq!(jhcb.thickness_option.as_deref(), Some("STEEL THICKNESS"));
        assert_eq!(jhcb.parts.len(), 1);
        assert!(jhcb.parts[0].thickness.is_none());

        let upb = catalog.product(" UPB10 ").expect("UPB10");
        assert_eq!(upb.parts.len(), 3);
        assert_eq!(upb.parts[1].position, [-3.0, 3.0, 0.0]);
        assert!((upb.parts[2].rotation[1] + FRAC_PI_2).abs() < 1e-12);
        assert_eq!(upb.parts[0].material, MaterialConfig::default());
        assert!(catalog.product("UNKNOWN").is_none());
    }

    #[test]
    fn load_from_temp_file() {
        let file = write_config(
            r##"
            [logging]
            level = "debug"

            [pipeline]
            default_thickness = 0.375
            adjacency_threshold = 0.01
            match_strategy = "nearest"
            classification = "containment"

            [pipeline.bevel]
            enabled = false

            [assets]
            roots = ["../assets", "/srv/drawings"]

            [catalog]
            default_sku = "PLATE"

            [[catalog.products]]
            sku = "PLATE"
            thickness_option = "GAUGE"

            [[catalog.products.parts]]
            file = "PLATE/plate.dxf"
            position = [1.0, 2.0, 3.0]

            [catalog.products.parts.material]
            color = "#ff0000"
            "##,
        );

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert!((cfg.pipeline.default_thickness - 0.375).abs() < f64::EPSILON);
        assert_eq!(cfg.pipeline.match_strategy, MatchStrategyName::Nearest);
        assert_eq!(cfg.pipeline.classification, ClassificationName::Containment);
        assert_eq!(cfg.pipeline.arc_segments_per_turn, 64);
        assert!(!cfg.pipeline.bevel.enabled);
        assert!((cfg.pipeline.bevel.size - 0.05).abs() < f64::EPSILON);
        assert_eq!(cfg.assets.roots.len(), 2);

        assert_eq!(cfg.catalog.products.len(), 1);
        let product = cfg.catalog.product("PLATE").expect("PLATE");
        assert_eq!(product.thickness_option.as_deref(), Some("GAUGE"));
        let part = &product.parts[0];
        assert_eq!(part.position, [1.0, 2.0, 3.0]);
        assert_eq!(part.rotation, [0.0; 3]);
        assert_eq!(part.material.color, "#ff0000");
        assert!((part.material.metalness - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_strategy_is_a_parse_error() {
        let file = write_config(
            r#"
            [pipeline]
            match_strategy = "random"
            "#,
        );
        let err = AppConfig::from_file(file.path()).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn non_positive_threshold_is_rejected() {
        let file = write_config(
            r#"
            [pipeline]
            adjacency_threshold = 0.0
            "#,
        );
        let err = AppConfig::from_file(file.path()).expect_err("should fail");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn product_without_parts_is_rejected() {
        let file = write_config(
            r#"
            [[catalog.products]]
            sku = "EMPTY"
            "#,
        );
        let err = AppConfig::from_file(file.path()).expect_err("should fail");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::from_file("/definitely/not/here.toml").expect_err("should fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
