use std::collections::BTreeMap;
use std::path::PathBuf;

use bracket_config::{CatalogConfig, MaterialConfig, PartConfig};
use bracket_core::geometry::{Point3, Vector3};
use glam::{DAffine3, DQuat, DVec3, EulerRot};
use tracing::debug;

use crate::errors::FrontendError;

/// 店面选项，键为选项名（例如 `STEEL THICKNESS`），值为原始文本。
pub type OptionMap = BTreeMap<String, String>;

/// 一次产品选择：SKU 与其选项。SKU 为空时使用目录默认值。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionRequest {
    pub sku: Option<String>,
    pub options: OptionMap,
}

impl SelectionRequest {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: Some(sku.into()),
            options: OptionMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// 解析 `KEY=VALUE` 形式的选项，键两端空白被去除。
    pub fn parse_option(raw: &str) -> Option<(String, String)> {
        let (key, value) = raw.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some((key.to_string(), value.trim().to_string()))
    }
}

/// 零件在组件中的位姿。旋转为 XYZ 欧拉角（弧度）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Point3,
    pub rotation: Vector3,
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    pub fn from_arrays(position: [f64; 3], rotation: [f64; 3]) -> Self {
        Self {
            position: Point3::from(DVec3::from_array(position)),
            rotation: Vector3::from(DVec3::from_array(rotation)),
        }
    }

    pub fn transform(&self) -> DAffine3 {
        let r = self.rotation.as_vec3();
        DAffine3::from_rotation_translation(
            DQuat::from_euler(EulerRot::XYZ, r.x, r.y, r.z),
            self.position.as_vec3(),
        )
    }

    #[inline]
    pub fn apply(&self, point: Point3) -> Point3 {
        Point3::from(self.transform().transform_point3(point.as_vec3()))
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

/// 待加载的单个零件。
#[derive(Debug, Clone, PartialEq)]
pub struct PartRequest {
    pub file: PathBuf,
    pub thickness: f64,
    pub placement: Placement,
    pub material: MaterialConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyPlan {
    pub sku: String,
    pub parts: Vec<PartRequest>,
}

/// 按文本的数字前缀读取厚度：`"0.375 in"` 得到 0.375。
/// 缺失、无法解析、为零或为负时使用默认厚度。
pub fn resolve_thickness(raw: Option<&str>, default: f64) -> f64 {
    match raw.and_then(leading_number) {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ => default,
    }
}

/// 取字符串开头最长的十进制浮点数前缀。
fn leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}

/// 根据目录将选择展开为零件列表。
pub fn plan_assembly(
    catalog: &CatalogConfig,
    request: &SelectionRequest,
    default_thickness: f64,
) -> Result<AssemblyPlan, FrontendError> {
    let sku = request
        .sku
        .as_deref()
        .map(str::trim)
        .filter(|sku| !sku.is_empty())
        .or(catalog.default_sku.as_deref())
        .ok_or(FrontendError::NoDefaultSku)?;
    let Some(product) = catalog.product(sku) else {
        let known: Vec<&str> = catalog.skus().collect();
        debug!(sku, ?known, "目录中没有该 SKU");
        return Err(FrontendError::UnknownSku {
            sku: sku.to_string(),
        });
    };

    let option_value = product
        .thickness_option
        .as_deref()
        .and_then(|key| request.options.get(key))
        .map(String::as_str);
    let option_thickness = resolve_thickness(option_value, default_thickness);

    let parts = product
        .parts
        .iter()
        .map(|part| part_request(part, option_thickness))
        .collect::<Vec<_>>();
    debug!(sku = %product.sku, parts = parts.len(), thickness = option_thickness, "展开产品零件");

    Ok(AssemblyPlan {
        sku: product.sku.clone(),
        parts,
    })
}

fn part_request(part: &PartConfig, option_thickness: f64) -> PartRequest {
    PartRequest {
        file: part.file.clone(),
        thickness: part.thickness.unwrap_or(option_thickness),
        placement: Placement::from_arrays(part.position, part.rotation),
        material: part.material.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn thickness_uses_numeric_prefix() {
        assert_eq!(resolve_thickness(Some("0.375"), 0.25), 0.375);
        assert_eq!(resolve_thickness(Some("0.375 in"), 0.25), 0.375);
        assert_eq!(resolve_thickness(Some("  .5\""), 0.25), 0.5);
        assert_eq!(resolve_thickness(Some("1e-1mm"), 0.25), 0.1);
        assert_eq!(resolve_thickness(Some("3/16"), 0.25), 3.0);
    }

    #[test]
    fn thickness_falls_back_to_default() {
        assert_eq!(resolve_thickness(None, 0.25), 0.25);
        assert_eq!(resolve_thickness(Some(""), 0.25), 0.25);
        assert_eq!(resolve_thickness(Some("thick"), 0.25), 0.25);
        assert_eq!(resolve_thickness(Some("0"), 0.25), 0.25);
        assert_eq!(resolve_thickness(Some("-0.5"), 0.25), 0.25);
        assert_eq!(resolve_thickness(Some("."), 0.25), 0.25);
    }

    #[test]
    fn option_parsing_splits_on_first_equals() {
        assert_eq!(
            SelectionRequest::parse_option("STEEL THICKNESS = 0.375"),
            Some(("STEEL THICKNESS".to_string(), "0.375".to_string()))
        );
        assert_eq!(
            SelectionRequest::parse_option("NOTE=a=b"),
            Some(("NOTE".to_string(), "a=b".to_string()))
        );
        assert!(SelectionRequest::parse_option("novalue").is_none());
        assert!(SelectionRequest::parse_option("=1").is_none());
    }

    #[test]
    fn option_driven_product_uses_selected_thickness() {
        let catalog = CatalogConfig::default();
        let request = SelectionRequest::new("JHCB10").with_option("STEEL THICKNESS", "0.375");
        let plan = plan_assembly(&catalog, &request, 0.25).expect("plan");
        assert_eq!(plan.sku, "JHCB10");
        assert_eq!(plan.parts.len(), 1);
        assert_eq!(plan.parts[0].thickness, 0.375);
        assert_eq!(plan.parts[0].placement, Placement::identity());
    }

    #[test]
    fn fixed_thickness_parts_ignore_options() {
        let catalog = CatalogConfig::default();
        let request = SelectionRequest::new("UPB10").with_option("STEEL THICKNESS", "0.5");
        let plan = plan_assembly(&catalog, &request, 0.25).expect("plan");
        assert_eq!(plan.parts.len(), 3);
        assert!(plan.parts.iter().all(|part| part.thickness == 0.25));
        assert!((plan.parts[1].placement.rotation.as_vec3().y - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn missing_sku_uses_catalog_default() {
        let catalog = CatalogConfig::default();
        let plan = plan_assembly(&catalog, &SelectionRequest::default(), 0.25).expect("plan");
        assert_eq!(plan.sku, "JHCB10");
        assert_eq!(plan.parts[0].thickness, 0.25);
    }

    #[test]
    fn unknown_sku_is_an_error() {
        let catalog = CatalogConfig::default();
        let err = plan_assembly(&catalog, &SelectionRequest::new("NOPE"), 0.25)
            .expect_err("unknown sku");
        assert!(matches!(err, FrontendError::UnknownSku { sku } if sku == "NOPE"));

        let empty = CatalogConfig {
            default_sku: None,
            products: Vec::new(),
        };
        let err = plan_assembly(&empty, &SelectionRequest::default(), 0.25).expect_err("no sku");
        assert!(matches!(err, FrontendError::NoDefaultSku));
    }

    #[test]
    fn side_panel_placement_rotates_about_y() {
        let placement = Placement::from_arrays([-3.0, 3.0, 0.0], [0.0, FRAC_PI_2, 0.0]);
        let moved = placement.apply(Point3::new(1.0, 0.0, 0.0));
        assert!((moved.x() - -3.0).abs() < 1e-9);
        assert!((moved.y() - 3.0).abs() < 1e-9);
        assert!((moved.z() - -1.0).abs() < 1e-9);
    }
}
