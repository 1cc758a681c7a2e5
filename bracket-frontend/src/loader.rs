use std::path::{Path, PathBuf};

use bracket_config::{ClassificationName, MatchStrategyName, MaterialConfig, PipelineConfig};
use bracket_core::geometry::{Bounds3D, Point3};
use bracket_core::profile::{ArcTessellation, BevelConfig};
use bracket_core::solid::Solid;
use bracket_engine::{
    ClassificationStrategy, Diagnostics, EngineError, MatchStrategy, Pipeline, PipelineOptions,
    Reconstruction,
};
use bracket_io::{DrawingLoader, DxfFacade, IoError};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::resource_locator::AssetLocator;
use crate::selection::{AssemblyPlan, PartRequest, Placement};

/// 将配置映射为流水线参数。
pub fn options_from_config(config: &PipelineConfig) -> PipelineOptions {
    let bevel = &config.bevel;
    PipelineOptions {
        adjacency_threshold: config.adjacency_threshold,
        match_strategy: match config.match_strategy {
            MatchStrategyName::First => MatchStrategy::FirstInIndexOrder,
            MatchStrategyName::Nearest => MatchStrategy::Nearest,
        },
        classification: match config.classification {
            ClassificationName::LargestArea => ClassificationStrategy::LargestArea,
            ClassificationName::Containment => ClassificationStrategy::Containment,
        },
        tessellation: ArcTessellation::new(config.arc_segments_per_turn),
        bevel: BevelConfig {
            enabled: bevel.enabled,
            thickness: bevel.thickness,
            size: bevel.size,
            offset: bevel.offset,
            segments: bevel.segments,
        },
    }
}

/// 零件加载结果。除 `Ready` 外，渲染层都应把零件当作不可见。
#[derive(Debug, Clone, PartialEq)]
pub enum PartStatus {
    Ready,
    Missing,
    ReadFailed(String),
    ParseFailed(String),
    /// 图纸未形成任何闭合轮廓。
    Empty,
    /// 有轮廓但没有任何区域生成实体。
    NoSolid,
    Rejected(String),
}

impl PartStatus {
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready => "就绪",
            Self::Missing => "文件缺失",
            Self::ReadFailed(_) => "读取失败",
            Self::ParseFailed(_) => "解析失败",
            Self::Empty => "无闭合轮廓",
            Self::NoSolid => "无法生成实体",
            Self::Rejected(_) => "参数无效",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderPart {
    pub file: PathBuf,
    pub resolved: Option<PathBuf>,
    pub thickness: f64,
    pub placement: Placement,
    pub material: MaterialConfig,
    pub status: PartStatus,
    /// 每个成功挤出的区域一个实体；默认分类下至多一个。
    pub solids: Vec<Solid>,
    pub diagnostics: Option<Diagnostics>,
}

impl RenderPart {
    fn pending(request: &PartRequest) -> Self {
        Self {
            file: request.file.clone(),
            resolved: None,
            thickness: request.thickness,
            placement: request.placement,
            material: request.material.clone(),
            status: PartStatus::Missing,
            solids: Vec::new(),
            diagnostics: None,
        }
    }

    /// 全部实体包围盒的八个角经位姿变换后的包围盒。
    pub fn world_bounds(&self) -> Option<Bounds3D> {
        let mut bounds = Bounds3D::empty();
        for solid in &self.solids {
            let local = solid.bounds();
            let (min, max) = (local.min().as_vec3(), local.max().as_vec3());
            for corner in 0..8u8 {
                let pick = |bit: u8, lo: f64, hi: f64| if corner & bit == 0 { lo } else { hi };
                let point = Point3::new(
                    pick(1, min.x, max.x),
                    pick(2, min.y, max.y),
                    pick(4, min.z, max.z),
                );
                bounds.include_point(self.placement.apply(point));
            }
        }
        (!bounds.is_empty()).then_some(bounds)
    }
}

/// 一个 SKU 的全部零件。单个零件失败不影响其余零件。
#[derive(Debug, Clone)]
pub struct Assembly {
    pub sku: String,
    pub parts: Vec<RenderPart>,
}

impl Assembly {
    pub fn ready_parts(&self) -> impl Iterator<Item = &RenderPart> {
        self.parts.iter().filter(|part| part.status.is_ready())
    }

    #[inline]
    pub fn is_renderable(&self) -> bool {
        self.ready_parts().next().is_some()
    }

    pub fn world_bounds(&self) -> Option<Bounds3D> {
        let mut bounds = Bounds3D::empty();
        for part_bounds in self.parts.iter().filter_map(RenderPart::world_bounds) {
            bounds.include_point(part_bounds.min());
            bounds.include_point(part_bounds.max());
        }
        (!bounds.is_empty()).then_some(bounds)
    }
}

pub fn load_assembly(plan: &AssemblyPlan, locator: &AssetLocator, pipeline: &Pipeline) -> Assembly {
    let parts = plan
        .parts
        .iter()
        .map(|request| load_part(request, locator, pipeline))
        .collect::<Vec<_>>();
    let ready = parts.iter().filter(|part| part.status.is_ready()).count();
    info!(sku = %plan.sku, parts = parts.len(), ready, "组件加载完成");
    Assembly {
        sku: plan.sku.clone(),
        parts,
    }
}

pub fn load_part(request: &PartRequest, locator: &AssetLocator, pipeline: &Pipeline) -> RenderPart {
    let mut part = RenderPart::pending(request);
    let Some(path) = locator.resolve(&request.file) else {
        warn!(file = %request.file.display(), "找不到零件图纸");
        return part;
    };
    part.resolved = Some(path.clone());

    match load_drawing(&path, request.thickness, pipeline) {
        Ok(reconstruction) => {
            part.diagnostics = Some(reconstruction.diagnostics);
            part.solids = reconstruction.solids().cloned().collect();
            if reconstruction.diagnostics.unbuilt_parts > 0 && !part.solids.is_empty() {
                warn!(
                    path = %path.display(),
                    built = part.solids.len(),
                    unbuilt = reconstruction.diagnostics.unbuilt_parts,
                    "部分区域未生成实体"
                );
            }
            part.status = if reconstruction.is_empty() {
                PartStatus::Empty
            } else if part.solids.is_empty() {
                PartStatus::NoSolid
            } else {
                PartStatus::Ready
            };
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "零件重建失败");
            part.status = match err {
                FrontendError::Read(IoError::ReadError { .. }) => {
                    PartStatus::ReadFailed(err.to_string())
                }
                FrontendError::Read(IoError::Parse(message))
                | FrontendError::Pipeline(EngineError::Decode(IoError::Parse(message))) => {
                    PartStatus::ParseFailed(message)
                }
                other => PartStatus::Rejected(other.to_string()),
            };
        }
    }
    part
}

/// 读取单个 DXF 文件并重建。
pub fn load_drawing(
    path: &Path,
    thickness: f64,
    pipeline: &Pipeline,
) -> Result<Reconstruction, FrontendError> {
    let drawing = DxfFacade::new().load(path)?;
    info!(
        path = %path.display(),
        entities = drawing.entity_count(),
        "从 DXF 加载图纸成功"
    );
    Ok(pipeline.reconstruct(&drawing, thickness)?)
}
