use bracket_core::drawing::Drawing;
use bracket_core::geometry::Bounds2D;
use bracket_core::profile::{ArcTessellation, BevelConfig, ClassifiedGeometry, ExtrusionSpec, Loop};
use bracket_core::solid::Solid;
use bracket_io::{DrawingDecoder, DxfFacade, decompose};
use tracing::{debug, info, warn};

use crate::classify::{ClassificationStrategy, classify_loops};
use crate::errors::EngineError;
use crate::solid::build_solid;
use crate::stitch::{DEFAULT_ADJACENCY_THRESHOLD, MatchStrategy, Stitcher};

/// 默认钢板厚度（源文件单位）。
pub const DEFAULT_THICKNESS: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub adjacency_threshold: f64,
    pub match_strategy: MatchStrategy,
    pub classification: ClassificationStrategy,
    pub tessellation: ArcTessellation,
    pub bevel: BevelConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            adjacency_threshold: DEFAULT_ADJACENCY_THRESHOLD,
            match_strategy: MatchStrategy::default(),
            classification: ClassificationStrategy::default(),
            tessellation: ArcTessellation::default(),
            bevel: BevelConfig::default(),
        }
    }
}

/// 一次重建过程中的计数。静默丢弃的几何在这里显式体现。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub decoded_entities: usize,
    pub skipped_entities: usize,
    pub direct_loops: usize,
    pub segments: usize,
    pub stitched_loops: usize,
    pub isolated_segments: usize,
    pub degenerate_loops: usize,
    pub holes: usize,
    pub parts: usize,
    pub unbuilt_parts: usize,
}

impl Diagnostics {
    /// 被跳过或丢弃的图元/图段/轮廓总数。
    pub fn silent_losses(&self) -> usize {
        self.skipped_entities + self.isolated_segments + self.degenerate_loops
    }

    #[inline]
    pub fn is_lossless(&self) -> bool {
        self.silent_losses() == 0
    }
}

#[derive(Debug, Clone)]
pub struct ReconstructedPart {
    pub geometry: ClassifiedGeometry,
    /// 外轮廓退化或三角化失败时为 `None`，调用方应视为“无可绘制内容”。
    pub solid: Option<Solid>,
}

#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub parts: Vec<ReconstructedPart>,
    pub diagnostics: Diagnostics,
    /// 图纸中全部可识别图元的范围（源文件坐标）。
    pub extents: Option<Bounds2D>,
}

impl Reconstruction {
    /// 没有形成任何轮廓（EmptyGeometry）。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn solids(&self) -> impl Iterator<Item = &Solid> {
        self.parts.iter().filter_map(|part| part.solid.as_ref())
    }

    /// 默认分类下唯一的实体。
    pub fn primary_solid(&self) -> Option<&Solid> {
        self.parts.first().and_then(|part| part.solid.as_ref())
    }
}

/// 解码 → 拼接 → 分类 → 挤出。每次调用互不影响，相同输入得到相同输出。
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// 从原始字节开始重建。解析失败是唯一向上传播的几何相关错误。
    pub fn run(&self, bytes: &[u8], thickness: f64) -> Result<Reconstruction, EngineError> {
        let drawing = DxfFacade::new().decode(bytes)?;
        self.reconstruct(&drawing, thickness)
    }

    pub fn reconstruct(
        &self,
        drawing: &Drawing,
        thickness: f64,
    ) -> Result<Reconstruction, EngineError> {
        if !thickness.is_finite() || thickness <= 0.0 {
            return Err(EngineError::InvalidThickness(thickness));
        }

        let (loops, mut diagnostics) = self.collect_loops(drawing);
        let regions = classify_loops(loops, self.options.classification);

        let mut parts = Vec::with_capacity(regions.len());
        for geometry in regions {
            diagnostics.holes += geometry.holes.len();
            let spec = ExtrusionSpec::new(geometry.clone(), thickness, self.options.bevel);
            let solid = match build_solid(&spec) {
                Ok(solid) => solid,
                Err(EngineError::Triangulation(reason)) => {
                    warn!(%reason, "截面三角化失败，该区域不生成实体");
                    None
                }
                Err(err) => return Err(err),
            };
            if solid.is_none() {
                diagnostics.unbuilt_parts += 1;
            }
            parts.push(ReconstructedPart { geometry, solid });
        }
        diagnostics.parts = parts.len();

        if parts.is_empty() {
            info!("图纸未形成任何闭合轮廓");
        }
        if !diagnostics.is_lossless() {
            warn!(
                skipped = diagnostics.skipped_entities,
                isolated = diagnostics.isolated_segments,
                degenerate = diagnostics.degenerate_loops,
                "重建过程中有几何被丢弃"
            );
        }
        debug!(
            parts = diagnostics.parts,
            holes = diagnostics.holes,
            direct = diagnostics.direct_loops,
            stitched = diagnostics.stitched_loops,
            "重建完成"
        );

        Ok(Reconstruction {
            parts,
            diagnostics,
            extents: drawing.bounds(),
        })
    }

    /// 收集全部闭合轮廓：先是直接闭合的多段线与圆（文件顺序），再是拼接得到的轮廓。
    pub fn collect_loops(&self, drawing: &Drawing) -> (Vec<Loop>, Diagnostics) {
        let decomposition = decompose(drawing, self.options.tessellation);
        let stitcher = Stitcher::new(self.options.adjacency_threshold)
            .with_strategy(self.options.match_strategy)
            .with_tessellation(self.options.tessellation);
        debug!(
            threshold = stitcher.threshold(),
            strategy = ?stitcher.strategy(),
            segments = decomposition.segments.len(),
            "开始拼接图段"
        );
        let outcome = stitcher.stitch(&decomposition.segments);

        let diagnostics = Diagnostics {
            decoded_entities: drawing.entity_count(),
            skipped_entities: drawing.skipped_entities(),
            direct_loops: decomposition.loops.len(),
            segments: decomposition.segments.len(),
            stitched_loops: outcome.loops.len(),
            isolated_segments: outcome.isolated_segments,
            degenerate_loops: decomposition.degenerate_loops + outcome.degenerate_loops,
            ..Diagnostics::default()
        };

        let mut loops = decomposition.loops;
        loops.extend(outcome.loops);
        (loops, diagnostics)
    }
}
