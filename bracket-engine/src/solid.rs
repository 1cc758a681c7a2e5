//! 轮廓挤出：外轮廓减去孔，沿 +Z 拉伸并在上下两侧生成圆弧过渡的倒角。

use std::f64::consts::FRAC_PI_2;

use bracket_core::geometry::{Point2, Point3};
use bracket_core::profile::{BevelConfig, ExtrusionSpec, distinct_point_count, shoelace_area};
use bracket_core::solid::{Mesh, Solid};
use glam::DVec2;
use tracing::{debug, warn};

use crate::errors::EngineError;

/// 挤出截面上的一层：高度 `z` 与轮廓外扩距离 `offset`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub z: f64,
    pub offset: f64,
}

/// 计算挤出层序列，按 z 递增排列。
///
/// 启用倒角时，底部倒角层从 `z = -bevel.thickness`（外扩 `bevel.offset`）
/// 沿四分之一圆过渡到主体层（外扩 `bevel.size + bevel.offset`），顶部对称。
pub fn extrusion_layers(thickness: f64, bevel: &BevelConfig) -> Vec<Layer> {
    let segments = bevel.effective_segments();
    if segments == 0 {
        return vec![
            Layer { z: 0.0, offset: 0.0 },
            Layer {
                z: thickness,
                offset: 0.0,
            },
        ];
    }

    let ramp = |b: u32| {
        let t = f64::from(b) / f64::from(segments);
        let z = bevel.thickness * (t * FRAC_PI_2).cos();
        let offset = bevel.size * (t * FRAC_PI_2).sin() + bevel.offset;
        (z, offset)
    };
    let full = bevel.size + bevel.offset;

    let mut layers = Vec::with_capacity(segments as usize * 2 + 2);
    for b in 0..segments {
        let (z, offset) = ramp(b);
        layers.push(Layer { z: -z, offset });
    }
    layers.push(Layer { z: 0.0, offset: full });
    layers.push(Layer {
        z: thickness,
        offset: full,
    });
    for b in (0..segments).rev() {
        let (z, offset) = ramp(b);
        layers.push(Layer {
            z: thickness + z,
            offset,
        });
    }
    layers
}

/// 由挤出参数生成实体。外轮廓不足三个不同点时返回 `Ok(None)`。
pub fn build_solid(spec: &ExtrusionSpec) -> Result<Option<Solid>, EngineError> {
    if !spec.thickness.is_finite() || spec.thickness <= 0.0 {
        return Err(EngineError::InvalidThickness(spec.thickness));
    }

    let outer = oriented_ring(spec.boundary.ring(), true);
    if distinct_point_count(&outer) < 3 {
        debug!("外轮廓退化，无法生成实体");
        return Ok(None);
    }

    let mut contours = vec![outer];
    for hole in &spec.holes {
        let ring = oriented_ring(hole.ring(), false);
        if distinct_point_count(&ring) >= 3 {
            contours.push(ring);
        }
    }

    let movements: Vec<Vec<DVec2>> = contours.iter().map(|ring| bevel_vectors(ring)).collect();
    let layers = extrusion_layers(spec.thickness, &spec.bevel);
    let per_layer: usize = contours.iter().map(Vec::len).sum();

    let mut mesh = Mesh::with_capacity(per_layer * layers.len(), per_layer * layers.len() * 6);
    for layer in &layers {
        for (ring, moves) in contours.iter().zip(&movements) {
            for (point, movement) in ring.iter().zip(moves) {
                let shifted = point.as_vec2() + *movement * layer.offset;
                mesh.add_vertex(Point3::new(shifted.x, shifted.y, layer.z));
            }
        }
    }

    let vertex = |layer: usize, index: usize| (layer * per_layer + index) as u32;

    // 侧壁
    let mut base = 0;
    for ring in &contours {
        let n = ring.len();
        for layer in 0..layers.len() - 1 {
            for i in 0..n {
                let j = (i + 1) % n;
                let a = vertex(layer, base + i);
                let b = vertex(layer, base + j);
                let c = vertex(layer + 1, base + j);
                let d = vertex(layer + 1, base + i);
                mesh.add_triangle(a, b, c);
                mesh.add_triangle(a, c, d);
            }
        }
        base += n;
    }

    // 上下盖面
    let bottom = 0;
    let top = layers.len() - 1;
    let cap = triangulate_cap(&mesh, &contours, vertex(bottom, 0) as usize, per_layer)?;
    if cap.is_empty() {
        warn!(contours = contours.len(), "盖面三角化结果为空，放弃生成实体");
        return Ok(None);
    }
    for &tri in &cap {
        add_cap_triangle(&mut mesh, vertex(bottom, 0), tri, false);
    }
    let top_cap = triangulate_cap(&mesh, &contours, vertex(top, 0) as usize, per_layer)?;
    for &tri in &top_cap {
        add_cap_triangle(&mut mesh, vertex(top, 0), tri, true);
    }

    let footprint = spec.boundary.area() - spec.holes.iter().map(|hole| hole.area()).sum::<f64>();
    debug!(
        layers = layers.len(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        holes = contours.len() - 1,
        "挤出完成"
    );
    Ok(Solid::centered(mesh, footprint, spec.thickness))
}

/// 三角化某一层的截面，返回相对该层首顶点的索引三元组。
fn triangulate_cap(
    mesh: &Mesh,
    contours: &[Vec<Point2>],
    layer_start: usize,
    per_layer: usize,
) -> Result<Vec<[usize; 3]>, EngineError> {
    let positions = &mesh.positions()[layer_start..layer_start + per_layer];
    let mut coords = Vec::with_capacity(per_layer * 2);
    for position in positions {
        coords.push(position.x());
        coords.push(position.y());
    }

    let mut hole_starts = Vec::with_capacity(contours.len().saturating_sub(1));
    let mut cursor = 0;
    for (idx, ring) in contours.iter().enumerate() {
        if idx > 0 {
            hole_starts.push(cursor);
        }
        cursor += ring.len();
    }

    let indices = earcutr::earcut(&coords, &hole_starts, 2)
        .map_err(|err| EngineError::Triangulation(format!("{err:?}")))?;
    Ok(indices
        .chunks_exact(3)
        .map(|tri| [tri[0], tri[1], tri[2]])
        .collect())
}

/// 按朝向追加盖面三角形：顶面法向 +Z（逆时针），底面法向 -Z（顺时针）。
fn add_cap_triangle(mesh: &mut Mesh, layer_base: u32, tri: [usize; 3], upward: bool) {
    let [a, b, c] = tri.map(|i| layer_base + i as u32);
    let positions = mesh.positions();
    let (pa, pb, pc) = (
        positions[a as usize],
        positions[b as usize],
        positions[c as usize],
    );
    let cross = (pb.x() - pa.x()) * (pc.y() - pa.y()) - (pb.y() - pa.y()) * (pc.x() - pa.x());
    if (cross > 0.0) == upward {
        mesh.add_triangle(a, b, c);
    } else {
        mesh.add_triangle(a, c, b);
    }
}

/// 外轮廓统一为逆时针、孔为顺时针。两者沿边的右手法向都指向实体外侧。
fn oriented_ring(ring: &[Point2], counter_clockwise: bool) -> Vec<Point2> {
    let mut points = ring.to_vec();
    if (shoelace_area(&points) > 0.0) != counter_clockwise {
        points.reverse();
    }
    points
}

/// 每个顶点的外扩向量：沿它平移 `d` 可使相邻两条边各自外移 `d`（斜接）。
fn bevel_vectors(ring: &[Point2]) -> Vec<DVec2> {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n].as_vec2();
            let curr = ring[i].as_vec2();
            let next = ring[(i + 1) % n].as_vec2();
            let n_prev = right_normal(curr - prev);
            let n_next = right_normal(next - curr);
            let denom = 1.0 + n_prev.dot(n_next);
            if denom < 1e-9 {
                n_prev
            } else {
                (n_prev + n_next) / denom
            }
        })
        .collect()
}

fn right_normal(edge: DVec2) -> DVec2 {
    DVec2::new(edge.y, -edge.x).normalize_or_zero()
}
