//! 把解码后的图元拆成两类几何原语：已闭合的轮廓（闭合多段线、整圆）
//! 与待拼接的开放图段（直线、圆弧、开放多段线的各边）。

use std::f64::consts::TAU;

use bracket_core::{
    drawing::{Drawing, Polyline, RawEntity},
    geometry::Point2,
    profile::{ArcTessellation, Loop, LoopBuilder, POINT_EPSILON, Segment},
};
use glam::DVec2;

/// 拆分结果。`segments` 的顺序即图元在文件中的顺序，拼接器依赖该顺序。
#[derive(Debug, Default, Clone)]
pub struct Decomposition {
    pub loops: Vec<Loop>,
    pub segments: Vec<Segment>,
    /// 细分后不足三个不同点而被丢弃的闭合图元数量。
    pub degenerate_loops: usize,
}

pub fn decompose(drawing: &Drawing, tessellation: ArcTessellation) -> Decomposition {
    let mut out = Decomposition::default();
    for entity in drawing.entities() {
        match entity {
            RawEntity::Polyline(polyline) if polyline.is_closed => {
                match closed_polyline_loop(polyline, tessellation) {
                    Some(lp) => out.loops.push(lp),
                    None => out.degenerate_loops += 1,
                }
            }
            RawEntity::Polyline(polyline) => {
                for pair in polyline.vertices.windows(2) {
                    out.segments
                        .push(edge_segment(pair[0].position, pair[1].position, pair[0].bulge));
                }
            }
            RawEntity::Circle(circle) => {
                let start = Point2::on_circle(circle.center, circle.radius, 0.0);
                let mut builder = LoopBuilder::new(start);
                builder.arc_to(circle.center, circle.radius, 0.0, TAU, false);
                match builder.close(tessellation) {
                    Some(lp) => out.loops.push(lp),
                    None => out.degenerate_loops += 1,
                }
            }
            RawEntity::Line(line) => out.segments.push(Segment::line(line.start, line.end)),
            RawEntity::Arc(arc) => out.segments.push(Segment::arc(
                arc.center,
                arc.radius,
                arc.start_radians(),
                arc.end_radians(),
            )),
        }
    }
    out
}

fn closed_polyline_loop(polyline: &Polyline, tessellation: ArcTessellation) -> Option<Loop> {
    let first = polyline.vertices.first()?;
    let mut builder = LoopBuilder::new(first.position);
    let count = polyline.vertices.len();
    for (idx, vertex) in polyline.vertices.iter().enumerate() {
        let next = &polyline.vertices[(idx + 1) % count];
        if idx + 1 == count && vertex.bulge == 0.0 {
            // 收尾直线由 close() 补齐
            break;
        }
        match BulgeArc::from_edge(vertex.position, next.position, vertex.bulge) {
            Some(arc) => builder.arc_to(
                arc.center,
                arc.radius,
                arc.start_angle,
                arc.end_angle,
                arc.clockwise,
            ),
            None => builder.line_to(next.position),
        }
    }
    builder.close(tessellation)
}

fn edge_segment(from: Point2, to: Point2, bulge: f64) -> Segment {
    match BulgeArc::from_edge(from, to, bulge) {
        // 顺时针弧以逆时针方向存放，端点随之交换
        Some(arc) if arc.clockwise => {
            Segment::arc(arc.center, arc.radius, arc.end_angle, arc.start_angle)
        }
        Some(arc) => Segment::arc(arc.center, arc.radius, arc.start_angle, arc.end_angle),
        None => Segment::line(from, to),
    }
}

/// 由 bulge 还原的圆弧：自 `from` 对应的 `start_angle` 扫到 `to` 对应的 `end_angle`。
#[derive(Debug, Clone, Copy)]
struct BulgeArc {
    center: Point2,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    clockwise: bool,
}

impl BulgeArc {
    fn from_edge(from: Point2, to: Point2, bulge: f64) -> Option<Self> {
        if bulge == 0.0 || !bulge.is_finite() {
            return None;
        }
        let chord = from.distance(to);
        if chord <= POINT_EPSILON {
            return None;
        }
        let clockwise = bulge < 0.0;
        let sweep = 4.0 * bulge.abs().atan();
        let radius = chord / (2.0 * (sweep * 0.5).sin());

        // 以逆时针方向计算圆心：顺时针弧等价于从 to 到 from 的逆时针弧
        let (a, b) = if clockwise { (to, from) } else { (from, to) };
        let dir = (b.as_vec2() - a.as_vec2()) / chord;
        let left = DVec2::new(-dir.y, dir.x);
        let mid = (a.as_vec2() + b.as_vec2()) * 0.5;
        let center = Point2::from_vec(mid + left * radius * (sweep * 0.5).cos());

        let angle_of = |p: Point2| {
            let v = p.as_vec2() - center.as_vec2();
            v.y.atan2(v.x)
        };
        Some(Self {
            center,
            radius,
            start_angle: angle_of(from),
            end_angle: angle_of(to),
            clockwise,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use bracket_core::drawing::PolylineVertex;
    use bracket_core::profile::SegmentKind;

    use super::*;

    #[test]
    fn closed_polyline_and_circle_become_loops() {
        let mut drawing = Drawing::new();
        drawing.add_polyline(
            [
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            true,
            "0",
        );
        drawing.add_circle(Point2::new(0.5, 0.5), 0.2, "0");

        let out = decompose(&drawing, ArcTessellation::default());
        assert!(out.segments.is_empty());
        assert_eq!(out.loops.len(), 2);
        assert!((out.loops[0].area() - 1.0).abs() < 1e-12);
        assert!((out.loops[1].area() - PI * 0.04).abs() < 1e-3);
        assert!(out.loops[1].start().distance(Point2::new(0.7, 0.5)) < 1e-12);
    }

    #[test]
    fn open_entities_become_segments_in_file_order() {
        let mut drawing = Drawing::new();
        drawing.add_arc(Point2::new(0.0, 0.0), 2.0, 0.0, 90.0, "0");
        drawing.add_line(Point2::new(5.0, 5.0), Point2::new(6.0, 5.0), "0");
        drawing.add_polyline(
            [
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
            ],
            false,
            "0",
        );

        let out = decompose(&drawing, ArcTessellation::default());
        assert!(out.loops.is_empty());
        assert_eq!(out.segments.len(), 4);

        let arc = out.segments[0];
        assert!(arc.is_arc());
        assert!((arc.start.x() - 2.0).abs() < 1e-12 && arc.start.y().abs() < 1e-12);
        assert!(arc.end.x().abs() < 1e-12 && (arc.end.y() - 2.0).abs() < 1e-12);
        assert_eq!(out.segments[1].start, Point2::new(5.0, 5.0));
        assert_eq!(out.segments[3].end, Point2::new(1.0, 1.0));
    }

    #[test]
    fn two_vertex_closed_polyline_is_degenerate() {
        let mut drawing = Drawing::new();
        drawing.add_polyline([Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)], true, "0");
        drawing.add_circle(Point2::new(0.0, 0.0), 0.0, "0");

        let out = decompose(&drawing, ArcTessellation::default());
        assert!(out.loops.is_empty());
        assert_eq!(out.degenerate_loops, 2);
    }

    #[test]
    fn bulged_closed_polyline_is_a_disc() {
        // 两个 bulge = 1 的半圆组成整圆
        let mut drawing = Drawing::new();
        drawing.add_polyline_with_vertices(
            [
                PolylineVertex::with_bulge(Point2::new(-1.0, 0.0), 1.0),
                PolylineVertex::with_bulge(Point2::new(1.0, 0.0), 1.0),
            ],
            true,
            "0",
        );
        let out = decompose(&drawing, ArcTessellation::default());
        assert_eq!(out.loops.len(), 1);
        assert!((out.loops[0].area() - PI).abs() < 1e-2);
        assert!(out.loops[0].is_counter_clockwise());
    }

    #[test]
    fn negative_bulge_segment_is_stored_counter_clockwise() {
        let mut drawing = Drawing::new();
        drawing.add_polyline_with_vertices(
            [
                PolylineVertex::with_bulge(Point2::new(0.0, 0.0), -1.0),
                PolylineVertex::new(Point2::new(2.0, 0.0)),
            ],
            false,
            "0",
        );
        let out = decompose(&drawing, ArcTessellation::default());
        assert_eq!(out.segments.len(), 1);
        let segment = out.segments[0];
        match segment.kind {
            SegmentKind::Arc { center, radius, .. } => {
                assert!((center.x() - 1.0).abs() < 1e-12 && center.y().abs() < 1e-12);
                assert!((radius - 1.0).abs() < 1e-12);
            }
            SegmentKind::Line => panic!("expected arc segment"),
        }
        // 顺时针半圆从 (0,0) 经 (1,1) 到 (2,0)，逆时针存放时起点为 (2,0)
        assert!((segment.start.x() - 2.0).abs() < 1e-9);
        assert!(segment.end.x().abs() < 1e-9);
    }
}
