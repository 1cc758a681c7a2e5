use bracket_core::geometry::Point2;
use bracket_core::profile::{ArcTessellation, Loop, LoopBuilder, Segment, SegmentKind};
use tracing::{debug, trace};

/// 端点相邻判定的默认阈值（源文件单位），严格小于才算相连。
pub const DEFAULT_ADJACENCY_THRESHOLD: f64 = 0.05;

/// 内层扫描遇到多个候选时的选取方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    /// 按索引顺序取第一个落在阈值内的图段。
    #[default]
    FirstInIndexOrder,
    /// 取端点距离最近的图段，距离相同时取索引小者。
    Nearest,
}

#[derive(Debug, Clone, Default)]
pub struct StitchOutcome {
    pub loops: Vec<Loop>,
    /// 与输入图段一一对应的消耗标记。拼接结束后全部为 `true`。
    pub consumed: Vec<bool>,
    /// 未能吸收任何图段、被直接丢弃的种子数量。
    pub isolated_segments: usize,
    /// 闭合后不足三个不同点、被丢弃的轮廓数量。
    pub degenerate_loops: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stitcher {
    threshold: f64,
    strategy: MatchStrategy,
    tessellation: ArcTessellation,
}

#[derive(Debug, Clone, Copy)]
enum Orientation {
    Forward,
    Reversed,
}

impl Stitcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            strategy: MatchStrategy::default(),
            tessellation: ArcTessellation::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_tessellation(mut self, tessellation: ArcTessellation) -> Self {
        self.tessellation = tessellation;
        self
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[inline]
    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// 按端点相邻关系把开放图段拼成闭合轮廓。
    ///
    /// 每轮以索引最小的未消耗图段为种子，从其起点出发反复扫描（种子自身也参与扫描），
    /// 每吸收一个图段就从头重新扫描，直到一整轮没有匹配为止，然后连回种子起点闭合。
    pub fn stitch(&self, segments: &[Segment]) -> StitchOutcome {
        let mut outcome = StitchOutcome {
            consumed: vec![false; segments.len()],
            ..StitchOutcome::default()
        };

        while let Some(seed) = outcome.consumed.iter().position(|used| !used) {
            let origin = segments[seed].start;
            let mut builder = LoopBuilder::new(origin);
            let mut absorbed = 0usize;

            while let Some((idx, orientation)) =
                self.find_match(segments, &outcome.consumed, builder.cursor())
            {
                append_segment(&mut builder, &segments[idx], orientation);
                outcome.consumed[idx] = true;
                absorbed += 1;
                trace!(seed, segment = idx, ?orientation, "吸收图段");
            }

            if absorbed == 0 {
                outcome.consumed[seed] = true;
                outcome.isolated_segments += 1;
                debug!(seed, "种子图段无法匹配，已丢弃");
                continue;
            }

            match builder.close(self.tessellation) {
                Some(lp) => outcome.loops.push(lp),
                None => {
                    outcome.degenerate_loops += 1;
                    debug!(seed, absorbed, "拼接结果不足三个不同点，已丢弃");
                }
            }
        }

        outcome
    }

    fn find_match(
        &self,
        segments: &[Segment],
        consumed: &[bool],
        cursor: Point2,
    ) -> Option<(usize, Orientation)> {
        let candidates = segments
            .iter()
            .enumerate()
            .filter(|(idx, _)| !consumed[*idx])
            .filter_map(|(idx, segment)| {
                let to_start = segment.start.distance(cursor);
                let to_end = segment.end.distance(cursor);
                if to_start < self.threshold {
                    Some((idx, Orientation::Forward, to_start))
                } else if to_end < self.threshold {
                    Some((idx, Orientation::Reversed, to_end))
                } else {
                    None
                }
            });

        match self.strategy {
            MatchStrategy::FirstInIndexOrder => candidates
                .map(|(idx, orientation, _)| (idx, orientation))
                .next(),
            MatchStrategy::Nearest => {
                let mut best: Option<(usize, Orientation, f64)> = None;
                for (idx, orientation, distance) in candidates {
                    if best.is_none_or(|(_, _, d)| distance < d) {
                        best = Some((idx, orientation, distance));
                    }
                }
                best.map(|(idx, orientation, _)| (idx, orientation))
            }
        }
    }
}

impl Default for Stitcher {
    fn default() -> Self {
        Self::new(DEFAULT_ADJACENCY_THRESHOLD)
    }
}

fn append_segment(builder: &mut LoopBuilder, segment: &Segment, orientation: Orientation) {
    match (segment.kind, orientation) {
        (SegmentKind::Line, Orientation::Forward) => builder.line_to(segment.end),
        (SegmentKind::Line, Orientation::Reversed) => builder.line_to(segment.start),
        (
            SegmentKind::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            },
            Orientation::Forward,
        ) => builder.arc_to(center, radius, start_angle, end_angle, false),
        (
            SegmentKind::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            },
            Orientation::Reversed,
        ) => builder.arc_to(center, radius, end_angle, start_angle, true),
    }
}

/// 使用默认策略拼接。
pub fn stitch_segments(segments: &[Segment], threshold: f64) -> StitchOutcome {
    Stitcher::new(threshold).stitch(segments)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use bracket_core::profile::PathCommand;

    use super::*;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
        Segment::line(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    fn square_with_gap(gap: f64) -> Vec<Segment> {
        vec![
            line(0.0, 0.0, 1.0, 0.0),
            line(1.0, 0.0, 1.0, 1.0),
            line(1.0, 1.0, 0.0, 1.0),
            line(0.0, 1.0 + gap, 0.0, 0.0),
        ]
    }

    #[test]
    fn scrambled_square_stitches_into_one_loop() {
        // 顺序打乱且部分方向相反
        let segments = vec![
            line(1.0, 1.0, 0.0, 1.0),
            line(0.0, 0.0, 1.0, 0.0),
            line(0.0, 0.0, 0.0, 1.0),
            line(1.0, 1.0, 1.0, 0.0),
        ];
        let outcome = Stitcher::default().stitch(&segments);
        assert_eq!(outcome.loops.len(), 1);
        assert_eq!(outcome.degenerate_loops, 0);
        assert_eq!(outcome.isolated_segments, 0);
        assert!((outcome.loops[0].area() - 1.0).abs() < 1e-12);
        assert!(outcome.consumed.iter().all(|used| *used));
    }

    #[test]
    fn gap_just_below_threshold_is_bridged() {
        let outcome = Stitcher::default().stitch(&square_with_gap(0.05 - 1e-6));
        assert_eq!(outcome.loops.len(), 1);
        assert_eq!(outcome.degenerate_loops, 0);
        assert!((outcome.loops[0].area() - 1.0).abs() < 1e-9);
        assert_eq!(outcome.loops[0].commands().len(), 4);
    }

    #[test]
    fn gap_just_above_threshold_leaves_a_degenerate_remainder() {
        let outcome = Stitcher::default().stitch(&square_with_gap(0.05 + 1e-6));
        assert_eq!(outcome.loops.len(), 1);
        assert_eq!(outcome.degenerate_loops, 1);
        // 前三段连回起点，面积仍为 1
        assert!((outcome.loops[0].area() - 1.0).abs() < 1e-9);
        assert!(outcome.consumed.iter().all(|used| *used));
    }

    #[test]
    fn threshold_comparison_is_strict() {
        let segments = vec![
            line(0.0, 1.0, 0.0, 0.0),
            line(0.05, 0.0, 1.0, 0.0),
            line(1.0, 0.0, 0.0, 1.0),
        ];
        let outcome = Stitcher::default().stitch(&segments);
        // 距离恰为 0.05 不相连：第一段单独成为退化轮廓
        assert_eq!(outcome.degenerate_loops, 1);
        assert_eq!(outcome.loops.len(), 1);
        assert_eq!(outcome.loops[0].start(), Point2::new(0.05, 0.0));
    }

    #[test]
    fn first_match_in_index_order_beats_nearer_candidate() {
        let segments = vec![
            line(0.0, 0.0, 1.0, 0.0),
            line(1.04, 0.0, 1.04, 1.0),
            line(1.0, 0.0, 1.0, 1.0),
        ];
        let outcome = Stitcher::default().stitch(&segments);
        assert_eq!(outcome.loops.len(), 1);
        let commands = outcome.loops[0].commands();
        assert_eq!(commands[0], PathCommand::LineTo(Point2::new(1.0, 0.0)));
        assert_eq!(commands[1], PathCommand::LineTo(Point2::new(1.04, 1.0)));
        assert_eq!(commands[2], PathCommand::LineTo(Point2::new(1.0, 0.0)));
    }

    #[test]
    fn nearest_strategy_prefers_closest_endpoint() {
        let segments = vec![
            line(0.0, 0.0, 1.0, 0.0),
            line(1.04, 0.0, 1.04, 1.0),
            line(1.0, 0.0, 1.0, 1.0),
        ];
        let outcome = Stitcher::default()
            .with_strategy(MatchStrategy::Nearest)
            .stitch(&segments);
        assert_eq!(outcome.loops.len(), 1);
        let commands = outcome.loops[0].commands();
        assert_eq!(commands[1], PathCommand::LineTo(Point2::new(1.0, 1.0)));
        assert_eq!(commands[2], PathCommand::LineTo(Point2::new(1.04, 0.0)));
    }

    #[test]
    fn reversed_arc_is_emitted_clockwise_with_swapped_angles() {
        // 半圆弧逆时针从 (1,0) 到 (-1,0)，再由直线闭合；直线在前，使圆弧以终点匹配
        let arc = Segment::arc(Point2::new(0.0, 0.0), 1.0, 0.0, PI);
        let segments = vec![line(1.0, 0.0, -1.0, 0.0), arc];
        let outcome = Stitcher::default().stitch(&segments);
        assert_eq!(outcome.loops.len(), 1);
        match outcome.loops[0].commands()[1] {
            PathCommand::ArcTo {
                start_angle,
                end_angle,
                clockwise,
                ..
            } => {
                assert!((start_angle - PI).abs() < 1e-12);
                assert!(end_angle.abs() < 1e-12);
                assert!(clockwise);
            }
            other => panic!("expected arc command, got {other:?}"),
        }
        assert!((outcome.loops[0].area() - FRAC_PI_2).abs() < 1e-2);
    }

    #[test]
    fn lone_segment_becomes_degenerate() {
        let outcome = Stitcher::default().stitch(&[line(0.0, 0.0, 5.0, 5.0)]);
        assert!(outcome.loops.is_empty());
        assert_eq!(outcome.degenerate_loops, 1);
        assert_eq!(outcome.consumed, vec![true]);
    }

    #[test]
    fn back_and_forth_segments_do_not_form_a_loop() {
        let segments = vec![
            line(0.0, 0.0, 1.0, 0.0),
            line(1.0, 0.0, 0.0, 0.0),
            line(0.0, 0.0, 1.0, 0.0),
        ];
        let outcome = Stitcher::default().stitch(&segments);
        assert!(outcome.loops.is_empty());
        assert_eq!(outcome.degenerate_loops, 1);
        assert_eq!(outcome.consumed, vec![true, true, true]);
    }

    #[test]
    fn non_finite_seed_is_discarded_as_isolated() {
        let segments = vec![
            line(f64::NAN, 0.0, 1.0, 0.0),
            line(0.0, 0.0, 1.0, 0.0),
            line(1.0, 0.0, 0.0, 1.0),
            line(0.0, 1.0, 0.0, 0.0),
        ];
        let outcome = Stitcher::default().stitch(&segments);
        assert_eq!(outcome.isolated_segments, 1);
        assert_eq!(outcome.loops.len(), 1);
        assert!(outcome.consumed.iter().all(|used| *used));
    }

    #[test]
    fn empty_input_yields_nothing() {
        let outcome = stitch_segments(&[], DEFAULT_ADJACENCY_THRESHOLD);
        assert!(outcome.loops.is_empty());
        assert!(outcome.consumed.is_empty());
    }
}
