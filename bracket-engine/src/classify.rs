use bracket_core::profile::{ClassifiedGeometry, Loop};
use tracing::debug;

/// 外轮廓与孔的判定方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationStrategy {
    /// 面积最大的轮廓为外轮廓，其余一律视为孔，不做包含判断。
    ///
    /// 前提：图纸只描述一个零件外形及其内部开孔。两个互不包含的区域会被
    /// 错判为“外轮廓 + 孔”。
    #[default]
    LargestArea,
    /// 按点包含关系构建嵌套树：偶数层为外轮廓，奇数层为其父轮廓的孔。
    Containment,
}

/// 对全部轮廓分类。没有轮廓时返回空列表。
pub fn classify_loops(loops: Vec<Loop>, strategy: ClassificationStrategy) -> Vec<ClassifiedGeometry> {
    match strategy {
        ClassificationStrategy::LargestArea => classify_by_area(loops).into_iter().collect(),
        ClassificationStrategy::Containment => classify_by_containment(loops),
    }
}

/// 按面积降序稳定排序：最大者（并列时先发现者）为外轮廓，其余依次成为孔。
pub fn classify_by_area(mut loops: Vec<Loop>) -> Option<ClassifiedGeometry> {
    if loops.is_empty() {
        return None;
    }
    loops.sort_by(|a, b| b.area().total_cmp(&a.area()));
    let boundary = loops.remove(0);
    debug!(area = boundary.area(), holes = loops.len(), "按面积选出外轮廓");
    Some(ClassifiedGeometry::new(boundary, loops))
}

/// 以包含关系分类，可得到多个互不相交的零件区域。
pub fn classify_by_containment(loops: Vec<Loop>) -> Vec<ClassifiedGeometry> {
    let parents: Vec<Option<usize>> = (0..loops.len())
        .map(|idx| immediate_parent(&loops, idx))
        .collect();
    let depths: Vec<usize> = (0..loops.len())
        .map(|idx| {
            let mut depth = 0;
            let mut current = parents[idx];
            while let Some(parent) = current {
                depth += 1;
                current = parents[parent];
            }
            depth
        })
        .collect();

    let mut slots: Vec<Option<Loop>> = loops.into_iter().map(Some).collect();
    let mut boundaries: Vec<(usize, ClassifiedGeometry)> = Vec::new();
    for idx in 0..slots.len() {
        if depths[idx] % 2 == 0 {
            if let Some(lp) = slots[idx].take() {
                boundaries.push((idx, ClassifiedGeometry::new(lp, Vec::new())));
            }
        }
    }
    for idx in 0..slots.len() {
        if depths[idx] % 2 == 1 {
            let owner = parents[idx].and_then(|parent| {
                boundaries.iter_mut().find(|(boundary_idx, _)| *boundary_idx == parent)
            });
            if let (Some((_, geometry)), Some(lp)) = (owner, slots[idx].take()) {
                geometry.holes.push(lp);
            }
        }
    }

    debug!(regions = boundaries.len(), "按包含关系完成分类");
    boundaries.into_iter().map(|(_, geometry)| geometry).collect()
}

/// 包含该轮廓的最小轮廓。以环上首点作为代表点，只有面积严格更大的轮廓才可能是父级。
fn immediate_parent(loops: &[Loop], idx: usize) -> Option<usize> {
    let child = &loops[idx];
    let probe = child.ring()[0];
    loops
        .iter()
        .enumerate()
        .filter(|(other, candidate)| {
            *other != idx && candidate.area() > child.area() && candidate.contains_point(probe)
        })
        .min_by(|(_, a), (_, b)| a.area().total_cmp(&b.area()))
        .map(|(other, _)| other)
}

#[cfg(test)]
mod tests {
    use bracket_core::geometry::Point2;
    use bracket_core::profile::{ArcTessellation, LoopBuilder};

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Loop {
        let mut builder = LoopBuilder::new(Point2::new(x, y));
        builder.line_to(Point2::new(x + size, y));
        builder.line_to(Point2::new(x + size, y + size));
        builder.line_to(Point2::new(x, y + size));
        builder.close(ArcTessellation::default()).expect("square")
    }

    #[test]
    fn largest_area_becomes_boundary_regardless_of_order() {
        let loops = vec![square(3.0, 3.0, 2.0), square(0.0, 0.0, 10.0)];
        let geometry = classify_by_area(loops).expect("geometry");
        assert!((geometry.boundary.area() - 100.0).abs() < 1e-9);
        assert_eq!(geometry.holes.len(), 1);
        assert!((geometry.holes[0].area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn holes_follow_descending_area() {
        let loops = vec![
            square(1.0, 1.0, 1.0),
            square(0.0, 0.0, 10.0),
            square(5.0, 5.0, 3.0),
            square(2.0, 6.0, 2.0),
        ];
        let geometry = classify_by_area(loops).expect("geometry");
        let areas: Vec<f64> = geometry.holes.iter().map(Loop::area).collect();
        assert_eq!(areas.len(), 3);
        assert!((areas[0] - 9.0).abs() < 1e-9);
        assert!((areas[1] - 4.0).abs() < 1e-9);
        assert!((areas[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn equal_area_holes_keep_discovery_order() {
        let first = square(1.0, 1.0, 1.0);
        let second = square(3.0, 3.0, 1.0);
        let loops = vec![first.clone(), square(0.0, 0.0, 10.0), second.clone()];
        let geometry = classify_by_area(loops).expect("geometry");
        assert_eq!(geometry.holes, vec![first, second]);
    }

    #[test]
    fn equal_areas_pick_first_discovered() {
        let first = square(0.0, 0.0, 2.0);
        let second = square(10.0, 0.0, 2.0);
        let geometry = classify_by_area(vec![first.clone(), second]).expect("geometry");
        assert_eq!(geometry.boundary, first);
    }

    #[test]
    fn disjoint_regions_are_misread_as_boundary_and_hole() {
        // 面积分类不检查包含关系：较小的独立区域被当作孔
        let loops = vec![square(0.0, 0.0, 4.0), square(10.0, 0.0, 3.0)];
        let geometry = classify_by_area(loops).expect("geometry");
        assert!((geometry.boundary.area() - 16.0).abs() < 1e-9);
        assert_eq!(geometry.holes.len(), 1);
        assert!((geometry.holes[0].area() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn no_loops_yields_no_geometry() {
        assert!(classify_by_area(Vec::new()).is_none());
        assert!(classify_loops(Vec::new(), ClassificationStrategy::Containment).is_empty());
    }

    #[test]
    fn containment_separates_disjoint_regions() {
        let loops = vec![
            square(0.0, 0.0, 4.0),
            square(10.0, 0.0, 3.0),
            square(1.0, 1.0, 1.0),
            square(11.0, 1.0, 1.0),
        ];
        let regions = classify_loops(loops, ClassificationStrategy::Containment);
        assert_eq!(regions.len(), 2);
        assert!((regions[0].boundary.area() - 16.0).abs() < 1e-9);
        assert_eq!(regions[0].holes.len(), 1);
        assert!((regions[1].boundary.area() - 9.0).abs() < 1e-9);
        assert_eq!(regions[1].holes.len(), 1);
    }

    #[test]
    fn containment_treats_island_inside_hole_as_new_region() {
        let loops = vec![
            square(0.0, 0.0, 10.0),
            square(2.0, 2.0, 6.0),
            square(4.0, 4.0, 2.0),
        ];
        let regions = classify_loops(loops, ClassificationStrategy::Containment);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].holes.len(), 1);
        assert!((regions[0].footprint_area() - 64.0).abs() < 1e-9);
        assert!((regions[1].boundary.area() - 4.0).abs() < 1e-9);
        assert!(regions[1].holes.is_empty());
    }
}
