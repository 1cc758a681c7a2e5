pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，坐标单位与图纸源文件一致。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        /// 以 `center` 为圆心、`radius` 为半径，取极角 `angle`（弧度）处的点。
        #[inline]
        pub fn on_circle(center: Point2, radius: f64, angle: f64) -> Self {
            center.translate(Vector2::new(radius * angle.cos(), radius * angle.sin()))
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 三维点，挤出实体的网格顶点使用。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn translate(self, offset: Vector3) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 三维向量，用于网格法向与平移。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn dot(self, other: Vector3) -> f64 {
            self.0.dot(other.0)
        }

        #[inline]
        pub fn cross(self, other: Vector3) -> Vector3 {
            Self(self.0.cross(other.0))
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算图元/轮廓范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }

    /// 三维轴对齐边界框。挤出实体据此回到局部原点。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds3D {
        min: Point3,
        max: Point3,
    }

    impl Bounds3D {
        #[inline]
        pub fn new(min: Point3, max: Point3) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
                max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y() || self.min.z() > self.max.z()
        }

        #[inline]
        pub fn min(&self) -> Point3 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point3 {
            self.max
        }

        pub fn include_point(&mut self, point: Point3) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            self.min = Point3::from(self.min.as_vec3().min(point.as_vec3()));
            self.max = Point3::from(self.max.as_vec3().max(point.as_vec3()));
        }

        /// 各轴跨度 (dx, dy, dz)。
        #[inline]
        pub fn size(&self) -> Vector3 {
            Vector3(self.max.as_vec3() - self.min.as_vec3())
        }

        #[inline]
        pub fn center(&self) -> Point3 {
            debug_assert!(!self.is_empty());
            Point3::from((self.min.as_vec3() + self.max.as_vec3()) * 0.5)
        }
    }
}

pub mod drawing {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2};

    /// 图纸中解码出的原始图元。仅支持四类，其余类型在解码阶段被跳过。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum RawEntity {
        Polyline(Polyline),
        Circle(Circle),
        Line(Line),
        Arc(Arc),
    }

    impl RawEntity {
        #[inline]
        pub fn kind(&self) -> &'static str {
            match self {
                RawEntity::Polyline(_) => "Polyline",
                RawEntity::Circle(_) => "Circle",
                RawEntity::Line(_) => "Line",
                RawEntity::Arc(_) => "Arc",
            }
        }

        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                RawEntity::Polyline(polyline) => &polyline.layer,
                RawEntity::Circle(circle) => &circle.layer,
                RawEntity::Line(line) => &line.layer,
                RawEntity::Arc(arc) => &arc.layer,
            }
        }

        /// 计算图元的 2D 轴对齐范围。多段线的 bulge 弧段只计入端点。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                RawEntity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                RawEntity::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                RawEntity::Arc(arc) => arc_bounds(arc, &mut bounds),
                RawEntity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(vertex.position);
                    }
                }
            }
            if bounds.is_empty() {
                None
            } else {
                Some(bounds)
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧实体。角度以度为单位保存（与 DXF 组码 50/51 一致），自起始角逆时针扫到终止角。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    impl Arc {
        #[inline]
        pub fn start_radians(&self) -> f64 {
            self.start_angle.to_radians()
        }

        #[inline]
        pub fn end_radians(&self) -> f64 {
            self.end_angle.to_radians()
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub layer: String,
    }

    /// 多段线顶点。`bulge` 描述到下一个顶点的弧段：0 为直线，正值逆时针。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    /// 一次解码的结果：按文件顺序排列的图元，以及被跳过的图元数量。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Drawing {
        entities: Vec<RawEntity>,
        #[serde(default)]
        skipped_entities: usize,
    }

    impl Drawing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_entity(&mut self, entity: RawEntity) {
            self.entities.push(entity);
        }

        pub fn add_line(&mut self, start: Point2, end: Point2, layer: impl Into<String>) {
            self.add_entity(RawEntity::Line(Line {
                start,
                end,
                layer: layer.into(),
            }));
        }

        pub fn add_circle(&mut self, center: Point2, radius: f64, layer: impl Into<String>) {
            self.add_entity(RawEntity::Circle(Circle {
                center,
                radius,
                layer: layer.into(),
            }));
        }

        /// 角度以度为单位。
        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) {
            self.add_entity(RawEntity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                layer: layer.into(),
            }));
        }

        pub fn add_polyline<I>(&mut self, points: I, is_closed: bool, layer: impl Into<String>)
        where
            I: IntoIterator<Item = Point2>,
        {
            self.add_polyline_with_vertices(
                points.into_iter().map(PolylineVertex::new),
                is_closed,
                layer,
            );
        }

        pub fn add_polyline_with_vertices<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) where
            I: IntoIterator<Item = PolylineVertex>,
        {
            self.add_entity(RawEntity::Polyline(Polyline {
                vertices: vertices.into_iter().collect(),
                is_closed,
                layer: layer.into(),
            }));
        }

        /// 记录一个未支持而被跳过的图元。
        #[inline]
        pub fn record_skipped(&mut self) {
            self.skipped_entities += 1;
        }

        #[inline]
        pub fn skipped_entities(&self) -> usize {
            self.skipped_entities
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &RawEntity> {
            self.entities.iter()
        }

        #[inline]
        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for entity in &self.entities {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }
    }

    fn normalize_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        result
    }

    fn canonical_interval(start: f64, end: f64) -> (f64, f64) {
        let start = normalize_angle(start);
        let mut end = normalize_angle(end);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        (start, end)
    }

    fn arc_bounds(arc: &Arc, bounds: &mut Bounds2D) {
        let radius = arc.radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(arc.center);
            return;
        }

        let (start, end) = canonical_interval(arc.start_radians(), arc.end_radians());
        bounds.include_point(Point2::on_circle(arc.center, radius, start));
        bounds.include_point(Point2::on_circle(arc.center, radius, end));

        const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += TAU;
            }
            if candidate <= end {
                bounds.include_point(Point2::on_circle(arc.center, radius, candidate));
            }
        }
    }
}

pub mod profile {
    use std::f64::consts::TAU;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2};

    /// 相邻点小于该距离时视为同一点（仅用于细分去重，与拼接阈值无关）。
    pub const POINT_EPSILON: f64 = 1e-9;
    pub const DEFAULT_ARC_SEGMENTS_PER_TURN: usize = 64;

    /// 圆弧细分精度：整圆被切分的段数，较短圆弧按扫掠角等比例缩减。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ArcTessellation {
        pub segments_per_turn: usize,
    }

    impl ArcTessellation {
        #[inline]
        pub fn new(segments_per_turn: usize) -> Self {
            Self {
                segments_per_turn: segments_per_turn.max(8),
            }
        }

        /// 给定扫掠角（弧度，可为负）所需的细分步数，至少 2 步。
        pub fn steps_for(&self, sweep: f64) -> usize {
            let fraction = sweep.abs() / TAU;
            let steps = (fraction * self.segments_per_turn as f64).ceil();
            if steps.is_finite() {
                (steps as usize).max(2)
            } else {
                2
            }
        }
    }

    impl Default for ArcTessellation {
        fn default() -> Self {
            Self::new(DEFAULT_ARC_SEGMENTS_PER_TURN)
        }
    }

    /// 计算从 `start` 到 `end` 的扫掠角。两角重合视为整圆；顺时针时结果为负。
    pub fn arc_sweep(start: f64, end: f64, clockwise: bool) -> f64 {
        let mut delta = (end - start).rem_euclid(TAU);
        if delta < 1e-9 {
            delta = TAU;
        }
        if clockwise {
            if delta >= TAU { -TAU } else { delta - TAU }
        } else {
            delta
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub enum SegmentKind {
        Line,
        /// 圆弧段，角度为弧度，自 `start_angle` 逆时针到 `end_angle`。
        Arc {
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
        },
    }

    /// 待拼接的开放图段，带有明确的起点与终点。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Segment {
        pub start: Point2,
        pub end: Point2,
        pub kind: SegmentKind,
    }

    impl Segment {
        #[inline]
        pub fn line(start: Point2, end: Point2) -> Self {
            Self {
                start,
                end,
                kind: SegmentKind::Line,
            }
        }

        /// 由圆心、半径与弧度角构造圆弧段，端点按角度计算。
        pub fn arc(center: Point2, radius: f64, start_angle: f64, end_angle: f64) -> Self {
            Self {
                start: Point2::on_circle(center, radius, start_angle),
                end: Point2::on_circle(center, radius, end_angle),
                kind: SegmentKind::Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                },
            }
        }

        #[inline]
        pub fn is_arc(&self) -> bool {
            matches!(self.kind, SegmentKind::Arc { .. })
        }
    }

    /// 轮廓中的绘制指令。保留原始曲线，供渲染层重新细分。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub enum PathCommand {
        LineTo(Point2),
        ArcTo {
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            clockwise: bool,
        },
    }

    impl PathCommand {
        pub fn end_point(&self) -> Point2 {
            match *self {
                PathCommand::LineTo(point) => point,
                PathCommand::ArcTo {
                    center,
                    radius,
                    end_angle,
                    ..
                } => Point2::on_circle(center, radius, end_angle),
            }
        }
    }

    /// 构造中的开放轮廓。调用 [`LoopBuilder::close`] 后得到不可变的 [`Loop`]。
    #[derive(Debug, Clone)]
    pub struct LoopBuilder {
        start: Point2,
        cursor: Point2,
        commands: Vec<PathCommand>,
    }

    impl LoopBuilder {
        pub fn new(start: Point2) -> Self {
            Self {
                start,
                cursor: start,
                commands: Vec::new(),
            }
        }

        #[inline]
        pub fn start(&self) -> Point2 {
            self.start
        }

        #[inline]
        pub fn cursor(&self) -> Point2 {
            self.cursor
        }

        pub fn line_to(&mut self, point: Point2) {
            self.commands.push(PathCommand::LineTo(point));
            self.cursor = point;
        }

        pub fn arc_to(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            clockwise: bool,
        ) {
            let command = PathCommand::ArcTo {
                center,
                radius,
                start_angle,
                end_angle,
                clockwise,
            };
            self.cursor = command.end_point();
            self.commands.push(command);
        }

        /// 闭合轮廓并细分。若细分后的不同点少于 3 个，返回 `None`。
        pub fn close(mut self, tessellation: ArcTessellation) -> Option<Loop> {
            if self.cursor.distance(self.start) > POINT_EPSILON {
                let start = self.start;
                self.line_to(start);
            }

            let mut points = vec![self.start];
            for command in &self.commands {
                match *command {
                    PathCommand::LineTo(point) => push_distinct(&mut points, point),
                    PathCommand::ArcTo {
                        center,
                        radius,
                        start_angle,
                        end_angle,
                        clockwise,
                    } => {
                        let sweep = arc_sweep(start_angle, end_angle, clockwise);
                        let steps = tessellation.steps_for(sweep);
                        for i in 0..=steps {
                            let angle = start_angle + sweep * (i as f64 / steps as f64);
                            push_distinct(&mut points, Point2::on_circle(center, radius, angle));
                        }
                    }
                }
            }

            // 首尾重合时以起点精确收尾。
            let first = points[0];
            match points.last().copied() {
                Some(last) if points.len() > 1 && last.distance(first) <= POINT_EPSILON => {
                    let idx = points.len() - 1;
                    points[idx] = first;
                }
                _ => points.push(first),
            }

            if points.iter().any(|p| !p.x().is_finite() || !p.y().is_finite()) {
                return None;
            }
            if distinct_point_count(&points[..points.len() - 1]) < 3 {
                return None;
            }

            let area = shoelace_area(&points[..points.len() - 1]);
            Some(Loop {
                start: self.start,
                commands: self.commands,
                points,
                area,
            })
        }
    }

    fn push_distinct(points: &mut Vec<Point2>, point: Point2) {
        match points.last() {
            Some(last) if last.distance(point) <= POINT_EPSILON => {}
            _ => points.push(point),
        }
    }

    /// 闭合轮廓。`points` 为细分后的点列，首尾两点相同。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Loop {
        start: Point2,
        commands: Vec<PathCommand>,
        points: Vec<Point2>,
        area: f64,
    }

    impl Loop {
        #[inline]
        pub fn start(&self) -> Point2 {
            self.start
        }

        #[inline]
        pub fn commands(&self) -> &[PathCommand] {
            &self.commands
        }

        /// 闭合点列（末点与首点相同）。
        #[inline]
        pub fn points(&self) -> &[Point2] {
            &self.points
        }

        /// 去掉重复末点后的环。
        #[inline]
        pub fn ring(&self) -> &[Point2] {
            &self.points[..self.points.len() - 1]
        }

        #[inline]
        pub fn point_count(&self) -> usize {
            self.points.len() - 1
        }

        #[inline]
        pub fn signed_area(&self) -> f64 {
            self.area
        }

        /// 无符号面积（鞋带公式）。
        #[inline]
        pub fn area(&self) -> f64 {
            self.area.abs()
        }

        #[inline]
        pub fn is_counter_clockwise(&self) -> bool {
            self.signed_area() > 0.0
        }

        pub fn bounds(&self) -> Bounds2D {
            let mut bounds = Bounds2D::empty();
            for point in self.ring() {
                bounds.include_point(*point);
            }
            bounds
        }

        /// 偶奇规则的点包含测试。边界上的点结果不确定。
        pub fn contains_point(&self, point: Point2) -> bool {
            let ring = self.ring();
            let mut inside = false;
            let mut j = ring.len() - 1;
            for i in 0..ring.len() {
                let (pi, pj) = (ring[i], ring[j]);
                if (pi.y() > point.y()) != (pj.y() > point.y()) {
                    let t = (point.y() - pi.y()) / (pj.y() - pi.y());
                    let x = pi.x() + t * (pj.x() - pi.x());
                    if point.x() < x {
                        inside = !inside;
                    }
                }
                j = i;
            }
            inside
        }
    }

    /// 环上互不重合（距离大于 `POINT_EPSILON`）的点数。
    pub fn distinct_point_count(ring: &[Point2]) -> usize {
        let mut distinct: Vec<Point2> = Vec::with_capacity(ring.len());
        for point in ring {
            if !distinct.iter().any(|seen| seen.distance(*point) <= POINT_EPSILON) {
                distinct.push(*point);
            }
        }
        distinct.len()
    }

    /// 鞋带公式，逆时针为正。`ring` 不含重复末点。
    pub fn shoelace_area(ring: &[Point2]) -> f64 {
        if ring.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..ring.len() {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];
            sum += a.x() * b.y() - b.x() * a.y();
        }
        sum * 0.5
    }

    /// 分类结果：一个外轮廓与若干孔。孔之间的顺序没有几何含义。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ClassifiedGeometry {
        pub boundary: Loop,
        pub holes: Vec<Loop>,
    }

    impl ClassifiedGeometry {
        pub fn new(boundary: Loop, holes: Vec<Loop>) -> Self {
            Self { boundary, holes }
        }

        /// 外轮廓面积减去所有孔面积。
        pub fn footprint_area(&self) -> f64 {
            self.boundary.area() - self.holes.iter().map(Loop::area).sum::<f64>()
        }
    }

    /// 边缘倒角参数，默认值与挤出外观调校一致。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct BevelConfig {
        pub enabled: bool,
        pub thickness: f64,
        pub size: f64,
        pub offset: f64,
        pub segments: u32,
    }

    impl BevelConfig {
        pub fn disabled() -> Self {
            Self {
                enabled: false,
                ..Self::default()
            }
        }

        /// 实际参与挤出的倒角层数；未启用或参数无效时为 0。
        pub fn effective_segments(&self) -> u32 {
            if self.enabled && self.segments > 0 {
                self.segments
            } else {
                0
            }
        }
    }

    impl Default for BevelConfig {
        fn default() -> Self {
            Self {
                enabled: true,
                thickness: 0.05,
                size: 0.05,
                offset: 0.0,
                segments: 3,
            }
        }
    }

    /// 挤出输入：外轮廓 + 孔 + 厚度 + 倒角。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ExtrusionSpec {
        pub boundary: Loop,
        pub holes: Vec<Loop>,
        pub thickness: f64,
        pub bevel: BevelConfig,
    }

    impl ExtrusionSpec {
        pub fn new(geometry: ClassifiedGeometry, thickness: f64, bevel: BevelConfig) -> Self {
            Self {
                boundary: geometry.boundary,
                holes: geometry.holes,
                thickness,
                bevel,
            }
        }
    }
}

pub mod solid {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds3D, Point3, Vector3};

    /// 索引三角网格。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Mesh {
        positions: Vec<Point3>,
        indices: Vec<u32>,
    }

    impl Mesh {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_capacity(vertices: usize, indices: usize) -> Self {
            Self {
                positions: Vec::with_capacity(vertices),
                indices: Vec::with_capacity(indices),
            }
        }

        /// 追加顶点并返回其索引。
        #[inline]
        pub fn add_vertex(&mut self, position: Point3) -> u32 {
            self.positions.push(position);
            (self.positions.len() - 1) as u32
        }

        #[inline]
        pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
            self.indices.extend_from_slice(&[a, b, c]);
        }

        #[inline]
        pub fn vertex_count(&self) -> usize {
            self.positions.len()
        }

        #[inline]
        pub fn triangle_count(&self) -> usize {
            self.indices.len() / 3
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.indices.is_empty()
        }

        #[inline]
        pub fn positions(&self) -> &[Point3] {
            &self.positions
        }

        #[inline]
        pub fn indices(&self) -> &[u32] {
            &self.indices
        }

        pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
            self.indices.chunks_exact(3).map(|tri| {
                [
                    self.positions[tri[0] as usize],
                    self.positions[tri[1] as usize],
                    self.positions[tri[2] as usize],
                ]
            })
        }

        /// 三角形法向（右手定则，未归一化）。退化三角形返回 `None`。
        pub fn face_normal(triangle: &[Point3; 3]) -> Option<Vector3> {
            let [a, b, c] = triangle.map(Point3::as_vec3);
            let normal = Vector3((b - a).cross(c - a));
            if normal.length_squared() <= f64::EPSILON * f64::EPSILON {
                None
            } else {
                Some(normal)
            }
        }

        pub fn bounds(&self) -> Option<Bounds3D> {
            if self.positions.is_empty() {
                return None;
            }
            let mut bounds = Bounds3D::empty();
            for position in &self.positions {
                bounds.include_point(*position);
            }
            Some(bounds)
        }

        pub fn translate(&mut self, offset: Vector3) {
            for position in &mut self.positions {
                *position = position.translate(offset);
            }
        }

        /// 有向体积（散度定理）。闭合且法向朝外的网格为正。
        pub fn volume(&self) -> f64 {
            self.triangles()
                .map(|[a, b, c]| a.as_vec3().dot(b.as_vec3().cross(c.as_vec3())))
                .sum::<f64>()
                / 6.0
        }
    }

    /// 挤出得到的实体，已平移到以自身包围盒中心为原点。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Solid {
        mesh: Mesh,
        bounds: Bounds3D,
        offset: Vector3,
        footprint_area: f64,
        thickness: f64,
    }

    impl Solid {
        /// 以包围盒中心回到原点。空网格返回 `None`。
        pub fn centered(mut mesh: Mesh, footprint_area: f64, thickness: f64) -> Option<Self> {
            let center = mesh.bounds()?.center();
            let offset = Vector3(-center.as_vec3());
            mesh.translate(offset);
            let bounds = mesh.bounds()?;
            Some(Self {
                mesh,
                bounds,
                offset,
                footprint_area,
                thickness,
            })
        }

        #[inline]
        pub fn mesh(&self) -> &Mesh {
            &self.mesh
        }

        #[inline]
        pub fn bounds(&self) -> Bounds3D {
            self.bounds
        }

        /// 回中时施加的平移量（原包围盒中心的相反数）。
        #[inline]
        pub fn offset(&self) -> Vector3 {
            self.offset
        }

        #[inline]
        pub fn footprint_area(&self) -> f64 {
            self.footprint_area
        }

        #[inline]
        pub fn thickness(&self) -> f64 {
            self.thickness
        }

        /// 沿挤出方向（Z）的总深度，包含倒角。
        #[inline]
        pub fn depth(&self) -> f64 {
            self.bounds.size().as_vec3().z
        }
    }
}
