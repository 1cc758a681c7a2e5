use std::fs;
use std::path::Path;

use bracket_core::{
    drawing::{Arc, Circle, Drawing, Line, Polyline, PolylineVertex, RawEntity},
    geometry::Point2,
};
use thiserror::Error;

pub mod primitives;

pub use primitives::{Decomposition, decompose};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse drawing: {0}")]
    Parse(String),
}

/// 将原始字节解码为图元列表。字节来源由调用方决定。
pub trait DrawingDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Drawing, IoError>;
}

/// 从本地路径读取并解码图纸。
pub trait DrawingLoader {
    fn load(&self, path: &Path) -> Result<Drawing, IoError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }
}

impl DrawingDecoder for DxfFacade {
    fn decode(&self, bytes: &[u8]) -> Result<Drawing, IoError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|err| IoError::Parse(format!("DXF 不是有效的 UTF-8 文本：{err}")))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let parser = DxfParser::new(text);
        parser.parse().map_err(|err| match err {
            DxfError::Invalid { message } => IoError::Parse(message),
        })
    }
}

impl DrawingLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Drawing, IoError> {
        let data = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode(&data)
    }
}

#[derive(Debug)]
enum DxfError {
    Invalid { message: String },
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Drawing, DxfError> {
        let mut drawing = Drawing::new();
        let mut saw_any = false;
        while let Some((code, value)) = self.reader.next_pair()? {
            saw_any = true;
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "ENTITIES" => self.parse_entities(&mut drawing)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        if !saw_any {
            return Err(DxfError::invalid("DXF 内容为空"));
        }
        Ok(drawing)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, drawing: &mut Drawing) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "LINE" => drawing.add_entity(self.parse_line()?),
                "CIRCLE" => drawing.add_entity(self.parse_circle()?),
                "ARC" => drawing.add_entity(self.parse_arc()?),
                "LWPOLYLINE" => drawing.add_entity(self.parse_lwpolyline()?),
                "POLYLINE" => match self.parse_polyline_entity()? {
                    Some(entity) => drawing.add_entity(entity),
                    None => drawing.record_skipped(),
                },
                _ => {
                    self.skip_entity_body()?;
                    drawing.record_skipped();
                }
            }
        }
        Ok(())
    }

    fn parse_line(&mut self) -> Result<RawEntity, DxfError> {
        let mut layer = None;
        let mut start_x = None;
        let mut start_y = None;
        let mut end_x = None;
        let mut end_y = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut start_x, &value, "LINE 起点 X（组码 10）")?,
                    20 => assign_coord(&mut start_y, &value, "LINE 起点 Y（组码 20）")?,
                    11 => assign_coord(&mut end_x, &value, "LINE 终点 X（组码 11）")?,
                    21 => assign_coord(&mut end_y, &value, "LINE 终点 Y（组码 21）")?,
                    30 | 31 => {} // 忽略 Z 坐标
                    _ => {}
                },
                None => return Err(DxfError::invalid("LINE 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let sx = start_x.ok_or_else(|| DxfError::invalid("LINE 缺少起点 X（组码 10）"))?;
        let sy = start_y.ok_or_else(|| DxfError::invalid("LINE 缺少起点 Y（组码 20）"))?;
        let ex = end_x.ok_or_else(|| DxfError::invalid("LINE 缺少终点 X（组码 11）"))?;
        let ey = end_y.ok_or_else(|| DxfError::invalid("LINE 缺少终点 Y（组码 21）"))?;

        Ok(RawEntity::Line(Line {
            start: Point2::new(sx, sy),
            end: Point2::new(ex, ey),
            layer,
        }))
    }

    fn parse_circle(&mut self) -> Result<RawEntity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut center_x, &value, "CIRCLE 圆心 X（组码 10）")?,
                    20 => assign_coord(&mut center_y, &value, "CIRCLE 圆心 Y（组码 20）")?,
                    40 => assign_coord(&mut radius, &value, "CIRCLE 半径（组码 40）")?,
                    _ => {}
                },
                None => return Err(DxfError::invalid("CIRCLE 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let cx = center_x.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::invalid("CIRCLE 缺少半径（组码 40）"))?;

        Ok(RawEntity::Circle(Circle {
            center: Point2::new(cx, cy),
            radius,
            layer,
        }))
    }

    /// ARC 的角度按文件中的度数原样保存。
    fn parse_arc(&mut self) -> Result<RawEntity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        let mut start_angle = None;
        let mut end_angle = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut center_x, &value, "ARC 圆心 X（组码 10）")?,
                    20 => assign_coord(&mut center_y, &value, "ARC 圆心 Y（组码 20）")?,
                    40 => assign_coord(&mut radius, &value, "ARC 半径（组码 40）")?,
                    50 => assign_coord(&mut start_angle, &value, "ARC 起始角（组码 50）")?,
                    51 => assign_coord(&mut end_angle, &value, "ARC 终止角（组码 51）")?,
                    _ => {}
                },
                None => return Err(DxfError::invalid("ARC 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let cx = center_x.ok_or_else(|| DxfError::invalid("ARC 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("ARC 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::invalid("ARC 缺少半径（组码 40）"))?;
        let start_angle =
            start_angle.ok_or_else(|| DxfError::invalid("ARC 缺少起始角（组码 50）"))?;
        let end_angle = end_angle.ok_or_else(|| DxfError::invalid("ARC 缺少终止角（组码 51）"))?;

        Ok(RawEntity::Arc(Arc {
            center: Point2::new(cx, cy),
            radius,
            start_angle,
            end_angle,
            layer,
        }))
    }

    fn parse_lwpolyline(&mut self) -> Result<RawEntity, DxfError> {
        let mut layer = None;
        let mut is_closed = false;
        let mut vertices: Vec<PolylineVertex> = Vec::new();
        let mut pending_x: Option<f64> = None;
        let mut pending_y: Option<f64> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => {
                        let flag = parse_i32(&value, "LWPOLYLINE 标志")?;
                        is_closed = flag & 0x01 == 0x01;
                    }
                    10 => {
                        let x = parse_f64(&value, "LWPOLYLINE 顶点 X")?;
                        if let Some(y) = pending_y.take() {
                            vertices.push(PolylineVertex::new(Point2::new(x, y)));
                        } else if pending_x.replace(x).is_some() {
                            return Err(DxfError::invalid(
                                "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                            ));
                        }
                    }
                    20 => {
                        let y = parse_f64(&value, "LWPOLYLINE 顶点 Y")?;
                        if let Some(x) = pending_x.take() {
                            vertices.push(PolylineVertex::new(Point2::new(x, y)));
                        } else if pending_y.replace(y).is_some() {
                            return Err(DxfError::invalid(
                                "LWPOLYLINE 顶点缺少对应的 X（组码 10）",
                            ));
                        }
                    }
                    42 => {
                        let bulge = parse_f64(&value, "LWPOLYLINE 顶点 bulge")?;
                        match vertices.last_mut() {
                            Some(vertex) => vertex.bulge = bulge,
                            None => {
                                return Err(DxfError::invalid(
                                    "LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）",
                                ));
                            }
                        }
                    }
                    _ => {}
                },
                None => return Err(DxfError::invalid("LWPOLYLINE 未正确结束")),
            }
        }

        if pending_x.is_some() || pending_y.is_some() {
            return Err(DxfError::invalid(
                "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        Ok(RawEntity::Polyline(Polyline {
            vertices,
            is_closed,
            layer,
        }))
    }

    /// 旧式 POLYLINE/VERTEX/SEQEND 序列。仅接受 2D 多段线；
    /// 3D 多段线、多边形网格与多面网格整体跳过并返回 `None`。
    fn parse_polyline_entity(&mut self) -> Result<Option<RawEntity>, DxfError> {
        let mut layer = None;
        let mut flags: Option<i16> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => flags = Some(parse_i16(&value, "POLYLINE 标志（组码 70）")?),
                    _ => {}
                },
                None => return Err(DxfError::invalid("POLYLINE 未正确结束")),
            }
        }

        let flags = flags.unwrap_or(0);
        if flags & (0x08 | 0x10 | 0x40) != 0 {
            self.skip_polyline_sequence()?;
            return Ok(None);
        }

        let mut vertices = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => vertices.push(self.parse_polyline_vertex()?),
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => {
                    return Err(DxfError::invalid(
                        "POLYLINE 遇到无效的记录，期望 VERTEX/SEQEND",
                    ));
                }
                None => {
                    return Err(DxfError::invalid(
                        "POLYLINE 缺少 SEQEND（组码 0, 值为 SEQEND）",
                    ));
                }
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        Ok(Some(RawEntity::Polyline(Polyline {
            vertices,
            is_closed: flags & 0x01 != 0,
            layer,
        })))
    }

    fn parse_polyline_vertex(&mut self) -> Result<PolylineVertex, DxfError> {
        let mut x = None;
        let mut y = None;
        let mut bulge = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    10 => assign_coord(&mut x, &value, "VERTEX X（组码 10）")?,
                    20 => assign_coord(&mut y, &value, "VERTEX Y（组码 20）")?,
                    42 => assign_coord(&mut bulge, &value, "VERTEX bulge（组码 42）")?,
                    _ => {}
                },
                None => return Err(DxfError::invalid("VERTEX 未正确结束")),
            }
        }

        let x = x.ok_or_else(|| DxfError::invalid("VERTEX 缺少 X（组码 10）"))?;
        let y = y.ok_or_else(|| DxfError::invalid("VERTEX 缺少 Y（组码 20）"))?;
        Ok(PolylineVertex::with_bulge(
            Point2::new(x, y),
            bulge.unwrap_or(0.0),
        ))
    }

    fn skip_polyline_sequence(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => self.skip_entity_body()?,
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        // 跳过文件末尾的空行
        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    if line.trim().is_empty() {
                        continue;
                    }
                    break line;
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "内部错误：尝试多次回退 DXF pair");
        self.buffer = Some(pair);
    }
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value)
        .map_err(|_| DxfError::invalid(format!("{context} 超出 i16 范围（值：{value}）")))
}

#[cfg(test)]
mod tests {
    use bracket_core::profile::ArcTessellation;

    use super::*;

    fn decode(text: &str) -> Result<Drawing, IoError> {
        DxfFacade::new().decode(text.as_bytes())
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        assert!(matches!(decode(""), Err(IoError::Parse(_))));
        assert!(matches!(decode("\n\n"), Err(IoError::Parse(_))));
    }

    #[test]
    fn non_utf8_bytes_are_rejected() {
        let err = DxfFacade::new()
            .decode(&[0x30, 0x0a, 0xff, 0xfe])
            .expect_err("invalid utf-8 should fail");
        assert!(matches!(err, IoError::Parse(_)));
    }

    #[test]
    fn non_integer_group_code_reports_line() {
        let err = decode("0\nSECTION\nabc\nENTITIES\n").expect_err("should fail");
        match err {
            IoError::Parse(message) => assert!(message.contains("第 3 行"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn dangling_code_without_value_fails() {
        assert!(matches!(decode("0\nSECTION\n2"), Err(IoError::Parse(_))));
    }

    #[test]
    fn unparsable_coordinate_fails_whole_decode() {
        let text = "0\nSECTION\n2\nENTITIES\n0\nLINE\n10\nabc\n20\n0\n11\n1\n21\n0\n0\nENDSEC\n0\nEOF\n";
        assert!(matches!(decode(text), Err(IoError::Parse(_))));
    }

    #[test]
    fn unknown_entities_are_skipped_and_counted() {
        let text = "0\nSECTION\n2\nENTITIES\n\
0\nTEXT\n8\n0\n10\n0\n20\n0\n1\nhello\n\
0\nLINE\n8\nCUT\n10\n0\n20\n0\n11\n1\n21\n0\n\
0\nPOINT\n10\n1\n20\n1\n\
0\nENDSEC\n0\nEOF\n";
        let drawing = decode(text).expect("decode");
        assert_eq!(drawing.entity_count(), 1);
        assert_eq!(drawing.skipped_entities(), 2);
        let entity = drawing.entities().next().expect("line");
        assert_eq!(entity.kind(), "Line");
        assert_eq!(entity.layer_name(), "CUT");
    }

    #[test]
    fn polyface_polyline_is_skipped() {
        let text = "0\nSECTION\n2\nENTITIES\n\
0\nPOLYLINE\n8\n0\n70\n64\n\
0\nVERTEX\n10\n0\n20\n0\n30\n0\n70\n192\n\
0\nSEQEND\n\
0\nCIRCLE\n10\n0\n20\n0\n40\n1\n\
0\nENDSEC\n0\nEOF\n";
        let drawing = decode(text).expect("decode");
        assert_eq!(drawing.entity_count(), 1);
        assert_eq!(drawing.skipped_entities(), 1);
    }

    #[test]
    fn polylines_without_vertices_do_not_fail_the_drawing() {
        let text = "0\nSECTION\n2\nENTITIES\n\
0\nLWPOLYLINE\n8\n0\n90\n0\n70\n1\n\
0\nPOLYLINE\n8\n0\n70\n0\n0\nSEQEND\n\
0\nCIRCLE\n10\n0\n20\n0\n40\n1\n\
0\nENDSEC\n0\nEOF\n";
        let drawing = decode(text).expect("decode");
        assert_eq!(drawing.entity_count(), 3);
        assert_eq!(drawing.skipped_entities(), 0);
        let kinds: Vec<&str> = drawing.entities().map(RawEntity::kind).collect();
        assert_eq!(kinds, vec!["Polyline", "Polyline", "Circle"]);
        match drawing.entities().next() {
            Some(RawEntity::Polyline(polyline)) => {
                assert!(polyline.vertices.is_empty());
                assert!(polyline.is_closed);
            }
            other => panic!("unexpected entity: {other:?}"),
        }

        let decomposition = decompose(&drawing, ArcTessellation::default());
        assert_eq!(decomposition.loops.len(), 1);
        assert!(decomposition.segments.is_empty());
        assert_eq!(decomposition.degenerate_loops, 1);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let text = "\u{feff}0\nSECTION\n2\nENTITIES\n0\nENDSEC\n0\nEOF\n";
        let drawing = decode(text).expect("decode");
        assert!(drawing.is_empty());
    }
}
