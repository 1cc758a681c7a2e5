use std::path::Path;

use bracket_core::geometry::Bounds3D;
use bracket_core::solid::{Mesh, Solid};
use bracket_engine::{Diagnostics, Reconstruction};
use tracing::{info, warn};

use crate::loader::{Assembly, PartStatus, RenderPart};

/// 打印组件概览：每个零件的状态、厚度、位姿与实体信息。
pub fn print_assembly(assembly: &Assembly) {
    let ready = assembly.ready_parts().count();
    info!(sku = %assembly.sku, parts = assembly.parts.len(), ready, "CLI 组件统计");

    println!("产品 {}：共 {} 个零件，{} 个可显示", assembly.sku, assembly.parts.len(), ready);
    for (index, part) in assembly.parts.iter().enumerate() {
        print_part(index, part);
    }
    match assembly.world_bounds() {
        Some(bounds) => println!("组件包围盒：{}", format_bounds(&bounds)),
        None => println!("组件中没有可显示的零件。"),
    }
}

fn print_part(index: usize, part: &RenderPart) {
    let position = part.placement.position;
    let rotation = part.placement.rotation.as_vec3();
    println!(
        "  [{index}] {} ({})，厚度={:.3}，位置=({:.2}, {:.2}, {:.2})，旋转=({:.3}, {:.3}, {:.3})",
        part.file.display(),
        part.status.label(),
        part.thickness,
        position.x(),
        position.y(),
        position.z(),
        rotation.x,
        rotation.y,
        rotation.z
    );
    if let Some(path) = &part.resolved {
        println!("      文件：{}", path.display());
    }
    match &part.status {
        PartStatus::ReadFailed(reason)
        | PartStatus::ParseFailed(reason)
        | PartStatus::Rejected(reason) => println!("      原因：{reason}"),
        _ => {}
    }
    if let Some(diagnostics) = &part.diagnostics {
        println!("      {}", describe_diagnostics(diagnostics));
    }
    for solid in &part.solids {
        println!("      {}", describe_solid(solid));
    }
    if !part.solids.is_empty() {
        println!(
            "      材质：颜色={}，金属度={:.2}，粗糙度={:.2}",
            part.material.color, part.material.metalness, part.material.roughness
        );
    }
}

/// 打印单张图纸的重建结果。
pub fn print_reconstruction(path: &Path, reconstruction: &Reconstruction) {
    println!("图纸：{}", path.display());
    println!("{}", describe_diagnostics(&reconstruction.diagnostics));
    if let Some(extents) = &reconstruction.extents {
        let min = extents.min();
        println!(
            "图纸范围：起点=({:.3}, {:.3})，宽={:.3}，高={:.3}",
            min.x(),
            min.y(),
            extents.width(),
            extents.height()
        );
    }
    if reconstruction.is_empty() {
        println!("图纸中没有闭合轮廓，未生成实体。");
        return;
    }
    for (index, part) in reconstruction.parts.iter().enumerate() {
        let boundary = &part.geometry.boundary;
        println!(
            "  区域 {index}：外轮廓 {} 点，面积={:.4}，孔 {} 个，净面积={:.4}",
            boundary.point_count(),
            boundary.area(),
            part.geometry.holes.len(),
            part.geometry.footprint_area()
        );
        for (hole_index, hole) in part.geometry.holes.iter().enumerate() {
            println!(
                "    - 孔 {hole_index}：{} 点，面积={:.4}",
                hole.point_count(),
                hole.area()
            );
        }
        match &part.solid {
            Some(solid) => println!("    {}", describe_solid(solid)),
            None => {
                warn!(region = index, "区域未生成实体");
                println!("    未生成实体");
            }
        }
    }
}

pub fn describe_diagnostics(diagnostics: &Diagnostics) -> String {
    let mut text = format!(
        "图元 {}（跳过 {}），直接闭合 {}，图段 {}，拼接轮廓 {}，孔 {}，区域 {}",
        diagnostics.decoded_entities,
        diagnostics.skipped_entities,
        diagnostics.direct_loops,
        diagnostics.segments,
        diagnostics.stitched_loops,
        diagnostics.holes,
        diagnostics.parts
    );
    if !diagnostics.is_lossless() {
        text.push_str(&format!(
            "；丢弃：跳过图元 {}，孤立图段 {}，退化轮廓 {}",
            diagnostics.skipped_entities,
            diagnostics.isolated_segments,
            diagnostics.degenerate_loops
        ));
    }
    if diagnostics.unbuilt_parts > 0 {
        text.push_str(&format!("；未成形区域 {}", diagnostics.unbuilt_parts));
    }
    text
}

fn describe_solid(solid: &Solid) -> String {
    let mesh = solid.mesh();
    let mut text = format!(
        "实体：顶点 {}，三角形 {}，深度={:.3}，包围盒 {}",
        mesh.vertex_count(),
        mesh.triangle_count(),
        solid.depth(),
        format_bounds(&solid.bounds())
    );
    let degenerate = degenerate_triangles(mesh);
    if degenerate > 0 {
        text.push_str(&format!("，退化三角形 {degenerate}"));
    }
    text
}

fn degenerate_triangles(mesh: &Mesh) -> usize {
    mesh.triangles()
        .filter(|triangle| Mesh::face_normal(triangle).is_none())
        .count()
}

pub fn format_bounds(bounds: &Bounds3D) -> String {
    let (min, max) = (bounds.min(), bounds.max());
    format!(
        "[({:.3}, {:.3}, {:.3}) - ({:.3}, {:.3}, {:.3})]",
        min.x(),
        min.y(),
        min.z(),
        max.x(),
        max.y(),
        max.z()
    )
}
