use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use image::ImageReader;
use roxmltree::Node;
use thiserror::Error;
use tracing::{info, warn};

use crate::hash::format_hash;
use crate::resource::{AnimationInfo, FrameImage, FrameInfo, MemoryResources, ResourceType};

use super::error::{parse_document, read_error, ContentError, ContentErrorCode, XmlContext};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Manifest(#[from] ContentError),
    #[error("failed to read data file {path} for resource {id}: {source}")]
    DataFile {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loads `resources.xml` into an in-memory resource table.
///
/// Sprite sheets are horizontal strips of `frames` cells. A sheet that is
/// absent or undecodable is logged and skipped; the animation still loads
/// without pixels and draws as a placeholder.
pub fn load_resource_manifest(path: &Path) -> Result<MemoryResources, ResourceError> {
    let raw = fs::read_to_string(path).map_err(|source| read_error(path, source))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_resource_manifest(path, base_dir, &raw)
}

pub fn parse_resource_manifest(
    file_path: &Path,
    base_dir: &Path,
    raw: &str,
) -> Result<MemoryResources, ResourceError> {
    let doc = parse_document(file_path, raw)?;
    let ctx = XmlContext {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Resources" {
        return Err(ctx
            .error(
                ContentErrorCode::InvalidRoot,
                "root element must be <Resources>".to_string(),
                root,
            )
            .into());
    }

    let mut resources = MemoryResources::new();
    let mut seen = HashSet::new();
    let mut sheets_loaded = 0usize;

    for node in root.children().filter(|node| node.is_element()) {
        let id = ctx.hash_attr(node, "id")?;
        if !seen.insert(id) {
            return Err(ctx
                .error(
                    ContentErrorCode::DuplicateId,
                    format!("duplicate resource id {}", format_hash(id)),
                    node,
                )
                .into());
        }

        match node.tag_name().name() {
            "Animation" => {
                let (info, cell) = parse_animation(&ctx, node)?;
                let frame_count = info.frame_count();
                resources.insert_animation(id, info);
                if let (Some(sheet), Some((width, height))) = (node.attribute("sheet"), cell) {
                    let sheet_path = base_dir.join(sheet);
                    if let Some(images) = load_sheet(&sheet_path, id, frame_count, width, height) {
                        resources.set_frame_images(id, images);
                        sheets_loaded += 1;
                    }
                }
            }
            "Data" => {
                let file = ctx.required_attr(node, "file")?;
                let data_path = base_dir.join(file);
                let bytes = fs::read(&data_path).map_err(|source| ResourceError::DataFile {
                    id: format_hash(id),
                    path: data_path.clone(),
                    source,
                })?;
                resources.insert_bytes(id, ResourceType::Data, bytes);
            }
            other => {
                return Err(ctx
                    .error(
                        ContentErrorCode::UnknownElement,
                        format!("unknown resource kind <{}>", other),
                        node,
                    )
                    .into())
            }
        }
    }

    info!(
        path = %file_path.display(),
        resources = resources.len(),
        sheets_loaded,
        "resource_manifest_loaded"
    );
    Ok(resources)
}

fn parse_animation(
    ctx: &XmlContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<(AnimationInfo, Option<(u32, u32)>), ContentError> {
    let frame_count = ctx.i32_attr(node, "frames")?;
    if frame_count <= 0 {
        return Err(ctx.error(
            ContentErrorCode::InvalidValue,
            format!(
                "animation {} needs at least one frame, got {}",
                node.attribute("id").unwrap_or_default(),
                frame_count
            ),
            node,
        ));
    }
    let width = non_negative(ctx, node, "width")?;
    let height = non_negative(ctx, node, "height")?;
    let default_dx = ctx.optional_i32_attr(node, "deltaX")?.unwrap_or(0);
    let default_dy = ctx.optional_i32_attr(node, "deltaY")?.unwrap_or(0);

    let mut frames = vec![
        FrameInfo {
            frame_hash: 0,
            delta_x: default_dx,
            delta_y: default_dy,
            width: width.unwrap_or(0),
            height: height.unwrap_or(0),
        };
        frame_count as usize
    ];

    for frame_node in node.children().filter(|child| child.is_element()) {
        if frame_node.tag_name().name() != "Frame" {
            return Err(ctx.error(
                ContentErrorCode::UnknownElement,
                format!("unexpected <{}> in <Animation>", frame_node.tag_name().name()),
                frame_node,
            ));
        }
        let index = ctx.i32_attr(frame_node, "index")?;
        let Some(frame) = usize::try_from(index)
            .ok()
            .and_then(|index| frames.get_mut(index))
        else {
            return Err(ctx.error(
                ContentErrorCode::InvalidValue,
                format!("frame index {} is outside 0..{}", index, frame_count),
                frame_node,
            ));
        };
        if let Some(hash) = ctx.optional_hash_attr(frame_node, "hash")? {
            frame.frame_hash = hash;
        }
        if let Some(dx) = ctx.optional_i32_attr(frame_node, "deltaX")? {
            frame.delta_x = dx;
        }
        if let Some(dy) = ctx.optional_i32_attr(frame_node, "deltaY")? {
            frame.delta_y = dy;
        }
    }

    Ok((AnimationInfo::new(frames), width.zip(height)))
}

fn non_negative(
    ctx: &XmlContext<'_, '_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<Option<u32>, ContentError> {
    match ctx.optional_i32_attr(node, name)? {
        None => Ok(None),
        Some(value) => u32::try_from(value).map(Some).map_err(|_| {
            ctx.error(
                ContentErrorCode::InvalidValue,
                format!("attribute '{}' must not be negative, got {}", name, value),
                node,
            )
        }),
    }
}

fn load_sheet(
    path: &Path,
    id: u32,
    frame_count: usize,
    width: u32,
    height: u32,
) -> Option<Vec<FrameImage>> {
    if !path.is_file() {
        warn!(hash = %format_hash(id), path = %path.display(), "sprite_sheet_missing");
        return None;
    }
    let decoded = ImageReader::open(path)
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());
    let sheet = match decoded {
        Ok(decoded) => decoded.to_rgba8(),
        Err(error) => {
            warn!(
                hash = %format_hash(id),
                path = %path.display(),
                error = %error,
                "sprite_sheet_unreadable"
            );
            return None;
        }
    };
    let needed_width = width.saturating_mul(frame_count as u32);
    if sheet.width() < needed_width || sheet.height() < height {
        warn!(
            hash = %format_hash(id),
            path = %path.display(),
            sheet_width = sheet.width(),
            sheet_height = sheet.height(),
            needed_width,
            needed_height = height,
            "sprite_sheet_too_small"
        );
        return None;
    }

    let images = (0..frame_count as u32)
        .map(|index| {
            let cell = image::imageops::crop_imm(&sheet, index * width, 0, width, height).to_image();
            FrameImage {
                width,
                height,
                rgba: cell.into_raw(),
            }
        })
        .collect();
    Some(images)
}
