use anyhow::{anyhow, Result};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::rig::JointHierarchy;
use crate::transform::compose_trs;

/// Name of the array holding custom shapes in a shape file
pub const DEFAULT_SHAPE_COLLECTION: &str = "shapes";

/// Local offset of a single joint.
///
/// `scaling` is stored as a delta from 1.0 so an untouched joint is all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub name: String,
    pub translation: DVec3,
    /// Euler XYZ in degrees
    pub rotation: DVec3,
    pub scaling: DVec3,
}

impl ShapeRecord {
    pub fn to_local_transform(&self) -> glam::DMat4 {
        compose_trs(self.translation, self.rotation, self.scaling + DVec3::ONE)
    }
}

/// Store each shape as the local transform of the joint it names.
///
/// Names may be full joint names or short names. Returns the number of shapes applied.
/// Nothing is stored unless every name resolves.
pub fn load_shapes(hierarchy: &mut JointHierarchy, shapes: &[ShapeRecord]) -> crate::Result<usize> {
    let locals = shapes
        .iter()
        .map(|shape| {
            let full_name = hierarchy.resolve_name(&shape.name)?.to_string();
            Ok((full_name, shape.to_local_transform()))
        })
        .collect::<crate::Result<Vec<_>>>()?;

    for (full_name, local) in locals {
        hierarchy.set_local_transform(&full_name, local)?;
    }
    log::info!("Applied {} custom shapes", shapes.len());
    Ok(shapes.len())
}

/// Parse the shape array stored under `collection` in a JSON document
pub fn parse_shapes_str(content: &str, collection: &str) -> Result<Vec<ShapeRecord>> {
    let mut document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| anyhow!("Failed to parse shape JSON: {}", e))?;

    let shapes = document
        .remove(collection)
        .ok_or_else(|| anyhow!("Shape JSON has no '{}' array", collection))?;

    serde_json::from_value(shapes).map_err(|e| anyhow!("Invalid '{}' array: {}", collection, e))
}

/// Read a shape file and apply it to the hierarchy
pub fn load_shapes_file(
    hierarchy: &mut JointHierarchy,
    file_path: &Path,
    collection: &str,
) -> Result<usize> {
    let content = std::fs::read_to_string(file_path)
        .map_err(|e| anyhow!("Failed to read shape file {}: {}", file_path.display(), e))?;
    let shapes = parse_shapes_str(&content, collection)?;
    Ok(load_shapes(hierarchy, &shapes)?)
}
