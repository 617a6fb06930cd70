use anyhow::{anyhow, Result};
use glam::DVec3;
use std::path::Path;

use crate::convert::shapes::{ShapeRecord, DEFAULT_SHAPE_COLLECTION};
use crate::rig::JointHierarchy;
use crate::transform::{decompose, rotation_mat4_to_euler_degrees};

/// Configuration for custom shape export
#[derive(Debug, Clone)]
pub struct ShapeExportConfig {
    /// Key of the array holding the shapes
    pub collection: String,
    /// Write full joint paths instead of short names
    pub full_names: bool,
}

impl Default for ShapeExportConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_SHAPE_COLLECTION.to_string(),
            full_names: false,
        }
    }
}

/// Convert every local transform of the hierarchy back into shape records
pub fn export_shapes(
    hierarchy: &JointHierarchy,
    config: &ShapeExportConfig,
) -> crate::Result<Vec<ShapeRecord>> {
    hierarchy
        .local_transforms()
        .map(|(joint, local)| -> crate::Result<ShapeRecord> {
            let parts = decompose(&local)?;
            let rotation = rotation_mat4_to_euler_degrees(&parts.rotation)?;

            let name = if config.full_names {
                joint.full_name.clone()
            } else {
                joint.short_name.clone()
            };

            Ok(ShapeRecord {
                name,
                translation: parts.translation_vector(),
                rotation,
                scaling: parts.scale_vector() - DVec3::ONE,
            })
        })
        .collect()
}

/// Pretty printed JSON document with the shapes under `config.collection`
pub fn export_shapes_to_json(
    hierarchy: &JointHierarchy,
    config: &ShapeExportConfig,
) -> Result<String> {
    let shapes = export_shapes(hierarchy, config)?;

    let mut document = serde_json::Map::new();
    document.insert(config.collection.clone(), serde_json::to_value(&shapes)?);

    Ok(serde_json::to_string_pretty(&document)?)
}

/// Export the hierarchy's custom shapes to a JSON file
pub fn export_shapes_to_file(
    hierarchy: &JointHierarchy,
    output_path: &Path,
    config: &ShapeExportConfig,
) -> Result<usize> {
    let json = export_shapes_to_json(hierarchy, config)?;
    std::fs::write(output_path, json).map_err(|e| {
        anyhow!(
            "Failed to write shape file {}: {}",
            output_path.display(),
            e
        )
    })?;

    let count = hierarchy.local_transforms().count();
    log::info!("Exported {} custom shapes to {}", count, output_path.display());
    Ok(count)
}
