use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::rig::{ControllerIndex, ControllerRecord, JointHierarchy, JointRecord};

/// Raw rig document as written by the authoring tool.
///
/// Joints and controllers may come from the same file or from separate files, so either
/// array may be missing.
#[derive(Debug, Default, Deserialize)]
pub struct RigDocument {
    #[serde(default)]
    pub hierarchy: Vec<JointRecord>,
    #[serde(default)]
    pub controllers: Vec<ControllerRecord>,
}

/// A validated joint hierarchy together with its controllers
#[derive(Debug, Clone)]
pub struct Rig {
    pub hierarchy: JointHierarchy,
    pub controllers: ControllerIndex,
}

impl Rig {
    pub fn from_document(document: RigDocument) -> Result<Self> {
        let hierarchy = JointHierarchy::new(document.hierarchy)?;
        let controllers = ControllerIndex::new(document.controllers)?;

        // Controllers may name joints outside the loaded hierarchy when files are split.
        if !hierarchy.is_empty() {
            for name in controllers.names() {
                let Ok(joints) = controllers.get_joint(name) else {
                    continue;
                };
                for joint in joints {
                    if hierarchy.get_joint_by_short_name(joint).is_err() {
                        log::warn!("Controller '{}' references unknown joint '{}'", name, joint);
                    }
                }
            }
        }

        Ok(Self {
            hierarchy,
            controllers,
        })
    }
}

/// Parse a rig document from JSON text
pub fn parse_rig_str(content: &str) -> Result<Rig> {
    let document: RigDocument = serde_json::from_str(content)
        .map_err(|e| anyhow!("Failed to parse rig JSON: {}", e))?;
    Rig::from_document(document)
}

/// Parse a rig document from a JSON file
pub fn parse_rig_file(file_path: &Path) -> Result<Rig> {
    let content = std::fs::read_to_string(file_path)
        .map_err(|e| anyhow!("Failed to read rig file {}: {}", file_path.display(), e))?;

    let rig = parse_rig_str(&content)?;
    log::info!(
        "Loaded rig from {}: {} joints, {} controllers",
        file_path.display(),
        rig.hierarchy.len(),
        rig.controllers.len()
    );
    Ok(rig)
}
