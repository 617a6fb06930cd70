use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};

/// Last `|` separated segment of a rig path
pub fn short_name(name: &str) -> &str {
    name.rsplit('|').next().unwrap_or(name)
}

/// The `parents` field as written by the exporter.
///
/// Roots are written as an empty list, children usually as a plain string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentField {
    Name(String),
    List(Vec<String>),
}

impl Default for ParentField {
    fn default() -> Self {
        ParentField::List(Vec::new())
    }
}

/// One entry of the `hierarchy` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointRecord {
    pub name: String,
    #[serde(default)]
    pub parents: ParentField,
    pub position: DVec3,
    pub rotation: DVec3,
    pub scale: DVec3,
    pub orientation: DVec3,
    pub world_position: DVec3,
    pub world_rotation: DVec3,
    pub world_scaling: DVec3,
}

/// A joint of the hierarchy with its parent resolved to an index
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub full_name: String,
    pub short_name: String,
    pub parent_index: Option<usize>,
    pub position: DVec3,
    /// Euler XYZ in degrees
    pub rotation: DVec3,
    pub scale: DVec3,
    /// Extra rotation in degrees applied after `rotation`
    pub orientation: DVec3,
    pub world_position: DVec3,
    pub world_rotation: DVec3,
    pub world_scaling: DVec3,
}

impl JointRecord {
    /// Full name of the parent joint or `None` for a root
    pub fn parent_name(&self) -> Result<Option<&str>> {
        match &self.parents {
            ParentField::Name(name) if name.is_empty() => Ok(None),
            ParentField::Name(name) => Ok(Some(name.as_str())),
            ParentField::List(names) => match names.as_slice() {
                [] => Ok(None),
                [name] if name.is_empty() => Ok(None),
                [name] => Ok(Some(name.as_str())),
                _ => Err(RigError::InvalidRecord {
                    name: self.name.clone(),
                    reason: format!("expected at most one parent, found {}", names.len()),
                }),
            },
        }
    }

    pub(crate) fn into_joint(self, parent_index: Option<usize>) -> Joint {
        Joint {
            short_name: short_name(&self.name).to_string(),
            full_name: self.name,
            parent_index,
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
            orientation: self.orientation,
            world_position: self.world_position,
            world_rotation: self.world_rotation,
            world_scaling: self.world_scaling,
        }
    }
}

impl Joint {
    pub fn is_root(&self) -> bool {
        self.parent_index.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(parents: serde_json::Value) -> JointRecord {
        serde_json::from_value(serde_json::json!({
            "name": "root|spine|neck",
            "parents": parents,
            "position": [0.0, 1.0, 0.0],
            "rotation": [0.0, 0.0, 0.0],
            "scale": [1.0, 1.0, 1.0],
            "orientation": [0.0, 0.0, 0.0],
            "world_position": [0.0, 1.0, 0.0],
            "world_rotation": [0.0, 0.0, 0.0],
            "world_scaling": [1.0, 1.0, 1.0]
        }))
        .unwrap()
    }

    #[test]
    fn short_name_is_last_segment() {
        assert_eq!(short_name("root|spine|neck"), "neck");
        assert_eq!(short_name("neck"), "neck");
        assert_eq!(short_name(""), "");
    }

    #[test]
    fn parents_as_string() {
        let r = record(serde_json::json!("root|spine"));
        assert_eq!(r.parent_name().unwrap(), Some("root|spine"));
        assert_eq!(r.position, DVec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn parents_as_empty_forms() {
        assert_eq!(record(serde_json::json!([])).parent_name().unwrap(), None);
        assert_eq!(record(serde_json::json!("")).parent_name().unwrap(), None);
    }

    #[test]
    fn parents_as_single_element_list() {
        let r = record(serde_json::json!(["root|spine"]));
        assert_eq!(r.parent_name().unwrap(), Some("root|spine"));
    }

    #[test]
    fn multiple_parents_are_rejected() {
        let r = record(serde_json::json!(["a", "b"]));
        assert!(matches!(
            r.parent_name(),
            Err(RigError::InvalidRecord { .. })
        ));
    }
}
