use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{NameKind, Result, RigError};
use crate::rig::joint::short_name;

/// Controllers whose name contains this tag drive facial expressions and are never indexed
pub const EXPRESSION_TAG: &str = "Expression";

/// One entry of the `controllers` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerRecord {
    pub name: String,
    #[serde(default)]
    pub joints: Vec<String>,
    pub rotate_pivot: DVec3,
    pub scale_pivot: DVec3,
}

/// Lookup from controller short name to its joints and pivots
#[derive(Debug, Clone, Default)]
pub struct ControllerIndex {
    controller_to_joints: BTreeMap<String, Vec<String>>,
    controller_to_rotate_pivot: BTreeMap<String, DVec3>,
    controller_to_scale_pivot: BTreeMap<String, DVec3>,
}

impl ControllerIndex {
    pub fn new(records: impl IntoIterator<Item = ControllerRecord>) -> Result<Self> {
        let mut index = Self::default();
        let mut skipped = 0;

        for record in records {
            if record.name.contains(EXPRESSION_TAG) {
                skipped += 1;
                continue;
            }

            let name = short_name(&record.name).to_string();

            // Pivot-only controllers are allowed and keep no joint entry.
            if !record.joints.is_empty() {
                if index.controller_to_joints.contains_key(&name) {
                    return Err(duplicate(name));
                }
                index
                    .controller_to_joints
                    .insert(name.clone(), record.joints);
            }

            if index.controller_to_rotate_pivot.contains_key(&name) {
                return Err(duplicate(name));
            }
            index
                .controller_to_rotate_pivot
                .insert(name.clone(), record.rotate_pivot);
            index
                .controller_to_scale_pivot
                .insert(name, record.scale_pivot);
        }

        if skipped > 0 {
            log::debug!("Skipped {} expression controllers", skipped);
        }
        log::info!(
            "Indexed {} controllers, {} with joints",
            index.controller_to_rotate_pivot.len(),
            index.controller_to_joints.len()
        );

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.controller_to_rotate_pivot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controller_to_rotate_pivot.is_empty()
    }

    pub fn contains(&self, controller_name: &str) -> bool {
        self.controller_to_rotate_pivot.contains_key(controller_name)
    }

    /// Controller short names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.controller_to_rotate_pivot.keys().map(String::as_str)
    }

    pub fn get_rotate_pivot(&self, controller_name: &str) -> Result<DVec3> {
        self.controller_to_rotate_pivot
            .get(controller_name)
            .copied()
            .ok_or_else(|| RigError::unknown_controller(controller_name))
    }

    pub fn get_scale_pivot(&self, controller_name: &str) -> Result<DVec3> {
        self.controller_to_scale_pivot
            .get(controller_name)
            .copied()
            .ok_or_else(|| RigError::unknown_controller(controller_name))
    }

    /// Joint short names driven by a controller.
    ///
    /// Pivot-only controllers have no joint entry and are reported as unknown here.
    pub fn get_joint(&self, controller_name: &str) -> Result<&[String]> {
        self.controller_to_joints
            .get(controller_name)
            .map(Vec::as_slice)
            .ok_or_else(|| RigError::unknown_controller(controller_name))
    }

    /// Sorted, deduplicated union of the joints of several controllers
    pub fn get_joints<S: AsRef<str>>(&self, controller_names: &[S]) -> Result<Vec<String>> {
        let mut joints = BTreeSet::new();
        for name in controller_names {
            joints.extend(self.get_joint(name.as_ref())?.iter().cloned());
        }
        Ok(joints.into_iter().collect())
    }
}

fn duplicate(name: String) -> RigError {
    RigError::DuplicateKey {
        kind: NameKind::Controller,
        name,
    }
}
