use glam::{DMat3, DMat4, DVec3};
use std::collections::HashMap;

use crate::error::{NameKind, Result, RigError};
use crate::rig::joint::{Joint, JointRecord};
use crate::transform::{build_rotation, build_scale, build_translation, compose_trs};

/// Largest accepted distance between a computed joint position and its recorded world position
pub const WORLD_POSITION_TOLERANCE: f64 = 1e-9;

/// Smallest accepted ratio between the determinant and the product of the basis lengths
/// when solving for local offsets. The ratio does not depend on the overall scale.
const SINGULAR_VOLUME_RATIO: f64 = 1e-12;

/// Joint hierarchy with memoized global transforms and per-joint local offsets.
///
/// Global transforms are computed lazily from the bind pose and cached for the lifetime of
/// the hierarchy. Resolving takes `&mut self` because it fills the cache, so sharing a
/// hierarchy across threads requires an outer lock.
#[derive(Debug, Clone)]
pub struct JointHierarchy {
    joints: Vec<Joint>,
    name_to_index: HashMap<String, usize>,
    short_name_to_index: HashMap<String, usize>,
    global_cache: Vec<Option<DMat4>>,
    local_transforms: Vec<Option<DMat4>>,
    resolve_count: usize,
}

impl JointHierarchy {
    /// Build the hierarchy, rejecting duplicate names, unknown parents, and parent cycles
    pub fn new(records: impl IntoIterator<Item = JointRecord>) -> Result<Self> {
        let records: Vec<JointRecord> = records.into_iter().collect();

        let mut name_to_index = HashMap::with_capacity(records.len());
        let mut short_name_to_index = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let short = crate::rig::joint::short_name(&record.name).to_string();
            if short_name_to_index.insert(short.clone(), index).is_some() {
                return Err(RigError::DuplicateKey {
                    kind: NameKind::Joint,
                    name: short,
                });
            }
            if name_to_index.insert(record.name.clone(), index).is_some() {
                return Err(RigError::DuplicateKey {
                    kind: NameKind::Joint,
                    name: record.name.clone(),
                });
            }
        }

        let mut joints = Vec::with_capacity(records.len());
        for record in records {
            let parent_index = match record.parent_name()? {
                Some(parent) => Some(
                    *name_to_index
                        .get(parent)
                        .ok_or_else(|| RigError::unknown_joint(parent))?,
                ),
                None => None,
            };
            joints.push(record.into_joint(parent_index));
        }

        validate_acyclic(&joints)?;

        log::info!(
            "Loaded hierarchy with {} joints ({} roots)",
            joints.len(),
            joints.iter().filter(|j| j.is_root()).count()
        );

        let count = joints.len();
        Ok(Self {
            joints,
            name_to_index,
            short_name_to_index,
            global_cache: vec![None; count],
            local_transforms: vec![None; count],
            resolve_count: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joints in load order
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn get_name_by_short_name(&self, short_name: &str) -> Result<&str> {
        self.get_joint_by_short_name(short_name)
            .map(|j| j.full_name.as_str())
    }

    pub fn get_joint_by_short_name(&self, short_name: &str) -> Result<&Joint> {
        self.short_name_to_index
            .get(short_name)
            .map(|&i| &self.joints[i])
            .ok_or_else(|| RigError::unknown_joint(short_name))
    }

    pub fn get_joint_by_name(&self, name: &str) -> Result<&Joint> {
        self.index_of(name).map(|i| &self.joints[i])
    }

    /// Resolve a full name, falling back to a short name lookup
    pub fn resolve_name(&self, name: &str) -> Result<&str> {
        match self.name_to_index.get(name) {
            Some(&i) => Ok(&self.joints[i].full_name),
            None => self.get_name_by_short_name(name),
        }
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.name_to_index
            .get(name)
            .copied()
            .ok_or_else(|| RigError::unknown_joint(name))
    }

    /// Number of global transforms computed so far; cache hits don't count
    pub fn resolve_count(&self) -> usize {
        self.resolve_count
    }

    /// Drop every cached global transform.
    ///
    /// Must be called by owners that change joint attributes after transforms were resolved.
    pub fn clear_global_cache(&mut self) {
        self.global_cache.iter_mut().for_each(|m| *m = None);
    }

    /// World space transform of a joint composed from its ancestors
    pub fn resolve_global_transform(&mut self, name: &str) -> Result<DMat4> {
        let index = self.index_of(name)?;
        self.resolve_index(index)
    }

    fn resolve_index(&mut self, index: usize) -> Result<DMat4> {
        if let Some(cached) = self.global_cache[index] {
            return Ok(cached);
        }

        // Depth is bounded by the tree height since cycles are rejected on load.
        let parent_index = self.joints[index].parent_index;
        let parent_total = match parent_index {
            Some(parent) => self.resolve_index(parent)?,
            None => root_correction(&self.joints[index]),
        };

        let joint = &self.joints[index];
        let local = compose_trs(joint.position, joint.rotation, joint.scale);
        let orientation = build_rotation(joint.orientation);
        let total = parent_total * local * orientation;

        let diff = total.w_axis.truncate().distance(joint.world_position);
        if !(diff <= WORLD_POSITION_TOLERANCE) {
            return Err(RigError::Consistency {
                name: joint.full_name.clone(),
                diff,
            });
        }

        log::debug!("Resolved global transform of '{}'", joint.full_name);
        self.global_cache[index] = Some(total);
        self.resolve_count += 1;
        Ok(total)
    }

    /// Global transforms of every joint in load order
    pub fn resolve_all(&mut self) -> Result<Vec<(String, DMat4)>> {
        let mut transforms = Vec::with_capacity(self.joints.len());
        for index in 0..self.joints.len() {
            let transform = self.resolve_index(index)?;
            transforms.push((self.joints[index].full_name.clone(), transform));
        }
        Ok(transforms)
    }

    pub fn set_local_transform(&mut self, name: &str, transform: DMat4) -> Result<()> {
        let index = self.index_of(name)?;
        self.local_transforms[index] = Some(transform);
        Ok(())
    }

    /// Set the local offset of a joint to identity
    pub fn reset_local_transform(&mut self, name: &str) -> Result<()> {
        self.set_local_transform(name, DMat4::IDENTITY)
    }

    pub fn has_local_transform(&self, name: &str) -> bool {
        self.name_to_index
            .get(name)
            .is_some_and(|&i| self.local_transforms[i].is_some())
    }

    /// The explicitly assigned local offset of a joint
    pub fn get_local_transform(&self, name: &str) -> Result<DMat4> {
        let index = self.index_of(name)?;
        self.local_transforms[index].ok_or_else(|| RigError::MissingLocalTransform {
            name: name.to_string(),
        })
    }

    /// Joints with a local offset, in load order
    pub fn local_transforms(&self) -> impl Iterator<Item = (&Joint, DMat4)> {
        self.joints
            .iter()
            .zip(&self.local_transforms)
            .filter_map(|(joint, local)| local.map(|m| (joint, m)))
    }

    /// `global * local`
    pub fn get_combined_transform(&mut self, name: &str) -> Result<DMat4> {
        let global = self.resolve_global_transform(name)?;
        let local = self.get_local_transform(name)?;
        Ok(global * local)
    }

    /// Translate a joint in world space by editing only its local offset.
    ///
    /// The rotation and scale of the combined transform are preserved.
    pub fn move_joint(&mut self, name: &str, dx: f64, dy: f64, dz: f64) -> Result<()> {
        let combined = self.get_combined_transform(name)?;
        let global = self.resolve_global_transform(name)?;

        let mut target = combined;
        target.w_axis += DVec3::new(dx, dy, dz).extend(0.0);

        let local = invert_global(name, &global)? * target;
        log::debug!("Moved joint '{}' by ({}, {}, {})", name, dx, dy, dz);
        self.set_local_transform(name, local)
    }
}

fn invert_global(name: &str, global: &DMat4) -> Result<DMat4> {
    let basis = DMat3::from_mat4(*global);
    let determinant = basis.determinant();
    let volume = basis.x_axis.length() * basis.y_axis.length() * basis.z_axis.length();

    // Flattened bases are rejected however small the joint is scaled.
    let singular = !determinant.is_finite()
        || !volume.is_finite()
        || volume == 0.0
        || determinant.abs() / volume < SINGULAR_VOLUME_RATIO;
    let inverse = global.inverse();
    if singular || !inverse.is_finite() {
        return Err(RigError::SingularMatrix {
            name: name.to_string(),
            determinant,
        });
    }
    Ok(inverse)
}

/// Stand-in parent transform for a root joint.
///
/// Accounts for any global offset baked into the world pose that the explicit hierarchy
/// does not represent.
fn root_correction(joint: &Joint) -> DMat4 {
    let position_diff = joint.world_position - joint.position;
    let rotation_diff = joint.world_rotation - joint.rotation - joint.orientation;
    let scale_diff = joint.world_scaling - joint.scale + DVec3::ONE;

    build_translation(position_diff) * build_rotation(rotation_diff) * build_scale(scale_diff)
}

fn validate_acyclic(joints: &[Joint]) -> Result<()> {
    for (start, joint) in joints.iter().enumerate() {
        let mut current = joint.parent_index;
        let mut steps = 0;
        while let Some(index) = current {
            steps += 1;
            if index == start || steps > joints.len() {
                return Err(RigError::Cycle {
                    name: joint.full_name.clone(),
                });
            }
            current = joints[index].parent_index;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::joint::ParentField;
    use approx::assert_abs_diff_eq;

    fn joint(name: &str, parent: &str, position: [f64; 3], world_position: [f64; 3]) -> JointRecord {
        JointRecord {
            name: name.to_string(),
            parents: ParentField::Name(parent.to_string()),
            position: DVec3::from(position),
            rotation: DVec3::ZERO,
            scale: DVec3::ONE,
            orientation: DVec3::ZERO,
            world_position: DVec3::from(world_position),
            world_rotation: DVec3::ZERO,
            world_scaling: DVec3::ONE,
        }
    }

    fn chain() -> JointHierarchy {
        JointHierarchy::new([
            joint("R", "", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            joint("R|C", "R", [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
        ])
        .unwrap()
    }

    /// Root at (0, 5, 0) rotated 90 degrees about Z, child one unit along the root's X.
    fn rotated_chain() -> JointHierarchy {
        let mut root = joint("hips", "", [0.0, 5.0, 0.0], [0.0, 5.0, 0.0]);
        root.rotation = DVec3::new(0.0, 0.0, 90.0);
        root.world_rotation = DVec3::new(0.0, 0.0, 90.0);

        let mut spine = joint("hips|spine", "hips", [1.0, 0.0, 0.0], [0.0, 6.0, 0.0]);
        spine.orientation = DVec3::new(0.0, 0.0, -90.0);
        spine.world_rotation = DVec3::ZERO;

        let hand = joint("hips|spine|hand", "hips|spine", [2.0, 0.0, 0.0], [2.0, 6.0, 0.0]);

        JointHierarchy::new([root, spine, hand]).unwrap()
    }

    #[test]
    fn two_joint_chain() {
        let mut hierarchy = chain();
        hierarchy.reset_local_transform("R|C").unwrap();

        let combined = hierarchy.get_combined_transform("R|C").unwrap();
        assert_abs_diff_eq!(combined.w_axis.truncate(), DVec3::X, epsilon = 1e-12);
    }

    #[test]
    fn root_matches_world_position() {
        let mut hierarchy = rotated_chain();
        let global = hierarchy.resolve_global_transform("hips").unwrap();
        assert_abs_diff_eq!(
            global.w_axis.truncate(),
            DVec3::new(0.0, 5.0, 0.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn rotated_parent_chain() {
        let mut hierarchy = rotated_chain();
        let hand = hierarchy.resolve_global_transform("hips|spine|hand").unwrap();
        assert_abs_diff_eq!(
            hand.w_axis.truncate(),
            DVec3::new(2.0, 6.0, 0.0),
            epsilon = 1e-9
        );
        // Orientation cancels the root rotation, so the hand is axis aligned.
        assert_abs_diff_eq!(
            hand.transform_vector3(DVec3::X),
            DVec3::X,
            epsilon = 1e-12
        );
    }

    #[test]
    fn root_correction_absorbs_baked_offset() {
        let mut root = joint("root", "", [0.0, 0.0, 0.0], [3.0, 4.0, 5.0]);
        root.world_scaling = DVec3::splat(2.0);
        let mut hierarchy = JointHierarchy::new([
            root,
            joint("root|child", "root", [1.0, 0.0, 0.0], [5.0, 4.0, 5.0]),
        ])
        .unwrap();

        let child = hierarchy.resolve_global_transform("root|child").unwrap();
        assert_abs_diff_eq!(
            child.w_axis.truncate(),
            DVec3::new(5.0, 4.0, 5.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn inconsistent_world_position_is_rejected() {
        let mut hierarchy = JointHierarchy::new([
            joint("R", "", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            joint("R|C", "R", [1.0, 0.0, 0.0], [1.0, 1e-6, 0.0]),
        ])
        .unwrap();

        let err = hierarchy.resolve_global_transform("R|C").unwrap_err();
        assert!(matches!(err, RigError::Consistency { ref name, .. } if name == "R|C"));
        // Nothing is cached for the failing joint.
        assert_eq!(hierarchy.resolve_count(), 1);
    }

    #[test]
    fn resolution_is_memoized() {
        let mut hierarchy = rotated_chain();

        let first = hierarchy.resolve_global_transform("hips|spine|hand").unwrap();
        assert_eq!(hierarchy.resolve_count(), 3);

        let second = hierarchy.resolve_global_transform("hips|spine|hand").unwrap();
        assert_eq!(first.to_cols_array(), second.to_cols_array());
        assert_eq!(hierarchy.resolve_count(), 3);

        // Ancestors were cached along the way.
        hierarchy.resolve_global_transform("hips").unwrap();
        assert_eq!(hierarchy.resolve_count(), 3);

        hierarchy.clear_global_cache();
        hierarchy.resolve_global_transform("hips").unwrap();
        assert_eq!(hierarchy.resolve_count(), 4);
    }

    #[test]
    fn resolve_all_in_load_order() {
        let mut hierarchy = rotated_chain();
        let all = hierarchy.resolve_all().unwrap();
        let names: Vec<&str> = all.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["hips", "hips|spine", "hips|spine|hand"]);
    }

    #[test]
    fn combined_is_global_times_local() {
        let mut hierarchy = rotated_chain();
        let local = compose_trs(
            DVec3::new(0.1, 0.2, 0.3),
            DVec3::new(10.0, 20.0, 30.0),
            DVec3::new(1.1, 0.9, 1.0),
        );
        hierarchy.set_local_transform("hips|spine", local).unwrap();

        let global = hierarchy.resolve_global_transform("hips|spine").unwrap();
        let combined = hierarchy.get_combined_transform("hips|spine").unwrap();
        assert_eq!(combined, global * local);
    }

    #[test]
    fn missing_local_transform() {
        let mut hierarchy = chain();
        assert!(!hierarchy.has_local_transform("R|C"));
        assert!(matches!(
            hierarchy.get_local_transform("R|C"),
            Err(RigError::MissingLocalTransform { .. })
        ));
        assert!(matches!(
            hierarchy.get_combined_transform("R|C"),
            Err(RigError::MissingLocalTransform { .. })
        ));
    }

    #[test]
    fn move_joint_shifts_translation_only() {
        let mut hierarchy = rotated_chain();
        let local = compose_trs(
            DVec3::new(0.5, 0.0, 0.0),
            DVec3::new(0.0, 45.0, 0.0),
            DVec3::new(1.5, 1.0, 1.0),
        );
        hierarchy.set_local_transform("hips|spine|hand", local).unwrap();
        let before = hierarchy.get_combined_transform("hips|spine|hand").unwrap();

        hierarchy
            .move_joint("hips|spine|hand", 1.0, -2.0, 0.5)
            .unwrap();
        let after = hierarchy.get_combined_transform("hips|spine|hand").unwrap();

        assert_abs_diff_eq!(
            after.w_axis.truncate(),
            before.w_axis.truncate() + DVec3::new(1.0, -2.0, 0.5),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(after.x_axis, before.x_axis, epsilon = 1e-9);
        assert_abs_diff_eq!(after.y_axis, before.y_axis, epsilon = 1e-9);
        assert_abs_diff_eq!(after.z_axis, before.z_axis, epsilon = 1e-9);
    }

    #[test]
    fn move_joint_on_singular_global() {
        let mut root = joint("flat", "", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        root.scale = DVec3::new(1.0, 1.0, 0.0);
        root.world_scaling = DVec3::new(1.0, 1.0, 0.0);
        let mut hierarchy = JointHierarchy::new([root]).unwrap();
        hierarchy.reset_local_transform("flat").unwrap();

        assert!(matches!(
            hierarchy.move_joint("flat", 1.0, 0.0, 0.0),
            Err(RigError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn move_joint_on_small_scale_global() {
        // det = 1e-15 but the basis is still orthogonal.
        let mut root = joint("tiny", "", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        root.scale = DVec3::splat(1e-5);
        root.world_scaling = DVec3::splat(1e-5);
        let mut hierarchy = JointHierarchy::new([root]).unwrap();
        hierarchy.reset_local_transform("tiny").unwrap();
        let before = hierarchy.get_combined_transform("tiny").unwrap();

        hierarchy.move_joint("tiny", 1.0, 2.0, -3.0).unwrap();
        let after = hierarchy.get_combined_transform("tiny").unwrap();

        assert_abs_diff_eq!(
            after.w_axis.truncate() - before.w_axis.truncate(),
            DVec3::new(1.0, 2.0, -3.0),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(after.x_axis, before.x_axis, epsilon = 1e-12);
    }

    #[test]
    fn sheared_flat_global_is_singular() {
        let flat = DMat4::from_cols(
            glam::DVec4::X,
            glam::DVec4::new(1.0, 1e-14, 0.0, 0.0),
            glam::DVec4::Z,
            glam::DVec4::W,
        );
        assert!(matches!(
            invert_global("R|C", &flat),
            Err(RigError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn duplicate_short_names() {
        let result = JointHierarchy::new([
            joint("a|hand", "", [0.0; 3], [0.0; 3]),
            joint("b|hand", "", [0.0; 3], [0.0; 3]),
        ]);
        assert!(matches!(
            result,
            Err(RigError::DuplicateKey { kind: NameKind::Joint, ref name }) if name == "hand"
        ));
    }

    #[test]
    fn unknown_parent() {
        let result = JointHierarchy::new([joint("a|b", "a", [0.0; 3], [0.0; 3])]);
        assert!(matches!(result, Err(RigError::UnknownName { .. })));
    }

    #[test]
    fn cycles_are_rejected() {
        let result = JointHierarchy::new([
            joint("x", "z", [0.0; 3], [0.0; 3]),
            joint("y", "x", [0.0; 3], [0.0; 3]),
            joint("z", "y", [0.0; 3], [0.0; 3]),
        ]);
        assert!(matches!(result, Err(RigError::Cycle { .. })));

        let result = JointHierarchy::new([joint("self", "self", [0.0; 3], [0.0; 3])]);
        assert!(matches!(result, Err(RigError::Cycle { .. })));
    }

    #[test]
    fn name_lookups() {
        let hierarchy = chain();
        assert_eq!(hierarchy.get_name_by_short_name("C").unwrap(), "R|C");
        assert_eq!(hierarchy.get_joint_by_short_name("C").unwrap().parent_index, Some(0));
        assert_eq!(hierarchy.get_joint_by_name("R").unwrap().short_name, "R");
        assert_eq!(hierarchy.resolve_name("C").unwrap(), "R|C");
        assert_eq!(hierarchy.resolve_name("R|C").unwrap(), "R|C");
        assert!(hierarchy.get_joint_by_name("C").is_err());
        assert!(hierarchy.get_name_by_short_name("missing").is_err());
    }
}
