//! Transform 层级
//!
//! 管理场景中所有节点的位置、旋转（pitch, yaw, roll 弧度）和缩放，以及父子关系。
//!
//! 节点存放在 [`TransformHierarchy`] 持有的 `slotmap` 中，外部只拿到带代数的
//! [`TransformId`]。节点被销毁后旧句柄返回 [`HierarchyError::StaleHandle`]，
//! 不会悬空。
//!
//! # 缓存与脏标记
//!
//! - `matrices_dirty`：世界矩阵和逆转置矩阵需要重算。修改位置、旋转、缩放或
//!   父子关系时标记节点及其全部后代
//! - `directionals_dirty`：forward/right/up 需要重算。只有修改旋转时标记
//!
//! 读取时才重算（先解析父节点），然后清除标记。

use slotmap::{new_key_type, SlotMap};

use crate::core::error::{HierarchyError, Result};
use crate::math::{matrix, quaternion, Matrix4, Vector3};

new_key_type! {
    /// Transform 节点句柄
    pub struct TransformId;
}

#[derive(Debug, Clone)]
struct TransformNode {
    position: Vector3,
    /// (pitch, yaw, roll)
    rotation: Vector3,
    scale: Vector3,

    world: Matrix4,
    world_inverse_transpose: Matrix4,
    forward: Vector3,
    right: Vector3,
    up: Vector3,

    matrices_dirty: bool,
    directionals_dirty: bool,

    parent: Option<TransformId>,
    children: Vec<TransformId>,
}

impl TransformNode {
    fn new() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            world: Matrix4::identity(),
            world_inverse_transpose: Matrix4::identity(),
            forward: Vector3::z(),
            right: Vector3::x(),
            up: Vector3::y(),
            matrices_dirty: false,
            directionals_dirty: false,
            parent: None,
            children: Vec::new(),
        }
    }

    fn local_matrix(&self) -> Matrix4 {
        matrix::translation_rotation_scale(
            &self.position,
            &quaternion::from_pitch_yaw_roll(&self.rotation),
            &self.scale,
        )
    }
}

/// Transform 节点的集合
#[derive(Debug, Default)]
pub struct TransformHierarchy {
    nodes: SlotMap<TransformId, TransformNode>,
}

impl TransformHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建单位变换的根节点
    pub fn create(&mut self) -> TransformId {
        self.nodes.insert(TransformNode::new())
    }

    /// 创建位于 `position` 的根节点
    pub fn create_at(&mut self, position: Vector3) -> TransformId {
        let mut node = TransformNode::new();
        node.position = position;
        node.matrices_dirty = true;
        self.nodes.insert(node)
    }

    /// 销毁节点
    ///
    /// 节点从父节点上摘下，子节点保留局部值并成为根节点。
    pub fn destroy(&mut self, id: TransformId) -> Result<()> {
        self.node(id)?;
        self.detach(id);
        self.clear_children(id)?;
        self.nodes.remove(id);
        Ok(())
    }

    pub fn contains(&self, id: TransformId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ---- 局部值 ----

    pub fn position(&self, id: TransformId) -> Result<Vector3> {
        Ok(self.node(id)?.position)
    }

    /// (pitch, yaw, roll) 弧度
    pub fn rotation(&self, id: TransformId) -> Result<Vector3> {
        Ok(self.node(id)?.rotation)
    }

    pub fn scale(&self, id: TransformId) -> Result<Vector3> {
        Ok(self.node(id)?.scale)
    }

    pub fn set_position(&mut self, id: TransformId, position: Vector3) -> Result<()> {
        self.node_mut(id)?.position = position;
        self.mark_matrices_dirty(id);
        Ok(())
    }

    pub fn set_rotation(&mut self, id: TransformId, pitch_yaw_roll: Vector3) -> Result<()> {
        self.node_mut(id)?.rotation = pitch_yaw_roll;
        self.mark_all_dirty(id);
        Ok(())
    }

    pub fn set_scale(&mut self, id: TransformId, scale: Vector3) -> Result<()> {
        self.node_mut(id)?.scale = scale;
        self.mark_matrices_dirty(id);
        Ok(())
    }

    pub fn set_uniform_scale(&mut self, id: TransformId, scale: f32) -> Result<()> {
        self.set_scale(id, Vector3::new(scale, scale, scale))
    }

    /// 沿世界轴平移
    pub fn move_absolute(&mut self, id: TransformId, offset: Vector3) -> Result<()> {
        self.node_mut(id)?.position += offset;
        self.mark_matrices_dirty(id);
        Ok(())
    }

    /// 沿节点自身的旋转后的轴平移
    pub fn move_relative(&mut self, id: TransformId, offset: Vector3) -> Result<()> {
        let node = self.node_mut(id)?;
        let rotated = quaternion::from_pitch_yaw_roll(&node.rotation) * offset;
        node.position += rotated;
        self.mark_matrices_dirty(id);
        Ok(())
    }

    /// 累加 (pitch, yaw, roll)
    pub fn rotate(&mut self, id: TransformId, pitch_yaw_roll: Vector3) -> Result<()> {
        self.node_mut(id)?.rotation += pitch_yaw_roll;
        self.mark_all_dirty(id);
        Ok(())
    }

    /// 逐分量乘以缩放
    pub fn scale_by(&mut self, id: TransformId, scale: Vector3) -> Result<()> {
        let node = self.node_mut(id)?;
        node.scale.component_mul_assign(&scale);
        self.mark_matrices_dirty(id);
        Ok(())
    }

    // ---- 派生值 ----

    /// 世界矩阵 `ParentWorld * T * R * S`
    pub fn world_matrix(&mut self, id: TransformId) -> Result<Matrix4> {
        self.update_matrices(id)?;
        Ok(self.node(id)?.world)
    }

    /// 世界矩阵的逆转置，用于变换法线
    pub fn world_inverse_transpose_matrix(&mut self, id: TransformId) -> Result<Matrix4> {
        self.update_matrices(id)?;
        Ok(self.node(id)?.world_inverse_transpose)
    }

    /// 局部 +Z 经自身旋转后的方向
    pub fn forward(&mut self, id: TransformId) -> Result<Vector3> {
        Ok(self.update_directionals(id)?.forward)
    }

    /// 局部 +X 经自身旋转后的方向
    pub fn right(&mut self, id: TransformId) -> Result<Vector3> {
        Ok(self.update_directionals(id)?.right)
    }

    /// 局部 +Y 经自身旋转后的方向
    pub fn up(&mut self, id: TransformId) -> Result<Vector3> {
        Ok(self.update_directionals(id)?.up)
    }

    pub fn matrices_dirty(&self, id: TransformId) -> Result<bool> {
        Ok(self.node(id)?.matrices_dirty)
    }

    pub fn directionals_dirty(&self, id: TransformId) -> Result<bool> {
        Ok(self.node(id)?.directionals_dirty)
    }

    // ---- 父子关系 ----

    pub fn parent(&self, id: TransformId) -> Result<Option<TransformId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: TransformId) -> Result<&[TransformId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn child_count(&self, id: TransformId) -> Result<usize> {
        Ok(self.node(id)?.children.len())
    }

    pub fn child(&self, id: TransformId, index: usize) -> Result<TransformId> {
        let children = &self.node(id)?.children;
        children.get(index).copied().ok_or_else(|| {
            HierarchyError::ChildIndexOutOfRange {
                index,
                count: children.len(),
            }
            .into()
        })
    }

    /// 设置父节点，`None` 表示成为根节点
    ///
    /// 局部值保持不变，所以世界位置会跟随新的父节点。
    pub fn set_parent(&mut self, child: TransformId, parent: Option<TransformId>) -> Result<()> {
        self.node(child)?;

        let Some(parent) = parent else {
            if self.detach(child) {
                self.mark_matrices_dirty(child);
            }
            return Ok(());
        };

        self.node(parent)?;
        if self.is_ancestor_or_self(child, parent) {
            return Err(HierarchyError::CycleDetected.into());
        }
        if self.node(child)?.parent == Some(parent) {
            return Ok(());
        }

        self.detach(child);
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.mark_matrices_dirty(child);
        Ok(())
    }

    /// 等价于 `set_parent(child, Some(parent))`
    pub fn add_child(&mut self, parent: TransformId, child: TransformId) -> Result<()> {
        self.set_parent(child, Some(parent))
    }

    /// 断开 `parent` 与它的子节点 `child`
    pub fn remove_child(&mut self, parent: TransformId, child: TransformId) -> Result<()> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(HierarchyError::ChildNotFound.into());
        }
        self.detach(child);
        self.mark_matrices_dirty(child);
        Ok(())
    }

    /// 所有子节点成为根节点
    pub fn clear_children(&mut self, id: TransformId) -> Result<()> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
            }
            self.mark_matrices_dirty(child);
        }
        Ok(())
    }

    // ---- 内部 ----

    fn node(&self, id: TransformId) -> Result<&TransformNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| HierarchyError::StaleHandle.into())
    }

    fn node_mut(&mut self, id: TransformId) -> Result<&mut TransformNode> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| HierarchyError::StaleHandle.into())
    }

    /// 从父节点的子列表中移除，返回之前是否有父节点
    fn detach(&mut self, id: TransformId) -> bool {
        let Some(parent) = self.nodes.get_mut(id).and_then(|node| node.parent.take()) else {
            return false;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|&c| c != id);
        }
        true
    }

    /// `ancestor` 是否为 `id` 本身或其祖先
    fn is_ancestor_or_self(&self, ancestor: TransformId, id: TransformId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.nodes.get(node_id).and_then(|node| node.parent);
        }
        false
    }

    fn mark_matrices_dirty(&mut self, id: TransformId) {
        self.mark_subtree(id, false);
    }

    fn mark_all_dirty(&mut self, id: TransformId) {
        self.mark_subtree(id, true);
    }

    fn mark_subtree(&mut self, id: TransformId, directionals: bool) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current) {
                node.matrices_dirty = true;
                if directionals {
                    node.directionals_dirty = true;
                }
                stack.extend_from_slice(&node.children);
            }
        }
    }

    fn update_matrices(&mut self, id: TransformId) -> Result<()> {
        let node = self.node(id)?;
        if !node.matrices_dirty {
            return Ok(());
        }

        let local = node.local_matrix();
        let parent = node.parent;
        let parent_world = match parent {
            Some(parent) => self.world_matrix(parent)?,
            None => Matrix4::identity(),
        };

        let world = parent_world * local;
        let node = self.node_mut(id)?;
        node.world = world;
        node.world_inverse_transpose = matrix::inverse_transpose(&world);
        node.matrices_dirty = false;
        Ok(())
    }

    fn update_directionals(&mut self, id: TransformId) -> Result<&TransformNode> {
        let node = self.node_mut(id)?;
        if node.directionals_dirty {
            let rotation = quaternion::from_pitch_yaw_roll(&node.rotation);
            node.forward = rotation * Vector3::z();
            node.right = rotation * Vector3::x();
            node.up = rotation * Vector3::y();
            node.directionals_dirty = false;
        }
        Ok(&*node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RenderError;
    use crate::math::constants::HALF_PI;
    use crate::math::utils::{matrix_approx_eq, vec3_approx_eq};

    fn expected_local(h: &TransformHierarchy, id: TransformId) -> Matrix4 {
        matrix::translation_rotation_scale(
            &h.position(id).unwrap(),
            &quaternion::from_pitch_yaw_roll(&h.rotation(id).unwrap()),
            &h.scale(id).unwrap(),
        )
    }

    fn hierarchy_error(err: RenderError) -> HierarchyError {
        match err {
            RenderError::Hierarchy(e) => e,
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_new_node_is_identity_and_clean() {
        let mut h = TransformHierarchy::new();
        let id = h.create();

        assert!(!h.matrices_dirty(id).unwrap());
        assert!(!h.directionals_dirty(id).unwrap());
        assert_eq!(h.world_matrix(id).unwrap(), Matrix4::identity());
        assert_eq!(h.forward(id).unwrap(), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(h.right(id).unwrap(), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(h.up(id).unwrap(), Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_create_at_starts_dirty() {
        let mut h = TransformHierarchy::new();
        let id = h.create_at(Vector3::new(1.0, 2.0, 3.0));

        assert!(h.matrices_dirty(id).unwrap());
        let world = h.world_matrix(id).unwrap();
        assert!(!h.matrices_dirty(id).unwrap());
        assert_eq!(world, Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_world_matches_composition_after_redundant_dirtying() {
        let mut h = TransformHierarchy::new();
        let parent = h.create_at(Vector3::new(0.0, 1.0, 0.0));
        let child = h.create();
        h.add_child(parent, child).unwrap();

        h.set_position(child, Vector3::new(1.0, 0.0, 0.0)).unwrap();
        h.set_position(child, Vector3::new(2.0, 0.0, 0.5)).unwrap();
        h.rotate(child, Vector3::new(0.1, 0.2, 0.3)).unwrap();
        h.rotate(parent, Vector3::new(0.0, 0.5, 0.0)).unwrap();
        h.scale_by(child, Vector3::new(2.0, 1.0, 0.5)).unwrap();
        h.set_uniform_scale(parent, 3.0).unwrap();
        h.world_matrix(child).unwrap();
        h.set_scale(parent, Vector3::new(1.5, 1.5, 1.5)).unwrap();
        h.move_absolute(parent, Vector3::new(0.0, 0.0, 1.0)).unwrap();
        h.move_relative(child, Vector3::new(0.0, 0.0, 1.0)).unwrap();

        let expected = expected_local(&h, parent) * expected_local(&h, child);
        let actual = h.world_matrix(child).unwrap();
        assert!(matrix_approx_eq(&actual, &expected, 1e-5));

        let wit = h.world_inverse_transpose_matrix(child).unwrap();
        let expected_wit = expected.try_inverse().unwrap().transpose();
        assert!(matrix_approx_eq(&wit, &expected_wit, 1e-4));
    }

    #[test]
    fn test_grandparent_moves_grandchild() {
        let mut h = TransformHierarchy::new();
        let a = h.create();
        let b = h.create_at(Vector3::new(1.0, 0.0, 0.0));
        let c = h.create_at(Vector3::new(0.0, 1.0, 0.0));
        h.add_child(a, b).unwrap();
        h.add_child(b, c).unwrap();

        let before = h.world_matrix(c).unwrap();
        assert!(vec3_approx_eq(
            &before.fixed_view::<3, 1>(0, 3).into_owned(),
            &Vector3::new(1.0, 1.0, 0.0),
            1e-6
        ));

        h.move_absolute(a, Vector3::new(0.0, 0.0, 5.0)).unwrap();
        assert!(h.matrices_dirty(b).unwrap());
        assert!(h.matrices_dirty(c).unwrap());

        let after = h.world_matrix(c).unwrap();
        assert_ne!(before, after);
        assert!(vec3_approx_eq(
            &after.fixed_view::<3, 1>(0, 3).into_owned(),
            &Vector3::new(1.0, 1.0, 5.0),
            1e-6
        ));
    }

    #[test]
    fn test_dirty_flags_per_operation() {
        let mut h = TransformHierarchy::new();
        let parent = h.create();
        let child = h.create();
        h.add_child(parent, child).unwrap();
        h.world_matrix(child).unwrap();

        h.rotate(parent, Vector3::new(0.0, 0.1, 0.0)).unwrap();
        assert!(h.matrices_dirty(parent).unwrap());
        assert!(h.directionals_dirty(parent).unwrap());
        assert!(h.matrices_dirty(child).unwrap());
        assert!(h.directionals_dirty(child).unwrap());

        // 平移和缩放只让矩阵失效，方向向量保持有效
        let ops: [fn(&mut TransformHierarchy, TransformId); 6] = [
            |h, id| h.set_position(id, Vector3::new(0.0, 3.0, 0.0)).unwrap(),
            |h, id| h.set_scale(id, Vector3::new(1.0, 2.0, 3.0)).unwrap(),
            |h, id| h.set_uniform_scale(id, 0.5).unwrap(),
            |h, id| h.move_absolute(id, Vector3::new(1.0, 0.0, 0.0)).unwrap(),
            |h, id| h.move_relative(id, Vector3::new(1.0, 0.0, 0.0)).unwrap(),
            |h, id| h.scale_by(id, Vector3::new(2.0, 2.0, 2.0)).unwrap(),
        ];
        for op in ops {
            h.world_matrix(child).unwrap();
            h.forward(parent).unwrap();
            h.forward(child).unwrap();
            op(&mut h, parent);
            assert!(h.matrices_dirty(parent).unwrap());
            assert!(h.matrices_dirty(child).unwrap());
            assert!(!h.directionals_dirty(parent).unwrap());
            assert!(!h.directionals_dirty(child).unwrap());
        }
    }

    #[test]
    fn test_yaw_quarter_turn_forward() {
        let mut h = TransformHierarchy::new();
        let id = h.create();
        h.set_rotation(id, Vector3::new(0.0, HALF_PI, 0.0)).unwrap();

        assert!(vec3_approx_eq(&h.forward(id).unwrap(), &Vector3::new(1.0, 0.0, 0.0), 1e-5));
        assert!(vec3_approx_eq(&h.right(id).unwrap(), &Vector3::new(0.0, 0.0, -1.0), 1e-5));
        assert!(!h.directionals_dirty(id).unwrap());
    }

    #[test]
    fn test_directionals_ignore_scale_and_parent() {
        let mut h = TransformHierarchy::new();
        let parent = h.create();
        let child = h.create();
        h.add_child(parent, child).unwrap();
        h.set_rotation(parent, Vector3::new(0.0, HALF_PI, 0.0)).unwrap();
        h.set_scale(child, Vector3::new(3.0, 0.5, 2.0)).unwrap();

        assert!(vec3_approx_eq(&h.forward(child).unwrap(), &Vector3::new(0.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn test_move_relative_follows_rotation() {
        let mut h = TransformHierarchy::new();
        let id = h.create();
        h.set_rotation(id, Vector3::new(0.0, HALF_PI, 0.0)).unwrap();
        h.move_relative(id, Vector3::new(0.0, 0.0, 2.0)).unwrap();

        assert!(vec3_approx_eq(&h.position(id).unwrap(), &Vector3::new(2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_reparenting_is_symmetric() {
        let mut h = TransformHierarchy::new();
        let a = h.create();
        let b = h.create();
        let child = h.create();

        h.add_child(a, child).unwrap();
        h.add_child(a, child).unwrap();
        assert_eq!(h.child_count(a).unwrap(), 1);

        h.set_parent(child, Some(b)).unwrap();
        assert_eq!(h.child_count(a).unwrap(), 0);
        assert_eq!(h.children(b).unwrap(), &[child]);
        assert_eq!(h.parent(child).unwrap(), Some(b));

        h.set_parent(child, None).unwrap();
        assert_eq!(h.parent(child).unwrap(), None);
        assert_eq!(h.child_count(b).unwrap(), 0);
    }

    #[test]
    fn test_cycles_rejected() {
        let mut h = TransformHierarchy::new();
        let a = h.create();
        let b = h.create();
        let c = h.create();
        h.add_child(a, b).unwrap();
        h.add_child(b, c).unwrap();

        let err = h.add_child(c, a).unwrap_err();
        assert_eq!(hierarchy_error(err), HierarchyError::CycleDetected);
        let err = h.set_parent(a, Some(a)).unwrap_err();
        assert_eq!(hierarchy_error(err), HierarchyError::CycleDetected);

        assert_eq!(h.parent(a).unwrap(), None);
    }

    #[test]
    fn test_remove_child() {
        let mut h = TransformHierarchy::new();
        let parent = h.create_at(Vector3::new(0.0, 5.0, 0.0));
        let child = h.create();
        let stranger = h.create();
        h.add_child(parent, child).unwrap();

        let err = h.remove_child(parent, stranger).unwrap_err();
        assert_eq!(hierarchy_error(err), HierarchyError::ChildNotFound);

        h.world_matrix(child).unwrap();
        h.remove_child(parent, child).unwrap();
        assert_eq!(h.parent(child).unwrap(), None);
        assert!(h.matrices_dirty(child).unwrap());
        assert_eq!(h.world_matrix(child).unwrap(), Matrix4::identity());
    }

    #[test]
    fn test_child_index_out_of_range() {
        let mut h = TransformHierarchy::new();
        let parent = h.create();
        let child = h.create();
        h.add_child(parent, child).unwrap();

        assert_eq!(h.child(parent, 0).unwrap(), child);
        let err = h.child(parent, 1).unwrap_err();
        assert_eq!(
            hierarchy_error(err),
            HierarchyError::ChildIndexOutOfRange { index: 1, count: 1 }
        );
    }

    #[test]
    fn test_clear_children() {
        let mut h = TransformHierarchy::new();
        let parent = h.create();
        let children: Vec<_> = (0..3).map(|_| h.create()).collect();
        for &c in &children {
            h.add_child(parent, c).unwrap();
        }

        h.clear_children(parent).unwrap();
        assert_eq!(h.child_count(parent).unwrap(), 0);
        for &c in &children {
            assert_eq!(h.parent(c).unwrap(), None);
        }
    }

    #[test]
    fn test_destroy_orphans_children() {
        let mut h = TransformHierarchy::new();
        let root = h.create();
        let middle = h.create_at(Vector3::new(10.0, 0.0, 0.0));
        let leaf = h.create_at(Vector3::new(1.0, 0.0, 0.0));
        h.add_child(root, middle).unwrap();
        h.add_child(middle, leaf).unwrap();

        h.destroy(middle).unwrap();

        assert!(!h.contains(middle));
        assert_eq!(h.len(), 2);
        assert_eq!(h.child_count(root).unwrap(), 0);
        assert_eq!(h.parent(leaf).unwrap(), None);
        assert_eq!(
            h.world_matrix(leaf).unwrap(),
            Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0))
        );

        let err = h.position(middle).unwrap_err();
        assert_eq!(hierarchy_error(err), HierarchyError::StaleHandle);
        assert!(h.destroy(middle).is_err());
    }

    #[test]
    fn test_singular_scale_falls_back_to_identity() {
        let mut h = TransformHierarchy::new();
        let id = h.create();
        h.set_scale(id, Vector3::new(1.0, 0.0, 1.0)).unwrap();
        assert_eq!(h.world_inverse_transpose_matrix(id).unwrap(), Matrix4::identity());
    }
}
