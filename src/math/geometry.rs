//! 几何数学工具模块
//!
//! 网格后处理：
//! - 法线重建（从三角形面计算顶点法线）
//! - 切线空间计算（用于法线贴图）

use super::Vector3;
use crate::geometry::vertex::Vertex;

/// UV 行列式小于该值的三角形视为退化，不参与切线累加
const DEGENERATE_UV_EPSILON: f32 = 1e-8;

/// 从三角形面重建顶点法线
///
/// 每个三角形的面法线 `cross(p1 - p0, p2 - p0)`（未归一化，按面积加权）
/// 累加到三个顶点，最后逐顶点归一化。
pub fn reconstruct_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accumulated = vec![Vector3::zeros(); vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];

        let p0 = Vector3::from(vertices[i0].position);
        let p1 = Vector3::from(vertices[i1].position);
        let p2 = Vector3::from(vertices[i2].position);

        let face_normal = (p1 - p0).cross(&(p2 - p0));

        accumulated[i0] += face_normal;
        accumulated[i1] += face_normal;
        accumulated[i2] += face_normal;
    }

    for (vertex, normal) in vertices.iter_mut().zip(accumulated) {
        vertex.normal = normalize_or_zero(&normal).into();
    }
}

/// 计算顶点的切线向量
///
/// 1. 对每个三角形，由位置差和 UV 差解出指向 +U 的切线，累加到三个顶点
/// 2. 逐顶点 Gram-Schmidt 正交化：`t = normalize(t - n * dot(n, t))`
///
/// 顶点需已有有效法线。UV 退化的三角形不贡献切线。
pub fn compute_tangent_space(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accumulated = vec![Vector3::zeros(); vertices.len()];

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let (v0, v1, v2) = (&vertices[i0], &vertices[i1], &vertices[i2]);

        let dp1 = Vector3::from(v1.position) - Vector3::from(v0.position);
        let dp2 = Vector3::from(v2.position) - Vector3::from(v0.position);

        let (s1, t1) = (v1.uv[0] - v0.uv[0], v1.uv[1] - v0.uv[1]);
        let (s2, t2) = (v2.uv[0] - v0.uv[0], v2.uv[1] - v0.uv[1]);

        let det = s1 * t2 - s2 * t1;
        if det.abs() < DEGENERATE_UV_EPSILON {
            continue;
        }

        let tangent = (dp1 * t2 - dp2 * t1) / det;

        accumulated[i0] += tangent;
        accumulated[i1] += tangent;
        accumulated[i2] += tangent;
    }

    for (vertex, tangent) in vertices.iter_mut().zip(accumulated) {
        let normal = Vector3::from(vertex.normal);
        let orthogonal = tangent - normal * normal.dot(&tangent);
        vertex.tangent = normalize_or_zero(&orthogonal).into();
    }
}

/// 长度接近零时返回零向量
#[inline]
fn normalize_or_zero(v: &Vector3) -> Vector3 {
    v.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
}
