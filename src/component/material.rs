//! 材质组件
//!
//! 颜色、UV 变换和一张纹理下标表。下标指向着色器可见堆中的 SRV，
//! 纹理本身由外部加载。

use crate::core::error::{MaterialError, Result};
use crate::core::scene::MaterialConfig;
use crate::math::{Vector2, Vector3};
use crate::renderer::buffers::{MaterialRecord, MAX_MATERIAL_TEXTURES};

/// 材质
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    color_tint: Vector3,
    uv_scale: Vector2,
    uv_offset: Vector2,
    texture_indices: [u32; MAX_MATERIAL_TEXTURES],
    texture_count: usize,
}

impl Material {
    /// 白色、UV 不变换、没有纹理
    pub fn new() -> Self {
        Self {
            color_tint: Vector3::new(1.0, 1.0, 1.0),
            uv_scale: Vector2::new(1.0, 1.0),
            uv_offset: Vector2::zeros(),
            texture_indices: [0; MAX_MATERIAL_TEXTURES],
            texture_count: 0,
        }
    }

    /// 从场景配置创建
    pub fn from_config(config: &MaterialConfig) -> Result<Self> {
        let mut material = Self::new();
        material.set_color_tint(Vector3::from(config.color_tint));
        material.set_uv_scale(Vector2::from(config.uv_scale));
        material.set_uv_offset(Vector2::from(config.uv_offset));
        for &texture in &config.textures {
            material.add_texture(texture)?;
        }
        Ok(material)
    }

    /// 追加一个纹理下标
    ///
    /// 表满时返回 [`MaterialError::TextureTableFull`]，材质不变。
    pub fn add_texture(&mut self, texture_index: u32) -> Result<()> {
        if self.texture_count >= MAX_MATERIAL_TEXTURES {
            return Err(MaterialError::TextureTableFull {
                capacity: MAX_MATERIAL_TEXTURES,
            }
            .into());
        }
        self.texture_indices[self.texture_count] = texture_index;
        self.texture_count += 1;
        Ok(())
    }

    /// 清空纹理表
    pub fn clear_textures(&mut self) {
        self.texture_indices = [0; MAX_MATERIAL_TEXTURES];
        self.texture_count = 0;
    }

    /// 已添加的纹理下标
    pub fn textures(&self) -> &[u32] {
        &self.texture_indices[..self.texture_count]
    }

    pub fn color_tint(&self) -> Vector3 {
        self.color_tint
    }

    pub fn set_color_tint(&mut self, color_tint: Vector3) {
        self.color_tint = color_tint;
    }

    pub fn uv_scale(&self) -> Vector2 {
        self.uv_scale
    }

    pub fn set_uv_scale(&mut self, uv_scale: Vector2) {
        self.uv_scale = uv_scale;
    }

    pub fn uv_offset(&self) -> Vector2 {
        self.uv_offset
    }

    pub fn set_uv_offset(&mut self, uv_offset: Vector2) {
        self.uv_offset = uv_offset;
    }

    /// 打包为常量缓冲区记录
    pub fn to_record(&self) -> MaterialRecord {
        MaterialRecord {
            uv_scale: self.uv_scale.into(),
            uv_offset: self.uv_offset.into(),
            color_tint: self.color_tint.into(),
            texture_count: self.texture_count as u32,
            texture_indices: self.texture_indices,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RenderError;

    #[test]
    fn test_defaults() {
        let material = Material::new();
        assert_eq!(material.color_tint(), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(material.uv_scale(), Vector2::new(1.0, 1.0));
        assert_eq!(material.uv_offset(), Vector2::zeros());
        assert!(material.textures().is_empty());
    }

    #[test]
    fn test_texture_table_full() {
        let mut material = Material::new();
        for i in 0..MAX_MATERIAL_TEXTURES as u32 {
            material.add_texture(i + 100).unwrap();
        }

        let err = material.add_texture(7).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Material(MaterialError::TextureTableFull { capacity: 32 })
        ));
        assert_eq!(material.textures().len(), MAX_MATERIAL_TEXTURES);
        assert_eq!(material.textures()[31], 131);
    }

    #[test]
    fn test_clear_textures() {
        let mut material = Material::new();
        material.add_texture(3).unwrap();
        material.add_texture(9).unwrap();
        material.clear_textures();

        assert!(material.textures().is_empty());
        assert_eq!(material.to_record().texture_indices, [0; MAX_MATERIAL_TEXTURES]);
    }

    #[test]
    fn test_record() {
        let mut material = Material::new();
        material.set_color_tint(Vector3::new(0.5, 0.25, 1.0));
        material.set_uv_scale(Vector2::new(2.0, 2.0));
        material.add_texture(4).unwrap();

        let record = material.to_record();
        assert_eq!(record.color_tint, [0.5, 0.25, 1.0]);
        assert_eq!(record.uv_scale, [2.0, 2.0]);
        assert_eq!(record.uv_offset, [0.0, 0.0]);
        assert_eq!(record.texture_count, 1);
        assert_eq!(record.texture_indices[0], 4);
    }

    #[test]
    fn test_from_config_rejects_too_many_textures() {
        let config = MaterialConfig {
            textures: (0..40).collect(),
            ..MaterialConfig::default()
        };
        assert!(Material::from_config(&config).is_err());

        let config = MaterialConfig {
            textures: vec![1, 2],
            ..MaterialConfig::default()
        };
        assert_eq!(Material::from_config(&config).unwrap().textures(), &[1, 2]);
    }
}
