//! # 平面标定记录
//!
//! 一个标定就是一个存储下来的正交坐标系：平面上一点 + 法向 + 两条平面内轴。
//! 几何计算在 `cobot-client::calibration` 中，这里只有数据结构。

use serde::{Deserialize, Serialize};

use crate::limits::JointAngles;

/// 三维向量（世界坐标，毫米或单位向量）
pub type Vec3 = [f64; 3];

/// 标定参考点
///
/// 手工保存的标定点三项都有；由末端姿态创建的标定只记录标定时的世界坐标和关节角度。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// 屏幕像素坐标
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<[f64; 2]>,
    /// 世界坐标（毫米）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<Vec3>,
    /// 对应的关节角度（度）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angles: Option<JointAngles>,
}

impl ReferencePoint {
    /// 同时带屏幕和世界坐标的参考点
    pub fn mapped(screen: [f64; 2], world: Vec3) -> Self {
        ReferencePoint {
            screen: Some(screen),
            world: Some(world),
            angles: None,
        }
    }

    /// 屏幕和世界坐标都在时返回这一对
    pub fn screen_world(&self) -> Option<([f64; 2], Vec3)> {
        Some((self.screen?, self.world?))
    }
}

/// 平面标定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneCalibration {
    /// 名称
    pub name: String,
    /// 平面上一点（毫米）
    pub point: Vec3,
    /// 单位法向
    pub normal: Vec3,
    /// 平面内 X 轴
    pub local_x_axis: Vec3,
    /// 平面内 Y 轴（`normal × local_x_axis`）
    pub local_y_axis: Vec3,
    /// 标定时的末端姿态 `rx, ry, rz`（度）
    pub orientation: Vec3,
    /// 参考点
    #[serde(rename = "points", default, skip_serializing_if = "Vec::is_empty")]
    pub reference_points: Vec<ReferencePoint>,
    /// 创建时间（unix 秒）
    #[serde(default)]
    pub created: u64,
    /// 最后修改时间（unix 秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
}

impl PlaneCalibration {
    /// 同时带屏幕和世界坐标的参考点
    pub fn mapped_points(&self) -> Vec<([f64; 2], Vec3)> {
        self.reference_points
            .iter()
            .filter_map(ReferencePoint::screen_world)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_document_without_points() {
        let json = r#"{
            "name": "wall",
            "point": [0, 0, 200],
            "normal": [0, 0, 1],
            "local_x_axis": [1, 0, 0],
            "local_y_axis": [0, 1, 0],
            "orientation": [0, 0, 0]
        }"#;
        let cal: PlaneCalibration = serde_json::from_str(json).unwrap();
        assert!(cal.reference_points.is_empty());
        assert_eq!(cal.created, 0);
        assert!(cal.mapped_points().is_empty());
    }

    #[test]
    fn test_points_field_name() {
        let cal = PlaneCalibration {
            name: "wall".into(),
            point: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            local_x_axis: [1.0, 0.0, 0.0],
            local_y_axis: [0.0, 1.0, 0.0],
            orientation: [0.0; 3],
            reference_points: vec![
                ReferencePoint::mapped([0.0, 0.0], [1.0, 2.0, 3.0]),
                ReferencePoint {
                    world: Some([4.0, 5.0, 6.0]),
                    ..Default::default()
                },
            ],
            created: 1,
            updated: None,
        };
        let value = serde_json::to_value(&cal).unwrap();
        assert!(value.get("points").is_some());
        assert!(value.get("reference_points").is_none());
        assert_eq!(cal.mapped_points().len(), 1);
    }
}
