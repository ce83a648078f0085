//! 笛卡尔空间类型

use std::fmt;

use nalgebra::{Rotation3, Vector3};
use serde::Serialize;

/// 末端位姿
///
/// 位置单位为毫米，姿态为 `rx, ry, rz` 欧拉角（度，ZYX 顺序）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CartesianPose {
    /// 位置 `[x, y, z]`（毫米）
    pub position: [f64; 3],
    /// 姿态 `[rx, ry, rz]`（度）
    pub orientation: [f64; 3],
}

impl CartesianPose {
    /// 创建位姿
    pub const fn new(position: [f64; 3], orientation: [f64; 3]) -> Self {
        CartesianPose {
            position,
            orientation,
        }
    }

    /// 从硬件的 `[x, y, z, rx, ry, rz]` 向量创建
    pub fn from_coords(coords: &[f64; 6]) -> Self {
        CartesianPose {
            position: [coords[0], coords[1], coords[2]],
            orientation: [coords[3], coords[4], coords[5]],
        }
    }

    /// 转换为硬件的 `[x, y, z, rx, ry, rz]` 向量
    pub fn to_coords(&self) -> [f64; 6] {
        let [x, y, z] = self.position;
        let [rx, ry, rz] = self.orientation;
        [x, y, z, rx, ry, rz]
    }

    /// 位置向量
    pub fn position_vector(&self) -> Vector3<f64> {
        Vector3::from(self.position)
    }

    /// 姿态对应的旋转矩阵
    ///
    /// `R = Rz(rz) · Ry(ry) · Rx(rx)`；第 0 列是末端 X 轴，第 2 列是末端 Z 轴。
    pub fn rotation(&self) -> Rotation3<f64> {
        let [rx, ry, rz] = self.orientation;
        Rotation3::from_euler_angles(rx.to_radians(), ry.to_radians(), rz.to_radians())
    }
}

impl fmt::Display for CartesianPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.position;
        let [rx, ry, rz] = self.orientation;
        write!(
            f,
            "({:.2}, {:.2}, {:.2}) mm / ({:.2}, {:.2}, {:.2})°",
            x, y, z, rx, ry, rz
        )
    }
}
