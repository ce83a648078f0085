//! # 关节限位与固定位姿
//!
//! 限位表是静态配置，运行期不会被修改。所有要发给硬件或写入状态的角度都要先经过
//! [`JointLimits::clamp`]。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 关节数量
pub const JOINT_COUNT: usize = 6;

/// 六个关节的角度（度）
pub type JointAngles = [f64; JOINT_COUNT];

/// 关节枚举
///
/// 用于单关节点动等按下标访问的场景，避免越界。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Joint {
    /// 关节 1（基座旋转）
    J1 = 0,
    /// 关节 2（肩部）
    J2 = 1,
    /// 关节 3（肘部）
    J3 = 2,
    /// 关节 4（腕部 1）
    J4 = 3,
    /// 关节 5（腕部 2）
    J5 = 4,
    /// 关节 6（末端旋转）
    J6 = 5,
}

impl Joint {
    /// 所有关节
    pub const ALL: [Joint; JOINT_COUNT] = [
        Joint::J1,
        Joint::J2,
        Joint::J3,
        Joint::J4,
        Joint::J5,
        Joint::J6,
    ];

    /// 关节下标（0-5）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 从下标创建（范围检查）
    pub fn from_index(index: usize) -> Option<Self> {
        Joint::ALL.get(index).copied()
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "J{}", self.index() + 1)
    }
}

/// 单关节限位（度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimit {
    /// 下限
    pub min: f64,
    /// 上限
    pub max: f64,
}

impl JointLimit {
    /// 创建限位
    pub const fn new(min: f64, max: f64) -> Self {
        JointLimit { min, max }
    }

    /// 限制到范围内；NaN 按 0 处理
    #[inline]
    pub fn clamp(&self, angle: f64) -> f64 {
        let angle = if angle.is_nan() { 0.0 } else { angle };
        angle.clamp(self.min, self.max)
    }

    /// 是否在范围内
    #[inline]
    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min && angle <= self.max
    }
}

/// 六关节限位表
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits(pub [JointLimit; JOINT_COUNT]);

/// 机械臂限位表
pub const JOINT_LIMITS: JointLimits = JointLimits([
    JointLimit::new(-168.0, 168.0),
    JointLimit::new(-135.0, 135.0),
    JointLimit::new(-145.0, 145.0),
    JointLimit::new(-148.0, 148.0),
    JointLimit::new(-168.0, 168.0),
    JointLimit::new(-180.0, 180.0),
]);

/// 回零位（运输 / 收纳姿态）
pub const HOME_POSITION: JointAngles = [7.11, -135.0, 142.91, 36.56, 83.67, -0.79];

/// 伸展位
pub const EXTEND_POSITION: JointAngles = [0.0; JOINT_COUNT];

impl JointLimits {
    /// 逐元素限位（全函数，没有失败情况）
    pub fn clamp(&self, angles: &JointAngles) -> JointAngles {
        let mut out = *angles;
        for (value, limit) in out.iter_mut().zip(self.0.iter()) {
            *value = limit.clamp(*value);
        }
        out
    }

    /// 单关节限位
    pub fn clamp_joint(&self, joint: Joint, angle: f64) -> f64 {
        self.0[joint.index()].clamp(angle)
    }

    /// 所有关节是否都在限位内
    pub fn contains(&self, angles: &JointAngles) -> bool {
        angles
            .iter()
            .zip(self.0.iter())
            .all(|(a, limit)| limit.contains(*a))
    }

    /// 指定关节的限位
    pub fn get(&self, joint: Joint) -> JointLimit {
        self.0[joint.index()]
    }

    /// `(min, max)` 对（状态上报用）
    pub fn as_pairs(&self) -> [(f64, f64); JOINT_COUNT] {
        self.0.map(|l| (l.min, l.max))
    }
}

impl Default for JointLimits {
    fn default() -> Self {
        JOINT_LIMITS
    }
}

/// 从切片构造关节角度：长度必须为 6 且全部有限
pub fn angles_from_slice(values: &[f64]) -> Option<JointAngles> {
    let angles: JointAngles = values.try_into().ok()?;
    angles.iter().all(|v| v.is_finite()).then_some(angles)
}

/// 速度是否合法（1-100）
#[inline]
pub fn validate_speed(speed: u8) -> bool {
    (1..=100).contains(&speed)
}

/// 名称最大长度
pub const MAX_NAME_LEN: usize = 50;

/// 名称中禁止出现的字符
const INVALID_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// 位置 / 程序 / 标定名称校验
pub fn validate_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && name.chars().count() <= MAX_NAME_LEN
        && !name.chars().any(|c| INVALID_NAME_CHARS.contains(&c))
}
