//! 已保存的关节位置

use serde::{Deserialize, Serialize};

use crate::limits::{JOINT_LIMITS, JointAngles};
use crate::now_unix;

fn default_enabled() -> bool {
    true
}

/// 已保存的位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPosition {
    /// 关节角度（度，已限位）
    pub angles: JointAngles,
    /// 创建时间（unix 秒）
    #[serde(default)]
    pub created: u64,
    /// 是否在指令面板中显示
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SavedPosition {
    /// 创建位置，角度会先限位
    pub fn new(angles: &JointAngles) -> Self {
        SavedPosition {
            angles: JOINT_LIMITS.clamp(angles),
            created: now_unix(),
            enabled: true,
        }
    }
}
