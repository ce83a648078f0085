//! 错误类型体系
//!
//! 区分硬件不可用、硬件命令失败、输入校验失败、运动学无解和忙碌四类主要错误。
//! 除 `HardwareUnavailable` 外，出错的操作都不会修改 `RobotMotionState`。

use cobot_driver::DriverError;
use cobot_tools::StoreError;
use thiserror::Error;

use crate::state::SequenceKind;

/// 机器人错误类型
#[derive(Debug, Error)]
pub enum RobotError {
    // ==================== Hardware ====================
    /// 没有硬件连接
    #[error("Robot hardware not available")]
    HardwareUnavailable,

    /// 驱动调用失败或返回了无效数据
    #[error("Hardware command failed: {0}")]
    HardwareCommandFailure(String),

    // ==================== Recoverable ====================
    /// 输入校验失败
    #[error("Validation error: {0}")]
    Validation(String),

    /// 正 / 逆运动学无解
    #[error("Kinematics unsolvable: {0}")]
    KinematicsUnsolvable(String),

    /// 已有运动序列在执行
    #[error("Robot is busy: {active} in progress")]
    Busy {
        /// 正在执行的任务
        active: BusyReason,
    },

    /// 理想状态尚未初始化
    #[error("Robot state not initialized")]
    NotInitialized,

    // ==================== Other ====================
    /// 存储读写失败
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// 后台线程创建失败
    #[error("Failed to spawn sequence thread: {0}")]
    Spawn(String),
}

/// 忙碌原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyReason {
    /// 正在录制
    Recording,
    /// 正在执行运动序列
    Sequence(SequenceKind),
}

impl std::fmt::Display for BusyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusyReason::Recording => write!(f, "recording"),
            BusyReason::Sequence(kind) => write!(f, "{}", kind),
        }
    }
}

impl RobotError {
    /// 是否可恢复（调用方修正输入或稍后重试即可）
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::KinematicsUnsolvable(_)
                | Self::Busy { .. }
                | Self::NotInitialized
        )
    }

    /// 是否为硬件错误
    pub fn is_hardware(&self) -> bool {
        matches!(
            self,
            Self::HardwareUnavailable | Self::HardwareCommandFailure(_)
        )
    }

    /// 创建校验错误
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 创建运动学无解错误
    pub fn unsolvable(msg: impl Into<String>) -> Self {
        Self::KinematicsUnsolvable(msg.into())
    }

    /// 创建忙碌错误
    pub fn busy(active: BusyReason) -> Self {
        Self::Busy { active }
    }
}

impl From<DriverError> for RobotError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotConnected => RobotError::HardwareUnavailable,
            other => RobotError::HardwareCommandFailure(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, RobotError>;
