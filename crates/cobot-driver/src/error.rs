//! 驱动层错误类型定义

use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// 没有可用的硬件连接
    #[error("Robot not connected")]
    NotConnected,

    /// 硬件 SDK 调用失败
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed {
        /// 原语名称
        command: &'static str,
        /// 失败原因
        reason: String,
    },

    /// 硬件没有返回数据
    #[error("Command '{command}' returned no data")]
    EmptyResponse {
        /// 原语名称
        command: &'static str,
    },

    /// 返回数据长度不对
    #[error("Command '{command}' returned {actual} values (expected {expected})")]
    InvalidResponse {
        /// 原语名称
        command: &'static str,
        /// 期望长度
        expected: usize,
        /// 实际长度
        actual: usize,
    },

    /// 返回数据包含 NaN / Inf
    #[error("Command '{command}' returned non-finite values")]
    NonFinite {
        /// 原语名称
        command: &'static str,
    },
}

impl DriverError {
    /// 构造 `CommandFailed`
    pub fn command_failed(command: &'static str, reason: impl Into<String>) -> Self {
        DriverError::CommandFailed {
            command,
            reason: reason.into(),
        }
    }

    /// 是否为"返回数据无效"类错误（空、长度不对、非有限值）
    pub fn is_malformed_response(&self) -> bool {
        matches!(
            self,
            DriverError::EmptyResponse { .. }
                | DriverError::InvalidResponse { .. }
                | DriverError::NonFinite { .. }
        )
    }
}
