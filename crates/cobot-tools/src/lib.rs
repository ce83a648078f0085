//! # Cobot Tools - 共享数据结构
//!
//! **依赖原则**: 不依赖 `cobot-client`，避免循环依赖
//!
//! ## 包含模块
//!
//! - `limits` - 关节限位、固定位姿、名称与速度校验
//! - `procedure` - 程序步骤（纯数据结构）
//! - `position` - 已保存的关节位置
//! - `calibration` - 平面标定记录
//! - `store` - JSON 文档存储
//! - `config` - TOML 应用配置

pub mod calibration;
pub mod config;
pub mod error;
pub mod limits;
pub mod position;
pub mod procedure;
pub mod store;

// 重新导出常用类型
pub use calibration::{PlaneCalibration, ReferencePoint, Vec3};
pub use config::{AppConfig, MotionConfig, RobotConfig, StorageConfig};
pub use error::{ConfigError, StoreError};
pub use limits::{
    EXTEND_POSITION, HOME_POSITION, JOINT_COUNT, JOINT_LIMITS, Joint, JointAngles, JointLimit,
    JointLimits, angles_from_slice, validate_name, validate_speed,
};
pub use position::SavedPosition;
pub use procedure::{Procedure, ProcedureStep, validate_steps};
pub use store::{CalibrationStore, JsonStore, PositionStore, ProcedureStore};

/// 当前 unix 时间（秒）
pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
