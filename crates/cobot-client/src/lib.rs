//! 客户端接口模块
//!
//! 本模块提供六轴协作机械臂的高层控制接口，包括：
//! - [`RobotMotionState`]：理想姿态与模式标志的唯一来源
//! - [`KinematicsBridge`]：正逆解与单位变换，所有下发的统一出口
//! - [`MotionCoordinator`]：录制、回放、抖动、程序执行，同一时间只有一个序列
//! - [`PlaneCalibrationEngine`] / [`ScreenMapper`]：墙面标定与屏幕映射
//!
//! # 使用场景
//!
//! 启动时用 [`RobotContext::new`] 构建一次上下文，之后按引用传递。
//! 没有硬件时可以启用 `mock` feature，用 `cobot_driver::MockArm` 代替真实驱动。
//!
//! # 锁
//!
//! 状态锁只在读写字段时持有，从不跨越驱动调用；驱动调用由 `Connection` 的连接锁串行化。

pub mod calibration;
pub mod context;
pub mod controller;
pub mod coordinator;
pub mod kinematics;
pub mod library;
pub mod state;
pub mod status;
pub mod types;

// 重新导出常用类型
pub use calibration::{PlaneCalibrationEngine, PlaneFit, PlaneFrame, ScreenMapper, fit_best_plane};
pub use context::RobotContext;
pub use controller::ArmController;
pub use coordinator::{MotionCoordinator, SequenceOutcome};
pub use kinematics::{ForwardKinematics, KinematicsBridge};
pub use library::MotionLibrary;
pub use state::{MotionSnapshot, RobotMotionState, SequenceClaim, SequenceKind};
pub use status::StatusSnapshot;
pub use types::*;
