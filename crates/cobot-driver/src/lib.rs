//! 驱动层
//!
//! 本 crate 是机械臂硬件与上层控制逻辑之间的接缝：
//! - [`ArmDriver`]：厂商 SDK 暴露的原语（读角度、发角度、正/逆解、上下电）
//! - [`Connection`]：连接锁，保证对串口链路的调用永不交错
//! - [`Centidegrees`]：IK 原始输出的单位类型
//! - `mock`（feature）：无硬件的模拟机械臂
//!
//! 大多数用户应该使用 `cobot-client` 提供的高层接口。

mod arm;
mod connection;
mod error;
mod units;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use arm::ArmDriver;
pub use connection::Connection;
pub use error::DriverError;
pub use units::{CENTIDEGREES_PER_DEGREE, Centidegrees};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockArm, MockArmState, MockKinematics, SentCommand};
