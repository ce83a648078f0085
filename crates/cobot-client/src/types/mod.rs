//! 核心类型

pub mod cartesian;
pub mod error;

pub use cartesian::CartesianPose;
pub use error::{BusyReason, Result, RobotError};
