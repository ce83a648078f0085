//! # 运动学桥
//!
//! 硬件正 / 逆解原语外面唯一的一层，负责单位换算和限位：
//!
//! - 逆解原始输出是 centidegrees，被包在 [`Centidegrees`] 里，
//!   换算成度并限位之后才会离开这里
//! - [`KinematicsBridge::send`] 是下发角度成为理想状态的唯一入口
//!
//! [`Centidegrees`]: cobot_driver::Centidegrees

use std::sync::Arc;

use cobot_driver::{Connection, DriverError};
use cobot_tools::{JointAngles, JointLimits, validate_speed};
use tracing::{debug, warn};

use crate::state::RobotMotionState;
use crate::types::{CartesianPose, Result, RobotError};

/// 正运动学
pub trait ForwardKinematics {
    /// 关节角度（度）→ 末端位姿
    fn forward(&self, angles: &JointAngles) -> Result<CartesianPose>;
}

/// 运动学桥
#[derive(Debug, Clone)]
pub struct KinematicsBridge {
    connection: Arc<Connection>,
    state: Arc<RobotMotionState>,
}

impl KinematicsBridge {
    /// 创建运动学桥
    pub fn new(connection: Arc<Connection>, state: Arc<RobotMotionState>) -> Self {
        KinematicsBridge { connection, state }
    }

    /// 连接
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// 运动状态
    pub fn state(&self) -> &Arc<RobotMotionState> {
        &self.state
    }

    fn limits(&self) -> &JointLimits {
        self.state.limits()
    }

    /// 逐关节限位（全函数）
    pub fn clamp(&self, angles: &JointAngles) -> JointAngles {
        self.limits().clamp(angles)
    }

    /// 正解
    pub fn forward(&self, angles: &JointAngles) -> Result<CartesianPose> {
        self.connection
            .angles_to_coords(angles)
            .map(|coords| CartesianPose::from_coords(&coords))
            .map_err(|e| kinematics_error("forward kinematics", e))
    }

    /// 逆解：目标位姿 + 种子角度 → 限位后的关节角度（度）
    ///
    /// 不修改状态，也不下发。
    pub fn inverse(
        &self,
        position: &[f64; 3],
        orientation: &[f64; 3],
        seed: &JointAngles,
    ) -> Result<JointAngles> {
        let target = CartesianPose::new(*position, *orientation).to_coords();
        let raw = self
            .connection
            .solve_inverse_kinematics(&target, seed)
            .map_err(|e| kinematics_error("inverse kinematics", e))?;

        let degrees = raw.to_degrees();
        let clamped = self.clamp(&degrees);
        if clamped != degrees {
            warn!(?degrees, ?clamped, "IK solution clamped to joint limits");
        }
        debug!(raw = %raw, ?clamped, "IK solved");
        Ok(clamped)
    }

    /// 限位后下发，成功后写入理想状态；返回实际下发的角度
    ///
    /// 下发失败时状态保持不变。
    pub fn send(&self, angles: &JointAngles, speed: u8) -> Result<JointAngles> {
        if !validate_speed(speed) {
            return Err(RobotError::validation(format!(
                "speed {} out of range 1..=100",
                speed
            )));
        }
        let clamped = self.clamp(angles);
        self.connection.send_angles(&clamped, speed)?;
        self.state.update_ideal_angles(&clamped);
        Ok(clamped)
    }

    /// 由理想角度计算末端位姿
    pub fn ideal_pose(&self) -> Result<(JointAngles, CartesianPose)> {
        self.state.get_ideal_pose(self)
    }
}

impl ForwardKinematics for KinematicsBridge {
    fn forward(&self, angles: &JointAngles) -> Result<CartesianPose> {
        KinematicsBridge::forward(self, angles)
    }
}

/// 无解 / 数据无效归为 `KinematicsUnsolvable`，其余按硬件错误处理
fn kinematics_error(what: &str, err: DriverError) -> RobotError {
    if err.is_malformed_response() {
        RobotError::unsolvable(format!("{}: {}", what, err))
    } else {
        RobotError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobot_driver::{MockArm, MockKinematics};

    fn bridge_with(arm: &MockArm) -> KinematicsBridge {
        KinematicsBridge::new(
            Arc::new(Connection::new(Box::new(arm.clone()))),
            Arc::new(RobotMotionState::new()),
        )
    }

    #[test]
    fn test_inverse_divides_centidegrees() {
        let arm = MockArm::new();
        arm.set_ik_override(Some(vec![
            -4440.0, 10328.0, 13893.0, -6142.0, -4414.0, -12861.0,
        ]));
        let bridge = bridge_with(&arm);

        let angles = bridge.inverse(&[0.0; 3], &[0.0; 3], &[0.0; 6]).unwrap();
        let expected = [-44.4, 103.28, 138.93, -61.42, -44.14, -128.61];
        for (a, e) in angles.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-9);
            assert!(a.abs() <= 180.0);
        }
        // 逆解不下发、不改状态
        assert!(arm.sent_commands().is_empty());
        assert!(!bridge.state().is_initialized());
    }

    #[test]
    fn test_inverse_unsolvable() {
        let arm = MockArm::new();
        let bridge = bridge_with(&arm);

        arm.set_ik_unsolvable(true);
        assert!(matches!(
            bridge.inverse(&[0.0; 3], &[0.0; 3], &[0.0; 6]),
            Err(RobotError::KinematicsUnsolvable(_))
        ));

        arm.set_ik_unsolvable(false);
        arm.set_ik_override(Some(vec![1.0, 2.0, 3.0]));
        assert!(matches!(
            bridge.inverse(&[0.0; 3], &[0.0; 3], &[0.0; 6]),
            Err(RobotError::KinematicsUnsolvable(_))
        ));
    }

    #[test]
    fn test_inverse_clamps() {
        let arm = MockArm::new();
        // 200° 超过关节 1 的 168° 限位
        arm.set_ik_override(Some(vec![20000.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        let bridge = bridge_with(&arm);
        let angles = bridge.inverse(&[0.0; 3], &[0.0; 3], &[0.0; 6]).unwrap();
        assert_eq!(angles[0], 168.0);
    }

    #[test]
    fn test_forward() {
        let arm = MockArm::new();
        let bridge = bridge_with(&arm);
        let pose = bridge.forward(&[10.0, 0.0, 0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(pose.to_coords(), MockKinematics::forward(&[10.0, 0.0, 0.0, 1.0, 2.0, 3.0]));

        arm.set_fk_unsolvable(true);
        assert!(matches!(
            bridge.forward(&[0.0; 6]),
            Err(RobotError::KinematicsUnsolvable(_))
        ));
    }

    #[test]
    fn test_send_updates_state_only_on_success() {
        let arm = MockArm::new();
        let bridge = bridge_with(&arm);

        let sent = bridge.send(&[500.0, 1.0, 2.0, 3.0, 4.0, 5.0], 50).unwrap();
        assert_eq!(sent[0], 168.0);
        assert_eq!(bridge.state().get_ideal_angles(), sent);
        assert_eq!(arm.last_sent().unwrap().angles, sent);

        arm.fail_sends();
        assert!(matches!(
            bridge.send(&[0.0; 6], 50),
            Err(RobotError::HardwareCommandFailure(_))
        ));
        assert_eq!(bridge.state().get_ideal_angles(), sent);
    }

    #[test]
    fn test_send_rejects_bad_speed() {
        let arm = MockArm::new();
        let bridge = bridge_with(&arm);
        assert!(matches!(
            bridge.send(&[0.0; 6], 0),
            Err(RobotError::Validation(_))
        ));
        assert!(arm.sent_commands().is_empty());
    }

    #[test]
    fn test_disconnected() {
        let bridge = KinematicsBridge::new(
            Arc::new(Connection::disconnected()),
            Arc::new(RobotMotionState::new()),
        );
        assert!(matches!(
            bridge.send(&[0.0; 6], 50),
            Err(RobotError::HardwareUnavailable)
        ));
        assert!(matches!(
            bridge.forward(&[0.0; 6]),
            Err(RobotError::HardwareUnavailable)
        ));
    }
}
