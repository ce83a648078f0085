//! 对外状态快照
//!
//! 纯粹是运动状态的投影，不触发任何硬件 I/O，可以高频轮询。

use cobot_driver::Connection;
use cobot_tools::{JOINT_COUNT, JointAngles};
use serde::Serialize;

use crate::state::RobotMotionState;

/// 状态快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// 是否有硬件连接
    pub connected: bool,
    /// 理想关节角度
    pub angles: JointAngles,
    /// 正在录制
    pub is_recording: bool,
    /// 回放或程序执行中
    pub is_playing: bool,
    /// 抖动中
    pub is_jiggling: bool,
    /// 已录制动作数
    pub recorded_moves_count: usize,
    /// 关节限位 `(min, max)`
    pub joint_limits: [(f64, f64); JOINT_COUNT],
}

impl StatusSnapshot {
    /// 从运动状态和连接生成快照
    pub fn capture(state: &RobotMotionState, connection: &Connection) -> Self {
        let snapshot = state.snapshot();
        StatusSnapshot {
            connected: connection.is_connected(),
            angles: snapshot.ideal_angles,
            is_recording: snapshot.is_recording,
            is_playing: snapshot.is_playing(),
            is_jiggling: snapshot.is_jiggling(),
            recorded_moves_count: snapshot.recorded_moves_count,
            joint_limits: state.limits().as_pairs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SequenceKind;
    use cobot_driver::MockArm;

    #[test]
    fn test_capture_does_no_io() {
        let arm = MockArm::new();
        let connection = Connection::new(Box::new(arm.clone()));
        let state = RobotMotionState::new();
        state.update_ideal_angles(&[1.0; 6]);
        state.add_recorded_move(&[2.0; 6]);
        state.try_begin_sequence(SequenceKind::Jiggle).unwrap();

        let status = StatusSnapshot::capture(&state, &connection);
        assert!(status.connected);
        assert_eq!(status.angles, [1.0; 6]);
        assert!(status.is_jiggling);
        assert!(!status.is_playing);
        assert_eq!(status.recorded_moves_count, 1);
        assert_eq!(status.joint_limits[0], (-168.0, 168.0));

        let snap = arm.snapshot();
        assert_eq!(snap.get_angles_calls, 0);
        assert_eq!(snap.get_coords_calls, 0);
    }

    #[test]
    fn test_serializes_field_names() {
        let status = StatusSnapshot::capture(&RobotMotionState::new(), &Connection::disconnected());
        let value = serde_json::to_value(&status).unwrap();
        for key in [
            "connected",
            "angles",
            "is_recording",
            "is_playing",
            "is_jiggling",
            "recorded_moves_count",
            "joint_limits",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["connected"], false);
    }
}
