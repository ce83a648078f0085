//! # 机械臂控制器
//!
//! 上电、回零、伸展、单关节点动等一次性动作。所有下发都经过 [`KinematicsBridge::send`]，
//! 稳定等待发生在两把锁之外。

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cobot_driver::Connection;
use cobot_tools::{
    EXTEND_POSITION, HOME_POSITION, Joint, JointAngles, MotionConfig, angles_from_slice,
};
use tracing::{debug, info, warn};

use crate::kinematics::KinematicsBridge;
use crate::state::RobotMotionState;
use crate::status::StatusSnapshot;
use crate::types::{Result, RobotError};

/// 机械臂控制器
#[derive(Debug, Clone)]
pub struct ArmController {
    bridge: KinematicsBridge,
    motion: MotionConfig,
    jog_speed: u8,
}

impl ArmController {
    /// 创建控制器
    pub fn new(bridge: KinematicsBridge, motion: MotionConfig, jog_speed: u8) -> Self {
        ArmController {
            bridge,
            motion,
            jog_speed,
        }
    }

    /// 运动学桥
    pub fn bridge(&self) -> &KinematicsBridge {
        &self.bridge
    }

    /// 运动状态
    pub fn state(&self) -> &Arc<RobotMotionState> {
        self.bridge.state()
    }

    /// 连接
    pub fn connection(&self) -> &Arc<Connection> {
        self.bridge.connection()
    }

    /// 运动时序配置
    pub fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    /// 点动速度
    pub fn jog_speed(&self) -> u8 {
        self.jog_speed
    }

    /// 是否有硬件连接
    pub fn is_connected(&self) -> bool {
        self.connection().is_connected()
    }

    /// 状态快照（不做硬件 I/O）
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot::capture(self.state(), self.connection())
    }

    /// 确保已上电（只在未上电时调用一次 `power_on`）
    pub fn ensure_powered(&self) -> Result<()> {
        if self.state().is_powered() {
            return Ok(());
        }
        self.connection().power_on()?;
        self.state().set_power_state(true);
        info!("robot powered on");
        settle(self.motion.power_on_settle());
        Ok(())
    }

    /// 断电，并退出手动控制
    pub fn power_off(&self) -> Result<()> {
        self.connection().power_off()?;
        let state = self.state();
        state.set_power_state(false);
        state.set_manual_control(false);
        info!("robot powered off");
        Ok(())
    }

    /// 读取硬件当前角度（录制采样和状态同步用）
    pub fn read_angles(&self) -> Result<JointAngles> {
        Ok(self.connection().get_angles()?)
    }

    /// 理想状态未初始化时，从硬件读取一次作为初始值
    pub fn sync_from_hardware(&self) -> Result<JointAngles> {
        let state = self.state();
        if state.is_initialized() {
            return Ok(state.get_ideal_angles());
        }
        let angles = self.read_angles()?;
        let stored = state.update_ideal_angles(&angles);
        debug!(?stored, "ideal state initialized from hardware");
        Ok(stored)
    }

    /// 回零位
    ///
    /// 先读一次角度唤醒机械臂，再以回零速度下发，等待回零稳定时间，最后退出手动控制。
    pub fn move_to_home(&self) -> Result<()> {
        self.ensure_powered()?;
        match self.connection().get_angles() {
            Ok(_) => settle(self.motion.wake_settle()),
            Err(e) => debug!(error = %e, "wake-up read failed"),
        }
        self.bridge.send(&HOME_POSITION, self.motion.home_speed)?;
        info!("moving to home position");
        settle(self.motion.home_settle());
        self.state().set_manual_control(false);
        Ok(())
    }

    /// 伸展位
    pub fn move_to_extend(&self) -> Result<()> {
        self.ensure_powered()?;
        self.bridge.send(&EXTEND_POSITION, self.motion.home_speed)?;
        info!("moving to extend position");
        settle(self.motion.extend_settle());
        self.state().set_manual_control(false);
        Ok(())
    }

    /// 单关节点动：其余关节保持理想角度
    ///
    /// 状态只在下发成功后改变。
    pub fn move_joint(&self, joint: Joint, angle: f64, speed: u8) -> Result<JointAngles> {
        self.ensure_powered()?;
        if let Err(e) = self.sync_from_hardware() {
            warn!(error = %e, "could not initialize from hardware, using current ideal angles");
        }
        let state = self.state();
        state.set_manual_control(true);

        let mut target = state.get_ideal_angles();
        target[joint.index()] = state.limits().clamp_joint(joint, angle);
        let sent = self.bridge.send(&target, speed)?;
        debug!(%joint, angle = sent[joint.index()], "joint moved");
        Ok(sent)
    }

    /// 以点动速度移动单关节
    pub fn jog(&self, joint: Joint, angle: f64) -> Result<JointAngles> {
        self.move_joint(joint, angle, self.jog_speed)
    }

    /// 下发完整角度向量（长度必须为 6）
    pub fn move_all(&self, angles: &[f64], speed: u8) -> Result<JointAngles> {
        let angles = angles_from_slice(angles).ok_or_else(|| {
            RobotError::validation(format!(
                "expected 6 finite joint angles, got {} values",
                angles.len()
            ))
        })?;
        self.ensure_powered()?;
        self.state().set_manual_control(true);
        self.bridge.send(&angles, speed)
    }

    /// 演示：伸展 → 回零 → 断电
    pub fn run_demo(&self) -> Result<()> {
        self.ensure_powered()?;
        self.move_to_extend()?;
        self.move_to_home()?;
        self.power_off()?;
        info!("demo finished");
        Ok(())
    }
}

fn settle(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
