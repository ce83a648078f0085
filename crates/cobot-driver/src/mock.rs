//! 模拟机械臂
//!
//! 用于测试和离线演示的内存驱动。运动学使用一个可逆的线性模型：
//!
//! ```text
//! x = 2·j1    y = 2·j2    z = 2·j3 + 200
//! rx = j4     ry = j5     rz = j6
//! ```
//!
//! 逆解与厂商 SDK 一致，返回 **centidegrees**。
//! `MockArm` 可以 `Clone`，所有克隆共享同一份状态，
//! 测试可以在把驱动交给 `Connection` 之后继续观察它。

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::{ArmDriver, CENTIDEGREES_PER_DEGREE, DriverError};

/// z 方向零位偏移（毫米）
const Z_OFFSET_MM: f64 = 200.0;

/// 每度关节角对应的末端位移（毫米）
const MM_PER_DEGREE: f64 = 2.0;

/// 逆解可达范围（度）
const REACH_DEGREES: f64 = 360.0;

/// 一次发送记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentCommand {
    /// 发送的角度（度）
    pub angles: [f64; 6],
    /// 速度
    pub speed: u8,
}

/// 模拟硬件状态
#[derive(Debug, Clone)]
pub struct MockArmState {
    /// 当前关节角度（度）
    pub angles: [f64; 6],
    /// 是否上电
    pub powered: bool,
    /// 上电调用次数
    pub power_on_calls: usize,
    /// 断电调用次数
    pub power_off_calls: usize,
    /// 所有发送记录
    pub sent: Vec<SentCommand>,
    /// 剩余可成功发送次数（`None` 表示不限）
    pub send_budget: Option<usize>,
    /// 读取类原语是否失败
    pub fail_reads: bool,
    /// IK 是否无解
    pub ik_unsolvable: bool,
    /// 固定的 IK 原始返回值（centidegrees，长度可以不是 6）
    pub ik_override: Option<Vec<f64>>,
    /// FK 是否无解
    pub fk_unsolvable: bool,
    /// `get_angles` 调用次数
    pub get_angles_calls: usize,
    /// `get_coords` 调用次数
    pub get_coords_calls: usize,
    /// 每次发送的模拟耗时
    pub send_latency: Duration,
}

impl Default for MockArmState {
    fn default() -> Self {
        MockArmState {
            angles: [0.0; 6],
            powered: false,
            power_on_calls: 0,
            power_off_calls: 0,
            sent: Vec::new(),
            send_budget: None,
            fail_reads: false,
            ik_unsolvable: false,
            ik_override: None,
            fk_unsolvable: false,
            get_angles_calls: 0,
            get_coords_calls: 0,
            send_latency: Duration::ZERO,
        }
    }
}

/// 线性运动学模型
pub struct MockKinematics;

impl MockKinematics {
    /// 正解：关节角度 → `[x, y, z, rx, ry, rz]`
    pub fn forward(angles: &[f64; 6]) -> [f64; 6] {
        [
            angles[0] * MM_PER_DEGREE,
            angles[1] * MM_PER_DEGREE,
            angles[2] * MM_PER_DEGREE + Z_OFFSET_MM,
            angles[3],
            angles[4],
            angles[5],
        ]
    }

    /// 逆解：位姿 → 关节角度（度），超出可达范围返回 `None`
    pub fn inverse(target: &[f64; 6]) -> Option<[f64; 6]> {
        let angles = [
            target[0] / MM_PER_DEGREE,
            target[1] / MM_PER_DEGREE,
            (target[2] - Z_OFFSET_MM) / MM_PER_DEGREE,
            target[3],
            target[4],
            target[5],
        ];
        angles
            .iter()
            .all(|a| a.is_finite() && a.abs() <= REACH_DEGREES)
            .then_some(angles)
    }
}

/// 模拟机械臂驱动
#[derive(Debug, Clone, Default)]
pub struct MockArm {
    state: Arc<Mutex<MockArmState>>,
}

impl MockArm {
    /// 创建处于零位的模拟机械臂
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建处于指定角度的模拟机械臂
    pub fn with_angles(angles: [f64; 6]) -> Self {
        let arm = Self::new();
        arm.state.lock().angles = angles;
        arm
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> MockArmState {
        self.state.lock().clone()
    }

    /// 所有发送记录
    pub fn sent_commands(&self) -> Vec<SentCommand> {
        self.state.lock().sent.clone()
    }

    /// 最后一次发送
    pub fn last_sent(&self) -> Option<SentCommand> {
        self.state.lock().sent.last().copied()
    }

    /// 清空发送记录
    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// 直接设置物理角度（模拟手动拖动机械臂）
    pub fn set_angles(&self, angles: [f64; 6]) {
        self.state.lock().angles = angles;
    }

    /// 之后的发送全部失败
    pub fn fail_sends(&self) {
        self.state.lock().send_budget = Some(0);
    }

    /// 再成功 `n` 次后发送失败
    pub fn fail_sends_after(&self, n: usize) {
        self.state.lock().send_budget = Some(n);
    }

    /// 恢复发送
    pub fn restore_sends(&self) {
        self.state.lock().send_budget = None;
    }

    /// 读取类原语失败
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// IK 无解
    pub fn set_ik_unsolvable(&self, unsolvable: bool) {
        self.state.lock().ik_unsolvable = unsolvable;
    }

    /// 固定 IK 原始返回值
    pub fn set_ik_override(&self, raw: Option<Vec<f64>>) {
        self.state.lock().ik_override = raw;
    }

    /// FK 无解
    pub fn set_fk_unsolvable(&self, unsolvable: bool) {
        self.state.lock().fk_unsolvable = unsolvable;
    }

    /// 模拟每次发送的耗时
    pub fn set_send_latency(&self, latency: Duration) {
        self.state.lock().send_latency = latency;
    }

    fn read_failure(command: &'static str) -> DriverError {
        DriverError::command_failed(command, "simulated read failure")
    }
}

impl ArmDriver for MockArm {
    fn get_angles(&mut self) -> Result<Option<Vec<f64>>, DriverError> {
        let mut state = self.state.lock();
        state.get_angles_calls += 1;
        if state.fail_reads {
            return Err(Self::read_failure("get_angles"));
        }
        Ok(Some(state.angles.to_vec()))
    }

    fn send_angles(&mut self, angles: &[f64; 6], speed: u8) -> Result<(), DriverError> {
        let latency = {
            let mut state = self.state.lock();
            if let Some(budget) = state.send_budget.as_mut() {
                if *budget == 0 {
                    return Err(DriverError::command_failed(
                        "send_angles",
                        "simulated serial failure",
                    ));
                }
                *budget -= 1;
            }
            state.sent.push(SentCommand {
                angles: *angles,
                speed,
            });
            state.angles = *angles;
            state.send_latency
        };
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        Ok(())
    }

    fn get_coords(&mut self) -> Result<Option<Vec<f64>>, DriverError> {
        let mut state = self.state.lock();
        state.get_coords_calls += 1;
        if state.fail_reads {
            return Err(Self::read_failure("get_coords"));
        }
        Ok(Some(MockKinematics::forward(&state.angles).to_vec()))
    }

    fn angles_to_coords(&mut self, angles: &[f64; 6]) -> Result<Option<Vec<f64>>, DriverError> {
        if self.state.lock().fk_unsolvable {
            return Ok(None);
        }
        Ok(Some(MockKinematics::forward(angles).to_vec()))
    }

    fn solve_inverse_kinematics(
        &mut self,
        target: &[f64; 6],
        _seed: &[f64; 6],
    ) -> Result<Option<Vec<f64>>, DriverError> {
        let state = self.state.lock();
        if state.ik_unsolvable {
            return Ok(None);
        }
        if let Some(raw) = &state.ik_override {
            return Ok(Some(raw.clone()));
        }
        Ok(MockKinematics::inverse(target)
            .map(|deg| deg.iter().map(|d| d * CENTIDEGREES_PER_DEGREE).collect()))
    }

    fn power_on(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.power_on_calls += 1;
        state.powered = true;
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.power_off_calls += 1;
        state.powered = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kinematics_roundtrip() {
        let angles = [10.0, -20.0, 30.5, 40.0, -50.0, 60.0];
        let pose = MockKinematics::forward(&angles);
        let back = MockKinematics::inverse(&pose).unwrap();
        for (a, b) in angles.iter().zip(back.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inverse_out_of_reach() {
        assert!(MockKinematics::inverse(&[5000.0, 0.0, 200.0, 0.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_ik_returns_centidegrees() {
        let mut arm = MockArm::new();
        let pose = MockKinematics::forward(&[1.5, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let raw = arm
            .solve_inverse_kinematics(&pose, &[0.0; 6])
            .unwrap()
            .unwrap();
        assert_relative_eq!(raw[0], 150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_send_budget() {
        let mut arm = MockArm::new();
        arm.fail_sends_after(1);
        assert!(arm.send_angles(&[1.0; 6], 50).is_ok());
        assert!(arm.send_angles(&[2.0; 6], 50).is_err());
        assert_eq!(arm.sent_commands().len(), 1);
        assert_eq!(arm.snapshot().angles, [1.0; 6]);
    }

    #[test]
    fn test_clones_share_state() {
        let arm = MockArm::new();
        let mut driver = arm.clone();
        driver.power_on().unwrap();
        driver.send_angles(&[3.0; 6], 80).unwrap();
        let snapshot = arm.snapshot();
        assert!(snapshot.powered);
        assert_eq!(
            arm.last_sent(),
            Some(SentCommand {
                angles: [3.0; 6],
                speed: 80
            })
        );
    }
}
