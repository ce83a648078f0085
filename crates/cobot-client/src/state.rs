//! # 运动状态
//!
//! `RobotMotionState` 是"机械臂当前在哪里"的唯一权威记录。
//!
//! - `ideal_angles` 是最后一次成功下发的关节角度，始终在限位内
//! - 所有字段由同一把状态锁保护，只在字段读写期间持有，绝不跨硬件调用
//! - 读取返回副本，可变引用不会逃出锁
//! - 回放类序列（回放 / 抖动 / 程序）同一时刻最多一个，由 [`try_begin_sequence`] 原子地占用
//!
//! [`try_begin_sequence`]: RobotMotionState::try_begin_sequence

use std::fmt;

use cobot_tools::{JOINT_COUNT, JOINT_LIMITS, JointAngles, JointLimits};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::kinematics::ForwardKinematics;
use crate::types::{BusyReason, CartesianPose, Result, RobotError};

/// 回放类序列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    /// 编舞回放
    Playback,
    /// 连续抖动
    Jiggle,
    /// 程序执行
    Procedure,
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequenceKind::Playback => "playback",
            SequenceKind::Jiggle => "jiggle",
            SequenceKind::Procedure => "procedure",
        };
        f.write_str(name)
    }
}

/// 一次序列占用
///
/// 每次占用的 `id` 都不同，只有持有同一个占用的一方能释放它。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceClaim {
    kind: SequenceKind,
    id: u64,
}

impl SequenceClaim {
    /// 序列种类
    pub fn kind(&self) -> SequenceKind {
        self.kind
    }
}

/// 状态快照（一次加锁读出的全部字段）
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSnapshot {
    /// 理想关节角度
    pub ideal_angles: JointAngles,
    /// 理想状态是否已初始化
    pub state_initialized: bool,
    /// 是否上电
    pub powered: bool,
    /// 是否处于手动控制
    pub manual_control_active: bool,
    /// 是否处于平面移动模式
    pub plane_mode_active: bool,
    /// 是否正在录制
    pub is_recording: bool,
    /// 正在执行的回放类序列
    pub active_sequence: Option<SequenceKind>,
    /// 已录制的动作数
    pub recorded_moves_count: usize,
}

impl MotionSnapshot {
    /// 回放或程序执行中
    pub fn is_playing(&self) -> bool {
        matches!(
            self.active_sequence,
            Some(SequenceKind::Playback | SequenceKind::Procedure)
        )
    }

    /// 抖动中
    pub fn is_jiggling(&self) -> bool {
        self.active_sequence == Some(SequenceKind::Jiggle)
    }
}

#[derive(Debug)]
struct Inner {
    ideal_angles: JointAngles,
    state_initialized: bool,
    powered: bool,
    manual_control_active: bool,
    plane_mode_active: bool,
    is_recording: bool,
    active_sequence: Option<SequenceClaim>,
    /// 当前占用来自 `set_*_state` 标志位，而不是序列线程
    flag_claim: bool,
    next_claim_id: u64,
    recorded_moves: Vec<JointAngles>,
}

impl Inner {
    fn active_kind(&self) -> Option<SequenceKind> {
        self.active_sequence.map(|claim| claim.kind)
    }

    fn claim(&mut self, kind: SequenceKind, flag_claim: bool) -> SequenceClaim {
        self.next_claim_id += 1;
        let claim = SequenceClaim {
            kind,
            id: self.next_claim_id,
        };
        self.active_sequence = Some(claim);
        self.flag_claim = flag_claim;
        claim
    }

    fn busy_reason(&self) -> Option<BusyReason> {
        match self.active_kind() {
            Some(kind) => Some(BusyReason::Sequence(kind)),
            None if self.is_recording => Some(BusyReason::Recording),
            None => None,
        }
    }
}

/// 机械臂运动状态
#[derive(Debug)]
pub struct RobotMotionState {
    limits: JointLimits,
    inner: Mutex<Inner>,
}

impl Default for RobotMotionState {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotMotionState {
    /// 使用默认限位表创建（理想角度为零位，未初始化）
    pub fn new() -> Self {
        Self::with_limits(JOINT_LIMITS)
    }

    /// 使用指定限位表创建
    pub fn with_limits(limits: JointLimits) -> Self {
        RobotMotionState {
            limits,
            inner: Mutex::new(Inner {
                ideal_angles: limits.clamp(&[0.0; JOINT_COUNT]),
                state_initialized: false,
                powered: false,
                manual_control_active: false,
                plane_mode_active: false,
                is_recording: false,
                active_sequence: None,
                flag_claim: false,
                next_claim_id: 0,
                recorded_moves: Vec::new(),
            }),
        }
    }

    /// 限位表
    pub fn limits(&self) -> &JointLimits {
        &self.limits
    }

    // ==================== 理想角度 ====================

    /// 理想关节角度（副本）
    pub fn get_ideal_angles(&self) -> JointAngles {
        self.inner.lock().ideal_angles
    }

    /// 限位后写入理想角度，并标记为已初始化；返回实际写入的值
    pub fn update_ideal_angles(&self, angles: &JointAngles) -> JointAngles {
        let clamped = self.limits.clamp(angles);
        let mut inner = self.inner.lock();
        inner.ideal_angles = clamped;
        inner.state_initialized = true;
        clamped
    }

    /// 修改单个关节（下标 0-5，限位后写入）
    pub fn update_joint_angle(&self, joint_id: usize, angle: f64) -> Result<()> {
        let limit = self.limits.0.get(joint_id).ok_or_else(|| {
            RobotError::validation(format!("joint index {} out of range 0..=5", joint_id))
        })?;
        let value = limit.clamp(angle);
        let mut inner = self.inner.lock();
        inner.ideal_angles[joint_id] = value;
        inner.state_initialized = true;
        Ok(())
    }

    /// 理想状态是否已初始化
    pub fn is_initialized(&self) -> bool {
        self.inner.lock().state_initialized
    }

    /// 由理想角度计算末端位姿
    ///
    /// 只用理想角度做正解，绝不读取硬件传感器：读数滞后于最后一次下发，
    /// 与进行中的写入竞争会导致抖动。正解调用发生在状态锁之外。
    pub fn get_ideal_cartesian(&self, fk: &impl ForwardKinematics) -> Result<CartesianPose> {
        self.get_ideal_pose(fk).map(|(_, pose)| pose)
    }

    /// 理想角度 + 理想位姿（同一份角度）
    pub fn get_ideal_pose(
        &self,
        fk: &impl ForwardKinematics,
    ) -> Result<(JointAngles, CartesianPose)> {
        let angles = {
            let inner = self.inner.lock();
            if !inner.state_initialized {
                return Err(RobotError::NotInitialized);
            }
            inner.ideal_angles
        };
        Ok((angles, fk.forward(&angles)?))
    }

    // ==================== 标志位 ====================

    /// 设置上电状态
    pub fn set_power_state(&self, powered: bool) {
        self.inner.lock().powered = powered;
    }

    /// 是否上电
    pub fn is_powered(&self) -> bool {
        self.inner.lock().powered
    }

    /// 设置手动控制状态
    pub fn set_manual_control(&self, active: bool) {
        self.inner.lock().manual_control_active = active;
    }

    /// 是否处于手动控制
    pub fn is_manual_control(&self) -> bool {
        self.inner.lock().manual_control_active
    }

    /// 设置平面移动模式
    pub fn set_plane_mode(&self, active: bool) {
        self.inner.lock().plane_mode_active = active;
    }

    /// 是否处于平面移动模式
    pub fn is_plane_mode(&self) -> bool {
        self.inner.lock().plane_mode_active
    }

    /// 设置录制状态；开始录制时清空已录制的动作
    pub fn set_recording_state(&self, recording: bool) {
        let mut inner = self.inner.lock();
        inner.is_recording = recording;
        if recording {
            inner.recorded_moves.clear();
        }
    }

    /// 设置回放状态
    pub fn set_playing_state(&self, playing: bool) {
        self.set_sequence_flag(SequenceKind::Playback, playing);
    }

    /// 设置抖动状态
    pub fn set_jiggling_state(&self, jiggling: bool) {
        self.set_sequence_flag(SequenceKind::Jiggle, jiggling);
    }

    /// 设置程序执行状态
    pub fn set_procedure_state(&self, running: bool) {
        self.set_sequence_flag(SequenceKind::Procedure, running);
    }

    /// 标志位只能占用空闲的序列，也只能释放自己设置的占用；
    /// 序列线程持有的占用由线程的清理过程释放
    fn set_sequence_flag(&self, kind: SequenceKind, active: bool) {
        let mut inner = self.inner.lock();
        match inner.active_kind() {
            None if active => {
                inner.claim(kind, true);
            },
            Some(current) if current == kind && !active && inner.flag_claim => {
                inner.active_sequence = None;
                inner.flag_claim = false;
            },
            Some(current) if current != kind || !inner.flag_claim => {
                warn!(%kind, active, %current, "sequence owned elsewhere, flag ignored");
            },
            _ => {},
        }
    }

    /// 是否正在录制
    pub fn is_recording(&self) -> bool {
        self.inner.lock().is_recording
    }

    /// 回放或程序执行中
    pub fn is_playing(&self) -> bool {
        matches!(
            self.inner.lock().active_kind(),
            Some(SequenceKind::Playback | SequenceKind::Procedure)
        )
    }

    /// 抖动中
    pub fn is_jiggling(&self) -> bool {
        self.inner.lock().active_kind() == Some(SequenceKind::Jiggle)
    }

    /// 录制、回放、抖动或程序执行中任意一项
    pub fn is_busy(&self) -> bool {
        self.inner.lock().busy_reason().is_some()
    }

    /// 正在执行的回放类序列
    pub fn active_sequence(&self) -> Option<SequenceKind> {
        self.inner.lock().active_kind()
    }

    /// `claim` 是否仍是当前占用
    pub fn holds(&self, claim: &SequenceClaim) -> bool {
        self.inner.lock().active_sequence == Some(*claim)
    }

    // ==================== 序列占用 ====================

    /// 原子地开始录制：有回放类序列时拒绝，且不做任何修改
    pub fn try_start_recording(&self) -> std::result::Result<(), BusyReason> {
        let mut inner = self.inner.lock();
        if let Some(kind) = inner.active_kind() {
            return Err(BusyReason::Sequence(kind));
        }
        inner.is_recording = true;
        inner.recorded_moves.clear();
        Ok(())
    }

    /// 原子地占用回放类序列
    ///
    /// 已有序列时拒绝；程序执行还要求没有在录制。拒绝时状态不变。
    /// 返回的占用交给 [`end_sequence`](Self::end_sequence) 释放。
    pub fn try_begin_sequence(
        &self,
        kind: SequenceKind,
    ) -> std::result::Result<SequenceClaim, BusyReason> {
        let mut inner = self.inner.lock();
        let conflict = match kind {
            SequenceKind::Procedure => inner.busy_reason(),
            SequenceKind::Playback | SequenceKind::Jiggle => {
                inner.active_kind().map(BusyReason::Sequence)
            },
        };
        if let Some(reason) = conflict {
            return Err(reason);
        }
        let claim = inner.claim(kind, false);
        debug!(%kind, id = claim.id, "sequence claimed");
        Ok(claim)
    }

    /// 释放占用；`claim` 已不是当前占用时什么也不做
    pub fn end_sequence(&self, claim: &SequenceClaim) -> bool {
        let mut inner = self.inner.lock();
        if inner.active_sequence == Some(*claim) {
            inner.active_sequence = None;
            debug!(kind = %claim.kind, id = claim.id, "sequence released");
            true
        } else {
            false
        }
    }

    // ==================== 录制 ====================

    /// 追加一个录制动作（限位后）
    pub fn add_recorded_move(&self, angles: &JointAngles) {
        let clamped = self.limits.clamp(angles);
        self.inner.lock().recorded_moves.push(clamped);
    }

    /// 已录制动作（副本）
    pub fn get_recorded_moves(&self) -> Vec<JointAngles> {
        self.inner.lock().recorded_moves.clone()
    }

    /// 已录制动作数
    pub fn recorded_moves_count(&self) -> usize {
        self.inner.lock().recorded_moves.len()
    }

    /// 清空录制
    pub fn clear_recorded_moves(&self) {
        self.inner.lock().recorded_moves.clear();
    }

    // ==================== 其他 ====================

    /// 停止所有操作标志（不动理想角度和录制内容）
    ///
    /// 序列线程持有的占用保留，直到线程清理完成后自己释放。
    pub fn reset_to_safe_state(&self) {
        let mut inner = self.inner.lock();
        inner.is_recording = false;
        if inner.flag_claim {
            inner.active_sequence = None;
            inner.flag_claim = false;
        }
        inner.manual_control_active = false;
        inner.plane_mode_active = false;
    }

    /// 一次加锁读出全部字段
    pub fn snapshot(&self) -> MotionSnapshot {
        let inner = self.inner.lock();
        MotionSnapshot {
            ideal_angles: inner.ideal_angles,
            state_initialized: inner.state_initialized,
            powered: inner.powered,
            manual_control_active: inner.manual_control_active,
            plane_mode_active: inner.plane_mode_active,
            is_recording: inner.is_recording,
            active_sequence: inner.active_kind(),
            recorded_moves_count: inner.recorded_moves.len(),
        }
    }
}
