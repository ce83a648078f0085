//! # 运动序列协调器
//!
//! 同一时刻只运行一个回放类序列（回放 / 抖动 / 程序）。手动点动和录制可以与之并存，
//! 但录制开始时要求没有回放类序列。
//!
//! 每个序列运行在独立的命名线程上，持有一个取消令牌：
//!
//! ```text
//! Idle → Starting(上电) → Iterating(下发, 稳定)* → [Homing] → Idle
//! ```
//!
//! - 占用在状态锁内原子完成，被拒绝时没有任何副作用
//! - 取消是协作式的：每次迭代开始前检查一次，最坏延迟为一个稳定间隔
//! - 清理放在 drop guard 里，正常结束、出错和 panic 都会执行；
//!   回放先回零再清标志，抖动和程序只清标志
//! - 清理完成后才通过 channel 发出结果

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use cobot_tools::{JointAngles, PositionStore, ProcedureStep, ProcedureStore, validate_steps};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::controller::ArmController;
use crate::state::{RobotMotionState, SequenceClaim};
use crate::types::{Result, RobotError};

pub use crate::state::SequenceKind;

/// 序列结束结果
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceOutcome {
    /// 正常结束
    Completed {
        /// 已执行的步数
        steps: usize,
    },
    /// 被取消
    Cancelled {
        /// 已执行的步数
        steps: usize,
    },
    /// 出错结束
    Failed {
        /// 已执行的步数
        steps: usize,
        /// 错误信息
        reason: String,
    },
}

impl SequenceOutcome {
    /// 已执行的步数
    pub fn steps(&self) -> usize {
        match self {
            SequenceOutcome::Completed { steps }
            | SequenceOutcome::Cancelled { steps }
            | SequenceOutcome::Failed { steps, .. } => *steps,
        }
    }
}

/// 后台序列句柄
struct SequenceHandle {
    claim: SequenceClaim,
    cancel: Arc<AtomicBool>,
    outcome_rx: Receiver<SequenceOutcome>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SequenceHandle {
    fn kind(&self) -> SequenceKind {
        self.claim.kind()
    }

    fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!(kind = %self.kind(), "sequence thread panicked");
            }
        }
    }
}

/// 序列线程内部可见的上下文
struct SequenceRun {
    controller: Arc<ArmController>,
    cancel: Arc<AtomicBool>,
    steps: Arc<AtomicUsize>,
}

impl SequenceRun {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn step_done(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    fn settle(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// 序列清理守卫
///
/// 在 drop 中执行清理（可选回零 + 释放占用），然后发出结果。
struct CleanupGuard {
    controller: Arc<ArmController>,
    claim: SequenceClaim,
    home_on_exit: bool,
    cancel: Arc<AtomicBool>,
    steps: Arc<AtomicUsize>,
    result: Option<Result<()>>,
    outcome_tx: Sender<SequenceOutcome>,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let kind = self.claim.kind();
        if self.home_on_exit {
            if let Err(e) = self.controller.move_to_home() {
                error!(%kind, error = %e, "failed to home after sequence");
            }
        }
        self.controller.state().end_sequence(&self.claim);

        let steps = self.steps.load(Ordering::Relaxed);
        let outcome = match self.result.take() {
            Some(Ok(())) if self.cancel.load(Ordering::Acquire) => {
                SequenceOutcome::Cancelled { steps }
            },
            Some(Ok(())) => SequenceOutcome::Completed { steps },
            Some(Err(e)) => SequenceOutcome::Failed {
                steps,
                reason: e.to_string(),
            },
            None => SequenceOutcome::Failed {
                steps,
                reason: "sequence panicked".to_string(),
            },
        };
        info!(%kind, ?outcome, "sequence finished");
        let _ = self.outcome_tx.send(outcome);
    }
}

/// 运动序列协调器
pub struct MotionCoordinator {
    controller: Arc<ArmController>,
    positions: Arc<PositionStore>,
    procedures: Arc<ProcedureStore>,
    active: Mutex<Option<SequenceHandle>>,
}

impl MotionCoordinator {
    /// 创建协调器
    pub fn new(
        controller: Arc<ArmController>,
        positions: Arc<PositionStore>,
        procedures: Arc<ProcedureStore>,
    ) -> Self {
        MotionCoordinator {
            controller,
            positions,
            procedures,
            active: Mutex::new(None),
        }
    }

    /// 控制器
    pub fn controller(&self) -> &Arc<ArmController> {
        &self.controller
    }

    fn state(&self) -> &Arc<RobotMotionState> {
        self.controller.state()
    }

    /// 正在执行的回放类序列
    pub fn active_kind(&self) -> Option<SequenceKind> {
        self.state().active_sequence()
    }

    // ==================== 录制 ====================

    /// 开始录制（清空已录制的动作）
    pub fn start_recording(&self) -> Result<()> {
        self.state().try_start_recording().map_err(RobotError::busy)?;
        info!("recording started");
        Ok(())
    }

    /// 采样硬件当前角度并追加到录制
    ///
    /// 录制采样的是被手动拖动后的物理姿态，所以这里读硬件而不是理想状态。
    pub fn capture(&self) -> Result<JointAngles> {
        if !self.state().is_recording() {
            return Err(RobotError::validation("not recording"));
        }
        self.controller.ensure_powered()?;
        let angles = self.controller.read_angles()?;
        let clamped = self.state().limits().clamp(&angles);
        self.state().add_recorded_move(&clamped);
        info!(count = self.state().recorded_moves_count(), ?clamped, "move captured");
        Ok(clamped)
    }

    /// 结束录制并回零；返回录制的动作数
    pub fn stop_recording(&self) -> Result<usize> {
        if !self.state().is_recording() {
            return Err(RobotError::validation("not recording"));
        }
        self.state().set_recording_state(false);
        let count = self.state().recorded_moves_count();
        info!(count, "recording stopped");
        self.controller.move_to_home()?;
        Ok(count)
    }

    // ==================== 回放类序列 ====================

    /// 按顺序回放，结束后回零
    pub fn play(&self, moves: Vec<JointAngles>) -> Result<()> {
        if moves.is_empty() {
            return Err(RobotError::validation("no moves to play"));
        }
        let motion = self.controller.motion().clone();
        self.spawn(SequenceKind::Playback, true, move |run| {
            run.controller.ensure_powered()?;
            for angles in &moves {
                if run.cancelled() {
                    break;
                }
                run.controller.bridge().send(angles, motion.playback_speed)?;
                run.step_done();
                run.settle(motion.playback_settle());
            }
            Ok(())
        })
    }

    /// 回放已录制的动作
    pub fn play_recorded(&self) -> Result<()> {
        self.play(self.state().get_recorded_moves())
    }

    /// 循环执行直到被取消，结束后不回零
    pub fn jiggle(&self, moves: Vec<JointAngles>) -> Result<()> {
        if moves.is_empty() {
            return Err(RobotError::validation("no moves to jiggle"));
        }
        let motion = self.controller.motion().clone();
        self.spawn(SequenceKind::Jiggle, false, move |run| {
            run.controller.ensure_powered()?;
            loop {
                for angles in &moves {
                    if run.cancelled() {
                        return Ok(());
                    }
                    run.controller.bridge().send(angles, motion.playback_speed)?;
                    run.step_done();
                    run.settle(motion.playback_settle());
                }
            }
        })
    }

    /// 用已录制的动作抖动
    pub fn jiggle_recorded(&self) -> Result<()> {
        self.jiggle(self.state().get_recorded_moves())
    }

    /// 执行程序步骤
    ///
    /// 任何忙碌状态（包括录制）都会拒绝。找不到的位置记录日志后跳过。
    pub fn execute_procedure(&self, steps: Vec<ProcedureStep>) -> Result<()> {
        validate_steps(&steps).map_err(RobotError::Validation)?;
        let motion = self.controller.motion().clone();
        let positions = Arc::clone(&self.positions);
        self.spawn(SequenceKind::Procedure, false, move |run| {
            run.controller.ensure_powered()?;
            for (i, step) in steps.iter().enumerate() {
                if run.cancelled() {
                    break;
                }
                match step {
                    ProcedureStep::Position(name) => match positions.get(name) {
                        Some(position) => {
                            info!(step = i + 1, position = %name, "moving to position");
                            run.controller
                                .bridge()
                                .send(&position.angles, motion.procedure_speed)?;
                            run.settle(motion.procedure_settle());
                        },
                        None => {
                            warn!(step = i + 1, position = %name, "position not found, skipping");
                        },
                    },
                    ProcedureStep::Delay(seconds) => {
                        info!(step = i + 1, seconds, "waiting");
                        let delay = Duration::try_from_secs_f64(*seconds).map_err(|e| {
                            RobotError::validation(format!("step {}: {}", i + 1, e))
                        })?;
                        run.settle(delay);
                    },
                }
                run.step_done();
            }
            Ok(())
        })
    }

    /// 按名称执行已保存的程序
    pub fn execute_procedure_named(&self, name: &str) -> Result<()> {
        let procedure = self
            .procedures
            .get(name)
            .ok_or_else(|| RobotError::validation(format!("procedure '{}' not found", name)))?;
        info!(procedure = %name, steps = procedure.step_count(), "executing procedure");
        self.execute_procedure(procedure.steps)
    }

    // ==================== 停止与等待 ====================

    /// 请求停止当前序列；返回被取消的种类
    pub fn stop(&self) -> Option<SequenceKind> {
        let active = self.active.lock();
        let handle = active.as_ref()?;
        if !self.state().holds(&handle.claim) {
            return None;
        }
        handle.cancel();
        info!(kind = %handle.kind(), "stop requested");
        Some(handle.kind())
    }

    /// 只在当前序列是 `kind` 时请求停止
    pub fn stop_kind(&self, kind: SequenceKind) -> bool {
        let active = self.active.lock();
        match active.as_ref() {
            Some(handle) if handle.kind() == kind && self.state().holds(&handle.claim) => {
                handle.cancel();
                info!(%kind, "stop requested");
                true
            },
            _ => false,
        }
    }

    /// 等待当前（或最近一次）序列结束并取回结果
    ///
    /// 超时返回 `None`，句柄保留，之后可以再次等待。
    pub fn wait_for_completion(&self, timeout: Duration) -> Option<SequenceOutcome> {
        let rx = {
            let active = self.active.lock();
            active.as_ref()?.outcome_rx.clone()
        };
        let outcome = rx.recv_timeout(timeout).ok()?;
        // 等待期间可能已经启动了新序列，只回收发出这个结果的句柄
        let finished = {
            let mut active = self.active.lock();
            match active.as_ref() {
                Some(handle) if handle.outcome_rx.same_channel(&rx) => active.take(),
                _ => None,
            }
        };
        if let Some(mut handle) = finished {
            handle.join();
        }
        Some(outcome)
    }

    /// 占用序列并启动后台线程
    fn spawn<F>(&self, kind: SequenceKind, home_on_exit: bool, body: F) -> Result<()>
    where
        F: FnOnce(&SequenceRun) -> Result<()> + Send + 'static,
    {
        let mut active = self.active.lock();
        let claim = self
            .state()
            .try_begin_sequence(kind)
            .map_err(RobotError::busy)?;

        // 上一个序列已经释放了自己的占用，线程最多还差发出结果这一步；在锁外回收
        let previous = active.take();

        let cancel = Arc::new(AtomicBool::new(false));
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded(1);
        let controller = Arc::clone(&self.controller);
        let thread_cancel = Arc::clone(&cancel);

        let spawned = thread::Builder::new()
            .name(format!("cobot-{}", kind))
            .spawn(move || {
                let steps = Arc::new(AtomicUsize::new(0));
                let mut guard = CleanupGuard {
                    controller: Arc::clone(&controller),
                    claim,
                    home_on_exit,
                    cancel: Arc::clone(&thread_cancel),
                    steps: Arc::clone(&steps),
                    result: None,
                    outcome_tx,
                };
                let run = SequenceRun {
                    controller,
                    cancel: thread_cancel,
                    steps,
                };
                info!(%kind, "sequence started");
                guard.result = Some(body(&run));
            });

        let result = match spawned {
            Ok(handle) => {
                *active = Some(SequenceHandle {
                    claim,
                    cancel,
                    outcome_rx,
                    thread: Some(handle),
                });
                Ok(())
            },
            Err(e) => {
                self.state().end_sequence(&claim);
                error!(%kind, error = %e, "failed to spawn sequence thread");
                Err(RobotError::Spawn(e.to_string()))
            },
        };
        drop(active);

        if let Some(mut previous) = previous {
            previous.join();
        }
        result
    }
}

impl std::fmt::Debug for MotionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionCoordinator")
            .field("active", &self.active_kind())
            .finish()
    }
}

impl Drop for MotionCoordinator {
    fn drop(&mut self) {
        if let Some(mut handle) = self.active.get_mut().take() {
            handle.cancel();
            handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::KinematicsBridge;
    use cobot_driver::{Connection, MockArm};
    use cobot_tools::{HOME_POSITION, MotionConfig};

    const WAIT: Duration = Duration::from_secs(5);

    fn coordinator(arm: &MockArm) -> MotionCoordinator {
        let bridge = KinematicsBridge::new(
            Arc::new(Connection::new(Box::new(arm.clone()))),
            Arc::new(RobotMotionState::new()),
        );
        let controller = ArmController::new(bridge, MotionConfig::with_uniform_settle(1), 50);
        MotionCoordinator::new(
            Arc::new(controller),
            Arc::new(PositionStore::in_memory()),
            Arc::new(ProcedureStore::in_memory()),
        )
    }

    #[test]
    fn test_play_completes_and_homes() {
        let arm = MockArm::new();
        let coord = coordinator(&arm);
        coord.play(vec![[1.0; 6], [2.0; 6]]).unwrap();

        let outcome = coord.wait_for_completion(WAIT).unwrap();
        assert_eq!(outcome, SequenceOutcome::Completed { steps: 2 });
        let sent: Vec<_> = arm.sent_commands().iter().map(|c| c.angles).collect();
        assert_eq!(sent, vec![[1.0; 6], [2.0; 6], HOME_POSITION]);
        assert_eq!(coord.active_kind(), None);
    }

    #[test]
    fn test_empty_moves_rejected() {
        let arm = MockArm::new();
        let coord = coordinator(&arm);
        assert!(matches!(coord.play(vec![]), Err(RobotError::Validation(_))));
        assert!(matches!(coord.jiggle(vec![]), Err(RobotError::Validation(_))));
        assert!(matches!(
            coord.execute_procedure(vec![]),
            Err(RobotError::Validation(_))
        ));
        assert_eq!(coord.active_kind(), None);
    }

    #[test]
    fn test_capture_requires_recording() {
        let arm = MockArm::new();
        let coord = coordinator(&arm);
        assert!(matches!(coord.capture(), Err(RobotError::Validation(_))));
        assert!(matches!(
            coord.stop_recording(),
            Err(RobotError::Validation(_))
        ));
    }

    #[test]
    fn test_failed_send_still_cleans_up() {
        let arm = MockArm::new();
        let coord = coordinator(&arm);
        arm.fail_sends_after(1);
        coord.jiggle(vec![[1.0; 6], [2.0; 6]]).unwrap();

        let outcome = coord.wait_for_completion(WAIT).unwrap();
        assert!(matches!(outcome, SequenceOutcome::Failed { steps: 1, .. }));
        assert!(!coord.controller().state().is_jiggling());
    }

    #[test]
    fn test_stop_without_sequence() {
        let arm = MockArm::new();
        let coord = coordinator(&arm);
        assert_eq!(coord.stop(), None);
        assert!(!coord.stop_kind(SequenceKind::Playback));
        assert!(coord.wait_for_completion(Duration::from_millis(1)).is_none());
    }
}
