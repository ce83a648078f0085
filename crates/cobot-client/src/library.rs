//! # 位置与程序库
//!
//! 已保存位置和程序的增删改查。移动到已保存位置同样经过 [`KinematicsBridge`](crate::KinematicsBridge)。

use std::sync::Arc;

use cobot_tools::{
    JointAngles, PositionStore, Procedure, ProcedureStep, ProcedureStore, SavedPosition,
    StoreError, angles_from_slice, now_unix, validate_name, validate_steps,
};
use tracing::info;

use crate::controller::ArmController;
use crate::types::{BusyReason, Result, RobotError};

/// 位置与程序库
#[derive(Debug, Clone)]
pub struct MotionLibrary {
    controller: Arc<ArmController>,
    positions: Arc<PositionStore>,
    procedures: Arc<ProcedureStore>,
}

impl MotionLibrary {
    /// 创建
    pub fn new(
        controller: Arc<ArmController>,
        positions: Arc<PositionStore>,
        procedures: Arc<ProcedureStore>,
    ) -> Self {
        MotionLibrary {
            controller,
            positions,
            procedures,
        }
    }

    // ==================== 位置 ====================

    /// 按名称查找位置
    pub fn position(&self, name: &str) -> Option<SavedPosition> {
        self.positions.get(name)
    }

    /// 全部位置（按名称排序）
    pub fn positions(&self) -> Vec<(String, SavedPosition)> {
        self.positions.list()
    }

    /// 已启用的位置
    pub fn enabled_positions(&self) -> Vec<(String, SavedPosition)> {
        self.positions
            .list()
            .into_iter()
            .filter(|(_, p)| p.enabled)
            .collect()
    }

    /// 把给定角度保存为位置（覆盖同名位置，角度先限位）
    pub fn save_position(&self, name: &str, angles: &[f64]) -> Result<SavedPosition> {
        check_name("position", name)?;
        let angles = angles_from_slice(angles).ok_or_else(|| {
            RobotError::validation(format!(
                "expected 6 finite joint angles, got {} values",
                angles.len()
            ))
        })?;
        let position = SavedPosition::new(&angles);
        self.positions.upsert(name.trim(), position.clone())?;
        info!(position = %name, angles = ?position.angles, "position saved");
        Ok(position)
    }

    /// 读取硬件当前角度并保存
    pub fn save_current_position(&self, name: &str) -> Result<SavedPosition> {
        check_name("position", name)?;
        let angles = self.controller.read_angles()?;
        self.save_position(name, &angles)
    }

    /// 删除位置
    pub fn delete_position(&self, name: &str) -> Result<()> {
        self.positions
            .remove(name)
            .map_err(|e| not_found("position", name, e))?;
        info!(position = %name, "position deleted");
        Ok(())
    }

    /// 启用 / 禁用位置
    pub fn set_position_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        self.positions
            .modify(name, |p| p.enabled = enabled)
            .map_err(|e| not_found("position", name, e))
    }

    /// 以程序速度移动到已保存位置（不等待稳定）
    ///
    /// 有序列在执行时拒绝。
    pub fn move_to_position(&self, name: &str) -> Result<JointAngles> {
        let position = self
            .positions
            .get(name)
            .ok_or_else(|| RobotError::validation(format!("position '{}' not found", name)))?;
        let state = self.controller.state();
        if let Some(kind) = state.active_sequence() {
            return Err(RobotError::busy(BusyReason::Sequence(kind)));
        }
        self.controller.ensure_powered()?;
        state.set_manual_control(true);
        let sent = self
            .controller
            .bridge()
            .send(&position.angles, self.controller.motion().procedure_speed)?;
        info!(position = %name, "moved to position");
        Ok(sent)
    }

    // ==================== 程序 ====================

    /// 按名称查找程序
    pub fn procedure(&self, name: &str) -> Option<Procedure> {
        self.procedures.get(name)
    }

    /// 全部程序
    pub fn procedures(&self) -> Vec<(String, Procedure)> {
        self.procedures.list()
    }

    /// 保存或更新程序；更新时保留创建时间
    pub fn save_procedure(
        &self,
        name: &str,
        steps: Vec<ProcedureStep>,
        description: &str,
    ) -> Result<Procedure> {
        check_name("procedure", name)?;
        validate_steps(&steps).map_err(RobotError::Validation)?;

        let mut procedure = Procedure::new(steps, description);
        if let Some(previous) = self.procedures.get(name.trim()) {
            procedure.created = previous.created;
            procedure.updated = Some(now_unix());
        }
        self.procedures.upsert(name.trim(), procedure.clone())?;
        info!(procedure = %name, steps = procedure.step_count(), "procedure saved");
        Ok(procedure)
    }

    /// 删除程序
    pub fn delete_procedure(&self, name: &str) -> Result<()> {
        self.procedures
            .remove(name)
            .map_err(|e| not_found("procedure", name, e))?;
        info!(procedure = %name, "procedure deleted");
        Ok(())
    }
}

fn check_name(what: &str, name: &str) -> Result<()> {
    if validate_name(name) {
        Ok(())
    } else {
        Err(RobotError::validation(format!("invalid {} name '{}'", what, name)))
    }
}

fn not_found(what: &str, name: &str, err: StoreError) -> RobotError {
    match err {
        StoreError::NotFound(_) => RobotError::validation(format!("{} '{}' not found", what, name)),
        other => RobotError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::KinematicsBridge;
    use crate::state::{RobotMotionState, SequenceKind};
    use cobot_driver::{Connection, MockArm};
    use cobot_tools::MotionConfig;

    fn library(arm: &MockArm) -> MotionLibrary {
        let bridge = KinematicsBridge::new(
            Arc::new(Connection::new(Box::new(arm.clone()))),
            Arc::new(RobotMotionState::new()),
        );
        let controller = Arc::new(ArmController::new(
            bridge,
            MotionConfig::with_uniform_settle(0),
            50,
        ));
        MotionLibrary::new(
            controller,
            Arc::new(PositionStore::in_memory()),
            Arc::new(ProcedureStore::in_memory()),
        )
    }

    #[test]
    fn test_save_position_clamps_and_validates() {
        let lib = library(&MockArm::new());
        let saved = lib.save_position("wave", &[500.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(saved.angles[0], 168.0);
        assert!(saved.enabled);

        assert!(matches!(
            lib.save_position("bad/name", &[0.0; 6]),
            Err(RobotError::Validation(_))
        ));
        assert!(matches!(
            lib.save_position("short", &[0.0; 5]),
            Err(RobotError::Validation(_))
        ));
    }

    #[test]
    fn test_save_current_position_reads_hardware() {
        let arm = MockArm::with_angles([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let lib = library(&arm);
        let saved = lib.save_current_position("here").unwrap();
        assert_eq!(saved.angles, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_enable_and_delete_position() {
        let lib = library(&MockArm::new());
        lib.save_position("a", &[0.0; 6]).unwrap();
        lib.save_position("b", &[0.0; 6]).unwrap();
        lib.set_position_enabled("a", false).unwrap();

        let enabled: Vec<_> = lib.enabled_positions().into_iter().map(|(n, _)| n).collect();
        assert_eq!(enabled, vec!["b".to_string()]);

        lib.delete_position("a").unwrap();
        assert!(matches!(lib.delete_position("a"), Err(RobotError::Validation(_))));
        assert!(lib.set_position_enabled("missing", true).is_err());
    }

    #[test]
    fn test_move_to_position_uses_procedure_speed() {
        let arm = MockArm::new();
        let lib = library(&arm);
        lib.save_position("target", &[10.0; 6]).unwrap();
        let sent = lib.move_to_position("target").unwrap();
        assert_eq!(sent, [10.0; 6]);
        assert_eq!(arm.last_sent().unwrap().speed, 80);
    }

    #[test]
    fn test_move_to_position_rejected_while_busy() {
        let arm = MockArm::new();
        let lib = library(&arm);
        lib.save_position("target", &[10.0; 6]).unwrap();
        lib.controller
            .state()
            .try_begin_sequence(SequenceKind::Jiggle)
            .unwrap();
        assert!(matches!(
            lib.move_to_position("target"),
            Err(RobotError::Busy { .. })
        ));
        assert!(arm.sent_commands().is_empty());
    }

    #[test]
    fn test_save_procedure_preserves_created() {
        let lib = library(&MockArm::new());
        let steps = vec![ProcedureStep::Position("a".into()), ProcedureStep::Delay(1.0)];
        let first = lib.save_procedure("routine", steps.clone(), "  first ").unwrap();
        assert_eq!(first.description, "first");
        assert!(first.updated.is_none());

        let second = lib.save_procedure("routine", steps, "second").unwrap();
        assert_eq!(second.created, first.created);
        assert!(second.updated.is_some());
        assert_eq!(lib.procedures().len(), 1);
    }

    #[test]
    fn test_save_procedure_rejects_invalid_steps() {
        let lib = library(&MockArm::new());
        assert!(matches!(
            lib.save_procedure("empty", vec![], ""),
            Err(RobotError::Validation(_))
        ));
        assert!(matches!(
            lib.save_procedure("neg", vec![ProcedureStep::Delay(-1.0)], ""),
            Err(RobotError::Validation(_))
        ));
        assert!(lib.procedure("neg").is_none());
        assert!(lib.delete_procedure("neg").is_err());
    }
}
