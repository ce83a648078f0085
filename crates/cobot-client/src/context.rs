//! 运行上下文
//!
//! 启动时构建一次，持有所有共享组件。使用方按引用传递，不使用全局单例。

use std::sync::Arc;

use cobot_driver::{ArmDriver, Connection};
use cobot_tools::{AppConfig, CalibrationStore, JsonStore, PositionStore, ProcedureStore};
use tracing::{info, warn};

use crate::calibration::PlaneCalibrationEngine;
use crate::controller::ArmController;
use crate::coordinator::MotionCoordinator;
use crate::kinematics::KinematicsBridge;
use crate::library::MotionLibrary;
use crate::state::RobotMotionState;
use crate::status::StatusSnapshot;

/// 运行上下文
#[derive(Debug)]
pub struct RobotContext {
    /// 应用配置
    pub config: AppConfig,
    /// 硬件连接
    pub connection: Arc<Connection>,
    /// 运动状态
    pub state: Arc<RobotMotionState>,
    /// 运动学桥
    pub bridge: KinematicsBridge,
    /// 控制器
    pub controller: Arc<ArmController>,
    /// 运动序列协调器
    pub coordinator: Arc<MotionCoordinator>,
    /// 平面标定
    pub calibration: Arc<PlaneCalibrationEngine>,
    /// 位置与程序库
    pub library: MotionLibrary,
    /// 位置存储
    pub positions: Arc<PositionStore>,
    /// 程序存储
    pub procedures: Arc<ProcedureStore>,
    /// 标定存储
    pub calibrations: Arc<CalibrationStore>,
}

impl RobotContext {
    /// 由配置和可选的驱动构建
    ///
    /// 没有驱动时以无硬件模式运行，硬件相关操作返回 `HardwareUnavailable`。
    pub fn new(config: AppConfig, driver: Option<Box<dyn ArmDriver>>) -> Self {
        let connection = Arc::new(Connection::from_optional(driver));
        if connection.is_connected() {
            info!(port = %config.robot.port, "robot driver attached");
        } else {
            warn!("no robot driver, running without hardware");
        }

        let state = Arc::new(RobotMotionState::new());
        let bridge = KinematicsBridge::new(Arc::clone(&connection), Arc::clone(&state));
        let controller = Arc::new(ArmController::new(
            bridge.clone(),
            config.motion.clone(),
            config.robot.jog_speed,
        ));

        let positions = Arc::new(JsonStore::from_optional(config.storage.positions_file.clone()));
        let procedures = Arc::new(JsonStore::from_optional(config.storage.procedures_file.clone()));
        let calibrations = Arc::new(JsonStore::from_optional(
            config.storage.calibrations_file.clone(),
        ));

        let coordinator = Arc::new(MotionCoordinator::new(
            Arc::clone(&controller),
            Arc::clone(&positions),
            Arc::clone(&procedures),
        ));
        let calibration = Arc::new(PlaneCalibrationEngine::new(
            Arc::clone(&controller),
            Arc::clone(&calibrations),
        ));
        let library = MotionLibrary::new(
            Arc::clone(&controller),
            Arc::clone(&positions),
            Arc::clone(&procedures),
        );

        RobotContext {
            config,
            connection,
            state,
            bridge,
            controller,
            coordinator,
            calibration,
            library,
            positions,
            procedures,
            calibrations,
        }
    }

    /// 状态快照（不做硬件 I/O）
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot::capture(&self.state, &self.connection)
    }

    /// 取消正在执行的序列，并清除所有模式标志
    ///
    /// 不等待序列结束：序列占用在它的线程清理完成后才释放，此前新序列仍会被拒绝。
    pub fn reset_to_safe_state(&self) {
        if let Some(kind) = self.coordinator.stop() {
            info!(%kind, "sequence cancelled by reset");
        }
        self.state.reset_to_safe_state();
    }
}
