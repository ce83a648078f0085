//! # 平面标定
//!
//! - 最小二乘平面拟合（SVD，取最小奇异值对应的右奇异向量为法向）
//! - 由末端姿态构造平面坐标系
//! - 在标定平面内移动末端
//!
//! 位姿由理想角度经正解得到，不读硬件坐标。

use std::sync::Arc;

use cobot_tools::{
    CalibrationStore, JointAngles, PlaneCalibration, ReferencePoint, Vec3, now_unix,
    validate_name,
};
use nalgebra::{DMatrix, Vector3};
use tracing::{debug, info, warn};

use crate::calibration::screen::ScreenMapper;
use crate::controller::ArmController;
use crate::types::{CartesianPose, Result, RobotError};

/// 水平投影的最小长度（低于此值认为末端接近竖直）
const MIN_HORIZONTAL_NORM: f64 = 0.1;

/// 存储坐标系的容差（点积 / 模长偏差），超过则重新正交化
const FRAME_TOLERANCE: f64 = 0.1;

/// 判定两个单位向量平行的阈值
const PARALLEL_EPS: f64 = 1e-6;

/// 共线判定阈值（第二小奇异值）
const COLLINEAR_EPS: f64 = 1e-9;

/// 平面拟合结果
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneFit {
    /// 质心（平面上一点）
    pub point: Vec3,
    /// 单位法向（`z >= 0`）
    pub normal: Vec3,
    /// 平面方程 `[a, b, c, d]`：`ax + by + cz + d = 0`
    pub equation: [f64; 4],
    /// 各点到平面的均方根距离
    pub fit_error: f64,
}

impl PlaneFit {
    /// 点到平面的有符号距离
    pub fn signed_distance(&self, p: &Vec3) -> f64 {
        let [a, b, c, d] = self.equation;
        a * p[0] + b * p[1] + c * p[2] + d
    }
}

/// 右手正交坐标系 `{local_x, local_y, normal}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFrame {
    /// 平面内 X 轴
    pub local_x: Vector3<f64>,
    /// 平面内 Y 轴（`normal × local_x`）
    pub local_y: Vector3<f64>,
    /// 法向
    pub normal: Vector3<f64>,
}

impl PlaneFrame {
    /// 由法向和 X 方向提示构造
    ///
    /// 提示先投影到水平面；投影太短时改用世界 X 轴，世界 X 与法向平行时改用世界 Y 轴。
    /// 最后做一次 Gram-Schmidt 修正。
    pub fn from_normal(normal: &Vector3<f64>, x_hint: &Vector3<f64>) -> Result<Self> {
        let normal = normal
            .try_normalize(PARALLEL_EPS)
            .ok_or_else(|| RobotError::validation("plane normal has zero length"))?;

        let horizontal = Vector3::new(x_hint.x, x_hint.y, 0.0);
        let mut x = match horizontal.try_normalize(MIN_HORIZONTAL_NORM) {
            Some(h) => h,
            None => {
                debug!("end effector near vertical, using world X axis");
                Vector3::x()
            },
        };
        if normal.cross(&x).norm() < PARALLEL_EPS {
            x = Vector3::y();
        }

        let local_y = normal.cross(&x).normalize();
        let local_x = local_y.cross(&normal).normalize();
        Ok(PlaneFrame {
            local_x,
            local_y,
            normal,
        })
    }

    /// 由末端姿态构造：法向为末端 Z 轴，X 方向提示为末端 X 轴
    pub fn from_orientation(pose: &CartesianPose) -> Result<Self> {
        let rotation = pose.rotation();
        let m = rotation.matrix();
        let normal: Vector3<f64> = m.column(2).into_owned();
        let ee_x: Vector3<f64> = m.column(0).into_owned();
        Self::from_normal(&normal, &ee_x)
    }

    /// 从存储的标定读取；偏差过大时重新正交化
    pub fn from_calibration(cal: &PlaneCalibration) -> Result<Self> {
        let x = Vector3::from(cal.local_x_axis);
        let y = Vector3::from(cal.local_y_axis);
        let n = Vector3::from(cal.normal);

        let dots = [x.dot(&y), x.dot(&n), y.dot(&n)];
        let norms = [x.norm(), y.norm(), n.norm()];
        let skewed = dots.iter().any(|d| d.abs() > FRAME_TOLERANCE);
        let scaled = norms.iter().any(|m| (m - 1.0).abs() > FRAME_TOLERANCE);
        if !skewed && !scaled {
            return Ok(PlaneFrame {
                local_x: x,
                local_y: y,
                normal: n,
            });
        }

        warn!(
            calibration = %cal.name,
            ?dots,
            ?norms,
            "stored plane axes not orthonormal, repairing"
        );
        let normal = n
            .try_normalize(PARALLEL_EPS)
            .ok_or_else(|| RobotError::validation("stored plane normal has zero length"))?;
        match (x - normal * x.dot(&normal)).try_normalize(PARALLEL_EPS) {
            Some(local_x) => Ok(PlaneFrame {
                local_x,
                local_y: normal.cross(&local_x),
                normal,
            }),
            None => Self::from_normal(&normal, &Vector3::x()),
        }
    }
}

/// 最小二乘平面拟合（至少 3 个不共线的点）
pub fn fit_best_plane(points: &[Vec3]) -> Result<PlaneFit> {
    if points.len() < 3 {
        return Err(RobotError::validation(format!(
            "at least 3 points required for plane fitting, got {}",
            points.len()
        )));
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(RobotError::validation("plane points must be finite"));
    }

    let n = points.len() as f64;
    let centroid = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + Vector3::from(*p))
        / n;

    let centered = DMatrix::from_fn(points.len(), 3, |i, j| points[i][j] - centroid[j]);
    let svd = centered.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| RobotError::validation("SVD did not converge"))?;

    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|a, b| svd.singular_values[*a].total_cmp(&svd.singular_values[*b]));
    let (smallest, second) = match order.as_slice() {
        [s, t, ..] => (*s, *t),
        _ => return Err(RobotError::validation("degenerate point set")),
    };
    if svd.singular_values[second] < COLLINEAR_EPS {
        return Err(RobotError::validation("plane points are collinear"));
    }

    let row = v_t.row(smallest);
    let mut normal = Vector3::new(row[0], row[1], row[2]).normalize();
    if normal.z < 0.0 {
        normal = -normal;
    }

    let d = -normal.dot(&centroid);
    let sum_sq: f64 = points
        .iter()
        .map(|p| {
            let dist = normal.dot(&Vector3::from(*p)) + d;
            dist * dist
        })
        .sum();

    Ok(PlaneFit {
        point: centroid.into(),
        normal: normal.into(),
        equation: [normal.x, normal.y, normal.z, d],
        fit_error: (sum_sq / n).sqrt(),
    })
}

/// 平面标定引擎
pub struct PlaneCalibrationEngine {
    controller: Arc<ArmController>,
    store: Arc<CalibrationStore>,
}

impl PlaneCalibrationEngine {
    /// 创建引擎
    pub fn new(controller: Arc<ArmController>, store: Arc<CalibrationStore>) -> Self {
        PlaneCalibrationEngine { controller, store }
    }

    /// 标定存储
    pub fn store(&self) -> &Arc<CalibrationStore> {
        &self.store
    }

    /// 最小二乘平面拟合
    pub fn fit_best_plane(&self, points: &[Vec3]) -> Result<PlaneFit> {
        fit_best_plane(points)
    }

    /// 按名称查找标定
    pub fn calibration(&self, name: &str) -> Result<PlaneCalibration> {
        self.store
            .get(name)
            .ok_or_else(|| RobotError::validation(format!("calibration '{}' not found", name)))
    }

    /// 全部标定
    pub fn calibrations(&self) -> Vec<PlaneCalibration> {
        self.store.list().into_iter().map(|(_, cal)| cal).collect()
    }

    /// 删除标定
    pub fn delete_calibration(&self, name: &str) -> Result<()> {
        self.store.remove(name).map_err(|_| {
            RobotError::validation(format!("calibration '{}' not found", name))
        })?;
        info!(calibration = %name, "calibration deleted");
        Ok(())
    }

    /// 理想角度和对应的理想位姿；理想状态未初始化时先从硬件同步一次
    fn ideal_pose(&self) -> Result<(JointAngles, CartesianPose)> {
        if !self.controller.state().is_initialized() {
            self.controller.sync_from_hardware()?;
        }
        self.controller.bridge().ideal_pose()
    }

    /// 由当前末端姿态创建平面标定并保存
    ///
    /// `seed_angles` 只在理想状态尚未初始化时使用。
    pub fn calibrate_from_orientation(
        &self,
        name: &str,
        seed_angles: Option<&JointAngles>,
    ) -> Result<PlaneCalibration> {
        check_name(name)?;
        let state = self.controller.state();
        if !state.is_initialized() {
            if let Err(e) = self.controller.sync_from_hardware() {
                let Some(seed) = seed_angles else {
                    return Err(e);
                };
                warn!(error = %e, "hardware read failed, using seed angles");
                state.update_ideal_angles(seed);
            }
        }

        let (angles, pose) = self.controller.bridge().ideal_pose()?;
        let frame = PlaneFrame::from_orientation(&pose)?;

        let calibration = PlaneCalibration {
            name: name.trim().to_string(),
            point: pose.position,
            normal: frame.normal.into(),
            local_x_axis: frame.local_x.into(),
            local_y_axis: frame.local_y.into(),
            orientation: pose.orientation,
            reference_points: vec![ReferencePoint {
                screen: None,
                world: Some(pose.position),
                angles: Some(angles),
            }],
            created: 0,
            updated: None,
        };
        let saved = self.persist(calibration)?;
        info!(calibration = %saved.name, normal = ?saved.normal, "plane calibrated from orientation");
        Ok(saved)
    }

    /// 由参考点拟合平面并保存
    ///
    /// 至少 3 个带世界坐标的点。姿态未给出时使用当前理想姿态（未初始化则为零）。
    pub fn save_calibration(
        &self,
        name: &str,
        points: Vec<ReferencePoint>,
        orientation: Option<Vec3>,
    ) -> Result<(PlaneCalibration, PlaneFit)> {
        check_name(name)?;
        let world: Vec<Vec3> = points.iter().filter_map(|p| p.world).collect();
        let fit = fit_best_plane(&world)?;
        let frame = PlaneFrame::from_normal(&Vector3::from(fit.normal), &Vector3::x())?;

        let orientation = match orientation {
            Some(o) => o,
            None => self
                .controller
                .bridge()
                .ideal_pose()
                .map(|(_, pose)| pose.orientation)
                .unwrap_or([0.0; 3]),
        };

        let calibration = PlaneCalibration {
            name: name.trim().to_string(),
            point: fit.point,
            normal: frame.normal.into(),
            local_x_axis: frame.local_x.into(),
            local_y_axis: frame.local_y.into(),
            orientation,
            reference_points: points,
            created: 0,
            updated: None,
        };
        let saved = self.persist(calibration)?;
        info!(
            calibration = %saved.name,
            fit_error = fit.fit_error,
            "plane calibrated from reference points"
        );
        Ok((saved, fit))
    }

    /// 在标定平面内移动 `(dx, dy)` 毫米，姿态保持不变；返回下发的角度
    ///
    /// `(0, 0)` 是恒等移动。
    pub fn move_in_plane(&self, name: &str, dx_local: f64, dy_local: f64) -> Result<JointAngles> {
        if !dx_local.is_finite() || !dy_local.is_finite() {
            return Err(RobotError::validation("plane offsets must be finite"));
        }
        let calibration = self.calibration(name)?;
        let frame = PlaneFrame::from_calibration(&calibration)?;

        self.controller.ensure_powered()?;
        let (angles, pose) = self.ideal_pose()?;
        let target: Vec3 =
            (pose.position_vector() + frame.local_x * dx_local + frame.local_y * dy_local).into();

        let bridge = self.controller.bridge();
        let solved = bridge.inverse(&target, &pose.orientation, &angles)?;

        let state = self.controller.state();
        state.set_manual_control(true);
        state.set_plane_mode(true);
        let sent = bridge.send(&solved, self.controller.jog_speed())?;
        debug!(calibration = %name, dx_local, dy_local, ?sent, "moved in plane");
        Ok(sent)
    }

    /// 屏幕坐标 → 平面上的世界坐标 → 关节角度（不下发）
    pub fn map_screen_to_world(&self, name: &str, screen: [f64; 2]) -> Result<(Vec3, JointAngles)> {
        let calibration = self.calibration(name)?;
        let world = ScreenMapper::map(&calibration, screen)?;
        let seed = self.controller.state().get_ideal_angles();
        let angles = self
            .controller
            .bridge()
            .inverse(&world, &calibration.orientation, &seed)?;
        Ok((world, angles))
    }

    /// 保存；同名标定保留原创建时间
    fn persist(&self, mut calibration: PlaneCalibration) -> Result<PlaneCalibration> {
        let now = now_unix();
        calibration.created = self
            .store
            .get(&calibration.name)
            .map(|previous| previous.created)
            .unwrap_or(now);
        calibration.updated = Some(now);
        self.store.upsert(&calibration.name, calibration.clone())?;
        Ok(calibration)
    }
}

impl std::fmt::Debug for PlaneCalibrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaneCalibrationEngine")
            .field("calibrations", &self.store.len())
            .finish()
    }
}

fn check_name(name: &str) -> Result<()> {
    if validate_name(name) {
        Ok(())
    } else {
        Err(RobotError::validation(format!(
            "invalid calibration name '{}'",
            name
        )))
    }
}
