//! 屏幕坐标到墙面世界坐标的映射
//!
//! 恰好 4 个参考点时做双线性插值，更多点时做反距离加权。结果总是投影回标定平面。

use cobot_tools::{PlaneCalibration, Vec3};
use nalgebra::{Vector2, Vector3};

use crate::types::{Result, RobotError};

/// 反距离加权的最小距离
const MIN_DISTANCE: f64 = 1e-6;

/// 屏幕映射（纯几何计算，无状态）
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenMapper;

impl ScreenMapper {
    /// 把屏幕坐标映射到标定平面上的世界坐标
    pub fn map(calibration: &PlaneCalibration, screen: [f64; 2]) -> Result<Vec3> {
        if !screen.iter().all(|v| v.is_finite()) {
            return Err(RobotError::validation("screen coordinates must be finite"));
        }
        let points = calibration.mapped_points();
        if points.len() < 4 {
            return Err(RobotError::validation(format!(
                "calibration '{}' needs at least 4 screen-mapped points, has {}",
                calibration.name,
                points.len()
            )));
        }

        let raw = if points.len() == 4 {
            bilinear(&points, screen)?
        } else {
            inverse_distance(&points, screen)
        };
        project_onto_plane(raw, calibration)
    }
}

/// 四角双线性插值
fn bilinear(points: &[([f64; 2], Vec3)], screen: [f64; 2]) -> Result<Vector3<f64>> {
    let (mut min, mut max) = (
        Vector2::repeat(f64::INFINITY),
        Vector2::repeat(f64::NEG_INFINITY),
    );
    for (s, _) in points {
        let s = Vector2::from(*s);
        min = min.inf(&s);
        max = max.sup(&s);
    }
    let size = max - min;
    if size.x <= 0.0 || size.y <= 0.0 {
        return Err(RobotError::validation(
            "screen points do not span a rectangle",
        ));
    }

    let u = ((screen[0] - min.x) / size.x).clamp(0.0, 1.0);
    let v = ((screen[1] - min.y) / size.y).clamp(0.0, 1.0);

    // 先按 y 分出上下两行，再按 x 分出左右
    let mut corners: Vec<([f64; 2], Vector3<f64>)> = points
        .iter()
        .map(|(s, w)| (*s, Vector3::from(*w)))
        .collect();
    corners.sort_by(|a, b| a.0[1].total_cmp(&b.0[1]));
    let (top, bottom) = corners.split_at_mut(2);
    top.sort_by(|a, b| a.0[0].total_cmp(&b.0[0]));
    bottom.sort_by(|a, b| a.0[0].total_cmp(&b.0[0]));

    let (tl, tr) = (top[0].1, top[1].1);
    let (bl, br) = (bottom[0].1, bottom[1].1);
    Ok(tl * ((1.0 - u) * (1.0 - v)) + tr * (u * (1.0 - v)) + bl * ((1.0 - u) * v) + br * (u * v))
}

/// 反距离加权平均
fn inverse_distance(points: &[([f64; 2], Vec3)], screen: [f64; 2]) -> Vector3<f64> {
    let target = Vector2::from(screen);
    let mut weighted = Vector3::zeros();
    let mut total = 0.0;
    for (s, w) in points {
        let distance = (Vector2::from(*s) - target).norm().max(MIN_DISTANCE);
        let weight = 1.0 / distance;
        weighted += Vector3::from(*w) * weight;
        total += weight;
    }
    weighted / total
}

fn project_onto_plane(world: Vector3<f64>, calibration: &PlaneCalibration) -> Result<Vec3> {
    let normal = Vector3::from(calibration.normal)
        .try_normalize(MIN_DISTANCE)
        .ok_or_else(|| RobotError::validation("plane normal has zero length"))?;
    let point = Vector3::from(calibration.point);
    let projected = world - normal * (world - point).dot(&normal);
    Ok(projected.into())
}
