//! 串行化的硬件连接
//!
//! 串口链路只有一个所有者且不可重入：并发的 get/send 调用绝不能交错。
//! `Connection` 用一把连接锁包住驱动，所有原语都在锁内执行；
//! 状态锁（`RobotMotionState`）与这把锁相互独立。
//!
//! ```text
//! ┌──────────────────────┐
//! │      Connection      │
//! ├──────────────────────┤
//! │ driver               │ ← Option<Mutex<Box<dyn ArmDriver>>>
//! │ connected            │ ← 构造时确定，无锁读取
//! └──────────────────────┘
//! ```

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{ArmDriver, Centidegrees, DriverError};

/// 关节 / 位姿向量长度
const AXES: usize = 6;

/// 机械臂连接（连接锁）
pub struct Connection {
    driver: Option<Mutex<Box<dyn ArmDriver>>>,
}

impl Connection {
    /// 使用已打开的驱动创建连接
    pub fn new(driver: Box<dyn ArmDriver>) -> Self {
        Connection {
            driver: Some(Mutex::new(driver)),
        }
    }

    /// 创建一个没有硬件的连接（所有调用返回 `NotConnected`）
    pub fn disconnected() -> Self {
        Connection { driver: None }
    }

    /// 从可选驱动创建
    pub fn from_optional(driver: Option<Box<dyn ArmDriver>>) -> Self {
        match driver {
            Some(d) => Connection::new(d),
            None => Connection::disconnected(),
        }
    }

    /// 是否有硬件连接（不加锁，不做 I/O）
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    /// 在连接锁内执行一次驱动调用
    fn with_driver<R>(
        &self,
        command: &'static str,
        f: impl FnOnce(&mut dyn ArmDriver) -> Result<R, DriverError>,
    ) -> Result<R, DriverError> {
        let driver = self.driver.as_ref().ok_or(DriverError::NotConnected)?;
        let mut guard = driver.lock();
        let result = f(&mut **guard);
        if let Err(e) = &result {
            error!(command, error = %e, "driver call failed");
        }
        result
    }

    /// 读取当前关节角度（度）
    pub fn get_angles(&self) -> Result<[f64; 6], DriverError> {
        let raw = self.with_driver("get_angles", |d| d.get_angles())?;
        to_axes("get_angles", raw)
    }

    /// 发送关节角度（度）
    ///
    /// 调用方负责限位；这里只做串行化和日志。
    pub fn send_angles(&self, angles: &[f64; 6], speed: u8) -> Result<(), DriverError> {
        if angles.iter().any(|v| !v.is_finite()) {
            return Err(DriverError::NonFinite {
                command: "send_angles",
            });
        }
        debug!(?angles, speed, "send_angles");
        self.with_driver("send_angles", |d| d.send_angles(angles, speed))
    }

    /// 读取当前末端位姿（毫米 / 度）
    pub fn get_coords(&self) -> Result<[f64; 6], DriverError> {
        let raw = self.with_driver("get_coords", |d| d.get_coords())?;
        to_axes("get_coords", raw)
    }

    /// 正运动学
    pub fn angles_to_coords(&self, angles: &[f64; 6]) -> Result<[f64; 6], DriverError> {
        let raw = self.with_driver("angles_to_coords", |d| d.angles_to_coords(angles))?;
        to_axes("angles_to_coords", raw)
    }

    /// 逆运动学，返回未换算的 centidegrees
    pub fn solve_inverse_kinematics(
        &self,
        target: &[f64; 6],
        seed: &[f64; 6],
    ) -> Result<Centidegrees, DriverError> {
        let raw = self.with_driver("solve_inverse_kinematics", |d| {
            d.solve_inverse_kinematics(target, seed)
        })?;
        to_axes("solve_inverse_kinematics", raw).map(Centidegrees::new)
    }

    /// 上电
    pub fn power_on(&self) -> Result<(), DriverError> {
        self.with_driver("power_on", |d| d.power_on())
    }

    /// 断电
    pub fn power_off(&self) -> Result<(), DriverError> {
        self.with_driver("power_off", |d| d.power_off())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// 校验硬件返回值：非空、长度为 6、全部有限
fn to_axes(command: &'static str, raw: Option<Vec<f64>>) -> Result<[f64; 6], DriverError> {
    let values = raw.ok_or(DriverError::EmptyResponse { command })?;
    let axes: [f64; AXES] = values
        .as_slice()
        .try_into()
        .map_err(|_| DriverError::InvalidResponse {
            command,
            expected: AXES,
            actual: values.len(),
        })?;
    if axes.iter().any(|v| !v.is_finite()) {
        return Err(DriverError::NonFinite { command });
    }
    Ok(axes)
}
