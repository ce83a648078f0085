//! 硬件 SDK 抽象
//!
//! 串口驱动的字节协议不在本仓库范围内，这里只描述它暴露的原语。
//! 读取类原语返回 `Option<Vec<f64>>`，与厂商 SDK 在无响应时返回空值的行为一致，
//! 长度和数值合法性由 [`Connection`](crate::Connection) 负责校验。

use crate::DriverError;

/// 六轴机械臂硬件原语
///
/// 实现者不需要线程安全：所有调用都由 `Connection` 的连接锁串行化。
pub trait ArmDriver: Send {
    /// 读取当前关节角度（度）
    fn get_angles(&mut self) -> Result<Option<Vec<f64>>, DriverError>;

    /// 发送绝对关节角度（度），速度 1-100
    fn send_angles(&mut self, angles: &[f64; 6], speed: u8) -> Result<(), DriverError>;

    /// 读取当前末端位姿 `[x, y, z, rx, ry, rz]`（毫米 / 度）
    fn get_coords(&mut self) -> Result<Option<Vec<f64>>, DriverError>;

    /// 正运动学：关节角度（度）→ `[x, y, z, rx, ry, rz]`
    fn angles_to_coords(&mut self, angles: &[f64; 6]) -> Result<Option<Vec<f64>>, DriverError>;

    /// 逆运动学：目标位姿 + 种子角度 → 关节角度
    ///
    /// **返回值单位是 centidegrees**，调用方必须除以 100。
    fn solve_inverse_kinematics(
        &mut self,
        target: &[f64; 6],
        seed: &[f64; 6],
    ) -> Result<Option<Vec<f64>>, DriverError>;

    /// 上电
    fn power_on(&mut self) -> Result<(), DriverError>;

    /// 断电
    fn power_off(&mut self) -> Result<(), DriverError>;
}

impl<T: ArmDriver + ?Sized> ArmDriver for Box<T> {
    fn get_angles(&mut self) -> Result<Option<Vec<f64>>, DriverError> {
        (**self).get_angles()
    }

    fn send_angles(&mut self, angles: &[f64; 6], speed: u8) -> Result<(), DriverError> {
        (**self).send_angles(angles, speed)
    }

    fn get_coords(&mut self) -> Result<Option<Vec<f64>>, DriverError> {
        (**self).get_coords()
    }

    fn angles_to_coords(&mut self, angles: &[f64; 6]) -> Result<Option<Vec<f64>>, DriverError> {
        (**self).angles_to_coords(angles)
    }

    fn solve_inverse_kinematics(
        &mut self,
        target: &[f64; 6],
        seed: &[f64; 6],
    ) -> Result<Option<Vec<f64>>, DriverError> {
        (**self).solve_inverse_kinematics(target, seed)
    }

    fn power_on(&mut self) -> Result<(), DriverError> {
        (**self).power_on()
    }

    fn power_off(&mut self) -> Result<(), DriverError> {
        (**self).power_off()
    }
}
