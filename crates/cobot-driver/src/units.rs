//! 强类型单位
//!
//! 硬件 IK 求解器返回的是**百分之一度**（centidegrees），而其余所有接口都使用度。
//! `Centidegrees` 是一个不透明的 NewType：内部数组不可直接取出，
//! 只能通过 [`Centidegrees::to_degrees`] 换算后使用，
//! 因此未换算的原始值在类型层面无法传给 `send_angles`。
//!
//! ```rust
//! use cobot_driver::Centidegrees;
//!
//! let raw = Centidegrees::new([-4440.0, 10328.0, 13893.0, -6142.0, -4414.0, -12861.0]);
//! let deg = raw.to_degrees();
//! assert!((deg[0] + 44.4).abs() < 1e-9);
//! ```

use std::fmt;

/// 每度对应的 centidegree 数
pub const CENTIDEGREES_PER_DEGREE: f64 = 100.0;

/// IK 求解器的原始输出（百分之一度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centidegrees([f64; 6]);

impl Centidegrees {
    /// 包装原始求解结果
    #[inline]
    pub const fn new(raw: [f64; 6]) -> Self {
        Centidegrees(raw)
    }

    /// 换算为度
    #[inline]
    pub fn to_degrees(self) -> [f64; 6] {
        self.0.map(|v| v / CENTIDEGREES_PER_DEGREE)
    }

    /// 原始值（仅用于日志和诊断）
    #[inline]
    pub fn raw(&self) -> &[f64; 6] {
        &self.0
    }
}

impl fmt::Display for Centidegrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} cdeg", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_representative_ik_vector_converts_into_range() {
        let raw = Centidegrees::new([-4440.0, 10328.0, 13893.0, -6142.0, -4414.0, -12861.0]);
        let deg = raw.to_degrees();

        let expected = [-44.4, 103.28, 138.93, -61.42, -44.14, -128.61];
        for (d, e) in deg.iter().zip(expected.iter()) {
            assert_relative_eq!(*d, *e, epsilon = 1e-9);
            assert!(d.abs() <= 180.0);
        }

        // 原始值保持不变（不会被就地修改）
        assert_eq!(raw.raw()[1], 10328.0);
    }
}
