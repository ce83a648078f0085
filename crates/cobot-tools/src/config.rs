//! # 应用配置
//!
//! TOML 格式，所有字段都有默认值，配置文件可以只写需要覆盖的部分：
//!
//! ```toml
//! [robot]
//! port = "/dev/ttyUSB0"
//!
//! [motion]
//! home_settle_ms = 4000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 应用配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 机械臂连接
    pub robot: RobotConfig,
    /// 运动时序
    pub motion: MotionConfig,
    /// 存储路径
    pub storage: StorageConfig,
}

impl AppConfig {
    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 文件存在时加载，否则使用默认配置
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// 机械臂连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// 串口
    pub port: String,
    /// 波特率
    pub baudrate: u32,
    /// 手动点动和平面移动的速度（1-100）
    pub jog_speed: u8,
}

impl Default for RobotConfig {
    fn default() -> Self {
        RobotConfig {
            port: "/dev/ttyAMA0".to_string(),
            baudrate: 115_200,
            jog_speed: 50,
        }
    }
}

/// 运动时序配置
///
/// 硬件没有运动完成应答，每类运动发送后等待固定的稳定时间。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// 上电后等待（毫秒）
    pub power_on_settle_ms: u64,
    /// 回零前唤醒读取后等待（毫秒）
    pub wake_settle_ms: u64,
    /// 回零后等待（毫秒）
    pub home_settle_ms: u64,
    /// 伸展后等待（毫秒）
    pub extend_settle_ms: u64,
    /// 回放每步等待（毫秒）
    pub playback_settle_ms: u64,
    /// 程序每个位置步骤后等待（毫秒）
    pub procedure_settle_ms: u64,
    /// 回放 / 抖动速度
    pub playback_speed: u8,
    /// 程序执行速度
    pub procedure_speed: u8,
    /// 回零 / 伸展速度
    pub home_speed: u8,
}

impl Default for MotionConfig {
    fn default() -> Self {
        MotionConfig {
            power_on_settle_ms: 500,
            wake_settle_ms: 200,
            home_settle_ms: 6000,
            extend_settle_ms: 4000,
            playback_settle_ms: 1000,
            procedure_settle_ms: 2000,
            playback_speed: 100,
            procedure_speed: 80,
            home_speed: 100,
        }
    }
}

impl MotionConfig {
    /// 全部等待时间为 `ms` 毫秒的配置
    pub fn with_uniform_settle(ms: u64) -> Self {
        MotionConfig {
            power_on_settle_ms: ms,
            wake_settle_ms: ms,
            home_settle_ms: ms,
            extend_settle_ms: ms,
            playback_settle_ms: ms,
            procedure_settle_ms: ms,
            ..Default::default()
        }
    }

    /// 上电等待
    pub fn power_on_settle(&self) -> Duration {
        Duration::from_millis(self.power_on_settle_ms)
    }

    /// 唤醒等待
    pub fn wake_settle(&self) -> Duration {
        Duration::from_millis(self.wake_settle_ms)
    }

    /// 回零等待
    pub fn home_settle(&self) -> Duration {
        Duration::from_millis(self.home_settle_ms)
    }

    /// 伸展等待
    pub fn extend_settle(&self) -> Duration {
        Duration::from_millis(self.extend_settle_ms)
    }

    /// 回放每步等待
    pub fn playback_settle(&self) -> Duration {
        Duration::from_millis(self.playback_settle_ms)
    }

    /// 程序每步等待
    pub fn procedure_settle(&self) -> Duration {
        Duration::from_millis(self.procedure_settle_ms)
    }
}

/// 存储路径配置（未设置时使用内存存储）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 已保存位置
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions_file: Option<PathBuf>,
    /// 程序
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedures_file: Option<PathBuf>,
    /// 平面标定
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibrations_file: Option<PathBuf>,
}

impl StorageConfig {
    /// 三个文件都放在同一个目录下
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        StorageConfig {
            positions_file: Some(dir.join("positions.json")),
            procedures_file: Some(dir.join("procedures.json")),
            calibrations_file: Some(dir.join("calibrations.json")),
        }
    }
}
