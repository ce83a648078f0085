//! 集成测试公共工具

#![allow(dead_code)]

use std::time::Duration;

use cobot_client::RobotContext;
use cobot_driver::MockArm;
use cobot_tools::{AppConfig, JointAngles, MotionConfig};

/// 等待序列结束的上限
pub const WAIT: Duration = Duration::from_secs(5);

/// 模拟机械臂 + 上下文；所有稳定等待为 `settle_ms` 毫秒
pub fn fixture(settle_ms: u64) -> (MockArm, RobotContext) {
    fixture_with(settle_ms, AppConfig::default())
}

/// 使用给定配置（覆盖其中的运动时序）
pub fn fixture_with(settle_ms: u64, mut config: AppConfig) -> (MockArm, RobotContext) {
    config.motion = MotionConfig::with_uniform_settle(settle_ms);
    let arm = MockArm::new();
    let ctx = RobotContext::new(config, Some(Box::new(arm.clone())));
    (arm, ctx)
}

/// 若干个互不相同的合法姿态
pub fn sample_moves(n: usize) -> Vec<JointAngles> {
    (0..n)
        .map(|i| {
            let a = (i % 20) as f64;
            [a, -a, a * 0.5, 10.0, 20.0, 30.0]
        })
        .collect()
}

/// 轮询直到条件成立或超时
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
