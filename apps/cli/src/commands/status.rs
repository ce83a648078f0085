//! 状态查询命令

use anyhow::Result;
use clap::Args;
use cobot_client::RobotContext;
use tracing::warn;

use super::motion::print_angles;

/// 状态查询参数
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub fn execute(&self, ctx: &RobotContext) -> Result<()> {
        // 命令行每次都是新进程，先从硬件同步一次理想状态
        if ctx.connection.is_connected() {
            if let Err(e) = ctx.controller.sync_from_hardware() {
                warn!(error = %e, "could not read joint angles");
            }
        }
        let status = ctx.status();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        println!(
            "🔌 连接: {}",
            if status.connected { "已连接" } else { "未连接" }
        );
        print_angles("📊 关节角度", &status.angles);
        if let Ok((_, pose)) = ctx.bridge.ideal_pose() {
            println!("📍 末端位姿: {}", pose);
        }
        println!("⏺  录制: {}", status.is_recording);
        println!("▶️  回放: {}", status.is_playing);
        println!("〰️  抖动: {}", status.is_jiggling);
        println!("📝 已录制动作: {}", status.recorded_moves_count);
        println!("📐 关节限位:");
        for (i, (min, max)) in status.joint_limits.iter().enumerate() {
            println!("  J{}: [{:.0}, {:.0}]", i + 1, min, max);
        }
        Ok(())
    }
}
