//! 一次性运动命令：回零、伸展、演示、点动、关节移动

use anyhow::{Context, Result};
use clap::Args;
use cobot_client::RobotContext;

use crate::validation::{parse_angles, parse_joint};

/// 单关节点动参数
#[derive(Args, Debug)]
pub struct JogCommand {
    /// 关节编号（1-6）
    #[arg(short, long)]
    pub joint: u8,

    /// 目标角度（度）
    #[arg(short, long, allow_hyphen_values = true)]
    pub angle: f64,

    /// 速度（1-100），默认使用配置中的点动速度
    #[arg(short, long)]
    pub speed: Option<u8>,
}

impl JogCommand {
    pub fn execute(&self, ctx: &RobotContext) -> Result<()> {
        let joint = parse_joint(self.joint)?;
        let speed = self.speed.unwrap_or(ctx.controller.jog_speed());
        let sent = ctx
            .controller
            .move_joint(joint, self.angle, speed)
            .with_context(|| format!("移动关节 {} 失败", joint))?;
        println!("✅ {} → {:.2}°", joint, sent[joint.index()]);
        Ok(())
    }
}

/// 全关节移动参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 目标关节角度（度），逗号分隔
    /// 例如：0,-45,90,0,45,0
    #[arg(short, long, allow_hyphen_values = true)]
    pub joints: String,

    /// 速度（1-100）
    #[arg(short, long, default_value_t = 50)]
    pub speed: u8,
}

impl MoveCommand {
    pub fn execute(&self, ctx: &RobotContext) -> Result<()> {
        let angles = parse_angles(&self.joints)?;
        let sent = ctx.controller.move_all(&angles, self.speed).context("移动失败")?;
        print_angles("✅ 已下发", &sent);
        Ok(())
    }
}

/// 回零位
pub fn home(ctx: &RobotContext) -> Result<()> {
    println!("🏠 回到零位...");
    ctx.controller.move_to_home().context("回零失败")?;
    println!("✅ 已回零");
    Ok(())
}

/// 伸展位
pub fn extend(ctx: &RobotContext) -> Result<()> {
    println!("📏 移动到伸展位...");
    ctx.controller.move_to_extend().context("伸展失败")?;
    println!("✅ 已伸展");
    Ok(())
}

/// 演示：伸展 → 回零 → 断电
pub fn demo(ctx: &RobotContext) -> Result<()> {
    println!("🎬 演示：伸展 → 回零 → 断电");
    ctx.controller.run_demo().context("演示失败")?;
    println!("✅ 演示完成");
    Ok(())
}

/// 断电
pub fn power_off(ctx: &RobotContext) -> Result<()> {
    ctx.controller.power_off().context("断电失败")?;
    println!("✅ 已断电");
    Ok(())
}

/// 按关节打印角度
pub fn print_angles(title: &str, angles: &[f64]) {
    println!("{}:", title);
    for (i, angle) in angles.iter().enumerate() {
        println!("  J{}: {:>8.2}°", i + 1, angle);
    }
}
