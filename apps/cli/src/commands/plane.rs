//! 墙面平面标定命令

use anyhow::{Context, Result};
use clap::Subcommand;
use cobot_client::{RobotContext, fit_best_plane};

use super::motion::print_angles;
use crate::validation::{parse_angles, parse_reference_point, parse_screen, parse_vec3};

/// 平面命令
#[derive(Subcommand, Debug)]
pub enum PlaneCommand {
    /// 拟合平面（不保存）
    Fit {
        /// 世界坐标 `x,y,z`，至少 3 个
        #[arg(short, long = "point", required = true, allow_hyphen_values = true)]
        points: Vec<String>,
    },

    /// 以末端当前姿态标定平面
    Calibrate {
        /// 标定名称
        name: String,

        /// 无法读取硬件时使用的关节角度
        #[arg(long, allow_hyphen_values = true)]
        seed: Option<String>,
    },

    /// 由参考点拟合并保存标定
    Save {
        /// 标定名称
        name: String,

        /// 参考点，可重复：`sx,sy=x,y,z` 或 `x,y,z`
        #[arg(short, long = "point", required = true, allow_hyphen_values = true)]
        points: Vec<String>,

        /// 末端姿态 `rx,ry,rz`（度），默认使用当前姿态
        #[arg(short, long, allow_hyphen_values = true)]
        orientation: Option<String>,
    },

    /// 在平面内移动
    Move {
        /// 标定名称
        name: String,

        /// 平面 X 方向偏移（毫米）
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dx: f64,

        /// 平面 Y 方向偏移（毫米）
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dy: f64,
    },

    /// 屏幕坐标映射到世界坐标和关节角度
    Map {
        /// 标定名称
        name: String,

        /// 屏幕坐标 `x,y`
        #[arg(short, long)]
        screen: String,

        /// 映射后移动过去
        #[arg(long)]
        go: bool,
    },

    /// 列出标定
    List,

    /// 删除标定
    Delete {
        /// 标定名称
        name: String,
    },
}

impl PlaneCommand {
    pub fn execute(self, ctx: &RobotContext) -> Result<()> {
        let engine = &ctx.calibration;
        match self {
            PlaneCommand::Fit { points } => {
                let points = points
                    .iter()
                    .map(|p| parse_vec3(p))
                    .collect::<Result<Vec<_>>>()?;
                let fit = fit_best_plane(&points).context("平面拟合失败")?;
                println!("📐 平面拟合");
                println!("  点:     {:?}", fit.point);
                println!("  法向:   {:?}", fit.normal);
                println!("  方程:   {:?}", fit.equation);
                println!("  误差:   {:.4} mm", fit.fit_error);
            },

            PlaneCommand::Calibrate { name, seed } => {
                let seed = seed.as_deref().map(parse_angles).transpose()?;
                let cal = engine
                    .calibrate_from_orientation(&name, seed.as_ref())
                    .with_context(|| format!("标定 '{}' 失败", name))?;
                println!("✅ 已标定 '{}'", cal.name);
                println!("  法向:   {:?}", cal.normal);
                println!("  X 轴:   {:?}", cal.local_x_axis);
                println!("  Y 轴:   {:?}", cal.local_y_axis);
            },

            PlaneCommand::Save {
                name,
                points,
                orientation,
            } => {
                let points = points
                    .iter()
                    .map(|p| parse_reference_point(p))
                    .collect::<Result<Vec<_>>>()?;
                let orientation = orientation.as_deref().map(parse_vec3).transpose()?;
                let (cal, fit) = engine
                    .save_calibration(&name, points, orientation)
                    .with_context(|| format!("保存标定 '{}' 失败", name))?;
                println!(
                    "💾 已保存标定 '{}'（{} 个参考点，误差 {:.4} mm）",
                    cal.name,
                    cal.reference_points.len(),
                    fit.fit_error
                );
            },

            PlaneCommand::Move { name, dx, dy } => {
                let sent = engine
                    .move_in_plane(&name, dx, dy)
                    .with_context(|| format!("平面 '{}' 内移动失败", name))?;
                print_angles(&format!("✅ 平面内移动 ({}, {})", dx, dy), &sent);
            },

            PlaneCommand::Map { name, screen, go } => {
                let screen = parse_screen(&screen)?;
                let (world, angles) = engine
                    .map_screen_to_world(&name, screen)
                    .with_context(|| format!("屏幕映射失败: '{}'", name))?;
                println!("🎯 世界坐标: {:?}", world);
                print_angles("📊 关节角度", &angles);
                if go {
                    ctx.controller
                        .move_all(&angles, ctx.controller.jog_speed())
                        .context("移动失败")?;
                    println!("✅ 已移动");
                }
            },

            PlaneCommand::List => {
                let calibrations = engine.calibrations();
                if calibrations.is_empty() {
                    println!("（没有已保存的标定）");
                }
                for cal in calibrations {
                    println!(
                        "📐 {:<20} 法向 {:?}  {} 个参考点",
                        cal.name,
                        cal.normal,
                        cal.reference_points.len()
                    );
                }
            },

            PlaneCommand::Delete { name } => {
                engine.delete_calibration(&name)?;
                println!("🗑  已删除标定 '{}'", name);
            },
        }
        Ok(())
    }
}
