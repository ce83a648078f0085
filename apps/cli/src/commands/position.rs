//! 已保存位置管理命令

use anyhow::{Context, Result};
use clap::Subcommand;
use cobot_client::RobotContext;

use super::motion::print_angles;
use crate::validation::parse_angles;

/// 位置命令
#[derive(Subcommand, Debug)]
pub enum PositionCommand {
    /// 保存位置（默认读取机械臂当前角度）
    Save {
        /// 位置名称
        name: String,

        /// 指定关节角度（度），逗号分隔
        #[arg(short, long, allow_hyphen_values = true)]
        angles: Option<String>,
    },

    /// 列出位置
    List {
        /// 只显示已启用的位置
        #[arg(long)]
        enabled: bool,
    },

    /// 删除位置
    Delete {
        /// 位置名称
        name: String,
    },

    /// 启用位置
    Enable {
        /// 位置名称
        name: String,
    },

    /// 禁用位置
    Disable {
        /// 位置名称
        name: String,
    },

    /// 移动到位置
    Go {
        /// 位置名称
        name: String,
    },
}

impl PositionCommand {
    pub fn execute(self, ctx: &RobotContext) -> Result<()> {
        let library = &ctx.library;
        match self {
            PositionCommand::Save { name, angles } => {
                let saved = match angles {
                    Some(input) => library.save_position(&name, &parse_angles(&input)?),
                    None => library.save_current_position(&name),
                }
                .with_context(|| format!("保存位置 '{}' 失败", name))?;
                print_angles(&format!("💾 已保存位置 '{}'", name), &saved.angles);
            },

            PositionCommand::List { enabled } => {
                let positions = if enabled {
                    library.enabled_positions()
                } else {
                    library.positions()
                };
                if positions.is_empty() {
                    println!("（没有已保存的位置）");
                }
                for (name, position) in positions {
                    let angles: Vec<String> =
                        position.angles.iter().map(|a| format!("{:.2}", a)).collect();
                    println!(
                        "{} {:<20} [{}]",
                        if position.enabled { "✅" } else { "⛔" },
                        name,
                        angles.join(", ")
                    );
                }
            },

            PositionCommand::Delete { name } => {
                library.delete_position(&name)?;
                println!("🗑  已删除位置 '{}'", name);
            },

            PositionCommand::Enable { name } => {
                library.set_position_enabled(&name, true)?;
                println!("✅ 已启用位置 '{}'", name);
            },

            PositionCommand::Disable { name } => {
                library.set_position_enabled(&name, false)?;
                println!("⛔ 已禁用位置 '{}'", name);
            },

            PositionCommand::Go { name } => {
                let sent = library
                    .move_to_position(&name)
                    .with_context(|| format!("移动到位置 '{}' 失败", name))?;
                print_angles(&format!("✅ 移动到 '{}'", name), &sent);
            },
        }
        Ok(())
    }
}
