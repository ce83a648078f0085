//! 程序管理命令

use anyhow::{Context, Result};
use clap::Subcommand;
use cobot_client::RobotContext;
use cobot_tools::ProcedureStep;

use super::sequence::run_procedure;
use crate::validation::parse_step;

/// 程序命令
#[derive(Subcommand, Debug)]
pub enum ProcedureCommand {
    /// 保存或更新程序
    Save {
        /// 程序名称
        name: String,

        /// 步骤，可重复：`position:<名称>` 或 `delay:<秒>`
        #[arg(short, long = "step", required = true)]
        steps: Vec<String>,

        /// 描述
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// 列出程序
    List,

    /// 显示程序步骤
    Show {
        /// 程序名称
        name: String,
    },

    /// 删除程序
    Delete {
        /// 程序名称
        name: String,
    },

    /// 执行程序
    Run {
        /// 程序名称
        name: String,
    },
}

impl ProcedureCommand {
    pub fn execute(self, ctx: &RobotContext) -> Result<()> {
        let library = &ctx.library;
        match self {
            ProcedureCommand::Save {
                name,
                steps,
                description,
            } => {
                let steps = steps
                    .iter()
                    .map(|s| parse_step(s))
                    .collect::<Result<Vec<_>>>()?;
                let procedure = library
                    .save_procedure(&name, steps, &description)
                    .with_context(|| format!("保存程序 '{}' 失败", name))?;
                println!(
                    "💾 已保存程序 '{}'（{} 步）",
                    name,
                    procedure.step_count()
                );
            },

            ProcedureCommand::List => {
                let procedures = library.procedures();
                if procedures.is_empty() {
                    println!("（没有已保存的程序）");
                }
                for (name, procedure) in procedures {
                    println!(
                        "📜 {:<20} {:>3} 步  {}",
                        name,
                        procedure.step_count(),
                        procedure.description
                    );
                }
            },

            ProcedureCommand::Show { name } => {
                let procedure = library
                    .procedure(&name)
                    .ok_or_else(|| anyhow::anyhow!("程序 '{}' 不存在", name))?;
                println!("📜 {}  {}", name, procedure.description);
                for (i, step) in procedure.steps.iter().enumerate() {
                    match step {
                        ProcedureStep::Position(p) => println!("  {:>3}. 移动到 '{}'", i + 1, p),
                        ProcedureStep::Delay(s) => println!("  {:>3}. 等待 {} 秒", i + 1, s),
                    }
                }
            },

            ProcedureCommand::Delete { name } => {
                library.delete_procedure(&name)?;
                println!("🗑  已删除程序 '{}'", name);
            },

            ProcedureCommand::Run { name } => run_procedure(ctx, &name)?,
        }
        Ok(())
    }
}
