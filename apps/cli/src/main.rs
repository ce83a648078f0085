//! # Cobot CLI
//!
//! 六轴协作机械臂命令行工具
//!
//! ```bash
//! # 写入默认配置
//! cobot-cli config init
//!
//! # 查询状态 / 回零
//! cobot-cli status
//! cobot-cli home
//!
//! # 保存位置并回放
//! cobot-cli position save wave --angles 0,-30,60,0,45,0
//! cobot-cli play --positions wave,home_pose
//!
//! # 墙面标定后在平面内移动
//! cobot-cli plane calibrate wall
//! cobot-cli plane move wall --dx 10 --dy -5
//! ```
//!
//! 没有厂商驱动时使用 `--simulate` 连接模拟机械臂。

use anyhow::Result;
use clap::{Parser, Subcommand};
use cobot_client::RobotContext;
use cobot_driver::{ArmDriver, MockArm};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

mod commands;
mod validation;

use commands::{
    ConfigCommand, JiggleCommand, JogCommand, MoveCommand, PlaneCommand, PlayCommand,
    PositionCommand, ProcedureCommand, RecordCommand, StatusCommand,
};

/// Cobot CLI - 机械臂命令行工具
#[derive(Parser, Debug)]
#[command(name = "cobot-cli")]
#[command(about = "Command-line interface for six-axis cobot arm control", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 `<config_dir>/cobot/config.toml`）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 使用模拟机械臂
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 查询状态
    Status {
        #[command(flatten)]
        args: StatusCommand,
    },

    /// 回到零位
    Home,

    /// 移动到伸展位
    Extend,

    /// 演示：伸展 → 回零 → 断电
    Demo,

    /// 断电
    PowerOff,

    /// 单关节点动
    Jog {
        #[command(flatten)]
        args: JogCommand,
    },

    /// 移动全部关节
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 回放动作（结束后回零）
    Play {
        #[command(flatten)]
        args: PlayCommand,
    },

    /// 循环执行动作直到停止
    Jiggle {
        #[command(flatten)]
        args: JiggleCommand,
    },

    /// 录制手动拖动的姿态
    Record {
        #[command(flatten)]
        args: RecordCommand,
    },

    /// 位置管理
    #[command(subcommand)]
    Position(PositionCommand),

    /// 程序管理
    #[command(subcommand)]
    Procedure(ProcedureCommand),

    /// 墙面平面标定
    #[command(subcommand)]
    Plane(PlaneCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("cobot=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (config, config_path) = commands::config::load_config(cli.config.as_deref())?;

    if let Commands::Config(cmd) = cli.command {
        return cmd.execute(&config, &config_path);
    }

    let driver: Option<Box<dyn ArmDriver>> = if cli.simulate {
        Some(Box::new(MockArm::new()))
    } else {
        warn!(
            port = %config.robot.port,
            "no vendor driver linked, hardware commands will fail (use --simulate)"
        );
        None
    };
    let ctx = RobotContext::new(config, driver);

    // Ctrl-C：停止当前序列，由序列自己完成清理
    let coordinator = Arc::clone(&ctx.coordinator);
    if let Err(e) = ctrlc::set_handler(move || {
        if let Some(kind) = coordinator.stop() {
            eprintln!("\n🛑 正在停止 {}...", kind);
        }
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    run(cli.command, &ctx)
}

fn run(command: Commands, ctx: &RobotContext) -> Result<()> {
    match command {
        Commands::Config(_) => Ok(()),
        Commands::Status { args } => args.execute(ctx),
        Commands::Home => commands::motion::home(ctx),
        Commands::Extend => commands::motion::extend(ctx),
        Commands::Demo => commands::motion::demo(ctx),
        Commands::PowerOff => commands::motion::power_off(ctx),
        Commands::Jog { args } => args.execute(ctx),
        Commands::Move { args } => args.execute(ctx),
        Commands::Play { args } => args.execute(ctx),
        Commands::Jiggle { args } => args.execute(ctx),
        Commands::Record { args } => args.execute(ctx),
        Commands::Position(cmd) => cmd.execute(ctx),
        Commands::Procedure(cmd) => cmd.execute(ctx),
        Commands::Plane(cmd) => cmd.execute(ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from(["cobot-cli", "status", "--json", "--simulate"]).unwrap();
        assert!(cli.simulate);
        assert!(matches!(cli.command, Commands::Status { args } if args.json));
    }

    #[test]
    fn test_parse_negative_angles() {
        let cli =
            Cli::try_parse_from(["cobot-cli", "jog", "--joint", "2", "--angle", "-45"]).unwrap();
        assert!(matches!(cli.command, Commands::Jog { args } if args.angle == -45.0));
    }
}
