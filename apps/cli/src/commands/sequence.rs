//! 运动序列命令：录制、回放、抖动、执行程序
//!
//! 序列在后台线程执行，前台等待结果；Ctrl-C 请求停止当前序列。

use anyhow::{Context, Result, bail};
use clap::Args;
use cobot_client::{RobotContext, SequenceOutcome};
use cobot_tools::JointAngles;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use super::motion::print_angles;

/// 等待结果的轮询间隔
const POLL: Duration = Duration::from_millis(200);

/// 动作来源
#[derive(Args, Debug)]
pub struct MovesSource {
    /// 已保存位置名称，逗号分隔
    #[arg(short, long, value_delimiter = ',')]
    pub positions: Vec<String>,

    /// JSON 文件（关节角度数组的数组）
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl MovesSource {
    /// 解析为关节角度序列
    pub fn resolve(&self, ctx: &RobotContext) -> Result<Vec<JointAngles>> {
        if let Some(path) = &self.file {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("读取动作文件失败: {}", path.display()))?;
            let moves: Vec<JointAngles> =
                serde_json::from_str(&content).context("解析动作文件失败")?;
            return Ok(moves);
        }

        let mut moves = Vec::with_capacity(self.positions.len());
        for name in &self.positions {
            let position = ctx
                .library
                .position(name)
                .ok_or_else(|| anyhow::anyhow!("位置 '{}' 不存在", name))?;
            moves.push(position.angles);
        }
        if moves.is_empty() {
            bail!("请使用 --positions 或 --file 指定动作");
        }
        Ok(moves)
    }
}

/// 回放参数
#[derive(Args, Debug)]
pub struct PlayCommand {
    #[command(flatten)]
    pub source: MovesSource,
}

impl PlayCommand {
    pub fn execute(&self, ctx: &RobotContext) -> Result<()> {
        let moves = self.source.resolve(ctx)?;
        println!("▶️  回放 {} 个动作（Ctrl-C 停止）...", moves.len());
        ctx.coordinator.play(moves).context("启动回放失败")?;
        report(wait_for_sequence(ctx, None)?)
    }
}

/// 抖动参数
#[derive(Args, Debug)]
pub struct JiggleCommand {
    #[command(flatten)]
    pub source: MovesSource,

    /// 运行时长（秒），不指定则直到 Ctrl-C
    #[arg(short, long)]
    pub duration: Option<f64>,
}

impl JiggleCommand {
    pub fn execute(&self, ctx: &RobotContext) -> Result<()> {
        let moves = self.source.resolve(ctx)?;
        let deadline = self
            .duration
            .map(Duration::try_from_secs_f64)
            .transpose()
            .context("运行时长无效")?;
        println!("〰️  循环 {} 个动作（Ctrl-C 停止）...", moves.len());
        ctx.coordinator.jiggle(moves).context("启动抖动失败")?;
        report(wait_for_sequence(ctx, deadline)?)
    }
}

/// 录制参数
///
/// 录制期间手动拖动机械臂，每隔一段时间采样一次当前姿态。
#[derive(Args, Debug)]
pub struct RecordCommand {
    /// 采样次数
    #[arg(short = 'n', long, default_value_t = 3)]
    pub count: usize,

    /// 采样间隔（毫秒）
    #[arg(short, long, default_value_t = 3000)]
    pub interval_ms: u64,

    /// 以 `<前缀>_<序号>` 保存每个采样为位置
    #[arg(long)]
    pub save_prefix: Option<String>,

    /// 录制结束后立即回放
    #[arg(long)]
    pub play: bool,
}

impl RecordCommand {
    pub fn execute(&self, ctx: &RobotContext) -> Result<()> {
        if self.count == 0 {
            bail!("采样次数必须大于 0");
        }
        ctx.coordinator.start_recording().context("开始录制失败")?;
        println!("⏺  开始录制：{} 次采样，间隔 {} ms", self.count, self.interval_ms);

        let interval = Duration::from_millis(self.interval_ms);
        let mut sampling = Ok(());
        for i in 0..self.count {
            thread::sleep(interval);
            match ctx.coordinator.capture() {
                Ok(angles) => print_angles(&format!("📸 采样 {}", i + 1), &angles),
                Err(e) => {
                    sampling = Err(e);
                    break;
                },
            }
        }

        let count = ctx.coordinator.stop_recording().context("结束录制失败")?;
        sampling.context("采样失败")?;
        println!("✅ 录制完成: {} 个动作", count);

        let moves = ctx.state.get_recorded_moves();
        if let Some(prefix) = &self.save_prefix {
            for (i, angles) in moves.iter().enumerate() {
                let name = format!("{}_{}", prefix, i + 1);
                ctx.library.save_position(&name, angles)?;
                println!("💾 已保存位置 '{}'", name);
            }
        }

        if self.play {
            println!("▶️  回放录制...");
            ctx.coordinator.play_recorded().context("启动回放失败")?;
            report(wait_for_sequence(ctx, None)?)?;
        }
        Ok(())
    }
}

/// 执行已保存的程序
pub fn run_procedure(ctx: &RobotContext, name: &str) -> Result<()> {
    println!("📜 执行程序 '{}'（Ctrl-C 停止）...", name);
    ctx.coordinator
        .execute_procedure_named(name)
        .with_context(|| format!("启动程序 '{}' 失败", name))?;
    report(wait_for_sequence(ctx, None)?)
}

/// 等待当前序列结束；超过 `deadline` 后请求停止
pub fn wait_for_sequence(
    ctx: &RobotContext,
    deadline: Option<Duration>,
) -> Result<SequenceOutcome> {
    let start = Instant::now();
    let mut stop_sent = false;
    loop {
        if let Some(outcome) = ctx.coordinator.wait_for_completion(POLL) {
            return Ok(outcome);
        }
        if ctx.coordinator.active_kind().is_none() {
            // 占用已释放，结果可能还在发送途中
            return ctx
                .coordinator
                .wait_for_completion(POLL)
                .ok_or_else(|| anyhow::anyhow!("没有正在执行的序列"));
        }
        if let Some(limit) = deadline {
            if !stop_sent && start.elapsed() >= limit {
                ctx.coordinator.stop();
                stop_sent = true;
            }
        }
    }
}

/// 打印序列结果；失败时返回错误
pub fn report(outcome: SequenceOutcome) -> Result<()> {
    match outcome {
        SequenceOutcome::Completed { steps } => println!("✅ 完成: {} 步", steps),
        SequenceOutcome::Cancelled { steps } => println!("🛑 已停止: 执行了 {} 步", steps),
        SequenceOutcome::Failed { steps, reason } => {
            bail!("序列在第 {} 步后失败: {}", steps, reason)
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobot_driver::MockArm;
    use cobot_tools::{AppConfig, MotionConfig};

    fn context() -> (MockArm, RobotContext) {
        let config = AppConfig {
            motion: MotionConfig::with_uniform_settle(1),
            ..Default::default()
        };
        let arm = MockArm::new();
        let ctx = RobotContext::new(config, Some(Box::new(arm.clone())));
        (arm, ctx)
    }

    #[test]
    fn test_resolve_positions() {
        let (_arm, ctx) = context();
        ctx.library.save_position("a", &[1.0; 6]).unwrap();
        let source = MovesSource {
            positions: vec!["a".into(), "a".into()],
            file: None,
        };
        assert_eq!(source.resolve(&ctx).unwrap(), vec![[1.0; 6], [1.0; 6]]);

        let missing = MovesSource {
            positions: vec!["nope".into()],
            file: None,
        };
        assert!(missing.resolve(&ctx).is_err());
        let empty = MovesSource {
            positions: vec![],
            file: None,
        };
        assert!(empty.resolve(&ctx).is_err());
    }

    #[test]
    fn test_jiggle_with_deadline_stops() {
        let (arm, ctx) = context();
        ctx.coordinator.jiggle(vec![[1.0; 6], [2.0; 6]]).unwrap();
        let outcome = wait_for_sequence(&ctx, Some(Duration::from_millis(20))).unwrap();
        assert!(matches!(outcome, SequenceOutcome::Cancelled { .. }));
        assert!(!arm.sent_commands().is_empty());
    }

    #[test]
    fn test_report_failure_is_error() {
        assert!(report(SequenceOutcome::Completed { steps: 1 }).is_ok());
        assert!(
            report(SequenceOutcome::Failed {
                steps: 0,
                reason: "x".into()
            })
            .is_err()
        );
    }
}
