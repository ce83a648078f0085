//! 配置管理命令
//!
//! 配置文件默认位于 `<config_dir>/cobot/config.toml`

use anyhow::{Context, Result};
use clap::Subcommand;
use cobot_tools::{AppConfig, StorageConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置目录
pub fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("cobot");
    Ok(path)
}

/// 默认配置文件
pub fn default_config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// 加载配置
///
/// 文件不存在时使用默认配置。未配置存储路径时，数据文件放在配置文件同一目录下。
pub fn load_config(path: Option<&Path>) -> Result<(AppConfig, PathBuf)> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_file()?,
    };
    let mut config = AppConfig::load_or_default(&path)
        .with_context(|| format!("加载配置文件失败: {}", path.display()))?;

    if config.storage == StorageConfig::default() {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.storage = StorageConfig::in_dir(dir);
    }
    Ok((config, path))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前生效的配置
    Show,

    /// 显示配置文件路径
    Path,

    /// 写入默认配置文件
    Init {
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, config: &AppConfig, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                let content = config.to_toml_string().context("序列化配置失败")?;
                println!("# {}", path.display());
                println!("{}", content);
                Ok(())
            },

            ConfigCommand::Path => {
                println!("{}", path.display());
                Ok(())
            },

            ConfigCommand::Init { force } => Self::init_(path, force),
        }
    }

    fn init_(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("创建配置目录失败")?;
        }
        let content = AppConfig::default().to_toml_string().context("序列化配置失败")?;
        fs::write(path, content).context("写入配置文件失败")?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }
}
