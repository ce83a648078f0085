//! # 程序（位置序列）
//!
//! 一个程序由若干步组成：移动到已保存的位置，或等待若干秒。
//! JSON 格式与现有的 `procedures.json` 兼容：
//!
//! ```json
//! {"type": "position", "data": "pick"}
//! {"type": "delay", "data": 1.5}
//! ```

use serde::{Deserialize, Serialize};

use crate::limits::validate_name;
use crate::now_unix;

/// 程序步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ProcedureStep {
    /// 移动到指定名称的已保存位置
    Position(String),
    /// 等待（秒）
    Delay(f64),
}

/// 已保存的程序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    /// 步骤序列
    pub steps: Vec<ProcedureStep>,
    /// 描述
    #[serde(default)]
    pub description: String,
    /// 创建时间（unix 秒）
    #[serde(default)]
    pub created: u64,
    /// 最后修改时间（unix 秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
}

impl Procedure {
    /// 创建新程序（带当前时间戳）
    pub fn new(steps: Vec<ProcedureStep>, description: impl Into<String>) -> Self {
        Procedure {
            steps,
            description: description.into().trim().to_string(),
            created: now_unix(),
            updated: None,
        }
    }

    /// 步骤数
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// 校验步骤
    pub fn validate(&self) -> Result<(), String> {
        validate_steps(&self.steps)
    }
}

/// 校验步骤序列：非空，位置名称合法，等待时间为正的有限值
///
/// 错误信息中的步骤序号从 1 开始。
pub fn validate_steps(steps: &[ProcedureStep]) -> Result<(), String> {
    if steps.is_empty() {
        return Err("Steps must be a non-empty list".to_string());
    }
    for (i, step) in steps.iter().enumerate() {
        match step {
            ProcedureStep::Position(name) if !validate_name(name) => {
                return Err(format!("Step {}: invalid position name '{}'", i + 1, name));
            },
            ProcedureStep::Delay(seconds) if !(seconds.is_finite() && *seconds > 0.0) => {
                return Err(format!(
                    "Step {}: delay must be a positive number, got {}",
                    i + 1,
                    seconds
                ));
            },
            _ => {},
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_json_format() {
        let steps = vec![
            ProcedureStep::Position("pick".to_string()),
            ProcedureStep::Delay(1.5),
        ];
        let json = serde_json::to_string(&steps).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"position","data":"pick"},{"type":"delay","data":1.5}]"#
        );

        let parsed: Vec<ProcedureStep> =
            serde_json::from_str(r#"[{"type":"delay","data":2},{"type":"position","data":"home"}]"#)
                .unwrap();
        assert_eq!(parsed[0], ProcedureStep::Delay(2.0));
        assert_eq!(parsed[1], ProcedureStep::Position("home".to_string()));
    }

    #[test]
    fn test_unknown_step_type_rejected() {
        let parsed: Result<ProcedureStep, _> =
            serde_json::from_str(r#"{"type":"teleport","data":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Procedure::new(vec![], "").validate().is_err());

        let ok = Procedure::new(
            vec![
                ProcedureStep::Position("a".into()),
                ProcedureStep::Delay(0.5),
            ],
            "  demo  ",
        );
        assert!(ok.validate().is_ok());
        assert_eq!(ok.description, "demo");
        assert_eq!(ok.step_count(), 2);

        let bad_delay = Procedure::new(vec![ProcedureStep::Delay(0.0)], "");
        let err = bad_delay.validate().unwrap_err();
        assert!(err.starts_with("Step 1"));

        let bad_name = Procedure::new(
            vec![ProcedureStep::Delay(1.0), ProcedureStep::Position("a:b".into())],
            "",
        );
        assert!(bad_name.validate().unwrap_err().starts_with("Step 2"));
    }
}
