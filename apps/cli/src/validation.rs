//! 输入解析与验证
//!
//! 把命令行字符串解析为关节角度、坐标和程序步骤

use anyhow::{Context, Result, bail};
use cobot_tools::{
    JOINT_COUNT, Joint, JointAngles, ProcedureStep, ReferencePoint, Vec3, angles_from_slice,
};

/// 解析逗号分隔的浮点数
pub fn parse_floats(input: &str) -> Result<Vec<f64>> {
    let values = input
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("解析数值失败: '{}'", input))?;

    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        bail!("第 {} 个数值无效: {}", i + 1, values[i]);
    }
    Ok(values)
}

/// 解析 6 个关节角度（度）
pub fn parse_angles(input: &str) -> Result<JointAngles> {
    let values = parse_floats(input)?;
    angles_from_slice(&values)
        .ok_or_else(|| anyhow::anyhow!("需要 {} 个关节角度，得到 {} 个", JOINT_COUNT, values.len()))
}

/// 解析三维坐标 `x,y,z`
pub fn parse_vec3(input: &str) -> Result<Vec3> {
    let values = parse_floats(input)?;
    values
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("需要 3 个坐标，得到 {} 个", values.len()))
}

/// 解析屏幕坐标 `x,y`
pub fn parse_screen(input: &str) -> Result<[f64; 2]> {
    let values = parse_floats(input)?;
    values
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("需要 2 个屏幕坐标，得到 {} 个", values.len()))
}

/// 解析参考点：`sx,sy=x,y,z`（带屏幕坐标）或 `x,y,z`（只有世界坐标）
pub fn parse_reference_point(input: &str) -> Result<ReferencePoint> {
    match input.split_once('=') {
        Some((screen, world)) => Ok(ReferencePoint::mapped(
            parse_screen(screen)?,
            parse_vec3(world)?,
        )),
        None => Ok(ReferencePoint {
            world: Some(parse_vec3(input)?),
            ..Default::default()
        }),
    }
}

/// 解析关节编号（1-6）
pub fn parse_joint(number: u8) -> Result<Joint> {
    number
        .checked_sub(1)
        .and_then(|i| Joint::from_index(i as usize))
        .ok_or_else(|| anyhow::anyhow!("关节编号必须在 1-{} 之间，得到 {}", JOINT_COUNT, number))
}

/// 解析程序步骤：`position:<名称>` / `delay:<秒>`
pub fn parse_step(input: &str) -> Result<ProcedureStep> {
    let (kind, value) = input
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("步骤格式应为 position:<名称> 或 delay:<秒>: '{}'", input))?;

    match kind.trim().to_ascii_lowercase().as_str() {
        "position" | "pos" => Ok(ProcedureStep::Position(value.trim().to_string())),
        "delay" => {
            let seconds: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("等待时间无效: '{}'", value))?;
            Ok(ProcedureStep::Delay(seconds))
        },
        other => bail!("未知的步骤类型 '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_angles() {
        let angles = parse_angles("1, 2, 3, 4, 5, -6.5").unwrap();
        assert_eq!(angles, [1.0, 2.0, 3.0, 4.0, 5.0, -6.5]);

        assert!(parse_angles("1,2,3").is_err());
        assert!(parse_angles("1,2,3,4,5,x").is_err());
        assert!(parse_angles("1,2,3,4,5,NaN").is_err());
    }

    #[test]
    fn test_parse_vec3_and_screen() {
        assert_eq!(parse_vec3("1,2,3").unwrap(), [1.0, 2.0, 3.0]);
        assert!(parse_vec3("1,2").is_err());
        assert_eq!(parse_screen("960,540").unwrap(), [960.0, 540.0]);
        assert!(parse_screen("1,2,3").is_err());
    }

    #[test]
    fn test_parse_reference_point() {
        let mapped = parse_reference_point("0,0=-100,250,300").unwrap();
        assert_eq!(mapped.screen, Some([0.0, 0.0]));
        assert_eq!(mapped.world, Some([-100.0, 250.0, 300.0]));

        let world_only = parse_reference_point("1,2,3").unwrap();
        assert!(world_only.screen.is_none());
        assert_eq!(world_only.world, Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_parse_joint() {
        assert_eq!(parse_joint(1).unwrap(), Joint::J1);
        assert_eq!(parse_joint(6).unwrap(), Joint::J6);
        assert!(parse_joint(0).is_err());
        assert!(parse_joint(7).is_err());
    }

    #[test]
    fn test_parse_step() {
        assert_eq!(
            parse_step("position:wave").unwrap(),
            ProcedureStep::Position("wave".into())
        );
        assert_eq!(parse_step("delay:1.5").unwrap(), ProcedureStep::Delay(1.5));
        assert!(parse_step("delay:abc").is_err());
        assert!(parse_step("jump:1").is_err());
        assert!(parse_step("wave").is_err());
    }
}
