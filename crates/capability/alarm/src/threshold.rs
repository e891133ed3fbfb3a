//! 阈值判定。

use domain::AlarmCondition;

/// 判断读数是否满足规则条件。
///
/// 缺失值（传感器离线）永远不触发。`Equals` 为精确比较，不带容差：
/// 浮点读数几乎不会与阈值逐位相等，这类规则应改用大于 / 小于。
pub fn evaluate(value: Option<f64>, condition: AlarmCondition, threshold: f64) -> bool {
    let Some(value) = value else {
        return false;
    };
    match condition {
        AlarmCondition::GreaterThan => value > threshold,
        AlarmCondition::LessThan => value < threshold,
        AlarmCondition::Equals => value == threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truth_table() {
        assert!(evaluate(Some(31.0), AlarmCondition::GreaterThan, 30.0));
        assert!(!evaluate(Some(30.0), AlarmCondition::GreaterThan, 30.0));
        assert!(evaluate(Some(4.0), AlarmCondition::LessThan, 5.0));
        assert!(!evaluate(Some(5.0), AlarmCondition::LessThan, 5.0));
        assert!(evaluate(Some(7.0), AlarmCondition::Equals, 7.0));
        assert!(!evaluate(Some(7.000001), AlarmCondition::Equals, 7.0));
    }

    #[test]
    fn missing_value_never_fires() {
        for condition in [
            AlarmCondition::GreaterThan,
            AlarmCondition::LessThan,
            AlarmCondition::Equals,
        ] {
            assert!(!evaluate(None, condition, 0.0));
        }
    }

    #[test]
    fn nan_never_fires() {
        assert!(!evaluate(Some(f64::NAN), AlarmCondition::GreaterThan, 0.0));
        assert!(!evaluate(Some(f64::NAN), AlarmCondition::LessThan, 0.0));
        assert!(!evaluate(Some(f64::NAN), AlarmCondition::Equals, f64::NAN));
    }
}
