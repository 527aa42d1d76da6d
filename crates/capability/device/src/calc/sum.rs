//! 加权求和元素：`value = Σ variable_i * factor_i`

use crate::config::SumSource;

#[derive(Debug, Clone, PartialEq)]
pub struct Sum {
    pub variables: Vec<SumSource>,
}

impl Sum {
    /// 任一源变量没有数值时返回 None
    pub(crate) fn compute(&self, value_of: impl Fn(&str) -> Option<f64>) -> Option<f64> {
        self.variables
            .iter()
            .map(|source| value_of(&source.id).map(|value| value * source.factor))
            .sum()
    }
}
