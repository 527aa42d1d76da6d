//! 比例元素：`value = source * factor`

#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub variable_id: String,
    pub factor: f64,
}

impl Factor {
    pub(crate) fn compute(&self, sample: f64) -> f64 {
        sample * self.factor
    }
}
