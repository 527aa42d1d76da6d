//! 增量元素
//!
//! 跟踪相邻两次采样的差值；计数器回绕（新值小于旧值）时按
//! `overflow - previous + new` 计入。到达 `calculation_interval` 边界时输出
//! `increase * factor` 并清零。

use domain::does_tick_id_match_tick;

#[derive(Debug, Clone, PartialEq)]
pub struct Increase {
    pub variable_id: String,
    pub factor: f64,
    pub calculation_interval: u32,
    pub overflow: f64,
    last_sample: Option<f64>,
    increase: f64,
}

impl Increase {
    pub fn new(variable_id: String, factor: f64, calculation_interval: u32, overflow: f64) -> Self {
        Self {
            variable_id,
            factor,
            calculation_interval,
            overflow,
            last_sample: None,
            increase: 0.0,
        }
    }

    pub(crate) fn sample(&mut self, tick: i64, sample: f64) -> Option<f64> {
        if let Some(previous) = self.last_sample {
            self.increase += if sample >= previous {
                sample - previous
            } else {
                self.overflow - previous + sample
            };
        }
        self.last_sample = Some(sample);

        if !does_tick_id_match_tick(tick, self.calculation_interval as i64) {
            return None;
        }
        let value = self.increase * self.factor;
        self.increase = 0.0;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_wraparound_through_overflow() {
        let mut increase = Increase::new("v1".to_string(), 3.0, 3, 100.0);
        assert_eq!(increase.sample(1, 90.0), None);
        assert_eq!(increase.sample(2, 95.0), None);
        // 95 -> 5 回绕：100 - 95 + 5 = 10
        assert_eq!(increase.sample(3, 5.0), Some(45.0));
        assert_eq!(increase.sample(6, 7.0), Some(6.0));
    }

    #[test]
    fn first_sample_only_sets_baseline() {
        let mut increase = Increase::new("v1".to_string(), 1.0, 1, 100.0);
        assert_eq!(increase.sample(1, 42.0), Some(0.0));
        assert_eq!(increase.sample(2, 50.0), Some(8.0));
    }
}
