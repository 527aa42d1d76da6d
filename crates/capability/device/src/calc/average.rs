//! 平均值元素
//!
//! 每个采样 tick 累加一次源变量值；到达 `calculation_interval` 边界时输出
//! `sum * factor / count` 并清空累加器。

use domain::does_tick_id_match_tick;

#[derive(Debug, Clone, PartialEq)]
pub struct Average {
    pub variable_id: String,
    pub factor: f64,
    pub calculation_interval: u32,
    sum: f64,
    count: u32,
}

impl Average {
    pub fn new(variable_id: String, factor: f64, calculation_interval: u32) -> Self {
        Self {
            variable_id,
            factor,
            calculation_interval,
            sum: 0.0,
            count: 0,
        }
    }

    /// 累加一个样本；到达边界时返回平均值
    pub(crate) fn sample(&mut self, tick: i64, sample: f64) -> Option<f64> {
        self.sum += sample;
        self.count += 1;
        if !does_tick_id_match_tick(tick, self.calculation_interval as i64) {
            return None;
        }
        let average = self.sum * self.factor / self.count as f64;
        self.sum = 0.0;
        self.count = 0;
        Some(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_at_interval_boundary_and_resets() {
        let mut average = Average::new("v1".to_string(), 2.0, 4);
        assert_eq!(average.sample(1, 1.0), None);
        assert_eq!(average.sample(2, 2.0), None);
        assert_eq!(average.sample(3, 3.0), None);
        assert_eq!(average.sample(4, 6.0), Some(6.0));

        assert_eq!(average.sample(5, 10.0), None);
        assert_eq!(average.sample(8, 20.0), Some(30.0));
    }
}
