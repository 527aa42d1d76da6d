//! 计算元素
//!
//! 每个元素读取同一设备内的一个或多个变量，在匹配自身 `sample_time` 的 tick 上重新计算。
//! 源变量在创建时校验，计算时不再产生配置错误。

mod average;
mod event_log;
mod factor;
mod increase;
mod sum;

pub use average::Average;
pub use event_log::{EventLabel, EventLog};
pub use factor::Factor;
pub use increase::Increase;
pub use sum::Sum;

use crate::config::{CalcElementConfig, CalcKindConfig};
use crate::error::ConfigError;
use crate::variable::{Variable, check_name, check_sample_time};
use domain::VariableValue;
use gw_storage::{EventBuffer, StorageError};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
pub enum CalcKind {
    Average(Average),
    Factor(Factor),
    Increase(Increase),
    Sum(Sum),
    EventLog(EventLog),
}

/// 创建计算元素所需的设备上下文
pub struct ElementContext<'a> {
    pub device_id: &'a str,
    pub event_dir: &'a Path,
    pub variables: &'a [Variable],
}

impl ElementContext<'_> {
    fn require_numeric(&self, field: &'static str, id: &str) -> Result<(), ConfigError> {
        let variable = self
            .variables
            .iter()
            .find(|variable| variable.id() == id)
            .ok_or_else(|| ConfigError::MissingVariable(id.to_string()))?;
        if !variable.address().is_numeric() {
            return Err(ConfigError::invalid(
                field,
                format!("{} is a byte array", id),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct CalcElement {
    id: String,
    name: String,
    sample_time: u32,
    unit: String,
    archived: bool,
    value: VariableValue,
    value_tick_id: i64,
    kind: CalcKind,
}

impl CalcElement {
    pub fn from_config(
        config: CalcElementConfig,
        context: &ElementContext<'_>,
    ) -> Result<Self, ConfigError> {
        check_name(&config.name)?;
        check_sample_time("sampleTime", config.sample_time)?;
        if config.unit.chars().count() > 10 {
            return Err(ConfigError::invalid("unit", "at most 10 characters"));
        }

        let kind = match config.kind {
            CalcKindConfig::Average {
                variable_id,
                factor,
                calculation_interval,
            } => {
                context.require_numeric("variableId", &variable_id)?;
                check_sample_time("calculationInterval", calculation_interval)?;
                CalcKind::Average(Average::new(variable_id, factor, calculation_interval))
            }
            CalcKindConfig::Factor {
                variable_id,
                factor,
            } => {
                context.require_numeric("variableId", &variable_id)?;
                CalcKind::Factor(Factor {
                    variable_id,
                    factor,
                })
            }
            CalcKindConfig::Increase {
                variable_id,
                factor,
                calculation_interval,
                overflow,
            } => {
                context.require_numeric("variableId", &variable_id)?;
                check_sample_time("calculationInterval", calculation_interval)?;
                if overflow <= 0.0 {
                    return Err(ConfigError::invalid("overflow", "must be positive"));
                }
                CalcKind::Increase(Increase::new(
                    variable_id,
                    factor,
                    calculation_interval,
                    overflow,
                ))
            }
            CalcKindConfig::Sum { variables } => {
                if variables.is_empty() {
                    return Err(ConfigError::invalid("variables", "must not be empty"));
                }
                for source in &variables {
                    context.require_numeric("variables", &source.id)?;
                }
                CalcKind::Sum(Sum { variables })
            }
            CalcKindConfig::EventLog {
                log_variables,
                event_descriptions,
            } => {
                if log_variables.is_empty() {
                    return Err(ConfigError::invalid("logVariables", "must not be empty"));
                }
                for pair in &log_variables {
                    context.require_numeric("logVariables", &pair.tick_var_id)?;
                    context.require_numeric("logVariables", &pair.value_var_id)?;
                }
                let mut descriptions = BTreeMap::new();
                for (key, description) in event_descriptions {
                    let key: i64 = key.parse().map_err(|_| {
                        ConfigError::invalid("eventDescriptions", format!("{} is not an integer", key))
                    })?;
                    descriptions.insert(key, description);
                }
                let path = context
                    .event_dir
                    .join(format!("{}_{}.db", context.device_id, config.id));
                let buffer = Arc::new(EventBuffer::new(path));
                CalcKind::EventLog(EventLog::new(log_variables, descriptions, buffer))
            }
        };

        Ok(Self::new(
            config.id,
            config.name,
            config.sample_time,
            config.unit,
            config.archived,
            kind,
        ))
    }

    /// 直接由已构造的计算逻辑创建（例如注入自定义后端的事件日志）
    pub fn new(
        id: String,
        name: String,
        sample_time: u32,
        unit: String,
        archived: bool,
        kind: CalcKind,
    ) -> Self {
        let value = match &kind {
            CalcKind::EventLog(_) => VariableValue::Int(0),
            _ => VariableValue::Float(0.0),
        };
        Self {
            id,
            name,
            sample_time,
            unit,
            archived,
            value,
            value_tick_id: 0,
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_time(&self) -> u32 {
        self.sample_time
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn archived(&self) -> bool {
        self.archived
    }

    pub fn value(&self) -> &VariableValue {
        &self.value
    }

    pub fn value_tick_id(&self) -> i64 {
        self.value_tick_id
    }

    pub fn kind(&self) -> &CalcKind {
        &self.kind
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            CalcKind::Average(_) => "averageElement",
            CalcKind::Factor(_) => "factorElement",
            CalcKind::Increase(_) => "increaseElement",
            CalcKind::Sum(_) => "sumElement",
            CalcKind::EventLog(_) => "eventLogElement",
        }
    }

    pub fn event_log(&self) -> Option<&EventLog> {
        match &self.kind {
            CalcKind::EventLog(log) => Some(log),
            _ => None,
        }
    }

    /// 引用的变量 ID
    pub fn source_ids(&self) -> Vec<&str> {
        match &self.kind {
            CalcKind::Average(element) => vec![element.variable_id.as_str()],
            CalcKind::Factor(element) => vec![element.variable_id.as_str()],
            CalcKind::Increase(element) => vec![element.variable_id.as_str()],
            CalcKind::Sum(element) => element
                .variables
                .iter()
                .map(|source| source.id.as_str())
                .collect(),
            CalcKind::EventLog(element) => element
                .log_variables()
                .iter()
                .flat_map(|pair| [pair.tick_var_id.as_str(), pair.value_var_id.as_str()])
                .collect(),
        }
    }

    pub(crate) async fn init(&mut self) -> Result<(), StorageError> {
        if let CalcKind::EventLog(log) = &mut self.kind {
            log.init().await?;
            if let Some(value) = log.last_value() {
                self.value = VariableValue::Int(value);
            }
        }
        Ok(())
    }

    /// 用本 tick 已更新的变量值重新计算
    pub(crate) async fn refresh(
        &mut self,
        tick: i64,
        variables: &[Variable],
    ) -> Result<(), StorageError> {
        let number = |id: &str| {
            variables
                .iter()
                .find(|variable| variable.id() == id)
                .and_then(|variable| variable.value().as_f64())
        };

        let value = match &mut self.kind {
            CalcKind::Factor(element) => number(&element.variable_id).map(|v| element.compute(v)),
            CalcKind::Average(element) => {
                number(&element.variable_id).and_then(|v| element.sample(tick, v))
            }
            CalcKind::Increase(element) => {
                number(&element.variable_id).and_then(|v| element.sample(tick, v))
            }
            CalcKind::Sum(element) => element.compute(number),
            CalcKind::EventLog(log) => {
                let integer = |id: &str| {
                    variables
                        .iter()
                        .find(|variable| variable.id() == id)
                        .and_then(|variable| variable.value().as_i64())
                };
                let outcome = log.refresh(integer).await;
                if let Some(value) = log.last_value() {
                    self.value = VariableValue::Int(value);
                    self.value_tick_id = tick;
                }
                return outcome;
            }
        };

        if let Some(value) = value {
            self.value = VariableValue::Float(value);
            self.value_tick_id = tick;
        }
        Ok(())
    }
}
