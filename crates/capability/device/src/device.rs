//! 设备：变量与计算元素的所有者，负责一次 tick 的刷新编排
//!
//! 刷新顺序：
//! 1. 按声明顺序读取本 tick 到期的变量，单个变量失败不影响其它变量
//! 2. 按声明顺序重新计算到期的计算元素；源变量在本 tick 均未更新的元素跳过
//! 3. 任一变量或元素失败时返回 `RefreshFailed`，其中携带完整报告

use crate::calc::{CalcElement, ElementContext, EventLabel};
use crate::config::{CalcElementConfig, ConnectionConfig, DeviceConfig, DeviceUpdate, VariableConfig, VariableUpdate};
use crate::error::{ConfigError, DeviceError, ReadError};
use crate::report::RefreshReport;
use crate::variable::{Address, Variable, check_name};
use domain::{VariableValue, does_tick_id_match_tick};
use gw_protocol::{ProtocolClient, ProtocolError};
use gw_telemetry::record_variable_read_failure;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 设备构造选项
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    /// 事件日志数据库目录
    pub event_dir: PathBuf,
    /// 连接参数未给出超时时使用
    pub default_timeout: Duration,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            event_dir: PathBuf::from("./data/events"),
            default_timeout: Duration::from_millis(2000),
        }
    }
}

pub struct Device {
    id: String,
    name: String,
    is_active: bool,
    connection: ConnectionConfig,
    timeout: Duration,
    event_dir: PathBuf,
    client: Option<Arc<dyn ProtocolClient>>,
    variables: Vec<Variable>,
    calc_elements: Vec<CalcElement>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// 根据定义构造设备；事件日志缓冲需随后调用 [`Device::init`]
    pub fn from_config(
        config: DeviceConfig,
        client: Option<Arc<dyn ProtocolClient>>,
        options: &DeviceOptions,
    ) -> Result<Self, ConfigError> {
        if config.id.is_empty() {
            return Err(ConfigError::invalid("id", "must not be empty"));
        }
        check_name(&config.name)?;

        let timeout = config
            .connection
            .timeout_ms()
            .map(Duration::from_millis)
            .unwrap_or(options.default_timeout);

        let mut device = Self {
            id: config.id,
            name: config.name,
            is_active: config.is_active,
            connection: config.connection,
            timeout,
            event_dir: options.event_dir.clone(),
            client,
            variables: Vec::new(),
            calc_elements: Vec::new(),
        };

        for variable in config.variables {
            device.add_variable(variable)?;
        }
        for element in config.calc_elements {
            let element = device.build_calc_element(element)?;
            device.calc_elements.push(element);
        }
        Ok(device)
    }

    /// 初始化所有事件日志缓冲
    pub async fn init(&mut self) -> Result<(), DeviceError> {
        for element in &mut self.calc_elements {
            element.init().await?;
        }
        info!(
            target: "gw.device",
            device_id = %self.id,
            variables = self.variables.len(),
            calc_elements = self.calc_elements.len(),
            "device_initialized"
        );
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 同组设备在同一批次中顺序刷新；每个设备自成一组
    pub fn refresh_group_id(&self) -> &str {
        &self.id
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.iter().find(|variable| variable.id() == id)
    }

    pub fn calc_elements(&self) -> &[CalcElement] {
        &self.calc_elements
    }

    pub fn calc_element(&self, id: &str) -> Option<&CalcElement> {
        self.calc_elements.iter().find(|element| element.id() == id)
    }

    pub fn edit(&mut self, update: DeviceUpdate) -> Result<(), ConfigError> {
        if let Some(name) = &update.name {
            check_name(name)?;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        Ok(())
    }

    pub fn add_variable(&mut self, config: VariableConfig) -> Result<&Variable, ConfigError> {
        self.ensure_unique(&config.id)?;
        let variable = Variable::from_config(config)?;

        let compatible = match (&self.connection, variable.address()) {
            (ConnectionConfig::Modbus { .. }, Address::Modbus(_)) => true,
            (ConnectionConfig::S7 { .. }, Address::S7(_)) => true,
            (ConnectionConfig::Internal, _) => true,
            _ => false,
        };
        if !compatible {
            return Err(ConfigError::invalid(
                "type",
                format!("{} does not match device protocol", variable.type_name()),
            ));
        }

        let index = self.variables.len();
        self.variables.push(variable);
        Ok(&self.variables[index])
    }

    pub fn edit_variable(
        &mut self,
        id: &str,
        update: VariableUpdate,
    ) -> Result<&Variable, DeviceError> {
        let index = self.variable_index(id)?;
        self.variables[index].edit(update)?;
        Ok(&self.variables[index])
    }

    /// 删除变量；仍被计算元素引用时拒绝
    pub fn remove_variable(&mut self, id: &str) -> Result<Variable, DeviceError> {
        let index = self.variable_index(id)?;
        if let Some(element) = self
            .calc_elements
            .iter()
            .find(|element| element.source_ids().contains(&id))
        {
            return Err(ConfigError::VariableInUse {
                variable_id: id.to_string(),
                element_id: element.id().to_string(),
            }
            .into());
        }
        Ok(self.variables.remove(index))
    }

    pub async fn add_calc_element(
        &mut self,
        config: CalcElementConfig,
    ) -> Result<&CalcElement, DeviceError> {
        let element = self.build_calc_element(config)?;
        self.insert_calc_element(element).await
    }

    /// 插入已构造的计算元素（源变量同样校验）
    pub async fn insert_calc_element(
        &mut self,
        mut element: CalcElement,
    ) -> Result<&CalcElement, DeviceError> {
        self.ensure_unique(element.id())?;
        for source in element.source_ids() {
            if self.variable(source).is_none() {
                return Err(ConfigError::MissingVariable(source.to_string()).into());
            }
        }
        element.init().await?;

        let index = self.calc_elements.len();
        self.calc_elements.push(element);
        Ok(&self.calc_elements[index])
    }

    pub fn remove_calc_element(&mut self, id: &str) -> Result<CalcElement, DeviceError> {
        let index = self
            .calc_elements
            .iter()
            .position(|element| element.id() == id)
            .ok_or_else(|| DeviceError::NotFound {
                kind: "element",
                id: id.to_string(),
            })?;
        Ok(self.calc_elements.remove(index))
    }

    /// 刷新本 tick 到期的变量与计算元素
    pub async fn refresh(&mut self, tick: i64) -> Result<RefreshReport, DeviceError> {
        let mut report = RefreshReport::new(tick);
        if !self.is_active {
            return Ok(report);
        }

        let unit_id = self.connection.unit_id();
        let internal = matches!(self.connection, ConnectionConfig::Internal);
        // 内部设备的变量值即为真值，无需读取
        let all_fresh = internal && self.client.is_none();
        let mut updated: HashSet<String> = HashSet::new();

        for variable in self.variables.iter_mut() {
            if !does_tick_id_match_tick(tick, variable.sample_time() as i64) {
                continue;
            }
            let result = match &self.client {
                Some(client) => {
                    read_variable(client.as_ref(), variable, unit_id, self.timeout, tick).await
                }
                None if internal => continue,
                None => Err(ReadError::Protocol(ProtocolError::Connection(
                    "no protocol client attached".to_string(),
                ))),
            };
            if let Err(err) = &result {
                record_variable_read_failure();
                warn!(
                    target: "gw.device",
                    device_id = %self.id,
                    variable_id = %variable.id(),
                    tick,
                    error = %err,
                    "variable_read_failed"
                );
            }
            if result.is_ok() {
                updated.insert(variable.id().to_string());
            }
            report.variables.push((variable.id().to_string(), result));
        }

        for element in self.calc_elements.iter_mut() {
            if !does_tick_id_match_tick(tick, element.sample_time() as i64) {
                continue;
            }
            if !all_fresh
                && !element
                    .source_ids()
                    .iter()
                    .any(|source| updated.contains(*source))
            {
                debug!(
                    target: "gw.device",
                    device_id = %self.id,
                    element_id = %element.id(),
                    tick,
                    "element_skipped_stale_sources"
                );
                continue;
            }
            let result = element.refresh(tick, &self.variables).await;
            report.elements.push((element.id().to_string(), result));
        }

        debug!(
            target: "gw.device",
            device_id = %self.id,
            tick,
            variables = report.variables.len(),
            elements = report.elements.len(),
            "device_refreshed"
        );

        if report.is_success() {
            Ok(report)
        } else {
            Err(DeviceError::RefreshFailed {
                device_id: self.id.clone(),
                report,
            })
        }
    }

    /// 写入变量：编码后下发，成功后更新本地值（valueTickId 不变）
    pub async fn write_variable(
        &mut self,
        id: &str,
        value: VariableValue,
    ) -> Result<&Variable, DeviceError> {
        let index = self.variable_index(id)?;
        let address = self.variables[index].address();
        if let Address::S7(s7) = address {
            if !s7.write {
                return Err(DeviceError::NotWritable(id.to_string()));
            }
        }
        let normalized = address.normalize(&value)?;

        match &self.client {
            Some(client) => {
                let request = address.write_request(self.connection.unit_id(), &normalized)?;
                client.write(&request, self.timeout).await?;
            }
            None if matches!(self.connection, ConnectionConfig::Internal) => {}
            None => {
                return Err(ProtocolError::Connection("no protocol client attached".to_string()).into());
            }
        }

        info!(
            target: "gw.device",
            device_id = %self.id,
            variable_id = %id,
            value = %normalized,
            "variable_written"
        );
        self.variables[index].replace_value(normalized);
        Ok(&self.variables[index])
    }

    /// 事件日志查询
    pub fn get_event_at(
        &self,
        element_id: &str,
        timestamp: i64,
    ) -> Result<BTreeMap<i64, EventLabel>, DeviceError> {
        if let Some(element) = self.calc_element(element_id) {
            return match element.event_log() {
                Some(log) => Ok(log.get_event_at(timestamp)),
                None => Err(DeviceError::NoEvents {
                    type_name: element.type_name(),
                }),
            };
        }
        match self.variable(element_id) {
            Some(variable) => Err(DeviceError::NoEvents {
                type_name: variable.type_name(),
            }),
            None => Err(DeviceError::NotFound {
                kind: "element",
                id: element_id.to_string(),
            }),
        }
    }

    fn build_calc_element(&self, config: CalcElementConfig) -> Result<CalcElement, ConfigError> {
        self.ensure_unique(&config.id)?;
        let context = ElementContext {
            device_id: &self.id,
            event_dir: &self.event_dir,
            variables: &self.variables,
        };
        CalcElement::from_config(config, &context)
    }

    fn ensure_unique(&self, id: &str) -> Result<(), ConfigError> {
        if id.is_empty() {
            return Err(ConfigError::invalid("id", "must not be empty"));
        }
        if self.variable(id).is_some() || self.calc_element(id).is_some() {
            return Err(ConfigError::DuplicateId(id.to_string()));
        }
        Ok(())
    }

    fn variable_index(&self, id: &str) -> Result<usize, DeviceError> {
        self.variables
            .iter()
            .position(|variable| variable.id() == id)
            .ok_or_else(|| DeviceError::NotFound {
                kind: "variable",
                id: id.to_string(),
            })
    }
}

async fn read_variable(
    client: &dyn ProtocolClient,
    variable: &mut Variable,
    unit_id: u8,
    timeout: Duration,
    tick: i64,
) -> Result<(), ReadError> {
    let request = variable.address().read_request(unit_id);
    let raw = client.read(&request, timeout).await?;
    let value = variable.address().decode(&raw)?;
    variable.set_value(value, tick);
    Ok(())
}
