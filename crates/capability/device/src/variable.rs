//! 变量：协议地址 + 当前值
//!
//! 类型标签在构造时解析为 [`Address`]，之后所有编解码都按已解析的类型分派。

use crate::config::{VariableConfig, VariableUpdate};
use crate::error::{ConfigError, ReadError};
use domain::VariableValue;
use gw_codec::{
    CodecError, ModbusDataType, S7DataType, decode_modbus, decode_s7, encode_modbus, encode_s7,
};
use gw_protocol::{ProtocolError, RawData, ReadRequest, S7Area, WriteRequest};

const MAX_MODBUS_OFFSET: u32 = 10_000;
const MAX_S7_OFFSET: u32 = 65_535;
const MAX_SAMPLE_TIME: u32 = 10_000;
/// 单次读取的寄存器上限（Modbus 协议限制）
const MAX_MODBUS_WORDS: u16 = 125;
/// 单次读取的字节上限（最小 PDU 240 减去报文头）
const MAX_S7_BYTES: u16 = 222;

/// Modbus 地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusAddress {
    pub data_type: ModbusDataType,
    pub offset: u16,
    pub f_code: u8,
    pub get_single_f_code: u8,
    pub set_single_f_code: u8,
}

impl ModbusAddress {
    /// 周期轮询使用的功能码：`fCode` 是读功能码时使用它，否则使用 `getSingleFCode`
    pub fn read_f_code(&self) -> u8 {
        if (1..=4).contains(&self.f_code) {
            self.f_code
        } else {
            self.get_single_f_code
        }
    }
}

/// S7 地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S7Address {
    pub data_type: S7DataType,
    pub area: S7Area,
    /// 非 DB 区固定为 1
    pub db_number: u16,
    pub offset: u32,
    pub write: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Modbus(ModbusAddress),
    S7(S7Address),
}

impl Address {
    pub fn type_name(&self) -> &'static str {
        match self {
            Address::Modbus(address) => address.data_type.name(),
            Address::S7(address) => address.data_type.name(),
        }
    }

    pub fn default_value(&self) -> VariableValue {
        match self {
            Address::Modbus(address) => address.data_type.default_value(),
            Address::S7(address) => address.data_type.default_value(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            Address::Modbus(ModbusAddress {
                data_type: ModbusDataType::ByteArray(_),
                ..
            }) | Address::S7(S7Address {
                data_type: S7DataType::ByteArray(_),
                ..
            })
        )
    }

    pub fn read_request(&self, unit_id: u8) -> ReadRequest {
        match self {
            Address::Modbus(address) => ReadRequest::Modbus {
                unit_id,
                function_code: address.read_f_code(),
                offset: address.offset,
                length: address.data_type.word_len() as u16,
            },
            Address::S7(address) => ReadRequest::S7 {
                area: address.area,
                db_number: address.db_number,
                offset: address.offset,
                length: address.data_type.byte_len() as u16,
            },
        }
    }

    pub fn write_request(
        &self,
        unit_id: u8,
        value: &VariableValue,
    ) -> Result<WriteRequest, CodecError> {
        let request = match self {
            Address::Modbus(address) => WriteRequest::Modbus {
                unit_id,
                function_code: address.set_single_f_code,
                offset: address.offset,
                registers: encode_modbus(address.data_type, value)?,
            },
            Address::S7(address) => WriteRequest::S7 {
                area: address.area,
                db_number: address.db_number,
                offset: address.offset,
                bytes: encode_s7(address.data_type, value)?,
            },
        };
        Ok(request)
    }

    pub fn decode(&self, raw: &RawData) -> Result<VariableValue, ReadError> {
        match (self, raw) {
            (Address::Modbus(address), RawData::Words(words)) => {
                Ok(decode_modbus(address.data_type, words)?)
            }
            (Address::S7(address), RawData::Bytes(bytes)) => Ok(decode_s7(address.data_type, bytes)?),
            (Address::Modbus(_), RawData::Bytes(_)) => Err(ProtocolError::DataParse(
                "expected registers, got bytes".to_string(),
            )
            .into()),
            (Address::S7(_), RawData::Words(_)) => Err(ProtocolError::DataParse(
                "expected bytes, got registers".to_string(),
            )
            .into()),
        }
    }

    /// 经过一次编解码，得到该类型可表示的值（例如 float 取 f32 精度）
    pub fn normalize(&self, value: &VariableValue) -> Result<VariableValue, CodecError> {
        match self {
            Address::Modbus(address) => {
                let registers = encode_modbus(address.data_type, value)?;
                decode_modbus(address.data_type, &registers)
            }
            Address::S7(address) => {
                let bytes = encode_s7(address.data_type, value)?;
                decode_s7(address.data_type, &bytes)
            }
        }
    }

    fn from_config(config: &VariableConfig) -> Result<Self, ConfigError> {
        if let Some(data_type) = modbus_type(&config.type_name, config.length)? {
            return modbus_address(data_type, config).map(Address::Modbus);
        }
        if let Some(data_type) = s7_type(&config.type_name, config.length)? {
            return s7_address(data_type, config).map(Address::S7);
        }
        Err(ConfigError::UnknownType(config.type_name.clone()))
    }
}

fn byte_array_length(length: Option<u16>, max: u16) -> Result<u16, ConfigError> {
    let length = length.ok_or_else(|| ConfigError::invalid("length", "required for byte arrays"))?;
    check_range("length", length as u32, 1, max as u32)?;
    Ok(length)
}

fn modbus_type(name: &str, length: Option<u16>) -> Result<Option<ModbusDataType>, ConfigError> {
    let data_type = match name {
        "mbBoolean" => ModbusDataType::Boolean,
        "mbInt16" => ModbusDataType::Int16,
        "mbUInt16" => ModbusDataType::UInt16,
        "mbInt32" => ModbusDataType::Int32,
        "mbUInt32" => ModbusDataType::UInt32,
        "mbFloat" => ModbusDataType::Float,
        "mbSwappedInt32" => ModbusDataType::SwappedInt32,
        "mbSwappedUInt32" => ModbusDataType::SwappedUInt32,
        "mbSwappedFloat" => ModbusDataType::SwappedFloat,
        "mbByteArray" => ModbusDataType::ByteArray(byte_array_length(length, MAX_MODBUS_WORDS)?),
        _ => return Ok(None),
    };
    Ok(Some(data_type))
}

fn s7_type(name: &str, length: Option<u16>) -> Result<Option<S7DataType>, ConfigError> {
    let data_type = match name {
        "s7Int8" => S7DataType::Int8,
        "s7UInt8" => S7DataType::UInt8,
        "s7Int16" => S7DataType::Int16,
        "s7UInt16" => S7DataType::UInt16,
        "s7Int32" => S7DataType::Int32,
        "s7UInt32" => S7DataType::UInt32,
        "s7Float" => S7DataType::Float,
        "s7ByteArray" => S7DataType::ByteArray(byte_array_length(length, MAX_S7_BYTES)?),
        _ => return Ok(None),
    };
    Ok(Some(data_type))
}

fn modbus_address(
    data_type: ModbusDataType,
    config: &VariableConfig,
) -> Result<ModbusAddress, ConfigError> {
    check_range("offset", config.offset, 0, MAX_MODBUS_OFFSET)?;

    // 线圈类：读 1/2，写 15；寄存器类：读 3/4，写 16
    let (allowed, default_read, set_single): (&[u8], u8, u8) =
        if data_type == ModbusDataType::Boolean {
            (&[1, 2, 15], 1, 15)
        } else {
            (&[3, 4, 16], 3, 16)
        };

    let f_code = config.f_code.unwrap_or(default_read);
    if !allowed.contains(&f_code) {
        return Err(ConfigError::invalid(
            "fCode",
            format!("{} not allowed for {}", f_code, data_type.name()),
        ));
    }
    let get_single_f_code = if f_code != set_single {
        f_code
    } else {
        default_read
    };

    Ok(ModbusAddress {
        data_type,
        offset: config.offset as u16,
        f_code,
        get_single_f_code,
        set_single_f_code: set_single,
    })
}

fn s7_address(data_type: S7DataType, config: &VariableConfig) -> Result<S7Address, ConfigError> {
    check_range("offset", config.offset, 0, MAX_S7_OFFSET)?;
    let area = config
        .area_type
        .ok_or_else(|| ConfigError::invalid("areaType", "required for s7 variables"))?;

    let db_number = if area == S7Area::DataBlock {
        let db_number = config
            .db_number
            .ok_or_else(|| ConfigError::invalid("dbNumber", "required for DB area"))?;
        check_range("dbNumber", db_number, 1, 65_535)?;
        db_number as u16
    } else {
        1
    };

    Ok(S7Address {
        data_type,
        area,
        db_number,
        offset: config.offset,
        write: config.write,
    })
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::invalid(
            field,
            format!("{} not in [{}, {}]", value, min, max),
        ));
    }
    Ok(())
}

pub(crate) fn check_name(name: &str) -> Result<(), ConfigError> {
    let length = name.chars().count();
    if !(3..=100).contains(&length) {
        return Err(ConfigError::invalid("name", "length must be between 3 and 100"));
    }
    Ok(())
}

pub(crate) fn check_sample_time(field: &'static str, value: u32) -> Result<(), ConfigError> {
    check_range(field, value, 1, MAX_SAMPLE_TIME)
}

/// 变量
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    id: String,
    name: String,
    sample_time: u32,
    archive_sample_time: u32,
    unit: String,
    archived: bool,
    address: Address,
    value: VariableValue,
    value_tick_id: i64,
}

impl Variable {
    pub fn from_config(config: VariableConfig) -> Result<Self, ConfigError> {
        check_name(&config.name)?;
        check_sample_time("sampleTime", config.sample_time)?;
        check_sample_time("archiveSampleTime", config.archive_sample_time)?;
        if config.unit.chars().count() > 10 {
            return Err(ConfigError::invalid("unit", "at most 10 characters"));
        }

        let address = Address::from_config(&config)?;
        let value = match &config.value {
            Some(value) => address.normalize(value)?,
            None => address.default_value(),
        };

        Ok(Self {
            id: config.id,
            name: config.name,
            sample_time: config.sample_time,
            archive_sample_time: config.archive_sample_time,
            unit: config.unit,
            archived: config.archived,
            address,
            value,
            value_tick_id: 0,
        })
    }

    /// 当前定义（含当前值）
    pub fn to_config(&self) -> VariableConfig {
        let mut config = VariableConfig {
            id: self.id.clone(),
            name: self.name.clone(),
            type_name: self.address.type_name().to_string(),
            sample_time: self.sample_time,
            archive_sample_time: self.archive_sample_time,
            unit: self.unit.clone(),
            archived: self.archived,
            offset: 0,
            length: None,
            f_code: None,
            area_type: None,
            db_number: None,
            write: false,
            value: Some(self.value.clone()),
        };
        match &self.address {
            Address::Modbus(address) => {
                config.offset = address.offset as u32;
                config.f_code = Some(address.f_code);
                if let ModbusDataType::ByteArray(length) = address.data_type {
                    config.length = Some(length);
                }
            }
            Address::S7(address) => {
                config.offset = address.offset;
                config.area_type = Some(address.area);
                config.db_number = Some(address.db_number as u32);
                config.write = address.write;
                if let S7DataType::ByteArray(length) = address.data_type {
                    config.length = Some(length);
                }
            }
        }
        config
    }

    /// 部分编辑；校验失败时变量保持不变
    ///
    /// 未给出新值时保留当前值，除非数据宽度变化（字节数组长度），此时重置为全零。
    pub fn edit(&mut self, update: VariableUpdate) -> Result<(), ConfigError> {
        let mut config = self.to_config();
        if let Some(name) = update.name {
            config.name = name;
        }
        if let Some(sample_time) = update.sample_time {
            config.sample_time = sample_time;
        }
        if let Some(archive_sample_time) = update.archive_sample_time {
            config.archive_sample_time = archive_sample_time;
        }
        if let Some(unit) = update.unit {
            config.unit = unit;
        }
        if let Some(archived) = update.archived {
            config.archived = archived;
        }
        if let Some(offset) = update.offset {
            config.offset = offset;
        }
        if update.length.is_some() {
            config.length = update.length;
        }
        if update.f_code.is_some() {
            config.f_code = update.f_code;
        }
        if update.area_type.is_some() {
            config.area_type = update.area_type;
        }
        if update.db_number.is_some() {
            config.db_number = update.db_number;
        }
        if let Some(write) = update.write {
            config.write = write;
        }
        let keep_value = update.value.is_none();
        config.value = update.value;

        let mut edited = Variable::from_config(config)?;
        // 类型不可编辑，默认值相同即宽度未变
        if keep_value && edited.address.default_value() == self.address.default_value() {
            edited.value = self.value.clone();
        }
        edited.value_tick_id = self.value_tick_id;
        *self = edited;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.address.type_name()
    }

    pub fn sample_time(&self) -> u32 {
        self.sample_time
    }

    pub fn archive_sample_time(&self) -> u32 {
        self.archive_sample_time
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn archived(&self) -> bool {
        self.archived
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn value(&self) -> &VariableValue {
        &self.value
    }

    pub fn value_tick_id(&self) -> i64 {
        self.value_tick_id
    }

    /// 值与 tick 一起更新
    pub(crate) fn set_value(&mut self, value: VariableValue, tick: i64) {
        self.value = value;
        self.value_tick_id = tick;
    }

    /// 写入成功后的本地更新，不改变 valueTickId
    pub(crate) fn replace_value(&mut self, value: VariableValue) {
        self.value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modbus(type_name: &str, f_code: Option<u8>) -> VariableConfig {
        VariableConfig {
            id: "v1".to_string(),
            name: "testVariable".to_string(),
            type_name: type_name.to_string(),
            sample_time: 1,
            archive_sample_time: 1,
            unit: String::new(),
            archived: false,
            offset: 10,
            length: None,
            f_code,
            area_type: None,
            db_number: None,
            write: false,
            value: None,
        }
    }

    fn s7(type_name: &str, area: S7Area, db_number: Option<u32>) -> VariableConfig {
        VariableConfig {
            area_type: Some(area),
            db_number,
            ..modbus(type_name, None)
        }
    }

    fn modbus_address_of(variable: &Variable) -> &ModbusAddress {
        match variable.address() {
            Address::Modbus(address) => address,
            other => panic!("expected modbus address, got {:?}", other),
        }
    }

    #[test]
    fn register_types_normalize_function_codes() {
        let variable = Variable::from_config(modbus("mbFloat", Some(4))).unwrap();
        let address = modbus_address_of(&variable);
        assert_eq!(address.get_single_f_code, 4);
        assert_eq!(address.set_single_f_code, 16);
        assert_eq!(address.read_f_code(), 4);

        let variable = Variable::from_config(modbus("mbInt32", Some(16))).unwrap();
        let address = modbus_address_of(&variable);
        assert_eq!(address.get_single_f_code, 3);
        assert_eq!(address.read_f_code(), 3);

        let err = Variable::from_config(modbus("mbUInt16", Some(2))).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "fCode", .. }));
    }

    #[test]
    fn boolean_uses_coil_function_codes() {
        let variable = Variable::from_config(modbus("mbBoolean", Some(2))).unwrap();
        let address = modbus_address_of(&variable);
        assert_eq!(address.get_single_f_code, 2);
        assert_eq!(address.set_single_f_code, 15);

        let variable = Variable::from_config(modbus("mbBoolean", Some(15))).unwrap();
        assert_eq!(modbus_address_of(&variable).get_single_f_code, 1);
        assert_eq!(variable.value(), &VariableValue::Bool(false));

        assert!(Variable::from_config(modbus("mbBoolean", Some(3))).is_err());
    }

    #[test]
    fn s7_db_number_is_bounded_only_for_data_blocks() {
        let variable = Variable::from_config(s7("s7Int16", S7Area::Memory, Some(500))).unwrap();
        let Address::S7(address) = variable.address() else {
            panic!("expected s7 address");
        };
        assert_eq!(address.db_number, 1);

        assert!(Variable::from_config(s7("s7Int16", S7Area::DataBlock, Some(0))).is_err());
        assert!(Variable::from_config(s7("s7Int16", S7Area::DataBlock, Some(65_536))).is_err());
        assert!(Variable::from_config(s7("s7Int16", S7Area::DataBlock, None)).is_err());
        assert!(Variable::from_config(s7("s7Int16", S7Area::DataBlock, Some(65_535))).is_ok());
    }

    #[test]
    fn bounds_are_checked() {
        let mut config = modbus("mbInt16", None);
        config.name = "ab".to_string();
        assert!(Variable::from_config(config).is_err());

        let mut config = modbus("mbInt16", None);
        config.offset = 10_001;
        assert!(Variable::from_config(config).is_err());

        let mut config = modbus("mbInt16", None);
        config.sample_time = 0;
        assert!(Variable::from_config(config).is_err());

        let mut config = modbus("mbInt16", None);
        config.unit = "kilowatthours".to_string();
        assert!(Variable::from_config(config).is_err());

        let err = Variable::from_config(modbus("mbInt64", None)).unwrap_err();
        assert_eq!(err, ConfigError::UnknownType("mbInt64".to_string()));
    }

    #[test]
    fn initial_value_is_normalized() {
        let mut config = modbus("mbFloat", None);
        config.value = Some(VariableValue::Float(123.321));
        let variable = Variable::from_config(config).unwrap();
        assert_eq!(variable.value(), &VariableValue::Float(123.321f32 as f64));

        let mut config = modbus("mbInt16", None);
        config.value = Some(VariableValue::Int(70_000));
        assert!(matches!(
            Variable::from_config(config),
            Err(ConfigError::Value(CodecError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn byte_array_length_edit_resets_value() {
        let mut config = modbus("mbByteArray", None);
        config.length = Some(2);
        config.value = Some(VariableValue::Bytes(vec![1, 2, 3, 4]));
        let mut variable = Variable::from_config(config).unwrap();

        variable
            .edit(VariableUpdate {
                name: Some("renamed".to_string()),
                ..VariableUpdate::default()
            })
            .unwrap();
        assert_eq!(variable.value(), &VariableValue::Bytes(vec![1, 2, 3, 4]));

        variable
            .edit(VariableUpdate {
                length: Some(3),
                ..VariableUpdate::default()
            })
            .unwrap();
        assert_eq!(variable.value(), &VariableValue::Bytes(vec![0; 6]));
        assert_eq!(variable.name(), "renamed");
    }

    #[test]
    fn failed_edit_leaves_variable_unchanged() {
        let mut variable = Variable::from_config(modbus("mbInt16", Some(4))).unwrap();
        let before = variable.clone();
        let err = variable
            .edit(VariableUpdate {
                offset: Some(20),
                f_code: Some(1),
                ..VariableUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "fCode", .. }));
        assert_eq!(variable, before);
    }

    #[test]
    fn read_request_uses_declared_width() {
        let variable = Variable::from_config(modbus("mbSwappedFloat", Some(4))).unwrap();
        assert_eq!(
            variable.address().read_request(7),
            ReadRequest::Modbus {
                unit_id: 7,
                function_code: 4,
                offset: 10,
                length: 2,
            }
        );

        let mut config = s7("s7ByteArray", S7Area::DataBlock, Some(3));
        config.length = Some(6);
        let variable = Variable::from_config(config).unwrap();
        assert_eq!(
            variable.address().read_request(1),
            ReadRequest::S7 {
                area: S7Area::DataBlock,
                db_number: 3,
                offset: 10,
                length: 6,
            }
        );
    }

    #[test]
    fn mismatched_raw_data_is_a_read_error() {
        let variable = Variable::from_config(modbus("mbUInt16", None)).unwrap();
        let err = variable
            .address()
            .decode(&RawData::Bytes(vec![0, 1]))
            .unwrap_err();
        assert!(matches!(err, ReadError::Protocol(ProtocolError::DataParse(_))));
    }
}
