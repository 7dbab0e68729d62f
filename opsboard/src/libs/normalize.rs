//! Normalizers that turn Gasoges and MundoSMS payloads into typed records.
//!
//! Upstream lists arrive as arrays of positional tuples, arrays of keyed objects, or either one
//! wrapped in `{"data":[...]}`. The first array or object element decides the shape of the whole
//! list. Scalars, nulls, rows of the other shape and rows missing required fields are dropped.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use opsboard_corelib::strings;

/// Depot (tank) state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepotState {
    #[serde(rename = "ID_DEPOSITO")]
    pub id: i64,
    #[serde(rename = "NOMBRE")]
    pub name: String,
    #[serde(
        rename = "CAPACIDAD",
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_opt_num"
    )]
    pub capacity: Option<f64>,
    #[serde(
        rename = "LITROS_ACTUALES",
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_opt_num"
    )]
    pub level: Option<f64>,
    #[serde(
        rename = "PORCENTAJE",
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_opt_num"
    )]
    pub percentage: Option<f64>,
    #[serde(rename = "ULTIMO_SUMINISTRO", skip_serializing_if = "Option::is_none")]
    pub last_supply: Option<String>,
}

/// Fuel supply event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Supply {
    #[serde(rename = "ID_USUARIO", serialize_with = "ser_opt_num")]
    pub user_id: Option<f64>,
    #[serde(rename = "ID_VEHICULO")]
    pub vehicle_id: Option<TextOrNumber>,
    #[serde(rename = "KM", serialize_with = "ser_opt_num")]
    pub km: Option<f64>,
    #[serde(rename = "LITROS_SUMINISTRADOS", serialize_with = "ser_num")]
    pub liters: f64,
    #[serde(rename = "PRECIO", serialize_with = "ser_opt_num")]
    pub price: Option<f64>,
    #[serde(rename = "FECHA Y HORA")]
    pub timestamp: String,
    #[serde(rename = "NUMERO_DE_SERIE_SURTIDOR")]
    pub pump_serial: Option<TextOrNumber>,
    #[serde(rename = "ID_DEPOSITO", serialize_with = "ser_opt_num")]
    pub depot_id: Option<f64>,
    #[serde(rename = "ID_COMBUSTIBLE", serialize_with = "ser_opt_num")]
    pub fuel_id: Option<f64>,
}

/// Call record from the PBX call list.
#[derive(Clone, Debug, PartialEq)]
pub struct CallRecord {
    /// `1` means answered.
    pub status: String,
    pub start: Option<NaiveDateTime>,
    pub answer: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// From `agent_id`, else `callerid_text`, else `arr_related[0].id`.
    pub agent: Option<String>,
}

/// Identifiers that upstream sends either as text or as numbers.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TextOrNumber {
    Number(Number),
    Text(String),
}

/// The list wrapper forms. Bare lists are tried first because structs also accept sequences.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListPayload {
    List(Vec<Value>),
    Wrapped { data: Vec<Value> },
}

/// A row of a list. Tuples are read positionally and objects by key.
#[derive(Deserialize)]
#[serde(untagged)]
enum Row {
    Tuple(Vec<Value>),
    Keyed(Map<String, Value>),
}

#[derive(Clone, Copy, PartialEq)]
enum Shape {
    Tuple,
    Keyed,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CallsPayload {
    List(Vec<Value>),
    Nested { data: CallsList },
    Flat(CallsList),
}

#[derive(Deserialize)]
struct CallsList {
    calls: Vec<Value>,
}

const KEYS_USER: &'static [&'static str] = &["ID_USUARIO", "id_usuario"];
const KEYS_VEHICLE: &'static [&'static str] = &["ID_VEHICULO", "id_vehiculo", "vehiculo"];
const KEYS_KM: &'static [&'static str] = &["KM", "km"];
const KEYS_LITERS: &'static [&'static str] = &["LITROS_SUMINISTRADOS", "litros", "LITROS"];
const KEYS_PRICE: &'static [&'static str] = &["PRECIO", "precio"];
const KEYS_TIMESTAMP: &'static [&'static str] = &["FECHA Y HORA", "fecha_hora", "FECHA"];
const KEYS_PUMP: &'static [&'static str] = &[
    "NUMERO_DE_SERIE_SURTIDOR",
    "NUMERO_SERIE_SURTIDOR",
    "surtidor",
];
const KEYS_SUPPLY_DEPOT: &'static [&'static str] = &["ID_DEPOSITO", "id_deposito"];
const KEYS_FUEL: &'static [&'static str] = &["ID_COMBUSTIBLE", "id_combustible"];

const KEYS_DEPOT_ID: &'static [&'static str] = &["ID_DEPOSITO", "id"];
const KEYS_DEPOT_NAME: &'static [&'static str] = &["NOMBRE", "nombre", "name"];
const KEYS_CAPACITY: &'static [&'static str] = &["CAPACIDAD", "capacidad"];
const KEYS_LEVEL: &'static [&'static str] = &["LITROS_ACTUALES", "litros_actuales"];
const KEYS_PERCENTAGE: &'static [&'static str] = &["PORCENTAJE", "porcentaje"];
const KEYS_LAST_SUPPLY: &'static [&'static str] = &["ULTIMO_SUMINISTRO", "ultimo_suministro"];

const CALL_TIME_FORMATS: [&'static str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

impl DepotState {
    /// Fill the capacity when upstream does not provide one and derive the percentage.
    pub fn with_capacity(mut self, capacity: Option<f64>) -> Self {
        if self.capacity.is_none() {
            self.capacity = capacity;
        }
        self.derive_percentage()
    }

    fn derive_percentage(mut self) -> Self {
        if let (Some(capacity), Some(level)) = (self.capacity, self.level) {
            if capacity > 0.0 {
                self.percentage = Some((level / capacity * 100.0).round());
            }
        }
        self
    }
}

/// To normalize a supply list (`/suministros/...`).
pub fn supplies(payload: Value) -> Vec<Supply> {
    rows(payload)
        .into_iter()
        .filter_map(|row| match row {
            Row::Tuple(fields) => supply_from_fields(|i, _| fields.get(i)),
            Row::Keyed(fields) => supply_from_fields(|_, keys| first_key(&fields, keys)),
        })
        .collect()
}

/// To normalize a depot list (`/depositos`).
pub fn depots(payload: Value) -> Vec<DepotState> {
    rows(payload)
        .into_iter()
        .filter_map(|row| match row {
            Row::Tuple(fields) => depot_from_fields(|i, _| fields.get(i)),
            Row::Keyed(fields) => depot_from_fields(|_, keys| first_key(&fields, keys)),
        })
        .map(|depot| depot.derive_percentage())
        .collect()
}

/// To read the level leaf of `/depositos/nivel/{id}/{date}`.
///
/// Accepts `[[970]]`, `[["970"]]`, `[970]`, bare numbers and `{"data":...}`. Anything else
/// yields `None`.
pub fn depot_level(payload: &Value) -> Option<f64> {
    match payload {
        Value::Array(list) => match list.first()? {
            Value::Array(inner) => strings::parse_number(inner.first()?),
            leaf => strings::parse_number(leaf),
        },
        Value::Object(obj) => match obj.get("data")? {
            Value::Object(_) => None,
            data => depot_level(data),
        },
        leaf => strings::parse_number(leaf),
    }
}

/// To normalize a call list (`list_voipcalls`).
pub fn calls(payload: Value) -> Vec<CallRecord> {
    let list = match CallsPayload::deserialize(payload) {
        Err(_) => return vec![],
        Ok(CallsPayload::List(list)) => list,
        Ok(CallsPayload::Nested { data }) => data.calls,
        Ok(CallsPayload::Flat(list)) => list.calls,
    };
    list.iter()
        .filter_map(|call| {
            let call = call.as_object()?;
            Some(CallRecord {
                status: match call.get("status") {
                    Some(Value::String(s)) => s.trim().to_string(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => String::new(),
                },
                start: call_time(call.get("date_start")),
                answer: call_time(call.get("date_answer")),
                end: call_time(call.get("date_end")),
                agent: agent_key(call),
            })
        })
        .collect()
}

/// Serialize integral values without a fraction so that `970.0` is written as `970`.
pub fn ser_num<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return serializer.serialize_i64(*value as i64);
    }
    serializer.serialize_f64(*value)
}

pub fn ser_opt_num<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        None => serializer.serialize_none(),
        Some(v) => ser_num(v, serializer),
    }
}

/// Unwrap the list and resolve every row with the shape of the first array or object row.
fn rows(payload: Value) -> Vec<Row> {
    let list = match ListPayload::deserialize(payload) {
        Err(_) => return vec![],
        Ok(ListPayload::List(list)) => list,
        Ok(ListPayload::Wrapped { data }) => data,
    };
    let shape = match list.iter().find_map(|row| match row {
        Value::Array(_) => Some(Shape::Tuple),
        Value::Object(_) => Some(Shape::Keyed),
        _ => None,
    }) {
        None => return vec![],
        Some(shape) => shape,
    };
    list.into_iter()
        .filter_map(|row| match Row::deserialize(row) {
            Ok(Row::Tuple(fields)) if shape == Shape::Tuple => Some(Row::Tuple(fields)),
            Ok(Row::Keyed(fields)) if shape == Shape::Keyed => Some(Row::Keyed(fields)),
            _ => None,
        })
        .collect()
}

/// Both shapes read fields through `get(position, keys)`.
fn supply_from_fields<'a, F>(get: F) -> Option<Supply>
where
    F: Fn(usize, &[&str]) -> Option<&'a Value>,
{
    let liters = strings::parse_number(get(3, KEYS_LITERS)?)?;
    let timestamp = match get(5, KEYS_TIMESTAMP)? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return None,
    };
    Some(Supply {
        user_id: get(0, KEYS_USER).and_then(strings::parse_number),
        vehicle_id: get(1, KEYS_VEHICLE).and_then(text_or_number),
        km: get(2, KEYS_KM).and_then(strings::parse_number),
        liters,
        price: get(4, KEYS_PRICE).and_then(strings::parse_number),
        timestamp,
        pump_serial: get(6, KEYS_PUMP).and_then(text_or_number),
        depot_id: get(7, KEYS_SUPPLY_DEPOT).and_then(strings::parse_number),
        fuel_id: get(8, KEYS_FUEL).and_then(strings::parse_number),
    })
}

/// Tuples are `[id, name]`. Objects may carry the full state.
fn depot_from_fields<'a, F>(get: F) -> Option<DepotState>
where
    F: Fn(usize, &[&str]) -> Option<&'a Value>,
{
    let id = strings::parse_number(get(0, KEYS_DEPOT_ID)?)?;
    if id.fract() != 0.0 {
        return None;
    }
    let name = match get(1, KEYS_DEPOT_NAME) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    Some(DepotState {
        id: id as i64,
        name,
        capacity: get(usize::MAX, KEYS_CAPACITY).and_then(strings::parse_number),
        level: get(usize::MAX, KEYS_LEVEL).and_then(strings::parse_number),
        percentage: get(usize::MAX, KEYS_PERCENTAGE).and_then(strings::parse_number),
        last_supply: match get(usize::MAX, KEYS_LAST_SUPPLY) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        },
    })
}

fn first_key<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|v| !v.is_null())
}

fn text_or_number(value: &Value) -> Option<TextOrNumber> {
    match value {
        Value::Number(n) => Some(TextOrNumber::Number(n.clone())),
        Value::String(s) if !s.trim().is_empty() => Some(TextOrNumber::Text(s.trim().to_string())),
        _ => None,
    }
}

fn call_time(value: Option<&Value>) -> Option<NaiveDateTime> {
    let value = value?.as_str()?.trim();
    CALL_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn agent_key(call: &Map<String, Value>) -> Option<String> {
    if let Some(agent) = call.get("agent_id").and_then(key_text) {
        return Some(agent);
    }
    if let Some(agent) = call.get("callerid_text").and_then(key_text) {
        return Some(agent);
    }
    call.get("arr_related")?
        .as_array()?
        .first()?
        .get("id")
        .and_then(key_text)
}

/// Empty strings and zero are not keys.
fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}
