use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::model::visual::SpanStatus;
use crate::time::{calculate_duration_ms, to_ms};

/// One key/value pair of a span or event attribute sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    pub key: String,
    pub value: Value,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Raw span record as handed over by the trace store.
///
/// Timestamps keep whatever unit the producer used; go through
/// [`Span::start_ms`] and friends rather than reading them directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Span {
    #[serde(default, alias = "traceId")]
    pub trace_id: String,
    #[serde(alias = "spanId")]
    pub span_id: String,
    #[serde(
        default,
        alias = "parentSpanId",
        deserialize_with = "deserialize_parent_id"
    )]
    pub parent_span_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        alias = "startTime",
        alias = "start_time_unix_nano",
        alias = "startTimeUnixNano",
        deserialize_with = "deserialize_timestamp"
    )]
    pub start_time: f64,
    #[serde(
        default,
        alias = "endTime",
        alias = "end_time_unix_nano",
        alias = "endTimeUnixNano",
        deserialize_with = "deserialize_timestamp"
    )]
    pub end_time: f64,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: String,
    #[serde(default, deserialize_with = "deserialize_attributes")]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub events: Vec<SpanEvent>,
    #[serde(default, alias = "serviceName", skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_resource")]
    pub resource: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpanEvent {
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        alias = "time",
        alias = "time_unix_nano",
        alias = "timeUnixNano",
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: f64,
    #[serde(default, deserialize_with = "deserialize_attributes")]
    pub attributes: Vec<Attribute>,
}

impl Span {
    pub fn start_ms(&self) -> f64 {
        to_ms(self.start_time)
    }

    pub fn end_ms(&self) -> f64 {
        to_ms(self.end_time)
    }

    pub fn duration_ms(&self) -> f64 {
        calculate_duration_ms(self.start_time, self.end_time)
    }

    pub fn normalized_status(&self) -> SpanStatus {
        SpanStatus::parse(&self.status)
    }

    pub fn is_error(&self) -> bool {
        self.normalized_status() == SpanStatus::Error
    }

    /// Attributes folded into a mapping; a repeated key keeps its last value.
    pub fn attribute_map(&self) -> BTreeMap<String, Value> {
        fold_attributes(&self.attributes)
    }
}

pub fn fold_attributes(attributes: &[Attribute]) -> BTreeMap<String, Value> {
    attributes
        .iter()
        .fold(BTreeMap::new(), |mut map, attr| {
            map.insert(attr.key.clone(), attr.value.clone());
            map
        })
}

/// Renders an attribute value the way a label would show it: strings bare,
/// everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::String(s) => s,
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        Value::Object(map) => map
            .get("code")
            .map(|code| match code {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default(),
        _ => String::new(),
    })
}

fn deserialize_parent_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|id| !id.trim().is_empty()))
}

fn deserialize_resource<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Object(map) => map,
        // OTLP attribute list: [{"key": .., "value": ..}]
        Value::Array(items) => items
            .into_iter()
            .filter_map(attribute_from_value)
            .map(|attr| (attr.key, attr.value))
            .collect(),
        _ => Map::new(),
    })
}

/// Accepts `[[k, v], ..]`, `[{"key": k, "value": v}, ..]` or a plain object.
fn deserialize_attributes<'de, D>(deserializer: D) -> Result<Vec<Attribute>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Array(items) => items.into_iter().filter_map(attribute_from_value).collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| Attribute { key, value })
            .collect(),
        _ => Vec::new(),
    })
}

fn attribute_from_value(item: Value) -> Option<Attribute> {
    match item {
        Value::Array(mut pair) if pair.len() == 2 => {
            let value = pair.pop()?;
            let key = pair.pop()?.as_str()?.to_string();
            Some(Attribute { key, value })
        }
        Value::Object(mut obj) => {
            let key = obj.remove("key")?.as_str()?.to_string();
            let value = obj.remove("value").map(unwrap_any_value).unwrap_or(Value::Null);
            Some(Attribute { key, value })
        }
        _ => None,
    }
}

/// Unwraps OTLP JSON `AnyValue` wrappers such as `{"stringValue": "x"}`.
fn unwrap_any_value(value: Value) -> Value {
    let unwrapped = match &value {
        Value::Object(obj) if obj.len() == 1 => {
            obj.iter()
                .next()
                .and_then(|(kind, inner)| match (kind.as_str(), inner) {
                    ("stringValue" | "boolValue" | "doubleValue", v) => Some(v.clone()),
                    ("intValue", Value::String(s)) => s.parse::<i64>().ok().map(Value::from),
                    ("intValue", v) => Some(v.clone()),
                    _ => None,
                })
        }
        _ => None,
    };
    unwrapped.unwrap_or(value)
}
