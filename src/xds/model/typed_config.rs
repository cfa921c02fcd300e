//! Typed extension configs (`{"@type": ..., ...}`) and their encoding.
//!
//! The router and plain file access loggers are encoded natively. Everything
//! else (including file loggers using formats outside [`FileAccessLogSpec`]) is
//! wrapped in an `xds.type.v3.TypedStruct`, which Envoy converts into the named
//! message when it loads the config.

use super::access_log::FileAccessLogSpec;
use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::extensions::filters::http::router::v3::Router;
use envoy_types::pb::google::protobuf::Any;
use prost::Message;
use prost_types::{ListValue, Struct, Value as ProtoValue};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const ROUTER_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";
pub const FILE_ACCESS_LOG_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.access_loggers.file.v3.FileAccessLog";
pub const TYPED_STRUCT_TYPE_URL: &str = "type.googleapis.com/xds.type.v3.TypedStruct";
pub const UDPA_TYPED_STRUCT_TYPE_URL: &str = "type.googleapis.com/udpa.type.v1.TypedStruct";

/// `xds.type.v3.TypedStruct`, wire-compatible with `udpa.type.v1.TypedStruct`.
#[derive(Clone, PartialEq, Message)]
pub struct TypedStruct {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Struct>,
}

/// Extension config in protobuf JSON form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypedConfig {
    #[serde(rename = "@type")]
    pub type_url: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypedStructSpec {
    type_url: String,
    #[serde(default)]
    value: Option<Value>,
}

impl TypedConfig {
    /// Encode to a protobuf `Any`.
    pub fn to_any(&self) -> Result<Any> {
        match self.type_url.as_str() {
            ROUTER_TYPE_URL if self.fields.is_empty() => {
                Ok(any_from_message(ROUTER_TYPE_URL, &Router::default()))
            }
            FILE_ACCESS_LOG_TYPE_URL => match self.decode_fields::<FileAccessLogSpec>() {
                Ok(spec) => Ok(any_from_message(FILE_ACCESS_LOG_TYPE_URL, &spec.to_proto())),
                Err(_) => self.wrap_in_typed_struct(),
            },
            TYPED_STRUCT_TYPE_URL | UDPA_TYPED_STRUCT_TYPE_URL => {
                let spec: TypedStructSpec = self.decode_fields()?;
                let value = spec.value.as_ref().map(json_to_struct).transpose()?;
                Ok(any_from_message(
                    self.type_url.clone(),
                    &TypedStruct { type_url: spec.type_url, value },
                ))
            }
            _ => self.wrap_in_typed_struct(),
        }
    }

    fn wrap_in_typed_struct(&self) -> Result<Any> {
        let value = json_to_struct(&Value::Object(self.fields.clone()))?;
        Ok(any_from_message(
            TYPED_STRUCT_TYPE_URL,
            &TypedStruct { type_url: self.type_url.clone(), value: Some(value) },
        ))
    }

    /// Decode the non-`@type` fields into a concrete model.
    pub fn decode_fields<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            EdgeplaneError::decode(format!("cannot decode typed config '{}'", self.type_url), e)
        })
    }
}

/// Encode a prost message into an `Any`.
pub fn any_from_message<M: Message>(type_url: impl Into<String>, msg: &M) -> Any {
    Any { type_url: type_url.into(), value: msg.encode_to_vec() }
}

/// Convert a JSON object into a `google.protobuf.Struct`.
pub fn json_to_struct(json: &Value) -> Result<Struct> {
    match json {
        Value::Object(map) => {
            let mut fields = BTreeMap::new();
            for (key, value) in map {
                fields.insert(key.clone(), json_to_proto_value(value)?);
            }
            Ok(Struct { fields: fields.into_iter().collect() })
        }
        _ => Err(EdgeplaneError::validation("typed config body must be a JSON object")),
    }
}

fn json_to_proto_value(json: &Value) -> Result<ProtoValue> {
    use prost_types::value::Kind;

    let kind = match json {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => {
            // Struct only carries doubles
            let num = n.as_f64().ok_or_else(|| {
                EdgeplaneError::validation(format!("cannot represent number {} as f64", n))
            })?;
            Kind::NumberValue(num)
        }
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(arr) => {
            let values = arr.iter().map(json_to_proto_value).collect::<Result<Vec<_>>>()?;
            Kind::ListValue(ListValue { values })
        }
        Value::Object(_) => Kind::StructValue(json_to_struct(json)?),
    };

    Ok(ProtoValue { kind: Some(kind) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn typed(value: Value) -> TypedConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_router_is_encoded_natively() {
        let any = typed(json!({ "@type": ROUTER_TYPE_URL })).to_any().unwrap();
        assert_eq!(any.type_url, ROUTER_TYPE_URL);
        assert!(Router::decode(any.value.as_slice()).is_ok());
    }

    #[test]
    fn unknown_types_are_wrapped_in_typed_struct() {
        let config = typed(json!({
            "@type": "type.googleapis.com/envoy.extensions.filters.http.cors.v3.Cors",
            "allow_origin_string_match": [{ "exact": "https://example.com" }]
        }));

        let any = config.to_any().unwrap();
        assert_eq!(any.type_url, TYPED_STRUCT_TYPE_URL);

        let decoded = TypedStruct::decode(any.value.as_slice()).unwrap();
        assert_eq!(decoded.type_url, "type.googleapis.com/envoy.extensions.filters.http.cors.v3.Cors");
        assert!(decoded.value.unwrap().fields.contains_key("allow_origin_string_match"));
    }

    #[test]
    fn explicit_typed_struct_keeps_inner_type() {
        let any = typed(json!({
            "@type": UDPA_TYPED_STRUCT_TYPE_URL,
            "type_url": "type.googleapis.com/acme.Filter",
            "value": { "mode": "strict" }
        }))
        .to_any()
        .unwrap();

        assert_eq!(any.type_url, UDPA_TYPED_STRUCT_TYPE_URL);
        let decoded = TypedStruct::decode(any.value.as_slice()).unwrap();
        assert_eq!(decoded.type_url, "type.googleapis.com/acme.Filter");
    }

    #[test]
    fn encoding_is_deterministic() {
        let config = typed(json!({
            "@type": "type.googleapis.com/acme.Filter",
            "b": 1, "a": [true, null, "x"], "c": { "z": 1, "y": 2 }
        }));
        assert_eq!(config.to_any().unwrap(), config.to_any().unwrap());
    }

    #[test]
    fn struct_requires_object() {
        assert!(json_to_struct(&json!([1, 2])).is_err());
    }
}
