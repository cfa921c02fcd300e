use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::google::protobuf::Any;
use prost::Message;

/// Try encoding any envoy message to ensure protobuf compatibility.
pub fn encode_check<T: Message>(message: &T, context: &str) -> Result<()> {
    if message.encode_to_vec().is_empty() {
        return Err(EdgeplaneError::validation(format!("{}: failed envoy-types encoding", context)));
    }
    Ok(())
}

/// Typed configs must name their message type.
pub fn check_typed_config(any: &Any, field: &str) -> Result<()> {
    if !any.type_url.starts_with("type.googleapis.com/") || any.type_url.len() <= 20 {
        return Err(EdgeplaneError::validation_field(
            format!("typed config has invalid type URL '{}'", any.type_url),
            field,
        ));
    }
    Ok(())
}

/// Prefix an inner validation failure with the element it came from.
pub fn nested(index: usize, what: &str, field: &str, error: EdgeplaneError) -> EdgeplaneError {
    EdgeplaneError::validation_field(format!("{} {} validation failed: {}", what, index, error), field)
}
