//! RBAC (Role-Based Access Control) HTTP filter synthesis
//!
//! Builds the authorization filter a virtual service asks for from its inline
//! policies and the shared policy objects it references.

use crate::domain::{PolicyIntent, RbacAction, RbacIntent};
use crate::errors::{EdgeplaneError, Result, ResultExt};
use crate::xds::model::RbacPolicySpec;
use envoy_types::pb::envoy::config::rbac::v3::{Policy, Rbac as RbacRulesProto};
use envoy_types::pb::envoy::extensions::filters::http::rbac::v3::Rbac as RbacProto;
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_filter, HttpFilter,
};
use envoy_types::pb::google::protobuf::Any;
use prost::Message;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Type URL for the RBAC filter configuration
pub const RBAC_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.filters.http.rbac.v3.RBAC";

/// Default HTTP filter name of the synthesized RBAC filter
pub const DEFAULT_RBAC_FILTER_NAME: &str = "envoy.filters.http.rbac";

/// The synthesized filter together with its JSON form.
#[derive(Debug, Clone, PartialEq)]
pub struct RbacFilter {
    pub filter: HttpFilter,
    pub json: Value,
}

/// Merge inline policies with the referenced policy objects, keyed by name.
///
/// A referenced policy is named after its object. Names must be unique.
pub fn collect_policies(
    intent: &RbacIntent,
    referenced: &[PolicyIntent],
) -> Result<BTreeMap<String, Value>> {
    let mut policies = intent.policies.clone();

    for policy in referenced {
        if policies.insert(policy.name.clone(), policy.policy.clone()).is_some() {
            return Err(EdgeplaneError::validation_field(
                format!("rbac policy '{}' is defined more than once", policy.name),
                "rbac.policies",
            ));
        }
    }

    if policies.is_empty() {
        return Err(EdgeplaneError::validation_field(
            "rbac requires at least one policy",
            "rbac.policies",
        ));
    }

    Ok(policies)
}

/// Build the RBAC HTTP filter for a set of named policies.
pub fn build_rbac_filter(
    filter_name: &str,
    action: RbacAction,
    policies: &BTreeMap<String, Value>,
) -> Result<RbacFilter> {
    let mut decoded = BTreeMap::new();
    for (name, value) in policies {
        let spec = RbacPolicySpec::from_value(value)
            .with_context(|| format!("rbac policy '{}'", name))?;
        spec.validate(name)?;
        let policy = spec.to_proto().with_context(|| format!("rbac policy '{}'", name))?;
        decoded.insert(name.clone(), policy);
    }

    let any = Any { type_url: RBAC_TYPE_URL.to_string(), value: encode_rules(action, &decoded) };

    debug!(
        filter = filter_name,
        action = ?action,
        policy_count = decoded.len(),
        "Synthesized RBAC filter"
    );

    let filter = HttpFilter {
        name: filter_name.to_string(),
        config_type: Some(http_filter::ConfigType::TypedConfig(any)),
        ..Default::default()
    };

    let json = json!({
        "name": filter_name,
        "typed_config": {
            "@type": RBAC_TYPE_URL,
            "rules": {
                "action": action,
                "policies": policies.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Map<_, _>>(),
            }
        }
    });

    Ok(RbacFilter { filter, json })
}

/// Encode one policy per chunk in name order.
///
/// Protobuf merges repeated occurrences of the `rules` message, so the
/// concatenation decodes to the full policy map while the bytes stay stable.
fn encode_rules(action: RbacAction, policies: &BTreeMap<String, Policy>) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (name, policy) in policies {
        let chunk = RbacProto {
            rules: Some(RbacRulesProto {
                action: action.to_proto_value(),
                policies: [(name.clone(), policy.clone())].into_iter().collect(),
                ..Default::default()
            }),
            ..Default::default()
        };
        bytes.extend(chunk.encode_to_vec());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::json;

    fn allow_all() -> Value {
        json!({ "permissions": [{ "any": true }], "principals": [{ "any": true }] })
    }

    fn rbac_intent(names: &[&str]) -> RbacIntent {
        RbacIntent {
            action: RbacAction::Deny,
            policies: names.iter().map(|n| (n.to_string(), allow_all())).collect(),
            additional_policies: vec![],
        }
    }

    #[test]
    fn builds_filter_with_all_policies() {
        let policies = collect_policies(&rbac_intent(&["b", "a"]), &[]).unwrap();
        let rbac = build_rbac_filter(DEFAULT_RBAC_FILTER_NAME, RbacAction::Deny, &policies).unwrap();

        assert_eq!(rbac.filter.name, DEFAULT_RBAC_FILTER_NAME);
        let Some(http_filter::ConfigType::TypedConfig(any)) = rbac.filter.config_type else {
            panic!("expected typed config");
        };
        assert_eq!(any.type_url, RBAC_TYPE_URL);

        let decoded = RbacProto::decode(any.value.as_slice()).unwrap();
        let rules = decoded.rules.unwrap();
        assert_eq!(rules.action, 1);
        assert_eq!(rules.policies.len(), 2);
        assert_eq!(rbac.json["typed_config"]["rules"]["action"], "DENY");
    }

    #[test]
    fn encoding_is_deterministic() {
        let policies = collect_policies(&rbac_intent(&["x", "y", "z"]), &[]).unwrap();
        let first = build_rbac_filter("rbac", RbacAction::Allow, &policies).unwrap();
        let second = build_rbac_filter("rbac", RbacAction::Allow, &policies).unwrap();
        assert_eq!(first.filter.encode_to_vec(), second.filter.encode_to_vec());
    }

    #[test]
    fn duplicate_policy_name_is_rejected() {
        let shared = PolicyIntent {
            namespace: "edge".to_string(),
            name: "a".to_string(),
            policy: allow_all(),
        };
        let err = collect_policies(&rbac_intent(&["a"]), &[shared]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn empty_policy_set_is_rejected() {
        assert!(collect_policies(&rbac_intent(&[]), &[]).is_err());
    }

    #[test]
    fn malformed_policy_is_a_decode_error() {
        let policies = BTreeMap::from([("bad".to_string(), json!({ "permissions": "all" }))]);
        let err = build_rbac_filter("rbac", RbacAction::Allow, &policies).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
