//! RBAC policy model
//!
//! Policies use the protobuf JSON shape of `envoy.config.rbac.v3.Policy`, so a
//! permission is written as `{"any": true}`, `{"url_path": {...}}` and so on.

use super::common::StringMatcherSpec;
use super::route::HeaderMatcherSpec;
use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::core::v3::CidrRange;
use envoy_types::pb::envoy::config::rbac::v3::{
    permission::{self, Rule},
    principal::{self, Identifier},
    Permission, Policy, Principal,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{path_matcher, PathMatcher};
use envoy_types::pb::google::protobuf::UInt32Value;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathMatcherSpec {
    pub path: StringMatcherSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CidrRangeSpec {
    pub address_prefix: String,
    #[serde(default)]
    pub prefix_len: Option<u32>,
}

impl CidrRangeSpec {
    fn to_proto(&self) -> CidrRange {
        CidrRange {
            address_prefix: self.address_prefix.clone(),
            prefix_len: self.prefix_len.map(|value| UInt32Value { value }),
        }
    }
}

/// What a request does.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionSpec {
    Any(bool),
    Header(HeaderMatcherSpec),
    UrlPath(PathMatcherSpec),
    DestinationPort(u32),
    AndRules { rules: Vec<PermissionSpec> },
    OrRules { rules: Vec<PermissionSpec> },
    NotRule(Box<PermissionSpec>),
}

impl PermissionSpec {
    fn to_proto(&self) -> Result<Permission> {
        let rule = match self {
            Self::Any(any) => Rule::Any(*any),
            Self::Header(matcher) => Rule::Header(matcher.to_proto()?),
            Self::UrlPath(matcher) => Rule::UrlPath(PathMatcher {
                rule: Some(path_matcher::Rule::Path(matcher.path.to_proto()?)),
            }),
            Self::DestinationPort(port) => Rule::DestinationPort(*port),
            Self::AndRules { rules } => Rule::AndRules(permission::Set {
                rules: rules.iter().map(PermissionSpec::to_proto).collect::<Result<_>>()?,
            }),
            Self::OrRules { rules } => Rule::OrRules(permission::Set {
                rules: rules.iter().map(PermissionSpec::to_proto).collect::<Result<_>>()?,
            }),
            Self::NotRule(rule) => Rule::NotRule(Box::new(rule.to_proto()?)),
        };
        Ok(Permission { rule: Some(rule) })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthenticatedSpec {
    #[serde(default)]
    pub principal_name: Option<StringMatcherSpec>,
}

/// Who makes a request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalSpec {
    Any(bool),
    Authenticated(AuthenticatedSpec),
    DirectRemoteIp(CidrRangeSpec),
    RemoteIp(CidrRangeSpec),
    Header(HeaderMatcherSpec),
    AndIds { ids: Vec<PrincipalSpec> },
    OrIds { ids: Vec<PrincipalSpec> },
    NotId(Box<PrincipalSpec>),
}

impl PrincipalSpec {
    fn to_proto(&self) -> Result<Principal> {
        let identifier = match self {
            Self::Any(any) => Identifier::Any(*any),
            Self::Authenticated(authenticated) => Identifier::Authenticated(principal::Authenticated {
                principal_name: authenticated
                    .principal_name
                    .as_ref()
                    .map(StringMatcherSpec::to_proto)
                    .transpose()?,
            }),
            Self::DirectRemoteIp(range) => Identifier::DirectRemoteIp(range.to_proto()),
            Self::RemoteIp(range) => Identifier::RemoteIp(range.to_proto()),
            Self::Header(matcher) => Identifier::Header(matcher.to_proto()?),
            Self::AndIds { ids } => Identifier::AndIds(principal::Set {
                ids: ids.iter().map(PrincipalSpec::to_proto).collect::<Result<_>>()?,
            }),
            Self::OrIds { ids } => Identifier::OrIds(principal::Set {
                ids: ids.iter().map(PrincipalSpec::to_proto).collect::<Result<_>>()?,
            }),
            Self::NotId(id) => Identifier::NotId(Box::new(id.to_proto()?)),
        };
        Ok(Principal { identifier: Some(identifier) })
    }
}

/// `envoy.config.rbac.v3.Policy` in JSON form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RbacPolicySpec {
    pub permissions: Vec<PermissionSpec>,
    pub principals: Vec<PrincipalSpec>,
}

impl RbacPolicySpec {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| EdgeplaneError::decode("cannot decode rbac policy", e))
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.permissions.is_empty() {
            return Err(EdgeplaneError::validation_field(
                format!("rbac policy '{}' needs at least one permission", name),
                "permissions",
            ));
        }
        if self.principals.is_empty() {
            return Err(EdgeplaneError::validation_field(
                format!("rbac policy '{}' needs at least one principal", name),
                "principals",
            ));
        }
        Ok(())
    }

    pub fn to_proto(&self) -> Result<Policy> {
        Ok(Policy {
            permissions: self
                .permissions
                .iter()
                .map(PermissionSpec::to_proto)
                .collect::<Result<_>>()?,
            principals: self.principals.iter().map(PrincipalSpec::to_proto).collect::<Result<_>>()?,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_envoy_shaped_policy() {
        let spec = RbacPolicySpec::from_value(&json!({
            "permissions": [
                { "url_path": { "path": { "prefix": "/admin" } } },
                { "and_rules": { "rules": [{ "destination_port": 443 }, { "any": true }] } }
            ],
            "principals": [
                { "direct_remote_ip": { "address_prefix": "10.0.0.0", "prefix_len": 8 } },
                { "not_id": { "any": true } }
            ]
        }))
        .unwrap();

        spec.validate("admins").unwrap();
        let policy = spec.to_proto().unwrap();
        assert_eq!(policy.permissions.len(), 2);
        assert!(matches!(
            policy.principals[0].identifier,
            Some(Identifier::DirectRemoteIp(ref range)) if range.address_prefix == "10.0.0.0"
        ));
        assert!(matches!(policy.principals[1].identifier, Some(Identifier::NotId(_))));
    }

    #[test]
    fn nested_matcher_conflicts_fail_conversion() {
        let spec = RbacPolicySpec::from_value(&json!({
            "permissions": [
                { "not_rule": { "url_path": { "path": { "exact": "/admin", "prefix": "/admin/" } } } }
            ],
            "principals": [{ "any": true }]
        }))
        .unwrap();

        spec.validate("admins").unwrap();
        let err = spec.to_proto().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Validation);
    }

    #[test]
    fn empty_principals_fail_validation() {
        let spec = RbacPolicySpec::from_value(&json!({
            "permissions": [{ "any": true }],
            "principals": []
        }))
        .unwrap();
        assert!(spec.validate("p").is_err());
    }
}
