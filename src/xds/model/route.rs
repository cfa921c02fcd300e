//! Virtual host and route models.
//!
//! These mirror the protobuf JSON shape of `envoy.config.route.v3` messages
//! closely enough that payloads copied from Envoy documentation decode as-is.
//! Unknown fields are rejected rather than silently dropped.

use super::common::{
    one_of, DataSourceSpec, HeaderValueOptionSpec, ProtoDuration, RegexSpec, StringMatcherSpec,
};
use super::typed_config::TypedConfig;
use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::route::v3::{
    header_matcher::HeaderMatchSpecifier,
    redirect_action::{PathRewriteSpecifier, RedirectResponseCode, SchemeRewriteSpecifier},
    route::Action,
    route_action::{self, ClusterSpecifier, HostRewriteSpecifier},
    route_match::PathSpecifier,
    weighted_cluster::ClusterWeight,
    DirectResponseAction, HeaderMatcher, RedirectAction, Route, RouteAction, RouteMatch,
    VirtualHost, WeightedCluster,
};
use envoy_types::pb::google::protobuf::{Any, BoolValue, UInt32Value};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

fn per_filter_configs(configs: &BTreeMap<String, TypedConfig>) -> Result<HashMap<String, Any>> {
    configs.iter().map(|(name, config)| Ok((name.clone(), config.to_any()?))).collect()
}

/// `VirtualHost` in JSON form.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualHostSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub routes: Vec<Value>,
    #[serde(default)]
    pub request_headers_to_add: Vec<HeaderValueOptionSpec>,
    #[serde(default)]
    pub request_headers_to_remove: Vec<String>,
    #[serde(default)]
    pub response_headers_to_add: Vec<HeaderValueOptionSpec>,
    #[serde(default)]
    pub response_headers_to_remove: Vec<String>,
    #[serde(default)]
    pub typed_per_filter_config: BTreeMap<String, TypedConfig>,
}

impl VirtualHostSpec {
    /// Decode the virtual host body. Routes stay raw until decoded one by one.
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Err(EdgeplaneError::validation_field("virtual host is empty", "virtual_host"));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| EdgeplaneError::decode("cannot decode virtual host", e))
    }

    /// Build the proxy virtual host around already converted routes.
    pub fn to_proto(&self, routes: Vec<Route>) -> Result<VirtualHost> {
        Ok(VirtualHost {
            name: self.name.clone(),
            domains: self.domains.clone(),
            routes,
            request_headers_to_add: self
                .request_headers_to_add
                .iter()
                .map(HeaderValueOptionSpec::to_proto)
                .collect(),
            request_headers_to_remove: self.request_headers_to_remove.clone(),
            response_headers_to_add: self
                .response_headers_to_add
                .iter()
                .map(HeaderValueOptionSpec::to_proto)
                .collect(),
            response_headers_to_remove: self.response_headers_to_remove.clone(),
            typed_per_filter_config: per_filter_configs(&self.typed_per_filter_config)?
                .into_iter()
                .collect(),
            ..Default::default()
        })
    }
}

/// `Route` in JSON form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "match")]
    pub route_match: Option<RouteMatchSpec>,
    #[serde(default)]
    pub route: Option<RouteActionSpec>,
    #[serde(default)]
    pub redirect: Option<RedirectActionSpec>,
    #[serde(default)]
    pub direct_response: Option<DirectResponseSpec>,
    #[serde(default)]
    pub request_headers_to_add: Vec<HeaderValueOptionSpec>,
    #[serde(default)]
    pub request_headers_to_remove: Vec<String>,
    #[serde(default)]
    pub response_headers_to_add: Vec<HeaderValueOptionSpec>,
    #[serde(default)]
    pub response_headers_to_remove: Vec<String>,
    #[serde(default)]
    pub typed_per_filter_config: BTreeMap<String, TypedConfig>,
}

impl RouteSpec {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| EdgeplaneError::decode("cannot decode route", e))
    }

    pub fn to_proto(&self) -> Result<Route> {
        one_of(
            &[
                ("route", self.route.is_some()),
                ("redirect", self.redirect.is_some()),
                ("direct_response", self.direct_response.is_some()),
            ],
            "action",
        )?;

        let action = if let Some(route) = &self.route {
            Some(Action::Route(route.to_proto()?))
        } else if let Some(redirect) = &self.redirect {
            Some(Action::Redirect(redirect.to_proto()?))
        } else {
            self.direct_response.as_ref().map(|direct| Action::DirectResponse(direct.to_proto()))
        };

        Ok(Route {
            name: self.name.clone(),
            r#match: self.route_match.as_ref().map(RouteMatchSpec::to_proto).transpose()?,
            action,
            request_headers_to_add: self
                .request_headers_to_add
                .iter()
                .map(HeaderValueOptionSpec::to_proto)
                .collect(),
            request_headers_to_remove: self.request_headers_to_remove.clone(),
            response_headers_to_add: self
                .response_headers_to_add
                .iter()
                .map(HeaderValueOptionSpec::to_proto)
                .collect(),
            response_headers_to_remove: self.response_headers_to_remove.clone(),
            typed_per_filter_config: per_filter_configs(&self.typed_per_filter_config)?
                .into_iter()
                .collect(),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteMatchSpec {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub safe_regex: Option<RegexSpec>,
    #[serde(default)]
    pub path_separated_prefix: Option<String>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub headers: Vec<HeaderMatcherSpec>,
}

impl RouteMatchSpec {
    pub fn to_proto(&self) -> Result<RouteMatch> {
        one_of(
            &[
                ("prefix", self.prefix.is_some()),
                ("path", self.path.is_some()),
                ("safe_regex", self.safe_regex.is_some()),
                ("path_separated_prefix", self.path_separated_prefix.is_some()),
            ],
            "match",
        )?;

        let path_specifier = if let Some(prefix) = &self.prefix {
            Some(PathSpecifier::Prefix(prefix.clone()))
        } else if let Some(path) = &self.path {
            Some(PathSpecifier::Path(path.clone()))
        } else if let Some(regex) = &self.safe_regex {
            Some(PathSpecifier::SafeRegex(regex.to_proto()))
        } else {
            self.path_separated_prefix.clone().map(PathSpecifier::PathSeparatedPrefix)
        };

        Ok(RouteMatch {
            path_specifier,
            case_sensitive: self.case_sensitive.map(|value| BoolValue { value }),
            headers: self.headers.iter().map(HeaderMatcherSpec::to_proto).collect::<Result<_>>()?,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderMatcherSpec {
    pub name: String,
    #[serde(default)]
    pub string_match: Option<StringMatcherSpec>,
    #[serde(default)]
    pub present_match: Option<bool>,
    #[serde(default)]
    pub invert_match: bool,
}

impl HeaderMatcherSpec {
    pub(crate) fn to_proto(&self) -> Result<HeaderMatcher> {
        let header_match_specifier = match (&self.string_match, self.present_match) {
            (Some(_), Some(_)) => {
                return Err(EdgeplaneError::validation_field(
                    format!("header '{}' may set only one of string_match, present_match", self.name),
                    "headers",
                ))
            }
            (Some(matcher), None) => HeaderMatchSpecifier::StringMatch(matcher.to_proto()?),
            (None, Some(present)) => HeaderMatchSpecifier::PresentMatch(present),
            (None, None) => HeaderMatchSpecifier::PresentMatch(true),
        };

        Ok(HeaderMatcher {
            name: self.name.clone(),
            header_match_specifier: Some(header_match_specifier),
            invert_match: self.invert_match,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterWeightSpec {
    pub name: String,
    #[serde(default)]
    pub weight: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedClustersSpec {
    pub clusters: Vec<ClusterWeightSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteUpgradeConfigSpec {
    pub upgrade_type: String,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// `RouteAction` in JSON form.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteActionSpec {
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub cluster_header: Option<String>,
    #[serde(default)]
    pub weighted_clusters: Option<WeightedClustersSpec>,
    #[serde(default)]
    pub prefix_rewrite: Option<String>,
    #[serde(default)]
    pub host_rewrite_literal: Option<String>,
    #[serde(default)]
    pub auto_host_rewrite: Option<bool>,
    #[serde(default)]
    pub timeout: Option<ProtoDuration>,
    #[serde(default)]
    pub idle_timeout: Option<ProtoDuration>,
    #[serde(default)]
    pub upgrade_configs: Vec<RouteUpgradeConfigSpec>,
}

impl RouteActionSpec {
    pub fn to_proto(&self) -> Result<RouteAction> {
        one_of(
            &[
                ("cluster", self.cluster.is_some()),
                ("cluster_header", self.cluster_header.is_some()),
                ("weighted_clusters", self.weighted_clusters.is_some()),
            ],
            "route",
        )?;
        one_of(
            &[
                ("host_rewrite_literal", self.host_rewrite_literal.is_some()),
                ("auto_host_rewrite", self.auto_host_rewrite.is_some()),
            ],
            "route",
        )?;

        let cluster_specifier = if let Some(cluster) = &self.cluster {
            Some(ClusterSpecifier::Cluster(cluster.clone()))
        } else if let Some(header) = &self.cluster_header {
            Some(ClusterSpecifier::ClusterHeader(header.clone()))
        } else {
            self.weighted_clusters.as_ref().map(|weighted| {
                ClusterSpecifier::WeightedClusters(WeightedCluster {
                    clusters: weighted
                        .clusters
                        .iter()
                        .map(|entry| ClusterWeight {
                            name: entry.name.clone(),
                            weight: entry.weight.map(|value| UInt32Value { value }),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                })
            })
        };

        let host_rewrite_specifier = if let Some(host) = &self.host_rewrite_literal {
            Some(HostRewriteSpecifier::HostRewriteLiteral(host.clone()))
        } else {
            self.auto_host_rewrite
                .map(|value| HostRewriteSpecifier::AutoHostRewrite(BoolValue { value }))
        };

        Ok(RouteAction {
            cluster_specifier,
            prefix_rewrite: self.prefix_rewrite.clone().unwrap_or_default(),
            host_rewrite_specifier,
            timeout: self.timeout.map(ProtoDuration::to_proto),
            idle_timeout: self.idle_timeout.map(ProtoDuration::to_proto),
            upgrade_configs: self
                .upgrade_configs
                .iter()
                .map(|upgrade| route_action::UpgradeConfig {
                    upgrade_type: upgrade.upgrade_type.clone(),
                    enabled: upgrade.enabled.map(|value| BoolValue { value }),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedirectResponseCodeSpec {
    #[default]
    MovedPermanently,
    Found,
    SeeOther,
    TemporaryRedirect,
    PermanentRedirect,
}

impl RedirectResponseCodeSpec {
    fn to_proto(self) -> RedirectResponseCode {
        match self {
            Self::MovedPermanently => RedirectResponseCode::MovedPermanently,
            Self::Found => RedirectResponseCode::Found,
            Self::SeeOther => RedirectResponseCode::SeeOther,
            Self::TemporaryRedirect => RedirectResponseCode::TemporaryRedirect,
            Self::PermanentRedirect => RedirectResponseCode::PermanentRedirect,
        }
    }
}

/// `RedirectAction` in JSON form.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedirectActionSpec {
    #[serde(default)]
    pub https_redirect: bool,
    #[serde(default)]
    pub scheme_redirect: Option<String>,
    #[serde(default)]
    pub host_redirect: String,
    #[serde(default)]
    pub port_redirect: u32,
    #[serde(default)]
    pub path_redirect: Option<String>,
    #[serde(default)]
    pub prefix_rewrite: Option<String>,
    #[serde(default)]
    pub response_code: RedirectResponseCodeSpec,
    #[serde(default)]
    pub strip_query: bool,
}

impl RedirectActionSpec {
    fn to_proto(&self) -> Result<RedirectAction> {
        one_of(
            &[
                ("https_redirect", self.https_redirect),
                ("scheme_redirect", self.scheme_redirect.is_some()),
            ],
            "redirect",
        )?;
        one_of(
            &[
                ("path_redirect", self.path_redirect.is_some()),
                ("prefix_rewrite", self.prefix_rewrite.is_some()),
            ],
            "redirect",
        )?;

        let scheme_rewrite_specifier = if self.https_redirect {
            Some(SchemeRewriteSpecifier::HttpsRedirect(true))
        } else {
            self.scheme_redirect.clone().map(SchemeRewriteSpecifier::SchemeRedirect)
        };
        let path_rewrite_specifier = if let Some(path) = &self.path_redirect {
            Some(PathRewriteSpecifier::PathRedirect(path.clone()))
        } else {
            self.prefix_rewrite.clone().map(PathRewriteSpecifier::PrefixRewrite)
        };

        Ok(RedirectAction {
            scheme_rewrite_specifier,
            host_redirect: self.host_redirect.clone(),
            port_redirect: self.port_redirect,
            path_rewrite_specifier,
            response_code: self.response_code.to_proto() as i32,
            strip_query: self.strip_query,
            ..Default::default()
        })
    }
}

/// `DirectResponseAction` in JSON form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectResponseSpec {
    pub status: u32,
    #[serde(default)]
    pub body: Option<DataSourceSpec>,
}

impl DirectResponseSpec {
    fn to_proto(&self) -> DirectResponseAction {
        DirectResponseAction {
            status: self.status,
            body: self.body.as_ref().map(DataSourceSpec::to_proto),
            ..Default::default()
        }
    }
}
