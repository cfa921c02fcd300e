//! Shared pieces of the proxy configuration model.

use crate::errors::{EdgeplaneError, Result};
use envoy_types::pb::envoy::config::core::v3::{
    data_source::Specifier, header_value_option::HeaderAppendAction, DataSource, HeaderValue,
    HeaderValueOption,
};
use envoy_types::pb::envoy::r#type::matcher::v3::{
    string_matcher::MatchPattern, RegexMatcher, StringMatcher,
};
use envoy_types::pb::google::protobuf::Duration;
use serde::Deserialize;

/// Protobuf JSON duration such as `"15s"` or `"0.250s"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoDuration {
    pub seconds: i64,
    pub nanos: i32,
}

impl ProtoDuration {
    pub fn parse(value: &str) -> Option<Self> {
        let body = value.strip_suffix('s')?;
        let (whole, fraction) = match body.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (body, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let seconds = whole.parse::<i64>().ok()?;
        let nanos = if fraction.is_empty() {
            0
        } else {
            format!("{:0<9}", fraction).parse::<i32>().ok()?
        };
        Some(Self { seconds, nanos })
    }

    pub fn to_proto(self) -> Duration {
        Duration { seconds: self.seconds, nanos: self.nanos }
    }
}

impl<'de> Deserialize<'de> for ProtoDuration {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ProtoDuration::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", raw)))
    }
}

/// Inline data source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceSpec {
    InlineString(String),
    Filename(String),
}

impl DataSourceSpec {
    pub fn to_proto(&self) -> DataSource {
        let specifier = match self {
            DataSourceSpec::InlineString(value) => Specifier::InlineString(value.clone()),
            DataSourceSpec::Filename(path) => Specifier::Filename(path.clone()),
        };
        DataSource { specifier: Some(specifier), ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderAppendActionSpec {
    #[default]
    AppendIfExistsOrAdd,
    AddIfAbsent,
    OverwriteIfExistsOrAdd,
    OverwriteIfExists,
}

impl HeaderAppendActionSpec {
    fn to_proto(self) -> HeaderAppendAction {
        match self {
            Self::AppendIfExistsOrAdd => HeaderAppendAction::AppendIfExistsOrAdd,
            Self::AddIfAbsent => HeaderAppendAction::AddIfAbsent,
            Self::OverwriteIfExistsOrAdd => HeaderAppendAction::OverwriteIfExistsOrAdd,
            Self::OverwriteIfExists => HeaderAppendAction::OverwriteIfExists,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderValueSpec {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Header added by a virtual host or route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderValueOptionSpec {
    pub header: HeaderValueSpec,
    #[serde(default)]
    pub append_action: HeaderAppendActionSpec,
    #[serde(default)]
    pub keep_empty_value: bool,
}

impl HeaderValueOptionSpec {
    pub fn to_proto(&self) -> HeaderValueOption {
        HeaderValueOption {
            header: Some(HeaderValue {
                key: self.header.key.clone(),
                value: self.header.value.clone(),
                ..Default::default()
            }),
            append_action: self.append_action.to_proto() as i32,
            keep_empty_value: self.keep_empty_value,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexSpec {
    pub regex: String,
}

impl RegexSpec {
    pub fn to_proto(&self) -> RegexMatcher {
        RegexMatcher { regex: self.regex.clone(), ..Default::default() }
    }
}

/// Rejects a oneof group with more than one member set.
pub(crate) fn one_of(members: &[(&str, bool)], field: &str) -> Result<()> {
    let set: Vec<&str> = members.iter().filter(|(_, set)| *set).map(|(name, _)| *name).collect();
    if set.len() > 1 {
        return Err(EdgeplaneError::validation_field(
            format!("only one of {} may be set", set.join(", ")),
            field,
        ));
    }
    Ok(())
}

/// String matcher with exactly one pattern set.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringMatcherSpec {
    #[serde(default)]
    pub exact: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub contains: Option<String>,
    #[serde(default)]
    pub safe_regex: Option<RegexSpec>,
    #[serde(default)]
    pub ignore_case: bool,
}

impl StringMatcherSpec {
    pub fn to_proto(&self) -> Result<StringMatcher> {
        one_of(
            &[
                ("exact", self.exact.is_some()),
                ("prefix", self.prefix.is_some()),
                ("suffix", self.suffix.is_some()),
                ("contains", self.contains.is_some()),
                ("safe_regex", self.safe_regex.is_some()),
            ],
            "string_match",
        )?;

        let match_pattern = if let Some(exact) = &self.exact {
            Some(MatchPattern::Exact(exact.clone()))
        } else if let Some(prefix) = &self.prefix {
            Some(MatchPattern::Prefix(prefix.clone()))
        } else if let Some(suffix) = &self.suffix {
            Some(MatchPattern::Suffix(suffix.clone()))
        } else if let Some(contains) = &self.contains {
            Some(MatchPattern::Contains(contains.clone()))
        } else {
            self.safe_regex.as_ref().map(|r| MatchPattern::SafeRegex(r.to_proto()))
        };
        Ok(StringMatcher { match_pattern, ignore_case: self.ignore_case })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_protobuf_durations() {
        assert_eq!(ProtoDuration::parse("15s"), Some(ProtoDuration { seconds: 15, nanos: 0 }));
        assert_eq!(
            ProtoDuration::parse("0.250s"),
            Some(ProtoDuration { seconds: 0, nanos: 250_000_000 })
        );
        assert_eq!(ProtoDuration::parse("15"), None);
        assert_eq!(ProtoDuration::parse("-1s"), None);
        assert_eq!(ProtoDuration::parse("1.0000000001s"), None);
    }

    #[test]
    fn string_matcher_takes_one_pattern() {
        let spec: StringMatcherSpec =
            serde_json::from_value(serde_json::json!({ "exact": "a", "suffix": "b" })).unwrap();
        let err = spec.to_proto().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Validation);
        assert!(err.to_string().contains("exact, suffix"));

        let spec: StringMatcherSpec =
            serde_json::from_value(serde_json::json!({ "prefix": "/api", "ignore_case": true }))
                .unwrap();
        let matcher = spec.to_proto().unwrap();
        assert_eq!(matcher.match_pattern, Some(MatchPattern::Prefix("/api".into())));
        assert!(matcher.ignore_case);
    }

    #[test]
    fn header_option_defaults_to_append() {
        let spec: HeaderValueOptionSpec = serde_json::from_value(serde_json::json!({
            "header": { "key": "x-edge", "value": "1" }
        }))
        .unwrap();
        let proto = spec.to_proto();
        assert_eq!(proto.append_action, HeaderAppendAction::AppendIfExistsOrAdd as i32);
        assert_eq!(proto.header.unwrap().key, "x-edge");
    }
}
