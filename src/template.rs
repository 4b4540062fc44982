//! Positional URL templates and query-string serialization.
//!
//! Endpoint URLs carry `{0}`, `{1}`, ... placeholders which are replaced with
//! percent-encoded call arguments. A placeholder whose index has no matching
//! argument is left in place, so a template can be filled in stages.
//!
//! # Example
//!
//! ```rust
//! use apitree::template::format_url;
//!
//! assert_eq!(format_url("/users/{0}/posts/{1}", ["ada", "7"]), "/users/ada/posts/7");
//! assert_eq!(format_url("/users/{0}/posts/{1}", ["ada"]), "/users/ada/posts/{1}");
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};
use serde_json::Value;
use url::Url;

/// Everything except the characters `encodeURIComponent` leaves alone.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}").expect("placeholder pattern is valid"));

/// Substitutes every `{n}` in `template` with the encoded text of `args[n]`.
///
/// Indices past the end of `args` (or too large to address) keep their
/// placeholder unchanged.
pub fn format_url_args(template: &str, args: &[Value]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            match caps[1].parse::<usize>().ok().and_then(|index| args.get(index)) {
                Some(value) => encode_component(&arg_text(value)),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Convenience form of [`format_url_args`] for homogeneous arguments.
pub fn format_url<I, V>(template: &str, args: I) -> String
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let args: Vec<Value> = args.into_iter().map(Into::into).collect();
    format_url_args(template, &args)
}

/// Text of a call argument as it appears in a URL: strings verbatim, anything
/// else as its JSON rendering.
pub fn arg_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT_ENCODE_SET).to_string()
}

/// Writes `query` onto `url` in key order.
///
/// Keys already present in `url` are replaced; unrelated existing pairs keep
/// their position ahead of the new ones.
pub fn append_query(url: &mut Url, query: &BTreeMap<String, String>) {
    if query.is_empty() {
        return;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !query.contains_key(key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    pairs.extend_pairs(kept.iter());
    pairs.extend_pairs(query.iter());
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_substitutes_positional_placeholders() {
        let url = format_url_args("/items/{0}/parts/{1}", &[json!(42), json!("bolt")]);
        assert_eq!(url, "/items/42/parts/bolt");
    }

    #[test]
    fn test_repeated_placeholders_are_all_replaced() {
        assert_eq!(format_url("/{0}/{0}/{1}", ["a", "b"]), "/a/a/b");
    }

    #[test]
    fn test_missing_arguments_leave_placeholder() {
        assert_eq!(format_url("/a/{0}/b/{3}", ["x"]), "/a/x/b/{3}");
        assert_eq!(format_url_args("/a/{0}", &[]), "/a/{0}");
    }

    #[test]
    fn test_oversized_index_is_left_alone() {
        let template = "/a/{99999999999999999999999}";
        assert_eq!(format_url(template, ["x"]), template);
    }

    #[test]
    fn test_only_digit_placeholders_are_templates() {
        assert_eq!(format_url("/a/{id}/{0x}/{ 0 }", ["x"]), "/a/{id}/{0x}/{ 0 }");
    }

    #[test]
    fn test_values_are_component_encoded() {
        assert_eq!(format_url("/q/{0}", ["a b/c?d&e"]), "/q/a%20b%2Fc%3Fd%26e");
        assert_eq!(format_url("/q/{0}", ["-_.!~*'()"]), "/q/-_.!~*'()");
        assert_eq!(format_url("/q/{0}", ["héllo"]), "/q/h%C3%A9llo");
    }

    #[test]
    fn test_non_string_values_use_json_text() {
        let url = format_url_args("/{0}/{1}/{2}/{3}", &[json!(1.5), json!(true), Value::Null, json!(-3)]);
        assert_eq!(url, "/1.5/true/null/-3");
    }

    #[test]
    fn test_append_query_sorts_keys() {
        let mut url = Url::parse("http://example.com/items").unwrap();
        let query = BTreeMap::from([("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())]);
        append_query(&mut url, &query);
        assert_eq!(url.as_str(), "http://example.com/items?a=1&b=2");
    }

    #[test]
    fn test_append_query_overrides_template_keys() {
        let mut url = Url::parse("http://example.com/items?page=1&keep=yes").unwrap();
        let query = BTreeMap::from([("page".to_string(), "3".to_string())]);
        append_query(&mut url, &query);
        assert_eq!(url.as_str(), "http://example.com/items?keep=yes&page=3");
    }

    #[test]
    fn test_empty_query_leaves_url_untouched() {
        let mut url = Url::parse("http://example.com/items").unwrap();
        append_query(&mut url, &BTreeMap::new());
        assert_eq!(url.as_str(), "http://example.com/items");
    }

    proptest! {
        #[test]
        fn test_formatting_is_idempotent(
            segments in prop::collection::vec("[a-z]{1,6}", 1..4),
            args in prop::collection::vec(".{0,12}", 0..6)
        ) {
            let template = segments
                .iter()
                .enumerate()
                .map(|(i, s)| format!("/{s}/{{{i}}}"))
                .collect::<String>();
            let args: Vec<Value> = args.into_iter().map(Value::String).collect();
            let once = format_url_args(&template, &args);
            let twice = format_url_args(&once, &args);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn test_templates_without_placeholders_are_unchanged(template in "[a-z/._-]{0,40}") {
            prop_assert_eq!(format_url(&template, ["x", "y"]), template);
        }

        #[test]
        fn test_query_keys_come_out_sorted(
            pairs in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 1..8)
        ) {
            let mut url = Url::parse("http://example.com/").unwrap();
            append_query(&mut url, &pairs);
            let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(keys, sorted);
        }
    }
}
