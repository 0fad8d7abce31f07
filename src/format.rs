//! Format system
//!
//! A format is a named string validator. Dialects carry the standard set;
//! a context may add or override formats, and context entries win. Whether
//! `format` asserts or merely annotates is decided by the dialect and the
//! context validation mode (see the `format` keyword).

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

/// Outcome of a format check: `Err` carries the parser's message.
pub type FormatResult = std::result::Result<(), String>;

/// A named string validator.
#[derive(Clone)]
pub struct Format {
    name: String,
    check: Arc<dyn Fn(&str) -> FormatResult + Send + Sync>,
}

impl Format {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&str) -> FormatResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, input: &str) -> FormatResult {
        (self.check)(input)
    }
}

impl std::fmt::Debug for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Format").field("name", &self.name).finish()
    }
}

/// The standard format set shipped with every built-in dialect.
pub fn standard_formats() -> HashMap<String, Format> {
    let mut map = HashMap::new();
    let mut add = |name: &str, check: fn(&str) -> FormatResult| {
        map.insert(name.to_string(), Format::new(name, check));
    };
    add("date-time", check_date_time);
    add("date", check_date);
    add("time", check_time);
    add("duration", check_duration);
    add("email", check_email);
    add("idn-email", check_idn_email);
    add("hostname", check_hostname);
    add("idn-hostname", check_idn_hostname);
    add("ipv4", check_ipv4);
    add("ipv6", check_ipv6);
    add("uri", check_uri);
    add("uri-reference", check_uri_reference);
    add("iri", check_uri);
    add("iri-reference", check_uri_reference);
    add("uuid", check_uuid);
    add("uri-template", check_uri_template);
    add("json-pointer", check_json_pointer);
    add("relative-json-pointer", check_relative_json_pointer);
    add("regex", check_regex);
    map
}

fn check_date_time(input: &str) -> FormatResult {
    DateTime::parse_from_rfc3339(input)
        .map(|_| ())
        .map_err(|e| format!("not an RFC 3339 date-time: {e}"))
}

fn check_date(input: &str) -> FormatResult {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    let shape = SHAPE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid pattern"));
    if !shape.is_match(input) {
        return Err("not a full-date".to_string());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|e| format!("not a full-date: {e}"))
}

fn check_time(input: &str) -> FormatResult {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    let shape = SHAPE.get_or_init(|| {
        Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(?:\.\d+)?(?:[zZ]|([+-])(\d{2}):(\d{2}))$")
            .expect("valid pattern")
    });
    let caps = shape.captures(input).ok_or("not a full-time")?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str().parse::<u32>().unwrap_or(99));
    let (hour, minute, second) = (field(1).unwrap_or(99), field(2).unwrap_or(99), field(3).unwrap_or(99));
    // 60 seconds allowed for leap seconds
    if hour > 23 || minute > 59 || second > 60 {
        return Err("time component out of range".to_string());
    }
    if let (Some(oh), Some(om)) = (field(5), field(6)) {
        if oh > 23 || om > 59 {
            return Err("offset out of range".to_string());
        }
    }
    Ok(())
}

fn check_duration(input: &str) -> FormatResult {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    let shape = SHAPE.get_or_init(|| {
        Regex::new(r"^P(?:\d+W|(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?)$")
            .expect("valid pattern")
    });
    if !shape.is_match(input) || input == "P" || input.ends_with('T') {
        return Err("not an ISO 8601 duration".to_string());
    }
    Ok(())
}

fn check_email(input: &str) -> FormatResult {
    let (local, domain) = input.rsplit_once('@').ok_or("missing @")?;
    if local.is_empty() || domain.is_empty() {
        return Err("empty local part or domain".to_string());
    }
    if local.starts_with('"') && local.ends_with('"') && local.len() >= 2 {
        // quoted local parts are accepted wholesale
    } else {
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            return Err("misplaced dot in local part".to_string());
        }
        let atext = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c);
        if !local.chars().all(atext) {
            return Err("invalid character in local part".to_string());
        }
    }
    if let Some(literal) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        let literal = literal.strip_prefix("IPv6:").unwrap_or(literal);
        if literal.parse::<Ipv6Addr>().is_ok() || literal.parse::<Ipv4Addr>().is_ok() {
            return Ok(());
        }
        return Err("invalid address literal".to_string());
    }
    check_hostname(domain).map_err(|e| format!("invalid domain: {e}"))
}

fn check_idn_email(input: &str) -> FormatResult {
    let (local, domain) = input.rsplit_once('@').ok_or("missing @")?;
    if local.is_empty() || domain.is_empty() {
        return Err("empty local part or domain".to_string());
    }
    check_idn_hostname(domain).map_err(|e| format!("invalid domain: {e}"))
}

fn check_hostname(input: &str) -> FormatResult {
    if input.is_empty() || input.len() > 253 {
        return Err("hostname length out of range".to_string());
    }
    for label in input.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err("label length out of range".to_string());
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err("label starts or ends with a hyphen".to_string());
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("invalid character in label".to_string());
        }
    }
    Ok(())
}

fn check_idn_hostname(input: &str) -> FormatResult {
    if input.is_empty() {
        return Err("empty hostname".to_string());
    }
    for label in input.split('.') {
        if label.is_empty() {
            return Err("empty label".to_string());
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err("label starts or ends with a hyphen".to_string());
        }
        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err("invalid character in label".to_string());
        }
    }
    Ok(())
}

fn check_ipv4(input: &str) -> FormatResult {
    input
        .parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|e| format!("not an IPv4 address: {e}"))
}

fn check_ipv6(input: &str) -> FormatResult {
    input
        .parse::<Ipv6Addr>()
        .map(|_| ())
        .map_err(|e| format!("not an IPv6 address: {e}"))
}

fn check_uri(input: &str) -> FormatResult {
    Url::parse(input)
        .map(|_| ())
        .map_err(|e| format!("not an absolute URI: {e}"))
}

fn check_uri_reference(input: &str) -> FormatResult {
    if Url::parse(input).is_ok() {
        return Ok(());
    }
    static BASE: OnceLock<Url> = OnceLock::new();
    let base = BASE.get_or_init(|| Url::parse("thismessage:/").expect("valid base"));
    Url::options()
        .base_url(Some(base))
        .parse(input)
        .map(|_| ())
        .map_err(|e| format!("not a URI reference: {e}"))
}

fn check_uuid(input: &str) -> FormatResult {
    // Uuid::parse_str also accepts urn and braced forms; the format is the
    // plain hyphenated one.
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    let shape = SHAPE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .expect("valid pattern")
    });
    if !shape.is_match(input) {
        return Err("not a hyphenated UUID".to_string());
    }
    Uuid::parse_str(input)
        .map(|_| ())
        .map_err(|e| format!("not a UUID: {e}"))
}

fn check_uri_template(input: &str) -> FormatResult {
    let mut rest = input;
    while let Some(open) = rest.find('{') {
        let (literal, tail) = rest.split_at(open);
        if literal.contains('}') {
            return Err("unbalanced braces".to_string());
        }
        let close = tail.find('}').ok_or("unterminated expression")?;
        let expression = &tail[1..close];
        if expression.is_empty() || expression.contains('{') {
            return Err("malformed expression".to_string());
        }
        rest = &tail[close + 1..];
    }
    if rest.contains('}') {
        return Err("unbalanced braces".to_string());
    }
    Ok(())
}

fn check_json_pointer(input: &str) -> FormatResult {
    if input.is_empty() {
        return Ok(());
    }
    if !input.starts_with('/') {
        return Err("pointer must start with '/'".to_string());
    }
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.peek(), Some('0') | Some('1')) {
            return Err("'~' must be followed by 0 or 1".to_string());
        }
    }
    Ok(())
}

fn check_relative_json_pointer(input: &str) -> FormatResult {
    let digits: String = input.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err("missing leading offset".to_string());
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err("offset has a leading zero".to_string());
    }
    let rest = &input[digits.len()..];
    if rest == "#" {
        return Ok(());
    }
    check_json_pointer(rest)
}

fn check_regex(input: &str) -> FormatResult {
    Regex::new(input)
        .map(|_| ())
        .map_err(|e| format!("not a valid regular expression: {e}"))
}

/// Format lookup order: context additions first, then the dialect's set.
pub(crate) fn compose<'a>(
    context_formats: &'a HashMap<String, Format>,
    dialect_formats: &'a HashMap<String, Format>,
    name: &str,
) -> Option<&'a Format> {
    context_formats.get(name).or_else(|| dialect_formats.get(name))
}

/// Helper used by the `format` keyword: check a value that may not be a
/// string. Non-strings are outside the format's domain and always pass.
pub(crate) fn check_instance(format: &Format, instance: &Value) -> FormatResult {
    match instance.as_str() {
        Some(s) => format.check(s),
        None => Ok(()),
    }
}
