//! Terminal rendering of the request/response exchange
//!
//! Heads are rebuilt from the typed request and response parts rather than
//! re-parsed from wire text. Bodies are decoded by charset, pretty-printed
//! when they are JSON, and replaced with a short note when they are binary
//! and the output is a terminal.

use std::io::Write;

use bytes::Bytes;
use chardetng::EncodingDetector;
use content_inspector::{inspect, ContentType};
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Version};
use serde_json::Value as JsonValue;
use url::Url;

use crate::cli::print::PrintFlags;
use crate::context::Environment;
use crate::errors::Result;
use crate::executor::AttemptOutcome;
use crate::output::terminal::{self, colors, RESET};
use crate::request::template::RequestTemplate;

pub fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP",
    }
}

/// `GET /path?query HTTP/1.1` plus header lines.
pub fn format_request_head(
    method: &Method,
    url: &Url,
    version: Version,
    headers: &HeaderMap,
    color: bool,
) -> String {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut out = String::new();
    if color {
        out.push_str(&format!(
            "{}{}{} {}{}{} {}{}{}\n",
            terminal::http_method(method.as_str()),
            method,
            RESET,
            terminal::bold_fg(colors::WHITE),
            target,
            RESET,
            terminal::fg(colors::GREY),
            version_str(version),
            RESET,
        ));
    } else {
        out.push_str(&format!("{} {} {}\n", method, target, version_str(version)));
    }
    push_headers(&mut out, headers, color);
    out
}

/// `HTTP/1.1 200 OK` plus header lines.
pub fn format_response_head(
    status: StatusCode,
    version: Version,
    headers: &HeaderMap,
    color: bool,
) -> String {
    let reason = status.canonical_reason().unwrap_or("");
    let mut out = String::new();
    if color {
        out.push_str(&format!(
            "{}{}{} {}{} {}{}\n",
            terminal::fg(colors::GREY),
            version_str(version),
            RESET,
            terminal::http_status(status.as_u16()),
            status.as_u16(),
            reason,
            RESET,
        ));
    } else {
        out.push_str(&format!(
            "{} {} {}\n",
            version_str(version),
            status.as_u16(),
            reason
        ));
    }
    push_headers(&mut out, headers, color);
    out
}

fn push_headers(out: &mut String, headers: &HeaderMap, color: bool) {
    for (name, value) in headers {
        let value = value.to_str().unwrap_or("<opaque bytes>");
        if color {
            out.push_str(&format!(
                "{}: {}\n",
                terminal::key(name.as_str()),
                terminal::colorize(value, colors::AQUA)
            ));
        } else {
            out.push_str(&format!("{}: {}\n", name, value));
        }
    }
}

/// Decode and render a body for the terminal.
pub fn format_body(body: &[u8], headers: &HeaderMap, color: bool) -> String {
    if body.is_empty() {
        return String::new();
    }
    if is_binary(body) {
        let note = format!(
            "[binary data, {}]",
            crate::utils::format_bytes(body.len() as u64, 2)
        );
        return if color {
            format!("{}\n", terminal::muted(&note))
        } else {
            format!("{}\n", note)
        };
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.contains("json") {
        if let Ok(value) = serde_json::from_slice::<JsonValue>(body) {
            let mut out = String::new();
            write_json(&mut out, &value, 0, color);
            out.push('\n');
            return out;
        }
    }

    let mut text = decode_text(body, content_type).into_owned();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

pub fn is_binary(data: &[u8]) -> bool {
    matches!(inspect(data), ContentType::BINARY)
}

/// Decode by declared charset, falling back to detection.
fn decode_text<'a>(body: &'a [u8], content_type: &str) -> std::borrow::Cow<'a, str> {
    let declared = content_type
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .next()
        .and_then(|label| Encoding::for_label(label.trim_matches('"').as_bytes()));

    let encoding = declared.unwrap_or_else(|| {
        let mut detector = EncodingDetector::new();
        detector.feed(body, true);
        detector.guess(None, true)
    });

    if encoding == UTF_8 {
        String::from_utf8_lossy(body)
    } else {
        let (text, _, _) = encoding.decode(body);
        std::borrow::Cow::Owned(text.into_owned())
    }
}

/// Two-space-indented JSON with colored keys and values. Object order is as
/// the server sent it.
fn write_json(out: &mut String, value: &JsonValue, depth: usize, color: bool) {
    let indent = "  ".repeat(depth);
    let inner = "  ".repeat(depth + 1);
    match value {
        JsonValue::Object(map) if map.is_empty() => out.push_str("{}"),
        JsonValue::Object(map) => {
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                let quoted = serde_json::to_string(key).unwrap_or_else(|_| format!("{:?}", key));
                if color {
                    out.push_str(&format!("{}{}: ", inner, terminal::key(&quoted)));
                } else {
                    out.push_str(&format!("{}{}: ", inner, quoted));
                }
                write_json(out, item, depth + 1, color);
                if i + 1 < map.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&indent);
            out.push('}');
        }
        JsonValue::Array(items) if items.is_empty() => out.push_str("[]"),
        JsonValue::Array(items) => {
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                out.push_str(&inner);
                write_json(out, item, depth + 1, color);
                if i + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&indent);
            out.push(']');
        }
        JsonValue::String(_) => {
            let quoted = value.to_string();
            if color {
                out.push_str(&terminal::colorize(&quoted, colors::GREEN));
            } else {
                out.push_str(&quoted);
            }
        }
        JsonValue::Number(n) => {
            if color {
                out.push_str(&terminal::number(&n.to_string()));
            } else {
                out.push_str(&n.to_string());
            }
        }
        JsonValue::Bool(_) | JsonValue::Null => {
            if color {
                out.push_str(&terminal::colorize(&value.to_string(), colors::ORANGE));
            } else {
                out.push_str(&value.to_string());
            }
        }
    }
}

/// Print the exchange to stdout per the selection flags. A piped stdout gets
/// the body raw so `rurl url > file` round-trips bytes.
pub fn print_exchange(
    template: &RequestTemplate,
    request_body: Option<&Bytes>,
    outcome: &AttemptOutcome,
    flags: PrintFlags,
    env: &Environment,
) -> Result<()> {
    let color = env.color_enabled();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if flags.contains(PrintFlags::REQUEST_HEADERS) {
        out.write_all(
            format_request_head(
                &template.method,
                &template.url,
                outcome.version,
                &template.headers,
                color,
            )
            .as_bytes(),
        )?;
        out.write_all(b"\n")?;
    }
    if flags.contains(PrintFlags::REQUEST_BODY) {
        if let Some(body) = request_body {
            out.write_all(format_body(body, &template.headers, color).as_bytes())?;
            out.write_all(b"\n")?;
        }
    }
    if flags.contains(PrintFlags::RESPONSE_HEADERS) {
        out.write_all(
            format_response_head(outcome.status, outcome.version, &outcome.headers, color)
                .as_bytes(),
        )?;
        out.write_all(b"\n")?;
    }
    if flags.contains(PrintFlags::RESPONSE_BODY) {
        if let Some(body) = &outcome.body {
            if env.stdout_isatty {
                out.write_all(format_body(body, &outcome.headers, color).as_bytes())?;
            } else {
                out.write_all(body)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// One closing line for a finished download.
pub fn print_download_note(outcome: &AttemptOutcome, env: &Environment) {
    if let Some((path, written)) = &outcome.saved {
        let note = format!(
            "saved {} to {}",
            crate::utils::format_bytes(*written, 2),
            path.display()
        );
        if env.color_enabled() {
            eprintln!("{}", terminal::success(&note));
        } else {
            eprintln!("{}", note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                reqwest::header::HeaderName::try_from(*name).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_response_head_plain() {
        let head = format_response_head(
            StatusCode::NOT_FOUND,
            Version::HTTP_11,
            &headers(&[("content-type", "text/plain")]),
            false,
        );
        assert!(head.starts_with("HTTP/1.1 404 Not Found\n"));
        assert!(head.contains("content-type: text/plain\n"));
        assert!(!head.contains('\x1b'));
    }

    #[test]
    fn test_request_head_includes_query() {
        let url = Url::parse("http://example.com/search?q=rust").unwrap();
        let head =
            format_request_head(&Method::GET, &url, Version::HTTP_11, &HeaderMap::new(), false);
        assert!(head.starts_with("GET /search?q=rust HTTP/1.1\n"));
    }

    #[test]
    fn test_json_body_pretty_printed() {
        let body = br#"{"name":"rurl","tags":["fast",1],"ok":true}"#;
        let out = format_body(body, &headers(&[("content-type", "application/json")]), false);
        assert!(out.contains("\"name\": \"rurl\""));
        assert!(out.contains("\"tags\": [\n"));
        assert!(out.contains("true"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_json_key_order_preserved() {
        let body = br#"{"zebra":1,"apple":2}"#;
        let out = format_body(body, &headers(&[("content-type", "application/json")]), false);
        let zebra = out.find("zebra").unwrap();
        let apple = out.find("apple").unwrap();
        assert!(zebra < apple);
    }

    #[test]
    fn test_binary_body_becomes_note() {
        let body = [0u8, 159, 146, 150, 0, 1, 2];
        let out = format_body(&body, &HeaderMap::new(), false);
        assert!(out.contains("[binary data,"));
    }

    #[test]
    fn test_invalid_json_falls_back_to_text() {
        let body = b"not json at all";
        let out = format_body(body, &headers(&[("content-type", "application/json")]), false);
        assert_eq!(out, "not json at all\n");
    }

    #[test]
    fn test_latin1_body_decoded_by_charset_param() {
        // "café" in ISO-8859-1
        let body = [0x63, 0x61, 0x66, 0xE9];
        let out = format_body(
            &body,
            &headers(&[("content-type", "text/plain; charset=iso-8859-1")]),
            false,
        );
        assert_eq!(out, "café\n");
    }

    #[test]
    fn test_colored_json_keys() {
        let body = br#"{"k":"v"}"#;
        let out = format_body(body, &headers(&[("content-type", "application/json")]), true);
        assert!(out.contains('\x1b'));
        assert!(out.contains("\"k\""));
    }
}
