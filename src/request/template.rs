//! The immutable request template
//!
//! Everything about a run's request that holds still across attempts:
//! method, target URL, headers, query and the body source. Built once from
//! the processed arguments, then shared read-only by every worker. Per-attempt
//! material (a line from a `@file:line` body, the attempt-counter header) is
//! derived from it without mutation.

use std::io::Read;
use std::io::Write;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value as JsonValue;
use url::Url;

use crate::cli::args::Args;
use crate::cli::process::ProcessedArgs;
use crate::context::Environment;
use crate::errors::{Result, RurlError};
use crate::request::items::InputItem;
use crate::request::method;

/// Where attempt bodies come from.
#[derive(Debug, Clone)]
pub enum BodySource {
    Empty,
    /// One fixed payload reused by every attempt.
    Fixed(Bytes),
    /// One line per attempt; running out ends the run quietly.
    Lines(Arc<Vec<String>>),
}

#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: BodySource,
    /// Lines-mode bodies are compressed per attempt; fixed bodies were
    /// compressed at build time.
    gzip_lines: bool,
}

impl RequestTemplate {
    /// Build one template per target URL. Body bytes and line files are
    /// shared, not copied.
    pub fn build_all(
        args: &Args,
        processed: &ProcessedArgs,
        env: &Environment,
    ) -> Result<Vec<RequestTemplate>> {
        let mut headers = HeaderMap::new();
        let mut query: Vec<(String, String)> = Vec::new();
        let mut json_fields: serde_json::Map<String, JsonValue> = serde_json::Map::new();
        let mut form_fields: Vec<(String, String)> = Vec::new();

        for item in &processed.items {
            match item {
                InputItem::Header { name, value } => {
                    append_header(&mut headers, name, value)?;
                }
                InputItem::EmptyHeader { name } => {
                    append_header(&mut headers, name, "")?;
                }
                InputItem::QueryParam { name, value } => {
                    query.push((name.clone(), value.clone()));
                }
                InputItem::DataField { key, value } => {
                    if args.form {
                        form_fields.push((key.clone(), value.clone()));
                    } else {
                        json_fields.insert(key.clone(), JsonValue::String(value.clone()));
                    }
                }
                InputItem::JsonField { key, value } => {
                    if args.form {
                        return Err(RurlError::Config(format!(
                            "raw JSON field {:?} cannot be sent as a form",
                            key
                        )));
                    }
                    json_fields.insert(key.clone(), value.clone());
                }
            }
        }

        // Body precedence: --body beats data items beats piped stdin.
        let mut content_type: Option<&'static str> = None;
        let body = if let Some(raw) = &args.body {
            let body = body_from_flag(raw)?;
            content_type = match &body {
                BodySource::Fixed(bytes) if looks_like_json(bytes) => Some("application/json"),
                BodySource::Lines(lines) if lines.first().is_some_and(|l| looks_like_json(l.as_bytes())) => {
                    Some("application/json")
                }
                BodySource::Empty => None,
                _ => Some("text/plain; charset=utf-8"),
            };
            body
        } else if !json_fields.is_empty() {
            content_type = Some("application/json");
            let payload = serde_json::to_vec(&JsonValue::Object(json_fields))?;
            BodySource::Fixed(Bytes::from(payload))
        } else if !form_fields.is_empty() {
            content_type = Some("application/x-www-form-urlencoded");
            let payload = serde_urlencoded::to_string(&form_fields)
                .map_err(|e| RurlError::Parse(format!("form encoding failed: {}", e)))?;
            BodySource::Fixed(Bytes::from(payload.into_bytes()))
        } else if env.stdin_redirected() && !args.ignore_stdin {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            if buf.is_empty() {
                BodySource::Empty
            } else {
                content_type = if looks_like_json(&buf) {
                    Some("application/json")
                } else {
                    Some("text/plain; charset=utf-8")
                };
                BodySource::Fixed(Bytes::from(buf))
            }
        } else {
            BodySource::Empty
        };

        let has_body = !matches!(body, BodySource::Empty);

        // Gzip fixed payloads once; lines get compressed per attempt.
        let mut gzip_lines = false;
        let body = if args.gzip && has_body {
            headers.insert(
                reqwest::header::CONTENT_ENCODING,
                HeaderValue::from_static("gzip"),
            );
            match body {
                BodySource::Fixed(bytes) => BodySource::Fixed(gzip_bytes(&bytes)?),
                other => {
                    gzip_lines = true;
                    other
                }
            }
        } else {
            body
        };

        if let Some(ct) = content_type {
            if !headers.contains_key(reqwest::header::CONTENT_TYPE) {
                headers.insert(reqwest::header::CONTENT_TYPE, HeaderValue::from_static(ct));
            }
        }
        if !headers.contains_key(reqwest::header::ACCEPT) && !args.form {
            headers.insert(
                reqwest::header::ACCEPT,
                HeaderValue::from_static("application/json, */*"),
            );
        }
        if !headers.contains_key(reqwest::header::USER_AGENT) {
            headers.insert(
                reqwest::header::USER_AGENT,
                HeaderValue::from_static(concat!("rurl/", env!("CARGO_PKG_VERSION"))),
            );
        }
        if let Some(auth) = &args.auth {
            if !headers.contains_key(reqwest::header::AUTHORIZATION) {
                let credentials = match auth.as_str().split_once(':') {
                    Some(_) => auth.as_str().to_string(),
                    None => format!("{}:", auth.as_str()),
                };
                let value = format!("Basic {}", BASE64.encode(credentials));
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    HeaderValue::from_str(&value)
                        .map_err(|e| RurlError::Parse(format!("invalid auth value: {}", e)))?,
                );
            }
        }

        let method = match &processed.method {
            Some(m) => Method::from_bytes(m.as_bytes())
                .map_err(|e| RurlError::Parse(format!("invalid method {:?}: {}", m, e)))?,
            None => method::infer(has_body),
        };

        Ok(processed
            .urls
            .iter()
            .map(|url| RequestTemplate {
                method: method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                query: query.clone(),
                body: body.clone(),
                gzip_lines,
            })
            .collect())
    }

    pub fn has_body(&self) -> bool {
        !matches!(self.body, BodySource::Empty)
    }

    /// Body for the 1-based attempt number. Lines mode hands out one line
    /// per attempt and signals exhaustion with `BodyExhausted`.
    pub fn body_for_attempt(&self, attempt: u64) -> Result<Option<Bytes>> {
        match &self.body {
            BodySource::Empty => Ok(None),
            BodySource::Fixed(bytes) => Ok(Some(bytes.clone())),
            BodySource::Lines(lines) => {
                let idx = attempt.saturating_sub(1) as usize;
                let line = lines.get(idx).ok_or(RurlError::BodyExhausted)?;
                let bytes = Bytes::from(line.clone().into_bytes());
                if self.gzip_lines {
                    Ok(Some(gzip_bytes(&bytes)?))
                } else {
                    Ok(Some(bytes))
                }
            }
        }
    }
}

fn append_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let header_name = HeaderName::try_from(name)
        .map_err(|e| RurlError::Parse(format!("invalid header name {:?}: {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| RurlError::Parse(format!("invalid header value {:?}: {}", value, e)))?;
    headers.append(header_name, header_value);
    Ok(())
}

/// `--body` grammar: a literal string, `@file` for the whole file, or
/// `@file:line` to send the file one line per attempt.
fn body_from_flag(raw: &str) -> Result<BodySource> {
    let Some(rest) = raw.strip_prefix('@') else {
        return Ok(BodySource::Fixed(Bytes::copy_from_slice(raw.as_bytes())));
    };
    if let Some((path, mode)) = rest.rsplit_once(':') {
        if mode == "line" {
            let text = std::fs::read_to_string(path).map_err(|e| {
                RurlError::File(format!("cannot read body file {:?}: {}", path, e))
            })?;
            let lines: Vec<String> = text
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect();
            return Ok(BodySource::Lines(Arc::new(lines)));
        }
    }
    let bytes = std::fs::read(rest)
        .map_err(|e| RurlError::File(format!("cannot read body file {:?}: {}", rest, e)))?;
    Ok(BodySource::Fixed(Bytes::from(bytes)))
}

fn looks_like_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes).is_ok()
}

fn gzip_bytes(data: &[u8]) -> Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(Bytes::from(encoder.finish()?))
}
