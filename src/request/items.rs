//! Request item grammar
//!
//! Positional arguments after the URL modify the request: `Name:Value` adds
//! a header, `name==value` a query parameter, `key=value` a data field and
//! `key:=json` a raw JSON field. Longest separator wins at a given position,
//! so `a==b` is a query parameter and `a:=1` is JSON, not a header.

use serde_json::Value as JsonValue;

use crate::errors::{Result, RurlError};

/// A parsed CLI request item
#[derive(Debug, Clone)]
pub enum InputItem {
    /// HTTP header: "Name:Value"
    Header { name: String, value: String },

    /// Header sent with an empty value: "Name;"
    EmptyHeader { name: String },

    /// URL query parameter: "name==value"
    QueryParam { name: String, value: String },

    /// Data field: "key=value"; a JSON string in JSON mode, a form field in
    /// form mode
    DataField { key: String, value: String },

    /// JSON field with parsed value: "key:=value" (number, bool, object,
    /// array, null)
    JsonField { key: String, value: JsonValue },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeparatorKind {
    Header,
    QueryParam,
    DataField,
    JsonField,
}

/// Candidate separators; at a shared position the longer one wins.
const SEPARATORS: &[(&str, SeparatorKind)] = &[
    (":=", SeparatorKind::JsonField),
    ("==", SeparatorKind::QueryParam),
    (":", SeparatorKind::Header),
    ("=", SeparatorKind::DataField),
];

impl InputItem {
    /// Parse a CLI argument string into an InputItem
    pub fn parse(input: &str) -> Result<Self> {
        // "Name;" is an empty header as long as no other separator is around
        if let Some(name) = input.strip_suffix(';') {
            if !name.is_empty() && !name.contains([':', '=', ';']) {
                return Ok(InputItem::EmptyHeader {
                    name: name.to_string(),
                });
            }
        }

        let mut best: Option<(usize, &str, SeparatorKind)> = None;
        for (sep, kind) in SEPARATORS {
            if let Some(pos) = input.find(sep) {
                let better = match best {
                    None => true,
                    Some((best_pos, best_sep, _)) => {
                        pos < best_pos || (pos == best_pos && sep.len() > best_sep.len())
                    }
                };
                if better {
                    best = Some((pos, sep, *kind));
                }
            }
        }

        let (pos, sep, kind) = best.ok_or_else(|| {
            RurlError::Parse(format!(
                "invalid request item {:?}: no separator found, want Name:Value, \
                 name==value, key=value or key:=json",
                input
            ))
        })?;

        let key = &input[..pos];
        let value = &input[pos + sep.len()..];
        if key.is_empty() {
            return Err(RurlError::Parse(format!(
                "invalid request item {:?}: empty key",
                input
            )));
        }

        match kind {
            SeparatorKind::Header => Ok(InputItem::Header {
                name: key.to_string(),
                value: value.to_string(),
            }),
            SeparatorKind::QueryParam => Ok(InputItem::QueryParam {
                name: key.to_string(),
                value: value.to_string(),
            }),
            SeparatorKind::DataField => Ok(InputItem::DataField {
                key: key.to_string(),
                value: value.to_string(),
            }),
            SeparatorKind::JsonField => {
                let json_value = serde_json::from_str(value).map_err(|e| {
                    RurlError::Parse(format!("invalid JSON in {:?}: {}", input, e))
                })?;
                Ok(InputItem::JsonField {
                    key: key.to_string(),
                    value: json_value,
                })
            }
        }
    }

    /// Whether this item contributes request data (and so implies POST)
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            InputItem::DataField { .. } | InputItem::JsonField { .. }
        )
    }

    pub fn is_header(&self) -> bool {
        matches!(
            self,
            InputItem::Header { .. } | InputItem::EmptyHeader { .. }
        )
    }

    pub fn is_query(&self) -> bool {
        matches!(self, InputItem::QueryParam { .. })
    }
}
