//! ASCII normalisation of generated text.
//!
//! Practice management systems downstream choke on typographic punctuation, so model output is
//! folded to ASCII before it is returned or recorded.

use serde_json::{Map, Value};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2013}', "-"),    // en dash
    ('\u{2014}', "--"),   // em dash
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201c}', "\""),
    ('\u{201d}', "\""),
    ('\u{2026}', "..."),
    ('\u{00a0}', " "),
    ('\u{2022}', "*"),
    ('\u{00b0}', " deg"),
];

/// Replaces common typographic characters with ASCII and strips accents.
///
/// Characters with no ASCII decomposition (for example CJK text) pass through unchanged.
pub fn normalize_to_ascii(text: &str) -> String {
    let mut replaced = String::with_capacity(text.len());
    for c in text.chars() {
        match REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => replaced.push_str(to),
            None => replaced.push(c),
        }
    }
    replaced.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Normalises every top-level string, and every string inside top-level arrays, of an output
/// object. Other values are left as they are.
pub fn normalize_output(output: Map<String, Value>) -> Map<String, Value> {
    output
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => Value::String(normalize_to_ascii(&s)),
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => Value::String(normalize_to_ascii(&s)),
                            other => other,
                        })
                        .collect(),
                ),
                other => other,
            };
            (key, value)
        })
        .collect()
}
