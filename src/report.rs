//! JSON rendering of check results.
//!
//! The output is small and flat enough that the serializer is written by
//! hand, keeping the dependency surface down.

use crate::equiv::{Counterexample, EquivalenceResult, Verdict};

fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn int_map_json(map: impl Iterator<Item = (String, String)>) -> String {
    let entries: Vec<String> = map
        .map(|(key, value)| format!("\"{}\": {}", escape_json(&key), value))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

fn side_json(
    outputs: &std::collections::BTreeMap<String, Option<i64>>,
    ok: &Option<bool>,
) -> String {
    let outputs = int_map_json(outputs.iter().map(|(name, value)| {
        let rendered = match value {
            Some(n) => n.to_string(),
            None => "null".to_string(),
        };
        (name.clone(), rendered)
    }));
    let assertions = match ok {
        Some(true) => "\"hold\"",
        Some(false) => "\"violated\"",
        None => "\"undefined\"",
    };
    format!("{{\"outputs\": {}, \"assertions\": {}}}", outputs, assertions)
}

fn counterexample_json(cex: &Counterexample) -> String {
    let inputs = int_map_json(
        cex.inputs
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string())),
    );
    format!(
        "{{\"inputs\": {}, \"program_a\": {}, \"program_b\": {}}}",
        inputs,
        side_json(&cex.outputs_a, &cex.ok_a),
        side_json(&cex.outputs_b, &cex.ok_b)
    )
}

/// Render a result as a single JSON object.
pub fn json_report(result: &EquivalenceResult) -> String {
    let outputs: Vec<String> = result
        .outputs
        .iter()
        .map(|name| format!("\"{}\"", escape_json(name)))
        .collect();

    let mut fields = vec![
        format!("\"verdict\": \"{}\"", result.verdict),
        format!("\"method\": \"{}\"", escape_json(&result.method)),
        format!("\"bound\": {}", result.bound),
        format!("\"outputs\": [{}]", outputs.join(", ")),
    ];

    match &result.verdict {
        Verdict::Equivalent => {}
        Verdict::NotEquivalent(cex) => {
            fields.push(format!("\"counterexample\": {}", counterexample_json(cex)));
        }
        Verdict::Unknown(reason) => {
            fields.push(format!("\"reason\": \"{}\"", escape_json(reason)));
        }
    }

    format!("{{{}}}", fields.join(", "))
}
