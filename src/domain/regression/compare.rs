//! Structural diff between a baseline result and a new result.
//!
//! Both sides are expected in canonical form. Rules, by field:
//! - count fields (arrays named in `count_fields`): length delta above
//!   `count_tolerance` is a warning; elements are only compared when the
//!   lengths match
//! - identity fields (`identity_fields` paths): any change is a failure
//! - numbers: relative drift above `numeric_tolerance` is a warning
//! - anything else that differs (value, type, key set) is a warning

use crate::domain::regression::{Difference, Severity, ToleranceConfig};
use serde_json::Value;

pub fn diff(baseline: &Value, current: &Value, config: &ToleranceConfig) -> Vec<Difference> {
    let mut out = Vec::new();
    walk("", None, baseline, current, config, &mut out);
    out
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn severity_for(path: &str, config: &ToleranceConfig) -> Severity {
    if config.guards_identity(path) {
        Severity::Fail
    } else {
        Severity::Warning
    }
}

fn push(out: &mut Vec<Difference>, path: &str, severity: Severity, message: String) {
    out.push(Difference {
        path: path.to_string(),
        severity,
        message,
    });
}

fn brief(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(map) => format!("{{{} keys}}", map.len()),
        other => other.to_string(),
    }
}

fn relative_drift(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

fn walk(
    path: &str,
    key: Option<&str>,
    baseline: &Value,
    current: &Value,
    config: &ToleranceConfig,
    out: &mut Vec<Difference>,
) {
    match (baseline, current) {
        (Value::Object(old), Value::Object(new)) => {
            for (k, old_v) in old {
                let p = child_path(path, k);
                match new.get(k) {
                    Some(new_v) => walk(&p, Some(k), old_v, new_v, config, out),
                    None => push(out, &p, severity_for(&p, config), format!("{p} removed")),
                }
            }
            for k in new.keys().filter(|k| !old.contains_key(*k)) {
                let p = child_path(path, k);
                push(out, &p, severity_for(&p, config), format!("{p} added"));
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            if old.len() != new.len() {
                let counted = key.is_some_and(|k| config.is_count_field(k));
                let delta = old.len().abs_diff(new.len());
                if counted && delta <= config.count_tolerance {
                    return;
                }
                let severity = if counted {
                    Severity::Warning
                } else {
                    severity_for(path, config)
                };
                push(
                    out,
                    path,
                    severity,
                    format!("{path} count changed: {} → {}", old.len(), new.len()),
                );
                return;
            }
            for (i, (old_v, new_v)) in old.iter().zip(new).enumerate() {
                let p = format!("{path}[{i}]");
                walk(&p, None, old_v, new_v, config, out);
            }
        }
        (Value::Number(old), Value::Number(new)) => {
            if old == new {
                return;
            }
            let (Some(a), Some(b)) = (old.as_f64(), new.as_f64()) else {
                return;
            };
            if config.is_identity_field(path) {
                push(out, path, Severity::Fail, format!("{path} changed: {a} → {b}"));
            } else if relative_drift(a, b) > config.numeric_tolerance {
                push(out, path, Severity::Warning, format!("{path} changed: {a} → {b}"));
            }
        }
        (old, new) if old == new => {}
        (old, new) => {
            let label = if config.guards_identity(path) && !path.is_empty() {
                "identity changed"
            } else {
                "changed"
            };
            push(
                out,
                path,
                severity_for(path, config),
                format!("{path} {label}: {} → {}", brief(old), brief(new)),
            );
        }
    }
}
