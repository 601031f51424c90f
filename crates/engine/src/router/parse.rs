//! Defensive parsing of routing classifier output.
//!
//! Expected shape:
//!
//! ```text
//! STRUCTURED_API, SHALLOW_FETCH
//! priority: high
//! free-form rationale...
//! ```
//!
//! Only the first line carries backends. Anything that is not a known,
//! routable backend token is dropped.

use std::str::FromStr;

use scout_core::{Backend, Priority};

/// What could be salvaged from a classifier response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedRouting {
    pub sources: Vec<Backend>,
    pub priority: Option<Priority>,
    pub rationale: String,
}

pub fn parse_routing(raw: &str) -> ParsedRouting {
    let mut lines = raw.trim().lines();
    let first = lines.next().unwrap_or_default();

    let mut sources = Vec::new();
    for token in first.split(',') {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric() && c != '_' && c != '-');
        if token.is_empty() {
            continue;
        }
        match Backend::from_str(token) {
            Ok(backend) if backend.is_routable() => {
                if !sources.contains(&backend) {
                    sources.push(backend);
                }
            }
            Ok(backend) => tracing::debug!(%backend, "dropping non-routable backend from classifier output"),
            Err(e) => tracing::debug!(error = %e, "dropping unknown classifier token"),
        }
    }

    let mut priority = None;
    let mut rationale = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if priority.is_none() {
            if let Some(p) = priority_value(line).and_then(|v| Priority::from_str(v).ok()) {
                priority = Some(p);
                continue;
            }
        }
        rationale.push(line);
    }

    ParsedRouting { sources, priority, rationale: rationale.join("\n") }
}

fn priority_value(line: &str) -> Option<&str> {
    let (label, value) = line.split_once(':')?;
    label.trim().eq_ignore_ascii_case("priority").then_some(value.trim())
}
