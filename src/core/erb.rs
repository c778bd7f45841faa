//! Template expansion for `database.yml`.
//!
//! Rails configs embed ERB tags, almost always environment lookups. The
//! built-in expander covers that subset; anything else is handed to a Ruby
//! interpreter through `interpreter_command`.

use regex::Regex;
use std::sync::OnceLock;

use crate::utils::command::CommandLine;

const ERB_SCRIPT: &str = "require 'erb'; puts ERB.new(File.read(ARGV[0])).result";

/// Whether the content contains any template tag.
pub fn has_tags(content: &str) -> bool {
    content.contains("<%")
}

/// Probe for a directly usable Ruby interpreter.
pub fn ruby_probe() -> CommandLine {
    CommandLine::new("ruby").arg("-v")
}

/// Command that prints `file` rendered through ERB.
///
/// With `direct` the system `ruby` is used, otherwise the project's bundle.
pub fn interpreter_command(file: &str, direct: bool) -> CommandLine {
    let cmd = if direct {
        CommandLine::new("ruby")
    } else {
        CommandLine::new("bundle").args(["exec", "ruby"])
    };
    cmd.arg("-e").arg(ERB_SCRIPT).arg(file)
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Nil,
    Str(String),
}

/// Outcome of built-in expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    Expanded(String),
    /// A tag the built-in evaluator does not understand; the caller should
    /// fall back to an interpreter.
    Unsupported(String),
}

/// Expand ERB tags using `lookup` for `ENV` access.
///
/// Supports `<%= expr %>`, `<%# comment %>`, `-%>` newline trimming and
/// `<%%` escapes. Expressions: string/number/nil literals, `ENV['X']`,
/// `ENV.fetch('X')`, `ENV.fetch('X', default)`, `ENV.fetch('X') { default }`
/// and `a || b` chains of those.
pub fn expand_builtin<F>(content: &str, lookup: F) -> Result<Expansion, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("<%") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        if let Some(escaped) = after_open.strip_prefix('%') {
            out.push_str("<%");
            rest = escaped;
            continue;
        }

        let end = after_open
            .find("%>")
            .ok_or_else(|| "Unclosed template tag".to_string())?;
        let raw_tag = &after_open[..end];
        let mut remainder = &after_open[end + 2..];

        let (tag, trim_newline) = match raw_tag.strip_suffix('-') {
            Some(t) => (t, true),
            None => (raw_tag, false),
        };
        if trim_newline {
            remainder = remainder.strip_prefix('\n').unwrap_or(remainder);
        }

        if tag.starts_with('#') {
            // comment
        } else if let Some(expr) = tag.strip_prefix('=') {
            match eval(expr, &lookup)? {
                Some(Value::Str(s)) => out.push_str(&s),
                Some(Value::Nil) => {}
                None => return Ok(Expansion::Unsupported(expr.trim().to_string())),
            }
        } else {
            return Ok(Expansion::Unsupported(tag.trim().to_string()));
        }

        rest = remainder;
    }

    out.push_str(rest);
    Ok(Expansion::Expanded(out))
}

fn env_index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^ENV\[\s*(?:'([^']*)'|"([^"]*)")\s*\]$"#).expect("valid ENV[] pattern")
    })
}

fn env_fetch_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^ENV\.fetch\(\s*(?:'([^']*)'|"([^"]*)")\s*(?:,\s*(.+?)\s*)?\)\s*(?:\{\s*(.+?)\s*\})?$"#,
        )
        .expect("valid ENV.fetch pattern")
    })
}

/// `Ok(None)` means the expression is outside the supported subset.
fn eval<F>(expr: &str, lookup: &F) -> Result<Option<Value>, String>
where
    F: Fn(&str) -> Option<String>,
{
    let expr = expr.trim();

    if let Some((left, right)) = split_or(expr) {
        return match eval(left, lookup)? {
            Some(Value::Nil) => eval(right, lookup),
            other => Ok(other),
        };
    }

    if let Some(v) = literal(expr) {
        return Ok(Some(v));
    }

    if let Some(caps) = env_index_re().captures(expr) {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        return Ok(Some(lookup(name).map_or(Value::Nil, Value::Str)));
    }

    if let Some(caps) = env_fetch_re().captures(expr) {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        if let Some(found) = lookup(name) {
            return Ok(Some(Value::Str(found)));
        }
        let default = caps.get(3).or_else(|| caps.get(4));
        return match default {
            Some(d) => eval(d.as_str(), lookup),
            None => Err(format!("key not found: \"{}\"", name)),
        };
    }

    Ok(None)
}

fn literal(expr: &str) -> Option<Value> {
    if expr == "nil" {
        return Some(Value::Nil);
    }
    if expr == "true" || expr == "false" {
        return Some(Value::Str(expr.to_string()));
    }
    for quote in ['\'', '"'] {
        if expr.len() >= 2 && expr.starts_with(quote) && expr.ends_with(quote) {
            let inner = &expr[1..expr.len() - 1];
            if inner.contains(quote) {
                continue;
            }
            // Interpolation and escapes in double quotes need Ruby.
            if quote == '"' && (inner.contains("#{") || inner.contains('\\')) {
                return None;
            }
            return Some(Value::Str(inner.to_string()));
        }
    }
    let numeric = expr.strip_prefix('-').unwrap_or(expr);
    if !numeric.is_empty()
        && numeric.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '_')
        && numeric.chars().next().is_some_and(|c| c.is_ascii_digit())
    {
        return Some(Value::Str(expr.replace('_', "")));
    }
    None
}

/// Split on the first `||` that is not inside quotes.
fn split_or(expr: &str) -> Option<(&str, &str)> {
    let bytes = expr.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i + 1 < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == b'\'' || c == b'"' => quote = Some(c),
            None if c == b'|' && bytes[i + 1] == b'|' => {
                return Some((&expr[..i], &expr[i + 2..]));
            }
            None => {}
        }
        i += 1;
    }
    None
}
