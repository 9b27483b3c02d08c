//! Format specs for f-string replacement fields (`{loss:.4f}`, `{n:>6}`, `{ratio:.1%}`).

use super::errors::{RuntimeError, RuntimeResult};
use super::value::Value;

#[derive(Debug, Default, PartialEq)]
struct Spec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    zero: bool,
    width: usize,
    grouping: bool,
    precision: Option<usize>,
    ty: Option<char>,
}

fn parse_spec(spec: &str) -> RuntimeResult<Spec> {
    let invalid = || RuntimeError::value_error(format!("Invalid format specifier '{spec}'"));
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Spec::default();
    let mut i = 0;

    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
    if chars.len() >= 2 && is_align(chars[1]) {
        out.fill = Some(chars[0]);
        out.align = Some(chars[1]);
        i = 2;
    } else if chars.first().copied().is_some_and(is_align) {
        out.align = Some(chars[0]);
        i = 1;
    }

    if let Some(&c) = chars.get(i) {
        if matches!(c, '+' | '-' | ' ') {
            out.sign = Some(c);
            i += 1;
        }
    }
    if chars.get(i) == Some(&'0') {
        out.zero = true;
        i += 1;
    }

    let digits_from = |start: usize| -> (usize, usize) {
        let mut end = start;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
        let n = chars[start..end].iter().collect::<String>().parse().unwrap_or(0);
        (n, end)
    };

    let (width, next) = digits_from(i);
    out.width = width;
    i = next;

    if chars.get(i) == Some(&',') {
        out.grouping = true;
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        let (precision, next) = digits_from(i + 1);
        if next == i + 1 {
            return Err(invalid());
        }
        out.precision = Some(precision);
        i = next;
    }
    if let Some(&c) = chars.get(i) {
        if !matches!(c, 'f' | 'F' | 'd' | 's' | '%' | 'e' | 'E' | 'g') {
            return Err(invalid());
        }
        out.ty = Some(c);
        i += 1;
    }
    if i != chars.len() {
        return Err(invalid());
    }
    Ok(out)
}

/// Render `value` under an optional format spec.
pub fn format_value(value: &Value, spec: Option<&str>) -> RuntimeResult<String> {
    let Some(spec) = spec.filter(|s| !s.is_empty()) else {
        return Ok(value.to_display());
    };
    let spec = parse_spec(spec)?;
    let numeric = matches!(value, Value::Int(_) | Value::Float(_) | Value::Bool(_));

    let body = match spec.ty {
        Some('f' | 'F') => {
            let f = value.expect_float("format value")?;
            with_sign(format!("{:.*}", spec.precision.unwrap_or(6), f.abs()), f < 0.0, spec.sign)
        }
        Some('e' | 'E') => {
            let f = value.expect_float("format value")?;
            let raw = format!("{:.*e}", spec.precision.unwrap_or(6), f.abs());
            let text = exponent_two_digits(&raw);
            let text = if spec.ty == Some('E') { text.to_uppercase() } else { text };
            with_sign(text, f < 0.0, spec.sign)
        }
        Some('g') => {
            let f = value.expect_float("format value")?;
            with_sign(super::value::format_float(f.abs()), f < 0.0, spec.sign)
        }
        Some('%') => {
            let f = value.expect_float("format value")? * 100.0;
            with_sign(format!("{:.*}%", spec.precision.unwrap_or(6), f.abs()), f < 0.0, spec.sign)
        }
        Some('d') => {
            let i = match value {
                Value::Int(i) => *i,
                Value::Bool(b) => i64::from(*b),
                other => {
                    return Err(RuntimeError::value_error(format!(
                        "Unknown format code 'd' for object of type '{}'",
                        other.type_name()
                    )));
                }
            };
            let digits = i.unsigned_abs().to_string();
            let digits = if spec.grouping { group_thousands(&digits) } else { digits };
            with_sign(digits, i < 0, spec.sign)
        }
        Some(_) | None if numeric && (spec.precision.is_some() || spec.grouping || spec.sign.is_some()) => {
            match value {
                Value::Float(f) => {
                    let text = match spec.precision {
                        Some(p) => format!("{:.*}", p, f.abs()),
                        None => super::value::format_float(f.abs()),
                    };
                    with_sign(text, *f < 0.0, spec.sign)
                }
                other => {
                    let i = other.as_int().unwrap_or(0);
                    let digits = i.unsigned_abs().to_string();
                    let digits = if spec.grouping { group_thousands(&digits) } else { digits };
                    with_sign(digits, i < 0, spec.sign)
                }
            }
        }
        _ => {
            let text = value.to_display();
            match spec.precision {
                Some(p) if !numeric => text.chars().take(p).collect(),
                _ => text,
            }
        }
    };

    Ok(pad(body, &spec, numeric))
}

fn with_sign(digits: String, negative: bool, sign: Option<char>) -> String {
    match (negative, sign) {
        (true, _) => format!("-{digits}"),
        (false, Some('+')) => format!("+{digits}"),
        (false, Some(' ')) => format!(" {digits}"),
        _ => digits,
    }
}

/// Rust prints `1e3`; the cell language prints `1e+03`.
fn exponent_two_digits(raw: &str) -> String {
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => raw.to_string(),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn pad(body: String, spec: &Spec, numeric: bool) -> String {
    let len = body.chars().count();
    if len >= spec.width {
        return body;
    }
    let missing = spec.width - len;

    if spec.zero && spec.align.is_none() && numeric {
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (c.to_string(), &body[1..]),
            _ => (String::new(), body.as_str()),
        };
        return format!("{sign}{}{digits}", "0".repeat(missing));
    }

    let fill = spec.fill.unwrap_or(' ').to_string();
    let align = spec.align.unwrap_or(if numeric { '>' } else { '<' });
    match align {
        '>' | '=' => format!("{}{body}", fill.repeat(missing)),
        '^' => {
            let left = missing / 2;
            format!("{}{body}{}", fill.repeat(left), fill.repeat(missing - left))
        }
        _ => format!("{body}{}", fill.repeat(missing)),
    }
}
