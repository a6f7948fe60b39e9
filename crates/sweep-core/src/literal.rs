//! Literal and interval parsing
//!
//! Numeric text is a comma separated list of items. Each item is one of:
//!
//! - `v`: a single value
//! - `a:b`: every value from `a` to `b` with step 1
//! - `a:s:b`: every value from `a` to `b` with step `s`
//! - `a:blinn`: `n` evenly spaced values from `a` to `b`
//! - `a:blogn`: `n` logarithmically spaced values from `a` to `b`
//! - `<item>powp`: each value of an integer item raised to `p`
//!
//! Spaces are removed before parsing. Integer lin/log results are rounded,
//! deduplicated and sorted. No literal expands to more than
//! [`MAX_LITERAL_VALUES`] values.

use crate::error::LiteralError;
use crate::types::PrimitiveKind;
use crate::value::Literal;
use std::collections::BTreeSet;

/// Upper bound on the values one literal text may expand to
pub const MAX_LITERAL_VALUES: usize = 1_000_000;

fn too_many(text: &str) -> LiteralError {
    LiteralError::TooManyValues {
        text: text.to_string(),
        limit: MAX_LITERAL_VALUES,
    }
}

/// Parse literal text for a primitive kind into one or more values
///
/// # Errors
/// Returns [`LiteralError`] when the text does not follow the literal syntax
/// of `kind` or a value falls outside its range.
pub fn parse_literal(kind: PrimitiveKind, text: &str) -> Result<Vec<Literal>, LiteralError> {
    match kind {
        PrimitiveKind::Str => Ok(vec![Literal::Str(text.to_string())]),
        PrimitiveKind::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(vec![Literal::Char(c)]),
                _ => Err(LiteralError::InvalidChar(text.to_string())),
            }
        }
        PrimitiveKind::Bool => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(vec![Literal::Bool(true)]),
            "false" => Ok(vec![Literal::Bool(false)]),
            _ => Err(LiteralError::InvalidBool(text.to_string())),
        },
        PrimitiveKind::Short | PrimitiveKind::Int | PrimitiveKind::Long => {
            let values = parse_list(kind, text, parse_int_item)?;
            let (min, max) = int_range(kind);
            values
                .into_iter()
                .map(|v| {
                    if (min..=max).contains(&v) {
                        Ok(Literal::Int(v))
                    } else {
                        Err(LiteralError::InvalidNumber {
                            kind,
                            text: v.to_string(),
                        })
                    }
                })
                .collect()
        }
        PrimitiveKind::Float | PrimitiveKind::Double => {
            let values = parse_list(kind, text, parse_float_item)?;
            Ok(values.into_iter().map(Literal::Float).collect())
        }
    }
}

fn int_range(kind: PrimitiveKind) -> (i64, i64) {
    match kind {
        PrimitiveKind::Short => (i64::from(i16::MIN), i64::from(i16::MAX)),
        PrimitiveKind::Int => (i64::from(i32::MIN), i64::from(i32::MAX)),
        _ => (i64::MIN, i64::MAX),
    }
}

fn parse_list<T>(
    kind: PrimitiveKind,
    text: &str,
    item: fn(PrimitiveKind, &str) -> Result<Vec<T>, LiteralError>,
) -> Result<Vec<T>, LiteralError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(LiteralError::Empty(kind));
    }
    let mut out = Vec::new();
    for part in compact.split(',') {
        out.extend(item(kind, part)?);
        if out.len() > MAX_LITERAL_VALUES {
            return Err(too_many(&compact));
        }
    }
    Ok(out)
}

fn number<T: std::str::FromStr>(kind: PrimitiveKind, text: &str) -> Result<T, LiteralError> {
    text.parse().map_err(|_| LiteralError::InvalidNumber {
        kind,
        text: text.to_string(),
    })
}

/// Split `a:bKEYn` into `(a, b, n)`
fn spaced_bounds(kind: PrimitiveKind, item: &str, key: &str) -> Result<(f64, f64, usize), LiteralError> {
    let (interval, count) = item
        .split_once(key)
        .ok_or_else(|| LiteralError::MalformedInterval(item.to_string()))?;
    let (start, end) = interval
        .split_once(':')
        .ok_or_else(|| LiteralError::MalformedInterval(item.to_string()))?;
    let count: usize = number(kind, count)?;
    if count == 0 {
        return Err(LiteralError::MalformedInterval(item.to_string()));
    }
    if count > MAX_LITERAL_VALUES {
        return Err(too_many(item));
    }
    Ok((number(kind, start)?, number(kind, end)?, count))
}

#[allow(clippy::cast_precision_loss)]
fn linear(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    let inc = (end - start) / (count - 1) as f64;
    (0..count).map(|i| start + inc * i as f64).collect()
}

fn logarithmic(kind: PrimitiveKind, item: &str, start: f64, end: f64, count: usize) -> Result<Vec<f64>, LiteralError> {
    if start <= 0.0 || end <= 0.0 {
        return Err(LiteralError::InvalidNumber {
            kind,
            text: item.to_string(),
        });
    }
    Ok(linear(start.ln(), end.ln(), count)
        .into_iter()
        .map(f64::exp)
        .collect())
}

#[allow(clippy::cast_possible_truncation)]
fn rounded_set(values: Vec<f64>) -> Vec<i64> {
    let set: BTreeSet<i64> = values.into_iter().map(|v| v.round() as i64).collect();
    set.into_iter().collect()
}

fn parse_int_item(kind: PrimitiveKind, item: &str) -> Result<Vec<i64>, LiteralError> {
    if item.contains("log") {
        let (start, end, count) = spaced_bounds(kind, item, "log")?;
        return Ok(rounded_set(logarithmic(kind, item, start, end, count)?));
    }
    if item.contains("lin") {
        let (start, end, count) = spaced_bounds(kind, item, "lin")?;
        return Ok(rounded_set(linear(start, end, count)));
    }
    if let Some((base, power)) = item.split_once("pow") {
        let power: u32 = number(kind, power)?;
        return parse_int_item(kind, base)?
            .into_iter()
            .map(|v| {
                v.checked_pow(power).ok_or_else(|| LiteralError::InvalidNumber {
                    kind,
                    text: item.to_string(),
                })
            })
            .collect();
    }
    let parts: Vec<&str> = item.split(':').collect();
    let (first, step, last) = match parts.as_slice() {
        [single] => return Ok(vec![number(kind, single)?]),
        [first, last] => (number(kind, first)?, 1, number(kind, last)?),
        [first, step, last] => (number(kind, first)?, number(kind, step)?, number(kind, last)?),
        _ => return Err(LiteralError::MalformedInterval(item.to_string())),
    };
    if step <= 0 {
        return Err(LiteralError::NonPositiveStep(item.to_string()));
    }
    let count = if first > last {
        0
    } else {
        (i128::from(last) - i128::from(first)) / i128::from(step) + 1
    };
    if usize::try_from(count).map_or(true, |count| count > MAX_LITERAL_VALUES) {
        return Err(too_many(item));
    }
    let mut out = Vec::new();
    let mut current: i64 = first;
    while current <= last {
        out.push(current);
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(out)
}

/// Number of digits after the decimal point, `None` for exponent notation
fn decimals(text: &str) -> Option<i32> {
    if text.contains(['e', 'E']) {
        return None;
    }
    Some(text.split_once('.').map_or(0, |(_, frac)| {
        i32::try_from(frac.len()).unwrap_or(i32::MAX)
    }))
}

#[allow(clippy::cast_precision_loss)]
fn parse_float_item(kind: PrimitiveKind, item: &str) -> Result<Vec<f64>, LiteralError> {
    if item.contains("log") {
        let (start, end, count) = spaced_bounds(kind, item, "log")?;
        return logarithmic(kind, item, start, end, count);
    }
    if item.contains("lin") {
        let (start, end, count) = spaced_bounds(kind, item, "lin")?;
        return Ok(linear(start, end, count));
    }
    let parts: Vec<&str> = item.split(':').collect();
    let (first_text, step_text, last_text) = match parts.as_slice() {
        [single] => return Ok(vec![number(kind, single)?]),
        [first, last] => (*first, "1", *last),
        [first, step, last] => (*first, *step, *last),
        _ => return Err(LiteralError::MalformedInterval(item.to_string())),
    };
    let first: f64 = number(kind, first_text)?;
    let step: f64 = number(kind, step_text)?;
    let last: f64 = number(kind, last_text)?;
    if step.is_nan() || step <= 0.0 {
        return Err(LiteralError::NonPositiveStep(item.to_string()));
    }
    if !first.is_finite() || !last.is_finite() {
        return Err(LiteralError::InvalidNumber {
            kind,
            text: item.to_string(),
        });
    }
    let steps = (last - first) / step;
    if !steps.is_finite() || steps >= MAX_LITERAL_VALUES as f64 {
        return Err(too_many(item));
    }
    // multiply rather than accumulate, then snap to the precision the user wrote
    let scale = decimals(first_text)
        .zip(decimals(step_text))
        .map(|(a, b)| 10f64.powi(a.max(b).min(15)));
    let tolerance = step * 1e-9;
    let mut out = Vec::new();
    let mut k = 0u32;
    loop {
        let raw = first + step * f64::from(k);
        if raw > last + tolerance {
            break;
        }
        out.push(scale.map_or(raw, |scale| (raw * scale).round() / scale));
        k += 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ints(kind: PrimitiveKind, text: &str) -> Vec<i64> {
        parse_literal(kind, text)
            .unwrap()
            .into_iter()
            .map(|l| match l {
                Literal::Int(i) => i,
                other => panic!("unexpected literal {other:?}"),
            })
            .collect()
    }

    fn floats(text: &str) -> Vec<f64> {
        parse_literal(PrimitiveKind::Double, text)
            .unwrap()
            .into_iter()
            .map(|l| match l {
                Literal::Float(x) => x,
                other => panic!("unexpected literal {other:?}"),
            })
            .collect()
    }

    #[test]
    fn single_values_and_lists() {
        assert_eq!(ints(PrimitiveKind::Int, "4"), vec![4]);
        assert_eq!(ints(PrimitiveKind::Int, "1, 5 ,9"), vec![1, 5, 9]);
    }

    #[test]
    fn integer_intervals() {
        assert_eq!(ints(PrimitiveKind::Int, "1:4"), vec![1, 2, 3, 4]);
        assert_eq!(ints(PrimitiveKind::Int, "0:5:20"), vec![0, 5, 10, 15, 20]);
        assert_eq!(ints(PrimitiveKind::Int, "1:2,10"), vec![1, 2, 10]);
    }

    #[test]
    fn integer_lin_log_pow() {
        assert_eq!(ints(PrimitiveKind::Int, "0:10lin3"), vec![0, 5, 10]);
        assert_eq!(ints(PrimitiveKind::Int, "1:100log3"), vec![1, 10, 100]);
        assert_eq!(ints(PrimitiveKind::Int, "1:3pow2"), vec![1, 4, 9]);
        // rounding collapses duplicates
        assert_eq!(ints(PrimitiveKind::Int, "1:2lin5"), vec![1, 2]);
    }

    #[test]
    fn float_intervals_keep_written_precision() {
        assert_eq!(floats("0.1:0.1:0.3"), vec![0.1, 0.2, 0.3]);
        assert_eq!(floats("0:1lin3"), vec![0.0, 0.5, 1.0]);
        let log = floats("1:100log3");
        assert!((log[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn range_checks_per_kind() {
        assert!(parse_literal(PrimitiveKind::Short, "40000").is_err());
        assert!(parse_literal(PrimitiveKind::Int, "3000000000").is_err());
        assert!(parse_literal(PrimitiveKind::Long, "3000000000").is_ok());
    }

    #[test]
    fn malformed_input_rejected() {
        assert_eq!(
            parse_literal(PrimitiveKind::Int, " "),
            Err(LiteralError::Empty(PrimitiveKind::Int))
        );
        assert!(matches!(
            parse_literal(PrimitiveKind::Int, "1:2:3:4"),
            Err(LiteralError::MalformedInterval(_))
        ));
        assert!(matches!(
            parse_literal(PrimitiveKind::Int, "1:0:5"),
            Err(LiteralError::NonPositiveStep(_))
        ));
        assert!(parse_literal(PrimitiveKind::Int, "abc").is_err());
    }

    #[test]
    fn oversized_literals_rejected() {
        let too_many = |kind: PrimitiveKind, text: &str| {
            matches!(
                parse_literal(kind, text),
                Err(LiteralError::TooManyValues { limit: MAX_LITERAL_VALUES, .. })
            )
        };
        assert!(too_many(PrimitiveKind::Long, "0:9223372036854775807"));
        assert!(too_many(PrimitiveKind::Double, "0:1e-300:1"));
        assert!(too_many(PrimitiveKind::Double, "0:2000000"));
        assert!(too_many(PrimitiveKind::Int, "1:2lin2000000"));
        assert!(too_many(PrimitiveKind::Long, "0:600000,0:600000"));
        assert!(matches!(
            parse_literal(PrimitiveKind::Double, "0:1:inf"),
            Err(LiteralError::InvalidNumber { .. })
        ));
        assert_eq!(ints(PrimitiveKind::Long, "9223372036854775806:9223372036854775807").len(), 2);
    }

    #[test]
    fn char_bool_and_string() {
        assert_eq!(parse_literal(PrimitiveKind::Char, "x"), Ok(vec![Literal::Char('x')]));
        assert!(parse_literal(PrimitiveKind::Char, "xy").is_err());
        assert_eq!(parse_literal(PrimitiveKind::Bool, "TRUE"), Ok(vec![Literal::Bool(true)]));
        assert!(parse_literal(PrimitiveKind::Bool, "yes").is_err());
        assert_eq!(
            parse_literal(PrimitiveKind::Str, "a, b"),
            Ok(vec![Literal::Str("a, b".to_string())])
        );
    }

    proptest! {
        #[test]
        fn stepped_interval_length(first in -1000i64..1000, len in 0i64..200, step in 1i64..20) {
            let last = first + len;
            let values = ints(PrimitiveKind::Long, &format!("{first}:{step}:{last}"));
            prop_assert_eq!(values.len() as i64, len / step + 1);
            prop_assert!(values.windows(2).all(|w| w[1] - w[0] == step));
            prop_assert_eq!(values[0], first);
        }
    }
}
