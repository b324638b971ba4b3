//! Fractional order keys.
//!
//! A key is an ASCII string whose plain byte-wise ordering equals the
//! position of its record among siblings. New keys can be generated before,
//! after, or between existing keys without rewriting any other record.
//!
//! Layout: a one-character head (`a`-`z` or `A`-`Z`) encoding how many
//! base-62 integer digits follow, then the integer digits, then an optional
//! fraction that never ends in `0`. Lower-case heads are non-negative
//! integers that grow longer as they rise; upper-case heads are negative
//! integers that grow longer as they fall.

use serde::{Deserialize, Serialize};

/// Base-62 digits in ascending ASCII order.
const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const ZERO: u8 = DIGITS[0];
const LAST: u8 = DIGITS[DIGITS.len() - 1];

/// The smallest representable integer part; nothing can be decremented past it.
const SMALLEST_INTEGER: &str = "A00000000000000000000000000";

/// Errors raised by key generation when an input key is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderKeyError {
    #[error("Invalid order key '{0}'")]
    Invalid(String),

    #[error("Order key bounds out of order: '{lower}' is not before '{upper}'")]
    Unordered { lower: String, upper: String },

    #[error("Order key space exhausted")]
    Exhausted,
}

/// Anything that carries an optional fractional order key.
pub trait OrderKeyed {
    fn order_key(&self) -> Option<&str>;
}

/// Minimal keyed record, used when only the sibling keys are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedItem {
    pub order_key: Option<String>,
}

impl OrderKeyed for KeyedItem {
    fn order_key(&self) -> Option<&str> {
        self.order_key.as_deref()
    }
}

impl OrderKeyed for String {
    fn order_key(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Public operations
// ---------------------------------------------------------------------------

/// Key for the first item of an empty collection.
pub fn first_key() -> String {
    "a0".to_string()
}

/// Generate a key that sorts strictly before every keyed item in `existing`.
///
/// Items without a key are ignored. An empty (or all-keyless) collection
/// yields [`first_key`].
pub fn key_before_all<T: OrderKeyed>(existing: &[T]) -> Result<String, OrderKeyError> {
    let smallest = existing.iter().filter_map(OrderKeyed::order_key).min();
    match smallest {
        None => Ok(first_key()),
        Some(min) => key_between(None, Some(min)),
    }
}

/// Generate a key that sorts strictly after every keyed item in `existing`.
pub fn key_after_all<T: OrderKeyed>(existing: &[T]) -> Result<String, OrderKeyError> {
    let largest = existing.iter().filter_map(OrderKeyed::order_key).max();
    match largest {
        None => Ok(first_key()),
        Some(max) => key_between(Some(max), None),
    }
}

/// Generate a key strictly between `lower` and `upper`.
///
/// `None` bounds mean "open" on that side.
pub fn key_between(lower: Option<&str>, upper: Option<&str>) -> Result<String, OrderKeyError> {
    if let Some(a) = lower {
        validate_order_key(a)?;
    }
    if let Some(b) = upper {
        validate_order_key(b)?;
    }

    match (lower, upper) {
        (None, None) => Ok(first_key()),
        (None, Some(b)) => {
            let int_b = integer_part(b)?;
            let frac_b = &b[int_b.len()..];
            if int_b == SMALLEST_INTEGER {
                return Ok(format!("{int_b}{}", midpoint(b"", Some(frac_b.as_bytes()))?));
            }
            if int_b.len() < b.len() {
                return Ok(int_b.to_string());
            }
            decrement_integer(int_b).ok_or(OrderKeyError::Exhausted)
        }
        (Some(a), None) => {
            let int_a = integer_part(a)?;
            let frac_a = &a[int_a.len()..];
            match increment_integer(int_a) {
                Some(next) => Ok(next),
                None => Ok(format!("{int_a}{}", midpoint(frac_a.as_bytes(), None)?)),
            }
        }
        (Some(a), Some(b)) => {
            if a >= b {
                return Err(OrderKeyError::Unordered {
                    lower: a.to_string(),
                    upper: b.to_string(),
                });
            }
            let int_a = integer_part(a)?;
            let frac_a = &a[int_a.len()..];
            let int_b = integer_part(b)?;
            let frac_b = &b[int_b.len()..];
            if int_a == int_b {
                return Ok(format!(
                    "{int_a}{}",
                    midpoint(frac_a.as_bytes(), Some(frac_b.as_bytes()))?
                ));
            }
            let next = increment_integer(int_a).ok_or(OrderKeyError::Exhausted)?;
            if next.as_str() < b {
                Ok(next)
            } else {
                Ok(format!("{int_a}{}", midpoint(frac_a.as_bytes(), None)?))
            }
        }
    }
}

/// Stable sort by order key. Keyless items sort last; `items` is untouched.
pub fn sort_by_order_key<T: OrderKeyed>(items: &[T]) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|x, y| match (x.order_key(), y.order_key()) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    sorted
}

/// Check that `key` is a well-formed order key.
pub fn validate_order_key(key: &str) -> Result<(), OrderKeyError> {
    if key == SMALLEST_INTEGER || !key.bytes().all(|c| DIGITS.contains(&c)) {
        return Err(OrderKeyError::Invalid(key.to_string()));
    }
    let int = integer_part(key)?;
    if key.len() > int.len() && key.as_bytes().last() == Some(&ZERO) {
        return Err(OrderKeyError::Invalid(key.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn digit_index(c: u8) -> usize {
    DIGITS.iter().position(|&d| d == c).unwrap_or(0)
}

/// Total length (head included) of the integer part introduced by `head`.
fn integer_length(head: u8) -> Option<usize> {
    match head {
        b'a'..=b'z' => Some((head - b'a') as usize + 2),
        b'A'..=b'Z' => Some((b'Z' - head) as usize + 2),
        _ => None,
    }
}

fn integer_part(key: &str) -> Result<&str, OrderKeyError> {
    let head = *key
        .as_bytes()
        .first()
        .ok_or_else(|| OrderKeyError::Invalid(key.to_string()))?;
    let len = integer_length(head).ok_or_else(|| OrderKeyError::Invalid(key.to_string()))?;
    if len > key.len() {
        return Err(OrderKeyError::Invalid(key.to_string()));
    }
    Ok(&key[..len])
}

/// Fraction strictly between `a` and `b` (`None` = open upper bound).
fn midpoint(a: &[u8], b: Option<&[u8]>) -> Result<String, OrderKeyError> {
    if let Some(b) = b {
        if !b.is_empty() && a >= b {
            return Err(OrderKeyError::Unordered {
                lower: String::from_utf8_lossy(a).into_owned(),
                upper: String::from_utf8_lossy(b).into_owned(),
            });
        }
        // Shared prefix (with `a` padded by zeros) is copied through.
        let mut n = 0;
        while n < b.len() && a.get(n).copied().unwrap_or(ZERO) == b[n] {
            n += 1;
        }
        if n > 0 {
            let prefix = String::from_utf8_lossy(&b[..n]).into_owned();
            let rest_a = if n < a.len() { &a[n..] } else { &[][..] };
            return Ok(format!("{prefix}{}", midpoint(rest_a, Some(&b[n..]))?));
        }
    }

    let digit_a = a.first().map(|&c| digit_index(c)).unwrap_or(0);
    let digit_b = match b {
        Some(b) if !b.is_empty() => digit_index(b[0]),
        _ => DIGITS.len(),
    };

    if digit_b - digit_a > 1 {
        let mid = (digit_a + digit_b + 1) / 2;
        return Ok((DIGITS[mid] as char).to_string());
    }

    match b {
        Some(b) if b.len() > 1 => Ok((b[0] as char).to_string()),
        _ => {
            let rest_a = if a.len() > 1 { &a[1..] } else { &[][..] };
            Ok(format!(
                "{}{}",
                DIGITS[digit_a] as char,
                midpoint(rest_a, None)?
            ))
        }
    }
}

fn increment_integer(x: &str) -> Option<String> {
    let bytes = x.as_bytes();
    let head = bytes[0];
    let mut digits: Vec<u8> = bytes[1..].to_vec();

    let mut carry = true;
    for d in digits.iter_mut().rev() {
        let next = digit_index(*d) + 1;
        if next == DIGITS.len() {
            *d = ZERO;
        } else {
            *d = DIGITS[next];
            carry = false;
            break;
        }
    }

    if carry {
        if head == b'Z' {
            return Some(format!("a{}", ZERO as char));
        }
        if head == b'z' {
            return None;
        }
        let new_head = head + 1;
        if new_head > b'a' {
            digits.push(ZERO);
        } else {
            digits.pop();
        }
        return Some(assemble(new_head, &digits));
    }
    Some(assemble(head, &digits))
}

fn decrement_integer(x: &str) -> Option<String> {
    let bytes = x.as_bytes();
    let head = bytes[0];
    let mut digits: Vec<u8> = bytes[1..].to_vec();

    let mut borrow = true;
    for d in digits.iter_mut().rev() {
        let idx = digit_index(*d);
        if idx == 0 {
            *d = LAST;
        } else {
            *d = DIGITS[idx - 1];
            borrow = false;
            break;
        }
    }

    if borrow {
        if head == b'a' {
            return Some(format!("Z{}", LAST as char));
        }
        if head == b'A' {
            return None;
        }
        let new_head = head - 1;
        if new_head < b'Z' {
            digits.push(LAST);
        } else {
            digits.pop();
        }
        return Some(assemble(new_head, &digits));
    }
    Some(assemble(head, &digits))
}

fn assemble(head: u8, digits: &[u8]) -> String {
    let mut out = String::with_capacity(digits.len() + 1);
    out.push(head as char);
    out.extend(digits.iter().map(|&d| d as char));
    out
}
