#![forbid(unsafe_code)]

use std::fmt;

use crate::utils::errors::ValidationError;

// ***************************************************************************
//                                Constants
// ***************************************************************************
pub const PROP_ARMSTRONG : &str = "armstrong";
pub const PROP_PRIME     : &str = "prime";
pub const PROP_PERFECT   : &str = "perfect";
pub const PROP_ODD       : &str = "odd";
pub const PROP_EVEN      : &str = "even";

// Whole numbers outside of this range can't be represented as i64.  The upper
// bound is exclusive since i64::MAX rounds up to 2^63 as an f64.
const I64_LOWER_F64 : f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER_F64 : f64 =  9_223_372_036_854_775_808.0;

// ***************************************************************************
//                                  Enums
// ***************************************************************************
// ---------------------------------------------------------------------------
// ParsedNumber:
// ---------------------------------------------------------------------------
/** The normalized form of the caller's input.  Whole values are always held
 * as integers so that the integer-only predicates can't be applied to a
 * value with a fractional part.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedNumber {
    Integer(i64),
    Decimal(f64),
}

impl ParsedNumber {
    /// The value with any fractional part truncated toward zero.
    pub fn integer_part(&self) -> i64 {
        match self {
            ParsedNumber::Integer(n) => *n,
            // Decimals with a fractional part are always well inside i64 range.
            ParsedNumber::Decimal(d) => d.trunc() as i64,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ParsedNumber::Integer(_))
    }
}

impl fmt::Display for ParsedNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParsedNumber::Integer(n) => write!(f, "{}", n),
            ParsedNumber::Decimal(d) => write!(f, "{}", d),
        }
    }
}

// ***************************************************************************
//                             Classification
// ***************************************************************************
// ---------------------------------------------------------------------------
// Classification:
// ---------------------------------------------------------------------------
/** The computed properties of one number.  The prime and perfect flags are
 * only populated for integers.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub number: ParsedNumber,
    pub is_prime: Option<bool>,
    pub is_perfect: Option<bool>,
    pub properties: Vec<String>,
    pub digit_sum: u64,
}

impl Classification {
    pub fn integer_part(&self) -> i64 {
        self.number.integer_part()
    }
}

// ***************************************************************************
//                             Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// classify:
// ---------------------------------------------------------------------------
/** Parse the raw input and compute all of its properties.  Parity and digit
 * sum are always computed from the truncated integer part.  The armstrong,
 * prime and perfect properties are only considered for whole numbers.
 */
pub fn classify(raw: Option<&str>) -> Result<Classification, ValidationError> {
    let number = parse_number(raw)?;
    let int_part = number.integer_part();

    let mut properties = Vec::with_capacity(4);
    let (is_prime_flag, is_perfect_flag) = match number {
        ParsedNumber::Integer(n) => {
            // Primes are never perfect.
            let prime = is_prime(n);
            let perfect = !prime && is_perfect(n);
            if is_armstrong(n) {properties.push(PROP_ARMSTRONG.to_string());}
            if prime {properties.push(PROP_PRIME.to_string());}
            if perfect {properties.push(PROP_PERFECT.to_string());}
            (Some(prime), Some(perfect))
        },
        ParsedNumber::Decimal(_) => (None, None),
    };
    properties.push(parity(int_part).to_string());

    Ok(Classification {
        number,
        is_prime: is_prime_flag,
        is_perfect: is_perfect_flag,
        properties,
        digit_sum: digit_sum(int_part),
    })
}

// ---------------------------------------------------------------------------
// parse_number:
// ---------------------------------------------------------------------------
/** Convert the caller's text into a number.  Surrounding whitespace, a sign,
 * a fractional part and an exponent are all accepted.  Infinities, NaN and
 * whole values that don't fit in an i64 are rejected.
 */
pub fn parse_number(raw: Option<&str>) -> Result<ParsedNumber, ValidationError> {
    let text = match raw {
        Some(s) => s.trim(),
        None => return Err(ValidationError::Missing),
    };
    if text.is_empty() {
        return Err(ValidationError::Missing);
    }

    // Plain integers are parsed exactly so that large values keep all digits.
    if let Ok(n) = text.parse::<i64>() {
        return Ok(ParsedNumber::Integer(n));
    }

    let value = match text.parse::<f64>() {
        Ok(v) => v,
        Err(_) => return Err(ValidationError::NotANumber(text.to_string())),
    };
    if !value.is_finite() {
        return Err(ValidationError::NotANumber(text.to_string()));
    }

    if value.fract() != 0.0 {
        return Ok(ParsedNumber::Decimal(value));
    }
    if !(I64_LOWER_F64..I64_UPPER_F64).contains(&value) {
        return Err(ValidationError::OutOfRange(text.to_string()));
    }
    Ok(ParsedNumber::Integer(value as i64))
}

// ---------------------------------------------------------------------------
// is_prime:
// ---------------------------------------------------------------------------
pub fn is_prime(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    let n = n as u64;
    let mut i: u64 = 2;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

// ---------------------------------------------------------------------------
// is_perfect:
// ---------------------------------------------------------------------------
/** A number is perfect when the sum of its positive divisors, excluding
 * itself, equals the number.  Divisors are collected in pairs (i, n/i) so
 * only candidates up to the square root are examined.  Numbers less than 2
 * are never perfect.
 */
pub fn is_perfect(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    let n = n as u64;

    // 1 always divides n and n itself is excluded.
    let mut sum: u64 = 1;
    let mut i: u64 = 2;
    while i * i <= n {
        if n % i == 0 {
            sum += i;
            let pair = n / i;
            if pair != i {
                sum += pair;
            }
            if sum > n {
                return false;
            }
        }
        i += 1;
    }
    sum == n
}

// ---------------------------------------------------------------------------
// is_armstrong:
// ---------------------------------------------------------------------------
/** True when the number equals the sum of its digits each raised to the
 * power of the digit count.  Digits come from the absolute value but the
 * comparison is against the signed input, so negatives never qualify.
 */
pub fn is_armstrong(n: i64) -> bool {
    let digits = digits_of(n);
    let k = digits.len() as u32;

    // 19 digits of 9^19 fit comfortably in a u128.
    let sum: u128 = digits.iter().map(|d| (*d as u128).pow(k)).sum();
    n >= 0 && sum == n as u128
}

// ---------------------------------------------------------------------------
// digit_sum:
// ---------------------------------------------------------------------------
pub fn digit_sum(n: i64) -> u64 {
    digits_of(n).iter().map(|d| *d as u64).sum()
}

// ---------------------------------------------------------------------------
// parity:
// ---------------------------------------------------------------------------
pub fn parity(n: i64) -> &'static str {
    if n % 2 != 0 {PROP_ODD} else {PROP_EVEN}
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// Decimal digits of |n|, most significant first.
fn digits_of(n: i64) -> Vec<u8> {
    n.unsigned_abs()
        .to_string()
        .bytes()
        .map(|b| b - b'0')
        .collect()
}
