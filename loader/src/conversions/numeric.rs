use bigdecimal::{
    BigDecimal, FromPrimitive, ParseBigDecimalError,
    num_bigint::{BigInt, BigUint, Sign},
};
use byteorder::{BigEndian, ReadBytesExt};
use std::{fmt::Display, io::Cursor, str::FromStr};
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

/// Sign word of a positive value in the binary numeric format.
const NUMERIC_POS: u16 = 0x0000;
/// Sign word of a negative value.
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Decimal digits per base-10000 digit.
const DEC_DIGITS: usize = 4;

/// Most digits Postgres `numeric` accepts before the decimal point.
const NUMERIC_MAX_INTEGER_DIGITS: i64 = 131_072;
/// Most digits Postgres `numeric` accepts after the decimal point.
const NUMERIC_MAX_SCALE: i64 = 16_383;

/// An arbitrary precision decimal covering the full Postgres `numeric` range, including `NaN`
/// and both infinities.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Clone)]
pub enum PgNumeric {
    NaN,
    PositiveInf,
    NegativeInf,
    Value(BigDecimal),
}

impl PgNumeric {
    pub fn is_nan(&self) -> bool {
        matches!(self, PgNumeric::NaN)
    }

    /// Converts a float through its shortest decimal representation, so `0.1` stays `0.1`.
    pub fn from_f64(value: f64) -> Option<PgNumeric> {
        if value.is_nan() {
            Some(PgNumeric::NaN)
        } else if value == f64::INFINITY {
            Some(PgNumeric::PositiveInf)
        } else if value == f64::NEG_INFINITY {
            Some(PgNumeric::NegativeInf)
        } else {
            BigDecimal::from_str(&value.to_string())
                .ok()
                .or_else(|| BigDecimal::from_f64(value))
                .map(PgNumeric::Value)
        }
    }

    /// Returns `true` when the value has no fractional part. `NaN` and infinities are not integral.
    pub fn is_integral(&self) -> bool {
        match self {
            PgNumeric::Value(value) => fits_numeric_range(value) && value.is_integer(),
            _ => false,
        }
    }

    /// Returns `true` when the value is within the Postgres `numeric` digit limits.
    ///
    /// `NaN` and infinities are always in range.
    pub fn fits_numeric_range(&self) -> bool {
        match self {
            PgNumeric::Value(value) => fits_numeric_range(value),
            _ => true,
        }
    }

    /// Returns the number of digits before the decimal point, at most `i64::MAX`.
    ///
    /// Never rescales the value, so exponents far out of range stay cheap.
    pub fn integer_digits(&self) -> Option<i64> {
        match self {
            PgNumeric::Value(value) => Some(integer_digits(value)),
            _ => None,
        }
    }
}

fn integer_digits(value: &BigDecimal) -> i64 {
    let (_, scale) = value.as_bigint_and_exponent();
    let digits = i64::try_from(value.digits()).unwrap_or(i64::MAX);

    digits.saturating_sub(scale)
}

fn fits_numeric_range(value: &BigDecimal) -> bool {
    let (_, scale) = value.as_bigint_and_exponent();

    scale <= NUMERIC_MAX_SCALE && integer_digits(value) <= NUMERIC_MAX_INTEGER_DIGITS
}

impl FromStr for PgNumeric {
    type Err = ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match BigDecimal::from_str(s) {
            Ok(n) if !fits_numeric_range(&n) => Err(ParseBigDecimalError::Other(format!(
                "{s} is outside the numeric range"
            ))),
            Ok(n) => Ok(PgNumeric::Value(n)),
            Err(e) => match s.to_ascii_lowercase().as_str() {
                "infinity" | "+infinity" | "inf" | "+inf" => Ok(PgNumeric::PositiveInf),
                "-infinity" | "-inf" => Ok(PgNumeric::NegativeInf),
                "nan" => Ok(PgNumeric::NaN),
                _ => Err(e),
            },
        }
    }
}

impl From<i64> for PgNumeric {
    fn from(value: i64) -> Self {
        PgNumeric::Value(BigDecimal::from(value))
    }
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + 'static + Sync + Send>> {
        let mut rdr = Cursor::new(raw);

        let n_digits = rdr.read_u16::<BigEndian>()?;
        let weight = rdr.read_i16::<BigEndian>()?;
        let sign = match rdr.read_u16::<BigEndian>()? {
            NUMERIC_NEG => Sign::Minus,
            NUMERIC_POS => Sign::Plus,
            NUMERIC_NAN => return Ok(PgNumeric::NaN),
            NUMERIC_PINF => return Ok(PgNumeric::PositiveInf),
            NUMERIC_NINF => return Ok(PgNumeric::NegativeInf),
            v => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid sign {v:#04x}"),
                )
                .into());
            }
        };
        let scale = rdr.read_u16::<BigEndian>()?;

        let mut biguint = BigUint::from(0u32);
        for n in (0..n_digits).rev() {
            let digit = rdr.read_u16::<BigEndian>()?;
            biguint += BigUint::from(digit) * BigUint::from(10_000u32).pow(n as u32);
        }

        // The first digit carries 10_000^(n_digits - 1) but should carry 10_000^weight.
        let correction_exp = 4 * (i64::from(weight) - i64::from(n_digits) + 1);
        let res = BigDecimal::new(BigInt::from_biguint(sign, biguint), -correction_exp)
            .with_scale(i64::from(scale));

        Ok(PgNumeric::Value(res))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::NUMERIC)
    }
}

/// Writes the four header words of the binary numeric format followed by the digits.
fn write_numeric(out: &mut bytes::BytesMut, weight: i16, sign: u16, dscale: u16, digits: &[i16]) {
    out.extend_from_slice(&(digits.len() as u16).to_be_bytes());
    out.extend_from_slice(&weight.to_be_bytes());
    out.extend_from_slice(&sign.to_be_bytes());
    out.extend_from_slice(&dscale.to_be_bytes());
    for digit in digits {
        out.extend_from_slice(&digit.to_be_bytes());
    }
}

/// Splits a run of decimal digits into base-10000 digits.
fn base_10000_digits(decimal_digits: &str) -> Vec<i16> {
    decimal_digits
        .as_bytes()
        .chunks(DEC_DIGITS)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0i16, |acc, b| acc * 10 + i16::from(b - b'0'))
        })
        .collect()
}

impl ToSql for PgNumeric {
    fn to_sql(
        &self,
        _: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        let decimal = match self {
            PgNumeric::NaN => {
                write_numeric(out, 0, NUMERIC_NAN, 0, &[]);
                return Ok(IsNull::No);
            }
            PgNumeric::PositiveInf => {
                write_numeric(out, 0, NUMERIC_PINF, 0, &[]);
                return Ok(IsNull::No);
            }
            PgNumeric::NegativeInf => {
                write_numeric(out, 0, NUMERIC_NINF, 0, &[]);
                return Ok(IsNull::No);
            }
            PgNumeric::Value(decimal) => decimal,
        };

        if !fits_numeric_range(decimal) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "value is outside the numeric range",
            )
            .into());
        }

        let (bigint, exponent) = decimal.as_bigint_and_exponent();
        let sign = if bigint.sign() == Sign::Minus {
            NUMERIC_NEG
        } else {
            NUMERIC_POS
        };

        // Bring the value to `magnitude * 10^-scale` with a non-negative scale.
        let mut magnitude = bigint.magnitude().to_string();
        let scale = if exponent < 0 {
            magnitude.push_str(&"0".repeat(exponent.unsigned_abs() as usize));
            0usize
        } else {
            exponent as usize
        };
        let dscale = u16::try_from(scale)?;

        let (integer_part, fraction_part) = if magnitude.len() > scale {
            let split = magnitude.len() - scale;
            (magnitude[..split].to_owned(), magnitude[split..].to_owned())
        } else {
            (
                String::new(),
                format!("{}{magnitude}", "0".repeat(scale - magnitude.len())),
            )
        };

        // Integer digits are aligned on the decimal point from the left, fraction digits from
        // the right.
        let integer_padding = (DEC_DIGITS - integer_part.len() % DEC_DIGITS) % DEC_DIGITS;
        let integer_part = format!("{}{integer_part}", "0".repeat(integer_padding));
        let fraction_padding = (DEC_DIGITS - fraction_part.len() % DEC_DIGITS) % DEC_DIGITS;
        let fraction_part = format!("{fraction_part}{}", "0".repeat(fraction_padding));

        let mut digits = base_10000_digits(&integer_part);
        let mut weight = i16::try_from(digits.len())? - 1;
        digits.extend(base_10000_digits(&fraction_part));

        let leading_zeros = digits.iter().take_while(|d| **d == 0).count();
        digits.drain(..leading_zeros);
        weight -= i16::try_from(leading_zeros)?;
        while digits.last() == Some(&0) {
            digits.pop();
        }

        if digits.is_empty() {
            write_numeric(out, 0, NUMERIC_POS, dscale, &[]);
        } else {
            write_numeric(out, weight, sign, dscale, &digits);
        }

        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::NUMERIC)
    }

    tokio_postgres::types::to_sql_checked!();
}

impl Display for PgNumeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PgNumeric::NaN => write!(f, "NaN"),
            PgNumeric::PositiveInf => write!(f, "Infinity"),
            PgNumeric::NegativeInf => write!(f, "-Infinity"),
            PgNumeric::Value(n) => write!(f, "{n}"),
        }
    }
}

impl Default for PgNumeric {
    fn default() -> Self {
        PgNumeric::Value(BigDecimal::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encode(value: &str) -> Vec<i16> {
        let mut out = BytesMut::new();
        PgNumeric::from_str(value)
            .unwrap()
            .to_sql(&Type::NUMERIC, &mut out)
            .unwrap();

        out.chunks(2)
            .map(|word| i16::from_be_bytes([word[0], word[1]]))
            .collect()
    }

    #[test]
    fn encodes_digits_aligned_on_the_decimal_point() {
        // ndigits, weight, sign, dscale, digits...
        assert_eq!(encode("12.50"), vec![2, 0, 0, 2, 12, 5000]);
        assert_eq!(encode("100000"), vec![1, 1, 0, 0, 10]);
        assert_eq!(encode("0.0001"), vec![1, -1, 0, 4, 1]);
        assert_eq!(encode("-12345.678"), vec![3, 1, 0x4000, 3, 1, 2345, 6780]);
        assert_eq!(encode("1E+5"), vec![1, 1, 0, 0, 10]);
    }

    #[test]
    fn encodes_zero_with_its_scale() {
        assert_eq!(encode("0"), vec![0, 0, 0, 0]);
        assert_eq!(encode("0.00"), vec![0, 0, 0, 2]);
    }

    #[test]
    fn encodes_special_values() {
        assert_eq!(encode("NaN"), vec![0, 0, NUMERIC_NAN as i16, 0]);
        assert_eq!(encode("Infinity"), vec![0, 0, NUMERIC_PINF as i16, 0]);
        assert_eq!(encode("-inf"), vec![0, 0, NUMERIC_NINF as i16, 0]);
    }

    #[test]
    fn decodes_binary_numeric() {
        let mut out = BytesMut::new();
        let value = PgNumeric::from_str("-12345.678").unwrap();
        value.to_sql(&Type::NUMERIC, &mut out).unwrap();

        let decoded = PgNumeric::from_sql(&Type::NUMERIC, &out).unwrap();
        assert_eq!(decoded.to_string(), "-12345.678");
    }

    #[test]
    fn floats_keep_their_shortest_decimal_form() {
        assert_eq!(PgNumeric::from_f64(0.1).unwrap().to_string(), "0.1");
        assert_eq!(PgNumeric::from_f64(f64::NEG_INFINITY), Some(PgNumeric::NegativeInf));
        assert_eq!(PgNumeric::from_f64(f64::NAN), Some(PgNumeric::NaN));
    }

    #[test]
    fn integral_values() {
        assert!(PgNumeric::from_str("42.000").unwrap().is_integral());
        assert!(!PgNumeric::from_str("4.2").unwrap().is_integral());
        assert!(!PgNumeric::PositiveInf.is_integral());
    }

    #[test]
    fn out_of_range_exponents_are_rejected_without_rescaling() {
        assert!(PgNumeric::from_str("1e100000000").is_err());
        assert!(PgNumeric::from_str("1e-100000000").is_err());
        assert!(PgNumeric::from_str("1e131071").is_ok());
        assert!(PgNumeric::from_str("1e-16383").is_ok());
    }

    #[test]
    fn out_of_range_values_are_not_encoded() {
        let huge = PgNumeric::Value(BigDecimal::new(BigInt::from(1), -100_000_000));
        let mut out = BytesMut::new();

        assert!(!huge.fits_numeric_range());
        assert!(!huge.is_integral());
        assert_eq!(huge.integer_digits(), Some(100_000_001));
        assert!(huge.to_sql(&Type::NUMERIC, &mut out).is_err());
        assert!(out.is_empty());
    }
}
