//! Fixed-point helpers. Products are taken in 256 bits so that
//! `amount * balance` never overflows before the division.

use primitive_types::U256;

use bond_core::error::ArithmeticError;

/// `a * b / denominator`, rounded down.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, ArithmeticError> {
    if denominator == 0 {
        return Err(ArithmeticError::Overflow);
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(ArithmeticError::Overflow);
    }
    Ok(quotient.low_u128())
}

/// Fixed-point exponentiation: `(base / precision)^exp` scaled by `precision`.
///
/// Binary exponentiation, O(log exp) multiplications.
pub fn fixed_pow(base: u128, exp: u64, precision: u128) -> Result<u128, ArithmeticError> {
    let mut result = precision;
    let mut b = base;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = mul_div(result, b, precision)?;
        }
        e >>= 1;
        if e > 0 {
            b = mul_div(b, b, precision)?;
        }
    }
    Ok(result)
}
