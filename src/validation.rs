/// Input validation for order creation requests
///
/// Orders are checked once, before they are persisted. Everything downstream
/// (placement, reconciliation) trusts the stored intent and never re-validates.
use crate::domain::{CreateOrder, OrderType};
use crate::error::{QuikTradeError, Result};
use rust_decimal::Decimal;

/// Instruments are fixed-width exchange symbols
pub const INSTRUMENT_LEN: usize = 12;

/// Limit prices are stored as DECIMAL(10,2)
pub const LIMIT_PRICE_SCALE: u32 = 2;
pub const LIMIT_PRICE_INTEGER_DIGITS: usize = 8;

/// Validate an instrument symbol
pub fn validate_instrument(instrument: &str) -> Result<()> {
    let len = instrument.chars().count();
    if len != INSTRUMENT_LEN {
        return Err(QuikTradeError::Validation(format!(
            "instrument must be exactly {} characters, got {} ('{}')",
            INSTRUMENT_LEN, len, instrument
        )));
    }
    Ok(())
}

/// Validate order quantity
///
/// The upper bound mirrors the INT column the quantity is stored in.
pub fn validate_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(QuikTradeError::Validation(
            "quantity must be greater than zero".to_string(),
        ));
    }

    if quantity > i32::MAX as u32 {
        return Err(QuikTradeError::Validation(format!(
            "quantity {} exceeds maximum {}",
            quantity,
            i32::MAX
        )));
    }

    Ok(())
}

/// Validate a limit price value (not its presence)
pub fn validate_limit_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(QuikTradeError::Validation(format!(
            "limit_price must be positive: {}",
            price
        )));
    }

    let normalized = price.normalize();
    if normalized.scale() > LIMIT_PRICE_SCALE {
        return Err(QuikTradeError::Validation(format!(
            "limit_price allows at most {} decimal places: {}",
            LIMIT_PRICE_SCALE, price
        )));
    }

    let integer_digits = normalized.trunc().abs().to_string().len();
    if integer_digits > LIMIT_PRICE_INTEGER_DIGITS {
        return Err(QuikTradeError::Validation(format!(
            "limit_price allows at most {} integer digits: {}",
            LIMIT_PRICE_INTEGER_DIGITS, price
        )));
    }

    Ok(())
}

/// Validate that limit price presence matches the order type
pub fn validate_price_for_type(order_type: OrderType, limit_price: Option<Decimal>) -> Result<()> {
    match (order_type, limit_price) {
        (OrderType::Market, Some(_)) => Err(QuikTradeError::Validation(
            "Providing a `limit_price` is prohibited for type `market`".to_string(),
        )),
        (OrderType::Limit, None) => Err(QuikTradeError::Validation(
            "Attribute `limit_price` is required for type `limit`".to_string(),
        )),
        (OrderType::Limit, Some(price)) if price.is_zero() => Err(QuikTradeError::Validation(
            "Attribute `limit_price` is required for type `limit`".to_string(),
        )),
        _ => Ok(()),
    }
}

impl CreateOrder {
    /// Validate the whole request
    pub fn validate(&self) -> Result<()> {
        validate_price_for_type(self.order_type, self.limit_price)?;
        validate_instrument(&self.instrument)?;
        validate_quantity(self.quantity)?;
        if let Some(price) = self.limit_price {
            validate_limit_price(price)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_market_order() {
        let request = CreateOrder::market(OrderSide::Sell, "XRPUSDT00006", 500);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_valid_limit_order() {
        let request = CreateOrder::limit(OrderSide::Buy, "DOTUSDT00008", 75, dec!(4.20));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_market_with_limit_price_rejected() {
        let mut request = CreateOrder::market(OrderSide::Buy, "DOTUSDT00008", 75);
        request.limit_price = Some(dec!(1.00));
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("prohibited for type `market`"));
    }

    #[test]
    fn test_limit_without_price_rejected() {
        let mut request = CreateOrder::market(OrderSide::Buy, "DOTUSDT00008", 75);
        request.order_type = OrderType::Limit;
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("required for type `limit`"));

        request.limit_price = Some(Decimal::ZERO);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_instrument_length() {
        assert!(validate_instrument("XRPUSDT00006").is_ok());
        assert!(validate_instrument("INSTRUMENT").is_err());
        assert!(validate_instrument("XRPUSDT000060").is_err());
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(i32::MAX as u32).is_ok());
        assert!(validate_quantity(i32::MAX as u32 + 1).is_err());
    }

    #[test]
    fn test_limit_price_scale_and_range() {
        assert!(validate_limit_price(dec!(12.50)).is_ok());
        assert!(validate_limit_price(dec!(12.500)).is_ok());
        assert!(validate_limit_price(dec!(12.505)).is_err());
        assert!(validate_limit_price(dec!(-1)).is_err());
        assert!(validate_limit_price(dec!(99999999.99)).is_ok());
        assert!(validate_limit_price(dec!(100000000)).is_err());
    }
}
