//! Margin evaluation: how deep a discount is and whether it may be granted
//! without review.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Money, OfferError};

/// Outcome of comparing a requested price against the configured margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginVerdict {
    /// `100 * (product_price - offered_price) / product_price`, in `[0, 100]`.
    pub discount_percentage: Decimal,

    /// True when the discount does not exceed the margin.
    pub within_margin: bool,

    /// The margin the verdict was taken against.
    pub max_discount: Decimal,
}

/// Computes the discount an offered price represents.
///
/// Fails with `InvalidPrice` unless `product_price > 0` and
/// `0 < offered_price <= product_price`.
pub fn discount_percentage(product_price: Money, offered_price: Money) -> Result<Decimal, OfferError> {
    if !product_price.is_positive()
        || !offered_price.is_positive()
        || offered_price > product_price
    {
        return Err(OfferError::InvalidPrice {
            product_price,
            offered_price,
        });
    }

    let discount = Decimal::from((product_price - offered_price).cents());
    Ok(discount * Decimal::ONE_HUNDRED / Decimal::from(product_price.cents()))
}

/// Evaluates an offer against `max_discount` (a percentage).
///
/// The boundary is inclusive: a discount exactly equal to the margin is
/// within it.
pub fn evaluate(
    product_price: Money,
    offered_price: Money,
    max_discount: Decimal,
) -> Result<MarginVerdict, OfferError> {
    let discount_percentage = discount_percentage(product_price, offered_price)?;
    Ok(MarginVerdict {
        discount_percentage,
        within_margin: discount_percentage <= max_discount,
        max_discount,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn cents(value: i64) -> Money {
        Money::from_cents(value)
    }

    #[test]
    fn twenty_percent_off_is_within_a_twenty_percent_margin() {
        let verdict = evaluate(cents(10000), cents(8000), dec!(20)).unwrap();
        assert_eq!(verdict.discount_percentage, dec!(20));
        assert!(verdict.within_margin);
    }

    #[test]
    fn thirty_percent_off_is_outside_a_twenty_percent_margin() {
        let verdict = evaluate(cents(10000), cents(7000), dec!(20)).unwrap();
        assert_eq!(verdict.discount_percentage, dec!(30));
        assert!(!verdict.within_margin);
        assert_eq!(verdict.max_discount, dec!(20));
    }

    #[test]
    fn boundary_is_inclusive_for_fractional_discounts() {
        // 1/3 off: the margin equal to the computed discount must accept.
        let discount = discount_percentage(cents(300), cents(200)).unwrap();
        let verdict = evaluate(cents(300), cents(200), discount).unwrap();
        assert!(verdict.within_margin);

        let just_under = evaluate(cents(300), cents(200), dec!(33.33)).unwrap();
        assert!(!just_under.within_margin);
    }

    #[test]
    fn full_price_is_zero_discount() {
        let verdict = evaluate(cents(15000), cents(15000), dec!(0)).unwrap();
        assert_eq!(verdict.discount_percentage, Decimal::ZERO);
        assert!(verdict.within_margin);
    }

    #[test]
    fn ten_percent_discount() {
        assert_eq!(discount_percentage(cents(15000), cents(13500)).unwrap(), dec!(10));
    }

    #[test]
    fn discount_stays_within_bounds() {
        for (product, offered) in [(1, 1), (100, 1), (999_999, 3), (12345, 12344), (7, 6)] {
            let d = discount_percentage(cents(product), cents(offered)).unwrap();
            assert!(d >= Decimal::ZERO && d <= Decimal::ONE_HUNDRED, "{product}/{offered} -> {d}");
        }
    }

    #[test]
    fn non_positive_product_price_is_rejected() {
        assert!(matches!(
            evaluate(cents(0), cents(0), dec!(20)),
            Err(OfferError::InvalidPrice { .. })
        ));
        assert!(matches!(
            evaluate(cents(-100), cents(50), dec!(20)),
            Err(OfferError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn offered_price_outside_range_is_rejected() {
        assert!(matches!(
            evaluate(cents(10000), cents(0), dec!(20)),
            Err(OfferError::InvalidPrice { .. })
        ));
        assert!(matches!(
            evaluate(cents(10000), cents(10001), dec!(20)),
            Err(OfferError::InvalidPrice { .. })
        ));
    }
}
