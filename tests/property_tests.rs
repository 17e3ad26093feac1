use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_api::{
    ids::{generate_id, is_valid_id, ID_LENGTH},
    services::pricing::{compute_totals, discount, to_minor_units, PricedLine, ShippingRules},
    zalopay::{app_trans_id, mac, order_id_from_app_trans_id},
};

fn price() -> impl Strategy<Value = Decimal> {
    (0i64..50_000_000).prop_map(Decimal::from)
}

fn lines() -> impl Strategy<Value = Vec<PricedLine>> {
    prop::collection::vec(
        (price(), 0i32..20).prop_map(|(unit, qty)| PricedLine::new(unit, qty)),
        0..8,
    )
}

fn rules() -> impl Strategy<Value = ShippingRules> {
    (0i64..100_000, 0i64..2_000_000).prop_map(|(fee, threshold)| ShippingRules {
        flat_fee: Decimal::from(fee),
        free_shipping_threshold: Decimal::from(threshold),
    })
}

proptest! {
    #[test]
    fn totals_add_up(lines in lines(), percent in -10i32..120, rules in rules()) {
        let totals = compute_totals(&lines, percent, &rules);

        prop_assert!(totals.total >= Decimal::ZERO);
        prop_assert!(totals.discount_total >= Decimal::ZERO);
        prop_assert!(totals.discount_total <= totals.subtotal);
        prop_assert_eq!(
            totals.total,
            totals.subtotal - totals.discount_total + totals.shipping_fee
        );
    }

    #[test]
    fn shipping_is_flat_or_free(lines in lines(), percent in 0i32..=100, rules in rules()) {
        let totals = compute_totals(&lines, percent, &rules);
        let has_items = lines.iter().any(|line| line.quantity > 0);
        let after_discount = totals.subtotal - totals.discount_total;

        if !has_items {
            prop_assert_eq!(totals.shipping_fee, Decimal::ZERO);
        } else if rules.free_shipping_threshold > Decimal::ZERO
            && after_discount >= rules.free_shipping_threshold
        {
            prop_assert_eq!(totals.shipping_fee, Decimal::ZERO);
        } else {
            prop_assert_eq!(totals.shipping_fee, rules.flat_fee);
        }
    }

    #[test]
    fn discount_is_whole_and_monotonic(amount in price(), a in 0i32..=100, b in 0i32..=100) {
        let (low, high) = (a.min(b), a.max(b));
        let d_low = discount(amount, low);
        let d_high = discount(amount, high);

        prop_assert!(d_low <= d_high);
        prop_assert_eq!(d_high.fract(), Decimal::ZERO);
        prop_assert_eq!(discount(amount, 100), amount);
    }

    #[test]
    fn minor_units_match_whole_amounts(amount in 0i64..10_000_000_000) {
        prop_assert_eq!(to_minor_units(Decimal::from(amount)), amount);
    }

    #[test]
    fn app_trans_id_embeds_the_order(millis in 1_600_000_000_000i64..2_000_000_000_000) {
        let order_id = generate_id();
        let now = Utc.timestamp_millis_opt(millis).unwrap();
        let id = app_trans_id(&order_id, now);

        prop_assert_eq!(order_id_from_app_trans_id(&id), Some(order_id.as_str()));
        prop_assert!(id.len() <= 40);
    }

    #[test]
    fn mac_only_verifies_with_its_key(data in ".{0,200}", key in "[a-zA-Z0-9]{8,32}") {
        let signature = mac::sign(&key, &data);

        let wrong_key = format!("{}x", key);

        prop_assert!(mac::verify(&key, &data, &signature));
        prop_assert!(!mac::verify(&wrong_key, &data, &signature));
    }
}

#[test]
fn generated_ids_are_valid() {
    for _ in 0..1_000 {
        let id = generate_id();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(is_valid_id(&id));
    }
}
