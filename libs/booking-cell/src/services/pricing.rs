// libs/booking-cell/src/services/pricing.rs
use tracing::debug;

use crate::models::{Discount, DiscountKind, Pricing, Service};

/// Fixed sales tax rate applied to every service.
pub const TAX_RATE: f64 = 0.18;

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Derive the full price breakdown for a selected service.
///
/// Deterministic and stateless: the same service and discount list always
/// produce the same figures, so re-running it on payment-step entry is safe.
pub fn compute_pricing(service: &Service, discounts: &[Discount]) -> Pricing {
    let subtotal = round_cents(service.price);
    let tax = round_cents(subtotal * TAX_RATE);

    let discount = round_cents(
        discounts
            .iter()
            .map(|d| match d.kind {
                DiscountKind::Percentage(percent) => subtotal * percent / 100.0,
                DiscountKind::FlatAmount(amount) => amount,
            })
            .sum(),
    );

    let total = round_cents((subtotal + tax - discount).max(0.0));

    debug!(
        "Priced service {}: subtotal {:.2}, tax {:.2}, discount {:.2}, total {:.2}",
        service.id, subtotal, tax, discount, total
    );

    Pricing {
        subtotal,
        tax,
        discount,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceCategory;
    use uuid::Uuid;

    fn service(price: f64) -> Service {
        Service {
            id: Uuid::new_v4(),
            name: "Consulta de medicina general".to_string(),
            category: ServiceCategory::GeneralMedicine,
            duration_minutes: 30,
            price,
            available: true,
        }
    }

    #[test]
    fn test_eighty_sol_service_prices_at_94_40() {
        let pricing = compute_pricing(&service(80.0), &[]);
        assert_eq!(pricing.subtotal, 80.0);
        assert_eq!(pricing.tax, 14.4);
        assert_eq!(pricing.discount, 0.0);
        assert_eq!(pricing.total, 94.4);
    }

    #[test]
    fn test_tax_is_rounded_to_cents() {
        let pricing = compute_pricing(&service(33.33), &[]);
        assert_eq!(pricing.tax, 6.0); // 5.9994 rounds up
        assert_eq!(pricing.total, 39.33);
    }

    #[test]
    fn test_percentage_and_flat_discounts_combine() {
        let discounts = vec![
            Discount {
                label: "Seguro 10%".to_string(),
                kind: DiscountKind::Percentage(10.0),
            },
            Discount {
                label: "Campaña".to_string(),
                kind: DiscountKind::FlatAmount(5.0),
            },
        ];
        let pricing = compute_pricing(&service(100.0), &discounts);
        assert_eq!(pricing.discount, 15.0);
        assert_eq!(pricing.total, 103.0);
    }

    #[test]
    fn test_total_clamps_at_zero() {
        let discounts = vec![Discount {
            label: "Cortesía".to_string(),
            kind: DiscountKind::FlatAmount(500.0),
        }];
        let pricing = compute_pricing(&service(80.0), &discounts);
        assert_eq!(pricing.total, 0.0);
    }

    #[test]
    fn test_same_inputs_same_output() {
        let svc = service(95.5);
        let first = compute_pricing(&svc, &[]);
        let second = compute_pricing(&svc, &[]);
        assert_eq!(first, second);
    }
}
