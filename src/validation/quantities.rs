use rust_decimal::Decimal;

use crate::errors::{DomainError, ErrorCode, RuleViolation};

/// `allocated` may equal but never exceed `required`; neither may be negative.
pub fn validate_material_allocation_quantity(
    required: Decimal,
    allocated: Decimal,
) -> Result<(), DomainError> {
    if required < Decimal::ZERO || allocated < Decimal::ZERO {
        return Err(DomainError::MaterialAllocation(
            RuleViolation::new(
                ErrorCode::NegativeQuantity,
                "Material quantities cannot be negative",
            )
            .with_detail("required_quantity", required)
            .with_detail("allocated_quantity", allocated),
        ));
    }

    if allocated > required {
        return Err(DomainError::MaterialAllocation(
            RuleViolation::new(
                ErrorCode::AllocationExceeded,
                format!(
                    "Allocated quantity {} exceeds required quantity {}",
                    allocated, required
                ),
            )
            .with_detail("required_quantity", required)
            .with_detail("allocated_quantity", allocated),
        ));
    }

    Ok(())
}

/// Good and scrapped output are non-negative and together stay within `max`.
pub fn validate_production_quantities(
    good: Decimal,
    scrapped: Decimal,
    max: Option<Decimal>,
) -> Result<(), DomainError> {
    if good < Decimal::ZERO {
        return Err(DomainError::Production(
            RuleViolation::new(
                ErrorCode::NegativeGoodQuantity,
                "Good quantity cannot be negative",
            )
            .with_detail("good_quantity", good),
        ));
    }

    if scrapped < Decimal::ZERO {
        return Err(DomainError::Production(
            RuleViolation::new(
                ErrorCode::NegativeScrappedQuantity,
                "Scrapped quantity cannot be negative",
            )
            .with_detail("scrapped_quantity", scrapped),
        ));
    }

    if let Some(max) = max {
        let total = good + scrapped;
        if total > max {
            return Err(DomainError::Production(
                RuleViolation::new(
                    ErrorCode::OutputExceedsOrder,
                    format!(
                        "Total output {} (good {} + scrapped {}) exceeds ordered quantity {}",
                        total, good, scrapped, max
                    ),
                )
                .with_detail("good_quantity", good)
                .with_detail("scrapped_quantity", scrapped)
                .with_detail("max_quantity", max),
            ));
        }
    }

    Ok(())
}
