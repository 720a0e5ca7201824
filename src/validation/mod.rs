//! Pure business-rule validators. Nothing in here touches the database.

pub mod machine;
pub mod quantities;
pub mod transitions;

pub use machine::validate_machine_availability;
pub use quantities::{validate_material_allocation_quantity, validate_production_quantities};
pub use transitions::{validate_transition, StatusTransitions};

use chrono::{DateTime, Utc};

use crate::errors::{DomainError, ErrorCode, RuleViolation};

/// Planned end must fall strictly after planned start.
pub fn validate_date_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), DomainError> {
    if end <= start {
        return Err(DomainError::WorkOrder(
            RuleViolation::new(
                ErrorCode::InvalidDateRange,
                "Planned end must be after planned start",
            )
            .with_detail("planned_start", start)
            .with_detail("planned_end", end),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn date_range_must_move_forward() {
        let start = Utc::now();
        assert!(validate_date_range(start, start + Duration::hours(1)).is_ok());
        assert_eq!(
            validate_date_range(start, start).unwrap_err().code(),
            ErrorCode::InvalidDateRange
        );
        assert_eq!(
            validate_date_range(start, start - Duration::days(1))
                .unwrap_err()
                .code(),
            ErrorCode::InvalidDateRange
        );
    }
}
