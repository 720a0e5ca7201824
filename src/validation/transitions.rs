use crate::entities::{SalesOrderStatus, SubWorkOrderStatus, WorkOrderStatus};
use crate::errors::{DomainError, ErrorCode, RuleViolation};
use std::fmt::Display;

/// A status enum with a static transition table.
pub trait StatusTransitions: Copy + Eq + Display + 'static {
    /// Entity name used in error messages and details.
    const ENTITY: &'static str;

    fn allowed_transitions(self) -> &'static [Self];

    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl StatusTransitions for WorkOrderStatus {
    const ENTITY: &'static str = "work_order";

    fn allowed_transitions(self) -> &'static [Self] {
        use WorkOrderStatus::*;
        match self {
            Draft => &[Planned, Cancelled],
            Planned => &[Released, Cancelled, OnHold],
            Released => &[InProgress, OnHold, Cancelled],
            InProgress => &[Completed, OnHold, Cancelled],
            OnHold => &[Released, Cancelled],
            Completed | Cancelled | Delayed => &[],
        }
    }
}

impl StatusTransitions for SubWorkOrderStatus {
    const ENTITY: &'static str = "sub_work_order";

    fn allowed_transitions(self) -> &'static [Self] {
        use SubWorkOrderStatus::*;
        match self {
            Pending => &[InProgress, Cancelled],
            InProgress => &[Completed, OnHold, Cancelled],
            OnHold => &[InProgress, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

impl StatusTransitions for SalesOrderStatus {
    const ENTITY: &'static str = "sales_order";

    fn allowed_transitions(self) -> &'static [Self] {
        use SalesOrderStatus::*;
        match self {
            Draft => &[Confirmed, Cancelled],
            Confirmed => &[Shipped, Cancelled],
            Shipped | Cancelled => &[],
        }
    }
}

/// Checks `from -> to` against the table. Pure; no side effects.
pub fn validate_transition<S: StatusTransitions>(from: S, to: S) -> Result<(), DomainError> {
    if from.can_transition_to(to) {
        return Ok(());
    }

    let allowed: Vec<String> = from
        .allowed_transitions()
        .iter()
        .map(ToString::to_string)
        .collect();

    Err(DomainError::WorkOrder(
        RuleViolation::new(
            ErrorCode::InvalidStatusTransition,
            format!("Invalid status transition from {} to {}", from, to),
        )
        .with_detail("entity", S::ENTITY)
        .with_detail("from", from.to_string())
        .with_detail("to", to.to_string())
        .with_detail("allowed", allowed),
    ))
}
