use chrono::NaiveDate;

use crate::entities::{machine, MachineStatus};
use crate::errors::{DomainError, ErrorCode, RuleViolation};

/// Decides whether `machine` can take work on `today`.
///
/// Order matters: maintenance wins over every other field, then
/// inactive/retired, then broken, then an overdue maintenance date.
pub fn validate_machine_availability(
    machine: &machine::Model,
    today: NaiveDate,
) -> Result<(), DomainError> {
    let violation = |code: ErrorCode, message: String| {
        DomainError::Machine(
            RuleViolation::new(code, message)
                .with_detail("machine_id", machine.id)
                .with_detail("machine_code", &machine.code)
                .with_detail("status", machine.status.to_string()),
        )
    };

    if machine.status == MachineStatus::Maintenance {
        return Err(violation(
            ErrorCode::MachineMaintenance,
            format!("Machine {} is under maintenance", machine.code),
        ));
    }

    if !machine.is_active || machine.status == MachineStatus::Retired {
        return Err(violation(
            ErrorCode::MachineInactive,
            format!("Machine {} is not active", machine.code),
        ));
    }

    if machine.status == MachineStatus::Broken {
        return Err(violation(
            ErrorCode::MachineBroken,
            format!("Machine {} is broken", machine.code),
        ));
    }

    if machine.is_maintenance_overdue(today) {
        let due = machine.next_maintenance_date;
        return Err(DomainError::Machine(
            RuleViolation::new(
                ErrorCode::MachineMaintenanceOverdue,
                format!("Machine {} is overdue for maintenance", machine.code),
            )
            .with_detail("machine_id", machine.id)
            .with_detail("machine_code", &machine.code)
            .with_detail("next_maintenance_date", due),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::Iterable;
    use test_case::test_case;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn machine(status: MachineStatus, is_active: bool, next: Option<NaiveDate>) -> machine::Model {
        let now = Utc::now();
        machine::Model {
            id: Uuid::new_v4(),
            code: "CNC-01".into(),
            name: "Lathe".into(),
            department: None,
            status,
            is_active,
            maintenance_interval_days: Some(30),
            last_maintenance_date: None,
            next_maintenance_date: next,
            created_at: now,
            modified_at: now,
            created_by: "tester".into(),
            modified_by: "tester".into(),
        }
    }

    #[test]
    fn maintenance_always_wins() {
        let overdue = NaiveDate::from_ymd_opt(2026, 1, 1);
        for is_active in [true, false] {
            for next in [None, overdue] {
                let err = validate_machine_availability(
                    &machine(MachineStatus::Maintenance, is_active, next),
                    today(),
                )
                .unwrap_err();
                assert_eq!(err.code(), ErrorCode::MachineMaintenance);
            }
        }
    }

    #[test_case(MachineStatus::Available, false => ErrorCode::MachineInactive)]
    #[test_case(MachineStatus::Retired, true => ErrorCode::MachineInactive)]
    #[test_case(MachineStatus::Broken, true => ErrorCode::MachineBroken)]
    #[test_case(MachineStatus::Broken, false => ErrorCode::MachineInactive)]
    fn unavailable_statuses(status: MachineStatus, is_active: bool) -> ErrorCode {
        validate_machine_availability(&machine(status, is_active, None), today())
            .unwrap_err()
            .code()
    }

    #[test]
    fn overdue_maintenance_is_rejected() {
        let yesterday = today().pred_opt();
        let err = validate_machine_availability(
            &machine(MachineStatus::Available, true, yesterday),
            today(),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MachineMaintenanceOverdue);
    }

    #[test]
    fn due_today_is_still_usable() {
        for status in [MachineStatus::Available, MachineStatus::InUse] {
            assert!(validate_machine_availability(
                &machine(status, true, Some(today())),
                today()
            )
            .is_ok());
        }
    }

    #[test]
    fn every_status_has_a_decision() {
        for status in MachineStatus::iter() {
            let result = validate_machine_availability(&machine(status, true, None), today());
            let usable = matches!(status, MachineStatus::Available | MachineStatus::InUse);
            assert_eq!(result.is_ok(), usable, "{status}");
        }
    }
}
