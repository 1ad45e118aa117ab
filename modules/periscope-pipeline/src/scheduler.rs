//! Computes the next due instant for recurring jobs.

use chrono::{DateTime, Duration, Months, Utc};

use periscope_common::{ExecutionMode, Job, ScheduleType};

/// Next due instant for a job after an attempt at `now`, or `None` for jobs
/// that only run by hand. Monthly and annual schedules are calendar-aware:
/// scheduling from Jan 31 lands on the last day of February, not on a fixed
/// +30d offset.
pub fn next_run_at(job: &Job, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if job.execution_mode == ExecutionMode::Manual {
        return None;
    }
    match job.schedule {
        ScheduleType::Manual => None,
        ScheduleType::Daily => Some(now + Duration::hours(24)),
        ScheduleType::Weekly => Some(now + Duration::days(7)),
        ScheduleType::Monthly => now.checked_add_months(Months::new(1)),
        ScheduleType::Annually => now.checked_add_months(Months::new(12)),
        ScheduleType::Custom => Some(now + Duration::days(job.interval_days.unwrap_or(7))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use periscope_common::{DeliveryMethod, GeoFocus, ReportFormat, ResearchDepth};
    use uuid::Uuid;

    fn make_job(schedule: ScheduleType, mode: ExecutionMode) -> Job {
        Job {
            id: Uuid::new_v4(),
            description: "test".to_string(),
            enhanced_description: None,
            industry: None,
            depth: ResearchDepth::Standard,
            source_types: vec![],
            geo_focus: GeoFocus::Global,
            country: None,
            custom_sites: vec![],
            report_format: ReportFormat::Markdown,
            delivery: DeliveryMethod::None,
            delivery_email: None,
            schedule,
            interval_days: None,
            execution_mode: mode,
            active: true,
            last_run_at: None,
            next_run_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn manual_schedule_never_produces_next_run() {
        let job = make_job(ScheduleType::Manual, ExecutionMode::Automatic);
        assert_eq!(next_run_at(&job, Utc::now()), None);
    }

    #[test]
    fn manual_execution_mode_never_produces_next_run() {
        let job = make_job(ScheduleType::Daily, ExecutionMode::Manual);
        assert_eq!(next_run_at(&job, Utc::now()), None);
    }

    #[test]
    fn daily_and_weekly_offsets() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap();

        let job = make_job(ScheduleType::Daily, ExecutionMode::Automatic);
        assert_eq!(next_run_at(&job, now), Some(now + Duration::hours(24)));

        let job = make_job(ScheduleType::Weekly, ExecutionMode::Automatic);
        assert_eq!(next_run_at(&job, now), Some(now + Duration::days(7)));
    }

    #[test]
    fn monthly_preserves_calendar_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 8, 0, 0).unwrap();
        let job = make_job(ScheduleType::Monthly, ExecutionMode::Automatic);
        assert_eq!(
            next_run_at(&job, now),
            Some(Utc.with_ymd_and_hms(2025, 4, 15, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn monthly_from_jan_31_clamps_to_end_of_february() {
        let job = make_job(ScheduleType::Monthly, ExecutionMode::Automatic);

        let now = Utc.with_ymd_and_hms(2025, 1, 31, 6, 0, 0).unwrap();
        assert_eq!(
            next_run_at(&job, now),
            Some(Utc.with_ymd_and_hms(2025, 2, 28, 6, 0, 0).unwrap())
        );

        // Leap year keeps the 29th.
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 6, 0, 0).unwrap();
        assert_eq!(
            next_run_at(&job, now),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 6, 0, 0).unwrap())
        );
    }

    #[test]
    fn annually_preserves_calendar_date() {
        let now = Utc.with_ymd_and_hms(2025, 7, 4, 12, 0, 0).unwrap();
        let job = make_job(ScheduleType::Annually, ExecutionMode::Automatic);
        assert_eq!(
            next_run_at(&job, now),
            Some(Utc.with_ymd_and_hms(2026, 7, 4, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn custom_interval_defaults_to_seven_days() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();

        let mut job = make_job(ScheduleType::Custom, ExecutionMode::Automatic);
        assert_eq!(next_run_at(&job, now), Some(now + Duration::days(7)));

        job.interval_days = Some(3);
        assert_eq!(next_run_at(&job, now), Some(now + Duration::days(3)));
    }

    #[test]
    fn next_run_is_strictly_later_than_now() {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
        for schedule in [
            ScheduleType::Daily,
            ScheduleType::Weekly,
            ScheduleType::Monthly,
            ScheduleType::Annually,
            ScheduleType::Custom,
        ] {
            let job = make_job(schedule, ExecutionMode::Automatic);
            let next = next_run_at(&job, now).unwrap();
            assert!(next > now, "{schedule:?} produced {next} not after {now}");
        }
    }
}
