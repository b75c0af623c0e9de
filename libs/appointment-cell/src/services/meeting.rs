use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

use shared_config::AppConfig;

use crate::models::Appointment;

pub trait MeetingLinkGenerator: Send + Sync {
    fn generate(&self, appointment: &Appointment, now: DateTime<Utc>) -> String;
}

/// Jitsi-style room links: `{base}/consulta-{unix_ts}-{6 alphanumerics}`.
pub struct JitsiMeetingLinks {
    base_url: String,
}

impl JitsiMeetingLinks {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.meeting_base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl MeetingLinkGenerator for JitsiMeetingLinks {
    fn generate(&self, _appointment: &Appointment, now: DateTime<Utc>) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        format!("{}/consulta-{}-{}", self.base_url, now.timestamp(), suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use schedule_cell::models::ProfessionalType;
    use shared_utils::test_utils::TestConfig;
    use uuid::Uuid;

    use crate::models::AppointmentStatus;

    #[test]
    fn link_has_room_prefix_timestamp_and_suffix() {
        let links = JitsiMeetingLinks::new(&TestConfig::default().to_app_config());
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            professional_type: ProfessionalType::Psychologist,
            patient_id: Uuid::new_v4(),
            scheduled_at: now,
            status: AppointmentStatus::Pending,
            notes: None,
            meeting_link: None,
            payment_reference: None,
            platform_fee_cents: None,
            professional_amount_cents: None,
            created_at: now,
            updated_at: now,
        };

        let link = links.generate(&appointment, now);
        let prefix = format!("https://meet.example.test/consulta-{}-", now.timestamp());
        assert!(link.starts_with(&prefix));

        let suffix = &link[prefix.len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
