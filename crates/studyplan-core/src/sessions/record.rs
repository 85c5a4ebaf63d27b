use chrono::{DateTime, Duration, TimeZone};
use serde::{Deserialize, Serialize};

/// A completed study session, as stored locally and posted to the backend.
///
/// Field names on the wire follow the backend's `/sessoes` schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySessionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "disciplina_id")]
    pub discipline_id: String,
    /// `YYYY-MM-DD`
    #[serde(rename = "data")]
    pub date: String,
    /// `HH:MM`
    #[serde(rename = "hora_inicio")]
    pub start_time: String,
    /// `HH:MM`
    #[serde(rename = "hora_fim")]
    pub end_time: String,
    #[serde(rename = "duracao_minutos")]
    pub duration_minutes: u64,
    #[serde(rename = "topico", default)]
    pub topic: Option<String>,
    #[serde(rename = "notas", default)]
    pub notes: Option<String>,
    #[serde(rename = "concluido", default)]
    pub completed: bool,
}

impl StudySessionRecord {
    /// Build the record for a study phase of `duration_secs` that finished at
    /// `completed_at`. Date and times are rendered in `completed_at`'s zone.
    pub fn from_completion<Tz: TimeZone>(
        discipline_id: &str,
        topic: Option<String>,
        duration_secs: u64,
        completed_at: DateTime<Tz>,
    ) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        // Lengths chrono cannot represent start at the completion time.
        let started_at = i64::try_from(duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| completed_at.clone().checked_sub_signed(d))
            .unwrap_or_else(|| completed_at.clone());
        Self {
            id: None,
            discipline_id: discipline_id.to_string(),
            date: completed_at.format("%Y-%m-%d").to_string(),
            start_time: started_at.format("%H:%M").to_string(),
            end_time: completed_at.format("%H:%M").to_string(),
            duration_minutes: duration_secs / 60,
            topic: topic.filter(|t| !t.trim().is_empty()),
            notes: None,
            completed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn from_completion_backdates_start() {
        let end = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap();
        let record =
            StudySessionRecord::from_completion("21002", Some("Matrices".into()), 1500, end);
        assert_eq!(record.date, "2025-03-14");
        assert_eq!(record.start_time, "10:05");
        assert_eq!(record.end_time, "10:30");
        assert_eq!(record.duration_minutes, 25);
        assert_eq!(record.topic.as_deref(), Some("Matrices"));
        assert!(record.completed);
    }

    #[test]
    fn huge_duration_does_not_panic() {
        let end = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap();
        let record = StudySessionRecord::from_completion("21002", None, u64::MAX, end);
        assert_eq!(record.start_time, "10:30");
        assert_eq!(record.end_time, "10:30");
        assert_eq!(record.duration_minutes, u64::MAX / 60);
    }

    #[test]
    fn blank_topic_is_dropped() {
        let end = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap();
        let record = StudySessionRecord::from_completion("21002", Some("  ".into()), 1500, end);
        assert!(record.topic.is_none());
    }

    #[test]
    fn serializes_backend_field_names() {
        let end = Utc.with_ymd_and_hms(2025, 3, 14, 0, 10, 0).unwrap();
        let record = StudySessionRecord::from_completion("21002", None, 1500, end);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["disciplina_id"], "21002");
        assert_eq!(json["data"], "2025-03-14");
        assert_eq!(json["hora_inicio"], "23:45");
        assert_eq!(json["duracao_minutos"], 25);
        assert_eq!(json["concluido"], true);
        assert!(json.get("id").is_none());
    }
}
