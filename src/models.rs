use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type ClientId = u64;
pub type ProjectId = u64;
pub type EntryId = u64;

pub const NAME_MAX_LEN: usize = 200;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Argon2 PHC string.
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub owner: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub client: Option<ClientId>,
    pub owner: Option<UserId>,
}

impl Project {
    /// Label used in choice lists, e.g. `<Acme> Website`.
    pub fn label(&self, client: Option<&Client>) -> String {
        match client {
            Some(client) => format!("<{}> {}", client.name, self.name),
            None => format!("<None> {}", self.name),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub stop: Option<DateTime<Utc>>,
    pub project: ProjectId,
    pub description: String,
    pub owner: Option<UserId>,
}

impl Entry {
    pub fn is_finished(&self) -> bool {
        self.stop.is_some()
    }

    /// Whole minutes between `start` and `stop`, or `now` while the entry is running.
    pub fn duration_at(&self, now: DateTime<Utc>) -> i64 {
        let stop = self.stop.unwrap_or(now);
        (stop - self.start).num_seconds().div_euclid(60)
    }
}

pub trait Owned {
    fn owner(&self) -> Option<UserId>;
}

impl Owned for Client {
    fn owner(&self) -> Option<UserId> {
        self.owner
    }
}

impl Owned for Project {
    fn owner(&self) -> Option<UserId> {
        self.owner
    }
}

impl Owned for Entry {
    fn owner(&self) -> Option<UserId> {
        self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry(start: DateTime<Utc>, stop: Option<DateTime<Utc>>) -> Entry {
        Entry {
            id: 1,
            start,
            stop,
            project: 1,
            description: "Ticket 1".to_string(),
            owner: Some(1),
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, 10, 0, 0).unwrap()
    }

    #[test]
    fn duration_floors_to_whole_minutes() {
        let ninety = entry(start(), Some(start() + Duration::seconds(90)));
        let two_minutes = entry(start(), Some(start() + Duration::seconds(120)));
        let later = start() + Duration::days(1);
        assert_eq!(ninety.duration_at(later), 1);
        assert_eq!(two_minutes.duration_at(later), 2);
    }

    #[test]
    fn running_entry_is_measured_against_now() {
        let running = entry(start(), None);
        let now = start() + Duration::minutes(45) + Duration::seconds(59);
        assert_eq!(running.duration_at(now), 45);
    }

    #[test]
    fn stop_before_start_floors_downwards() {
        let inverted = entry(start(), Some(start() - Duration::seconds(30)));
        assert_eq!(inverted.duration_at(start()), -1);
    }

    #[test]
    fn is_finished_tracks_stop() {
        let mut value = entry(start(), None);
        assert!(!value.is_finished());
        value.stop = Some(start() + Duration::minutes(5));
        assert!(value.is_finished());
    }

    #[test]
    fn project_label_includes_client() {
        let client = Client {
            id: 1,
            name: "Acme".to_string(),
            owner: Some(1),
        };
        let project = Project {
            id: 1,
            name: "Website".to_string(),
            client: Some(1),
            owner: Some(1),
        };
        assert_eq!(project.label(Some(&client)), "<Acme> Website");
        assert_eq!(project.label(None), "<None> Website");
    }
}
