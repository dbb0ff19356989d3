use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::dates::{input_value, parse_datetime};
use crate::models::{Client, ClientId, NAME_MAX_LEN, Project, ProjectId};

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

fn clean_name(field: &'static str, value: &str, errors: &mut FormErrors) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if value.chars().count() > NAME_MAX_LEN {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {NAME_MAX_LEN} characters (it has {}).",
                value.chars().count()
            ),
        );
    }
    value.to_string()
}

/// Parses a choice field against the ids the user may pick. Empty means "none".
fn clean_choice(
    field: &'static str,
    value: &str,
    allowed: impl IntoIterator<Item = u64>,
    errors: &mut FormErrors,
) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<u64>() {
        Ok(id) if allowed.into_iter().any(|allowed| allowed == id) => Some(id),
        _ => {
            errors.add(field, INVALID_CHOICE);
            None
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientForm {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientData {
    pub name: String,
}

impl ClientForm {
    pub fn validate(&self) -> Result<ClientData, FormErrors> {
        let mut errors = FormErrors::default();
        let name = clean_name("name", &self.name, &mut errors);
        errors.into_result(|| ClientData { name })
    }
}

impl From<&Client> for ClientForm {
    fn from(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub name: String,
    pub client: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectData {
    pub name: String,
    pub client: Option<ClientId>,
}

impl ProjectForm {
    /// `clients` is the acting user's own clients; anything else is rejected.
    pub fn validate(&self, clients: &[&Client]) -> Result<ProjectData, FormErrors> {
        let mut errors = FormErrors::default();
        let name = clean_name("name", &self.name, &mut errors);
        let client = clean_choice(
            "client",
            &self.client,
            clients.iter().map(|client| client.id),
            &mut errors,
        );
        errors.into_result(|| ProjectData { name, client })
    }

    pub fn selected_client(&self) -> Option<ClientId> {
        self.client.trim().parse().ok()
    }
}

impl From<&Project> for ProjectForm {
    fn from(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            client: project.client.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryForm {
    pub start: String,
    pub stop: String,
    pub project: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryData {
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    pub project: ProjectId,
    pub description: String,
}

impl EntryForm {
    /// Blank form with `start` prefilled, like the model default.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            start: input_value(&now),
            ..Self::default()
        }
    }

    /// `projects` is the acting user's own projects; `now` fills a blank `start`.
    pub fn validate(
        &self,
        projects: &[&Project],
        now: DateTime<Utc>,
    ) -> Result<EntryData, FormErrors> {
        let mut errors = FormErrors::default();

        let start = if self.start.trim().is_empty() {
            Some(now)
        } else {
            parse_datetime(&self.start)
                .map_err(|message| errors.add("start", message))
                .ok()
        };

        let stop = if self.stop.trim().is_empty() {
            None
        } else {
            parse_datetime(&self.stop)
                .map_err(|message| errors.add("stop", message))
                .ok()
        };

        if let (Some(start), Some(stop)) = (start, stop) {
            if stop < start {
                errors.add("stop", "Stop cannot be before start.");
            }
        }

        let project = if self.project.trim().is_empty() {
            errors.add("project", REQUIRED);
            None
        } else {
            clean_choice(
                "project",
                &self.project,
                projects.iter().map(|project| project.id),
                &mut errors,
            )
        };

        let description = clean_name("description", &self.description, &mut errors);

        match (start, project) {
            (Some(start), Some(project)) if errors.is_empty() => Ok(EntryData {
                start,
                stop,
                project,
                description,
            }),
            _ => Err(errors),
        }
    }

    pub fn selected_project(&self) -> Option<ProjectId> {
        self.project.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, 12, 0, 0).unwrap()
    }

    fn client(id: u64) -> Client {
        Client {
            id,
            name: format!("Client {id}"),
            owner: Some(1),
        }
    }

    fn project(id: u64) -> Project {
        Project {
            id,
            name: format!("Project {id}"),
            client: None,
            owner: Some(1),
        }
    }

    #[test]
    fn client_name_is_required_and_trimmed() {
        let blank = ClientForm {
            name: "   ".to_string(),
        };
        assert_eq!(blank.validate().unwrap_err().field("name"), [REQUIRED]);

        let padded = ClientForm {
            name: "  Acme ".to_string(),
        };
        assert_eq!(padded.validate().unwrap().name, "Acme");
    }

    #[test]
    fn client_name_length_is_capped() {
        let form = ClientForm {
            name: "x".repeat(NAME_MAX_LEN + 1),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.field("name")[0].contains("at most 200"));
    }

    #[test]
    fn project_client_is_optional() {
        let form = ProjectForm {
            name: "Website".to_string(),
            client: String::new(),
        };
        assert_eq!(form.validate(&[]).unwrap().client, None);
    }

    #[test]
    fn project_client_outside_choices_is_rejected() {
        let own = client(1);
        let form = ProjectForm {
            name: "Website".to_string(),
            client: "2".to_string(),
        };
        let errors = form.validate(&[&own]).unwrap_err();
        assert_eq!(errors.field("client"), [INVALID_CHOICE]);

        let form = ProjectForm {
            client: "1".to_string(),
            ..form
        };
        assert_eq!(form.validate(&[&own]).unwrap().client, Some(1));
    }

    #[test]
    fn entry_start_defaults_to_now() {
        let own = project(3);
        let form = EntryForm {
            project: "3".to_string(),
            description: "Standup".to_string(),
            ..EntryForm::default()
        };
        let data = form.validate(&[&own], now()).unwrap();
        assert_eq!(data.start, now());
        assert_eq!(data.stop, None);
        assert_eq!(data.project, 3);
    }

    #[test]
    fn entry_requires_project_and_description() {
        let errors = EntryForm::default().validate(&[], now()).unwrap_err();
        assert_eq!(errors.field("project"), [REQUIRED]);
        assert_eq!(errors.field("description"), [REQUIRED]);
        assert!(errors.field("start").is_empty());
    }

    #[test]
    fn entry_rejects_foreign_project() {
        let own = project(3);
        let form = EntryForm {
            project: "4".to_string(),
            description: "Standup".to_string(),
            ..EntryForm::default()
        };
        let errors = form.validate(&[&own], now()).unwrap_err();
        assert_eq!(errors.field("project"), [INVALID_CHOICE]);
    }

    #[test]
    fn entry_stop_must_follow_start() {
        let own = project(3);
        let form = EntryForm {
            start: "2026-02-03T10:00:00Z".to_string(),
            stop: "2026-02-03T09:00:00Z".to_string(),
            project: "3".to_string(),
            description: "Standup".to_string(),
        };
        let errors = form.validate(&[&own], now()).unwrap_err();
        assert_eq!(errors.field("stop").len(), 1);

        let form = EntryForm {
            stop: "2026-02-03T10:30:00Z".to_string(),
            ..form
        };
        let data = form.validate(&[&own], now()).unwrap();
        assert_eq!(data.stop, Some(data.start + Duration::minutes(30)));
    }

    #[test]
    fn entry_reports_unparseable_start() {
        let own = project(3);
        let form = EntryForm {
            start: "yesterday".to_string(),
            project: "3".to_string(),
            description: "Standup".to_string(),
            ..EntryForm::default()
        };
        let errors = form.validate(&[&own], now()).unwrap_err();
        assert_eq!(errors.field("start").len(), 1);
    }
}
