use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::{Client, Entry, Project, ProjectId, UserId};

#[derive(Debug, Clone)]
pub struct ProjectTotals {
    pub project: Project,
    pub client_name: Option<String>,
    pub total_minutes: i64,
    pub user_minutes: i64,
}

/// Minutes per project name. Restricting to `owner` skips everybody else's entries.
///
/// Projects are keyed by name, so two projects sharing a name are summed together.
pub fn time_spent(
    entries: &[Entry],
    projects: &[Project],
    owner: Option<UserId>,
    now: DateTime<Utc>,
) -> HashMap<String, i64> {
    let project_names: HashMap<ProjectId, &str> = projects
        .iter()
        .map(|project| (project.id, project.name.as_str()))
        .collect();

    let mut summary: HashMap<String, i64> = HashMap::new();
    for entry in entries {
        if owner.is_some() && entry.owner != owner {
            continue;
        }
        let Some(name) = project_names.get(&entry.project) else {
            continue;
        };
        *summary.entry((*name).to_string()).or_insert(0) += entry.duration_at(now);
    }
    summary
}

/// Annotates `listing` with the global total and the total for `user`.
pub fn project_totals(
    listing: &[&Project],
    clients: &[Client],
    projects: &[Project],
    entries: &[Entry],
    user: UserId,
    now: DateTime<Utc>,
) -> Vec<ProjectTotals> {
    let totals = time_spent(entries, projects, None, now);
    let user_totals = time_spent(entries, projects, Some(user), now);

    listing
        .iter()
        .map(|project| {
            let client_name = project
                .client
                .and_then(|id| clients.iter().find(|client| client.id == id))
                .map(|client| client.name.clone());
            ProjectTotals {
                project: (*project).clone(),
                client_name,
                total_minutes: *totals.get(&project.name).unwrap_or(&0),
                user_minutes: *user_totals.get(&project.name).unwrap_or(&0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, 12, 0, 0).unwrap()
    }

    fn project(id: u64, name: &str, owner: u64) -> Project {
        Project {
            id,
            name: name.to_string(),
            client: None,
            owner: Some(owner),
        }
    }

    fn entry(id: u64, project: u64, minutes: i64, owner: u64) -> Entry {
        let start = Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap();
        Entry {
            id,
            start,
            stop: Some(start + Duration::minutes(minutes)),
            project,
            description: "Work".to_string(),
            owner: Some(owner),
        }
    }

    #[test]
    fn sums_minutes_per_project_name() {
        let projects = vec![project(1, "P", 1)];
        let entries = vec![entry(1, 1, 5, 1), entry(2, 1, 7, 2)];

        let global = time_spent(&entries, &projects, None, now());
        let mine = time_spent(&entries, &projects, Some(1), now());

        assert_eq!(global.get("P"), Some(&12));
        assert_eq!(mine.get("P"), Some(&5));
    }

    #[test]
    fn running_entries_count_until_now() {
        let projects = vec![project(1, "P", 1)];
        let mut running = entry(1, 1, 0, 1);
        running.stop = None;

        let totals = time_spent(&[running], &projects, None, now());
        assert_eq!(totals.get("P"), Some(&180));
    }

    #[test]
    fn projects_without_entries_total_zero() {
        let projects = vec![project(1, "P", 1), project(2, "Idle", 1)];
        let entries = vec![entry(1, 1, 30, 1)];
        let listing: Vec<&Project> = projects.iter().collect();

        let rows = project_totals(&listing, &[], &projects, &entries, 1, now());
        let idle = rows.iter().find(|row| row.project.name == "Idle").unwrap();
        assert_eq!(idle.total_minutes, 0);
        assert_eq!(idle.user_minutes, 0);
    }

    #[test]
    fn distinct_projects_sharing_a_name_are_merged() {
        // Totals are keyed by name, not id: both "Shared" rows report 10 + 20.
        let projects = vec![project(1, "Shared", 1), project(2, "Shared", 2)];
        let entries = vec![entry(1, 1, 10, 1), entry(2, 2, 20, 2)];
        let listing: Vec<&Project> = projects.iter().filter(|p| p.id == 1).collect();

        let rows = project_totals(&listing, &[], &projects, &entries, 1, now());
        assert_eq!(rows[0].total_minutes, 30);
        assert_eq!(rows[0].user_minutes, 10);
    }

    #[test]
    fn project_totals_resolve_client_names() {
        let clients = vec![Client {
            id: 4,
            name: "Acme".to_string(),
            owner: Some(1),
        }];
        let mut website = project(1, "Website", 1);
        website.client = Some(4);
        let projects = vec![website];
        let listing: Vec<&Project> = projects.iter().collect();

        let rows = project_totals(&listing, &clients, &projects, &[], 1, now());
        assert_eq!(rows[0].client_name.as_deref(), Some("Acme"));
    }
}
