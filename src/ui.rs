use maud::{DOCTYPE, Markup, html};

use crate::app::EntryRow;
use crate::auth::Identity;
use crate::dates::format_datetime;
use crate::forms::{ClientForm, EntryForm, FormErrors, ProjectForm};
use crate::grouping::ProjectTotals;
use crate::models::{Client, Project};

fn layout(title: &str, user: Option<&Identity>, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (title) " | Time Tracker" }
            }
            body {
                @if let Some(user) = user {
                    nav {
                        a href="/clients/" { "Clients" } " | "
                        a href="/projects/" { "Projects" } " | "
                        a href="/entries/" { "Entries" } " | "
                        span { "Signed in as " (user.username) } " "
                        form method="post" action="/logout/" style="display:inline" {
                            button type="submit" { "Log out" }
                        }
                    }
                }
                h1 { (title) }
                (body)
            }
        }
    }
}

fn field_errors(errors: &FormErrors, field: &str) -> Markup {
    html! {
        @let messages = errors.field(field);
        @if !messages.is_empty() {
            ul class="errorlist" {
                @for message in messages {
                    li { (message) }
                }
            }
        }
    }
}

fn client_fields(form: &ClientForm, errors: &FormErrors) -> Markup {
    html! {
        (field_errors(errors, "name"))
        label for="id_name" { "Name:" }
        input type="text" id="id_name" name="name" maxlength="200" required value=(form.name);
    }
}

fn client_select(form: &ProjectForm, clients: &[Client]) -> Markup {
    let selected = form.selected_client();
    html! {
        label for="id_client" { "Client:" }
        select id="id_client" name="client" {
            option value="" selected[selected.is_none()] { "---------" }
            @for client in clients {
                option value=(client.id) selected[selected == Some(client.id)] { (client.name) }
            }
        }
    }
}

fn project_fields(form: &ProjectForm, errors: &FormErrors, clients: &[Client]) -> Markup {
    html! {
        (field_errors(errors, "client"))
        (client_select(form, clients))
        (field_errors(errors, "name"))
        label for="id_name" { "Name:" }
        input type="text" id="id_name" name="name" maxlength="200" required value=(form.name);
    }
}

pub fn clients_page(
    user: &Identity,
    form: &ClientForm,
    errors: &FormErrors,
    clients: &[Client],
) -> Markup {
    layout(
        "Clients",
        Some(user),
        html! {
            form method="post" action="/clients/" {
                (client_fields(form, errors))
                button type="submit" { "Add client" }
            }
            @if clients.is_empty() {
                p { "No clients yet." }
            } @else {
                ul id="client-list" {
                    @for client in clients {
                        li { a href={ "/clients/" (client.id) "/" } { (client.name) } }
                    }
                }
            }
        },
    )
}

pub fn client_detail_page(
    user: &Identity,
    client: &Client,
    form: &ClientForm,
    errors: &FormErrors,
) -> Markup {
    layout(
        &client.name,
        Some(user),
        html! {
            form method="post" action={ "/clients/" (client.id) "/" } {
                (client_fields(form, errors))
                button type="submit" { "Save" }
            }
            a href="/clients/" { "Back to clients" }
        },
    )
}

pub fn projects_page(
    user: &Identity,
    form: &ProjectForm,
    errors: &FormErrors,
    rows: &[ProjectTotals],
    clients: &[Client],
) -> Markup {
    layout(
        "Projects",
        Some(user),
        html! {
            form method="post" action="/projects/" {
                (project_fields(form, errors, clients))
                button type="submit" { "Add project" }
            }
            @if rows.is_empty() {
                p { "No projects yet." }
            } @else {
                table id="project-list" {
                    thead {
                        tr {
                            th { "Client" }
                            th { "Project" }
                            th { "Total (min)" }
                            th { "Yours (min)" }
                        }
                    }
                    tbody {
                        @for row in rows {
                            tr {
                                td { (row.client_name.as_deref().unwrap_or("None")) }
                                td {
                                    a href={ "/projects/" (row.project.id) "/" } { (row.project.name) }
                                }
                                td class="total" { (row.total_minutes) }
                                td class="user-total" { (row.user_minutes) }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn project_detail_page(
    user: &Identity,
    project: &Project,
    form: &ProjectForm,
    errors: &FormErrors,
    clients: &[Client],
) -> Markup {
    layout(
        &project.name,
        Some(user),
        html! {
            form method="post" action={ "/projects/" (project.id) "/" } {
                (project_fields(form, errors, clients))
                button type="submit" { "Save" }
            }
            a href="/projects/" { "Back to projects" }
        },
    )
}

pub fn entries_page(
    user: &Identity,
    form: &EntryForm,
    errors: &FormErrors,
    rows: &[EntryRow],
    projects: &[(Project, String)],
) -> Markup {
    let selected = form.selected_project();
    layout(
        "Entries",
        Some(user),
        html! {
            form method="post" action="/entries/" {
                (field_errors(errors, "start"))
                label for="id_start" { "Start:" }
                input type="datetime-local" id="id_start" name="start" value=(form.start);
                (field_errors(errors, "stop"))
                label for="id_stop" { "Stop:" }
                input type="datetime-local" id="id_stop" name="stop" value=(form.stop);
                (field_errors(errors, "project"))
                label for="id_project" { "Project:" }
                select id="id_project" name="project" required {
                    option value="" selected[selected.is_none()] { "---------" }
                    @for (project, label) in projects {
                        option value=(project.id) selected[selected == Some(project.id)] { (label) }
                    }
                }
                (field_errors(errors, "description"))
                label for="id_description" { "Description:" }
                input type="text" id="id_description" name="description" maxlength="200" required value=(form.description);
                button type="submit" { "Add entry" }
            }
            @if rows.is_empty() {
                p { "No entries yet." }
            } @else {
                table id="entry-list" {
                    thead {
                        tr {
                            th { "Start" }
                            th { "Stop" }
                            th { "Project" }
                            th { "Description" }
                            th { "Duration (min)" }
                        }
                    }
                    tbody {
                        @for row in rows {
                            tr class=(if row.entry.is_finished() { "finished" } else { "running" }) {
                                td { (format_datetime(&row.entry.start)) }
                                td {
                                    @match &row.entry.stop {
                                        Some(stop) => { (format_datetime(stop)) }
                                        None => { "running" }
                                    }
                                }
                                td { (row.project_name) }
                                td { (row.entry.description) }
                                td { (row.duration) }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn login_page(username: &str, next: &str, failed: bool) -> Markup {
    layout(
        "Log in",
        None,
        html! {
            @if failed {
                p class="errornote" {
                    "Please enter a correct username and password. Note that both fields may be case-sensitive."
                }
            }
            form method="post" action="/accounts/login/" {
                label for="id_username" { "Username:" }
                input type="text" id="id_username" name="username" required autofocus value=(username);
                label for="id_password" { "Password:" }
                input type="password" id="id_password" name="password" required;
                input type="hidden" name="next" value=(next);
                button type="submit" { "Log in" }
            }
        },
    )
}

pub fn logged_out_page() -> Markup {
    layout(
        "Logged out",
        None,
        html! {
            p { "You have been logged out." }
            a href="/accounts/login/" { "Log in again" }
        },
    )
}

pub fn not_found() -> Markup {
    layout(
        "Not found",
        None,
        html! { p { "The requested page could not be found." } },
    )
}

pub fn server_error() -> Markup {
    layout(
        "Server error",
        None,
        html! { p { "Something went wrong. Your changes were not saved." } },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity {
            id: 1,
            username: "alice".to_string(),
        }
    }

    #[test]
    fn clients_page_escapes_names() {
        let clients = vec![Client {
            id: 1,
            name: "<script>".to_string(),
            owner: Some(1),
        }];
        let page = clients_page(&alice(), &ClientForm::default(), &FormErrors::default(), &clients)
            .into_string();
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains(r#"href="/clients/1/""#));
    }

    #[test]
    fn field_errors_are_rendered() {
        let mut errors = FormErrors::default();
        errors.add("name", "This field is required.");
        let page = clients_page(&alice(), &ClientForm::default(), &errors, &[]).into_string();
        assert!(page.contains("errorlist"));
        assert!(page.contains("This field is required."));
    }

    #[test]
    fn project_select_marks_current_client() {
        let clients = vec![
            Client {
                id: 1,
                name: "Acme".to_string(),
                owner: Some(1),
            },
            Client {
                id: 2,
                name: "Globex".to_string(),
                owner: Some(1),
            },
        ];
        let form = ProjectForm {
            name: "Website".to_string(),
            client: "2".to_string(),
        };
        let page = client_select(&form, &clients).into_string();
        assert!(page.contains(r#"<option value="2" selected>Globex</option>"#));
        assert!(page.contains(r#"<option value="1">Acme</option>"#));
    }
}
