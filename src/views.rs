use axum::Form;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::Utc;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::app::AppState;
use crate::auth::{
    CurrentUser, DEFAULT_NEXT, LOGIN_URL, MaybeUser, end_session, safe_next, start_session,
};
use crate::error::AppError;
use crate::forms::{ClientForm, EntryForm, FormErrors, ProjectForm};
use crate::ui;

fn parse_id(raw: &str) -> Result<u64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

fn page(markup: maud::Markup) -> Html<String> {
    Html(markup.into_string())
}

pub async fn root(MaybeUser(user): MaybeUser) -> Redirect {
    match user {
        Some(_) => Redirect::to(DEFAULT_NEXT),
        None => Redirect::to(LOGIN_URL),
    }
}

pub async fn not_found() -> Response {
    AppError::NotFound.into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    username: String,
    password: String,
    next: String,
}

pub async fn login_form(Query(query): Query<LoginQuery>) -> Html<String> {
    let next = safe_next(query.next.as_deref());
    page(ui::login_page("", next, false))
}

#[tracing::instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let (username, password) = (form.username.clone(), form.password.clone());
    let identity = state
        .blocking(move |state| Ok(state.identity.authenticate(&username, &password)))
        .await?;
    let next = safe_next(Some(form.next.as_str()));
    match identity {
        Some(identity) => {
            start_session(&state, &cookies, &identity);
            tracing::info!(user_id = identity.id, "logged in");
            Ok(Redirect::to(next).into_response())
        }
        None => {
            tracing::warn!("rejected login");
            Ok(page(ui::login_page(&form.username, next, true)).into_response())
        }
    }
}

pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Html<String> {
    end_session(&state, &cookies);
    page(ui::logged_out_page())
}

fn render_clients(
    state: &AppState,
    user: &CurrentUser,
    form: &ClientForm,
    errors: &FormErrors,
) -> Html<String> {
    let clients = state.clients_for(user.id);
    page(ui::clients_page(user, form, errors, &clients))
}

#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn client_list(State(state): State<AppState>, user: CurrentUser) -> Html<String> {
    render_clients(&state, &user, &ClientForm::default(), &FormErrors::default())
}

#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn client_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ClientForm>,
) -> Result<Response, AppError> {
    match form.validate() {
        Ok(data) => {
            let owner = user.id;
            state
                .blocking(move |state| state.create_client(owner, data))
                .await?;
            Ok(Redirect::to("/clients/").into_response())
        }
        Err(errors) => Ok(render_clients(&state, &user, &form, &errors).into_response()),
    }
}

#[tracing::instrument(skip_all, fields(user_id = user.id, client_id = %id))]
pub async fn client_detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let client = state.client_for(user.id, parse_id(&id)?)?;
    let form = ClientForm::from(&client);
    Ok(page(ui::client_detail_page(
        &user,
        &client,
        &form,
        &FormErrors::default(),
    )))
}

#[tracing::instrument(skip_all, fields(user_id = user.id, client_id = %id))]
pub async fn client_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<ClientForm>,
) -> Result<Response, AppError> {
    let client = state.client_for(user.id, parse_id(&id)?)?;
    match form.validate() {
        Ok(data) => {
            let (owner, id) = (user.id, client.id);
            state
                .blocking(move |state| state.update_client(owner, id, data))
                .await?;
            Ok(Redirect::to("/clients/").into_response())
        }
        Err(errors) => {
            Ok(page(ui::client_detail_page(&user, &client, &form, &errors)).into_response())
        }
    }
}

fn render_projects(
    state: &AppState,
    user: &CurrentUser,
    form: &ProjectForm,
    errors: &FormErrors,
) -> Html<String> {
    let rows = state.project_listing(user.id, Utc::now());
    let clients = state.clients_for(user.id);
    page(ui::projects_page(user, form, errors, &rows, &clients))
}

#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn project_list(State(state): State<AppState>, user: CurrentUser) -> Html<String> {
    render_projects(&state, &user, &ProjectForm::default(), &FormErrors::default())
}

#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn project_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ProjectForm>,
) -> Result<Response, AppError> {
    let clients = state.clients_for(user.id);
    let choices: Vec<_> = clients.iter().collect();
    match form.validate(&choices) {
        Ok(data) => {
            let owner = user.id;
            state
                .blocking(move |state| state.create_project(owner, data))
                .await?;
            Ok(Redirect::to("/projects/").into_response())
        }
        Err(errors) => Ok(render_projects(&state, &user, &form, &errors).into_response()),
    }
}

#[tracing::instrument(skip_all, fields(user_id = user.id, project_id = %id))]
pub async fn project_detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let project = state.project_for(user.id, parse_id(&id)?)?;
    let clients = state.clients_for(user.id);
    let form = ProjectForm::from(&project);
    Ok(page(ui::project_detail_page(
        &user,
        &project,
        &form,
        &FormErrors::default(),
        &clients,
    )))
}

#[tracing::instrument(skip_all, fields(user_id = user.id, project_id = %id))]
pub async fn project_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<ProjectForm>,
) -> Result<Response, AppError> {
    let project = state.project_for(user.id, parse_id(&id)?)?;
    let clients = state.clients_for(user.id);
    let choices: Vec<_> = clients.iter().collect();
    match form.validate(&choices) {
        Ok(data) => {
            let (owner, id) = (user.id, project.id);
            state
                .blocking(move |state| state.update_project(owner, id, data))
                .await?;
            Ok(Redirect::to("/projects/").into_response())
        }
        Err(errors) => Ok(page(ui::project_detail_page(
            &user, &project, &form, &errors, &clients,
        ))
        .into_response()),
    }
}

fn render_entries(
    state: &AppState,
    user: &CurrentUser,
    form: &EntryForm,
    errors: &FormErrors,
) -> Html<String> {
    let rows = state.entry_listing(user.id, Utc::now());
    let projects = state.project_choices(user.id);
    page(ui::entries_page(user, form, errors, &rows, &projects))
}

#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn entry_list(State(state): State<AppState>, user: CurrentUser) -> Html<String> {
    let form = EntryForm::initial(Utc::now());
    render_entries(&state, &user, &form, &FormErrors::default())
}

#[tracing::instrument(skip_all, fields(user_id = user.id))]
pub async fn entry_create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<EntryForm>,
) -> Result<Response, AppError> {
    let projects = state.projects_for(user.id);
    let choices: Vec<_> = projects.iter().collect();
    match form.validate(&choices, Utc::now()) {
        Ok(data) => {
            let owner = user.id;
            state
                .blocking(move |state| state.create_entry(owner, data))
                .await?;
            Ok(Redirect::to("/entries/").into_response())
        }
        Err(errors) => Ok(render_entries(&state, &user, &form, &errors).into_response()),
    }
}
