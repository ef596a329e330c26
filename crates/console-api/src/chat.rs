//! Chat-style command interpreter.
//!
//! A message is normalised, matched against a fixed set of command patterns
//! and executed through the same client calls the REST routes use. Anything
//! unrecognised gets the help text back with `action: "unknown"`.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::routes::privileges::{self, PrivilegeChange};
use crate::routes::{groups, workspace, ApiJson};
use crate::AppState;
use axum::{extract::State, Json};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use unity_console_client::{
    CreateCatalogRequest, CreateSchemaRequest, ScimGroup, ScimUser, SecurableType,
};
use unity_console_core::validation::{
    normalize_privileges, validate_email, validate_full_name, validate_object_name,
};
use unity_console_core::TimeFilter;

pub const HELP_TEXT: &str = "Available commands:\n\
- list catalogs | list users | list groups\n\
- list schemas in <catalog>\n\
- list tables in <catalog>.<schema>\n\
- create catalog <name> | delete catalog <name>\n\
- create schema <catalog>.<schema> | delete schema <catalog>.<schema>\n\
- drop table <catalog>.<schema>.<table>\n\
- add user <email> | remove user <email>\n\
- create group <name>\n\
- add <email> to group <name> | remove <email> from group <name>\n\
- grant <privileges> on <catalog|schema|table> <name> to <principal>\n\
- revoke <privileges> on <catalog|schema|table> <name> from <principal>\n\
- workspace summary [day|week|month]";

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref SPOKEN_DOT: Regex = Regex::new(r"(?i)\s+dot\s+").unwrap();
    static ref HELP: Regex = Regex::new(r"(?i)^(?:help|\?|commands|what can you do)$").unwrap();
    static ref LIST_CATALOGS: Regex =
        Regex::new(r"(?i)^(?:list|show)(?: all| me)? catalogs$").unwrap();
    static ref LIST_SCHEMAS: Regex =
        Regex::new(r"(?i)^(?:list|show)(?: all)? schemas (?:in|of|for) (?:catalog )?(\S+)$").unwrap();
    static ref LIST_TABLES: Regex = Regex::new(
        r"(?i)^(?:list|show)(?: all)? tables (?:in|of|for) (?:schema )?([^\s.]+)\.([^\s.]+)$"
    )
    .unwrap();
    static ref LIST_USERS: Regex = Regex::new(r"(?i)^(?:list|show)(?: all)? users$").unwrap();
    static ref LIST_GROUPS: Regex = Regex::new(r"(?i)^(?:list|show)(?: all)? groups$").unwrap();
    static ref CREATE_CATALOG: Regex = Regex::new(r"(?i)^create (?:a )?catalog (\S+)$").unwrap();
    static ref DELETE_CATALOG: Regex = Regex::new(r"(?i)^(?:delete|drop) catalog (\S+)$").unwrap();
    static ref CREATE_SCHEMA_DOTTED: Regex =
        Regex::new(r"(?i)^create (?:a )?schema ([^\s.]+)\.([^\s.]+)$").unwrap();
    static ref CREATE_SCHEMA_IN: Regex =
        Regex::new(r"(?i)^create (?:a )?schema (\S+) in (?:catalog )?(\S+)$").unwrap();
    static ref DELETE_SCHEMA: Regex = Regex::new(r"(?i)^(?:delete|drop) schema (\S+)$").unwrap();
    static ref DROP_TABLE: Regex = Regex::new(r"(?i)^(?:delete|drop) table (\S+)$").unwrap();
    static ref ADD_TO_GROUP: Regex =
        Regex::new(r"(?i)^add (?:user )?(\S+) to (?:the )?(?:group )?(.+)$").unwrap();
    static ref REMOVE_FROM_GROUP: Regex =
        Regex::new(r"(?i)^remove (?:user )?(\S+) from (?:the )?(?:group )?(.+)$").unwrap();
    static ref ADD_USER: Regex = Regex::new(r"(?i)^(?:add|create|invite) user (\S+)$").unwrap();
    static ref REMOVE_USER: Regex = Regex::new(r"(?i)^(?:remove|delete) user (\S+)$").unwrap();
    static ref CREATE_GROUP: Regex = Regex::new(r"(?i)^create (?:a )?group (.+)$").unwrap();
    static ref GRANT: Regex =
        Regex::new(r"(?i)^grant (.+?) on (catalog|schema|table) (\S+) to (.+)$").unwrap();
    static ref REVOKE: Regex =
        Regex::new(r"(?i)^revoke (.+?) on (catalog|schema|table) (\S+) from (.+)$").unwrap();
    static ref SUMMARY: Regex = Regex::new(
        r"(?i)^(?:show |give me )?(?:the )?(?:workspace )?(?:summary|stats|statistics|overview)(?: for)?(?: the)?(?: last)? ?(day|week|month)?$"
    )
    .unwrap();
    static ref PRIVILEGE_SEPARATOR: Regex = Regex::new(r"(?i)\s*,\s*|\s+and\s+").unwrap();
}

/// Collapse whitespace, drop trailing punctuation and turn a spoken "dot"
/// into `.` so "main dot sales" reads as `main.sales`.
pub fn normalize(message: &str) -> String {
    let collapsed = WHITESPACE.replace_all(message.trim(), " ");
    let dotted = SPOKEN_DOT.replace_all(&collapsed, ".");
    dotted.trim_end_matches(['.', '!', '?']).trim().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    ListCatalogs,
    ListSchemas { catalog: String },
    ListTables { catalog: String, schema: String },
    ListUsers,
    ListGroups,
    CreateCatalog { name: String },
    DeleteCatalog { name: String },
    CreateSchema { catalog: String, schema: String },
    DeleteSchema { full_name: String },
    DropTable { full_name: String },
    AddUser { email: String },
    RemoveUser { email: String },
    CreateGroup { name: String },
    AddUserToGroup { user: String, group: String },
    RemoveUserFromGroup { user: String, group: String },
    Grant(PrivilegeCommand),
    Revoke(PrivilegeCommand),
    WorkspaceSummary { time_filter: TimeFilter },
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrivilegeCommand {
    pub privileges: Vec<String>,
    pub securable: SecurableType,
    pub full_name: String,
    pub principal: String,
}

fn cap(caps: &regex::Captures<'_>, i: usize) -> String {
    caps.get(i).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
}

fn privilege_command(caps: &regex::Captures<'_>) -> Option<PrivilegeCommand> {
    let privileges = PRIVILEGE_SEPARATOR
        .split(&cap(caps, 1))
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    Some(PrivilegeCommand {
        privileges,
        securable: cap(caps, 2).parse().ok()?,
        full_name: cap(caps, 3),
        principal: cap(caps, 4),
    })
}

impl Command {
    /// Parse a normalised message.
    pub fn parse(message: &str) -> Command {
        if HELP.is_match(message) {
            return Command::Help;
        }
        if LIST_CATALOGS.is_match(message) {
            return Command::ListCatalogs;
        }
        if let Some(c) = LIST_SCHEMAS.captures(message) {
            return Command::ListSchemas { catalog: cap(&c, 1) };
        }
        if let Some(c) = LIST_TABLES.captures(message) {
            return Command::ListTables {
                catalog: cap(&c, 1),
                schema: cap(&c, 2),
            };
        }
        if LIST_USERS.is_match(message) {
            return Command::ListUsers;
        }
        if LIST_GROUPS.is_match(message) {
            return Command::ListGroups;
        }
        if let Some(c) = CREATE_CATALOG.captures(message) {
            return Command::CreateCatalog { name: cap(&c, 1) };
        }
        if let Some(c) = DELETE_CATALOG.captures(message) {
            return Command::DeleteCatalog { name: cap(&c, 1) };
        }
        if let Some(c) = CREATE_SCHEMA_DOTTED.captures(message) {
            return Command::CreateSchema {
                catalog: cap(&c, 1),
                schema: cap(&c, 2),
            };
        }
        if let Some(c) = CREATE_SCHEMA_IN.captures(message) {
            return Command::CreateSchema {
                catalog: cap(&c, 2),
                schema: cap(&c, 1),
            };
        }
        if let Some(c) = DELETE_SCHEMA.captures(message) {
            return Command::DeleteSchema { full_name: cap(&c, 1) };
        }
        if let Some(c) = DROP_TABLE.captures(message) {
            return Command::DropTable { full_name: cap(&c, 1) };
        }
        // Group membership before plain user commands: "remove user x from group y".
        if let Some(c) = ADD_TO_GROUP.captures(message) {
            return Command::AddUserToGroup {
                user: cap(&c, 1),
                group: cap(&c, 2),
            };
        }
        if let Some(c) = REMOVE_FROM_GROUP.captures(message) {
            return Command::RemoveUserFromGroup {
                user: cap(&c, 1),
                group: cap(&c, 2),
            };
        }
        if let Some(c) = ADD_USER.captures(message) {
            return Command::AddUser { email: cap(&c, 1) };
        }
        if let Some(c) = REMOVE_USER.captures(message) {
            return Command::RemoveUser { email: cap(&c, 1) };
        }
        if let Some(c) = CREATE_GROUP.captures(message) {
            return Command::CreateGroup { name: cap(&c, 1) };
        }
        if let Some(cmd) = GRANT.captures(message).and_then(|c| privilege_command(&c)) {
            return Command::Grant(cmd);
        }
        if let Some(cmd) = REVOKE.captures(message).and_then(|c| privilege_command(&c)) {
            return Command::Revoke(cmd);
        }
        if let Some(c) = SUMMARY.captures(message) {
            let time_filter = c
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or_default();
            return Command::WorkspaceSummary { time_filter };
        }
        Command::Unknown
    }

    pub fn action(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::ListCatalogs => "list_catalogs",
            Command::ListSchemas { .. } => "list_schemas",
            Command::ListTables { .. } => "list_tables",
            Command::ListUsers => "list_users",
            Command::ListGroups => "list_groups",
            Command::CreateCatalog { .. } => "create_catalog",
            Command::DeleteCatalog { .. } => "delete_catalog",
            Command::CreateSchema { .. } => "create_schema",
            Command::DeleteSchema { .. } => "delete_schema",
            Command::DropTable { .. } => "drop_table",
            Command::AddUser { .. } => "add_user",
            Command::RemoveUser { .. } => "remove_user",
            Command::CreateGroup { .. } => "create_group",
            Command::AddUserToGroup { .. } => "add_user_to_group",
            Command::RemoveUserFromGroup { .. } => "remove_user_from_group",
            Command::Grant(_) => "grant",
            Command::Revoke(_) => "revoke",
            Command::WorkspaceSummary { .. } => "workspace_summary",
            Command::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub action: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub success: bool,
}

impl ChatResponse {
    fn ok(action: &'static str, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            action,
            message: message.into(),
            data,
            success: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

fn name_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let names: Vec<&str> = names.collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

async fn user_id(state: &AppState, email: &str) -> ApiResult<String> {
    state
        .client()?
        .find_user_by_name(email)
        .await?
        .and_then(|u| u.id)
        .ok_or_else(|| ApiError::NotFound(format!("User '{}' not found", email)))
}

async fn group_id(state: &AppState, name: &str) -> ApiResult<String> {
    state
        .client()?
        .find_group_by_name(name)
        .await?
        .and_then(|g| g.id)
        .ok_or_else(|| ApiError::NotFound(format!("Group '{}' not found", name)))
}

fn privilege_change(cmd: PrivilegeCommand) -> ApiResult<PrivilegeChange> {
    Ok(PrivilegeChange {
        privileges: normalize_privileges(&cmd.privileges)?,
        securable: cmd.securable,
        full_name: cmd.full_name,
        principal: cmd.principal,
    })
}

/// Execute a parsed command.
pub async fn execute(state: &AppState, command: Command) -> ApiResult<ChatResponse> {
    let action = command.action();
    let response = match command {
        Command::Help => ChatResponse::ok(action, HELP_TEXT, None),
        Command::Unknown => ChatResponse {
            action,
            message: format!("Sorry, I didn't understand that.\n{}", HELP_TEXT),
            data: None,
            success: false,
        },
        Command::ListCatalogs => {
            let catalogs = state.client()?.list_catalogs().await?;
            ChatResponse::ok(
                action,
                format!(
                    "Found {} catalog(s): {}",
                    catalogs.len(),
                    name_list(catalogs.iter().map(|c| c.name.as_str()))
                ),
                Some(json!(catalogs)),
            )
        }
        Command::ListSchemas { catalog } => {
            let schemas = state.client()?.list_schemas(&catalog).await?;
            ChatResponse::ok(
                action,
                format!(
                    "Found {} schema(s) in {}: {}",
                    schemas.len(),
                    catalog,
                    name_list(schemas.iter().map(|s| s.name.as_str()))
                ),
                Some(json!(schemas)),
            )
        }
        Command::ListTables { catalog, schema } => {
            let tables = state.client()?.list_tables(&catalog, &schema).await?;
            ChatResponse::ok(
                action,
                format!(
                    "Found {} table(s) in {}.{}: {}",
                    tables.len(),
                    catalog,
                    schema,
                    name_list(tables.iter().map(|t| t.name.as_str()))
                ),
                Some(json!(tables)),
            )
        }
        Command::ListUsers => {
            let users = state.client()?.list_users(1, 100).await?;
            ChatResponse::ok(
                action,
                format!(
                    "Found {} user(s): {}",
                    users.total_results,
                    name_list(users.resources.iter().map(|u| u.user_name.as_str()))
                ),
                Some(json!(users.resources)),
            )
        }
        Command::ListGroups => {
            let groups = state.client()?.list_groups().await?;
            ChatResponse::ok(
                action,
                format!(
                    "Found {} group(s): {}",
                    groups.resources.len(),
                    name_list(groups.resources.iter().map(|g| g.display_name.as_str()))
                ),
                Some(json!(groups.resources)),
            )
        }
        Command::CreateCatalog { name } => {
            validate_object_name(&name, "Catalog")?;
            let request = CreateCatalogRequest {
                name: name.clone(),
                ..Default::default()
            };
            match state.client()?.create_catalog(&request).await {
                Ok(catalog) => ChatResponse::ok(
                    action,
                    format!("Catalog '{}' created", name),
                    Some(json!(catalog)),
                ),
                Err(e) if e.is_already_exists() => {
                    ChatResponse::ok(action, format!("Catalog '{}' already exists", name), None)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::DeleteCatalog { name } => {
            state.client()?.delete_catalog(&name, false).await?;
            ChatResponse::ok(action, format!("Catalog '{}' deleted", name), None)
        }
        Command::CreateSchema { catalog, schema } => {
            validate_object_name(&catalog, "Catalog")?;
            validate_object_name(&schema, "Schema")?;
            let request = CreateSchemaRequest {
                name: schema.clone(),
                catalog_name: catalog.clone(),
                comment: None,
            };
            match state.client()?.create_schema(&request).await {
                Ok(created) => ChatResponse::ok(
                    action,
                    format!("Schema '{}.{}' created", catalog, schema),
                    Some(json!(created)),
                ),
                Err(e) if e.is_already_exists() => ChatResponse::ok(
                    action,
                    format!("Schema '{}.{}' already exists", catalog, schema),
                    None,
                ),
                Err(e) => return Err(e.into()),
            }
        }
        Command::DeleteSchema { full_name } => {
            validate_full_name(&full_name, 2)?;
            state.client()?.delete_schema(&full_name, false).await?;
            ChatResponse::ok(action, format!("Schema '{}' deleted", full_name), None)
        }
        Command::DropTable { full_name } => {
            validate_full_name(&full_name, 3)?;
            state.client()?.delete_table(&full_name).await?;
            ChatResponse::ok(action, format!("Table '{}' dropped", full_name), None)
        }
        Command::AddUser { email } => {
            validate_email(&email)?;
            let user = state
                .client()?
                .create_user(&ScimUser::new(email.clone(), None))
                .await?;
            ChatResponse::ok(action, format!("User '{}' added", email), Some(json!(user)))
        }
        Command::RemoveUser { email } => {
            let id = user_id(state, &email).await?;
            state.client()?.delete_user(&id).await?;
            ChatResponse::ok(action, format!("User '{}' removed", email), None)
        }
        Command::CreateGroup { name } => {
            let group = state.client()?.create_group(&ScimGroup::new(name.clone(), &[])).await?;
            ChatResponse::ok(action, format!("Group '{}' created", name), Some(json!(group)))
        }
        Command::AddUserToGroup { user, group } => {
            let (uid, gid) = tokio::try_join!(user_id(state, &user), group_id(state, &group))?;
            groups::patch_members(state, &gid, std::slice::from_ref(&uid), &[]).await?;
            ChatResponse::ok(action, format!("Added '{}' to group '{}'", user, group), None)
        }
        Command::RemoveUserFromGroup { user, group } => {
            let (uid, gid) = tokio::try_join!(user_id(state, &user), group_id(state, &group))?;
            groups::patch_members(state, &gid, &[], std::slice::from_ref(&uid)).await?;
            ChatResponse::ok(
                action,
                format!("Removed '{}' from group '{}'", user, group),
                None,
            )
        }
        Command::Grant(cmd) => {
            let summary = format!(
                "Granted {} on {} {} to {}",
                cmd.privileges.join(", "),
                cmd.securable,
                cmd.full_name,
                cmd.principal
            );
            let Json(data) = privileges::grant_change(state, privilege_change(cmd)?).await?;
            ChatResponse::ok(action, summary, Some(data))
        }
        Command::Revoke(cmd) => {
            let summary = format!(
                "Revoked {} on {} {} from {}",
                cmd.privileges.join(", "),
                cmd.securable,
                cmd.full_name,
                cmd.principal
            );
            let Json(data) = privileges::revoke_change(state, privilege_change(cmd)?).await?;
            ChatResponse::ok(action, summary, Some(data))
        }
        Command::WorkspaceSummary { time_filter } => {
            let snapshot = workspace::cached_snapshot(state, time_filter).await?;
            let message = format!(
                "Workspace ({}): {} catalogs, {} schemas, {} tables, {} views, {} users ({} active), {} jobs. Overall readiness {}%.",
                time_filter,
                snapshot.total_catalogs,
                snapshot.total_schemas,
                snapshot.total_tables,
                snapshot.total_views,
                snapshot.total_users,
                snapshot.active_users,
                snapshot.total_jobs,
                snapshot.readiness.overall
            );
            ChatResponse::ok(action, message, Some(json!(snapshot)))
        }
    };
    Ok(response)
}

/// `POST /api/chat`
pub async fn chat(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let message = body.message.as_deref().map(normalize).unwrap_or_default();
    if message.is_empty() {
        return Err(ApiError::MissingFields(vec!["message".to_string()]));
    }

    let command = Command::parse(&message);
    metrics::record_chat_command(command.action());
    tracing::info!(action = command.action(), "Chat command");
    Ok(Json(execute(&state, command).await?))
}
