// crates/todo-conformance-core/src/scenarios/todos.rs
// ============================================================================
// Module: Todo Lifecycle Scenarios
// Description: Seed, read, create, update, delete, and bulk scenarios.
// Purpose: Exercise the todo resource lifecycle and its validation messages.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Covers the resource lifecycle from seeding through bulk deletion and the
//! capacity boundary. Every negative case predicts its message through
//! [`CreateExpectation`] or a message template rather than a literal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use super::CHALLENGES_PATH;
use super::empty_body;
use super::todo_shape;
use crate::capacity::CapacityBoundaryProbe;
use crate::contract::BodyShape;
use crate::contract::Contract;
use crate::error::ScenarioError;
use crate::messages::AMEND_ID;
use crate::messages::FIELD_MANDATORY;
use crate::messages::NO_SUCH_ENTITY;
use crate::messages::NOT_FOUND_INSTANCE;
use crate::messages::PUT_CREATE_FORBIDDEN;
use crate::messages::TemplateParams;
use crate::negotiation::Encoding;
use crate::resource::CreateExpectation;
use crate::resource::FIELD_DESCRIPTION;
use crate::resource::FIELD_DONE_STATUS;
use crate::resource::FIELD_ID;
use crate::resource::FIELD_TITLE;
use crate::resource::Todo;
use crate::resource::TodoDraft;
use crate::scenario::Scenario;
use crate::scenario::ScenarioCx;
use crate::scenario::ScenarioGroup;
use crate::session::TODOS_PATH;
use crate::session::todo_id;
use crate::transport::CHALLENGER_HEADER;
use crate::transport::HttpMethod;
use crate::transport::HttpResponse;

// ============================================================================
// SECTION: Catalog Slices
// ============================================================================

/// Session preparation.
pub(super) fn setup() -> Vec<Scenario> {
    vec![
        Scenario::new("todos_seed", ScenarioGroup::Setup, 201, "seed todo created", todos_seed),
        Scenario::new(
            "challenges_list",
            ScenarioGroup::Challenges,
            200,
            "challenge list has the expected size",
            challenges_list,
        ),
    ]
}

/// Read scenarios.
pub(super) fn reads() -> Vec<Scenario> {
    vec![
        Scenario::new("todos_list", ScenarioGroup::Get, 200, "full todo objects", todos_list),
        Scenario::new("todo_wrong_path", ScenarioGroup::Get, 404, "empty body", todo_wrong_path),
        Scenario::new("todo_get_by_id", ScenarioGroup::Get, 200, "single todo", todo_get_by_id)
            .after(&["todos_list"]),
        Scenario::new("todo_get_missing", ScenarioGroup::Get, 404, "unknown id", todo_get_missing),
        Scenario::new(
            "todos_filter_done",
            ScenarioGroup::Get,
            200,
            "only done todos returned",
            todos_filter_done,
        )
        .after(&["todos_seed"]),
        Scenario::new("todos_head", ScenarioGroup::Head, 200, "headers only", todos_head),
    ]
}

/// Create, update, delete, and options scenarios.
pub(super) fn writes() -> Vec<Scenario> {
    vec![
        Scenario::new("todo_create", ScenarioGroup::CreatePost, 201, "echo, fresh id", todo_create),
        Scenario::new(
            "todo_create_invalid_done_status",
            ScenarioGroup::CreatePost,
            400,
            "doneStatus type message",
            todo_create_invalid_done_status,
        ),
        Scenario::new(
            "todo_create_title_too_long",
            ScenarioGroup::CreatePost,
            400,
            "title length message",
            todo_create_title_too_long,
        ),
        Scenario::new(
            "todo_create_description_too_long",
            ScenarioGroup::CreatePost,
            400,
            "description length message",
            todo_create_description_too_long,
        ),
        Scenario::new(
            "todo_create_max_lengths",
            ScenarioGroup::CreatePost,
            201,
            "maximum lengths accepted, session header echoed",
            todo_create_max_lengths,
        ),
        Scenario::new(
            "todo_create_payload_too_large",
            ScenarioGroup::CreatePost,
            413,
            "body size message",
            todo_create_payload_too_large,
        ),
        Scenario::new(
            "todo_create_extra_field",
            ScenarioGroup::CreatePost,
            400,
            "unknown field message",
            todo_create_extra_field,
        ),
        Scenario::new(
            "todo_put_create_forbidden",
            ScenarioGroup::CreatePut,
            400,
            "PUT cannot create",
            todo_put_create_forbidden,
        ),
        Scenario::new(
            "todo_post_update",
            ScenarioGroup::UpdatePost,
            200,
            "title and description replaced",
            todo_post_update,
        )
        .after(&["todos_list"]),
        Scenario::new(
            "todo_post_update_missing",
            ScenarioGroup::UpdatePost,
            404,
            "unknown entity message",
            todo_post_update_missing,
        ),
        Scenario::new(
            "todo_put_full_update",
            ScenarioGroup::UpdatePut,
            200,
            "every field replaced",
            todo_put_full_update,
        )
        .after(&["todos_list"]),
        Scenario::new(
            "todo_put_partial_update",
            ScenarioGroup::UpdatePut,
            200,
            "title replaced",
            todo_put_partial_update,
        )
        .after(&["todos_list"]),
        Scenario::new(
            "todo_put_missing_title",
            ScenarioGroup::UpdatePut,
            400,
            "title mandatory message",
            todo_put_missing_title,
        )
        .after(&["todos_list"]),
        Scenario::new(
            "todo_put_id_mismatch",
            ScenarioGroup::UpdatePut,
            400,
            "id amendment message",
            todo_put_id_mismatch,
        )
        .after(&["todos_list"]),
        Scenario::new("todo_delete", ScenarioGroup::Delete, 200, "todo removed", todo_delete)
            .after(&["todos_list"]),
        Scenario::new("todos_options", ScenarioGroup::Options, 200, "allow header", todos_options),
    ]
}

/// Bulk delete and capacity scenarios.
pub(super) fn miscellaneous() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "todos_delete_all",
            ScenarioGroup::Miscellaneous,
            200,
            "every todo deleted",
            todos_delete_all,
        ),
        Scenario::new(
            "capacity_probe",
            ScenarioGroup::Miscellaneous,
            400,
            "fill to the ceiling, next create refused",
            capacity_probe,
        ),
    ]
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Path of one todo.
fn todo_path(id: u64) -> String {
    format!("{TODOS_PATH}/{id}")
}

/// Sends a JSON create and checks it against the predicted contract.
fn create_expecting(cx: &mut ScenarioCx<'_>, body: &Value) -> Result<HttpResponse, ScenarioError> {
    let encoded_len = body.to_string().len();
    let expectation = CreateExpectation::predict(body, encoded_len, 0, &cx.settings.limits);
    let request = cx.request(HttpMethod::Post, TODOS_PATH).json_body(body);
    cx.expect(&request, &expectation.contract()?)
}

/// Extracts the id of a created todo and proves it is new to the session.
fn record_created_id(
    cx: &mut ScenarioCx<'_>,
    response: &HttpResponse,
) -> Result<u64, ScenarioError> {
    let id = response
        .json()
        .as_ref()
        .and_then(todo_id)
        .ok_or_else(|| ScenarioError::Harness("created todo has no integer id".to_string()))?;
    let fresh = cx.session.observe_id(id);
    cx.ensure(fresh, "body.id", "id never seen in this session", id.to_string())?;
    Ok(id)
}

/// Reads one todo.
fn fetch_todo(cx: &mut ScenarioCx<'_>, id: u64) -> Result<Todo, ScenarioError> {
    let single = BodyShape::AllOf(vec![BodyShape::Length(1), BodyShape::each(todo_shape())]);
    let contract = Contract::status(200).json(BodyShape::field(TODOS_PATH, single));
    let request = cx.request(HttpMethod::Get, todo_path(id));
    let response = cx.expect(&request, &contract)?;
    response
        .json()
        .and_then(|body| body.get(TODOS_PATH)?.get(0).cloned())
        .and_then(|todo| serde_json::from_value(todo).ok())
        .ok_or_else(|| ScenarioError::Harness("todo body did not decode".to_string()))
}

/// Contract for a 200 update echoing `fields`.
fn updated(fields: &Value) -> Contract {
    let mut shapes = vec![BodyShape::HasField(FIELD_ID.to_string())];
    if let Some(object) = fields.as_object() {
        shapes.extend(
            object.iter().map(|(name, value)| BodyShape::field_equals(name.clone(), value.clone())),
        );
    }
    Contract::status(200).json(BodyShape::AllOf(shapes))
}

/// Contract for a templated error.
fn error_contract(status: u16, message: String) -> Contract {
    Contract::status(status).error_message(message)
}

// ============================================================================
// SECTION: Setup Scenarios
// ============================================================================

/// Creates the seed todo used by filter scenarios.
fn todos_seed(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let draft = cx.fixtures.draft(&cx.settings.limits);
    let request = cx.request(HttpMethod::Post, TODOS_PATH).json_body(&draft.to_json());
    let response = cx.expect(&request, &draft.created_contract(Encoding::Json))?;
    record_created_id(cx, &response)?;
    cx.session.refresh_resource_ids(cx.api)?;
    Ok(())
}

/// Lists the challenges.
fn challenges_list(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let size = cx.settings.expected_challenge_count.map_or(BodyShape::NonEmpty, BodyShape::Length);
    let contract = Contract::status(200)
        .json(BodyShape::field(CHALLENGES_PATH, BodyShape::AllOf(vec![BodyShape::IsArray, size])));
    let request = cx.request(HttpMethod::Get, CHALLENGES_PATH);
    cx.expect(&request, &contract)?;
    Ok(())
}

// ============================================================================
// SECTION: Read Scenarios
// ============================================================================

/// Lists todos and captures their ids.
fn todos_list(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let contract = Contract::status(200).json(BodyShape::field(
        TODOS_PATH,
        BodyShape::AllOf(vec![BodyShape::NonEmpty, BodyShape::each(todo_shape())]),
    ));
    let request = cx.request(HttpMethod::Get, TODOS_PATH);
    let response = cx.expect(&request, &contract)?;
    cx.session.absorb_todo_list(&response)?;
    Ok(())
}

/// Requests the singular path.
fn todo_wrong_path(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let request = cx.request(HttpMethod::Get, "todo");
    cx.expect(&request, &empty_body(404))?;
    Ok(())
}

/// Reads one known todo.
fn todo_get_by_id(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.first_resource_id()?;
    let todo = fetch_todo(cx, id)?;
    cx.ensure(todo.id == id, "body.todos[0].id", &id.to_string(), todo.id.to_string())
}

/// Reads an id that does not exist.
fn todo_get_missing(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.unused_id(cx.fixtures);
    let message = NOT_FOUND_INSTANCE.resolve(&TemplateParams::new().with("id", id))?;
    let request = cx.request(HttpMethod::Get, todo_path(id));
    cx.expect(&request, &error_contract(404, message))?;
    Ok(())
}

/// Filters by done status.
fn todos_filter_done(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let each = BodyShape::each(BodyShape::AllOf(vec![
        todo_shape(),
        BodyShape::field_equals(FIELD_DONE_STATUS, true),
    ]));
    let contract = Contract::status(200)
        .json(BodyShape::field(TODOS_PATH, BodyShape::AllOf(vec![BodyShape::NonEmpty, each])));
    let request = cx.request(HttpMethod::Get, TODOS_PATH).query(FIELD_DONE_STATUS, "true");
    cx.expect(&request, &contract)?;
    Ok(())
}

/// Issues HEAD on the collection.
fn todos_head(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let request = cx.request(HttpMethod::Head, TODOS_PATH);
    cx.expect(&request, &empty_body(200))?;
    Ok(())
}

// ============================================================================
// SECTION: Create Scenarios
// ============================================================================

/// Creates a todo and reads it back.
fn todo_create(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let draft = cx.fixtures.draft(&cx.settings.limits);
    let request = cx.request(HttpMethod::Post, TODOS_PATH).json_body(&draft.to_json());
    let response = cx.expect(&request, &draft.created_contract(Encoding::Json))?;
    let id = record_created_id(cx, &response)?;
    let stored = fetch_todo(cx, id)?;
    let expected = TodoDraft {
        title: stored.title.clone(),
        description: stored.description.clone(),
        done_status: stored.done_status,
    };
    let actual = serde_json::to_string(&stored).unwrap_or_default();
    cx.ensure(expected == draft, "body.todos[0]", "fields identical to the create request", actual)
}

/// Sends doneStatus as a string.
fn todo_create_invalid_done_status(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let title = cx.fixtures.alpha(20);
    let description = cx.fixtures.alpha(40);
    let body = json!({
        FIELD_TITLE: title,
        FIELD_DONE_STATUS: "true",
        FIELD_DESCRIPTION: description,
    });
    create_expecting(cx, &body)?;
    Ok(())
}

/// Sends a title twice the allowed length.
fn todo_create_title_too_long(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let mut draft = cx.fixtures.draft(&cx.settings.limits);
    draft.title = draft.title.repeat(2);
    create_expecting(cx, &draft.to_json())?;
    Ok(())
}

/// Sends a description twice the allowed length.
fn todo_create_description_too_long(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let mut draft = cx.fixtures.draft(&cx.settings.limits);
    draft.description = draft.description.repeat(2);
    create_expecting(cx, &draft.to_json())?;
    Ok(())
}

/// Creates a todo at the maximum lengths and checks the session header echo.
fn todo_create_max_lengths(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let draft = cx.fixtures.draft(&cx.settings.limits);
    let contract = draft
        .created_contract(Encoding::Json)
        .header_equals(CHALLENGER_HEADER, cx.session.token().as_str());
    let request = cx.request(HttpMethod::Post, TODOS_PATH).json_body(&draft.to_json());
    let response = cx.expect(&request, &contract)?;
    record_created_id(cx, &response)?;
    Ok(())
}

/// Sends a body past the byte limit.
fn todo_create_payload_too_large(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let mut draft = cx.fixtures.draft(&cx.settings.limits);
    let repeats = cx.settings.limits.max_body_bytes / draft.description.len().max(1) + 1;
    draft.description = draft.description.repeat(repeats);
    create_expecting(cx, &draft.to_json())?;
    Ok(())
}

/// Sends a field the resource does not declare.
fn todo_create_extra_field(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let mut body = cx.fixtures.draft(&cx.settings.limits).to_json();
    if let Some(object) = body.as_object_mut() {
        object.insert("extraField".to_string(), Value::String("Extra".to_string()));
    }
    create_expecting(cx, &body)?;
    Ok(())
}

/// Tries to create through PUT.
fn todo_put_create_forbidden(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.unused_id(cx.fixtures);
    let draft = cx.fixtures.draft(&cx.settings.limits);
    let request = cx.request(HttpMethod::Put, todo_path(id)).json_body(&draft.to_json());
    cx.expect(&request, &error_contract(400, PUT_CREATE_FORBIDDEN.literal()?))?;
    Ok(())
}

// ============================================================================
// SECTION: Update Scenarios
// ============================================================================

/// Amends title and description with POST.
fn todo_post_update(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.first_resource_id()?;
    let before = fetch_todo(cx, id)?;
    let body = json!({
        FIELD_TITLE: cx.fixtures.alpha(cx.settings.limits.max_title_chars),
        FIELD_DESCRIPTION: cx.fixtures.alpha(cx.settings.limits.max_description_chars),
    });
    let request = cx.request(HttpMethod::Post, todo_path(id)).json_body(&body);
    let contract = updated(&body).json(BodyShape::HasField(FIELD_DONE_STATUS.to_string()));
    cx.expect(&request, &contract)?;
    let changed = body[FIELD_TITLE] != before.title.as_str();
    cx.ensure(changed, "body.title", "a changed title", &before.title)
}

/// Amends an id that does not exist.
fn todo_post_update_missing(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.unused_id(cx.fixtures);
    let draft = cx.fixtures.draft(&cx.settings.limits);
    let message = NO_SUCH_ENTITY.resolve(&TemplateParams::new().with("id", id))?;
    let request = cx.request(HttpMethod::Post, todo_path(id)).json_body(&draft.to_json());
    cx.expect(&request, &error_contract(404, message))?;
    Ok(())
}

/// Replaces every field with PUT.
fn todo_put_full_update(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.first_resource_id()?;
    let before = fetch_todo(cx, id)?;
    let mut draft = cx.fixtures.draft(&cx.settings.limits);
    draft.done_status = !before.done_status;
    let body = draft.to_json();
    let request = cx.request(HttpMethod::Put, todo_path(id)).json_body(&body);
    cx.expect(&request, &updated(&body))?;
    cx.ensure(
        draft.title != before.title && draft.description != before.description,
        "body",
        "title and description changed",
        serde_json::to_string(&before).unwrap_or_default(),
    )
}

/// Replaces only the title with PUT.
fn todo_put_partial_update(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.first_resource_id()?;
    let before = fetch_todo(cx, id)?;
    let title = cx.fixtures.alpha(cx.settings.limits.max_title_chars);
    let body = json!({FIELD_TITLE: title});
    let request = cx.request(HttpMethod::Put, todo_path(id)).json_body(&body);
    cx.expect(&request, &updated(&body))?;
    cx.ensure(title != before.title, "body.title", "a changed title", &before.title)
}

/// Omits the mandatory title on PUT.
fn todo_put_missing_title(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.first_resource_id()?;
    let description = cx.fixtures.alpha(cx.settings.limits.max_description_chars);
    let body = json!({FIELD_DONE_STATUS: true, FIELD_DESCRIPTION: description});
    let message = FIELD_MANDATORY.resolve(&TemplateParams::new().with("field", FIELD_TITLE))?;
    let request = cx.request(HttpMethod::Put, todo_path(id)).json_body(&body);
    cx.expect(&request, &error_contract(400, message))?;
    Ok(())
}

/// Sends a body id that differs from the path id.
fn todo_put_id_mismatch(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.first_resource_id()?;
    let other = id.saturating_add(1);
    let mut body = cx.fixtures.draft(&cx.settings.limits).to_json();
    if let Some(object) = body.as_object_mut() {
        object.insert(FIELD_ID.to_string(), json!(other));
    }
    let message = AMEND_ID.resolve(&TemplateParams::new().with("from", id).with("to", other))?;
    let request = cx.request(HttpMethod::Put, todo_path(id)).json_body(&body);
    cx.expect(&request, &error_contract(400, message))?;
    Ok(())
}

// ============================================================================
// SECTION: Delete and Options Scenarios
// ============================================================================

/// Deletes one todo and confirms it is gone from the list.
fn todo_delete(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let id = cx.session.first_resource_id()?;
    let request = cx.request(HttpMethod::Delete, todo_path(id));
    cx.expect(&request, &empty_body(200))?;
    let remaining = cx.session.refresh_resource_ids(cx.api)?.contains(&id);
    cx.ensure(!remaining, "body.todos", "deleted id absent", id.to_string())
}

/// Asks which methods the collection allows.
fn todos_options(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let request = cx.request(HttpMethod::Options, TODOS_PATH);
    cx.expect(&request, &empty_body(200).header_present("Allow"))?;
    Ok(())
}

// ============================================================================
// SECTION: Miscellaneous Scenarios
// ============================================================================

/// Deletes every todo one by one.
fn todos_delete_all(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let ids = cx.session.refresh_resource_ids(cx.api)?.to_vec();
    for id in ids {
        let request = cx.request(HttpMethod::Delete, todo_path(id));
        cx.expect(&request, &empty_body(200))?;
    }
    let left = cx.session.refresh_resource_ids(cx.api)?.len();
    cx.ensure(left == 0, "body.todos.length", "0", left.to_string())
}

/// Fills the session to its ceiling and probes one past it.
fn capacity_probe(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    CapacityBoundaryProbe::new(cx.settings.limits).run(cx)?;
    Ok(())
}
