use crate::state::AppState;
use axum::middleware;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub mod broadcasts;
pub mod conversations;
pub mod messages;
pub mod reactions;
pub mod staff;

use broadcasts::{send_broadcast, send_employee_broadcast};
use conversations::{
    cleanup_support_conversation, list_conversations, open_appointment_conversation,
    open_cleaner_client_conversation, open_coworker_conversation, open_custom_group,
    open_employee_conversation, open_hr_direct, open_hr_group, open_support_conversation,
};
use messages::{delete_message, get_message_history, mark_messages_read, send_message};
use reactions::{remove_reaction, toggle_reaction};
use staff::search_staff;

use crate::websocket::wsroute::ws_handler;

pub fn build_router(state: AppState) -> Router {
    // Introspection stays public for healthchecks
    let introspection = Router::new().route("/health", get(|| async { "OK" }));

    let api_v1 = Router::new()
        // Conversations
        .route("/conversations", get(list_conversations))
        .route(
            "/conversations/appointment",
            post(open_appointment_conversation),
        )
        .route("/conversations/support", post(open_support_conversation))
        .route(
            "/conversations/support/:id",
            delete(cleanup_support_conversation),
        )
        .route("/conversations/hr-group", post(open_hr_group))
        .route("/conversations/hr-direct", post(open_hr_direct))
        .route("/conversations/custom-group", post(open_custom_group))
        .route(
            "/conversations/cleaner-client",
            post(open_cleaner_client_conversation),
        )
        .route(
            "/conversations/employee",
            post(open_employee_conversation),
        )
        .route(
            "/conversations/coworker",
            post(open_coworker_conversation),
        )
        .route("/conversations/read", post(mark_messages_read))
        .route(
            "/conversations/:id/messages",
            get(get_message_history).post(send_message),
        )
        // Broadcasts
        .route("/broadcasts", post(send_broadcast))
        .route("/broadcasts/employee", post(send_employee_broadcast))
        // Messages
        .route("/messages/:id", delete(delete_message))
        .route("/messages/:id/reactions", post(toggle_reaction))
        .route("/messages/:id/reactions/:emoji", delete(remove_reaction))
        // Staff directory
        .route("/staff", get(search_staff))
        // Realtime
        .route("/ws", get(ws_handler));

    let secured_api_v1 = api_v1.layer(middleware::from_fn_with_state(
        state.clone(),
        crate::middleware::auth::auth_middleware,
    ));

    let router = introspection.merge(Router::new().nest("/api/v1", secured_api_v1));

    crate::middleware::with_defaults(router).with_state(state)
}
