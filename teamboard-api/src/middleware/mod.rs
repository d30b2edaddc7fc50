/// Middleware modules for the API server
///
/// - `request_id`: Request IDs for log correlation (`x-request-id`)
///
/// Session authentication lives in `teamboard_shared::auth::middleware`.

pub mod request_id;
