pub(crate) mod admin_auth;
pub(crate) mod request_tracing;
