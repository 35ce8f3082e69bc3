pub(crate) mod admin_api;
pub(crate) mod admin_panel;
pub(crate) mod handlers_utilities;
pub(crate) mod ops;
pub(crate) mod public;
pub(crate) mod revalidate;
pub(crate) mod uploads;
