pub(crate) mod errors;
pub(crate) mod events;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod links;
pub(crate) mod modules;
pub(crate) mod router;
