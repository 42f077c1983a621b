pub mod health_handlers;
pub mod hierarchy_handlers;
pub mod object_handlers;
