//! Data models shared by the backing store and the hierarchy layer.
//!
//! `bucket` and `object` map to SQLite rows of the backing store. `records`,
//! `report` and `blob` are the plain records handed to callers of the
//! hierarchy manager; they never expose store-specific types.

pub mod blob;
pub mod bucket;
pub mod object;
pub mod records;
pub mod report;
