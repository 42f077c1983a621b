pub mod bucket_store;
pub mod hierarchy;
pub mod image_resize;
pub mod object_store;
pub mod storage_service;
pub mod url_signer;
