//! Service layer for the cafe menu.
//! - `storage`: whole-document persistence of drink records.
//! - `images`: image reference resolution and upload files on disk.
//! - `drinks`: create/update/delete orchestration and orphan cleanup.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod images;
pub mod drinks;
