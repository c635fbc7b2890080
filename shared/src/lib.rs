// Data models shared between the scanner engine and its collaborators
// (dashboard, storage, transport). No I/O lives here.

pub mod models;
pub mod utils;
