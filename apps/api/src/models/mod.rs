pub mod draft;
pub mod share;
