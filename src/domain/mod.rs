pub mod models;
pub mod ranks;
pub mod time_format;
