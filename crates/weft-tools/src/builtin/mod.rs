pub mod calculator;
pub mod current_time;
pub mod file_read;
pub mod file_write;
pub mod http_request;
pub mod shell;
pub mod sleep;
