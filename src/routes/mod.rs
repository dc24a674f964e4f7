pub mod health;
pub mod history;
pub mod interview;
pub mod logs;
pub mod sessions;
