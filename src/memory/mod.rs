//! 记忆层：错误记忆的持久化与行为修正

pub mod behavior;
pub mod mistake_store;

pub use behavior::{planning_reminders, BehaviorModifier};
pub use mistake_store::MistakeStore;
