//! 四个角色：规划、执行、评估、学习

pub mod evaluator;
pub mod executor;
pub mod learner;
pub mod planner;

pub use evaluator::Evaluator;
pub use executor::{FaultInjector, ResearchExecutor};
pub use learner::Learner;
pub use planner::{Planner, PromptTier};
