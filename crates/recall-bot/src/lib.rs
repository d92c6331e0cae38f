pub mod context;
pub mod decision;
pub mod interpreter;
pub mod knowledge;
pub mod policy;
pub mod profile;
pub mod session;
pub mod strategy;

pub use context::{DecisionContext, PlayerSummary, Resolved, prepare};
pub use decision::{Decision, DecisionOutcome, EventKind, PeekTarget, SwapTargets};
pub use interpreter::RuleOutcome;
pub use knowledge::{CardMove, KnowledgeManager, SwapEvent};
pub use policy::DecisionPolicy;
pub use profile::{BotProfile, EventRuleSets, ProfileError, SelectionStyle, SwapTriggerTable};
pub use session::BotSession;
pub use strategy::{PeekStrategyKind, SwapStrategyKind};
