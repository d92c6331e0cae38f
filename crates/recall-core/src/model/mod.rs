pub mod card;
pub mod difficulty;
pub mod rank;
pub mod registry;
pub mod suit;
