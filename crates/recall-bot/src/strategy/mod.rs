//! Target selection for the special plays.

pub mod jack;
pub mod queen;

pub use jack::{SwapStrategyKind, choose_swap_targets};
pub use queen::{PeekStrategyKind, choose_peek_target};
