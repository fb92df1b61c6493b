pub mod conversation;
pub mod lyrics;
pub mod transcript;

pub use conversation::*;
pub use lyrics::*;
pub use transcript::*;
