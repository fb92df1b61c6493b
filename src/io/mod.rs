pub mod input;
pub mod output;
pub mod srt;

pub use input::*;
pub use output::*;
pub use srt::*;
