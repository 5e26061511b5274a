pub mod card;
pub mod identity;
pub mod payload;
pub mod source;

pub use card::*;
pub use identity::*;
pub use payload::*;
pub use source::*;
