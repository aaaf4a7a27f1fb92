// HTTP routes
pub mod audio;
pub mod extract;
pub mod health;
pub mod jobs;
pub mod refine;

pub use audio::*;
pub use extract::*;
pub use health::*;
pub use jobs::*;
pub use refine::*;
