pub mod audio;
pub mod config;
pub mod languages;
pub mod translate;

pub use self::audio::*;
pub use self::config::*;
pub use self::languages::*;
pub use self::translate::*;
