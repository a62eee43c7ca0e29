pub mod instagram;
pub mod twitter;
pub mod youtube;

pub use instagram::InstagramCollector;
pub use twitter::TwitterCollector;
pub use youtube::YoutubeCollector;
