// Per-platform extractors

pub mod bandcamp;
pub mod soundcloud;
pub mod youtube;
