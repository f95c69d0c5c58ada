pub mod api;
pub mod client;

pub use api::{
    CloudEpisode, CloudList, CloudListItem, CloudMovie, CloudShow, EpisodeBatch, EpisodeQuery, Page,
};
pub use client::HttpCloudClient;
