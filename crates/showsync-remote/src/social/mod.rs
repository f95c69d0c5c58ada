pub mod api;
pub mod client;

pub use api::{
    CollectedEpisode, CollectedSeason, CollectedShow, EpisodeActivity, EpisodeNumber, LastActivity,
    ListedMovie, MovieActivity, MovieRef, NoteActivity, NotesPage, RatedEpisode, RatedMovie,
    RatedShow, ShowActivity, ShowRef, SocialIds, SocialNote, SyncEpisode, SyncItems, SyncMovie,
    SyncSeason, SyncShow, WatchedEpisode, WatchedMovie, WatchedSeason, WatchedShow,
};
pub use client::HttpSocialClient;
