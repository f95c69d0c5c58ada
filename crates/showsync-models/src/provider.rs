use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Backup/list service.
    Cloud,
    /// Social tracking service.
    Social,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Cloud => "cloud",
            Provider::Social => "social",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of checkpointing: one per provider and family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityFamily {
    Episodes,
    EpisodesWatched,
    EpisodesCollected,
    EpisodeRatings,
    Shows,
    ShowRatings,
    Movies,
    MoviesCollection,
    MoviesWatchlist,
    MoviesWatched,
    MovieRatings,
    Lists,
    Notes,
}

impl EntityFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityFamily::Episodes => "episodes",
            EntityFamily::EpisodesWatched => "episodes_watched",
            EntityFamily::EpisodesCollected => "episodes_collected",
            EntityFamily::EpisodeRatings => "episode_ratings",
            EntityFamily::Shows => "shows",
            EntityFamily::ShowRatings => "show_ratings",
            EntityFamily::Movies => "movies",
            EntityFamily::MoviesCollection => "movies_collection",
            EntityFamily::MoviesWatchlist => "movies_watchlist",
            EntityFamily::MoviesWatched => "movies_watched",
            EntityFamily::MovieRatings => "movie_ratings",
            EntityFamily::Lists => "lists",
            EntityFamily::Notes => "notes",
        }
    }

    pub const ALL: [EntityFamily; 13] = [
        EntityFamily::Episodes,
        EntityFamily::EpisodesWatched,
        EntityFamily::EpisodesCollected,
        EntityFamily::EpisodeRatings,
        EntityFamily::Shows,
        EntityFamily::ShowRatings,
        EntityFamily::Movies,
        EntityFamily::MoviesCollection,
        EntityFamily::MoviesWatchlist,
        EntityFamily::MoviesWatched,
        EntityFamily::MovieRatings,
        EntityFamily::Lists,
        EntityFamily::Notes,
    ];
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
