pub mod checkpoint;
pub mod episode;
pub mod list;
pub mod movie;
pub mod provider;
pub mod show;

pub use checkpoint::Checkpoint;
pub use episode::{Episode, EpisodeFlag, EpisodeKey};
pub use list::{List, ListItem, ListItemType};
pub use movie::Movie;
pub use provider::{EntityFamily, Provider};
pub use show::{Show, UserNote};
