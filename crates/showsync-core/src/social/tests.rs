use super::*;
use crate::store::{LocalStore, StoreOp};
use crate::tasks::TaskKind;
use crate::testing::{test_context, FakeMetadata, FakeSocial};
use chrono::{DateTime, Duration, Utc};
use showsync_models::{Episode, EntityFamily, EpisodeFlag, Movie, Show, UserNote};
use showsync_remote::social::{
    EpisodeNumber, ListedMovie, MovieActivity, MovieRef, RatedEpisode, ShowRef, SocialNote,
    WatchedEpisode, WatchedSeason, WatchedShow,
};

fn watched_show(tmdb_id: u32, episodes: &[(u32, Option<i32>)]) -> WatchedShow {
    WatchedShow {
        show: ShowRef::tmdb(tmdb_id),
        last_watched_at: None,
        seasons: vec![WatchedSeason {
            number: 1,
            episodes: episodes
                .iter()
                .map(|&(number, plays)| WatchedEpisode { number, plays, last_watched_at: None })
                .collect(),
        }],
    }
}

fn seed_show(ctx: &SyncContext, tmdb_id: u32, episodes: &[(u32, EpisodeFlag, u32)]) {
    let mut ops = vec![StoreOp::InsertShow(Show::new(tmdb_id, "Show"))];
    for &(number, flag, plays) in episodes {
        ops.push(StoreOp::UpsertEpisodeInfo(
            Episode::new(EpisodeKey::new(tmdb_id, 1, number)).with_watched(flag, plays),
        ));
    }
    ctx.store.apply(&ops).unwrap();
}

fn episode(ctx: &SyncContext, show: u32, number: u32) -> Episode {
    ctx.store
        .episodes_of_show(show)
        .unwrap()
        .into_iter()
        .find(|e| e.key.number == number)
        .unwrap()
}

fn mark_synced(ctx: &SyncContext, family: EntityFamily, at: DateTime<Utc>) {
    ctx.complete(Provider::Social, family, at).unwrap();
}

#[tokio::test]
async fn test_watched_keeps_local_plays_when_remote_has_none() {
    let ctx = test_context();
    seed_show(
        &ctx,
        1,
        &[
            (1, EpisodeFlag::Watched, 3),
            (2, EpisodeFlag::Watched, 3),
            (3, EpisodeFlag::Unwatched, 0),
        ],
    );
    let social = FakeSocial::new();
    social.state.lock().watched_shows = vec![watched_show(1, &[(1, None), (2, Some(5)), (3, Some(0))])];

    EpisodeSync::new(&ctx, &social).sync_watched(Some(Utc::now())).await.unwrap();

    assert_eq!(episode(&ctx, 1, 1).plays, 3);
    assert_eq!(episode(&ctx, 1, 2).plays, 5);
    let third = episode(&ctx, 1, 3);
    assert_eq!(third.watched, EpisodeFlag::Watched);
    assert_eq!(third.plays, 1);
}

#[tokio::test]
async fn test_delta_unwatches_missing_episodes_but_keeps_skipped() {
    let ctx = test_context();
    seed_show(&ctx, 1, &[(1, EpisodeFlag::Watched, 2), (2, EpisodeFlag::Skipped, 0)]);
    let last = Utc::now() - Duration::hours(1);
    mark_synced(&ctx, EntityFamily::EpisodesWatched, last);
    let social = FakeSocial::new();

    EpisodeSync::new(&ctx, &social).sync_watched(Some(Utc::now())).await.unwrap();

    let first = episode(&ctx, 1, 1);
    assert_eq!(first.watched, EpisodeFlag::Unwatched);
    assert_eq!(first.plays, 0);
    assert_eq!(episode(&ctx, 1, 2).watched, EpisodeFlag::Skipped);
    assert!(social.state.lock().history.is_empty());
}

#[tokio::test]
async fn test_merge_uploads_local_only_watched_episodes() {
    let ctx = test_context();
    seed_show(&ctx, 1, &[(1, EpisodeFlag::Watched, 1), (2, EpisodeFlag::Unwatched, 0)]);
    let social = FakeSocial::new();

    EpisodeSync::new(&ctx, &social).sync_watched(None).await.unwrap();

    let state = social.state.lock();
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history[0].item_count(), 1);
    assert_eq!(episode(&ctx, 1, 1).watched, EpisodeFlag::Watched);
    assert!(ctx.checkpoint(Provider::Social, EntityFamily::EpisodesWatched).merged);
}

#[tokio::test]
async fn test_unchanged_activity_skips_download() {
    let ctx = test_context();
    seed_show(&ctx, 1, &[(1, EpisodeFlag::Watched, 1)]);
    let last = Utc::now();
    mark_synced(&ctx, EntityFamily::EpisodesWatched, last);
    let social = FakeSocial::new();

    EpisodeSync::new(&ctx, &social)
        .sync_watched(Some(last - Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(social.state.lock().downloads, 0);
    assert_eq!(episode(&ctx, 1, 1).watched, EpisodeFlag::Watched);
}

#[tokio::test]
async fn test_unknown_remote_shows_are_scheduled() {
    let ctx = test_context();
    seed_show(&ctx, 1, &[(1, EpisodeFlag::Unwatched, 0)]);
    let social = FakeSocial::new();
    social.state.lock().watched_shows = vec![watched_show(1, &[(1, None)]), watched_show(99, &[(1, None)])];

    EpisodeSync::new(&ctx, &social).sync_watched(None).await.unwrap();

    assert_eq!(ctx.tasks.take(TaskKind::AddShows), vec![99]);
}

#[tokio::test]
async fn test_episode_ratings_tolerance() {
    let ctx = test_context();
    seed_show(&ctx, 1, &[(1, EpisodeFlag::Watched, 1), (2, EpisodeFlag::Watched, 1), (3, EpisodeFlag::Watched, 1)]);
    ctx.store
        .apply(&[StoreOp::SetEpisodeRating { key: EpisodeKey::new(1, 1, 3), rating: Some(2) }])
        .unwrap();
    let last = Utc::now() - Duration::hours(1);
    mark_synced(&ctx, EntityFamily::EpisodeRatings, last);

    let rated = |number: u32, minutes: i64, rating: u8| RatedEpisode {
        rated_at: last - Duration::minutes(minutes),
        rating,
        show: ShowRef::tmdb(1),
        episode: EpisodeNumber { season: 1, number },
    };
    let social = FakeSocial::new();
    social.state.lock().episode_ratings = vec![rated(1, 4, 8), rated(2, 6, 9)];

    RatingsSync::new(&ctx, &social)
        .download_episode_ratings(Some(Utc::now()))
        .await
        .unwrap();

    assert_eq!(episode(&ctx, 1, 1).user_rating, Some(8));
    assert_eq!(episode(&ctx, 1, 2).user_rating, None);
    // Not a first run, so existing ratings stay.
    assert_eq!(episode(&ctx, 1, 3).user_rating, Some(2));
}

#[tokio::test]
async fn test_first_ratings_run_replaces_local_ratings() {
    let ctx = test_context();
    seed_show(&ctx, 1, &[(1, EpisodeFlag::Watched, 1), (2, EpisodeFlag::Watched, 1)]);
    ctx.store
        .apply(&[StoreOp::SetEpisodeRating { key: EpisodeKey::new(1, 1, 2), rating: Some(2) }])
        .unwrap();
    let social = FakeSocial::new();
    social.state.lock().episode_ratings = vec![RatedEpisode {
        rated_at: Utc::now() - Duration::days(300),
        rating: 7,
        show: ShowRef::tmdb(1),
        episode: EpisodeNumber { season: 1, number: 1 },
    }];

    RatingsSync::new(&ctx, &social).download_episode_ratings(None).await.unwrap();

    assert_eq!(episode(&ctx, 1, 1).user_rating, Some(7));
    assert_eq!(episode(&ctx, 1, 2).user_rating, None);
}

fn collected_movie(ctx: &SyncContext, tmdb_id: u32) {
    let mut movie = Movie::new(tmdb_id, "Movie");
    movie.in_collection = true;
    ctx.store.apply(&[StoreOp::UpsertMovie(movie)]).unwrap();
}

#[tokio::test]
async fn test_movie_merge_uploads_local_only_movies() {
    let ctx = test_context();
    collected_movie(&ctx, 5);
    let social = FakeSocial::new();
    social.state.lock().collected_movies = vec![ListedMovie { listed_at: None, movie: MovieRef::tmdb(6) }];

    MovieSync::new(&ctx, &social).sync(&MovieActivity::default()).await.unwrap();

    assert!(ctx.store.movie(5).unwrap().unwrap().in_collection);
    assert!(ctx.store.movie(6).unwrap().unwrap().in_collection);
    assert_eq!(ctx.tasks.take(TaskKind::AddMovies), vec![6]);
    let state = social.state.lock();
    assert_eq!(state.collection.len(), 1);
    assert_eq!(state.collection[0].movies[0].ids.tmdb, Some(5));
    assert!(ctx.checkpoint(Provider::Social, EntityFamily::Movies).merged);
}

#[tokio::test]
async fn test_movie_delta_mirrors_remote() {
    let ctx = test_context();
    collected_movie(&ctx, 5);
    let last = Utc::now() - Duration::hours(1);
    for family in [
        EntityFamily::Movies,
        EntityFamily::MoviesCollection,
        EntityFamily::MoviesWatchlist,
        EntityFamily::MoviesWatched,
    ] {
        mark_synced(&ctx, family, last);
    }
    let social = FakeSocial::new();
    let activity = MovieActivity { collected_at: Some(Utc::now()), ..Default::default() };

    MovieSync::new(&ctx, &social).sync(&activity).await.unwrap();

    assert!(!ctx.store.movie(5).unwrap().unwrap().in_collection);
    assert!(social.state.lock().collection.is_empty());
    // Only the list with remote changes was downloaded.
    assert_eq!(social.state.lock().downloads, 1);
}

#[tokio::test]
async fn test_orchestrator_removes_unused_movies_after_delta() {
    let ctx = test_context();
    collected_movie(&ctx, 5);
    let last = Utc::now() - Duration::hours(1);
    for family in [
        EntityFamily::Movies,
        EntityFamily::MoviesCollection,
        EntityFamily::MoviesWatchlist,
        EntityFamily::MoviesWatched,
    ] {
        mark_synced(&ctx, family, last);
    }
    let social = FakeSocial::new();
    social.state.lock().activity.movies.collected_at = Some(Utc::now());

    let outcome = SocialOrchestrator::new(&ctx, &social, &FakeMetadata::new()).sync().await.unwrap();

    assert!(outcome.is_success());
    assert!(ctx.store.movie(5).unwrap().is_none());
}

fn noted_show(ctx: &SyncContext, tmdb_id: u32, text: &str, remote_id: Option<u64>) {
    ctx.store
        .apply(&[
            StoreOp::InsertShow(Show::new(tmdb_id, "Show")),
            StoreOp::SetShowNote {
                tmdb_id,
                note: Some(UserNote { text: text.to_string(), remote_id }),
            },
        ])
        .unwrap();
}

fn note_of(ctx: &SyncContext, tmdb_id: u32) -> Option<UserNote> {
    ctx.store.show(tmdb_id).unwrap().unwrap().note
}

fn remote_note(id: u64, show_tmdb_id: u32, text: &str, updated_at: Option<DateTime<Utc>>) -> SocialNote {
    SocialNote { id, show_tmdb_id, text: text.to_string(), updated_at }
}

#[tokio::test]
async fn test_notes_limit_keeps_partial_success() {
    let ctx = test_context();
    noted_show(&ctx, 1, "first", None);
    noted_show(&ctx, 2, "second", None);
    noted_show(&ctx, 3, "third", None);
    let social = FakeSocial::new();
    social.state.lock().note_limit = Some(1);

    let result = NotesSync::new(&ctx, &social).sync(None).await;

    assert!(matches!(result, Err(SyncError::LimitExceeded(_))));
    assert_eq!(note_of(&ctx, 1).unwrap().remote_id, Some(1000));
    assert_eq!(note_of(&ctx, 2).unwrap().remote_id, None);
    assert_eq!(note_of(&ctx, 3).unwrap().remote_id, None);
    assert_eq!(social.state.lock().added_notes.len(), 1);
}

#[tokio::test]
async fn test_notes_limit_is_fatal_for_the_run() {
    let ctx = test_context();
    noted_show(&ctx, 1, "first", None);
    noted_show(&ctx, 2, "second", None);
    let social = FakeSocial::new();
    social.state.lock().note_limit = Some(1);

    let outcome = SocialOrchestrator::new(&ctx, &social, &FakeMetadata::new()).sync().await.unwrap();

    assert!(matches!(outcome, StepOutcome::Fatal(_)));
    assert_eq!(note_of(&ctx, 1).unwrap().remote_id, Some(1000));
}

#[tokio::test]
async fn test_notes_merge_keeps_local_text() {
    let ctx = test_context();
    noted_show(&ctx, 1, "local", None);
    ctx.store.apply(&[StoreOp::InsertShow(Show::new(2, "Show"))]).unwrap();
    let social = FakeSocial::new();
    social.state.lock().notes = vec![
        remote_note(5, 1, "remote", None),
        remote_note(6, 2, "adopted", None),
        remote_note(7, 3, "unknown show", None),
    ];

    NotesSync::new(&ctx, &social).sync(None).await.unwrap();

    assert_eq!(note_of(&ctx, 1), Some(UserNote { text: "local".into(), remote_id: Some(5) }));
    assert_eq!(note_of(&ctx, 2), Some(UserNote { text: "adopted".into(), remote_id: Some(6) }));
    let state = social.state.lock();
    assert_eq!(state.updated_notes, vec![(5, "local".to_string())]);
    assert!(state.added_notes.is_empty());
}

#[tokio::test]
async fn test_notes_delta_follows_remote_and_deletes_cleared() {
    let ctx = test_context();
    noted_show(&ctx, 1, "old", Some(5));
    noted_show(&ctx, 2, "gone remotely", Some(6));
    noted_show(&ctx, 3, "", Some(7));
    let last = Utc::now() - Duration::hours(1);
    mark_synced(&ctx, EntityFamily::Notes, last);
    let social = FakeSocial::new();
    social.state.lock().notes = vec![
        remote_note(5, 1, "new", None),
        remote_note(7, 3, "still there", None),
    ];

    NotesSync::new(&ctx, &social).sync(Some(Utc::now())).await.unwrap();

    assert_eq!(note_of(&ctx, 1), Some(UserNote { text: "new".into(), remote_id: Some(5) }));
    assert_eq!(note_of(&ctx, 2), None);
    assert_eq!(note_of(&ctx, 3), None);
    assert_eq!(social.state.lock().deleted_notes, vec![7]);
}

#[tokio::test]
async fn test_notes_changed_before_last_run_are_not_reapplied() {
    let ctx = test_context();
    noted_show(&ctx, 1, "edited", Some(5));
    noted_show(&ctx, 2, "before", Some(6));
    noted_show(&ctx, 3, "kept", Some(7));
    let last = Utc::now() - Duration::hours(1);
    mark_synced(&ctx, EntityFamily::Notes, last);
    let social = FakeSocial::new();
    social.state.lock().notes = vec![
        remote_note(5, 1, "old", Some(last - Duration::minutes(6))),
        remote_note(6, 2, "after", Some(last - Duration::minutes(4))),
        remote_note(7, 3, "kept", Some(last - Duration::days(30))),
    ];

    NotesSync::new(&ctx, &social).sync(Some(Utc::now())).await.unwrap();

    assert_eq!(note_of(&ctx, 1), Some(UserNote { text: "edited".into(), remote_id: Some(5) }));
    assert_eq!(note_of(&ctx, 2), Some(UserNote { text: "after".into(), remote_id: Some(6) }));
    // Old but still present remotely, so not treated as deleted.
    assert_eq!(note_of(&ctx, 3), Some(UserNote { text: "kept".into(), remote_id: Some(7) }));
}

#[test]
fn test_tolerance_threshold_bounds() {
    let mut ctx = test_context();
    let last = Utc::now() - Duration::hours(1);
    assert_eq!(tolerance_threshold(&ctx, &ctx.checkpoint(Provider::Social, EntityFamily::Notes)), None);

    mark_synced(&ctx, EntityFamily::Notes, last);
    let checkpoint = ctx.checkpoint(Provider::Social, EntityFamily::Notes);
    let threshold = tolerance_threshold(&ctx, &checkpoint).unwrap();
    assert_eq!(checkpoint.last_sync.unwrap() - threshold, Duration::minutes(5));

    ctx.options.rating_tolerance_minutes = i64::MAX;
    assert_eq!(tolerance_threshold(&ctx, &checkpoint), Some(DateTime::<Utc>::MIN_UTC));
}

#[tokio::test]
async fn test_unauthorized_propagates() {
    let ctx = test_context();
    let social = FakeSocial::new();
    social.state.lock().unauthorized = true;

    let result = SocialOrchestrator::new(&ctx, &social, &FakeMetadata::new()).sync().await;

    assert!(matches!(result, Err(SyncError::Unauthorized(Provider::Social))));
}

#[tokio::test]
async fn test_failed_upload_keeps_family_unmerged() {
    let ctx = test_context();
    seed_show(&ctx, 1, &[(1, EpisodeFlag::Watched, 1)]);
    let social = FakeSocial::new();
    social.state.lock().fail_uploads = true;

    let outcome = SocialOrchestrator::new(&ctx, &social, &FakeMetadata::new()).sync().await.unwrap();

    assert!(matches!(outcome, StepOutcome::Recoverable(_)));
    assert!(!ctx.checkpoint(Provider::Social, EntityFamily::EpisodesWatched).merged);
    assert!(ctx.checkpoint(Provider::Social, EntityFamily::EpisodesCollected).merged);
}

#[test]
fn test_episode_items_grouped_by_show_and_season() {
    let items = episode_items(&[
        EpisodeKey::new(2, 1, 3),
        EpisodeKey::new(1, 2, 1),
        EpisodeKey::new(1, 1, 2),
        EpisodeKey::new(1, 1, 1),
    ]);
    assert_eq!(items.shows.len(), 2);
    assert_eq!(items.shows[0].ids.tmdb, Some(1));
    assert_eq!(items.shows[0].seasons.len(), 2);
    assert_eq!(items.shows[0].seasons[0].episodes.len(), 2);
    assert_eq!(items.item_count(), 4);
}
