//! Property tests for playlist and parameter bookkeeping

use aria_core::{AudioSource, Track, BAND_COUNT, MAX_BAND_GAIN_DB, MIN_BAND_GAIN_DB};
use aria_playback::{ParameterRangeError, ParameterStore, Playlist, ShuffleOrder};
use proptest::prelude::*;
use std::collections::HashSet;

fn track(id: &str) -> Track {
    Track::new(id, id, "Artist", AudioSource::url(format!("https://x.test/{id}.mp3")))
}

proptest! {
    #[test]
    fn band_gain_always_lands_in_range(index in 0..BAND_COUNT, gain in any::<f32>()) {
        let mut store = ParameterStore::new();
        let applied = store.set_band(index, gain).unwrap();

        prop_assert!((MIN_BAND_GAIN_DB..=MAX_BAND_GAIN_DB).contains(&applied));
        prop_assert_eq!(store.equalizer().gain(index), Some(applied));
        if gain.is_nan() {
            prop_assert_eq!(applied, 0.0);
        }
    }

    #[test]
    fn out_of_range_band_changes_nothing(index in BAND_COUNT..1000usize, gain in -50.0f32..50.0) {
        let mut store = ParameterStore::new();
        store.set_band(3, 4.0).unwrap();
        let before = *store.equalizer().gains();

        prop_assert_eq!(store.set_band(index, gain), Err(ParameterRangeError::BandIndex(index)));
        prop_assert_eq!(*store.equalizer().gains(), before);
    }

    #[test]
    fn playlist_ids_stay_unique(ids in prop::collection::vec("[a-c](-[2-3])?", 1..20)) {
        let mut playlist = Playlist::new("test");
        for id in &ids {
            playlist.add(track(id));
        }
        let unique: HashSet<&str> = playlist.tracks().iter().map(|t| t.id.as_str()).collect();
        prop_assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn reorder_keeps_the_current_track(
        len in 1..12usize,
        current in 0..12usize,
        from in 0..12usize,
        to in 0..12usize,
    ) {
        let (current, from, to) = (current % len, from % len, to % len);
        let mut playlist = Playlist::new("test");
        for i in 0..len {
            playlist.add(track(&format!("t{i}")));
        }
        playlist.set_current(Some(current)).unwrap();
        let playing = playlist.current_track().map(|t| t.id.clone());

        playlist.reorder(from, to).unwrap();

        prop_assert_eq!(playlist.len(), len);
        prop_assert_eq!(playlist.current_track().map(|t| t.id.clone()), playing);
    }

    #[test]
    fn shuffle_order_is_a_permutation(len in 1..40usize, current in 0..40usize, seed in any::<u64>()) {
        let current = current % len;
        let mut order = ShuffleOrder::new(Some(seed));
        order.regenerate(len, Some(current));

        let mut sorted = order.order().to_vec();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..len).collect::<Vec<_>>());
        prop_assert_eq!(order.first(), Some(current));
    }
}
