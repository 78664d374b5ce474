//! Ordered track list with a current-track pointer
//!
//! Track ids are unique within a playlist: a colliding id is suffixed with
//! the smallest free `-n` (`n >= 2`), so `song`, `song-2`, `song-3`, ...

use crate::error::{Result, SessionError};
use aria_core::{PlaylistSnapshot, Track};

#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    id: String,
    tracks: Vec<Track>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: Vec::new(),
            current: None,
        }
    }

    /// Rebuild from a persisted snapshot; nothing is current afterwards
    pub fn from_snapshot(snapshot: PlaylistSnapshot) -> Self {
        let mut playlist = Self::new(snapshot.id);
        for track in snapshot.tracks {
            playlist.add(track);
        }
        playlist
    }

    /// Serializable view; in-memory sources are left out
    pub fn snapshot(&self) -> PlaylistSnapshot {
        PlaylistSnapshot {
            id: self.id.clone(),
            tracks: self
                .tracks
                .iter()
                .filter(|t| t.is_persistable())
                .cloned()
                .collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    /// Point at `index` (or at nothing); out-of-range indices are rejected
    pub fn set_current(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            self.check_index(i)?;
        }
        self.current = index;
        Ok(())
    }

    /// Append a track, returning the id it was stored under
    pub fn add(&mut self, mut track: Track) -> String {
        track.id = self.unique_id(&track.id);
        let id = track.id.clone();
        self.tracks.push(track);
        id
    }

    fn unique_id(&self, id: &str) -> String {
        if self.position_of(id).is_none() {
            return id.to_string();
        }
        (2..)
            .map(|n| format!("{id}-{n}"))
            .find(|candidate| self.position_of(candidate).is_none())
            .unwrap_or_else(|| id.to_string())
    }

    /// Remove the track at `index`
    ///
    /// Removing the current track leaves nothing current; removing one before
    /// it keeps the pointer on the same track.
    pub fn remove(&mut self, index: usize) -> Result<Track> {
        self.check_index(index)?;
        let track = self.tracks.remove(index);
        self.current = match self.current {
            Some(c) if c == index => None,
            Some(c) if c > index => Some(c - 1),
            other => other,
        };
        Ok(track)
    }

    /// Move a track; the current pointer follows the track it pointed at
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);

        self.current = self.current.map(|c| {
            if c == from {
                to
            } else if from < c && c <= to {
                c - 1
            } else if to <= c && c < from {
                c + 1
            } else {
                c
            }
        });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }

    /// Fill in a duration learned at load time
    pub fn update_duration(&mut self, index: usize, duration: f64) {
        if let Some(track) = self.tracks.get_mut(index) {
            track.duration = duration;
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(SessionError::IndexOutOfBounds {
                index,
                len: self.tracks.len(),
            })
        }
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aria_core::AudioSource;

    fn track(id: &str) -> Track {
        Track::new(id, id.to_uppercase(), "Artist", AudioSource::url(format!("https://x/{id}.mp3")))
    }

    fn ids(playlist: &Playlist) -> Vec<&str> {
        playlist.tracks().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn colliding_ids_are_suffixed() {
        let mut playlist = Playlist::default();
        assert_eq!(playlist.add(track("a")), "a");
        assert_eq!(playlist.add(track("a")), "a-2");
        assert_eq!(playlist.add(track("a")), "a-3");
        assert_eq!(ids(&playlist), ["a", "a-2", "a-3"]);
    }

    #[test]
    fn suffix_fills_the_first_gap() {
        let mut playlist = Playlist::default();
        playlist.add(track("a"));
        playlist.add(track("a"));
        playlist.add(track("a"));
        playlist.remove(1).unwrap();
        assert_eq!(playlist.add(track("a")), "a-2");
    }

    #[test]
    fn suffixed_input_does_not_collide() {
        let mut playlist = Playlist::default();
        playlist.add(track("a-2"));
        playlist.add(track("a"));
        assert_eq!(playlist.add(track("a")), "a-3");
    }

    #[test]
    fn removing_before_current_keeps_pointer_on_track() {
        let mut playlist = Playlist::default();
        for id in ["a", "b", "c"] {
            playlist.add(track(id));
        }
        playlist.set_current(Some(2)).unwrap();
        playlist.remove(0).unwrap();
        assert_eq!(playlist.current_track().unwrap().id, "c");
    }

    #[test]
    fn removing_current_clears_pointer() {
        let mut playlist = Playlist::default();
        for id in ["a", "b"] {
            playlist.add(track(id));
        }
        playlist.set_current(Some(1)).unwrap();
        playlist.remove(1).unwrap();
        assert_eq!(playlist.current_index(), None);
    }

    #[test]
    fn reorder_follows_current_track() {
        let mut playlist = Playlist::default();
        for id in ["a", "b", "c", "d"] {
            playlist.add(track(id));
        }
        playlist.set_current(Some(1)).unwrap();

        playlist.reorder(0, 3).unwrap();
        assert_eq!(ids(&playlist), ["b", "c", "d", "a"]);
        assert_eq!(playlist.current_track().unwrap().id, "b");

        playlist.reorder(0, 2).unwrap();
        assert_eq!(ids(&playlist), ["c", "d", "b", "a"]);
        assert_eq!(playlist.current_index(), Some(2));

        playlist.reorder(3, 0).unwrap();
        assert_eq!(playlist.current_track().unwrap().id, "b");
    }

    #[test]
    fn bad_indices_are_errors() {
        let mut playlist = Playlist::default();
        playlist.add(track("a"));
        assert!(playlist.remove(1).is_err());
        assert!(playlist.reorder(0, 1).is_err());
        assert!(playlist.set_current(Some(5)).is_err());
        assert_eq!(playlist.len(), 1);
    }

    #[test]
    fn snapshot_skips_in_memory_tracks() {
        let mut playlist = Playlist::new("mix");
        playlist.add(track("a"));
        playlist.add(Track::new("mem", "Mem", "Synth", AudioSource::bytes(vec![0u8; 4])));

        let snapshot = playlist.snapshot();
        assert_eq!(snapshot.id, "mix");
        assert_eq!(snapshot.tracks.len(), 1);

        let restored = Playlist::from_snapshot(snapshot);
        assert_eq!(ids(&restored), ["a"]);
        assert_eq!(restored.current_index(), None);
    }
}
