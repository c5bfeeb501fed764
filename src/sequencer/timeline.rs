// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Merged, absolute-time timeline.
//!
//! Flattens the per-track delta streams of a [`Sequence`] into one map from
//! absolute tick to the events at that tick. Within a tick, events keep
//! track order first and then their order inside the track.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use super::event::{Event, EventKind};
use super::sequence::Sequence;
use crate::error::{PlaybackError, Result};

/// Absolute-tick-indexed events of one song
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    events: BTreeMap<u64, Vec<Event>>,
    division: u32,
    track_count: usize,
    event_count: usize,
}

impl Timeline {
    /// Build a timeline from parsed tracks.
    ///
    /// # Errors
    /// `MalformedFile` if the division is non-positive, the sequence has no
    /// tracks, or a track does not end with an End-of-Track marker.
    pub fn build(sequence: &Sequence) -> Result<Self> {
        if sequence.division <= 0 {
            return Err(PlaybackError::MalformedFile(format!(
                "division must be positive, got {}",
                sequence.division
            )));
        }
        if sequence.tracks.is_empty() {
            return Err(PlaybackError::MalformedFile("file contains no tracks".to_string()));
        }

        let mut events: BTreeMap<u64, Vec<Event>> = BTreeMap::new();
        let mut event_count = 0;

        for (index, track) in sequence.tracks.iter().enumerate() {
            if !track.ends_with_end_of_track() {
                return Err(PlaybackError::MalformedFile(format!(
                    "track {} does not end with an End-of-Track marker",
                    index
                )));
            }

            let mut tick = 0u64;
            for track_event in &track.events {
                tick += track_event.delta as u64;
                events.entry(tick).or_default().push(Event {
                    tick,
                    track: index,
                    kind: track_event.kind.clone(),
                });
                event_count += 1;
            }
        }

        Ok(Self {
            events,
            division: sequence.division as u32,
            track_count: sequence.tracks.len(),
            event_count,
        })
    }

    /// Ticks per quarter note
    pub fn division(&self) -> u32 {
        self.division
    }

    pub fn track_count(&self) -> usize {
        self.track_count
    }

    /// Total number of events across all ticks
    pub fn len(&self) -> usize {
        self.event_count
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    /// Terminal tick; reaching it ends the song
    pub fn last_tick(&self) -> u64 {
        self.events.keys().next_back().copied().unwrap_or(0)
    }

    /// Events scheduled at exactly `tick`, in dispatch order
    pub fn events_at(&self, tick: u64) -> &[Event] {
        self.events.get(&tick).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Smallest tick with events that is strictly greater than `tick`
    pub fn next_tick_after(&self, tick: u64) -> Option<u64> {
        self.events
            .range((Excluded(tick), Unbounded))
            .next()
            .map(|(&t, _)| t)
    }

    /// Distinct ticks in increasing order
    pub fn ticks(&self) -> impl Iterator<Item = u64> + '_ {
        self.events.keys().copied()
    }

    /// All events in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.values().flatten()
    }

    /// First tempo change in dispatch order, if any
    pub fn initial_tempo(&self) -> Option<u32> {
        self.iter().find_map(|e| match e.kind {
            EventKind::Tempo(t) => Some(t),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::sequence::{Track, TrackEvent};

    fn track(events: &[(u32, EventKind)]) -> Track {
        Track::new(
            events
                .iter()
                .map(|(delta, kind)| TrackEvent::new(*delta, kind.clone()))
                .collect(),
        )
    }

    fn two_track_sequence() -> Sequence {
        Sequence::new(
            480,
            vec![
                track(&[
                    (0, EventKind::Tempo(500_000)),
                    (240, EventKind::note_on(0, 60, 100)),
                    (240, EventKind::note_off(0, 60)),
                    (0, EventKind::end_of_track()),
                ]),
                track(&[
                    (240, EventKind::note_on(1, 64, 90)),
                    (480, EventKind::note_off(1, 64)),
                    (0, EventKind::end_of_track()),
                ]),
            ],
        )
    }

    #[test]
    fn test_absolute_ticks() {
        let timeline = Timeline::build(&two_track_sequence()).unwrap();

        assert_eq!(timeline.ticks().collect::<Vec<_>>(), vec![0, 240, 480, 720]);
        assert_eq!(timeline.last_tick(), 720);
        assert_eq!(timeline.len(), 7);
        assert_eq!(timeline.track_count(), 2);
        assert_eq!(timeline.division(), 480);
    }

    #[test]
    fn test_same_tick_keeps_track_order() {
        let timeline = Timeline::build(&two_track_sequence()).unwrap();

        let at_240 = timeline.events_at(240);
        assert_eq!(at_240.len(), 2);
        assert_eq!(at_240[0].track, 0);
        assert_eq!(at_240[0].kind, EventKind::note_on(0, 60, 100));
        assert_eq!(at_240[1].track, 1);
        assert_eq!(at_240[1].kind, EventKind::note_on(1, 64, 90));

        // Within one track, order inside the track is kept
        let at_480 = timeline.events_at(480);
        assert_eq!(at_480[0].kind, EventKind::note_off(0, 60));
        assert!(at_480[1].kind.is_end_of_track());
    }

    #[test]
    fn test_ticks_non_decreasing_and_reconstructible() {
        let sequence = two_track_sequence();
        let timeline = Timeline::build(&sequence).unwrap();

        let ticks: Vec<u64> = timeline.iter().map(|e| e.tick).collect();
        assert!(ticks.windows(2).all(|w| w[0] <= w[1]));

        for (index, track) in sequence.tracks.iter().enumerate() {
            let mut expected = Vec::new();
            let mut tick = 0u64;
            for event in &track.events {
                tick += event.delta as u64;
                expected.push((tick, event.kind.clone()));
            }
            let actual: Vec<(u64, EventKind)> = timeline
                .iter()
                .filter(|e| e.track == index)
                .map(|e| (e.tick, e.kind.clone()))
                .collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_next_tick_after() {
        let timeline = Timeline::build(&two_track_sequence()).unwrap();
        assert_eq!(timeline.next_tick_after(0), Some(240));
        assert_eq!(timeline.next_tick_after(100), Some(240));
        assert_eq!(timeline.next_tick_after(240), Some(480));
        assert_eq!(timeline.next_tick_after(720), None);
        assert!(timeline.events_at(100).is_empty());
    }

    #[test]
    fn test_initial_tempo() {
        let timeline = Timeline::build(&two_track_sequence()).unwrap();
        assert_eq!(timeline.initial_tempo(), Some(500_000));
    }

    #[test]
    fn test_non_positive_division_is_malformed() {
        let mut sequence = two_track_sequence();
        sequence.division = 0;
        assert!(matches!(
            Timeline::build(&sequence),
            Err(PlaybackError::MalformedFile(_))
        ));

        sequence.division = -24;
        assert!(matches!(
            Timeline::build(&sequence),
            Err(PlaybackError::MalformedFile(_))
        ));
    }

    #[test]
    fn test_missing_end_of_track_is_malformed() {
        let sequence = Sequence::new(
            96,
            vec![track(&[(0, EventKind::note_on(0, 60, 100))])],
        );
        let err = Timeline::build(&sequence).unwrap_err();
        assert!(err.to_string().contains("track 0"));

        let empty = Sequence::new(96, vec![Track::default()]);
        assert!(Timeline::build(&empty).is_err());
    }

    #[test]
    fn test_no_tracks_is_malformed() {
        let sequence = Sequence::new(96, Vec::new());
        assert!(matches!(
            Timeline::build(&sequence),
            Err(PlaybackError::MalformedFile(_))
        ));
    }
}
