//! Playlist
//!
//! An ordered sequence of clip entries (producer + in/out range)
//! presented to the graph as a single virtual producer, so it connects
//! to a consumer exactly like one producer. An absolute playlist
//! position resolves to (entry, relative offset) by a prefix-sum scan
//! over entry lengths; the mapping is deterministic and previously
//! resolved positions stay stable when entries are appended later.
//!
//! As playback reaches the final frame of an entry the playlist fires
//! `"playlist-next"` carrying that entry's clip info, so callers
//! observe per-clip completion without polling. Every entry fires,
//! including the last one, whether the stream then moves to the next
//! entry or ends.

use crate::events::EventData;
use crate::producer::{Producer, ProducerCore};
use crate::service::{Service, ServiceNode};
use reel_core::{Frame, Profile, ReelError, Result};
use std::sync::{Arc, Mutex, RwLock};

/// One clip entry
struct Entry {
    producer: Arc<dyn Producer>,
    in_point: i64,
    out_point: i64,
}

impl Entry {
    fn frame_count(&self) -> i64 {
        self.out_point - self.in_point + 1
    }
}

/// Introspection record for one playlist entry
#[derive(Clone)]
pub struct ClipInfo {
    /// Entry index in the playlist
    pub index: usize,
    /// The entry producer's `resource` property
    pub resource: String,
    /// Entry in point within the producer
    pub in_point: i64,
    /// Entry out point within the producer (inclusive)
    pub out_point: i64,
    /// Frames contributed by this entry
    pub frame_count: i64,
    /// Absolute playlist position where this entry starts
    pub start: i64,
    /// The producer backing this entry
    pub producer: Arc<dyn Producer>,
}

impl std::fmt::Debug for ClipInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipInfo")
            .field("index", &self.index)
            .field("resource", &self.resource)
            .field("in_point", &self.in_point)
            .field("out_point", &self.out_point)
            .field("frame_count", &self.frame_count)
            .field("start", &self.start)
            .finish()
    }
}

/// Ordered clip sequence acting as a virtual producer
pub struct Playlist {
    core: ProducerCore,
    entries: RwLock<Vec<Entry>>,
    last_notified: Mutex<Option<usize>>,
}

impl Playlist {
    /// Create an empty playlist
    pub fn new(profile: Arc<Profile>) -> Arc<Self> {
        let core = ProducerCore::new("playlist", profile, 0);
        core.service().set("resource", "<playlist>");
        Arc::new(Self {
            core,
            entries: RwLock::new(Vec::new()),
            last_notified: Mutex::new(None),
        })
    }

    /// Append a clip entry
    ///
    /// Validates `0 <= in <= out < producer.length`; a violating append
    /// is rejected without mutating the playlist. The same producer may
    /// back several entries.
    pub fn append(&self, producer: Arc<dyn Producer>, in_point: i64, out_point: i64) -> Result<()> {
        let length = producer.length();
        if in_point < 0 || in_point > out_point || out_point >= length {
            return Err(ReelError::OutOfRange {
                in_point,
                out_point,
                length,
            });
        }

        let total = {
            let mut entries = self.entries.write().unwrap();
            entries.push(Entry {
                producer,
                in_point,
                out_point,
            });
            entries.iter().map(Entry::frame_count).sum::<i64>()
        };

        let service = self.core.service();
        service.set("length", total);
        service.set("out", total - 1);
        tracing::trace!(in_point, out_point, total, "playlist entry appended");
        Ok(())
    }

    /// Append a producer over its own current clip range
    pub fn append_clip(&self, producer: Arc<dyn Producer>) -> Result<()> {
        let (in_point, out_point) = (producer.in_point(), producer.out_point());
        self.append(producer, in_point, out_point)
    }

    /// Number of entries
    pub fn count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
        *self.last_notified.lock().unwrap() = None;
        let service = self.core.service();
        service.set("length", 0);
        service.set("out", -1);
    }

    /// Introspect the entry at `index`
    pub fn clip_info(&self, index: usize) -> Option<ClipInfo> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(index)?;
        let start = entries[..index].iter().map(Entry::frame_count).sum();
        Some(ClipInfo {
            index,
            resource: entry.producer.service().get_string("resource"),
            in_point: entry.in_point,
            out_point: entry.out_point,
            frame_count: entry.frame_count(),
            start,
            producer: Arc::clone(&entry.producer),
        })
    }

    /// Map an absolute playlist position to (entry index, relative
    /// offset within the entry)
    pub fn resolve(&self, position: i64) -> Option<(usize, i64)> {
        if position < 0 {
            return None;
        }
        let entries = self.entries.read().unwrap();
        let mut start = 0;
        for (index, entry) in entries.iter().enumerate() {
            let count = entry.frame_count();
            if position < start + count {
                return Some((index, position - start));
            }
            start += count;
        }
        None
    }
}

impl ServiceNode for Playlist {
    fn service(&self) -> &Service {
        self.core.service()
    }
}

impl Producer for Playlist {
    fn producer_core(&self) -> &ProducerCore {
        &self.core
    }

    fn read_frame(&self, position: i64) -> Option<Frame> {
        // Copy what the read needs out of the entry table so no lock is
        // held while firing events or rendering.
        let (index, offset, producer, in_point, frame_count) =
            self.resolve(position).and_then(|(index, offset)| {
                let entries = self.entries.read().unwrap();
                let entry = entries.get(index)?;
                Some((
                    index,
                    offset,
                    Arc::clone(&entry.producer),
                    entry.in_point,
                    entry.frame_count(),
                ))
            })?;

        // Serving an entry's final frame completes that clip; notify
        // once per entry as playback reaches it.
        if offset == frame_count - 1 {
            let crossing = {
                let mut last = self.last_notified.lock().unwrap();
                if *last == Some(index) {
                    false
                } else {
                    *last = Some(index);
                    true
                }
            };
            if crossing {
                if let Some(info) = self.clip_info(index) {
                    self.service()
                        .events()
                        .fire("playlist-next", &EventData::Clip(info));
                }
            }
        }

        // Tolerate an entry producer refusing the read; serve a blank
        // frame rather than ending the stream early.
        let mut frame = producer
            .read_frame(in_point + offset)
            .unwrap_or_else(|| Frame::new(position));
        frame.set_position(position);
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producers::CountProducer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn profile() -> Arc<Profile> {
        Arc::new(Profile::custom(4, 2, 25, 1))
    }

    fn count_producer(length: i64) -> Arc<CountProducer> {
        let producer = CountProducer::new(profile());
        producer.set_length(length);
        producer
    }

    #[test]
    fn append_extends_length_by_entry_frames() {
        let playlist = Playlist::new(profile());
        let producer = count_producer(100);

        playlist.append(producer, 10, 49).unwrap();
        assert_eq!(playlist.length(), 40);
        assert_eq!(playlist.out_point(), 39);

        let info = playlist.clip_info(0).unwrap();
        assert_eq!((info.in_point, info.out_point), (10, 49));
        assert_eq!(info.frame_count, 40);
        assert_eq!(info.start, 0);
    }

    #[test]
    fn out_of_range_append_is_rejected_without_mutation() {
        let playlist = Playlist::new(profile());
        let producer = count_producer(100);

        assert!(playlist.append(Arc::clone(&producer) as _, 0, 100).is_err());
        assert!(playlist.append(Arc::clone(&producer) as _, 50, 40).is_err());
        assert!(playlist.append(Arc::clone(&producer) as _, -1, 10).is_err());
        assert_eq!(playlist.length(), 0);
        assert_eq!(playlist.count(), 0);
    }

    #[test]
    fn two_whole_range_entries_resolve_positions() {
        let playlist = Playlist::new(profile());
        playlist.append(count_producer(100), 0, 99).unwrap();
        playlist.append(count_producer(50), 0, 49).unwrap();

        assert_eq!(playlist.length(), 150);
        assert_eq!(playlist.resolve(120), Some((1, 20)));
        assert_eq!(playlist.resolve(0), Some((0, 0)));
        assert_eq!(playlist.resolve(99), Some((0, 99)));
        assert_eq!(playlist.resolve(100), Some((1, 0)));
        assert_eq!(playlist.resolve(150), None);

        // The frame served at 120 comes from the second producer at
        // relative offset 20.
        let frame = playlist.read_frame(120).unwrap();
        assert_eq!(frame.position(), 120);
        assert_eq!(frame.properties().get_int("count"), 20);
    }

    #[test]
    fn same_producer_reused_across_entries() {
        let playlist = Playlist::new(profile());
        let producer = count_producer(100);
        playlist.append(Arc::clone(&producer) as _, 0, 9).unwrap();
        playlist.append(producer, 90, 99).unwrap();

        assert_eq!(playlist.length(), 20);
        let frame = playlist.read_frame(15).unwrap();
        assert_eq!(frame.properties().get_int("count"), 95);
    }

    #[test]
    fn resolution_is_stable_under_later_appends() {
        let playlist = Playlist::new(profile());
        playlist.append(count_producer(30), 0, 29).unwrap();
        assert_eq!(playlist.resolve(12), Some((0, 12)));

        playlist.append(count_producer(30), 0, 29).unwrap();
        // Previously resolved positions keep their mapping
        assert_eq!(playlist.resolve(12), Some((0, 12)));
        assert_eq!(playlist.resolve(45), Some((1, 15)));
    }

    #[test]
    fn empty_playlist_serves_nothing() {
        let playlist = Playlist::new(profile());
        assert_eq!(playlist.length(), 0);
        assert_eq!(playlist.playable_frames(), 0);
        assert!(playlist.read_frame(0).is_none());
    }

    #[test]
    fn entry_completion_fires_playlist_next() {
        let playlist = Playlist::new(profile());
        playlist.append(count_producer(3), 0, 2).unwrap();
        playlist.append(count_producer(2), 0, 1).unwrap();

        let finished = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&finished);
        let _listener = playlist.service().events().listen("playlist-next", move |data| {
            if let EventData::Clip(info) = data {
                sink.lock().unwrap().push((info.index, info.frame_count));
            }
        });

        playlist.read_frame(0).unwrap();
        playlist.read_frame(1).unwrap();
        assert!(finished.lock().unwrap().is_empty());

        // Reaching entry 0's final frame reports that clip
        playlist.read_frame(2).unwrap();
        assert_eq!(*finished.lock().unwrap(), vec![(0, 3)]);

        // The final entry reports too, as its last frame plays out
        playlist.read_frame(3).unwrap();
        playlist.read_frame(4).unwrap();
        assert_eq!(*finished.lock().unwrap(), vec![(0, 3), (1, 2)]);

        // Reading past the end adds nothing
        assert!(playlist.read_frame(5).is_none());
        assert_eq!(*finished.lock().unwrap(), vec![(0, 3), (1, 2)]);
    }

    #[test]
    fn completion_fires_once_per_entry() {
        let playlist = Playlist::new(profile());
        playlist.append(count_producer(2), 0, 1).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&fired);
        let _listener = playlist
            .service()
            .events()
            .listen("playlist-next", move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            });

        playlist.read_frame(0).unwrap();
        playlist.read_frame(1).unwrap();
        assert!(playlist.read_frame(2).is_none());
        assert!(playlist.read_frame(2).is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_resets_the_sequence() {
        let playlist = Playlist::new(profile());
        playlist.append(count_producer(10), 0, 9).unwrap();
        playlist.clear();
        assert_eq!(playlist.length(), 0);
        assert_eq!(playlist.count(), 0);
        assert!(playlist.read_frame(0).is_none());
    }

    #[test]
    fn append_clip_uses_producer_range() {
        let playlist = Playlist::new(profile());
        let producer = count_producer(100);
        producer.set_in_out(20, 39).unwrap();

        playlist.append_clip(producer).unwrap();
        assert_eq!(playlist.length(), 20);
        let info = playlist.clip_info(0).unwrap();
        assert_eq!((info.in_point, info.out_point), (20, 39));
    }
}
