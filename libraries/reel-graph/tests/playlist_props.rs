//! Property-based tests for playlist append/bounds laws

use proptest::prelude::*;
use reel_core::Profile;
use reel_graph::producers::CountProducer;
use reel_graph::{Playlist, Producer};
use std::sync::Arc;

fn profile() -> Arc<Profile> {
    Arc::new(Profile::custom(4, 2, 25, 1))
}

proptest! {
    /// Every valid (in, out) append grows the playlist by exactly
    /// out - in + 1 frames and is introspectable at its index.
    #[test]
    fn valid_append_extends_by_entry_frames(
        length in 1i64..500,
        spans in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0), 1..8),
    ) {
        let playlist = Playlist::new(profile());
        let producer = CountProducer::new(profile());
        producer.set_length(length);

        let mut expected_total = 0;
        for (index, (a, b)) in spans.iter().enumerate() {
            let in_point = (a * length as f64) as i64;
            let out_point = in_point + ((b * (length - in_point) as f64) as i64);
            let out_point = out_point.min(length - 1);

            let before = playlist.length();
            playlist.append(Arc::clone(&producer) as _, in_point, out_point).unwrap();
            let added = out_point - in_point + 1;
            expected_total += added;

            prop_assert_eq!(playlist.length(), before + added);
            let info = playlist.clip_info(index).unwrap();
            prop_assert_eq!(info.in_point, in_point);
            prop_assert_eq!(info.out_point, out_point);
            prop_assert_eq!(info.frame_count, added);
        }
        prop_assert_eq!(playlist.length(), expected_total);
        prop_assert_eq!(playlist.count(), spans.len());
    }

    /// Appends violating 0 <= in <= out < length never mutate.
    #[test]
    fn invalid_append_never_mutates(
        length in 1i64..200,
        in_point in -50i64..250,
        out_point in -50i64..250,
    ) {
        prop_assume!(in_point < 0 || in_point > out_point || out_point >= length);

        let playlist = Playlist::new(profile());
        let producer = CountProducer::new(profile());
        producer.set_length(length);

        prop_assert!(playlist.append(producer, in_point, out_point).is_err());
        prop_assert_eq!(playlist.length(), 0);
        prop_assert_eq!(playlist.count(), 0);
    }

    /// The prefix-sum resolve maps every absolute position to the entry
    /// whose half-open range contains it, at the right offset.
    #[test]
    fn resolve_matches_prefix_sums(counts in prop::collection::vec(1i64..40, 1..6)) {
        let playlist = Playlist::new(profile());
        let producer = CountProducer::new(profile());
        producer.set_length(40);

        for &count in &counts {
            playlist.append(Arc::clone(&producer) as _, 0, count - 1).unwrap();
        }

        let mut start = 0;
        for (index, &count) in counts.iter().enumerate() {
            prop_assert_eq!(playlist.resolve(start), Some((index, 0)));
            prop_assert_eq!(playlist.resolve(start + count - 1), Some((index, count - 1)));
            start += count;
        }
        prop_assert_eq!(playlist.resolve(start), None);
    }
}
