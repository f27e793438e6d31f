//! Temporal windowing of patient timelines into sentences.
//!
//! A window of `length` days slides over the timeline in `step`-day
//! increments, starting at the first event. Each position selects the
//! events with age in `[begin, begin + length)`. Empty windows and windows
//! with the same ages as the previously kept one are dropped. An isolated
//! event that falls within `merge_factor * length` days of the previous
//! window is merged into it instead of forming a sentence of its own.

use phe2vec_types::{ConceptId, PatientTimeline, Sentence};

use crate::types::{Phe2VecResult, WindowConfig};

/// The events selected at one window position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Window {
    /// Event ages, in timeline order.
    pub ages: Vec<u32>,
    /// Event concepts, parallel to `ages`.
    pub concepts: Vec<ConceptId>,
}

impl Window {
    /// Returns true if the window selected no events.
    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    /// Distinct concepts of the window.
    pub fn sentence(&self) -> Sentence {
        self.concepts.iter().cloned().collect()
    }

    /// Distinct concepts accepted by the filter.
    pub fn sentence_filtered<F>(&self, keep: F) -> Sentence
    where
        F: Fn(&str) -> bool,
    {
        self.concepts
            .iter()
            .filter(|c| keep(c.as_str()))
            .cloned()
            .collect()
    }

    fn prepended_by(self, previous: &Window) -> Window {
        let mut ages = previous.ages.clone();
        ages.extend(self.ages);
        let mut concepts = previous.concepts.clone();
        concepts.extend(self.concepts);
        Window { ages, concepts }
    }
}

/// Carry-over between window positions: the last window that was kept.
#[derive(Debug, Clone, Default)]
pub struct WindowState {
    last: Option<Window>,
}

impl WindowState {
    /// The last kept window, if any.
    pub fn last(&self) -> Option<&Window> {
        self.last.as_ref()
    }
}

/// Slides a time window over patient timelines.
///
/// # Example
///
/// ```
/// use phe2vec_core::{TemporalWindower, WindowConfig};
/// use phe2vec_types::{ClinicalEvent, PatientTimeline};
///
/// let windower = TemporalWindower::new(WindowConfig::new(15, 5))?;
/// let timeline = PatientTimeline::new("p1", vec![ClinicalEvent::new("c", 10)]);
///
/// let sentences = windower.sentences(&timeline);
/// assert_eq!(sentences.len(), 1);
/// # Ok::<(), phe2vec_core::Phe2VecError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TemporalWindower {
    config: WindowConfig,
}

impl TemporalWindower {
    /// Creates a windower.
    ///
    /// # Errors
    /// Returns an error if the window length or step is zero.
    pub fn new(config: WindowConfig) -> Phe2VecResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the windowing configuration.
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Kept windows of a timeline, in cursor order.
    ///
    /// The timeline must be ordered by age. An empty timeline yields no windows.
    pub fn windows(&self, timeline: &PatientTimeline) -> Vec<Window> {
        let ages = timeline.ages();
        let (first, last) = match (ages.first(), ages.last()) {
            (Some(&first), Some(&last)) => (u64::from(first), u64::from(last)),
            _ => return Vec::new(),
        };

        let length = u64::from(self.config.length);
        let step = u64::from(self.config.step);

        let mut state = WindowState::default();
        let mut kept = Vec::new();
        let mut begin = first;

        while begin <= last {
            let end = begin + length;
            let il = ages.partition_point(|&a| u64::from(a) < begin);
            let ir = ages.partition_point(|&a| u64::from(a) < end);
            begin += step;

            let candidate = Window {
                ages: ages[il..ir].to_vec(),
                concepts: timeline.events[il..ir]
                    .iter()
                    .map(|e| e.concept.clone())
                    .collect(),
            };

            if let Some(window) = self.advance(&mut state, candidate) {
                kept.push(window);
            }
        }

        kept
    }

    /// Applies the drop and merge rules to one window position.
    ///
    /// Returns the window to keep, after merging, or `None` if the position
    /// is dropped. `state` is updated with the kept window.
    pub fn advance(&self, state: &mut WindowState, candidate: Window) -> Option<Window> {
        if candidate.is_empty() {
            return None;
        }

        let window = match state.last.as_ref() {
            Some(previous) if previous.ages == candidate.ages => return None,
            Some(previous) if self.absorbs(previous, &candidate) => {
                candidate.prepended_by(previous)
            }
            _ => candidate,
        };

        state.last = Some(window.clone());
        Some(window)
    }

    /// Returns true if an isolated event is close enough to be merged into
    /// the previous window.
    fn absorbs(&self, previous: &Window, candidate: &Window) -> bool {
        let factor = match self.config.merge_factor {
            Some(factor) => factor,
            None => return false,
        };
        if candidate.ages.len() != 1 || previous.concepts.is_empty() {
            return false;
        }
        let (Some(&age), Some(&previous_last)) = (candidate.ages.first(), previous.ages.last())
        else {
            return false;
        };

        let reach = i64::from(age) - i64::from(factor) * i64::from(self.config.length);
        reach <= i64::from(previous_last)
    }

    /// Sentences of a timeline, one per kept window.
    pub fn sentences(&self, timeline: &PatientTimeline) -> Vec<Sentence> {
        self.windows(timeline).iter().map(Window::sentence).collect()
    }

    /// Sentences restricted to accepted concepts.
    ///
    /// Concepts are filtered while each sentence is built; sentences left
    /// empty are not emitted.
    pub fn sentences_filtered<F>(&self, timeline: &PatientTimeline, keep: F) -> Vec<Sentence>
    where
        F: Fn(&str) -> bool,
    {
        self.windows(timeline)
            .iter()
            .map(|w| w.sentence_filtered(&keep))
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phe2vec_types::ClinicalEvent;
    use std::collections::BTreeSet;

    fn timeline(events: &[(&str, u32)]) -> PatientTimeline {
        PatientTimeline::new(
            "p1",
            events
                .iter()
                .map(|(c, a)| ClinicalEvent::new(*c, *a))
                .collect(),
        )
    }

    fn set(concepts: &[&str]) -> Sentence {
        concepts.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_single_event_gives_one_sentence() {
        let windower = TemporalWindower::new(WindowConfig::new(15, 5)).unwrap();
        let sentences = windower.sentences(&timeline(&[("x", 10)]));
        assert_eq!(sentences, vec![set(&["x"])]);
    }

    #[test]
    fn test_empty_timeline_gives_nothing() {
        let windower = TemporalWindower::new(WindowConfig::default()).unwrap();
        assert!(windower.sentences(&timeline(&[])).is_empty());
    }

    #[test]
    fn test_rejects_zero_step() {
        assert!(TemporalWindower::new(WindowConfig::new(15, 0)).is_err());
    }

    #[test]
    fn test_consecutive_duplicate_windows_dropped() {
        // Positions 5 and 10 both select only the event at 10
        let windower = TemporalWindower::new(WindowConfig::new(15, 5).without_merge()).unwrap();
        let windows = windower.windows(&timeline(&[("a", 0), ("b", 10)]));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].ages, vec![0, 10]);
        assert_eq!(windows[1].ages, vec![10]);
    }

    #[test]
    fn test_duplicate_check_without_merge() {
        let windower = TemporalWindower::new(WindowConfig::new(15, 5).without_merge()).unwrap();
        let windows = windower.windows(&timeline(&[("a", 0), ("b", 1), ("c", 40)]));
        let ages: Vec<Vec<u32>> = windows.iter().map(|w| w.ages.clone()).collect();
        assert_eq!(ages, vec![vec![0, 1], vec![40]]);
    }

    #[test]
    fn test_isolated_event_merged_into_previous_window() {
        let windower = TemporalWindower::new(WindowConfig::new(15, 5)).unwrap();
        let windows = windower.windows(&timeline(&[("a", 0), ("b", 1), ("c", 40)]));

        // 40 - 3 * 15 <= 1, so the singleton at 40 is absorbed; every later
        // position re-absorbs it into the growing previous window.
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[0].ages, vec![0, 1]);
        assert_eq!(windows[1].ages, vec![0, 1, 40]);
        assert_eq!(windows[2].ages, vec![0, 1, 40, 40]);
        for window in &windows[1..] {
            assert_eq!(window.sentence(), set(&["a", "b", "c"]));
        }
    }

    #[test]
    fn test_distant_event_not_merged() {
        let windower = TemporalWindower::new(WindowConfig::new(15, 5)).unwrap();
        let sentences = windower.sentences(&timeline(&[("a", 0), ("b", 100)]));
        assert_eq!(sentences, vec![set(&["a"]), set(&["b"])]);
    }

    #[test]
    fn test_merge_boundary_is_inclusive() {
        // 45 - 3 * 15 == 0 == previous last age
        let windower = TemporalWindower::new(WindowConfig::new(15, 45)).unwrap();
        let windows = windower.windows(&timeline(&[("a", 0), ("b", 45)]));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].ages, vec![0, 45]);

        let windows = windower.windows(&timeline(&[("a", 0), ("b", 46)]));
        assert_eq!(windows[1].ages, vec![46]);
    }

    #[test]
    fn test_advance_uses_explicit_state() {
        let windower = TemporalWindower::new(WindowConfig::new(15, 5)).unwrap();
        let mut state = WindowState::default();
        let first = Window {
            ages: vec![3, 4],
            concepts: vec!["a".to_string(), "b".to_string()],
        };

        assert!(windower.advance(&mut state, Window::default()).is_none());
        assert_eq!(windower.advance(&mut state, first.clone()), Some(first.clone()));
        assert!(windower.advance(&mut state, first.clone()).is_none());
        assert_eq!(state.last(), Some(&first));
    }

    #[test]
    fn test_sentences_filtered_drops_unknown_concepts() {
        let windower = TemporalWindower::new(WindowConfig::new(15, 5).without_merge()).unwrap();
        let sentences = windower.sentences_filtered(
            &timeline(&[("a", 0), ("unknown", 1), ("unknown", 50)]),
            |c| c != "unknown",
        );
        assert_eq!(sentences, vec![set(&["a"])]);
    }

    #[test]
    fn test_sentences_are_nonempty_subsets() {
        let events = [
            ("a", 0),
            ("b", 3),
            ("a", 3),
            ("c", 17),
            ("d", 30),
            ("e", 31),
            ("f", 200),
            ("g", 480),
        ];
        let tl = timeline(&events);
        let all: BTreeSet<String> = events.iter().map(|(c, _)| c.to_string()).collect();

        for config in [WindowConfig::new(15, 5), WindowConfig::new(30, 7).without_merge()] {
            let windower = TemporalWindower::new(config).unwrap();
            let windows = windower.windows(&tl);
            assert!(!windows.is_empty());
            for pair in windows.windows(2) {
                assert_ne!(pair[0].ages, pair[1].ages);
            }
            for window in &windows {
                let sentence = window.sentence();
                assert!(!sentence.is_empty());
                assert!(sentence.is_subset(&all));
            }
        }
    }
}
