// src/tracking.rs - persistent left/right hand tracks
use std::time::Duration;

use crate::config::TrackerConfig;
use crate::landmark::Candidate;

/// Screen-space identity of a track.
///
/// "Left" is the hand further left in the processed (possibly mirrored) image, not the
/// anatomical left hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Left,
    Right,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::Left, Slot::Right];

    pub fn opposite(self) -> Slot {
        match self {
            Slot::Left => Slot::Right,
            Slot::Right => Slot::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Left => "left",
            Slot::Right => "right",
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::Left => 0,
            Slot::Right => 1,
        }
    }
}

/// A persistent hand identity and its latest smoothed prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    slot: Slot,
    prediction: Option<Candidate>,
    last_updated: Duration,
}

impl Track {
    fn new(slot: Slot, at: Duration) -> Self {
        Self {
            slot,
            prediction: None,
            last_updated: at,
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn prediction(&self) -> Option<&Candidate> {
        self.prediction.as_ref()
    }

    /// Session time of the last candidate stored in this track.
    pub fn last_updated(&self) -> Duration {
        self.last_updated
    }

    pub fn is_tracked(&self) -> bool {
        self.prediction.is_some()
    }

    fn since_update(&self, now: Duration) -> Duration {
        now.saturating_sub(self.last_updated)
    }
}

/// The two track slots of a tracking session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerState {
    tracks: [Track; 2],
}

impl TrackerState {
    pub fn new(session_start: Duration) -> Self {
        Self {
            tracks: [
                Track::new(Slot::Left, session_start),
                Track::new(Slot::Right, session_start),
            ],
        }
    }

    pub fn track(&self, slot: Slot) -> &Track {
        &self.tracks[slot.index()]
    }

    pub fn left(&self) -> &Track {
        self.track(Slot::Left)
    }

    pub fn right(&self) -> &Track {
        self.track(Slot::Right)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_tracked()).count()
    }

    /// Copies the current predictions out for readers.
    pub fn snapshot(&self, timestamp: Duration) -> TrackSnapshot {
        TrackSnapshot {
            timestamp,
            left: self.left().prediction.clone(),
            right: self.right().prediction.clone(),
        }
    }

    fn track_mut(&mut self, slot: Slot) -> &mut Track {
        &mut self.tracks[slot.index()]
    }
}

/// Consistent, read-only view of both slots after a completed frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSnapshot {
    pub timestamp: Duration,
    pub left: Option<Candidate>,
    pub right: Option<Candidate>,
}

impl TrackSnapshot {
    pub fn get(&self, slot: Slot) -> Option<&Candidate> {
        match slot {
            Slot::Left => self.left.as_ref(),
            Slot::Right => self.right.as_ref(),
        }
    }

    pub fn hands(&self) -> impl Iterator<Item = (Slot, &Candidate)> {
        Slot::BOTH
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|c| (slot, c)))
    }
}

/// What a single [`TrackAssigner::update`] did to the slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub assigned: Vec<Slot>,
    pub cleared: Vec<Slot>,
    /// Candidates dropped for breaking the landmark contract or exceeding two hands.
    pub discarded: usize,
}

/// Assigns deduplicated candidates to the left/right slots, smooths them, and expires stale
/// slots.
pub struct TrackAssigner {
    config: TrackerConfig,
    state: TrackerState,
    latest: Duration,
}

impl TrackAssigner {
    pub fn new(config: TrackerConfig, session_start: Duration) -> Self {
        Self {
            config,
            state: TrackerState::new(session_start),
            latest: session_start,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Empties both slots, as at session start.
    pub fn reset(&mut self, at: Duration) {
        self.state = TrackerState::new(at);
        self.latest = at;
    }

    /// Runs one frame of assignment.
    ///
    /// `frame_width` is the width of the full frame the candidates are expressed in, `now` is the
    /// frame's session timestamp. Timestamps that go backwards are clamped to the latest one seen.
    pub fn update(
        &mut self,
        candidates: Vec<Candidate>,
        frame_width: u32,
        now: Duration,
    ) -> UpdateSummary {
        if now < self.latest {
            tracing::debug!(?now, latest = ?self.latest, "frame timestamp went backwards, clamping");
        }
        let now = now.max(self.latest);
        self.latest = now;

        let mut summary = UpdateSummary::default();
        let mut updated = [false; 2];

        let mut candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| {
                if !c.is_complete() {
                    tracing::warn!(
                        landmarks = c.landmarks.len(),
                        region = c.source_region.as_str(),
                        "ignoring candidate with wrong landmark count"
                    );
                    summary.discarded += 1;
                    return false;
                }
                true
            })
            .collect();

        // Stable, so equal wrist positions keep input order.
        candidates.sort_by(|a, b| wrist_x(a).total_cmp(&wrist_x(b)));

        match candidates.len() {
            0 => {}
            1 => {
                let candidate = candidates.remove(0);
                let midpoint = f64::from(frame_width) / 2.0;
                let slot = if wrist_x(&candidate) < midpoint {
                    Slot::Left
                } else {
                    Slot::Right
                };
                self.assign(slot, candidate, now);
                updated[slot.index()] = true;
                summary.assigned.push(slot);

                // A lone hand suggests the other one just left; give it a shorter grace period.
                let other = slot.opposite();
                let track = self.state.track_mut(other);
                if track.is_tracked() && track.since_update(now) > self.config.cross_hand_stale() {
                    tracing::debug!(slot = other.as_str(), "clearing opposite slot");
                    track.prediction = None;
                    summary.cleared.push(other);
                }
            }
            n => {
                if n > 2 {
                    tracing::trace!(extra = n - 2, "discarding candidates beyond two hands");
                    summary.discarded += n - 2;
                }
                let mut iter = candidates.into_iter();
                for slot in Slot::BOTH {
                    if let Some(candidate) = iter.next() {
                        self.assign(slot, candidate, now);
                        updated[slot.index()] = true;
                        summary.assigned.push(slot);
                    }
                }
            }
        }

        self.sweep(now, &updated, &mut summary);
        summary
    }

    fn assign(&mut self, slot: Slot, candidate: Candidate, now: Duration) {
        let factor = self.config.smoothing_factor;
        let track = self.state.track_mut(slot);
        let stored = match track.prediction.take() {
            Some(prior) => smooth(&prior, candidate, factor),
            None => candidate,
        };
        tracing::trace!(slot = slot.as_str(), wrist_x = wrist_x(&stored), "slot updated");
        track.prediction = Some(stored);
        track.last_updated = now;
    }

    fn sweep(&mut self, now: Duration, updated: &[bool; 2], summary: &mut UpdateSummary) {
        let stale_after = self.config.track_stale();
        for slot in Slot::BOTH {
            if updated[slot.index()] {
                continue;
            }
            let track = self.state.track_mut(slot);
            if track.is_tracked() && track.since_update(now) > stale_after {
                tracing::debug!(slot = slot.as_str(), "track went stale");
                track.prediction = None;
                summary.cleared.push(slot);
            }
        }
    }
}

fn wrist_x(candidate: &Candidate) -> f64 {
    candidate.wrist_x().unwrap_or(f64::INFINITY)
}

/// Blends `new` into `prior` landmark by landmark: `new * factor + old * (1 - factor)`.
///
/// Confidence, bounding box and region are taken from `new` unchanged.
fn smooth(prior: &Candidate, mut new: Candidate, factor: f64) -> Candidate {
    if prior.landmarks.len() != new.landmarks.len() {
        return new;
    }
    for (lm, old) in new.landmarks.iter_mut().zip(&prior.landmarks) {
        *lm = *lm * factor + old * (1.0 - factor);
    }
    new
}
