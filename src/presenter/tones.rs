//! Popup sound cues as square-wave note sequences.
//!
//! Each note starts at its own gain and decays exponentially to
//! [`RAMP_FLOOR`] over its duration. The popup plays the sequence with an
//! oscillator; [`ToneSequence::samples`] renders the same thing to mono PCM.

use serde::Serialize;

pub const SAMPLE_RATE: u32 = 44_100;

/// Gain every note decays to by its end.
pub const RAMP_FLOOR: f32 = 0.01;

const D5: f32 = 587.33;
const C5: f32 = 523.25;
const E5: f32 = 659.25;
const G5: f32 = 783.99;
const C3: f32 = 130.81;

/// Hz added to the final success note per percentage point.
const SUCCESS_STEP_HZ: f32 = 2.93;
const SUCCESS_NOTE_SECS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub frequency: f32,
    /// Seconds from the start of the sequence.
    pub start: f32,
    pub duration: f32,
    pub gain: f32,
}

impl Note {
    #[must_use]
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    /// Gain `t` seconds into the note.
    #[must_use]
    pub fn gain_at(&self, t: f32) -> f32 {
        if self.duration <= 0.0 {
            return RAMP_FLOOR;
        }
        let progress = (t / self.duration).clamp(0.0, 1.0);
        self.gain * (RAMP_FLOOR / self.gain).powf(progress)
    }

    /// Contribution at sequence time `t`; silent outside the note.
    fn sample_at(&self, t: f32) -> f32 {
        if t < self.start || t >= self.end() {
            return 0.0;
        }
        let local = t - self.start;
        let square = if (self.frequency * local).fract() < 0.5 { 1.0 } else { -1.0 };
        square * self.gain_at(local)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToneSequence {
    pub notes: Vec<Note>,
}

impl ToneSequence {
    /// D5 for half a second.
    #[must_use]
    pub fn loading() -> Self {
        Self { notes: vec![Note { frequency: D5, start: 0.0, duration: 0.5, gain: 0.3 }] }
    }

    /// C5 E5 G5 arpeggio, then a note that climbs with the percentage.
    #[must_use]
    pub fn success(percentage: u8) -> Self {
        let last = C5 + f32::from(percentage) * SUCCESS_STEP_HZ;
        let notes = [C5, E5, G5, last]
            .into_iter()
            .zip([0.0, 1.0, 2.0, 3.0])
            .map(|(frequency, step)| Note {
                frequency,
                start: step * SUCCESS_NOTE_SECS,
                duration: SUCCESS_NOTE_SECS,
                gain: 0.2,
            })
            .collect();
        Self { notes }
    }

    /// Low C3 buzz.
    #[must_use]
    pub fn error() -> Self {
        Self { notes: vec![Note { frequency: C3, start: 0.0, duration: 0.8, gain: 0.3 }] }
    }

    /// Seconds until the last note ends.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.notes.iter().map(Note::end).fold(0.0, f32::max)
    }

    /// Mono PCM at `sample_rate`, covering the whole sequence.
    #[must_use]
    pub fn samples(&self, sample_rate: u32) -> ToneSamples<'_> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let total = (self.duration() * sample_rate as f32).round().max(0.0) as usize;
        ToneSamples { sequence: self, sample_rate, index: 0, total }
    }
}

/// Iterator over a rendered [`ToneSequence`].
pub struct ToneSamples<'a> {
    sequence: &'a ToneSequence,
    sample_rate: u32,
    index: usize,
    total: usize,
}

impl Iterator for ToneSamples<'_> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.index >= self.total {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let t = self.index as f32 / self.sample_rate as f32;
        self.index += 1;
        Some(self.sequence.notes.iter().map(|note| note.sample_at(t)).sum())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ToneSamples<'_> {}

#[cfg(test)]
#[path = "tones_test.rs"]
mod tests;
