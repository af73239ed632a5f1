//! Beat events and the sound source that renders them.

/// Beats per bar; the first beat of every bar is accented.
pub const BEATS_PER_BAR: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Regular tick.
    Regular,
    /// Downbeat.
    Accent,
}

/// One metronome beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beat {
    /// Value of the beat counter when the beat fired.
    pub index: u64,
    pub tone: Tone,
}

impl Beat {
    pub fn new(index: u64) -> Self {
        let tone = if index % BEATS_PER_BAR == 0 {
            Tone::Accent
        } else {
            Tone::Regular
        };
        Self { index, tone }
    }

    pub fn is_accented(&self) -> bool {
        self.tone == Tone::Accent
    }
}

/// Fire-and-forget sound source for metronome beats.
///
/// Called from the metronome worker thread; implementations must not block
/// for longer than it takes to queue the sound.
pub trait ToneSink: Send + Sync {
    fn play(&self, beat: Beat);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fourth_beat_is_accented() {
        let accented: Vec<u64> = (0..12).filter(|i| Beat::new(*i).is_accented()).collect();
        assert_eq!(accented, vec![0, 4, 8]);
        assert_eq!(Beat::new(5).tone, Tone::Regular);
    }
}
