/// Configuration for local voice-activity detection.
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// RMS energy above which a chunk counts as speech. Tuned empirically;
    /// there is no adaptive noise floor.
    pub threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self { threshold: 0.015 }
    }
}

/// A threshold crossing of the input energy signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEdge {
    Rise,
    Fall,
}

/// Energy-based speech presence heuristic over the microphone stream.
///
/// This is not the service's authoritative turn signal; it exists purely to
/// drive UI affordances. Only threshold crossings are reported, so a flat
/// signal produces no redundant edges.
pub struct VoiceActivityMonitor {
    config: VadConfig,
    speaking: bool,
}

impl VoiceActivityMonitor {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            speaking: false,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn process_chunk(&mut self, samples: &[f32]) -> Option<VadEdge> {
        if samples.is_empty() {
            return None;
        }
        let energy = rms(samples);
        if energy > self.config.threshold && !self.speaking {
            self.speaking = true;
            Some(VadEdge::Rise)
        } else if energy <= self.config.threshold && self.speaking {
            self.speaking = false;
            Some(VadEdge::Fall)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.speaking = false;
    }
}

fn rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> VoiceActivityMonitor {
        VoiceActivityMonitor::new(VadConfig { threshold: 0.1 })
    }

    #[test]
    fn rising_edge_fires_once() {
        let mut vad = monitor();
        let loud = vec![0.5f32; 480];
        assert_eq!(vad.process_chunk(&loud), Some(VadEdge::Rise));
        assert_eq!(vad.process_chunk(&loud), None);
        assert!(vad.is_speaking());
    }

    #[test]
    fn falling_edge_fires_once() {
        let mut vad = monitor();
        let loud = vec![0.5f32; 480];
        let quiet = vec![0.001f32; 480];
        vad.process_chunk(&loud);
        assert_eq!(vad.process_chunk(&quiet), Some(VadEdge::Fall));
        assert_eq!(vad.process_chunk(&quiet), None);
        assert!(!vad.is_speaking());
    }

    #[test]
    fn flat_silence_produces_no_edges() {
        let mut vad = monitor();
        let quiet = vec![0.001f32; 480];
        for _ in 0..10 {
            assert_eq!(vad.process_chunk(&quiet), None);
        }
    }

    #[test]
    fn empty_chunk_is_ignored() {
        let mut vad = monitor();
        assert_eq!(vad.process_chunk(&[]), None);
    }
}
