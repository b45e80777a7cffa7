/// Mono 16-bit PCM audio.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct AudioClip {
    /// 0 for a clip with no samples; it then fits any stream.
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

impl AudioClip {
    pub fn new(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode raw little-endian 16-bit PCM. A trailing odd byte is dropped.
    pub fn from_pcm_le(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(sample_rate, samples)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("sample_rate", &self.sample_rate)
            .field("samples", &self.samples.len())
            .finish()
    }
}

/// Clips that finished before their batch failed, keyed by chunk index in ascending order.
#[derive(Clone, Default)]
pub struct PartialResults(pub Vec<(usize, AudioClip)>);

impl PartialResults {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, AudioClip)> {
        self.0.iter()
    }
}

impl std::fmt::Debug for PartialResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let indices: Vec<usize> = self.0.iter().map(|(index, _)| *index).collect();
        f.debug_tuple("PartialResults").field(&indices).finish()
    }
}
