// src/audio/spectrum/capture.rs
//! Fixed-size circular sample buffer that collects one analysis block.

/// Circular capture buffer of exactly `block_size` samples.
///
/// The sample written at absolute stream position `p` lives at index
/// `p % block_size`, so chunked writes and a single write of the same
/// samples leave identical contents.
pub struct CaptureRing {
    samples: Vec<f32>,
    cursor: usize,
    ready: bool,
}

impl CaptureRing {
    pub fn new(block_size: usize) -> Self {
        Self {
            samples: vec![0.0; block_size],
            cursor: 0,
            ready: false,
        }
    }

    pub fn block_size(&self) -> usize {
        self.samples.len()
    }

    /// Position the next sample will be written to.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True once the cursor has wrapped since the last snapshot.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Raw ring contents, in storage order.
    pub fn contents(&self) -> &[f32] {
        &self.samples
    }

    /// Append samples at the cursor, wrapping as needed.
    ///
    /// Only the newest `block_size` samples of an oversized write are kept.
    pub fn write(&mut self, samples: &[f32]) {
        let len = self.samples.len();
        let count = samples.len();
        if count == 0 {
            return;
        }

        if count >= len {
            let tail = &samples[count - len..];
            let start = (self.cursor + count) % len;
            let (first, second) = tail.split_at(len - start);
            self.samples[start..].copy_from_slice(first);
            self.samples[..start].copy_from_slice(second);
            self.cursor = start;
            self.ready = true;
            return;
        }

        let first = count.min(len - self.cursor);
        self.samples[self.cursor..self.cursor + first].copy_from_slice(&samples[..first]);
        self.samples[..count - first].copy_from_slice(&samples[first..]);

        if self.cursor + count >= len {
            self.ready = true;
        }
        self.cursor = (self.cursor + count) % len;
    }

    /// Copy the block into `out` oldest-first and clear the ready flag.
    pub fn snapshot_into(&mut self, out: &mut [f32]) {
        let (newer, older) = self.samples.split_at(self.cursor);
        out[..older.len()].copy_from_slice(older);
        out[older.len()..].copy_from_slice(newer);
        self.ready = false;
    }

    /// Zero the ring and rewind the cursor.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
        self.cursor = 0;
        self.ready = false;
    }
}
