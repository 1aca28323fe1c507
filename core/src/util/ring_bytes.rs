use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Bounded byte buffer that keeps only the most recent `cap` bytes.
#[derive(Clone)]
pub struct RingBytes {
    inner: Arc<Mutex<Inner>>,
    cap: usize,
}

struct Inner {
    buf: VecDeque<u8>,
    total: u64,
}

impl RingBytes {
    pub fn new(cap: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(Mutex::new(Inner {
                buf: VecDeque::with_capacity(cap.min(64 * 1024)),
                total: 0,
            })),
            cap,
        })
    }

    pub fn push(&self, data: &[u8]) {
        let mut g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        g.total += data.len() as u64;
        let data = if data.len() > self.cap {
            &data[data.len() - self.cap..]
        } else {
            data
        };
        let overflow = g.buf.len().saturating_add(data.len()).saturating_sub(self.cap);
        if overflow > 0 {
            g.buf.drain(..overflow);
        }
        g.buf.extend(data);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut vec = Vec::with_capacity(g.buf.len());
        vec.extend(g.buf.iter().copied());
        vec
    }

    /// Retained bytes as text. A multi-byte char split by the cap is replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    /// Bytes pushed since creation, including those already evicted.
    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).total
    }

    pub fn truncated(&self) -> bool {
        self.total_bytes() > self.cap as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_tail() {
        let ring = RingBytes::new(4);
        ring.push(b"ab");
        ring.push(b"cdef");
        assert_eq!(ring.to_bytes(), b"cdef");
        assert_eq!(ring.total_bytes(), 6);
        assert!(ring.truncated());
    }

    #[test]
    fn oversized_chunk_is_clipped() {
        let ring = RingBytes::new(3);
        ring.push(b"0123456789");
        assert_eq!(ring.to_string_lossy(), "789");
    }

    #[test]
    fn small_input_is_not_truncated() {
        let ring = RingBytes::new(16);
        ring.push("数据".as_bytes());
        assert_eq!(ring.to_string_lossy(), "数据");
        assert!(!ring.truncated());
    }
}
