use rtrb::{Consumer, Producer, RingBuffer};
use tracing::warn;

/// Lock-free PCM ring buffer between the capture callback and the
/// analysis side, backed by rtrb (real-time safe).
pub struct PcmRingBuffer {
    producer: Producer<i16>,
    consumer: Consumer<i16>,
}

impl PcmRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    /// Split into producer (capture callback) and consumer (analyzer).
    pub fn split(self) -> (PcmProducer, PcmConsumer) {
        (
            PcmProducer {
                producer: self.producer,
            },
            PcmConsumer {
                consumer: self.consumer,
            },
        )
    }
}

pub struct PcmProducer {
    producer: Producer<i16>,
}

impl PcmProducer {
    /// Write samples from the audio callback. Non-blocking; on overflow
    /// the oldest data simply wins and the write is dropped, which only
    /// costs the analyzer a stale window.
    pub fn write(&mut self, samples: &[i16]) -> usize {
        let mut chunk = match self.producer.write_chunk(samples.len()) {
            Ok(chunk) => chunk,
            Err(_) => {
                warn!(
                    "PCM ring overflow: dropped {} samples (analyzer lagging)",
                    samples.len()
                );
                return 0;
            }
        };

        let (first, second) = chunk.as_mut_slices();
        let split = first.len();
        first.copy_from_slice(&samples[..split]);
        if !second.is_empty() {
            second.copy_from_slice(&samples[split..]);
        }
        chunk.commit_all();
        samples.len()
    }
}

pub struct PcmConsumer {
    consumer: Consumer<i16>,
}

impl PcmConsumer {
    /// Drain up to `buffer.len()` samples; returns how many were read.
    pub fn read(&mut self, buffer: &mut [i16]) -> usize {
        let available = self.consumer.slots().min(buffer.len());
        if available == 0 {
            return 0;
        }
        let chunk = match self.consumer.read_chunk(available) {
            Ok(chunk) => chunk,
            Err(_) => return 0,
        };

        let (first, second) = chunk.as_slices();
        let split = first.len();
        buffer[..split].copy_from_slice(first);
        if !second.is_empty() {
            buffer[split..split + second.len()].copy_from_slice(second);
        }
        chunk.commit_all();
        available
    }

    pub fn available(&self) -> usize {
        self.consumer.slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trip() {
        let (mut producer, mut consumer) = PcmRingBuffer::new(64).split();

        assert_eq!(producer.write(&[1, 2, 3, 4, 5]), 5);

        let mut buf = [0i16; 8];
        assert_eq!(consumer.read(&mut buf), 5);
        assert_eq!(&buf[..5], &[1, 2, 3, 4, 5]);
        assert_eq!(consumer.available(), 0);
    }

    #[test]
    fn overflow_drops_the_write() {
        let (mut producer, _consumer) = PcmRingBuffer::new(4).split();
        assert_eq!(producer.write(&[1, 2, 3, 4]), 4);
        assert_eq!(producer.write(&[5, 6]), 0);
    }

    #[test]
    fn partial_read_respects_buffer_len() {
        let (mut producer, mut consumer) = PcmRingBuffer::new(64).split();
        producer.write(&[9; 10]);

        let mut buf = [0i16; 4];
        assert_eq!(consumer.read(&mut buf), 4);
        assert_eq!(consumer.available(), 6);
    }
}
