//! The shared processing resource: one detector behind one lock.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::detector::{Detection, Detector};

/// A request for the detector, owning its image bytes.
#[derive(Debug)]
pub enum Request {
    Detect(Vec<u8>),
    Replace { target: Vec<u8>, source: Vec<u8> },
}

/// Errors from running a detector call.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("detector task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Serialises every detector call across all sessions.
///
/// The lock is held for exactly one detect or replace call. Calls run on the
/// blocking pool with the guard moved in, so the lock is released when the
/// call returns or unwinds, even if the waiting session has gone away.
pub struct ProcessingResource<D> {
    detector: Arc<Mutex<D>>,
}

impl<D> Clone for ProcessingResource<D> {
    fn clone(&self) -> Self {
        Self {
            detector: Arc::clone(&self.detector),
        }
    }
}

impl<D: Detector> ProcessingResource<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector: Arc::new(Mutex::new(detector)),
        }
    }

    /// Waits for exclusive access, then runs `request` on the detector.
    ///
    /// Waiters are served in no guaranteed order.
    pub async fn process(&self, request: Request) -> Result<Detection, ProcessingError> {
        let guard = Arc::clone(&self.detector).lock_owned().await;
        let detection = tokio::task::spawn_blocking(move || {
            let mut detector = guard;
            match request {
                Request::Detect(image) => detector.detect(image),
                Request::Replace { target, source } => detector.replace(target, source),
            }
        })
        .await?;
        Ok(detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records the highest number of calls ever running at once.
    struct CountingDetector {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Detector for CountingDetector {
        fn detect(&mut self, image: Vec<u8>) -> Detection {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Detection::Found(image)
        }

        fn replace(&mut self, target: Vec<u8>, _source: Vec<u8>) -> Detection {
            self.detect(target)
        }
    }

    struct PanickingDetector;

    impl Detector for PanickingDetector {
        fn detect(&mut self, _image: Vec<u8>) -> Detection {
            panic!("detector blew up");
        }

        fn replace(&mut self, _target: Vec<u8>, _source: Vec<u8>) -> Detection {
            Detection::NoFaces
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn calls_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let resource = ProcessingResource::new(CountingDetector {
            active: Arc::clone(&active),
            peak: Arc::clone(&peak),
        });

        let mut handles = Vec::new();
        for i in 0..16u8 {
            let resource = resource.clone();
            handles.push(tokio::spawn(async move {
                resource.process(Request::Detect(vec![i])).await.unwrap()
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Detection::Found(vec![i as u8]));
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panic_releases_the_lock() {
        let resource = ProcessingResource::new(PanickingDetector);

        let result = resource.process(Request::Detect(vec![1])).await;
        assert!(matches!(result, Err(ProcessingError::Join(_))));

        let next = resource
            .process(Request::Replace {
                target: vec![1],
                source: vec![2],
            })
            .await
            .unwrap();
        assert_eq!(next, Detection::NoFaces);
    }
}
