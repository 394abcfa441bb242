use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Tracks which data sources are being scanned.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScanGuard {
    running: Arc<Mutex<HashSet<i64>>>,
}

impl ScanGuard {
    /// `None` while another permit for the same data source is alive.
    pub(crate) fn try_acquire(&self, data_source_id: i64) -> Option<ScanPermit> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        running.insert(data_source_id).then(|| ScanPermit {
            data_source_id,
            running: Arc::clone(&self.running),
        })
    }

    pub(crate) fn is_running(&self, data_source_id: i64) -> bool {
        self.running.lock().unwrap_or_else(PoisonError::into_inner).contains(&data_source_id)
    }
}

/// Released on drop, including when the scan future is cancelled.
#[derive(Debug)]
pub(crate) struct ScanPermit {
    data_source_id: i64,
    running: Arc<Mutex<HashSet<i64>>>,
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.running.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.data_source_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_permit_per_data_source() {
        let guard = ScanGuard::default();
        let permit = guard.try_acquire(1).unwrap();
        assert!(guard.try_acquire(1).is_none());
        assert!(guard.is_running(1));

        let other = guard.try_acquire(2);
        assert!(other.is_some());

        drop(permit);
        assert!(!guard.is_running(1));
        assert!(guard.try_acquire(1).is_some());
    }
}
