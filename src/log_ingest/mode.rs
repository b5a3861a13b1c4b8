use log::info;
use tokio::sync::watch;

/// Operating mode of the log event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Records are fabricated at random.
    Synthetic,
    /// Records come from a tailed external process.
    Live,
}

/// Process-wide switch between synthetic and live log ingestion.
///
/// `true` means synthetic ("dummy logs"). The value lives in a `watch`
/// channel so the live tail loop can notice a flip while it is parked on a
/// read instead of only between lines.
#[derive(Debug)]
pub struct SourceModeFlag {
    tx: watch::Sender<bool>,
}

impl SourceModeFlag {
    pub fn new(use_synthetic: bool) -> Self {
        let (tx, _rx) = watch::channel(use_synthetic);
        Self { tx }
    }

    pub fn use_synthetic(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn mode(&self) -> SourceMode {
        if self.use_synthetic() {
            SourceMode::Synthetic
        } else {
            SourceMode::Live
        }
    }

    /// Stores the new value and returns the previous one.
    pub fn set(&self, use_synthetic: bool) -> bool {
        let previous = self.tx.send_replace(use_synthetic);
        if previous != use_synthetic {
            info!(
                "Source mode flag changed: use_synthetic {} -> {}",
                previous, use_synthetic
            );
        }
        previous
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_tracks_flag() {
        let flag = SourceModeFlag::new(true);
        assert_eq!(flag.mode(), SourceMode::Synthetic);
        assert!(flag.set(false));
        assert_eq!(flag.mode(), SourceMode::Live);
        assert!(!flag.use_synthetic());
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let flag = SourceModeFlag::new(false);
        let mut rx = flag.subscribe();
        flag.set(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[test]
    fn unchanged_flag_does_not_wake_subscribers() {
        let flag = SourceModeFlag::new(true);
        let mut rx = flag.subscribe();
        let mut changed = tokio_test::task::spawn(async move { rx.changed().await });

        tokio_test::assert_pending!(changed.poll());
        flag.set(false);
        assert!(changed.is_woken());
        tokio_test::assert_ready_ok!(changed.poll());
    }
}
