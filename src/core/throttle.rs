//! Rate limiting for repeated log lines.

use std::time::Duration;

use tokio::time::Instant;

/// Admits at most one emission per cooldown window and counts the rest
#[derive(Debug, Clone)]
pub struct LogThrottle {
    cooldown: Duration,
    next_allowed: Option<Instant>,
    suppressed: u32,
}

impl LogThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            next_allowed: None,
            suppressed: 0,
        }
    }

    /// Returns `Some(n)` when a line may be logged now, where `n` is the
    /// number of lines suppressed since the last one; `None` otherwise.
    pub fn admit(&mut self) -> Option<u32> {
        let now = Instant::now();

        match self.next_allowed {
            Some(next) if now < next => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.next_allowed = Some(now + self.cooldown);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_one_line_per_window() {
        let mut throttle = LogThrottle::new(Duration::from_secs(5));

        assert_eq!(throttle.admit(), Some(0));
        assert_eq!(throttle.admit(), None);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(throttle.admit(), None);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(throttle.admit(), Some(2));
        assert_eq!(throttle.admit(), None);
    }
}
