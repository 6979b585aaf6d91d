use crate::ConnectionConfig;
use std::time::Duration;

/// The retry classes of the transport, budgeted independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RetryClass {
    /// The connection could not be established
    Connect,
    /// The response did not arrive in time or broke off
    Read,
    /// The server answered with a redirect
    Redirect,
}

/// Per-class retry counters for one logical request.
///
/// A controller is created per operation attempt loop and threaded
/// through it; there is no global retry state. `next_delay` both asks
/// whether another attempt is allowed and computes the backoff to sleep
/// first: `backoff_factor · 2^(attempt−1)` seconds, the same formula
/// for every class, with the attempt counted per class.
#[derive(Debug)]
pub(crate) struct RetryController {
    connect_retries: u32,
    read_retries: u32,
    redirect_retries: u32,
    total_retries: Option<u32>,
    backoff_factor: f64,
    connect: u32,
    read: u32,
    redirect: u32,
}

impl RetryController {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            connect_retries: config.connect_retries,
            read_retries: config.read_retries,
            redirect_retries: config.redirect_retries,
            total_retries: config.total_retries,
            backoff_factor: config.backoff_factor,
            connect: 0,
            read: 0,
            redirect: 0,
        }
    }

    fn total_spent(&self) -> u32 {
        self.connect + self.read + self.redirect
    }

    /// Books one retry of the given class. `Some(delay)` allows another
    /// attempt after sleeping `delay`; `None` means the budget for the
    /// class (or the total budget) is exhausted.
    pub fn next_delay(&mut self, class: RetryClass) -> Option<Duration> {
        if let Some(total) = self.total_retries {
            if self.total_spent() >= total {
                return None;
            }
        }
        let (counter, limit) = match class {
            RetryClass::Connect => (&mut self.connect, self.connect_retries),
            RetryClass::Read => (&mut self.read, self.read_retries),
            RetryClass::Redirect => (&mut self.redirect, self.redirect_retries),
        };
        if *counter >= limit {
            return None;
        }
        *counter += 1;
        let attempt = *counter;
        Some(Duration::from_secs_f64(
            self.backoff_factor * f64::from(1u32 << (attempt - 1).min(16)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConnectionConfig {
        ConnectionConfig::new("http://srv1").unwrap()
    }

    #[test]
    fn per_class_budgets_are_independent() {
        let config = config().with_connect_retries(2).with_read_retries(1);
        let mut retry = RetryController::new(&config);
        assert!(retry.next_delay(RetryClass::Connect).is_some());
        assert!(retry.next_delay(RetryClass::Connect).is_some());
        assert!(retry.next_delay(RetryClass::Connect).is_none());
        // the read budget is untouched by connect retries
        assert!(retry.next_delay(RetryClass::Read).is_some());
        assert!(retry.next_delay(RetryClass::Read).is_none());
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = config().with_connect_retries(3).with_backoff_factor(0.1);
        let mut retry = RetryController::new(&config);
        assert_eq!(
            retry.next_delay(RetryClass::Connect),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            retry.next_delay(RetryClass::Connect),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            retry.next_delay(RetryClass::Connect),
            Some(Duration::from_millis(400))
        );
        assert_eq!(retry.next_delay(RetryClass::Connect), None);
    }

    #[test]
    fn redirects_back_off_like_the_other_classes() {
        let config = config().with_redirect_retries(2).with_backoff_factor(0.1);
        let mut retry = RetryController::new(&config);
        assert_eq!(
            retry.next_delay(RetryClass::Redirect),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            retry.next_delay(RetryClass::Redirect),
            Some(Duration::from_millis(200))
        );
        assert_eq!(retry.next_delay(RetryClass::Redirect), None);
    }

    #[test]
    fn total_budget_caps_the_sum() {
        let config = config()
            .with_connect_retries(5)
            .with_read_retries(5)
            .with_total_retries(3);
        let mut retry = RetryController::new(&config);
        assert!(retry.next_delay(RetryClass::Connect).is_some());
        assert!(retry.next_delay(RetryClass::Read).is_some());
        assert!(retry.next_delay(RetryClass::Connect).is_some());
        assert!(retry.next_delay(RetryClass::Connect).is_none());
        assert!(retry.next_delay(RetryClass::Read).is_none());
    }
}
