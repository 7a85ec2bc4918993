//! Send scheduling: interval parsing, shutdown signal and the tick loop.

use anyhow::Context;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Unit suffixes and their length in nanoseconds.
const UNITS: [(&str, u128); 7] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", NANOS_PER_SEC),
    ("m", 60 * NANOS_PER_SEC),
    ("h", 3600 * NANOS_PER_SEC),
];

/// Parse an interval like "250ms", "1.5s", "1m30s", "1h" or "10" (seconds).
///
/// Components may carry fractions and are summed. The interval must be
/// positive and fit in a `Duration`.
pub fn parse_interval(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty interval string");
    }

    let nanos = if s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        // No unit - treat as seconds
        component_nanos(s, NANOS_PER_SEC, s)?
    } else {
        let mut total: u128 = 0;
        let mut rest = s;
        while !rest.is_empty() {
            let number_len = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            let (number, tail) = rest.split_at(number_len);
            if number.is_empty() {
                anyhow::bail!("Invalid interval '{s}': expected a number at '{rest}'");
            }
            let unit_len = tail
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(tail.len());
            let (unit, next) = tail.split_at(unit_len);
            let Some(&(_, scale)) = UNITS.iter().find(|(name, _)| *name == unit) else {
                anyhow::bail!("Invalid interval '{s}': unknown unit '{unit}'");
            };
            total = total
                .checked_add(component_nanos(number, scale, s)?)
                .with_context(|| format!("Interval out of range: {s}"))?;
            rest = next;
        }
        total
    };

    if nanos == 0 {
        anyhow::bail!("Interval must be positive: {s}");
    }
    let secs = u64::try_from(nanos / NANOS_PER_SEC)
        .with_context(|| format!("Interval out of range: {s}"))?;
    Ok(Duration::new(secs, (nanos % NANOS_PER_SEC) as u32))
}

/// `number` (digits with an optional fraction) times `scale` nanoseconds.
fn component_nanos(number: &str, scale: u128, input: &str) -> anyhow::Result<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        anyhow::bail!("Invalid interval value: {input}");
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .with_context(|| format!("Invalid interval value: {input}"))?
    };
    let mut nanos = whole
        .checked_mul(scale)
        .with_context(|| format!("Interval out of range: {input}"))?;

    // At most 18 fraction digits, so the product stays within u128
    let fraction = &fraction[..fraction.len().min(18)];
    if !fraction.is_empty() {
        let digits: u128 = fraction
            .parse()
            .with_context(|| format!("Invalid interval value: {input}"))?;
        nanos += digits * scale / 10u128.pow(fraction.len() as u32);
    }
    Ok(nanos)
}

/// A receiver that flips to `true` on Ctrl+C, or SIGTERM on Unix.
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("Received interrupt signal (Ctrl+C), shutting down"),
                Err(e) => error!("Failed to listen for Ctrl+C: {e}"),
            },
            _ = terminate() => info!("Received SIGTERM, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    shutdown_rx
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to listen for SIGTERM: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolves once `shutdown` reads `true`. A dropped sender never resolves.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stopped| *stopped).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

/// Run `task` once, or on every tick of `interval` until shutdown.
///
/// In periodic mode the first run happens one interval after start and each
/// tick runs on its own task, so a slow run never delays the next tick or
/// shutdown. Task errors are logged and do not stop the loop. On shutdown any
/// run still in flight is aborted and `Ok(())` is returned.
///
/// In once mode the task's own result is returned, unless shutdown arrives
/// first.
pub async fn run_once_or_periodic<F, Fut>(
    mut shutdown: watch::Receiver<bool>,
    once: bool,
    interval: Duration,
    mut task: F,
) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    if once {
        return tokio::select! {
            result = task() => result,
            _ = wait_for_shutdown(&mut shutdown) => {
                info!("Shutdown requested before the send completed");
                Ok(())
            }
        };
    }

    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = ticker.tick() => {
                in_flight.spawn(task());
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Task error: {e:#}"),
                    Err(e) => error!("Task failed: {e}"),
                }
            }
        }
    }

    if !in_flight.is_empty() {
        info!("Aborting {} in-flight send(s)", in_flight.len());
    }
    in_flight.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_interval("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_interval("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_interval(" 10 ").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_interval("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_interval("2s500ms").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_interval("100us").unwrap(), Duration::from_micros(100));
        assert_eq!(parse_interval("0.25").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_interval_rejects_invalid() {
        assert!(parse_interval("").is_err());
        assert!(parse_interval("0s").is_err());
        assert!(parse_interval("-1s").is_err());
        assert!(parse_interval("abc").is_err());
        assert!(parse_interval("5x").is_err());
        assert!(parse_interval("1.2.3s").is_err());
        assert!(parse_interval("s").is_err());
        assert!(parse_interval(".").is_err());
    }

    #[test]
    fn test_parse_interval_rejects_out_of_range() {
        assert!(parse_interval("18446744073709551615h").is_err());
        assert!(parse_interval("18446744073709551615m").is_err());
        assert!(parse_interval("99999999999999999999999999999999999999999h").is_err());
        assert!(parse_interval("18446744073709551616").is_err());
        assert!(parse_interval("18446744073709551615s1s").is_err());
    }

    #[tokio::test]
    async fn test_once_runs_task_once() {
        let (_tx, rx) = watch::channel(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();

        run_once_or_periodic(rx, true, Duration::from_millis(10), move || {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok::<(), anyhow::Error>(())
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_once_returns_task_error() {
        let (_tx, rx) = watch::channel(false);
        let result = run_once_or_periodic(rx, true, Duration::from_millis(10), || async {
            Err::<(), _>(anyhow::anyhow!("boom"))
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_periodic_runs_until_shutdown() {
        let (tx, rx) = watch::channel(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();

        let handle = tokio::spawn(run_once_or_periodic(
            rx,
            false,
            Duration::from_millis(20),
            move || {
                let counted = counted.clone();
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow::anyhow!("errors do not stop the loop"))
                }
            },
        ));

        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_hung_periodic_task() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_once_or_periodic(
            rx,
            false,
            Duration::from_millis(10),
            || std::future::pending::<anyhow::Result<()>>(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop did not stop after shutdown");
        result.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_hung_once_task() {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_once_or_periodic(
            rx,
            true,
            Duration::from_millis(10),
            || std::future::pending::<anyhow::Result<()>>(),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("once run did not stop after shutdown");
        result.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_slow_runs_overlap() {
        let (tx, rx) = watch::channel(false);
        let started = Arc::new(AtomicUsize::new(0));
        let counted = started.clone();

        let handle = tokio::spawn(run_once_or_periodic(
            rx,
            false,
            Duration::from_millis(20),
            move || {
                let counted = counted.clone();
                async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok::<(), anyhow::Error>(())
                }
            },
        ));

        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert!(started.load(Ordering::SeqCst) >= 2);
    }
}
