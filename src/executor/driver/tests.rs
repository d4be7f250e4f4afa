#[cfg(test)]
mod tests {
    use crate::executor::driver::{hold, Hold};
    use crate::executor::JobPhase;
    use crate::log::{ChannelBus, Event};
    use crate::model::PlannedJob;
    use tokio::time::{sleep, Duration, Instant};
    use tokio_util::sync::CancellationToken;

    fn ticks(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Event>) -> Vec<(JobPhase, u64, u64)> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Event::Tick { phase, elapsed, total, .. } = event {
                out.push((phase, elapsed, total));
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_emits_one_tick_per_second() {
        let (bus, mut rx) = ChannelBus::new();
        let job = PlannedJob::new("1", "One", 3, 0);
        let started = Instant::now();

        let result = hold(&bus, &job, JobPhase::Active, 3, &CancellationToken::new()).await;

        assert_eq!(result, Hold { elapsed: 3, cancelled: false });
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(
            ticks(&mut rx),
            vec![(JobPhase::Active, 1, 3), (JobPhase::Active, 2, 3), (JobPhase::Active, 3, 3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_zero_seconds_returns_immediately() {
        let (bus, mut rx) = ChannelBus::new();
        let job = PlannedJob::new("1", "One", 0, 0);
        let started = Instant::now();

        let result = hold(&bus, &job, JobPhase::Resting, 0, &CancellationToken::new()).await;

        assert_eq!(result, Hold { elapsed: 0, cancelled: false });
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(ticks(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_stops_at_cancellation() {
        let (bus, mut rx) = ChannelBus::new();
        let job = PlannedJob::new("1", "One", 10, 0);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let result = hold(&bus, &job, JobPhase::Active, 10, &cancel).await;

        assert_eq!(result, Hold { elapsed: 2, cancelled: true });
        assert_eq!(ticks(&mut rx).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_already_cancelled() {
        let (bus, mut rx) = ChannelBus::new();
        let job = PlannedJob::new("1", "One", 5, 0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = hold(&bus, &job, JobPhase::Active, 5, &cancel).await;

        assert_eq!(result, Hold { elapsed: 0, cancelled: true });
        assert!(ticks(&mut rx).is_empty());
    }
}
