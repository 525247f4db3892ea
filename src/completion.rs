use std::time::{Duration, Instant};

/// 再生の残り時間を計算
///
/// レンダラーが報告した消費済みフレーム数から求めるため、再生開始までの遅延に影響されない。
/// レート倍率が指定されていれば、その分だけ短く (長く) なる。
///
/// # Arguments
/// * `total_frames` - 録音のフレーム数
/// * `rendered_frames` - 消費済みフレーム数
/// * `sample_rate` - 録音のサンプルレート
/// * `rate` - 再生速度の倍率
///
/// # Examples
///
/// ```
/// # use pitch_perfect::completion::remaining_duration;
/// let unity = remaining_duration(48000, 0, 48000, None);
/// let slow = remaining_duration(48000, 0, 48000, Some(0.5));
/// assert_eq!(unity.as_secs_f64(), 1.0);
/// assert_eq!(slow.as_secs_f64(), 2.0);
/// ```
pub fn remaining_duration(
    total_frames: u64,
    rendered_frames: u64,
    sample_rate: u32,
    rate: Option<f32>,
) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }

    let remaining = total_frames.saturating_sub(rendered_frames) as f64;
    let mut seconds = remaining / sample_rate as f64;
    if let Some(rate) = rate {
        seconds /= rate as f64;
    }

    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}

/// 1回だけ発火するタイマー
///
/// UIループから `poll` で確認する。
#[derive(Debug, Default)]
pub struct CompletionTimer {
    deadline: Option<Instant>,
}

impl CompletionTimer {
    /// `now` から `delay` 後に発火するよう設定する
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// 期限を過ぎていれば `true` を返して解除する
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// 発火までの残り時間
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Duration, b: f64) -> bool {
        (a.as_secs_f64() - b).abs() < 1e-6
    }

    #[test]
    fn test_remaining_without_rate() {
        // L = 44100 * 3, R = 44100, 1秒分レンダリング済み
        let d = remaining_duration(132_300, 44_100, 44_100, None);
        assert!(approx(d, 2.0), "{:?}", d);

        let d = remaining_duration(100_000, 12_345, 48_000, None);
        assert!(approx(d, (100_000.0 - 12_345.0) / 48_000.0), "{:?}", d);
    }

    #[test]
    fn test_half_rate_doubles_remaining() {
        let unity = remaining_duration(96_000, 10_000, 48_000, None);
        let slow = remaining_duration(96_000, 10_000, 48_000, Some(0.5));
        assert!(approx(slow, unity.as_secs_f64() * 2.0), "{:?} {:?}", unity, slow);

        let fast = remaining_duration(96_000, 10_000, 48_000, Some(1.5));
        assert!(approx(fast, unity.as_secs_f64() / 1.5), "{:?}", fast);
    }

    #[test]
    fn test_overrun_clamps_to_zero() {
        assert_eq!(remaining_duration(100, 500, 48_000, None), Duration::ZERO);
        assert_eq!(remaining_duration(100, 0, 0, None), Duration::ZERO);
    }

    #[test]
    fn test_timer_fires_once() {
        let start = Instant::now();
        let mut timer = CompletionTimer::default();
        timer.arm(start, Duration::from_millis(500));

        assert!(!timer.poll(start + Duration::from_millis(100)));
        assert_eq!(
            timer.remaining(start + Duration::from_millis(100)),
            Some(Duration::from_millis(400))
        );
        assert!(timer.poll(start + Duration::from_millis(500)));
        assert!(!timer.poll(start + Duration::from_secs(10)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let start = Instant::now();
        let mut timer = CompletionTimer::default();
        timer.arm(start, Duration::ZERO);
        timer.cancel();
        assert!(!timer.poll(start + Duration::from_secs(1)));
    }
}
