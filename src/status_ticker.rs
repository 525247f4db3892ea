use std::time::{Duration, Instant};

/// 録音中のステータス表示
///
/// 一定間隔ごとに経過秒数を1つ進め、`"Recording . . ."` のような
/// アニメーション付きのラベルと経過秒数ラベルを作る。
pub struct StatusTicker {
    interval: Duration,
    elapsed: u64,
    next_tick: Option<Instant>,
}

impl StatusTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: 0,
            next_tick: None,
        }
    }

    /// カウンタを0に戻してタイマーを開始
    pub fn start(&mut self, now: Instant) {
        self.elapsed = 0;
        self.next_tick = Some(now + self.interval);
    }

    /// タイマーを止める (ラベルはそのまま残る)
    pub fn stop(&mut self) {
        self.next_tick = None;
    }

    /// 画面表示時の初期化。ラベルも空に戻す
    pub fn reset(&mut self) {
        self.stop();
        self.elapsed = 0;
    }

    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// 期限が来た分だけティックを進め、進めた回数を返す
    pub fn poll(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while let Some(next) = self.next_tick {
            if now < next {
                break;
            }
            self.tick();
            self.next_tick = Some(next + self.interval);
            fired += 1;
        }
        fired
    }

    /// 経過秒数を1つ進める
    pub fn tick(&mut self) {
        self.elapsed += 1;
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// `"Recording"` に経過秒数 mod 4 個の `" ."` を付けたラベル
    pub fn status_label(&self) -> String {
        if self.elapsed == 0 {
            return String::new();
        }
        let dots = " .".repeat((self.elapsed % 4) as usize);
        format!("Recording{}", dots)
    }

    pub fn timer_label(&self) -> String {
        if self.elapsed == 0 {
            return String::new();
        }
        self.elapsed.to_string()
    }
}
