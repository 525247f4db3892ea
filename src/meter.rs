use crate::types::SampleI16;

/// 無音時に表示する下限値 (dB)
pub const SILENCE_DB: f32 = -100.0;

/// 録音中の入力レベルメーター
///
/// RMS (Root Mean Square) ベースで、チャンクごとに現在のレベルを dBFS で保持する。
/// 表示が急に落ちないよう、下降時は1チャンクあたり `release_db` までに制限する。
///
/// # Examples
///
/// ```
/// # use pitch_perfect::meter::LevelMeter;
/// let mut meter = LevelMeter::new();
///
/// let voice: Vec<i16> = (0..1600)
///     .map(|i| ((i as f32 * 0.1).sin() * 10000.0) as i16)
///     .collect();
/// assert!(meter.process(&voice) > -20.0);
/// ```
pub struct LevelMeter {
    level_db: f32,

    /// 1チャンクあたりの最大下降量 (dB)
    release_db: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            level_db: SILENCE_DB,
            release_db: 6.0,
        }
    }

    /// チャンクを処理して現在のレベル (dB) を返す
    pub fn process(&mut self, samples: &[SampleI16]) -> f32 {
        if samples.is_empty() {
            return self.level_db;
        }

        let db = rms_to_db(calculate_rms(samples));
        self.level_db = if db >= self.level_db {
            db
        } else {
            (self.level_db - self.release_db).max(db)
        };
        self.level_db
    }

    pub fn level_db(&self) -> f32 {
        self.level_db
    }

}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// RMS (Root Mean Square) を計算
pub fn calculate_rms(samples: &[SampleI16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_of_squares: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    let mean_square = sum_of_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}

/// RMSをデシベル (dB) に変換
pub fn rms_to_db(rms: f32) -> f32 {
    if rms <= 0.0 {
        return SILENCE_DB;
    }
    (20.0 * rms.log10()).max(SILENCE_DB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_level() {
        let mut meter = LevelMeter::new();
        assert_eq!(meter.process(&vec![0i16; 1600]), SILENCE_DB);
    }

    #[test]
    fn test_full_scale_square_is_zero_db() {
        let samples: Vec<i16> = (0..1600)
            .map(|i| if i % 2 == 0 { i16::MAX } else { -i16::MAX })
            .collect();
        let db = rms_to_db(calculate_rms(&samples));
        assert!(db.abs() < 0.01, "db = {}", db);
    }

    #[test]
    fn test_release_limits_fall() {
        let mut meter = LevelMeter::new();
        let loud: Vec<i16> = vec![i16::MAX; 1600];
        assert!(meter.process(&loud).abs() < 0.01);

        // 無音になっても1チャンクでは6dBまでしか下がらない
        let level = meter.process(&vec![0i16; 1600]);
        assert!((level + 6.0).abs() < 0.01, "level = {}", level);
    }
}
