use crate::audio_file::FileSource;
use crate::effects::{DelayLine, Effect};
use crate::types::Modulation;
use std::f32::consts::PI;

/// グレイン窓の長さ (秒)
const GRAIN_WINDOW_SECONDS: f32 = 0.05;
/// この範囲内のピッチ比はシフトしない
const UNITY_TOLERANCE: f32 = 1e-4;

/// セントを周波数比に変換
pub fn cents_to_ratio(cents: f32) -> f32 {
    2f32.powf(cents / 1200.0)
}

/// ディレイライン方式のグラニュラーピッチシフタ
///
/// 半窓ずらした2本の読み出しタップを sin² 窓でクロスフェードする。
/// 読み出し位置は1サンプルあたり `ratio` 進むため、再生時間を変えずに周波数だけが変わる。
pub struct PitchShifter {
    line: DelayLine,
    window: f32,
    /// 窓内の位相 (0.0 ~ 1.0)
    phase: f32,
    ratio: f32,
}

impl PitchShifter {
    pub fn new(ratio: f32, sample_rate: u32) -> Self {
        let window = (GRAIN_WINDOW_SECONDS * sample_rate as f32).round().max(4.0);
        Self {
            line: DelayLine::new(window as usize + 3),
            window,
            phase: 0.0,
            ratio,
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }
}

impl Effect for PitchShifter {
    fn process(&mut self, buffer: &mut [f32]) {
        let step = (1.0 - self.ratio) / self.window;

        for sample in buffer.iter_mut() {
            self.line.write(*sample);

            let phase_a = self.phase;
            let phase_b = (self.phase + 0.5).fract();
            let tap_a = self.line.read_fractional(1.0 + phase_a * self.window);
            let tap_b = self.line.read_fractional(1.0 + phase_b * self.window);
            let gain_a = (PI * phase_a).sin().powi(2);
            let gain_b = (PI * phase_b).sin().powi(2);

            *sample = tap_a * gain_a + tap_b * gain_b;

            self.phase = (self.phase + step).rem_euclid(1.0);
        }
    }

    fn reset(&mut self) {
        self.line.clear();
        self.phase = 0.0;
    }

    fn name(&self) -> &str {
        "PITCH"
    }
}

/// レート/ピッチノード
///
/// ソースを `rate` 倍速で読み出し (バリスピード)、その結果生じるピッチ変化を
/// ピッチシフタで打ち消したうえで指定セント分シフトする。
pub struct TimePitch {
    rate: f64,
    shifter: Option<PitchShifter>,
}

impl TimePitch {
    pub fn new(modulation: Modulation, sample_rate: u32) -> Self {
        let rate = modulation.rate().unwrap_or(1.0);
        let cents = modulation.pitch_cents().unwrap_or(0.0);
        let ratio = cents_to_ratio(cents) / rate;

        let shifter =
            ((ratio - 1.0).abs() > UNITY_TOLERANCE).then(|| PitchShifter::new(ratio, sample_rate));

        Self {
            rate: rate as f64,
            shifter,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// ピッチシフト比 (シフトしない場合は 1.0)
    pub fn pitch_ratio(&self) -> f32 {
        self.shifter.as_ref().map_or(1.0, PitchShifter::ratio)
    }

    /// ソースから `out` を埋める
    pub fn render(&mut self, source: &mut FileSource, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = source.next_sample(self.rate);
        }
        if let Some(shifter) = &mut self.shifter {
            shifter.process(out);
        }
    }

    pub fn reset(&mut self) {
        if let Some(shifter) = &mut self.shifter {
            shifter.reset();
        }
    }
}
