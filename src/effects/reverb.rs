use crate::effects::{DelayLine, Effect};

/// コムフィルタの長さ (44.1kHz 基準、互いに素に近い長さで拡散させる)
const COMB_TUNING: [usize; 4] = [1557, 1617, 1491, 1422];
const ALLPASS_TUNING: [usize; 2] = [556, 441];
const TUNING_RATE: f32 = 44100.0;

// 大聖堂プリセット
const CATHEDRAL_ROOM_SCALE: f32 = 2.0;
const CATHEDRAL_DECAY: f32 = 0.88;
const CATHEDRAL_DAMPING: f32 = 0.2;
const ALLPASS_FEEDBACK: f32 = 0.5;
const INPUT_GAIN: f32 = 0.05;

/// ダンピング付きフィードバックコム
struct Comb {
    line: DelayLine,
    feedback: f32,
    damping: f32,
    filter_store: f32,
}

impl Comb {
    fn process(&mut self, input: f32) -> f32 {
        let out = self.line.read(self.line.len());
        self.filter_store = out * (1.0 - self.damping) + self.filter_store * self.damping;
        self.line.write(input + self.filter_store * self.feedback);
        out
    }

    fn clear(&mut self) {
        self.line.clear();
        self.filter_store = 0.0;
    }
}

struct Allpass {
    line: DelayLine,
    feedback: f32,
}

impl Allpass {
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.line.read(self.line.len());
        self.line.write(input + delayed * self.feedback);
        delayed - input
    }
}

/// 大聖堂プリセットのリバーブ
///
/// 4本の並列コムフィルタと2段のオールパスで構成する。
pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
    /// ウェット成分の割合 (0.0 ~ 1.0)
    mix: f32,
}

impl Reverb {
    /// # Arguments
    /// * `wet_dry_mix` - ウェット成分の割合 (%)
    pub fn cathedral(sample_rate: u32, wet_dry_mix: f32) -> Self {
        let scale = sample_rate as f32 / TUNING_RATE;

        let combs = COMB_TUNING
            .iter()
            .map(|&len| Comb {
                line: DelayLine::new((len as f32 * CATHEDRAL_ROOM_SCALE * scale) as usize),
                feedback: CATHEDRAL_DECAY,
                damping: CATHEDRAL_DAMPING,
                filter_store: 0.0,
            })
            .collect();

        let allpasses = ALLPASS_TUNING
            .iter()
            .map(|&len| Allpass {
                line: DelayLine::new((len as f32 * scale) as usize),
                feedback: ALLPASS_FEEDBACK,
            })
            .collect();

        Self {
            combs,
            allpasses,
            mix: (wet_dry_mix / 100.0).clamp(0.0, 1.0),
        }
    }
}

impl Effect for Reverb {
    fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            let dry = *sample;
            let input = dry * INPUT_GAIN;

            let mut wet: f32 = self.combs.iter_mut().map(|comb| comb.process(input)).sum();
            for allpass in &mut self.allpasses {
                wet = allpass.process(wet);
            }

            *sample = dry * (1.0 - self.mix) + wet * self.mix;
        }
    }

    fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.clear();
        }
        for allpass in &mut self.allpasses {
            allpass.line.clear();
        }
    }

    fn name(&self) -> &str {
        "REVERB"
    }
}
