use crate::effects::{DelayLine, Effect};

/// マルチエコーのタップ (遅延秒, ゲイン)
const MULTI_ECHO_TAPS: [(f32, f32); 4] = [(0.075, 0.6), (0.150, 0.45), (0.225, 0.3), (0.300, 0.2)];
/// 最長タップからの帰還量
const MULTI_ECHO_FEEDBACK: f32 = 0.35;
const MULTI_ECHO_MIX: f32 = 0.5;

struct Tap {
    delay: usize,
    gain: f32,
}

/// 固定プリセットのマルチエコー
///
/// 4本のタップが減衰しながら繰り返し、最長タップの出力を入力に戻す。
pub struct Echo {
    line: DelayLine,
    taps: Vec<Tap>,
    longest: usize,
    feedback: f32,
    mix: f32,
}

impl Echo {
    pub fn multi_echo(sample_rate: u32) -> Self {
        let taps: Vec<Tap> = MULTI_ECHO_TAPS
            .iter()
            .map(|&(seconds, gain)| Tap {
                delay: ((seconds * sample_rate as f32).round() as usize).max(1),
                gain,
            })
            .collect();
        let longest = taps.iter().map(|tap| tap.delay).max().unwrap_or(1);

        Self {
            line: DelayLine::new(longest + 1),
            taps,
            longest,
            feedback: MULTI_ECHO_FEEDBACK,
            mix: MULTI_ECHO_MIX,
        }
    }
}

impl Effect for Echo {
    fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            let dry = *sample;
            let wet: f32 = self
                .taps
                .iter()
                .map(|tap| self.line.read(tap.delay) * tap.gain)
                .sum();
            let tail = self.line.read(self.longest);

            self.line.write(dry + tail * self.feedback);

            *sample = dry * (1.0 - self.mix) + wet * self.mix;
        }
    }

    fn reset(&mut self) {
        self.line.clear();
    }

    fn name(&self) -> &str {
        "ECHO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(len: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; len];
        buffer[0] = 1.0;
        buffer
    }

    #[test]
    fn test_taps_land_at_preset_delays() {
        let mut echo = Echo::multi_echo(1000);
        let mut buffer = impulse(400);
        echo.process(&mut buffer);

        assert!((buffer[0] - 0.5).abs() < 1e-6);
        assert!(buffer[1..75].iter().all(|&s| s == 0.0));
        assert!((buffer[75] - 0.3).abs() < 1e-6);
        assert!((buffer[150] - 0.225).abs() < 1e-6);
        assert!((buffer[225] - 0.15).abs() < 1e-6);
        assert!((buffer[300] - 0.1).abs() < 1e-6);
        // 最長タップの帰還が次の周回の第1タップで聞こえる
        assert!((buffer[375] - 0.5 * 0.6 * 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_state_carries_across_buffers() {
        let mut echo = Echo::multi_echo(1000);
        let mut first = impulse(50);
        let mut second = vec![0.0; 50];
        echo.process(&mut first);
        echo.process(&mut second);
        assert!((second[25] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_reset_clears_tail() {
        let mut echo = Echo::multi_echo(1000);
        let mut buffer = impulse(10);
        echo.process(&mut buffer);
        echo.reset();

        let mut silence = vec![0.0; 400];
        echo.process(&mut silence);
        assert!(silence.iter().all(|&s| s == 0.0));
    }
}
