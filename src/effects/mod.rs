pub mod echo;
pub mod reverb;
pub mod time_pitch;

/// オーディオグラフ上のインプレース処理ノード
pub trait Effect: Send {
    /// モノラルバッファをその場で処理する
    fn process(&mut self, buffer: &mut [f32]);
    /// 内部状態 (ディレイライン等) を消去する
    fn reset(&mut self);
    fn name(&self) -> &str;
}

/// 固定長のリングバッファ
///
/// 各ノードのディレイラインとして使う。
pub(crate) struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            write_pos: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }

    /// `delay` サンプル前に書き込んだ値 (1 ≤ delay ≤ len)
    pub(crate) fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        self.buffer[(self.write_pos + len - delay.clamp(1, len)) % len]
    }

    /// 小数ディレイを線形補間で読む (1 ≤ delay < len)
    pub(crate) fn read_fractional(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let pos = (self.write_pos + len) as f32 - delay;
        let idx = pos.floor();
        let frac = pos - idx;
        let i0 = idx as usize % len;
        let i1 = (i0 + 1) % len;
        self.buffer[i0] * (1.0 - frac) + self.buffer[i1] * frac
    }

    pub(crate) fn write(&mut self, value: f32) {
        self.buffer[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    pub(crate) fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
