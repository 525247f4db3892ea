use crate::error::{AppError, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 読み込み済みの録音ファイル
///
/// 全チャンネルを平均したモノラル f32 (-1.0 ~ 1.0) で保持する。
#[derive(Clone, Debug)]
pub struct AudioFile {
    path: PathBuf,
    samples: Arc<[f32]>,
    sample_rate: u32,
    recorded_at: Option<DateTime<Local>>,
}

impl AudioFile {
    /// WAVファイルを読み込む
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unreadable = |e: hound::Error| AppError::FileUnreadable(format!("{:?}: {}", path, e));

        let reader = hound::WavReader::open(&path).map_err(unreadable)?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(AppError::FileUnreadable(format!(
                "{:?}: サンプルレートが0です",
                path
            )));
        }
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(unreadable)?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(unreadable)?
            }
        };

        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        let recorded_at = std::fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Local>::from);

        log::info!(
            "録音ファイル読み込み: {:?}, {}Hz, {}ch, {}フレーム",
            path,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path,
            samples: samples.into(),
            sample_rate: spec.sample_rate,
            recorded_at,
        })
    }

    /// メモリ上のサンプルから作成
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            path: PathBuf::new(),
            samples: samples.into(),
            sample_rate,
            recorded_at: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// フレーム数
    pub fn length(&self) -> u64 {
        self.samples.len() as u64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.length() as f64 / self.sample_rate as f64)
    }

    pub fn recorded_at(&self) -> Option<DateTime<Local>> {
        self.recorded_at
    }

    /// 出力レートで読み出すソースノードを作成
    pub fn source(&self, output_rate: u32) -> FileSource {
        FileSource {
            samples: self.samples.clone(),
            position: 0.0,
            step: self.sample_rate as f64 / output_rate.max(1) as f64,
            playhead: Playhead::default(),
        }
    }
}

/// レンダラーが消費したソースフレーム数
///
/// オーディオスレッドが書き込み、UIスレッドが読む。
#[derive(Clone, Debug, Default)]
pub struct Playhead(Arc<AtomicU64>);

impl Playhead {
    pub fn frames(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, frames: u64) {
        self.0.store(frames, Ordering::Relaxed);
    }
}

/// 録音ファイルを小数位置で読み出すソースノード
///
/// `step` はファイルと出力デバイスのサンプルレート比。
pub struct FileSource {
    samples: Arc<[f32]>,
    position: f64,
    step: f64,
    playhead: Playhead,
}

impl FileSource {
    /// 現在位置のサンプルを読み、`rate` 倍速で位置を進める
    ///
    /// 終端を過ぎた後は無音を返す。
    pub fn next_sample(&mut self, rate: f64) -> f32 {
        let sample = read_interpolated(&self.samples, self.position);
        let len = self.samples.len() as f64;
        self.position = (self.position + self.step * rate).min(len);
        self.playhead.set(self.position as u64);
        sample
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.samples.len() as f64
    }

    pub fn playhead(&self) -> Playhead {
        self.playhead.clone()
    }

    /// 先頭に戻す
    pub fn rewind(&mut self) {
        self.position = 0.0;
        self.playhead.set(0);
    }
}

/// 3次エルミート補間でバッファを読む
pub fn read_interpolated(buffer: &[f32], position: f64) -> f32 {
    let len = buffer.len();
    if len == 0 {
        return 0.0;
    }

    let pos = position.max(0.0);
    let idx = pos as usize;
    if idx >= len {
        return 0.0;
    }
    let frac = (pos - idx as f64) as f32;

    let y0 = buffer[idx.saturating_sub(1)];
    let y1 = buffer[idx];
    let y2 = buffer[(idx + 1).min(len - 1)];
    let y3 = buffer[(idx + 2).min(len - 1)];

    let a = -0.5 * y0 + 1.5 * y1 - 1.5 * y2 + 0.5 * y3;
    let b = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
    let c = -0.5 * y0 + 0.5 * y2;
    let d = y1;

    a * frac * frac * frac + b * frac * frac + c * frac + d
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_downmixes_and_normalizes() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for _ in 0..100 {
            writer.write_sample(16384i16)?;
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;

        let file = AudioFile::open(&path)?;
        assert_eq!(file.length(), 100);
        assert_eq!(file.sample_rate(), 22050);
        assert!((file.samples()[0] - 0.25).abs() < 1e-6);
        assert!(file.recorded_at().is_some());
        Ok(())
    }

    #[test]
    fn test_open_missing_file_is_unreadable() {
        let result = AudioFile::open("/nonexistent/recordName.wav");
        assert!(matches!(result, Err(AppError::FileUnreadable(_))));
    }

    #[test]
    fn test_open_garbage_is_unreadable() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("recordName.wav");
        std::fs::write(&path, b"not a wav file")?;

        assert!(matches!(
            AudioFile::open(&path),
            Err(AppError::FileUnreadable(_))
        ));
        Ok(())
    }

    #[test]
    fn test_open_zero_sample_rate_is_unreadable() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("recordName.wav");

        // 44バイトのヘッダ + 1サンプル。fmt チャンクのサンプルレートが0
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&38u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // モノラル
        bytes.extend_from_slice(&0u32.to_le_bytes()); // サンプルレート
        bytes.extend_from_slice(&0u32.to_le_bytes()); // バイトレート
        bytes.extend_from_slice(&2u16.to_le_bytes()); // ブロックサイズ
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&1000i16.to_le_bytes());
        std::fs::write(&path, bytes)?;

        assert!(matches!(
            AudioFile::open(&path),
            Err(AppError::FileUnreadable(_))
        ));
        assert!(crate::recorder::Recording::probe(&path).is_none());
        Ok(())
    }

    #[test]
    fn test_source_tracks_consumed_frames() {
        let file = AudioFile::from_samples(vec![0.5; 100], 48000);
        let mut source = file.source(48000);
        let playhead = source.playhead();

        for _ in 0..40 {
            source.next_sample(1.0);
        }
        assert_eq!(playhead.frames(), 40);

        for _ in 0..40 {
            source.next_sample(2.0);
        }
        assert_eq!(playhead.frames(), 100);
        assert!(source.is_finished());
        assert_eq!(source.next_sample(1.0), 0.0);

        source.rewind();
        assert_eq!(playhead.frames(), 0);
    }

    #[test]
    fn test_source_converts_sample_rate() {
        // 24kHzのファイルを48kHzで出力すると1フレームあたり0.5進む
        let file = AudioFile::from_samples(vec![0.0; 100], 24000);
        let mut source = file.source(48000);
        for _ in 0..100 {
            source.next_sample(1.0);
        }
        assert_eq!(source.playhead().frames(), 50);
    }

    #[test]
    fn test_interpolation_hits_samples_exactly() {
        let buffer = [0.0, 1.0, 0.5, -0.5];
        assert_eq!(read_interpolated(&buffer, 1.0), 1.0);
        assert_eq!(read_interpolated(&buffer, 2.0), 0.5);
        assert_eq!(read_interpolated(&buffer, 10.0), 0.0);
    }
}
