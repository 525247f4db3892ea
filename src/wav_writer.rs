use crate::error::{AppError, Result};
use crate::types::{AudioFormat, SampleI16};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// 録音ファイルの書き出し
///
/// 固定パスのWAVファイル (16bit PCM) に書き込む。録音のたびに上書きされる。
pub struct WavWriter {
    path: PathBuf,
    current_file: Option<hound::WavWriter<BufWriter<fs::File>>>,
    spec: hound::WavSpec,
    samples_written: usize,
}

impl WavWriter {
    pub fn new<P: AsRef<Path>>(path: P, format: AudioFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // 出力ディレクトリが存在しない場合は作成
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| match e.kind() {
                    std::io::ErrorKind::PermissionDenied => {
                        AppError::PermissionDenied(format!("{:?}: {}", dir, e))
                    }
                    _ => AppError::RecordingFailed(format!(
                        "出力ディレクトリの作成に失敗: {:?}: {}",
                        dir, e
                    )),
                })?;
            }
        }

        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        Ok(Self {
            path,
            current_file: None,
            spec,
            samples_written: 0,
        })
    }

    /// WAVファイルを開始（既存ファイルは上書き）
    pub fn start(&mut self) -> Result<()> {
        log::info!("WAVファイル作成: {:?}", self.path);

        let writer =
            hound::WavWriter::create(&self.path, self.spec).map_err(AppError::from_wav_create)?;

        self.current_file = Some(writer);
        self.samples_written = 0;

        Ok(())
    }

    /// サンプルを書き込み
    pub fn write_samples(&mut self, samples: &[SampleI16]) -> Result<()> {
        if self.current_file.is_none() {
            self.start()?;
        }

        if let Some(writer) = &mut self.current_file {
            for &sample in samples {
                writer.write_sample(sample).map_err(|e| {
                    AppError::RecordingFailed(format!("WAVファイルへのサンプル書き込みに失敗: {}", e))
                })?;
            }
            self.samples_written += samples.len();
        }

        Ok(())
    }

    /// 現在のファイルを終了
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.current_file.take() {
            writer.finalize().map_err(|e| {
                AppError::RecordingFailed(format!("WAVファイルのファイナライズに失敗: {}", e))
            })?;
            log::info!(
                "WAVファイル書き込み完了: {:?}, {}サンプル ({:.2}秒)",
                self.path,
                self.samples_written,
                self.duration_seconds()
            );
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 書き込んだサンプル数
    pub fn samples_written(&self) -> usize {
        self.samples_written
    }

    /// 書き込んだ時間（秒）
    pub fn duration_seconds(&self) -> f64 {
        self.samples_written as f64 / self.spec.channels as f64 / self.spec.sample_rate as f64
    }
}

impl Drop for WavWriter {
    fn drop(&mut self) {
        if self.current_file.is_some() {
            if let Err(e) = self.finalize() {
                log::error!("WavWriter のドロップ時にエラー: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MONO_16K: AudioFormat = AudioFormat {
        sample_rate: 16000,
        channels: 1,
    };

    #[test]
    fn test_wav_writer_basic() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("recordName.wav");
        let mut writer = WavWriter::new(&path, MONO_16K)?;

        writer.start()?;

        let samples: Vec<i16> = (0..16000)
            .map(|i| ((i as f32 * 0.1).sin() * 10000.0) as i16)
            .collect();

        writer.write_samples(&samples)?;
        assert_eq!(writer.samples_written(), 16000);
        assert!((writer.duration_seconds() - 1.0).abs() < 1e-9);
        writer.finalize()?;

        let reader = hound::WavReader::open(&path)?;
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len(), 16000);

        Ok(())
    }

    #[test]
    fn test_wav_writer_overwrites_fixed_path() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("recordName.wav");

        let mut writer = WavWriter::new(&path, MONO_16K)?;
        writer.start()?;
        writer.write_samples(&[1000i16; 8000])?;
        writer.finalize()?;

        let mut writer = WavWriter::new(&path, MONO_16K)?;
        writer.start()?;
        writer.write_samples(&[-1000i16; 100])?;
        writer.finalize()?;

        let files: Vec<_> = fs::read_dir(temp_dir.path())?
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);

        let mut reader = hound::WavReader::open(&path)?;
        assert_eq!(reader.len(), 100);
        let first: i16 = reader.samples::<i16>().next().unwrap()?;
        assert_eq!(first, -1000);

        Ok(())
    }

    #[test]
    fn test_drop_finalizes_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("recordName.wav");
        {
            let mut writer = WavWriter::new(&path, MONO_16K)?;
            writer.write_samples(&[42i16; 320])?;
        }

        let reader = hound::WavReader::open(&path)?;
        assert_eq!(reader.len(), 320);
        Ok(())
    }
}
