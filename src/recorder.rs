use crate::audio_input::AudioInput;
use crate::config::{AudioConfig, RecordingConfig};
use crate::error::Result;
use crate::meter::LevelMeter;
use crate::types::{AudioChunk, AudioFormat};
use crate::wav_writer::WavWriter;
use chrono::{DateTime, Local};
use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};

/// 入力チャンクキューの容量
const CHUNK_QUEUE_CAPACITY: usize = 256;

/// 録音済みファイルの情報
#[derive(Clone, Debug)]
pub struct Recording {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub samples: usize,
    pub recorded_at: DateTime<Local>,
}

impl Recording {
    /// 前回の起動で残った録音ファイルがあれば、その情報を読む
    pub fn probe<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path).ok()?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return None;
        }
        let recorded_at = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map(DateTime::<Local>::from)
            .unwrap_or_else(|_| Local::now());

        Some(Self {
            path: path.to_path_buf(),
            format: AudioFormat {
                sample_rate: spec.sample_rate,
                channels: spec.channels,
            },
            samples: reader.duration() as usize,
            recorded_at,
        })
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples as f64 / self.format.sample_rate as f64
    }
}

/// 受信したチャンクをWAVファイルとレベルメーターへ流す
///
/// UIスレッドから `drain` を呼ぶ。
pub struct Recorder {
    writer: WavWriter,
    meter: LevelMeter,
    chunk_rx: Receiver<AudioChunk>,
    format: AudioFormat,
    started_at: DateTime<Local>,
}

impl Recorder {
    pub fn new(writer: WavWriter, format: AudioFormat, chunk_rx: Receiver<AudioChunk>) -> Self {
        Self {
            writer,
            meter: LevelMeter::new(),
            chunk_rx,
            format,
            started_at: Local::now(),
        }
    }

    /// 届いているチャンクをすべて書き出し、処理したチャンク数を返す
    pub fn drain(&mut self) -> Result<usize> {
        let mut count = 0;
        for chunk in self.chunk_rx.try_iter() {
            self.meter.process(&chunk.samples);
            self.writer.write_samples(&chunk.samples)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn level_db(&self) -> f32 {
        self.meter.level_db()
    }

    pub fn samples_written(&self) -> usize {
        self.writer.samples_written()
    }

    /// 残りを書き出してファイルを閉じる
    pub fn finish(mut self) -> Result<Recording> {
        self.drain()?;
        self.writer.finalize()?;

        Ok(Recording {
            path: self.writer.path().to_path_buf(),
            format: self.format,
            samples: self.writer.samples_written(),
            recorded_at: self.started_at,
        })
    }
}

/// マイク録音セッション
///
/// 入力ストリームと録音ファイルを所有する。開始から停止 (またはドロップ) までが1回の録音。
pub struct RecordingSession {
    input: AudioInput,
    recorder: Recorder,
}

impl RecordingSession {
    /// 入力デバイスを開き、固定パスへの録音を開始する
    pub fn start(audio: &AudioConfig, recording: &RecordingConfig) -> Result<Self> {
        let mut input = AudioInput::new(audio)?;
        let format = input.format();

        let mut writer = WavWriter::new(recording.file_path(), format)?;
        writer.start()?;

        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(CHUNK_QUEUE_CAPACITY);
        input.start(chunk_tx)?;

        log::info!("録音を開始しました: {:?}", recording.file_path());

        Ok(Self {
            input,
            recorder: Recorder::new(writer, format, chunk_rx),
        })
    }

    /// 届いたチャンクを書き出す (UIループから定期的に呼ぶ)
    pub fn pump(&mut self) -> Result<()> {
        self.recorder.drain()?;
        Ok(())
    }

    pub fn level_db(&self) -> f32 {
        self.recorder.level_db()
    }

    /// 入力を止め、ファイルを確定させる
    pub fn stop(mut self) -> Result<Recording> {
        self.input.stop();
        let recording = self.recorder.finish()?;
        log::info!(
            "録音を停止しました: {:.2}秒",
            recording.duration_seconds()
        );
        Ok(recording)
    }
}
