use serde::{Deserialize, Serialize};

/// 16ビット整数型のオーディオサンプル
///
/// PCM形式の音声データを表現するための型エイリアス。
/// -32768 から 32767 の範囲の値を取る。
pub type SampleI16 = i16;

/// オーディオフォーマット情報
///
/// 音声データのサンプリングレートとチャンネル数を保持する。
///
/// # Examples
///
/// ```
/// # use pitch_perfect::types::AudioFormat;
/// let format = AudioFormat {
///     sample_rate: 48000,  // 48kHz
///     channels: 1,          // モノラル
/// };
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    /// サンプリングレート (Hz)
    pub sample_rate: u32,

    /// チャンネル数
    pub channels: u16,
}

/// オーディオチャンク
///
/// 入力デバイスのコールバックから届く、モノラルにダウンミックス済みの音声。
#[derive(Clone, Debug)]
pub struct AudioChunk {
    /// PCM音声サンプルの配列
    pub samples: Vec<SampleI16>,

    /// オーディオフォーマット情報
    pub format: AudioFormat,
}

/// 再生エフェクトのプリセット
///
/// プレイヤー画面のボタン1つに対応し、互いに排他的。
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EffectPreset {
    /// ピッチを上げる (リス)
    PitchUp,
    /// ピッチを下げる (匿名の声)
    PitchDown,
    /// 早回し (オウム)
    Fast,
    /// スロー再生 (カタツムリ)
    Slow,
    /// マルチエコー (カンガルー)
    Echo,
    /// 大聖堂リバーブ
    Reverb,
}

impl EffectPreset {
    /// 画面上の並び順
    pub const ALL: [EffectPreset; 6] = [
        EffectPreset::PitchUp,
        EffectPreset::PitchDown,
        EffectPreset::Fast,
        EffectPreset::Slow,
        EffectPreset::Echo,
        EffectPreset::Reverb,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EffectPreset::PitchUp => "Squirrel",
            EffectPreset::PitchDown => "Anonymous",
            EffectPreset::Fast => "Parrot",
            EffectPreset::Slow => "Snail",
            EffectPreset::Echo => "Kangaroo",
            EffectPreset::Reverb => "Reverb",
        }
    }

    /// 割り当てキー
    pub fn key(&self) -> char {
        match self {
            EffectPreset::PitchUp => 's',
            EffectPreset::PitchDown => 'a',
            EffectPreset::Fast => 'f',
            EffectPreset::Slow => 'l',
            EffectPreset::Echo => 'k',
            EffectPreset::Reverb => 'v',
        }
    }

    /// キー入力からプリセットを引く (文字キーまたは 1-6)
    pub fn from_key(c: char) -> Option<Self> {
        if let Some(digit) = c.to_digit(10) {
            return (1..=6)
                .contains(&digit)
                .then(|| Self::ALL[digit as usize - 1]);
        }
        Self::ALL.into_iter().find(|preset| preset.key() == c)
    }
}

/// レート/ピッチノードの変調
///
/// レートとピッチは同時に指定できない。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Modulation {
    /// 無変調
    None,
    /// 再生速度の倍率 (ピッチは維持)
    Rate(f32),
    /// ピッチシフト量 (セント、再生時間は維持)
    Pitch(f32),
}

impl Modulation {
    pub fn rate(&self) -> Option<f32> {
        match *self {
            Modulation::Rate(rate) => Some(rate),
            _ => None,
        }
    }

    pub fn pitch_cents(&self) -> Option<f32> {
        match *self {
            Modulation::Pitch(cents) => Some(cents),
            _ => None,
        }
    }
}

/// 1回の再生に使う設定
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackSettings {
    pub modulation: Modulation,
    pub echo: bool,
    pub reverb: bool,
}

impl PlaybackSettings {
    /// 無加工の再生
    pub const PLAIN: PlaybackSettings = PlaybackSettings {
        modulation: Modulation::None,
        echo: false,
        reverb: false,
    };

    pub fn rate(&self) -> Option<f32> {
        self.modulation.rate()
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self::PLAIN
    }
}
