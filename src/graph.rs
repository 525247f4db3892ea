use crate::audio_file::{AudioFile, FileSource, Playhead};
use crate::config::EffectsConfig;
use crate::effects::echo::Echo;
use crate::effects::reverb::Reverb;
use crate::effects::time_pitch::TimePitch;
use crate::effects::Effect;
use crate::types::PlaybackSettings;
use std::fmt;

/// 再生グラフの処理段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// 録音ファイルの読み出し
    Source,
    /// レート/ピッチ
    TimePitch,
    /// マルチエコー
    Echo,
    /// 大聖堂リバーブ
    Reverb,
    /// 出力デバイス
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Source => "Source",
            Stage::TimePitch => "TimePitch",
            Stage::Echo => "Echo",
            Stage::Reverb => "Reverb",
            Stage::Output => "Output",
        };
        f.write_str(name)
    }
}

/// 直列の再生グラフ
///
/// ```text
/// Source → TimePitch → [Echo] → [Reverb] → Output
/// ```
///
/// 形は4通り (エコー/リバーブの有無) で、段数は3〜5。
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackGraph {
    settings: PlaybackSettings,
    stages: Vec<Stage>,
}

impl PlaybackGraph {
    /// 設定から処理段の並びを組み立てる
    pub fn assemble(settings: PlaybackSettings) -> Self {
        let mut stages = vec![Stage::Source, Stage::TimePitch];
        if settings.echo {
            stages.push(Stage::Echo);
        }
        if settings.reverb {
            stages.push(Stage::Reverb);
        }
        stages.push(Stage::Output);

        Self { settings, stages }
    }

    pub fn settings(&self) -> PlaybackSettings {
        self.settings
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// 隣接する段の接続 (出力 → 入力)
    pub fn edges(&self) -> Vec<(Stage, Stage)> {
        self.stages.windows(2).map(|pair| (pair[0], pair[1])).collect()
    }

    /// 接続順にノードを生成してレンダラーを作る
    ///
    /// # Arguments
    /// * `file` - 再生する録音
    /// * `output_rate` - 出力デバイスのサンプルレート
    /// * `effects` - リバーブのウェット量など
    pub fn build_renderer(
        &self,
        file: &AudioFile,
        output_rate: u32,
        effects: &EffectsConfig,
    ) -> Renderer {
        let source = file.source(output_rate);
        let time_pitch = TimePitch::new(self.settings.modulation, output_rate);
        let mut nodes: Vec<Box<dyn Effect>> = Vec::new();

        for (from, to) in self.edges() {
            log::debug!("接続: {} → {}", from, to);
            match to {
                Stage::Echo => nodes.push(Box::new(Echo::multi_echo(output_rate))),
                Stage::Reverb => nodes.push(Box::new(Reverb::cathedral(
                    output_rate,
                    effects.reverb_wet_dry_mix,
                ))),
                Stage::Source | Stage::TimePitch | Stage::Output => {}
            }
        }

        Renderer {
            source,
            time_pitch,
            nodes,
        }
    }
}

/// 組み立て済みグラフの実体
///
/// 出力ストリームのコールバックから呼ばれる。
pub struct Renderer {
    source: FileSource,
    time_pitch: TimePitch,
    nodes: Vec<Box<dyn Effect>>,
}

impl Renderer {
    /// 出力バッファ (モノラル) を埋める
    pub fn render(&mut self, out: &mut [f32]) {
        self.time_pitch.render(&mut self.source, out);
        for node in &mut self.nodes {
            node.process(out);
        }
    }

    /// 先頭に戻して全ノードの状態を消去する
    pub fn reset(&mut self) {
        self.source.rewind();
        self.time_pitch.reset();
        for node in &mut self.nodes {
            node.reset();
        }
    }

    pub fn playhead(&self) -> Playhead {
        self.source.playhead()
    }

    /// TimePitch より後ろのノード名
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Modulation;

    fn settings(echo: bool, reverb: bool) -> PlaybackSettings {
        PlaybackSettings {
            modulation: Modulation::None,
            echo,
            reverb,
        }
    }

    #[test]
    fn test_echo_and_reverb_chain() {
        let graph = PlaybackGraph::assemble(settings(true, true));
        assert_eq!(
            graph.stages(),
            &[
                Stage::Source,
                Stage::TimePitch,
                Stage::Echo,
                Stage::Reverb,
                Stage::Output
            ]
        );
        assert_eq!(graph.edges().len(), 4);
    }

    #[test]
    fn test_echo_only_chain() {
        let graph = PlaybackGraph::assemble(settings(true, false));
        assert_eq!(
            graph.stages(),
            &[Stage::Source, Stage::TimePitch, Stage::Echo, Stage::Output]
        );
    }

    #[test]
    fn test_reverb_only_chain() {
        let graph = PlaybackGraph::assemble(settings(false, true));
        assert_eq!(
            graph.stages(),
            &[Stage::Source, Stage::TimePitch, Stage::Reverb, Stage::Output]
        );
    }

    #[test]
    fn test_plain_chain() {
        let graph = PlaybackGraph::assemble(PlaybackSettings::PLAIN);
        assert_eq!(
            graph.stages(),
            &[Stage::Source, Stage::TimePitch, Stage::Output]
        );
        assert_eq!(
            graph.edges(),
            vec![
                (Stage::Source, Stage::TimePitch),
                (Stage::TimePitch, Stage::Output)
            ]
        );
    }

    #[test]
    fn test_edges_connect_consecutive_stages() {
        let graph = PlaybackGraph::assemble(settings(true, true));
        for (i, (from, to)) in graph.edges().into_iter().enumerate() {
            assert_eq!(from, graph.stages()[i]);
            assert_eq!(to, graph.stages()[i + 1]);
        }
    }

    #[test]
    fn test_renderer_follows_stage_order() {
        let file = AudioFile::from_samples(vec![0.25; 4800], 48000);
        let effects = EffectsConfig::default();

        let renderer =
            PlaybackGraph::assemble(settings(true, true)).build_renderer(&file, 48000, &effects);
        assert_eq!(renderer.node_names(), vec!["ECHO", "REVERB"]);

        let renderer =
            PlaybackGraph::assemble(settings(false, true)).build_renderer(&file, 48000, &effects);
        assert_eq!(renderer.node_names(), vec!["REVERB"]);

        let renderer =
            PlaybackGraph::assemble(PlaybackSettings::PLAIN).build_renderer(&file, 48000, &effects);
        assert!(renderer.node_names().is_empty());
    }

    #[test]
    fn test_renderer_reset_rewinds() {
        let file = AudioFile::from_samples(vec![0.25; 4800], 48000);
        let mut renderer = PlaybackGraph::assemble(settings(true, false)).build_renderer(
            &file,
            48000,
            &EffectsConfig::default(),
        );
        let playhead = renderer.playhead();

        let mut out = vec![0.0; 1024];
        renderer.render(&mut out);
        assert_eq!(playhead.frames(), 1024);

        renderer.reset();
        assert_eq!(playhead.frames(), 0);
    }
}
