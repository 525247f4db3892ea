use crate::config::Config;
use crate::meter::SILENCE_DB;
use crate::player::{EffectPanel, Player};
use crate::recorder::{Recording, RecordingSession};
use crate::tui_state::{Notice, Screen, TuiState};
use crate::types::{EffectPreset, Modulation};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// イベントのポーリング間隔 (タイマーの確認もこの間隔で行う)
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// TUIアプリケーション
///
/// 録音画面と再生画面を持ち、全ての状態遷移をこのスレッドで行う。
pub struct TuiApp {
    config: Config,
    state: TuiState,
    recording: Option<RecordingSession>,
    player: Option<Player>,
    running: Arc<AtomicBool>,
}

impl TuiApp {
    pub fn new(config: Config, running: Arc<AtomicBool>) -> Self {
        let mut state = TuiState::new(Duration::from_millis(
            config.recording.status_interval_ms,
        ));
        state.last_recording = Recording::probe(config.recording.file_path());

        Self {
            config,
            state,
            recording: None,
            player: None,
            running,
        }
    }

    /// TUIを起動
    pub fn run(&mut self) -> Result<()> {
        // ターミナルを初期化
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        // 録音・再生を確実に終了させる
        self.shutdown();

        // ターミナルをリストア
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            // 画面を描画
            terminal.draw(|f| self.draw(f))?;

            if event::poll(POLL_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if key.code == KeyCode::Char('z') && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        Self::suspend(terminal)?;
                    } else {
                        self.handle_key(key, Instant::now());
                    }
                }
            }

            self.on_tick(Instant::now());
        }
        Ok(())
    }

    /// Ctrl+Z でプロセスを一時停止
    fn suspend(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        // まずターミナルをリストア
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;

        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            let _ = signal::raise(Signal::SIGTSTP);
        }

        // 再開後にターミナルを再初期化
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        terminal.clear()?;
        Ok(())
    }

    /// キー入力を処理
    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        // 通知はどのキーでも閉じる
        if self.state.notice.is_some() {
            self.state.dismiss_notice();
            return;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.running.store(false, Ordering::SeqCst);
                return;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running.store(false, Ordering::SeqCst);
                return;
            }
            _ => {}
        }

        match self.state.screen {
            Screen::Recorder => match key.code {
                KeyCode::Char('r') | KeyCode::Char(' ') => self.toggle_recording(now),
                KeyCode::Char('p') | KeyCode::Enter => self.open_player(),
                _ => {}
            },
            Screen::Player => match key.code {
                KeyCode::Esc | KeyCode::Char('b') => self.close_player(),
                KeyCode::Char('x') => {
                    if let Some(player) = &mut self.player {
                        player.stop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(preset) = EffectPreset::from_key(c) {
                        self.play(preset);
                    }
                }
                _ => {}
            },
        }
    }

    /// 録音の開始/停止
    fn toggle_recording(&mut self, now: Instant) {
        if let Some(session) = self.recording.take() {
            self.state.recorder.is_recording = false;
            self.state.recorder.ticker.stop();
            match session.stop() {
                Ok(recording) => self.state.last_recording = Some(recording),
                Err(e) => self.state.notify(&e),
            }
            return;
        }

        match RecordingSession::start(&self.config.audio, &self.config.recording) {
            Ok(session) => {
                self.recording = Some(session);
                self.state.recorder.is_recording = true;
                self.state.recorder.ticker.start(now);
            }
            Err(e) => self.state.notify(&e),
        }
    }

    /// 再生画面へ移動 (録音中は移動しない)
    ///
    /// 録音ファイルが無い、または読めない場合は通知を出して録音画面に留まる。
    fn open_player(&mut self) {
        if !self.state.can_open_player() {
            return;
        }

        match Player::open(
            self.config.recording.file_path(),
            &self.config.audio,
            &self.config.effects,
        ) {
            Ok(player) => {
                self.player = Some(player);
                self.state.screen = Screen::Player;
            }
            Err(e) => self.state.notify(&e),
        }
    }

    /// 再生画面を離れる。再生中なら止める
    fn close_player(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.stop();
        }
        self.state.screen = Screen::Recorder;
        self.state.recorder.appear();
    }

    /// 再生を開始する。完了タイマーは出力が始まった時刻から数える
    fn play(&mut self, preset: EffectPreset) {
        let Some(player) = &mut self.player else {
            return;
        };
        if let Err(e) = player.trigger(preset) {
            self.state.notify(&e);
        }
    }

    /// ポーリングごとの処理: 録音データの書き出し、ステータス更新、再生完了の確認
    fn on_tick(&mut self, now: Instant) {
        let pumped = self.recording.as_mut().map(|session| {
            session.pump().map(|_| session.level_db())
        });
        match pumped {
            Some(Ok(level_db)) => {
                self.state.recorder.level_db = level_db;
                self.state.recorder.ticker.poll(now);
            }
            Some(Err(e)) => {
                // 書き込みに失敗した録音はそこで終了する
                self.recording = None;
                self.state.recorder.is_recording = false;
                self.state.recorder.ticker.stop();
                self.state.notify(&e);
            }
            None => {}
        }

        if let Some(player) = &mut self.player {
            if player.poll(now) {
                log::debug!("エフェクトボタンを有効化しました");
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(session) = self.recording.take() {
            match session.stop() {
                Ok(recording) => log::info!("終了時に録音を保存しました: {:?}", recording.path),
                Err(e) => log::error!("終了時の録音保存に失敗: {}", e),
            }
        }
        if let Some(mut player) = self.player.take() {
            player.stop();
        }
    }

    /// 画面を描画
    fn draw(&self, f: &mut Frame) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),    // 本体
                Constraint::Length(1), // キー操作のヒント
            ])
            .split(f.area());

        match self.state.screen {
            Screen::Recorder => self.draw_recorder(f, sections[0]),
            Screen::Player => self.draw_player(f, sections[0]),
        }
        self.draw_hints(f, sections[1]);

        if let Some(notice) = &self.state.notice {
            Self::draw_notice(f, notice);
        }
    }

    /// 録音画面を描画
    fn draw_recorder(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Record Audio")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::White));
        let inner_area = block.inner(area);
        f.render_widget(block, area);

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // マイクボタン
                Constraint::Length(1), // ステータス
                Constraint::Length(1), // 経過秒数
                Constraint::Length(1), // 入力レベル
                Constraint::Min(0),    // 最新の録音
            ])
            .split(inner_area);

        let view = &self.state.recorder;

        let (mic_style, mic_text) = if view.is_recording {
            (
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                "● REC",
            )
        } else {
            (Style::default().fg(Color::Yellow), "○ 録音待機")
        };
        let mic = Paragraph::new(mic_text)
            .alignment(Alignment::Center)
            .style(mic_style)
            .block(Block::default().borders(Borders::ALL).border_style(mic_style));
        f.render_widget(mic, Self::centered_columns(30, sections[0]));

        let status = Paragraph::new(view.ticker.status_label())
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Cyan));
        f.render_widget(status, sections[1]);

        let timer = Paragraph::new(view.ticker.timer_label())
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD));
        f.render_widget(timer, sections[2]);

        if view.is_recording {
            Self::draw_volume_bar(f, sections[3], view.level_db);
        }

        let summary = match &self.state.last_recording {
            Some(recording) => Line::from(vec![
                Span::styled("最新の録音: ", Style::default().fg(Color::White)),
                Span::styled(
                    format!(
                        "{:.1}秒  {}",
                        recording.duration_seconds(),
                        recording.recorded_at.format("%Y-%m-%d %H:%M:%S")
                    ),
                    Style::default().fg(Color::Green),
                ),
            ]),
            None => Line::from(Span::styled(
                "録音はまだありません",
                Style::default().fg(Color::Gray),
            )),
        };
        f.render_widget(
            Paragraph::new(summary).wrap(Wrap { trim: false }),
            sections[4],
        );
    }

    /// 再生画面を描画
    fn draw_player(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Play Audio")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::White));
        let inner_area = block.inner(area);
        f.render_widget(block, area);

        let Some(player) = &self.player else {
            return;
        };

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // ファイル情報
                Constraint::Length(4), // ボタン1段目
                Constraint::Length(4), // ボタン2段目
                Constraint::Length(1), // 再生状況
                Constraint::Min(0),
            ])
            .split(inner_area);

        let file = player.file();
        let recorded_at = file
            .recorded_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "--".to_string());
        let info = Line::from(vec![
            Span::styled(
                format!("{}", file.path().display()),
                Style::default().fg(Color::Green),
            ),
            Span::raw(format!(
                "  {:.1}秒  {}Hz  {}",
                file.duration().as_secs_f64(),
                file.sample_rate(),
                recorded_at
            )),
        ]);
        f.render_widget(Paragraph::new(info), sections[0]);

        for (row, presets) in EffectPreset::ALL.chunks(3).enumerate() {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Ratio(1, 3); 3])
                .split(sections[1 + row]);
            for (column, preset) in presets.iter().enumerate() {
                self.draw_effect_button(f, columns[column], *preset, player.panel());
            }
        }

        match player.session() {
            Some(session) => {
                let label = format!(
                    "再生中: {}  残り {:.1}秒",
                    player.panel().active().map_or("", |p| p.label()),
                    session.remaining(Instant::now()).as_secs_f64()
                );
                let gauge = Gauge::default()
                    .label(label)
                    .gauge_style(Style::default().fg(Color::Cyan))
                    .ratio(session.progress());
                f.render_widget(gauge, sections[3]);
            }
            None => {
                let idle = Paragraph::new("エフェクトを選んで再生")
                    .style(Style::default().fg(Color::Gray));
                f.render_widget(idle, sections[3]);
            }
        }
    }

    /// エフェクトボタンを1つ描画
    fn draw_effect_button(&self, f: &mut Frame, area: Rect, preset: EffectPreset, panel: &EffectPanel) {
        let style = if panel.active() == Some(preset) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if panel.is_enabled() {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let index = EffectPreset::ALL
            .iter()
            .position(|p| *p == preset)
            .map_or(0, |i| i + 1);
        let text = Text::from(vec![
            Line::from(format!("[{}] {}", preset.key(), preset.label())),
            Line::from(format!("{}  ({})", self.describe(preset), index)),
        ]);

        let button = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(style)
            .block(Block::default().borders(Borders::ALL).border_style(style));
        f.render_widget(button, area);
    }

    /// プリセットの効果を短く表す
    fn describe(&self, preset: EffectPreset) -> String {
        let settings = self.config.effects.settings_for(preset);
        match settings.modulation {
            Modulation::Pitch(cents) => format!("pitch {:+.0}c", cents),
            Modulation::Rate(rate) => format!("rate x{}", rate),
            Modulation::None if settings.echo => "multi echo".to_string(),
            Modulation::None if settings.reverb => format!(
                "cathedral {:.0}%",
                self.config.effects.reverb_wet_dry_mix
            ),
            Modulation::None => "plain".to_string(),
        }
    }

    /// ボリュームバーを描画
    fn draw_volume_bar(f: &mut Frame, area: Rect, level_db: f32) {
        let label = if level_db <= SILENCE_DB {
            "入力: 無音".to_string()
        } else {
            format!("入力: {:.1} dB", level_db)
        };

        let gauge = Gauge::default()
            .label(label)
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(Self::db_to_ratio(level_db));
        f.render_widget(gauge, area);
    }

    fn draw_hints(&self, f: &mut Frame, area: Rect) {
        let hints = match self.state.screen {
            Screen::Recorder if self.state.recorder.is_recording => "[r/Space] 録音停止  [q] 終了",
            Screen::Recorder => "[r/Space] 録音開始  [p/Enter] 再生画面  [q] 終了",
            Screen::Player => "[s a f l k v / 1-6] エフェクト  [x] 停止  [b/Esc] 戻る  [q] 終了",
        };
        let paragraph = Paragraph::new(hints).style(Style::default().fg(Color::DarkGray));
        f.render_widget(paragraph, area);
    }

    /// 通知を画面中央に描画
    fn draw_notice(f: &mut Frame, notice: &Notice) {
        let area = Self::centered_rect(60, 7, f.area());
        let block = Block::default()
            .title(notice.title.as_str())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));

        let text = Text::from(vec![
            Line::from(notice.message.as_str()),
            Line::from(""),
            Line::from(Span::styled(
                "[Enter] Dismiss",
                Style::default().fg(Color::Yellow),
            )),
        ]);
        let paragraph = Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(paragraph, area);
    }

    /// dBを0.0～1.0の比率に変換
    /// -60dB～0dB を 0.0～1.0 にマッピング
    fn db_to_ratio(db: f32) -> f64 {
        let min_db = -60.0;
        let max_db = 0.0;
        let clamped = db.clamp(min_db, max_db);
        ((clamped - min_db) / (max_db - min_db)) as f64
    }

    fn centered_columns(width: u16, area: Rect) -> Rect {
        let width = width.min(area.width);
        Rect {
            x: area.x + (area.width - width) / 2,
            width,
            ..area
        }
    }

    fn centered_rect(width_percent: u16, height: u16, area: Rect) -> Rect {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Fill(1),
                Constraint::Length(height),
                Constraint::Fill(1),
            ])
            .split(area);
        let side = (100 - width_percent) / 2;
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(side),
                Constraint::Percentage(width_percent),
                Constraint::Percentage(side),
            ])
            .split(vertical[1])[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_ratio_clamps() {
        assert_eq!(TuiApp::db_to_ratio(-100.0), 0.0);
        assert_eq!(TuiApp::db_to_ratio(0.0), 1.0);
        assert_eq!(TuiApp::db_to_ratio(12.0), 1.0);
        assert!((TuiApp::db_to_ratio(-30.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_centered_columns_fits_area() {
        let area = Rect::new(0, 0, 20, 3);
        let rect = TuiApp::centered_columns(30, area);
        assert_eq!(rect.width, 20);
        assert_eq!(rect.x, 0);

        let area = Rect::new(0, 0, 100, 3);
        let rect = TuiApp::centered_columns(30, area);
        assert_eq!(rect, Rect::new(35, 0, 30, 3));
    }
}
