// SPDX-License-Identifier: GPL-3.0-only

//! Terminal photobooth kiosk
//!
//! Renders the live preview with Unicode half-block characters, overlays
//! the countdown and flash, and shows the captured shots underneath.

use crate::app::{CaptureController, CaptureEvent, KioskView, SessionExit, spawn_session};
use crate::backends::camera::{CameraFrame, CameraStreamManager, backend_for_source};
use crate::config::Config;
use crate::constants::{SHOTS_TOTAL, messages};
use crate::errors::{AppError, AppResult};
use crate::flash::HardwareFlash;
use crate::storage::JsonFileGateway;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::io::{self, stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Redraw interval, roughly 60 fps
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Rows used by the captured-shot strip
const STRIP_HEIGHT: u16 = 8;

/// Run the kiosk until the guest finishes the redo or leaves
pub async fn run(config: &Config) -> AppResult<SessionExit> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_kiosk(&mut terminal, config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_kiosk(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &Config,
) -> AppResult<SessionExit> {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let camera = CameraStreamManager::new(backend_for_source(&config.camera));
    let gateway = JsonFileGateway::new(config.record_path.clone());
    let controller = CaptureController::new(camera, gateway, events_tx);
    let preview = controller.preview();
    let (handle, mut task) = spawn_session(controller);

    let mut flash = config.hardware_flash.then(HardwareFlash::discover);
    if let Some(flash) = &flash
        && !flash.is_available()
    {
        warn!("Hardware flash enabled but no flash LED found");
    }

    let mut view = KioskView::new();
    let mut strip = ShotStrip::default();

    info!(record = %config.record_path.display(), camera = ?config.camera, "Kiosk started");

    loop {
        while let Ok(event) = events.try_recv() {
            if let Some(flash) = flash.as_mut() {
                match &event {
                    CaptureEvent::FlashOn => flash.set(true),
                    CaptureEvent::FlashOff
                    | CaptureEvent::AttemptFailed { .. }
                    | CaptureEvent::CameraReleased => flash.set(false),
                    _ => {}
                }
            }
            view.apply(&event);
        }
        strip.sync(&view.shots);

        let frame = preview.current();
        terminal.draw(|f| draw(f, &view, frame.as_deref(), &strip, config.mirror_preview))?;

        if task.is_finished() {
            break;
        }

        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    handle.teardown();
                }
                KeyCode::Char('q') | KeyCode::Esc => {
                    handle.teardown();
                }
                KeyCode::Char('s') if view.can_start() => {
                    handle.start();
                }
                KeyCode::Char('r') if view.can_redo() => {
                    handle.redo();
                }
                _ => {}
            }
        }

        tokio::time::sleep(FRAME_INTERVAL).await;
    }

    if let Some(flash) = flash.as_mut() {
        flash.off();
    }

    let exit = (&mut task)
        .await
        .map_err(|e| AppError::Terminal(format!("capture session crashed: {}", e)))?;
    info!(?exit, "Kiosk finished");
    Ok(exit)
}

fn draw(
    f: &mut Frame<'_>,
    view: &KioskView,
    frame: Option<&CameraFrame>,
    strip: &ShotStrip,
    mirror: bool,
) {
    let [preview_area, strip_area, info_area] = Layout::vertical([
        Constraint::Min(6),
        Constraint::Length(STRIP_HEIGHT),
        Constraint::Length(7),
    ])
    .areas(f.area());

    f.render_widget(
        FrameWidget {
            frame,
            mirror,
            placeholder: messages::WAITING_FOR_CAMERA,
        },
        preview_area,
    );
    f.render_widget(
        Overlay {
            view,
            badge: view.readiness(),
        },
        preview_area,
    );
    f.render_widget(strip, strip_area);
    f.render_widget(info_panel(view), info_area);
}

fn info_panel(view: &KioskView) -> Paragraph<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    let key = |label: &'static str, enabled: bool| {
        if enabled {
            Span::styled(label, Style::default().add_modifier(Modifier::BOLD))
        } else {
            Span::styled(label, dim)
        }
    };

    let mut lines = vec![
        Line::from(vec![
            key("[s] Start", view.can_start()),
            Span::raw("   "),
            key("[r] Redo", view.can_redo()),
            Span::raw("   "),
            Span::raw("[q] Back"),
        ]),
        Line::from(format!("Chances used: {}", view.chances_used())),
    ];
    if view.loading_existing {
        lines.push(Line::styled(messages::LOADING_PREVIOUS, dim));
    }
    if view.opening_camera {
        lines.push(Line::styled(messages::OPENING_CAMERA, dim));
    }
    if let Some(error) = &view.error {
        lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
    }
    if let Some(status) = &view.status {
        lines.push(Line::styled(status.clone(), Style::default().fg(Color::Green)));
    }
    Paragraph::new(lines)
}

/// Readiness badge, countdown box and flash over the preview
struct Overlay<'a> {
    view: &'a KioskView,
    badge: String,
}

impl Widget for Overlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        if self.view.flash {
            for y in area.top()..area.bottom() {
                for x in area.left()..area.right() {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_char(' ');
                        cell.set_bg(Color::White);
                    }
                }
            }
            return;
        }

        let badge_style = Style::default().fg(Color::White).bg(Color::Black);
        buf.set_stringn(
            area.x + 1,
            area.y,
            format!(" {} ", self.badge.to_uppercase()),
            area.width.saturating_sub(2) as usize,
            badge_style,
        );

        if !self.view.capturing {
            return;
        }

        let title = format!("Capturing shot {}", self.view.active_shot.unwrap_or(1));
        let count = self
            .view
            .countdown
            .map(|n| n.to_string())
            .unwrap_or_default();
        let center_y = area.y + area.height / 2;
        for (offset, text) in [(0u16, title.as_str()), (1, count.as_str())] {
            if text.is_empty() || center_y + offset >= area.bottom() {
                continue;
            }
            let x = area.x + area.width.saturating_sub(text.len() as u16 + 2) / 2;
            buf.set_string(
                x,
                center_y + offset,
                format!(" {} ", text),
                badge_style.add_modifier(Modifier::BOLD),
            );
        }
    }
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget<'a> {
    frame: Option<&'a CameraFrame>,
    mirror: bool,
    placeholder: &'a str,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.filter(|f| f.is_complete()) else {
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.bottom() && x < area.right() {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        render_half_blocks(frame, area, buf, self.mirror);
    }
}

/// Fit `frame` into `area`, two vertical pixels per cell
fn render_half_blocks(frame: &CameraFrame, area: Rect, buf: &mut Buffer, mirror: bool) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let frame_aspect = frame.width as f64 / frame.height as f64;
    let term_width = area.width as f64;
    let term_height = (area.height * 2) as f64;

    let (display_width, display_height) = if term_width / term_height > frame_aspect {
        let h = term_height;
        let w = h * frame_aspect;
        (w as u16, (h / 2.0) as u16)
    } else {
        let w = term_width;
        let h = w / frame_aspect;
        (w as u16, (h / 2.0) as u16)
    };
    if display_width == 0 || display_height == 0 {
        return;
    }

    let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
    let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

    let x_scale = frame.width as f64 / display_width as f64;
    let y_scale = frame.height as f64 / (display_height * 2) as f64;

    for ty in 0..display_height {
        for tx in 0..display_width {
            let term_x = x_offset + tx;
            let term_y = y_offset + ty;
            if term_x >= area.right() || term_y >= area.bottom() {
                continue;
            }

            let column = if mirror { display_width - 1 - tx } else { tx };
            let src_x = (column as f64 * x_scale) as u32;
            let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
            let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

            let (r, g, b) = frame.rgb_at(src_x, src_y_top);
            let top = Color::Rgb(r, g, b);
            let (r, g, b) = frame.rgb_at(src_x, src_y_bottom);
            let bottom = Color::Rgb(r, g, b);

            if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                cell.set_char('▀');
                cell.set_fg(top);
                cell.set_bg(bottom);
            }
        }
    }
}

/// Decoded thumbnails of the shots on screen
#[derive(Default)]
struct ShotStrip {
    shots: Vec<(Arc<[u8]>, Option<CameraFrame>)>,
}

impl ShotStrip {
    /// Decode only shots that changed since the last frame
    fn sync(&mut self, shots: &[crate::pipelines::photo::CapturedImage]) {
        let unchanged = self.shots.len() == shots.len()
            && self
                .shots
                .iter()
                .zip(shots)
                .all(|((jpeg, _), shot)| Arc::ptr_eq(jpeg, &shot.jpeg));
        if unchanged {
            return;
        }

        self.shots = shots
            .iter()
            .map(|shot| {
                let frame = image::load_from_memory(&shot.jpeg).ok().map(|img| {
                    let rgba = img.to_rgba8();
                    CameraFrame::from_rgba(rgba.width(), rgba.height(), rgba.into_raw())
                });
                (shot.jpeg.clone(), frame)
            })
            .collect();
    }
}

impl Widget for &ShotStrip {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let slots = Layout::horizontal([Constraint::Ratio(1, SHOTS_TOTAL as u32); SHOTS_TOTAL])
            .split(area);

        for (index, slot) in slots.iter().enumerate() {
            let label = format!("{}", index + 1);
            match self.shots.get(index) {
                Some((_, Some(frame))) => render_half_blocks(frame, *slot, buf, false),
                Some((_, None)) => buf.set_string(slot.x, slot.y, "?", Style::default()),
                None => buf.set_string(
                    slot.x + slot.width / 2,
                    slot.y + slot.height / 2,
                    label,
                    Style::default().fg(Color::DarkGray),
                ),
            }
        }
    }
}
