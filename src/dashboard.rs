use std::io::Write;

use crate::presence::{render_rows, ActiveView, ConnectionState, IndicatorRow, Light, PresenceView};

#[cfg(feature = "ui")]
use crate::config::UiConfig;

#[cfg(feature = "ui")]
use eframe::egui;

fn light_tag(light: Light) -> &'static str {
    match light {
        Light::Yellow => "yellow",
        Light::Green => "green",
        Light::Red => "red",
    }
}

/// Plain-text rendering of the indicator rows, one line each.
pub fn render_text(rows: &[IndicatorRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!("● [{}] {}: {}", light_tag(row.light), row.name, row.status));
        if let Some(detail) = &row.detail {
            out.push_str(&format!(" ({})", detail));
        }
        out.push('\n');
    }
    out
}

/// Write the status screen, then again after every transition until the
/// backend check settles. The last screen written always matches the returned state.
pub async fn print_until_settled<W: Write>(
    active: &mut ActiveView,
    out: &mut W,
) -> anyhow::Result<ConnectionState> {
    let mut shown = active.current();
    write!(out, "{}", render_text(&render_rows(&shown, active.table())))?;

    while !shown.is_settled() {
        if !active.changed().await {
            break;
        }
        shown = active.current();
        writeln!(out)?;
        write!(out, "{}", render_text(&render_rows(&shown, active.table())))?;
    }

    out.flush()?;
    Ok(shown)
}

/// Headless mode: render to stdout until the backend check settles.
pub async fn run_headless(view: &PresenceView) -> anyhow::Result<ConnectionState> {
    let mut active = view.activate()?;
    let state = print_until_settled(&mut active, &mut std::io::stdout()).await?;
    active.deactivate().await;
    Ok(state)
}

#[cfg(feature = "ui")]
pub struct DashboardApp {
    view: ActiveView,
    title: String,
    repaint: std::time::Duration,
}

#[cfg(feature = "ui")]
pub fn run_dashboard(view: &PresenceView, ui_cfg: &UiConfig) -> anyhow::Result<()> {
    let active = view.activate()?;
    let repaint = std::time::Duration::from_millis(ui_cfg.repaint_ms.max(16));
    let title = ui_cfg.title.clone();

    let options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(420.0, 260.0)),
        ..Default::default()
    };
    eframe::run_native(
        &ui_cfg.title,
        options,
        Box::new(move |_cc| Box::new(DashboardApp::new(active, title, repaint))),
    )
    .map_err(|e| anyhow::anyhow!("dashboard error: {}", e))?;
    Ok(())
}

#[cfg(feature = "ui")]
fn light_color(light: Light) -> egui::Color32 {
    match light {
        Light::Yellow => egui::Color32::from_rgb(234, 179, 8),
        Light::Green => egui::Color32::from_rgb(34, 197, 94),
        Light::Red => egui::Color32::from_rgb(239, 68, 68),
    }
}

#[cfg(feature = "ui")]
impl DashboardApp {
    fn new(view: ActiveView, title: String, repaint: std::time::Duration) -> Self {
        Self {
            view,
            title,
            repaint,
        }
    }

    fn draw_row(ui: &mut egui::Ui, row: &IndicatorRow) {
        ui.horizontal(|ui| {
            let (rect, _response) =
                ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
            ui.painter()
                .circle_filled(rect.center(), 6.0, light_color(row.light));
            let label = ui.label(format!("{}: {}", row.name, row.status));
            if let Some(detail) = &row.detail {
                let _ = label.on_hover_text(detail.as_str());
            }
        });
    }
}

#[cfg(feature = "ui")]
impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let rows = self.view.rows();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(self.title.as_str());
            ui.separator();

            for row in &rows {
                Self::draw_row(ui, row);
            }

            ui.separator();
            ui.colored_label(egui::Color32::LIGHT_BLUE, "Scaffold ready. Next: place list views.");
        });

        if !self.view.state().is_settled() {
            ctx.request_repaint_after(self.repaint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ProbeError;
    use crate::probe::testing::FakeSource;
    use crate::probe::StatusProbe;
    use serde_json::Value;
    use std::io;
    use std::time::Duration;
    use tokio::runtime::Handle;
    use tokio::sync::{oneshot, watch};

    /// Writer that lets the backend answer while the first screen is being
    /// written, and only returns once that answer has landed.
    struct SettleDuringFirstWrite {
        buf: Vec<u8>,
        release: Option<oneshot::Sender<Result<Value, ProbeError>>>,
        observer: watch::Receiver<ConnectionState>,
    }

    impl Write for SettleDuringFirstWrite {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(data);
            if let Some(release) = self.release.take() {
                let _ = release.send(Err(ProbeError::new("places", "connection refused")));
                while !self.observer.borrow().is_settled() {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_render_text_lines() {
        let text = render_text(&render_rows(&ConnectionState::Unverified, "places"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "● [yellow] Backend (places): connecting…");
        assert_eq!(lines[1], "● [green] Runtime (tokio): running");
        assert_eq!(lines[2], "● [green] Interface: running");
    }

    #[test]
    fn test_render_text_shows_failure_reason() {
        let text = render_text(&render_rows(
            &ConnectionState::Failed("HTTP 503".to_string()),
            "places",
        ));
        assert!(text.starts_with("● [red] Backend (places): unreachable (HTTP 503)"));
    }

    #[tokio::test]
    async fn test_headless_reports_settled_state_and_releases_view() -> anyhow::Result<()> {
        let source = FakeSource::answering(Ok(serde_json::json!([])));
        let view = PresenceView::new(StatusProbe::new(source.clone(), "places"), Handle::current());

        let state = run_headless(&view).await?;
        assert_eq!(state, ConnectionState::Verified);
        assert!(!view.is_active());
        assert_eq!(source.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_headless_failure() -> anyhow::Result<()> {
        let source = FakeSource::answering(Err(ProbeError::new("places", "connection refused")));
        let view = PresenceView::new(StatusProbe::new(source, "places"), Handle::current());

        let state = run_headless(&view).await?;
        assert_eq!(state, ConnectionState::Failed("connection refused".to_string()));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_landing_during_first_screen_is_still_printed() -> anyhow::Result<()> {
        let (source, release) = FakeSource::gated();
        let view = PresenceView::new(StatusProbe::new(source, "places"), Handle::current());
        let mut active = view.activate()?;

        let mut out = SettleDuringFirstWrite {
            buf: Vec::new(),
            release: Some(release),
            observer: active.subscribe(),
        };
        let state = print_until_settled(&mut active, &mut out).await?;
        active.deactivate().await;

        assert_eq!(state, ConnectionState::Failed("connection refused".to_string()));
        let text = String::from_utf8(out.buf)?;
        assert!(text.starts_with("● [yellow] Backend (places): connecting…"));
        let last_screen = text.rsplit("\n\n").next().unwrap_or_default();
        assert!(last_screen.starts_with("● [red] Backend (places): unreachable (connection refused)"));
        Ok(())
    }

    #[tokio::test]
    async fn test_already_settled_state_prints_one_final_screen() -> anyhow::Result<()> {
        let source = FakeSource::answering(Ok(serde_json::json!([])));
        let view = PresenceView::new(StatusProbe::new(source, "places"), Handle::current());
        let mut active = view.activate()?;
        active.settled().await;

        let mut out = Vec::new();
        let state = print_until_settled(&mut active, &mut out).await?;
        active.deactivate().await;

        assert_eq!(state, ConnectionState::Verified);
        let text = String::from_utf8(out)?;
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("● [green] Backend (places): connected"));
        Ok(())
    }
}
