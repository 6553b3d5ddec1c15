//! TUI rendering.
//!
//! Climate:
//! ┌──────────────────────────────────────────────┐
//! │  📡 sensorscope  climate  esp32/0ad3/tx  ... │
//! ├──────────────────────────────────────────────┤
//! │  Temperature  23.50 °C                       │
//! ├──────────────────────────────────────────────┤
//! │  Humidity  60.20 %                           │
//! ├──────────────────────────────────────────────┤
//! │  Heat index  24.10 °C                        │
//! ├──────────────────────────────────────────────┤
//! │  q quit   p pause   +/- redraw interval      │
//! └──────────────────────────────────────────────┘
//!
//! Motion swaps the stack for a 2×2 grid: trajectory top-left, one axis per
//! remaining cell.

use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};
use ratatui::{prelude::*, widgets::*};

use sensorscope_core::render::{AxisBounds, ChannelSeries, RenderFrame, Trajectory};

use super::app::View;

const SERIES_COLORS: [Color; 3] = [Color::Red, Color::Cyan, Color::Yellow];

pub fn draw(f: &mut Frame, view: &View) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // panels
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], view);
    match &view.frame {
        Some(frame) if frame.trajectory.is_some() => draw_motion(f, rows[1], frame),
        Some(frame) => draw_stack(f, rows[1], frame),
        None => draw_waiting(f, rows[1], view),
    }
    draw_keys(f, rows[2]);
}

fn draw_title(f: &mut Frame, area: Rect, view: &View) {
    let mut spans = vec![
        Span::styled(" 📡 sensorscope ", Style::default().bold().fg(Color::Cyan)),
        Span::styled(view.variant.title(), Style::default().bold().fg(Color::Yellow)),
        Span::raw("  "),
        Span::raw(view.topic.as_str()),
    ];

    if let Some(status) = view.frame.as_ref().and_then(|fr| fr.status.as_ref()) {
        let state_style = match status.state {
            sensorscope_core::SessionState::Subscribed => Style::default().fg(Color::Green),
            sensorscope_core::SessionState::Disconnected => Style::default().fg(Color::Red),
            _ => Style::default().fg(Color::Yellow),
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.state.label(), state_style));
        spans.push(Span::styled(
            format!(
                "  rx {}  ok {}  dropped {}",
                status.received, status.appended, status.dropped
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if let Some(frame) = &view.frame {
        spans.push(Span::styled(
            format!("  {} samples / {:.0}s", frame.sample_count, frame.window_secs()),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans.push(Span::styled(
        format!("  every {}ms ", view.interval.as_millis()),
        Style::default().fg(Color::DarkGray),
    ));
    if view.paused {
        spans.push(Span::styled(" PAUSED ", Style::default().bold().fg(Color::Black).bg(Color::Yellow)));
    }

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(spans));
    if let Some(err) = view
        .frame
        .as_ref()
        .and_then(|fr| fr.status.as_ref())
        .and_then(|s| s.last_error.as_deref())
    {
        block = block.title_bottom(Line::from(Span::styled(
            format!(" {err} "),
            Style::default().fg(Color::Red),
        )));
    }
    f.render_widget(block, area);
}

fn draw_waiting(f: &mut Frame, area: Rect, view: &View) {
    let block = Block::default().borders(Borders::ALL).title(" waiting ");
    let p = Paragraph::new(format!("Waiting for data on {} …", view.topic))
        .style(Style::default().fg(Color::DarkGray))
        .block(block);
    f.render_widget(p, area);
}

fn draw_stack(f: &mut Frame, area: Rect, frame: &RenderFrame) {
    let n = frame.series.len().max(1) as u32;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, n); n as usize])
        .split(area);
    for (i, series) in frame.series.iter().enumerate() {
        draw_series(f, rows[i], frame, series, SERIES_COLORS[i % SERIES_COLORS.len()]);
    }
}

fn draw_motion(f: &mut Frame, area: Rect, frame: &RenderFrame) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    if let Some(trajectory) = &frame.trajectory {
        draw_trajectory(f, top[0], trajectory);
    }
    let cells = [top[1], bottom[0], bottom[1]];
    for (i, (series, cell)) in frame.series.iter().zip(cells).enumerate() {
        draw_series(f, cell, frame, series, SERIES_COLORS[i % SERIES_COLORS.len()]);
    }
}

fn draw_series(f: &mut Frame, area: Rect, frame: &RenderFrame, series: &ChannelSeries, color: Color) {
    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(color))
            .data(&series.points),
    ];

    let AxisBounds { min: y_min, max: y_max } = series.y_bounds;
    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {}  {:.2} {} ",
            series.label, series.latest, series.unit
        )))
        .x_axis(
            Axis::default()
                .bounds([series.x_bounds.min, series.x_bounds.max])
                .labels(vec![
                    Line::from(frame.started.format("%H:%M:%S").to_string()),
                    Line::from(frame.ended.format("%H:%M:%S").to_string()),
                ]),
        )
        .y_axis(Axis::default().bounds([y_min, y_max]).labels(vec![
            Line::from(format!("{y_min:.1}")),
            Line::from(format!("{y_max:.1}")),
        ]));

    f.render_widget(chart, area);
}

// ---------------------------------------------------------------------------
// 3D trajectory
// ---------------------------------------------------------------------------

const COS30: f64 = 0.866_025_403_784_438_6;
const SIN30: f64 = 0.5;

/// Isometric projection of a point in the unit cube `[-1, 1]³` onto the
/// plane, z up.
pub fn project(p: [f64; 3]) -> (f64, f64) {
    let [x, y, z] = p;
    ((x - y) * COS30, z - (x + y) * SIN30)
}

/// Map a point into `[-1, 1]³` using the trajectory bounds, then project.
fn place(p: &[f64; 3], bounds: &[AxisBounds; 3]) -> (f64, f64) {
    project([
        bounds[0].normalize(p[0]) * 2.0 - 1.0,
        bounds[1].normalize(p[1]) * 2.0 - 1.0,
        bounds[2].normalize(p[2]) * 2.0 - 1.0,
    ])
}

fn draw_trajectory(f: &mut Frame, area: Rect, trajectory: &Trajectory) {
    let title = format!(" Trajectory ({} pts) ", trajectory.points.len());
    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .marker(symbols::Marker::Braille)
        .x_bounds([-1.9, 1.9])
        .y_bounds([-2.1, 2.1])
        .paint(|ctx| {
            // Axes from the cube's low corner.
            let origin = project([-1.0, -1.0, -1.0]);
            for (axis, end) in [[1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [-1.0, -1.0, 1.0]]
                .into_iter()
                .enumerate()
            {
                let (x2, y2) = project(end);
                ctx.draw(&CanvasLine::new(origin.0, origin.1, x2, y2, Color::DarkGray));
                ctx.print(x2, y2, Span::styled(
                    axis_name(trajectory.labels[axis]),
                    Style::default().fg(SERIES_COLORS[axis]),
                ));
            }
            ctx.layer();

            let placed: Vec<(f64, f64)> = trajectory
                .points
                .iter()
                .map(|p| place(p, &trajectory.bounds))
                .collect();
            for pair in placed.windows(2) {
                let ((x1, y1), (x2, y2)) = (pair[0], pair[1]);
                ctx.draw(&CanvasLine::new(x1, y1, x2, y2, Color::Magenta));
            }
            if let Some(&(x, y)) = placed.last() {
                ctx.print(x, y, Span::styled("●", Style::default().fg(Color::White)));
            }
        });
    f.render_widget(canvas, area);
}

/// Last word of a label ("Acceleration X" → "X").
fn axis_name(label: &str) -> String {
    label.rsplit(' ').next().unwrap_or(label).to_string()
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(" q: quit   p: pause   +/-: redraw faster/slower")
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
