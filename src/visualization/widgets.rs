use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    style::{Color, Modifier, Style},
};

use crate::analysis::classifier::{SignalHint, StyleHint};
use crate::visualization::presenter::{DisplayModel, PacketRow, StatsPanel};

pub const DASHBOARD_TITLE: &str = "WiFi & Network Sniffer Dashboard";

pub fn style_for(hint: StyleHint) -> Style {
    match hint {
        StyleHint::Normal => Style::default().fg(Color::White),
        StyleHint::Tcp => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        StyleHint::Udp => Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
        StyleHint::Beacon => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        StyleHint::Probe => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        StyleHint::Muted => Style::default().fg(Color::DarkGray),
        StyleHint::Alert => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
    }
}

fn signal_style(signal: SignalHint) -> Style {
    match signal {
        SignalHint::Good(_) => Style::default().fg(Color::Green),
        SignalHint::Fair(_) => Style::default().fg(Color::Yellow),
        SignalHint::Poor(_) => Style::default().fg(Color::Red),
        SignalHint::Wired | SignalHint::NotAvailable => Style::default().fg(Color::DarkGray),
    }
}

/// Radio readings carry their band, e.g. `-70 dBm fair`.
fn signal_text(signal: SignalHint) -> String {
    match signal {
        SignalHint::Good(_) | SignalHint::Fair(_) | SignalHint::Poor(_) => {
            format!("{} {}", signal, signal.band())
        }
        SignalHint::Wired | SignalHint::NotAvailable => signal.to_string(),
    }
}

/// Live packet stream, oldest row at the top.
pub struct PacketTable<'a> {
    rows: &'a [PacketRow],
}

impl<'a> PacketTable<'a> {
    pub fn new(rows: &'a [PacketRow]) -> Self {
        Self { rows }
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        let header_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        let header_cells = ["Time", "Type", "Source", "Destination", "Info / SSID", "Signal"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style));

        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let visible_height = area.height.saturating_sub(4) as usize; // borders + header + margin
        // keep the newest rows visible once the table overflows
        let skip = self.rows.len().saturating_sub(visible_height);

        let rows = self.rows.iter().skip(skip).map(|row| {
            Row::new(vec![
                Cell::from(row.time.clone()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(row.label.clone()).style(style_for(row.style)),
                Cell::from(row.source.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(row.destination.clone()).style(Style::default().fg(Color::Magenta)),
                Cell::from(row.annotation.clone()).style(if row.style.is_high_visibility() {
                    style_for(row.style)
                } else {
                    Style::default().fg(Color::Green)
                }),
                Cell::from(signal_text(row.signal)).style(signal_style(row.signal)),
            ])
        });

        let widths = [
            Constraint::Length(8),      // Time
            Constraint::Length(9),      // Type
            Constraint::Percentage(22), // Source
            Constraint::Percentage(22), // Destination
            Constraint::Min(16),        // Info
            Constraint::Length(13),     // Signal
        ];

        let table = Table::new(rows)
            .widths(&widths)
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Live Traffic Stream ({})", self.rows.len())),
            );

        frame.render_widget(table, area);
    }
}

/// Session statistics: top sources, protocol breakdown and total volume.
pub struct StatsSidebar<'a> {
    stats: &'a StatsPanel,
}

impl<'a> StatsSidebar<'a> {
    pub fn new(stats: &'a StatsPanel) -> Self {
        Self { stats }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let heading = |text: &str, color: Color| {
            Line::from(Span::styled(
                text.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            ))
        };

        let mut lines = vec![heading("Top Sources", Color::Yellow)];
        for (addr, count) in &self.stats.top_talkers {
            lines.push(Line::from(Span::styled(
                format!("{:<18} : {}", addr, count),
                Style::default().fg(Color::Cyan),
            )));
        }

        lines.push(Line::from(""));
        lines.push(heading("Breakdown", Color::Green));
        for (label, count) in &self.stats.protocols {
            lines.push(Line::from(format!("{:<10} : {}", label, count)));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Total: {} ({} packets)", self.stats.total_display, self.stats.total_packets),
            Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD),
        )));

        lines
    }

    pub fn render(&self, area: Rect, frame: &mut Frame) {
        let paragraph = Paragraph::new(self.lines())
            .block(
                Block::default()
                    .title("Network Stats")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            )
            .wrap(ratatui::widgets::Wrap { trim: true });

        frame.render_widget(paragraph, area);
    }
}

/// Header, packet table beside the stats sidebar (2:1), footer.
pub fn draw_dashboard(frame: &mut Frame, model: &DisplayModel) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(2, 3), Constraint::Ratio(1, 3)])
        .split(chunks[1]);

    let header = Paragraph::new(Line::from(Span::styled(
        DASHBOARD_TITLE,
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Blue)))
    .alignment(Alignment::Center);
    frame.render_widget(header, chunks[0]);

    PacketTable::new(&model.rows).render(main[0], frame);
    StatsSidebar::new(&model.stats).render(main[1], frame);

    let footer = Paragraph::new(model.footer.clone())
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(footer, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn row(label: &str, style: StyleHint) -> PacketRow {
        PacketRow {
            time: "12:00:00".to_string(),
            label: label.to_string(),
            source: "10.0.0.5:51000".to_string(),
            destination: "10.0.0.1:443".to_string(),
            annotation: "Size: 60 bytes".to_string(),
            signal: SignalHint::Wired,
            style,
        }
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal.backend().buffer().content().iter().map(|c| c.symbol.as_str()).collect()
    }

    #[test]
    fn test_alert_style_is_high_visibility() {
        let style = style_for(StyleHint::Alert);
        assert_eq!(style.fg, Some(Color::Red));
        assert!(style.add_modifier.contains(Modifier::SLOW_BLINK));
        assert!(!style_for(StyleHint::Tcp).add_modifier.contains(Modifier::SLOW_BLINK));
    }

    #[test]
    fn test_signal_style_bands() {
        assert_eq!(signal_style(SignalHint::Good(-50)).fg, Some(Color::Green));
        assert_eq!(signal_style(SignalHint::Fair(-70)).fg, Some(Color::Yellow));
        assert_eq!(signal_style(SignalHint::Poor(-90)).fg, Some(Color::Red));
        assert_eq!(signal_style(SignalHint::Wired).fg, Some(Color::DarkGray));
    }

    #[test]
    fn test_signal_text_names_band() {
        assert_eq!(signal_text(SignalHint::Fair(-70)), "-70 dBm fair");
        assert_eq!(signal_text(SignalHint::Poor(-85)), "-85 dBm poor");
        assert_eq!(signal_text(SignalHint::NotAvailable), "-");
        assert_eq!(signal_text(SignalHint::Wired), "Wired");
    }

    #[test]
    fn test_stats_sidebar_lines() {
        let stats = StatsPanel {
            top_talkers: vec![("10.0.0.5".to_string(), 3)],
            protocols: vec![("TCP".to_string(), 3)],
            total_bytes: 350,
            total_display: "0.34 KB".to_string(),
            total_packets: 3,
        };

        let text: Vec<String> = StatsSidebar::new(&stats)
            .lines()
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text[0], "Top Sources");
        assert!(text[1].starts_with("10.0.0.5"));
        assert!(text[1].ends_with(": 3"));
        assert!(text.iter().any(|l| l == "Total: 0.34 KB (3 packets)"));
    }

    #[test]
    fn test_draw_dashboard_renders_rows() {
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
        let model = DisplayModel {
            rows: vec![row("TCP", StyleHint::Tcp), row("EAPOL", StyleHint::Alert)],
            stats: StatsPanel::default(),
            footer: "Listening on 127.0.0.1:5005".to_string(),
        };

        terminal.draw(|f| draw_dashboard(f, &model)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains(DASHBOARD_TITLE));
        assert!(text.contains("EAPOL"));
        assert!(text.contains("Live Traffic Stream (2)"));
        assert!(text.contains("Listening on 127.0.0.1:5005"));
    }
}
