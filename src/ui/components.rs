//! Panels drawn by the terminal interface

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};
use ratatui::Frame;

use super::{Progress, Stage};
use crate::catalog::Phase;

/// Current stage, the four phases with their state, and a detail line
pub struct StatusPanel {
    stage: Stage,
    info: String,
}

impl StatusPanel {
    pub fn new() -> Self {
        Self {
            stage: Stage::Connecting,
            info: String::new(),
        }
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    fn phase_position(&self) -> Option<usize> {
        match &self.stage {
            Stage::Connecting => None,
            Stage::Running(phase) => Phase::ALL.iter().position(|p| p == phase),
            Stage::Complete => Some(Phase::ALL.len()),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let stage_style = match self.stage {
            Stage::Complete => Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
            _ => Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        };

        let current = self.phase_position();
        let mut steps = vec![Span::raw("   ")];
        for (idx, phase) in Phase::ALL.iter().enumerate() {
            let (marker, style) = match current {
                Some(pos) if idx < pos => ("✓", Style::default().fg(Color::Green)),
                Some(pos) if idx == pos => ("▶", Style::default().fg(Color::Cyan)),
                _ => ("·", Style::default().fg(Color::DarkGray)),
            };
            steps.push(Span::styled(format!("{} {}  ", marker, phase), style));
        }

        let lines = vec![
            Line::from(Span::styled(format!(" {}", self.stage), stage_style)),
            Line::from(steps),
            Line::from(vec![
                Span::raw("   "),
                Span::styled(&self.info, Style::default().fg(Color::Gray)),
            ]),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" songplay-dwh ")
            .border_style(Style::default().fg(Color::Blue));

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

/// Gauge for statements or records processed
pub struct ProgressPanel {
    progress: Option<Progress>,
}

impl ProgressPanel {
    pub fn new() -> Self {
        Self { progress: None }
    }

    pub fn set_progress(&mut self, progress: Progress) {
        self.progress = Some(progress);
    }

    pub fn clear(&mut self) {
        self.progress = None;
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::LEFT | Borders::RIGHT)
            .border_style(Style::default().fg(Color::Blue));

        let Some(progress) = &self.progress else {
            frame.render_widget(Paragraph::new("").block(block), area);
            return;
        };

        let label = if progress.total > 0 {
            format!("{} ({}/{})", progress.label, progress.current, progress.total)
        } else {
            progress.label.clone()
        };

        let gauge = Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
            .ratio(progress.ratio().min(1.0))
            .label(label);

        frame.render_widget(gauge, area);
    }
}

/// Most recent activity, newest at the bottom
pub struct LogPanel {
    entries: Vec<String>,
    max_entries: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: 200,
        }
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.entries.push(message.into());
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Activity ")
            .border_style(Style::default().fg(Color::Blue));

        let visible_height = area.height.saturating_sub(2) as usize;
        let start = self.entries.len().saturating_sub(visible_height);
        let newest = self.entries.len().saturating_sub(1);

        let items: Vec<ListItem> = self.entries[start..]
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let style = if entry.starts_with("error") {
                    Style::default().fg(Color::Red)
                } else if start + i == newest {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                ListItem::new(Span::styled(format!(" {}", entry), style))
            })
            .collect();

        frame.render_widget(List::new(items).block(block), area);
    }
}
