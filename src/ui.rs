use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Paragraph, Wrap},
};

use crate::app::{App, InputMode, Screen, SettingsField};
use crate::diagram::RenderState;
use crate::provider::Provider;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Compose => render_compose_screen(app, frame, body_area),
        Screen::Settings => render_settings_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let route = app.settings.as_ref().map(|s| {
        let provider = Provider::select(&s.api_key, &s.model_name);
        format!(" {} via {}", s.model_name, provider.display_name())
    });

    let title = Line::from(vec![
        Span::styled(" Merdi ", Style::default().fg(Color::Magenta).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            route.unwrap_or_else(|| " not configured".to_string()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // A transient status message takes over the hint line while it lasts.
    if let Some(status) = &app.status {
        let line = Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Yellow),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let hints = match (app.screen, app.input_mode) {
        (Screen::Compose, InputMode::Normal) => {
            " i edit · Enter generate · t theme · d save svg · v source · s settings · q quit"
        }
        (Screen::Compose, InputMode::Editing) => " Enter generate · Esc done",
        (Screen::Settings, InputMode::Normal) => {
            " i edit · Tab field · k reveal key · Enter save · Esc back · q quit"
        }
        (Screen::Settings, InputMode::Editing) => " Tab field · Enter save · Esc done",
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            hints,
            Style::default().fg(Color::DarkGray),
        ))),
        area,
    );
}

fn render_compose_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, diagram_area] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);

    render_prompt_input(app, frame, input_area);
    render_diagram_pane(app, frame, diagram_area);
}

fn render_prompt_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let content = if app.prompt_input.is_empty() && !editing {
        Span::styled(
            "Say your scenario...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )
    } else {
        Span::raw(app.prompt_input.as_str())
    };

    let input = Paragraph::new(Line::from(content)).block(
        Block::bordered()
            .title(" Scenario ")
            .border_style(border_style),
    );
    frame.render_widget(input, area);

    if editing {
        let x = area.x + 1 + app.prompt_cursor.min(area.width.saturating_sub(2) as usize) as u16;
        frame.set_cursor_position((x, area.y + 1));
    }
}

fn render_diagram_pane(app: &App, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    // A failed generation is reported here even though the pipeline state
    // never left Empty — the provider responded (or didn't), and the user
    // needs to see why.
    if let Some(error) = &app.generation_error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::default());
    }

    let dots = ".".repeat(app.animation_frame as usize + 1);
    let (title, border_color) = match app.pipeline.state() {
        RenderState::Empty if app.generating => {
            lines.push(Line::from(Span::styled(
                format!("Generating{dots}"),
                Style::default().fg(Color::Cyan),
            )));
            (" Diagram ", Color::Cyan)
        }
        RenderState::Empty => {
            if app.generation_error.is_none() {
                lines.push(Line::from(Span::styled(
                    "No diagram to display",
                    Style::default().fg(Color::DarkGray),
                )));
                lines.push(Line::from(Span::styled(
                    "Generate a diagram from your text",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            (" Diagram ", Color::DarkGray)
        }
        RenderState::Loading => {
            let verb = if app.generating { "Generating" } else { "Rendering diagram" };
            lines.push(Line::from(Span::styled(
                format!("{verb}{dots}"),
                Style::default().fg(Color::Cyan),
            )));
            (" Diagram ", Color::Cyan)
        }
        RenderState::Rendered(svg) => {
            let mut summary = vec![Span::styled(
                "Rendered",
                Style::default().fg(Color::Green).bold(),
            )];
            summary.push(Span::raw(format!(
                "  theme {}  ·  {:.1} KB",
                app.pipeline.theme().as_str(),
                svg.len() as f64 / 1024.0
            )));
            if let Some((w, h)) = svg_dimensions(svg) {
                summary.push(Span::raw(format!("  ·  {w}×{h}")));
            }
            lines.push(Line::from(summary));
            if app.exporting {
                lines.push(Line::from(Span::styled(
                    "Exporting...",
                    Style::default().fg(Color::Yellow),
                )));
            }
            lines.push(Line::default());
            if let Some(source) = app.pipeline.raw_source() {
                for source_line in source.lines() {
                    lines.push(Line::from(Span::styled(
                        source_line.to_string(),
                        Style::default().fg(Color::White),
                    )));
                }
            }
            (" Diagram ", Color::Green)
        }
        RenderState::Errored(message) => {
            lines.push(Line::from(Span::styled(
                "Diagram Render Error",
                Style::default().fg(Color::Red).bold(),
            )));
            lines.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::Red),
            )));
            lines.push(Line::default());
            if app.show_source {
                lines.push(Line::from(Span::styled(
                    "Failing source (v to hide):",
                    Style::default().fg(Color::DarkGray),
                )));
                if let Some(source) = app.pipeline.raw_source() {
                    for source_line in source.lines() {
                        lines.push(Line::from(Span::styled(
                            source_line.to_string(),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
            } else {
                lines.push(Line::from(Span::styled(
                    "Press v to show the failing source",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            (" Diagram ", Color::Red)
        }
    };

    let pane = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::bordered()
                .title(title)
                .border_style(Style::default().fg(border_color)),
        );
    frame.render_widget(pane, area);
}

fn render_settings_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [model_area, key_area, info_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    render_settings_field(
        app,
        frame,
        model_area,
        SettingsField::ModelName,
        " AI Model Name ",
        &app.model_input.clone(),
        app.model_cursor,
    );

    let key_display = if app.show_api_key {
        app.key_input.clone()
    } else {
        mask_key(&app.key_input)
    };
    render_settings_field(
        app,
        frame,
        key_area,
        SettingsField::ApiKey,
        " API Key ",
        &key_display,
        app.key_cursor,
    );

    let info = Paragraph::new(vec![
        Line::default(),
        Line::from(Span::styled(
            "Examples: gpt-4o · claude-3-5-sonnet-20241022 · openai/gpt-4o (OpenRouter)",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Keys starting with sk-or-v1 always route through OpenRouter.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Get a key at openrouter.ai — settings are stored locally, never shared.",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: false });
    frame.render_widget(info, info_area);
}

fn render_settings_field(
    app: &App,
    frame: &mut Frame,
    area: Rect,
    field: SettingsField,
    title: &str,
    content: &str,
    cursor: usize,
) {
    let active = app.settings_field == field;
    let editing = active && app.input_mode == InputMode::Editing;
    let border_style = if editing {
        Style::default().fg(Color::Yellow)
    } else if active {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let paragraph = Paragraph::new(Line::from(Span::raw(content))).block(
        Block::bordered().title(title).border_style(border_style),
    );
    frame.render_widget(paragraph, area);

    if editing {
        let x = area.x + 1 + cursor.min(area.width.saturating_sub(2) as usize) as u16;
        frame.set_cursor_position((x, area.y + 1));
    }
}

/// All but the last four characters hidden, like the web form's password
/// field with a peek at the tail.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "•".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "•".repeat(chars.len() - 4), visible)
}

/// Width/height out of the root viewBox, for the render summary line.
fn svg_dimensions(svg: &str) -> Option<(u32, u32)> {
    let start = svg.find("viewBox=\"")? + "viewBox=\"".len();
    let end = svg[start..].find('"')? + start;
    let mut parts = svg[start..end].split_whitespace();
    let _min_x = parts.next()?;
    let _min_y = parts.next()?;
    let w: f64 = parts.next()?.parse().ok()?;
    let h: f64 = parts.next()?.parse().ok()?;
    Some((w.round() as u32, h.round() as u32))
}
