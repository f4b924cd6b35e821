use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use cloudedge_core::catalog::{best_practices, format_usd};
use cloudedge_core::{ChatRole, PriceCalculator, Product, Tool};
use crate::app::{App, InputMode, Screen};

/// Render a line with **bold** segments highlighted
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut bold = false;

    for (i, segment) in text.split("**").enumerate() {
        if i > 0 {
            bold = !bold;
        }
        if segment.is_empty() {
            continue;
        }
        if bold {
            spans.push(Span::styled(
                segment.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(segment.to_string()));
        }
    }

    Line::from(spans)
}

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
        Screen::Home => render_home_screen(app, frame, body_area),
        Screen::Tool(tool) => render_tool_screen(app, tool, frame, body_area),
        Screen::Assistant => render_assistant_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let key_indicator = if app.has_api_key() {
        String::new()
    } else {
        " [no API key]".to_string()
    };

    let title = Line::from(vec![
        Span::styled(" CloudEdge ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(key_indicator, Style::default().fg(Color::Red)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Home => " HOME ",
        Screen::Tool(_) => " TOOL ",
        Screen::Assistant => " AI ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: Vec<(&str, &str)> = match (app.screen, app.input_mode) {
        (Screen::Home, _) => vec![
            (" j/k ", " nav "),
            (" Enter ", " open "),
            (" 1-4 ", " tool "),
            (" a ", " assistant "),
            (" q ", " quit "),
        ],
        (Screen::Tool(tool), _) if tool.calculator().is_some() => vec![
            (" h/l ", " units "),
            (" r ", " region "),
            (" a ", " assistant "),
            (" Esc ", " back "),
            (" q ", " quit "),
        ],
        (Screen::Tool(_), _) => vec![
            (" a ", " assistant "),
            (" Esc ", " back "),
            (" q ", " quit "),
        ],
        (Screen::Assistant, InputMode::Normal) => vec![
            (" i ", " type "),
            (" j/k ", " scroll "),
            (" m ", " model "),
            (" p ", " provider "),
            (" Esc ", " home "),
            (" q ", " quit "),
        ],
        (Screen::Assistant, InputMode::Editing) => vec![
            (" Enter ", " send "),
            (" Esc ", " stop typing "),
            (" Ctrl-C ", " quit "),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in pairs {
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_home_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [products_area, tools_area] = Layout::horizontal([
        Constraint::Percentage(55),
        Constraint::Percentage(45),
    ])
    .areas(area);

    let mut lines: Vec<Line> = Vec::new();
    for product in Product::all() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<4}", product.code()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(product.name(), Style::default().add_modifier(Modifier::BOLD)),
        ]));
        lines.push(Line::from(Span::styled(
            format!("    {}", product.description()),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::default());
    }

    let products = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Products "),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(products, products_area);

    let items: Vec<ListItem> = Tool::all()
        .iter()
        .enumerate()
        .map(|(i, tool)| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    format!("{}. {}", i + 1, tool.title()),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("   {}", tool.subtitle()),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let tools = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Tools "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(tools, tools_area, &mut app.tool_state);
}

fn render_tool_screen(app: &App, tool: Tool, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", tool.title()));

    let text = match tool {
        Tool::EnsCalculator | Tool::EsaCalculator => calculator_text(&app.calculator),
        Tool::BestPractices => best_practices_text(),
        Tool::SpeedTest => speed_test_text(app.animation_frame),
    };

    let alignment = if tool == Tool::SpeedTest {
        Alignment::Center
    } else {
        Alignment::Left
    };

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(alignment)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn calculator_text(calc: &PriceCalculator) -> Text<'static> {
    let label_style = Style::default().fg(Color::Gray);
    let value_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    Text::from(vec![
        Line::default(),
        Line::from(vec![
            Span::styled("  Region: ", label_style),
            Span::styled(calc.region.label(), value_style),
        ]),
        Line::default(),
        Line::from(vec![
            Span::styled(format!("  {}: ", calc.kind.input_label()), label_style),
            Span::styled(
                format!("{} {}", calc.units(), calc.kind.unit_label()),
                value_style,
            ),
        ]),
        Line::default(),
        Line::from(Span::styled(
            "  ESTIMATED MONTHLY COST",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                format!("  {}", format_usd(calc.monthly_cost())),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" /mo", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(Span::styled(
            format!("  * Estimation based on on-demand pricing in {}.", calc.region.id()),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ])
}

fn best_practices_text() -> Text<'static> {
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "  Optimizing Edge Node Deployment",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    for (i, practice) in best_practices().into_iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {} ", i + 1),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::raw(practice),
        ]));
        lines.push(Line::default());
    }
    Text::from(lines)
}

fn speed_test_text(frame: u8) -> Text<'static> {
    const SPINNER: [&str; 3] = ["◐", "◓", "◑"];
    let spinner = SPINNER[usize::from(frame) % SPINNER.len()];

    Text::from(vec![
        Line::default(),
        Line::default(),
        Line::from(Span::styled(
            spinner,
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Testing Network Latency...",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Pinging nearest ENA POPs",
            Style::default().fg(Color::DarkGray),
        )),
    ])
}

fn render_assistant_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {}: {} ", app.provider.display_name(), app.model));

    let chat_text = if app.conversation.messages.is_empty() && !app.conversation.pending {
        Text::from(Span::styled(
            "Ask about ENS, ESA, CDN or ENA pricing and architecture...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.conversation.messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(msg.text.as_str()));
                    lines.push(Line::default());
                }
                ChatRole::Model => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.text.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                    lines.push(Line::default());
                }
            }
        }

        // Placeholder only; never stored in the conversation
        if app.conversation.pending {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if app.show_busy_hint {
        Color::Red
    } else if editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let input_title = if app.show_busy_hint {
        " Waiting for the current reply... "
    } else if app.conversation.pending {
        " Ask (assistant is thinking) "
    } else {
        " Ask "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(input_title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.chat_cursor;

    // Scroll offset keeps the cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.chat_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, input_area);

    // Show cursor when editing
    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((
            input_area.x + cursor_x + 1,
            input_area.y + 1,
        ));
    }
}
