use parcelli_core::model::{INDETERMINATE, ShipmentRecord};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
};

use crate::app::App;

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let providers = if app.providers.is_empty() {
        "no providers configured".to_owned()
    } else {
        app.providers.join(", ")
    };
    let header = Paragraph::new(format!("parcelli – shipment tracking via {providers}"))
        .block(Block::default().borders(Borders::ALL).title("Parcelli"));
    frame.render_widget(header, *header_area);

    draw_shipments(frame, app, *content_area);

    let nav_hint = "↑/↓ move · p suspend/resume · q/Ctrl-C quit";
    let mut facts = Vec::new();
    if app.suspended {
        facts.push("Suspended".to_owned());
    } else if app.is_fetching() {
        facts.push("Fetching…".to_owned());
    }
    if let Some(updated) = &app.last_update {
        facts.push(format!("Updated {updated}"));
    }
    if let Some(msg) = &app.error_message {
        facts.push(msg.clone());
    }
    facts.push(nav_hint.to_owned());

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.suspended || app.is_fetching() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(facts.join(" · "))
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_shipments(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let title = format!("Shipments ({})", app.shipments.len());

    if !app.ready {
        let paragraph = Paragraph::new("Loading…")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    if app.shipments.is_empty() {
        let paragraph = Paragraph::new("No shipments tracked.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = app.shipments.iter().map(shipment_row);

    let column_widths = [
        Constraint::Length(22),
        Constraint::Percentage(40),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Code / Date", "Label / Status", "Location"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .column_spacing(1);

    let mut state = TableState::default();
    state.select(Some(app.list_index));
    frame.render_stateful_widget(table, area, &mut state);
}

fn shipment_row(shipment: &ShipmentRecord) -> Row<'_> {
    let placeholder = "–";
    let code_line = Line::from(shipment.code.as_str()).style(Style::default().bold());
    let label_line =
        Line::from(shipment.label.as_deref().unwrap_or("")).style(Style::default().bold());
    let date_line = Line::from(shipment.date.as_deref().unwrap_or(placeholder));
    let status_line = Line::from(shipment.status.as_deref().unwrap_or(placeholder));

    Row::new(vec![
        Cell::from(Text::from(vec![code_line, date_line])),
        Cell::from(Text::from(vec![label_line, status_line])),
        Cell::from(shipment.location.as_deref().unwrap_or(placeholder)),
    ])
    .height(2)
    .style(Style::default().fg(shipment_color(shipment)))
}

fn shipment_color(shipment: &ShipmentRecord) -> Color {
    match shipment.location.as_deref() {
        None => Color::DarkGray,
        Some(INDETERMINATE) => Color::Red,
        Some(_) => Color::Reset,
    }
}
