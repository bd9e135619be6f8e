use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use eyewear_inventory::{
    ChartSpec, DashboardView, Interaction, Outcome, SessionContext, SessionError, SessionState,
    SortOption,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::block::{Position, Title},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    RawData,
    Ask,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Dashboard => Page::RawData,
            Page::RawData => Page::Ask,
            Page::Ask => Page::Dashboard,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Dashboard => Page::Ask,
            Page::RawData => Page::Dashboard,
            Page::Ask => Page::RawData,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::RawData => "Raw Data",
            Page::Ask => "Ask",
        }
    }
}

const PALETTE: [Color; 8] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::LightRed,
    Color::LightCyan,
    Color::LightMagenta,
];

/// Same category, same color, in every chart
fn category_color(category: &str) -> Color {
    let sum: usize = category.bytes().map(usize::from).sum();
    PALETTE[sum % PALETTE.len()]
}

pub struct App<'a> {
    ctx: SessionContext<'a>,
    pub session: SessionState,
    pub current_page: Page,
    pub view: Option<DashboardView>,
    /// Password while locked, question on the Ask page
    pub input: String,
    pub notice: Option<String>,
    pub answer: Option<String>,
    pub brand_cursor: usize,
    pub raw_state: TableState,
}

impl<'a> App<'a> {
    pub fn new(ctx: SessionContext<'a>, session: SessionState) -> Self {
        let mut raw_state = TableState::default();
        if !ctx.table.is_empty() {
            raw_state.select(Some(0));
        }

        Self {
            ctx,
            session,
            current_page: Page::Dashboard,
            view: None,
            input: String::new(),
            notice: None,
            answer: None,
            brand_cursor: 0,
            raw_state,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_unlocked()
    }

    fn dispatch(&mut self, interaction: Interaction) {
        match self.session.dispatch(&self.ctx, interaction) {
            Ok(Outcome::Unlocked) => {
                self.notice = None;
                self.dispatch(Interaction::View);
            }
            Ok(Outcome::CredentialRejected) => {
                self.notice = Some("Incorrect password".to_string());
            }
            Ok(Outcome::Dashboard(view)) => self.view = Some(*view),
            Ok(Outcome::Answer(answer)) => {
                self.notice = None;
                self.answer = Some(answer);
            }
            Err(SessionError::Locked) => {
                self.notice = Some("Enter the password first".to_string());
            }
            Err(e) => {
                self.answer = None;
                self.notice = Some(format!("Error: {}", e));
            }
        }
    }

    pub fn submit_password(&mut self) {
        let credential = std::mem::take(&mut self.input);
        self.dispatch(Interaction::SubmitCredential(credential));
    }

    pub fn submit_question(&mut self) {
        let question = std::mem::take(&mut self.input);
        self.dispatch(Interaction::Ask(question));
    }

    pub fn next_sort(&mut self) {
        self.dispatch(Interaction::SelectSort(self.session.sort_option.next()));
    }

    pub fn previous_sort(&mut self) {
        self.dispatch(Interaction::SelectSort(self.session.sort_option.previous()));
    }

    pub fn toggle_brand_at_cursor(&mut self) {
        let brand = self
            .view
            .as_ref()
            .and_then(|v| v.brand_options.get(self.brand_cursor))
            .cloned();
        if let Some(brand) = brand {
            self.dispatch(Interaction::ToggleBrand(brand));
        }
    }

    fn brand_count(&self) -> usize {
        self.view.as_ref().map(|v| v.brand_options.len()).unwrap_or(0)
    }

    pub fn brand_down(&mut self) {
        let len = self.brand_count();
        if len > 0 {
            self.brand_cursor = (self.brand_cursor + 1) % len;
        }
    }

    pub fn brand_up(&mut self) {
        let len = self.brand_count();
        if len > 0 {
            self.brand_cursor = if self.brand_cursor == 0 { len - 1 } else { self.brand_cursor - 1 };
        }
    }

    pub fn next_row(&mut self) {
        let len = self.ctx.table.len();
        if len == 0 {
            return;
        }
        let i = match self.raw_state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.raw_state.select(Some(i));
    }

    pub fn previous_row(&mut self) {
        let len = self.ctx.table.len();
        if len == 0 {
            return;
        }
        let i = match self.raw_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.raw_state.select(Some(i));
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.notice = None;
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.notice = None;
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let key = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            _ => continue,
        };

        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            return Ok(());
        }

        if !app.is_unlocked() {
            match key.code {
                KeyCode::Enter => app.submit_password(),
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Char(c) => app.input.push(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Tab => app.next_page(),
            KeyCode::BackTab => app.previous_page(),
            _ if app.current_page == Page::Ask => match key.code {
                KeyCode::Enter => app.submit_question(),
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Char(c) => app.input.push(c),
                _ => {}
            },
            KeyCode::Char('q') => return Ok(()),
            KeyCode::Char('s') => app.next_sort(),
            KeyCode::Char('S') => app.previous_sort(),
            KeyCode::Down | KeyCode::Char('j') => match app.current_page {
                Page::RawData => app.next_row(),
                _ => app.brand_down(),
            },
            KeyCode::Up | KeyCode::Char('k') => match app.current_page {
                Page::RawData => app.previous_row(),
                _ => app.brand_up(),
            },
            KeyCode::Char(' ') | KeyCode::Enter if app.current_page == Page::Dashboard => {
                app.toggle_brand_at_cursor()
            }
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if !app.is_unlocked() {
        render_password_prompt(f, chunks[1], app);
    } else {
        match app.current_page {
            Page::Dashboard => render_dashboard(f, chunks[1], app),
            Page::RawData => render_raw_data(f, chunks[1], app),
            Page::Ask => render_ask(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        "Glasses Frames Inventory Dashboard",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];

    if app.is_unlocked() {
        spans.push(Span::raw("  |  "));
        for (i, page) in [Page::Dashboard, Page::RawData, Page::Ask].iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" │ "));
            }
            let style = if *page == app.current_page {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(page.title().to_string(), style));
        }
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_password_prompt(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Enter password",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("  > "),
            Span::styled("*".repeat(app.input.chars().count()), Style::default().fg(Color::White)),
        ]),
        Line::from(""),
    ];

    if let Some(notice) = &app.notice {
        lines.push(Line::from(Span::styled(
            format!("  {}", notice),
            Style::default().fg(Color::Red),
        )));
    }

    let prompt = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Locked "),
    );

    f.render_widget(prompt, area);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let view = match &app.view {
        Some(view) => view,
        None => return,
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(0)])
        .split(area);

    render_sidebar(f, columns[0], app, view);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(31),
            Constraint::Percentage(31),
            Constraint::Percentage(31),
            Constraint::Min(3),
        ])
        .split(columns[1]);

    render_chart(f, rows[0], &view.filtered_chart);
    render_chart(f, rows[1], &view.frame_type_chart);
    render_chart(f, rows[2], &view.brand_chart);
    render_statistics(f, rows[3], view);
}

fn render_sidebar(f: &mut Frame, area: Rect, app: &App, view: &DashboardView) {
    let mut lines = vec![
        Line::from(Span::styled(
            " Sort by:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
    ];

    for option in SortOption::ALL {
        let marker = if option == view.sort_option { "●" } else { "○" };
        lines.push(Line::from(format!("  {} {}", marker, option.label())));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Filters - Brands:",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )));

    for (i, brand) in view.brand_options.iter().enumerate() {
        let checked = view.selected_brands.contains(brand);
        let text = format!("  [{}] {}", if checked { "x" } else { " " }, brand);
        let style = if i == app.brand_cursor {
            Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    let sidebar = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Filters "),
    );

    f.render_widget(sidebar, area);
}

fn render_chart(f: &mut Frame, area: Rect, chart: &ChartSpec) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(format!(" {} ", chart.title))
        .title(
            Title::from(format!(" {} / {} ", chart.category_axis_label, chart.value_axis_label))
                .position(Position::Bottom),
        );

    if chart.is_empty() {
        let empty = Paragraph::new("  (no data)")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let bars: Vec<Bar> = chart
        .rows
        .iter()
        .map(|row| {
            let mut bar = Bar::default()
                .value(u64::try_from(row.total_inventory).unwrap_or(0))
                .text_value(row.total_inventory.to_string())
                .label(Line::from(truncate(&row.category, 12)));
            if chart.color_by_category {
                bar = bar.style(Style::default().fg(category_color(&row.category)));
            }
            bar
        })
        .collect();

    let inner_width = area.width.saturating_sub(2) as usize;
    let per_bar = inner_width / bars.len().max(1);
    let bar_width = per_bar.saturating_sub(1).clamp(1, 12) as u16;

    let widget = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .value_style(Style::default().fg(Color::Black).bg(Color::White));

    f.render_widget(widget, area);
}

fn render_statistics(f: &mut Frame, area: Rect, view: &DashboardView) {
    let stats = &view.statistics;
    let line = Line::from(vec![
        Span::styled(" Total Frames: ", Style::default().fg(Color::Yellow)),
        Span::raw(stats.total_inventory.to_string()),
        Span::raw("   │   "),
        Span::styled("Average Price: ", Style::default().fg(Color::Yellow)),
        Span::raw(stats.average_price_display()),
        Span::raw("   │   "),
        Span::styled("Number of Brands: ", Style::default().fg(Color::Yellow)),
        Span::raw(stats.brand_count.to_string()),
    ]);

    let widget = Paragraph::new(vec![line]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Statistics "),
    );

    f.render_widget(widget, area);
}

fn render_raw_data(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Brand", "Frame Type", "Inventory Count", "Price"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.ctx.table.iter().map(|record| {
        Row::new(vec![
            Cell::from(record.brand.clone()),
            Cell::from(record.frame_type.clone()),
            Cell::from(record.inventory_count.to_string()),
            Cell::from(format!("{:.2}", record.price)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(18),
            Constraint::Length(17),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Raw Data "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.raw_state);
}

fn render_ask(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let input = Paragraph::new(Line::from(vec![
        Span::raw(" > "),
        Span::styled(app.input.clone(), Style::default().fg(Color::White)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Ask a question about the inventory "),
    );
    f.render_widget(input, chunks[0]);

    let (text, style) = match (&app.notice, &app.answer) {
        (Some(notice), _) => (notice.clone(), Style::default().fg(Color::Red)),
        (None, Some(answer)) => (answer.clone(), Style::default().fg(Color::White)),
        (None, None) => (
            "Type a question and press Enter.".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    };

    let answer = Paragraph::new(text)
        .style(style)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Answer "),
        );
    f.render_widget(answer, chunks[1]);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut spans = vec![];
    if !app.is_unlocked() {
        spans.push(key(" Enter"));
        spans.push(Span::raw(" Unlock | "));
    } else {
        if let Some(view) = &app.view {
            spans.push(Span::styled(
                format!(" Sort: {} ", view.sort_label),
                Style::default().fg(Color::Cyan),
            ));
            spans.push(Span::raw("| "));
        }
        spans.push(key("Tab"));
        spans.push(Span::raw(" Page | "));
        match app.current_page {
            Page::Dashboard => {
                spans.push(key("s/S"));
                spans.push(Span::raw(" Sort | "));
                spans.push(key("↑/↓"));
                spans.push(Span::raw(" Brand | "));
                spans.push(key("Space"));
                spans.push(Span::raw(" Toggle | "));
            }
            Page::RawData => {
                spans.push(key("↑/↓"));
                spans.push(Span::raw(" Nav | "));
            }
            Page::Ask => {
                spans.push(key("Enter"));
                spans.push(Span::raw(" Ask | "));
            }
        }
    }
    spans.push(Span::styled("Esc", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
