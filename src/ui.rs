use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex};

use crate::catalog::{Catalog, Quote, QuoteFilter};
use crate::reconciler::Reconciler;
use crate::render;
use crate::scheduler::{self, SyncEvent};
use crate::store::{QuoteStore, SessionCache};
use crate::transfer::{self, DEFAULT_EXPORT_FILE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Display,
    Browse,
    Add,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Display => Page::Browse,
            Page::Browse => Page::Add,
            Page::Add => Page::Display,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Display => Page::Add,
            Page::Browse => Page::Display,
            Page::Add => Page::Browse,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Display => "Quote",
            Page::Browse => "Browse",
            Page::Add => "Add Quote",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Text,
    Category,
}

pub struct App {
    catalog: Arc<Mutex<Catalog>>,
    store: Arc<Mutex<QuoteStore>>,
    reconciler: Arc<Reconciler>,
    runtime: Handle,
    events_tx: mpsc::UnboundedSender<SyncEvent>,
    events_rx: mpsc::UnboundedReceiver<SyncEvent>,
    session: SessionCache,
    pub filter: QuoteFilter,
    pub current_page: Page,
    pub displayed: Option<Quote>,
    pub list_state: ListState,
    pub input_text: String,
    pub input_category: String,
    pub active_field: InputField,
    pub status: String,
}

impl App {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<Mutex<Catalog>>,
        store: Arc<Mutex<QuoteStore>>,
        reconciler: Arc<Reconciler>,
        runtime: Handle,
        events_tx: mpsc::UnboundedSender<SyncEvent>,
        events_rx: mpsc::UnboundedReceiver<SyncEvent>,
        session: SessionCache,
        filter: QuoteFilter,
    ) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        let mut app = App {
            catalog,
            store,
            reconciler,
            runtime,
            events_tx,
            events_rx,
            session,
            filter,
            current_page: Page::Display,
            displayed: None,
            list_state,
            input_text: String::new(),
            input_category: String::new(),
            active_field: InputField::Text,
            status: String::new(),
        };

        // Restore the session's last quote when one exists, otherwise
        // start with a fresh random pick.
        match app.session.last_quote() {
            Some(quote) => app.displayed = Some(quote),
            None => app.show_random(),
        }

        app
    }

    fn filtered(&self) -> Vec<Quote> {
        self.catalog.blocking_lock().filter(&self.filter)
    }

    pub fn show_random(&mut self) {
        let list = self.filtered();
        match render::pick_random(&list) {
            Some(quote) => {
                self.session.set_last_quote(quote);
                self.displayed = Some(quote.clone());
            }
            None => self.displayed = None,
        }
    }

    /// Advance the filter through "all" plus every known category, then
    /// persist the selection.
    pub fn cycle_filter(&mut self) {
        let categories = self.catalog.blocking_lock().categories();

        let mut choices = vec![QuoteFilter::All];
        choices.extend(categories.into_iter().map(QuoteFilter::Category));

        let current = choices
            .iter()
            .position(|choice| *choice == self.filter)
            .unwrap_or(0);
        self.filter = choices[(current + 1) % choices.len()].clone();

        if let Err(error) = self.store.blocking_lock().save_filter(self.filter.as_str()) {
            self.status = format!("Could not save filter: {error:#}");
        }

        self.list_state.select(Some(0));
        self.show_random();
    }

    pub fn add_quote(&mut self) {
        let added = {
            let mut catalog = self.catalog.blocking_lock();
            match catalog.add(&self.input_text, &self.input_category) {
                Ok(quote) => match self.store.blocking_lock().save_quotes(catalog.quotes()) {
                    Ok(()) => Ok(quote),
                    Err(error) => Err(format!("Could not save quotes: {error:#}")),
                },
                Err(error) => Err(error.to_string()),
            }
        };

        match added {
            Ok(quote) => {
                self.input_text.clear();
                self.input_category.clear();
                self.active_field = InputField::Text;
                self.session.set_last_quote(&quote);
                self.displayed = Some(quote);
                self.status = "Quote added successfully!".to_string();
                self.current_page = Page::Display;
            }
            Err(message) => self.status = message,
        }
    }

    pub fn export(&mut self) {
        let catalog = self.catalog.blocking_lock();
        match transfer::export_to_file(&catalog, Path::new(DEFAULT_EXPORT_FILE)) {
            Ok(()) => {
                self.status =
                    format!("Exported {} quotes to {}", catalog.len(), DEFAULT_EXPORT_FILE)
            }
            Err(error) => self.status = format!("Export failed: {error:#}"),
        }
    }

    /// Kick off one sync cycle in the background; the outcome arrives on
    /// the event channel like a scheduled one.
    pub fn trigger_sync(&mut self) {
        let reconciler = Arc::clone(&self.reconciler);
        let catalog = Arc::clone(&self.catalog);
        let store = Arc::clone(&self.store);
        let tx = self.events_tx.clone();

        self.runtime.spawn(async move {
            let event = scheduler::run_cycle(&reconciler, &catalog, &store).await;
            let _ = tx.send(event);
        });

        self.status = "Syncing with server...".to_string();
    }

    /// Apply pending sync outcomes to the status line and refresh the
    /// display when the merge changed the catalog.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            if let SyncEvent::Completed(report) = &event {
                if report.changed() {
                    self.show_random();
                }
            }
            self.status = event.message();
        }
    }

    pub fn toggle_field(&mut self) {
        self.active_field = match self.active_field {
            InputField::Text => InputField::Category,
            InputField::Category => InputField::Text,
        };
    }

    fn active_input_mut(&mut self) -> &mut String {
        match self.active_field {
            InputField::Text => &mut self.input_text,
            InputField::Category => &mut self.input_category,
        }
    }

    pub fn next(&mut self) {
        let len = self.filtered().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        app.drain_events();
        terminal.draw(|f| ui(f, app))?;

        // Short poll so scheduler events show up without a keypress.
        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if app.current_page == Page::Add {
                match key.code {
                    KeyCode::Esc => app.current_page = Page::Display,
                    KeyCode::Tab => app.toggle_field(),
                    KeyCode::Enter => app.add_quote(),
                    KeyCode::Backspace => {
                        app.active_input_mut().pop();
                    }
                    KeyCode::Char(c) => app.active_input_mut().push(c),
                    _ => {}
                }
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.current_page = app.current_page.previous();
                    } else {
                        app.current_page = app.current_page.next();
                    }
                }
                KeyCode::BackTab => app.current_page = app.current_page.previous(),
                KeyCode::Char('n') => {
                    app.show_random();
                    app.current_page = Page::Display;
                }
                KeyCode::Char('f') => app.cycle_filter(),
                KeyCode::Char('s') => app.trigger_sync(),
                KeyCode::Char('e') => app.export(),
                KeyCode::Char('a') => app.current_page = Page::Add,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
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

    match app.current_page {
        Page::Display => render_display(f, chunks[1], app),
        Page::Browse => render_browse(f, chunks[1], app),
        Page::Add => render_add(f, chunks[1], app),
    }

    render_status(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let tabs: Vec<Span> = [Page::Display, Page::Browse, Page::Add]
        .iter()
        .flat_map(|page| {
            let style = if *page == app.current_page {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            [
                Span::styled(format!(" {} ", page.title()), style),
                Span::raw("|"),
            ]
        })
        .collect();

    let header = Paragraph::new(Line::from(tabs)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" quotedeck (Tab: pages, q: quit) "),
    );
    f.render_widget(header, area);
}

fn render_display(f: &mut Frame, area: Rect, app: &App) {
    let content = match &app.displayed {
        Some(quote) => render::render_quote(quote),
        None => render::NO_QUOTES_PLACEHOLDER.to_string(),
    };

    let body = Paragraph::new(content).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" n: new quote | f: filter | s: sync | e: export | a: add "),
    );
    f.render_widget(body, area);
}

fn render_browse(f: &mut Frame, area: Rect, app: &mut App) {
    let quotes = app.filtered();

    if quotes.is_empty() {
        let empty = Paragraph::new(render::NO_RESULTS_PLACEHOLDER)
            .block(Block::default().borders(Borders::ALL).title(" Browse "));
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = quotes
        .iter()
        .map(|quote| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("\"{}\" ", quote.text)),
                Span::styled(
                    format!("[{}]", quote.category),
                    Style::default().fg(Color::Cyan),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Browse ({}) ", quotes.len())),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol(">> ");

    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_add(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let field_style = |field: InputField| {
        if app.active_field == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    let text = Paragraph::new(app.input_text.as_str())
        .style(field_style(InputField::Text))
        .block(Block::default().borders(Borders::ALL).title(" Quote text "));
    f.render_widget(text, chunks[0]);

    let category = Paragraph::new(app.input_category.as_str())
        .style(field_style(InputField::Category))
        .block(Block::default().borders(Borders::ALL).title(" Category "));
    f.render_widget(category, chunks[1]);

    let hint = Paragraph::new("Tab: switch field | Enter: add | Esc: back")
        .style(Style::default().fg(Color::Gray));
    f.render_widget(hint, chunks[2]);
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let line = Line::from(vec![
        Span::styled(
            format!(" Filter: {} ", app.filter),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("| "),
        Span::raw(app.status.as_str()),
    ]);

    let status = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}
