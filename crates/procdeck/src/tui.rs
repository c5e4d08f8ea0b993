use async_trait::async_trait;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use procdeck_core::{Command, DeckError, Frontend, Registry, UiEvent};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use tokio_stream::StreamExt;
use tracing::warn;

const QUIT: &str = "Quit";
const RETURN_TO_MAIN: &str = "Return to Main";

/// Which menu is on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Main,
    Worker(String),
}

/// Navigation state of the menu, independent of the terminal
#[derive(Debug, Clone)]
pub struct Menu {
    title: String,
    screen: Screen,
    selected: usize,
    notice: Option<String>,
}

impl Menu {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            screen: Screen::Main,
            selected: 0,
            notice: None,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Labels of the entries on the current screen
    pub fn items(&self, registry: &Registry) -> Vec<String> {
        match &self.screen {
            Screen::Main => registry
                .names()
                .iter()
                .cloned()
                .chain([QUIT.to_string()])
                .collect(),
            Screen::Worker(name) => registry
                .get(name)
                .map(|entry| {
                    entry
                        .choices
                        .iter()
                        .map(|c| c.label.clone())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
                .into_iter()
                .chain([RETURN_TO_MAIN.to_string()])
                .collect(),
        }
    }

    /// Map a key press to what the scheduler should do; `None` for keys that
    /// mean nothing here.
    pub fn handle_key(&mut self, key: KeyEvent, registry: &Registry) -> Option<UiEvent> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(UiEvent::Command(Command::Quit));
        }

        let count = self.items(registry).len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.notice = None;
                self.selected = self.selected.saturating_sub(1);
                Some(UiEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.notice = None;
                self.selected = (self.selected + 1).min(count.saturating_sub(1));
                Some(UiEvent::Redraw)
            }
            KeyCode::Enter => {
                self.notice = None;
                Some(self.activate(registry))
            }
            KeyCode::Esc | KeyCode::Char('q') => match &self.screen {
                Screen::Main => Some(UiEvent::Command(Command::Quit)),
                Screen::Worker(_) => {
                    self.return_to_main(registry);
                    Some(UiEvent::Redraw)
                }
            },
            _ => None,
        }
    }

    fn activate(&mut self, registry: &Registry) -> UiEvent {
        match self.screen.clone() {
            Screen::Main => match registry.names().get(self.selected) {
                Some(name) => {
                    self.screen = Screen::Worker(name.clone());
                    self.selected = 0;
                    UiEvent::Redraw
                }
                None => UiEvent::Command(Command::Quit),
            },
            Screen::Worker(name) => {
                let choice = registry
                    .get(&name)
                    .ok()
                    .and_then(|entry| entry.choices.get(self.selected));
                match choice {
                    Some(choice) => UiEvent::Command(Command::Worker {
                        name,
                        action: choice.action.clone(),
                    }),
                    None => {
                        self.return_to_main(registry);
                        UiEvent::Redraw
                    }
                }
            }
        }
    }

    fn return_to_main(&mut self, registry: &Registry) {
        let came_from = match &self.screen {
            Screen::Worker(name) => registry.names().iter().position(|n| n == name),
            Screen::Main => None,
        };
        self.screen = Screen::Main;
        self.selected = came_from.unwrap_or(0);
    }
}

/// Draw the menu for the current screen
pub fn draw(frame: &mut Frame, menu: &Menu, registry: &Registry) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(menu.items(registry).len() as u16 + 2),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    match &menu.screen {
        Screen::Main => {
            let title = Paragraph::new(Line::from(menu.title.as_str()))
                .style(Style::new().add_modifier(Modifier::BOLD))
                .block(Block::bordered());
            frame.render_widget(title, header);
        }
        Screen::Worker(name) => draw_worker_status(frame, header, name, registry),
    }

    let items: Vec<ListItem> = menu.items(registry).into_iter().map(ListItem::new).collect();
    let mut state = ListState::default();
    state.select(Some(menu.selected));
    let list = List::new(items)
        .block(Block::bordered())
        .highlight_symbol("> ")
        .highlight_style(Style::new().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, body, &mut state);

    let hint = menu
        .notice()
        .unwrap_or("up/down select, enter choose, q back");
    frame.render_widget(Paragraph::new(hint), footer);
}

fn draw_worker_status(frame: &mut Frame, area: Rect, name: &str, registry: &Registry) {
    let Ok(entry) = registry.get(name) else {
        return;
    };
    let mut lines = vec![Line::from(format!("{name}: {}", entry.display.label()))];
    lines.extend(entry.display.history_lines().into_iter().map(Line::from));
    let status = Paragraph::new(lines).block(Block::bordered().title(name.to_string()));
    frame.render_widget(status, area);
}

/// Full-screen terminal frontend. The terminal is restored when dropped.
pub struct MenuFrontend {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    events: EventStream,
    menu: Menu,
}

impl MenuFrontend {
    pub fn new(title: impl Into<String>) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            events: EventStream::new(),
            menu: Menu::new(title),
        })
    }
}

impl Drop for MenuFrontend {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to leave raw mode: {e}");
        }
        if let Err(e) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen) {
            warn!("Failed to leave alternate screen: {e}");
        }
        let _ = self.terminal.show_cursor();
    }
}

#[async_trait(?Send)]
impl Frontend for MenuFrontend {
    async fn next_event(&mut self, registry: &Registry) -> Result<Option<UiEvent>, DeckError> {
        loop {
            match self.events.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(event) = self.menu.handle_key(key, registry) {
                        return Ok(Some(event));
                    }
                }
                Some(Ok(Event::Resize(..))) => return Ok(Some(UiEvent::Redraw)),
                Some(Ok(_)) => {}
            }
        }
    }

    fn render(&mut self, registry: &Registry) -> Result<(), DeckError> {
        let menu = &self.menu;
        self.terminal.draw(|frame| draw(frame, menu, registry))?;
        Ok(())
    }

    fn report(&mut self, error: &DeckError) {
        self.menu.set_notice(error.to_string());
    }
}
