use std::io;
use std::rc::Rc;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use crossterm::cursor;
use crossterm::event::DisableMouseCapture;
use crossterm::event::EnableMouseCapture;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::List;
use ratatui::widgets::ListItem;
use ratatui::widgets::ListState;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Scrollbar;
use ratatui::widgets::ScrollbarOrientation;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tui_textarea::Input;
use tui_textarea::Key;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Action;
use crate::domain::models::Event;
use crate::domain::models::Placeholder;
use crate::domain::models::TextArea;
use crate::domain::services::events::EventsService;
use crate::domain::services::AppState;
use crate::domain::services::Focus;
use crate::domain::services::Store;

const UI_TICK_MS: u64 = 500;

fn render_sessions<B: Backend>(frame: &mut Frame<B>, rect: Rect, app_state: &AppState) {
    let state = &app_state.state;
    let title = "Agents";

    if state.sessions.is_empty() {
        let text = if state.is_loading {
            "Loading agents..."
        } else {
            "No agents found"
        };
        Placeholder::new(title, text).render(frame, rect);
        return;
    }

    let items = state
        .sessions
        .iter()
        .map(|agent| {
            let mut style = Style::default();
            if state.selected_session_key.as_deref() == Some(agent.key.as_str()) {
                style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            }

            return ListItem::new(format!("{} {}", agent.icon(), agent.display_label())).style(style);
        })
        .collect::<Vec<ListItem>>();

    let mut highlight = Style::default();
    if app_state.focus == Focus::Sessions {
        highlight = highlight.add_modifier(Modifier::REVERSED);
    }

    let mut list_state = ListState::default();
    list_state.select(Some(app_state.session_cursor));

    frame.render_stateful_widget(
        List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(highlight),
        rect,
        &mut list_state,
    );
}

fn render_chat<B: Backend>(frame: &mut Frame<B>, rect: Rect, app_state: &mut AppState) {
    let title = match app_state.selected_label() {
        Some(label) => label,
        None => {
            Placeholder::new("Chat", "Select an agent to start chatting").render(frame, rect);
            return;
        }
    };

    let mut title = format!(" {title} ");
    if app_state.state.is_loading {
        title = format!("{title}(loading) ");
    }

    if app_state.state.messages.is_empty() {
        Placeholder::new(&title, "No messages yet").render(frame, rect);
        return;
    }

    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    if inner.width != app_state.last_known_width || inner.height != app_state.last_known_height {
        app_state.set_rect(inner);
    }

    app_state
        .chat_list
        .render(frame, inner, app_state.scroll.position);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        rect.inner(&Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut app_state.scroll.scrollbar_state,
    );
}

fn render_error<B: Backend>(frame: &mut Frame<B>, rect: Rect, app_state: &AppState) {
    if let Some(error) = &app_state.state.last_error {
        frame.render_widget(
            Paragraph::new(error.to_string())
                .style(Style::default().fg(Color::White).bg(Color::Red)),
            rect,
        );
    }
}

fn paste(textarea: &mut tui_textarea::TextArea, text: &str) {
    for char in text.chars() {
        let key = match char {
            '\n' => Key::Enter,
            '\r' => continue,
            char => Key::Char(char),
        };

        textarea.input(Input {
            key,
            ctrl: false,
            alt: false,
        });
    }
}

async fn start_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app_state: &mut AppState,
    store: &Store,
    tx: mpsc::UnboundedSender<Action>,
    events: &mut EventsService,
) -> Result<()> {
    let error_dismiss = Duration::from_millis(Config::get(ConfigKey::ErrorDismiss).parse::<u64>()?);
    let mut textarea = TextArea::default();
    TextArea::set_focus(&mut textarea, app_state.focus == Focus::Input);

    #[cfg(feature = "dev")]
    {
        paste(&mut textarea, "Summarize what you have been working on today.");
    }

    loop {
        terminal.draw(|frame| {
            let layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![Constraint::Min(1), Constraint::Length(1)])
                .split(frame.size());

            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Percentage(30), Constraint::Percentage(70)])
                .split(layout[0]);

            let chat = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![Constraint::Min(1), Constraint::Max(4)])
                .split(columns[1]);

            render_sessions(frame, columns[0], app_state);
            render_chat(frame, chat[0], app_state);
            frame.render_widget(textarea.widget(), chat[1]);
            render_error(frame, layout[1], app_state);
        })?;

        match events.next().await? {
            Event::KeyboardCTRLC() => {
                break;
            }
            Event::KeyboardCTRLR() => {
                tx.send(Action::ReloadHistory())?;
            }
            Event::KeyboardTab() => {
                app_state.toggle_focus();
                TextArea::set_focus(&mut textarea, app_state.focus == Focus::Input);
            }
            Event::KeyboardEnter() => match app_state.focus {
                Focus::Sessions => {
                    if let Some(agent) = app_state.cursor_session() {
                        tx.send(Action::SelectSession(agent.clone()))?;
                        app_state.toggle_focus();
                        TextArea::set_focus(&mut textarea, true);
                    }
                }
                Focus::Input => {
                    let input_str = textarea.lines().join("\n");
                    if input_str.trim().is_empty() || app_state.state.selected_session_key.is_none() {
                        continue;
                    }

                    tx.send(Action::SendMessage(input_str))?;
                    textarea = TextArea::default();
                }
            },
            Event::KeyboardCharInput(input) => {
                if app_state.focus == Focus::Input {
                    textarea.input(input);
                }
            }
            Event::KeyboardPaste(text) => {
                if app_state.focus == Focus::Input {
                    paste(&mut textarea, &text);
                }
            }
            Event::StoreChanged() => {
                app_state.sync(store.snapshot(), Instant::now());
            }
            Event::UIScrollDown() => match app_state.focus {
                Focus::Sessions => app_state.cursor_down(),
                Focus::Input => app_state.scroll.down(),
            },
            Event::UIScrollUp() => match app_state.focus {
                Focus::Sessions => app_state.cursor_up(),
                Focus::Input => app_state.scroll.up(),
            },
            Event::UIScrollPageDown() => {
                app_state.scroll.down_page();
            }
            Event::UIScrollPageUp() => {
                app_state.scroll.up_page();
            }
            Event::UITick() => {
                if app_state.error_expired(Instant::now(), error_dismiss) {
                    store.clear_error();
                }
            }
        }
    }

    return Ok(());
}

pub fn destruct_terminal_for_panic() {
    disable_raw_mode().unwrap();
    crossterm::execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture).unwrap();
    crossterm::execute!(io::stdout(), cursor::Show).unwrap();
}

pub async fn start(tx: mpsc::UnboundedSender<Action>, store: Rc<Store>) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let subscription = store.subscribe(move |_state| {
        if event_tx.send(Event::StoreChanged()).is_err() {
            tracing::debug!("View is gone, dropping store notification");
        }
    });

    let mut app_state = AppState::default();
    app_state.sync(store.snapshot(), Instant::now());
    let mut events = EventsService::new(event_rx, Duration::from_millis(UI_TICK_MS));

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    let res = start_loop(&mut terminal, &mut app_state, &store, tx, &mut events).await;
    subscription.unsubscribe();

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    return res;
}
