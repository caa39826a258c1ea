#[cfg(test)]
#[path = "events_test.rs"]
mod tests;

use anyhow::Result;
use crossterm::event::Event as CrosstermEvent;
use crossterm::event::EventStream;
use crossterm::event::MouseEventKind;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time;
use tui_textarea::Input;
use tui_textarea::Key;

use crate::domain::models::Event;

/// Merges terminal input, events sent by the rest of the application (such
/// as Store change notifications) and a periodic UI tick into one stream.
pub struct EventsService {
    crossterm_events: EventStream,
    events: mpsc::UnboundedReceiver<Event>,
    tick: time::Interval,
}

impl EventsService {
    pub fn new(events: mpsc::UnboundedReceiver<Event>, tick: time::Duration) -> EventsService {
        let mut tick = time::interval(tick);
        tick.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        return EventsService {
            crossterm_events: EventStream::new(),
            events,
            tick,
        };
    }

    fn from_key(input: Input) -> Event {
        return match input {
            Input {
                key: Key::Char('c'),
                ctrl: true,
                ..
            } => Event::KeyboardCTRLC(),
            Input {
                key: Key::Char('r'),
                ctrl: true,
                ..
            } => Event::KeyboardCTRLR(),
            Input {
                key: Key::Char('d'),
                ctrl: true,
                ..
            }
            | Input {
                key: Key::PageDown,
                ..
            } => Event::UIScrollPageDown(),
            Input {
                key: Key::Char('u'),
                ctrl: true,
                ..
            }
            | Input { key: Key::PageUp, .. } => Event::UIScrollPageUp(),
            Input {
                key: Key::Down | Key::MouseScrollDown,
                ..
            } => Event::UIScrollDown(),
            Input {
                key: Key::Up | Key::MouseScrollUp,
                ..
            } => Event::UIScrollUp(),
            Input { key: Key::Enter, .. } => Event::KeyboardEnter(),
            Input { key: Key::Tab, .. } => Event::KeyboardTab(),
            input => Event::KeyboardCharInput(input),
        };
    }

    fn handle_crossterm(event: CrosstermEvent) -> Option<Event> {
        return match event {
            CrosstermEvent::Key(keyevent) => Some(EventsService::from_key(keyevent.into())),
            CrosstermEvent::Paste(text) => Some(Event::KeyboardPaste(text)),
            CrosstermEvent::Mouse(mouseevent) => match mouseevent.kind {
                MouseEventKind::ScrollUp => Some(Event::UIScrollUp()),
                MouseEventKind::ScrollDown => Some(Event::UIScrollDown()),
                _ => None,
            },
            _ => None,
        };
    }

    /// Waits for the next event worth redrawing for. Unmapped terminal
    /// events and read errors are skipped.
    pub async fn next(&mut self) -> Result<Event> {
        loop {
            let evt = tokio::select! {
                event = self.events.recv() => event,
                event = self.crossterm_events.next() => match event {
                    Some(Ok(input)) => EventsService::handle_crossterm(input),
                    Some(Err(_)) => None,
                    None => None,
                },
                _ = self.tick.tick() => Some(Event::UITick()),
            };

            if let Some(event) = evt {
                return Ok(event);
            }
        }
    }
}
