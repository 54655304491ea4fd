use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, MouseEvent};

pub enum AppEvent {
    Key(KeyEvent),
    /// Presses and drags on the writing pad.
    Mouse(MouseEvent),
    Tick,
    Resize(u16, u16),
}

/// Reads terminal input on a background thread and forwards it over a
/// channel, emitting `Tick` whenever a poll interval passes quietly.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    _tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let _tx = tx.clone();

        thread::spawn(move || {
            loop {
                let forwarded = if event::poll(tick_rate).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key)) => Some(AppEvent::Key(key)),
                        Ok(Event::Mouse(mouse)) => Some(AppEvent::Mouse(mouse)),
                        Ok(Event::Resize(w, h)) => Some(AppEvent::Resize(w, h)),
                        _ => None,
                    }
                } else {
                    Some(AppEvent::Tick)
                };
                if let Some(ev) = forwarded
                    && tx.send(ev).is_err()
                {
                    return;
                }
            }
        });

        Self { rx, _tx }
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}
