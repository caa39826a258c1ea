#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;
use std::rc::Weak;

use crate::domain::models::Agent;
use crate::domain::models::DisplayMessage;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplicationState {
    pub sessions: Vec<Agent>,
    pub selected_session_key: Option<String>,
    /// Scoped to the selected session, cleared on every selection.
    pub messages: Vec<DisplayMessage>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl ApplicationState {
    /// The selected session, if it is still part of the latest session list.
    pub fn selected_session(&self) -> Option<&Agent> {
        let key = self.selected_session_key.as_ref()?;
        return self.sessions.iter().find(|agent| return &agent.key == key);
    }
}

type Observer = Rc<dyn Fn(&ApplicationState)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: Vec<(u64, Observer)>,
}

impl Registry {
    fn contains(&self, id: u64) -> bool {
        return self.observers.iter().any(|(observer_id, _)| return *observer_id == id);
    }
}

/// Handle returned by `Store::subscribe`. Dropping it keeps the observer
/// registered; call `unsubscribe` to remove it.
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .observers
                .retain(|(id, _)| return *id != self.id);
        }
    }
}

/// Single owner of `ApplicationState`. Every mutation runs to completion and
/// then synchronously notifies all observers with the new state.
#[derive(Default)]
pub struct Store {
    generation: Cell<u64>,
    state: RefCell<ApplicationState>,
    registry: Rc<RefCell<Registry>>,
}

impl Store {
    pub fn new() -> Store {
        return Store::default();
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&ApplicationState) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        let observer: Observer = Rc::new(observer);
        registry.observers.push((id, observer));

        return Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        };
    }

    pub fn snapshot(&self) -> ApplicationState {
        return self.state.borrow().clone();
    }

    pub fn selected_session_key(&self) -> Option<String> {
        return self.state.borrow().selected_session_key.clone();
    }

    pub fn set_sessions(&self, sessions: Vec<Agent>) {
        self.update(|state| {
            state.sessions = sessions;
        });
    }

    pub fn select_session(&self, agent: &Agent) {
        self.update(|state| {
            state.selected_session_key = Some(agent.key.to_string());
            state.messages = vec![];
        });
    }

    pub fn set_messages(&self, messages: Vec<DisplayMessage>) {
        self.update(|state| {
            state.messages = messages;
        });
    }

    pub fn append_message(&self, message: DisplayMessage) {
        self.update(|state| {
            state.messages.push(message);
        });
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.update(|state| {
            state.is_loading = is_loading;
        });
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update(|state| {
            state.last_error = error;
        });
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    fn update<F: FnOnce(&mut ApplicationState)>(&self, mutate: F) {
        mutate(&mut *self.state.borrow_mut());
        self.generation.set(self.generation.get() + 1);
        self.notify();
    }

    // Observers get their own copy of the state and the registry is re-checked
    // before each call, so observers may mutate the store or (un)subscribe
    // while a notification is in flight. A nested mutation has already told
    // every observer about the newer state, so the outer pass stops there.
    fn notify(&self) {
        let generation = self.generation.get();
        let state = self.snapshot();
        let observers = self.registry.borrow().observers.clone();

        for (id, observer) in observers {
            if self.generation.get() != generation {
                return;
            }
            if !self.registry.borrow().contains(id) {
                continue;
            }
            observer(&state);
        }
    }
}
