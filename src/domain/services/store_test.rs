use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

use super::ApplicationState;
use super::Store;
use super::Subscription;
use crate::domain::models::Agent;
use crate::domain::models::AgentKind;
use crate::domain::models::DisplayMessage;
use crate::domain::models::Role;

fn display_message(text: &str) -> DisplayMessage {
    return DisplayMessage {
        role: Role::User,
        timestamp: None,
        text: text.to_string(),
        rendered_text: format!("<p>{text}</p>\n"),
        media: vec![],
    };
}

fn counter(store: &Store) -> (Rc<Cell<usize>>, Subscription) {
    let count = Rc::new(Cell::new(0));
    let observer_count = count.clone();
    let subscription = store.subscribe(move |_state| {
        observer_count.set(observer_count.get() + 1);
    });

    return (count, subscription);
}

#[test]
fn it_notifies_once_per_mutation() {
    let store = Store::new();
    let (count, _subscription) = counter(&store);

    store.set_loading(true);
    store.set_sessions(vec![]);
    store.set_error(Some("boom".to_string()));
    store.clear_error();
    store.set_messages(vec![]);
    store.append_message(display_message("hi"));
    store.select_session(&Agent::new("agent:a:main", AgentKind::Main));

    assert_eq!(count.get(), 7);
}

#[test]
fn it_passes_the_new_state_to_observers() {
    let store = Store::new();
    let seen = Rc::new(RefCell::new(vec![]));
    let observer_seen = seen.clone();
    let _subscription = store.subscribe(move |state: &ApplicationState| {
        observer_seen.borrow_mut().push(state.is_loading);
    });

    store.set_loading(true);
    store.set_loading(false);

    assert_eq!(*seen.borrow(), vec![true, false]);
}

#[test]
fn it_stops_notifying_after_unsubscribe() {
    let store = Store::new();
    let (first_count, first) = counter(&store);
    let (second_count, _second) = counter(&store);

    store.set_loading(true);
    first.unsubscribe();
    store.set_loading(false);

    assert_eq!(first_count.get(), 1);
    assert_eq!(second_count.get(), 2);
}

#[test]
fn it_keeps_independent_subscriptions_of_the_same_observer() {
    let store = Store::new();
    let count = Rc::new(Cell::new(0));

    let first_count = count.clone();
    let first = store.subscribe(move |_state| first_count.set(first_count.get() + 1));
    let second_count = count.clone();
    let _second = store.subscribe(move |_state| second_count.set(second_count.get() + 1));

    store.set_loading(true);
    assert_eq!(count.get(), 2);

    first.unsubscribe();
    store.set_loading(false);
    assert_eq!(count.get(), 3);
}

#[test]
fn it_allows_unsubscribing_inside_a_notification() {
    let store = Store::new();
    let calls = Rc::new(RefCell::new(vec![]));

    // The first observer removes the second one while the pass is in flight.
    let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let first_victim = victim.clone();
    let first_calls = calls.clone();
    let _first = store.subscribe(move |_state| {
        first_calls.borrow_mut().push("first");
        if let Some(subscription) = first_victim.borrow_mut().take() {
            subscription.unsubscribe();
        }
    });

    let second_calls = calls.clone();
    let second = store.subscribe(move |_state| {
        second_calls.borrow_mut().push("second");
    });
    *victim.borrow_mut() = Some(second);

    let third_calls = calls.clone();
    let _third = store.subscribe(move |_state| {
        third_calls.borrow_mut().push("third");
    });

    store.set_loading(true);
    store.set_loading(false);

    assert_eq!(
        *calls.borrow(),
        vec!["first", "third", "first", "third"]
    );
}

#[test]
fn it_allows_observers_to_unsubscribe_themselves() {
    let store = Store::new();
    let count = Rc::new(Cell::new(0));
    let own: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

    let observer_count = count.clone();
    let observer_own = own.clone();
    let subscription = store.subscribe(move |_state| {
        observer_count.set(observer_count.get() + 1);
        if let Some(subscription) = observer_own.borrow_mut().take() {
            subscription.unsubscribe();
        }
    });
    *own.borrow_mut() = Some(subscription);

    store.set_loading(true);
    store.set_loading(false);

    assert_eq!(count.get(), 1);
}

#[test]
fn it_does_not_call_observers_added_mid_notification() {
    let store = Rc::new(Store::new());
    let late_count = Rc::new(Cell::new(0));
    let added = Rc::new(Cell::new(false));

    let observer_store = Rc::downgrade(&store);
    let observer_late_count = late_count.clone();
    let observer_added = added.clone();
    let _subscription = store.subscribe(move |_state| {
        if observer_added.get() {
            return;
        }
        observer_added.set(true);

        let late_count = observer_late_count.clone();
        if let Some(store) = observer_store.upgrade() {
            let _late = store.subscribe(move |_state| late_count.set(late_count.get() + 1));
        }
    });

    store.set_loading(true);
    assert_eq!(late_count.get(), 0);

    store.set_loading(false);
    assert_eq!(late_count.get(), 1);
}

#[test]
fn it_allows_observers_to_mutate_the_store() {
    let store = Rc::new(Store::new());
    let observer_store = Rc::downgrade(&store);
    let _subscription = store.subscribe(move |state| {
        if state.last_error.is_some() {
            if let Some(store) = observer_store.upgrade() {
                store.clear_error();
            }
        }
    });

    let seen = Rc::new(RefCell::new(vec![]));
    let observer_seen = seen.clone();
    let _recorder = store.subscribe(move |state| {
        observer_seen.borrow_mut().push(state.last_error.clone());
    });

    store.set_error(Some("boom".to_string()));

    assert_eq!(store.snapshot().last_error, None);
    assert_eq!(*seen.borrow(), vec![None]);
}

#[test]
fn it_clears_messages_on_select() {
    let store = Store::new();
    let agent = Agent::new("agent:a:main", AgentKind::Main);

    store.select_session(&agent);
    store.set_messages(vec![display_message("one"), display_message("two")]);
    assert_eq!(store.snapshot().messages.len(), 2);

    let (count, _subscription) = counter(&store);
    store.select_session(&agent);

    let state = store.snapshot();
    assert_eq!(count.get(), 1);
    assert!(state.messages.is_empty());
    assert_eq!(state.selected_session_key, Some("agent:a:main".to_string()));
}

#[test]
fn it_keeps_dangling_selection_on_session_refresh() {
    let store = Store::new();
    let agent = Agent::new("agent:a:main", AgentKind::Main);

    store.set_sessions(vec![agent.clone()]);
    store.select_session(&agent);
    assert_eq!(store.snapshot().selected_session(), Some(&agent));

    store.set_sessions(vec![Agent::new("agent:b:main", AgentKind::Main)]);

    let state = store.snapshot();
    assert_eq!(state.selected_session_key, Some("agent:a:main".to_string()));
    assert_eq!(state.selected_session(), None);
    assert_eq!(state.sessions.len(), 1);
}

#[test]
fn it_appends_messages_in_order() {
    let store = Store::new();
    store.set_messages(vec![display_message("one")]);
    store.append_message(display_message("two"));
    store.append_message(display_message("three"));

    let texts = store
        .snapshot()
        .messages
        .iter()
        .map(|msg| return msg.text.to_string())
        .collect::<Vec<String>>();

    assert_eq!(texts, vec!["one", "two", "three"]);
}
