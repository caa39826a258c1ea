#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;

use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task;
use tokio::time;

use super::loader;
use super::loader::LoaderSettings;
use super::Store;
use crate::domain::models::Action;
use crate::domain::models::Gateway;

/// Runs loader work requested by the view. Must be started inside a
/// `tokio::task::LocalSet`; every action becomes its own local task so a slow
/// gateway call never blocks the next action.
pub struct ActionsService {}

impl ActionsService {
    pub async fn start(
        gateway: Rc<dyn Gateway>,
        store: Rc<Store>,
        settings: LoaderSettings,
        refresh_interval: Duration,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        // The first tick completes immediately and loads the initial sessions.
        let mut refresh = time::interval(refresh_interval);
        refresh.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            let action = tokio::select! {
                biased;
                _ = refresh.tick() => Action::LoadSessions(),
                action = rx.recv() => match action {
                    Some(action) => action,
                    None => return Ok(()),
                },
            };

            ActionsService::dispatch(gateway.clone(), store.clone(), settings, action);
        }
    }

    fn dispatch(gateway: Rc<dyn Gateway>, store: Rc<Store>, settings: LoaderSettings, action: Action) {
        match action {
            Action::LoadSessions() => {
                task::spawn_local(async move {
                    loader::load_sessions(gateway.as_ref(), &store, settings.session_limit).await;
                });
            }
            Action::SelectSession(agent) => {
                task::spawn_local(async move {
                    loader::select_session(
                        gateway.as_ref(),
                        &store,
                        &agent,
                        settings.history_limit,
                    )
                    .await;
                });
            }
            Action::ReloadHistory() => {
                let session_key = match store.selected_session_key() {
                    Some(key) => key,
                    None => {
                        tracing::debug!("Ignoring history reload without a selected session");
                        return;
                    }
                };

                task::spawn_local(async move {
                    loader::load_history(
                        gateway.as_ref(),
                        &store,
                        &session_key,
                        settings.history_limit,
                    )
                    .await;
                });
            }
            Action::SendMessage(text) => {
                let session_key = match store.selected_session_key() {
                    Some(key) => key,
                    None => {
                        tracing::warn!("Ignoring message without a selected session");
                        return;
                    }
                };

                task::spawn_local(async move {
                    loader::send_message(
                        gateway.as_ref(),
                        &store,
                        &session_key,
                        &text,
                        settings.send_timeout,
                    )
                    .await;
                });
            }
        }
    }
}
