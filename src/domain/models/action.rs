use super::Agent;

pub enum Action {
    LoadSessions(),
    ReloadHistory(),
    SelectSession(Agent),
    SendMessage(String),
}
