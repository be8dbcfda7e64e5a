use crate::remote::auth::Session;
use crate::storage::{Medium, Storage, StorageKey};

pub fn save<M: Medium>(storage: &mut Storage<M>, session: &Session) -> bool {
    storage.set(StorageKey::Session, session)
}

pub fn load<M: Medium>(storage: &Storage<M>) -> Option<Session> {
    storage.get(StorageKey::Session)
}

pub fn clear<M: Medium>(storage: &mut Storage<M>) -> bool {
    storage.remove(StorageKey::Session)
}
