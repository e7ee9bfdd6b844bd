//! In-process store
//!
//! An arena of credentials keyed by credential id, plus users, challenges and
//! todos, each behind a `parking_lot::Mutex`. Every trait operation takes the
//! lock once, which is what makes counter compare-and-swap and challenge
//! take atomic here.

use crate::db::models::{AuthenticationChallenge, PasskeyCredential, Todo, User};
use crate::db::{ChallengeStore, CredentialStore, TodoStore, UserStore};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, User>>,
    credentials: Mutex<HashMap<String, PasskeyCredential>>,
    challenges: Mutex<Vec<AuthenticationChallenge>>,
    todos: Mutex<Vec<Todo>>,
    accesses: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users.lock().insert(user.username.clone(), user);
    }

    pub fn insert_credential(&self, credential: PasskeyCredential) {
        self.credentials.lock().insert(credential.id.clone(), credential);
    }

    pub fn insert_todo(&self, todo: Todo) {
        self.todos.lock().push(todo);
    }

    pub fn credential(&self, credential_id: &str) -> Option<PasskeyCredential> {
        self.credentials.lock().get(credential_id).cloned()
    }

    pub fn challenge_count(&self) -> usize {
        self.challenges.lock().len()
    }

    pub fn todo(&self, todo_id: i64) -> Option<Todo> {
        self.todos.lock().iter().find(|t| t.id == todo_id).cloned()
    }

    /// Number of trait operations served so far
    pub fn access_count(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.touch();
        Ok(self.users.lock().get(username).cloned())
    }

    async fn find_by_id(&self, user_id: &str) -> AppResult<User> {
        self.touch();
        self.users
            .lock()
            .values()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", user_id)))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn save_credential(&self, credential: &PasskeyCredential) -> AppResult<()> {
        self.touch();
        self.credentials
            .lock()
            .insert(credential.id.clone(), credential.clone());
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str) -> AppResult<Vec<PasskeyCredential>> {
        self.touch();
        let mut found: Vec<PasskeyCredential> = self
            .credentials
            .lock()
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn current_counter(&self, credential_id: &str) -> AppResult<Option<u32>> {
        self.touch();
        Ok(self
            .credentials
            .lock()
            .get(credential_id)
            .map(PasskeyCredential::signature_counter))
    }

    async fn compare_and_swap_counter(
        &self,
        credential_id: &str,
        expected: u32,
        new_counter: u32,
    ) -> AppResult<bool> {
        self.touch();
        let mut credentials = self.credentials.lock();
        match credentials.get_mut(credential_id) {
            Some(credential) if credential.signature_counter() == expected => {
                credential.counter = new_counter as i64;
                credential.last_used_at = Some(Utc::now().to_rfc3339());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ChallengeStore for MemoryStore {
    async fn save_authentication_challenge(&self, challenge: &AuthenticationChallenge) -> AppResult<()> {
        self.touch();
        self.challenges.lock().push(challenge.clone());
        Ok(())
    }

    async fn take_authentication_challenge(
        &self,
        username: &str,
        challenge: &str,
    ) -> AppResult<Option<AuthenticationChallenge>> {
        self.touch();
        let mut challenges = self.challenges.lock();
        let position = challenges
            .iter()
            .position(|c| c.username == username && c.challenge == challenge);
        Ok(position.map(|i| challenges.swap_remove(i)))
    }

    async fn cleanup_expired_challenges(&self, now: DateTime<Utc>) -> AppResult<u64> {
        self.touch();
        let mut challenges = self.challenges.lock();
        let before = challenges.len();
        challenges.retain(|c| !c.is_expired_at(now));
        Ok((before - challenges.len()) as u64)
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn due_reminders(&self, user_id: Option<&str>, now: DateTime<Utc>) -> AppResult<Vec<Todo>> {
        self.touch();
        Ok(self
            .todos
            .lock()
            .iter()
            .filter(|t| user_id.map_or(true, |u| t.user_id == u))
            .filter(|t| t.reminder_due(now))
            .cloned()
            .collect())
    }

    async fn mark_notification_sent(
        &self,
        todo_id: i64,
        user_id: Option<&str>,
        sent_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.touch();
        let mut todos = self.todos.lock();
        let todo = todos
            .iter_mut()
            .find(|t| t.id == todo_id && user_id.map_or(true, |u| t.user_id == u))
            .ok_or_else(|| AppError::NotFound(format!("Todo {} not found", todo_id)))?;
        todo.last_notification_sent = Some(sent_at.to_rfc3339());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compare_and_swap_only_applies_on_expected_value() {
        let store = MemoryStore::new();
        store.insert_credential(PasskeyCredential::new("AQID".into(), "u1".into(), vec![], 5));

        assert!(!store.compare_and_swap_counter("AQID", 4, 9).await.unwrap());
        assert_eq!(store.current_counter("AQID").await.unwrap(), Some(5));

        assert!(store.compare_and_swap_counter("AQID", 5, 6).await.unwrap());
        assert_eq!(store.current_counter("AQID").await.unwrap(), Some(6));
        assert!(store.credential("AQID").unwrap().last_used_at.is_some());
    }

    #[tokio::test]
    async fn unknown_credential_never_swaps() {
        let store = MemoryStore::new();
        assert!(!store.compare_and_swap_counter("missing", 0, 1).await.unwrap());
        assert_eq!(store.current_counter("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn challenge_is_taken_once() {
        let store = MemoryStore::new();
        let challenge = AuthenticationChallenge::new(
            "alice".into(),
            "c1".into(),
            chrono::Duration::minutes(5),
        );
        store.save_authentication_challenge(&challenge).await.unwrap();

        assert!(store.take_authentication_challenge("bob", "c1").await.unwrap().is_none());
        assert!(store.take_authentication_challenge("alice", "c1").await.unwrap().is_some());
        assert!(store.take_authentication_challenge("alice", "c1").await.unwrap().is_none());
        assert_eq!(store.challenge_count(), 0);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_challenges() {
        let store = MemoryStore::new();
        let stale = AuthenticationChallenge::new("alice".into(), "old".into(), chrono::Duration::minutes(-1));
        let live = AuthenticationChallenge::new("alice".into(), "new".into(), chrono::Duration::minutes(5));
        store.save_authentication_challenge(&stale).await.unwrap();
        store.save_authentication_challenge(&live).await.unwrap();

        assert_eq!(store.cleanup_expired_challenges(Utc::now()).await.unwrap(), 1);
        assert_eq!(store.challenge_count(), 1);
        assert!(store.take_authentication_challenge("alice", "new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn users_are_found_by_id() {
        let store = MemoryStore::new();
        let alice = User::new("alice".into(), "Alice".into());
        store.insert_user(alice.clone());

        assert_eq!(store.find_by_id(&alice.id).await.unwrap().username, "alice");
        assert!(matches!(store.find_by_id("missing").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn saved_credential_is_listed_for_its_user() {
        let store = MemoryStore::new();
        let credential = PasskeyCredential::new("AQID".into(), "u1".into(), vec![], 0);
        store.save_credential(&credential).await.unwrap();

        let found = store.find_by_user_id("u1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "AQID");
    }
}
